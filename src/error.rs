use crate::definition::{ResourceIdentifier, Tool};
use crate::execution::{ExecutionStatus, ProcessIdentifier};
use thiserror::Error;

/// Errors raised while assembling a `ProcessDefinition`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("A process definition requires a non-empty name")]
    EmptyName,

    #[error("Resource key '{0}' is declared more than once")]
    DuplicateResourceKey(String),

    #[error("Step key {0} is declared more than once")]
    DuplicateStepKey(i32),

    #[error("Step name '{0}' is used by more than one step")]
    DuplicateStepName(String),

    #[error("Node name '{0}' is used by more than one step")]
    DuplicateNodeName(String),

    #[error("Step '{step}' references input '{input_key}', which is not a known resource key")]
    DanglingInput { step: String, input_key: String },

    #[error("Output resource '{resource_key}' is produced by step {step_key}, which does not exist")]
    UnknownProducingStep { resource_key: String, step_key: i32 },

    #[error("Failed to parse process definition JSON: {0}")]
    Json(String),
}

/// Errors raised by the execution lifecycle and the execution registry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Process execution #{0} was not found")]
    ExecutionNotFound(i64),

    #[error("Process execution #{execution_id} has no step with key {step_key}")]
    StepNotFound { execution_id: i64, step_key: i32 },

    #[error("Process execution #{execution_id} cannot move from {from} to {to}")]
    InvalidTransition {
        execution_id: i64,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    #[error("Step {step_key} of execution #{execution_id} cannot move from {from} to {to}")]
    InvalidStepTransition {
        execution_id: i64,
        step_key: i32,
        from: ExecutionStatus,
        to: ExecutionStatus,
    },

    #[error("Invalid update for process execution #{execution_id}: {reason}")]
    InvalidUpdate { execution_id: i64, reason: String },

    #[error("Process {process} already has an active execution")]
    ActiveExecutionExists { process: ProcessIdentifier },

    #[error("Process execution #{0} is not active")]
    ExecutionNotActive(i64),

    #[error("Process execution #{execution_id} already has a step with key {step_key}")]
    DuplicateStep { execution_id: i64, step_key: i32 },

    #[error("Step {step_key} of execution #{execution_id} already has a file at '{path}'")]
    FileRecordConflict {
        execution_id: i64,
        step_key: i32,
        path: String,
    },
}

/// Errors reported by a feature store or resource catalog collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("Table '{0}' does not exist in the feature store")]
    TableNotFound(String),

    #[error("Feature store failure: {0}")]
    Backend(String),
}

/// Errors that abort a lineage resolution. No partial result is ever returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LineageError {
    #[error("Output key '{0}' does not name the output of any step")]
    OutputNotFound(String),

    #[error("Execution #{execution_id} has no record for step '{step_name}' (key {step_key})")]
    StepRecordNotFound {
        execution_id: i64,
        step_key: i32,
        step_name: String,
    },

    #[error("Execution record for step key {step_key} belongs to '{record_name}' ({record_tool}), not to '{step_name}' ({tool})")]
    StepRecordMismatch {
        step_key: i32,
        step_name: String,
        tool: Tool,
        record_name: String,
        record_tool: Tool,
    },

    #[error("Step '{step_name}' has no OUTPUT file for part '{part}'")]
    OutputFileNotFound { step_name: String, part: String },

    #[error("Catalog resource {0} was not found")]
    ResourceNotFound(ResourceIdentifier),

    #[error("Tool {0} is not supported by lineage resolution")]
    UnsupportedTool(Tool),

    #[error("Step '{step}' ({tool}) expects {expected} input(s), but declares {found}")]
    InputArity {
        step: String,
        tool: Tool,
        expected: &'static str,
        found: usize,
    },

    #[error("Step '{step}' references input '{input_key}', which is neither a catalog resource nor a step output")]
    DanglingInput { step: String, input_key: String },

    #[error("Step '{step}' is reached again at depth {level}; the definition contains a cycle")]
    Cycle { step: String, level: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}
