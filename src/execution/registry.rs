//! In-memory execution tracking.
//!
//! Every mutation of an execution runs while holding that execution's
//! map entry, so a status check and the write that follows it can never
//! interleave with another update of the same execution.

use super::record::{
    ExecutionUpdate, FileUpdate, ProcessExecutionRecord, ProcessExecutionStepFileRecord,
    ProcessExecutionStepRecord, ProcessIdentifier,
};
use super::status::ExecutionStatus;
use crate::error::ExecutionError;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use itertools::Itertools;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info};

/// A requested change to a step record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepUpdate {
    pub status: Option<ExecutionStatus>,
    /// Only accepted when the step moves from UNKNOWN to RUNNING; defaults
    /// to the current time on that transition.
    pub started_on: Option<DateTime<Utc>>,
    pub completed_on: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    /// New files are appended; files whose path is already recorded only
    /// have their updatable fields refreshed.
    pub files: Vec<ProcessExecutionStepFileRecord>,
}

/// Counts reported by [`ExecutionRegistry::clear_running_executions`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearedExecutions {
    pub steps: usize,
    pub executions: usize,
}

pub struct ExecutionRegistry {
    executions: DashMap<i64, ProcessExecutionRecord>,
    /// Most recently created execution per process revision.
    latest: DashMap<ProcessIdentifier, i64>,
    next_id: AtomicI64,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self {
            executions: DashMap::new(),
            latest: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Submits a new execution in UNKNOWN status.
    ///
    /// Fails when the process revision still has a non-terminal execution.
    pub fn create_execution(
        &self,
        process: ProcessIdentifier,
        submitted_on: DateTime<Utc>,
    ) -> Result<ProcessExecutionRecord, ExecutionError> {
        // The entry guard serializes concurrent submissions for one revision.
        let entry = self.latest.entry(process);
        if let Entry::Occupied(occupied) = &entry {
            let active = self
                .executions
                .get(occupied.get())
                .is_some_and(|e| !e.is_terminal());
            if active {
                return Err(ExecutionError::ActiveExecutionExists { process });
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = ProcessExecutionRecord::new(id, process, submitted_on);
        self.executions.insert(id, record.clone());
        entry.insert(id);

        info!(execution_id = id, %process, "Submitted process execution");
        Ok(record)
    }

    /// Applies a lifecycle update atomically with respect to other updates
    /// of the same execution.
    pub fn update_execution(
        &self,
        execution_id: i64,
        update: &ExecutionUpdate,
    ) -> Result<ProcessExecutionRecord, ExecutionError> {
        let mut record = self
            .executions
            .get_mut(&execution_id)
            .ok_or(ExecutionError::ExecutionNotFound(execution_id))?;

        let previous = record.status;
        record.apply(update)?;
        if record.status != previous {
            info!(
                execution_id,
                from = %previous,
                to = %record.status,
                "Process execution changed status"
            );
        }
        Ok(record.clone())
    }

    /// Records a new step against an active execution.
    pub fn create_step(
        &self,
        execution_id: i64,
        step: ProcessExecutionStepRecord,
    ) -> Result<ProcessExecutionRecord, ExecutionError> {
        let mut record = self.active_mut(execution_id)?;

        if record.step(step.key).is_some() {
            return Err(ExecutionError::DuplicateStep {
                execution_id,
                step_key: step.key,
            });
        }
        if let Some(path) = step.files.iter().map(|f| f.path.as_str()).duplicates().next() {
            return Err(ExecutionError::FileRecordConflict {
                execution_id,
                step_key: step.key,
                path: path.to_string(),
            });
        }

        debug!(execution_id, step_key = step.key, step = %step.name, "Recorded execution step");
        record.steps.push(step);
        Ok(record.clone())
    }

    /// Updates a step's status and merges its file list.
    pub fn update_step(
        &self,
        execution_id: i64,
        step_key: i32,
        update: StepUpdate,
    ) -> Result<ProcessExecutionRecord, ExecutionError> {
        let mut record = self.active_mut(execution_id)?;
        let step = record
            .step_mut(step_key)
            .ok_or(ExecutionError::StepNotFound {
                execution_id,
                step_key,
            })?;

        if let Some(next) = update.status {
            if next != step.status && !step.status.can_transition_to(next) {
                return Err(ExecutionError::InvalidStepTransition {
                    execution_id,
                    step_key,
                    from: step.status,
                    to: next,
                });
            }
        }
        let starting = step.status == ExecutionStatus::Unknown
            && update.status == Some(ExecutionStatus::Running);
        if update.started_on.is_some() && !starting {
            return Err(ExecutionError::InvalidUpdate {
                execution_id,
                reason: format!(
                    "`started_on` can only be set when step {step_key} moves from UNKNOWN to RUNNING"
                ),
            });
        }

        // Validate every file before touching the step.
        let mut merged = step.clone();
        for file in update.files {
            let path = file.path.clone();
            if !merged.merge_file(file) {
                return Err(ExecutionError::FileRecordConflict {
                    execution_id,
                    step_key,
                    path,
                });
            }
        }
        if let Some(status) = update.status {
            merged.status = status;
        }
        if starting {
            merged.started_on = update.started_on.or_else(|| Some(Utc::now()));
        }
        if update.completed_on.is_some() {
            merged.completed_on = update.completed_on;
        }
        if update.error_message.is_some() {
            merged.error_message = update.error_message;
        }
        *step = merged;

        Ok(record.clone())
    }

    /// Appends a single file to a step. The path must not be recorded yet.
    pub fn add_file(
        &self,
        execution_id: i64,
        step_key: i32,
        file: ProcessExecutionStepFileRecord,
    ) -> Result<ProcessExecutionRecord, ExecutionError> {
        let mut record = self.active_mut(execution_id)?;
        let step = record
            .step_mut(step_key)
            .ok_or(ExecutionError::StepNotFound {
                execution_id,
                step_key,
            })?;

        if step.file_by_path(&file.path).is_some() {
            return Err(ExecutionError::FileRecordConflict {
                execution_id,
                step_key,
                path: file.path,
            });
        }
        step.files.push(file);
        Ok(record.clone())
    }

    /// Refreshes the updatable fields of an already recorded file.
    pub fn update_file(
        &self,
        execution_id: i64,
        step_key: i32,
        path: &str,
        update: &FileUpdate,
    ) -> Result<ProcessExecutionRecord, ExecutionError> {
        let mut record = self.active_mut(execution_id)?;
        let step = record
            .step_mut(step_key)
            .ok_or(ExecutionError::StepNotFound {
                execution_id,
                step_key,
            })?;

        let file = step
            .files
            .iter_mut()
            .find(|f| f.path == path)
            .ok_or_else(|| ExecutionError::InvalidUpdate {
                execution_id,
                reason: format!("step {step_key} has no file at '{path}'"),
            })?;
        file.apply(update);
        Ok(record.clone())
    }

    /// Restart recovery: nothing can still be running after the surrounding
    /// service restarts, so RUNNING steps and UNKNOWN/RUNNING executions
    /// are moved to STOPPED.
    pub fn clear_running_executions(&self) -> ClearedExecutions {
        let mut cleared = ClearedExecutions::default();
        for mut record in self.executions.iter_mut() {
            for step in record.steps.iter_mut() {
                if step.status == ExecutionStatus::Running {
                    step.status = ExecutionStatus::Stopped;
                    cleared.steps += 1;
                }
            }
            if !record.is_terminal() {
                record.status = ExecutionStatus::Stopped;
                cleared.executions += 1;
            }
        }

        if cleared.steps > 0 {
            info!("Cleared {} execution step(s) from RUNNING to STOPPED", cleared.steps);
        }
        if cleared.executions > 0 {
            info!(
                "Cleared {} execution(s) from UNKNOWN/RUNNING to STOPPED",
                cleared.executions
            );
        }
        cleared
    }

    pub fn find(&self, execution_id: i64) -> Option<ProcessExecutionRecord> {
        self.executions.get(&execution_id).map(|e| e.clone())
    }

    /// All executions of a process revision, oldest first.
    pub fn executions_of(&self, process: ProcessIdentifier) -> Vec<ProcessExecutionRecord> {
        self.executions
            .iter()
            .filter(|e| e.process == process)
            .map(|e| e.value().clone())
            .sorted_by_key(|e| e.id)
            .collect()
    }

    /// The most recently started execution of a process revision.
    pub fn find_latest(&self, process: ProcessIdentifier) -> Option<ProcessExecutionRecord> {
        self.executions_of(process)
            .into_iter()
            .filter(|e| e.started_on.is_some())
            .max_by_key(|e| (e.started_on, e.id))
    }

    /// Removes an execution. Executions that already recorded steps are
    /// only removed when `force` is set.
    pub fn discard(&self, execution_id: i64, force: bool) -> Result<bool, ExecutionError> {
        let removed = self
            .executions
            .remove_if(&execution_id, |_, e| e.steps.is_empty() || force);

        match removed {
            Some((_, record)) => {
                if !record.steps.is_empty() {
                    info!(
                        execution_id,
                        "Removed execution along with {} processing step(s)",
                        record.steps.len()
                    );
                }
                Ok(true)
            }
            None if self.executions.contains_key(&execution_id) => Ok(false),
            None => Err(ExecutionError::ExecutionNotFound(execution_id)),
        }
    }

    fn active_mut(
        &self,
        execution_id: i64,
    ) -> Result<dashmap::mapref::one::RefMut<'_, i64, ProcessExecutionRecord>, ExecutionError> {
        let record = self
            .executions
            .get_mut(&execution_id)
            .ok_or(ExecutionError::ExecutionNotFound(execution_id))?;
        if record.is_terminal() {
            return Err(ExecutionError::ExecutionNotActive(execution_id));
        }
        Ok(record)
    }
}

impl Default for ExecutionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
