//! Prelude module for convenient imports
//!
//! Re-exports the types needed to define a pipeline, track its executions
//! and resolve feature lineage.
//!
//! # Example
//!
//! ```rust,no_run
//! use geoflow::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let definition = ProcessDefinition::from_json(&std::fs::read_to_string("definition.json")?)?;
//! let execution: ProcessExecutionRecord =
//!     serde_json::from_str(&std::fs::read_to_string("execution.json")?)?;
//! let (store, catalog) =
//!     StoreDocument::from_json(&std::fs::read_to_string("store.json")?)?.into_parts();
//!
//! let resolver = LineageResolver::builder(store, catalog).build();
//! let provenance = resolver.resolve(&definition, &execution, "fused", "42", "http://poi/42")?;
//! println!("{}", ProvenanceFormatter::format(&provenance));
//! # Ok(())
//! # }
//! ```

// Pipeline definition
pub use crate::definition::{
    ProcessDefinition, ProcessDefinitionBuilder, ProcessResource, ResourceIdentifier, Step,
    StepInput, Tool,
};

// Execution tracking
pub use crate::execution::{
    ExecutionRegistry, ExecutionStatus, ExecutionUpdate, ProcessExecutionRecord,
    ProcessExecutionStepFileRecord, ProcessExecutionStepRecord, ProcessIdentifier, StepUpdate,
};

// Geometry store
pub use crate::store::{
    FeatureStore, MemoryCatalog, MemoryFeatureStore, ResourceCatalog, ResourceRecord,
    StoreConfig, StoreDocument,
};

// Lineage
pub use crate::lineage::{LineageResolver, Operation, Provenance, ProvenanceFormatter};

// Error types
pub use crate::error::{DefinitionError, ExecutionError, LineageError, StoreError};

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
