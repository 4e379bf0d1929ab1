//! Runtime side of a pipeline: execution records, their status lifecycle
//! and an in-memory registry that enforces both.

pub mod record;
pub mod registry;
pub mod status;

pub use record::*;
pub use registry::*;
pub use status::*;
