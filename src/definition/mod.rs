//! The declarative side of a pipeline: tools, resources, steps and the
//! indexed [`ProcessDefinition`] graph built from them.

pub mod builder;
pub mod graph;
pub mod resource;
pub mod step;
pub mod tool;

pub use builder::*;
pub use graph::*;
pub use resource::*;
pub use step::*;
pub use tool::*;
