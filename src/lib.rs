//! # Geoflow - Pipeline Definitions, Execution Tracking and Feature Lineage
//!
//! **Geoflow** models multi-tool geospatial data-integration pipelines. A pipeline
//! is described by a [`ProcessDefinition`](definition::ProcessDefinition): a graph of
//! steps, each wrapping an external tool (TripleGeo, DEER, LIMES, FAGI, ...), that
//! consume catalog resources and each other's outputs. Every run of a definition is
//! tracked as a [`ProcessExecutionRecord`](execution::ProcessExecutionRecord) with a
//! strict status lifecycle and a per-step record of the files it produced.
//!
//! ## Core Workflow
//!
//! 1.  **Define**: Load a definition from JSON or assemble one with the
//!     `ProcessDefinitionBuilder`. Construction validates keys and builds the lookup indices.
//! 2.  **Track**: Submit executions to an `ExecutionRegistry` and drive them through
//!     UNKNOWN → RUNNING → COMPLETED/FAILED/STOPPED, recording step files along the way.
//! 3.  **Trace**: Hand a definition, an execution and a feature URI to a `LineageResolver`.
//!     It walks the step graph backwards through enrichment and fusion steps and returns
//!     every contributing source feature and every operation applied to it.
//!
//! ## Quick Start
//!
//! ```rust
//! use geoflow::prelude::*;
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let definition = ProcessDefinitionBuilder::new("enrich-pois")
//!         .catalog("osm", "OSM extract", ResourceIdentifier::new(1, 1))
//!         .step(Step::new(1, "Enrich", Tool::Deer).with_input("osm"))
//!         .output("enriched", "Enriched POIs", 1)
//!         .build()?;
//!
//!     let mut execution =
//!         ProcessExecutionRecord::new(1, ProcessIdentifier::new(1, 1), chrono::Utc::now());
//!     execution.steps.push(
//!         ProcessExecutionStepRecord::new(1, "Enrich", Tool::Deer)
//!             .with_file(ProcessExecutionStepFileRecord::output("out/enriched.nt", "enriched")),
//!     );
//!
//!     let store = MemoryFeatureStore::new()
//!         .with_feature("osm_pois", "http://poi/1", json!(null), json!({ "name": "Cafe" }));
//!     let catalog = MemoryCatalog::new().with_resource(
//!         ResourceRecord::new(ResourceIdentifier::new(1, 1), "OSM extract").with_table("osm_pois"),
//!     );
//!
//!     let resolver = LineageResolver::builder(store, catalog).build();
//!     let provenance = resolver.resolve(&definition, &execution, "enriched", "1", "http://poi/1")?;
//!
//!     println!("{}", ProvenanceFormatter::format(&provenance));
//!     assert_eq!(provenance.operations.len(), 1);
//!     Ok(())
//! }
//! ```

pub mod definition;
pub mod error;
pub mod execution;
pub mod lineage;
pub mod prelude;
pub mod store;
