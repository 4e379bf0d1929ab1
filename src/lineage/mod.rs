//! Reconstruction of a feature's provenance across the steps of an execution.

pub mod attributes;
pub mod formatter;
pub mod resolver;

pub use attributes::AttributeDictionary;
pub use formatter::ProvenanceFormatter;
pub use resolver::{LineageResolver, LineageResolverBuilder};

use crate::definition::Tool;
use crate::store::FeatureQuery;
use serde::{Deserialize, Serialize};

/// The lineage of a single output feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Name of the step that produced the requested output.
    pub step_name: String,
    pub output_key: String,
    pub feature_id: String,
    pub feature_uri: String,
    /// Combined GeoJSON feature collection; `None` when no source table was found.
    pub features: Option<serde_json::Value>,
    pub operations: Vec<Operation>,
    pub queries: Vec<FeatureQuery>,
}

impl Provenance {
    pub fn enrichments(&self) -> impl Iterator<Item = &EnrichOperation> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Enrich(e) => Some(e),
            Operation::Fuse(_) => None,
        })
    }

    pub fn fusions(&self) -> impl Iterator<Item = &FuseOperation> {
        self.operations.iter().filter_map(|op| match op {
            Operation::Fuse(f) => Some(f),
            Operation::Enrich(_) => None,
        })
    }
}

/// A transformation applied to the feature somewhere upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Enrich(EnrichOperation),
    Fuse(FuseOperation),
}

impl Operation {
    pub fn level(&self) -> usize {
        match self {
            Operation::Enrich(e) => e.level,
            Operation::Fuse(f) => f.level,
        }
    }

    pub fn tool(&self) -> Tool {
        match self {
            Operation::Enrich(e) => e.tool,
            Operation::Fuse(f) => f.tool,
        }
    }

    pub fn step_name(&self) -> &str {
        match self {
            Operation::Enrich(e) => &e.step_name,
            Operation::Fuse(f) => &f.step_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichOperation {
    pub level: usize,
    pub tool: Tool,
    pub step_name: String,
    /// Name of the source step, or of the catalog resource read directly.
    pub input_name: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuseOperation {
    pub level: usize,
    pub tool: Tool,
    pub step_name: String,
    pub left_uri: String,
    pub right_uri: String,
    /// Whichever of the two side URIs is the feature that was queried.
    pub selected_uri: String,
    pub left_input: String,
    pub right_input: String,
    pub actions: Vec<PropertyAction>,
}

/// How the fused value of one property was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyAction {
    pub property: String,
    pub operation: String,
    pub value: Option<String>,
}
