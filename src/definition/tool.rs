use serde::{Deserialize, Serialize};
use std::fmt;

/// Well-known output part keys.
pub mod part {
    /// Main product of a TripleGeo transformation.
    pub const TRANSFORMED: &str = "transformed";
    /// Classification scheme emitted next to a TripleGeo transformation.
    pub const CLASSIFICATION: &str = "classification";
    /// Main product of a DEER enrichment.
    pub const ENRICHED: &str = "enriched";
    /// Main product of a FAGI fusion.
    pub const FUSED: &str = "fused";
    /// Entities FAGI could not fuse and passed through unchanged.
    pub const REMAINING: &str = "remaining";
}

/// The external tool wrapped by a processing step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tool {
    /// Transforms raw source data into triples.
    Triplegeo,
    /// Transforms triples back into a tabular/vector format.
    ReverseTriplegeo,
    /// Discovers links between two datasets.
    Limes,
    /// Fuses linked entities of two datasets.
    Fagi,
    /// Enriches a single dataset.
    Deer,
    /// Registers a step output as a new catalog resource.
    Register,
    /// Designer-only node that stands for an existing catalog resource.
    Catalog,
}

impl Tool {
    /// The kind of operation this tool performs.
    pub fn operation(self) -> StepOperation {
        match self {
            Tool::Triplegeo | Tool::ReverseTriplegeo => StepOperation::Transform,
            Tool::Limes => StepOperation::Interlink,
            Tool::Fagi => StepOperation::Fusion,
            Tool::Deer => StepOperation::Enrichment,
            Tool::Register => StepOperation::Register,
            Tool::Catalog => StepOperation::ImportData,
        }
    }

    /// The output part that carries this tool's main product, if it has one.
    pub fn default_output_part(self) -> Option<&'static str> {
        match self {
            Tool::Triplegeo => Some(part::TRANSFORMED),
            Tool::Deer => Some(part::ENRICHED),
            Tool::Fagi => Some(part::FUSED),
            _ => None,
        }
    }

    /// Lower-case name used to derive default node names.
    pub fn slug(self) -> &'static str {
        match self {
            Tool::Triplegeo => "triplegeo",
            Tool::ReverseTriplegeo => "reverse-triplegeo",
            Tool::Limes => "limes",
            Tool::Fagi => "fagi",
            Tool::Deer => "deer",
            Tool::Register => "register",
            Tool::Catalog => "catalog",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tool::Triplegeo => "TRIPLEGEO",
            Tool::ReverseTriplegeo => "REVERSE_TRIPLEGEO",
            Tool::Limes => "LIMES",
            Tool::Fagi => "FAGI",
            Tool::Deer => "DEER",
            Tool::Register => "REGISTER",
            Tool::Catalog => "CATALOG",
        };
        f.write_str(name)
    }
}

/// Operation kind recorded against an executed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepOperation {
    Transform,
    Interlink,
    Fusion,
    Enrichment,
    Register,
    ImportData,
}
