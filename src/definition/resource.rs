use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a versioned resource in the external catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub id: i64,
    pub version: i64,
}

impl ResourceIdentifier {
    pub fn new(id: i64, version: i64) -> Self {
        Self { id, version }
    }
}

impl fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} (v{})", self.id, self.version)
    }
}

/// Axis-aligned bounding box in the store's coordinate reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

/// A resource that already exists in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogResource {
    pub key: String,
    pub name: String,
    pub resource: ResourceIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// The output of a processing step, made available to downstream steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOutput {
    pub key: String,
    pub name: String,
    pub step_key: i32,
}

/// Anything a step may consume: a catalog resource or another step's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "inputType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessResource {
    Catalog(CatalogResource),
    Output(StepOutput),
}

impl ProcessResource {
    pub fn catalog(key: &str, name: &str, resource: ResourceIdentifier) -> Self {
        ProcessResource::Catalog(CatalogResource {
            key: key.to_string(),
            name: name.to_string(),
            resource,
            table_name: None,
            bounding_box: None,
        })
    }

    pub fn output(key: &str, name: &str, step_key: i32) -> Self {
        ProcessResource::Output(StepOutput {
            key: key.to_string(),
            name: name.to_string(),
            step_key,
        })
    }

    pub fn key(&self) -> &str {
        match self {
            ProcessResource::Catalog(r) => &r.key,
            ProcessResource::Output(r) => &r.key,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProcessResource::Catalog(r) => &r.name,
            ProcessResource::Output(r) => &r.name,
        }
    }
}
