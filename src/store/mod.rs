//! Collaborators consulted by lineage resolution.
//!
//! The geometry store is the relational home of every step output that was
//! loaded into a table, together with the link and action tables written
//! by fusion steps. The catalog resolves catalog resource identifiers.

pub mod cache;
pub mod memory;

pub use cache::ColumnCache;
pub use memory::{MemoryCatalog, MemoryFeatureStore, StoreDocument};

use crate::definition::{BoundingBox, ResourceIdentifier};
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One feature to include in a materialized feature collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureQuery {
    /// Recursion depth at which the feature was found.
    pub level: usize,
    /// Name of the step or catalog resource the feature belongs to.
    pub source: String,
    pub table_name: String,
    pub feature_uri: String,
}

impl FeatureQuery {
    pub fn new(level: usize, source: &str, table_name: &str, feature_uri: &str) -> Self {
        Self {
            level,
            source: source.to_string(),
            table_name: table_name.to_string(),
            feature_uri: feature_uri.to_string(),
        }
    }
}

/// A row of a fusion link table: the two input features fused into one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionLink {
    pub id: i64,
    pub left_uri: String,
    pub right_uri: String,
}

/// How one attribute of a fused feature was derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FusionAction {
    pub attribute: String,
    pub action: String,
    pub value: Option<String>,
}

/// A catalog entry as seen by lineage resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub resource: ResourceIdentifier,
    pub name: String,
    #[serde(default)]
    pub table_name: Option<String>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

impl ResourceRecord {
    pub fn new(resource: ResourceIdentifier, name: &str) -> Self {
        Self {
            resource,
            name: name.to_string(),
            table_name: None,
            bounding_box: None,
        }
    }

    pub fn with_table(mut self, table_name: &str) -> Self {
        self.table_name = Some(table_name.to_string());
        self
    }
}

/// Column naming conventions of the geometry store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    pub uri_column: String,
    pub geometry_column: String,
    pub geometry_simple_column: String,
    pub link_table_suffix: String,
    pub action_table_suffix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri_column: "uri".to_string(),
            geometry_column: "the_geom".to_string(),
            geometry_simple_column: "the_geom_simple".to_string(),
            link_table_suffix: "_links".to_string(),
            action_table_suffix: "_actions".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn link_table(&self, output_table: &str) -> String {
        format!("{}{}", output_table, self.link_table_suffix)
    }

    pub fn action_table(&self, output_table: &str) -> String {
        format!("{}{}", output_table, self.action_table_suffix)
    }

    /// Whether `column` holds geometry and must be left out of feature properties.
    pub fn is_geometry_column(&self, column: &str) -> bool {
        column.eq_ignore_ascii_case(&self.geometry_column)
            || column.eq_ignore_ascii_case(&self.geometry_simple_column)
    }
}

/// Read access to the geometry store.
///
/// Table names passed in are the names of fusion *output* tables; an
/// implementation derives the link/action table names itself.
pub trait FeatureStore: Send + Sync {
    /// The first link whose left or right URI equals `feature_uri`.
    fn fetch_link(&self, table_name: &str, feature_uri: &str)
    -> Result<Option<FusionLink>, StoreError>;

    /// Raw per-attribute actions recorded for `link_id`.
    fn fetch_fusion_actions(
        &self,
        table_name: &str,
        link_id: i64,
    ) -> Result<Vec<FusionAction>, StoreError>;

    /// Non-geometry columns of `table_name`, in a stable order.
    fn columns_of(&self, table_name: &str) -> Result<Arc<Vec<String>>, StoreError>;

    /// Unions one GeoJSON feature per row matched by each query into a
    /// single `FeatureCollection`, preserving query order.
    fn materialize_feature_collection(
        &self,
        queries: &[FeatureQuery],
    ) -> Result<serde_json::Value, StoreError>;
}

/// Catalog resource lookup.
pub trait ResourceCatalog: Send + Sync {
    fn find_resource(
        &self,
        resource: ResourceIdentifier,
    ) -> Result<Option<ResourceRecord>, StoreError>;
}
