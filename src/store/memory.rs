use super::{
    ColumnCache, FeatureQuery, FeatureStore, FusionAction, FusionLink, ResourceCatalog,
    ResourceRecord, StoreConfig,
};
use crate::definition::ResourceIdentifier;
use crate::error::StoreError;
use ahash::AHashMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A geometry store held entirely in memory. Every table is a list of JSON
/// object rows; link and action tables are ordinary tables named after
/// their fusion output table.
#[derive(Debug, Default)]
pub struct MemoryFeatureStore {
    config: StoreConfig,
    tables: AHashMap<String, Vec<Value>>,
    columns: ColumnCache,
}

impl MemoryFeatureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Adds (or replaces) a table.
    pub fn with_table(mut self, table_name: &str, rows: Vec<Value>) -> Self {
        self.columns.invalidate(table_name);
        self.tables.insert(table_name.to_string(), rows);
        self
    }

    /// Adds a feature row keyed by `uri` to `table_name`.
    pub fn with_feature(mut self, table_name: &str, uri: &str, geometry: Value, properties: Value) -> Self {
        let mut row = match properties {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        row.insert(self.config.uri_column.clone(), Value::String(uri.to_string()));
        row.insert(self.config.geometry_column.clone(), geometry);
        self.insert_row(table_name, Value::Object(row));
        self
    }

    /// Records a fusion link for the fusion output `table_name`.
    pub fn with_link(mut self, table_name: &str, id: i64, left_uri: &str, right_uri: &str) -> Self {
        let table = self.config.link_table(table_name);
        self.insert_row(
            &table,
            json!({ "id": id, "left_uri": left_uri, "right_uri": right_uri }),
        );
        self
    }

    /// Records one attribute action of link `parent` for the fusion output `table_name`.
    pub fn with_action(
        mut self,
        table_name: &str,
        parent: i64,
        attribute: &str,
        action: &str,
        value: Option<&str>,
    ) -> Self {
        let table = self.config.action_table(table_name);
        self.insert_row(
            &table,
            json!({
                "parent": parent,
                "attribute": attribute,
                "fusion_action": action,
                "fused_value": value,
            }),
        );
        self
    }

    pub fn insert_row(&mut self, table_name: &str, row: Value) {
        self.columns.invalidate(table_name);
        self.tables.entry(table_name.to_string()).or_default().push(row);
    }

    pub fn has_table(&self, table_name: &str) -> bool {
        self.tables.contains_key(table_name)
    }

    fn rows(&self, table_name: &str) -> Result<&[Value], StoreError> {
        self.tables
            .get(table_name)
            .map(Vec::as_slice)
            .ok_or_else(|| StoreError::TableNotFound(table_name.to_string()))
    }
}

impl FeatureStore for MemoryFeatureStore {
    fn fetch_link(
        &self,
        table_name: &str,
        feature_uri: &str,
    ) -> Result<Option<FusionLink>, StoreError> {
        let table = self.config.link_table(table_name);
        let row = self.rows(&table)?.iter().find(|row| {
            text(row, "left_uri") == Some(feature_uri) || text(row, "right_uri") == Some(feature_uri)
        });

        row.map(|row| {
            Ok(FusionLink {
                id: integer(row, &table, "id")?,
                left_uri: required_text(row, &table, "left_uri")?,
                right_uri: required_text(row, &table, "right_uri")?,
            })
        })
        .transpose()
    }

    fn fetch_fusion_actions(
        &self,
        table_name: &str,
        link_id: i64,
    ) -> Result<Vec<FusionAction>, StoreError> {
        let table = self.config.action_table(table_name);
        let mut actions = Vec::new();
        for row in self.rows(&table)? {
            if integer(row, &table, "parent")? != link_id {
                continue;
            }
            let value = match row.get("fused_value") {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(other) => Some(other.to_string()),
            };
            actions.push(FusionAction {
                attribute: required_text(row, &table, "attribute")?,
                action: required_text(row, &table, "fusion_action")?,
                value,
            });
        }
        Ok(actions)
    }

    fn columns_of(&self, table_name: &str) -> Result<Arc<Vec<String>>, StoreError> {
        self.columns.get_or_compute(table_name, || {
            let columns = self
                .rows(table_name)?
                .iter()
                .filter_map(Value::as_object)
                .flat_map(|row| row.keys())
                .filter(|c| !self.config.is_geometry_column(c))
                .unique()
                .cloned()
                .collect();
            Ok(columns)
        })
    }

    fn materialize_feature_collection(
        &self,
        queries: &[FeatureQuery],
    ) -> Result<Value, StoreError> {
        let mut features = Vec::new();
        for query in queries {
            let columns = self.columns_of(&query.table_name)?;
            let matches = self
                .rows(&query.table_name)?
                .iter()
                .filter(|row| text(row, &self.config.uri_column) == Some(query.feature_uri.as_str()));

            for row in matches {
                let properties: Map<String, Value> = columns
                    .iter()
                    .map(|c| (c.clone(), row.get(c).cloned().unwrap_or(Value::Null)))
                    .collect();
                features.push(json!({
                    "type": "Feature",
                    "source": query.source,
                    "geometry": row.get(&self.config.geometry_column).cloned().unwrap_or(Value::Null),
                    "properties": properties,
                }));
            }
        }

        Ok(json!({ "type": "FeatureCollection", "features": features }))
    }
}

fn text<'a>(row: &'a Value, column: &str) -> Option<&'a str> {
    row.get(column).and_then(Value::as_str)
}

fn required_text(row: &Value, table: &str, column: &str) -> Result<String, StoreError> {
    text(row, column)
        .map(str::to_string)
        .ok_or_else(|| malformed(table, column))
}

fn integer(row: &Value, table: &str, column: &str) -> Result<i64, StoreError> {
    row.get(column)
        .and_then(Value::as_i64)
        .ok_or_else(|| malformed(table, column))
}

fn malformed(table: &str, column: &str) -> StoreError {
    StoreError::Backend(format!("table '{table}' has a row with a missing or malformed '{column}'"))
}

/// Catalog resources held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    resources: AHashMap<ResourceIdentifier, ResourceRecord>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, record: ResourceRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn insert(&mut self, record: ResourceRecord) {
        self.resources.insert(record.resource, record);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

impl ResourceCatalog for MemoryCatalog {
    fn find_resource(
        &self,
        resource: ResourceIdentifier,
    ) -> Result<Option<ResourceRecord>, StoreError> {
        Ok(self.resources.get(&resource).cloned())
    }
}

/// JSON fixture describing a geometry store and a catalog.
///
/// ```json
/// {
///   "config": { "uriColumn": "uri" },
///   "tables": { "fused": [ { "uri": "http://a", "name": "Cafe" } ] },
///   "resources": [ { "resource": { "id": 1, "version": 1 }, "name": "OSM" } ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(default)]
    pub config: StoreConfig,
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<Value>>,
    #[serde(default)]
    pub resources: Vec<ResourceRecord>,
}

impl StoreDocument {
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        serde_json::from_str(json).map_err(|e| StoreError::Backend(e.to_string()))
    }

    pub fn into_parts(self) -> (MemoryFeatureStore, MemoryCatalog) {
        let store = self
            .tables
            .into_iter()
            .fold(MemoryFeatureStore::with_config(self.config), |store, (name, rows)| {
                store.with_table(&name, rows)
            });
        let catalog = self
            .resources
            .into_iter()
            .fold(MemoryCatalog::new(), MemoryCatalog::with_resource);
        (store, catalog)
    }
}
