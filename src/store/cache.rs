use crate::error::StoreError;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Process-wide cache of table column lists, keyed by table name.
///
/// `get_or_compute` never holds a map lock while computing, so two threads
/// populating the same table may both compute; the first insert wins and
/// both callers observe that value.
#[derive(Debug, Default)]
pub struct ColumnCache {
    columns: DashMap<String, Arc<Vec<String>>>,
}

impl ColumnCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_compute<F>(&self, table_name: &str, compute: F) -> Result<Arc<Vec<String>>, StoreError>
    where
        F: FnOnce() -> Result<Vec<String>, StoreError>,
    {
        if let Some(columns) = self.columns.get(table_name) {
            return Ok(Arc::clone(&columns));
        }

        let computed = Arc::new(compute()?);
        debug!(table = table_name, columns = computed.len(), "Cached table columns");
        let entry = self
            .columns
            .entry(table_name.to_string())
            .or_insert(computed);
        Ok(Arc::clone(&entry))
    }

    /// Forgets the cached columns of `table_name`.
    pub fn invalidate(&self, table_name: &str) {
        self.columns.remove(table_name);
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
