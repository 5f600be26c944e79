use crate::utils::{LoaderError, Result};
use std::collections::HashSet;

/// Ordered target column names plus the coercion metadata tied to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    columns: Vec<String>,
    numeric_null_from: Option<usize>,
    temporal_markers: Vec<String>,
}

impl ColumnSchema {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        if columns.is_empty() {
            return Err(LoaderError::InvalidSchema("column list is empty".to_string()));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.trim().is_empty() {
                return Err(LoaderError::InvalidSchema("blank column name".to_string()));
            }
            if !seen.insert(column.to_ascii_uppercase()) {
                return Err(LoaderError::InvalidSchema(format!(
                    "duplicate column '{}'",
                    column
                )));
            }
        }

        Ok(Self {
            columns,
            numeric_null_from: None,
            temporal_markers: vec!["DATE".to_string(), "TIME".to_string()],
        })
    }

    /// Columns at or after `index` coerce unparseable numerics to null.
    pub fn with_numeric_null_from(mut self, index: Option<usize>) -> Self {
        self.numeric_null_from = index;
        self
    }

    pub fn with_temporal_markers(mut self, markers: Vec<String>) -> Self {
        self.temporal_markers = markers.into_iter().map(|m| m.to_ascii_uppercase()).collect();
        self
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(String::as_str)
    }

    pub fn numeric_null_from(&self) -> Option<usize> {
        self.numeric_null_from
    }

    pub fn nulls_unparseable_numeric(&self, index: usize) -> bool {
        self.numeric_null_from.is_some_and(|start| index >= start)
    }

    pub fn is_temporal(&self, index: usize) -> bool {
        self.name(index).is_some_and(|name| {
            let upper = name.to_ascii_uppercase();
            self.temporal_markers
                .iter()
                .any(|marker| upper.contains(marker.as_str()))
        })
    }
}
