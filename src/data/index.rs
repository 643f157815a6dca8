use std::collections::{BTreeSet, HashMap};

use super::model::{CellValue, DatasetId, PassengerDataset};
use crate::error::{ExplorerError, Result};

/// Sorted, deduplicated non-null values of `column`.
pub fn distinct_values(dataset: &PassengerDataset, column: &str) -> Result<Vec<CellValue>> {
    if !dataset.has_column(column) {
        return Err(ExplorerError::UnknownColumn(column.to_string()));
    }
    let values: BTreeSet<CellValue> = dataset
        .passengers
        .iter()
        .map(|p| p.value(column))
        .filter(|v| !v.is_null())
        .cloned()
        .collect();
    Ok(values.into_iter().collect())
}

/// Observed `(min, max)` over the numeric values of `column`.
pub fn numeric_bounds(dataset: &PassengerDataset, column: &str) -> Result<(f64, f64)> {
    bounds_of(&distinct_values(dataset, column)?)
        .ok_or_else(|| ExplorerError::UnknownColumn(format!("{column} (no numeric values)")))
}

fn bounds_of(values: &[CellValue]) -> Option<(f64, f64)> {
    values
        .iter()
        .filter_map(CellValue::as_f64)
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

// ---------------------------------------------------------------------------
// Per-column cache of distinct values
// ---------------------------------------------------------------------------

/// Distinct values per column for one dataset.
///
/// Entries belong to the dataset they were computed from; asking about a
/// different dataset drops everything first.
#[derive(Debug, Default)]
pub struct ValueIndex {
    dataset: Option<DatasetId>,
    columns: HashMap<String, Vec<CellValue>>,
}

impl ValueIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&mut self, dataset: &PassengerDataset, column: &str) -> Result<&[CellValue]> {
        if self.dataset != Some(dataset.id()) {
            self.invalidate();
            self.dataset = Some(dataset.id());
        }
        if !self.columns.contains_key(column) {
            let values = distinct_values(dataset, column)?;
            self.columns.insert(column.to_string(), values);
        }
        Ok(self.columns.get(column).map(Vec::as_slice).unwrap_or_default())
    }

    pub fn bounds(&mut self, dataset: &PassengerDataset, column: &str) -> Result<(f64, f64)> {
        bounds_of(self.values(dataset, column)?)
            .ok_or_else(|| ExplorerError::UnknownColumn(format!("{column} (no numeric values)")))
    }

    pub fn invalidate(&mut self) {
        self.dataset = None;
        self.columns.clear();
    }

    #[cfg(test)]
    fn cached_columns(&self) -> usize {
        self.columns.len()
    }
}
