use std::collections::BTreeSet;

use serde::Serialize;

use crate::data::filter::FilteredView;
use crate::data::model::CellValue;

/// How a column's values map onto one plot axis.
///
/// A column whose non-null values are all numbers keeps its values as
/// positions; anything else places its distinct values at 0, 1, 2, ...
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: String,
    /// `None` for a numeric axis.
    pub categories: Option<Vec<CellValue>>,
}

impl Axis {
    pub fn for_column(view: &FilteredView, column: &str) -> Self {
        let values: BTreeSet<&CellValue> = view
            .iter()
            .map(|p| p.value(column))
            .filter(|v| !v.is_null())
            .collect();
        let numeric = values.iter().all(|v| v.as_f64().is_some());
        Axis {
            title: column.to_string(),
            categories: (!numeric).then(|| values.into_iter().cloned().collect()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.categories.is_none()
    }

    /// Plot position of a value; `None` for nulls and unknown categories.
    pub fn position(&self, value: &CellValue) -> Option<f64> {
        match &self.categories {
            None => value.as_f64(),
            Some(cats) => cats.binary_search(value).ok().map(|i| i as f64),
        }
    }

    /// Tick label for a plot position.
    pub fn label(&self, position: f64) -> String {
        match &self.categories {
            None => format!("{position}"),
            Some(cats) => {
                let i = position.round();
                if (position - i).abs() > 1e-6 || i < 0.0 {
                    return String::new();
                }
                cats.get(i as usize).map(ToString::to_string).unwrap_or_default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Heatmap binning
// ---------------------------------------------------------------------------

/// Bins of one heatmap axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Binning {
    /// One bin per distinct value.
    Categories(Vec<CellValue>),
    /// `count` equal-width bins starting at `start`; the last one is closed.
    Intervals { start: f64, width: f64, count: usize },
}

impl Binning {
    /// Numeric columns with more than `max_bins` distinct values are split
    /// into `max_bins` intervals; everything else gets a bin per value.
    pub fn for_column(view: &FilteredView, column: &str, max_bins: usize) -> Self {
        let values: BTreeSet<CellValue> = view
            .iter()
            .map(|p| p.value(column))
            .filter(|v| !v.is_null())
            .cloned()
            .collect();
        let numbers: Vec<f64> = values.iter().filter_map(CellValue::as_f64).collect();
        let numeric = numbers.len() == values.len();

        if numeric && values.len() > max_bins && max_bins > 0 {
            let start = numbers[0];
            let end = numbers[numbers.len() - 1];
            Binning::Intervals {
                start,
                width: (end - start) / max_bins as f64,
                count: max_bins,
            }
        } else {
            Binning::Categories(values.into_iter().collect())
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Binning::Categories(cats) => cats.len(),
            Binning::Intervals { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bin_of(&self, value: &CellValue) -> Option<usize> {
        match self {
            Binning::Categories(cats) => cats.binary_search(value).ok(),
            Binning::Intervals {
                start,
                width,
                count,
            } => {
                let v = value.as_f64()?;
                if v < *start || *width <= 0.0 {
                    return None;
                }
                let bin = ((v - start) / width).floor() as usize;
                // The maximum lands exactly on the upper edge.
                Some(bin.min(count - 1))
            }
        }
    }

    pub fn labels(&self) -> Vec<String> {
        match self {
            Binning::Categories(cats) => cats.iter().map(ToString::to_string).collect(),
            Binning::Intervals {
                start,
                width,
                count,
            } => (0..*count)
                .map(|i| {
                    let lo = start + width * i as f64;
                    let hi = lo + width;
                    let close = if i + 1 == *count { ']' } else { ')' };
                    format!("[{}, {}{close}", edge(lo), edge(hi))
                })
                .collect(),
        }
    }
}

fn edge(v: f64) -> String {
    let s = format!("{v:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
