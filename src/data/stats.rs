use serde::Serialize;

use super::model::PassengerDataset;

/// Descriptive statistics of one numeric column, in the layout of
/// `DataFrame.describe()`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// Summaries for every column whose non-null values are all numbers,
/// in column order.
pub fn describe(dataset: &PassengerDataset) -> Vec<ColumnSummary> {
    dataset
        .column_names
        .iter()
        .filter_map(|col| summarize(dataset, col))
        .collect()
}

fn summarize(dataset: &PassengerDataset, column: &str) -> Option<ColumnSummary> {
    let mut values = Vec::with_capacity(dataset.len());
    for p in &dataset.passengers {
        let v = p.value(column);
        if v.is_null() {
            continue;
        }
        values.push(v.as_f64()?);
    }
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });

    Some(ColumnSummary {
        column: column.to_string(),
        count: n,
        mean,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[n - 1],
    })
}

/// Linear interpolation between closest ranks. `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}
