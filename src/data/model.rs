use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::Serialize;

// ---------------------------------------------------------------------------
// Column names
// ---------------------------------------------------------------------------

pub const SURVIVED: &str = "Survived";
pub const PCLASS: &str = "Pclass";
pub const SEX: &str = "Sex";
pub const AGE: &str = "Age";
pub const SIBSP: &str = "SibSp";
pub const PARCH: &str = "Parch";
pub const FARE: &str = "Fare";
pub const EMBARKED: &str = "Embarked";
/// Derived unit weight, 1 for every passenger.
pub const COUNT: &str = "count";

/// Columns every source must provide.
pub const REQUIRED_COLUMNS: [&str; 8] = [SURVIVED, PCLASS, SEX, AGE, SIBSP, PARCH, FARE, EMBARKED];

/// Columns offered as a numeric measure in the plot options.
pub const MEASURE_COLUMNS: [&str; 5] = [COUNT, FARE, AGE, SIBSP, PARCH];

// ---------------------------------------------------------------------------
// CellValue – a single cell of the passenger table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the dtypes a CSV column can take.
/// Used as a `BTreeSet` key by the filter engine so it must be `Ord`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    /// Nulls, then booleans, then numbers, then strings.
    /// Integers and floats share one numeric axis; on a numeric tie the
    /// integer sorts first so the order stays consistent with `Eq`.
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        fn rank(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                String(_) => 3,
            }
        }
        let (ra, rb) = (rank(self), rank(other));
        if ra != rb {
            return ra.cmp(&rb);
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (String(a), String(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::String(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

/// Text read as a missing value, the default `na_values` of `pandas.read_csv`.
const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

impl CellValue {
    /// Numeric view of the cell, `None` for non-numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Guess the type of a raw text cell. Empty text and the usual
    /// missing-value markers (`NA`, `NULL`, `nan`, ...) are null.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || NA_TOKENS.contains(&s) {
            return CellValue::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return CellValue::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            if f.is_nan() {
                return CellValue::Null;
            }
            return CellValue::Float(f);
        }
        if s == "true" || s == "false" {
            return CellValue::Bool(s == "true");
        }
        CellValue::String(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Passenger – one row of the table
// ---------------------------------------------------------------------------

/// A single cleaned passenger row: required columns, passthrough columns
/// and the derived `count`.
#[derive(Debug, Clone, PartialEq)]
pub struct Passenger {
    pub cells: BTreeMap<String, CellValue>,
}

impl Passenger {
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// Cell value, treating a missing column as null.
    pub fn value(&self, column: &str) -> &CellValue {
        static NULL: CellValue = CellValue::Null;
        self.cells.get(column).unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// PassengerDataset – the complete loaded table
// ---------------------------------------------------------------------------

/// Process-unique identity of a loaded dataset, used as a cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatasetId(u64);

impl DatasetId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DatasetId(NEXT.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// The cleaned dataset. Immutable once built.
#[derive(Debug, Clone)]
pub struct PassengerDataset {
    id: DatasetId,
    /// Passengers in source order.
    pub passengers: Vec<Passenger>,
    /// Column names in source header order, `count` last.
    pub column_names: Vec<String>,
    /// Rows dropped while cleaning.
    pub dropped_rows: usize,
}

impl PassengerDataset {
    pub fn new(passengers: Vec<Passenger>, column_names: Vec<String>, dropped_rows: usize) -> Self {
        PassengerDataset {
            id: DatasetId::next(),
            passengers,
            column_names,
            dropped_rows,
        }
    }

    pub fn id(&self) -> DatasetId {
        self.id
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Number of passengers.
    pub fn len(&self) -> usize {
        self.passengers.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn numbers_sort_numerically_across_kinds() {
        let set: BTreeSet<CellValue> = [
            CellValue::Float(28.5),
            CellValue::Integer(3),
            CellValue::Integer(40),
            CellValue::Float(0.42),
        ]
        .into_iter()
        .collect();
        let sorted: Vec<f64> = set.iter().filter_map(CellValue::as_f64).collect();
        assert_eq!(sorted, vec![0.42, 3.0, 28.5, 40.0]);
    }

    #[test]
    fn integer_and_equal_float_stay_distinct() {
        let a = CellValue::Integer(1);
        let b = CellValue::Float(1.0);
        assert_ne!(a, b);
        assert_eq!(a.cmp(&b), Ordering::Less);
        assert_eq!(b.cmp(&a), Ordering::Greater);
    }

    #[test]
    fn parse_guesses_types() {
        assert_eq!(CellValue::parse(""), CellValue::Null);
        assert_eq!(CellValue::parse("3"), CellValue::Integer(3));
        assert_eq!(CellValue::parse("7.25"), CellValue::Float(7.25));
        assert_eq!(CellValue::parse("S"), CellValue::from("S"));
        assert_eq!(CellValue::parse("true"), CellValue::Bool(true));
    }

    #[test]
    fn missing_value_markers_are_null() {
        for token in ["NA", "N/A", "NULL", "null", "nan", "NaN", "None", " <NA> "] {
            assert_eq!(CellValue::parse(token), CellValue::Null, "{token:?}");
        }
        assert_eq!(CellValue::parse("Nan"), CellValue::from("Nan"));
    }

    #[test]
    fn datasets_get_distinct_ids() {
        let a = PassengerDataset::new(Vec::new(), Vec::new(), 0);
        let b = PassengerDataset::new(Vec::new(), Vec::new(), 0);
        assert_ne!(a.id(), b.id());
    }
}
