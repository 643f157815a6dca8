use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use super::index::ValueIndex;
use super::model::{
    AGE, CellValue, EMBARKED, FARE, PARCH, PCLASS, Passenger, PassengerDataset, SEX, SIBSP,
    SURVIVED,
};
use crate::error::{ExplorerError, Result};

/// Columns filtered by set membership (multi-select checklists).
pub const CATEGORICAL_COLUMNS: [&str; 4] = [SURVIVED, PCLASS, SEX, EMBARKED];

/// Columns filtered by an inclusive range (range sliders).
pub const NUMERIC_COLUMNS: [&str; 4] = [AGE, SIBSP, PARCH, FARE];

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Inclusive `[lo, hi]` bound on a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericRange {
    pub lo: f64,
    pub hi: f64,
}

impl NumericRange {
    pub fn new(lo: f64, hi: f64) -> Self {
        NumericRange { lo, hi }
    }

    /// Non-numeric values (nulls included) never match.
    pub fn contains(&self, value: &CellValue) -> bool {
        value.as_f64().is_some_and(|v| self.lo <= v && v <= self.hi)
    }
}

/// Selected values per categorical column and bounds per numeric column.
///
/// An empty selection means "nothing selected": every passenger fails it.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    categorical: BTreeMap<String, BTreeSet<CellValue>>,
    numeric: BTreeMap<String, NumericRange>,
}

impl FilterState {
    /// Every value selected and every range at its observed extent,
    /// i.e. the state that lets the whole dataset through.
    pub fn full(dataset: &PassengerDataset) -> Result<Self> {
        Self::from_index(dataset, &mut ValueIndex::new())
    }

    /// Same as [`FilterState::full`], reading domains through a shared index.
    pub fn from_index(dataset: &PassengerDataset, index: &mut ValueIndex) -> Result<Self> {
        let mut categorical = BTreeMap::new();
        for col in CATEGORICAL_COLUMNS {
            let values = index.values(dataset, col)?.iter().cloned().collect();
            categorical.insert(col.to_string(), values);
        }
        let mut numeric = BTreeMap::new();
        for col in NUMERIC_COLUMNS {
            // An empty dataset has no observed range; nothing can fail it.
            let (lo, hi) = if dataset.is_empty() {
                (f64::NEG_INFINITY, f64::INFINITY)
            } else {
                index.bounds(dataset, col)?
            };
            numeric.insert(col.to_string(), NumericRange::new(lo, hi));
        }
        Ok(FilterState {
            categorical,
            numeric,
        })
    }

    pub fn selected(&self, column: &str) -> Result<&BTreeSet<CellValue>> {
        self.categorical
            .get(column)
            .ok_or_else(|| ExplorerError::UnknownColumn(column.to_string()))
    }

    /// Replace the selection of a categorical column.
    pub fn select(
        &mut self,
        column: &str,
        values: impl IntoIterator<Item = CellValue>,
    ) -> Result<()> {
        let selected = self
            .categorical
            .get_mut(column)
            .ok_or_else(|| ExplorerError::UnknownColumn(column.to_string()))?;
        *selected = values.into_iter().collect();
        Ok(())
    }

    /// Flip one value in or out of a selection. Returns whether it is now selected.
    pub fn toggle(&mut self, column: &str, value: &CellValue) -> Result<bool> {
        let selected = self
            .categorical
            .get_mut(column)
            .ok_or_else(|| ExplorerError::UnknownColumn(column.to_string()))?;
        if selected.remove(value) {
            Ok(false)
        } else {
            selected.insert(value.clone());
            Ok(true)
        }
    }

    pub fn range(&self, column: &str) -> Result<NumericRange> {
        self.numeric
            .get(column)
            .copied()
            .ok_or_else(|| ExplorerError::UnknownColumn(column.to_string()))
    }

    pub fn set_range(&mut self, column: &str, lo: f64, hi: f64) -> Result<()> {
        let range = self
            .numeric
            .get_mut(column)
            .ok_or_else(|| ExplorerError::UnknownColumn(column.to_string()))?;
        *range = NumericRange::new(lo, hi);
        Ok(())
    }

    /// Conjunction of every per-column predicate.
    pub fn matches(&self, passenger: &Passenger) -> bool {
        self.categorical
            .iter()
            .all(|(col, selected)| selected.contains(passenger.value(col)))
            && self
                .numeric
                .iter()
                .all(|(col, range)| range.contains(passenger.value(col)))
    }
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// The passengers of a dataset that passed a filter, in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView {
    dataset: Arc<PassengerDataset>,
    indices: Vec<usize>,
}

impl FilteredView {
    /// The identity view: every passenger.
    pub fn full(dataset: Arc<PassengerDataset>) -> Self {
        let indices = (0..dataset.len()).collect();
        FilteredView { dataset, indices }
    }

    pub fn dataset(&self) -> &Arc<PassengerDataset> {
        &self.dataset
    }

    /// Dataset row indices of the visible passengers.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn iter(&self) -> impl Iterator<Item = &Passenger> + '_ {
        self.indices.iter().map(|&i| &self.dataset.passengers[i])
    }

    pub fn column_names(&self) -> &[String] {
        &self.dataset.column_names
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.dataset.has_column(column)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Passengers satisfying every predicate of `filters`, order preserved.
pub fn apply_filters(dataset: &Arc<PassengerDataset>, filters: &FilterState) -> FilteredView {
    let indices = dataset
        .passengers
        .iter()
        .enumerate()
        .filter(|(_, p)| filters.matches(p))
        .map(|(i, _)| i)
        .collect();
    FilteredView {
        dataset: Arc::clone(dataset),
        indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{parse_csv, tests::SAMPLE_CSV};

    const THREE_PASSENGERS: &str = "\
Survived,Pclass,Sex,Age,SibSp,Parch,Fare,Embarked
1,1,male,22,0,0,71.28,C
0,3,female,38,1,0,7.25,S
1,2,female,26,0,0,13.00,Q
";

    fn dataset(csv: &str) -> Arc<PassengerDataset> {
        Arc::new(parse_csv(csv.as_bytes()).unwrap())
    }

    #[test]
    fn survivors_only() {
        let ds = dataset(THREE_PASSENGERS);
        let mut filters = FilterState::full(&ds).unwrap();
        filters.select(SURVIVED, [CellValue::from("Yes")]).unwrap();
        filters.set_range(AGE, 0.0, 100.0).unwrap();
        filters.set_range(SIBSP, 0.0, 10.0).unwrap();
        filters.set_range(PARCH, 0.0, 10.0).unwrap();
        filters.set_range(FARE, 0.0, 1000.0).unwrap();

        let view = apply_filters(&ds, &filters);
        assert_eq!(view.indices(), &[0, 2]);
    }

    #[test]
    fn full_state_is_identity() {
        let ds = dataset(SAMPLE_CSV);
        let filters = FilterState::full(&ds).unwrap();
        let view = apply_filters(&ds, &filters);
        assert_eq!(view.len(), ds.len());
        assert_eq!(view.indices(), FilteredView::full(Arc::clone(&ds)).indices());
    }

    #[test]
    fn empty_selection_excludes_everything() {
        let ds = dataset(SAMPLE_CSV);
        for col in CATEGORICAL_COLUMNS {
            let mut filters = FilterState::full(&ds).unwrap();
            filters.select(col, Vec::new()).unwrap();
            assert!(apply_filters(&ds, &filters).is_empty(), "{col}");
        }
    }

    #[test]
    fn ranges_are_inclusive() {
        let ds = dataset(THREE_PASSENGERS);
        let mut filters = FilterState::full(&ds).unwrap();
        filters.set_range(AGE, 22.0, 26.0).unwrap();
        assert_eq!(apply_filters(&ds, &filters).indices(), &[0, 2]);

        filters.set_range(AGE, 22.5, 25.5).unwrap();
        assert!(apply_filters(&ds, &filters).is_empty());
    }

    #[test]
    fn result_is_exactly_the_conjunction() {
        let ds = dataset(SAMPLE_CSV);
        let mut filters = FilterState::full(&ds).unwrap();
        filters
            .select(SEX, [CellValue::from("female")])
            .unwrap();
        filters.set_range(FARE, 0.0, 50.0).unwrap();

        let view = apply_filters(&ds, &filters);
        for (i, p) in ds.passengers.iter().enumerate() {
            let expected = p.value(SEX) == &CellValue::from("female")
                && p.value(FARE).as_f64().is_some_and(|f| f <= 50.0);
            assert_eq!(view.indices().contains(&i), expected, "row {i}");
        }
        assert!(view.indices().windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn narrowing_never_grows_the_view() {
        let ds = dataset(SAMPLE_CSV);
        let mut filters = FilterState::full(&ds).unwrap();
        let mut previous = apply_filters(&ds, &filters).len();

        let steps: [(&str, f64, f64); 4] = [
            (FARE, 7.0, 75.0),
            (AGE, 10.0, 40.0),
            (SIBSP, 0.0, 1.0),
            (AGE, 20.0, 30.0),
        ];
        for (col, lo, hi) in steps {
            filters.set_range(col, lo, hi).unwrap();
            let now = apply_filters(&ds, &filters).len();
            assert!(now <= previous, "{col} [{lo}, {hi}]");
            previous = now;
        }

        filters.toggle(PCLASS, &CellValue::from("3rd")).unwrap();
        assert!(apply_filters(&ds, &filters).len() <= previous);
    }

    #[test]
    fn toggle_flips_membership() {
        let ds = dataset(THREE_PASSENGERS);
        let mut filters = FilterState::full(&ds).unwrap();
        let yes = CellValue::from("Yes");
        assert!(!filters.toggle(SURVIVED, &yes).unwrap());
        assert!(!filters.selected(SURVIVED).unwrap().contains(&yes));
        assert!(filters.toggle(SURVIVED, &yes).unwrap());
        assert!(filters.selected(SURVIVED).unwrap().contains(&yes));
    }

    #[test]
    fn non_filter_columns_are_rejected() {
        let ds = dataset(THREE_PASSENGERS);
        let mut filters = FilterState::full(&ds).unwrap();
        assert!(matches!(
            filters.select("Name", Vec::new()),
            Err(ExplorerError::UnknownColumn(_))
        ));
        assert!(matches!(
            filters.set_range(SEX, 0.0, 1.0),
            Err(ExplorerError::UnknownColumn(_))
        ));
        assert!(filters.range("count").is_err());
    }

    #[test]
    fn empty_dataset_filters_to_empty_view() {
        let csv = "Survived,Pclass,Sex,Age,SibSp,Parch,Fare,Embarked\n";
        let ds = dataset(csv);
        let filters = FilterState::full(&ds).unwrap();
        assert!(apply_filters(&ds, &filters).is_empty());
    }
}
