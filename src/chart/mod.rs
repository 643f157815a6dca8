//! Chart layer: turns a filtered view plus role assignments into a
//! renderer-ready chart description.
//!
//! ```text
//!   FilteredView + PlotRequest
//!            │
//!            ▼
//!     ┌─────────────┐
//!     │ build_plot  │  validate roles → aggregate per chart kind
//!     └─────────────┘
//!            │
//!            ▼
//!        ChartSpec     (ui::plot draws it, export writes it as JSON)
//! ```

pub mod axis;
pub mod treemap;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::data::filter::FilteredView;
use crate::data::model::{CellValue, Passenger};
use crate::error::{ExplorerError, Result};
use axis::{Axis, Binning};
use treemap::TreeNode;

/// Heatmap axes with more distinct numeric values than this are binned.
pub const HEATMAP_MAX_BINS: usize = 10;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum ChartKind {
    #[default]
    Bar,
    Pie,
    Scatter,
    Heatmap,
    Treemap,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Bar,
        ChartKind::Pie,
        ChartKind::Scatter,
        ChartKind::Heatmap,
        ChartKind::Treemap,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar",
            ChartKind::Pie => "Pie",
            ChartKind::Scatter => "Scatter",
            ChartKind::Heatmap => "Heatmap",
            ChartKind::Treemap => "Treemap",
        }
    }

    pub fn uses_secondary(self) -> bool {
        matches!(self, ChartKind::Scatter | ChartKind::Heatmap | ChartKind::Treemap)
    }

    pub fn uses_tertiary(self) -> bool {
        matches!(self, ChartKind::Treemap)
    }

    pub fn uses_color(self) -> bool {
        matches!(self, ChartKind::Bar | ChartKind::Scatter | ChartKind::Treemap)
    }
}

/// Role-to-column bindings chosen in the plot options panel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlotRequest {
    pub kind: ChartKind,
    pub primary: Option<String>,
    pub secondary: Option<String>,
    pub tertiary: Option<String>,
    pub color: Option<String>,
    pub measure: Option<String>,
}

// ---------------------------------------------------------------------------
// Chart descriptions
// ---------------------------------------------------------------------------

/// Observed range of a numeric color column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorScale {
    pub min: f64,
    pub max: f64,
}

/// Stacked bars, all series sharing `xs`. A categorical color column gives
/// one series per value; a numeric one gives a single shaded series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSpec {
    pub x: Axis,
    pub y: String,
    pub color: Option<String>,
    pub color_scale: Option<ColorScale>,
    pub xs: Vec<f64>,
    pub bar_width: f64,
    pub series: Vec<BarSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub group: Option<CellValue>,
    /// Summed measure per entry of `BarSpec::xs`.
    pub values: Vec<f64>,
    /// Mean color value per entry of `BarSpec::xs`; empty without a scale.
    pub shades: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSpec {
    pub names: String,
    pub values: String,
    /// Largest slice first.
    pub slices: Vec<PieSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: CellValue,
    pub value: f64,
    pub fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSpec {
    pub x: Axis,
    pub y: Axis,
    pub size: String,
    pub color: Option<String>,
    pub color_scale: Option<ColorScale>,
    /// Largest size value, for scaling markers.
    pub max_size: f64,
    pub series: Vec<ScatterSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterSeries {
    pub group: Option<CellValue>,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub x: f64,
    pub y: f64,
    pub size: f64,
    /// Color value when the color column is numeric.
    pub shade: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapSpec {
    pub x_title: String,
    pub y_title: String,
    pub z: String,
    pub x_bins: Vec<String>,
    pub y_bins: Vec<String>,
    /// `cells[row][col]`: rows follow `y_bins`, columns `x_bins`.
    pub cells: Vec<Vec<f64>>,
    pub show_values: bool,
}

impl HeatmapSpec {
    pub fn max(&self) -> f64 {
        self.cells
            .iter()
            .flatten()
            .copied()
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreemapSpec {
    pub path: Vec<String>,
    pub values: String,
    pub color: Option<String>,
    pub root: TreeNode,
}

/// Everything the renderer needs for one chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind")]
pub enum ChartSpec {
    Bar(BarSpec),
    Pie(PieSpec),
    Scatter(ScatterSpec),
    Heatmap(HeatmapSpec),
    Treemap(TreemapSpec),
}

impl ChartSpec {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartSpec::Bar(_) => ChartKind::Bar,
            ChartSpec::Pie(_) => ChartKind::Pie,
            ChartSpec::Scatter(_) => ChartKind::Scatter,
            ChartSpec::Heatmap(_) => ChartKind::Heatmap,
            ChartSpec::Treemap(_) => ChartKind::Treemap,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Build the chart described by `request` from the passengers in `view`.
pub fn build_plot(view: &FilteredView, request: &PlotRequest) -> Result<ChartSpec> {
    let kind = request.kind;
    let measure = require_measure(view, kind, request.measure.as_deref())?;
    let primary = require(view, kind, "1st variable", request.primary.as_deref())?;

    let spec = match kind {
        ChartKind::Bar => {
            let color = optional(view, request.color.as_deref())?;
            ChartSpec::Bar(bar(view, primary, measure, color))
        }
        ChartKind::Pie => ChartSpec::Pie(pie(view, primary, measure)),
        ChartKind::Scatter => {
            let secondary = require(view, kind, "2nd variable", request.secondary.as_deref())?;
            let color = optional(view, request.color.as_deref())?;
            ChartSpec::Scatter(scatter(view, primary, secondary, measure, color))
        }
        ChartKind::Heatmap => {
            let secondary = require(view, kind, "2nd variable", request.secondary.as_deref())?;
            ChartSpec::Heatmap(heatmap(view, primary, secondary, measure))
        }
        ChartKind::Treemap => {
            let secondary = require(view, kind, "2nd variable", request.secondary.as_deref())?;
            let tertiary = require(view, kind, "3rd variable", request.tertiary.as_deref())?;
            let color = optional(view, request.color.as_deref())?;
            let path = [primary, secondary, tertiary];
            ChartSpec::Treemap(TreemapSpec {
                path: path.iter().map(|c| c.to_string()).collect(),
                values: measure.to_string(),
                color: color.map(str::to_string),
                root: treemap::build_tree(view, &path, measure, color),
            })
        }
    };
    log::debug!("Built {} chart over {} passengers", kind.label(), view.len());
    Ok(spec)
}

fn require<'a>(
    view: &FilteredView,
    kind: ChartKind,
    role: &str,
    column: Option<&'a str>,
) -> Result<&'a str> {
    let column = column.ok_or_else(|| {
        ExplorerError::InvalidPlotRequest(format!("{} chart needs a {role}", kind.label()))
    })?;
    check_column(view, column)?;
    Ok(column)
}

fn optional<'a>(view: &FilteredView, column: Option<&'a str>) -> Result<Option<&'a str>> {
    column.map(|c| check_column(view, c).map(|()| c)).transpose()
}

fn check_column(view: &FilteredView, column: &str) -> Result<()> {
    if view.has_column(column) {
        Ok(())
    } else {
        Err(ExplorerError::InvalidPlotRequest(format!(
            "column '{column}' is not in the data"
        )))
    }
}

/// The measure must be a column of numbers (nulls allowed).
fn require_measure<'a>(
    view: &FilteredView,
    kind: ChartKind,
    column: Option<&'a str>,
) -> Result<&'a str> {
    let column = require(view, kind, "numeric variable", column)?;
    let numeric = view
        .dataset()
        .passengers
        .iter()
        .map(|p| p.value(column))
        .all(|v| v.is_null() || v.as_f64().is_some());
    if !numeric {
        return Err(ExplorerError::InvalidPlotRequest(format!(
            "numeric variable '{column}' holds non-numeric values"
        )));
    }
    Ok(column)
}

fn measure_of(p: &Passenger, measure: &str) -> f64 {
    p.value(measure).as_f64().unwrap_or(0.0)
}

/// Range of `column` over the view when all its non-null values are
/// numbers. `None` for categorical or empty columns.
fn color_scale(view: &FilteredView, column: &str) -> Option<ColorScale> {
    let mut scale: Option<ColorScale> = None;
    for v in view.iter().map(|p| p.value(column)).filter(|v| !v.is_null()) {
        let x = v.as_f64()?;
        scale = Some(match scale {
            None => ColorScale { min: x, max: x },
            Some(s) => ColorScale {
                min: s.min.min(x),
                max: s.max.max(x),
            },
        });
    }
    scale
}

// ---------------------------------------------------------------------------
// Per-kind construction
// ---------------------------------------------------------------------------

fn bar(view: &FilteredView, x: &str, y: &str, color: Option<&str>) -> BarSpec {
    let axis = Axis::for_column(view, x);
    let scale = color.and_then(|c| color_scale(view, c));

    // group → x position (as bits, so it can key a map) → sum
    let mut sums: BTreeMap<Option<CellValue>, BTreeMap<u64, f64>> = BTreeMap::new();
    // x position → (sum, count) of the numeric color column
    let mut shade_sums: BTreeMap<u64, (f64, usize)> = BTreeMap::new();
    let mut positions: Vec<f64> = Vec::new();
    for p in view.iter() {
        let Some(pos) = axis.position(p.value(x)) else {
            continue;
        };
        // Fold -0.0 into 0.0 so both share one key.
        let pos = pos + 0.0;
        let group = match (color, scale) {
            (Some(c), None) => Some(p.value(c).clone()),
            _ => None,
        };
        *sums.entry(group).or_default().entry(pos.to_bits()).or_insert(0.0) +=
            measure_of(p, y);
        if let (Some(c), Some(_)) = (color, scale) {
            if let Some(shade) = p.value(c).as_f64() {
                let entry = shade_sums.entry(pos.to_bits()).or_insert((0.0, 0));
                entry.0 += shade;
                entry.1 += 1;
            }
        }
        positions.push(pos);
    }
    positions.sort_by(f64::total_cmp);
    positions.dedup();

    let series = sums
        .into_iter()
        .map(|(group, by_x)| BarSeries {
            group,
            values: positions
                .iter()
                .map(|pos| by_x.get(&pos.to_bits()).copied().unwrap_or(0.0))
                .collect(),
            shades: match scale {
                Some(_) => positions
                    .iter()
                    .map(|pos| {
                        shade_sums
                            .get(&pos.to_bits())
                            .map(|&(sum, n)| sum / n as f64)
                    })
                    .collect(),
                None => Vec::new(),
            },
        })
        .collect();

    let min_gap = positions
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);
    let bar_width = if min_gap.is_finite() && axis.is_numeric() {
        min_gap * 0.8
    } else {
        0.8
    };

    BarSpec {
        x: axis,
        y: y.to_string(),
        color: color.map(str::to_string),
        color_scale: scale,
        xs: positions,
        bar_width,
        series,
    }
}

fn pie(view: &FilteredView, names: &str, values: &str) -> PieSpec {
    let mut sums: BTreeMap<CellValue, f64> = BTreeMap::new();
    for p in view.iter() {
        let name = p.value(names);
        if name.is_null() {
            continue;
        }
        *sums.entry(name.clone()).or_insert(0.0) += measure_of(p, values);
    }
    let total: f64 = sums.values().sum();

    let mut slices: Vec<PieSlice> = sums
        .into_iter()
        .map(|(label, value)| PieSlice {
            label,
            value,
            fraction: if total > 0.0 { value / total } else { 0.0 },
        })
        .collect();
    // Stable sort keeps label order among equal slices.
    slices.sort_by(|a, b| b.value.total_cmp(&a.value));

    PieSpec {
        names: names.to_string(),
        values: values.to_string(),
        slices,
    }
}

fn scatter(
    view: &FilteredView,
    x: &str,
    y: &str,
    size: &str,
    color: Option<&str>,
) -> ScatterSpec {
    let x_axis = Axis::for_column(view, x);
    let y_axis = Axis::for_column(view, y);
    let scale = color.and_then(|c| color_scale(view, c));

    let mut groups: BTreeMap<Option<CellValue>, Vec<ScatterPoint>> = BTreeMap::new();
    let mut max_size: f64 = 0.0;
    for p in view.iter() {
        let (Some(px), Some(py), Some(s)) = (
            x_axis.position(p.value(x)),
            y_axis.position(p.value(y)),
            p.value(size).as_f64(),
        ) else {
            continue;
        };
        max_size = max_size.max(s);
        let (group, shade) = match (color, scale) {
            (Some(c), None) => (Some(p.value(c).clone()), None),
            (Some(c), Some(_)) => (None, p.value(c).as_f64()),
            (None, _) => (None, None),
        };
        groups.entry(group).or_default().push(ScatterPoint {
            x: px,
            y: py,
            size: s,
            shade,
        });
    }

    ScatterSpec {
        x: x_axis,
        y: y_axis,
        size: size.to_string(),
        color: color.map(str::to_string),
        color_scale: scale,
        max_size,
        series: groups
            .into_iter()
            .map(|(group, points)| ScatterSeries { group, points })
            .collect(),
    }
}

fn heatmap(view: &FilteredView, x: &str, y: &str, z: &str) -> HeatmapSpec {
    let x_bins = Binning::for_column(view, x, HEATMAP_MAX_BINS);
    let y_bins = Binning::for_column(view, y, HEATMAP_MAX_BINS);

    let mut cells = vec![vec![0.0; x_bins.len()]; y_bins.len()];
    for p in view.iter() {
        let (Some(col), Some(row)) = (x_bins.bin_of(p.value(x)), y_bins.bin_of(p.value(y))) else {
            continue;
        };
        cells[row][col] += measure_of(p, z);
    }

    HeatmapSpec {
        x_title: x.to_string(),
        y_title: y.to_string(),
        z: z.to_string(),
        x_bins: x_bins.labels(),
        y_bins: y_bins.labels(),
        cells,
        show_values: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{FilterState, apply_filters};
    use crate::data::loader::{parse_csv, tests::SAMPLE_CSV};
    use crate::data::model::{AGE, COUNT, EMBARKED, FARE, PCLASS, SEX, SURVIVED};
    use std::sync::Arc;

    fn view() -> FilteredView {
        FilteredView::full(Arc::new(parse_csv(SAMPLE_CSV.as_bytes()).unwrap()))
    }

    fn request(kind: ChartKind) -> PlotRequest {
        PlotRequest {
            kind,
            primary: Some(SEX.to_string()),
            secondary: Some(PCLASS.to_string()),
            tertiary: Some(SURVIVED.to_string()),
            color: Some(EMBARKED.to_string()),
            measure: Some(COUNT.to_string()),
        }
    }

    #[test]
    fn every_kind_builds_its_own_chart() {
        let view = view();
        for kind in ChartKind::ALL {
            let spec = build_plot(&view, &request(kind)).unwrap();
            assert_eq!(spec.kind(), kind);
        }
    }

    #[test]
    fn scatter_without_secondary_is_invalid() {
        let mut req = request(ChartKind::Scatter);
        req.secondary = None;
        let err = build_plot(&view(), &req).unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidPlotRequest(_)));
    }

    #[test]
    fn unused_roles_are_ignored() {
        let mut req = request(ChartKind::Pie);
        req.secondary = Some("Lifeboat".to_string());
        req.tertiary = None;
        req.color = Some("Nope".to_string());
        assert!(build_plot(&view(), &req).is_ok());
    }

    #[test]
    fn missing_columns_are_invalid() {
        let mut req = request(ChartKind::Bar);
        req.color = Some("Lifeboat".to_string());
        assert!(matches!(
            build_plot(&view(), &req),
            Err(ExplorerError::InvalidPlotRequest(_))
        ));

        let mut req = request(ChartKind::Heatmap);
        req.measure = None;
        assert!(matches!(
            build_plot(&view(), &req),
            Err(ExplorerError::InvalidPlotRequest(_))
        ));
    }

    #[test]
    fn text_measure_is_invalid() {
        let mut req = request(ChartKind::Bar);
        req.measure = Some("Name".to_string());
        let err = build_plot(&view(), &req).unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidPlotRequest(ref m) if m.contains("Name")));
    }

    #[test]
    fn bars_stack_per_color() {
        let ChartSpec::Bar(spec) = build_plot(&view(), &request(ChartKind::Bar)).unwrap() else {
            panic!("expected a bar chart");
        };
        assert_eq!(spec.xs, vec![0.0, 1.0]);
        assert_eq!(spec.series.len(), 3);

        let totals: Vec<f64> = (0..spec.xs.len())
            .map(|i| spec.series.iter().map(|s| s.values[i]).sum())
            .collect();
        // female, male
        assert_eq!(totals, vec![3.0, 2.0]);
    }

    #[test]
    fn pie_fractions_sum_to_one() {
        let mut req = request(ChartKind::Pie);
        req.primary = Some(PCLASS.to_string());
        req.measure = Some(FARE.to_string());
        let ChartSpec::Pie(spec) = build_plot(&view(), &req).unwrap() else {
            panic!("expected a pie chart");
        };
        let sum: f64 = spec.slices.iter().map(|s| s.fraction).sum();
        assert!((sum - 1.0).abs() < 1e-9);
        let labels: Vec<String> = spec.slices.iter().map(|s| s.label.to_string()).collect();
        assert_eq!(labels, vec!["1st", "3rd", "2nd"]);
        assert!((spec.slices[1].value - (7.25 + 7.925 + 29.125)).abs() < 1e-9);
    }

    #[test]
    fn scatter_has_a_point_per_passenger() {
        let mut req = request(ChartKind::Scatter);
        req.primary = Some(AGE.to_string());
        req.secondary = Some(FARE.to_string());
        req.measure = Some("SibSp".to_string());
        let ChartSpec::Scatter(spec) = build_plot(&view(), &req).unwrap() else {
            panic!("expected a scatter chart");
        };
        let points: usize = spec.series.iter().map(|s| s.points.len()).sum();
        assert_eq!(points, 5);
        assert_eq!(spec.max_size, 4.0);
        assert!(spec.x.is_numeric());
    }

    #[test]
    fn heatmap_sums_per_cell() {
        let ChartSpec::Heatmap(spec) = build_plot(&view(), &request(ChartKind::Heatmap)).unwrap()
        else {
            panic!("expected a heatmap");
        };
        assert_eq!(spec.x_bins, vec!["female", "male"]);
        assert_eq!(spec.y_bins, vec!["1st", "2nd", "3rd"]);
        // female 3rd: Heikkinen only; male 3rd: Braund and Rice.
        assert_eq!(spec.cells[2], vec![1.0, 2.0]);
        assert_eq!(spec.max(), 2.0);
        assert!(spec.show_values);
    }

    #[test]
    fn charts_follow_the_filtered_view() {
        let ds = Arc::new(parse_csv(SAMPLE_CSV.as_bytes()).unwrap());
        let mut filters = FilterState::full(&ds).unwrap();
        filters.select(SEX, [CellValue::from("male")]).unwrap();
        let view = apply_filters(&ds, &filters);

        let ChartSpec::Treemap(spec) = build_plot(&view, &request(ChartKind::Treemap)).unwrap()
        else {
            panic!("expected a treemap");
        };
        assert_eq!(spec.root.value, 2.0);
        assert_eq!(spec.root.children.len(), 1);
    }

    #[test]
    fn numeric_color_shades_a_single_bar_series() {
        let mut req = request(ChartKind::Bar);
        req.color = Some(AGE.to_string());
        let ChartSpec::Bar(spec) = build_plot(&view(), &req).unwrap() else {
            panic!("expected a bar chart");
        };
        assert_eq!(spec.color_scale, Some(ColorScale { min: 2.0, max: 38.0 }));
        assert_eq!(spec.series.len(), 1);
        assert_eq!(spec.series[0].group, None);
        assert_eq!(spec.series[0].values, vec![3.0, 2.0]);
        // female: 38, 26, 14; male: 22, 2
        assert_eq!(spec.series[0].shades, vec![Some(26.0), Some(12.0)]);
    }

    #[test]
    fn numeric_color_shades_scatter_points() {
        let mut req = request(ChartKind::Scatter);
        req.primary = Some(AGE.to_string());
        req.secondary = Some(FARE.to_string());
        req.color = Some(FARE.to_string());
        let ChartSpec::Scatter(spec) = build_plot(&view(), &req).unwrap() else {
            panic!("expected a scatter chart");
        };
        assert_eq!(spec.series.len(), 1);
        let scale = spec.color_scale.unwrap();
        assert_eq!((scale.min, scale.max), (7.25, 71.2833));
        assert!(spec.series[0].points.iter().all(|p| p.shade == Some(p.y)));
    }

    #[test]
    fn missing_value_markers_keep_age_numeric() {
        let csv = "Survived,Pclass,Sex,Age,SibSp,Parch,Fare,Embarked\n\
                   1,1,female,NA,0,0,10,S\n\
                   0,3,male,30,0,0,8.05,S\n";
        let ds = Arc::new(parse_csv(csv.as_bytes()).unwrap());
        let filters = FilterState::full(&ds).unwrap();
        let view = apply_filters(&ds, &filters);
        assert_eq!(view.len(), ds.len());

        let mut req = request(ChartKind::Bar);
        req.measure = Some(AGE.to_string());
        assert!(build_plot(&view, &req).is_ok());
    }

    #[test]
    fn specs_serialize_with_their_kind() {
        let spec = build_plot(&view(), &request(ChartKind::Pie)).unwrap();
        let json: serde_json::Value = serde_json::from_str(&spec.to_json().unwrap()).unwrap();
        assert_eq!(json["kind"], "Pie");
        assert_eq!(json["names"], SEX);
    }
}
