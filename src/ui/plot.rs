use std::f64::consts::TAU;

use eframe::egui::{Color32, RichText, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, Legend, Plot, PlotPoint, PlotPoints, PlotUi, Points, Polygon, Text,
};

use crate::chart::axis::Axis;
use crate::chart::treemap::NodeColor;
use crate::chart::{
    BarSpec, ChartSpec, ColorScale, HeatmapSpec, PieSpec, ScatterSpec, TreemapSpec,
};
use crate::color::{ColorMap, generate_palette, sequential, text_on};
use crate::data::model::CellValue;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Chart (central panel)
// ---------------------------------------------------------------------------

/// Build the chart for the current options and draw it.
pub fn chart_panel(ui: &mut Ui, state: &AppState) {
    let spec = match state.chart() {
        None => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.heading("Open a file to explore passengers  (File → Open…)");
            });
            return;
        }
        Some(Err(e)) => {
            ui.centered_and_justified(|ui: &mut Ui| {
                ui.label(RichText::new(e.to_string()).color(Color32::RED));
            });
            return;
        }
        Some(Ok(spec)) => spec,
    };

    let radius = state.config.max_marker_radius;
    match &spec {
        ChartSpec::Bar(bar) => bar_chart(ui, bar),
        ChartSpec::Pie(pie) => pie_chart(ui, pie),
        ChartSpec::Scatter(scatter) => scatter_chart(ui, scatter, radius),
        ChartSpec::Heatmap(heatmap) => heatmap_chart(ui, heatmap),
        ChartSpec::Treemap(treemap) => treemap_chart(ui, treemap),
    }
}

fn group_colors<'a>(groups: impl Iterator<Item = Option<&'a CellValue>>) -> ColorMap {
    ColorMap::new(groups.flatten())
}

/// Sequential color for a value of a numeric color column.
fn shaded(scale: Option<ColorScale>, value: Option<f64>) -> Option<Color32> {
    let (scale, value) = (scale?, value?);
    Some(sequential(value, scale.min, scale.max))
}

fn series_name(column: Option<&str>, group: Option<&CellValue>, fallback: &str) -> String {
    match (column, group) {
        (Some(col), Some(value)) => format!("{col} = {value}"),
        _ => fallback.to_string(),
    }
}

/// Zoomable plot whose tick labels follow the given axes.
fn show_axis_plot(ui: &mut Ui, id: &str, x: &Axis, y: &Axis, add: impl FnOnce(&mut PlotUi)) {
    let (x, y) = (x.clone(), y.clone());
    Plot::new(id)
        .legend(Legend::default())
        .x_axis_label(x.title.clone())
        .y_axis_label(y.title.clone())
        .x_axis_formatter(move |mark, _range| x.label(mark.value))
        .y_axis_formatter(move |mark, _range| y.label(mark.value))
        .allow_boxed_zoom(true)
        .allow_drag(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, add);
}

// ---------------------------------------------------------------------------
// Bar
// ---------------------------------------------------------------------------

fn bar_chart(ui: &mut Ui, spec: &BarSpec) {
    let colors = group_colors(spec.series.iter().map(|s| s.group.as_ref()));
    let color_col = spec.color.as_deref();

    let y_axis = Axis {
        title: spec.y.clone(),
        categories: None,
    };
    show_axis_plot(ui, "bar_chart", &spec.x, &y_axis, |plot_ui| {
        let mut stacked: Vec<BarChart> = Vec::new();
        for series in &spec.series {
            let color = colors.color_for(series.group.as_ref());
            let bars = spec
                .xs
                .iter()
                .zip(&series.values)
                .enumerate()
                .map(|(i, (&x, &v))| {
                    let shade = series.shades.get(i).copied().flatten();
                    let fill = shaded(spec.color_scale, shade).unwrap_or(color);
                    Bar::new(x, v).width(spec.bar_width).fill(fill)
                })
                .collect();
            let below: Vec<&BarChart> = stacked.iter().collect();
            let chart = BarChart::new(bars)
                .name(series_name(color_col, series.group.as_ref(), &spec.y))
                .color(color)
                .stack_on(&below);
            stacked.push(chart);
        }
        for chart in stacked {
            plot_ui.bar_chart(chart);
        }
    });
}

// ---------------------------------------------------------------------------
// Pie
// ---------------------------------------------------------------------------

fn pie_chart(ui: &mut Ui, spec: &PieSpec) {
    let palette = generate_palette(spec.slices.len());

    Plot::new("pie_chart")
        .legend(Legend::default())
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show(ui, |plot_ui| {
            // Start at twelve o'clock and go clockwise.
            let mut start = TAU / 4.0;
            for (slice, color) in spec.slices.iter().zip(palette) {
                let sweep = slice.fraction * TAU;
                if sweep <= 0.0 {
                    continue;
                }
                let end = start - sweep;
                let steps = ((sweep / TAU) * 120.0).ceil().max(2.0) as usize;
                let mut points = vec![[0.0, 0.0]];
                points.extend((0..=steps).map(|i| {
                    let a = start - sweep * i as f64 / steps as f64;
                    [a.cos(), a.sin()]
                }));
                plot_ui.polygon(
                    Polygon::new(PlotPoints::new(points))
                        .fill_color(color)
                        .stroke(Stroke::new(1.0, Color32::WHITE))
                        .name(slice.label.to_string()),
                );

                let mid = (start + end) / 2.0;
                plot_ui.text(
                    Text::new(
                        PlotPoint::new(0.65 * mid.cos(), 0.65 * mid.sin()),
                        format!("{:.1}%", slice.fraction * 100.0),
                    )
                    .color(text_on(color)),
                );
                start = end;
            }
        });
}

// ---------------------------------------------------------------------------
// Scatter
// ---------------------------------------------------------------------------

fn scatter_chart(ui: &mut Ui, spec: &ScatterSpec, max_radius: f32) {
    let colors = group_colors(spec.series.iter().map(|s| s.group.as_ref()));
    let color_col = spec.color.as_deref();

    show_axis_plot(ui, "scatter_chart", &spec.x, &spec.y, |plot_ui| {
        for series in &spec.series {
            let color = colors.color_for(series.group.as_ref());
            let name = series_name(color_col, series.group.as_ref(), &spec.size);
            for p in &series.points {
                // Marker area grows with the size value.
                let radius = if spec.max_size > 0.0 {
                    (max_radius * (p.size / spec.max_size).sqrt() as f32).max(1.0)
                } else {
                    2.0
                };
                let fill = shaded(spec.color_scale, p.shade).unwrap_or(color);
                plot_ui.points(
                    Points::new(PlotPoints::new(vec![[p.x, p.y]]))
                        .radius(radius)
                        .color(fill)
                        .filled(true)
                        .name(&name),
                );
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Heatmap
// ---------------------------------------------------------------------------

fn heatmap_chart(ui: &mut Ui, spec: &HeatmapSpec) {
    let max = spec.max();
    let x_labels = spec.x_bins.clone();
    let y_labels = spec.y_bins.clone();

    Plot::new("heatmap_chart")
        .x_axis_label(spec.x_title.clone())
        .y_axis_label(spec.y_title.clone())
        .x_axis_formatter(move |mark, _range| bin_label(&x_labels, mark.value))
        .y_axis_formatter(move |mark, _range| bin_label(&y_labels, mark.value))
        .show_grid(false)
        .show(ui, |plot_ui| {
            for (row, cells) in spec.cells.iter().enumerate() {
                for (col, &z) in cells.iter().enumerate() {
                    let (x, y) = (col as f64, row as f64);
                    let fill = sequential(z, 0.0, max);
                    plot_ui.polygon(
                        Polygon::new(PlotPoints::new(vec![
                            [x - 0.5, y - 0.5],
                            [x + 0.5, y - 0.5],
                            [x + 0.5, y + 0.5],
                            [x - 0.5, y + 0.5],
                        ]))
                        .fill_color(fill)
                        .stroke(Stroke::new(0.5, Color32::WHITE)),
                    );
                    if spec.show_values {
                        plot_ui.text(
                            Text::new(PlotPoint::new(x, y), format_value(z)).color(text_on(fill)),
                        );
                    }
                }
            }
        });
}

fn bin_label(labels: &[String], position: f64) -> String {
    let i = position.round();
    if (position - i).abs() > 1e-6 || i < 0.0 {
        return String::new();
    }
    labels.get(i as usize).cloned().unwrap_or_default()
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

// ---------------------------------------------------------------------------
// Treemap
// ---------------------------------------------------------------------------

const TREEMAP_WIDTH: f64 = 160.0;
const TREEMAP_HEIGHT: f64 = 100.0;

fn treemap_chart(ui: &mut Ui, spec: &TreemapSpec) {
    let tiles = spec
        .root
        .layout([0.0, 0.0], [TREEMAP_WIDTH, TREEMAP_HEIGHT]);
    let leaf_depth = spec.path.len();

    let mut categories: Vec<&CellValue> = tiles
        .iter()
        .filter_map(|t| match &t.color {
            NodeColor::Category(v) => Some(v),
            _ => None,
        })
        .collect();
    categories.sort();
    categories.dedup();
    let category_colors = ColorMap::new(categories);

    let (lo, hi) = tiles
        .iter()
        .filter_map(|t| match t.color {
            NodeColor::Scale(v) => Some(v),
            _ => None,
        })
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    let top_level = generate_palette(spec.root.children.len());
    let mut branch = 0;

    Plot::new("treemap_chart")
        .data_aspect(1.0)
        .show_axes(false)
        .show_grid(false)
        .show(ui, |plot_ui| {
            let mut current = Color32::GRAY;
            for tile in &tiles {
                let fill = match &tile.color {
                    NodeColor::Category(v) => category_colors.color_for(Some(v)),
                    NodeColor::Mixed => Color32::GRAY,
                    NodeColor::Scale(v) => sequential(*v, lo, hi),
                    NodeColor::None => {
                        if tile.depth == 1 {
                            current = top_level.get(branch).copied().unwrap_or(Color32::GRAY);
                            branch += 1;
                        }
                        current
                    }
                };
                let [x0, y0] = tile.min;
                let [x1, y1] = tile.max;
                let stroke = Stroke::new(
                    (leaf_depth + 1 - tile.depth) as f32,
                    Color32::WHITE,
                );
                plot_ui.polygon(
                    Polygon::new(PlotPoints::new(vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]))
                        .fill_color(fill)
                        .stroke(stroke),
                );
                if tile.depth == leaf_depth {
                    plot_ui.text(
                        Text::new(
                            PlotPoint::new((x0 + x1) / 2.0, (y0 + y1) / 2.0),
                            format!("{}\n{}", tile.label, format_value(tile.value)),
                        )
                        .color(text_on(fill)),
                    );
                }
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_labels_only_on_whole_positions() {
        let labels = vec!["1st".to_string(), "2nd".to_string()];
        assert_eq!(bin_label(&labels, 1.0), "2nd");
        assert_eq!(bin_label(&labels, 0.5), "");
        assert_eq!(bin_label(&labels, -1.0), "");
        assert_eq!(bin_label(&labels, 5.0), "");
    }

    #[test]
    fn values_drop_needless_decimals() {
        assert_eq!(format_value(3.0), "3");
        assert_eq!(format_value(7.925), "7.92");
    }

    #[test]
    fn shades_need_a_scale_and_a_value() {
        let scale = ColorScale { min: 0.0, max: 10.0 };
        assert_eq!(shaded(Some(scale), Some(10.0)), Some(sequential(10.0, 0.0, 10.0)));
        assert_eq!(shaded(None, Some(10.0)), None);
        assert_eq!(shaded(Some(scale), None), None);
    }

    #[test]
    fn series_names_mention_the_group() {
        let yes = CellValue::from("Yes");
        assert_eq!(series_name(Some("Survived"), Some(&yes), "count"), "Survived = Yes");
        assert_eq!(series_name(None, None, "count"), "count");
    }
}
