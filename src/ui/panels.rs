use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use crate::chart::ChartKind;
use crate::data::filter::{CATEGORICAL_COLUMNS, NUMERIC_COLUMNS};
use crate::data::model::{MEASURE_COLUMNS, PARCH, SIBSP};
use crate::error::ExplorerError;
use crate::state::{AppState, Page};

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar with page navigation.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui
                .add_enabled(state.source.is_some(), egui::Button::new("Reload"))
                .clicked()
            {
                // Errors land in the status message.
                let _ = state.reload();
                ui.close_menu();
            }
            if ui
                .add_enabled(state.view.is_some(), egui::Button::new("Export chart…"))
                .clicked()
            {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        for page in Page::ALL {
            ui.selectable_value(&mut state.page, page, page.title());
        }

        ui.separator();

        if let (Some(ds), Some(view)) = (&state.dataset, &state.view) {
            ui.label(format!("{} passengers loaded, {} visible", ds.len(), view.len()));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – filter form
// ---------------------------------------------------------------------------

/// Render the filter form. Nothing changes in the view until "Update".
pub fn filter_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    if state.draft.is_none() {
        ui.label("No dataset loaded.");
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for col in CATEGORICAL_COLUMNS {
                checklist(ui, state, col);
            }
            ui.separator();
            for col in NUMERIC_COLUMNS {
                range_sliders(ui, state, col);
            }
            ui.separator();

            if state.has_unsubmitted_changes() {
                ui.label(RichText::new("Unsubmitted changes").italics());
            }
            if ui.button("Update").clicked() {
                state.submit_filters();
            }
        });
}

fn checklist(ui: &mut Ui, state: &mut AppState, col: &str) {
    let all_values = match state.domain(col) {
        Ok(values) => values,
        Err(e) => {
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
            return;
        }
    };
    let Some(selected) = state.draft.as_ref().and_then(|d| d.selected(col).ok()) else {
        return;
    };
    let header_text = format!("{col}  ({}/{})", selected.len(), all_values.len());

    egui::CollapsingHeader::new(RichText::new(header_text).strong())
        .id_salt(col)
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    if let Err(e) = state.select_all(col) {
                        report(&mut state.status_message, &e);
                    }
                }
                if ui.small_button("None").clicked() {
                    if let Err(e) = state.select_none(col) {
                        report(&mut state.status_message, &e);
                    }
                }
            });

            let Some(draft) = state.draft.as_mut() else {
                return;
            };
            for val in &all_values {
                let mut checked = draft.selected(col).is_ok_and(|s| s.contains(val));
                if ui.checkbox(&mut checked, val.to_string()).changed() {
                    if let Err(e) = draft.toggle(col, val) {
                        report(&mut state.status_message, &e);
                    }
                }
            }
        });
}

fn range_sliders(ui: &mut Ui, state: &mut AppState, col: &str) {
    let (min, max) = match state.bounds(col) {
        Ok(Some(bounds)) => bounds,
        Ok(None) => return,
        Err(e) => {
            ui.label(RichText::new(e.to_string()).color(Color32::RED));
            return;
        }
    };
    let Some(draft) = state.draft.as_mut() else {
        return;
    };
    let Ok(range) = draft.range(col) else {
        return;
    };
    let (mut lo, mut hi) = (range.lo, range.hi);
    let whole = col == SIBSP || col == PARCH;

    ui.strong(col);
    let mut changed = false;
    changed |= ui
        .add(egui::Slider::new(&mut lo, min..=max).text("min").integer_if(whole))
        .changed();
    changed |= ui
        .add(egui::Slider::new(&mut hi, min..=max).text("max").integer_if(whole))
        .changed();

    if changed {
        // Keep the pair ordered when one handle crosses the other.
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        if let Err(e) = draft.set_range(col, lo, hi) {
            report(&mut state.status_message, &e);
        }
    }
}

/// Log a filter edit that failed and show it in the top bar.
fn report(status: &mut Option<String>, e: &ExplorerError) {
    log::warn!("Filter edit failed: {e}");
    *status = Some(format!("Error: {e}"));
}

trait IntegerIf {
    fn integer_if(self, whole: bool) -> Self;
}

impl IntegerIf for egui::Slider<'_> {
    fn integer_if(self, whole: bool) -> Self {
        if whole { self.integer() } else { self }
    }
}

// ---------------------------------------------------------------------------
// Right side panel – plot options
// ---------------------------------------------------------------------------

/// Chart kind and role selectors. Only the roles the kind uses are shown.
pub fn plot_options(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Plot");
    ui.separator();

    let Some(ds) = &state.dataset else {
        ui.label("No dataset loaded.");
        return;
    };
    let columns = ds.column_names.clone();
    let measures: Vec<String> = MEASURE_COLUMNS
        .iter()
        .filter(|c| ds.has_column(c))
        .map(|c| c.to_string())
        .collect();

    let plot = &mut state.plot;
    egui::ComboBox::from_label("Type of plot")
        .selected_text(plot.kind.label())
        .show_ui(ui, |ui: &mut Ui| {
            for kind in ChartKind::ALL {
                ui.selectable_value(&mut plot.kind, kind, kind.label());
            }
        });

    column_picker(ui, "1st variable", &mut plot.primary, &columns);
    column_picker(ui, "Numeric variable", &mut plot.measure, &measures);
    if plot.kind.uses_color() {
        column_picker(ui, "Color variable", &mut plot.color, &columns);
    }
    if plot.kind.uses_secondary() {
        column_picker(ui, "2nd variable", &mut plot.secondary, &columns);
    }
    if plot.kind.uses_tertiary() {
        column_picker(ui, "3rd variable", &mut plot.tertiary, &columns);
    }
}

fn column_picker(ui: &mut Ui, label: &str, selected: &mut Option<String>, columns: &[String]) {
    egui::ComboBox::from_label(label)
        .selected_text(selected.as_deref().unwrap_or("none"))
        .show_ui(ui, |ui: &mut Ui| {
            if label == "Color variable" {
                ui.selectable_value(selected, None, "none");
            }
            for col in columns {
                ui.selectable_value(selected, Some(col.clone()), col);
            }
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open passenger data")
        .add_filter("Supported files", &["csv", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        // Errors land in the status message.
        let _ = state.open(&path);
    }
}

fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export chart")
        .add_filter("JSON", &["json"])
        .set_file_name("chart.json")
        .save_file();

    if let Some(path) = file {
        match state.export_chart(&path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::error!("Failed to export chart: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_edits_reach_the_status_line() {
        let mut status = None;
        report(&mut status, &ExplorerError::UnknownColumn("Lifeboat".to_string()));
        assert_eq!(status.as_deref(), Some("Error: unknown column 'Lifeboat'"));
    }
}
