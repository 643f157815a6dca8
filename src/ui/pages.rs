use eframe::egui::{self, RichText, Ui};
use egui_extras::{Column, TableBuilder};

use crate::data::model::PassengerDataset;
use crate::data::stats::{ColumnSummary, describe};
use crate::state::AppState;

/// Meaning of the Kaggle passenger columns, shown on the description page.
const COLUMN_NOTES: [(&str, &str); 13] = [
    ("PassengerId", "Row number in the source file"),
    ("Survived", "Survival (No / Yes)"),
    ("Pclass", "Ticket class (1st / 2nd / 3rd)"),
    ("Name", "Passenger name"),
    ("Sex", "Gender of the passenger"),
    ("Age", "Age in years"),
    ("SibSp", "Number of siblings / spouses aboard"),
    ("Parch", "Number of parents / children aboard"),
    ("Ticket", "Ticket number"),
    ("Fare", "Passenger fare"),
    ("Cabin", "Cabin number"),
    ("Embarked", "Port of embarkation (Cherbourg / Queenstown / Southampton)"),
    ("count", "Constant 1, used to count passengers in charts"),
];

// ---------------------------------------------------------------------------
// Home
// ---------------------------------------------------------------------------

pub fn home(ui: &mut Ui) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add_space(24.0);
        ui.heading(RichText::new("Titanic Passenger Data").size(32.0));
        ui.add_space(16.0);
        ui.label(RichText::new("What will you find here?").size(22.0).strong());
        ui.add_space(8.0);
        ui.label(
            "👉 Data description: the full passenger table and summary statistics \
             of its numeric columns.",
        );
        ui.label(
            "👉 Data analytics: filter the passengers with the checklists and sliders \
             on the left, then pick a chart and its variables on the right.",
        );
        ui.add_space(8.0);
        ui.label("Open another passenger file with File → Open…");
    });
}

// ---------------------------------------------------------------------------
// Data description
// ---------------------------------------------------------------------------

pub fn description(ui: &mut Ui, state: &AppState) {
    ui.heading("🚢 Data description");
    ui.separator();

    egui::Grid::new("column_notes")
        .num_columns(2)
        .striped(true)
        .show(ui, |ui: &mut Ui| {
            for (col, note) in COLUMN_NOTES {
                ui.strong(col);
                ui.label(note);
                ui.end_row();
            }
        });

    let Some(ds) = &state.dataset else {
        ui.label("No dataset loaded.");
        return;
    };

    ui.add_space(8.0);
    egui::CollapsingHeader::new("Data Base:")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.label(format!("{} rows × {} columns", ds.len(), ds.column_names.len()));
            ui.push_id("passenger_table", |ui: &mut Ui| passenger_table(ui, ds));
        });

    egui::CollapsingHeader::new("Stats:")
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            ui.push_id("stats_table", |ui: &mut Ui| stats_table(ui, &describe(ds)));
        });
}

fn passenger_table(ui: &mut Ui, ds: &PassengerDataset) {
    TableBuilder::new(ui)
        .striped(true)
        .max_scroll_height(400.0)
        .column(Column::auto())
        .columns(Column::auto().resizable(true), ds.column_names.len())
        .header(20.0, |mut header| {
            header.col(|ui: &mut Ui| {
                ui.strong("#");
            });
            for col in &ds.column_names {
                header.col(|ui: &mut Ui| {
                    ui.strong(col);
                });
            }
        })
        .body(|body| {
            body.rows(18.0, ds.len(), |mut row| {
                let i = row.index();
                let passenger = &ds.passengers[i];
                row.col(|ui: &mut Ui| {
                    ui.label(i.to_string());
                });
                for col in &ds.column_names {
                    row.col(|ui: &mut Ui| {
                        ui.label(passenger.value(col).to_string());
                    });
                }
            });
        });
}

fn stats_table(ui: &mut Ui, summary: &[ColumnSummary]) {
    const STATS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

    TableBuilder::new(ui)
        .striped(true)
        .column(Column::auto())
        .columns(Column::auto(), summary.len())
        .header(20.0, |mut header| {
            header.col(|ui: &mut Ui| {
                ui.strong("");
            });
            for s in summary {
                header.col(|ui: &mut Ui| {
                    ui.strong(&s.column);
                });
            }
        })
        .body(|mut body| {
            for (i, stat) in STATS.iter().enumerate() {
                body.row(18.0, |mut row| {
                    row.col(|ui: &mut Ui| {
                        ui.strong(*stat);
                    });
                    for s in summary {
                        row.col(|ui: &mut Ui| {
                            ui.label(stat_cell(s, i));
                        });
                    }
                });
            }
        });
}

fn stat_cell(s: &ColumnSummary, i: usize) -> String {
    let value = match i {
        0 => return s.count.to_string(),
        1 => s.mean,
        2 => match s.std {
            Some(std) => std,
            None => return "NaN".to_string(),
        },
        3 => s.min,
        4 => s.q25,
        5 => s.median,
        6 => s.q75,
        _ => s.max,
    };
    format!("{value:.6}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{parse_csv, tests::SAMPLE_CSV};

    #[test]
    fn stat_cells_follow_describe_layout() {
        let ds = parse_csv(SAMPLE_CSV.as_bytes()).unwrap();
        let summary = describe(&ds);
        let age = summary.iter().find(|s| s.column == "Age").unwrap();
        assert_eq!(stat_cell(age, 0), "5");
        assert_eq!(stat_cell(age, 1), "20.400000");
        assert_eq!(stat_cell(age, 7), "38.000000");
    }

    #[test]
    fn notes_cover_the_required_columns() {
        for col in crate::data::model::REQUIRED_COLUMNS {
            assert!(COLUMN_NOTES.iter().any(|(c, _)| *c == col), "{col}");
        }
    }
}
