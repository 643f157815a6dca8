use eframe::egui;

use crate::config::AppConfig;
use crate::state::{AppState, Page};
use crate::ui::{pages, panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TitanicExplorerApp {
    pub state: AppState,
}

impl TitanicExplorerApp {
    /// Start a session and open the configured data file.
    pub fn new(config: AppConfig) -> Self {
        let mut state = AppState::new(config);
        let path = state.config.data_path.clone();
        if let Err(e) = state.open(&path) {
            // The session stays usable; File → Open can pick another source.
            log::error!("Startup dataset unavailable: {e}");
        }
        Self { state }
    }
}

impl eframe::App for TitanicExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar and page navigation ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        match self.state.page {
            Page::Home => {
                egui::CentralPanel::default().show(ctx, |ui| pages::home(ui));
            }
            Page::Description => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    egui::ScrollArea::vertical().show(ui, |ui| {
                        pages::description(ui, &self.state);
                    });
                });
            }
            Page::Analytics => {
                // ---- Left side panel: filter form ----
                egui::SidePanel::left("filter_panel")
                    .default_width(240.0)
                    .resizable(true)
                    .show(ctx, |ui| {
                        panels::filter_panel(ui, &mut self.state);
                    });

                // ---- Right side panel: plot options ----
                egui::SidePanel::right("plot_options")
                    .default_width(200.0)
                    .resizable(true)
                    .show(ctx, |ui| {
                        panels::plot_options(ui, &mut self.state);
                    });

                // ---- Central panel: chart ----
                egui::CentralPanel::default().show(ctx, |ui| {
                    plot::chart_panel(ui, &self.state);
                });
            }
        }
    }
}
