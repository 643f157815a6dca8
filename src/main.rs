use std::path::Path;

use eframe::egui;
use titanic_explorer::app::TitanicExplorerApp;
use titanic_explorer::config::{AppConfig, CONFIG_FILE};

fn main() -> eframe::Result {
    env_logger::init();

    let config = AppConfig::load_or_default(Path::new(CONFIG_FILE)).unwrap_or_else(|e| {
        log::error!("Ignoring {CONFIG_FILE}: {e:#}");
        AppConfig::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_min_inner_size(config.min_window_size),
        ..Default::default()
    };

    eframe::run_native(
        "Titanic Passenger Data",
        options,
        Box::new(|_cc| Ok(Box::new(TitanicExplorerApp::new(config)))),
    )
}
