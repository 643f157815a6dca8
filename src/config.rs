use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Optional settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "explorer.json";

/// Startup settings. Every field has a default, so a settings file only
/// needs the keys it changes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Passenger table opened at startup.
    pub data_path: PathBuf,
    pub window_size: [f32; 2],
    pub min_window_size: [f32; 2],
    /// Radius in points of the largest scatter marker.
    pub max_marker_radius: f32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("titanic_data.csv"),
            window_size: [1200.0, 800.0],
            min_window_size: [600.0, 400.0],
            max_marker_radius: 12.0,
        }
    }
}

impl AppConfig {
    /// Read `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::debug!("No {} found, using default settings", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: AppConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        log::info!("Loaded settings from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_gives_defaults() {
        let config = AppConfig::load_or_default(Path::new("/no/such/explorer.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn partial_file_overrides_only_its_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "data_path": "data/train.csv", "max_marker_radius": 20 }}"#).unwrap();

        let config = AppConfig::load_or_default(file.path()).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/train.csv"));
        assert_eq!(config.max_marker_radius, 20.0);
        assert_eq!(config.window_size, AppConfig::default().window_size);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(AppConfig::load_or_default(file.path()).is_err());
    }
}
