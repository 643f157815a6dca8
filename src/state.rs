use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::chart::{ChartKind, ChartSpec, PlotRequest, build_plot};
use crate::config::AppConfig;
use crate::data::cache::DatasetCache;
use crate::data::filter::{FilterState, FilteredView, apply_filters};
use crate::data::index::ValueIndex;
use crate::data::model::{CellValue, COUNT, PCLASS, PassengerDataset, SEX, SURVIVED};
use crate::error::Result;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Page {
    #[default]
    Home,
    Description,
    Analytics,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Home, Page::Description, Page::Analytics];

    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "🏠 Home",
            Page::Description => "🚢 Data description",
            Page::Analytics => "📈 Data analytics",
        }
    }
}

/// The session: everything the UI reads and writes, independent of rendering.
pub struct AppState {
    pub config: AppConfig,

    /// Parsed sources, keyed by path.
    cache: DatasetCache,

    /// Distinct values per column of the current dataset.
    index: ValueIndex,

    /// Current dataset (None until a file loads).
    pub dataset: Option<Arc<PassengerDataset>>,

    /// Where the current dataset came from.
    pub source: Option<PathBuf>,

    /// Filter form contents; edits here do nothing until submitted.
    pub draft: Option<FilterState>,

    /// Last submitted filters. None before the first submission.
    pub applied: Option<FilterState>,

    /// The identity filters the draft started from, in effect until the
    /// first submission.
    initial: Option<FilterState>,

    /// Passengers passing `applied` (all of them before any submission).
    pub view: Option<FilteredView>,

    /// Current plot options.
    pub plot: PlotRequest,

    pub page: Page,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            cache: DatasetCache::new(),
            index: ValueIndex::new(),
            dataset: None,
            source: None,
            draft: None,
            applied: None,
            initial: None,
            view: None,
            plot: PlotRequest::default(),
            page: Page::default(),
            status_message: None,
        }
    }

    /// Load `path` through the cache and make it the current dataset.
    /// Failures are reported in `status_message` as well as returned.
    pub fn open(&mut self, path: &Path) -> Result<()> {
        let loaded = self
            .cache
            .load(path)
            .and_then(|ds| self.set_dataset(ds));
        match loaded {
            Ok(()) => {
                self.source = Some(path.to_path_buf());
                self.status_message = None;
                Ok(())
            }
            Err(e) => {
                self.status_message = Some(format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Drop the cached copy of the current source and read it again.
    pub fn reload(&mut self) -> Result<()> {
        let Some(path) = self.source.clone() else {
            return Ok(());
        };
        self.cache.invalidate(&path);
        self.open(&path)
    }

    /// Ingest a dataset: reset filters to "everything", show all passengers.
    pub fn set_dataset(&mut self, dataset: Arc<PassengerDataset>) -> Result<()> {
        let draft = FilterState::from_index(&dataset, &mut self.index)?;
        log::info!(
            "Using dataset with {} passengers and columns {:?}",
            dataset.len(),
            dataset.column_names
        );

        self.plot = default_plot(&dataset, self.plot.kind);
        self.view = Some(FilteredView::full(Arc::clone(&dataset)));
        self.initial = Some(draft.clone());
        self.draft = Some(draft);
        self.applied = None;
        self.dataset = Some(dataset);
        Ok(())
    }

    /// Apply the whole filter form at once, replacing the previous view.
    pub fn submit_filters(&mut self) {
        let (Some(ds), Some(draft)) = (&self.dataset, &self.draft) else {
            return;
        };
        let view = apply_filters(ds, draft);
        log::info!("Filters applied: {} of {} passengers", view.len(), ds.len());
        self.applied = Some(draft.clone());
        self.view = Some(view);
    }

    /// Whether the filter form differs from the filters behind the view.
    pub fn has_unsubmitted_changes(&self) -> bool {
        let in_effect = self.applied.as_ref().or(self.initial.as_ref());
        self.draft.as_ref() != in_effect
    }

    /// Sorted distinct values of a column of the current dataset.
    pub fn domain(&mut self, column: &str) -> Result<Vec<CellValue>> {
        match &self.dataset {
            Some(ds) => Ok(self.index.values(ds, column)?.to_vec()),
            None => Ok(Vec::new()),
        }
    }

    /// Observed range of a numeric column of the current dataset.
    pub fn bounds(&mut self, column: &str) -> Result<Option<(f64, f64)>> {
        match &self.dataset {
            Some(ds) if !ds.is_empty() => self.index.bounds(ds, column).map(Some),
            _ => Ok(None),
        }
    }

    /// Select every value of a column in the filter form.
    pub fn select_all(&mut self, column: &str) -> Result<()> {
        let values = self.domain(column)?;
        if let Some(draft) = &mut self.draft {
            draft.select(column, values)?;
        }
        Ok(())
    }

    /// Deselect every value of a column in the filter form.
    pub fn select_none(&mut self, column: &str) -> Result<()> {
        if let Some(draft) = &mut self.draft {
            draft.select(column, Vec::new())?;
        }
        Ok(())
    }

    /// Build the chart for the current plot options. Rebuilt on every call.
    pub fn chart(&self) -> Option<Result<ChartSpec>> {
        self.view.as_ref().map(|view| build_plot(view, &self.plot))
    }

    /// Write the current chart as pretty JSON.
    pub fn export_chart(&self, path: &Path) -> anyhow::Result<()> {
        let spec = self.chart().context("no dataset loaded")??;
        let json = spec.to_json().context("serializing chart")?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported {} chart to {}", spec.kind().label(), path.display());
        Ok(())
    }
}

/// Sensible starting roles for a freshly loaded dataset.
fn default_plot(dataset: &PassengerDataset, kind: ChartKind) -> PlotRequest {
    let pick = |preferred: &str| {
        if dataset.has_column(preferred) {
            Some(preferred.to_string())
        } else {
            dataset.column_names.first().cloned()
        }
    };
    PlotRequest {
        kind,
        primary: pick(SEX),
        secondary: pick(PCLASS),
        tertiary: pick(SURVIVED),
        color: pick(SURVIVED),
        measure: pick(COUNT),
    }
}
