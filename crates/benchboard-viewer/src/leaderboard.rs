//! The leaderboard page: one controller instance owns the resolved dataset,
//! the rendered rows, the detail panels and the run viewer.

use std::fmt;
use std::sync::Arc;

use benchboard_protocol::{
    BoardError, DisplayMode, EntryIdentity, LeaderboardDocument, LeaderboardEntry, Manifest, ManifestVersion,
};
use benchboard_state::charts::summary_bar;
use benchboard_state::{CallShares, ChartSpec, ErrorBars, MeanStd, MetricCells, MetricKind, SummaryPoint, Theme};

use crate::detail::{DetailPanelManager, ToggleOutcome};
use crate::fetcher::{fetch_json, DataFetcher};
use crate::manifest::{ManifestResolver, ResolvedDataset};
use crate::render::SurfaceId;
use crate::run_viewer::RunViewerController;

/// Shown in place of rows when a leaderboard has no entries.
pub const NO_DATA_NOTICE: &str = "No data";
/// Shown in place of rows when a leaderboard cannot be loaded.
pub const LOAD_ERROR_NOTICE: &str = "Error loading data";

/// Unique key of a rendered row: `{rank}-{secondary}/{primary}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey(String);

impl RowKey {
    pub fn new(rank: usize, identity: &EntryIdentity) -> Self {
        Self(format!("{rank}-{identity}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display-ready leaderboard row.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    /// 1-based position in the source document.
    pub rank: usize,
    pub key: RowKey,
    pub identity: EntryIdentity,
    pub round: MeanStd,
    pub shares: CallShares,
    pub metrics: MetricCells,
}

impl LeaderboardRow {
    pub fn from_entry(rank: usize, identity: EntryIdentity, entry: &LeaderboardEntry) -> Self {
        Self {
            rank,
            key: RowKey::new(rank, &identity),
            round: MeanStd::new(MetricKind::Round, entry.avg_final_round, entry.std_dev_final_round),
            shares: CallShares::from(&entry.calls),
            metrics: MetricCells::new(&entry.average, &entry.std_dev),
            identity,
        }
    }
}

/// Row-click payload handed to whoever manages expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct RowClick {
    pub key: RowKey,
    pub identity: EntryIdentity,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaderboardView {
    pub rows: Vec<LeaderboardRow>,
    /// Empty-state or error text, shown as the only row.
    pub notice: Option<String>,
    /// Summary bar chart; only produced in model mode.
    pub summary: Option<ChartSpec>,
}

impl LeaderboardView {
    pub fn summary_surface() -> SurfaceId {
        SurfaceId::new("performance-chart")
    }

    pub fn row(&self, rank: usize) -> Option<&LeaderboardRow> {
        self.rows.iter().find(|r| r.rank == rank)
    }
}

pub struct LeaderboardController {
    fetcher: Arc<dyn DataFetcher>,
    resolver: ManifestResolver,
    theme: Theme,
    error_bars: ErrorBars,
    manifest: Option<Manifest>,
    dataset: Option<ResolvedDataset>,
    view: LeaderboardView,
    panels: DetailPanelManager,
    viewer: RunViewerController,
}

impl LeaderboardController {
    pub fn new(
        fetcher: Arc<dyn DataFetcher>,
        resolver: ManifestResolver,
        theme: Theme,
        error_bars: ErrorBars,
    ) -> Self {
        Self {
            fetcher,
            resolver,
            theme,
            error_bars,
            manifest: None,
            dataset: None,
            view: LeaderboardView::default(),
            panels: DetailPanelManager::new(theme),
            viewer: RunViewerController::new(),
        }
    }

    pub fn fetcher(&self) -> Arc<dyn DataFetcher> {
        Arc::clone(&self.fetcher)
    }

    pub fn mode(&self) -> DisplayMode {
        self.resolver.mode()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn view(&self) -> &LeaderboardView {
        &self.view
    }

    pub fn dataset(&self) -> Option<&ResolvedDataset> {
        self.dataset.as_ref()
    }

    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    /// Display label of the active version, as the manifest names it.
    pub fn version_label(&self) -> Option<&str> {
        let version = &self.dataset()?.version;
        let label = self
            .manifest()
            .and_then(|m| m.versions.iter().find(|v| v.version() == version))
            .map(ManifestVersion::label);
        Some(label.unwrap_or(version))
    }

    pub fn panels(&self) -> &DetailPanelManager {
        &self.panels
    }

    pub fn panels_mut(&mut self) -> &mut DetailPanelManager {
        &mut self.panels
    }

    pub fn viewer(&self) -> &RunViewerController {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut RunViewerController {
        &mut self.viewer
    }

    /// Fetch the manifest, resolve `requested` against it and load the
    /// resulting leaderboard. Manifest failures are returned and also shown
    /// as the page notice.
    pub async fn start(&mut self, requested: Option<&str>) -> Result<(), BoardError> {
        let manifest = match self.resolver.load_manifest(self.fetcher.as_ref()).await {
            Ok(m) => m,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load manifest");
                self.show_error(&e);
                return Err(e);
            }
        };
        let dataset = match self.resolver.resolve(&manifest, requested) {
            Ok(d) => d,
            Err(e) => {
                tracing::error!(error = %e, "Failed to resolve dataset version");
                self.show_error(&e);
                return Err(e);
            }
        };
        self.manifest = Some(manifest);
        self.activate(dataset).await;
        Ok(())
    }

    /// Switch to another manifest version. Detail panels, the detail cache
    /// and the run viewer are discarded.
    pub async fn switch_version(&mut self, version: &str) -> Result<(), BoardError> {
        let manifest = self
            .manifest
            .as_ref()
            .ok_or_else(|| BoardError::Manifest("no manifest loaded".into()))?;
        let dataset = self.resolver.resolve(manifest, Some(version))?;
        tracing::info!(version = %dataset.version, "Switching dataset version");
        self.activate(dataset).await;
        Ok(())
    }

    /// The manifest version after the active one, wrapping.
    pub fn next_version(&self) -> Option<String> {
        let manifest = self.manifest.as_ref()?;
        let names = manifest.version_names();
        let current = self.dataset.as_ref()?.version.as_str();
        let pos = names.iter().position(|v| *v == current)?;
        names.get((pos + 1) % names.len()).map(|v| v.to_string())
    }

    async fn activate(&mut self, dataset: ResolvedDataset) {
        self.panels.clear();
        self.viewer.close();
        let path = dataset.leaderboard_path.clone();
        self.dataset = Some(dataset);
        self.load(&path).await;
    }

    /// Fetch and render one leaderboard document. Failures degrade to an
    /// error notice and are logged; they never propagate.
    pub async fn load(&mut self, leaderboard_path: &str) -> &LeaderboardView {
        match fetch_json::<LeaderboardDocument>(self.fetcher.as_ref(), leaderboard_path).await {
            Ok(doc) => {
                tracing::info!(path = %leaderboard_path, entries = doc.entries.len(), "Loaded leaderboard");
                self.render(&doc)
            }
            Err(e) => {
                tracing::error!(path = %leaderboard_path, error = %e, "Failed to load leaderboard");
                self.show_error(&e);
                &self.view
            }
        }
    }

    fn show_error(&mut self, err: &BoardError) {
        self.view = LeaderboardView {
            rows: Vec::new(),
            notice: Some(format!("{LOAD_ERROR_NOTICE}: {err}")),
            summary: self.empty_summary(),
        };
    }

    fn empty_summary(&self) -> Option<ChartSpec> {
        match self.mode() {
            DisplayMode::Model => Some(summary_bar(&[], self.theme, self.error_bars)),
            DisplayMode::Community => None,
        }
    }

    /// Build rows in document order; rank is the 1-based position.
    pub fn render(&mut self, doc: &LeaderboardDocument) -> &LeaderboardView {
        let board_model = match doc.board_model() {
            Ok(model) => model,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed board model");
                None
            }
        };
        let board_model = board_model.or_else(|| match self.mode() {
            DisplayMode::Community => Some(self.resolver.community_model().clone()),
            DisplayMode::Model => None,
        });

        let mut rows = Vec::with_capacity(doc.entries.len());
        let mut points = Vec::with_capacity(doc.entries.len());
        for (i, entry) in doc.entries.iter().enumerate() {
            let rank = i + 1;
            let identity = match entry.identity(board_model.as_ref()) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!(rank, error = %e, "Skipping leaderboard entry");
                    continue;
                }
            };
            if !entry.calls.is_consistent() {
                tracing::warn!(rank, %identity, "Call counts do not add up to total");
            }
            points.push(SummaryPoint {
                label: identity.primary().to_string(),
                vendor: identity.vendor().to_string(),
                mean: entry.avg_final_round,
                std_dev: entry.std_dev_final_round,
                run_count: entry.run_count,
            });
            rows.push(LeaderboardRow::from_entry(rank, identity, entry));
        }

        let summary = match self.mode() {
            DisplayMode::Model => Some(summary_bar(&points, self.theme, self.error_bars)),
            DisplayMode::Community => None,
        };
        let notice = rows.is_empty().then(|| NO_DATA_NOTICE.to_string());
        self.view = LeaderboardView {
            rows,
            notice,
            summary,
        };
        &self.view
    }

    pub fn row_click(&self, rank: usize) -> Option<RowClick> {
        self.view.row(rank).map(|row| RowClick {
            key: row.key.clone(),
            identity: row.identity.clone(),
        })
    }

    /// Hand a row click to the panel manager. The returned outcome may ask
    /// the caller to fetch; see [`DetailPanelManager::resolve`].
    pub fn toggle_row(&mut self, rank: usize) -> Option<ToggleOutcome> {
        let click = self.row_click(rank)?;
        let base = self.dataset.as_ref()?.detail_base_path.clone();
        Some(self.panels.toggle(&click.key, &click.identity, &base))
    }

    /// Toggle and, when needed, fetch inline.
    pub async fn toggle_row_now(&mut self, rank: usize) -> Option<ToggleOutcome> {
        let click = self.row_click(rank)?;
        let base = self.dataset.as_ref()?.detail_base_path.clone();
        let fetcher = Arc::clone(&self.fetcher);
        Some(
            self.panels
                .toggle_with(fetcher.as_ref(), &click.key, &click.identity, &base)
                .await,
        )
    }
}
