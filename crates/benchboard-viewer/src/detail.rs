//! Expandable per-entry detail panels.
//!
//! Each row moves through `Collapsed -> Loading -> Expanded -> Collapsed`.
//! Detail documents are cached for the lifetime of a dataset version, so
//! re-expanding a row never fetches twice.

use std::collections::HashMap;
use std::sync::Arc;

use benchboard_protocol::{
    detail_path, BoardError, DetailDocument, DetailKey, EntryIdentity, RunLocator,
    FIRST_REQUEST_INDEX,
};
use benchboard_state::charts::{provider_doughnut, round_histogram};
use benchboard_state::{CallShares, ChartSpec, MetricCells, SessionCache, Theme, TotalsSummary};

use crate::fetcher::{fetch_json, DataFetcher};
use crate::leaderboard::RowKey;
use crate::render::SurfaceId;
use crate::run_viewer::OpenRequest;

/// One row of the per-run table.
#[derive(Debug, Clone, PartialEq)]
pub struct PerRunRow {
    pub seed: String,
    pub final_round: u32,
    pub shares: CallShares,
    pub metrics: MetricCells,
    /// Position in [`DetailPanel::run_ids`] when the run can be opened.
    pub run_index: Option<usize>,
}

/// Everything an expanded row shows.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailPanel {
    pub identity: EntryIdentity,
    pub histogram: ChartSpec,
    pub providers: ChartSpec,
    pub totals: TotalsSummary,
    pub runs: Vec<PerRunRow>,
    pub histogram_surface: SurfaceId,
    pub providers_surface: SurfaceId,
    pub locator: RunLocator,
    /// Ordered run references for the run viewer.
    pub run_ids: Vec<String>,
    /// Set when the detail document could not be loaded.
    pub load_error: Option<String>,
}

impl DetailPanel {
    fn build(
        row_key: &RowKey,
        identity: &EntryIdentity,
        detail_base: &str,
        doc: &DetailDocument,
        theme: Theme,
    ) -> Self {
        if doc.has_positional_mismatch() {
            tracing::warn!(
                entry = %identity,
                records = doc.stats.len(),
                runs = doc.runs.len(),
                "Per-run records and run ids differ in length; run links may be misaligned"
            );
        }

        let explicit = !doc.stats.is_empty() && doc.stats.iter().all(|r| r.run_id.is_some());
        let run_ids: Vec<String> = if explicit {
            doc.stats.iter().filter_map(|r| r.run_id.clone()).collect()
        } else {
            doc.runs.clone()
        };

        let runs = doc
            .stats
            .iter()
            .enumerate()
            .map(|(i, record)| PerRunRow {
                seed: record.seed_label().to_string(),
                final_round: record.final_round,
                shares: CallShares::from(&record.calls),
                metrics: MetricCells::new(&record.average, &record.std_dev),
                run_index: doc
                    .run_reference(i)
                    .and_then(|id| run_ids.iter().position(|r| r == id)),
            })
            .collect();

        Self {
            identity: identity.clone(),
            histogram: round_histogram(&doc.stats, theme),
            providers: provider_doughnut(&doc.providers, theme),
            totals: TotalsSummary::from(&doc.totals()),
            runs,
            histogram_surface: SurfaceId::for_chart("histogram", row_key.as_str()),
            providers_surface: SurfaceId::for_chart("pie", row_key.as_str()),
            locator: RunLocator::for_identity(detail_base, identity),
            run_ids,
            load_error: None,
        }
    }

    /// Panel shown when the detail document failed to load.
    fn unavailable(
        row_key: &RowKey,
        identity: &EntryIdentity,
        detail_base: &str,
        theme: Theme,
        err: &BoardError,
    ) -> Self {
        let mut panel = Self::build(row_key, identity, detail_base, &DetailDocument::default(), theme);
        panel.load_error = Some(err.to_string());
        panel
    }

    /// Charts in mount order.
    pub fn charts(&self) -> [(&SurfaceId, &ChartSpec); 2] {
        [
            (&self.histogram_surface, &self.histogram),
            (&self.providers_surface, &self.providers),
        ]
    }

    /// Run viewer request for the per-run row at `row`, if it links to a run.
    pub fn open_request(&self, row: usize) -> Option<OpenRequest> {
        let run_index = self.runs.get(row)?.run_index?;
        Some(OpenRequest {
            locator: self.locator.clone(),
            runs: self.run_ids.clone(),
            run_index,
            start_index: FIRST_REQUEST_INDEX,
        })
    }
}

#[derive(Debug, Clone)]
enum PanelState {
    Loading { ticket: u64 },
    Expanded(DetailPanel),
}

/// A detail fetch the caller must perform and hand back to
/// [`DetailPanelManager::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailFetch {
    pub row_key: RowKey,
    pub ticket: u64,
    pub identity: EntryIdentity,
    pub detail_base: String,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The panel was removed.
    Collapsed,
    /// The panel was built from cached data.
    Expanded,
    /// A fetch for this row is already in flight; nothing changed.
    Pending,
    /// The row is now loading; the fetch is the caller's to run.
    Fetch(DetailFetch),
}

pub struct DetailPanelManager {
    theme: Theme,
    panels: HashMap<RowKey, PanelState>,
    cache: SessionCache<DetailKey, Arc<DetailDocument>>,
    next_ticket: u64,
}

impl DetailPanelManager {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            panels: HashMap::new(),
            cache: SessionCache::new(),
            next_ticket: 0,
        }
    }

    pub fn toggle(
        &mut self,
        row_key: &RowKey,
        identity: &EntryIdentity,
        detail_base: &str,
    ) -> ToggleOutcome {
        match self.panels.get(row_key) {
            Some(PanelState::Loading { .. }) => return ToggleOutcome::Pending,
            Some(PanelState::Expanded(_)) => {
                self.panels.remove(row_key);
                tracing::debug!(row = %row_key, "Collapsed detail panel");
                return ToggleOutcome::Collapsed;
            }
            None => {}
        }

        if let Some(doc) = self.cache.get(&identity.detail_key()) {
            let panel = DetailPanel::build(row_key, identity, detail_base, doc, self.theme);
            self.panels.insert(row_key.clone(), PanelState::Expanded(panel));
            tracing::debug!(row = %row_key, "Expanded detail panel from cache");
            return ToggleOutcome::Expanded;
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        self.panels
            .insert(row_key.clone(), PanelState::Loading { ticket });
        ToggleOutcome::Fetch(DetailFetch {
            row_key: row_key.clone(),
            ticket,
            identity: identity.clone(),
            detail_base: detail_base.to_string(),
            path: detail_path(detail_base, identity),
        })
    }

    /// Apply a finished fetch. Returns `false` when the row's ticket is no
    /// longer current (e.g. the panels were cleared), leaving state untouched.
    pub fn resolve(&mut self, fetch: &DetailFetch, result: Result<DetailDocument, BoardError>) -> bool {
        match self.panels.get(&fetch.row_key) {
            Some(PanelState::Loading { ticket }) if *ticket == fetch.ticket => {}
            _ => {
                tracing::debug!(row = %fetch.row_key, ticket = fetch.ticket, "Discarding stale detail result");
                return false;
            }
        }

        let panel = match result {
            Ok(doc) => {
                let doc = Arc::clone(self.cache.insert(fetch.identity.detail_key(), Arc::new(doc)));
                DetailPanel::build(&fetch.row_key, &fetch.identity, &fetch.detail_base, &doc, self.theme)
            }
            Err(e) => {
                tracing::warn!(path = %fetch.path, error = %e, "Failed to load detail statistics");
                DetailPanel::unavailable(&fetch.row_key, &fetch.identity, &fetch.detail_base, self.theme, &e)
            }
        };
        self.panels
            .insert(fetch.row_key.clone(), PanelState::Expanded(panel));
        true
    }

    /// Toggle and run any resulting fetch to completion.
    pub async fn toggle_with(
        &mut self,
        fetcher: &dyn DataFetcher,
        row_key: &RowKey,
        identity: &EntryIdentity,
        detail_base: &str,
    ) -> ToggleOutcome {
        match self.toggle(row_key, identity, detail_base) {
            ToggleOutcome::Fetch(fetch) => {
                let result = fetch_json::<DetailDocument>(fetcher, &fetch.path).await;
                self.resolve(&fetch, result);
                ToggleOutcome::Expanded
            }
            other => other,
        }
    }

    /// Drop every panel and the detail cache.
    pub fn clear(&mut self) {
        self.panels.clear();
        self.cache.clear();
    }

    pub fn is_expanded(&self, row_key: &RowKey) -> bool {
        matches!(self.panels.get(row_key), Some(PanelState::Expanded(_)))
    }

    pub fn is_loading(&self, row_key: &RowKey) -> bool {
        matches!(self.panels.get(row_key), Some(PanelState::Loading { .. }))
    }

    pub fn panel(&self, row_key: &RowKey) -> Option<&DetailPanel> {
        match self.panels.get(row_key) {
            Some(PanelState::Expanded(panel)) => Some(panel),
            _ => None,
        }
    }

    pub fn expanded_count(&self) -> usize {
        self.panels
            .values()
            .filter(|p| matches!(p, PanelState::Expanded(_)))
            .count()
    }

    pub fn cached_documents(&self) -> usize {
        self.cache.len()
    }
}
