//! Leaderboard viewer: fetches published benchmark documents, keeps the
//! view state of the leaderboard, its detail panels and the run viewer,
//! and renders them to a terminal.
//!
//! Detail and run-viewer fetches are split into a synchronous "begin" step
//! that returns a ticket and an "apply" step that only takes effect while
//! the ticket is still current, so results arriving late or out of order
//! cannot overwrite newer state. The `*_now`/`navigate` helpers run both
//! steps inline.

pub mod config;
pub mod console;
pub mod detail;
pub mod fetcher;
pub mod leaderboard;
pub mod manifest;
pub mod print;
pub mod render;
pub mod run_viewer;

pub use config::{Environment, EnvironmentRoots, ViewerConfig};
pub use detail::{DetailPanel, DetailPanelManager, PerRunRow, ToggleOutcome};
pub use fetcher::{DataFetcher, FetchFuture, SourceFetcher};
pub use leaderboard::{LeaderboardController, LeaderboardRow, LeaderboardView, RowKey};
pub use manifest::{ManifestResolver, ResolvedDataset};
pub use render::{ChartRenderer, SurfaceId};
pub use run_viewer::{
    Direction, OpenRequest, PrefetchTicket, RequestBundle, RequestContent, RunViewerController, StepOutcome,
    TotalRequest,
};
