//! Pure presentation logic for the benchmark leaderboard viewer.
//!
//! Nothing in this crate performs I/O: it turns fetched documents into
//! display strings and declarative chart specifications, and holds the
//! session caches the controllers share.

pub mod cache;
pub mod charts;
pub mod format;
pub mod palette;

pub use cache::SessionCache;
pub use charts::{ChartKind, ChartSpec, ErrorBars, Series, SummaryPoint};
pub use format::{CallShares, MeanStd, MetricCells, MetricKind, TotalsSummary};
pub use palette::{Hsla, Theme, ThemePalette};
