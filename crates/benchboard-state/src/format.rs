//! Turns raw aggregates into display strings.
//!
//! Rounding is half away from zero at the requested precision, and a
//! value that rounds to zero is always printed without a sign.

use std::fmt;

use benchboard_protocol::{CallCounts, DetailTotals, Metrics};

/// Round `value` to `decimals` places, halves away from zero.
pub fn round_half_up(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let rounded = (value * scale).round() / scale;
    // -0.0 == 0.0, this normalizes the sign.
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Fixed-precision rendering of `value`.
pub fn fixed(value: f64, decimals: u32) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    format!("{:.*}", decimals as usize, round_half_up(value, decimals))
}

/// `round(100 * count / total)`, or 0 when nothing was counted.
pub fn percent(count: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    round_half_up(100.0 * count as f64 / total as f64, 0) as u32
}

/// Metric families and their display precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Final round reached, 1 decimal.
    Round,
    Percent,
    Tokens,
    /// Milliseconds shown as seconds, 2 decimals.
    TimeMs,
    /// Dollars shown as milli-dollars, 2 decimals.
    CostDollars,
}

impl MetricKind {
    pub fn decimals(self) -> u32 {
        match self {
            Self::Round => 1,
            Self::Percent | Self::Tokens => 0,
            Self::TimeMs | Self::CostDollars => 2,
        }
    }

    /// Unit conversion applied before rounding.
    pub fn scale(self, raw: f64) -> f64 {
        match self {
            Self::TimeMs => raw / 1000.0,
            Self::CostDollars => raw * 1000.0,
            _ => raw,
        }
    }

    pub fn format(self, raw: f64) -> String {
        fixed(self.scale(raw), self.decimals())
    }
}

/// A `"{mean} ± {stddev}"` cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeanStd {
    pub mean: String,
    pub std_dev: String,
}

impl MeanStd {
    pub fn new(kind: MetricKind, mean: f64, std_dev: f64) -> Self {
        Self {
            mean: kind.format(mean),
            std_dev: kind.format(std_dev),
        }
    }
}

impl fmt::Display for MeanStd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ± {}", self.mean, self.std_dev)
    }
}

/// Call outcome percentages, each rounded independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallShares {
    pub successful: u32,
    pub failed: u32,
    pub error: u32,
}

impl CallShares {
    pub fn sum(&self) -> u32 {
        self.successful + self.failed + self.error
    }
}

impl From<&CallCounts> for CallShares {
    fn from(calls: &CallCounts) -> Self {
        Self {
            successful: percent(calls.successful, calls.total),
            failed: percent(calls.failed, calls.total),
            error: percent(calls.error, calls.total),
        }
    }
}

/// The four averaged metric columns shared by leaderboard and per-run rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCells {
    pub input_tokens: MeanStd,
    pub output_tokens: MeanStd,
    pub time: MeanStd,
    pub cost: MeanStd,
}

impl MetricCells {
    pub fn new(average: &Metrics, std_dev: &Metrics) -> Self {
        Self {
            input_tokens: MeanStd::new(MetricKind::Tokens, average.input_tokens, std_dev.input_tokens),
            output_tokens: MeanStd::new(MetricKind::Tokens, average.output_tokens, std_dev.output_tokens),
            time: MeanStd::new(MetricKind::TimeMs, average.time_ms, std_dev.time_ms),
            cost: MeanStd::new(MetricKind::CostDollars, average.total_cost, std_dev.total_cost),
        }
    }
}

/// Grand totals block of a detail panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotalsSummary {
    /// Millions of tokens, 2 decimals.
    pub input_tokens_m: String,
    pub output_tokens_m: String,
    /// Dollars, 2 decimals.
    pub input_cost: String,
    pub output_cost: String,
    pub total_cost: String,
    /// Whole seconds.
    pub time_s: String,
}

impl From<&DetailTotals> for TotalsSummary {
    fn from(t: &DetailTotals) -> Self {
        Self {
            input_tokens_m: fixed(t.input_tokens / 1_000_000.0, 2),
            output_tokens_m: fixed(t.output_tokens / 1_000_000.0, 2),
            input_cost: fixed(t.input_cost, 2),
            output_cost: fixed(t.output_cost, 2),
            total_cost: fixed(t.total_cost, 2),
            time_s: fixed(t.time_ms / 1000.0, 0),
        }
    }
}
