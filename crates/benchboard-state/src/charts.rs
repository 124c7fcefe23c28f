//! Declarative chart specifications handed to a chart renderer.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use benchboard_protocol::RunRecord;
use serde::{Deserialize, Serialize};

use crate::palette::{seed_colors, vendor_color, Hsla, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    StackedBar,
    Doughnut,
}

/// One dataset. `colors` holds either one color for the whole series or one
/// per category.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub values: Vec<f64>,
    pub colors: Vec<Hsla>,
    /// Symmetric half-widths, one per category.
    pub error_bars: Option<Vec<f64>>,
}

impl Series {
    pub fn color_at(&self, index: usize) -> Option<Hsla> {
        self.colors.get(index).or_else(|| self.colors.first()).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub categories: Vec<String>,
    pub series: Vec<Series>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub y_max: Option<f64>,
}

impl ChartSpec {
    fn empty(kind: ChartKind) -> Self {
        Self {
            kind,
            categories: Vec::new(),
            series: Vec::new(),
            x_label: None,
            y_label: None,
            y_max: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Final-round distribution: bins `1..=max_round`, one stacked series per
/// distinct seed in sorted order.
pub fn round_histogram(records: &[RunRecord], theme: Theme) -> ChartSpec {
    let max_round = records.iter().map(|r| r.final_round).max().unwrap_or(0);
    let mut spec = ChartSpec {
        x_label: Some("Final round".into()),
        y_label: Some("Runs".into()),
        ..ChartSpec::empty(ChartKind::StackedBar)
    };
    if max_round == 0 {
        return spec;
    }

    let seeds: Vec<String> = records
        .iter()
        .map(|r| r.seed_label().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let colors = seed_colors(theme, &seeds);

    spec.categories = (1..=max_round).map(|r| r.to_string()).collect();
    spec.series = seeds
        .iter()
        .zip(colors)
        .map(|(seed, color)| {
            let mut values = vec![0.0; max_round as usize];
            for record in records.iter().filter(|r| r.seed_label() == seed) {
                if record.final_round >= 1 {
                    values[(record.final_round - 1) as usize] += 1.0;
                }
            }
            Series {
                label: seed.clone(),
                values,
                colors: vec![color],
                error_bars: None,
            }
        })
        .collect();
    spec
}

/// Provider usage share. Legend order follows the map (alphabetical).
pub fn provider_doughnut(providers: &BTreeMap<String, u64>, theme: Theme) -> ChartSpec {
    let mut spec = ChartSpec::empty(ChartKind::Doughnut);
    if providers.is_empty() {
        return spec;
    }
    let names: Vec<String> = providers.keys().cloned().collect();
    let colors = seed_colors(theme, &names);
    spec.categories = names;
    spec.series.push(Series {
        label: "Providers".into(),
        values: providers.values().map(|&c| c as f64).collect(),
        colors,
        error_bars: None,
    });
    spec
}

/// How summary chart error bars are sized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorBars {
    /// Plus or minus one standard deviation.
    #[default]
    StdDev,
    /// 95% confidence half-width from Student's t.
    Confidence95,
}

impl FromStr for ErrorBars {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "std-dev" | "stddev" | "sd" => Ok(Self::StdDev),
            "confidence95" | "ci95" | "ci" => Ok(Self::Confidence95),
            other => Err(format!("unknown error bar kind '{other}'")),
        }
    }
}

/// One bar of the summary chart.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryPoint {
    pub label: String,
    pub vendor: String,
    pub mean: f64,
    pub std_dev: f64,
    pub run_count: Option<u32>,
}

impl SummaryPoint {
    pub fn half_width(&self, bars: ErrorBars) -> f64 {
        match (bars, self.run_count) {
            (ErrorBars::Confidence95, Some(n)) if n > 1 => {
                t_critical_95(n - 1) * self.std_dev / (n as f64).sqrt()
            }
            // A single run has no interval.
            (ErrorBars::Confidence95, Some(_)) => 0.0,
            _ => self.std_dev,
        }
    }
}

const T_CRIT_95: &[(u32, f64)] = &[
    (1, 12.706),
    (2, 4.303),
    (3, 3.182),
    (4, 2.776),
    (5, 2.571),
    (6, 2.447),
    (7, 2.365),
    (8, 2.306),
    (9, 2.262),
    (10, 2.228),
    (11, 2.201),
    (12, 2.179),
    (13, 2.160),
    (14, 2.145),
    (15, 2.131),
    (16, 2.120),
    (17, 2.110),
    (18, 2.101),
    (19, 2.093),
    (20, 2.086),
    (25, 2.060),
    (30, 2.042),
    (40, 2.021),
    (60, 2.000),
    (120, 1.980),
];

/// Two-sided 95% critical value for `df` degrees of freedom, using the
/// closest tabulated df not above it. Zero when `df` is zero.
pub fn t_critical_95(df: u32) -> f64 {
    T_CRIT_95
        .iter()
        .rev()
        .find(|(key, _)| *key <= df)
        .map_or(0.0, |(_, t)| *t)
}

/// Mean final round per entry, colored by vendor, with error bars.
pub fn summary_bar(points: &[SummaryPoint], theme: Theme, bars: ErrorBars) -> ChartSpec {
    let mut spec = ChartSpec {
        y_label: Some("Average round".into()),
        ..ChartSpec::empty(ChartKind::Bar)
    };
    if points.is_empty() {
        return spec;
    }

    let errors: Vec<f64> = points.iter().map(|p| p.half_width(bars)).collect();
    let top = points
        .iter()
        .zip(&errors)
        .map(|(p, e)| p.mean + e)
        .fold(f64::MIN, f64::max);

    spec.categories = points.iter().map(|p| p.label.clone()).collect();
    spec.y_max = Some((top + 0.5).ceil());
    spec.series.push(Series {
        label: "Average round".into(),
        values: points.iter().map(|p| p.mean).collect(),
        colors: points.iter().map(|p| vendor_color(theme, &p.vendor)).collect(),
        error_bars: Some(errors),
    });
    spec
}
