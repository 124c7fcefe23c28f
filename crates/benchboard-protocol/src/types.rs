use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{BoardError, UNKNOWN_SEED};

// ---------------------------------------------------------------------------
// Display mode
// ---------------------------------------------------------------------------

/// Which benchmark a page presents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// One entry per model, all playing the default strategy.
    #[default]
    Model,
    /// One entry per community strategy, all played by a single model.
    Community,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Model => "model",
            Self::Community => "community",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "model" | "models" | "main" => Ok(Self::Model),
            "community" | "strategies" => Ok(Self::Community),
            other => Err(format!("unknown display mode '{other}'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

/// Index document listing the published dataset versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub versions: Vec<ManifestVersion>,
    #[serde(default)]
    pub default: Option<String>,
}

/// A manifest version is either a bare string or a described object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManifestVersion {
    Name(String),
    Detailed {
        version: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        latest: bool,
    },
}

impl ManifestVersion {
    pub fn version(&self) -> &str {
        match self {
            Self::Name(v) => v,
            Self::Detailed { version, .. } => version,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Name(v) => v,
            Self::Detailed { version, label, .. } => label.as_deref().unwrap_or(version),
        }
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Detailed { latest: true, .. })
    }
}

impl Manifest {
    pub fn contains(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v.version() == version)
    }

    /// The declared default, falling back to the version flagged `latest`.
    pub fn default_version(&self) -> Option<&str> {
        self.default.as_deref().or_else(|| {
            self.versions
                .iter()
                .find(|v| v.is_latest())
                .map(ManifestVersion::version)
        })
    }

    pub fn version_names(&self) -> Vec<&str> {
        self.versions.iter().map(ManifestVersion::version).collect()
    }
}

// ---------------------------------------------------------------------------
// Identities
// ---------------------------------------------------------------------------

/// A `vendor/model` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub vendor: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(vendor: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            vendor: vendor.into(),
            model: model.into(),
        }
    }

    /// Parse `"vendor/model"`; the model part may itself contain slashes.
    pub fn parse(id: &str) -> Result<Self, BoardError> {
        match id.split_once('/') {
            Some((vendor, model)) if !vendor.is_empty() && !model.is_empty() => {
                Ok(Self::new(vendor, model))
            }
            _ => Err(BoardError::parse(
                "model id",
                format!("expected 'vendor/model', got '{id}'"),
            )),
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.vendor, self.model)
    }
}

/// Cache key for detail statistics: (vendor or author, model or strategy).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DetailKey {
    pub owner: String,
    pub name: String,
}

/// Categorical identity of one leaderboard entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntryIdentity {
    Model {
        vendor: String,
        model: String,
    },
    Strategy {
        author: String,
        name: String,
        /// The model every strategy on this board was played with.
        vendor: String,
        model: String,
    },
}

impl EntryIdentity {
    /// Main label: model name or strategy name.
    pub fn primary(&self) -> &str {
        match self {
            Self::Model { model, .. } => model,
            Self::Strategy { name, .. } => name,
        }
    }

    /// Secondary label: vendor or author.
    pub fn secondary(&self) -> &str {
        match self {
            Self::Model { vendor, .. } => vendor,
            Self::Strategy { author, .. } => author,
        }
    }

    pub fn vendor(&self) -> &str {
        match self {
            Self::Model { vendor, .. } | Self::Strategy { vendor, .. } => vendor,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Self::Model { model, .. } | Self::Strategy { model, .. } => model,
        }
    }

    pub fn strategy(&self) -> Option<&str> {
        match self {
            Self::Model { .. } => None,
            Self::Strategy { name, .. } => Some(name),
        }
    }

    pub fn detail_key(&self) -> DetailKey {
        DetailKey {
            owner: self.secondary().to_string(),
            name: self.primary().to_string(),
        }
    }
}

impl fmt::Display for EntryIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.secondary(), self.primary())
    }
}

// ---------------------------------------------------------------------------
// Leaderboard document
// ---------------------------------------------------------------------------

/// Outcome counts of the tool calls made during a run or an aggregate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallCounts {
    pub successful: u64,
    pub failed: u64,
    pub error: u64,
    pub total: u64,
}

impl CallCounts {
    pub fn is_consistent(&self) -> bool {
        self.successful + self.failed + self.error == self.total
    }
}

/// Per-call averages (or their standard deviations).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub input_tokens: f64,
    pub output_tokens: f64,
    pub time_ms: f64,
    pub total_cost: f64,
    #[serde(default)]
    pub input_cost: f64,
    #[serde(default)]
    pub output_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StrategyRef {
    Name(String),
    Detailed {
        name: String,
        #[serde(default)]
        author: Option<String>,
    },
}

impl StrategyRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) | Self::Detailed { name, .. } => name,
        }
    }

    pub fn author(&self) -> &str {
        match self {
            Self::Detailed {
                author: Some(author),
                ..
            } => author,
            _ => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryConfig {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub strategy: Option<StrategyRef>,
}

/// One ranked participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub config: EntryConfig,
    pub avg_final_round: f64,
    pub std_dev_final_round: f64,
    pub calls: CallCounts,
    pub average: Metrics,
    pub std_dev: Metrics,
    /// Number of runs behind the aggregate, when the producer publishes it.
    #[serde(default)]
    pub run_count: Option<u32>,
}

impl LeaderboardEntry {
    /// Resolve the entry identity. Strategy entries without their own model
    /// take the board-level model.
    pub fn identity(&self, board_model: Option<&ModelRef>) -> Result<EntryIdentity, BoardError> {
        let own_model = self.config.model.as_deref().map(ModelRef::parse).transpose()?;

        match (&self.config.strategy, own_model) {
            (Some(strategy), own) => {
                let model = own.or_else(|| board_model.cloned()).ok_or_else(|| {
                    BoardError::parse(
                        "leaderboard entry",
                        format!("strategy '{}' has no model", strategy.name()),
                    )
                })?;
                Ok(EntryIdentity::Strategy {
                    author: strategy.author().to_string(),
                    name: strategy.name().to_string(),
                    vendor: model.vendor,
                    model: model.model,
                })
            }
            (None, Some(model)) => Ok(EntryIdentity::Model {
                vendor: model.vendor,
                model: model.model,
            }),
            (None, None) => Err(BoardError::parse(
                "leaderboard entry",
                "config names neither a model nor a strategy",
            )),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardDocument {
    #[serde(default)]
    pub entries: Vec<LeaderboardEntry>,
    /// Community boards name the model all strategies were played with.
    #[serde(default)]
    pub model: Option<String>,
}

impl LeaderboardDocument {
    pub fn board_model(&self) -> Result<Option<ModelRef>, BoardError> {
        self.model.as_deref().map(ModelRef::parse).transpose()
    }
}

// ---------------------------------------------------------------------------
// Detail document
// ---------------------------------------------------------------------------

/// Statistics of a single run (one seed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    #[serde(default)]
    pub seed: Option<String>,
    pub final_round: u32,
    pub calls: CallCounts,
    pub average: Metrics,
    pub std_dev: Metrics,
    /// Explicit link to the run's recorded artifacts.
    #[serde(default)]
    pub run_id: Option<String>,
}

impl RunRecord {
    pub fn seed_label(&self) -> &str {
        self.seed.as_deref().unwrap_or(UNKNOWN_SEED)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailTotals {
    pub input_tokens: f64,
    pub output_tokens: f64,
    #[serde(default)]
    pub input_cost: f64,
    #[serde(default)]
    pub output_cost: f64,
    pub total_cost: f64,
    pub time_ms: f64,
}

/// Per-seed breakdown behind one leaderboard entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetailDocument {
    #[serde(default)]
    pub stats: Vec<RunRecord>,
    #[serde(default)]
    pub providers: BTreeMap<String, u64>,
    #[serde(default)]
    pub total: Option<DetailTotals>,
    #[serde(default)]
    pub runs: Vec<String>,
}

impl DetailDocument {
    /// Published totals, or totals summed from the per-run averages.
    pub fn totals(&self) -> DetailTotals {
        if let Some(total) = self.total {
            return total;
        }
        self.stats.iter().fold(DetailTotals::default(), |mut acc, run| {
            let calls = run.calls.total as f64;
            acc.input_tokens += run.average.input_tokens * calls;
            acc.output_tokens += run.average.output_tokens * calls;
            acc.input_cost += run.average.input_cost * calls;
            acc.output_cost += run.average.output_cost * calls;
            acc.total_cost += run.average.total_cost * calls;
            acc.time_ms += run.average.time_ms * calls;
            acc
        })
    }

    /// Run id for the i-th per-run record. An explicit `run_id` wins;
    /// otherwise the i-th entry of `runs` is used.
    pub fn run_reference(&self, index: usize) -> Option<&str> {
        let record = self.stats.get(index)?;
        record
            .run_id
            .as_deref()
            .or_else(|| self.runs.get(index).map(String::as_str))
    }

    /// True when records rely on position and the two lists disagree in length.
    pub fn has_positional_mismatch(&self) -> bool {
        let explicit = self.stats.iter().all(|r| r.run_id.is_some());
        !explicit && !self.runs.is_empty() && self.runs.len() != self.stats.len()
    }
}

// ---------------------------------------------------------------------------
// Run artifacts
// ---------------------------------------------------------------------------

/// Token and cost accounting recorded alongside one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestMetadata {
    #[serde(default)]
    pub tokens_in: f64,
    #[serde(default)]
    pub tokens_out: f64,
    #[serde(default)]
    pub cost_in: f64,
    #[serde(default)]
    pub cost_out: f64,
}
