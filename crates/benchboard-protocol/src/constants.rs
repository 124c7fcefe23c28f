/// Index of the first recorded request of a run (requests are 1-based).
pub const FIRST_REQUEST_INDEX: u32 = 1;

/// Request ids are zero padded to this many digits ("00001").
pub const REQUEST_ID_WIDTH: usize = 5;

/// Upper bound used when discovering how many requests a run recorded.
pub const MAX_REQUESTS_PER_RUN: u32 = 1000;

/// Number of request bundles kept per run viewer session.
pub const REQUEST_CACHE_CAPACITY: usize = 20;

/// Seed label used when a per-run record does not carry one.
pub const UNKNOWN_SEED: &str = "Unknown";

/// Artifact that marks a recorded request as present.
pub const TOOL_CALL_FILE: &str = "tool_call.json";
pub const METADATA_FILE: &str = "metadata.json";
pub const REASONING_FILE: &str = "reasoning.md";
pub const STRATEGY_FILE: &str = "strategy.md";
pub const GAMESTATE_FILE: &str = "gamestate.md";
pub const MEMORY_FILE: &str = "memory.md";

/// Screenshot encodings in lookup order.
pub const SCREENSHOT_FORMATS: [&str; 3] = ["webp", "png", "avif"];

/// Production CDN origin for published benchmark data.
pub const PRODUCTION_DATA_ROOT: &str = "https://balatrobench-prod.b-cdn.net";
