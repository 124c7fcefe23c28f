//! Benchboard Protocol - document types and path templates
//!
//! Describes the JSON documents produced by the benchmark harness
//! (manifest, leaderboard, per-entry detail, per-request artifacts) and
//! the fixed directory layout they are published under.

pub mod constants;
pub mod error;
pub mod paths;
pub mod types;

pub use constants::*;
pub use error::*;
pub use paths::{detail_path, format_request_id, RunLocator};
pub use types::*;
