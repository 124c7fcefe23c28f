//! In-memory document source and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use benchboard_protocol::{BoardError, RunLocator, TOOL_CALL_FILE};
use benchboard_viewer::{DataFetcher, FetchFuture};
use serde_json::{json, Value};

pub const ROOT: &str = "https://data.test";

/// Serves registered paths, logs every request and can delay chosen paths.
/// Unknown paths answer 404.
#[derive(Default)]
pub struct StubFetcher {
    files: Mutex<HashMap<String, Vec<u8>>>,
    delays: Mutex<HashMap<String, Duration>>,
    log: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.files.lock().unwrap().insert(path.into(), body.into());
    }

    pub fn insert_json(&self, path: impl Into<String>, value: &Value) {
        self.insert(path, value.to_string());
    }

    pub fn delay(&self, path: impl Into<String>, delay: Duration) {
        self.delays.lock().unwrap().insert(path.into(), delay);
    }

    pub fn requests(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, path: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|p| *p == path).count()
    }

    pub fn clear_log(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Record a request with a tool call and a reasoning file.
    pub fn add_request(&self, locator: &RunLocator, run_id: &str, index: u32, tool: &str) {
        self.insert_json(
            locator.marker_path(run_id, index),
            &json!({"function": {"name": tool, "arguments": "{\"card\": 1, \"reasoning\": \"why\"}"}}),
        );
        self.insert(
            locator.artifact_path(run_id, index, "reasoning.md"),
            format!("thinking about {run_id} #{index}"),
        );
    }

    /// Record requests `1..=count` of a run, named `{run_id}-{index}`.
    pub fn add_run(&self, locator: &RunLocator, run_id: &str, count: u32) {
        for index in 1..=count {
            self.add_request(locator, run_id, index, &format!("{run_id}-{index}"));
        }
    }
}

impl DataFetcher for StubFetcher {
    fn fetch<'a>(&'a self, path: &'a str) -> FetchFuture<'a, Vec<u8>> {
        Box::pin(async move {
            self.log.lock().unwrap().push(path.to_string());
            let delay = self.delays.lock().unwrap().get(path).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            let body = self.files.lock().unwrap().get(path).cloned();
            body.ok_or_else(|| BoardError::Status {
                path: path.to_string(),
                status: 404,
            })
        })
    }
}

pub fn manifest(versions: &[&str], default: &str) -> Value {
    json!({"versions": versions, "default": default})
}

pub fn model_entry(model: &str, avg: f64, calls: [u64; 3]) -> Value {
    let [successful, failed, error] = calls;
    json!({
        "config": {"model": model},
        "avg_final_round": avg,
        "std_dev_final_round": 0.5,
        "calls": {"successful": successful, "failed": failed, "error": error,
                  "total": successful + failed + error},
        "average": {"input_tokens": 1234.5, "output_tokens": 210.0, "time_ms": 5120.0, "total_cost": 0.0021},
        "std_dev": {"input_tokens": 67.8, "output_tokens": 12.2, "time_ms": 800.0, "total_cost": 0.0004}
    })
}

pub fn strategy_entry(name: &str, author: &str, avg: f64) -> Value {
    json!({
        "config": {"strategy": {"name": name, "author": author}},
        "avg_final_round": avg,
        "std_dev_final_round": 1.0,
        "calls": {"successful": 8, "failed": 1, "error": 1, "total": 10},
        "average": {"input_tokens": 900.0, "output_tokens": 90.0, "time_ms": 2000.0, "total_cost": 0.001},
        "std_dev": {"input_tokens": 10.0, "output_tokens": 1.0, "time_ms": 100.0, "total_cost": 0.0001}
    })
}

pub fn run_record(seed: &str, final_round: u32) -> Value {
    json!({
        "seed": seed,
        "final_round": final_round,
        "calls": {"successful": 9, "failed": 1, "error": 0, "total": 10},
        "average": {"input_tokens": 1000.0, "output_tokens": 100.0, "time_ms": 3000.0, "total_cost": 0.002},
        "std_dev": {"input_tokens": 50.0, "output_tokens": 5.0, "time_ms": 300.0, "total_cost": 0.0002}
    })
}

pub fn detail_doc(seeds: &[(&str, u32)], runs: &[&str]) -> Value {
    json!({
        "stats": seeds.iter().map(|(s, r)| run_record(s, *r)).collect::<Vec<_>>(),
        "providers": {"Groq": 3, "DeepInfra": 1},
        "runs": runs,
    })
}

/// Model-mode site for version `v1` with two entries and their details.
pub fn model_site() -> StubFetcher {
    let fetcher = StubFetcher::new();
    let root = format!("{ROOT}/benchmarks/models");
    fetcher.insert_json(format!("{root}/manifest.json"), &manifest(&["v1", "v2"], "v1"));
    fetcher.insert_json(
        format!("{root}/v1/default/leaderboard.json"),
        &json!({"entries": [
            model_entry("openai/gpt-oss-20b", 4.25, [90, 6, 4]),
            model_entry("google/gemini-2.5-flash", 3.5, [1, 1, 1]),
        ]}),
    );
    fetcher.insert_json(
        format!("{root}/v1/default/openai/gpt-oss-20b.json"),
        &detail_doc(&[("AAA", 4), ("BBB", 5)], &["run_AAA", "run_BBB"]),
    );
    fetcher.insert_json(
        format!("{root}/v1/default/google/gemini-2.5-flash.json"),
        &detail_doc(&[("CCC", 3)], &["run_CCC"]),
    );
    fetcher.insert_json(
        format!("{root}/v2/default/leaderboard.json"),
        &json!({"entries": [model_entry("openai/gpt-oss-20b", 5.0, [10, 0, 0])]}),
    );
    fetcher.insert_json(
        format!("{root}/v2/default/openai/gpt-oss-20b.json"),
        &detail_doc(&[("DDD", 6)], &["run_DDD"]),
    );
    fetcher
}

pub fn marker_exists(fetcher: &StubFetcher, locator: &RunLocator, run_id: &str, index: u32) -> bool {
    fetcher
        .files
        .lock()
        .unwrap()
        .contains_key(&locator.artifact_path(run_id, index, TOOL_CALL_FILE))
}
