use benchboard_protocol::*;

const MODEL_ENTRY: &str = r#"{
    "config": {"model": "openai/gpt-oss-20b"},
    "avg_final_round": 4.25,
    "std_dev_final_round": 1.5,
    "calls": {"successful": 90, "failed": 6, "error": 4, "total": 100},
    "average": {"input_tokens": 1234.5, "output_tokens": 210.0, "time_ms": 5120.0, "total_cost": 0.0021},
    "std_dev": {"input_tokens": 67.8, "output_tokens": 12.2, "time_ms": 800.0, "total_cost": 0.0004}
}"#;

#[test]
fn test_manifest_plain_versions() {
    let m: Manifest = serde_json::from_str(r#"{"versions": ["v1", "v2"], "default": "v2"}"#).unwrap();
    assert_eq!(m.version_names(), vec!["v1", "v2"]);
    assert_eq!(m.default_version(), Some("v2"));
    assert!(m.contains("v1"));
    assert!(!m.contains("v9"));
}

#[test]
fn test_manifest_latest_flag_is_default() {
    let m: Manifest = serde_json::from_str(
        r#"{"versions": [
            {"version": "v0.9", "label": "Preview"},
            {"version": "v1.0", "latest": true}
        ]}"#,
    )
    .unwrap();
    assert_eq!(m.default_version(), Some("v1.0"));
    assert_eq!(m.versions[0].label(), "Preview");
    assert_eq!(m.versions[1].label(), "v1.0");
}

#[test]
fn test_model_entry_identity() {
    let entry: LeaderboardEntry = serde_json::from_str(MODEL_ENTRY).unwrap();
    assert!(entry.calls.is_consistent());
    let id = entry.identity(None).unwrap();
    assert_eq!(id.primary(), "gpt-oss-20b");
    assert_eq!(id.secondary(), "openai");
    assert_eq!(id.strategy(), None);
    assert_eq!(
        id.detail_key(),
        DetailKey { owner: "openai".into(), name: "gpt-oss-20b".into() }
    );
}

#[test]
fn test_strategy_entry_takes_board_model() {
    let doc: LeaderboardDocument = serde_json::from_str(
        r#"{
            "model": "google/gemini-2.5-flash",
            "entries": [{
                "config": {"strategy": {"name": "aggressive", "author": "alice"}},
                "avg_final_round": 3.0, "std_dev_final_round": 0.5,
                "calls": {"successful": 1, "failed": 0, "error": 0, "total": 1},
                "average": {"input_tokens": 1, "output_tokens": 1, "time_ms": 1, "total_cost": 0},
                "std_dev": {"input_tokens": 0, "output_tokens": 0, "time_ms": 0, "total_cost": 0}
            }]
        }"#,
    )
    .unwrap();
    let board_model = doc.board_model().unwrap();
    let id = doc.entries[0].identity(board_model.as_ref()).unwrap();
    assert_eq!(id.primary(), "aggressive");
    assert_eq!(id.secondary(), "alice");
    assert_eq!(id.vendor(), "google");
    assert_eq!(id.model(), "gemini-2.5-flash");
    assert_eq!(detail_path("/base", &id), "/base/aggressive/runs.json");
}

#[test]
fn test_strategy_without_any_model_is_rejected() {
    let mut entry: LeaderboardEntry = serde_json::from_str(MODEL_ENTRY).unwrap();
    entry.config = EntryConfig {
        model: None,
        strategy: Some(StrategyRef::Name("lonely".into())),
    };
    assert!(matches!(entry.identity(None), Err(BoardError::Parse { .. })));
}

#[test]
fn test_malformed_model_id() {
    assert!(ModelRef::parse("no-slash").is_err());
    assert!(ModelRef::parse("/model").is_err());
    let m = ModelRef::parse("meta/llama/3").unwrap();
    assert_eq!(m.vendor, "meta");
    assert_eq!(m.model, "llama/3");
}

#[test]
fn test_detail_totals_fall_back_to_records() {
    let doc: DetailDocument = serde_json::from_str(
        r#"{
            "stats": [
                {"seed": "AAA", "final_round": 3,
                 "calls": {"successful": 10, "failed": 0, "error": 0, "total": 10},
                 "average": {"input_tokens": 100, "output_tokens": 10, "time_ms": 1000, "total_cost": 0.01},
                 "std_dev": {"input_tokens": 0, "output_tokens": 0, "time_ms": 0, "total_cost": 0}},
                {"final_round": 5,
                 "calls": {"successful": 5, "failed": 5, "error": 0, "total": 10},
                 "average": {"input_tokens": 200, "output_tokens": 20, "time_ms": 2000, "total_cost": 0.02},
                 "std_dev": {"input_tokens": 0, "output_tokens": 0, "time_ms": 0, "total_cost": 0}}
            ],
            "providers": {"Groq": 3, "DeepInfra": 1},
            "runs": ["run-a", "run-b"]
        }"#,
    )
    .unwrap();
    let totals = doc.totals();
    assert_eq!(totals.input_tokens, 3000.0);
    assert_eq!(totals.output_tokens, 300.0);
    assert_eq!(totals.time_ms, 30000.0);
    assert!((totals.total_cost - 0.3).abs() < 1e-9);
    assert_eq!(doc.stats[1].seed_label(), UNKNOWN_SEED);
    assert_eq!(doc.run_reference(1), Some("run-b"));
    assert_eq!(doc.run_reference(2), None);
    assert!(!doc.has_positional_mismatch());
}

#[test]
fn test_explicit_run_id_beats_position() {
    let mut doc = DetailDocument::default();
    doc.stats.push(RunRecord {
        seed: Some("S".into()),
        final_round: 1,
        calls: CallCounts::default(),
        average: Metrics::default(),
        std_dev: Metrics::default(),
        run_id: Some("explicit".into()),
    });
    doc.runs = vec!["positional".into(), "extra".into()];
    assert_eq!(doc.run_reference(0), Some("explicit"));
    assert!(!doc.has_positional_mismatch());

    doc.stats[0].run_id = None;
    assert_eq!(doc.run_reference(0), Some("positional"));
    assert!(doc.has_positional_mismatch());
}

#[test]
fn test_error_classification() {
    let status = BoardError::Status { path: "x".into(), status: 404 };
    assert!(status.is_fetch_failure());
    assert!(status.is_not_found());
    let parse = BoardError::parse("x", "bad json");
    assert!(!parse.is_fetch_failure());
    assert_eq!(parse.to_string(), "failed to parse x: bad json");
}
