mod common;

use std::sync::Arc;
use std::time::Duration;

use benchboard_protocol::{BoardError, RunLocator};
use benchboard_viewer::run_viewer::{discover_total, load_request, Position};
use benchboard_viewer::{Direction, OpenRequest, RequestContent, RunViewerController, StepOutcome};
use common::StubFetcher;
use serde_json::json;

fn locator() -> RunLocator {
    RunLocator {
        base_path: "https://data.test/runs".into(),
        vendor: "openai".into(),
        model: "gpt".into(),
        strategy: None,
    }
}

/// Two runs with two requests each.
fn two_by_two() -> Arc<StubFetcher> {
    let fetcher = StubFetcher::new();
    fetcher.add_run(&locator(), "r_A", 2);
    fetcher.add_run(&locator(), "r_B", 2);
    Arc::new(fetcher)
}

fn request(runs: &[&str], run_index: usize) -> OpenRequest {
    OpenRequest {
        locator: locator(),
        runs: runs.iter().map(|r| r.to_string()).collect(),
        run_index,
        start_index: 1,
    }
}

fn at(run_index: usize, request_index: u32) -> Option<Position> {
    Some(Position { run_index, request_index })
}

fn tool_call(viewer: &RunViewerController) -> String {
    match viewer.content() {
        Some(RequestContent::Ready(bundle)) => bundle.tool_call.clone(),
        other => panic!("expected ready content, got {other:?}"),
    }
}

#[tokio::test]
async fn test_navigation_wraps_across_runs() {
    let fetcher = two_by_two();
    let mut viewer = RunViewerController::new();
    let ticket = viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    assert!(viewer.load_for(fetcher.as_ref(), &ticket).await);
    assert_eq!(tool_call(&viewer), r#"r_A-1({"card":1})"#);

    let forward = [at(0, 2), at(1, 1), at(1, 2), at(0, 1)];
    for expected in forward {
        assert!(viewer.navigate(fetcher.as_ref(), Direction::Forward).await);
        assert_eq!(viewer.position(), expected);
    }

    let backward = [at(1, 2), at(1, 1), at(0, 2), at(0, 1)];
    for expected in backward {
        assert!(viewer.navigate(fetcher.as_ref(), Direction::Backward).await);
        assert_eq!(viewer.position(), expected);
    }
    assert_eq!(tool_call(&viewer), r#"r_A-1({"card":1})"#);
}

#[tokio::test]
async fn test_title_reports_position_and_total() {
    let fetcher = two_by_two();
    let mut viewer = RunViewerController::new();
    viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 1)).await.unwrap();
    assert_eq!(viewer.title().unwrap(), "openai/gpt • B • Run 2/2 • Request 1/?");

    viewer.navigate(fetcher.as_ref(), Direction::Forward).await;
    assert_eq!(viewer.title().unwrap(), "openai/gpt • B • Run 2/2 • Request 2/2");
}

#[tokio::test]
async fn test_open_requires_first_request() {
    let fetcher = two_by_two();
    let mut viewer = RunViewerController::new();

    let err = viewer
        .open(fetcher.as_ref(), request(&["r_missing"], 0))
        .await
        .unwrap_err();
    assert!(matches!(err, BoardError::ProbeNotFound { .. }));
    assert!(!viewer.is_open());
    assert_eq!(fetcher.requests().len(), 1, "only the first marker is fetched");

    // A failed open leaves an existing session untouched.
    viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    viewer.navigate(fetcher.as_ref(), Direction::Forward).await;
    assert!(viewer.open(fetcher.as_ref(), request(&["r_missing"], 0)).await.is_err());
    assert_eq!(viewer.position(), at(0, 2));
    assert_eq!(viewer.run_id(), Some("r_A"));
}

#[tokio::test]
async fn test_stale_loads_never_overwrite_latest() {
    let fetcher = two_by_two();
    let loc = locator();
    fetcher.delay(loc.marker_path("r_A", 2), Duration::from_millis(80));

    let mut viewer = RunViewerController::new();
    let first = viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    viewer.load_for(fetcher.as_ref(), &first).await;

    let slow_ticket = viewer.step_now(fetcher.as_ref(), Direction::Forward).await.unwrap();
    let fast_ticket = viewer.step_now(fetcher.as_ref(), Direction::Forward).await.unwrap();
    assert_eq!(fast_ticket.position, Position { run_index: 1, request_index: 1 });

    let spawn_load = |run_id: &'static str, index: u32| {
        let fetcher = Arc::clone(&fetcher);
        let loc = loc.clone();
        tokio::spawn(async move { load_request(fetcher.as_ref(), &loc, run_id, index).await })
    };
    let slow = spawn_load("r_A", 2);
    let fast = spawn_load("r_B", 1);

    // Newest first, then the late one.
    assert!(viewer.apply(&fast_ticket, fast.await.unwrap()));
    assert!(!viewer.apply(&slow_ticket, slow.await.unwrap()));
    assert_eq!(tool_call(&viewer), r#"r_B-1({"card":1})"#);
    assert_eq!(viewer.position(), at(1, 1));
}

#[tokio::test]
async fn test_stale_load_arriving_first_is_dropped() {
    let fetcher = two_by_two();
    let loc = locator();
    let mut viewer = RunViewerController::new();
    viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();

    let older = viewer.step_now(fetcher.as_ref(), Direction::Forward).await.unwrap();
    let newer = viewer.step_now(fetcher.as_ref(), Direction::Backward).await.unwrap();

    let old_content = load_request(fetcher.as_ref(), &loc, "r_A", 2).await;
    assert!(!viewer.apply(&older, old_content));
    assert_eq!(viewer.content(), Some(&RequestContent::Loading));

    let new_content = load_request(fetcher.as_ref(), &loc, "r_A", 1).await;
    assert!(viewer.apply(&newer, new_content));
    assert_eq!(tool_call(&viewer), r#"r_A-1({"card":1})"#);
}

#[tokio::test]
async fn test_unavailable_request_stays_navigable() {
    let fetcher = two_by_two();
    let mut viewer = RunViewerController::new();
    viewer.open(fetcher.as_ref(), request(&["r_A", "r_empty"], 0)).await.unwrap();

    let ticket = viewer.jump_run(1).unwrap();
    viewer.load_for(fetcher.as_ref(), &ticket).await;
    assert!(matches!(viewer.content(), Some(RequestContent::Unavailable { .. })));
    assert!(viewer.is_open());

    // The empty run counts as a single request, so forward wraps to run 1.
    assert!(viewer.navigate(fetcher.as_ref(), Direction::Forward).await);
    assert_eq!(viewer.position(), at(0, 1));
    assert_eq!(tool_call(&viewer), r#"r_A-1({"card":1})"#);
}

#[tokio::test]
async fn test_revisited_request_is_served_from_cache() {
    let fetcher = two_by_two();
    let mut viewer = RunViewerController::new();
    let ticket = viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    viewer.load_for(fetcher.as_ref(), &ticket).await;
    viewer.navigate(fetcher.as_ref(), Direction::Forward).await;

    let marker = locator().marker_path("r_A", 1);
    let before = fetcher.count(&marker);
    let back = viewer.step_now(fetcher.as_ref(), Direction::Backward).await.unwrap();
    assert!(!back.needs_load());
    assert_eq!(tool_call(&viewer), r#"r_A-1({"card":1})"#);
    assert_eq!(fetcher.count(&marker), before);
}

#[tokio::test]
async fn test_step_never_waits_on_the_network() {
    let loc = locator();
    let fetcher = StubFetcher::new();
    fetcher.add_run(&loc, "r_A", 40);
    for index in 1..=40 {
        fetcher.delay(loc.marker_path("r_A", index), Duration::from_millis(50));
    }
    let mut viewer = RunViewerController::new();
    let ticket = viewer.open(&fetcher, request(&["r_A"], 0)).await.unwrap();
    viewer.load_for(&fetcher, &ticket).await;
    fetcher.clear_log();

    let pending = match viewer.step(Direction::Forward) {
        Some(StepOutcome::NeedsTotal(pending)) => pending,
        other => panic!("expected a count request, got {other:?}"),
    };
    assert!(fetcher.requests().is_empty(), "stepping fetched {:?}", fetcher.requests());
    assert_eq!(viewer.position(), at(0, 1));
    assert_eq!(viewer.title().unwrap(), "openai/gpt • A • Run 1/1 • Request 1/?");

    let total = discover_total(&fetcher, &loc, &pending.run_id).await;
    assert_eq!(total, 40);
    let moved = viewer.resume_step(&pending, total).unwrap();
    assert_eq!(moved.position, Position { run_index: 0, request_index: 2 });
    assert_eq!(viewer.title().unwrap(), "openai/gpt • A • Run 1/1 • Request 2/40");

    // Once counted, steps move straight away.
    fetcher.clear_log();
    assert!(matches!(viewer.step(Direction::Forward), Some(StepOutcome::Moved(_))));
    assert!(fetcher.requests().is_empty());
    assert_eq!(viewer.position(), at(0, 3));
}

#[tokio::test]
async fn test_step_waiting_on_count_is_superseded() {
    let fetcher = two_by_two();
    let mut viewer = RunViewerController::new();
    viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();

    let Some(StepOutcome::NeedsTotal(pending)) = viewer.step(Direction::Forward) else {
        panic!("forward from an uncounted run needs its count");
    };
    viewer.jump_run(1).unwrap();
    assert_eq!(viewer.resume_step(&pending, 2), None);
    assert_eq!(viewer.position(), at(1, 1));

    // The count itself is kept.
    viewer.jump_run(-1).unwrap();
    let Some(StepOutcome::Moved(ticket)) = viewer.step(Direction::Forward) else {
        panic!("count of r_A should be known");
    };
    assert_eq!(ticket.position, Position { run_index: 0, request_index: 2 });

    // Counts for a session that has since been replaced are ignored.
    viewer.close();
    viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    assert_eq!(viewer.resume_step(&pending, 2), None);
    assert_eq!(viewer.total_request().unwrap().run_id, "r_A");
}

#[tokio::test]
async fn test_step_onto_prefetched_request_is_prefilled() {
    let fetcher = two_by_two();
    let loc = locator();
    let mut viewer = RunViewerController::new();
    let first = viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    assert!(viewer.prefetch_targets().is_empty(), "nothing to prefetch before content is shown");
    viewer.load_for(fetcher.as_ref(), &first).await;

    let targets = viewer.prefetch_targets();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].request_index, 2);
    assert_eq!(viewer.prefetch_now(fetcher.as_ref()).await, 1);
    assert!(viewer.prefetch_targets().is_empty());

    // Prefetching leaves the shown request and its ticket alone.
    assert_eq!(tool_call(&viewer), r#"r_A-1({"card":1})"#);
    let reload = load_request(fetcher.as_ref(), &loc, "r_A", 1).await;
    assert!(viewer.apply(&first, reload));

    fetcher.clear_log();
    let ticket = viewer.step_now(fetcher.as_ref(), Direction::Forward).await.unwrap();
    assert!(ticket.prefilled);
    assert_eq!(tool_call(&viewer), r#"r_A-2({"card":1})"#);
    assert_eq!(fetcher.count(&loc.artifact_path("r_A", 2, "reasoning.md")), 0);
}

#[tokio::test]
async fn test_prefetch_keeps_only_ready_content_of_the_open_session() {
    let fetcher = two_by_two();
    let loc = locator();
    let mut viewer = RunViewerController::new();
    let first = viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    viewer.load_for(fetcher.as_ref(), &first).await;
    let next = viewer.prefetch_targets().remove(0);

    let missing = RequestContent::Unavailable { reason: "gone".into() };
    assert!(!viewer.store_prefetched(&next, missing));
    assert_eq!(viewer.prefetch_targets(), vec![next.clone()]);

    let content = load_request(fetcher.as_ref(), &loc, "r_A", 2).await;
    viewer.close();
    viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    assert!(!viewer.store_prefetched(&next, content));
}

#[tokio::test]
async fn test_request_cache_keeps_twenty_most_recent() {
    let loc = locator();
    let fetcher = StubFetcher::new();
    fetcher.add_run(&loc, "r_A", 22);
    let mut viewer = RunViewerController::new();
    let ticket = viewer.open(&fetcher, request(&["r_A"], 0)).await.unwrap();
    viewer.load_for(&fetcher, &ticket).await;
    for _ in 0..21 {
        assert!(viewer.navigate(&fetcher, Direction::Forward).await);
    }
    assert_eq!(viewer.position(), at(0, 22));

    for expected in (3..=21).rev() {
        let back = viewer.step_now(&fetcher, Direction::Backward).await.unwrap();
        assert_eq!(back.position.request_index, expected);
        assert!(back.prefilled, "request {expected} should still be cached");
    }
    let evicted = viewer.step_now(&fetcher, Direction::Backward).await.unwrap();
    assert_eq!(evicted.position.request_index, 2);
    assert!(!evicted.prefilled);
}

#[tokio::test]
async fn test_jump_run_restores_request_and_stops_at_ends() {
    let fetcher = two_by_two();
    let mut viewer = RunViewerController::new();
    viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    viewer.navigate(fetcher.as_ref(), Direction::Forward).await;

    assert!(viewer.jump_run(-1).is_none());
    assert_eq!(viewer.jump_run(1).unwrap().position, Position { run_index: 1, request_index: 1 });
    assert!(viewer.jump_run(1).is_none());
    assert_eq!(viewer.jump_run(-1).unwrap().position, Position { run_index: 0, request_index: 2 });
}

#[tokio::test]
async fn test_close_discards_session() {
    let fetcher = two_by_two();
    let mut viewer = RunViewerController::new();
    viewer.open(fetcher.as_ref(), request(&["r_A", "r_B"], 0)).await.unwrap();
    let ticket = viewer.step_now(fetcher.as_ref(), Direction::Forward).await.unwrap();

    viewer.close();
    assert!(!viewer.is_open());
    assert_eq!(viewer.position(), None);
    assert_eq!(viewer.title(), None);

    let content = load_request(fetcher.as_ref(), &locator(), "r_A", 2).await;
    assert!(!viewer.apply(&ticket, content));
}

#[tokio::test]
async fn test_request_bundle_pieces() {
    let fetcher = StubFetcher::new();
    let loc = locator();
    fetcher.add_request(&loc, "run_S1", 1, "play_hand");
    fetcher.insert(loc.artifact_path("run_S1", 1, "gamestate.md"), "## Hand\n- 7H");
    fetcher.insert(loc.artifact_path("run_S1", 1, "strategy.md"), "");
    fetcher.insert(loc.artifact_path("run_S1", 1, "screenshot.png"), vec![0u8; 4]);
    fetcher.insert_json(
        loc.artifact_path("run_S1", 1, "metadata.json"),
        &json!({"tokens_in": 100, "tokens_out": 20, "cost_in": 0.001, "cost_out": 0.002}),
    );

    let bundle = match load_request(&fetcher, &loc, "run_S1", 1).await {
        RequestContent::Ready(bundle) => bundle,
        other => panic!("expected ready content, got {other:?}"),
    };
    assert_eq!(bundle.tool_call, r#"play_hand({"card":1})"#);
    assert_eq!(bundle.gamestate, "## Hand\n- 7H");
    assert_eq!(bundle.strategy, "(No strategy.md)");
    assert_eq!(bundle.memory, "(No memory.md)");
    assert_eq!(
        bundle.screenshot.as_deref(),
        Some("https://data.test/runs/openai/gpt/run_S1/request-00001/screenshot.png")
    );
    assert_eq!(bundle.metadata.unwrap().tokens_in, 100.0);

    let fetcher = Arc::new(fetcher);
    let mut viewer = RunViewerController::new();
    let ticket = viewer.open(fetcher.as_ref(), request(&["run_S1"], 0)).await.unwrap();
    viewer.load_for(fetcher.as_ref(), &ticket).await;
    assert_eq!(
        viewer.title().unwrap(),
        "openai/gpt • S1 • Run 1/1 • Request 1/? • in/out 100/20 • $ in/out 0.0010/0.0020"
    );
}
