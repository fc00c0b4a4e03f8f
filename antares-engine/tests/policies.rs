use antares_core::test_utils::{RecordingRenderer, RenderEventKind};
use antares_core::{Action, Concurrency, RenderError, RenderOutcome, renderer_fn};
use antares_engine::RenderEngine;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Paused-clock timers fire on millisecond ticks.
fn assert_at(at: Duration, expected_ms: u64) {
    assert!(
        at >= ms(expected_ms) && at < ms(expected_ms + 5),
        "expected ~{expected_ms}ms, got {at:?}"
    );
}

fn act(kind: &str, n: u64) -> Action {
    Action::new(kind, json!(n))
}

fn engine(concurrency: Concurrency, renderer: &Arc<RecordingRenderer>) -> RenderEngine {
    RenderEngine::builder()
        .on("work", renderer.clone(), concurrency)
        .build()
}

// --- Routing ---

#[tokio::test]
async fn unregistered_type_is_skipped() {
    let renderer = Arc::new(RecordingRenderer::new(ms(10)));
    let engine = engine(Concurrency::Parallel, &renderer);

    let mut handles: Vec<_> = (0..8).map(|n| engine.submit(act("other", n))).collect();
    for handle in &mut handles {
        assert!(matches!(handle.try_outcome(), Some(RenderOutcome::Skipped)));
    }
    assert!(renderer.events().is_empty());
    assert_eq!(engine.tracked_types(), 0);
    assert_eq!(engine.policy_for("other"), None);
}

#[tokio::test]
async fn first_matching_registration_owns_the_type() {
    let wide = Arc::new(RecordingRenderer::new(ms(1)));
    let narrow = Arc::new(RecordingRenderer::new(ms(1)));
    let engine = RenderEngine::builder()
        .on("game/*", wide.clone(), Concurrency::Serial)
        .on("game/score", narrow.clone(), Concurrency::Parallel)
        .build();

    assert_eq!(engine.policy_for("game/score"), Some(Concurrency::Serial));
    engine.submit(act("game/score", 1)).settled().await;
    assert_eq!(wide.payloads(RenderEventKind::Finished), vec![json!(1)]);
    assert!(narrow.events().is_empty());
}

// --- parallel ---

#[tokio::test(start_paused = true)]
async fn parallel_runs_everything_at_once() {
    let renderer = Arc::new(RecordingRenderer::new(ms(100)));
    let engine = engine(Concurrency::Parallel, &renderer);

    let handles: Vec<_> = (1..=3).map(|n| engine.submit(act("work", n))).collect();
    assert_eq!(engine.in_flight("work"), 3);
    assert_eq!(engine.queued("work"), 0);

    for handle in handles {
        assert!(handle.settled().await.is_completed());
    }
    for (_, at) in renderer.finished() {
        assert_at(at, 100);
    }
    assert_eq!(engine.in_flight("work"), 0);
}

// --- serial ---

#[tokio::test(start_paused = true)]
async fn serial_queues_in_submission_order() {
    let renderer = Arc::new(RecordingRenderer::new(ms(10)));
    let engine = engine(Concurrency::Serial, &renderer);

    let handles: Vec<_> = (1..=4).map(|n| engine.submit(act("work", n))).collect();
    assert_eq!(engine.in_flight("work"), 1);
    assert_eq!(engine.queued("work"), 3);

    for handle in handles {
        assert!(handle.settled().await.is_completed());
    }
    assert_eq!(
        renderer.payloads(RenderEventKind::Started),
        vec![json!(1), json!(2), json!(3), json!(4)]
    );

    // never two running at once: every start comes after the previous finish
    let events = renderer.events();
    let mut running = 0;
    for event in events {
        match event.kind {
            RenderEventKind::Started => running += 1,
            _ => running -= 1,
        }
        assert!(running <= 1);
    }
}

#[tokio::test(start_paused = true)]
async fn serial_keeps_going_after_a_failure() {
    let renderer = Arc::new(RecordingRenderer::new(ms(10)).failing());
    let engine = engine(Concurrency::Serial, &renderer);

    let first = engine.submit(act("work", 1));
    let second = engine.submit(act("work", 2));

    assert!(matches!(
        first.settled().await,
        RenderOutcome::Failed(RenderError::Failed(_))
    ));
    assert!(matches!(second.settled().await, RenderOutcome::Failed(_)));
    assert_eq!(renderer.payloads(RenderEventKind::Started).len(), 2);
    assert_eq!(engine.current("work"), None);
}

#[tokio::test(start_paused = true)]
async fn cancelled_queued_action_never_starts() {
    let renderer = Arc::new(RecordingRenderer::new(ms(50)));
    let engine = engine(Concurrency::Serial, &renderer);

    let first = engine.submit(act("work", 1));
    let second = engine.submit(act("work", 2));
    let third = engine.submit(act("work", 3));
    second.cancel();

    assert!(first.settled().await.is_completed());
    assert!(matches!(second.settled().await, RenderOutcome::Cancelled));
    assert!(third.settled().await.is_completed());
    assert_eq!(
        renderer.payloads(RenderEventKind::Started),
        vec![json!(1), json!(3)]
    );
}

// --- cutoff ---

#[tokio::test(start_paused = true)]
async fn cutoff_burst_keeps_only_the_last() {
    let renderer = Arc::new(RecordingRenderer::new(ms(100)));
    let engine = engine(Concurrency::Cutoff, &renderer);

    let handles: Vec<_> = (1..=5).map(|n| engine.submit(act("work", n))).collect();
    assert_eq!(engine.in_flight("work"), 1);

    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.settled().await);
    }
    let (last, earlier) = outcomes.split_last().unwrap();
    assert!(earlier.iter().all(|o| matches!(o, RenderOutcome::Cancelled)));
    assert_eq!(last.value(), Some(&json!(5)));
    assert_eq!(renderer.payloads(RenderEventKind::Finished), vec![json!(5)]);
    assert_eq!(engine.current("work"), Some(json!(5)));
}

#[tokio::test(start_paused = true)]
async fn cutoff_discards_result_of_renderer_that_ignores_cancellation() {
    let renderer = Arc::new(RecordingRenderer::new(ms(100)).ignoring_cancellation());
    let engine = engine(Concurrency::Cutoff, &renderer);

    let first = engine.submit(act("work", 1));
    tokio::time::sleep(ms(50)).await;
    let second = engine.submit(act("work", 2));
    assert!(first.is_cancelled());

    // the superseded invocation runs to the end but its value is dropped
    assert!(matches!(first.settled().await, RenderOutcome::Cancelled));
    assert_eq!(engine.current("work"), None);

    assert_eq!(second.settled().await.value(), Some(&json!(2)));
    assert_eq!(engine.current("work"), Some(json!(2)));
    assert_eq!(
        renderer.payloads(RenderEventKind::Finished),
        vec![json!(1), json!(2)]
    );
}

// --- mute ---

#[tokio::test(start_paused = true)]
async fn mute_drops_while_busy_then_accepts_again() {
    let renderer = Arc::new(RecordingRenderer::new(ms(100)));
    let engine = engine(Concurrency::Mute, &renderer);

    let first = engine.submit(act("work", 0));
    let burst: Vec<_> = (1..=9).map(|n| engine.submit(act("work", n))).collect();
    for dropped in burst {
        assert!(matches!(dropped.settled().await, RenderOutcome::Dropped));
    }
    assert!(first.settled().await.is_completed());

    let later = engine.submit(act("work", 10));
    assert!(later.settled().await.is_completed());
    assert_eq!(
        renderer.payloads(RenderEventKind::Started),
        vec![json!(0), json!(10)]
    );
}

// --- Bookkeeping ---

#[tokio::test(start_paused = true)]
async fn wildcard_forgets_types_that_kept_nothing() {
    let failing = Arc::new(RecordingRenderer::new(ms(10)).failing());
    let engine = RenderEngine::builder()
        .on("*", failing.clone(), Concurrency::Parallel)
        .build();

    let handles: Vec<_> = (0..6)
        .map(|n| engine.submit(act(&format!("burst/{n}"), n)))
        .collect();
    assert_eq!(engine.tracked_types(), 6);
    for handle in handles {
        assert!(matches!(handle.settled().await, RenderOutcome::Failed(_)));
    }
    assert_eq!(engine.tracked_types(), 0);
}

#[tokio::test(start_paused = true)]
async fn kept_results_stay_tracked() {
    let renderer = Arc::new(RecordingRenderer::new(ms(10)));
    let engine = RenderEngine::builder()
        .on("*", renderer.clone(), Concurrency::Serial)
        .build();

    engine.submit(act("a", 1)).settled().await;
    engine.submit(act("b", 2)).settled().await;
    assert_eq!(engine.tracked_types(), 2);
    assert_eq!(engine.current("b"), Some(json!(2)));
}

// --- Independence ---

#[tokio::test(start_paused = true)]
async fn types_under_one_registration_are_independent() {
    let renderer = Arc::new(RecordingRenderer::new(ms(100)));
    let engine = RenderEngine::builder()
        .on("*", renderer.clone(), Concurrency::Serial)
        .build();

    let a = engine.submit(act("left", 1));
    let b = engine.submit(act("right", 2));
    assert_eq!(engine.queued("left"), 0);
    assert_eq!(engine.queued("right"), 0);

    assert!(a.settled().await.is_completed());
    assert!(b.settled().await.is_completed());
    for (_, at) in renderer.finished() {
        assert_at(at, 100);
    }
}

// --- Failure containment ---

#[tokio::test]
async fn panicking_renderer_is_reported_and_contained() {
    let renderer = Arc::new(renderer_fn(|action: Action, _ctx| async move {
        if action.action_type() == "explode" {
            panic!("boom");
        }
        Ok::<_, RenderError>(json!("ok"))
    }));
    let engine = RenderEngine::builder()
        .on("*", renderer, Concurrency::Serial)
        .build();

    let outcome = engine.submit(Action::new("explode", json!(null))).settled().await;
    assert!(matches!(
        outcome,
        RenderOutcome::Failed(RenderError::Panicked(_))
    ));

    let outcome = engine.submit(Action::new("explode", json!(null))).settled().await;
    assert!(matches!(outcome, RenderOutcome::Failed(_)));

    let outcome = engine.submit(Action::new("calm", json!(null))).settled().await;
    assert_eq!(outcome.value(), Some(&json!("ok")));
}

#[test]
fn submitting_outside_a_runtime_fails_the_handle() {
    let renderer = Arc::new(RecordingRenderer::new(ms(1)));
    let engine = engine(Concurrency::Parallel, &renderer);

    let mut handle = engine.submit(act("work", 1));
    assert!(matches!(
        handle.try_outcome(),
        Some(RenderOutcome::Failed(RenderError::Failed(_)))
    ));
    assert_eq!(engine.in_flight("work"), 0);
}

// --- Shutdown ---

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_running_and_queued() {
    let renderer = Arc::new(RecordingRenderer::new(ms(100)));
    let engine = engine(Concurrency::Serial, &renderer);

    let running = engine.submit(act("work", 1));
    let queued = engine.submit(act("work", 2));
    engine.shutdown();
    assert!(engine.is_shut_down());

    assert!(matches!(running.settled().await, RenderOutcome::Cancelled));
    assert!(matches!(queued.settled().await, RenderOutcome::Cancelled));
    assert_eq!(renderer.payloads(RenderEventKind::Started), vec![json!(1)]);

    let late = engine.submit(act("work", 3));
    assert!(matches!(late.settled().await, RenderOutcome::Cancelled));
}
