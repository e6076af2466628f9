mod common;

use common::{hosts, live_config, probe_payload, search_payload, FakeApi, RecordingSurface, Reply};
use osiris_core::render::RENDER_BATCH_DELAY;
use osiris_core::{
    ui_channel, Config, CorrelationStage, LogSink, MemoryLogSink, NullLogSink, RefreshCoordinator,
    RefreshOutcome, RefreshTrigger, RenderScheduler, RenderSnapshot, SharedState, StatusLine,
    UiQueue,
};
use std::sync::Arc;
use std::time::Duration;

type Coordinator = RefreshCoordinator<RecordingSurface>;

fn coordinator_for(
    api: Arc<FakeApi>,
    config: Config,
    log: Arc<dyn LogSink>,
) -> (Coordinator, UiQueue<RecordingSurface>) {
    let (submitter, queue) = ui_channel();
    let coordinator = RefreshCoordinator::new(
        api,
        config,
        SharedState::default(),
        RenderScheduler::new(submitter),
        log,
    );
    (coordinator, queue)
}

/// Lets every spawned task run to quiescence on the paused clock.
async fn settle() {
    tokio::time::sleep(Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn overlapping_trigger_is_dropped() {
    let api = Arc::new(
        FakeApi::new()
            .with_search(Reply::Json(search_payload(&[("web-01", "g1")])))
            .gated(),
    );
    let (coordinator, _queue) = coordinator_for(api.clone(), live_config(), Arc::new(NullLogSink));
    let coordinator = Arc::new(coordinator);

    let first = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        async move { coordinator.refresh(RefreshTrigger::Timer).await }
    });
    while !coordinator.state().is_refreshing() {
        tokio::task::yield_now().await;
    }

    let second = coordinator.refresh(RefreshTrigger::Manual).await;
    assert!(matches!(second, RefreshOutcome::Skipped));
    assert_eq!(api.search_calls(), 1);

    api.release();
    let first = first.await.expect("first refresh");
    assert!(matches!(first, RefreshOutcome::Completed { generation: 1, .. }));
    assert!(!coordinator.state().is_refreshing());

    api.release();
    let third = coordinator.refresh(RefreshTrigger::Manual).await;
    assert!(matches!(third, RefreshOutcome::Completed { generation: 2, .. }));
    assert_eq!(api.search_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn raw_rows_paint_before_correlated_rows() {
    let api = Arc::new(
        FakeApi::new()
            .with_search(Reply::Json(search_payload(&[("web-01", "g1"), ("db-01", "g2")])))
            .with_probe(Reply::Delayed(
                Duration::from_secs(1),
                probe_payload("g2", "Disk full", "[CRITICAL] /var at 99%"),
            )),
    );
    let log = Arc::new(MemoryLogSink::default());
    let (coordinator, mut queue) = coordinator_for(api.clone(), live_config(), log.clone());
    let mut surface = RecordingSurface::default();

    let RefreshOutcome::Completed {
        entity_count,
        error,
        correlation: Some(correlation),
        ..
    } = coordinator.refresh(RefreshTrigger::Manual).await
    else {
        panic!("refresh should complete with a correlation task");
    };
    assert_eq!(entity_count, 2);
    assert_eq!(error, None);
    assert!(coordinator
        .state()
        .snapshot()
        .entities
        .iter()
        .all(|entity| !entity.has_alert));

    tokio::time::sleep(Duration::from_millis(100)).await;
    queue.drain(&mut surface);
    assert_eq!(surface.paints.len(), 1);
    assert!(surface.paints[0].iter().all(|row| !row.has_alert));
    assert_eq!(surface.selection, Some(0));

    let report = correlation.await.expect("correlation task");
    assert_eq!(report.matched_stage, Some(CorrelationStage::StructuredProbe));
    assert_eq!(api.discovery_calls(), 0);
    assert_eq!(api.violation_calls(), 0);

    settle().await;
    queue.drain(&mut surface);
    let last = surface.paints.last().expect("correlated paint");
    assert_eq!(last.len(), 2);
    assert!(!last[0].has_alert);
    assert!(last[1].has_alert);

    let db = &coordinator.state().snapshot().entities[1];
    assert_eq!(db.alert_title, "Disk full");
    assert_eq!(db.alert_detail, "[CRITICAL] /var at 99%");
    assert!(log.contains("correlation completed, queuing UI update"));
}

#[tokio::test(start_paused = true)]
async fn superseded_correlation_is_discarded() {
    let api = Arc::new(
        FakeApi::new()
            .with_search(Reply::Json(search_payload(&[("web-01", "g1")])))
            .with_probe(Reply::Delayed(
                Duration::from_secs(2),
                probe_payload("g1", "CPU High", "CPU > 85%"),
            )),
    );
    let log = Arc::new(MemoryLogSink::default());
    let (coordinator, _queue) = coordinator_for(api.clone(), live_config(), log.clone());

    let RefreshOutcome::Completed {
        correlation: Some(stale),
        ..
    } = coordinator.refresh(RefreshTrigger::Timer).await
    else {
        panic!("first refresh should correlate");
    };
    let RefreshOutcome::Completed {
        generation,
        correlation: Some(fresh),
        ..
    } = coordinator.refresh(RefreshTrigger::Manual).await
    else {
        panic!("second refresh should correlate");
    };
    assert_eq!(generation, 2);

    // Both cycles found the alert, but only the current one may publish it.
    let stale = stale.await.expect("stale correlation");
    assert_eq!(stale.matches, 1);
    assert!(log.contains("correlation for refresh #1 discarded: superseded"));

    fresh.await.expect("fresh correlation");
    assert!(coordinator.state().snapshot().entities[0].has_alert);
}

#[tokio::test(start_paused = true)]
async fn missing_credentials_publish_synthetic_hosts() {
    let api = Arc::new(FakeApi::new());
    let (coordinator, mut queue) =
        coordinator_for(api.clone(), Config::default(), Arc::new(NullLogSink));

    let outcome = coordinator.refresh(RefreshTrigger::Manual).await;
    let RefreshOutcome::Completed {
        entity_count,
        error,
        ..
    } = outcome
    else {
        panic!("refresh should complete");
    };
    assert_eq!(entity_count, 5);
    assert_eq!(error.as_deref(), Some("API key or account ID not configured"));
    assert_eq!(api.search_calls(), 0);

    settle().await;
    let mut surface = RecordingSurface::default();
    queue.drain(&mut surface);
    assert_eq!(
        surface.status,
        Some(StatusLine::Error("API key or account ID not configured".to_string()))
    );
    let alerting: Vec<&str> = surface
        .rows
        .iter()
        .filter(|row| row.has_alert)
        .map(|row| row.name.as_str())
        .collect();
    assert_eq!(alerting, vec!["server-2", "server-4"]);
}

#[tokio::test(start_paused = true)]
async fn empty_result_shows_placeholder_without_selection() {
    let api = Arc::new(FakeApi::new());
    let (coordinator, mut queue) = coordinator_for(api.clone(), live_config(), Arc::new(NullLogSink));

    let outcome = coordinator.refresh(RefreshTrigger::Manual).await;
    assert!(matches!(
        outcome,
        RefreshOutcome::Completed {
            entity_count: 0,
            error: None,
            correlation: None,
            ..
        }
    ));

    settle().await;
    let mut surface = RecordingSurface::default();
    queue.drain(&mut surface);
    assert!(surface.rows.is_empty());
    assert_eq!(surface.selection, None);
    assert_eq!(surface.status, Some(StatusLine::Empty));
    assert_eq!(api.probe_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn timer_refreshes_on_every_interval() {
    let api = Arc::new(FakeApi::new().with_search(Reply::Json(search_payload(&[("web-01", "g1")]))));
    let (coordinator, _queue) = coordinator_for(api.clone(), live_config(), Arc::new(NullLogSink));

    let timer = Arc::new(coordinator).spawn_timer(Duration::from_secs(30));
    tokio::time::sleep(Duration::from_secs(61)).await;
    timer.abort();

    assert_eq!(api.search_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn sixty_rows_paint_in_three_paced_batches() {
    let (submitter, mut queue) = ui_channel::<RecordingSurface>();
    let scheduler = RenderScheduler::new(submitter);
    let mut surface = RecordingSurface::default();

    let render = scheduler.render(RenderSnapshot {
        entities: hosts(60),
        selected: Some(42),
        status: StatusLine::Loading,
    });

    // The UI loop gets control back between batches.
    tokio::time::sleep(Duration::from_millis(1)).await;
    assert_eq!(queue.drain(&mut surface), 2);
    assert_eq!(surface.rows.len(), 25);

    tokio::time::sleep(RENDER_BATCH_DELAY).await;
    assert_eq!(queue.drain(&mut surface), 1);
    assert_eq!(surface.rows.len(), 50);

    let summary = render.await.expect("render task");
    assert_eq!(summary.batches, 3);
    assert_eq!(summary.rows, 60);
    assert!(!summary.superseded);

    assert_eq!(queue.drain(&mut surface), 1);
    assert_eq!(surface.rows.len(), 60);
    assert_eq!(surface.selection, Some(42));
    let indexes: Vec<usize> = surface.rows.iter().map(|row| row.index).collect();
    assert_eq!(indexes, (0..60).collect::<Vec<_>>());
}

#[tokio::test(start_paused = true)]
async fn out_of_range_selection_resets_to_top() {
    let (submitter, mut queue) = ui_channel::<RecordingSurface>();
    let scheduler = RenderScheduler::new(submitter);

    scheduler
        .render(RenderSnapshot {
            entities: hosts(60),
            selected: Some(75),
            status: StatusLine::Loading,
        })
        .await
        .expect("render task");

    let mut surface = RecordingSurface::default();
    assert_eq!(queue.drain(&mut surface), 4);
    assert_eq!(surface.selection, Some(0));
}

#[tokio::test(start_paused = true)]
async fn repeated_render_leaves_identical_surface() {
    let (submitter, mut queue) = ui_channel::<RecordingSurface>();
    let scheduler = RenderScheduler::new(submitter);
    let snapshot = RenderSnapshot {
        entities: hosts(30),
        selected: Some(7),
        status: StatusLine::Empty,
    };

    let mut surface = RecordingSurface::default();
    scheduler.render(snapshot.clone()).await.expect("render task");
    queue.drain(&mut surface);
    let once = (surface.rows.clone(), surface.selection, surface.status.clone());

    scheduler.render(snapshot).await.expect("render task");
    queue.drain(&mut surface);
    assert_eq!((surface.rows.clone(), surface.selection, surface.status.clone()), once);
}

#[tokio::test(start_paused = true)]
async fn newer_render_supersedes_older_one() {
    let (submitter, mut queue) = ui_channel::<RecordingSurface>();
    let scheduler = RenderScheduler::new(submitter);

    let older = scheduler.render(RenderSnapshot {
        entities: hosts(60),
        selected: None,
        status: StatusLine::Loading,
    });
    let newer = scheduler.render(RenderSnapshot {
        entities: hosts(60),
        selected: Some(3),
        status: StatusLine::Loading,
    });

    let older = older.await.expect("older render");
    let newer = newer.await.expect("newer render");
    assert!(older.superseded);
    assert!(!newer.superseded);
    assert!(newer.epoch > older.epoch);

    let mut surface = RecordingSurface::default();
    queue.drain(&mut surface);
    assert_eq!(surface.rows.len(), 60);
    assert_eq!(surface.paints.len(), 1);
    assert_eq!(surface.selection, Some(3));
}

#[tokio::test(start_paused = true)]
async fn render_after_ui_shutdown_is_a_no_op() {
    let (submitter, queue) = ui_channel::<RecordingSurface>();
    let scheduler = RenderScheduler::new(submitter);
    drop(queue);

    let summary = scheduler
        .render(RenderSnapshot {
            entities: hosts(10),
            selected: None,
            status: StatusLine::Loading,
        })
        .await
        .expect("render task");
    assert_eq!(summary.batches, 0);
    assert!(!scheduler.render_status(StatusLine::Fetching));
}

#[tokio::test(start_paused = true)]
async fn correlation_lands_while_next_fetch_is_pending() {
    let api = Arc::new(
        FakeApi::new()
            .with_search(Reply::Json(search_payload(&[("web-01", "g1")])))
            .with_probe(Reply::Delayed(
                Duration::from_secs(2),
                probe_payload("g1", "CPU High", "CPU > 85%"),
            ))
            .gated(),
    );
    let log = Arc::new(MemoryLogSink::default());
    let (coordinator, _queue) = coordinator_for(api.clone(), live_config(), log.clone());
    let coordinator = Arc::new(coordinator);

    api.release();
    let RefreshOutcome::Completed {
        correlation: Some(first),
        ..
    } = coordinator.refresh(RefreshTrigger::Timer).await
    else {
        panic!("first refresh should correlate");
    };

    let second = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        async move { coordinator.refresh(RefreshTrigger::Manual).await }
    });
    while !coordinator.state().is_refreshing() {
        tokio::task::yield_now().await;
    }

    // The first cycle's rows are still on screen, so its alerts apply.
    let report = first.await.expect("first correlation");
    assert_eq!(report.matches, 1);
    assert!(coordinator.state().is_refreshing());
    assert!(coordinator.state().snapshot().entities[0].has_alert);
    assert!(log.contains("correlation completed, queuing UI update"));
    assert!(!log.contains("discarded"));

    api.release();
    let second = second.await.expect("second refresh");
    assert!(matches!(second, RefreshOutcome::Completed { generation: 2, .. }));
}

#[tokio::test(start_paused = true)]
async fn panicking_fetch_degrades_and_releases_the_guard() {
    let api = Arc::new(FakeApi::new().with_search(Reply::Panic));
    let log = Arc::new(MemoryLogSink::default());
    let (coordinator, _queue) = coordinator_for(api.clone(), live_config(), log.clone());

    let RefreshOutcome::Completed {
        entity_count,
        error,
        ..
    } = coordinator.refresh(RefreshTrigger::Manual).await
    else {
        panic!("refresh should complete");
    };
    assert_eq!(entity_count, 5);
    let error = error.expect("degraded");
    assert!(error.starts_with("internal fault: "), "{error}");
    assert!(!coordinator.state().is_refreshing());
    assert!(log.contains("fetch task failed"));

    let again = coordinator.refresh(RefreshTrigger::Manual).await;
    assert!(matches!(again, RefreshOutcome::Completed { generation: 2, .. }));
    assert_eq!(api.search_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn timer_survives_panicking_fetches() {
    let api = Arc::new(FakeApi::new().with_search(Reply::Panic));
    let (coordinator, _queue) = coordinator_for(api.clone(), live_config(), Arc::new(NullLogSink));

    let timer = Arc::new(coordinator).spawn_timer(Duration::from_secs(30));
    tokio::time::sleep(Duration::from_secs(61)).await;
    assert!(!timer.is_finished());
    timer.abort();

    assert_eq!(api.search_calls(), 3);
}
