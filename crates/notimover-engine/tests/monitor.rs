use std::{sync::Arc, time::Duration};

use notimover_engine::{
    Anchor, DetectionError, FilterCriteria, ListError, Monitor, MonitorCfg, MonitoringState,
    PanelEvent, Point, Rect, ScreenGeometry, SkipReason, Skipped, Trigger,
    test_support::{DelegateEvent, FakePlatform, NC_PID, NodeSpec, RecordingDelegate},
    WindowDescriptor,
};

fn monitor(fake: &FakePlatform) -> (Monitor, Arc<RecordingDelegate>) {
    let delegate = Arc::new(RecordingDelegate::new());
    let m = Monitor::new(fake.platform(), MonitorCfg::default(), delegate.clone()).unwrap();
    (m, delegate)
}

fn banner_frame(y: f64) -> Rect {
    Rect::new(1560.0, y, 300.0, 80.0)
}

#[tokio::test(start_paused = true)]
async fn panel_open_invalidates_cache_and_reevaluates_tracked() {
    let fake = FakePlatform::new();
    let (a, _) = fake.add_banner(1, banner_frame(40.0));
    let (b, _) = fake.add_banner(2, banner_frame(130.0));
    let (mut m, _) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();

    let first = m.run_pass(Trigger::Start).await.unwrap().unwrap();
    assert_eq!(first.detected, vec![a, b]);
    assert!(m.status().cache.is_some());

    let tray = fake.add_tray(9);
    let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert_eq!(report.panel_event, Some(PanelEvent::Opened { count: 1 }));
    assert!(report.cache_invalidated);
    assert_eq!(report.reevaluated, vec![a, b]);
    assert!(report.detected.is_empty());

    let status = m.status();
    assert!(status.panel_open);
    assert_eq!(status.tracked, 2);
    assert!(m.snapshot().iter().all(|w| w.key != tray));

    fake.dismiss(tray);
    let closed = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert_eq!(closed.panel_event, Some(PanelEvent::Closed));
    assert_eq!(closed.reevaluated, vec![a, b]);
    assert!(!m.status().panel_open);
}

#[tokio::test(start_paused = true)]
async fn enumeration_failures_escalate_at_threshold() {
    let fake = FakePlatform::new();
    let (mut m, delegate) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    fake.windows
        .set_fail(Some(ListError::Unavailable("window server busy".into())));

    for n in 1..5 {
        let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
        assert!(matches!(
            report.error,
            Some(DetectionError::EnumerationFailure { consecutive, .. }) if consecutive == n
        ));
        assert_eq!(m.state(), &MonitoringState::Monitoring);
    }
    let err = m.run_pass(Trigger::Poll).await.unwrap_err();
    assert!(matches!(
        err,
        DetectionError::EnumerationFailure { consecutive: 5, .. }
    ));
    assert!(matches!(m.state(), MonitoringState::Error(_)));
    assert_eq!(delegate.errors().len(), 1);

    // Halted: no further listing until restarted.
    let calls = fake.windows.list_calls();
    assert_eq!(m.run_pass(Trigger::Poll).await, Ok(None));
    assert_eq!(fake.windows.list_calls(), calls);

    fake.windows.set_fail(None);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    let report = m.run_pass(Trigger::Start).await.unwrap().unwrap();
    assert_eq!(report.error, None);
    assert_eq!(m.status().consecutive_failures, 0);
}

#[tokio::test(start_paused = true)]
async fn success_resets_failure_run() {
    let fake = FakePlatform::new();
    let (mut m, _) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    fake.windows.set_fail(Some(ListError::Unavailable("busy".into())));
    for _ in 0..4 {
        m.run_pass(Trigger::Poll).await.unwrap();
    }
    fake.windows.set_fail(None);
    m.run_pass(Trigger::Poll).await.unwrap();
    fake.windows.set_fail(Some(ListError::Unavailable("busy".into())));
    let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert!(matches!(
        report.error,
        Some(DetectionError::EnumerationFailure { consecutive: 1, .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn revoked_permission_halts_monitoring() {
    let fake = FakePlatform::new();
    fake.add_banner(1, banner_frame(40.0));
    let (mut m, delegate) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    m.run_pass(Trigger::Start).await.unwrap();

    fake.permissions.set(false);
    assert_eq!(
        m.run_pass(Trigger::Poll).await,
        Err(DetectionError::PermissionDenied)
    );
    assert!(matches!(m.state(), MonitoringState::Error(_)));
    assert!(delegate.contains(&DelegateEvent::Error(DetectionError::PermissionDenied)));
}

#[tokio::test(start_paused = true)]
async fn drifted_window_is_moved_back() {
    let fake = FakePlatform::new();
    let (key, el) = fake.add_banner(1, banner_frame(40.0));
    let (mut m, _) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    m.run_pass(Trigger::Start).await.unwrap();
    let home = fake.tree.position_of(el).unwrap();

    fake.tree
        .set_frame(el, Point::new(1560.0, 40.0), banner_frame(0.0).size());
    let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert_eq!(report.repositioned, vec![key]);
    assert_eq!(fake.tree.position_of(el), Some(home));
    assert_eq!(fake.tree.writes_to(el).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn screen_change_recomputes_targets() {
    let fake = FakePlatform::new();
    let (key, el) = fake.add_banner(1, banner_frame(40.0));
    let (mut m, _) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    m.run_pass(Trigger::Start).await.unwrap();

    fake.screen.set(Some(ScreenGeometry::simple(2560.0, 1440.0)));
    let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert!(report.cache_invalidated);
    assert_eq!(report.reevaluated, vec![key]);
    // Bottom-right on 2560x1440: (2240, 50) → AX y = 1440 - 50 - 80.
    assert_eq!(fake.tree.position_of(el), Some(Point::new(2240.0, 1310.0)));
}

#[tokio::test(start_paused = true)]
async fn unresolvable_window_is_retried_then_given_up() {
    let fake = FakePlatform::new();
    let desc = WindowDescriptor {
        id: 7,
        pid: NC_PID,
        owner: "NotificationCenter".into(),
        bounds: Rect::new(1500.0, 30.0, 340.0, 100.0),
        layer: 23,
    };
    let root = fake.tree.add_root(NodeSpec::new().role("AXWindow"));
    fake.tree.bind_window(desc.key(), root);
    fake.windows.push(desc.clone());

    let (mut m, _) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    for attempt in 1..=3 {
        let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].reason, SkipReason::Unresolved { attempt });
    }
    let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert!(report.skipped.is_empty());
    assert!(m.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn element_gone_between_passes_is_dismissed() {
    let fake = FakePlatform::new();
    let (key, el) = fake.add_banner(1, banner_frame(40.0));
    let (mut m, delegate) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    m.run_pass(Trigger::Start).await.unwrap();

    fake.tree.kill(el);
    let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert_eq!(report.dismissed, vec![key]);
    assert_eq!(delegate.dismissed(), vec![key]);
    assert!(m.snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stale_entries_are_kept_while_alive() {
    let fake = FakePlatform::new();
    let (key, _) = fake.add_banner(1, banner_frame(40.0));
    let (mut m, _) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    m.run_pass(Trigger::Start).await.unwrap();

    tokio::time::advance(Duration::from_secs(31)).await;
    let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert!(report.dismissed.is_empty());
    assert_eq!(m.snapshot()[0].key, key);
}

#[tokio::test(start_paused = true)]
async fn state_changes_are_reported_to_delegate() {
    let fake = FakePlatform::new();
    fake.add_banner(1, banner_frame(40.0));
    let (mut m, delegate) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    m.run_pass(Trigger::Start).await.unwrap();
    m.stop().unwrap();
    let states: Vec<(MonitoringState, MonitoringState)> = delegate
        .events()
        .into_iter()
        .filter_map(|e| match e {
            DelegateEvent::State(from, to) => Some((from, to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            (MonitoringState::Initialized, MonitoringState::Monitoring),
            (MonitoringState::Monitoring, MonitoringState::Positioning),
            (MonitoringState::Positioning, MonitoringState::Monitoring),
            (MonitoringState::Monitoring, MonitoringState::Stopped),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn banner_in_tall_host_is_moved() {
    let fake = FakePlatform::new();
    let host = WindowDescriptor {
        id: 4,
        pid: NC_PID,
        owner: "NotificationCenter".into(),
        bounds: Rect::new(1500.0, 20.0, 440.0, 400.0),
        layer: 23,
    };
    let root = fake.tree.add_root(
        NodeSpec::new()
            .role("AXWindow")
            .frame(host.bounds.origin(), host.bounds.size()),
    );
    let el = fake.tree.add_child(
        root,
        NodeSpec::new()
            .role("AXGroup")
            .subrole("AXNotificationCenterBanner")
            .frame(Point::new(1560.0, 40.0), banner_frame(40.0).size()),
    );
    fake.tree.bind_window(host.key(), root);
    fake.windows.push(host.clone());

    let (mut m, delegate) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert_eq!(report.panel_event, None);
    assert_eq!(report.detected, vec![host.key()]);
    assert!(!m.status().panel_open);
    let seen: Vec<_> = delegate.detected().iter().map(|w| w.key).collect();
    assert_eq!(seen, vec![host.key()]);
    assert_eq!(fake.tree.writes_to(el).len(), 1);
    assert_ne!(fake.tree.position_of(el), Some(Point::new(1560.0, 40.0)));
}

#[tokio::test(start_paused = true)]
async fn banner_from_other_owner_is_found_by_poll() {
    let fake = FakePlatform::new();
    let overlay = |id: u32, subrole: Option<&str>| {
        let desc = WindowDescriptor {
            id,
            pid: 900,
            owner: "Reminders".into(),
            bounds: Rect::new(1550.0, 30.0, 320.0, 100.0),
            layer: 23,
        };
        let root = fake.tree.add_root(NodeSpec::new().role("AXWindow"));
        let mut spec = NodeSpec::new()
            .role("AXGroup")
            .frame(Point::new(1560.0, 40.0), banner_frame(40.0).size());
        if let Some(s) = subrole {
            spec = spec.subrole(s);
        }
        let el = fake.tree.add_child(root, spec);
        fake.tree.bind_window(desc.key(), root);
        fake.windows.push(desc.clone());
        (desc.key(), el)
    };
    let (banner, banner_el) = overlay(11, Some("AXNotificationCenterBanner"));
    let (palette, palette_el) = overlay(12, None);
    fake.windows.push(WindowDescriptor {
        id: 13,
        pid: 900,
        owner: "Reminders".into(),
        bounds: Rect::new(200.0, 200.0, 500.0, 400.0),
        layer: 0,
    });

    let (mut m, _) = monitor(&fake);
    m.start(Anchor::BottomRight, FilterCriteria::default()).unwrap();
    let report = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert_eq!(report.detected, vec![banner]);
    assert_eq!(
        report.skipped,
        vec![Skipped {
            key: palette,
            reason: SkipReason::Unrecognized
        }]
    );
    assert_eq!(fake.tree.writes_to(banner_el).len(), 1);
    assert!(fake.tree.writes_to(palette_el).is_empty());
    assert!(!m.surface_pids().contains(&900));

    // Rejected once, not retried while it stays listed.
    let again = m.run_pass(Trigger::Poll).await.unwrap().unwrap();
    assert!(again.skipped.is_empty());
    assert!(fake.tree.writes_to(palette_el).is_empty());
}
