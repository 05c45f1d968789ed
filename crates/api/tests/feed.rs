use std::sync::Arc;

use tokio::sync::RwLock;

use alerting::{AlertConfig, AlertManager};
use api::{run_feed, AppState, SharedState};
use entity::Entity;
use site_monitor::{FrameInput, SiteMonitor, SiteSettings};
use vehicle_registry::VehicleRegistry;

fn shared_state() -> (SharedState, Arc<AlertManager>) {
    let alerts = Arc::new(AlertManager::in_memory(AlertConfig::default()));
    (Arc::new(RwLock::new(AppState::new(alerts.clone()))), alerts)
}

fn proximity_feed(frames: u64) -> String {
    let mut feed = String::new();
    for t in 0..frames {
        let input = FrameInput::new(t, t as f64)
            .with_people(vec![Entity::person(1, (100.0, 300.0), (40.0, 100.0))])
            .with_vehicles(vec![Entity::vehicle(7, "truck", (250.0, 300.0), (200.0, 120.0))]);
        feed.push_str(&serde_json::to_string(&input).unwrap());
        feed.push('\n');
    }
    feed
}

#[tokio::test]
async fn feed_runs_to_end_and_updates_state() {
    let settings = SiteSettings::default();
    let mut monitor = SiteMonitor::new(&settings, VehicleRegistry::new(500.0));
    let (state, alerts) = shared_state();
    let mut events = alerts.subscribe();

    let feed = proximity_feed(4);
    let summary = run_feed(
        feed.as_bytes(),
        &mut monitor,
        state.clone(),
        std::future::pending(),
    )
    .await
    .unwrap();

    assert_eq!(summary.frames, 4);
    assert_eq!(summary.alerts, 1);
    assert!(!summary.interrupted);
    assert_eq!(events.try_recv().unwrap().frame, 2);

    let shared = state.read().await;
    assert!(!shared.running);
    assert_eq!(shared.frames_processed, 4);
    assert_eq!(shared.headcount.as_ref().unwrap().current, 1);
}

#[tokio::test]
async fn malformed_lines_are_skipped() {
    let settings = SiteSettings::default();
    let mut monitor = SiteMonitor::new(&settings, VehicleRegistry::new(500.0));
    let (state, _) = shared_state();

    let feed = format!("garbage\n\n{}{{\"frame\": 9}}\n", proximity_feed(1));
    let summary = run_feed(feed.as_bytes(), &mut monitor, state, std::future::pending())
        .await
        .unwrap();

    assert_eq!(summary.frames, 1);
    assert_eq!(summary.skipped_lines, 2);
}

#[tokio::test]
async fn shutdown_signal_stops_the_loop() {
    let settings = SiteSettings::default();
    let mut monitor = SiteMonitor::new(&settings, VehicleRegistry::new(500.0));
    let (state, _) = shared_state();

    // Never yields a line
    let (reader, _writer) = tokio::io::duplex(64);
    let summary = run_feed(
        tokio::io::BufReader::new(reader),
        &mut monitor,
        state,
        async {},
    )
    .await
    .unwrap();

    assert!(summary.interrupted);
    assert_eq!(summary.frames, 0);
}
