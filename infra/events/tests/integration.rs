use fstone_events::{EventBus, EventKind, EventKinds, IntegrationEvent};
use serde_json::json;

fn event(kind: EventKind, feature: &str) -> IntegrationEvent {
    IntegrationEvent::new(kind, feature, json!({ "user_id": "u1" }))
}

#[tokio::test]
async fn test_event_flow() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe();

    assert_eq!(bus.publish(event(EventKind::FeatureEnabled, "dark_mode")), 1);

    let received = rx.recv().await.unwrap();
    assert_eq!(received.kind, EventKind::FeatureEnabled);
    assert_eq!(received.feature, "dark_mode");
    assert_eq!(received.data["user_id"], "u1");
}

#[tokio::test]
async fn test_filtered_subscription_skips_other_kinds() {
    let bus = EventBus::new();
    let mut migrations = bus.subscribe_to(EventKinds::MIGRATION);

    bus.publish(event(EventKind::FeatureEnabled, "dark_mode"));
    bus.publish(event(EventKind::MigrationStarted, "dark_mode"));
    bus.publish(event(EventKind::CompatibilityIssue, "offline_mode"));
    bus.publish(event(EventKind::MigrationCompleted, "dark_mode"));

    assert_eq!(migrations.recv().await.unwrap().kind, EventKind::MigrationStarted);
    assert_eq!(migrations.recv().await.unwrap().kind, EventKind::MigrationCompleted);
    assert!(migrations.try_recv().is_none());
}

#[tokio::test]
async fn test_receiver_lagged_recovery() {
    let bus = EventBus::with_capacity(2).unwrap();
    let mut rx = bus.subscribe();

    for i in 0..100 {
        bus.publish(event(EventKind::FeatureEnabled, &format!("feature_{i}")));
    }

    let first = rx.recv().await.expect("should recover from lag");
    assert!(
        first.feature == "feature_98" || first.feature == "feature_99",
        "should resume at the retained tail, got {}",
        first.feature
    );
}

#[tokio::test]
async fn test_multiple_subscribers_see_the_same_event() {
    let bus = EventBus::new();
    let mut rx1 = bus.subscribe();
    let mut rx2 = bus.subscribe_to(EventKinds::LIFECYCLE);

    assert_eq!(bus.publish(event(EventKind::FeatureDisabled, "beta_features")), 2);

    let a = rx1.recv().await.unwrap();
    let b = rx2.recv().await.unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn test_shutdown_drains_then_closes() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe();

    bus.publish(event(EventKind::FeatureEnabled, "dark_mode"));
    assert!(bus.shutdown());

    assert!(rx.recv().await.is_some(), "buffered event is still delivered");
    assert!(rx.recv().await.is_none(), "subscription ends after shutdown");

    assert_eq!(bus.publish(event(EventKind::FeatureEnabled, "dark_mode")), 0);
    let mut late = bus.subscribe();
    assert!(late.recv().await.is_none());
}

#[tokio::test]
async fn test_clones_share_the_channel() {
    let bus = EventBus::new();
    let publisher = bus.clone();
    let mut rx = bus.subscribe();

    publisher.publish(event(EventKind::MigrationStarted, "accessibility"));
    assert_eq!(rx.recv().await.unwrap().feature, "accessibility");
}
