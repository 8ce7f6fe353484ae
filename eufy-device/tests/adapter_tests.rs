//! Integration tests for the adapter and its polling tasks
//!
//! Time is paused in these tests, so poll intervals elapse instantly and
//! deterministically.

use std::sync::Arc;
use std::time::Duration;

use eufy_device::testing::{MockCall, MockRemote, RemoteState};
use eufy_device::{
    Adapter, AdapterError, DeviceClass, DeviceConfig, DeviceError, MirrorState, PollingConfig,
    PollingError, TransportError,
};
use eufy_registry::{GatewayRegistry, PropertyValue};

fn adapter() -> (Adapter, GatewayRegistry) {
    let registry = GatewayRegistry::new();
    let adapter = Adapter::new(Arc::new(registry.clone()), PollingConfig::default());
    (adapter, registry)
}

#[tokio::test(start_paused = true)]
async fn test_added_device_is_published_and_polled() {
    let (adapter, registry) = adapter();
    let (remote, controller) = MockRemote::new("T1011", RemoteState::default());

    let mirror = adapter
        .add_device(DeviceConfig::new("bulb-1", "Hallway"), Box::new(remote))
        .await
        .unwrap();

    assert_eq!(registry.device("bulb-1").unwrap().title, "Hallway");
    assert!(adapter.scheduler().is_polling("bulb-1").await);
    registry.iter().try_iter().for_each(drop);

    controller.modify(|s| s.brightness = 30);
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(registry.get("bulb-1", "level"), Some(PropertyValue::Integer(30)));
    let event = registry.iter().try_recv().expect("no change event");
    assert_eq!(event.property, "level");
    assert_eq!(mirror.state(), MirrorState::Polling);

    adapter.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_polling_survives_failures() {
    let (adapter, registry) = adapter();
    let (remote, controller) = MockRemote::new("T1201", RemoteState::default());
    adapter
        .add_device(DeviceConfig::new("plug-1", ""), Box::new(remote))
        .await
        .unwrap();

    controller.fail_next_update(TransportError::Io("timed out".to_string()));
    controller.fail_next_update(TransportError::BrokenPipe("reset".to_string()));
    controller.modify(|s| s.power = true);

    // Cycle 1 skipped, cycle 2 recovers
    tokio::time::sleep(Duration::from_secs(11)).await;

    let stats = adapter.scheduler().task_stats("plug-1").await.unwrap();
    assert_eq!(stats.poll_count, 2);
    assert_eq!(stats.skipped_count, 1);
    assert_eq!(stats.recovery_count, 1);
    assert_eq!(stats.change_count, 1);
    assert!(stats.is_running);
    assert_eq!(registry.get("plug-1", "on"), Some(PropertyValue::Boolean(true)));

    adapter.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_all_polling() {
    let (adapter, _registry) = adapter();
    let mut controllers = Vec::new();

    for id in ["plug-1", "plug-2", "plug-3"] {
        let (remote, controller) = MockRemote::new("T1201", RemoteState::default());
        adapter
            .add_device(DeviceConfig::new(id, id), Box::new(remote))
            .await
            .unwrap();
        controller.clear_calls();
        controllers.push(controller);
    }

    tokio::time::sleep(Duration::from_secs(6)).await;
    adapter.shutdown().await.unwrap();

    let stats = adapter.scheduler().stats().await;
    assert_eq!(stats.total_tasks, 0);

    let updates: Vec<usize> = controllers
        .iter()
        .map(|c| c.count(&MockCall::Update))
        .collect();
    tokio::time::sleep(Duration::from_secs(60)).await;

    for (controller, before) in controllers.iter().zip(updates) {
        assert_eq!(controller.count(&MockCall::Update), before);
    }
    for id in adapter.device_ids().await {
        let mirror = adapter.device(&id).await.unwrap();
        assert_eq!(mirror.state(), MirrorState::Stopped);
    }
}

#[tokio::test]
async fn test_duplicate_device_rejected() {
    let (adapter, _registry) = adapter();
    let (first, _) = MockRemote::new("T1201", RemoteState::default());
    let (second, second_controller) = MockRemote::new("T1201", RemoteState::default());

    adapter
        .add_device(DeviceConfig::new("plug-1", "Plug"), Box::new(first))
        .await
        .unwrap();
    let result = adapter
        .add_device(DeviceConfig::new("plug-1", "Plug"), Box::new(second))
        .await;

    assert!(matches!(result, Err(AdapterError::DuplicateDevice(ref id)) if id == "plug-1"));
    assert!(second_controller.calls().is_empty());
    adapter.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_init_is_not_added() {
    let (adapter, registry) = adapter();
    let (remote, controller) = MockRemote::new("T1013", RemoteState::default());
    controller.fail_next_connect(TransportError::Io("unreachable".to_string()));

    let result = adapter
        .add_device(DeviceConfig::new("bulb-1", "Desk"), Box::new(remote))
        .await;

    assert!(matches!(
        result,
        Err(AdapterError::Device(DeviceError::Init { .. }))
    ));
    assert!(adapter.device("bulb-1").await.is_none());
    assert!(!adapter.scheduler().is_polling("bulb-1").await);
    assert!(registry.is_empty());
}

#[tokio::test]
async fn test_set_property_routes_to_device() {
    let (adapter, registry) = adapter();
    let (remote, controller) = MockRemote::new("T1013", RemoteState::default());
    adapter
        .add_device(
            DeviceConfig::new("bulb-1", "Desk").with_class(DeviceClass::Bulb),
            Box::new(remote),
        )
        .await
        .unwrap();

    adapter
        .set_property("bulb-1", "on", PropertyValue::Boolean(true))
        .await
        .unwrap();
    assert!(controller.device_state().power);
    assert_eq!(registry.get("bulb-1", "on"), Some(PropertyValue::Boolean(true)));

    let missing = adapter
        .set_property("bulb-9", "on", PropertyValue::Boolean(true))
        .await;
    assert!(matches!(missing, Err(AdapterError::DeviceNotFound(_))));

    adapter.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_device_limit_applies() {
    let registry = GatewayRegistry::new();
    let adapter = Adapter::new(
        Arc::new(registry.clone()),
        PollingConfig::default().with_max_devices(1),
    );

    let (first, _) = MockRemote::new("T1201", RemoteState::default());
    let (second, second_controller) = MockRemote::new("T1201", RemoteState::default());
    adapter
        .add_device(DeviceConfig::new("plug-1", "One"), Box::new(first))
        .await
        .unwrap();
    let result = adapter
        .add_device(DeviceConfig::new("plug-2", "Two"), Box::new(second))
        .await;

    assert!(matches!(
        result,
        Err(AdapterError::Polling(PollingError::TooManyDevices { limit: 1 }))
    ));
    assert_eq!(adapter.device_ids().await, vec!["plug-1"]);
    assert!(second_controller.calls().is_empty());
    assert!(registry.device("plug-2").is_none());
    adapter.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_adds_respect_device_limit() {
    let registry = GatewayRegistry::new();
    let adapter = Adapter::new(
        Arc::new(registry.clone()),
        PollingConfig::default().with_max_devices(1),
    );

    let (first, _) = MockRemote::new("T1201", RemoteState::default());
    let (second, _) = MockRemote::new("T1201", RemoteState::default());
    let (a, b) = tokio::join!(
        adapter.add_device(DeviceConfig::new("plug-1", "One"), Box::new(first)),
        adapter.add_device(DeviceConfig::new("plug-2", "Two"), Box::new(second)),
    );

    let results = [a, b];
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(AdapterError::Polling(PollingError::TooManyDevices { limit: 1 }))
    )));

    // Every published device is also added and polled
    assert_eq!(registry.device_count(), 1);
    let ids = adapter.device_ids().await;
    assert_eq!(registry.device_ids(), ids);
    assert!(adapter.scheduler().is_polling(&ids[0]).await);
    adapter.shutdown().await.unwrap();
}
