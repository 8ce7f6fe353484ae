//! Integration tests for device mirrors against an in-memory registry
//!
//! Covers initialization and capability shapes, the color sentinel, poll
//! cycles with transport failures, and client writes.

use std::sync::Arc;

use eufy_device::testing::{MockCall, MockController, MockRemote, RemoteState};
use eufy_device::{
    DeviceClass, DeviceError, DeviceMirror, InitStage, MirrorState, PollOutcome, Rgb, StateChange,
    TransportError,
};
use eufy_registry::{GatewayRegistry, PropertyValue, ValidationError};
use rstest::rstest;

// ============================================================================
// Test Helpers
// ============================================================================

const DEVICE_ID: &str = "eufy-test";

async fn setup(model: &str, state: RemoteState) -> (DeviceMirror, MockController, GatewayRegistry) {
    let registry = GatewayRegistry::new();
    let (remote, controller) = MockRemote::new(model, state);
    let mirror = DeviceMirror::initialize(
        DEVICE_ID,
        "Test Device",
        None,
        Box::new(remote),
        Arc::new(registry.clone()),
    )
    .await
    .expect("Failed to initialize device");
    (mirror, controller, registry)
}

fn drain(registry: &GatewayRegistry) -> usize {
    registry.iter().try_iter().count()
}

fn red_bulb() -> RemoteState {
    RemoteState {
        power: true,
        brightness: 60,
        colors: Some(Rgb::new(255, 0, 0)),
        temperature: 20,
    }
}

fn broken_pipe() -> TransportError {
    TransportError::BrokenPipe("connection reset by peer".to_string())
}

fn timeout() -> TransportError {
    TransportError::Io("operation timed out".to_string())
}

// ============================================================================
// Initialization
// ============================================================================

#[rstest]
#[case("T1013", &["on", "level", "color", "colorTemperature", "colorMode"])]
#[case("T1012", &["on", "level", "colorTemperature"])]
#[case("T1011", &["on", "level"])]
#[case("T1201", &["on"])]
#[tokio::test]
async fn test_published_shape_matches_model(#[case] model: &str, #[case] names: &[&str]) {
    let (_mirror, _controller, registry) = setup(model, red_bulb()).await;

    let description = registry.device(DEVICE_ID).expect("device not published");
    assert_eq!(description.property_names(), names);
    assert_eq!(description.description, model);

    let published: Vec<String> = registry
        .values(DEVICE_ID)
        .into_iter()
        .map(|(name, _)| name)
        .collect();
    assert_eq!(published, names);
}

#[tokio::test]
async fn test_initial_values_match_handle() {
    let (_mirror, _controller, registry) = setup("T1013", red_bulb()).await;

    assert_eq!(
        registry.values(DEVICE_ID),
        vec![
            ("on".to_string(), PropertyValue::Boolean(true)),
            ("level".to_string(), PropertyValue::Integer(60)),
            ("color".to_string(), PropertyValue::from("#FF0000")),
            ("colorTemperature".to_string(), PropertyValue::Integer(3460)),
            ("colorMode".to_string(), PropertyValue::from("color")),
        ]
    );
}

#[tokio::test]
async fn test_capability_tags() {
    let (_mirror, _controller, registry) = setup("T1012", RemoteState::default()).await;
    assert_eq!(
        registry.device(DEVICE_ID).unwrap().capabilities,
        vec!["OnOffSwitch", "Light", "ColorControl"]
    );
}

#[tokio::test]
async fn test_configured_class_wins_over_model() {
    let registry = GatewayRegistry::new();
    let (remote, _controller) = MockRemote::new("T1013", red_bulb());

    DeviceMirror::initialize(
        DEVICE_ID,
        "Lamp Socket",
        Some(DeviceClass::Switch),
        Box::new(remote),
        Arc::new(registry.clone()),
    )
    .await
    .unwrap();

    let description = registry.device(DEVICE_ID).unwrap();
    assert_eq!(description.property_names(), vec!["on"]);
    assert_eq!(description.capabilities, vec!["OnOffSwitch", "SmartPlug"]);
}

#[rstest]
#[case::connect(true, InitStage::Connect)]
#[case::update(false, InitStage::Update)]
#[tokio::test]
async fn test_init_failure_publishes_nothing(
    #[case] fail_connect: bool,
    #[case] expected: InitStage,
) {
    let registry = GatewayRegistry::new();
    let (remote, controller) = MockRemote::new("T1011", RemoteState::default());
    if fail_connect {
        controller.fail_next_connect(timeout());
    } else {
        controller.fail_next_update(broken_pipe());
    }

    let result = DeviceMirror::initialize(
        DEVICE_ID,
        "Bulb",
        None,
        Box::new(remote),
        Arc::new(registry.clone()),
    )
    .await;

    match result {
        Err(DeviceError::Init { stage, device_id, .. }) => {
            assert_eq!(stage, expected);
            assert_eq!(device_id, DEVICE_ID);
        }
        other => panic!("expected init error, got {:?}", other),
    }
    assert!(registry.is_empty());
    assert_eq!(drain(&registry), 0);
}

// ============================================================================
// Color sentinel
// ============================================================================

#[tokio::test]
async fn test_no_color_publishes_sentinel_and_temperature_mode() {
    let state = RemoteState {
        colors: None,
        ..red_bulb()
    };
    let (_mirror, _controller, registry) = setup("T1013", state).await;

    assert_eq!(registry.get(DEVICE_ID, "color"), Some(PropertyValue::from("#000000")));
    assert_eq!(
        registry.get(DEVICE_ID, "colorMode"),
        Some(PropertyValue::from("temperature"))
    );
}

#[tokio::test]
async fn test_pure_black_reads_as_temperature_mode() {
    let state = RemoteState {
        colors: Some(Rgb::new(0, 0, 0)),
        ..red_bulb()
    };
    let (_mirror, _controller, registry) = setup("T1013", state).await;

    assert_eq!(
        registry.get(DEVICE_ID, "colorMode"),
        Some(PropertyValue::from("temperature"))
    );
}

// ============================================================================
// Poll cycles
// ============================================================================

#[tokio::test]
async fn test_poll_without_change_publishes_nothing() {
    let (mirror, _controller, registry) = setup("T1013", red_bulb()).await;
    drain(&registry);

    assert_eq!(mirror.poll_once().await, PollOutcome::Refreshed { changed: 0 });
    assert_eq!(mirror.poll_once().await, PollOutcome::Refreshed { changed: 0 });
    assert_eq!(drain(&registry), 0);
}

#[tokio::test]
async fn test_single_change_publishes_once() {
    let (mirror, controller, registry) = setup("T1011", RemoteState::default()).await;
    drain(&registry);

    controller.modify(|s| s.power = true);
    assert_eq!(mirror.poll_once().await.changed(), 1);
    assert_eq!(mirror.poll_once().await.changed(), 0);

    let events: Vec<_> = registry.iter().try_iter().collect();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].device_id, DEVICE_ID);
    assert_eq!(events[0].property, "on");
    assert_eq!(events[0].value, PropertyValue::Boolean(true));
    assert!(mirror.is_on().await);
}

#[tokio::test]
async fn test_broken_pipe_recovers_within_cycle() {
    let (mirror, controller, registry) = setup("T1011", RemoteState::default()).await;
    drain(&registry);
    controller.clear_calls();

    controller.modify(|s| s.brightness = 45);
    controller.fail_next_update(broken_pipe());

    assert_eq!(mirror.poll_once().await, PollOutcome::Recovered { changed: 1 });
    assert_eq!(
        controller.calls(),
        vec![MockCall::Update, MockCall::Connect, MockCall::Update]
    );
    assert_eq!(registry.get(DEVICE_ID, "level"), Some(PropertyValue::Integer(45)));
    assert_eq!(mirror.state(), MirrorState::Polling);
}

#[tokio::test]
async fn test_broken_pipe_with_failed_retry_skips_cycle() {
    let (mirror, controller, registry) = setup("T1011", RemoteState::default()).await;
    drain(&registry);

    controller.modify(|s| s.brightness = 45);
    controller.fail_next_update(broken_pipe());
    controller.fail_next_connect(timeout());

    let outcome = mirror.poll_once().await;
    assert_eq!(outcome, PollOutcome::Skipped { error: timeout() });
    assert_eq!(drain(&registry), 0);
    assert_eq!(registry.get(DEVICE_ID, "level"), Some(PropertyValue::Integer(0)));

    // Next cycle picks the change up
    assert_eq!(mirror.poll_once().await, PollOutcome::Refreshed { changed: 1 });
    assert_eq!(registry.get(DEVICE_ID, "level"), Some(PropertyValue::Integer(45)));
}

#[tokio::test]
async fn test_other_errors_skip_without_reconnect() {
    let (mirror, controller, registry) = setup("T1201", RemoteState::default()).await;
    drain(&registry);
    controller.clear_calls();

    controller.modify(|s| s.power = true);
    controller.fail_next_update(timeout());

    assert!(mirror.poll_once().await.is_skipped());
    assert_eq!(controller.calls(), vec![MockCall::Update]);
    assert_eq!(registry.get(DEVICE_ID, "on"), Some(PropertyValue::Boolean(false)));
}

#[tokio::test]
async fn test_switching_to_white_updates_color_and_mode() {
    let (mirror, controller, registry) = setup("T1013", red_bulb()).await;
    drain(&registry);

    controller.modify(|s| {
        s.colors = None;
        s.temperature = 100;
    });
    assert_eq!(mirror.poll_once().await.changed(), 3);

    assert_eq!(registry.get(DEVICE_ID, "color"), Some(PropertyValue::from("#000000")));
    assert_eq!(
        registry.get(DEVICE_ID, "colorTemperature"),
        Some(PropertyValue::Integer(6500))
    );
    assert_eq!(
        registry.get(DEVICE_ID, "colorMode"),
        Some(PropertyValue::from("temperature"))
    );
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_write_publishes_and_reaches_device() {
    let (mirror, controller, registry) = setup("T1011", RemoteState::default()).await;
    drain(&registry);

    mirror
        .apply_write("level", PropertyValue::Integer(75))
        .await
        .unwrap();

    assert_eq!(controller.device_state().brightness, 75);
    assert_eq!(controller.count(&MockCall::SetState(StateChange::brightness(75))), 1);
    assert_eq!(registry.get(DEVICE_ID, "level"), Some(PropertyValue::Integer(75)));
    assert_eq!(drain(&registry), 1);

    // The device reports the same value back; nothing new is published
    assert_eq!(mirror.poll_once().await.changed(), 0);
}

#[rstest]
#[case::out_of_range("level", PropertyValue::Integer(150))]
#[case::negative("level", PropertyValue::Integer(-1))]
#[case::wrong_type("on", PropertyValue::from("yes"))]
#[case::bad_color("color", PropertyValue::from("red"))]
#[case::temperature_too_warm("colorTemperature", PropertyValue::Integer(1800))]
#[case::read_only("colorMode", PropertyValue::from("color"))]
#[tokio::test]
async fn test_invalid_write_never_reaches_device(
    #[case] property: &str,
    #[case] value: PropertyValue,
) {
    let (mirror, controller, registry) = setup("T1013", red_bulb()).await;
    let before = registry.values(DEVICE_ID);
    controller.clear_calls();

    let result = mirror.apply_write(property, value).await;

    assert!(matches!(result, Err(DeviceError::Validation(_))), "{:?}", result);
    assert!(controller.calls().is_empty());
    assert_eq!(registry.values(DEVICE_ID), before);
}

#[tokio::test]
async fn test_write_to_read_only_reports_read_only() {
    let (mirror, _controller, _registry) = setup("T1013", red_bulb()).await;

    let result = mirror.apply_write("colorMode", PropertyValue::from("temperature")).await;
    assert!(matches!(
        result,
        Err(DeviceError::Validation(ValidationError::ReadOnly { .. }))
    ));
}

#[tokio::test]
async fn test_write_to_missing_property() {
    let (mirror, controller, _registry) = setup("T1201", RemoteState::default()).await;
    controller.clear_calls();

    let result = mirror.apply_write("level", PropertyValue::Integer(10)).await;
    assert!(matches!(result, Err(DeviceError::UnknownProperty(ref name)) if name == "level"));
    assert!(controller.calls().is_empty());
}

#[tokio::test]
async fn test_failed_write_leaves_published_value() {
    let (mirror, controller, registry) = setup("T1201", RemoteState::default()).await;
    drain(&registry);
    controller.fail_next_set_state(timeout());

    let result = mirror.apply_write("on", PropertyValue::Boolean(true)).await;

    assert!(matches!(result, Err(DeviceError::Write { ref property, .. }) if property == "on"));
    assert_eq!(registry.get(DEVICE_ID, "on"), Some(PropertyValue::Boolean(false)));
    assert!(!controller.device_state().power);
    assert_eq!(drain(&registry), 0);
}

#[tokio::test]
async fn test_temperature_write_is_quantized() {
    let (mirror, controller, registry) = setup("T1013", red_bulb()).await;
    drain(&registry);

    mirror
        .apply_write("colorTemperature", PropertyValue::Integer(4000))
        .await
        .unwrap();

    assert_eq!(controller.device_state().temperature, 34);
    assert_eq!(
        registry.get(DEVICE_ID, "colorTemperature"),
        Some(PropertyValue::Integer(3992))
    );

    // Setting a temperature drops the color on the device
    let outcome = mirror.poll_once().await;
    assert_eq!(outcome, PollOutcome::Refreshed { changed: 2 });
    assert_eq!(
        registry.get(DEVICE_ID, "colorMode"),
        Some(PropertyValue::from("temperature"))
    );
}

#[tokio::test]
async fn test_color_write_switches_mode_to_color() {
    let state = RemoteState {
        colors: None,
        ..red_bulb()
    };
    let (mirror, _controller, registry) = setup("T1013", state).await;
    drain(&registry);

    mirror
        .apply_write("color", PropertyValue::from("#00FF80"))
        .await
        .unwrap();

    assert_eq!(registry.get(DEVICE_ID, "color"), Some(PropertyValue::from("#00FF80")));
    assert_eq!(registry.get(DEVICE_ID, "colorMode"), Some(PropertyValue::from("color")));
    let changed: Vec<String> = registry.iter().try_iter().map(|e| e.property).collect();
    assert_eq!(changed, vec!["color", "colorMode"]);

    // The device agrees with what was published
    assert_eq!(mirror.poll_once().await.changed(), 0);
}

#[tokio::test]
async fn test_black_color_write_switches_mode_to_temperature() {
    let (mirror, _controller, registry) = setup("T1013", red_bulb()).await;

    mirror
        .apply_write("color", PropertyValue::from("#000000"))
        .await
        .unwrap();

    assert_eq!(
        registry.get(DEVICE_ID, "colorMode"),
        Some(PropertyValue::from("temperature"))
    );
    assert_eq!(mirror.poll_once().await.changed(), 0);
}

#[tokio::test]
async fn test_write_waits_for_poll_in_flight() {
    let (mirror, controller, registry) = setup("T1011", RemoteState::default()).await;
    let mirror = Arc::new(mirror);
    controller.clear_calls();
    let gate = controller.gate_updates();

    let poller = tokio::spawn({
        let mirror = Arc::clone(&mirror);
        async move { mirror.poll_once().await }
    });
    while controller.count(&MockCall::Update) == 0 {
        tokio::task::yield_now().await;
    }

    let writer = tokio::spawn({
        let mirror = Arc::clone(&mirror);
        async move { mirror.apply_write("level", PropertyValue::Integer(40)).await }
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    // The write is parked behind the poll cycle
    assert_eq!(controller.calls(), vec![MockCall::Update]);
    assert_eq!(registry.get(DEVICE_ID, "level"), Some(PropertyValue::Integer(0)));

    gate.notify_one();
    assert_eq!(poller.await.unwrap(), PollOutcome::Refreshed { changed: 0 });
    writer.await.unwrap().unwrap();

    assert_eq!(
        controller.calls(),
        vec![
            MockCall::Update,
            MockCall::SetState(StateChange::brightness(40))
        ]
    );
    assert_eq!(registry.get(DEVICE_ID, "level"), Some(PropertyValue::Integer(40)));
}

#[tokio::test]
async fn test_color_write_normalizes_case() {
    let (mirror, controller, registry) = setup("T1013", red_bulb()).await;

    mirror
        .apply_write("color", PropertyValue::from("#00ff80"))
        .await
        .unwrap();

    assert_eq!(controller.device_state().colors, Some(Rgb::new(0, 255, 128)));
    assert_eq!(registry.get(DEVICE_ID, "color"), Some(PropertyValue::from("#00FF80")));
}
