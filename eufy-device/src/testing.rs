//! Scripted remote device for tests
//!
//! `MockRemote` behaves like a real handle: field accessors return what the
//! last successful `update()` captured, not the live device state. The paired
//! `MockController` plays the physical device: it changes that live state,
//! scripts transport failures, and records the calls the bridge made.
//!
//! ```rust,ignore
//! let (remote, controller) = MockRemote::new("T1013", RemoteState::default());
//! controller.fail_next_update(TransportError::BrokenPipe("reset".into()));
//! controller.modify(|s| s.brightness = 40);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::error::TransportError;
use crate::remote::{RemoteDevice, Rgb, StateChange};

/// Snapshot of a device's readable fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteState {
    pub power: bool,
    pub brightness: u8,
    pub colors: Option<Rgb>,
    pub temperature: u8,
}

impl RemoteState {
    fn apply(&mut self, change: &StateChange) {
        if let Some(power) = change.power {
            self.power = power;
        }
        if let Some(brightness) = change.brightness {
            self.brightness = brightness;
        }
        if let Some(temperature) = change.temperature {
            self.temperature = temperature;
            self.colors = None;
        }
        if let Some(colors) = change.colors {
            self.colors = Some(colors);
        }
    }
}

/// A call the bridge made on the handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect,
    Update,
    SetState(StateChange),
}

#[derive(Debug, Default)]
struct Shared {
    device: RemoteState,
    connect_failures: VecDeque<TransportError>,
    update_failures: VecDeque<TransportError>,
    set_state_failures: VecDeque<TransportError>,
    calls: Vec<MockCall>,
    update_gate: Option<Arc<Notify>>,
}

/// Scripted `RemoteDevice`
#[derive(Debug)]
pub struct MockRemote {
    model: String,
    visible: RemoteState,
    shared: Arc<Mutex<Shared>>,
}

/// Test-side control over a `MockRemote`
#[derive(Debug, Clone)]
pub struct MockController {
    shared: Arc<Mutex<Shared>>,
}

impl MockRemote {
    /// Create a handle whose fields already hold `initial`
    pub fn new(model: impl Into<String>, initial: RemoteState) -> (Self, MockController) {
        let shared = Arc::new(Mutex::new(Shared {
            device: initial.clone(),
            ..Default::default()
        }));

        let remote = Self {
            model: model.into(),
            visible: initial,
            shared: Arc::clone(&shared),
        };
        (remote, MockController { shared })
    }
}

impl MockController {
    /// Change the live device state; visible after the next `update()`
    pub fn modify(&self, f: impl FnOnce(&mut RemoteState)) {
        f(&mut self.shared.lock().device);
    }

    /// Current live device state
    pub fn device_state(&self) -> RemoteState {
        self.shared.lock().device.clone()
    }

    pub fn fail_next_connect(&self, error: TransportError) {
        self.shared.lock().connect_failures.push_back(error);
    }

    pub fn fail_next_update(&self, error: TransportError) {
        self.shared.lock().update_failures.push_back(error);
    }

    pub fn fail_next_set_state(&self, error: TransportError) {
        self.shared.lock().set_state_failures.push_back(error);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.shared.lock().calls.clone()
    }

    pub fn count(&self, call: &MockCall) -> usize {
        self.shared.lock().calls.iter().filter(|c| *c == call).count()
    }

    pub fn clear_calls(&self) {
        self.shared.lock().calls.clear();
    }

    /// Hold every later `update()` until the returned gate is notified
    ///
    /// The call is recorded before the update waits, so a test can see that
    /// an update is in flight.
    pub fn gate_updates(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.shared.lock().update_gate = Some(Arc::clone(&gate));
        gate
    }
}

#[async_trait]
impl RemoteDevice for MockRemote {
    fn model(&self) -> &str {
        &self.model
    }

    async fn connect(&mut self) -> Result<(), TransportError> {
        // Real handles suspend on I/O
        tokio::task::yield_now().await;
        let mut shared = self.shared.lock();
        shared.calls.push(MockCall::Connect);
        match shared.connect_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn update(&mut self) -> Result<(), TransportError> {
        let gate = {
            let mut shared = self.shared.lock();
            shared.calls.push(MockCall::Update);
            shared.update_gate.clone()
        };
        match gate {
            Some(gate) => gate.notified().await,
            None => tokio::task::yield_now().await,
        }

        let mut shared = self.shared.lock();
        if let Some(error) = shared.update_failures.pop_front() {
            return Err(error);
        }
        self.visible = shared.device.clone();
        Ok(())
    }

    async fn set_state(&mut self, change: StateChange) -> Result<(), TransportError> {
        let mut shared = self.shared.lock();
        shared.calls.push(MockCall::SetState(change.clone()));
        if let Some(error) = shared.set_state_failures.pop_front() {
            return Err(error);
        }
        shared.device.apply(&change);
        Ok(())
    }

    fn power(&self) -> bool {
        self.visible.power
    }

    fn brightness(&self) -> u8 {
        self.visible.brightness
    }

    fn colors(&self) -> Option<Rgb> {
        self.visible.colors
    }

    fn temperature(&self) -> u8 {
        self.visible.temperature
    }
}
