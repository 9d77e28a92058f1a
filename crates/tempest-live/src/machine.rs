//! Connection state machine for the live update client
//!
//! All reconnect, filtering, and throttling decisions live here as pure
//! event-to-action transitions, so they test without a network. The
//! transport loop in `client` feeds events in and executes the returned
//! actions.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tempest_core::{NormalizedObservation, RawObservation};
use tracing::{debug, warn};

/// Message type carrying live observations; everything else is ignored.
const OBS_MESSAGE_TYPE: &str = "obs_st";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Idle,
    Connecting,
    /// Transport is up, handshake not yet sent.
    Open,
    Subscribed,
    ReconnectScheduled,
    /// Terminal; reached only via explicit teardown.
    Closed,
}

/// Events the transport feeds into the machine.
#[derive(Debug, Clone)]
pub enum LiveEvent {
    Connect,
    Opened,
    HandshakeSent,
    Message(String),
    ConnectionClosed,
    ConnectionError(String),
    TimerFired,
    Teardown,
}

/// Side effects the transport must carry out, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    OpenConnection,
    SendHandshake,
    Deliver(NormalizedObservation),
    ScheduleReconnect(Duration),
    CancelReconnect,
    CloseConnection,
}

/// Inbound streaming frame: a `type` discriminator plus, for observation
/// messages, a list of raw tuples.
#[derive(Debug, Deserialize)]
struct StreamMessage {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    obs: Option<Vec<Vec<Option<f64>>>>,
}

pub struct LiveMachine {
    state: LiveState,
    device_id: String,
    correlation_id: String,
    throttle: Duration,
    reconnect_delay: Duration,
    last_delivered_ms: Option<i64>,
    reconnect_pending: bool,
}

impl LiveMachine {
    pub fn new(
        device_id: impl Into<String>,
        correlation_id: impl Into<String>,
        throttle: Duration,
        reconnect_delay: Duration,
    ) -> Self {
        Self {
            state: LiveState::Idle,
            device_id: device_id.into(),
            correlation_id: correlation_id.into(),
            throttle,
            reconnect_delay,
            last_delivered_ms: None,
            reconnect_pending: false,
        }
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// Subscribe handshake payload, resent on every fresh connection.
    pub fn handshake_json(&self) -> String {
        json!({
            "type": "listen_start",
            "device_id": self.device_id,
            "id": self.correlation_id,
        })
        .to_string()
    }

    /// Apply one event at time `now_ms` (epoch milliseconds) and return the
    /// actions the transport must execute.
    pub fn on_event(&mut self, event: LiveEvent, now_ms: i64) -> Vec<Action> {
        if self.state == LiveState::Closed {
            return Vec::new();
        }

        match event {
            LiveEvent::Connect => self.on_connect(),
            LiveEvent::Opened => {
                self.state = LiveState::Open;
                vec![Action::SendHandshake]
            }
            LiveEvent::HandshakeSent => {
                self.state = LiveState::Subscribed;
                Vec::new()
            }
            LiveEvent::Message(text) => self.on_message(&text, now_ms),
            LiveEvent::ConnectionClosed => self.on_closed(),
            LiveEvent::ConnectionError(reason) => {
                // The transport close that follows schedules the reconnect.
                warn!(%reason, "live connection error");
                vec![Action::CloseConnection]
            }
            LiveEvent::TimerFired => {
                if self.state == LiveState::ReconnectScheduled {
                    self.reconnect_pending = false;
                    self.state = LiveState::Connecting;
                    vec![Action::OpenConnection]
                } else {
                    Vec::new()
                }
            }
            LiveEvent::Teardown => self.on_teardown(),
        }
    }

    fn on_connect(&mut self) -> Vec<Action> {
        match self.state {
            // Never a second concurrent connection.
            LiveState::Open | LiveState::Subscribed | LiveState::Connecting => Vec::new(),
            LiveState::ReconnectScheduled => {
                self.reconnect_pending = false;
                self.state = LiveState::Connecting;
                vec![Action::CancelReconnect, Action::OpenConnection]
            }
            LiveState::Idle => {
                self.state = LiveState::Connecting;
                vec![Action::OpenConnection]
            }
            LiveState::Closed => Vec::new(),
        }
    }

    fn on_message(&mut self, text: &str, now_ms: i64) -> Vec<Action> {
        if !matches!(self.state, LiveState::Open | LiveState::Subscribed) {
            return Vec::new();
        }

        let message: StreamMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                // Malformed payloads are dropped; the connection stays up.
                warn!(error = %e, "discarding malformed stream message");
                return Vec::new();
            }
        };

        if message.kind != OBS_MESSAGE_TYPE {
            return Vec::new();
        }

        let sample = match Self::latest_sample(message.obs.as_deref()) {
            Some(sample) => sample,
            None => {
                warn!("obs_st message carried no usable observation");
                return Vec::new();
            }
        };

        if let Some(last) = self.last_delivered_ms {
            if now_ms - last < self.throttle.as_millis() as i64 {
                // Throttled messages are dropped, not buffered.
                debug!("throttling live observation");
                return Vec::new();
            }
        }

        self.last_delivered_ms = Some(now_ms);
        vec![Action::Deliver(sample)]
    }

    fn on_closed(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.reconnect_pending {
            actions.push(Action::CancelReconnect);
        }
        actions.push(Action::ScheduleReconnect(self.reconnect_delay));
        self.reconnect_pending = true;
        self.state = LiveState::ReconnectScheduled;
        actions
    }

    fn on_teardown(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.reconnect_pending {
            actions.push(Action::CancelReconnect);
            self.reconnect_pending = false;
        }
        if matches!(
            self.state,
            LiveState::Connecting | LiveState::Open | LiveState::Subscribed
        ) {
            actions.push(Action::CloseConnection);
        }
        self.state = LiveState::Closed;
        actions
    }

    /// Map the most recent tuple of an obs_st message to a sample.
    fn latest_sample(tuples: Option<&[Vec<Option<f64>>]>) -> Option<NormalizedObservation> {
        let tuple = tuples?.last()?;
        let raw = RawObservation::from_tuple(tuple).ok()?;
        Some(NormalizedObservation {
            timestamp: raw.epoch * 1000,
            temperature: raw.temperature?,
            humidity: raw.humidity?,
            rain: raw.rain?,
        })
    }
}
