//! WebSocket transport loop driving the live machine

use crate::machine::{Action, LiveEvent, LiveMachine, LiveState};
use crate::{LiveError, LiveResult};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tempest_core::NormalizedObservation;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Minimum interval between deliveries to the consumer.
pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(60_000);
/// Fixed delay before reattempting a dropped connection.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Streaming endpoint, without the token parameter.
    pub ws_url: String,
    pub token: String,
    pub device_id: String,
    pub throttle: Duration,
    pub reconnect_delay: Duration,
}

impl LiveConfig {
    pub fn new(
        ws_url: impl Into<String>,
        token: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            ws_url: ws_url.into(),
            token: token.into(),
            device_id: device_id.into(),
            throttle: DEFAULT_THROTTLE,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Handle owning the live client task.
pub struct LiveHandle {
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl LiveHandle {
    /// Cooperative teardown: cancels any pending reconnect, closes the
    /// connection, and waits for the task to finish. Safe to call when the
    /// client never managed to connect.
    pub async fn teardown(self) {
        let _ = self.shutdown.send(());
        let _ = self.task.await;
    }
}

/// Spawn a live update client delivering throttled observation samples to
/// `consumer`.
///
/// The client owns exactly one outbound connection and at most one pending
/// reconnect timer. Transport failures are handled internally with a fixed
/// reconnect delay and never surface to the consumer; the consumer simply
/// stops receiving samples until the connection is back.
pub fn spawn(
    config: LiveConfig,
    consumer: mpsc::Sender<NormalizedObservation>,
) -> LiveResult<LiveHandle> {
    let url = build_ws_url(&config.ws_url, &config.token)?;
    let machine = LiveMachine::new(
        config.device_id.clone(),
        "1",
        config.throttle,
        config.reconnect_delay,
    );

    let (shutdown, shutdown_rx) = broadcast::channel(1);
    let task = tokio::spawn(run(machine, url, consumer, shutdown_rx));

    Ok(LiveHandle { shutdown, task })
}

fn build_ws_url(ws_url: &str, token: &str) -> LiveResult<Url> {
    let mut url =
        Url::parse(ws_url).map_err(|e| LiveError::InvalidUrl(format!("{}: {}", ws_url, e)))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

async fn run(
    mut machine: LiveMachine,
    url: Url,
    consumer: mpsc::Sender<NormalizedObservation>,
    mut shutdown: broadcast::Receiver<()>,
) {
    machine.on_event(LiveEvent::Connect, now_ms());

    while machine.state() == LiveState::Connecting {
        match connect_async(url.as_str()).await {
            Ok((stream, _)) => {
                info!("live connection open");
                serve_connection(&mut machine, stream, &consumer, &mut shutdown).await;
            }
            Err(e) => {
                warn!(error = %e, "live connection attempt failed");
                machine.on_event(LiveEvent::ConnectionError(e.to_string()), now_ms());
                machine.on_event(LiveEvent::ConnectionClosed, now_ms());
            }
        }

        match machine.state() {
            LiveState::ReconnectScheduled => {
                // The sequential loop carries at most one pending timer;
                // teardown during the wait cancels it.
                let delay = machine.reconnect_delay();
                info!(delay_secs = delay.as_secs(), "scheduling live reconnect");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {
                        machine.on_event(LiveEvent::TimerFired, now_ms());
                    }
                    _ = shutdown.recv() => {
                        machine.on_event(LiveEvent::Teardown, now_ms());
                    }
                }
            }
            state => {
                if state != LiveState::Closed {
                    debug!(?state, "live loop ending in unexpected state");
                }
                break;
            }
        }
    }

    info!("live client stopped");
}

/// Handshake, then read until the stream drops or teardown is requested.
/// Leaves the machine in `ReconnectScheduled` or `Closed`.
async fn serve_connection(
    machine: &mut LiveMachine,
    mut stream: WsStream,
    consumer: &mpsc::Sender<NormalizedObservation>,
    shutdown: &mut broadcast::Receiver<()>,
) {
    for action in machine.on_event(LiveEvent::Opened, now_ms()) {
        if action == Action::SendHandshake {
            if let Err(e) = stream.send(Message::Text(machine.handshake_json())).await {
                warn!(error = %e, "failed to send subscribe handshake");
                machine.on_event(LiveEvent::ConnectionError(e.to_string()), now_ms());
                machine.on_event(LiveEvent::ConnectionClosed, now_ms());
                return;
            }
            machine.on_event(LiveEvent::HandshakeSent, now_ms());
        }
    }

    loop {
        tokio::select! {
            inbound = stream.next() => {
                let event = match inbound {
                    Some(Ok(Message::Text(text))) => LiveEvent::Message(text.to_string()),
                    Some(Ok(Message::Close(_))) | None => LiveEvent::ConnectionClosed,
                    Some(Ok(_)) => continue, // ping/pong/binary
                    Some(Err(e)) => LiveEvent::ConnectionError(e.to_string()),
                };

                let dropped = matches!(
                    event,
                    LiveEvent::ConnectionClosed | LiveEvent::ConnectionError(_)
                );

                for action in machine.on_event(event, now_ms()) {
                    if let Action::Deliver(sample) = action {
                        if consumer.send(sample).await.is_err() {
                            // Consumer went away; nothing left to deliver to.
                            machine.on_event(LiveEvent::Teardown, now_ms());
                            return;
                        }
                    }
                }

                if dropped {
                    // An error forces the close that schedules the reconnect.
                    if machine.state() != LiveState::ReconnectScheduled {
                        machine.on_event(LiveEvent::ConnectionClosed, now_ms());
                    }
                    return;
                }
            }
            _ = shutdown.recv() => {
                machine.on_event(LiveEvent::Teardown, now_ms());
                let _ = stream.close(None).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_ws_url_appends_token() {
        let url = build_ws_url("wss://ws.weatherflow.com/swd/data", "secret").unwrap();
        assert_eq!(
            url.as_str(),
            "wss://ws.weatherflow.com/swd/data?token=secret"
        );
    }

    #[test]
    fn test_build_ws_url_rejects_garbage() {
        assert!(build_ws_url("not a url", "secret").is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = LiveConfig::new("wss://example.test/data", "t", "dev-1");
        assert_eq!(config.throttle, Duration::from_millis(60_000));
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
    }
}
