//! Websocket task feeding the change hub.
//!
//! Speaks the backend's Phoenix-style protocol: join one wildcard channel on
//! the public schema, answer with heartbeats, and translate
//! `postgres_changes` payloads into [`ChangeEvent`]s.

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::time::sleep;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, trace, warn};
use url::Url;

use super::{ChangeEvent, ChangeFeed, ChangeKind};
use crate::error::Error;

/// Connection lifecycle, observable through [`SocketTask::state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Tuning knobs for the socket task.
#[derive(Debug, Clone)]
pub struct SocketOptions {
    pub auto_reconnect: bool,
    pub max_reconnect_attempts: Option<u32>,
    pub reconnect_interval: Duration,
    pub heartbeat_interval: Duration,
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: true,
            max_reconnect_attempts: None,
            reconnect_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(30),
        }
    }
}

const CHANNEL_TOPIC: &str = "realtime:public";

/// Owns the websocket connection and republishes row changes into the hub.
pub struct SocketTask {
    url: String,
    key: String,
    token: Option<String>,
    options: SocketOptions,
    feed: broadcast::Sender<ChangeEvent>,
    state_tx: watch::Sender<ConnectionState>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl SocketTask {
    pub fn new(url: &str, key: &str, token: Option<String>, feed: &ChangeFeed) -> Self {
        Self::new_with_options(url, key, token, feed, SocketOptions::default())
    }

    pub fn new_with_options(
        url: &str,
        key: &str,
        token: Option<String>,
        feed: &ChangeFeed,
        options: SocketOptions,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        Self {
            url: url.to_string(),
            key: key.to_string(),
            token,
            options,
            feed: feed.sender(),
            state_tx,
            state_rx,
        }
    }

    /// Observe connection state changes.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    fn ws_url(&self) -> Result<String, Error> {
        let base = Url::parse(&self.url)?;
        match base.scheme() {
            "http" | "https" | "ws" | "wss" => {}
            s => {
                return Err(Error::realtime(format!("unsupported URL scheme: {}", s)));
            }
        }
        let endpoint = base.join("/realtime/v1/websocket?vsn=2.0.0")?;
        let mut ws_url = endpoint.to_string();
        if let Some(stripped) = ws_url.strip_prefix("http") {
            ws_url = format!("ws{}", stripped);
        }
        let token_param = self
            .token
            .as_ref()
            .map(|t| format!("&token={}", t))
            .unwrap_or_default();
        Ok(format!("{}&apikey={}{}", ws_url, self.key, token_param))
    }

    fn set_state(&self, state: ConnectionState) {
        if *self.state_tx.borrow() != state {
            debug!(?state, "socket state change");
            let _ = self.state_tx.send(state);
        }
    }

    /// Run until the connection dies and reconnection is exhausted or
    /// disabled. Intended to be spawned.
    pub async fn run(self) -> Result<(), Error> {
        let mut attempts: u32 = 0;
        loop {
            self.set_state(if attempts == 0 {
                ConnectionState::Connecting
            } else {
                ConnectionState::Reconnecting
            });

            match self.run_once().await {
                Ok(()) => {
                    // Remote closed a healthy connection; start over.
                    attempts = 0;
                }
                Err(err) => {
                    warn!(%err, "socket connection failed");
                    attempts += 1;
                }
            }

            self.set_state(ConnectionState::Disconnected);

            if !self.options.auto_reconnect {
                return Ok(());
            }
            if let Some(max) = self.options.max_reconnect_attempts {
                if attempts >= max {
                    return Err(Error::realtime(format!(
                        "gave up after {} reconnect attempts",
                        attempts
                    )));
                }
            }
            sleep(self.options.reconnect_interval).await;
        }
    }

    async fn run_once(&self) -> Result<(), Error> {
        let ws_url = self.ws_url()?;
        info!("connecting change feed socket");

        let (stream, _response) = connect_async(&ws_url)
            .await
            .map_err(|e| Error::realtime(format!("websocket connect failed: {}", e)))?;
        self.set_state(ConnectionState::Connected);

        let (mut write, mut read) = stream.split();

        let join = json!({
            "topic": CHANNEL_TOPIC,
            "event": "phx_join",
            "payload": {
                "config": {
                    "postgres_changes": [
                        { "schema": "public", "table": "*", "event": "*" }
                    ]
                }
            },
            "ref": "1",
        });
        write
            .send(Message::Text(join.to_string()))
            .await
            .map_err(|e| Error::realtime(format!("join failed: {}", e)))?;

        let mut heartbeat_ref: u64 = 1;
        loop {
            tokio::select! {
                biased;

                incoming = read.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(event) = parse_change(&text) {
                                trace!(table = %event.table, kind = ?event.kind, "change event");
                                let _ = self.feed.send(event);
                            }
                        }
                        Some(Ok(msg)) if msg.is_close() => {
                            debug!("socket closed by remote");
                            return Ok(());
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(Error::realtime(format!("websocket read failed: {}", e)));
                        }
                        None => return Ok(()),
                    }
                }

                _ = sleep(self.options.heartbeat_interval) => {
                    heartbeat_ref += 1;
                    let heartbeat = json!({
                        "topic": "phoenix",
                        "event": "heartbeat",
                        "payload": {},
                        "ref": heartbeat_ref.to_string(),
                    });
                    write
                        .send(Message::Text(heartbeat.to_string()))
                        .await
                        .map_err(|e| Error::realtime(format!("heartbeat failed: {}", e)))?;
                }
            }
        }
    }
}

/// Translate one websocket frame into a change event, if it carries one.
fn parse_change(text: &str) -> Option<ChangeEvent> {
    let message: serde_json::Value = serde_json::from_str(text).ok()?;
    if message.get("event")?.as_str()? != "postgres_changes" {
        return None;
    }
    let data = message.get("payload")?.get("data")?;

    let table = data.get("table")?.as_str()?.to_string();
    let kind_str = data
        .get("eventType")
        .or_else(|| data.get("type"))?
        .as_str()?;
    let kind: ChangeKind = serde_json::from_value(serde_json::Value::String(kind_str.into())).ok()?;

    let row = data
        .get("new")
        .or_else(|| data.get("record"))
        .cloned()
        .unwrap_or(serde_json::Value::Null);
    let old = data
        .get("old")
        .or_else(|| data.get("old_record"))
        .filter(|v| !v.is_null())
        .cloned();

    Some(ChangeEvent {
        table,
        kind,
        row,
        old,
    })
}
