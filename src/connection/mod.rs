//! Connection manager: owns the single live link to the sensor gateway.
//!
//! [`ConnectionManager::connect`] spawns one background task per attempt.
//! That task opens the link, feeds inbound frames through
//! [`codec::dispatch`](crate::codec::dispatch) and forwards queued outbound
//! frames. When the attempt fails or the link drops, exactly one reconnect
//! timer is armed; every retry waits the same fixed delay.
//!
//! Link transitions are announced on the bus as
//! `connection:status {"connected": bool}`.
//!
//! Must be used from inside a tokio runtime.

use serde_json::{Value, json};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::codec;
use crate::config::MonitorConfig;
use crate::consts::CONNECTION_STATUS_EVENT;
use crate::error::{MonitorError, Result};
use crate::events::EventBus;
use crate::transport::{Link, Transport};

/// Where the link is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    ReconnectScheduled,
}

enum Outbound {
    Frame(String),
    Close,
}

struct ReconnectTimer {
    id: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    state: ConnectionState,
    /// Bumped on every attempt and every disconnect. Tasks that wake up
    /// holding an older value have been superseded and must not touch state.
    generation: u64,
    link_task: Option<JoinHandle<()>>,
    outbound: Option<mpsc::UnboundedSender<Outbound>>,
    /// At most one pending reconnect.
    reconnect: Option<ReconnectTimer>,
    next_timer_id: u64,
}

impl Inner {
    fn cancel_reconnect(&mut self) {
        if let Some(timer) = self.reconnect.take() {
            timer.handle.abort();
        }
    }
}

struct Shared {
    endpoint: String,
    reconnect_delay: Duration,
    auto_connect: bool,
    bus: Arc<EventBus>,
    transport: Arc<dyn Transport>,
    inner: Mutex<Inner>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn publish_status(&self, connected: bool) {
        self.bus
            .publish(CONNECTION_STATUS_EVENT, &json!({ "connected": connected }));
    }

    /// Start an attempt unless one is running or the link is up.
    fn connect_locked(self: &Arc<Self>, inner: &mut Inner) -> bool {
        match inner.state {
            ConnectionState::Connected | ConnectionState::Connecting => {
                tracing::debug!(state = ?inner.state, "connect ignored");
                return false;
            }
            ConnectionState::Disconnected | ConnectionState::ReconnectScheduled => {}
        }

        inner.generation += 1;
        inner.state = ConnectionState::Connecting;
        let shared = Arc::clone(self);
        let generation = inner.generation;
        inner.link_task = Some(tokio::spawn(run_link(shared, generation)));
        tracing::debug!(endpoint = %self.endpoint, generation, "connecting");
        true
    }

    /// Arm the reconnect timer if none is pending.
    fn schedule_reconnect(self: &Arc<Self>, inner: &mut Inner) {
        inner.state = ConnectionState::ReconnectScheduled;
        if inner.reconnect.is_some() {
            tracing::debug!("reconnect already scheduled");
            return;
        }

        inner.next_timer_id += 1;
        let id = inner.next_timer_id;
        let delay = self.reconnect_delay;
        let shared = Arc::clone(self);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = shared.lock();
            // Cancelled between the sleep finishing and taking the lock.
            if inner.reconnect.as_ref().map(|t| t.id) != Some(id) {
                return;
            }
            inner.reconnect = None;
            tracing::info!(endpoint = %shared.endpoint, "attempting to reconnect");
            shared.connect_locked(&mut inner);
        });
        inner.reconnect = Some(ReconnectTimer { id, handle });
        tracing::info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");
    }

    /// The attempt failed or the live link dropped.
    fn link_lost(self: &Arc<Self>, generation: u64) {
        {
            let mut inner = self.lock();
            if inner.generation != generation {
                return;
            }
            inner.outbound = None;
            inner.link_task = None;
            inner.state = ConnectionState::Disconnected;
            self.schedule_reconnect(&mut inner);
        }
        self.publish_status(false);
    }
}

async fn run_link(shared: Arc<Shared>, generation: u64) {
    let link = match shared.transport.open(&shared.endpoint).await {
        Ok(link) => link,
        Err(e) => {
            tracing::warn!(endpoint = %shared.endpoint, "connection failed: {e}");
            shared.link_lost(generation);
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    {
        let mut inner = shared.lock();
        if inner.generation != generation {
            // Disconnected while the handshake was in flight.
            return;
        }
        inner.state = ConnectionState::Connected;
        inner.outbound = Some(tx);
        inner.cancel_reconnect();
    }
    tracing::info!(endpoint = %shared.endpoint, "connected");
    shared.publish_status(true);

    let Link {
        mut sink,
        mut stream,
    } = link;

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(text)) => {
                    codec::dispatch(&shared.bus, &text);
                }
                Some(Err(e)) => {
                    tracing::warn!("link error: {e}");
                    break;
                }
                None => {
                    tracing::warn!("connection closed by peer");
                    break;
                }
            },
            outbound = rx.recv() => match outbound {
                Some(Outbound::Frame(text)) => {
                    if let Err(e) = sink.send(text).await {
                        tracing::warn!("{e}");
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    if let Err(e) = sink.close().await {
                        tracing::debug!("close: {e}");
                    }
                    return;
                }
            },
        }
    }

    shared.link_lost(generation);
}

/// Handle to the update channel. Clones share the same link.
#[derive(Clone)]
pub struct ConnectionManager {
    shared: Arc<Shared>,
}

impl ConnectionManager {
    /// A disconnected manager for `config.endpoint`. Nothing is spawned yet.
    pub fn new(config: &MonitorConfig, bus: Arc<EventBus>, transport: Arc<dyn Transport>) -> Self {
        Self {
            shared: Arc::new(Shared {
                endpoint: config.endpoint.clone(),
                reconnect_delay: config.reconnect_delay,
                auto_connect: config.auto_connect,
                bus,
                transport,
                inner: Mutex::new(Inner {
                    state: ConnectionState::Disconnected,
                    generation: 0,
                    link_task: None,
                    outbound: None,
                    reconnect: None,
                    next_timer_id: 0,
                }),
            }),
        }
    }

    /// Gateway URL this manager dials.
    pub fn endpoint(&self) -> &str {
        &self.shared.endpoint
    }

    /// Bus that receives status events and inbound frames.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.shared.bus
    }

    /// Current link state.
    pub fn state(&self) -> ConnectionState {
        self.shared.lock().state
    }

    /// Whether the link is up.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Whether a reconnect timer is armed.
    pub fn has_pending_reconnect(&self) -> bool {
        self.shared.lock().reconnect.is_some()
    }

    /// Open the link. No-op while connected or connecting. Returns whether a
    /// new attempt was started.
    pub fn connect(&self) -> bool {
        let mut inner = self.shared.lock();
        self.shared.connect_locked(&mut inner)
    }

    /// Close the link, abandon any in-flight attempt and cancel a pending
    /// reconnect. Safe to call repeatedly.
    pub fn disconnect(&self) {
        let previous = {
            let mut inner = self.shared.lock();
            let previous = inner.state;
            inner.generation += 1;
            match inner.outbound.take() {
                // The link task sends a close frame and exits.
                Some(tx) => {
                    let _ = tx.send(Outbound::Close);
                    inner.link_task = None;
                }
                None => {
                    if let Some(task) = inner.link_task.take() {
                        task.abort();
                    }
                }
            }
            inner.cancel_reconnect();
            inner.state = ConnectionState::Disconnected;
            previous
        };

        if matches!(
            previous,
            ConnectionState::Connected | ConnectionState::Connecting
        ) {
            tracing::info!(endpoint = %self.shared.endpoint, "disconnected");
            self.shared.publish_status(false);
        }
    }

    /// Connect if the configuration asks for it. Returns whether an attempt started.
    pub fn start(&self) -> bool {
        if self.shared.auto_connect {
            self.connect()
        } else {
            false
        }
    }

    /// Tear the link down. Equivalent to [`disconnect`](Self::disconnect).
    pub fn stop(&self) {
        self.disconnect();
    }

    /// Queue `{type, payload}` on the live link. Fails with
    /// [`MonitorError::NotConnected`] and no side effect otherwise.
    pub fn send(&self, kind: &str, payload: &Value) -> Result<()> {
        let inner = self.shared.lock();
        let tx = match (inner.state, inner.outbound.as_ref()) {
            (ConnectionState::Connected, Some(tx)) => tx,
            _ => {
                tracing::warn!(kind, "websocket not connected; message dropped");
                return Err(MonitorError::NotConnected);
            }
        };
        let frame = codec::encode(kind, payload)?;
        tx.send(Outbound::Frame(frame))
            .map_err(|_| MonitorError::NotConnected)
    }
}
