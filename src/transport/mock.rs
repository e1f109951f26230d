use async_trait::async_trait;
use futures::channel::mpsc;
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Link, Transport};
use crate::error::{MonitorError, Result};

/// What the next `open` call should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOutcome {
    /// Connection refused.
    Refuse,
    /// Open a link; the far end is handed out via [`MockTransport::take_peer`].
    Accept,
    /// Never complete the handshake.
    Hang,
}

/// A scripted transport for tests. Plays outcomes in order; once the script
/// runs out every attempt is refused.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<MockOutcome>>,
    peers: Mutex<VecDeque<MockPeer>>,
    opens: AtomicUsize,
}

impl MockTransport {
    /// Transport that plays `script` in order.
    pub fn new(script: Vec<MockOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            peers: Mutex::new(VecDeque::new()),
            opens: AtomicUsize::new(0),
        }
    }

    /// Append more outcomes to the script.
    pub fn push(&self, outcome: MockOutcome) {
        lock(&self.script).push_back(outcome);
    }

    /// Number of `open` calls so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Far end of the oldest accepted link not yet taken.
    pub fn take_peer(&self) -> Option<MockPeer> {
        lock(&self.peers).pop_front()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, endpoint: &str) -> Result<Link> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = lock(&self.script).pop_front().unwrap_or(MockOutcome::Refuse);
        tracing::trace!(endpoint, attempt, ?outcome, "mock open");

        match outcome {
            MockOutcome::Refuse => Err(MonitorError::Transport(format!(
                "connection refused: {endpoint}"
            ))),
            MockOutcome::Hang => futures::future::pending().await,
            MockOutcome::Accept => {
                let (to_client, client_rx) = mpsc::unbounded::<Result<String>>();
                let (client_tx, from_client) = mpsc::unbounded::<String>();
                lock(&self.peers).push_back(MockPeer {
                    to_client,
                    from_client,
                });
                Ok(Link {
                    sink: Box::pin(
                        client_tx.sink_map_err(|e| MonitorError::Transport(e.to_string())),
                    ),
                    stream: client_rx.boxed(),
                })
            }
        }
    }
}

/// The gateway side of a mock link.
pub struct MockPeer {
    to_client: mpsc::UnboundedSender<Result<String>>,
    from_client: mpsc::UnboundedReceiver<String>,
}

impl MockPeer {
    /// Push a text frame to the client.
    pub fn send(&self, frame: &str) {
        let _ = self.to_client.unbounded_send(Ok(frame.to_string()));
    }

    /// Inject a transport error into the client's read side.
    pub fn fail(&self, reason: &str) {
        let _ = self
            .to_client
            .unbounded_send(Err(MonitorError::Transport(reason.to_string())));
    }

    /// Next frame the client sent, or `None` once the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.next().await
    }

    /// Close the link from the gateway side.
    pub fn close(self) {
        self.to_client.close_channel();
    }
}
