pub mod mock;
pub mod ws;

use async_trait::async_trait;
use futures::Sink;
use futures::stream::BoxStream;
use std::pin::Pin;

use crate::error::{MonitorError, Result};

/// Inbound text frames. The stream ends when the peer closes.
pub type FrameStream = BoxStream<'static, Result<String>>;

/// Outbound text frames. Closing the sink closes the link.
pub type FrameSink = Pin<Box<dyn Sink<String, Error = MonitorError> + Send>>;

/// One open duplex text connection.
pub struct Link {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

/// How the connection manager reaches the gateway. A WebSocket in
/// production, a scripted peer in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, endpoint: &str) -> Result<Link>;
}
