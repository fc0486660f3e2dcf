//! Transport seams used by the resolver and the stream connector
//!
//! The HTTP implementations live in [`crate::http_client`]; tests drive the
//! same seams with the `scripted` fakes from the `test-util` feature.

use async_trait::async_trait;
use bytes::Bytes;
use pulse_shared::PulseResult;

/// One event read from a stream channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvent {
    pub event: String,
    pub data: String,
    pub id: Option<String>,
}

impl ChannelEvent {
    /// Name of unnamed events
    pub const MESSAGE: &'static str = "message";
    /// Name of the graceful end-of-stream signal
    pub const DONE: &'static str = "done";

    pub fn message(data: impl Into<String>) -> Self {
        Self::named(Self::MESSAGE, data)
    }

    pub fn named(event: &str, data: impl Into<String>) -> Self {
        Self {
            event: event.to_string(),
            data: data.into(),
            id: None,
        }
    }

    pub fn done() -> Self {
        Self::named(Self::DONE, "{}")
    }

    pub fn is_message(&self) -> bool {
        self.event == Self::MESSAGE
    }

    pub fn is_done(&self) -> bool {
        self.event == Self::DONE
    }
}

/// An open, one-way push channel.
#[async_trait]
pub trait EventChannel: Send {
    /// Next event in delivery order. `Ok(None)` means the transport ended
    /// without the terminal signal.
    async fn next_event(&mut self) -> PulseResult<Option<ChannelEvent>>;

    /// Release the channel. Safe to call any number of times.
    fn close(&mut self);
}

/// Opens stream channels; an `Err` means the channel never reached the
/// connected state.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open(&self, url: &str) -> PulseResult<Box<dyn EventChannel>>;
}

/// A fetched document and the URL that finally served it (after redirects)
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedDocument {
    pub url: String,
    pub body: Bytes,
}

/// One-shot GET used for metadata and captions
#[async_trait]
pub trait DocumentFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> PulseResult<FetchedDocument>;
}
