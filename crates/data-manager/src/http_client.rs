//! HTTP transport for metadata documents and server-sent event streams
//!
//! Metadata requests carry a short per-request timeout. Stream requests only
//! bound the connect phase: an open channel has no application-level timeout,
//! a stalled stream is only noticed when the transport reports an error.

use crate::sse::SseDecoder;
use crate::transport::{ChannelEvent, DocumentFetch, EventChannel, FetchedDocument, StreamTransport};
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use pulse_shared::{PulseError, PulseResult};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use std::collections::VecDeque;
use std::time::Duration;

const EVENT_STREAM: &str = "text/event-stream";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whole-request timeout for one-shot documents
    pub request_timeout: Duration,
    /// TCP/TLS connect timeout, applied to streams too
    pub connect_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> PulseResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| PulseError::network(format!("Failed to create client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn map_error(&self, url: &str, err: reqwest::Error) -> PulseError {
        if err.is_timeout() {
            PulseError::Timeout {
                message: format!("{}: {}", url, err),
                duration_ms: self.config.request_timeout.as_millis() as u64,
            }
        } else {
            PulseError::network(format!("{}: {}", url, err))
        }
    }
}

#[async_trait]
impl DocumentFetch for HttpClient {
    async fn fetch(&self, url: &str) -> PulseResult<FetchedDocument> {
        let response = self
            .client
            .get(url)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        if !response.status().is_success() {
            return Err(PulseError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let served_from = response.url().to_string();
        let body = response.bytes().await.map_err(|e| self.map_error(url, e))?;

        Ok(FetchedDocument {
            url: served_from,
            body,
        })
    }
}

#[async_trait]
impl StreamTransport for HttpClient {
    async fn open(&self, url: &str) -> PulseResult<Box<dyn EventChannel>> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, EVENT_STREAM)
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| self.map_error(url, e))?;

        if !response.status().is_success() {
            return Err(PulseError::HttpStatus {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with(EVENT_STREAM) {
            return Err(PulseError::network(format!(
                "{}: expected {} but got `{}`",
                url, EVENT_STREAM, content_type
            )));
        }

        Ok(Box::new(HttpEventChannel::new(
            url.to_string(),
            response.bytes_stream().boxed(),
        )))
    }
}

/// Server-sent event channel over a streaming response body
pub struct HttpEventChannel {
    url: String,
    stream: Option<BoxStream<'static, reqwest::Result<Bytes>>>,
    decoder: SseDecoder,
    pending: VecDeque<ChannelEvent>,
}

impl HttpEventChannel {
    fn new(url: String, stream: BoxStream<'static, reqwest::Result<Bytes>>) -> Self {
        Self {
            url,
            stream: Some(stream),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
        }
    }
}

#[async_trait]
impl EventChannel for HttpEventChannel {
    async fn next_event(&mut self) -> PulseResult<Option<ChannelEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            let next = match self.stream.as_mut() {
                Some(stream) => stream.next().await,
                None => {
                    return Err(PulseError::channel_closed(format!(
                        "{} is already closed",
                        self.url
                    )))
                }
            };

            match next {
                Some(Ok(chunk)) => match self.decoder.feed(&chunk) {
                    Ok(events) => self.pending.extend(events),
                    Err(e) => {
                        self.close();
                        return Err(PulseError::network(format!("{}: {}", self.url, e)));
                    }
                },
                Some(Err(e)) => {
                    self.close();
                    return Err(PulseError::network(format!("{}: {}", self.url, e)));
                }
                None => {
                    // a half-received event at end of body is discarded
                    self.stream = None;
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("Closed stream {}", self.url);
        }
        self.pending.clear();
    }
}
