//! In-memory transports driven by scripts
//!
//! Both fakes record every URL they were asked for, so callers can assert on
//! attempt order. Unknown URLs behave like a refused connection.

use crate::transport::{ChannelEvent, DocumentFetch, EventChannel, FetchedDocument, StreamTransport};
use async_trait::async_trait;
use bytes::Bytes;
use pulse_shared::{PulseError, PulseResult};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn refused(url: &str) -> PulseError {
    PulseError::network(format!("{}: connection refused", url))
}

/// Scripted one-shot documents
#[derive(Default)]
pub struct ScriptedFetch {
    routes: Mutex<HashMap<String, PulseResult<FetchedDocument>>>,
    requested: Mutex<Vec<String>>,
}

impl ScriptedFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, body: &str) -> Self {
        self.set_serve(url, body);
        self
    }

    /// Serve `body` for `url` as if redirected to `served_from`
    pub fn serve_from(self, url: &str, served_from: &str, body: &str) -> Self {
        lock(&self.routes).insert(
            url.to_string(),
            Ok(FetchedDocument {
                url: served_from.to_string(),
                body: Bytes::from(body.to_string()),
            }),
        );
        self
    }

    pub fn fail(self, url: &str, error: PulseError) -> Self {
        self.set_fail(url, error);
        self
    }

    /// Replace the route for `url` while the fake is shared
    pub fn set_serve(&self, url: &str, body: &str) {
        lock(&self.routes).insert(
            url.to_string(),
            Ok(FetchedDocument {
                url: url.to_string(),
                body: Bytes::from(body.to_string()),
            }),
        );
    }

    pub fn set_fail(&self, url: &str, error: PulseError) {
        lock(&self.routes).insert(url.to_string(), Err(error));
    }

    /// Every URL fetched so far, in request order
    pub fn requested(&self) -> Vec<String> {
        lock(&self.requested).clone()
    }
}

#[async_trait]
impl DocumentFetch for ScriptedFetch {
    async fn fetch(&self, url: &str) -> PulseResult<FetchedDocument> {
        lock(&self.requested).push(url.to_string());
        lock(&self.routes)
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(refused(url)))
    }
}

/// One scripted step of an open channel
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Event(ChannelEvent),
    /// Transport error after the channel connected
    Fail(PulseError),
    /// Transport ends without the terminal signal
    End,
    /// Never yields again
    Stall,
}

impl ScriptStep {
    /// An unnamed event carrying `data`
    pub fn message(data: impl Into<String>) -> Self {
        ScriptStep::Event(ChannelEvent::message(data))
    }

    pub fn done() -> Self {
        ScriptStep::Event(ChannelEvent::done())
    }
}

#[derive(Debug, Clone)]
enum Route {
    Refuse(PulseError),
    Channel(Vec<ScriptStep>),
}

/// Scripted stream channels
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<String, Route>>,
    attempts: Mutex<Vec<String>>,
    live: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    open_delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(self, url: &str, steps: Vec<ScriptStep>) -> Self {
        self.set_channel(url, steps);
        self
    }

    /// Every open takes `delay` before it connects or fails
    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    pub fn refuse(self, url: &str, error: PulseError) -> Self {
        lock(&self.routes).insert(url.to_string(), Route::Refuse(error));
        self
    }

    pub fn set_channel(&self, url: &str, steps: Vec<ScriptStep>) {
        lock(&self.routes).insert(url.to_string(), Route::Channel(steps));
    }

    /// Every URL an open was attempted on, in order
    pub fn attempts(&self) -> Vec<String> {
        lock(&self.attempts).clone()
    }

    /// Channels opened and not yet closed
    pub fn open_channels(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open channels seen
    pub fn peak_open_channels(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamTransport for ScriptedTransport {
    async fn open(&self, url: &str) -> PulseResult<Box<dyn EventChannel>> {
        lock(&self.attempts).push(url.to_string());
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        let route = lock(&self.routes).get(url).cloned();

        match route {
            Some(Route::Channel(steps)) => {
                let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                Ok(Box::new(ScriptedChannel {
                    url: url.to_string(),
                    steps: steps.into(),
                    closed: false,
                    live: Arc::clone(&self.live),
                }))
            }
            Some(Route::Refuse(error)) => Err(error),
            None => Err(refused(url)),
        }
    }
}

struct ScriptedChannel {
    url: String,
    steps: VecDeque<ScriptStep>,
    closed: bool,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl EventChannel for ScriptedChannel {
    async fn next_event(&mut self) -> PulseResult<Option<ChannelEvent>> {
        if self.closed {
            return Err(PulseError::channel_closed(format!("{} is already closed", self.url)));
        }

        // a stall stays queued so a cancelled read does not skip it
        if matches!(self.steps.front(), Some(ScriptStep::Stall)) {
            return std::future::pending().await;
        }

        match self.steps.pop_front() {
            Some(ScriptStep::Event(event)) => Ok(Some(event)),
            Some(ScriptStep::Fail(error)) => {
                self.close();
                Err(error)
            }
            Some(ScriptStep::End) | None => {
                self.close();
                Ok(None)
            }
            Some(ScriptStep::Stall) => std::future::pending().await,
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ScriptedChannel {
    fn drop(&mut self) {
        self.close();
    }
}
