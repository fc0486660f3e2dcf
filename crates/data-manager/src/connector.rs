//! Cascading stream connector
//!
//! Walks an ordered list of stream candidates with a single cursor. At most
//! one channel is open at a time. An open failure moves straight to the next
//! candidate; a channel that fails after connecting moves to the candidate
//! after the one that connected; the terminal `done` event stops the cascade.
//!
//! The connector is driven one event at a time through [`StreamConnector::step`].
//! State only changes after an await has completed, so a `step` future that
//! is dropped half way (e.g. losing a `tokio::select!`) leaves it consistent.
//! An open in flight is owned by the connector and picked up again by the
//! next `step` instead of being sent twice.

use crate::accumulator::PointAccumulator;
use crate::transport::{ChannelEvent, EventChannel, StreamTransport};
use futures_util::future::BoxFuture;
use pulse_shared::{ConnectionState, PulseError, PulseResult, Sample};
use std::sync::Arc;

/// What a single [`StreamConnector::step`] did
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectorEvent {
    Opened { candidate: usize, url: String },
    OpenFailed { candidate: usize, url: String, error: PulseError },
    /// A sample was appended; `len` is the accumulator length afterwards
    Appended { len: usize },
    /// A payload failed to parse and was discarded
    Dropped { error: PulseError },
    /// A named event other than `done`
    Ignored { event: String },
    /// The connected channel failed; `error` is `None` when the transport
    /// ended without the terminal signal
    ChannelLost { candidate: usize, error: Option<PulseError> },
    Completed { candidate: usize },
    /// No candidates left to try
    Exhausted,
}

/// Terminal outcome of a cascade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CascadeOutcome {
    /// The producer sent the terminal signal
    Completed { candidate: usize },
    /// Some channel connected, then every remaining candidate failed
    Lost { last_candidate: usize },
    /// No candidate ever connected (includes an empty list)
    Unreachable,
    /// Closed by the owner before settling
    Closed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectorStats {
    pub attempts: usize,
    pub opened: usize,
    pub delivered: usize,
    pub dropped: usize,
}

struct ActiveChannel {
    candidate: usize,
    channel: Box<dyn EventChannel>,
}

struct PendingOpen {
    candidate: usize,
    url: String,
    future: BoxFuture<'static, PulseResult<Box<dyn EventChannel>>>,
}

pub struct StreamConnector {
    transport: Arc<dyn StreamTransport>,
    candidates: Vec<String>,
    cursor: usize,
    opening: Option<PendingOpen>,
    active: Option<ActiveChannel>,
    last_opened: Option<usize>,
    state: ConnectionState,
    outcome: Option<CascadeOutcome>,
    stats: ConnectorStats,
}

impl StreamConnector {
    pub fn new(transport: Arc<dyn StreamTransport>, candidates: Vec<String>) -> Self {
        let (state, outcome) = if candidates.is_empty() {
            log::warn!("No stream candidates; staying disconnected");
            (ConnectionState::Disconnected, Some(CascadeOutcome::Unreachable))
        } else {
            (ConnectionState::Connecting, None)
        };

        Self {
            transport,
            candidates,
            cursor: 0,
            opening: None,
            active: None,
            last_opened: None,
            state,
            outcome,
            stats: ConnectorStats::default(),
        }
    }

    /// Advance the cascade by one event. Returns `None` once settled.
    ///
    /// Samples go into `points`, which is cleared whenever a channel opens.
    pub async fn step(&mut self, points: &mut PointAccumulator) -> Option<ConnectorEvent> {
        if self.outcome.is_some() {
            return None;
        }
        if self.active.is_none() {
            return Some(self.open_next(points).await);
        }

        let received = match self.active.as_mut() {
            Some(active) => active.channel.next_event().await,
            None => return None,
        };
        Some(self.on_received(received, points))
    }

    /// Drive the cascade until it settles
    pub async fn run_to_end(&mut self, points: &mut PointAccumulator) -> CascadeOutcome {
        while self.step(points).await.is_some() {}
        self.outcome.clone().unwrap_or(CascadeOutcome::Closed)
    }

    /// Close the active channel, if any, and stop the cascade.
    pub fn close(&mut self) {
        if let Some(pending) = self.opening.take() {
            log::debug!("Abandoned open of {}", pending.url);
        }
        if let Some(mut active) = self.active.take() {
            active.channel.close();
            log::info!("Closed stream {}", self.candidates[active.candidate]);
        }
        self.state = ConnectionState::Disconnected;
        if self.outcome.is_none() {
            self.outcome = Some(CascadeOutcome::Closed);
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn outcome(&self) -> Option<&CascadeOutcome> {
        self.outcome.as_ref()
    }

    pub fn is_settled(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn stats(&self) -> ConnectorStats {
        self.stats
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Index of the candidate whose channel is currently open
    pub fn active_candidate(&self) -> Option<usize> {
        self.active.as_ref().map(|active| active.candidate)
    }

    async fn open_next(&mut self, points: &mut PointAccumulator) -> ConnectorEvent {
        if self.opening.is_none() {
            let candidate = self.cursor;
            let Some(url) = self.candidates.get(candidate).cloned() else {
                return self.exhaust();
            };
            let transport = Arc::clone(&self.transport);
            let target = url.clone();
            self.opening = Some(PendingOpen {
                candidate,
                url,
                future: Box::pin(async move { transport.open(&target).await }),
            });
            self.stats.attempts += 1;
        }

        let (candidate, url, opened) = match self.opening.as_mut() {
            Some(pending) => (
                pending.candidate,
                pending.url.clone(),
                pending.future.as_mut().await,
            ),
            None => return self.exhaust(),
        };
        self.opening = None;
        self.cursor = candidate + 1;

        match opened {
            Ok(channel) => {
                log::info!("Opened stream {} (candidate {})", url, candidate);
                points.clear();
                self.active = Some(ActiveChannel { candidate, channel });
                self.last_opened = Some(candidate);
                self.state = ConnectionState::Connected;
                self.stats.opened += 1;
                ConnectorEvent::Opened { candidate, url }
            }
            Err(error) => {
                log::warn!("Failed to open stream {}: {}", url, error);
                ConnectorEvent::OpenFailed {
                    candidate,
                    url,
                    error,
                }
            }
        }
    }

    fn on_received(
        &mut self,
        received: PulseResult<Option<ChannelEvent>>,
        points: &mut PointAccumulator,
    ) -> ConnectorEvent {
        match received {
            Ok(Some(event)) if event.is_done() => self.complete(),
            Ok(Some(event)) if event.is_message() => match Sample::parse(&event.data) {
                Ok(sample) => {
                    points.append(sample);
                    self.stats.delivered += 1;
                    ConnectorEvent::Appended { len: points.len() }
                }
                Err(error) => {
                    log::debug!("Dropped malformed payload `{}`: {}", event.data, error);
                    self.stats.dropped += 1;
                    ConnectorEvent::Dropped { error }
                }
            },
            Ok(Some(event)) => {
                log::debug!("Ignoring `{}` event", event.event);
                ConnectorEvent::Ignored { event: event.event }
            }
            Ok(None) => self.lose(None),
            Err(error) => self.lose(Some(error)),
        }
    }

    fn complete(&mut self) -> ConnectorEvent {
        let candidate = self.release().unwrap_or(self.cursor.saturating_sub(1));
        log::info!("Stream {} completed", self.candidates[candidate]);
        self.outcome = Some(CascadeOutcome::Completed { candidate });
        ConnectorEvent::Completed { candidate }
    }

    fn lose(&mut self, error: Option<PulseError>) -> ConnectorEvent {
        let candidate = self.release().unwrap_or(self.cursor.saturating_sub(1));
        match &error {
            Some(e) => log::warn!("Stream {} lost: {}", self.candidates[candidate], e),
            None => log::warn!("Stream {} ended without done", self.candidates[candidate]),
        }
        self.cursor = candidate + 1;
        ConnectorEvent::ChannelLost { candidate, error }
    }

    fn exhaust(&mut self) -> ConnectorEvent {
        log::error!("All {} stream candidates exhausted", self.candidates.len());
        self.state = ConnectionState::Disconnected;
        self.outcome = Some(match self.last_opened {
            Some(last_candidate) => CascadeOutcome::Lost { last_candidate },
            None => CascadeOutcome::Unreachable,
        });
        ConnectorEvent::Exhausted
    }

    /// Close the active channel and return its candidate index
    fn release(&mut self) -> Option<usize> {
        self.state = ConnectionState::Disconnected;
        self.active.take().map(|mut active| {
            active.channel.close();
            active.candidate
        })
    }
}

impl Drop for StreamConnector {
    fn drop(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.channel.close();
        }
    }
}
