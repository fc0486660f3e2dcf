//! View controller: the single owner of one chart view's state
//!
//! Resolves metadata, picks the initial selection, drives the selection
//! switch and publishes a [`ViewSnapshot`] after every change. Commands
//! arrive over an mpsc channel; snapshots leave through a watch channel.

use crate::accumulator::Samples;
use crate::candidates::{EndpointSet, StreamPlan};
use crate::connector::{CascadeOutcome, ConnectorEvent, ConnectorStats};
use crate::resolver::{EndpointResolver, Resolution};
use crate::selection::{SelectionSwitch, SwitchState};
use crate::transport::{DocumentFetch, StreamTransport};
use pulse_shared::{ConnectionState, Metadata, PulseError, PulseResult, SeriesKind};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub kind: SeriesKind,
    pub endpoints: EndpointSet,
    /// Overrides the sampling interval of `kind`
    pub interval_ms: Option<u64>,
    pub preferred_preset: Option<String>,
    /// Capacity of the command channel
    pub command_buffer: usize,
}

impl ViewConfig {
    pub fn new(kind: SeriesKind, endpoints: EndpointSet) -> Self {
        Self {
            kind,
            endpoints,
            interval_ms: None,
            preferred_preset: None,
            command_buffer: 16,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms.unwrap_or_else(|| self.kind.default_interval_ms())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Select(String),
    /// Resolve metadata again
    Retry,
    Unmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// Metadata not resolved yet
    Connecting,
    /// Every metadata candidate failed
    NoDataSource,
    Live(ConnectionState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub kind: SeriesKind,
    pub status: ViewStatus,
    pub metadata: Option<Metadata>,
    pub base: Option<String>,
    pub selection: Option<String>,
    pub presets: Vec<String>,
    /// Shares storage with the live accumulator
    pub points: Samples,
    /// Bumped whenever the points were replaced rather than extended
    pub generation: u64,
    pub outcome: Option<CascadeOutcome>,
    pub stats: ConnectorStats,
    /// Set once the view has unmounted
    pub closed: bool,
}

impl ViewSnapshot {
    fn initial(kind: SeriesKind) -> Self {
        Self {
            kind,
            status: ViewStatus::Connecting,
            metadata: None,
            base: None,
            selection: None,
            presets: Vec::new(),
            points: Samples::new(),
            generation: 0,
            outcome: None,
            stats: ConnectorStats::default(),
            closed: false,
        }
    }
}

/// Caller side of a running [`ViewController`]. Dropping it unmounts the view.
#[derive(Clone)]
pub struct ViewHandle {
    commands: mpsc::Sender<ViewCommand>,
    snapshots: watch::Receiver<ViewSnapshot>,
}

impl ViewHandle {
    pub async fn send(&self, command: ViewCommand) -> PulseResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PulseError::channel_closed("view controller has stopped"))
    }

    pub async fn select(&self, selection: impl Into<String>) -> PulseResult<()> {
        self.send(ViewCommand::Select(selection.into())).await
    }

    pub async fn retry(&self) -> PulseResult<()> {
        self.send(ViewCommand::Retry).await
    }

    pub async fn unmount(&self) -> PulseResult<()> {
        self.send(ViewCommand::Unmount).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&ViewSnapshot) -> bool,
    ) -> PulseResult<ViewSnapshot> {
        let mut receiver = self.snapshots.clone();
        let snapshot = receiver
            .wait_for(predicate)
            .await
            .map_err(|_| PulseError::channel_closed("view controller has stopped"))?;
        Ok(snapshot.clone())
    }
}

pub struct ViewController {
    config: ViewConfig,
    resolver: EndpointResolver,
    switch: SelectionSwitch,
    metadata: Option<Metadata>,
    status: ViewStatus,
    commands: mpsc::Receiver<ViewCommand>,
    snapshots: watch::Sender<ViewSnapshot>,
}

impl ViewController {
    pub fn new(
        config: ViewConfig,
        fetch: Arc<dyn DocumentFetch>,
        transport: Arc<dyn StreamTransport>,
    ) -> (Self, ViewHandle) {
        let (command_tx, command_rx) = mpsc::channel(config.command_buffer.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(ViewSnapshot::initial(config.kind));

        let plan = StreamPlan::new(config.endpoints.clone(), config.kind, config.interval_ms());
        let controller = Self {
            resolver: EndpointResolver::new(fetch),
            switch: SelectionSwitch::new(transport, plan),
            metadata: None,
            status: ViewStatus::Connecting,
            commands: command_rx,
            snapshots: snapshot_tx,
            config,
        };
        let handle = ViewHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        };

        (controller, handle)
    }

    /// Run on its own task
    pub fn spawn(self) -> JoinHandle<ViewSnapshot> {
        tokio::spawn(self.run())
    }

    /// Mount, serve commands and stream events until unmounted. Returns the
    /// final snapshot.
    pub async fn run(mut self) -> ViewSnapshot {
        log::info!("Mounting {} view", self.config.kind.as_str());
        self.resolve().await;
        self.publish();

        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(ViewCommand::Select(selection)) => self.select(selection),
                    Some(ViewCommand::Retry) => self.resolve().await,
                    Some(ViewCommand::Unmount) | None => break,
                },
                Some(event) = self.switch.step(), if self.switch.is_live() => {
                    self.on_event(&event);
                }
            }
            self.publish();
        }

        log::info!("Unmounting {} view", self.config.kind.as_str());
        self.switch.close();
        let mut last = self.snapshot();
        last.closed = true;
        self.snapshots.send_replace(last.clone());
        last
    }

    async fn resolve(&mut self) {
        let candidates = self.config.endpoints.metadata_candidates(self.config.kind);
        let resolution: Resolution<Metadata> = self
            .resolver
            .resolve(&candidates, self.config.kind.metadata_resource())
            .await;

        let resolved = match resolution {
            Resolution::Resolved(resolved) => resolved,
            Resolution::NoService { .. } => {
                if self.metadata.is_none() {
                    self.status = ViewStatus::NoDataSource;
                } else {
                    log::warn!("Re-resolution failed; keeping the current session");
                }
                return;
            }
        };

        if let Err(e) = resolved.value.validate() {
            log::warn!("Resolved metadata cannot be charted: {}", e);
        }
        self.metadata = Some(resolved.value);

        match self.switch.state().clone() {
            SwitchState::Idle => {
                self.switch.rebase(Some(resolved.base));
                let selection = self.initial_selection();
                log::info!("Starting stream with selection {:?}", selection);
                self.switch.activate(selection);
            }
            SwitchState::Active { selection } => {
                self.switch.rebase(Some(resolved.base));
                if !self.accepts(selection.as_deref()) {
                    if let Some(next) = self.initial_selection() {
                        log::info!("Selection {:?} is no longer offered", selection);
                        self.switch.select(&next);
                    }
                }
            }
            SwitchState::Closed => {}
        }
        self.status = ViewStatus::Live(self.switch.connection_state());
    }

    fn select(&mut self, selection: String) {
        let Some(metadata) = self.metadata.as_ref() else {
            log::info!("Remembering selection `{}` until metadata resolves", selection);
            self.config.preferred_preset = Some(selection);
            return;
        };
        if !metadata.presets.is_empty() && !metadata.has_preset(&selection) {
            log::warn!("Ignoring unknown preset `{}`", selection);
            return;
        }
        if self.switch.select(&selection) {
            self.status = ViewStatus::Live(self.switch.connection_state());
        }
    }

    fn on_event(&mut self, event: &ConnectorEvent) {
        if let ConnectorEvent::Exhausted = event {
            log::warn!(
                "{} view has no live stream for {:?}",
                self.config.kind.as_str(),
                self.switch.selection()
            );
        }
        if self.metadata.is_some() {
            self.status = ViewStatus::Live(self.switch.connection_state());
        }
    }

    /// Configured preset when the metadata offers it, else the metadata's
    /// own initial selection
    fn initial_selection(&self) -> Option<String> {
        let metadata = self.metadata.as_ref()?;
        self.config
            .preferred_preset
            .as_deref()
            .filter(|preset| metadata.presets.is_empty() || metadata.has_preset(preset))
            .or_else(|| metadata.initial_selection())
            .map(str::to_string)
    }

    fn accepts(&self, selection: Option<&str>) -> bool {
        match (self.metadata.as_ref(), selection) {
            (Some(metadata), Some(selection)) => {
                metadata.presets.is_empty() || metadata.has_preset(selection)
            }
            (Some(metadata), None) => metadata.presets.is_empty(),
            (None, _) => false,
        }
    }

    fn snapshot(&self) -> ViewSnapshot {
        let points = self.switch.points();
        ViewSnapshot {
            kind: self.config.kind,
            status: self.status,
            metadata: self.metadata.clone(),
            base: self.switch.plan().base.clone(),
            selection: self.switch.selection().map(str::to_string),
            presets: self
                .metadata
                .as_ref()
                .map(|m| m.presets.clone())
                .unwrap_or_default(),
            points: points.share(),
            generation: points.generation(),
            outcome: self.switch.outcome(),
            stats: self.switch.stats(),
            closed: false,
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }
}
