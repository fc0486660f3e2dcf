//! Selection switch: one connector per active selection
//!
//! Changing the selection closes the current channel before anything else
//! happens, so samples from the previous selection never reach the new
//! accumulator lifetime.

use crate::accumulator::PointAccumulator;
use crate::candidates::StreamPlan;
use crate::connector::{CascadeOutcome, ConnectorEvent, ConnectorStats, StreamConnector};
use crate::transport::StreamTransport;
use pulse_shared::ConnectionState;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchState {
    Idle,
    /// `selection` is `None` for resources without presets
    Active { selection: Option<String> },
    Closed,
}

pub struct SelectionSwitch {
    transport: Arc<dyn StreamTransport>,
    plan: StreamPlan,
    state: SwitchState,
    connector: Option<StreamConnector>,
    points: PointAccumulator,
}

impl SelectionSwitch {
    pub fn new(transport: Arc<dyn StreamTransport>, plan: StreamPlan) -> Self {
        Self {
            transport,
            plan,
            state: SwitchState::Idle,
            connector: None,
            points: PointAccumulator::new(),
        }
    }

    /// Start streaming `selection`. Only valid from `Idle`.
    pub fn activate(&mut self, selection: Option<String>) -> bool {
        if self.state != SwitchState::Idle {
            log::debug!("Ignoring activate in state {:?}", self.state);
            return false;
        }
        self.start(selection);
        true
    }

    /// Switch to `selection`. Returns `false` when nothing changed.
    pub fn select(&mut self, selection: &str) -> bool {
        match &self.state {
            SwitchState::Active { selection: current } if current.as_deref() != Some(selection) => {
                log::info!("Switching selection {:?} -> {}", current, selection);
                self.stop();
                self.start(Some(selection.to_string()));
                true
            }
            SwitchState::Active { .. } => false,
            state => {
                log::debug!("Ignoring select `{}` in state {:?}", selection, state);
                false
            }
        }
    }

    /// Point the plan at a newly resolved base. An active selection is
    /// restarted against it.
    pub fn rebase(&mut self, base: Option<String>) {
        if self.state == SwitchState::Closed {
            return;
        }
        self.plan.base = base;
        if let SwitchState::Active { selection } = self.state.clone() {
            log::info!("Rebasing stream for {:?} on {:?}", selection, self.plan.base);
            self.stop();
            self.start(selection);
        }
    }

    /// Next connector event of the active selection; `None` when nothing is
    /// streaming.
    pub async fn step(&mut self) -> Option<ConnectorEvent> {
        match self.connector.as_mut() {
            Some(connector) => connector.step(&mut self.points).await,
            None => None,
        }
    }

    /// Whether [`Self::step`] can still produce events
    pub fn is_live(&self) -> bool {
        self.connector
            .as_ref()
            .map(|connector| !connector.is_settled())
            .unwrap_or(false)
    }

    pub fn close(&mut self) {
        if self.state == SwitchState::Closed {
            return;
        }
        self.stop();
        self.state = SwitchState::Closed;
    }

    pub fn state(&self) -> &SwitchState {
        &self.state
    }

    pub fn selection(&self) -> Option<&str> {
        match &self.state {
            SwitchState::Active { selection } => selection.as_deref(),
            _ => None,
        }
    }

    pub fn points(&self) -> &PointAccumulator {
        &self.points
    }

    pub fn plan(&self) -> &StreamPlan {
        &self.plan
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connector
            .as_ref()
            .map(StreamConnector::state)
            .unwrap_or(ConnectionState::Disconnected)
    }

    pub fn outcome(&self) -> Option<CascadeOutcome> {
        self.connector.as_ref().and_then(|c| c.outcome().cloned())
    }

    pub fn stats(&self) -> ConnectorStats {
        self.connector
            .as_ref()
            .map(StreamConnector::stats)
            .unwrap_or_default()
    }

    fn start(&mut self, selection: Option<String>) {
        let candidates = self.plan.candidates(selection.as_deref());
        self.points.clear();
        self.connector = Some(StreamConnector::new(Arc::clone(&self.transport), candidates));
        self.state = SwitchState::Active { selection };
    }

    fn stop(&mut self) {
        if let Some(mut connector) = self.connector.take() {
            connector.close();
        }
    }
}
