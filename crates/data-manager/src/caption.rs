//! Caption feed: on-demand regenerated captions with a saved history

use crate::candidates::{EndpointSet, CAPTION_RESOURCE};
use crate::resolver::{EndpointResolver, Resolution};
use crate::transport::DocumentFetch;
use chrono::{DateTime, Utc};
use pulse_shared::Caption;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shown in place of a caption when no candidate answered
pub const CAPTION_ERROR: &str = "Error connecting";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCaption {
    #[serde(flatten)]
    pub caption: Caption,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptionStatus {
    /// Nothing requested yet
    None,
    Current(Caption),
    Error,
}

impl CaptionStatus {
    pub fn text(&self) -> &str {
        match self {
            CaptionStatus::None => "",
            CaptionStatus::Current(caption) => &caption.caption,
            CaptionStatus::Error => CAPTION_ERROR,
        }
    }

    pub fn probability(&self) -> Option<&str> {
        match self {
            CaptionStatus::Current(caption) => Some(&caption.prob),
            _ => None,
        }
    }
}

pub struct CaptionFeed {
    resolver: EndpointResolver,
    candidates: Vec<String>,
    current: CaptionStatus,
    history: Vec<SavedCaption>,
}

impl CaptionFeed {
    pub fn new(fetch: Arc<dyn DocumentFetch>, endpoints: &EndpointSet) -> Self {
        Self {
            resolver: EndpointResolver::new(fetch),
            candidates: endpoints.caption_candidates(),
            current: CaptionStatus::None,
            history: Vec::new(),
        }
    }

    /// Ask for a fresh caption. The history only grows on success.
    pub async fn regenerate(&mut self) -> &CaptionStatus {
        let resolution: Resolution<Caption> = self
            .resolver
            .resolve(&self.candidates, CAPTION_RESOURCE)
            .await;

        self.current = match resolution {
            Resolution::Resolved(resolved) => {
                log::info!("New caption ({})", resolved.value.prob);
                self.history.insert(
                    0,
                    SavedCaption {
                        caption: resolved.value.clone(),
                        saved_at: Utc::now(),
                    },
                );
                CaptionStatus::Current(resolved.value)
            }
            Resolution::NoService { failures } => {
                log::warn!("Caption unavailable after {} candidates", failures.len());
                CaptionStatus::Error
            }
        };
        &self.current
    }

    pub fn current(&self) -> &CaptionStatus {
        &self.current
    }

    /// Saved captions, newest first
    pub fn history(&self) -> &[SavedCaption] {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedFetch;

    fn endpoints() -> EndpointSet {
        EndpointSet {
            origin: None,
            api_prefix: "/api".to_string(),
            fallback_hosts: vec!["http://h1".to_string(), "http://h2".to_string()],
        }
    }

    #[tokio::test]
    async fn test_regenerate_prepends_history() {
        let fetch = Arc::new(
            ScriptedFetch::new().serve("http://h2/regenerate", r#"{"caption":"Big gain","prob":"0.91"}"#),
        );
        let mut feed = CaptionFeed::new(fetch.clone(), &endpoints());
        assert_eq!(feed.current(), &CaptionStatus::None);

        let status = feed.regenerate().await;
        assert_eq!(status.text(), "Big gain");
        assert_eq!(status.probability(), Some("0.91"));

        fetch.set_serve("http://h2/regenerate", r#"{"caption":"Short loss","prob":"0.40"}"#);
        feed.regenerate().await;

        let history: Vec<&str> = feed.history().iter().map(|s| s.caption.caption.as_str()).collect();
        assert_eq!(history, vec!["Short loss", "Big gain"]);
        assert_eq!(fetch.requested()[0], "http://h1/regenerate");
    }

    #[tokio::test]
    async fn test_failure_shows_error_and_keeps_history() {
        let fetch = Arc::new(
            ScriptedFetch::new().serve("http://h1/regenerate", r#"{"caption":"Kept","prob":"0.5"}"#),
        );
        let mut feed = CaptionFeed::new(fetch.clone(), &endpoints());
        feed.regenerate().await;

        fetch.set_fail("http://h1/regenerate", pulse_shared::PulseError::network("down"));
        let status = feed.regenerate().await;
        assert_eq!(status, &CaptionStatus::Error);
        assert_eq!(status.text(), CAPTION_ERROR);
        assert_eq!(status.probability(), None);
        assert_eq!(feed.history().len(), 1);
    }
}
