//! Endpoint resolution over an ordered candidate list
//!
//! Candidates are tried strictly in order and the first one that answers
//! with a parseable document wins. Failing candidates are skipped silently
//! (logged only); exhausting the list is an outcome, not an error.

use crate::candidates::strip_resource;
use crate::transport::DocumentFetch;
use pulse_shared::PulseError;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// A document served by one of the candidates
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<T> {
    pub value: T,
    /// Location later requests should be addressed to
    pub base: String,
    /// Index of the answering candidate
    pub candidate: usize,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFailure {
    pub url: String,
    pub error: PulseError,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Resolved(Resolved<T>),
    /// Every candidate failed
    NoService { failures: Vec<CandidateFailure> },
}

impl<T> Resolution<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    pub fn into_resolved(self) -> Option<Resolved<T>> {
        match self {
            Resolution::Resolved(resolved) => Some(resolved),
            Resolution::NoService { .. } => None,
        }
    }
}

#[derive(Clone)]
pub struct EndpointResolver {
    fetch: Arc<dyn DocumentFetch>,
}

impl EndpointResolver {
    pub fn new(fetch: Arc<dyn DocumentFetch>) -> Self {
        Self { fetch }
    }

    /// Try `candidates` in order and parse the first successful answer.
    ///
    /// `resource` is the path suffix stripped from the answering URL to
    /// produce [`Resolved::base`].
    pub async fn resolve<T: DeserializeOwned>(
        &self,
        candidates: &[String],
        resource: &str,
    ) -> Resolution<T> {
        let mut failures = Vec::new();

        for (idx, url) in candidates.iter().enumerate() {
            let outcome = match self.fetch.fetch(url).await {
                Ok(doc) => serde_json::from_slice::<T>(&doc.body)
                    .map(|value| (value, doc.url))
                    .map_err(PulseError::from),
                Err(e) => Err(e),
            };

            match outcome {
                Ok((value, served_from)) => {
                    let base = strip_resource(&served_from, resource);
                    log::info!("Resolved {} from {} (base {})", resource, served_from, base);
                    return Resolution::Resolved(Resolved {
                        value,
                        base,
                        candidate: idx,
                        url: url.clone(),
                    });
                }
                Err(error) => {
                    if error.is_transient() {
                        log::debug!("Candidate {} unreachable: {}", url, error);
                    } else {
                        log::warn!("Candidate {} rejected: {}", url, error);
                    }
                    failures.push(CandidateFailure {
                        url: url.clone(),
                        error,
                    });
                }
            }
        }

        log::warn!(
            "No service reachable for {} ({} candidates tried)",
            resource,
            failures.len()
        );
        Resolution::NoService { failures }
    }
}
