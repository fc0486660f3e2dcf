//! Ordered candidate URL lists
//!
//! Every resource is tried at a same-origin path behind the API prefix first,
//! then at each absolute fallback host in order.

use pulse_shared::SeriesKind;
use serde::{Deserialize, Serialize};
use url::Url;

pub const CAPTION_RESOURCE: &str = "regenerate";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointSet {
    /// Origin that relative candidates are joined to; relative candidates
    /// are skipped when unset.
    #[serde(default)]
    pub origin: Option<String>,
    pub api_prefix: String,
    pub fallback_hosts: Vec<String>,
}

impl Default for EndpointSet {
    fn default() -> Self {
        Self {
            origin: None,
            api_prefix: "/api".to_string(),
            fallback_hosts: vec![
                "http://127.0.0.1:8001".to_string(),
                "http://127.0.0.1:8002".to_string(),
            ],
        }
    }
}

impl EndpointSet {
    /// `{api_prefix}/{path}` joined to the origin
    fn same_origin(&self, path: &str) -> Option<String> {
        let origin = self.origin.as_deref()?;
        let relative = format!("{}/{}", self.api_prefix.trim_end_matches('/'), path);
        match Url::parse(origin).and_then(|o| o.join(&relative)) {
            Ok(url) => Some(url.to_string()),
            Err(e) => {
                log::warn!("Skipping relative candidate {}: bad origin {}: {}", relative, origin, e);
                None
            }
        }
    }

    fn on_hosts<'a>(&'a self, path: &'a str) -> impl Iterator<Item = String> + 'a {
        self.fallback_hosts
            .iter()
            .map(move |host| join(host, path))
    }

    pub fn metadata_candidates(&self, kind: SeriesKind) -> Vec<String> {
        let resource = kind.metadata_resource();
        dedupe(self.same_origin(resource).into_iter().chain(self.on_hosts(resource)))
    }

    pub fn caption_candidates(&self) -> Vec<String> {
        dedupe(
            self.same_origin(CAPTION_RESOURCE)
                .into_iter()
                .chain(self.on_hosts(CAPTION_RESOURCE)),
        )
    }

    /// Stream URLs: the resolved base first, then the usual same-origin and
    /// fallback order, each carrying the sampling interval and selection.
    pub fn stream_candidates(
        &self,
        base: Option<&str>,
        kind: SeriesKind,
        interval_ms: u64,
        selection: Option<&str>,
    ) -> Vec<String> {
        let path = kind.stream_path();
        let raw = base
            .map(|b| join(b, path))
            .into_iter()
            .chain(self.same_origin(path))
            .chain(self.on_hosts(path));

        dedupe(raw.filter_map(|url| with_query(&url, interval_ms, selection)))
    }
}

/// Everything needed to rebuild stream candidates for a new selection
#[derive(Debug, Clone, PartialEq)]
pub struct StreamPlan {
    pub endpoints: EndpointSet,
    pub kind: SeriesKind,
    pub interval_ms: u64,
    pub base: Option<String>,
}

impl StreamPlan {
    pub fn new(endpoints: EndpointSet, kind: SeriesKind, interval_ms: u64) -> Self {
        Self {
            endpoints,
            kind,
            interval_ms,
            base: None,
        }
    }

    pub fn candidates(&self, selection: Option<&str>) -> Vec<String> {
        self.endpoints
            .stream_candidates(self.base.as_deref(), self.kind, self.interval_ms, selection)
    }
}

/// Base location a resource was served from: the responding URL with the
/// last `/{resource}` and everything after it removed.
pub fn strip_resource(url: &str, resource: &str) -> String {
    let needle = format!("/{resource}");
    match url.rfind(&needle) {
        Some(idx) => url[..idx].to_string(),
        None => url.trim_end_matches('/').to_string(),
    }
}

fn join(host: &str, path: &str) -> String {
    format!("{}/{}", host.trim_end_matches('/'), path.trim_start_matches('/'))
}

fn with_query(url: &str, interval_ms: u64, selection: Option<&str>) -> Option<String> {
    let mut parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Skipping stream candidate {}: {}", url, e);
            return None;
        }
    };
    {
        let mut query = parsed.query_pairs_mut();
        query.append_pair("interval_ms", &interval_ms.to_string());
        if let Some(selection) = selection {
            query.append_pair("preset", selection);
        }
    }
    Some(parsed.to_string())
}

fn dedupe(urls: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for url in urls {
        if !out.contains(&url) {
            out.push(url);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_origin() -> EndpointSet {
        EndpointSet {
            origin: Some("http://localhost:3001".to_string()),
            ..EndpointSet::default()
        }
    }

    #[test]
    fn test_metadata_candidates_order() {
        assert_eq!(
            with_origin().metadata_candidates(SeriesKind::Scroller),
            vec![
                "http://localhost:3001/api/scroller.json",
                "http://127.0.0.1:8001/scroller.json",
                "http://127.0.0.1:8002/scroller.json",
            ]
        );
    }

    #[test]
    fn test_relative_candidates_need_origin() {
        let candidates = EndpointSet::default().metadata_candidates(SeriesKind::Impact);
        assert_eq!(
            candidates,
            vec![
                "http://127.0.0.1:8001/impact_chart.json",
                "http://127.0.0.1:8002/impact_chart.json",
            ]
        );
    }

    #[test]
    fn test_stream_candidates_carry_query() {
        let candidates = with_origin().stream_candidates(
            Some("http://127.0.0.1:8002"),
            SeriesKind::Scroller,
            400,
            Some("Jalen Hurts"),
        );
        assert_eq!(
            candidates,
            vec![
                "http://127.0.0.1:8002/scroller/stream?interval_ms=400&preset=Jalen+Hurts",
                "http://localhost:3001/api/scroller/stream?interval_ms=400&preset=Jalen+Hurts",
                "http://127.0.0.1:8001/scroller/stream?interval_ms=400&preset=Jalen+Hurts",
            ]
        );
    }

    #[test]
    fn test_stream_candidates_without_selection() {
        let plan = StreamPlan::new(EndpointSet::default(), SeriesKind::Impact, 600);
        assert_eq!(
            plan.candidates(None),
            vec![
                "http://127.0.0.1:8001/impact_chart/stream?interval_ms=600",
                "http://127.0.0.1:8002/impact_chart/stream?interval_ms=600",
            ]
        );
    }

    #[test]
    fn test_strip_resource() {
        assert_eq!(
            strip_resource("http://127.0.0.1:8001/scroller.json", "scroller.json"),
            "http://127.0.0.1:8001"
        );
        assert_eq!(
            strip_resource("http://localhost:3001/api/scroller.json?x=1", "scroller.json"),
            "http://localhost:3001/api"
        );
        assert_eq!(strip_resource("http://host/", "scroller.json"), "http://host");
    }

    #[test]
    fn test_caption_candidates() {
        assert_eq!(
            with_origin().caption_candidates(),
            vec![
                "http://localhost:3001/api/regenerate",
                "http://127.0.0.1:8001/regenerate",
                "http://127.0.0.1:8002/regenerate",
            ]
        );
    }
}
