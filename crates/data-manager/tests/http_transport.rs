//! HTTP resolver and event-stream tests against local mock servers

use mockito::Matcher;
use pulse_data::{
    CascadeOutcome, EndpointResolver, EndpointSet, HttpClient, HttpConfig, PointAccumulator,
    Resolution, StreamConnector, StreamPlan, StreamTransport,
};
use pulse_shared::{ConnectionState, Metadata, SeriesKind};
use std::sync::Arc;

const META: &str = r#"{"start":0,"end":600,"ymin":0,"ymax":10,"presets":["A","B"]}"#;
const UNREACHABLE: &str = "http://127.0.0.1:1";

fn client() -> Arc<HttpClient> {
    Arc::new(HttpClient::new(HttpConfig::default()).unwrap())
}

fn sse(events: &[&str]) -> String {
    let mut body = String::new();
    for data in events {
        body.push_str(&format!("data: {}\n\n", data));
    }
    body
}

#[tokio::test]
async fn test_resolver_skips_failing_candidates() {
    let mut broken = mockito::Server::new_async().await;
    let mut healthy = mockito::Server::new_async().await;
    let mut spare = mockito::Server::new_async().await;

    let broken_mock = broken
        .mock("GET", "/scroller.json")
        .with_status(502)
        .create_async()
        .await;
    let healthy_mock = healthy
        .mock("GET", "/scroller.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(META)
        .create_async()
        .await;
    let spare_mock = spare
        .mock("GET", "/scroller.json")
        .expect(0)
        .create_async()
        .await;

    let endpoints = EndpointSet {
        origin: None,
        api_prefix: "/api".to_string(),
        fallback_hosts: vec![
            UNREACHABLE.to_string(),
            broken.url(),
            healthy.url(),
            spare.url(),
        ],
    };
    let resolver = EndpointResolver::new(client());
    let resolution: Resolution<Metadata> = resolver
        .resolve(
            &endpoints.metadata_candidates(SeriesKind::Scroller),
            SeriesKind::Scroller.metadata_resource(),
        )
        .await;

    let resolved = resolution.into_resolved().unwrap();
    assert_eq!(resolved.candidate, 2);
    assert_eq!(resolved.base, healthy.url());
    assert_eq!(resolved.value.presets, vec!["A", "B"]);

    broken_mock.assert_async().await;
    healthy_mock.assert_async().await;
    spare_mock.assert_async().await;
}

#[tokio::test]
async fn test_resolver_reports_no_service() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/impact_chart.json")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let endpoints = EndpointSet {
        origin: None,
        api_prefix: "/api".to_string(),
        fallback_hosts: vec![UNREACHABLE.to_string(), server.url()],
    };
    let resolution: Resolution<Metadata> = EndpointResolver::new(client())
        .resolve(&endpoints.metadata_candidates(SeriesKind::Impact), "impact_chart.json")
        .await;

    match resolution {
        Resolution::NoService { failures } => assert_eq!(failures.len(), 2),
        other => panic!("expected NoService, got {other:?}"),
    }
}

#[tokio::test]
async fn test_stream_cascade_over_http() {
    let mut refusing = mockito::Server::new_async().await;
    let mut streaming = mockito::Server::new_async().await;
    let mut spare = mockito::Server::new_async().await;

    let query = Matcher::AllOf(vec![
        Matcher::UrlEncoded("interval_ms".into(), "400".into()),
        Matcher::UrlEncoded("preset".into(), "Jalen Hurts".into()),
    ]);
    let _refused = refusing
        .mock("GET", "/scroller/stream")
        .match_query(query.clone())
        .with_status(503)
        .create_async()
        .await;
    let body = format!(
        "{}: keep-alive\n\n{}event: done\ndata: {{}}\n\n",
        sse(&[r#"{"elapsed":1,"primary":5}"#]),
        sse(&[r#"{"elapsed":2,"primary":7}"#])
    );
    let stream_mock = streaming
        .mock("GET", "/scroller/stream")
        .match_query(query.clone())
        .match_header("accept", "text/event-stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;
    let spare_mock = spare
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let endpoints = EndpointSet {
        origin: None,
        api_prefix: "/api".to_string(),
        fallback_hosts: vec![refusing.url(), streaming.url(), spare.url()],
    };
    let plan = StreamPlan::new(endpoints, SeriesKind::Scroller, 400);
    let transport: Arc<dyn StreamTransport> = client();
    let mut connector = StreamConnector::new(transport, plan.candidates(Some("Jalen Hurts")));
    let mut points = PointAccumulator::new();

    let outcome = connector.run_to_end(&mut points).await;

    assert_eq!(outcome, CascadeOutcome::Completed { candidate: 1 });
    assert_eq!(connector.state(), ConnectionState::Disconnected);
    let values: Vec<(f64, Option<f64>)> = points
        .samples()
        .iter()
        .map(|s| (s.elapsed, s.get("primary")))
        .collect();
    assert_eq!(values, vec![(1.0, Some(5.0)), (2.0, Some(7.0))]);

    stream_mock.assert_async().await;
    spare_mock.assert_async().await;
}

#[tokio::test]
async fn test_stream_without_done_cascades() {
    let mut truncated = mockito::Server::new_async().await;
    let mut complete = mockito::Server::new_async().await;

    let _first = truncated
        .mock("GET", "/impact_chart/stream")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse(&[r#"{"i":0,"elapsed":0,"tpi":1.5,"ppi":0.5}"#]))
        .create_async()
        .await;
    let _second = complete
        .mock("GET", "/impact_chart/stream")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream; charset=utf-8")
        .with_body(format!(
            "{}event: done\ndata: {{}}\n\n",
            sse(&[r#"{"i":0,"elapsed":0,"tpi":2.5,"ppi":1.0}"#])
        ))
        .create_async()
        .await;

    let endpoints = EndpointSet {
        origin: None,
        api_prefix: "/api".to_string(),
        fallback_hosts: vec![truncated.url(), complete.url()],
    };
    let plan = StreamPlan::new(endpoints, SeriesKind::Impact, 600);
    let mut connector = StreamConnector::new(client(), plan.candidates(None));
    let mut points = PointAccumulator::new();

    let outcome = connector.run_to_end(&mut points).await;
    assert_eq!(outcome, CascadeOutcome::Completed { candidate: 1 });
    assert_eq!(points.len(), 1);
    assert_eq!(points.latest().and_then(|s| s.get("tpi")), Some(2.5));
    assert_eq!(connector.stats().opened, 2);
}

#[tokio::test]
async fn test_non_event_stream_response_is_an_open_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/scroller/stream")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html></html>")
        .create_async()
        .await;

    let endpoints = EndpointSet {
        origin: None,
        api_prefix: "/api".to_string(),
        fallback_hosts: vec![server.url()],
    };
    let plan = StreamPlan::new(endpoints, SeriesKind::Scroller, 400);
    let mut connector = StreamConnector::new(client(), plan.candidates(None));
    let mut points = PointAccumulator::new();

    assert_eq!(connector.run_to_end(&mut points).await, CascadeOutcome::Unreachable);
    assert!(points.is_empty());
}

#[tokio::test]
async fn test_runaway_line_drops_the_channel() {
    let mut runaway = mockito::Server::new_async().await;
    let mut healthy = mockito::Server::new_async().await;

    let _first = runaway
        .mock("GET", "/scroller/stream")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(format!("data: {}", "9".repeat(pulse_data::sse::MAX_LINE_BYTES + 16)))
        .create_async()
        .await;
    let _second = healthy
        .mock("GET", "/scroller/stream")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(format!(
            "{}event: done\ndata: {{}}\n\n",
            sse(&[r#"{"elapsed":1,"primary":4}"#])
        ))
        .create_async()
        .await;

    let endpoints = EndpointSet {
        origin: None,
        api_prefix: "/api".to_string(),
        fallback_hosts: vec![runaway.url(), healthy.url()],
    };
    let plan = StreamPlan::new(endpoints, SeriesKind::Scroller, 400);
    let mut connector = StreamConnector::new(client(), plan.candidates(None));
    let mut points = PointAccumulator::new();

    assert_eq!(
        connector.run_to_end(&mut points).await,
        CascadeOutcome::Completed { candidate: 1 }
    );
    assert_eq!(points.len(), 1);
    assert_eq!(connector.stats().opened, 2);
}
