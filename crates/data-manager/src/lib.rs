//! Data side of the pulse client
//! Resolves endpoints, keeps a stream connected through a cascade of
//! candidates and accumulates the samples it delivers.

pub mod accumulator;
pub mod candidates;
pub mod caption;
pub mod connector;
pub mod controller;
pub mod http_client;
pub mod resolver;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;
pub mod selection;
pub mod sse;
pub mod transport;

pub use accumulator::{PointAccumulator, Samples};
pub use candidates::{strip_resource, EndpointSet, StreamPlan, CAPTION_RESOURCE};
pub use caption::{CaptionFeed, CaptionStatus, SavedCaption, CAPTION_ERROR};
pub use connector::{CascadeOutcome, ConnectorEvent, ConnectorStats, StreamConnector};
pub use controller::{ViewCommand, ViewConfig, ViewController, ViewHandle, ViewSnapshot, ViewStatus};
pub use http_client::{HttpClient, HttpConfig, HttpEventChannel};
pub use resolver::{CandidateFailure, EndpointResolver, Resolution, Resolved};
pub use selection::{SelectionSwitch, SwitchState};
pub use transport::{ChannelEvent, DocumentFetch, EventChannel, FetchedDocument, StreamTransport};
