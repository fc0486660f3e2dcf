//! Shared types for the Pulse telemetry client
//!
//! This crate contains the types that are shared between the data-manager,
//! renderer and viewer crates: the metadata and sample wire shapes, the
//! connection state signal and the common error type.

pub mod data_types;
pub mod errors;

pub use data_types::{Caption, ConnectionState, Metadata, Sample, SeriesKind};
pub use errors::{PulseError, PulseResult};
