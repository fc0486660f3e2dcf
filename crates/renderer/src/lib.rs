//! Pulse renderer
//!
//! Maps telemetry bounds into drawing space: linear scales for both axes,
//! time and value ticks, labels, and a drawable frame that the console front
//! end can export as SVG.

pub mod frame;
pub mod scales;
pub mod svg;
pub mod ticks;

pub use frame::{ChartFrame, SeriesPath, Tick, PLACEHOLDER_TEXT};
pub use scales::{make_scales, ChartLayout, RenderError, RenderTransform};
pub use ticks::{format_mmss, format_value};
