//! Data-space to drawing-space mapping
//!
//! A [`RenderTransform`] is computed once per metadata change and reused for
//! every sample, so drawing never recomputes the bounds per point.

use crate::ticks::{
    time_tick_count, time_ticks, value_ticks, MAJOR_TICK_SECS, MAX_TIME_TICKS, MINOR_TICK_SECS,
    VALUE_TICK_COUNT,
};
use pulse_shared::Metadata;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("Refusing to render degenerate bounds: {0}")]
    Degenerate(String),

    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
}

/// Fixed drawing surface, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for ChartLayout {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 300.0,
            padding: 40.0,
        }
    }
}

impl ChartLayout {
    pub fn validate(&self) -> Result<(), RenderError> {
        if !(self.width > 2.0 * self.padding && self.height > 2.0 * self.padding) {
            return Err(RenderError::InvalidLayout(format!(
                "{}x{} leaves no room inside padding {}",
                self.width, self.height, self.padding
            )));
        }
        if self.padding < 0.0 {
            return Err(RenderError::InvalidLayout("negative padding".to_string()));
        }
        Ok(())
    }

    pub fn left(&self) -> f64 {
        self.padding
    }

    pub fn right(&self) -> f64 {
        self.width - self.padding
    }

    pub fn top(&self) -> f64 {
        self.padding
    }

    pub fn bottom(&self) -> f64 {
        self.height - self.padding
    }

    fn plot_width(&self) -> f64 {
        self.width - 2.0 * self.padding
    }

    fn plot_height(&self) -> f64 {
        self.height - 2.0 * self.padding
    }
}

/// Linear maps for both axes plus the tick positions across the bounds
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTransform {
    layout: ChartLayout,
    start: f64,
    end: f64,
    ymin: f64,
    ymax: f64,
    pub x_major: Vec<f64>,
    pub x_minor: Vec<f64>,
    pub y_ticks: Vec<f64>,
}

impl RenderTransform {
    /// Horizontal pixel position of an elapsed-seconds value
    pub fn x_of(&self, elapsed: f64) -> f64 {
        self.layout.left()
            + (elapsed - self.start) / (self.end - self.start) * self.layout.plot_width()
    }

    /// Vertical pixel position of a value; larger values sit higher up.
    pub fn y_of(&self, value: f64) -> f64 {
        self.layout.bottom()
            - (value - self.ymin) / (self.ymax - self.ymin) * self.layout.plot_height()
    }

    pub fn layout(&self) -> &ChartLayout {
        &self.layout
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }
}

/// Build the transform for `metadata`, refusing bounds that would divide by
/// zero or need more than [`MAX_TIME_TICKS`] minor ticks.
pub fn make_scales(metadata: &Metadata, layout: ChartLayout) -> Result<RenderTransform, RenderError> {
    metadata
        .validate()
        .map_err(|e| RenderError::Degenerate(e.to_string()))?;
    layout.validate()?;

    let minor = time_tick_count(metadata.start, metadata.end, MINOR_TICK_SECS);
    if !(minor <= MAX_TIME_TICKS as f64) {
        return Err(RenderError::Degenerate(format!(
            "time range [{}, {}] needs {} ticks, more than {}",
            metadata.start, metadata.end, minor, MAX_TIME_TICKS
        )));
    }

    Ok(RenderTransform {
        layout,
        start: metadata.start,
        end: metadata.end,
        ymin: metadata.ymin,
        ymax: metadata.ymax,
        x_major: time_ticks(metadata.start, metadata.end, MAJOR_TICK_SECS),
        x_minor: time_ticks(metadata.start, metadata.end, MINOR_TICK_SECS),
        y_ticks: value_ticks(metadata.ymin, metadata.ymax, VALUE_TICK_COUNT),
    })
}
