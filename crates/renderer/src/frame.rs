//! Drawable description of one chart frame
//!
//! Pure function of the current metadata and accumulated points. Anything
//! that cannot be mapped safely falls back to [`ChartFrame::Placeholder`].

use crate::scales::{make_scales, ChartLayout, RenderTransform};
use crate::ticks::{format_mmss, format_value};
use pulse_shared::{Metadata, Sample, SeriesKind};
use std::fmt::Write;

pub const PLACEHOLDER_TEXT: &str = "Connecting…";

#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub position: f64,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPath {
    pub field: &'static str,
    /// SVG path data (`M x y L x y ...`)
    pub path: String,
    pub point_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartFrame {
    Placeholder(&'static str),
    Plot {
        title: &'static str,
        x_major: Vec<Tick>,
        x_minor: Vec<f64>,
        y_ticks: Vec<Tick>,
        series: Vec<SeriesPath>,
        marker: Option<(f64, f64)>,
    },
}

impl ChartFrame {
    /// `points` is iterated once per series, in order.
    pub fn build<'a, P>(
        metadata: Option<&Metadata>,
        points: P,
        kind: SeriesKind,
        layout: ChartLayout,
    ) -> Self
    where
        P: IntoIterator<Item = &'a Sample> + Copy,
    {
        let Some(metadata) = metadata else {
            return ChartFrame::Placeholder(PLACEHOLDER_TEXT);
        };

        let scales = match make_scales(metadata, layout) {
            Ok(scales) => scales,
            Err(e) => {
                log::debug!("Showing placeholder: {}", e);
                return ChartFrame::Placeholder(PLACEHOLDER_TEXT);
            }
        };

        let x_major = scales
            .x_major
            .iter()
            .map(|&t| Tick {
                position: scales.x_of(t),
                label: format_mmss(t - scales.start()),
            })
            .collect();
        let x_minor = scales.x_minor.iter().map(|&t| scales.x_of(t)).collect();
        let y_ticks = scales
            .y_ticks
            .iter()
            .map(|&v| Tick {
                position: scales.y_of(v),
                label: format_value(v),
            })
            .collect();

        let series = kind
            .fields()
            .iter()
            .map(|&field| series_path(&scales, points, field))
            .collect();

        let marker_field = kind.marker_field();
        let marker = points
            .into_iter()
            .last()
            .and_then(|p| p.get(marker_field).map(|v| (scales.x_of(p.elapsed), scales.y_of(v))));

        ChartFrame::Plot {
            title: kind.title(),
            x_major,
            x_minor,
            y_ticks,
            series,
            marker,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ChartFrame::Placeholder(_))
    }
}

/// Path through every sample carrying `field`; samples without it are skipped.
pub fn series_path<'a>(
    scales: &RenderTransform,
    points: impl IntoIterator<Item = &'a Sample>,
    field: &'static str,
) -> SeriesPath {
    let mut path = String::new();
    let mut point_count = 0;

    for point in points {
        let Some(value) = point.get(field) else {
            continue;
        };
        let command = if point_count == 0 { 'M' } else { 'L' };
        if point_count > 0 {
            path.push(' ');
        }
        let _ = write!(
            path,
            "{} {} {}",
            command,
            scales.x_of(point.elapsed),
            scales.y_of(value)
        );
        point_count += 1;
    }

    SeriesPath {
        field,
        path,
        point_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> Metadata {
        Metadata::new(0.0, 600.0, 0.0, 10.0)
    }

    #[test]
    fn test_missing_metadata_is_placeholder() {
        let frame = ChartFrame::build(None, &[] as &[Sample], SeriesKind::Scroller, ChartLayout::default());
        assert_eq!(frame, ChartFrame::Placeholder(PLACEHOLDER_TEXT));
    }

    #[test]
    fn test_degenerate_metadata_is_placeholder() {
        let meta = Metadata::new(100.0, 100.0, 0.0, 1.0);
        let points = vec![Sample::new(100.0).with("primary", 0.5)];
        let frame = ChartFrame::build(Some(&meta), &points, SeriesKind::Scroller, ChartLayout::default());
        assert!(frame.is_placeholder());
    }

    #[test]
    fn test_scroller_path_and_marker() {
        let points = vec![
            Sample::new(0.0).with("primary", 0.0),
            Sample::new(300.0).with("primary", 5.0),
        ];
        let frame = ChartFrame::build(Some(&meta()), &points, SeriesKind::Scroller, ChartLayout::default());

        match frame {
            ChartFrame::Plot {
                series,
                marker,
                x_major,
                y_ticks,
                ..
            } => {
                assert_eq!(series.len(), 1);
                assert_eq!(series[0].path, "M 40 260 L 400 150");
                assert_eq!(marker, Some((400.0, 150.0)));
                let labels: Vec<&str> = x_major.iter().map(|t| t.label.as_str()).collect();
                assert_eq!(labels, vec!["00:00", "05:00", "10:00"]);
                assert_eq!(y_ticks[0].label, "0.00");
                assert_eq!(y_ticks[4].position, 40.0);
            }
            other => panic!("expected plot, got {other:?}"),
        }
    }

    #[test]
    fn test_impact_skips_samples_without_field() {
        let points = vec![
            Sample::new(0.0).with("tpi", 1.0).with("ppi", 2.0),
            Sample::new(60.0).with("tpi", 1.5),
        ];
        let frame = ChartFrame::build(Some(&meta()), &points, SeriesKind::Impact, ChartLayout::default());

        let ChartFrame::Plot { series, .. } = frame else {
            panic!("expected plot");
        };
        assert_eq!(series[0].field, "tpi");
        assert_eq!(series[0].point_count, 2);
        assert_eq!(series[1].field, "ppi");
        assert_eq!(series[1].point_count, 1);
        assert!(!series[1].path.contains('L'));
    }
}
