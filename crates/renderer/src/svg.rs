//! Standalone SVG rendition of a [`ChartFrame`]

use crate::frame::ChartFrame;
use crate::scales::ChartLayout;
use std::fmt::Write;

const BACKGROUND: &str = "#111";
const GRID: &str = "#2a2a2a";
const MINOR_TICK: &str = "#444";
const LABEL: &str = "#ddd";
const SERIES_COLORS: [&str; 2] = ["#4fa3ff", "#ff6b6b"];
const SCROLLER_COLOR: &str = "#ffd86b";

pub fn render_document(frame: &ChartFrame, layout: &ChartLayout) -> String {
    let (w, h, pad) = (layout.width, layout.height, layout.padding);
    let mut out = String::new();

    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#
    );
    let _ = writeln!(out, r#"  <rect x="0" y="0" width="{w}" height="{h}" fill="{BACKGROUND}" />"#);

    match frame {
        ChartFrame::Placeholder(text) => {
            let _ = writeln!(
                out,
                r#"  <text x="{}" y="{}" text-anchor="middle" font-size="14" fill="{LABEL}">{}</text>"#,
                w / 2.0,
                h / 2.0,
                escape(text)
            );
        }
        ChartFrame::Plot {
            title,
            x_major,
            x_minor,
            y_ticks,
            series,
            marker,
        } => {
            let _ = writeln!(
                out,
                r##"  <text x="{}" y="20" text-anchor="middle" font-size="18" font-weight="700" fill="#fff">{}</text>"##,
                w / 2.0,
                escape(title)
            );

            for tick in y_ticks {
                let _ = writeln!(
                    out,
                    r#"  <line x1="{pad}" x2="{}" y1="{y}" y2="{y}" stroke="{GRID}" stroke-width="1" />"#,
                    w - pad,
                    y = tick.position
                );
                let _ = writeln!(
                    out,
                    r##"  <text x="8" y="{}" font-size="12" fill="#bbb">{}</text>"##,
                    tick.position + 4.0,
                    tick.label
                );
            }

            for x in x_minor {
                let _ = writeln!(
                    out,
                    r#"  <line x1="{x}" x2="{x}" y1="{}" y2="{}" stroke="{MINOR_TICK}" stroke-width="1" />"#,
                    h - pad + 4.0,
                    h - pad + 8.0
                );
            }

            for tick in x_major {
                let x = tick.position;
                let _ = writeln!(
                    out,
                    r#"  <line x1="{x}" x2="{x}" y1="{}" y2="{pad}" stroke="{GRID}" stroke-width="1" />"#,
                    h - pad
                );
                let _ = writeln!(
                    out,
                    r#"  <text x="{}" y="{}" font-size="12" fill="{LABEL}">{}</text>"#,
                    x - 18.0,
                    h - pad + 18.0,
                    tick.label
                );
            }

            let _ = writeln!(
                out,
                r#"  <text x="{}" y="{}" text-anchor="middle" font-size="13" fill="{LABEL}">Game Time (MM:SS elapsed)</text>"#,
                w / 2.0,
                h - 6.0
            );
            let _ = writeln!(
                out,
                r#"  <text transform="translate(12, {}) rotate(-90)" text-anchor="middle" font-size="13" fill="{LABEL}">Performance Index</text>"#,
                h / 2.0
            );

            let single = series.len() == 1;
            for (idx, s) in series.iter().enumerate() {
                if s.point_count == 0 {
                    continue;
                }
                let color = if single {
                    SCROLLER_COLOR
                } else {
                    SERIES_COLORS[idx % SERIES_COLORS.len()]
                };
                let dash = if idx > 0 { r#" stroke-dasharray="6 4""# } else { "" };
                let _ = writeln!(
                    out,
                    r#"  <path d="{}" stroke="{color}" stroke-width="2"{dash} fill="none" />"#,
                    s.path
                );
            }

            if let Some((cx, cy)) = marker {
                let _ = writeln!(out, r##"  <circle cx="{cx}" cy="{cy}" r="4" fill="#fff" />"##);
            }
        }
    }

    out.push_str("</svg>\n");
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
