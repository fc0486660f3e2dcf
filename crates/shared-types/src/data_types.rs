//! Common data types used across the system

use crate::errors::{PulseError, PulseResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Chart boundaries and preset list served by the metadata resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub start: f64,
    pub end: f64,
    pub ymin: f64,
    pub ymax: f64,
    #[serde(default)]
    pub presets: Vec<String>,
    #[serde(default)]
    pub active: Option<usize>,
}

impl Metadata {
    pub fn new(start: f64, end: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            start,
            end,
            ymin,
            ymax,
            presets: Vec::new(),
            active: None,
        }
    }

    pub fn with_presets(mut self, presets: Vec<String>, active: Option<usize>) -> Self {
        self.presets = presets;
        self.active = active;
        self
    }

    /// Checks `start < end` and `ymin < ymax`.
    pub fn validate(&self) -> PulseResult<()> {
        let finite = [self.start, self.end, self.ymin, self.ymax]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(PulseError::DegenerateMetadata {
                message: "bounds must be finite".to_string(),
            });
        }
        if self.start >= self.end {
            return Err(PulseError::DegenerateMetadata {
                message: format!("time range [{}, {}] is empty", self.start, self.end),
            });
        }
        if self.ymin >= self.ymax {
            return Err(PulseError::DegenerateMetadata {
                message: format!("value range [{}, {}] is empty", self.ymin, self.ymax),
            });
        }
        Ok(())
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// The preset pointed at by `active`, else the first preset.
    pub fn initial_selection(&self) -> Option<&str> {
        self.active
            .and_then(|idx| self.presets.get(idx))
            .or_else(|| self.presets.first())
            .map(String::as_str)
    }

    pub fn has_preset(&self, name: &str) -> bool {
        self.presets.iter().any(|p| p == name)
    }
}

/// One incremental data point pushed over a stream channel.
///
/// `elapsed` is always present; every other numeric field of the payload is
/// kept by name. Non-numeric extras are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct Sample {
    pub elapsed: f64,
    #[serde(flatten)]
    pub fields: BTreeMap<String, f64>,
}

impl Sample {
    pub fn new(elapsed: f64) -> Self {
        Self {
            elapsed,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Looks up a field by name; `elapsed` resolves to the time offset.
    pub fn get(&self, name: &str) -> Option<f64> {
        if name == "elapsed" {
            return Some(self.elapsed);
        }
        self.fields.get(name).copied()
    }

    /// Parse a pushed event payload
    pub fn parse(payload: &str) -> PulseResult<Self> {
        let value: Value = serde_json::from_str(payload).map_err(|e| PulseError::MalformedSample {
            message: e.to_string(),
        })?;
        match value {
            Value::Object(map) => Sample::try_from(map),
            other => Err(PulseError::MalformedSample {
                message: format!("expected a JSON object, got {other}"),
            }),
        }
    }
}

impl TryFrom<Map<String, Value>> for Sample {
    type Error = PulseError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let elapsed = map
            .get("elapsed")
            .and_then(Value::as_f64)
            .ok_or_else(|| PulseError::MalformedSample {
                message: "missing numeric `elapsed`".to_string(),
            })?;

        let fields = map
            .iter()
            .filter(|(name, _)| name.as_str() != "elapsed")
            .filter_map(|(name, value)| value.as_f64().map(|v| (name.clone(), v)))
            .collect();

        Ok(Self { elapsed, fields })
    }
}

/// Which chart a view is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    /// Single `primary` series, switchable between presets
    Scroller,
    /// Team (`tpi`) and player (`ppi`) performance series
    Impact,
}

impl SeriesKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesKind::Scroller => "scroller",
            SeriesKind::Impact => "impact",
        }
    }

    pub fn metadata_resource(&self) -> &'static str {
        match self {
            SeriesKind::Scroller => "scroller.json",
            SeriesKind::Impact => "impact_chart.json",
        }
    }

    pub fn stream_path(&self) -> &'static str {
        match self {
            SeriesKind::Scroller => "scroller/stream",
            SeriesKind::Impact => "impact_chart/stream",
        }
    }

    pub fn default_interval_ms(&self) -> u64 {
        match self {
            SeriesKind::Scroller => 400,
            SeriesKind::Impact => 600,
        }
    }

    /// Sample fields drawn as lines, in drawing order
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            SeriesKind::Scroller => &["primary"],
            SeriesKind::Impact => &["tpi", "ppi"],
        }
    }

    /// Field followed by the last-point marker
    pub fn marker_field(&self) -> &'static str {
        self.fields()[0]
    }

    pub fn title(&self) -> &'static str {
        match self {
            SeriesKind::Scroller => "Marginal Analysis (TPI-PPI)",
            SeriesKind::Impact => "Player Impact",
        }
    }
}

impl std::str::FromStr for SeriesKind {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scroller" => Ok(SeriesKind::Scroller),
            "impact" => Ok(SeriesKind::Impact),
            other => Err(PulseError::invalid_config(
                "kind",
                format!("unknown series kind `{other}`"),
            )),
        }
    }
}

/// Stream connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Caption returned by the regenerate resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caption {
    pub caption: String,
    pub prob: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_ignores_unknown_fields() {
        let json = r#"{"elapsed":[1,2],"tpi":[0.1,0.2],"start":0,"end":600,"ymin":-1.5,"ymax":2.5}"#;
        let meta: Metadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.start, 0.0);
        assert_eq!(meta.ymax, 2.5);
        assert!(meta.presets.is_empty());
        assert_eq!(meta.active, None);
    }

    #[test]
    fn test_initial_selection() {
        let presets = vec!["Jalen Hurts".to_string(), "Smith".to_string()];
        let meta = Metadata::new(0.0, 1.0, 0.0, 1.0).with_presets(presets.clone(), Some(1));
        assert_eq!(meta.initial_selection(), Some("Smith"));

        let meta = Metadata::new(0.0, 1.0, 0.0, 1.0).with_presets(presets, Some(7));
        assert_eq!(meta.initial_selection(), Some("Jalen Hurts"));

        let meta = Metadata::new(0.0, 1.0, 0.0, 1.0);
        assert_eq!(meta.initial_selection(), None);
    }

    #[test]
    fn test_validate_rejects_degenerate_ranges() {
        assert!(Metadata::new(0.0, 600.0, 0.0, 10.0).validate().is_ok());
        assert!(Metadata::new(100.0, 100.0, 0.0, 1.0).validate().is_err());
        assert!(Metadata::new(0.0, 1.0, 3.0, 3.0).validate().is_err());
        assert!(Metadata::new(0.0, f64::NAN, 0.0, 1.0).validate().is_err());
    }

    #[test]
    fn test_sample_parse() {
        let sample = Sample::parse(r#"{"i":3,"elapsed":120.5,"tpi":0.4,"ppi":-0.2,"label":"x"}"#)
            .unwrap();
        assert_eq!(sample.elapsed, 120.5);
        assert_eq!(sample.get("tpi"), Some(0.4));
        assert_eq!(sample.get("i"), Some(3.0));
        assert_eq!(sample.get("label"), None);
        assert_eq!(sample.get("elapsed"), Some(120.5));
    }

    #[test]
    fn test_sample_parse_rejects_malformed() {
        assert!(Sample::parse("not json").is_err());
        assert!(Sample::parse("[1,2,3]").is_err());
        assert!(Sample::parse(r#"{"primary":5}"#).is_err());
        assert!(Sample::parse(r#"{"elapsed":"soon"}"#).is_err());
    }

    #[test]
    fn test_sample_serializes_flat() {
        let sample = Sample::new(1.0).with("primary", 5.0);
        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json, serde_json::json!({"elapsed": 1.0, "primary": 5.0}));
    }

    #[test]
    fn test_series_kind_parsing() {
        assert_eq!("Impact".parse::<SeriesKind>().unwrap(), SeriesKind::Impact);
        assert!("candles".parse::<SeriesKind>().is_err());
        assert_eq!(SeriesKind::Impact.marker_field(), "tpi");
    }
}
