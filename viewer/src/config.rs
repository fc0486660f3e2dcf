use pulse_data::{EndpointSet, HttpConfig, ViewConfig};
use pulse_renderer::ChartLayout;
use pulse_shared::{PulseError, PulseResult, SeriesKind};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_PATH: &str = "pulse.yaml";
pub const ENV_PREFIX: &str = "PULSE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub endpoints: EndpointsConfig,
    pub stream: StreamConfig,
    pub chart: ChartConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointsConfig {
    /// Origin for the same-origin `/api` candidates; those are skipped when unset
    pub origin: Option<String>,
    pub api_prefix: String,
    pub fallback_hosts: Vec<String>,
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Overrides the per-chart sampling interval
    pub interval_ms: Option<u64>,
    pub command_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Default for Config {
    fn default() -> Self {
        let endpoints = EndpointSet::default();
        let layout = ChartLayout::default();
        Self {
            endpoints: EndpointsConfig {
                origin: endpoints.origin,
                api_prefix: endpoints.api_prefix,
                fallback_hosts: endpoints.fallback_hosts,
                request_timeout_ms: 5_000,
                connect_timeout_ms: 3_000,
            },
            stream: StreamConfig {
                interval_ms: None,
                command_buffer: 16,
            },
            chart: ChartConfig {
                width: layout.width,
                height: layout.height,
                padding: layout.padding,
            },
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        Self::load(Some(path), Self::environment())
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            Self::load(Some(default_path), Self::environment())
        } else {
            Self::load(None, Self::environment())
        }
    }

    /// `PULSE__ENDPOINTS__ORIGIN=...`, `PULSE__ENDPOINTS__FALLBACK_HOSTS=a,b`
    pub fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("endpoints.fallback_hosts")
    }

    /// Built-in defaults, overlaid by the optional file, overlaid by `environment`
    pub fn load(path: Option<&Path>, environment: config::Environment) -> anyhow::Result<Self> {
        let mut builder =
            config::Config::builder().add_source(config::Config::try_from(&Config::default())?);
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder.add_source(environment).build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PulseResult<()> {
        let endpoints = &self.endpoints;
        if endpoints.origin.is_none() && endpoints.fallback_hosts.is_empty() {
            return Err(PulseError::invalid_config(
                "endpoints.fallback_hosts",
                "no fallback hosts and no origin leaves nothing to connect to",
            ));
        }
        if endpoints.request_timeout_ms == 0 {
            return Err(PulseError::invalid_config(
                "endpoints.request_timeout_ms",
                "must be positive",
            ));
        }
        if endpoints.connect_timeout_ms == 0 {
            return Err(PulseError::invalid_config(
                "endpoints.connect_timeout_ms",
                "must be positive",
            ));
        }
        if self.stream.interval_ms == Some(0) {
            return Err(PulseError::invalid_config("stream.interval_ms", "must be positive"));
        }
        self.layout()
            .validate()
            .map_err(|e| PulseError::invalid_config("chart", e.to_string()))
    }

    pub fn endpoint_set(&self) -> EndpointSet {
        EndpointSet {
            origin: self.endpoints.origin.clone(),
            api_prefix: self.endpoints.api_prefix.clone(),
            fallback_hosts: self.endpoints.fallback_hosts.clone(),
        }
    }

    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            request_timeout: Duration::from_millis(self.endpoints.request_timeout_ms),
            connect_timeout: Duration::from_millis(self.endpoints.connect_timeout_ms),
        }
    }

    pub fn layout(&self) -> ChartLayout {
        ChartLayout {
            width: self.chart.width,
            height: self.chart.height,
            padding: self.chart.padding,
        }
    }

    pub fn view_config(&self, kind: SeriesKind, preset: Option<String>) -> ViewConfig {
        let mut view = ViewConfig::new(kind, self.endpoint_set());
        view.interval_ms = self.stream.interval_ms;
        view.preferred_preset = preset;
        view.command_buffer = self.stream.command_buffer;
        view
    }
}
