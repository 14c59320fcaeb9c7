//! Relay configuration
//!
//! Configuration is read once at startup (see [`RelayArgs`]) and passed by
//! value into the server and the forwarder. Nothing reads the environment
//! after that, so tests build their own [`RelayConfig`] directly.

use std::path::PathBuf;

use capi_core::ForwardError;
use clap::Parser;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3002;

/// Default Graph API host
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Port to listen on
    pub port: u16,
    /// Origins allowed by CORS; empty means any origin
    pub allowed_origins: Vec<String>,
    /// Directory for rolling log files; stdout only when unset
    pub log_dir: Option<PathBuf>,
    /// Conversions API settings
    pub capi: CapiConfig,
}

impl RelayConfig {
    /// Create a new configuration builder
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
            log_dir: None,
            capi: CapiConfig::default(),
        }
    }
}

/// Builder for RelayConfig
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
    log_dir: Option<PathBuf>,
    capi: Option<CapiConfig>,
}

impl RelayConfigBuilder {
    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Restrict CORS to these origins
    pub fn allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = Some(origins);
        self
    }

    /// Write rolling log files into this directory
    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Set the Conversions API configuration
    pub fn capi(mut self, capi: CapiConfig) -> Self {
        self.capi = Some(capi);
        self
    }

    /// Build the configuration
    pub fn build(self) -> RelayConfig {
        RelayConfig {
            port: self.port.unwrap_or(DEFAULT_PORT),
            allowed_origins: self.allowed_origins.unwrap_or_default(),
            log_dir: self.log_dir,
            capi: self.capi.unwrap_or_default(),
        }
    }
}

/// Conversions API credentials and endpoint
#[derive(Clone)]
pub struct CapiConfig {
    /// Pixel (dataset) id, part of the endpoint path
    pub pixel_id: Option<String>,
    /// Access token, sent as the `access_token` query parameter
    pub access_token: Option<String>,
    /// Graph API version, e.g. `v19.0`
    pub api_version: Option<String>,
    /// Routes events to the Test Events console when set
    pub test_event_code: Option<String>,
    /// Graph API base URL
    pub graph_url: String,
    /// Outbound request timeout; none when unset
    pub timeout_ms: Option<u64>,
}

impl Default for CapiConfig {
    fn default() -> Self {
        Self {
            pixel_id: None,
            access_token: None,
            api_version: None,
            test_event_code: None,
            graph_url: DEFAULT_GRAPH_URL.to_string(),
            timeout_ms: None,
        }
    }
}

impl std::fmt::Debug for CapiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapiConfig")
            .field("pixel_id", &self.pixel_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("api_version", &self.api_version)
            .field("test_event_code", &self.test_event_code)
            .field("graph_url", &self.graph_url)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// Resolved outbound endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsEndpoint {
    /// `{graph_url}/{api_version}/{pixel_id}/events`, without credentials
    pub url: String,
    pub access_token: String,
}

impl CapiConfig {
    /// Create a new configuration builder
    pub fn builder() -> CapiConfigBuilder {
        CapiConfigBuilder::default()
    }

    /// Names of the required settings that are absent or empty
    pub fn missing_settings(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if is_blank(&self.pixel_id) {
            missing.push("FB_PIXEL_ID".to_string());
        }
        if is_blank(&self.access_token) {
            missing.push("FB_ACCESS_TOKEN".to_string());
        }
        if is_blank(&self.api_version) {
            missing.push("FB_API_VERSION".to_string());
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_settings().is_empty()
    }

    /// Resolve the events endpoint, failing when credentials are missing
    pub fn events_endpoint(&self) -> Result<EventsEndpoint, ForwardError> {
        match (&self.pixel_id, &self.access_token, &self.api_version) {
            (Some(pixel_id), Some(access_token), Some(api_version)) if self.is_complete() => {
                Ok(EventsEndpoint {
                    url: format!(
                        "{}/{}/{}/events",
                        self.graph_url.trim_end_matches('/'),
                        api_version,
                        pixel_id
                    ),
                    access_token: access_token.clone(),
                })
            }
            _ => Err(ForwardError::NotConfigured {
                missing: self.missing_settings(),
            }),
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

/// Builder for CapiConfig
#[derive(Debug, Default)]
pub struct CapiConfigBuilder {
    config: CapiConfig,
}

impl CapiConfigBuilder {
    pub fn pixel_id(mut self, pixel_id: impl Into<String>) -> Self {
        self.config.pixel_id = Some(pixel_id.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = Some(version.into());
        self
    }

    pub fn test_event_code(mut self, code: impl Into<String>) -> Self {
        self.config.test_event_code = Some(code.into());
        self
    }

    /// Override the Graph API base URL
    pub fn graph_url(mut self, url: impl Into<String>) -> Self {
        self.config.graph_url = url.into();
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.config.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn build(self) -> CapiConfig {
        self.config
    }
}

/// Command line and environment settings for the relay binary
#[derive(Debug, Parser)]
#[command(name = "capi-relay", version, about = "Conversions API relay")]
pub struct RelayArgs {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Comma-separated list of allowed CORS origins
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Pixel (dataset) id
    #[arg(long, env = "FB_PIXEL_ID")]
    pub pixel_id: Option<String>,

    /// Conversions API access token
    #[arg(long, env = "FB_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Graph API version, e.g. v19.0
    #[arg(long, env = "FB_API_VERSION")]
    pub api_version: Option<String>,

    /// Test event code for the Test Events console
    #[arg(long, env = "FB_TEST_EVENT_CODE")]
    pub test_event_code: Option<String>,

    /// Graph API base URL
    #[arg(long, env = "FB_GRAPH_URL", default_value = DEFAULT_GRAPH_URL)]
    pub graph_url: String,

    /// Outbound request timeout in milliseconds
    #[arg(long, env = "CAPI_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Directory for rolling log files
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

impl RelayArgs {
    /// Convert parsed arguments into the relay configuration
    pub fn into_config(self) -> RelayConfig {
        let allowed_origins = self
            .allowed_origins
            .into_iter()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        RelayConfig {
            port: self.port,
            allowed_origins,
            log_dir: self.log_dir,
            capi: CapiConfig {
                pixel_id: self.pixel_id,
                access_token: self.access_token,
                api_version: self.api_version,
                test_event_code: self.test_event_code.filter(|c| !c.trim().is_empty()),
                graph_url: self.graph_url,
                timeout_ms: self.timeout_ms,
            },
        }
    }
}

/// Log what the relay is about to run with
///
/// Incomplete Conversions API settings only warn; the server still starts
/// and every forward fails with `NOT_CONFIGURED`.
pub fn log_startup_summary(config: &RelayConfig) {
    let capi = &config.capi;
    if capi.is_complete() {
        tracing::info!(
            pixel_id = capi.pixel_id.as_deref().unwrap_or_default(),
            api_version = capi.api_version.as_deref().unwrap_or_default(),
            "Conversions API configured"
        );
    } else {
        tracing::warn!(
            missing = %capi.missing_settings().join(", "),
            "Conversions API is not fully configured. Check FB_PIXEL_ID, FB_ACCESS_TOKEN, and FB_API_VERSION"
        );
    }

    match &capi.test_event_code {
        Some(code) => tracing::info!(test_event_code = %code, "Test event code is set"),
        None => tracing::info!("Test event code is not set"),
    }

    if config.allowed_origins.is_empty() {
        tracing::warn!("ALLOWED_ORIGINS not set, CORS allows any origin");
    } else {
        tracing::info!(origins = %config.allowed_origins.join(","), "CORS enabled for specific origins");
    }
}
