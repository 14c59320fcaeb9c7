//! Conversions API forwarder
//!
//! Builds the provider payload for one event and performs a single POST.
//! There is no retry: a failed attempt is logged and the event is dropped.

use std::time::Duration;

use async_trait::async_trait;
use capi_core::payload::{resolve_event_time, unix_now};
use capi_core::{ForwardError, ForwardEvent, ForwardResult, ProviderPayload};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use crate::config::CapiConfig;

/// Forwarder interface
#[async_trait]
pub trait EventForwarder: Send + Sync {
    /// Forward one event. Never fails past this boundary; every failure is
    /// reported through [`ForwardResult::Failed`].
    async fn forward(&self, event: ForwardEvent) -> ForwardResult;
}

/// Forwards events to the Graph API `/events` edge
pub struct CapiForwarder {
    http_client: reqwest::Client,
    config: CapiConfig,
}

impl CapiForwarder {
    /// Create a forwarder with its own HTTP client
    pub fn new(config: CapiConfig) -> Result<Self, reqwest::Error> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }

        Ok(Self::with_client(builder.build()?, config))
    }

    /// Create a forwarder around an existing client
    pub fn with_client(http_client: reqwest::Client, config: CapiConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn config(&self) -> &CapiConfig {
        &self.config
    }

    /// Build the payload for an event without sending it
    pub fn build_payload(&self, event: &ForwardEvent) -> Result<ProviderPayload, ForwardError> {
        let user_data = event.validate()?;
        let event_time = resolve_event_time(event.event_time, unix_now());

        Ok(ProviderPayload::for_event(
            event,
            user_data,
            event_time,
            self.config.test_event_code.as_deref(),
        ))
    }

    async fn send(&self, event: &ForwardEvent) -> Result<Value, ForwardError> {
        let payload = match self.build_payload(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    code = e.code(),
                    missing = ?e.missing(),
                    error = %e,
                    "Event rejected before sending"
                );
                return Err(e);
            }
        };
        let endpoint = self.config.events_endpoint()?;

        if !payload.event().is_some_and(|e| e.user_data.has_identifiers()) {
            warn!("No PII or browser id (fbp/fbc) provided for Conversions API event");
        }
        if let Some(code) = &payload.test_event_code {
            info!(test_event_code = %code, "Using test event code");
        }

        info!(url = %endpoint.url, "Sending event to Conversions API");
        debug!(payload = %serde_json::to_string(&payload)?, "Conversions API payload");

        let response = self
            .http_client
            .post(&endpoint.url)
            .query(&[("access_token", endpoint.access_token.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(transport_error)?;
        let data = parse_body(&body);

        if status.is_success() {
            Ok(data)
        } else {
            Err(ForwardError::Provider {
                status: status.as_u16(),
                response_data: Some(data).filter(|d| !d.is_null()),
            })
        }
    }
}

#[async_trait]
impl EventForwarder for CapiForwarder {
    #[instrument(
        name = "capi.forward",
        skip_all,
        fields(event_id = %event.event_id, event_name = %event.event_name)
    )]
    async fn forward(&self, event: ForwardEvent) -> ForwardResult {
        let result = ForwardResult::from(self.send(&event).await);

        match &result {
            ForwardResult::Delivered { data } => {
                info!(response = %data, "Event sent to Conversions API");
            }
            ForwardResult::Failed { error } => {
                error!(
                    code = error.code(),
                    category = ?error.category(),
                    status = ?error.status(),
                    response_data = ?error.response_data(),
                    error = %error,
                    "Error sending event to Conversions API"
                );
            }
        }

        result
    }
}

/// JSON when the body parses, the raw text otherwise, `null` when empty
fn parse_body(body: &[u8]) -> Value {
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn transport_error(err: reqwest::Error) -> ForwardError {
    let code = if err.is_timeout() {
        "ETIMEDOUT"
    } else if err.is_connect() {
        "ECONNREFUSED"
    } else if err.is_body() || err.is_decode() {
        "ERR_BAD_RESPONSE_BODY"
    } else if err.is_builder() {
        "ERR_INVALID_URL"
    } else {
        "ERR_NETWORK"
    };

    ForwardError::Transport {
        message: err.without_url().to_string(),
        code,
    }
}
