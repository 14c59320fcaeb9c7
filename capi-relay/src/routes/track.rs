//! Event intake route

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, ConnectInfo, OriginalUri, State},
    http::{header, HeaderMap, StatusCode},
    response::Json,
};
use capi_core::{ClientContext, ForwardResult, InboundEvent, RelayError};
use serde::Serialize;
use tracing::{debug, info, instrument, warn, Instrument};

use crate::error::ApiError;
use crate::logging::JOURNAL_TARGET;
use crate::AppState;

/// Acknowledgement of receipt, not of delivery
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAccepted {
    pub success: bool,
    pub message: String,
    pub event_id: String,
}

/// `POST /api/v1/analytics/track`
///
/// Validates the body, hands the enriched event to the dispatcher and
/// answers `202` without waiting for the Conversions API.
#[instrument(
    name = "analytics.track",
    skip_all,
    fields(
        request_id = %uuid::Uuid::new_v4(),
        event_id = tracing::field::Empty,
        event_name = tracing::field::Empty,
    )
)]
pub async fn track_event(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<TrackAccepted>), ApiError> {
    let body = body.map_err(|rejection| {
        warn!(status = %rejection.status(), error = %rejection.body_text(), "Request body rejected");
        RelayError::UnreadableBody {
            status: rejection.status().as_u16(),
            reason: rejection.body_text(),
        }
    })?;

    let client = ClientContext::resolve(
        header_str(&headers, "x-forwarded-for"),
        connect_info.map(|ConnectInfo(addr)| addr.ip()),
        header_str(&headers, header::USER_AGENT.as_str()),
    );

    tracing::info!(
        target: JOURNAL_TARGET,
        method = "POST",
        url = %uri,
        ip = client.ip_address.as_deref().unwrap_or("unknown"),
        user_agent = client.user_agent.as_deref().unwrap_or("unknown"),
        body = %String::from_utf8_lossy(&body),
        "incoming request"
    );

    let inbound = parse_body(&body)?;
    let event = match inbound.validate() {
        Ok(event) => event,
        Err(err) => {
            if let RelayError::MissingRequiredFields { missing } = &err {
                warn!(missing = %missing.join(", "), "Validation error: missing required fields");
            }
            return Err(err.into());
        }
    };

    for field in &event.user_data.discarded {
        warn!(field = %field, "Ignoring userData field that is not a string or number");
    }

    let span = tracing::Span::current();
    span.record("event_id", event.event_id.as_str());
    span.record("event_name", event.event_name.as_str());

    info!(event_source_url = %event.event_source_url, "Processing event");
    debug!(user_data = ?event.user_data, custom_data = ?event.custom_data, "Received event data");
    info!(
        client_ip_address = client.ip_address.as_deref().unwrap_or("N/A"),
        client_user_agent = client.user_agent.as_deref().map(truncate_agent).unwrap_or("N/A"),
        "Client info captured"
    );

    let event_id = event.event_id.clone();
    let event_name = event.event_name.clone();
    let forward_event = event.enrich(client);

    let forwarder = Arc::clone(&state.forwarder);
    let task = async move {
        match forwarder.forward(forward_event).await {
            ForwardResult::Delivered { .. } => {
                info!("Conversions API processing completed");
            }
            ForwardResult::Failed { error } => {
                warn!(error_details = %serde_json::json!(error.to_failure()), "Conversions API processing issue");
            }
        }
    }
    .instrument(span);

    state.dispatcher.dispatch_detached(Box::pin(task)).await;

    info!("Responding to client");
    Ok((
        StatusCode::ACCEPTED,
        Json(TrackAccepted {
            success: true,
            message: format!(
                "Event '{}' (ID: {}) received and queued for processing.",
                event_name, event_id
            ),
            event_id,
        }),
    ))
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// An empty body is an empty event, which then fails validation
fn parse_body(body: &[u8]) -> Result<InboundEvent, RelayError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(InboundEvent::default());
    }

    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Malformed request body");
        RelayError::MalformedBody {
            reason: format!("Invalid JSON body: {}", e),
        }
    })
}

fn truncate_agent(agent: &str) -> &str {
    match agent.char_indices().nth(100) {
        Some((idx, _)) => &agent[..idx],
        None => agent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_body() {
        let event = parse_body(b"  \n").unwrap();
        assert!(event.event_id.is_none());
    }

    #[test]
    fn test_parse_malformed_body() {
        let err = parse_body(b"{not json").unwrap_err();
        assert!(matches!(err, RelayError::MalformedBody { .. }));
        assert!(err.to_string().starts_with("Invalid JSON body"));
    }

    #[test]
    fn test_truncate_agent() {
        let long = "a".repeat(250);
        assert_eq!(truncate_agent(&long).len(), 100);
        assert_eq!(truncate_agent("curl/8.0"), "curl/8.0");
    }
}
