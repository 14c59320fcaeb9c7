//! Conversions API wire payload
//!
//! ```json
//! {
//!   "data": [{
//!     "event_name": "Lead",
//!     "event_time": 1700000000,
//!     "event_id": "abc123",
//!     "event_source_url": "https://x.test/",
//!     "action_source": "website",
//!     "user_data": { "em": "<sha256>", "client_ip_address": "203.0.113.7" },
//!     "custom_data": { "value": 10, "currency": "USD" }
//!   }],
//!   "test_event_code": "TEST123"
//! }
//! ```
//!
//! Absent values are skipped during serialization, never sent as `null`.
//! `em`, `ph`, `fn` and `ln` only ever hold digests from [`crate::hashing`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::event::{EnrichedUserData, ForwardEvent};
use crate::hashing::hash_pii;

/// `action_source` sent with every event
pub const ACTION_SOURCE_WEBSITE: &str = "website";

/// Top-level request body for `POST /{version}/{pixel_id}/events`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderPayload {
    pub data: Vec<ServerEvent>,

    /// Routes the event to the Test Events console
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_event_code: Option<String>,
}

/// One server event record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerEvent {
    pub event_name: String,
    pub event_time: i64,
    pub event_id: String,
    pub event_source_url: String,
    pub action_source: &'static str,
    pub user_data: ProviderUserData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<Map<String, Value>>,
}

/// Hashed identifiers plus pass-through browser and client fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProviderUserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub em: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<String>,
    #[serde(rename = "fn", skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ln: Option<String>,
}

impl ProviderUserData {
    /// Map enriched user data, hashing the PII fields
    pub fn from_enriched(user_data: &EnrichedUserData) -> Self {
        let user = &user_data.user;
        Self {
            client_ip_address: user_data.client_ip_address.clone(),
            client_user_agent: user_data.client_user_agent.clone(),
            fbp: non_empty(user.fbp.as_deref()),
            fbc: non_empty(user.fbc.as_deref()),
            em: hash_pii(user.email.as_deref()),
            ph: hash_pii(user.phone.as_deref()),
            first_name: hash_pii(user.first_name.as_deref()),
            ln: hash_pii(user.last_name.as_deref()),
        }
    }

    /// True when at least one hashed identifier or browser id is present
    ///
    /// Client ip and user agent alone give the provider very little to
    /// match on.
    pub fn has_identifiers(&self) -> bool {
        self.em.is_some()
            || self.ph.is_some()
            || self.first_name.is_some()
            || self.ln.is_some()
            || self.fbp.is_some()
            || self.fbc.is_some()
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Use the client-supplied event time, or `now` when absent
pub fn resolve_event_time(event_time: Option<i64>, now: i64) -> i64 {
    event_time.unwrap_or(now)
}

/// Current unix time in seconds
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl ProviderPayload {
    /// Build the single-event payload for a validated forward event
    pub fn for_event(
        event: &ForwardEvent,
        user_data: &EnrichedUserData,
        event_time: i64,
        test_event_code: Option<&str>,
    ) -> Self {
        let custom_data = if event.custom_data.is_empty() {
            None
        } else {
            Some(event.custom_data.clone())
        };

        Self {
            data: vec![ServerEvent {
                event_name: event.event_name.clone(),
                event_time,
                event_id: event.event_id.clone(),
                event_source_url: event.event_source_url.clone(),
                action_source: ACTION_SOURCE_WEBSITE,
                user_data: ProviderUserData::from_enriched(user_data),
                custom_data,
            }],
            test_event_code: test_event_code.map(str::to_string),
        }
    }

    /// The single event record
    pub fn event(&self) -> Option<&ServerEvent> {
        self.data.first()
    }
}
