//! Inbound event model
//!
//! An [`InboundEvent`] is whatever the browser posted. [`InboundEvent::validate`]
//! turns it into a [`TrackEvent`] with the three required fields present, and
//! [`TrackEvent::enrich`] attaches the request-derived client fields to produce
//! the [`ForwardEvent`] handed to the forwarder.

use std::net::IpAddr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::{ForwardError, RelayError};

/// Event body as posted by the client
///
/// Every field is optional at this stage; presence is checked by
/// [`InboundEvent::validate`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEvent {
    #[serde(default, deserialize_with = "truthy_scalar")]
    pub event_name: Option<String>,

    /// De-duplication key shared with the browser pixel
    #[serde(default, deserialize_with = "truthy_scalar")]
    pub event_id: Option<String>,

    #[serde(default, deserialize_with = "truthy_scalar")]
    pub event_source_url: Option<String>,

    /// Unix seconds
    #[serde(default, deserialize_with = "unix_seconds")]
    pub event_time: Option<i64>,

    #[serde(default)]
    pub user_data: Option<UserData>,

    #[serde(default)]
    pub custom_data: Option<Map<String, Value>>,
}

/// Raw, un-hashed user identifiers
///
/// Strings, numbers and booleans are accepted for every field. An array or
/// object leaves that one field absent and is recorded in
/// [`UserData::discarded`]; it never fails the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawUserData")]
pub struct UserData {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Browser id cookie (`_fbp`)
    pub fbp: Option<String>,
    /// Click id cookie (`_fbc`)
    pub fbc: Option<String>,
    /// Fields dropped because they held an array or object
    #[serde(skip_serializing)]
    pub discarded: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUserData {
    #[serde(default)]
    email: Option<Value>,
    #[serde(default)]
    phone: Option<Value>,
    #[serde(default)]
    first_name: Option<Value>,
    #[serde(default)]
    last_name: Option<Value>,
    #[serde(default)]
    fbp: Option<Value>,
    #[serde(default)]
    fbc: Option<Value>,
}

impl From<RawUserData> for UserData {
    fn from(raw: RawUserData) -> Self {
        let mut discarded = Vec::new();
        let mut field = |value: Option<Value>, name: &str| match value {
            Some(Value::Array(_)) | Some(Value::Object(_)) => {
                discarded.push(name.to_string());
                None
            }
            other => other.and_then(scalar_to_string),
        };

        let email = field(raw.email, "email");
        let phone = field(raw.phone, "phone");
        let first_name = field(raw.first_name, "firstName");
        let last_name = field(raw.last_name, "lastName");
        let fbp = field(raw.fbp, "fbp");
        let fbc = field(raw.fbc, "fbc");

        UserData {
            email,
            phone,
            first_name,
            last_name,
            fbp,
            fbc,
            discarded,
        }
    }
}

/// An inbound event that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEvent {
    pub event_name: String,
    pub event_id: String,
    pub event_source_url: String,
    pub event_time: Option<i64>,
    pub user_data: UserData,
    pub custom_data: Map<String, Value>,
}

/// Client fields taken from the HTTP request rather than the body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// User data plus the request-derived client fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichedUserData {
    pub user: UserData,
    pub client_ip_address: Option<String>,
    pub client_user_agent: Option<String>,
}

/// Everything the forwarder needs to build one provider event
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardEvent {
    pub event_name: String,
    pub event_id: String,
    pub event_source_url: String,
    pub event_time: Option<i64>,
    pub user_data: Option<EnrichedUserData>,
    pub custom_data: Map<String, Value>,
}

impl InboundEvent {
    /// Check the required fields and produce a [`TrackEvent`]
    ///
    /// Empty strings count as missing. `userData` and `customData` default
    /// to empty mappings.
    pub fn validate(self) -> Result<TrackEvent, RelayError> {
        let mut missing = Vec::new();
        let event_name = required(self.event_name, "eventName", &mut missing);
        let event_id = required(self.event_id, "eventId", &mut missing);
        let event_source_url = required(self.event_source_url, "eventSourceUrl", &mut missing);

        match (event_name, event_id, event_source_url) {
            (Some(event_name), Some(event_id), Some(event_source_url)) => Ok(TrackEvent {
                event_name,
                event_id,
                event_source_url,
                event_time: self.event_time,
                user_data: self.user_data.unwrap_or_default(),
                custom_data: self.custom_data.unwrap_or_default(),
            }),
            _ => Err(RelayError::MissingRequiredFields { missing }),
        }
    }
}

fn required(value: Option<String>, name: &str, missing: &mut Vec<String>) -> Option<String> {
    match value {
        Some(v) if !v.is_empty() => Some(v),
        _ => {
            missing.push(name.to_string());
            None
        }
    }
}

impl TrackEvent {
    /// Attach client ip and user agent to the user data
    pub fn enrich(self, client: ClientContext) -> ForwardEvent {
        ForwardEvent {
            event_name: self.event_name,
            event_id: self.event_id,
            event_source_url: self.event_source_url,
            event_time: self.event_time,
            user_data: Some(EnrichedUserData {
                user: self.user_data,
                client_ip_address: client.ip_address,
                client_user_agent: client.user_agent,
            }),
            custom_data: self.custom_data,
        }
    }
}

impl ForwardEvent {
    /// Check the fields the provider requires before any outbound call
    pub fn validate(&self) -> Result<&EnrichedUserData, ForwardError> {
        let mut missing = Vec::new();
        if self.event_name.is_empty() {
            missing.push("eventName".to_string());
        }
        if self.event_id.is_empty() {
            missing.push("eventId".to_string());
        }
        if self.event_source_url.is_empty() {
            missing.push("eventSourceUrl".to_string());
        }
        if self.user_data.is_none() {
            missing.push("userData".to_string());
        }

        match &self.user_data {
            Some(user_data) if missing.is_empty() => Ok(user_data),
            _ => Err(ForwardError::Validation { missing }),
        }
    }
}

impl ClientContext {
    /// Derive the client fields from request metadata
    ///
    /// The first `X-Forwarded-For` entry wins; the socket peer address is
    /// used when the header is absent or its first entry is blank.
    pub fn resolve(
        forwarded_for: Option<&str>,
        remote_addr: Option<IpAddr>,
        user_agent: Option<&str>,
    ) -> Self {
        let forwarded = forwarded_for
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);

        Self {
            ip_address: forwarded.or_else(|| remote_addr.map(|ip| ip.to_canonical().to_string())),
            user_agent: user_agent.map(str::to_string),
        }
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Accept strings, numbers and booleans for a required field
///
/// Falsy values (`null`, `""`, `false`, `0`) are absent so they fail
/// validation. Arrays and objects are rejected.
fn truthy_scalar<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(None),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Ok(None),
        Some(other @ (Value::Array(_) | Value::Object(_))) => Err(serde::de::Error::custom(
            format!("expected a string, found {}", kind_of(&other)),
        )),
        Some(value) => Ok(scalar_to_string(value).filter(|s| !s.is_empty())),
    }
}

/// Accept integer or fractional unix seconds; `0` is treated as absent
fn unix_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let seconds = match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => Some(i),
            None => n.as_f64().map(|f| f.trunc() as i64),
        },
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "eventTime must be unix seconds, found {}",
                kind_of(&other)
            )))
        }
    };
    Ok(seconds.filter(|s| *s != 0))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
