//! # CAPI Core - Conversions API event mapping
//!
//! The pure part of the relay: no I/O, no HTTP, no runtime.
//!
//! - **Event model**: the client-posted [`InboundEvent`], validated into a
//!   [`TrackEvent`], enriched into a [`ForwardEvent`]
//! - **Hashing**: lowercase, trim, SHA-256 hex for every PII field
//! - **Payload**: the provider's [`ProviderPayload`] wire shape
//! - **Errors**: [`RelayError`] for callers, [`ForwardError`] for the outbound leg
//!
//! ## Example
//!
//! ```rust
//! use capi_core::{ClientContext, InboundEvent, ProviderPayload};
//! use serde_json::json;
//!
//! let inbound: InboundEvent = serde_json::from_value(json!({
//!     "eventName": "Lead",
//!     "eventId": "abc123",
//!     "eventSourceUrl": "https://x.test/",
//!     "userData": { "email": "A@B.com" }
//! })).unwrap();
//!
//! let event = inbound
//!     .validate()
//!     .unwrap()
//!     .enrich(ClientContext::resolve(Some("203.0.113.7"), None, Some("Mozilla/5.0")));
//!
//! let user_data = event.validate().unwrap();
//! let payload = ProviderPayload::for_event(&event, user_data, 1_700_000_000, None);
//! let json = serde_json::to_value(&payload).unwrap();
//!
//! assert_eq!(
//!     json["data"][0]["user_data"]["em"],
//!     capi_core::hashing::sha256_hex("a@b.com")
//! );
//! ```

pub mod error;
pub mod event;
pub mod hashing;
pub mod outcome;
pub mod payload;

// Re-export main types
pub use error::{
    ErrorCategory, ErrorResponse, ForwardError, ForwardFailure, RelayError,
    MISSING_FIELDS_MESSAGE,
};
pub use event::{ClientContext, EnrichedUserData, ForwardEvent, InboundEvent, TrackEvent, UserData};
pub use hashing::hash_pii;
pub use outcome::ForwardResult;
pub use payload::{ProviderPayload, ProviderUserData, ServerEvent, ACTION_SOURCE_WEBSITE};
