//! CAPI Relay Binary
//!
//! ## Usage
//!
//! ```bash
//! # Start with defaults (port 3002)
//! FB_PIXEL_ID=111222333 FB_ACCESS_TOKEN=... FB_API_VERSION=v19.0 capi-relay
//!
//! # Restrict CORS and write rolling log files
//! ALLOWED_ORIGINS=https://shop.example,https://www.shop.example LOG_DIR=logs capi-relay
//!
//! # Send events to the Test Events console
//! FB_TEST_EVENT_CODE=TEST12345 capi-relay
//! ```

use capi_relay::config::{log_startup_summary, RelayArgs};
use capi_relay::{logging, RelayServer};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = RelayArgs::parse().into_config();

    let _guards = logging::init(config.log_dir.as_deref())?;

    tracing::info!("Starting CAPI Relay v{}", env!("CARGO_PKG_VERSION"));
    log_startup_summary(&config);

    let server = RelayServer::from_config(config)?;
    server.run().await?;

    Ok(())
}
