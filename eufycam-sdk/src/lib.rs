//! Eufy Security cloud camera SDK
//!
//! 1. Log in (with out-of-band verification codes when the vendor asks)
//! 2. Find devices, start streams, read event history
//! 3. Turn a live stream into a timelapse with ffmpeg

pub mod capture;
pub mod client;
pub mod config;
pub mod devices;
pub mod error;
pub mod session;
pub mod types;

pub use capture::{FfmpegCapture, FrameCapture, TimelapseOptions, TimelapseSummary};
pub use client::EufyClient;
pub use config::ClientConfig;
pub use error::{EufyError, Result};
pub use session::{AuthState, Session};
pub use types::{Device, HistoryQuery, HistoryRecord, StreamHandle};
pub use tokio_util::sync::CancellationToken;

/// Quick start: a client for the production API
pub fn create_client(email: &str, password: &str) -> Result<EufyClient> {
    EufyClient::new(ClientConfig::new(email, password))
}
