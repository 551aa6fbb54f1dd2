//! HTTP access to playback devices.
//!
//! The worker talks to devices through [`DeviceTransport`] so tests can script device
//! behavior; [`CurlTransport`] is the libcurl implementation used in production.

mod address;
mod curl_transport;
mod error;

use async_trait::async_trait;

pub use address::{endpoint_url, normalize_base_url};
pub use curl_transport::CurlTransport;
pub use error::DeviceError;

/// Device endpoints, relative to the device base URL.
pub const INFO_ENDPOINT: &str = "info";
pub const CONFIG_ENDPOINT: &str = "config";

/// Upload endpoint for one chunk: `upload/{file_index}_{offset}`.
pub fn upload_endpoint(file_index: usize, offset: u64) -> String {
    format!("upload/{file_index}_{offset}")
}

/// Minimal HTTP surface needed by the worker. Responses are the body text of a
/// 2xx answer; anything else is a [`DeviceError`].
#[async_trait]
pub trait DeviceTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, DeviceError>;

    async fn post(&self, url: &str, content_type: &str, body: Vec<u8>)
        -> Result<String, DeviceError>;
}
