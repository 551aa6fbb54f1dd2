//! libcurl-backed device transport.
//!
//! Each request builds a fresh `Easy` handle on a blocking thread; bodies are small
//! (config JSON, one chunk at most) so they are buffered in memory both ways.

use async_trait::async_trait;
use curl::easy::{Easy, List};
use std::time::Duration;

use super::{DeviceError, DeviceTransport};
use crate::config::HttpConfig;

#[derive(Debug, Clone, Copy)]
pub struct CurlTransport {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl CurlTransport {
    pub fn new(http: HttpConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(http.connect_timeout_secs),
            request_timeout: Duration::from_secs(http.request_timeout_secs),
        }
    }

    async fn run(&self, request: Request) -> Result<String, DeviceError> {
        let this = *self;
        tokio::task::spawn_blocking(move || this.perform(request)).await?
    }

    fn perform(&self, request: Request) -> Result<String, DeviceError> {
        let mut easy = Easy::new();
        easy.url(&request.url)?;
        easy.follow_location(true)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.request_timeout)?;

        if let Some((content_type, body)) = &request.post {
            easy.post(true)?;
            easy.post_fields_copy(body)?;
            let mut headers = List::new();
            headers.append(&format!("Content-Type: {content_type}"))?;
            // Devices answer immediately; skip the 100-continue round-trip on large chunks.
            headers.append("Expect:")?;
            easy.http_headers(headers)?;
        } else {
            easy.get(true)?;
        }

        let mut response = Vec::new();
        {
            let mut transfer = easy.transfer();
            transfer.write_function(|data| {
                response.extend_from_slice(data);
                Ok(data.len())
            })?;
            transfer.perform()?;
        }

        let code = easy.response_code()?;
        if !(200..300).contains(&code) {
            return Err(DeviceError::Http(code));
        }
        let text = std::str::from_utf8(&response).map_err(DeviceError::Body)?;
        Ok(text.to_string())
    }
}

struct Request {
    url: String,
    post: Option<(String, Vec<u8>)>,
}

#[async_trait]
impl DeviceTransport for CurlTransport {
    async fn get(&self, url: &str) -> Result<String, DeviceError> {
        tracing::trace!(url, "GET");
        self.run(Request {
            url: url.to_string(),
            post: None,
        })
        .await
    }

    async fn post(
        &self,
        url: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, DeviceError> {
        tracing::trace!(url, bytes = body.len(), "POST");
        self.run(Request {
            url: url.to_string(),
            post: Some((content_type.to_string(), body)),
        })
        .await
    }
}
