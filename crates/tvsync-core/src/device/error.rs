use thiserror::Error;

/// Failure talking to a device. Every variant counts as a connection failure.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Curl reported an error (timeout, refused connection, reset, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),

    /// Response status outside 200..300.
    #[error("HTTP {0}")]
    Http(u32),

    #[error("invalid device url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("response body is not UTF-8")]
    Body(#[source] std::str::Utf8Error),

    /// The blocking transfer thread panicked or was cancelled.
    #[error("transfer task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl DeviceError {
    /// True for failures that say the device was not reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            DeviceError::Curl(e) => {
                e.is_couldnt_connect()
                    || e.is_couldnt_resolve_host()
                    || e.is_operation_timedout()
                    || e.is_got_nothing()
            }
            _ => false,
        }
    }
}
