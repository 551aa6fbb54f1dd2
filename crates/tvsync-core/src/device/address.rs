//! Device base-URL normalization and endpoint joining.

use url::Url;

use super::DeviceError;

/// Normalize an operator-supplied device address into a base URL ending in `/`.
///
/// - `10.0.0.5:8080` becomes `http://10.0.0.5:8080/`
/// - `//tv.local` becomes `http://tv.local/`
/// - `https://tv.local/api` becomes `https://tv.local/api/`
pub fn normalize_base_url(raw: &str) -> String {
    let raw = raw.trim();
    let mut out = if raw.starts_with("//") {
        format!("http:{raw}")
    } else if raw.contains("//") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };
    if !out.ends_with('/') {
        out.push('/');
    }
    out
}

/// Resolve `endpoint` (e.g. `info`, `upload/0_0`) against the device base address.
pub fn endpoint_url(base: &str, endpoint: &str) -> Result<String, DeviceError> {
    let normalized = normalize_base_url(base);
    let base = Url::parse(&normalized).map_err(|source| DeviceError::InvalidUrl {
        url: normalized.clone(),
        source,
    })?;
    let joined = base.join(endpoint).map_err(|source| DeviceError::InvalidUrl {
        url: format!("{normalized}{endpoint}"),
        source,
    })?;
    Ok(joined.into())
}
