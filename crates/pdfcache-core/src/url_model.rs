//! Source URL validation.
//!
//! Only absolute `http` and `https` URLs are accepted. Validation is pure: it
//! never touches the network or the filesystem.

use crate::error::FetchError;
use url::Url;

/// Schemes the fetcher will download from.
pub const ALLOWED_SCHEMES: [&str; 2] = ["http", "https"];

/// Parses `raw` and checks that its scheme is http or https.
///
/// The parser lowercases the scheme, so `HTTPS://...` is accepted. Relative
/// references fail to parse and are rejected as well.
pub fn validate_source_url(raw: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(raw).map_err(|e| FetchError::invalid_url(raw, e.to_string()))?;
    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        return Err(FetchError::invalid_url(
            raw,
            format!("unsupported URL scheme: {:?}", parsed.scheme()),
        ));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(FetchError::invalid_url(raw, "URL has no host"));
    }
    Ok(parsed)
}
