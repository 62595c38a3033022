//! Validation stage: scheme, host, and length checks on normalized
//! descriptors.
//!
//! Validation filters; it never fails the pipeline. Rejected descriptors
//! are logged and dropped.

use tracing::debug;
use url::Url;

use super::descriptor::MediaDescriptor;

/// Default ceiling for canonical URL length.
pub const DEFAULT_MAX_URL_LEN: usize = 2048;

/// Schemes rejected outright.
const BLOCKED_SCHEMES: [&str; 8] = [
    "javascript",
    "vbscript",
    "file",
    "ftp",
    "chrome-extension",
    "about",
    "mailto",
    "tel",
];

/// Tuning knobs for the extraction pipeline.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Maximum accepted canonical URL length.
    pub max_url_len: usize,
    /// Hosts whose media is dropped during validation (matched
    /// case-insensitively against the URL host).
    pub blocked_hosts: Vec<String>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_url_len: DEFAULT_MAX_URL_LEN,
            blocked_hosts: Vec::new(),
        }
    }
}

/// Stage 5: drops descriptors with unsupported protocols, disallowed hosts,
/// or excessively long URLs.
pub(crate) fn validate(
    descriptors: Vec<MediaDescriptor>,
    options: &ExtractOptions,
) -> Vec<MediaDescriptor> {
    descriptors
        .into_iter()
        .filter(|descriptor| {
            if descriptor.url.len() > options.max_url_len {
                debug!(url_len = descriptor.url.len(), "dropping over-long URL");
                return false;
            }
            if !is_allowed_scheme(&descriptor.url) {
                debug!(url = %descriptor.url, "dropping URL with disallowed scheme");
                return false;
            }
            if is_blocked_host(&descriptor.url, &options.blocked_hosts) {
                debug!(url = %descriptor.url, "dropping URL from blocked host");
                return false;
            }
            true
        })
        .collect()
}

/// Scheme allow/deny policy.
///
/// Allowed: `http`, `https`, `blob`, image `data:` URLs, protocol-relative
/// URLs, and scheme-less relative paths. Everything else is rejected.
fn is_allowed_scheme(url: &str) -> bool {
    let lower = url.trim().to_ascii_lowercase();

    // Relative and protocol-relative references are resolved by the caller.
    if lower.starts_with('/') || lower.starts_with("./") || lower.starts_with("../") {
        return true;
    }

    for scheme in BLOCKED_SCHEMES {
        if lower.starts_with(scheme) && lower[scheme.len()..].starts_with(':') {
            return false;
        }
    }

    if let Some(rest) = lower.strip_prefix("data:") {
        // Only image payloads are media; executable data: URLs are not.
        return rest.starts_with("image/");
    }

    if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("blob:") {
        return true;
    }

    // No scheme at all: a bare relative path.
    let has_scheme = lower
        .split_once(':')
        .is_some_and(|(scheme, _)| {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-'))
        });
    !has_scheme
}

fn is_blocked_host(url: &str, blocked: &[String]) -> bool {
    if blocked.is_empty() {
        return false;
    }
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| blocked.iter().any(|b| b.eq_ignore_ascii_case(&host)))
}
