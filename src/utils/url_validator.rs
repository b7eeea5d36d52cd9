//! URL validation
//!
//! Blocks dangerous schemes and enforces the http/https allow-list
//! before a URL ever reaches the store.

use url::Url;

/// Longest URL accepted by the shorten endpoint.
pub const MAX_URL_LENGTH: usize = 2048;

const DANGEROUS_SCHEMES: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

#[derive(Debug)]
pub enum UrlValidationError {
    EmptyUrl,
    TooLong(usize),
    InvalidScheme(String),
    DangerousScheme(String),
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::TooLong(len) => write!(
                f,
                "URL is too long ({} characters, max {})",
                len, MAX_URL_LENGTH
            ),
            Self::InvalidScheme(scheme) => write!(
                f,
                "Invalid scheme: {}. Only http:// and https:// are allowed",
                scheme
            ),
            Self::DangerousScheme(scheme) => {
                write!(f, "Dangerous scheme blocked: {}", scheme)
            }
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

/// Checks that a URL is non-empty, within the length cap, uses http or
/// https, and parses as a valid URL.
pub fn validate_url(url: &str) -> Result<(), UrlValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    if url.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong(url.len()));
    }

    let url_lower = url.to_lowercase();

    for scheme in DANGEROUS_SCHEMES {
        if url_lower.starts_with(scheme) {
            return Err(UrlValidationError::DangerousScheme(scheme.to_string()));
        }
    }

    if !url_lower.starts_with("http://") && !url_lower.starts_with("https://") {
        let scheme = url_lower
            .split(':')
            .next()
            .map(|s| format!("{}:", s))
            .unwrap_or_default();
        return Err(UrlValidationError::InvalidScheme(scheme));
    }

    Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    Ok(())
}
