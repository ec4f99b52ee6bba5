//! Locator validation for retrieval URLs and magnet links.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

/// A magnet link must start with an xt urn carrying a 1-40 character
/// alphanumeric hash; trackers and display-name parameters may follow.
static MAGNET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^magnet:\?xt=urn:[a-z0-9]+:[a-zA-Z0-9]{1,40}")
        .expect("magnet pattern is valid")
});

/// Locator validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocatorError {
    #[error("locator is empty")]
    Empty,

    #[error("invalid magnet link or URL format: {0}")]
    Invalid(String),
}

/// Validate a retrieval locator: either a well-formed HTTP(S) URL or a
/// magnet link.
pub fn validate_locator(locator: &str) -> Result<(), LocatorError> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
        return Err(LocatorError::Empty);
    }

    if MAGNET_RE.is_match(trimmed) {
        return Ok(());
    }

    match Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(LocatorError::Invalid(trimmed.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("https://data.chhs.ca.gov/dataset/5a281abf/download/file.csv")]
    #[case("http://example.org/")]
    #[case("magnet:?xt=urn:btih:dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c")]
    // Trailing tracker parameters are allowed after the hash.
    #[case("magnet:?xt=urn:btih:dd8255ecdc7ca55fb0bbf81323d87062db1f6d1c&dn=Big+Buck+Bunny")]
    #[case("magnet:?xt=urn:sha1:a")]
    fn accepts_valid_locators(#[case] locator: &str) {
        assert_eq!(validate_locator(locator), Ok(()));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("ftp://example.org/file.csv")]
    #[case("not a url")]
    #[case("magnet:?xt=urn:btih:")]
    #[case("magnet:?dn=missing-xt")]
    #[case("https://")]
    fn rejects_invalid_locators(#[case] locator: &str) {
        assert!(validate_locator(locator).is_err());
    }
}
