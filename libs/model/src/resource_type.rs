//! Resource classification from locator URL shape.
//!
//! The classification is the sole signal distinguishing directly rescuable
//! files from web pages and directory listings, and it feeds a dataset's
//! access counts. It must stay deterministic: the same URL always yields the
//! same type.

use std::sync::LazyLock;

use regex::Regex;

/// Final path extension: at least one character before the dot, then a
/// letter (or `7`, for 7z archives) followed by alphanumerics to the end.
static FILE_EXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r".+\.([a-zA-Z7][a-zA-Z0-9]+)$").expect("extension pattern is valid")
});

const AUTHORIZED_EXTENSIONS: &[&str] = &["geojson"];
const REJECTED_EXTENSIONS: &[&str] = &["aspx", "htm", "html", "htmlx", "shtml"];
const MAX_EXTENSION_LEN: usize = 5;

/// Derived type of a catalog resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceType {
    /// Blank or missing locator.
    Empty,
    /// Locator path ends in a slash; a directory listing to crawl, not a file.
    Directory,
    /// Locator points at a rendered page rather than a downloadable object.
    WebPage,
    /// Directly downloadable file with the given extension.
    File(String),
}

impl ResourceType {
    /// Classify a resource locator.
    pub fn from_url(url: Option<&str>) -> Self {
        let Some(raw) = url else {
            return Self::Empty;
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Empty;
        }

        let path = url_path(raw);
        if !path.is_empty() {
            if path.ends_with('/') || path.ends_with("%2F") {
                return Self::Directory;
            }
            if let Some(caps) = FILE_EXT_RE.captures(path) {
                let ext = &caps[1];
                if (ext.len() <= MAX_EXTENSION_LEN && !REJECTED_EXTENSIONS.contains(&ext))
                    || AUTHORIZED_EXTENSIONS.contains(&ext)
                {
                    return Self::File(ext.to_string());
                }
            }
        }

        Self::WebPage
    }

    /// The value stored in the catalog's `resource_type` column.
    pub fn to_db_value(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Directory => Some("dir".to_string()),
            Self::WebPage => Some("web".to_string()),
            Self::File(ext) => Some(ext.clone()),
        }
    }

    /// Whether the resource can be fetched directly, without crawling or
    /// scraping. Feeds `access_direct_dl_count`.
    pub fn is_direct_download(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

/// Extract the path component of a URL without normalization.
///
/// `url::Url::parse` cannot be used here: it rewrites `https://host` to
/// `https://host/`, erasing the distinction between a bare host (web page)
/// and a trailing-slash directory, and it would decode the `%2F` endings the
/// classifier relies on.
fn url_path(raw: &str) -> &str {
    let rest = match raw.find("://") {
        Some(idx) => &raw[idx + 3..],
        None => raw,
    };
    let rest = rest.split('#').next().unwrap_or(rest);
    let rest = rest.split('?').next().unwrap_or(rest);
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "",
    }
}
