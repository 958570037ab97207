use log::debug;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

use crate::client::LiveApi;

static CANONICAL_LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<link rel="canonical" href="https://www\.youtube\.com/watch\?v=(.{11})">"#)
        .unwrap()
});
static API_KEY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""innertubeApiKey":"([^"]+)""#).unwrap());

/// The identifier and API key scraped from a stream page.
///
/// Both fields are non-empty; there is no way to build a half-resolved value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    content_id: String,
    access_key: String,
}

impl Credentials {
    pub fn new(content_id: impl Into<String>, access_key: impl Into<String>) -> Option<Self> {
        let content_id = content_id.into();
        let access_key = access_key.into();
        if content_id.is_empty() || access_key.is_empty() {
            return None;
        }
        Some(Self {
            content_id,
            access_key,
        })
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }
}

/// Pulls the credentials out of raw page HTML. The first match of each pattern wins.
pub fn extract_credentials(page: &str) -> Option<Credentials> {
    let content_id = CANONICAL_LINK_REGEX.captures(page)?.get(1)?.as_str();
    let access_key = API_KEY_REGEX.captures(page)?.get(1)?.as_str();
    Credentials::new(content_id, access_key)
}

/// Fetches the target page and extracts its credentials.
///
/// A failed fetch is indistinguishable from a page without credentials.
pub async fn resolve<A: LiveApi + ?Sized>(api: &A, target: &Url) -> Option<Credentials> {
    match api.fetch_page(target).await {
        Ok(page) => {
            let credentials = extract_credentials(&page);
            if credentials.is_none() {
                debug!("No stream identity found in {} bytes of page content", page.len());
            }
            credentials
        }
        Err(e) => {
            debug!("Failed to fetch {target}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head>
<link rel="canonical" href="https://www.youtube.com/watch?v=dQw4w9WgXcQ">
<script>var ytcfg = {"INNERTUBE_API_VERSION":"v1","innertubeApiKey":"AIzaSyTestKey_123","hl":"en"};</script>
</head></html>"#;

    #[test]
    fn test_extracts_both_tokens() {
        let credentials = extract_credentials(PAGE).expect("Expected credentials");
        assert_eq!(credentials.content_id(), "dQw4w9WgXcQ");
        assert_eq!(credentials.access_key(), "AIzaSyTestKey_123");
    }

    #[test]
    fn test_partial_page_yields_nothing() {
        let id_only = r#"<link rel="canonical" href="https://www.youtube.com/watch?v=dQw4w9WgXcQ">"#;
        let key_only = r#"{"innertubeApiKey":"AIzaSyTestKey_123"}"#;
        assert_eq!(extract_credentials(id_only), None);
        assert_eq!(extract_credentials(key_only), None);
    }

    #[test]
    fn test_malformed_or_empty_page_yields_nothing() {
        for page in [
            "",
            "<html>",
            "not html at all \u{0}\u{1}",
            // Identifier too short to satisfy the canonical link.
            r#"<link rel="canonical" href="https://www.youtube.com/watch?v=short">"innertubeApiKey":"k""#,
            // Empty key.
            r#"<link rel="canonical" href="https://www.youtube.com/watch?v=dQw4w9WgXcQ">"innertubeApiKey":"""#,
        ] {
            assert_eq!(extract_credentials(page), None, "page: {page:?}");
        }
    }

    #[test]
    fn test_extraction_is_repeatable() {
        assert_eq!(extract_credentials(PAGE), extract_credentials(PAGE));
    }

    #[test]
    fn test_credentials_require_both_fields() {
        assert!(Credentials::new("", "key").is_none());
        assert!(Credentials::new("dQw4w9WgXcQ", "").is_none());
        let credentials = Credentials::new("dQw4w9WgXcQ", "key").unwrap();
        assert_eq!(credentials.content_id(), "dQw4w9WgXcQ");
        assert_eq!(credentials.access_key(), "key");
    }
}
