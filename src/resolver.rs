//! Citation resolvers.
//!
//! A [`Resolver`] maps citation text to the passage it refers to. The engine
//! treats every error the same way (the citation becomes `failed` and the text
//! is left alone); [`ResolveError::kind`] only changes how the failure is
//! reported to the user.

use crate::api::normalize_key;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// A resolver's answer for one citation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    /// The resolver's own canonical key (informational).
    pub normalized_key: String,
    /// Preferred way to write the reference, e.g. `"John 3:16"` for `"jn 3:16"`.
    pub display_reference: Option<String>,
    pub resolved_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no passage found for \"{0}\"")]
    NotFound(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid citation or response: {0}")]
    Validation(String),
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

/// How a failure should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The grammar matched but there is nothing to resolve it to.
    UnknownCitation,
    /// The lookup itself failed; retrying may help.
    TransientLookup,
}

impl ResolveError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ResolveError::NotFound(_) | ResolveError::Validation(_) => FailureKind::UnknownCitation,
            ResolveError::Network(_) | ResolveError::Timeout(_) => FailureKind::TransientLookup,
        }
    }
}

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, citation: &str) -> Result<ResolutionResult, ResolveError>;
}

// --- Static table -----------------------------------------------------------

/// One passage in a [`StaticResolver`] table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Passage {
    #[serde(default)]
    pub reference: Option<String>,
    pub text: String,
}

/// Table values may be a bare string or a `{ reference, text }` object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TableEntry {
    Text(String),
    Passage(Passage),
}

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("cannot read passage table: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid passage table: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-memory resolver keyed by normalized citation.
///
/// Lookups go through [`normalize_key`], so `"1 John 3:16"`, `"I john 3:16"`
/// and `"1st John 3:16"` all hit the same entry.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    passages: HashMap<String, Passage>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a plain passage.
    pub fn with(mut self, citation: &str, text: &str) -> Self {
        self.insert(citation, Passage { reference: None, text: text.to_string() });
        self
    }

    pub fn insert(&mut self, citation: &str, passage: Passage) {
        self.passages.insert(normalize_key(citation), passage);
    }

    /// Parse a JSON object of `citation → passage`.
    ///
    /// ```
    /// let table = citefield::StaticResolver::from_json_str(
    ///     r#"{ "John 3:16": "For God so loved the world" }"#,
    /// ).unwrap();
    /// assert_eq!(table.len(), 1);
    /// ```
    pub fn from_json_str(json: &str) -> Result<Self, TableError> {
        let entries: HashMap<String, TableEntry> = serde_json::from_str(json)?;
        let mut resolver = Self::new();
        for (citation, entry) in entries {
            let passage = match entry {
                TableEntry::Text(text) => Passage { reference: None, text },
                TableEntry::Passage(passage) => passage,
            };
            resolver.insert(&citation, passage);
        }
        Ok(resolver)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }
}

#[async_trait]
impl Resolver for StaticResolver {
    async fn resolve(&self, citation: &str) -> Result<ResolutionResult, ResolveError> {
        let key = normalize_key(citation);
        if key.is_empty() {
            return Err(ResolveError::Validation("empty citation".to_string()));
        }
        match self.passages.get(&key) {
            Some(passage) => Ok(ResolutionResult {
                normalized_key: key,
                display_reference: passage.reference.clone(),
                resolved_text: passage.text.clone(),
            }),
            None => Err(ResolveError::NotFound(citation.trim().to_string())),
        }
    }
}

// --- HTTP -------------------------------------------------------------------

#[cfg(feature = "http")]
pub use http::HttpResolver;

#[cfg(feature = "http")]
mod http {
    use super::{ResolutionResult, ResolveError, Resolver};
    use crate::api::normalize_key;
    use async_trait::async_trait;
    use reqwest::{StatusCode, Url};
    use serde::Deserialize;

    /// Resolver backed by a JSON passage service.
    ///
    /// Requests `GET {base}/{citation}` and expects
    /// `{ "reference": "...", "text": "..." }` back.
    #[derive(Debug, Clone)]
    pub struct HttpResolver {
        client: reqwest::Client,
        base_url: Url,
    }

    #[derive(Debug, Deserialize)]
    struct PassageResponse {
        reference: Option<String>,
        text: Option<String>,
        error: Option<String>,
    }

    impl HttpResolver {
        pub fn new(base_url: &str) -> Result<Self, ResolveError> {
            let base_url =
                Url::parse(base_url).map_err(|e| ResolveError::Validation(format!("bad base url {base_url}: {e}")))?;
            if base_url.cannot_be_a_base() {
                return Err(ResolveError::Validation(format!("{base_url} cannot be a base url")));
            }
            Ok(Self { client: reqwest::Client::new(), base_url })
        }

        fn url_for(&self, citation: &str) -> Result<Url, ResolveError> {
            let mut url = self.base_url.clone();
            url.path_segments_mut()
                .map_err(|_| ResolveError::Validation(format!("{} cannot be a base url", self.base_url)))?
                .pop_if_empty()
                .push(citation.trim());
            Ok(url)
        }
    }

    #[async_trait]
    impl Resolver for HttpResolver {
        async fn resolve(&self, citation: &str) -> Result<ResolutionResult, ResolveError> {
            let url = self.url_for(citation)?;
            log::debug!("GET {url}");

            let response =
                self.client.get(url).send().await.map_err(|e| ResolveError::Network(e.to_string()))?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Err(ResolveError::NotFound(citation.trim().to_string()));
            }
            if !status.is_success() {
                return Err(ResolveError::Network(format!("HTTP {status}")));
            }

            let body: PassageResponse =
                response.json().await.map_err(|e| ResolveError::Validation(e.to_string()))?;
            if let Some(error) = body.error {
                log::debug!("passage service error for {citation:?}: {error}");
                return Err(ResolveError::NotFound(citation.trim().to_string()));
            }
            let text = body
                .text
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| ResolveError::Validation("response has no passage text".to_string()))?;

            Ok(ResolutionResult {
                normalized_key: normalize_key(citation),
                display_reference: body.reference,
                resolved_text: text,
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn citation_is_one_escaped_path_segment() {
            let resolver = HttpResolver::new("https://example.org/api/").unwrap();
            let url = resolver.url_for("1 John 3:16").unwrap();
            assert_eq!(url.as_str(), "https://example.org/api/1%20John%203:16");
        }

        #[test]
        fn rejects_unusable_base() {
            assert!(HttpResolver::new("not a url").is_err());
            assert!(HttpResolver::new("mailto:someone@example.org").is_err());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_lookup_uses_normalized_keys() {
        let resolver = StaticResolver::new().with("1 John 4:8", "God is love.");
        for citation in ["1 John 4:8", "I john 4:8", "1st John 4:8", " 1John 4:8 "] {
            let result = resolver.resolve(citation).await.unwrap();
            assert_eq!(result.normalized_key, "1john4:8");
            assert_eq!(result.resolved_text, "God is love.");
            assert_eq!(result.display_reference, None);
        }
    }

    #[tokio::test]
    async fn static_lookup_reports_not_found() {
        let resolver = StaticResolver::new();
        let err = resolver.resolve("Bookname 99:99").await.unwrap_err();
        assert_eq!(err, ResolveError::NotFound("Bookname 99:99".to_string()));
        assert_eq!(err.kind(), FailureKind::UnknownCitation);
        assert!(matches!(resolver.resolve("   ").await, Err(ResolveError::Validation(_))));
    }

    #[tokio::test]
    async fn json_table_accepts_both_entry_shapes() {
        let json = r#"{
            "John 3:16": "For God so loved the world",
            "jn 1:1": { "reference": "John 1:1", "text": "In the beginning was the Word" }
        }"#;
        let resolver = StaticResolver::from_json_str(json).unwrap();
        assert_eq!(resolver.len(), 2);

        let result = resolver.resolve("jn 1:1").await.unwrap();
        assert_eq!(result.display_reference.as_deref(), Some("John 1:1"));
        assert_eq!(result.resolved_text, "In the beginning was the Word");
    }

    #[test]
    fn malformed_table_is_a_parse_error() {
        assert!(matches!(StaticResolver::from_json_str("[1, 2]"), Err(TableError::Parse(_))));
        assert!(matches!(StaticResolver::from_path("/nonexistent/table.json"), Err(TableError::Io(_))));
    }

    #[test]
    fn failure_kinds() {
        assert_eq!(ResolveError::Network("down".into()).kind(), FailureKind::TransientLookup);
        assert_eq!(ResolveError::Timeout(Duration::from_secs(1)).kind(), FailureKind::TransientLookup);
        assert_eq!(ResolveError::Validation("bad".into()).kind(), FailureKind::UnknownCitation);
    }
}
