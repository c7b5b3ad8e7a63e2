use crate::Citation;
use crate::engine::{FieldMetrics, Span, grammar};
use crate::field::CitationField;
use crate::notify::LogNotifier;
use crate::resolver::Resolver;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Lookups running longer than this are failed with a timeout.
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(10);

/// Options that affect detection and resolution behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Upper bound for a single lookup. `None` waits forever.
    pub resolve_timeout: Option<Duration>,
    /// Only dispatch a citation once the character after it shows it is
    /// finished (not a digit, `-`, `–` or `:`). Avoids looking up `John 3:1`
    /// while the user is still typing `John 3:16`.
    pub require_boundary: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { resolve_timeout: Some(DEFAULT_RESOLVE_TIMEOUT), require_boundary: false }
    }
}

/// Find every citation in `text`.
///
/// # Example
/// ```
/// let spans = citefield::detect("See John 3:16 and Romans 8:28-30.");
/// let keys: Vec<String> = spans.iter().map(|s| s.normalized_key()).collect();
/// assert_eq!(keys, ["john3:16", "romans8:28-30"]);
/// ```
pub fn detect(text: &str) -> Vec<Span> {
    grammar::match_citations(text, &[])
}

/// Canonical key for a citation string.
///
/// Text that is exactly one citation gets the grammar's key (ordinal as a
/// digit, book lowercased without spaces, numbers without leading zeros).
/// Anything else falls back to lowercasing and dropping whitespace.
///
/// ```
/// use citefield::normalize_key;
///
/// assert_eq!(normalize_key("1 John 3:16"), "1john3:16");
/// assert_eq!(normalize_key("II Kings 2:11"), "2kings2:11");
/// assert_eq!(normalize_key("Jn 3"), "jn3");
/// ```
pub fn normalize_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if let [span] = grammar::match_citations(trimmed, &[]).as_slice() {
        if span.start == 0 && span.end == trimmed.len() {
            return span.normalized_key();
        }
    }
    trimmed.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}

/// Outcome of a one-shot [`expand`].
#[derive(Debug, Clone)]
pub struct Expansion {
    /// The text after every lookup was applied.
    pub text: String,
    /// Every citation detected, in detection order.
    pub citations: Vec<Citation>,
    pub metrics: FieldMetrics,
    /// Wall time including all lookups.
    pub elapsed: Duration,
}

impl From<&CitationField> for Expansion {
    fn from(field: &CitationField) -> Self {
        Expansion {
            text: field.text().to_string(),
            citations: field.state().citations().cloned().collect(),
            metrics: field.metrics().clone(),
            elapsed: Duration::ZERO,
        }
    }
}

/// Detect and expand every citation in `text` as if it had been pasted into
/// a fresh field, and wait until all lookups are done.
///
/// `require_boundary` is ignored here: the whole text is present at once.
/// Failures are logged and leave their citation untouched.
pub async fn expand(text: &str, resolver: Arc<dyn Resolver>, options: &Options) -> Expansion {
    let started = Instant::now();
    let options = Options { require_boundary: false, ..options.clone() };
    let mut field = CitationField::new(resolver, Arc::new(LogNotifier), options);

    field.on_text_change(text);
    field.settle().await;

    Expansion { elapsed: started.elapsed(), ..Expansion::from(&field) }
}
