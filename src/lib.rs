//! Live scripture-citation detection and inline enrichment for text fields.
//!
//! A [`CitationField`] watches the text of one input field. As the user types
//! it recognizes substrings shaped like citations ("John 3:16",
//! "1 John 3:16-18"), resolves each newly seen one through a [`Resolver`],
//! and splices the passage back in after the citation:
//!
//! ```text
//! Read John 3:16 today  ──▶  Read John 3:16 - "For God so loved..." today
//! ```
//!
//! The pure building blocks are also exposed on their own: [`detect`] runs the
//! grammar over a string, [`normalize_key`] produces the deduplication key.

#[macro_use]
mod macros;
mod api;
mod engine;
mod field;
mod notify;
mod resolver;

pub use api::{DEFAULT_RESOLVE_TIMEOUT, Expansion, Options, detect, expand, normalize_key};
pub use engine::{CitationParts, FieldMetrics, Span, TextSignals};
pub use field::{CitationEvent, CitationField, FieldState, FieldUpdate, StatusListener};
pub use notify::{LogNotifier, Notifier, NotifyKind};
#[cfg(feature = "http")]
pub use resolver::HttpResolver;
pub use resolver::{FailureKind, Passage, ResolutionResult, ResolveError, Resolver, StaticResolver, TableError};

// --- Shared types -----------------------------------------------------------

/// Byte range into a field's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    /// Start byte index (inclusive).
    pub start: usize,
    /// End byte index (exclusive).
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Range { start, end }
    }

    /// True when the two ranges share at least one byte.
    pub fn overlaps(&self, other: &Range) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Lifecycle of a single citation inside one field.
///
/// ```text
/// detected ──▶ resolving ──┬─▶ resolved   (terminal)
///    ▲                     └─▶ failed
///    └──── request_expand ──────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CitationStatus {
    Detected,
    Resolving,
    Resolved,
    Failed,
}

impl CitationStatus {
    /// Whether the host should offer a manual "Expand" affordance.
    pub fn is_expandable(self) -> bool {
        matches!(self, CitationStatus::Detected | CitationStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CitationStatus::Detected => "detected",
            CitationStatus::Resolving => "resolving",
            CitationStatus::Resolved => "resolved",
            CitationStatus::Failed => "failed",
        }
    }
}

/// A citation known to a field, keyed by its normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Citation {
    /// Exact substring as first detected (original casing and spacing).
    pub raw_text: String,
    /// Canonical key used for deduplication, e.g. `"1john3:16"`.
    pub normalized_key: String,
    pub status: CitationStatus,
    /// Text spliced into the field once resolved.
    pub expansion: Option<String>,
    /// Error from the most recent failed resolution.
    pub last_error: Option<ResolveError>,
}

impl Citation {
    pub(crate) fn detected(raw_text: &str, normalized_key: String) -> Self {
        Citation {
            raw_text: raw_text.to_string(),
            normalized_key,
            status: CitationStatus::Detected,
            expansion: None,
            last_error: None,
        }
    }
}
