//! Text splicing.
//!
//! A resolution is applied against the field's *live* text, never against the
//! snapshot the citation was detected in. The grammar is run over the text
//! again and the first span whose raw text is exactly the citation, and that
//! is not already expanded, is replaced:
//!
//! ```text
//! Read John 3:16 today
//!      ^^^^^^^^^
//! Read John 3:16 - "For God so loved..." today
//!      ^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^^  expanded region
//! ```
//!
//! Only whole citations qualify: the `John 3:16` inside `1 John 3:16` is part
//! of a different citation and is never a target. If the citation is no
//! longer present (edited away while the lookup was in flight) the splice is
//! a no-op.

use super::grammar::match_citations;
use crate::Range;

/// Result of a successful splice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub text: String,
    /// Where the expansion now sits in `text`.
    pub region: Range,
}

/// Build the text that replaces a citation: `reference - "passage"`.
///
/// The resolver's display reference wins over the raw text when present.
/// Whitespace in the passage is collapsed so multi-line answers stay inline.
pub fn expansion_for(raw_text: &str, display_reference: Option<&str>, resolved_text: &str) -> String {
    let reference = display_reference.map(str::trim).filter(|r| !r.is_empty()).unwrap_or(raw_text);
    let passage = resolved_text.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("{reference} - \"{passage}\"")
}

/// Replace the first live, unexpanded citation in `text` spelled exactly
/// `raw_text`.
///
/// Spans overlapping `protected` (regions already expanded) or directly
/// followed by an expansion marker are never offered by the matcher. Returns
/// `None` when nothing qualifies.
pub fn apply(text: &str, raw_text: &str, expansion: &str, protected: &[Range]) -> Option<Splice> {
    if raw_text.is_empty() {
        return None;
    }

    let found = match_citations(text, protected).into_iter().find(|span| span.raw_text == raw_text)?;
    log::trace!("splice target {}..{} {:?}", found.start, found.end, found.raw_text);

    let mut spliced = String::with_capacity(text.len() - raw_text.len() + expansion.len());
    spliced.push_str(&text[..found.start]);
    spliced.push_str(expansion);
    spliced.push_str(&text[found.end..]);

    Some(Splice { text: spliced, region: Range::new(found.start, found.start + expansion.len()) })
}
