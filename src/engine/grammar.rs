//! Citation grammar and matcher.
//!
//! The grammar, with token classes:
//!
//! ```text
//! citation  := [ordinal] book chapter ':' verse [range]
//! ordinal   := '1st' | '2nd' | '3rd' | '1' | '2' | '3'      (space optional)
//!            | 'I' | 'II' | 'III'                          (space required)
//! book      := word ( ('of' | 'of the') word )*
//! word      := letter+
//! chapter   := digit+
//! verse     := digit+
//! range     := ('-' | '–') verse
//! ```
//!
//! Matching is case-insensitive. A book is a single word unless joined by
//! `of` ("Song of Solomon"), which keeps the leftmost-longest rule from
//! swallowing the prose in front of a citation ("Read John 3:16").
//!
//! ## Candidate selection
//!
//! Every position where the grammar matches produces a candidate. Candidates
//! touching an already expanded region, or directly followed by an expansion
//! marker (`- "`), are dropped first. The survivors are sorted by
//! `(start, longest first)` and kept greedily, so overlaps resolve
//! leftmost-longest:
//!
//! ```text
//! "see 1 John 3:16"
//!      ^^^^^^^^^^^   candidate 4..15  (kept)
//!        ^^^^^^^^^   candidate 6..15  (overlaps, dropped)
//! ```

use super::trigger::TextSignals;
use crate::Range;
use regex::{Captures, Regex};
use std::fmt::Write;

/// Single-word "books" that are really prose ("meet at 10:30").
const STOP_WORDS: &[&str] = &[
    "about", "after", "and", "are", "around", "at", "before", "between", "by", "for", "from", "in", "is", "of", "on",
    "or", "since", "the", "till", "to", "until", "was",
];

/// Structured pieces of a matched citation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationParts {
    /// Canonical ordinal (`1st`, `I` and `1` all become `1`).
    pub ordinal: Option<u8>,
    /// Book name exactly as written.
    pub book: String,
    pub chapter: u32,
    pub verse: u32,
    pub verse_end: Option<u32>,
}

impl CitationParts {
    /// Case-folded, whitespace-free key: `"1 John 3:16"` → `"1john3:16"`.
    pub fn normalized_key(&self) -> String {
        let mut key = String::new();
        if let Some(ordinal) = self.ordinal {
            let _ = write!(key, "{ordinal}");
        }
        for word in self.book.split_whitespace() {
            key.push_str(&word.to_lowercase());
        }
        let _ = write!(key, "{}:{}", self.chapter, self.verse);
        if let Some(end) = self.verse_end {
            let _ = write!(key, "-{end}");
        }
        key
    }
}

/// A citation found in text. `start`/`end` are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// The matched substring, original casing and spacing preserved.
    pub raw_text: String,
    pub parts: CitationParts,
}

impl Span {
    pub fn range(&self) -> Range {
        Range::new(self.start, self.end)
    }

    pub fn normalized_key(&self) -> String {
        self.parts.normalized_key()
    }
}

fn citation_regex() -> &'static Regex {
    regex!(
        r"(?i)\b(?:(?P<ordinal>1st|2nd|3rd|[123])\s*|(?P<roman>iii|ii|i)\s+)?(?P<book>\p{L}+(?:\s+of(?:\s+the)?\s+\p{L}+)*)\s*(?P<chapter>[0-9]+)\s*:\s*(?P<verse>[0-9]+)(?:\s*[-–]\s*(?P<verse_end>[0-9]+))?\b"
    )
}

/// Matches the start of what the splicer appends after a citation.
pub(crate) fn expansion_marker() -> &'static Regex {
    regex!(r#"^\s*-\s*""#)
}

/// True when `text[at..]` starts with an expansion marker.
pub(crate) fn followed_by_marker(text: &str, at: usize) -> bool {
    text.get(at..).is_some_and(|rest| expansion_marker().is_match(rest))
}

/// Find all citations in `text`, skipping anything inside `expanded`.
///
/// Returned spans are non-overlapping and ordered by `start`. Never fails:
/// text without citations yields an empty list.
pub fn match_citations(text: &str, expanded: &[Range]) -> Vec<Span> {
    if !TextSignals::scan(text).may_contain_citation() {
        return Vec::new();
    }

    let re = citation_regex();
    let mut candidates = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let Some(caps) = re.captures_at(text, pos) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        if let Some(span) = span_from_captures(&caps) {
            log::trace!("candidate {}..{} {:?}", span.start, span.end, span.raw_text);
            candidates.push(span);
        }
        pos = next_char_boundary(text, whole.start());
    }

    candidates.retain(|span| {
        let excluded = expanded.iter().any(|r| r.overlaps(&span.range())) || followed_by_marker(text, span.end);
        if excluded {
            log::trace!("excluded {}..{} {:?}", span.start, span.end, span.raw_text);
        }
        !excluded
    });

    select_leftmost_longest(candidates)
}

fn span_from_captures(caps: &Captures<'_>) -> Option<Span> {
    let whole = caps.get(0)?;
    let book = caps.name("book")?.as_str();
    let ordinal = match (caps.name("ordinal"), caps.name("roman")) {
        (Some(m), _) | (None, Some(m)) => Some(parse_ordinal(m.as_str())?),
        (None, None) => None,
    };

    if ordinal.is_none() && STOP_WORDS.contains(&book.to_lowercase().as_str()) {
        return None;
    }

    Some(Span {
        start: whole.start(),
        end: whole.end(),
        raw_text: whole.as_str().to_string(),
        parts: CitationParts {
            ordinal,
            book: book.to_string(),
            chapter: caps.name("chapter")?.as_str().parse().ok()?,
            verse: caps.name("verse")?.as_str().parse().ok()?,
            verse_end: match caps.name("verse_end") {
                Some(m) => Some(m.as_str().parse().ok()?),
                None => None,
            },
        },
    })
}

fn parse_ordinal(s: &str) -> Option<u8> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "1st" | "i" => Some(1),
        "2" | "2nd" | "ii" => Some(2),
        "3" | "3rd" | "iii" => Some(3),
        _ => None,
    }
}

fn next_char_boundary(text: &str, from: usize) -> usize {
    from + text[from..].chars().next().map_or(1, char::len_utf8)
}

/// Keep the earliest span, preferring the longer one on equal starts, and
/// drop anything overlapping a span already kept.
fn select_leftmost_longest(mut candidates: Vec<Span>) -> Vec<Span> {
    candidates.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<Span> = Vec::new();
    for span in candidates {
        let overlaps = kept.last().is_some_and(|last| span.start < last.end);
        if !overlaps {
            kept.push(span);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spans(text: &str) -> Vec<(usize, usize, String)> {
        match_citations(text, &[]).into_iter().map(|s| (s.start, s.end, s.raw_text)).collect()
    }

    #[test]
    fn grammar_examples_matching() {
        // (input, expected raw text, expected key)
        let cases: Vec<(&str, &str, &str)> = vec![
            ("John 3:16", "John 3:16", "john3:16"),
            ("Read John 3:16 today", "John 3:16", "john3:16"),
            ("1 John 3:16", "1 John 3:16", "1john3:16"),
            ("1John 3:16", "1John 3:16", "1john3:16"),
            ("1st John 3:16", "1st John 3:16", "1john3:16"),
            ("I John 3:16", "I John 3:16", "1john3:16"),
            ("II Kings 2:11", "II Kings 2:11", "2kings2:11"),
            ("iii john 1:4", "iii john 1:4", "3john1:4"),
            ("3rd John 1:4", "3rd John 1:4", "3john1:4"),
            ("Romans 8:28-30", "Romans 8:28-30", "romans8:28-30"),
            ("Romans 8:28 - 30", "Romans 8:28 - 30", "romans8:28-30"),
            ("Psalm 23:1–6", "Psalm 23:1–6", "psalm23:1-6"),
            ("JOHN 3:16", "JOHN 3:16", "john3:16"),
            ("John 3 : 16", "John 3 : 16", "john3:16"),
            ("John3:16", "John3:16", "john3:16"),
            ("John 03:016", "John 03:016", "john3:16"),
            ("Song of Solomon 2:1", "Song of Solomon 2:1", "songofsolomon2:1"),
            ("Acts of the Apostles 2:1", "Acts of the Apostles 2:1", "actsoftheapostles2:1"),
            ("Bookname 99:99", "Bookname 99:99", "bookname99:99"),
            ("(see Genesis 1:1).", "Genesis 1:1", "genesis1:1"),
        ];

        for (input, raw, key) in cases {
            let found = match_citations(input, &[]);
            assert_eq!(found.len(), 1, "input {input:?} produced {found:?}");
            let span = &found[0];
            assert_eq!(span.raw_text, raw, "input {input:?}");
            assert_eq!(&input[span.start..span.end], raw, "input {input:?}");
            assert_eq!(span.normalized_key(), key, "input {input:?}");
        }
    }

    #[test]
    fn grammar_examples_not_matching() {
        let cases = vec![
            "",
            "hello world",
            "John 3",
            "3:16",
            "John 3:16a",
            "meet at 10:30",
            "from 9:00 until 17:00",
            "ratio is 3:2",
            "John 3:",
            "John :16",
        ];
        for input in cases {
            assert!(match_citations(input, &[]).is_empty(), "input {input:?} should not match");
        }
    }

    #[test]
    fn spans_bound_the_citation_exactly() {
        let text = "Read John 3:16 today";
        assert_eq!(spans(text), vec![(5, 14, "John 3:16".to_string())]);
    }

    #[test]
    fn multiple_citations_are_ordered_and_disjoint() {
        let text = "See John 3:16 and Romans 8:28, then 1 Cor 13:4-7.";
        let found = spans(text);
        assert_eq!(
            found,
            vec![
                (4, 13, "John 3:16".to_string()),
                (18, 29, "Romans 8:28".to_string()),
                (36, 48, "1 Cor 13:4-7".to_string()),
            ]
        );
    }

    #[test]
    fn leftmost_longest_prefers_ordinal_form() {
        let found = match_citations("see 1 John 3:16", &[]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw_text, "1 John 3:16");
        assert_eq!(found[0].parts.ordinal, Some(1));
    }

    #[test]
    fn leftmost_longest_takes_the_range() {
        let found = match_citations("Romans 8:28-30", &[]);
        assert_eq!(found[0].parts.verse_end, Some(30));
        assert_eq!(found[0].end, 14);
    }

    #[test]
    fn citation_followed_by_marker_is_excluded() {
        assert!(match_citations(r#"John 3:16 - "For God so loved""#, &[]).is_empty());
        assert!(match_citations(r#"1 John 3:16 -"Beloved""#, &[]).is_empty());
        // A bare hyphen without a quote is not a marker.
        assert_eq!(match_citations("John 3:16 - see notes", &[]).len(), 1);
    }

    #[test]
    fn expanded_regions_are_never_offered() {
        let text = r#"John 3:16 - "as in Romans 8:28" and Mark 1:1"#;
        let region = Range::new(0, 30);
        let found = match_citations(text, &[region]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw_text, "Mark 1:1");
    }

    #[test]
    fn handles_multibyte_text() {
        let found = match_citations("« Jean 3:16 » — ça va", &[]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].raw_text, "Jean 3:16");
    }

    #[test]
    fn oversized_numbers_are_skipped() {
        assert!(match_citations("John 99999999999:1", &[]).is_empty());
    }
}
