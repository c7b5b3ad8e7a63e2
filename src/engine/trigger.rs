//! Trigger scanning (input pre-classification).
//!
//! The matcher runs on every qualifying keystroke, so before touching the
//! grammar regex we look at the raw text for coarse signals. A citation needs
//! at least a letter, a digit and a colon; text missing any of them cannot
//! contain one and the scan stops there.
//!
//! This is a *heuristic* gate. False positives are fine because the grammar
//! still has to match in full; false negatives are not allowed.

bitflags::bitflags! {
    /// Coarse features of a field's text.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextSignals: u8 {
        const HAS_LETTERS = 1 << 0;
        const HAS_DIGITS  = 1 << 1;
        const HAS_COLON   = 1 << 2;
    }
}

impl TextSignals {
    /// Everything a citation needs to be present.
    pub const CITATION: TextSignals =
        TextSignals::HAS_LETTERS.union(TextSignals::HAS_DIGITS).union(TextSignals::HAS_COLON);

    /// Single pass over `text` collecting signals.
    pub fn scan(text: &str) -> Self {
        let mut signals = TextSignals::empty();
        for c in text.chars() {
            if c == ':' {
                signals |= TextSignals::HAS_COLON;
            } else if c.is_ascii_digit() {
                signals |= TextSignals::HAS_DIGITS;
            } else if c.is_alphabetic() {
                signals |= TextSignals::HAS_LETTERS;
            }
            if signals.contains(TextSignals::CITATION) {
                break;
            }
        }
        signals
    }

    /// True when the text could hold at least one citation.
    pub fn may_contain_citation(self) -> bool {
        self.contains(TextSignals::CITATION)
    }
}
