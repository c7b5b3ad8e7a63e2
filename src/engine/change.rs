//! Rescan gate.
//!
//! Deciding whether a text change is worth scanning is length based: expansions
//! only ever grow text, so a change that did not grow the text (a deletion, an
//! in-place overwrite) cannot have introduced a new citation worth looking at.
//!
//! The second condition suppresses the feedback loop of the engine reacting to
//! its own splice. The field remembers the text it produced on its last splice;
//! when the host echoes exactly that text back as a change event it is skipped.
//! The marker is consumed by one detector pass whether it matched or not.

/// `true` when `current` should be scanned for new citations.
pub fn should_rescan(previous: &str, current: &str, last_programmatic_edit: Option<&str>) -> bool {
    if last_programmatic_edit == Some(current) {
        return false;
    }
    current.len() > previous.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typing_triggers_a_rescan() {
        assert!(should_rescan("John 3:1", "John 3:16", None));
        assert!(should_rescan("", "J", None));
    }

    #[test]
    fn deletions_and_overwrites_do_not() {
        assert!(!should_rescan("John 3:16", "John 3:1", None));
        assert!(!should_rescan("John 3:16", "John 3:17", None));
        assert!(!should_rescan("", "", None));
    }

    #[test]
    fn own_splice_is_not_rescanned() {
        let spliced = r#"John 3:16 - "For God so loved""#;
        assert!(!should_rescan("John 3:16", spliced, Some(spliced)));
        // A user edit on top of the splice is new input again.
        let typed = format!("{spliced} ok");
        assert!(should_rescan(spliced, &typed, Some(spliced)));
    }
}
