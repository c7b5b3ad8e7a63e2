//! Field run metrics.
//!
//! Plain counters kept by each field. They are cheap to maintain on the
//! keystroke path and let hosts (and the CLI) see what the engine actually
//! did: how often the gate skipped a scan, how many lookups went out, how many
//! results were dropped because the text moved on.

use std::time::Duration;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FieldMetrics {
    /// Grammar scans performed.
    pub scans: usize,
    /// Change events the rescan gate turned away.
    pub skipped_scans: usize,
    /// Spans offered by the matcher across all scans.
    pub candidates: usize,
    /// Resolutions handed to the resolver.
    pub dispatched: usize,
    /// Resolutions spliced into the text.
    pub resolved: usize,
    /// Resolutions that came back with an error.
    pub failed: usize,
    /// Successful lookups whose citation had disappeared from the text.
    pub stale: usize,
    /// Lookups abandoned because the field was disposed.
    pub discarded: usize,
    /// Cumulative time spent scanning.
    pub scan_time: Duration,
}
