//! Detection and enrichment engine.
//!
//! This module holds the pieces a [`CitationField`](crate::CitationField)
//! composes. Each is small and, apart from dispatch, pure.
//!
//! ## How the parts work together
//!
//! ```text
//! text-change event
//!        │
//!        ▼
//! change::should_rescan          (change.rs)   grew? not our own splice?
//!        │ yes
//!        ▼
//! TextSignals::scan              (trigger.rs)  letters + digits + colon?
//!        │
//!        ▼
//! grammar::match_citations       (grammar.rs)  typed, non-overlapping spans
//!        │                                     minus expanded regions
//!        ▼
//! field: new keys only ──▶ Dispatcher (dispatch.rs)
//!                            one lookup in flight, FIFO queue,
//!                            cancellation token per task
//!                                    │ completion
//!                                    ▼
//!                          splice::apply        (splice.rs)
//!                            search the live text again,
//!                            replace first unexpanded occurrence
//! ```
//!
//! `metrics.rs` holds the counters the field keeps along the way.
//!
//! ## Idempotence
//!
//! Expanded text must never be offered as a new citation. Two guards enforce
//! it: the matcher drops candidates directly followed by the expansion marker
//! (`- "`), and the field passes the regions of every resolved expansion to
//! the matcher, which drops any candidate touching them. The second guard
//! also covers passages that themselves quote a citation.

#[path = "engine/change.rs"]
pub(crate) mod change;
#[path = "engine/dispatch.rs"]
mod dispatch;
#[path = "engine/grammar.rs"]
pub(crate) mod grammar;
#[path = "engine/metrics.rs"]
mod metrics;
#[path = "engine/splice.rs"]
pub(crate) mod splice;
#[path = "engine/trigger.rs"]
mod trigger;

pub(crate) use dispatch::{Completion, Dispatcher};
pub use grammar::{CitationParts, Span};
pub use metrics::FieldMetrics;
pub use trigger::TextSignals;
