//! Per-field state and the host-facing field.
//!
//! A [`CitationField`] belongs to exactly one input field. It owns a
//! [`FieldState`] (the text and the citations seen in it), a dispatcher for
//! lookups, and the collaborators it reports to. Nothing here is global: two
//! fields never share citations or lookups.
//!
//! ## Driving a field
//!
//! ```text
//! host keystroke ──▶ on_text_change(text) ──▶ text to show (maybe expanded)
//! host idle      ──▶ next_update().await  ──▶ FieldUpdate { text, changed }
//! "Expand" click ──▶ request_expand(key)
//! field closed   ──▶ dispose() / drop
//! ```
//!
//! The host must write back the text it gets from either call before
//! delivering the next keystroke. `next_update` is cancel safe, so it can sit
//! in a `tokio::select!` next to the host's input stream.

use crate::{Citation, CitationStatus, Range};
use crate::api::{Options, normalize_key};
use crate::engine::{Completion, Dispatcher, FieldMetrics, change, grammar, splice};
use crate::notify::{Notifier, NotifyKind};
use crate::resolver::{FailureKind, ResolutionResult, ResolveError, Resolver};
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Text and citations of one field. Only the owning [`CitationField`]
/// mutates it.
#[derive(Debug, Clone, Default)]
pub struct FieldState {
    current_text: String,
    previous_text: String,
    /// Keyed by normalized key, in detection order.
    citations: IndexMap<String, Citation>,
    /// Text produced by the last splice, until one change event has seen it.
    last_programmatic_edit: Option<String>,
}

impl FieldState {
    pub fn new(initial: &str) -> Self {
        FieldState {
            current_text: initial.to_string(),
            previous_text: initial.to_string(),
            citations: IndexMap::new(),
            last_programmatic_edit: None,
        }
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    pub fn previous_text(&self) -> &str {
        &self.previous_text
    }

    pub fn citations(&self) -> impl Iterator<Item = &Citation> {
        self.citations.values()
    }

    pub fn citation(&self, key: &str) -> Option<&Citation> {
        self.citations.get(key)
    }

    pub fn count_in(&self, status: CitationStatus) -> usize {
        self.citations.values().filter(|c| c.status == status).count()
    }

    /// Where resolved expansions currently sit in the text, sorted by start.
    pub fn expanded_regions(&self) -> Vec<Range> {
        let mut regions: Vec<Range> = self
            .citations
            .values()
            .filter(|c| c.status == CitationStatus::Resolved)
            .filter_map(|c| c.expansion.as_deref())
            .flat_map(|expansion| {
                self.current_text
                    .match_indices(expansion)
                    .map(|(start, _)| Range::new(start, start + expansion.len()))
                    .collect::<Vec<_>>()
            })
            .collect();
        regions.sort_by_key(|r| (r.start, r.end));
        regions
    }
}

/// Something the host may want to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CitationEvent {
    StatusChanged { key: String, raw_text: String, status: CitationStatus },
    /// The citation vanished from the text before its lookup finished and
    /// has been forgotten; typing it again detects it afresh.
    Dropped { key: String },
}

pub type StatusListener = Box<dyn FnMut(&CitationEvent) + Send>;

/// Result of applying one finished lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub text: String,
    /// Whether `text` differs from what the host last saw.
    pub changed: bool,
}

pub struct CitationField {
    state: FieldState,
    dispatcher: Dispatcher,
    resolver: Arc<dyn Resolver>,
    notifier: Arc<dyn Notifier>,
    options: Options,
    listeners: Vec<StatusListener>,
    metrics: FieldMetrics,
    disposed: bool,
}

impl fmt::Debug for CitationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CitationField")
            .field("state", &self.state)
            .field("dispatcher", &self.dispatcher)
            .field("resolver", &"<resolver>")
            .field("notifier", &"<notifier>")
            .field("options", &self.options)
            .field("listeners", &self.listeners.len())
            .field("metrics", &self.metrics)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl CitationField {
    pub fn new(resolver: Arc<dyn Resolver>, notifier: Arc<dyn Notifier>, options: Options) -> Self {
        Self::with_text("", resolver, notifier, options)
    }

    /// Start from existing content. The initial text is not scanned: only
    /// what the user types afterwards is.
    pub fn with_text(initial: &str, resolver: Arc<dyn Resolver>, notifier: Arc<dyn Notifier>, options: Options) -> Self {
        CitationField {
            state: FieldState::new(initial),
            dispatcher: Dispatcher::new(options.resolve_timeout),
            resolver,
            notifier,
            options,
            listeners: Vec::new(),
            metrics: FieldMetrics::default(),
            disposed: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.state.current_text
    }

    pub fn state(&self) -> &FieldState {
        &self.state
    }

    pub fn citation(&self, key: &str) -> Option<&Citation> {
        self.state.citation(key)
    }

    pub fn metrics(&self) -> &FieldMetrics {
        &self.metrics
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Register a callback for citation status changes.
    pub fn subscribe(&mut self, listener: impl FnMut(&CitationEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Feed the field's new text. Returns the text the host should display,
    /// which differs from `text` when a finished lookup was spliced in.
    pub fn on_text_change(&mut self, text: &str) -> String {
        if self.disposed {
            return text.to_string();
        }

        let previous = std::mem::replace(&mut self.state.current_text, text.to_string());
        let programmatic = self.state.last_programmatic_edit.take();
        let rescan = change::should_rescan(&previous, text, programmatic.as_deref());
        self.state.previous_text = previous;

        self.drain_completions();
        if rescan {
            self.scan();
        } else {
            self.metrics.skipped_scans += 1;
        }
        self.pump();

        self.state.current_text.clone()
    }

    /// Wait for the running lookup and apply it.
    ///
    /// Returns `None` when nothing is in flight or the field is disposed.
    pub async fn next_update(&mut self) -> Option<FieldUpdate> {
        if self.disposed {
            return None;
        }
        let completion = self.dispatcher.next_completion().await?;
        let changed = self.apply_completion(completion);
        Some(FieldUpdate { text: self.state.current_text.clone(), changed })
    }

    /// Apply lookups until none is queued or running.
    pub async fn settle(&mut self) -> &str {
        while self.next_update().await.is_some() {}
        &self.state.current_text
    }

    /// Manually (re)try a citation. Accepts the normalized key or raw text.
    ///
    /// Only `failed` citations, or `detected` ones not already queued, can be
    /// expanded this way. Returns whether a lookup was queued.
    pub fn request_expand(&mut self, key: &str) -> bool {
        if self.disposed {
            return false;
        }
        let key = if self.state.citations.contains_key(key) { key.to_string() } else { normalize_key(key) };
        let Some(citation) = self.state.citations.get_mut(&key) else {
            return false;
        };
        if !citation.status.is_expandable() || self.dispatcher.is_pending(&key) {
            return false;
        }

        log::debug!("manual expand of {:?}", citation.raw_text);
        citation.status = CitationStatus::Detected;
        self.dispatcher.enqueue(&key);
        self.emit_status(&key);
        self.pump();
        true
    }

    /// Tear the field down. Outstanding lookups are cancelled and any result
    /// still on its way is discarded; the text is left as it is.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let abandoned = self.dispatcher.cancel_all();
        self.metrics.discarded += abandoned;
        self.state.citations.clear();
        self.state.last_programmatic_edit = None;
        self.listeners.clear();
        log::debug!("field disposed, {abandoned} lookup(s) abandoned");
    }

    // --- internals ----------------------------------------------------------

    fn scan(&mut self) {
        let started = Instant::now();
        let expanded = self.state.expanded_regions();
        let spans = grammar::match_citations(&self.state.current_text, &expanded);
        self.metrics.scans += 1;
        self.metrics.candidates += spans.len();

        for span in spans {
            if self.options.require_boundary && !is_settled(&self.state.current_text, span.end) {
                log::trace!("{:?} may still be typed, waiting", span.raw_text);
                continue;
            }
            let key = span.normalized_key();
            if self.state.citations.contains_key(&key) {
                continue;
            }
            log::debug!("detected {:?} as {key}", span.raw_text);
            self.state.citations.insert(key.clone(), Citation::detected(&span.raw_text, key.clone()));
            self.dispatcher.enqueue(&key);
            self.emit_status(&key);
        }

        self.metrics.scan_time += started.elapsed();
    }

    /// Start the next queued lookup if none is running.
    fn pump(&mut self) {
        if self.disposed {
            return;
        }
        while let Some(key) = self.dispatcher.next_queued() {
            let Some(citation) = self.state.citations.get_mut(&key) else {
                continue;
            };
            if citation.status != CitationStatus::Detected {
                continue;
            }
            citation.status = CitationStatus::Resolving;
            let raw_text = citation.raw_text.clone();
            log::debug!("resolving {raw_text:?} ({key})");
            self.metrics.dispatched += 1;
            self.dispatcher.start(key.clone(), raw_text, Arc::clone(&self.resolver));
            self.emit_status(&key);
            break;
        }
    }

    fn drain_completions(&mut self) -> bool {
        let mut changed = false;
        while let Some(completion) = self.dispatcher.try_completion() {
            changed |= self.apply_completion(completion);
        }
        changed
    }

    fn apply_completion(&mut self, completion: Completion) -> bool {
        let Completion { key, outcome } = completion;
        let changed = match self.state.citations.get(&key).map(|c| c.raw_text.clone()) {
            Some(raw_text) => match outcome {
                Ok(result) => self.splice_result(&key, &raw_text, result),
                Err(err) => {
                    self.fail(&key, &raw_text, err);
                    false
                }
            },
            None => false,
        };
        self.pump();
        changed
    }

    fn splice_result(&mut self, key: &str, raw_text: &str, result: ResolutionResult) -> bool {
        let expansion = splice::expansion_for(raw_text, result.display_reference.as_deref(), &result.resolved_text);
        let protected = self.state.expanded_regions();

        let Some(spliced) = splice::apply(&self.state.current_text, raw_text, &expansion, &protected) else {
            log::debug!("{raw_text:?} is no longer in the text, dropping its resolution");
            // Forget the entry instead of leaving it `resolving` forever, so
            // typing the citation again is a fresh detection.
            self.state.citations.shift_remove(key);
            self.metrics.stale += 1;
            self.emit(CitationEvent::Dropped { key: key.to_string() });
            return false;
        };

        log::debug!("expanded {raw_text:?} at {}..{}", spliced.region.start, spliced.region.end);
        self.state.previous_text = std::mem::replace(&mut self.state.current_text, spliced.text);
        self.state.last_programmatic_edit = Some(self.state.current_text.clone());
        if let Some(citation) = self.state.citations.get_mut(key) {
            citation.status = CitationStatus::Resolved;
            citation.expansion = Some(expansion);
            citation.last_error = None;
        }
        self.metrics.resolved += 1;

        let reference = result.display_reference.as_deref().unwrap_or(raw_text);
        self.notifier.notify(NotifyKind::Success, &format!("Expanded {reference}"));
        self.emit_status(key);
        true
    }

    fn fail(&mut self, key: &str, raw_text: &str, err: ResolveError) {
        log::debug!("resolution of {raw_text:?} failed: {err}");
        let message = match err.kind() {
            FailureKind::UnknownCitation => format!("Could not expand {raw_text}: {err}"),
            FailureKind::TransientLookup => format!("Could not look up {raw_text} ({err}), use Expand to retry"),
        };
        if let Some(citation) = self.state.citations.get_mut(key) {
            citation.status = CitationStatus::Failed;
            citation.last_error = Some(err);
        }
        self.metrics.failed += 1;
        self.notifier.notify(NotifyKind::Error, &message);
        self.emit_status(key);
    }

    fn emit_status(&mut self, key: &str) {
        let Some(citation) = self.state.citations.get(key) else {
            return;
        };
        let event = CitationEvent::StatusChanged {
            key: key.to_string(),
            raw_text: citation.raw_text.clone(),
            status: citation.status,
        };
        self.emit(event);
    }

    fn emit(&mut self, event: CitationEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }
}

/// A span is settled once something other than a range/verse continuation
/// follows it.
fn is_settled(text: &str, end: usize) -> bool {
    match text[end..].chars().next() {
        Some(c) => !(c == '-' || c == '–' || c == ':' || c.is_ascii_digit()),
        None => false,
    }
}
