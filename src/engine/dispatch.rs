//! Resolution dispatch.
//!
//! The dispatcher owns the FIFO of citations waiting for a lookup and the one
//! lookup currently in flight. Only one resolution runs per field at a time,
//! so splices are applied strictly one after another and never race on the
//! same text.
//!
//! ```text
//! enqueue(key) ──▶ [queue] ──next_queued──▶ start() ──spawn──▶ ResolutionTask
//!                                                                 │
//!      field.apply_completion ◀── try_completion / next_completion ◀┘ (mpsc)
//! ```
//!
//! Each [`ResolutionTask`] carries a child of the dispatcher's root
//! [`CancellationToken`]. Cancelling the root (field disposal, or the
//! dispatcher being dropped) makes every outstanding task return without
//! sending anything back.

use crate::resolver::{ResolutionResult, ResolveError, Resolver};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A finished lookup on its way back to the field.
#[derive(Debug)]
pub(crate) struct Completion {
    pub key: String,
    pub outcome: Result<ResolutionResult, ResolveError>,
}

/// One lookup, detached from the field that asked for it.
#[derive(Debug)]
pub(crate) struct ResolutionTask {
    key: String,
    citation: String,
    token: CancellationToken,
}

impl ResolutionTask {
    async fn run(self, resolver: Arc<dyn Resolver>, timeout: Option<Duration>, tx: mpsc::UnboundedSender<Completion>) {
        let ResolutionTask { key, citation, token } = self;
        let lookup = async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, resolver.resolve(&citation))
                    .await
                    .unwrap_or(Err(ResolveError::Timeout(limit))),
                None => resolver.resolve(&citation).await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => {
                log::debug!("resolution of {key:?} cancelled");
                return;
            }
            outcome = lookup => outcome,
        };

        if tx.send(Completion { key, outcome }).is_err() {
            log::debug!("field went away before its resolution arrived");
        }
    }
}

#[derive(Debug)]
pub(crate) struct Dispatcher {
    queue: VecDeque<String>,
    in_flight: Option<String>,
    tx: mpsc::UnboundedSender<Completion>,
    rx: mpsc::UnboundedReceiver<Completion>,
    root: CancellationToken,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(timeout: Option<Duration>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Dispatcher { queue: VecDeque::new(), in_flight: None, tx, rx, root: CancellationToken::new(), timeout }
    }

    /// Queue `key` unless it is already queued or in flight.
    pub fn enqueue(&mut self, key: &str) -> bool {
        if self.is_pending(key) {
            return false;
        }
        self.queue.push_back(key.to_string());
        true
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.in_flight.as_deref() == Some(key) || self.queue.iter().any(|k| k == key)
    }

    pub fn in_flight(&self) -> Option<&str> {
        self.in_flight.as_deref()
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Next key to start, or `None` while a lookup is still running.
    pub fn next_queued(&mut self) -> Option<String> {
        if self.in_flight.is_some() {
            return None;
        }
        self.queue.pop_front()
    }

    /// Spawn the lookup for `key` on the current tokio runtime.
    ///
    /// Without a runtime the lookup fails straight away with a network error,
    /// which the field reports like any other failed lookup.
    pub fn start(&mut self, key: String, citation: String, resolver: Arc<dyn Resolver>) {
        let task = ResolutionTask { key: key.clone(), citation, token: self.root.child_token() };
        self.in_flight = Some(key);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(task.run(resolver, self.timeout, self.tx.clone()));
            }
            Err(_) => {
                log::warn!("no tokio runtime, failing resolution of {:?}", task.citation);
                let outcome = Err(ResolveError::Network("no async runtime available".to_string()));
                let _ = self.tx.send(Completion { key: task.key, outcome });
            }
        }
    }

    /// A completion that has already arrived, without waiting.
    pub fn try_completion(&mut self) -> Option<Completion> {
        while let Ok(completion) = self.rx.try_recv() {
            if self.accept(&completion) {
                return Some(completion);
            }
        }
        None
    }

    /// Wait for the in-flight lookup. Returns `None` right away when idle.
    ///
    /// Cancel safe: nothing is consumed unless a completion is returned.
    pub async fn next_completion(&mut self) -> Option<Completion> {
        while self.in_flight.is_some() {
            let completion = self.rx.recv().await?;
            if self.accept(&completion) {
                return Some(completion);
            }
        }
        None
    }

    fn accept(&mut self, completion: &Completion) -> bool {
        if self.in_flight.as_deref() == Some(completion.key.as_str()) {
            self.in_flight = None;
            true
        } else {
            log::debug!("ignoring unexpected completion for {:?}", completion.key);
            false
        }
    }

    /// Cancel every outstanding lookup and forget the queue.
    ///
    /// Returns how many lookups (running or queued) were abandoned.
    pub fn cancel_all(&mut self) -> usize {
        self.root.cancel();
        let abandoned = self.queue.len() + usize::from(self.in_flight.is_some());
        self.queue.clear();
        self.in_flight = None;
        while self.rx.try_recv().is_ok() {}
        abandoned
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.root.cancel();
    }
}
