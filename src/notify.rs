//! User-facing notifications.
//!
//! Fire-and-forget: the engine never waits on a notifier and never looks at
//! whether delivery worked. Implementations must not block.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    Success,
    Error,
}

impl fmt::Display for NotifyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NotifyKind::Success => "success",
            NotifyKind::Error => "error",
        })
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotifyKind, message: &str);
}

/// Routes notifications to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NotifyKind, message: &str) {
        match kind {
            NotifyKind::Success => log::info!("{message}"),
            NotifyKind::Error => log::warn!("{message}"),
        }
    }
}
