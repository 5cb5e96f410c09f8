//! User feedback collaborators: transient notices and the busy indicator.
//!
//! Both are optional. [`Feedback`] always logs through `tracing` and forwards
//! to whichever collaborators are present.

use std::sync::Arc;

use tracing::{error, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// Non-blocking notice surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);
}

/// A shown busy indicator. Destroyed exactly once.
pub trait BusyHandle: Send {
    fn destroy(&mut self);
}

/// Full-screen busy indicator factory.
pub trait BusyIndicator: Send + Sync {
    fn create(&self, description: &str) -> Box<dyn BusyHandle>;
}

/// Destroys the wrapped busy indicator when dropped.
pub struct BusyGuard(Option<Box<dyn BusyHandle>>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if let Some(mut handle) = self.0.take() {
            handle.destroy();
        }
    }
}

#[derive(Clone, Default)]
pub struct Feedback {
    notifier: Option<Arc<dyn Notifier>>,
    busy: Option<Arc<dyn BusyIndicator>>,
}

impl Feedback {
    pub fn new(
        notifier: Option<Arc<dyn Notifier>>,
        busy: Option<Arc<dyn BusyIndicator>>,
    ) -> Self {
        Self { notifier, busy }
    }

    pub fn warning(&self, message: &str) {
        warn!(notice = message, "user notice");
        self.forward(NoticeLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        error!(notice = message, "user notice");
        self.forward(NoticeLevel::Error, message);
    }

    /// Show the busy indicator until the returned guard is dropped.
    pub fn busy(&self, description: &str) -> BusyGuard {
        BusyGuard(self.busy.as_ref().map(|b| b.create(description)))
    }

    fn forward(&self, level: NoticeLevel, message: &str) {
        if let Some(notifier) = &self.notifier {
            notifier.notify(level, message);
        }
    }
}
