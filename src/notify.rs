//! In-process notification channel, the library-side stand-in for UI toasts.

use tokio::sync::broadcast;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A user-facing notice. `link` is a deep link the UI may attach to the
/// notice's action (e.g. `/item/{id}`).
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub link: Option<String>,
}

/// Fan-out sender for notices. Notices published with no listeners are
/// dropped, matching fire-and-forget toast semantics.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notice>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(64);
        Self { sender }
    }

    /// Receive notices published after this call.
    pub fn listen(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Info, message.into(), None);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into(), None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.publish(NoticeLevel::Error, message.into(), None);
    }

    pub fn info_with_link(&self, message: impl Into<String>, link: impl Into<String>) {
        self.publish(NoticeLevel::Info, message.into(), Some(link.into()));
    }

    pub fn success_with_link(&self, message: impl Into<String>, link: impl Into<String>) {
        self.publish(NoticeLevel::Success, message.into(), Some(link.into()));
    }

    fn publish(&self, level: NoticeLevel, message: String, link: Option<String>) {
        let _ = self.sender.send(Notice {
            level,
            message,
            link,
        });
    }
}
