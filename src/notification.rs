use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

impl NotificationKind {
    pub fn icon(self) -> &'static str {
        match self {
            NotificationKind::Info => "ℹ",
            NotificationKind::Success => "✓",
            NotificationKind::Error => "✗",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    expires_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// The single toast slot. A new notification replaces the current one.
#[derive(Debug, Clone)]
pub struct Notifier {
    ttl: Duration,
    current: Option<Notification>,
}

impl Notifier {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, current: None }
    }

    pub fn show(&mut self, kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) {
        self.show_at(kind, title, message, Instant::now());
    }

    pub fn show_at(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        now: Instant,
    ) {
        self.current = Some(Notification {
            kind,
            title: title.into(),
            message: message.into(),
            expires_at: now + self.ttl,
        });
    }

    pub fn info(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.show(NotificationKind::Info, title, message);
    }

    pub fn success(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.show(NotificationKind::Success, title, message);
    }

    pub fn error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.show(NotificationKind::Error, title, message);
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    /// Returns whether something was dismissed.
    pub fn dismiss(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Drops the notification once its time is up. Returns whether it did.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.current.as_ref().is_some_and(|current| current.is_expired(now)) {
            self.current = None;
            return true;
        }
        false
    }
}
