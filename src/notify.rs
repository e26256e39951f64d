//! Transient user-facing notices and the loading indicator.
//!
//! Notices expire after a fixed TTL; nothing else is remembered. Every notice
//! is also written to the log.

use std::cell::RefCell;
use std::time::{Duration, Instant};

pub const DEFAULT_NOTICE_TTL: Duration = Duration::from_millis(3000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub shown_at: Instant,
}

/// Host-side presentation of notices and the loading indicator.
pub trait StatusObserver {
    fn notice(&self, notice: &Notice);

    /// `Some(message)` shows the loading indicator, `None` hides it.
    fn loading(&self, message: Option<&str>);
}

pub struct NotificationCenter {
    ttl: Duration,
    notices: RefCell<Vec<Notice>>,
    loading: RefCell<Option<String>>,
    observer: Option<Box<dyn StatusObserver>>,
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            notices: RefCell::new(Vec::new()),
            loading: RefCell::new(None),
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn StatusObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = Notice {
            level,
            message: message.into(),
            shown_at: Instant::now(),
        };
        match level {
            NoticeLevel::Error => log::error!("{}", notice.message),
            NoticeLevel::Success | NoticeLevel::Info => log::info!("{}", notice.message),
        }
        if let Some(observer) = &self.observer {
            observer.notice(&notice);
        }
        let now = notice.shown_at;
        let mut notices = self.notices.borrow_mut();
        notices.retain(|shown| now.saturating_duration_since(shown.shown_at) < self.ttl);
        notices.push(notice);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Error, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.notify(NoticeLevel::Info, message);
    }

    pub fn show_loading(&self, message: &str) {
        *self.loading.borrow_mut() = Some(message.to_string());
        if let Some(observer) = &self.observer {
            observer.loading(Some(message));
        }
    }

    pub fn hide_loading(&self) {
        if self.loading.borrow_mut().take().is_some() {
            if let Some(observer) = &self.observer {
                observer.loading(None);
            }
        }
    }

    pub fn loading_message(&self) -> Option<String> {
        self.loading.borrow().clone()
    }

    /// Notices still on screen at `now`. Expired ones are dismissed.
    pub fn active_at(&self, now: Instant) -> Vec<Notice> {
        let mut notices = self.notices.borrow_mut();
        notices.retain(|notice| now.saturating_duration_since(notice.shown_at) < self.ttl);
        notices.clone()
    }

    pub fn active(&self) -> Vec<Notice> {
        self.active_at(Instant::now())
    }

    /// Message of the most recent notice still on screen.
    pub fn latest(&self) -> Option<String> {
        self.active().last().map(|notice| notice.message.clone())
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_TTL)
    }
}
