use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cell::RefCell;
use std::time::{Duration, Instant};

use crate::notify::{Notice, NoticeLevel, StatusObserver};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
    disable_pretty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool, disable_pretty: bool) -> Self {
        Self {
            mode,
            is_tty,
            disable_pretty,
        }
    }

    pub fn from_args(ui_flag: Option<&str>, is_tty: bool, disable_pretty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty, disable_pretty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty
            && match self.mode {
                UiMode::Pretty => true,
                UiMode::Auto => !self.disable_pretty,
                UiMode::Plain => false,
            }
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            StageGuard::new(name.to_string(), Some(spinner(name)))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Observer that shows the loading indicator and notices on stderr.
    pub fn status(&self) -> TerminalStatus {
        TerminalStatus {
            pretty: self.use_pretty(),
            spinner: RefCell::new(None),
        }
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message(message.to_string());
    spinner
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let message = format!("✔ {} ({})", self.name, format_duration(elapsed));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

/// Loading indicator as a spinner (TTY) or `==>` lines, notices as one line each.
pub struct TerminalStatus {
    pretty: bool,
    spinner: RefCell<Option<ProgressBar>>,
}

impl StatusObserver for TerminalStatus {
    fn notice(&self, notice: &Notice) {
        let line = notice_line(notice);
        match &*self.spinner.borrow() {
            Some(spinner) => spinner.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn loading(&self, message: Option<&str>) {
        let mut current = self.spinner.borrow_mut();
        if let Some(spinner) = current.take() {
            spinner.finish_and_clear();
        }
        match message {
            Some(message) if self.pretty => *current = Some(spinner(message)),
            Some(message) => eprintln!("==> {}", message),
            None => {}
        }
    }
}

fn notice_line(notice: &Notice) -> String {
    let marker = match notice.level {
        NoticeLevel::Success => "✔",
        NoticeLevel::Error => "✖",
        NoticeLevel::Info => "ℹ",
    };
    format!("{marker} {}", notice.message)
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
