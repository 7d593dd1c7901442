//! User-facing notifications and upload progress.
//!
//! Every pipeline step reports to a [`Notifier`] instead of returning errors
//! to its caller. The CLI prints to the terminal; the dashboard collects
//! notifications in memory and renders them as a banner.

use std::sync::Mutex;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

/// How long non-error notifications stay visible.
pub const AUTO_HIDE_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Errors stay until dismissed; everything else hides itself.
    pub fn auto_hide(&self) -> Option<Duration> {
        match self.level {
            Level::Error => None,
            _ => Some(AUTO_HIDE_AFTER),
        }
    }
}

/// Sink for notifications, progress updates and diagnostics.
pub trait Notifier {
    fn notify(&self, notification: Notification);

    /// Set the progress bar to `percent` (0 hides it).
    fn progress(&self, percent: u8);

    /// Developer-facing diagnostic, the equivalent of a console error.
    fn diagnostic(&self, message: &str) {
        eprintln!("{}", message.dimmed());
    }

    fn info(&self, message: &str) {
        self.notify(Notification::new(Level::Info, message));
    }

    fn success(&self, message: &str) {
        self.notify(Notification::new(Level::Success, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::new(Level::Error, message));
    }
}

// ---------------------------------------------------------------------------
// Terminal
// ---------------------------------------------------------------------------

/// Prints notifications to the terminal. Errors go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    /// Suppress info/progress chatter (used by `--format json`).
    pub quiet: bool,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let msg = &notification.message;
        match notification.level {
            Level::Error => eprintln!("{} {}", "✗".red().bold(), msg.red()),
            Level::Warning => eprintln!("{} {}", "!".yellow().bold(), msg.yellow()),
            Level::Success if !self.quiet => println!("{} {}", "✓".green().bold(), msg),
            Level::Info if !self.quiet => println!("{} {}", "·".cyan(), msg.dimmed()),
            _ => {}
        }
    }

    fn progress(&self, percent: u8) {
        if self.quiet || percent == 0 {
            return;
        }
        let filled = usize::from(percent.min(100)) / 5;
        println!(
            "  [{}{}] {:>3}%",
            "#".repeat(filled).green(),
            "-".repeat(20 - filled).dimmed(),
            percent
        );
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Collects notifications and the progress trail. Used by the dashboard to
/// render the banner, and by tests to assert on what the user saw.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notifications: Mutex<Vec<Notification>>,
    progress: Mutex<Vec<u8>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn progress_trail(&self) -> Vec<u8> {
        self.progress.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn last_progress(&self) -> Option<u8> {
        self.progress_trail().last().copied()
    }

    pub fn has_error(&self) -> bool {
        self.notifications()
            .iter()
            .any(|n| n.level == Level::Error)
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        if let Ok(mut list) = self.notifications.lock() {
            list.push(notification);
        }
    }

    fn progress(&self, percent: u8) {
        if let Ok(mut trail) = self.progress.lock() {
            trail.push(percent);
        }
    }

    fn diagnostic(&self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_sticky() {
        assert_eq!(Notification::new(Level::Error, "x").auto_hide(), None);
        assert_eq!(
            Notification::new(Level::Success, "x").auto_hide(),
            Some(AUTO_HIDE_AFTER)
        );
    }

    #[test]
    fn memory_notifier_records_everything() {
        let n = MemoryNotifier::new();
        n.info("uploading");
        n.progress(30);
        n.error("boom");
        n.progress(0);

        assert_eq!(n.notifications().len(), 2);
        assert!(n.has_error());
        assert_eq!(n.progress_trail(), vec![30, 0]);
        assert_eq!(n.last_progress(), Some(0));
    }
}
