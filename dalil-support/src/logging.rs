//! Logging contract for locator events.
//!
//! The locator never writes to a sink directly. It reports plain string
//! events at four severities to a [`Logger`], and never looks at what the
//! logger does with them.
//!
//! | Severity | Emitted for |
//! |----------|-------------|
//! | debug    | `Get service: X`, `Build service: X`, `Service ok: X` |
//! | warn     | duplicate registrations and config insertions |
//! | error    | recoverable failures (lenient mode) |
//! | fatal    | strict-mode hard stops |

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

/// Target used for every event forwarded by [`TracingLogger`].
pub const LOG_TARGET: &str = "dalil";

/// Severity of a logged event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Debug,
    Warn,
    Error,
    Fatal,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Debug => write!(f, "DEBUG"),
            Level::Warn => write!(f, "WARN"),
            Level::Error => write!(f, "ERROR"),
            Level::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Receives locator events.
///
/// Implement this to route events into your own logging setup.
/// The default is [`TracingLogger`].
pub trait Logger {
    fn debug(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
    fn fatal(&self, message: &str);

    /// Dispatches to the method matching `level`.
    fn log(&self, level: Level, message: &str) {
        match level {
            Level::Debug => self.debug(message),
            Level::Warn => self.warn(message),
            Level::Error => self.error(message),
            Level::Fatal => self.fatal(message),
        }
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn debug(&self, message: &str) {
        (**self).debug(message);
    }

    fn warn(&self, message: &str) {
        (**self).warn(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }

    fn fatal(&self, message: &str) {
        (**self).fatal(message);
    }
}

/// Forwards events to [`tracing`] under the `dalil` target.
///
/// `fatal` has no tracing counterpart, so it is emitted at ERROR level
/// with `fatal = true`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: LOG_TARGET, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: LOG_TARGET, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: LOG_TARGET, "{message}");
    }

    fn fatal(&self, message: &str) {
        tracing::error!(target: LOG_TARGET, fatal = true, "{message}");
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn fatal(&self, _message: &str) {}
}

/// Keeps every event in memory.
///
/// Share it through an `Arc` to inspect what the locator reported:
///
/// ```
/// use std::sync::Arc;
/// use dalil_support::logging::{Level, Logger, MemoryLogger};
///
/// let logger = Arc::new(MemoryLogger::new());
/// logger.warn("service already exists: db");
///
/// assert_eq!(logger.count(Level::Warn), 1);
/// assert!(logger.contains(Level::Warn, "db"));
/// ```
#[derive(Debug, Default)]
pub struct MemoryLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all recorded events, oldest first.
    pub fn records(&self) -> Vec<(Level, String)> {
        self.records.lock().clone()
    }

    /// Returns the messages recorded at `level`, oldest first.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Number of events recorded at `level`.
    pub fn count(&self, level: Level) -> usize {
        self.records.lock().iter().filter(|(l, _)| *l == level).count()
    }

    /// Returns `true` if some event at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.records
            .lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    fn push(&self, level: Level, message: &str) {
        self.records.lock().push((level, message.to_string()));
    }
}

impl Logger for MemoryLogger {
    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }

    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }

    fn fatal(&self, message: &str) {
        self.push(Level::Fatal, message);
    }
}
