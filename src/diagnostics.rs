//! # Diagnostics
//!
//! Sink for messages produced while importing assets or running the scene. The sink is passed
//! explicitly to whoever reports through it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;

/// # Severity
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Severity {
    /// Informational message.
    Info,
    /// Something is wrong but the operation continued.
    Warning,
    /// The operation failed.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => f.write_str("INFO"),
            Severity::Warning => f.write_str("WARNING"),
            Severity::Error => f.write_str("ERROR"),
        }
    }
}

/// # Diagnostics
pub trait Diagnostics {
    /// Reports a message.
    fn log(&self, message: &str, severity: Severity);
}

/// Forwards every message to the [log] facade.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn log(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info => log::info!("{message}"),
            Severity::Warning => log::warn!("{message}"),
            Severity::Error => log::error!("{message}"),
        }
    }
}

/// # Buffered Diagnostics
///
/// Keeps the most recent messages in memory, e.g. for an in-game console, and forwards each one to
/// the [log] facade.
#[derive(Debug)]
pub struct BufferedDiagnostics {
    capacity: usize,
    lines: RefCell<VecDeque<(Severity, String)>>,
}

impl BufferedDiagnostics {
    /// Number of lines kept by [BufferedDiagnostics::default].
    pub const DEFAULT_CAPACITY: usize = 30;

    /// Returns a buffer keeping at most `capacity` lines.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lines: RefCell::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Returns the buffered lines, oldest first.
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.borrow().iter().cloned().collect()
    }

    /// Returns true if any buffered line has the severity and contains the text.
    pub fn contains(&self, severity: Severity, text: &str) -> bool {
        self.lines
            .borrow()
            .iter()
            .any(|(s, line)| *s == severity && line.contains(text))
    }

    /// Returns the buffered lines formatted as `SEVERITY: message`, one per line.
    pub fn to_text(&self) -> String {
        self.lines
            .borrow()
            .iter()
            .map(|(severity, line)| format!("{severity}: {line}\n"))
            .collect()
    }

    /// Removes every buffered line.
    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }
}

impl Default for BufferedDiagnostics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl Diagnostics for BufferedDiagnostics {
    fn log(&self, message: &str, severity: Severity) {
        LogDiagnostics.log(message, severity);

        if self.capacity == 0 {
            return;
        }

        let mut lines = self.lines.borrow_mut();
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back((severity, message.to_string()));
    }
}
