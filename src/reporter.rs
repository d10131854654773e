//! The outbound side: where rendered entries go.
//!
//! A [`Reporter`] is the external test-reporting service. It is assumed to be
//! reliable and fire-and-forget, so none of its methods return errors.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::markdown::ReportEntry;

/// Severity of a report entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "TRACE" => Ok(Self::Trace),
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "FATAL" => Ok(Self::Fatal),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Status of a step opened in the reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemStatus {
    Info,
    Passed,
    Failed,
    Skipped,
    Warn,
}

/// Binary payload of a report entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// The external reporting service.
pub trait Reporter: Send + Sync {
    fn emit_log(&self, message: &str, level: LogLevel, time: DateTime<Utc>);

    fn emit_binary(&self, message: &str, attachment: &Attachment, level: LogLevel, time: DateTime<Utc>);

    /// Open a nested step; entries until [`close_step`](Self::close_step)
    /// belong to it.
    fn open_step(&self, status: ItemStatus, title: &str);

    fn close_step(&self);
}

// ---------------------------------------------------------------------------
// Emission
// ---------------------------------------------------------------------------

/// Hands out timestamps that never repeat within one emission sequence.
///
/// Each timestamp is the wall clock, or one millisecond after the previous
/// one if the clock has not moved on.
#[derive(Debug, Default)]
pub(crate) struct EntryClock {
    last: Option<DateTime<Utc>>,
}

impl EntryClock {
    pub(crate) fn next(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let time = match self.last {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last = Some(time);
        time
    }
}

/// Send rendered entries to `reporter` in order.
///
/// Error entries are always emitted at [`LogLevel::Error`]; steps are opened
/// with [`ItemStatus::Info`].
pub fn emit_entries(reporter: &dyn Reporter, entries: &[ReportEntry], level: LogLevel) {
    let mut clock = EntryClock::default();
    for entry in entries {
        match entry {
            ReportEntry::Text(message) => reporter.emit_log(message, level, clock.next()),
            ReportEntry::Binary { message, attachment } => {
                reporter.emit_binary(message, attachment, level, clock.next());
            }
            ReportEntry::Error(message) => reporter.emit_log(message, LogLevel::Error, clock.next()),
            ReportEntry::OpenStep(title) => reporter.open_step(ItemStatus::Info, title),
            ReportEntry::CloseStep => reporter.close_step(),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// One call received by a [`RecordingReporter`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Log {
        message: String,
        level: LogLevel,
        time: DateTime<Utc>,
    },
    Binary {
        message: String,
        attachment: Attachment,
        level: LogLevel,
        time: DateTime<Utc>,
    },
    OpenStep {
        status: ItemStatus,
        title: String,
    },
    CloseStep,
}

/// Keeps every call in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    records: Mutex<Vec<Record>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far.
    pub fn records(&self) -> Vec<Record> {
        self.lock().clone()
    }

    /// Drain the recorded calls.
    pub fn take(&self) -> Vec<Record> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Record>> {
        // A panic while pushing cannot leave the vector half-written.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, record: Record) {
        self.lock().push(record);
    }
}

impl Reporter for RecordingReporter {
    fn emit_log(&self, message: &str, level: LogLevel, time: DateTime<Utc>) {
        self.push(Record::Log {
            message: message.to_string(),
            level,
            time,
        });
    }

    fn emit_binary(&self, message: &str, attachment: &Attachment, level: LogLevel, time: DateTime<Utc>) {
        self.push(Record::Binary {
            message: message.to_string(),
            attachment: attachment.clone(),
            level,
            time,
        });
    }

    fn open_step(&self, status: ItemStatus, title: &str) {
        self.push(Record::OpenStep {
            status,
            title: title.to_string(),
        });
    }

    fn close_step(&self) {
        self.push(Record::CloseStep);
    }
}

// ---------------------------------------------------------------------------
// TracingReporter
// ---------------------------------------------------------------------------

/// Forwards every entry to `tracing` under the `wirelog::report` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn emit_log(&self, message: &str, level: LogLevel, time: DateTime<Utc>) {
        match level {
            LogLevel::Trace => trace!(target: "wirelog::report", %time, "{message}"),
            LogLevel::Debug => debug!(target: "wirelog::report", %time, "{message}"),
            LogLevel::Info => info!(target: "wirelog::report", %time, "{message}"),
            LogLevel::Warn => warn!(target: "wirelog::report", %time, "{message}"),
            LogLevel::Error | LogLevel::Fatal => error!(target: "wirelog::report", %time, "{message}"),
        }
    }

    fn emit_binary(&self, message: &str, attachment: &Attachment, level: LogLevel, time: DateTime<Utc>) {
        let message = format!(
            "{message}\n[attachment: {}, {} bytes]",
            attachment.mime_type,
            attachment.data.len()
        );
        self.emit_log(&message, level, time);
    }

    fn open_step(&self, status: ItemStatus, title: &str) {
        info!(target: "wirelog::report", ?status, "step: {title}");
    }

    fn close_step(&self) {
        info!(target: "wirelog::report", "step closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_strictly_increasing() {
        let mut clock = EntryClock::default();
        let mut previous = clock.next();
        for _ in 0..100 {
            let next = clock.next();
            assert!(next > previous);
            previous = next;
        }
    }

    #[test]
    fn error_entries_use_error_level() {
        let reporter = RecordingReporter::new();
        let entries = vec![
            ReportEntry::Text("head".into()),
            ReportEntry::Error("Unable to read file".into()),
        ];
        emit_entries(&reporter, &entries, LogLevel::Debug);
        let levels: Vec<LogLevel> = reporter
            .records()
            .into_iter()
            .filter_map(|r| match r {
                Record::Log { level, .. } => Some(level),
                _ => None,
            })
            .collect();
        assert_eq!(levels, [LogLevel::Debug, LogLevel::Error]);
    }

    #[test]
    fn steps_are_opened_with_info_status() {
        let reporter = RecordingReporter::new();
        let entries = vec![ReportEntry::OpenStep("title".into()), ReportEntry::CloseStep];
        emit_entries(&reporter, &entries, LogLevel::Info);
        assert_eq!(
            reporter.take(),
            [
                Record::OpenStep {
                    status: ItemStatus::Info,
                    title: "title".into(),
                },
                Record::CloseStep,
            ]
        );
        assert!(reporter.records().is_empty());
    }

    #[test]
    fn log_level_parses_case_insensitively() {
        assert_eq!("warn".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("ERROR".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Fatal.to_string(), "FATAL");
    }
}
