use std::fmt;

use chrono::{Datelike, NaiveDateTime, Timelike};
use log::Level;

/// Severity attached to every line. Only selects the printed label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Debug,
    Warning,
    Error,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Info,
        Severity::Debug,
        Severity::Warning,
        Severity::Error,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Debug => "DEBUG",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Level> for Severity {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => Severity::Error,
            Level::Warn => Severity::Warning,
            Level::Info => Severity::Info,
            Level::Debug | Level::Trace => Severity::Debug,
        }
    }
}

/// A fully rendered log line waiting in the engine buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    severity: Severity,
    text: String,
}

impl LogEntry {
    /// Renders one line as
    /// `<seq>: <d>/<m>/<y> <h>:<m>:<s>\t<LABEL>:     <thread>:\t<message>`.
    ///
    /// Every entry but the first (sequence 0) is prefixed with `\r\n` so
    /// consecutive lines are separated by a blank line in the output.
    pub fn render(
        sequence: u64,
        time: NaiveDateTime,
        severity: Severity,
        thread: &str,
        message: &str,
    ) -> Self {
        let separator = if sequence == 0 { "" } else { "\r\n" };
        let text = format!(
            "{separator}{sequence}: {}/{}/{} {}:{}:{}\t{}:     {thread}:\t{message}",
            time.day(),
            time.month(),
            time.year(),
            time.hour(),
            time.minute(),
            time.second(),
            severity.label(),
        );
        Self { severity, text }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_labels() {
        let labels: Vec<_> = Severity::ALL.iter().map(|s| s.label()).collect();
        assert_eq!(labels, ["INFO", "DEBUG", "WARNING", "ERROR"]);
    }

    #[test]
    fn test_first_entry_has_no_separator() {
        let time = at(2024, 3, 7, 9, 5, 2);
        let entry = LogEntry::render(0, time, Severity::Info, "MainThread", "ready");
        assert_eq!(
            entry.text(),
            "0: 7/3/2024 9:5:2\tINFO:     MainThread:\tready"
        );
    }

    #[test]
    fn test_later_entries_are_separated() {
        let time = at(2023, 12, 31, 23, 59, 59);
        let entry = LogEntry::render(12, time, Severity::Warning, "", "disk low");
        assert_eq!(
            entry.text(),
            "\r\n12: 31/12/2023 23:59:59\tWARNING:     :\tdisk low"
        );
        assert_eq!(entry.severity(), Severity::Warning);
    }

    #[test]
    fn test_every_severity_label_is_rendered() {
        for severity in Severity::ALL {
            let entry = LogEntry::render(1, at(2024, 1, 1, 0, 0, 0), severity, "t", "m");
            assert!(entry.text().contains(&format!("\t{}:     t:\tm", severity.label())));
        }
    }

    #[test]
    fn test_from_log_level() {
        assert_eq!(Severity::from(Level::Error), Severity::Error);
        assert_eq!(Severity::from(Level::Warn), Severity::Warning);
        assert_eq!(Severity::from(Level::Info), Severity::Info);
        assert_eq!(Severity::from(Level::Debug), Severity::Debug);
        assert_eq!(Severity::from(Level::Trace), Severity::Debug);
    }
}
