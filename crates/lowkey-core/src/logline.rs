//! Human log-line format
//!
//! The daemon's change log is line-oriented:
//! `[YYYY-MM-DD HH:MM:SS] [TYPE] <rel-path>[ (N bytes | ±N bytes)]`
//! with TYPE one of NEW, MODIFIED, DELETED. The CLI summary command parses
//! these lines back, so formatting and parsing live together.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::domain::Change;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Renders a change as one log line, with the path shown relative to its
/// watch root when one matches.
pub fn format_line(change: &Change, roots: &[PathBuf]) -> String {
    let shown = roots
        .iter()
        .find_map(|root| change.path.strip_prefix(root).ok())
        .unwrap_or(&change.path);

    let mut line = format!(
        "[{}] [{}] {}",
        change.timestamp.format(TIMESTAMP_FORMAT),
        change.kind.label(),
        shown.display()
    );

    if let Some(delta) = change.size_delta {
        line.push_str(&format!(" ({delta:+} bytes)"));
    } else if let Some(size) = change.size {
        line.push_str(&format!(" ({size} bytes)"));
    }
    line
}

/// One parsed log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Timestamp parsed from the leading bracket group, interpreted as UTC
    pub timestamp: DateTime<Utc>,
    /// The TYPE label (NEW, MODIFIED, DELETED, ...)
    pub label: String,
    /// Everything after the type bracket, path plus optional size note
    pub detail: String,
}

/// Parses one log line; `None` for anything that does not match the shape.
pub fn parse_line(line: &str) -> Option<LogRecord> {
    let rest = line.strip_prefix('[')?;
    let (stamp, rest) = rest.split_once(']')?;
    let rest = rest.trim_start().strip_prefix('[')?;
    let (label, detail) = rest.split_once(']')?;

    let timestamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .ok()?
        .and_utc();

    Some(LogRecord {
        timestamp,
        label: label.to_string(),
        detail: detail.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ChangeKind;
    use chrono::TimeZone;

    fn at_noon(change: Change) -> Change {
        change.at(Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_format_create_line() {
        let change = at_noon(
            Change::new(PathBuf::from("/watch/d/sample.txt"), ChangeKind::Create).with_size(5),
        );
        let line = format_line(&change, &[PathBuf::from("/watch/d")]);
        assert_eq!(line, "[2026-03-14 12:00:00] [NEW] sample.txt (5 bytes)");
    }

    #[test]
    fn test_format_modify_line_uses_signed_delta() {
        let change = at_noon(
            Change::new(PathBuf::from("/watch/d/sample.txt"), ChangeKind::Modify)
                .with_size(11)
                .with_old_size(5),
        );
        let line = format_line(&change, &[PathBuf::from("/watch/d")]);
        assert_eq!(
            line,
            "[2026-03-14 12:00:00] [MODIFIED] sample.txt (+6 bytes)"
        );
    }

    #[test]
    fn test_format_delete_line_has_no_size() {
        let change = at_noon(Change::new(
            PathBuf::from("/watch/d/gone.txt"),
            ChangeKind::Delete,
        ));
        let line = format_line(&change, &[PathBuf::from("/watch/d")]);
        assert_eq!(line, "[2026-03-14 12:00:00] [DELETED] gone.txt");
    }

    #[test]
    fn test_unmatched_root_keeps_absolute_path() {
        let change = at_noon(Change::new(
            PathBuf::from("/elsewhere/f.txt"),
            ChangeKind::Create,
        ));
        let line = format_line(&change, &[PathBuf::from("/watch/d")]);
        assert!(line.ends_with("/elsewhere/f.txt"));
    }

    #[test]
    fn test_parse_round_trip() {
        let change = at_noon(
            Change::new(PathBuf::from("/watch/d/sample.txt"), ChangeKind::Create).with_size(5),
        );
        let line = format_line(&change, &[PathBuf::from("/watch/d")]);

        let record = parse_line(&line).expect("parses");
        assert_eq!(record.label, "NEW");
        assert_eq!(record.timestamp, change.timestamp);
        assert!(record.detail.starts_with("sample.txt"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_line("").is_none());
        assert!(parse_line("not a log line").is_none());
        assert!(parse_line("[bad stamp] [NEW] x").is_none());
    }
}
