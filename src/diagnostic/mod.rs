//! bGeigie diagnostic session handling
//!
//! This module provides:
//! - Line sources for serial ports, captured logs and stdin
//! - The session parser that fills a [`DiagnosticRecord`]
//! - The evaluator that turns a record into subsystem verdicts

pub mod evaluate;
pub mod fields;
pub mod parser;
pub mod record;
pub mod source;

pub use evaluate::{evaluate, DiagnosticReport};
pub use parser::{DiagnosticParser, DiagnosticSession};
pub use record::{DiagnosticRecord, Reading};
pub use source::ReaderSource;
#[cfg(feature = "serial")]
pub use source::{CaptureSource, LineSource};

use fields::FieldWarning;
use thiserror::Error;

/// Session-level failures
#[derive(Debug, Error)]
pub enum DiagnosticError {
    /// No start or end marker within the session window. `warnings` holds
    /// the field warnings raised before the session stalled.
    #[error("diagnostic session timed out ({})", missing_marker(.started))]
    Timeout {
        started: bool,
        warnings: Vec<FieldWarning>,
    },

    #[error("failed to read diagnostic stream: {0}")]
    Io(#[from] std::io::Error),
}

fn missing_marker(started: &bool) -> &'static str {
    if *started {
        "no end marker"
    } else {
        "no start marker"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evaluate::Subsystem;
    use parser::{END_MARKER, START_MARKER};
    use std::io::Cursor;

    const HEALTHY_SESSION: &[&str] = &[
        "noise",
        START_MARKER,
        "Radio enabled,yes",
        "Radio initialized,yes",
        "GPS type MTK,yes",
        "GPS system startup,yes",
        "SD inserted,yes",
        "SD initialized,yes",
        "SD open file,yes",
        "SD read write,yes",
        "SD reader enabled,yes",
        "Power management enabled,yes",
        "Command line interface enabled,yes",
        "Coordinate truncation enabled,yes",
        END_MARKER,
    ];

    fn report_for(lines: &[&str]) -> DiagnosticReport {
        let text: String = lines.iter().map(|l| format!("{}\r\n", l)).collect();
        let session = DiagnosticParser::new()
            .run(ReaderSource::new(Cursor::new(text)))
            .unwrap();
        evaluate(&session.record)
    }

    fn without(skip: &[&str]) -> Vec<&'static str> {
        HEALTHY_SESSION
            .iter()
            .copied()
            .filter(|l| !skip.contains(l))
            .collect()
    }

    #[test]
    fn test_healthy_device_is_ready() {
        let report = report_for(HEALTHY_SESSION);
        assert!(report.verdicts.iter().all(|v| v.passed()));
        assert!(report.ready);
        assert_eq!(report.result_line(), "Result : bGeigie ready for operation.");
    }

    #[test]
    fn test_radio_not_enabled_is_faulty() {
        let report = report_for(&without(&["Radio enabled,yes"]));
        assert_eq!(
            report.verdict(Subsystem::Radio).unwrap().failures,
            vec!["Radio not enabled"]
        );
        assert!(!report.ready);
        assert_eq!(report.result_line(), "Result : bGeigie faulty.");
    }

    #[test]
    fn test_every_missing_feature_listed() {
        let report = report_for(&without(&[
            "Power management enabled,yes",
            "Coordinate truncation enabled,yes",
        ]));
        assert_eq!(
            report.verdict(Subsystem::Features).unwrap().failures,
            vec!["Power Management required", "Coordination Truncation required"]
        );
        assert!(!report.ready);
    }

    #[test]
    fn test_replay_capture_file() {
        let capture = include_str!("../../demos/coordinate-truncation-off.log");
        let session = DiagnosticParser::new()
            .run(ReaderSource::new(Cursor::new(capture)))
            .unwrap();

        assert_eq!(session.record.device_id(), Some("1107"));
        assert_eq!(session.record.reading(Reading::BatteryVoltage), 4051);
        assert_eq!(session.record.reading(Reading::FreeRam), 812);

        let report = evaluate(&session.record);
        assert_eq!(
            report.verdict(Subsystem::Features).unwrap().failures,
            vec!["Coordination Truncation required"]
        );
        assert!(report.verdict(Subsystem::SdReader).unwrap().passed());
        assert!(!report.ready);
    }

    #[test]
    fn test_timeout_message() {
        let err = DiagnosticError::Timeout {
            started: true,
            warnings: Vec::new(),
        };
        assert_eq!(err.to_string(), "diagnostic session timed out (no end marker)");
    }
}
