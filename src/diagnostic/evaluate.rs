//! Subsystem verdicts for a finished diagnostic record

use super::record::{DiagnosticRecord, Flag};

/// Cause reported when a subsystem fails without a matching check
pub const UNKNOWN_CAUSE: &str = "unknown";

/// Functional areas checked by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    Radio,
    Gps,
    SdStorage,
    SdReader,
    Features,
}

impl Subsystem {
    pub const ALL: [Subsystem; 5] = [
        Subsystem::Radio,
        Subsystem::Gps,
        Subsystem::SdStorage,
        Subsystem::SdReader,
        Subsystem::Features,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Subsystem::Radio => "Radio",
            Subsystem::Gps => "GPS",
            Subsystem::SdStorage => "SD card",
            Subsystem::SdReader => "SD Reader",
            Subsystem::Features => "Required features",
        }
    }

    /// Flags that must be set, in reporting order, with the failure text
    /// for each
    fn checks(self) -> &'static [(Flag, &'static str)] {
        match self {
            Subsystem::Radio => &[
                (Flag::RadioEnabled, "Radio not enabled"),
                (Flag::RadioInitialized, "Radio fails initialization"),
            ],
            Subsystem::Gps => &[
                (Flag::GpsTypeMtk, "Wrong GPS type (not MTK)"),
                (Flag::GpsStartup, "GPS Start test fails"),
            ],
            Subsystem::SdStorage => &[
                (Flag::SdInserted, "SD card not inserted"),
                (Flag::SdInitialized, "SD card initialization fails"),
                (Flag::SdFileOpen, "File open test fails"),
                (Flag::SdReadWrite, "Read/Write test fails"),
            ],
            // The reader is judged on the SD card init flag; the firmware's
            // own "SD reader initialized" line is not consulted.
            Subsystem::SdReader => &[
                (Flag::SdReaderEnabled, "SD Reader not enabled"),
                (Flag::SdInitialized, "SD Reader initialization fails"),
            ],
            Subsystem::Features => &[
                (Flag::PowerManagement, "Power Management required"),
                (Flag::CommandLineInterface, "Command Line Interface required"),
                (Flag::CoordinateTruncation, "Coordination Truncation required"),
            ],
        }
    }

    /// Whether every failing check is listed, rather than only the first
    pub fn lists_all_failures(self) -> bool {
        self == Subsystem::Features
    }
}

/// Verdict for one subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsystemVerdict {
    pub subsystem: Subsystem,
    /// Empty when the subsystem passed
    pub failures: Vec<&'static str>,
}

impl SubsystemVerdict {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Verdicts for every subsystem plus the overall result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticReport {
    pub verdicts: Vec<SubsystemVerdict>,
    pub ready: bool,
}

impl DiagnosticReport {
    #[cfg(test)]
    pub fn verdict(&self, subsystem: Subsystem) -> Option<&SubsystemVerdict> {
        self.verdicts.iter().find(|v| v.subsystem == subsystem)
    }

    /// Final summary line
    pub fn result_line(&self) -> &'static str {
        if self.ready {
            "Result : bGeigie ready for operation."
        } else {
            "Result : bGeigie faulty."
        }
    }
}

fn judge(subsystem: Subsystem, record: &DiagnosticRecord) -> SubsystemVerdict {
    let checks = subsystem.checks();
    let failed = checks.iter().any(|(flag, _)| !record.flag(*flag));

    let mut failures = Vec::new();
    if failed {
        let mut missing = checks
            .iter()
            .filter(|(flag, _)| !record.flag(*flag))
            .map(|(_, cause)| *cause);

        if subsystem.lists_all_failures() {
            failures.extend(missing);
        } else {
            failures.push(missing.next().unwrap_or(UNKNOWN_CAUSE));
        }
    }

    SubsystemVerdict { subsystem, failures }
}

/// Evaluate every subsystem. The device is ready only if all of them pass.
pub fn evaluate(record: &DiagnosticRecord) -> DiagnosticReport {
    let verdicts: Vec<SubsystemVerdict> = Subsystem::ALL
        .iter()
        .map(|s| judge(*s, record))
        .collect();
    let ready = verdicts.iter().all(SubsystemVerdict::passed);

    DiagnosticReport { verdicts, ready }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::record::RecordBuilder;

    const ALL_FLAGS: &[Flag] = &[
        Flag::RadioEnabled,
        Flag::RadioInitialized,
        Flag::GpsTypeMtk,
        Flag::GpsStartup,
        Flag::SdInserted,
        Flag::SdInitialized,
        Flag::SdFileOpen,
        Flag::SdReadWrite,
        Flag::SdReaderEnabled,
        Flag::SdReaderInitialized,
        Flag::PowerManagement,
        Flag::CommandLineInterface,
        Flag::CoordinateTruncation,
    ];

    fn record_without(missing: &[Flag]) -> DiagnosticRecord {
        let mut builder = RecordBuilder::new();
        for flag in ALL_FLAGS {
            if !missing.contains(flag) {
                builder.raise(*flag);
            }
        }
        builder.finish()
    }

    #[test]
    fn test_all_pass() {
        let report = evaluate(&record_without(&[]));
        assert!(report.ready);
        assert!(report.verdicts.iter().all(|v| v.passed()));
        assert_eq!(report.verdicts.len(), 5);
        assert_eq!(report.result_line(), "Result : bGeigie ready for operation.");
    }

    #[test]
    fn test_first_cause_wins() {
        let report = evaluate(&record_without(&[Flag::SdInitialized, Flag::SdReadWrite]));
        let sd = report.verdict(Subsystem::SdStorage).unwrap();
        assert_eq!(sd.failures, vec!["SD card initialization fails"]);
        assert!(!report.ready);
    }

    #[test]
    fn test_radio_not_enabled() {
        let report = evaluate(&record_without(&[Flag::RadioEnabled, Flag::RadioInitialized]));
        let radio = report.verdict(Subsystem::Radio).unwrap();
        assert_eq!(radio.failures, vec!["Radio not enabled"]);
        assert!(!radio.passed());
    }

    #[test]
    fn test_sd_reader_uses_card_init_flag() {
        // Reader init line missing: the reader still passes
        let report = evaluate(&record_without(&[Flag::SdReaderInitialized]));
        assert!(report.verdict(Subsystem::SdReader).unwrap().passed());
        assert!(report.ready);

        // Card init missing: both card and reader fail
        let report = evaluate(&record_without(&[Flag::SdInitialized]));
        assert_eq!(
            report.verdict(Subsystem::SdReader).unwrap().failures,
            vec!["SD Reader initialization fails"]
        );
        assert_eq!(
            report.verdict(Subsystem::SdStorage).unwrap().failures,
            vec!["SD card initialization fails"]
        );
    }

    #[test]
    fn test_features_list_every_missing_one() {
        let report = evaluate(&record_without(&[
            Flag::PowerManagement,
            Flag::CoordinateTruncation,
        ]));
        let features = report.verdict(Subsystem::Features).unwrap();
        assert_eq!(
            features.failures,
            vec!["Power Management required", "Coordination Truncation required"]
        );
        assert!(!report.ready);
    }
}
