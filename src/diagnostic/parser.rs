//! Diagnostic session parser
//!
//! Waits for the start marker, folds every `Key,Value` line into a
//! [`RecordBuilder`] and stops at the end marker. The session deadline is
//! pushed back when the start marker arrives and on every line read inside
//! the session, but not while waiting for the start marker.

use super::fields::{self, FieldWarning};
use super::record::{DiagnosticRecord, RecordBuilder};
use super::source::LineSource;
use super::DiagnosticError;
use std::time::{Duration, Instant};

/// Line that opens a diagnostic session
pub const START_MARKER: &str = "--- Diagnostic START ---";

/// Line that closes a diagnostic session
pub const END_MARKER: &str = "--- Diagnostic END ---";

/// Default inactivity window for a session
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    AwaitingStart,
    InSession,
}

/// Outcome of a completed session
#[derive(Debug)]
pub struct DiagnosticSession {
    pub record: DiagnosticRecord,
    pub warnings: Vec<FieldWarning>,
    /// Lines consumed between the markers, end marker included
    pub lines_read: usize,
}

/// Diagnostic stream parser
pub struct DiagnosticParser {
    session_timeout: Duration,
}

impl Default for DiagnosticParser {
    fn default() -> Self {
        Self {
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }
}

impl DiagnosticParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inactivity window
    #[cfg(any(feature = "serial", test))]
    pub fn with_timeout(mut self, session_timeout: Duration) -> Self {
        self.session_timeout = session_timeout;
        self
    }

    /// Consume lines from `source` until the session ends or times out
    pub fn run<S: LineSource>(&self, mut source: S) -> Result<DiagnosticSession, DiagnosticError> {
        let mut state = ParserState::AwaitingStart;
        let mut deadline = Instant::now() + self.session_timeout;
        let mut builder = RecordBuilder::new();
        let mut warnings = Vec::new();
        let mut lines_read = 0;

        loop {
            if Instant::now() >= deadline {
                return Err(self.timed_out(state, warnings));
            }

            let raw = match source.read_line(deadline)? {
                Some(raw) => raw,
                None => return Err(self.timed_out(state, warnings)),
            };
            let line = raw.trim_end_matches(['\r', '\n']);
            log::trace!("rx {:?}", line);

            match state {
                ParserState::AwaitingStart => {
                    if line == START_MARKER {
                        log::debug!("diagnostic session started");
                        state = ParserState::InSession;
                        deadline = Instant::now() + self.session_timeout;
                    }
                }
                ParserState::InSession => {
                    lines_read += 1;
                    deadline = Instant::now() + self.session_timeout;

                    if line == END_MARKER {
                        log::debug!("diagnostic session ended after {} lines", lines_read);
                        break;
                    }

                    if let Some(warning) = apply_record_line(line, &mut builder) {
                        log::debug!("{}: {} ({:?})", warning.key, warning, warning.value);
                        warnings.push(warning);
                    }
                }
            }
        }

        Ok(DiagnosticSession {
            record: builder.finish(),
            warnings,
            lines_read,
        })
    }

    /// Warnings raised before the stall travel with the error
    fn timed_out(&self, state: ParserState, warnings: Vec<FieldWarning>) -> DiagnosticError {
        let started = state == ParserState::InSession;
        log::debug!(
            "no diagnostic progress within {:?} (started: {})",
            self.session_timeout,
            started
        );
        DiagnosticError::Timeout { started, warnings }
    }
}

/// Apply one `Key,Value` line. Lines without a comma and unknown keys are
/// ignored.
fn apply_record_line(line: &str, builder: &mut RecordBuilder) -> Option<FieldWarning> {
    let (key, value) = line.split_once(',')?;
    let rule = fields::lookup(key)?;
    rule.apply(key, value, builder)
}
