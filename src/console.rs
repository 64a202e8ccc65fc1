//! Terminal output for a diagnostic session
//!
//! Every user-facing line of a session outcome is written here, to any
//! `Write` target, so the text printed by the binary is the text under test.

use colored::Colorize;
use std::io::{self, Write};

use crate::diagnostic::evaluate::SubsystemVerdict;
use crate::diagnostic::fields::FieldWarning;
use crate::diagnostic::{DiagnosticRecord, DiagnosticReport, Reading};

pub const TIMEOUT_LINE: &str = "Timeout : failed to perform diagnostic.";

pub fn write_warnings<W: Write>(out: &mut W, warnings: &[FieldWarning]) -> io::Result<()> {
    for warning in warnings {
        writeln!(out, "{}", format!("Warning : {}.", warning).yellow())?;
    }
    Ok(())
}

pub fn write_timeout<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{}", TIMEOUT_LINE.red().bold())
}

/// Informational readings; they never affect the verdict
pub fn write_device_info<W: Write>(out: &mut W, record: &DiagnosticRecord) -> io::Result<()> {
    writeln!(out, "{}", "=".repeat(60))?;
    writeln!(out, "{}", "DEVICE".cyan().bold())?;
    writeln!(out, "  Version : {}", record.version().unwrap_or("-"))?;
    writeln!(out, "  Device ID : {}", record.device_id().unwrap_or("-"))?;
    writeln!(out, "  Temperature : {} C", record.reading(Reading::Temperature))?;
    writeln!(out, "  Humidity : {} %", record.reading(Reading::Humidity))?;
    writeln!(
        out,
        "  Battery voltage : {} mV",
        record.reading(Reading::BatteryVoltage)
    )?;
    writeln!(out, "  Free RAM : {} bytes", record.reading(Reading::FreeRam))?;
    writeln!(out, "{}", "=".repeat(60))
}

fn write_verdict<W: Write>(out: &mut W, verdict: &SubsystemVerdict) -> io::Result<()> {
    let label = verdict.subsystem.label();
    match verdict.failures.as_slice() {
        [] => writeln!(out, "  {} : {}", label, "success".green()),
        causes if verdict.subsystem.lists_all_failures() => {
            writeln!(out, "  {} : {}", label, "failed".red())?;
            for cause in causes {
                writeln!(out, "    {}", cause)?;
            }
            Ok(())
        }
        [cause, ..] => writeln!(out, "  {} : {} (cause : {})", label, "failed".red(), cause),
    }
}

/// Subsystem verdicts in evaluation order, then the overall result
pub fn write_report<W: Write>(out: &mut W, report: &DiagnosticReport) -> io::Result<()> {
    writeln!(out, "{}", "DIAGNOSTIC".cyan().bold())?;
    for verdict in &report.verdicts {
        write_verdict(out, verdict)?;
    }

    let result = report.result_line();
    if report.ready {
        writeln!(out, "{}", result.green().bold())
    } else {
        writeln!(out, "{}", result.red().bold())
    }
}
