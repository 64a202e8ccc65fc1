//! bGeigie Quality Control
//!
//! Runs the built-in diagnostic of a bGeigie radiation logger over its serial
//! console and reports whether the device is ready for operation.
//!
//! # Features
//!
//! - **Check**: find the device's USB serial port, capture one diagnostic
//!   session and print per-subsystem verdicts (requires `serial` feature and
//!   libudev on Linux)
//! - **Replay**: evaluate a captured session from a file or stdin
//! - **Fields**: list the diagnostic keys the parser understands
//!
//! # Usage
//!
//! ```bash
//! # Run a diagnostic on the auto-detected device (requires serial feature)
//! bgeigie-qc check
//!
//! # Use an explicit port and keep a capture of the session
//! bgeigie-qc check -p /dev/ttyUSB0 --log session.log
//!
//! # Evaluate a captured session
//! bgeigie-qc replay session.log
//! ```

#[cfg(any(feature = "serial", test))]
mod config;
mod console;
mod diagnostic;
#[cfg(feature = "serial")]
mod serial;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::File;
use std::io::{self, BufReader, Write};

use diagnostic::fields::FIELD_RULES;
use diagnostic::{evaluate, DiagnosticError, DiagnosticParser, DiagnosticSession, ReaderSource};

#[cfg(feature = "serial")]
use config::QcConfig;
#[cfg(feature = "serial")]
use diagnostic::CaptureSource;
#[cfg(feature = "serial")]
use serial::{PortConfig, SerialConnection};
#[cfg(feature = "serial")]
use std::io::BufWriter;
#[cfg(feature = "serial")]
use std::path::{Path, PathBuf};
#[cfg(feature = "serial")]
use std::time::Duration;

/// bGeigie Quality Control
///
/// Diagnostic checker for bGeigie radiation loggers
#[derive(Parser)]
#[command(name = "bgeigie-qc")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Diagnostic checker for bGeigie radiation loggers")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML configuration file (serial settings)
    #[cfg(feature = "serial")]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a diagnostic session on a connected device (requires --features serial)
    #[cfg(feature = "serial")]
    Check {
        /// Serial port path (auto-detected when omitted)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate (overrides config)
        #[arg(short, long)]
        baud: Option<u32>,

        /// Session inactivity timeout in seconds (overrides config)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Save the raw session to a file
        #[arg(short, long)]
        log: Option<PathBuf>,
    },

    /// List available serial ports (requires --features serial)
    #[cfg(feature = "serial")]
    Ports,

    /// Evaluate a captured diagnostic session, read to the end marker or the
    /// end of input
    Replay {
        /// Capture file, or '-' for stdin
        input: String,

        /// Print the parsed record as TOML
        #[arg(long)]
        dump: bool,
    },

    /// List the diagnostic fields the parser recognizes
    Fields,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    #[cfg(feature = "serial")]
    let config = QcConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        #[cfg(feature = "serial")]
        Commands::Check {
            port,
            baud,
            timeout,
            log,
        } => handle_check(&config, port, baud, timeout, log.as_deref()),
        #[cfg(feature = "serial")]
        Commands::Ports => serial::port::print_ports(&config.port_pattern),
        Commands::Replay { input, dump } => handle_replay(&input, dump),
        Commands::Fields => {
            print_fields();
            Ok(())
        }
    }
}

#[cfg(feature = "serial")]
fn handle_check(
    config: &QcConfig,
    port: Option<String>,
    baud: Option<u32>,
    timeout: Option<u64>,
    log_file: Option<&Path>,
) -> Result<()> {
    let port_path = match port {
        Some(p) => p,
        None => match serial::detect_device_port(&config.port_pattern)? {
            Some(info) => {
                println!("Found matching port '{}'. Try to open.", info.path);
                info.path
            }
            None => {
                println!("{}", "No matching port found.".yellow());
                return Ok(());
            }
        },
    };

    let mut port_config = PortConfig::from_config(&port_path, config);
    if let Some(b) = baud {
        port_config = port_config.with_baud_rate(b);
    }

    let connection = match SerialConnection::open(port_config) {
        Ok(conn) => conn,
        Err(e) => {
            log::debug!("{:#}", e);
            eprintln!(
                "{} Device can not be found or can not be configured.",
                "[ERROR]".red().bold()
            );
            std::process::exit(1);
        }
    };

    println!(
        "{} Waiting for diagnostic on {} (reset the device if nothing happens)",
        "[*]".cyan().bold(),
        port_path.white()
    );

    let session_timeout = timeout
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.session_timeout());
    let parser = DiagnosticParser::new().with_timeout(session_timeout);
    // The connection is moved into the session and closed when it returns
    let outcome = match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            let source = CaptureSource::new(connection, BufWriter::new(file), &port_path)
                .with_context(|| format!("Failed to write log file: {}", path.display()))?;
            println!("{} Logging to: {}", "[LOG]".cyan().bold(), path.display());
            parser.run(source)
        }
        None => parser.run(connection),
    };

    report_outcome(outcome, false)
}

/// Replay a capture. Files and stdin never stall, so end of input rather
/// than the session timeout ends an incomplete capture.
fn handle_replay(input: &str, dump: bool) -> Result<()> {
    let parser = DiagnosticParser::new();

    let outcome = if input == "-" {
        let stdin = io::stdin();
        parser.run(ReaderSource::new(stdin.lock()))
    } else {
        let file = File::open(input)
            .with_context(|| format!("Failed to open capture file: {}", input))?;
        parser.run(ReaderSource::new(BufReader::new(file)))
    };

    report_outcome(outcome, dump)
}

/// Print the report for a finished session, or exit with status 1 on timeout
fn report_outcome(outcome: Result<DiagnosticSession, DiagnosticError>, dump: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let session = match outcome {
        Ok(session) => session,
        Err(DiagnosticError::Timeout { started, warnings }) => {
            log::debug!("timed out, start marker seen: {}", started);
            console::write_warnings(&mut out, &warnings)?;
            console::write_timeout(&mut out)?;
            out.flush()?;
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    log::debug!("session complete, {} lines read", session.lines_read);

    console::write_warnings(&mut out, &session.warnings)?;

    if dump {
        let text = toml::to_string(&session.record).context("Failed to serialize record")?;
        writeln!(out, "{}", text)?;
    }

    console::write_device_info(&mut out, &session.record)?;
    console::write_report(&mut out, &evaluate(&session.record))?;

    Ok(())
}

fn print_fields() {
    println!("{}", "=".repeat(60));
    println!("{}", "Recognized Diagnostic Fields".cyan().bold());
    println!("{}", "=".repeat(60));

    for (key, rule) in FIELD_RULES {
        println!("  {} {}", format!("{:<32}", key).white().bold(), rule);
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "Session markers: {} / {}",
        diagnostic::parser::START_MARKER.dimmed(),
        diagnostic::parser::END_MARKER.dimmed()
    );
}
