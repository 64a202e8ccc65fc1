//! Diagnostic field table
//!
//! Maps each key the firmware prints inside a diagnostic session to the
//! record field it fills and the rule used to parse its value.

use super::record::{Flag, Reading, RecordBuilder, TextField};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/// Value the firmware prints for a passing boolean check
pub const YES: &str = "yes";

/// How a value is applied to the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRule {
    /// Copy the raw value
    Text(TextField),
    /// Raise the flag when the value is exactly `yes`
    Flag(Flag),
    /// Drop `suffix_len` trailing unit characters, then parse an integer
    Reading { reading: Reading, suffix_len: usize },
}

impl fmt::Display for FieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRule::Text(_) => write!(f, "text"),
            FieldRule::Flag(_) => write!(f, "flag (\"{}\")", YES),
            FieldRule::Reading { suffix_len, .. } => {
                write!(f, "integer, {} unit char(s) stripped", suffix_len)
            }
        }
    }
}

/// Field rules in the order the firmware emits them
pub const FIELD_RULES: &[(&str, FieldRule)] = &[
    ("Version", FieldRule::Text(TextField::Version)),
    ("Device ID", FieldRule::Text(TextField::DeviceId)),
    ("Radio enabled", FieldRule::Flag(Flag::RadioEnabled)),
    ("Radio initialized", FieldRule::Flag(Flag::RadioInitialized)),
    ("GPS type MTK", FieldRule::Flag(Flag::GpsTypeMtk)),
    ("GPS system startup", FieldRule::Flag(Flag::GpsStartup)),
    ("SD inserted", FieldRule::Flag(Flag::SdInserted)),
    ("SD initialized", FieldRule::Flag(Flag::SdInitialized)),
    ("SD open file", FieldRule::Flag(Flag::SdFileOpen)),
    ("SD read write", FieldRule::Flag(Flag::SdReadWrite)),
    ("SD reader enabled", FieldRule::Flag(Flag::SdReaderEnabled)),
    ("SD reader initialized", FieldRule::Flag(Flag::SdReaderInitialized)),
    ("Power management enabled", FieldRule::Flag(Flag::PowerManagement)),
    ("Command line interface enabled", FieldRule::Flag(Flag::CommandLineInterface)),
    ("Coordinate truncation enabled", FieldRule::Flag(Flag::CoordinateTruncation)),
    (
        "Temperature",
        FieldRule::Reading { reading: Reading::Temperature, suffix_len: 1 },
    ),
    (
        "Humidity",
        FieldRule::Reading { reading: Reading::Humidity, suffix_len: 1 },
    ),
    (
        "Battery voltage",
        FieldRule::Reading { reading: Reading::BatteryVoltage, suffix_len: 2 },
    ),
    (
        "System free RAM",
        FieldRule::Reading { reading: Reading::FreeRam, suffix_len: 1 },
    ),
];

/// Key lookup over [`FIELD_RULES`]
pub static FIELD_TABLE: Lazy<HashMap<&'static str, FieldRule>> =
    Lazy::new(|| FIELD_RULES.iter().copied().collect());

/// Find the rule for a diagnostic key
pub fn lookup(key: &str) -> Option<FieldRule> {
    FIELD_TABLE.get(key).copied()
}

/// A numeric value that could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldWarning {
    pub key: String,
    pub value: String,
    pub reading: Reading,
}

impl fmt::Display for FieldWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized {} format", self.reading.label())
    }
}

/// Strip the last `count` characters of `value`
fn strip_suffix_chars(value: &str, count: usize) -> &str {
    match value.char_indices().rev().nth(count.saturating_sub(1)) {
        Some((idx, _)) if count > 0 => &value[..idx],
        Some(_) => value,
        None if count == 0 => value,
        None => "",
    }
}

/// Parse a reading such as `23C` or `4120mV`
pub fn parse_reading(value: &str, suffix_len: usize) -> Option<i32> {
    strip_suffix_chars(value, suffix_len).trim().parse().ok()
}

impl FieldRule {
    /// Apply `value` to the record under construction.
    ///
    /// A reading that fails to parse leaves the field untouched and is
    /// returned as a warning.
    pub fn apply(
        self,
        key: &str,
        value: &str,
        builder: &mut RecordBuilder,
    ) -> Option<FieldWarning> {
        match self {
            FieldRule::Text(field) => builder.set_text(field, value),
            FieldRule::Flag(flag) => {
                if value == YES {
                    builder.raise(flag);
                }
            }
            FieldRule::Reading { reading, suffix_len } => match parse_reading(value, suffix_len) {
                Some(parsed) => builder.set_reading(reading, parsed),
                None => {
                    return Some(FieldWarning {
                        key: key.to_string(),
                        value: value.to_string(),
                        reading,
                    })
                }
            },
        }
        None
    }
}
