//! Diagnostic record produced by a single diagnostic session
//!
//! A [`DiagnosticRecord`] is only ever built through a [`RecordBuilder`].
//! Flags on the builder can be raised but never lowered, and the finished
//! record is read-only.

use serde::Serialize;

/// Boolean fields reported by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    RadioEnabled,
    RadioInitialized,
    GpsTypeMtk,
    GpsStartup,
    SdInserted,
    SdInitialized,
    SdFileOpen,
    SdReadWrite,
    SdReaderEnabled,
    SdReaderInitialized,
    PowerManagement,
    CommandLineInterface,
    CoordinateTruncation,
}

/// Free-form text fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    Version,
    DeviceId,
}

/// Integer readings, reported with a trailing unit suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reading {
    Temperature,
    Humidity,
    BatteryVoltage,
    FreeRam,
}

impl Reading {
    /// Name used in user-facing warnings
    pub fn label(self) -> &'static str {
        match self {
            Reading::Temperature => "temperature",
            Reading::Humidity => "humidity",
            Reading::BatteryVoltage => "battery voltage",
            Reading::FreeRam => "free RAM",
        }
    }
}

/// Snapshot of everything the device reported between the session markers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiagnosticRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    device_id: Option<String>,

    radio_enabled: bool,
    radio_initialized: bool,

    gps_type_is_mtk: bool,
    gps_startup_ok: bool,

    sd_inserted: bool,
    sd_initialized: bool,
    sd_file_open_ok: bool,
    sd_read_write_ok: bool,

    sd_reader_enabled: bool,
    sd_reader_initialized: bool,

    power_management_enabled: bool,
    command_line_interface_enabled: bool,
    coordinate_truncation_enabled: bool,

    temperature_celsius: i32,
    humidity_percent: i32,
    battery_voltage_millivolts: i32,
    free_ram_bytes: i32,
}

impl DiagnosticRecord {
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// Value of a boolean field
    pub fn flag(&self, flag: Flag) -> bool {
        match flag {
            Flag::RadioEnabled => self.radio_enabled,
            Flag::RadioInitialized => self.radio_initialized,
            Flag::GpsTypeMtk => self.gps_type_is_mtk,
            Flag::GpsStartup => self.gps_startup_ok,
            Flag::SdInserted => self.sd_inserted,
            Flag::SdInitialized => self.sd_initialized,
            Flag::SdFileOpen => self.sd_file_open_ok,
            Flag::SdReadWrite => self.sd_read_write_ok,
            Flag::SdReaderEnabled => self.sd_reader_enabled,
            Flag::SdReaderInitialized => self.sd_reader_initialized,
            Flag::PowerManagement => self.power_management_enabled,
            Flag::CommandLineInterface => self.command_line_interface_enabled,
            Flag::CoordinateTruncation => self.coordinate_truncation_enabled,
        }
    }

    /// Value of an integer reading (0 when never reported)
    pub fn reading(&self, reading: Reading) -> i32 {
        match reading {
            Reading::Temperature => self.temperature_celsius,
            Reading::Humidity => self.humidity_percent,
            Reading::BatteryVoltage => self.battery_voltage_millivolts,
            Reading::FreeRam => self.free_ram_bytes,
        }
    }
}

/// Accumulates field values while a session is in progress
#[derive(Debug, Default)]
pub struct RecordBuilder {
    record: DiagnosticRecord,
}

impl RecordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_text(&mut self, field: TextField, value: &str) {
        let slot = match field {
            TextField::Version => &mut self.record.version,
            TextField::DeviceId => &mut self.record.device_id,
        };
        *slot = Some(value.to_string());
    }

    /// Raise a flag. There is no way to clear one.
    pub fn raise(&mut self, flag: Flag) {
        let r = &mut self.record;
        let slot = match flag {
            Flag::RadioEnabled => &mut r.radio_enabled,
            Flag::RadioInitialized => &mut r.radio_initialized,
            Flag::GpsTypeMtk => &mut r.gps_type_is_mtk,
            Flag::GpsStartup => &mut r.gps_startup_ok,
            Flag::SdInserted => &mut r.sd_inserted,
            Flag::SdInitialized => &mut r.sd_initialized,
            Flag::SdFileOpen => &mut r.sd_file_open_ok,
            Flag::SdReadWrite => &mut r.sd_read_write_ok,
            Flag::SdReaderEnabled => &mut r.sd_reader_enabled,
            Flag::SdReaderInitialized => &mut r.sd_reader_initialized,
            Flag::PowerManagement => &mut r.power_management_enabled,
            Flag::CommandLineInterface => &mut r.command_line_interface_enabled,
            Flag::CoordinateTruncation => &mut r.coordinate_truncation_enabled,
        };
        *slot = true;
    }

    pub fn set_reading(&mut self, reading: Reading, value: i32) {
        let r = &mut self.record;
        let slot = match reading {
            Reading::Temperature => &mut r.temperature_celsius,
            Reading::Humidity => &mut r.humidity_percent,
            Reading::BatteryVoltage => &mut r.battery_voltage_millivolts,
            Reading::FreeRam => &mut r.free_ram_bytes,
        };
        *slot = value;
    }

    pub fn finish(self) -> DiagnosticRecord {
        self.record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_record_is_empty() {
        let record = RecordBuilder::new().finish();
        assert_eq!(record.version(), None);
        assert_eq!(record.device_id(), None);
        assert!(!record.flag(Flag::RadioEnabled));
        assert!(!record.flag(Flag::CoordinateTruncation));
        assert_eq!(record.reading(Reading::Temperature), 0);
        assert_eq!(record.reading(Reading::FreeRam), 0);
    }

    #[test]
    fn test_raise_is_sticky() {
        let mut builder = RecordBuilder::new();
        builder.raise(Flag::SdInserted);
        builder.raise(Flag::SdInserted);

        let record = builder.finish();
        assert!(record.flag(Flag::SdInserted));
        assert!(!record.flag(Flag::SdInitialized));
    }

    #[test]
    fn test_text_and_readings() {
        let mut builder = RecordBuilder::new();
        builder.set_text(TextField::Version, "3.1.2");
        builder.set_text(TextField::DeviceId, "1042");
        builder.set_reading(Reading::BatteryVoltage, 4120);

        let record = builder.finish();
        assert_eq!(record.version(), Some("3.1.2"));
        assert_eq!(record.device_id(), Some("1042"));
        assert_eq!(record.reading(Reading::BatteryVoltage), 4120);
    }
}
