//! Serial port configuration and connection management
//!
//! Handles discovery of the bGeigie's USB serial bridge and line-oriented
//! reads from it.

use crate::diagnostic::LineSource;
use anyhow::{Context, Result};
use colored::Colorize;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{self, Read};
use std::time::{Duration, Instant};

use crate::config::{QcConfig, DEFAULT_BAUD_RATE};

/// USB vendor ID of FTDI, used by the bGeigie serial bridge
pub const FTDI_VENDOR_ID: u16 = 0x0403;

/// Configuration for serial port connection
#[derive(Debug, Clone)]
pub struct PortConfig {
    /// Serial port path (e.g., /dev/ttyUSB0, /dev/cu.usbserial-A9012345)
    pub port_path: String,
    /// Baud rate (default: 57600)
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
    /// Upper bound for a single read
    pub timeout: Duration,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_path: String::from("/dev/ttyUSB0"),
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
            timeout: Duration::from_secs(1),
        }
    }
}

impl PortConfig {
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            ..Default::default()
        }
    }

    /// Build from the tool configuration
    pub fn from_config(port_path: &str, config: &QcConfig) -> Self {
        Self::new(port_path)
            .with_baud_rate(config.baud_rate)
            .with_timeout(config.read_timeout())
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the read timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An open connection to the device's diagnostic console.
///
/// The port is closed when the connection is dropped.
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    config: PortConfig,
    /// Bytes of a line not yet terminated when the last deadline passed
    pending: Vec<u8>,
}

impl SerialConnection {
    /// Open a serial connection with the given configuration
    pub fn open(config: PortConfig) -> Result<Self> {
        let port = serialport::new(&config.port_path, config.baud_rate)
            .data_bits(config.data_bits)
            .parity(config.parity)
            .stop_bits(config.stop_bits)
            .flow_control(config.flow_control)
            .timeout(config.timeout)
            .open()
            .with_context(|| format!("Failed to open serial port: {}", config.port_path))?;

        log::info!("opened {} at {} baud", config.port_path, config.baud_rate);

        Ok(Self {
            port,
            config,
            pending: Vec::new(),
        })
    }

    fn take_line(&mut self) -> String {
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        String::from_utf8_lossy(&line).into_owned()
    }
}

impl LineSource for SerialConnection {
    fn read_line(&mut self, deadline: Instant) -> io::Result<Option<String>> {
        let mut byte = [0u8; 1];

        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            // Never block past the deadline
            let wait = (deadline - now).min(self.config.timeout);
            self.port.set_timeout(wait).map_err(io::Error::from)?;

            match self.port.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    if byte[0] == b'\n' {
                        return Ok(Some(self.take_line()));
                    }
                    self.pending.push(byte[0]);
                }
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Information about a detected serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub path: String,
    pub port_type: PortType,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub serial_number: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PortType {
    UsbSerial,
    PciSerial,
    Bluetooth,
    Unknown,
}

impl std::fmt::Display for PortType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortType::UsbSerial => write!(f, "USB Serial"),
            PortType::PciSerial => write!(f, "PCI Serial"),
            PortType::Bluetooth => write!(f, "Bluetooth"),
            PortType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// List all available serial ports, sorted by path
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().with_context(|| "Failed to enumerate serial ports")?;

    let mut port_infos: Vec<PortInfo> = ports
        .into_iter()
        .map(|p| {
            let (port_type, manufacturer, product, serial_number, vid, pid) = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => (
                    PortType::UsbSerial,
                    info.manufacturer,
                    info.product,
                    info.serial_number,
                    Some(info.vid),
                    Some(info.pid),
                ),
                serialport::SerialPortType::PciPort => {
                    (PortType::PciSerial, None, None, None, None, None)
                }
                serialport::SerialPortType::BluetoothPort => {
                    (PortType::Bluetooth, None, None, None, None, None)
                }
                serialport::SerialPortType::Unknown => {
                    (PortType::Unknown, None, None, None, None, None)
                }
            };

            PortInfo {
                path: p.port_name,
                port_type,
                manufacturer,
                product,
                serial_number,
                vid,
                pid,
            }
        })
        .collect();

    port_infos.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(port_infos)
}

/// Pick the port most likely to be a bGeigie.
///
/// A port whose name contains `pattern` wins; failing that, the first
/// FTDI USB port.
pub fn select_device_port<'a>(ports: &'a [PortInfo], pattern: &str) -> Option<&'a PortInfo> {
    let by_name = ports
        .iter()
        .find(|p| !pattern.is_empty() && p.path.contains(pattern));

    by_name.or_else(|| {
        ports
            .iter()
            .find(|p| p.port_type == PortType::UsbSerial && p.vid == Some(FTDI_VENDOR_ID))
    })
}

/// Find the device port among the attached ones
pub fn detect_device_port(pattern: &str) -> Result<Option<PortInfo>> {
    let ports = list_ports()?;
    let found = select_device_port(&ports, pattern).cloned();
    log::debug!("{} ports enumerated, selected {:?}", ports.len(), found.as_ref().map(|p| &p.path));
    Ok(found)
}

/// Print formatted list of available serial ports
pub fn print_ports(pattern: &str) -> Result<()> {
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
        println!("\n{}", "Troubleshooting tips:".cyan().bold());
        println!("  1. Connect the bGeigie with its USB cable and switch it on");
        println!("  2. Check if the device is recognized: ls -la /dev/ttyUSB* /dev/cu.usbserial-*");
        println!("  3. Add your user to the 'dialout' group: sudo usermod -aG dialout $USER");
        return Ok(());
    }

    let selected = select_device_port(&ports, pattern).map(|p| p.path.clone());

    println!("{}", "Available Serial Ports:".green().bold());
    println!("{}", "=".repeat(60));

    for port in &ports {
        let marker = if selected.as_deref() == Some(port.path.as_str()) {
            " [bGeigie]".green().bold().to_string()
        } else {
            String::new()
        };
        println!("\n{}: {}{}", "Port".cyan(), port.path.white().bold(), marker);
        println!("  Type: {}", port.port_type);

        if let Some(ref mfg) = port.manufacturer {
            println!("  Manufacturer: {}", mfg);
        }
        if let Some(ref prod) = port.product {
            println!("  Product: {}", prod);
        }
        if let Some(ref sn) = port.serial_number {
            println!("  Serial: {}", sn);
        }
        if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
            println!("  VID:PID: {:04x}:{:04x}", vid, pid);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("{}", "Use: bgeigie-qc check -p <PORT> to run a diagnostic".yellow());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(path: &str, port_type: PortType, vid: Option<u16>) -> PortInfo {
        PortInfo {
            path: path.to_string(),
            port_type,
            manufacturer: None,
            product: None,
            serial_number: None,
            vid,
            pid: None,
        }
    }

    #[test]
    fn test_default_config() {
        let config = PortConfig::default();
        assert_eq!(config.baud_rate, 57600);
        assert_eq!(config.timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_config_from_qc_config() {
        let qc = QcConfig {
            baud_rate: 9600,
            read_timeout_ms: 250,
            ..QcConfig::default()
        };
        let config = PortConfig::from_config("/dev/ttyACM0", &qc);

        assert_eq!(config.port_path, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_select_by_name_pattern() {
        let ports = vec![
            port("/dev/cu.Bluetooth-Incoming-Port", PortType::Bluetooth, None),
            port("/dev/cu.usbserial-A9012345", PortType::UsbSerial, Some(0x1a86)),
            port("/dev/ttyUSB0", PortType::UsbSerial, Some(FTDI_VENDOR_ID)),
        ];
        let selected = select_device_port(&ports, "usbserial-").unwrap();
        assert_eq!(selected.path, "/dev/cu.usbserial-A9012345");
    }

    #[test]
    fn test_select_falls_back_to_ftdi() {
        let ports = vec![
            port("/dev/ttyS0", PortType::PciSerial, None),
            port("/dev/ttyUSB0", PortType::UsbSerial, Some(0x10c4)),
            port("/dev/ttyUSB1", PortType::UsbSerial, Some(FTDI_VENDOR_ID)),
        ];
        let selected = select_device_port(&ports, "usbserial-").unwrap();
        assert_eq!(selected.path, "/dev/ttyUSB1");
    }

    #[test]
    fn test_select_none() {
        let ports = vec![port("/dev/ttyS0", PortType::PciSerial, None)];
        assert!(select_device_port(&ports, "usbserial-").is_none());
        assert!(select_device_port(&[], "usbserial-").is_none());
    }
}
