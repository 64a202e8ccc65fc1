//! Serial port access for the bGeigie diagnostic console
//!
//! This module provides functionality for:
//! - Listing available serial ports and picking the bGeigie's USB bridge
//! - Reading the diagnostic stream line by line with a deadline

pub mod port;

pub use port::{detect_device_port, PortConfig, SerialConnection};
