//! ESP32-S3 firmware-specific modules for tomo-rs
//!
//! This crate contains the hardware-facing half of the scanner: GPIO
//! drive-line ownership, the on-chip ADC sense channel, station WiFi
//! bring-up, and the HTTP record sink. The scan logic itself lives in
//! `tomo-core`.

#![no_std]

pub mod drive;
pub mod sense;
pub mod transport;
pub mod wifi;
