//! GPIO drive bank for the electrode array
//!
//! Owns one push-pull output per electrode. The scan scheduler is the
//! only writer; nothing else touches these lines once the bank is built.

use esp_hal::gpio::Output;
use thiserror_no_std::Error;
use tomo_core::electrode::DriveState;
use tomo_core::scanner::DriveBank;

/// Size of the physical array; fixed by the board layout.
pub const ELECTRODE_COUNT: usize = 16;

/// Electrode-to-GPIO mapping, index-aligned with the drive bank built in
/// `main`. Kept as a plain table so the mapping can be validated like any
/// other configuration input.
pub const ELECTRODE_PINS: [u8; ELECTRODE_COUNT] =
    [4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 21];

#[derive(Error, Debug)]
pub enum DriveError {
    #[error("no drive line for electrode {0}")]
    UnknownElectrode(usize),
}

pub struct GpioDriveBank<'d> {
    pins: [Output<'d>; ELECTRODE_COUNT],
}

impl<'d> GpioDriveBank<'d> {
    /// Take ownership of the drive lines, index-aligned with the
    /// electrode array.
    pub fn new(pins: [Output<'d>; ELECTRODE_COUNT]) -> Self {
        Self { pins }
    }
}

impl DriveBank for GpioDriveBank<'_> {
    type Error = DriveError;

    fn set_drive(&mut self, electrode: usize, state: DriveState) -> Result<(), DriveError> {
        let pin = self
            .pins
            .get_mut(electrode)
            .ok_or(DriveError::UnknownElectrode(electrode))?;
        match state {
            DriveState::Sourcing => pin.set_high(),
            // The sink side is driven low; idle electrodes also sit low.
            DriveState::Sinking | DriveState::Inactive => pin.set_low(),
        }
        Ok(())
    }
}
