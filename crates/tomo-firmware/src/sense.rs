//! Analog sense channel
//!
//! A single 12-bit ADC input, shared by every sense electrode through the
//! external multiplexer. Reads are strictly sequential; the acquisition
//! sampler is the only user.

use esp_hal::Async;
use esp_hal::analog::adc::{Adc, AdcPin};
use esp_hal::peripherals::{ADC1, GPIO1};
use tomo_core::scanner::SenseChannel;

pub struct AdcSense<'d> {
    adc: Adc<'d, ADC1<'d>, Async>,
    pin: AdcPin<GPIO1<'d>, ADC1<'d>>,
}

impl<'d> AdcSense<'d> {
    pub fn new(adc: Adc<'d, ADC1<'d>, Async>, pin: AdcPin<GPIO1<'d>, ADC1<'d>>) -> Self {
        Self { adc, pin }
    }
}

impl SenseChannel for AdcSense<'_> {
    type Error = core::convert::Infallible;

    async fn acquire(&mut self) -> Result<u16, Self::Error> {
        Ok(self.adc.read_oneshot(&mut self.pin).await)
    }
}
