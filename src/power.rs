/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Supply, clock and reset primitives consumed by the power sequence

use core::fmt::Debug;

use embedded_hal::digital::v2::OutputPin;

/// Board-specific power control around the sensor.
///
/// Supplies may come up in any order; the sequence in
/// [`Imx477::power_on`](crate::Imx477::power_on) only needs them all on
/// before the clock starts.
pub trait PowerControl {
    type Error: Debug;

    /// Enable the analog, digital core and interface supplies
    fn enable_power(&mut self) -> Result<(), Self::Error>;
    fn disable_power(&mut self);
    /// Start the external clock oscillator
    fn enable_clock(&mut self) -> Result<(), Self::Error>;
    fn disable_clock(&mut self);
    /// Drive the reset (XCLR) line; `true` holds the sensor in reset
    fn set_reset(&mut self, asserted: bool) -> Result<(), Self::Error>;
}

/// Power control through three GPIOs: a supply enable, an oscillator
/// enable and the active-low XCLR line
pub struct PinPower<SUP, CLK, RST> {
    supplies: SUP,
    clock: CLK,
    xclr: RST,
}

impl<SUP, CLK, RST> PinPower<SUP, CLK, RST> {
    pub fn new(supplies: SUP, clock: CLK, xclr: RST) -> Self {
        Self {
            supplies,
            clock,
            xclr,
        }
    }

    pub fn release(self) -> (SUP, CLK, RST) {
        (self.supplies, self.clock, self.xclr)
    }
}

impl<SUP, CLK, RST, PinE> PowerControl for PinPower<SUP, CLK, RST>
where
    SUP: OutputPin<Error = PinE>,
    CLK: OutputPin<Error = PinE>,
    RST: OutputPin<Error = PinE>,
    PinE: Debug,
{
    type Error = PinE;

    fn enable_power(&mut self) -> Result<(), PinE> {
        self.supplies.set_high()
    }

    fn disable_power(&mut self) {
        if let Err(err) = self.supplies.set_low() {
            log::warn!("failed to disable supplies: {:?}", err);
        }
    }

    fn enable_clock(&mut self) -> Result<(), PinE> {
        self.clock.set_high()
    }

    fn disable_clock(&mut self) {
        if let Err(err) = self.clock.set_low() {
            log::warn!("failed to disable clock: {:?}", err);
        }
    }

    fn set_reset(&mut self, asserted: bool) -> Result<(), PinE> {
        if asserted {
            self.xclr.set_low()
        } else {
            self.xclr.set_high()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::pin::{Mock as PinMock, State, Transaction};

    #[test]
    fn xclr_is_active_low() {
        let supplies = PinMock::new(&[]);
        let clock = PinMock::new(&[]);
        let xclr = PinMock::new(&[
            Transaction::set(State::High),
            Transaction::set(State::Low),
        ]);
        let mut power = PinPower::new(supplies, clock, xclr);
        power.set_reset(false).unwrap();
        power.set_reset(true).unwrap();

        let (mut supplies, mut clock, mut xclr) = power.release();
        supplies.done();
        clock.done();
        xclr.done();
    }
}
