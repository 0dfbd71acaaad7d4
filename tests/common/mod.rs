/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Register-level fakes shared by the integration tests:
//! - `FakeBus`: remembers every byte written, serves reads from that memory,
//!   and fails on request
//! - `FakePower`: records the supply/clock/reset sequence
//! - `RecordingDelay`: sums requested delays

#![allow(dead_code)] // not every test file uses every helper

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Write, WriteRead};
use imx477_i2c::{Config, Imx477, PowerControl, DEFAULT_I2C_ADDRESS};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FakeError {
    Nak { address: u8, reg: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub address: u8,
    pub reg: u16,
    pub data: Vec<u8>,
}

#[derive(Default)]
pub struct BusState {
    memory: HashMap<(u8, u16), u8>,
    pub writes: Vec<WriteRecord>,
    pub reads: Vec<(u8, u16)>,
    /// Writes to this register NAK
    pub fail_reg: Option<u16>,
    /// Every transaction NAKs
    pub fail_all: bool,
}

/// Cloneable handle; tests keep one clone to inspect what the driver did
#[derive(Clone, Default)]
pub struct FakeBus(Rc<RefCell<BusState>>);

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// A bus whose chip ID register reads back `id`
    pub fn with_chip_id(id: u16) -> Self {
        let bus = Self::new();
        bus.poke(DEFAULT_I2C_ADDRESS, 0x0016, &id.to_be_bytes());
        bus
    }

    pub fn poke(&self, address: u8, reg: u16, data: &[u8]) {
        let mut state = self.0.borrow_mut();
        for (i, b) in data.iter().enumerate() {
            state.memory.insert((address, reg + i as u16), *b);
        }
    }

    pub fn reg8(&self, reg: u16) -> u8 {
        self.reg8_at(DEFAULT_I2C_ADDRESS, reg)
    }

    pub fn reg8_at(&self, address: u8, reg: u16) -> u8 {
        self.0
            .borrow()
            .memory
            .get(&(address, reg))
            .copied()
            .unwrap_or(0)
    }

    pub fn reg16(&self, reg: u16) -> u16 {
        u16::from_be_bytes([self.reg8(reg), self.reg8(reg + 1)])
    }

    pub fn writes(&self) -> Vec<WriteRecord> {
        self.0.borrow().writes.clone()
    }

    /// Single-byte writes to the sensor as `(reg, value)` pairs
    pub fn byte_writes(&self) -> Vec<(u16, u8)> {
        self.0
            .borrow()
            .writes
            .iter()
            .filter(|w| w.address == DEFAULT_I2C_ADDRESS && w.data.len() == 1)
            .map(|w| (w.reg, w.data[0]))
            .collect()
    }

    pub fn writes_to(&self, reg: u16) -> usize {
        self.0.borrow().writes.iter().filter(|w| w.reg == reg).count()
    }

    pub fn clear_log(&self) {
        let mut state = self.0.borrow_mut();
        state.writes.clear();
        state.reads.clear();
    }

    pub fn fail_on(&self, reg: Option<u16>) {
        self.0.borrow_mut().fail_reg = reg;
    }

    pub fn fail_all(&self, fail: bool) {
        self.0.borrow_mut().fail_all = fail;
    }
}

impl Write for FakeBus {
    type Error = FakeError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), FakeError> {
        let reg = u16::from_be_bytes([bytes[0], bytes[1]]);
        let mut state = self.0.borrow_mut();
        if state.fail_all || state.fail_reg == Some(reg) {
            return Err(FakeError::Nak { address, reg });
        }
        for (i, b) in bytes[2..].iter().enumerate() {
            state.memory.insert((address, reg + i as u16), *b);
        }
        state.writes.push(WriteRecord {
            address,
            reg,
            data: bytes[2..].to_vec(),
        });
        Ok(())
    }
}

impl WriteRead for FakeBus {
    type Error = FakeError;

    fn write_read(
        &mut self,
        address: u8,
        bytes: &[u8],
        buffer: &mut [u8],
    ) -> Result<(), FakeError> {
        let reg = u16::from_be_bytes([bytes[0], bytes[1]]);
        let mut state = self.0.borrow_mut();
        if state.fail_all {
            return Err(FakeError::Nak { address, reg });
        }
        for (i, b) in buffer.iter_mut().enumerate() {
            *b = state
                .memory
                .get(&(address, reg + i as u16))
                .copied()
                .unwrap_or(0);
        }
        state.reads.push((address, reg));
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerEvent {
    SuppliesOn,
    SuppliesOff,
    ClockOn,
    ClockOff,
    Reset(bool),
}

#[derive(Clone, Default)]
pub struct FakePower {
    pub events: Rc<RefCell<Vec<PowerEvent>>>,
    pub fail_supplies: bool,
    pub fail_clock: bool,
    pub fail_reset: bool,
}

impl FakePower {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PowerEvent> {
        self.events.borrow().clone()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}

impl PowerControl for FakePower {
    type Error = ();

    fn enable_power(&mut self) -> Result<(), ()> {
        if self.fail_supplies {
            return Err(());
        }
        self.events.borrow_mut().push(PowerEvent::SuppliesOn);
        Ok(())
    }

    fn disable_power(&mut self) {
        self.events.borrow_mut().push(PowerEvent::SuppliesOff);
    }

    fn enable_clock(&mut self) -> Result<(), ()> {
        if self.fail_clock {
            return Err(());
        }
        self.events.borrow_mut().push(PowerEvent::ClockOn);
        Ok(())
    }

    fn disable_clock(&mut self) {
        self.events.borrow_mut().push(PowerEvent::ClockOff);
    }

    fn set_reset(&mut self, asserted: bool) -> Result<(), ()> {
        if self.fail_reset && !asserted {
            return Err(());
        }
        self.events.borrow_mut().push(PowerEvent::Reset(asserted));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingDelay {
    pub total_us: u64,
}

impl DelayUs<u32> for RecordingDelay {
    fn delay_us(&mut self, us: u32) {
        self.total_us += u64::from(us);
    }
}

pub type TestSensor = Imx477<FakeBus, FakePower>;

/// An attached, powered-off IMX477 plus handles on its fakes
pub fn attached(config: Config) -> (TestSensor, FakeBus, FakePower) {
    let bus = FakeBus::with_chip_id(0x0477);
    let power = FakePower::new();
    let mut delay = RecordingDelay::default();
    let sensor = Imx477::attach(bus.clone(), power.clone(), config, &mut delay)
        .expect("attach");
    bus.clear_log();
    power.clear();
    (sensor, bus, power)
}

/// Same as [`attached`], already streaming
pub fn streaming(config: Config) -> (TestSensor, FakeBus, FakePower) {
    let (mut sensor, bus, power) = attached(config);
    let mut delay = RecordingDelay::default();
    sensor.set_streaming(true, &mut delay).expect("stream on");
    (sensor, bus, power)
}
