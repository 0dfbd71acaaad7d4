/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Register I/O over the two-wire control interface.
//!
//! Registers have 16-bit addresses. Multi-byte values are big-endian and
//! auto-increment across consecutive addresses.

use embedded_hal::blocking::i2c::{Write, WriteRead};

use crate::tables::Reg;
use crate::Error;

/// Number of data bytes moved by a single register access
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegWidth {
    U8 = 1,
    U16 = 2,
    U24 = 3,
    U32 = 4,
}

impl RegWidth {
    pub const fn bytes(self) -> usize {
        self as usize
    }

    /// Width from a byte count in `1..=4`
    pub const fn from_bytes(count: u8) -> Option<Self> {
        match count {
            1 => Some(RegWidth::U8),
            2 => Some(RegWidth::U16),
            3 => Some(RegWidth::U24),
            4 => Some(RegWidth::U32),
            _ => None,
        }
    }
}

/// Pack the register address and the low `width` bytes of `val`, both big-endian.
/// Returns the buffer and the number of bytes used.
fn encode_write(reg: u16, width: RegWidth, val: u32) -> ([u8; 6], usize) {
    let mut buf = [0u8; 6];
    buf[..2].copy_from_slice(&reg.to_be_bytes());
    let n = width.bytes();
    buf[2..2 + n].copy_from_slice(&val.to_be_bytes()[4 - n..]);
    (buf, 2 + n)
}

fn decode_read(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b))
}

/// Owns the bus and the sensor's 7-bit target address
pub struct RegisterBus<I2C> {
    base_address: u8,
    i2c: I2C,
}

impl<I2C, CommE> RegisterBus<I2C>
where
    I2C: Write<Error = CommE> + WriteRead<Error = CommE>,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            base_address: address,
            i2c,
        }
    }

    pub fn address(&self) -> u8 {
        self.base_address
    }

    /// Give the bus back, e.g. to share it after detaching the sensor
    pub fn release(self) -> I2C {
        self.i2c
    }

    /// Write `width` bytes of `val` to `reg` in one bus transaction
    pub fn write_reg(
        &mut self,
        reg: u16,
        width: RegWidth,
        val: u32,
    ) -> Result<(), Error<CommE>> {
        let target = self.base_address;
        self.write_reg_to(target, reg, width, val)
    }

    /// Same as [`write_reg`](Self::write_reg) but on another device sharing the bus
    pub fn write_reg_to(
        &mut self,
        target: u8,
        reg: u16,
        width: RegWidth,
        val: u32,
    ) -> Result<(), Error<CommE>> {
        let (buf, len) = encode_write(reg, width, val);
        self.i2c.write(target, &buf[..len]).map_err(Error::Comm)
    }

    /// Address write followed by a repeated-start read of `width` bytes
    pub fn read_reg(
        &mut self,
        reg: u16,
        width: RegWidth,
    ) -> Result<u32, Error<CommE>> {
        let target = self.base_address;
        self.read_reg_from(target, reg, width)
    }

    /// Same as [`read_reg`](Self::read_reg) but on another device sharing the bus
    pub fn read_reg_from(
        &mut self,
        target: u8,
        reg: u16,
        width: RegWidth,
    ) -> Result<u32, Error<CommE>> {
        let cmd_buf = reg.to_be_bytes();
        let mut recv_buf = [0u8; 4];
        let data = &mut recv_buf[..width.bytes()];
        self.i2c
            .write_read(target, &cmd_buf, data)
            .map_err(Error::Comm)?;
        Ok(decode_read(data))
    }

    pub fn write_reg_u8(&mut self, reg: u16, val: u8) -> Result<(), Error<CommE>> {
        self.write_reg(reg, RegWidth::U8, u32::from(val))
    }

    pub fn write_reg_u16(
        &mut self,
        reg: u16,
        data: u16,
    ) -> Result<(), Error<CommE>> {
        self.write_reg(reg, RegWidth::U16, u32::from(data))
    }

    /// Apply a recipe in order, stopping at the first failed write.
    /// Nothing already written is undone.
    pub fn write_list(&mut self, regs: &[Reg]) -> Result<(), Error<CommE>> {
        for &(address, val) in regs {
            if let Err(err) = self.write_reg_u8(address, val) {
                log::error!("failed to write reg {:#06x}", address);
                return Err(match err {
                    Error::Comm(cause) => Error::RegisterWrite { address, cause },
                    other => other,
                });
            }
        }
        Ok(())
    }
}
