/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/
#![cfg_attr(not(test), no_std)]

//! Configuration driver for the Sony IMX477 (and IMX378) image sensor
//! This imaging sensor has multiple interfaces:
//! - Two-wire i2c for configuration registers (i2c)
//! - MIPI CSI-2 pixel and embedded data out
//! - XVS vertical sync in/out for multi-camera setups
//! - XCLR reset and power supplies
//! This driver is concerned only with the i2c interface and power sequencing.
//!
//! A session starts powered off. Controls and formats set while powered off
//! are stored and replayed when streaming starts:
//! - [`Imx477::attach`] checks the chip and returns it to idle
//! - [`Imx477::set_format`] picks a bit depth and output size
//! - [`Imx477::set_streaming`] powers up, programs and starts frames

mod bus;
mod config;
mod controls;
mod error;
pub mod format;
mod modes;
mod power;
pub mod regs;
mod roi;
mod sensor;
pub mod tables;
pub mod timing;

pub use bus::{RegWidth, RegisterBus};
pub use config::{ChipVariant, Config, TriggerMode};
pub use controls::{
    Capability, ControlId, ControlRange, ControlSet, ControlState, TestPattern, CONTROL_COUNT,
};
pub use error::{Error, PowerStage};
pub use format::{
    Format, FrameSize, MetadataFormat, PixelCode, Resolution, SelectionTarget, METADATA_FORMAT,
};
pub use modes::{Family, Fraction, Mode, Rect};
pub use power::{PinPower, PowerControl};
pub use regs::{CropRegisters, GeneralRegisters, SyncRegisters};
pub use roi::{Binning, CropWindow, Roi};
pub use sensor::{Imx477, SensorState};
pub use tables::Reg;
pub use timing::{FrameLength, TimingLimits};

/// 7-bit address, fixed by the sensor
pub const DEFAULT_I2C_ADDRESS: u8 = 0x1A;

/// Minimum wait after XCLR goes high before the first register access
pub const XCLR_MIN_DELAY_US: u32 = 8000;

/// Whole die, including optical black
pub const NATIVE_WIDTH: u32 = 4072;
pub const NATIVE_HEIGHT: u32 = 3176;

/// Active pixel array within the die
pub const PIXEL_ARRAY_LEFT: u32 = 8;
pub const PIXEL_ARRAY_TOP: u32 = 16;
pub const PIXEL_ARRAY_WIDTH: u32 = 4056;
pub const PIXEL_ARRAY_HEIGHT: u32 = 3040;
