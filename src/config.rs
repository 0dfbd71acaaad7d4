/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Attach-time configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::regs::{SyncRegisters, EXTCLK_FREQUENCY};
use crate::tables::{self, Reg};
use crate::{Error, DEFAULT_I2C_ADDRESS, XCLR_MIN_DELAY_US};

/// Role of the sensor in a multi-camera vsync chain
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TriggerMode {
    /// Free running, no sync output
    #[default]
    Standalone = 0,
    /// Drives XVS for other sensors
    Source = 1,
    /// Follows an external XVS
    Sink = 2,
}

impl TriggerMode {
    pub const fn from_value(value: u32) -> Option<Self> {
        match value {
            0 => Some(TriggerMode::Standalone),
            1 => Some(TriggerMode::Source),
            2 => Some(TriggerMode::Sink),
            _ => None,
        }
    }

    /// Sync register values for this role, in write order
    pub fn registers(self) -> [(SyncRegisters, u8); 5] {
        let synced = self != TriggerMode::Standalone;
        let master = self != TriggerMode::Sink;
        let drives_xvs = self == TriggerMode::Source;
        [
            // a slaved frame length must not stretch on its own
            (SyncRegisters::FrameLengthAutoAdjust, u8::from(!synced)),
            (SyncRegisters::MultiCameraMode, u8::from(synced)),
            (SyncRegisters::MasterSlaveSelect, u8::from(master)),
            (SyncRegisters::XvsIoCtrl, u8::from(drives_xvs)),
            (SyncRegisters::ExtOutEnable, u8::from(drives_xvs)),
        ]
    }
}

/// Sensors sharing this register map, told apart by their chip ID
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ChipVariant {
    Imx477,
    Imx378,
}

impl ChipVariant {
    pub const fn chip_id(self) -> u16 {
        match self {
            ChipVariant::Imx477 => 0x0477,
            ChipVariant::Imx378 => 0x0378,
        }
    }

    pub const fn from_chip_id(id: u16) -> Option<Self> {
        match id {
            0x0477 => Some(ChipVariant::Imx477),
            0x0378 => Some(ChipVariant::Imx378),
            _ => None,
        }
    }

    /// Written after the common recipe, once per power cycle
    pub fn extra_regs(self) -> &'static [Reg] {
        match self {
            ChipVariant::Imx477 => &[],
            ChipVariant::Imx378 => tables::IMX378_EXTRA,
        }
    }
}

/// Settings fixed for the lifetime of a sensor session
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Config {
    /// 7-bit bus address
    pub address: u8,
    /// Enable on-sensor defect pixel correction when streaming starts
    pub dpc_enable: bool,
    /// Initial vsync role; the trigger mode control can change it later
    pub trigger_mode: TriggerMode,
    /// Expected chip. `None` accepts any known chip ID.
    pub variant: Option<ChipVariant>,
    /// Wait after releasing reset before the first register access
    pub settle_delay_us: u32,
    /// Frequency of the external clock feeding INCK
    pub extclk_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: DEFAULT_I2C_ADDRESS,
            dpc_enable: true,
            trigger_mode: TriggerMode::Standalone,
            variant: None,
            settle_delay_us: XCLR_MIN_DELAY_US,
            extclk_hz: EXTCLK_FREQUENCY,
        }
    }
}

impl Config {
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    pub fn with_dpc(mut self, enable: bool) -> Self {
        self.dpc_enable = enable;
        self
    }

    pub fn with_trigger_mode(mut self, mode: TriggerMode) -> Self {
        self.trigger_mode = mode;
        self
    }

    pub fn with_variant(mut self, variant: ChipVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn with_settle_delay_us(mut self, delay_us: u32) -> Self {
        self.settle_delay_us = delay_us;
        self
    }

    pub fn with_extclk_hz(mut self, hz: u32) -> Self {
        self.extclk_hz = hz;
        self
    }

    /// The reset settle wait actually used; never shorter than the datasheet minimum
    pub fn settle_delay(&self) -> u32 {
        self.settle_delay_us.max(XCLR_MIN_DELAY_US)
    }

    pub fn validate<CommE>(&self) -> Result<(), Error<CommE>> {
        if self.extclk_hz != EXTCLK_FREQUENCY {
            return Err(Error::UnsupportedClock(self.extclk_hz));
        }
        Ok(())
    }
}
