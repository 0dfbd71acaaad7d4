/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Register map and fixed limits of the IMX477 family

/// Value written to [`GeneralRegisters::ModeSelect`] to enter software standby
pub const MODE_STANDBY: u8 = 0x00;
/// Value written to [`GeneralRegisters::ModeSelect`] to start streaming
pub const MODE_STREAMING: u8 = 0x01;

/// Largest frame length the 16-bit frame length register accepts
pub const FRAME_LENGTH_MAX: u32 = 0xffdc;
/// Largest line length the line length register accepts
pub const LINE_LENGTH_MAX: u32 = 0xfff0;

/// Frame lengths above [`FRAME_LENGTH_MAX`] are right-shifted at most this many times
pub const LONG_EXP_SHIFT_MAX: u8 = 7;

/// Lines of frame length the sensor reserves beyond the exposure time
pub const EXPOSURE_OFFSET: u32 = 22;
pub const EXPOSURE_MIN: u32 = 4;
pub const EXPOSURE_MAX: u32 = FRAME_LENGTH_MAX - EXPOSURE_OFFSET;
pub const EXPOSURE_DEFAULT: u32 = 0x640;

pub const ANALOG_GAIN_MIN: u32 = 0;
pub const ANALOG_GAIN_MAX: u32 = 978;
pub const ANALOG_GAIN_DEFAULT: u32 = 0;

pub const DIGITAL_GAIN_MIN: u32 = 0x0100;
pub const DIGITAL_GAIN_MAX: u32 = 0xffff;
pub const DIGITAL_GAIN_DEFAULT: u32 = 0x0100;

pub const TEST_PATTERN_COLOUR_MAX: u32 = 0x0fff;

/// Pixel rate is fixed for every mode
pub const PIXEL_RATE: u32 = 840_000_000;
/// The only supported CSI-2 link frequency
pub const LINK_FREQUENCY: u32 = 450_000_000;
/// The only supported external clock frequency
pub const EXTCLK_FREQUENCY: u32 = 24_000_000;

#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GeneralRegisters {
    ChipId = 0x0016,
    ModeSelect = 0x0100,
    /// bit 0: horizontal mirror, bit 1: vertical flip
    Orientation = 0x0101,
    Exposure = 0x0202,
    AnalogGain = 0x0204,
    DigitalGain = 0x020e,
    FrameLength = 0x0340,
    LineLength = 0x0342,
    TestPattern = 0x0600,
    TestPatternRed = 0x0602,
    TestPatternGreenR = 0x0604,
    TestPatternBlue = 0x0606,
    TestPatternGreenB = 0x0608,
    /// Mapped defect pixel correction enable
    DpcMapped = 0x0b05,
    /// Dynamic defect pixel correction enable
    DpcDynamic = 0x0b06,
    /// Frame length multiplier as a power of two
    LongExposureShift = 0x3100,
}

/// Analog crop, output size and digital crop window, all 16-bit
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CropRegisters {
    XStart = 0x0344,
    YStart = 0x0346,
    XEnd = 0x0348,
    YEnd = 0x034a,
    XSize = 0x034c,
    YSize = 0x034e,
    XDigitalCropSize = 0x040c,
    YDigitalCropSize = 0x040e,
}

/// Multi-camera vsync (XVS) synchronisation, all 8-bit
#[repr(u16)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncRegisters {
    /// Automatic frame length extension; must be off when slaved to an external vsync
    FrameLengthAutoAdjust = 0x0350,
    XvsIoCtrl = 0x3040,
    MasterSlaveSelect = 0x3041,
    MultiCameraMode = 0x3f0b,
    ExtOutEnable = 0x4b81,
}
