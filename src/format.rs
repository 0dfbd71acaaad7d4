/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Pixel codes and format resolution.
//!
//! Every Bayer family lists its four orders as RGGB, GRBG, GBRG, BGGR.
//! Index bit 0 is a horizontal flip and bit 1 a vertical flip, so the
//! order seen with flips applied is found by replacing the low two bits.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::modes::{Family, Mode};
use crate::roi::Roi;

/// Media bus code of the embedded data stream
pub const SENSOR_DATA_CODE: u32 = 0x7002;
/// Bytes per embedded data line
pub const EMBEDDED_LINE_WIDTH: u32 = 16384;
pub const NUM_EMBEDDED_LINES: u32 = 1;

/// Media bus pixel codes the sensor can produce
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PixelCode {
    Srggb12 = 0x3012,
    Sgrbg12 = 0x3011,
    Sgbrg12 = 0x3010,
    Sbggr12 = 0x3008,
    Srggb10 = 0x300f,
    Sgrbg10 = 0x300a,
    Sgbrg10 = 0x300e,
    Sbggr10 = 0x3007,
    Srggb8 = 0x3014,
    Sgrbg8 = 0x3002,
    Sgbrg8 = 0x3013,
    Sbggr8 = 0x3001,
    /// Monochrome sensors; has no Bayer order to flip
    Y8 = 0x2001,
}

/// Groups of four, one group per family, Y8 padding the last group
const CODES: [PixelCode; 16] = [
    PixelCode::Srggb12,
    PixelCode::Sgrbg12,
    PixelCode::Sgbrg12,
    PixelCode::Sbggr12,
    PixelCode::Srggb10,
    PixelCode::Sgrbg10,
    PixelCode::Sgbrg10,
    PixelCode::Sbggr10,
    PixelCode::Srggb8,
    PixelCode::Sgrbg8,
    PixelCode::Sgbrg8,
    PixelCode::Sbggr8,
    PixelCode::Y8,
    PixelCode::Y8,
    PixelCode::Y8,
    PixelCode::Y8,
];

impl PixelCode {
    pub fn from_raw(code: u32) -> Option<Self> {
        CODES.iter().copied().find(|c| c.raw() == code)
    }

    pub const fn raw(self) -> u32 {
        self as u32
    }

    fn index(self) -> usize {
        CODES.iter().position(|c| *c == self).unwrap_or(0)
    }

    /// Mode table serving this code. Y8 is read out with the 8-bit recipes.
    pub fn family(self) -> Family {
        match self.index() / 4 {
            0 => Family::Raw12,
            1 => Family::Raw10,
            _ => Family::Raw8,
        }
    }

    /// The code of the same family with the Bayer order the given flips produce
    pub fn with_flips(self, hflip: bool, vflip: bool) -> Self {
        let mut i = self.index() & !3;
        if vflip {
            i |= 2;
        }
        if hflip {
            i |= 1;
        }
        CODES[i]
    }

    /// Flip-adjust a raw bus code. Codes outside the table are treated as
    /// the first 12-bit code.
    pub fn flip_adjusted(code: u32, hflip: bool, vflip: bool) -> Self {
        Self::from_raw(code)
            .unwrap_or(CODES[0])
            .with_flips(hflip, vflip)
    }

    /// Code advertised at enumeration `index`, one per family, already
    /// reflecting the current flips
    pub fn enumerate(index: usize, hflip: bool, vflip: bool) -> Option<Self> {
        Family::ALL
            .get(index)
            .map(|_| CODES[index * 4].with_flips(hflip, vflip))
    }
}

/// Active format of the image pad
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Format {
    pub code: PixelCode,
    pub width: u32,
    pub height: u32,
}

/// Format of the embedded data pad. Fixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MetadataFormat {
    pub code: u32,
    pub width: u32,
    pub height: u32,
}

pub const METADATA_FORMAT: MetadataFormat = MetadataFormat {
    code: SENSOR_DATA_CODE,
    width: EMBEDDED_LINE_WIDTH,
    height: NUM_EMBEDDED_LINES,
};

/// Frame size advertised by enumeration. Modes are discrete, so minimum
/// and maximum coincide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

/// Rectangles reported by selection queries
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionTarget {
    /// Pixel array region being read out
    Crop,
    /// Whole die, including optical black
    NativeSize,
    /// Active pixel array
    CropDefault,
    CropBounds,
}

/// Outcome of resolving a requested format
#[derive(Clone, Copy, Debug)]
pub struct Resolution {
    pub family: Family,
    pub code: PixelCode,
    /// Mode that would fit the request best. Reported only.
    pub nearest: &'static Mode,
    /// Mode actually programmed: always the family's base mode
    pub mode: &'static Mode,
    pub roi: Roi,
}

/// Resolve a format request against the mode tables.
///
/// The base mode of the code's family is used and the request becomes a
/// window centred in it. Sizes larger than the mode are clamped.
pub fn resolve(code: PixelCode, width: u32, height: u32) -> Resolution {
    let family = code.family();
    let nearest = family.nearest_mode(width, height);
    let mode = family.base_mode();

    let clamped_width = width.clamp(1, mode.width);
    let clamped_height = height.clamp(1, mode.height);
    if clamped_width != width || clamped_height != height {
        log::warn!(
            "requested {}x{} does not fit {}x{}, clamping",
            width,
            height,
            mode.width,
            mode.height
        );
    }
    log::debug!(
        "format {:?} {}x{}: nearest mode {}x{}",
        code,
        width,
        height,
        nearest.width,
        nearest.height
    );

    Resolution {
        family,
        code,
        nearest,
        mode,
        roi: Roi::centered(mode, clamped_width, clamped_height),
    }
}
