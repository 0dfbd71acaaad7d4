/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Mode catalog: the supported readout modes of each bit depth

use crate::roi::Binning;
use crate::tables::{self, Reg};
use crate::{PIXEL_ARRAY_LEFT, PIXEL_ARRAY_TOP};

/// A rectangle in sensor pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Rect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

/// Frame interval in seconds, as `numerator / denominator`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Fraction {
    pub numerator: u32,
    pub denominator: u32,
}

impl Fraction {
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }
}

/// One readout configuration: geometry, timing floors and its register recipe
#[derive(Debug, PartialEq, Eq)]
pub struct Mode {
    pub width: u32,
    pub height: u32,
    /// Line length the recipe programs, in pixel clocks
    pub line_length_pix: u32,
    pub min_hblank: u32,
    pub min_vblank: u32,
    /// Analog crop of the pixel array this mode reads
    pub crop: Rect,
    /// Shortest frame interval
    pub timeperframe_min: Fraction,
    pub timeperframe_default: Fraction,
    /// Pixel binning the recipe programs
    pub binning: Binning,
    pub recipe: &'static [Reg],
}

/// Pixel bit depth; each depth has its own mode table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Family {
    Raw12,
    Raw10,
    Raw8,
}

impl Family {
    /// In enumeration order
    pub const ALL: [Family; 3] = [Family::Raw12, Family::Raw10, Family::Raw8];

    pub const fn bit_depth(self) -> u8 {
        match self {
            Family::Raw12 => 12,
            Family::Raw10 => 10,
            Family::Raw8 => 8,
        }
    }

    /// The first entry is the largest unbinned mode of the family, when it has one
    pub fn modes(self) -> &'static [Mode] {
        match self {
            Family::Raw12 => &MODES_12BIT,
            Family::Raw10 => &MODES_10BIT,
            Family::Raw8 => &MODES_8BIT,
        }
    }

    /// The mode whose recipe is programmed for every format of this family
    pub fn base_mode(self) -> &'static Mode {
        &self.modes()[0]
    }

    /// Smallest mode at least as large as the request in both dimensions,
    /// else the largest mode. Ties keep table order.
    pub fn nearest_mode(self, width: u32, height: u32) -> &'static Mode {
        let modes = self.modes();
        let area = |m: &Mode| u64::from(m.width) * u64::from(m.height);

        let mut fitting: Option<&'static Mode> = None;
        for mode in modes {
            if mode.width >= width && mode.height >= height {
                match fitting {
                    Some(best) if area(best) <= area(mode) => {}
                    _ => fitting = Some(mode),
                }
            }
        }
        if let Some(mode) = fitting {
            return mode;
        }

        let mut largest = &modes[0];
        for mode in modes {
            if area(mode) > area(largest) {
                largest = mode;
            }
        }
        largest
    }

    /// First mode of the family programming `binning`, else the base mode
    pub fn mode_for_binning(self, binning: Binning) -> &'static Mode {
        self.modes()
            .iter()
            .find(|m| m.binning == binning)
            .unwrap_or_else(|| self.base_mode())
    }
}

static MODES_12BIT: [Mode; 3] = [
    Mode {
        width: 4056,
        height: 3040,
        line_length_pix: 0x5dc0,
        min_hblank: 100,
        min_vblank: 42,
        crop: Rect::new(PIXEL_ARRAY_LEFT, PIXEL_ARRAY_TOP, 4056, 3040),
        timeperframe_min: Fraction::new(100, 1000),
        timeperframe_default: Fraction::new(100, 1000),
        binning: Binning::X1,
        recipe: tables::MODE_4056X3040_RAW12,
    },
    Mode {
        width: 2028,
        height: 1520,
        line_length_pix: 0x31c4,
        min_hblank: 800,
        min_vblank: 32,
        crop: Rect::new(PIXEL_ARRAY_LEFT, PIXEL_ARRAY_TOP, 4056, 3040),
        timeperframe_min: Fraction::new(100, 4000),
        timeperframe_default: Fraction::new(100, 3000),
        binning: Binning::X2,
        recipe: tables::MODE_2028X1520_RAW12,
    },
    Mode {
        width: 2028,
        height: 1080,
        line_length_pix: 0x31c4,
        min_hblank: 800,
        min_vblank: 32,
        crop: Rect::new(PIXEL_ARRAY_LEFT, PIXEL_ARRAY_TOP + 440, 4056, 2160),
        timeperframe_min: Fraction::new(100, 5000),
        timeperframe_default: Fraction::new(100, 3000),
        binning: Binning::X2,
        recipe: tables::MODE_2028X1080_RAW12,
    },
];

static MODES_10BIT: [Mode; 1] = [Mode {
    width: 1332,
    height: 990,
    line_length_pix: 6664,
    min_hblank: 800,
    min_vblank: 32,
    crop: Rect::new(PIXEL_ARRAY_LEFT + 696, PIXEL_ARRAY_TOP + 528, 2664, 1980),
    timeperframe_min: Fraction::new(100, 12000),
    timeperframe_default: Fraction::new(100, 12000),
    binning: Binning::X2,
    recipe: tables::MODE_1332X990_RAW10,
}];

static MODES_8BIT: [Mode; 3] = [
    Mode {
        width: 1332,
        height: 990,
        line_length_pix: 6664,
        min_hblank: 800,
        min_vblank: 32,
        crop: Rect::new(PIXEL_ARRAY_LEFT + 696, PIXEL_ARRAY_TOP + 528, 2664, 1980),
        timeperframe_min: Fraction::new(100, 12000),
        timeperframe_default: Fraction::new(100, 12000),
        binning: Binning::X2,
        recipe: tables::MODE_1332X990_RAW8,
    },
    Mode {
        width: 2028,
        height: 1080,
        line_length_pix: 0x31c4,
        min_hblank: 800,
        min_vblank: 32,
        crop: Rect::new(PIXEL_ARRAY_LEFT, PIXEL_ARRAY_TOP + 440, 4056, 2160),
        timeperframe_min: Fraction::new(100, 5000),
        timeperframe_default: Fraction::new(100, 3000),
        binning: Binning::X2,
        recipe: tables::MODE_2028X1080_RAW8,
    },
    Mode {
        width: 640,
        height: 480,
        line_length_pix: 5200,
        min_hblank: 800,
        min_vblank: 32,
        crop: Rect::new(PIXEL_ARRAY_LEFT, PIXEL_ARRAY_TOP + 440, 640, 480),
        timeperframe_min: Fraction::new(100, 5000),
        timeperframe_default: Fraction::new(100, 8000),
        binning: Binning::X2,
        recipe: tables::MODE_640X480_RAW8,
    },
];
