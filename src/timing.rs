/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Frame length, line length and exposure register arithmetic.
//!
//! Frame rate is not set directly: it follows from
//! `(roi_width + hblank) * (roi_height + vblank)` at the fixed pixel rate.
//! Frame lengths beyond the 16-bit register are expressed with a long
//! exposure shift; the sensor multiplies the frame length register by
//! `1 << shift`, so exposure has to be divided by the same factor.

use crate::modes::Mode;
use crate::regs::{
    EXPOSURE_MAX, EXPOSURE_MIN, EXPOSURE_OFFSET, FRAME_LENGTH_MAX, LINE_LENGTH_MAX,
    LONG_EXP_SHIFT_MAX,
};

/// Frame length register value plus the long exposure shift that scales it
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameLength {
    pub lines: u16,
    pub shift: u8,
}

/// Frame length for `roi_height` active lines and `requested_vblank` blanking
/// lines, the blanking raised to at least `min_vblank`.
///
/// The shift is the smallest one bringing the length under
/// [`FRAME_LENGTH_MAX`]. Lengths too long even at [`LONG_EXP_SHIFT_MAX`]
/// are clamped.
pub fn compute_frame_length(min_vblank: u32, roi_height: u32, requested_vblank: u32) -> FrameLength {
    let mut total = roi_height.saturating_add(requested_vblank.max(min_vblank));
    let mut shift = 0u8;

    while total > FRAME_LENGTH_MAX {
        if shift == LONG_EXP_SHIFT_MAX {
            log::warn!(
                "frame length {} needs a shift above {}, clamping",
                total,
                LONG_EXP_SHIFT_MAX
            );
            total = FRAME_LENGTH_MAX;
            break;
        }
        shift += 1;
        total >>= 1;
    }

    FrameLength {
        lines: total as u16,
        shift,
    }
}

/// Exposure register value for a logical exposure in lines
pub fn exposure_register(exposure: u32, shift: u8) -> u16 {
    (exposure.clamp(EXPOSURE_MIN, EXPOSURE_MAX) >> shift) as u16
}

/// Line length register value, `roi_width + hblank` capped at [`LINE_LENGTH_MAX`]
pub fn line_length(roi_width: u32, hblank: u32) -> u16 {
    roi_width.saturating_add(hblank).min(LINE_LENGTH_MAX) as u16
}

/// Lowest legal vertical blanking: the exposure plus its offset, and never
/// less than the mode allows
pub fn vblank_floor(mode: &Mode, exposure: u32) -> u32 {
    (exposure + EXPOSURE_OFFSET).max(mode.min_vblank)
}

/// Blanking ranges for the current mode and ROI height
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimingLimits {
    pub min_vblank: u32,
    pub max_vblank: u32,
    pub min_hblank: u32,
    pub max_hblank: u32,
    /// Shift in effect for the last frame length written
    pub long_exposure_shift: u8,
}

impl TimingLimits {
    pub fn new(mode: &Mode, roi_height: u32, exposure: u32) -> Self {
        Self {
            min_vblank: vblank_floor(mode, exposure),
            max_vblank: (FRAME_LENGTH_MAX << LONG_EXP_SHIFT_MAX).saturating_sub(roi_height),
            min_hblank: mode.min_hblank,
            max_hblank: LINE_LENGTH_MAX,
            long_exposure_shift: 0,
        }
    }
}
