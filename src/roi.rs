/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Region of interest: which part of the pixel array is read out.
//!
//! The ROI start must be a multiple of 4 and its size a multiple of 16.
//! The sensor tolerates violations, so they are logged rather than refused;
//! start coordinates are forced down to the next multiple of 4.

use crate::modes::Mode;
use crate::regs::CropRegisters;
use crate::{PIXEL_ARRAY_HEIGHT, PIXEL_ARRAY_WIDTH};

const START_ALIGN_MASK: u32 = !3;
const SIZE_ALIGN: u32 = 16;

/// N x N pixel binning
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Binning {
    #[default]
    X1 = 1,
    X2 = 2,
}

impl Binning {
    pub const fn factor(self) -> u32 {
        self as u32
    }

    pub const fn from_factor(factor: u32) -> Option<Self> {
        match factor {
            1 => Some(Binning::X1),
            2 => Some(Binning::X2),
            _ => None,
        }
    }
}

/// Output window in sensor pixel coordinates. `width` and `height` are the
/// output size; with binning the window covers `size * binning` pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Roi {
    pub start_x: u32,
    pub start_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    pub const fn new(start_x: u32, start_y: u32, width: u32, height: u32) -> Self {
        Self {
            start_x,
            start_y,
            width,
            height,
        }
    }

    /// A `width` x `height` window centred in `mode`, start aligned down to 4
    pub fn centered(mode: &Mode, width: u32, height: u32) -> Self {
        Self {
            start_x: (mode.width.saturating_sub(width) / 2) & START_ALIGN_MASK,
            start_y: (mode.height.saturating_sub(height) / 2) & START_ALIGN_MASK,
            width,
            height,
        }
    }

    pub fn is_aligned(&self) -> bool {
        self.width % SIZE_ALIGN == 0
            && self.height % SIZE_ALIGN == 0
            && self.start_x & 3 == 0
            && self.start_y & 3 == 0
    }
}

/// Start aligned down to 4, pulled back so `span` pixels fit in `limit`
fn fit_start(start: u32, span: u32, limit: u32) -> u32 {
    let aligned = start & START_ALIGN_MASK;
    let max = limit.saturating_sub(span) & START_ALIGN_MASK;
    if aligned > max {
        log::warn!(
            "ROI start {} + {} exceeds the pixel array ({}), using {}",
            start,
            span,
            limit,
            max
        );
    }
    aligned.min(max)
}

/// Register values programming one ROI
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CropWindow {
    pub x_start: u16,
    pub y_start: u16,
    pub x_end: u16,
    pub y_end: u16,
    pub x_size: u16,
    pub y_size: u16,
    pub x_digital_crop: u16,
    pub y_digital_crop: u16,
}

impl CropWindow {
    /// Compute the crop registers for `roi`, logging alignment violations.
    /// A window running past the pixel array is moved back inside it, and
    /// cut at the array edge if it is larger than the array.
    ///
    /// Flips do not swap start and end: the sensor mirrors readout within the
    /// same window.
    pub fn new(roi: &Roi, binning: Binning) -> Self {
        if roi.width % SIZE_ALIGN != 0 {
            log::warn!("ROI width {} should be a multiple of 16", roi.width);
        }
        if roi.height % SIZE_ALIGN != 0 {
            log::warn!("ROI height {} should be a multiple of 16", roi.height);
        }
        if roi.start_x & 3 != 0 {
            log::warn!("ROI start x {} should be a multiple of 4", roi.start_x);
        }
        if roi.start_y & 3 != 0 {
            log::warn!("ROI start y {} should be a multiple of 4", roi.start_y);
        }

        let x_span = roi.width * binning.factor();
        let y_span = roi.height * binning.factor();
        let x_start = fit_start(roi.start_x, x_span, PIXEL_ARRAY_WIDTH);
        let y_start = fit_start(roi.start_y, y_span, PIXEL_ARRAY_HEIGHT);
        let x_end = (x_start + x_span).min(PIXEL_ARRAY_WIDTH) - 1;
        let y_end = (y_start + y_span).min(PIXEL_ARRAY_HEIGHT) - 1;

        Self {
            x_start: x_start as u16,
            y_start: y_start as u16,
            x_end: x_end as u16,
            y_end: y_end as u16,
            x_size: roi.width as u16,
            y_size: roi.height as u16,
            x_digital_crop: x_span as u16,
            y_digital_crop: y_span as u16,
        }
    }

    /// Registers in the order they must be written
    pub fn registers(&self) -> [(CropRegisters, u16); 8] {
        [
            (CropRegisters::XStart, self.x_start),
            (CropRegisters::YStart, self.y_start),
            (CropRegisters::XEnd, self.x_end),
            (CropRegisters::YEnd, self.y_end),
            (CropRegisters::XSize, self.x_size),
            (CropRegisters::YSize, self.y_size),
            (CropRegisters::XDigitalCropSize, self.x_digital_crop),
            (CropRegisters::YDigitalCropSize, self.y_digital_crop),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::Family;
    use rstest::rstest;

    #[rstest]
    #[case(Roi::new(1068, 976, 1920, 1088), Binning::X1)]
    #[case(Roi::new(0, 0, 4048, 3040), Binning::X1)]
    #[case(Roi::new(8, 4, 1024, 768), Binning::X2)]
    #[case(Roi::new(2024, 1512, 1008, 752), Binning::X2)]
    fn aligned_roi_registers(#[case] roi: Roi, #[case] binning: Binning) {
        assert!(roi.is_aligned());
        let win = CropWindow::new(&roi, binning);
        let b = binning.factor();
        assert_eq!(u32::from(win.x_start), roi.start_x);
        assert_eq!(u32::from(win.y_start), roi.start_y);
        assert_eq!(u32::from(win.x_end), roi.start_x + roi.width * b - 1);
        assert_eq!(u32::from(win.y_end), roi.start_y + roi.height * b - 1);
        assert_eq!(u32::from(win.x_size), roi.width);
        assert_eq!(u32::from(win.y_size), roi.height);
        assert_eq!(u32::from(win.x_digital_crop), roi.width * b);
        assert_eq!(u32::from(win.y_digital_crop), roi.height * b);
    }

    #[test]
    fn unaligned_start_is_masked_down() {
        let win = CropWindow::new(&Roi::new(1070, 983, 640, 480), Binning::X1);
        assert_eq!(win.x_start, 1068);
        assert_eq!(win.y_start, 980);
        assert_eq!(win.x_end, 1068 + 640 - 1);
        assert_eq!(win.y_end, 980 + 480 - 1);
    }

    #[rstest]
    #[case(Roi::new(3000, 0, 1920, 1080), Binning::X1, 2136, 4055)]
    #[case(Roi::new(0xfff0, 0, 1920, 1080), Binning::X1, 2136, 4055)]
    #[case(Roi::new(2136, 0, 1920, 1080), Binning::X1, 2136, 4055)]
    #[case(Roi::new(1000, 0, 2028, 1520), Binning::X2, 0, 4055)]
    fn window_past_array_edge_is_pulled_back(
        #[case] roi: Roi,
        #[case] binning: Binning,
        #[case] x_start: u16,
        #[case] x_end: u16,
    ) {
        let win = CropWindow::new(&roi, binning);
        assert_eq!((win.x_start, win.x_end), (x_start, x_end));
        assert_eq!(u32::from(win.x_size), roi.width);
    }

    #[test]
    fn oversized_window_is_cut_at_array_edge() {
        let win = CropWindow::new(&Roi::new(0, 100, 4096, 3200), Binning::X1);
        assert_eq!((win.x_start, win.y_start), (0, 0));
        assert_eq!((win.x_end, win.y_end), (4055, 3039));
    }

    #[test]
    fn register_order_is_fixed() {
        let win = CropWindow::new(&Roi::new(0, 0, 64, 32), Binning::X1);
        let order: [CropRegisters; 8] = win.registers().map(|(reg, _)| reg);
        assert_eq!(
            order,
            [
                CropRegisters::XStart,
                CropRegisters::YStart,
                CropRegisters::XEnd,
                CropRegisters::YEnd,
                CropRegisters::XSize,
                CropRegisters::YSize,
                CropRegisters::XDigitalCropSize,
                CropRegisters::YDigitalCropSize,
            ]
        );
    }

    #[test]
    fn centered_start_in_full_mode() {
        let roi = Roi::centered(Family::Raw12.base_mode(), 1920, 1080);
        assert_eq!(roi, Roi::new(1068, 980, 1920, 1080));
        let roi = Roi::centered(Family::Raw12.base_mode(), 1000, 1000);
        // (4056 - 1000) / 2 = 1528, (3040 - 1000) / 2 = 1020 -> 1020
        assert_eq!((roi.start_x, roi.start_y), (1528, 1020));
        let roi = Roi::centered(Family::Raw12.base_mode(), 1002, 998);
        // 1527 -> 1524, 1021 -> 1020
        assert_eq!((roi.start_x, roi.start_y), (1524, 1020));
    }

    #[test]
    fn binning_factor_roundtrip() {
        assert_eq!(Binning::from_factor(2), Some(Binning::X2));
        assert_eq!(Binning::from_factor(3), None);
        assert_eq!(Binning::default().factor(), 1);
    }
}
