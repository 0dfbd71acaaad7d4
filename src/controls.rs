/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Control registry: identities, ranges, capabilities and stored values.
//!
//! Values live here whether or not the sensor is powered. Applying them to
//! registers is the session's job, see [`Imx477::set_control`](crate::Imx477::set_control).

use bitflags::bitflags;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::regs::{
    CropRegisters, GeneralRegisters, SyncRegisters, ANALOG_GAIN_DEFAULT, ANALOG_GAIN_MAX,
    ANALOG_GAIN_MIN, DIGITAL_GAIN_DEFAULT, DIGITAL_GAIN_MAX, DIGITAL_GAIN_MIN, EXPOSURE_DEFAULT,
    EXPOSURE_MAX, EXPOSURE_MIN, LINK_FREQUENCY, PIXEL_RATE, TEST_PATTERN_COLOUR_MAX,
};

pub const CONTROL_COUNT: usize = 26;

/// Every control the sensor exposes. Declaration order is replay order
/// when streaming starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ControlId {
    PixelRate,
    LinkFrequency,
    VerticalBlanking,
    HorizontalBlanking,
    Exposure,
    AnalogueGain,
    DigitalGain,
    HorizontalFlip,
    VerticalFlip,
    TestPattern,
    TestPatternRed,
    TestPatternGreenR,
    TestPatternBlue,
    TestPatternGreenB,
    /// `(register << 16) | value`, one byte written
    RawWrite8,
    /// `(register << 16) | value`, two bytes written
    RawWrite16,
    /// `(register << 16) | value`, one byte written to [`GenericTarget`](Self::GenericTarget)
    RawWriteGeneric8,
    /// One byte at [`ReadAddress`](Self::ReadAddress) on [`GenericTarget`](Self::GenericTarget)
    RawReadGeneric8,
    /// 7-bit address of another device on the same bus
    GenericTarget,
    ReadAddress,
    RawRead8,
    RawRead16,
    RoiStartX,
    RoiStartY,
    TriggerMode,
    Binning,
}

impl ControlId {
    pub const ALL: [ControlId; CONTROL_COUNT] = [
        ControlId::PixelRate,
        ControlId::LinkFrequency,
        ControlId::VerticalBlanking,
        ControlId::HorizontalBlanking,
        ControlId::Exposure,
        ControlId::AnalogueGain,
        ControlId::DigitalGain,
        ControlId::HorizontalFlip,
        ControlId::VerticalFlip,
        ControlId::TestPattern,
        ControlId::TestPatternRed,
        ControlId::TestPatternGreenR,
        ControlId::TestPatternBlue,
        ControlId::TestPatternGreenB,
        ControlId::RawWrite8,
        ControlId::RawWrite16,
        ControlId::RawWriteGeneric8,
        ControlId::RawReadGeneric8,
        ControlId::GenericTarget,
        ControlId::ReadAddress,
        ControlId::RawRead8,
        ControlId::RawRead16,
        ControlId::RoiStartX,
        ControlId::RoiStartY,
        ControlId::TriggerMode,
        ControlId::Binning,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    pub const fn capability(self) -> Capability {
        match self {
            ControlId::PixelRate | ControlId::LinkFrequency => Capability::READABLE,
            ControlId::RawWrite8 | ControlId::RawWrite16 | ControlId::RawWriteGeneric8 => {
                Capability::WRITABLE
            }
            ControlId::RawReadGeneric8 | ControlId::RawRead8 | ControlId::RawRead16 => {
                Capability::READABLE.union(Capability::VOLATILE)
            }
            _ => Capability::READABLE.union(Capability::WRITABLE),
        }
    }

    /// Range before any format has been set
    pub const fn default_range(self) -> ControlRange {
        match self {
            ControlId::PixelRate => ControlRange::fixed(PIXEL_RATE as i64),
            ControlId::LinkFrequency => ControlRange::fixed(LINK_FREQUENCY as i64),
            ControlId::VerticalBlanking | ControlId::HorizontalBlanking => {
                ControlRange::new(0, 0xffff, 1, 0)
            }
            ControlId::Exposure => ControlRange::new(
                EXPOSURE_MIN as i64,
                EXPOSURE_MAX as i64,
                1,
                EXPOSURE_DEFAULT as i64,
            ),
            ControlId::AnalogueGain => ControlRange::new(
                ANALOG_GAIN_MIN as i64,
                ANALOG_GAIN_MAX as i64,
                1,
                ANALOG_GAIN_DEFAULT as i64,
            ),
            ControlId::DigitalGain => ControlRange::new(
                DIGITAL_GAIN_MIN as i64,
                DIGITAL_GAIN_MAX as i64,
                1,
                DIGITAL_GAIN_DEFAULT as i64,
            ),
            ControlId::HorizontalFlip | ControlId::VerticalFlip => ControlRange::new(0, 1, 1, 0),
            ControlId::TestPattern => {
                ControlRange::new(0, TestPattern::ALL.len() as i64 - 1, 1, 0)
            }
            // solid colour defaults to white
            ControlId::TestPatternRed
            | ControlId::TestPatternGreenR
            | ControlId::TestPatternBlue
            | ControlId::TestPatternGreenB => ControlRange::new(
                0,
                TEST_PATTERN_COLOUR_MAX as i64,
                1,
                TEST_PATTERN_COLOUR_MAX as i64,
            ),
            ControlId::RawWrite8
            | ControlId::RawWrite16
            | ControlId::RawWriteGeneric8
            | ControlId::RawReadGeneric8
            | ControlId::RawRead8
            | ControlId::RawRead16 => ControlRange::new(0, 0xffff_ffff, 1, 0),
            ControlId::GenericTarget => ControlRange::new(0, 0x7f, 1, 0),
            ControlId::ReadAddress => ControlRange::new(0, 0xffff, 1, 0),
            // alignment is enforced when the window is programmed
            ControlId::RoiStartX | ControlId::RoiStartY => ControlRange::new(0, 0xffff, 4, 0),
            ControlId::TriggerMode => ControlRange::new(0, 2, 1, 0),
            ControlId::Binning => ControlRange::new(1, 2, 1, 1),
        }
    }

    /// Registers written when this control is applied
    pub fn registers(self) -> &'static [u16] {
        match self {
            ControlId::VerticalBlanking => &[
                GeneralRegisters::FrameLength as u16,
                GeneralRegisters::LongExposureShift as u16,
            ],
            ControlId::HorizontalBlanking => &[GeneralRegisters::LineLength as u16],
            ControlId::Exposure => &[GeneralRegisters::Exposure as u16],
            ControlId::AnalogueGain => &[GeneralRegisters::AnalogGain as u16],
            ControlId::DigitalGain => &[GeneralRegisters::DigitalGain as u16],
            ControlId::HorizontalFlip | ControlId::VerticalFlip => {
                &[GeneralRegisters::Orientation as u16]
            }
            ControlId::TestPattern => &[GeneralRegisters::TestPattern as u16],
            ControlId::TestPatternRed => &[GeneralRegisters::TestPatternRed as u16],
            ControlId::TestPatternGreenR => &[GeneralRegisters::TestPatternGreenR as u16],
            ControlId::TestPatternBlue => &[GeneralRegisters::TestPatternBlue as u16],
            ControlId::TestPatternGreenB => &[GeneralRegisters::TestPatternGreenB as u16],
            ControlId::RoiStartX | ControlId::RoiStartY => &[
                CropRegisters::XStart as u16,
                CropRegisters::YStart as u16,
                CropRegisters::XEnd as u16,
                CropRegisters::YEnd as u16,
                CropRegisters::XSize as u16,
                CropRegisters::YSize as u16,
                CropRegisters::XDigitalCropSize as u16,
                CropRegisters::YDigitalCropSize as u16,
            ],
            ControlId::TriggerMode => &[
                SyncRegisters::FrameLengthAutoAdjust as u16,
                SyncRegisters::MultiCameraMode as u16,
                SyncRegisters::MasterSlaveSelect as u16,
                SyncRegisters::XvsIoCtrl as u16,
                SyncRegisters::ExtOutEnable as u16,
            ],
            _ => &[],
        }
    }

    /// Controls applied immediately even when the sensor is powered off
    pub const fn applies_while_powered_off(self) -> bool {
        matches!(
            self,
            ControlId::RawWrite8
                | ControlId::RawWrite16
                | ControlId::RawWriteGeneric8
                | ControlId::GenericTarget
                | ControlId::ReadAddress
        )
    }

    /// Controls that change the readout pattern, frozen while streaming
    pub const fn modifies_layout(self) -> bool {
        matches!(self, ControlId::HorizontalFlip | ControlId::VerticalFlip)
    }
}

bitflags! {
    /// What a client may do with a control
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Capability: u8 {
        const READABLE = 1 << 0;
        const WRITABLE = 1 << 1;
        /// Reading goes to the hardware instead of the stored value
        const VOLATILE = 1 << 2;
    }
}

/// Legal values of a control. `step` is advertised to clients; stored
/// values are only clamped to `min..=max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlRange {
    pub min: i64,
    pub max: i64,
    pub step: i64,
    pub default: i64,
}

impl ControlRange {
    pub const fn new(min: i64, max: i64, step: i64, default: i64) -> Self {
        Self {
            min,
            max,
            step,
            default,
        }
    }

    const fn fixed(value: i64) -> Self {
        Self::new(value, value, 1, value)
    }

    pub fn clamp(&self, value: i64) -> i64 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlState {
    pub value: i64,
    pub range: ControlRange,
    pub capability: Capability,
}

/// Stored state of every control, indexed by [`ControlId`]
#[derive(Clone, Debug)]
pub struct ControlSet {
    states: [ControlState; CONTROL_COUNT],
}

impl Default for ControlSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlSet {
    pub fn new() -> Self {
        let states = ControlId::ALL.map(|id| {
            let range = id.default_range();
            ControlState {
                value: range.default,
                range,
                capability: id.capability(),
            }
        });
        Self { states }
    }

    pub fn get(&self, id: ControlId) -> &ControlState {
        &self.states[id.index()]
    }

    pub fn value(&self, id: ControlId) -> i64 {
        self.states[id.index()].value
    }

    pub fn range(&self, id: ControlId) -> ControlRange {
        self.states[id.index()].range
    }

    pub fn iter(&self) -> impl Iterator<Item = (ControlId, &ControlState)> + '_ {
        ControlId::ALL.into_iter().zip(self.states.iter())
    }

    /// Clamp `value` into range and store it, returning what was stored
    pub(crate) fn store(&mut self, id: ControlId, value: i64) -> i64 {
        let state = &mut self.states[id.index()];
        state.value = state.range.clamp(value);
        state.value
    }

    /// Replace the range of `id`. A stored value outside the new range is
    /// clamped; returns `true` if that happened.
    pub(crate) fn modify_range(&mut self, id: ControlId, range: ControlRange) -> bool {
        let state = &mut self.states[id.index()];
        state.range = range;
        let clamped = range.clamp(state.value);
        let changed = clamped != state.value;
        state.value = clamped;
        changed
    }
}

/// Test pattern menu. Menu order differs from the register encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TestPattern {
    Disabled,
    ColorBars,
    SolidColor,
    GreyColorBars,
    Pn9,
}

impl TestPattern {
    pub const ALL: [TestPattern; 5] = [
        TestPattern::Disabled,
        TestPattern::ColorBars,
        TestPattern::SolidColor,
        TestPattern::GreyColorBars,
        TestPattern::Pn9,
    ];

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub const fn register_value(self) -> u16 {
        match self {
            TestPattern::Disabled => 0,
            TestPattern::ColorBars => 2,
            TestPattern::SolidColor => 1,
            TestPattern::GreyColorBars => 3,
            TestPattern::Pn9 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn all_is_in_declaration_order() {
        for (i, id) in ControlId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
        }
    }

    #[rstest]
    #[case(ControlId::PixelRate, Capability::READABLE)]
    #[case(ControlId::RawWrite16, Capability::WRITABLE)]
    #[case(ControlId::RawRead8, Capability::READABLE | Capability::VOLATILE)]
    #[case(ControlId::Exposure, Capability::READABLE | Capability::WRITABLE)]
    fn capabilities(#[case] id: ControlId, #[case] expected: Capability) {
        assert_eq!(id.capability(), expected);
        assert_eq!(ControlSet::new().get(id).capability, expected);
    }

    #[test]
    fn defaults() {
        let set = ControlSet::new();
        assert_eq!(set.value(ControlId::Exposure), 0x640);
        assert_eq!(set.value(ControlId::DigitalGain), 0x100);
        assert_eq!(set.value(ControlId::PixelRate), 840_000_000);
        assert_eq!(set.value(ControlId::TestPatternGreenB), 0xfff);
        assert_eq!(set.value(ControlId::Binning), 1);
    }

    #[test]
    fn stored_values_are_clamped() {
        let mut set = ControlSet::new();
        assert_eq!(set.store(ControlId::AnalogueGain, 5000), 978);
        assert_eq!(set.store(ControlId::Exposure, 0), 4);
        assert_eq!(set.store(ControlId::GenericTarget, 0x1a), 0x1a);
        assert_eq!(set.store(ControlId::GenericTarget, 0x80), 0x7f);
        // step is advisory
        assert_eq!(set.store(ControlId::RoiStartX, 1070), 1070);
    }

    #[test]
    fn narrowing_a_range_clamps_the_value() {
        let mut set = ControlSet::new();
        set.store(ControlId::VerticalBlanking, 10);
        let narrow = ControlRange::new(42, 1000, 1, 42);
        let changed = set.modify_range(ControlId::VerticalBlanking, narrow);
        assert!(changed);
        assert_eq!(set.value(ControlId::VerticalBlanking), 42);
        let wide = ControlRange::new(0, 1000, 1, 0);
        let changed = set.modify_range(ControlId::VerticalBlanking, wide);
        assert!(!changed);
    }

    #[test]
    fn register_footprint() {
        assert_eq!(ControlId::VerticalBlanking.registers(), &[0x0340, 0x3100]);
        assert_eq!(ControlId::RoiStartY.registers().len(), 8);
        assert!(ControlId::Binning.registers().is_empty());
    }

    #[test]
    fn powered_off_allow_list() {
        let allowed: usize = ControlId::ALL
            .iter()
            .filter(|id| id.applies_while_powered_off())
            .count();
        assert_eq!(allowed, 5);
        assert!(!ControlId::Exposure.applies_while_powered_off());
        assert!(ControlId::RawWrite8.applies_while_powered_off());
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 2)]
    #[case(2, 1)]
    #[case(3, 3)]
    #[case(4, 4)]
    fn test_pattern_encoding(#[case] index: i64, #[case] reg: u16) {
        let pattern = TestPattern::from_index(index).unwrap();
        assert_eq!(pattern.register_value(), reg);
    }

    #[test]
    fn test_pattern_out_of_menu() {
        assert_eq!(TestPattern::from_index(5), None);
        assert_eq!(TestPattern::from_index(-1), None);
    }
}
