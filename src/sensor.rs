/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

//! Sensor session: power and streaming state, active format and controls.
//!
//! All operations take `&mut self`; a host sharing the session between
//! contexts wraps it in its own lock.

use core::fmt::Debug;

use embedded_hal::blocking::delay::DelayUs;
use embedded_hal::blocking::i2c::{Write, WriteRead};

#[cfg(feature = "rttdebug")]
use panic_rtt_core::rprintln;

use crate::bus::{RegWidth, RegisterBus};
use crate::config::{ChipVariant, Config, TriggerMode};
use crate::controls::{Capability, ControlId, ControlRange, ControlSet, TestPattern};
use crate::format::{self, Format, FrameSize, MetadataFormat, PixelCode, SelectionTarget};
use crate::modes::{Family, Mode, Rect};
use crate::power::PowerControl;
use crate::regs::{GeneralRegisters, SyncRegisters, MODE_STANDBY, MODE_STREAMING};
use crate::roi::{Binning, CropWindow, Roi};
use crate::tables;
use crate::timing::{self, TimingLimits};
use crate::{
    Error, PowerStage, NATIVE_HEIGHT, NATIVE_WIDTH, PIXEL_ARRAY_HEIGHT, PIXEL_ARRAY_LEFT,
    PIXEL_ARRAY_TOP, PIXEL_ARRAY_WIDTH,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorState {
    PoweredOff,
    /// Powered, registers retained, no frames
    Standby,
    Streaming,
}

impl SensorState {
    pub fn is_powered(self) -> bool {
        self != SensorState::PoweredOff
    }
}

/// Main driver struct
pub struct Imx477<I2C, P> {
    bus: RegisterBus<I2C>,
    power: P,
    config: Config,
    variant: ChipVariant,
    /// Requested code, before flips are applied
    code: PixelCode,
    mode: &'static Mode,
    roi_width: u32,
    roi_height: u32,
    controls: ControlSet,
    long_exp_shift: u8,
    state: SensorState,
    /// Common recipe already written in this power cycle
    common_regs_written: bool,
    /// Streaming when suspended
    resume_streaming: bool,
}

impl<I2C, P, CommE> Imx477<I2C, P>
where
    I2C: Write<Error = CommE> + WriteRead<Error = CommE>,
    CommE: Debug,
    P: PowerControl,
{
    /// Create a powered-off session with the default format.
    /// Does not touch the bus; see [`attach`](Self::attach).
    pub fn new(i2c: I2C, power: P, config: Config) -> Self {
        let family = Family::Raw12;
        let mode = family.base_mode();
        let mut controls = ControlSet::new();
        controls.store(ControlId::TriggerMode, config.trigger_mode as i64);

        let mut sensor = Self {
            bus: RegisterBus::new(i2c, config.address),
            power,
            variant: config.variant.unwrap_or(ChipVariant::Imx477),
            config,
            code: PixelCode::Srggb12,
            mode,
            roi_width: mode.width,
            roi_height: mode.height,
            controls,
            long_exp_shift: 0,
            state: SensorState::PoweredOff,
            common_regs_written: false,
            resume_streaming: false,
        };
        sensor.store_roi_limits();
        sensor.store_framing_limits();
        sensor
    }

    /// Construct, power up, check the chip ID and return to idle.
    /// On any failure after power-up the sensor is powered off again.
    pub fn attach<D: DelayUs<u32>>(
        i2c: I2C,
        power: P,
        config: Config,
        delay: &mut D,
    ) -> Result<Self, Error<CommE>> {
        #[cfg(feature = "rttdebug")]
        rprintln!("imx477-i2c attach start");

        config.validate()?;
        let mut sensor = Self::new(i2c, power, config);
        sensor.power_on(delay)?;
        if let Err(err) = sensor.identify() {
            sensor.power_off();
            return Err(err);
        }
        sensor.power_off();

        #[cfg(feature = "rttdebug")]
        rprintln!("imx477-i2c attach done");
        Ok(sensor)
    }

    /// Give back the bus and power control
    pub fn release(self) -> (I2C, P) {
        (self.bus.release(), self.power)
    }

    /// Read the chip ID and check it against the configured variant
    pub fn identify(&mut self) -> Result<ChipVariant, Error<CommE>> {
        let id = self
            .bus
            .read_reg(GeneralRegisters::ChipId as u16, RegWidth::U16)? as u16;
        let found = ChipVariant::from_chip_id(id).ok_or_else(|| {
            log::error!("chip id mismatch: found {:#06x}", id);
            Error::UnknownChip(id)
        })?;
        if let Some(expected) = self.config.variant {
            if expected != found {
                return Err(Error::ChipIdMismatch {
                    expected: expected.chip_id(),
                    found: id,
                });
            }
        }
        log::info!("found {:?}", found);
        self.variant = found;
        Ok(found)
    }

    pub fn state(&self) -> SensorState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SensorState::Streaming
    }

    pub fn variant(&self) -> ChipVariant {
        self.variant
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Mode whose recipe is, or will be, programmed
    pub fn mode(&self) -> &'static Mode {
        self.mode
    }

    pub fn long_exposure_shift(&self) -> u8 {
        self.long_exp_shift
    }

    pub fn trigger_mode(&self) -> TriggerMode {
        TriggerMode::from_value(self.controls.value(ControlId::TriggerMode) as u32)
            .unwrap_or_default()
    }

    pub fn binning(&self) -> Binning {
        Binning::from_factor(self.controls.value(ControlId::Binning) as u32).unwrap_or_default()
    }

    /// Active ROI, start as requested (alignment is applied when programmed)
    pub fn roi(&self) -> Roi {
        Roi::new(
            self.controls.value(ControlId::RoiStartX) as u32,
            self.controls.value(ControlId::RoiStartY) as u32,
            self.roi_width,
            self.roi_height,
        )
    }

    pub fn timing_limits(&self) -> TimingLimits {
        let vblank = self.controls.range(ControlId::VerticalBlanking);
        let hblank = self.controls.range(ControlId::HorizontalBlanking);
        TimingLimits {
            min_vblank: vblank.min as u32,
            max_vblank: vblank.max as u32,
            min_hblank: hblank.min as u32,
            max_hblank: hblank.max as u32,
            long_exposure_shift: self.long_exp_shift,
        }
    }

    fn flips(&self) -> (bool, bool) {
        (
            self.controls.value(ControlId::HorizontalFlip) != 0,
            self.controls.value(ControlId::VerticalFlip) != 0,
        )
    }

    /// Supplies, then clock, then release reset and wait for the sensor to
    /// settle. A failing stage rolls back the stages before it.
    pub fn power_on<D: DelayUs<u32>>(&mut self, delay: &mut D) -> Result<(), Error<CommE>> {
        if self.state.is_powered() {
            return Ok(());
        }

        if let Err(err) = self.power.enable_power() {
            log::error!("failed to enable regulators: {:?}", err);
            return Err(Error::Power(PowerStage::Supplies));
        }
        if let Err(err) = self.power.enable_clock() {
            log::error!("failed to enable clock: {:?}", err);
            self.power.disable_power();
            return Err(Error::Power(PowerStage::Clock));
        }
        if let Err(err) = self.power.set_reset(false) {
            log::error!("failed to release reset: {:?}", err);
            self.power.disable_clock();
            self.power.disable_power();
            return Err(Error::Power(PowerStage::Reset));
        }
        delay.delay_us(self.config.settle_delay());

        self.state = SensorState::Standby;
        Ok(())
    }

    /// Stops streaming first if needed. Register contents are lost, so the
    /// common recipe is written again on the next start.
    pub fn power_off(&mut self) {
        if self.state == SensorState::Streaming {
            self.stop_streaming();
        }
        if !self.state.is_powered() {
            return;
        }

        if let Err(err) = self.power.set_reset(true) {
            log::warn!("failed to assert reset: {:?}", err);
        }
        self.power.disable_power();
        self.power.disable_clock();

        self.common_regs_written = false;
        self.state = SensorState::PoweredOff;
    }

    /// Program the sensor and start frames. Recipe failures abort at once.
    /// Every control is replayed even if one fails; the first failure is
    /// returned and the sensor stays in standby.
    pub fn start_streaming(&mut self) -> Result<(), Error<CommE>> {
        match self.state {
            SensorState::Streaming => return Ok(()),
            SensorState::PoweredOff => return Err(Error::PoweredOff),
            SensorState::Standby => {}
        }

        if !self.common_regs_written {
            let extra = self.variant.extra_regs();
            if let Err(err) = self
                .bus
                .write_list(tables::COMMON)
                .and_then(|_| self.bus.write_list(extra))
            {
                log::error!("failed to set common settings");
                return Err(err);
            }
            self.common_regs_written = true;
        }

        let mode = self.code.family().mode_for_binning(self.binning());
        self.mode = mode;
        if let Err(err) = self.bus.write_list(mode.recipe) {
            log::error!("failed to set mode");
            return Err(err);
        }

        self.apply_roi()?;

        let dpc = u8::from(self.config.dpc_enable);
        self.bus.write_reg_u8(GeneralRegisters::DpcMapped as u16, dpc)?;
        self.bus.write_reg_u8(GeneralRegisters::DpcDynamic as u16, dpc)?;

        if let Err(err) = self.replay_controls() {
            log::error!("control replay failed, not streaming");
            return Err(err);
        }

        for (reg, val) in self.trigger_mode().registers() {
            self.bus.write_reg_u8(reg as u16, val)?;
        }

        self.bus
            .write_reg_u8(GeneralRegisters::ModeSelect as u16, MODE_STREAMING)?;
        self.state = SensorState::Streaming;
        log::debug!(
            "streaming {}x{} from the {}x{} recipe",
            self.roi_width,
            self.roi_height,
            mode.width,
            mode.height
        );
        Ok(())
    }

    /// Always ends in standby; register failures are only logged
    pub fn stop_streaming(&mut self) {
        if self.state != SensorState::Streaming {
            return;
        }
        self.write_standby();
        self.state = SensorState::Standby;
    }

    fn write_standby(&mut self) {
        if let Err(err) = self
            .bus
            .write_reg_u8(GeneralRegisters::ModeSelect as u16, MODE_STANDBY)
        {
            log::error!("failed to set stream off: {:?}", err);
        }
        if let Err(err) = self
            .bus
            .write_reg_u8(SyncRegisters::ExtOutEnable as u16, 0)
        {
            log::error!("failed to disable sync output: {:?}", err);
        }
    }

    /// Stream on or off, owning power the way a runtime power manager would:
    /// enabling powers up as needed, disabling powers down.
    pub fn set_streaming<D: DelayUs<u32>>(
        &mut self,
        enable: bool,
        delay: &mut D,
    ) -> Result<(), Error<CommE>> {
        if enable {
            if self.is_streaming() {
                return Ok(());
            }
            let was_off = !self.state.is_powered();
            self.power_on(delay)?;
            if let Err(err) = self.start_streaming() {
                if was_off {
                    self.power_off();
                }
                return Err(err);
            }
        } else {
            self.stop_streaming();
            self.power_off();
        }
        Ok(())
    }

    /// Stop streaming ahead of a system sleep, remembering whether to resume
    pub fn suspend(&mut self) {
        if self.is_streaming() {
            self.stop_streaming();
            self.resume_streaming = true;
        }
    }

    /// Restart streaming if it was running at [`suspend`](Self::suspend).
    /// On failure the sensor is left out of streaming and the error returned.
    pub fn resume(&mut self) -> Result<(), Error<CommE>> {
        if !core::mem::take(&mut self.resume_streaming) {
            return Ok(());
        }
        if let Err(err) = self.start_streaming() {
            log::error!("failed to resume streaming");
            if self.state.is_powered() {
                self.write_standby();
                self.state = SensorState::Standby;
            }
            return Err(err);
        }
        Ok(())
    }

    pub fn get_format(&self) -> Format {
        let (hflip, vflip) = self.flips();
        Format {
            code: self.code.with_flips(hflip, vflip),
            width: self.roi_width,
            height: self.roi_height,
        }
    }

    /// The format [`set_format`](Self::set_format) would produce, without
    /// changing anything
    pub fn try_format(&self, code: u32, width: u32, height: u32) -> Result<Format, Error<CommE>> {
        let requested = PixelCode::from_raw(code).ok_or(Error::UnsupportedFormat(code))?;
        let (hflip, vflip) = self.flips();
        let res = format::resolve(requested.with_flips(hflip, vflip), width, height);
        Ok(Format {
            code: res.code,
            width: res.roi.width,
            height: res.roi.height,
        })
    }

    /// Select the family's base mode and centre a `width` x `height` ROI in
    /// it. Any previous ROI origin is discarded and the blanking limits are
    /// reset.
    pub fn set_format(&mut self, code: u32, width: u32, height: u32) -> Result<Format, Error<CommE>> {
        let requested = PixelCode::from_raw(code).ok_or(Error::UnsupportedFormat(code))?;
        if self.is_streaming() {
            return Err(Error::Busy);
        }

        let (hflip, vflip) = self.flips();
        let res = format::resolve(requested.with_flips(hflip, vflip), width, height);
        self.code = res.code;
        self.mode = res.mode;
        self.roi_width = res.roi.width;
        self.roi_height = res.roi.height;
        self.store_roi_limits();
        self.controls
            .store(ControlId::RoiStartX, i64::from(res.roi.start_x));
        self.controls
            .store(ControlId::RoiStartY, i64::from(res.roi.start_y));

        self.set_framing_limits()?;
        Ok(self.get_format())
    }

    pub fn enum_mbus_code(&self, index: usize) -> Option<PixelCode> {
        let (hflip, vflip) = self.flips();
        PixelCode::enumerate(index, hflip, vflip)
    }

    pub fn enum_frame_size(&self, code: u32, index: usize) -> Result<FrameSize, Error<CommE>> {
        let code = PixelCode::from_raw(code).ok_or(Error::UnsupportedFormat(code))?;
        let (hflip, vflip) = self.flips();
        if code.with_flips(hflip, vflip) != code {
            return Err(Error::InvalidFrameSize);
        }
        let mode = code
            .family()
            .modes()
            .get(index)
            .ok_or(Error::InvalidFrameSize)?;
        Ok(FrameSize {
            width: mode.width,
            height: mode.height,
        })
    }

    pub fn metadata_format(&self) -> MetadataFormat {
        format::METADATA_FORMAT
    }

    pub fn selection(&self, target: SelectionTarget) -> Rect {
        match target {
            SelectionTarget::Crop => {
                let roi = self.roi();
                let b = self.binning().factor();
                Rect::new(roi.start_x & !3, roi.start_y & !3, roi.width * b, roi.height * b)
            }
            SelectionTarget::NativeSize => Rect::new(0, 0, NATIVE_WIDTH, NATIVE_HEIGHT),
            SelectionTarget::CropDefault | SelectionTarget::CropBounds => Rect::new(
                PIXEL_ARRAY_LEFT,
                PIXEL_ARRAY_TOP,
                PIXEL_ARRAY_WIDTH,
                PIXEL_ARRAY_HEIGHT,
            ),
        }
    }

    /// Read out `rect` of the pixel array. The output size is the rectangle
    /// divided by the binning factor.
    pub fn set_crop(&mut self, rect: Rect) -> Result<Rect, Error<CommE>> {
        if self.is_streaming() {
            return Err(Error::Busy);
        }
        let b = self.binning().factor();
        self.roi_width = (rect.width / b).max(1);
        self.roi_height = (rect.height / b).max(1);
        self.store_roi_limits();
        self.controls.store(ControlId::RoiStartX, i64::from(rect.left));
        self.controls.store(ControlId::RoiStartY, i64::from(rect.top));

        self.set_framing_limits()?;
        if self.state.is_powered() {
            self.apply_roi()?;
        }
        Ok(self.selection(SelectionTarget::Crop))
    }

    pub fn controls(&self) -> &ControlSet {
        &self.controls
    }

    pub fn control_range(&self, id: ControlId) -> ControlRange {
        self.controls.range(id)
    }

    /// Store a control value and apply it if the sensor is powered.
    ///
    /// Returns the value after clamping to the control's range. Most
    /// controls are only stored while powered off and replayed when
    /// streaming starts; raw writes and their addressing are applied
    /// immediately regardless.
    pub fn set_control(&mut self, id: ControlId, value: i64) -> Result<i64, Error<CommE>> {
        if !id.capability().contains(Capability::WRITABLE) {
            return Err(Error::ReadOnlyControl(id));
        }
        if id.modifies_layout() && self.is_streaming() {
            return Err(Error::ControlBusy(id));
        }
        self.update_control(id, value)
    }

    /// Apply controls in order, stopping at the first failure. Earlier
    /// controls stay applied.
    pub fn set_controls(&mut self, batch: &[(ControlId, i64)]) -> Result<(), Error<CommE>> {
        for &(id, value) in batch {
            self.set_control(id, value)?;
        }
        Ok(())
    }

    /// Stored value, or a fresh register read for volatile controls
    pub fn get_control(&mut self, id: ControlId) -> Result<i64, Error<CommE>> {
        if !id.capability().contains(Capability::VOLATILE) {
            return Ok(self.controls.value(id));
        }

        let address = self.controls.value(ControlId::ReadAddress) as u16;
        let read = match id {
            ControlId::RawRead8 => self.bus.read_reg(address, RegWidth::U8),
            ControlId::RawRead16 => self.bus.read_reg(address, RegWidth::U16),
            ControlId::RawReadGeneric8 => {
                let target = self.controls.value(ControlId::GenericTarget) as u8;
                self.bus.read_reg_from(target, address, RegWidth::U8)
            }
            _ => return Ok(self.controls.value(id)),
        };
        let value = read.map_err(|err| err.for_control(id))?;
        Ok(self.controls.store(id, i64::from(value)))
    }

    fn update_control(&mut self, id: ControlId, value: i64) -> Result<i64, Error<CommE>> {
        let stored = self.controls.store(id, value);
        if id == ControlId::Binning {
            self.store_roi_limits();
        }
        let vblank_raised = id == ControlId::Exposure && self.fit_vblank_to_exposure();

        if !self.state.is_powered() && !id.applies_while_powered_off() {
            log::debug!("{:?} = {} deferred until power on", id, stored);
            return Ok(stored);
        }
        if vblank_raised {
            let vblank = self.controls.value(ControlId::VerticalBlanking);
            self.write_control(ControlId::VerticalBlanking, vblank)
                .map_err(|err| err.for_control(id))?;
        }
        self.apply_control(id)?;
        Ok(stored)
    }

    /// Raise the vblank floor to fit the exposure. Returns `true` if the
    /// stored vblank had to go up.
    fn fit_vblank_to_exposure(&mut self) -> bool {
        let exposure = self.controls.value(ControlId::Exposure) as u32;
        let mut range = self.controls.range(ControlId::VerticalBlanking);
        range.min = i64::from(timing::vblank_floor(self.mode, exposure));
        range.max = range.max.max(range.min);
        range.default = range.default.clamp(range.min, range.max);
        self.controls.modify_range(ControlId::VerticalBlanking, range)
    }

    /// Apply every writable control in order. All are attempted; the first
    /// failure is returned.
    fn replay_controls(&mut self) -> Result<(), Error<CommE>> {
        let mut first_err = None;
        for id in ControlId::ALL {
            if !id.capability().contains(Capability::WRITABLE) {
                continue;
            }
            if let Err(err) = self.apply_control(id) {
                log::error!("failed to apply {:?}: {:?}", id, err);
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    fn apply_control(&mut self, id: ControlId) -> Result<(), Error<CommE>> {
        let value = self.controls.value(id);
        log::debug!("apply {:?} = {}", id, value);
        self.write_control(id, value).map_err(|err| err.for_control(id))
    }

    fn write_control(&mut self, id: ControlId, value: i64) -> Result<(), Error<CommE>> {
        let reg = |r: GeneralRegisters| r as u16;
        match id {
            ControlId::VerticalBlanking => self.apply_vblank(value as u32),
            ControlId::HorizontalBlanking => {
                let llp = timing::line_length(self.roi_width, value as u32);
                self.bus.write_reg_u16(reg(GeneralRegisters::LineLength), llp)
            }
            ControlId::Exposure => {
                let val = timing::exposure_register(value as u32, self.long_exp_shift);
                self.bus.write_reg_u16(reg(GeneralRegisters::Exposure), val)
            }
            ControlId::AnalogueGain => self
                .bus
                .write_reg_u16(reg(GeneralRegisters::AnalogGain), value as u16),
            ControlId::DigitalGain => self
                .bus
                .write_reg_u16(reg(GeneralRegisters::DigitalGain), value as u16),
            ControlId::TestPattern => {
                let pattern = TestPattern::from_index(value).unwrap_or(TestPattern::Disabled);
                self.bus
                    .write_reg_u16(reg(GeneralRegisters::TestPattern), pattern.register_value())
            }
            ControlId::TestPatternRed => self
                .bus
                .write_reg_u16(reg(GeneralRegisters::TestPatternRed), value as u16),
            ControlId::TestPatternGreenR => self
                .bus
                .write_reg_u16(reg(GeneralRegisters::TestPatternGreenR), value as u16),
            ControlId::TestPatternBlue => self
                .bus
                .write_reg_u16(reg(GeneralRegisters::TestPatternBlue), value as u16),
            ControlId::TestPatternGreenB => self
                .bus
                .write_reg_u16(reg(GeneralRegisters::TestPatternGreenB), value as u16),
            ControlId::HorizontalFlip | ControlId::VerticalFlip => {
                let (hflip, vflip) = self.flips();
                let orientation = u8::from(hflip) | (u8::from(vflip) << 1);
                self.bus
                    .write_reg_u8(reg(GeneralRegisters::Orientation), orientation)?;
                self.apply_roi()
            }
            ControlId::RoiStartX | ControlId::RoiStartY => self.apply_roi(),
            ControlId::RawWrite8 => self.raw_write(value, RegWidth::U8, None),
            ControlId::RawWrite16 => self.raw_write(value, RegWidth::U16, None),
            ControlId::RawWriteGeneric8 => {
                let target = self.controls.value(ControlId::GenericTarget) as u8;
                self.raw_write(value, RegWidth::U8, Some(target))
            }
            // state only, or read only
            ControlId::PixelRate
            | ControlId::LinkFrequency
            | ControlId::RawReadGeneric8
            | ControlId::GenericTarget
            | ControlId::ReadAddress
            | ControlId::RawRead8
            | ControlId::RawRead16
            | ControlId::TriggerMode
            | ControlId::Binning => Ok(()),
        }
    }

    fn apply_vblank(&mut self, vblank: u32) -> Result<(), Error<CommE>> {
        let min_vblank = self.controls.range(ControlId::VerticalBlanking).min as u32;
        let fl = timing::compute_frame_length(min_vblank, self.roi_height, vblank);
        self.bus
            .write_reg_u16(GeneralRegisters::FrameLength as u16, fl.lines)?;
        self.bus
            .write_reg_u8(GeneralRegisters::LongExposureShift as u16, fl.shift)?;

        if fl.shift != self.long_exp_shift {
            log::debug!("long exposure shift {} -> {}", self.long_exp_shift, fl.shift);
            self.long_exp_shift = fl.shift;
            // exposure is programmed in units of the shifted frame length
            let exposure = self.controls.value(ControlId::Exposure) as u32;
            let val = timing::exposure_register(exposure, fl.shift);
            self.bus
                .write_reg_u16(GeneralRegisters::Exposure as u16, val)?;
        }
        Ok(())
    }

    /// Packed `(register << 16) | data`; zero means nothing to write
    fn raw_write(
        &mut self,
        packed: i64,
        width: RegWidth,
        target: Option<u8>,
    ) -> Result<(), Error<CommE>> {
        let packed = packed as u32;
        if packed == 0 {
            return Ok(());
        }
        let address = (packed >> 16) as u16;
        let data = packed & 0xffff;
        log::debug!("raw write {:#06x} = {:#x}", address, data);
        match target {
            Some(target) => self.bus.write_reg_to(target, address, width, data),
            None => self.bus.write_reg(address, width, data),
        }
    }

    fn apply_roi(&mut self) -> Result<(), Error<CommE>> {
        let window = CropWindow::new(&self.roi(), self.binning());
        log::debug!(
            "ROI {{{},{}}}-->{{{},{}}}",
            window.x_start,
            window.y_start,
            window.x_end,
            window.y_end
        );
        for (reg, val) in window.registers() {
            self.bus.write_reg_u16(reg as u16, val)?;
        }
        Ok(())
    }

    /// Reset blanking ranges and values for the current mode and ROI
    fn store_framing_limits(&mut self) {
        let exposure = self.controls.value(ControlId::Exposure) as u32;
        let limits = TimingLimits::new(self.mode, self.roi_height, exposure);

        let min_vblank = i64::from(limits.min_vblank);
        self.controls.modify_range(
            ControlId::VerticalBlanking,
            ControlRange::new(min_vblank, i64::from(limits.max_vblank), 1, min_vblank),
        );
        self.controls.store(ControlId::VerticalBlanking, min_vblank);

        let min_hblank = i64::from(limits.min_hblank);
        self.controls.modify_range(
            ControlId::HorizontalBlanking,
            ControlRange::new(min_hblank, i64::from(limits.max_hblank), 1, min_hblank),
        );
        self.controls.store(ControlId::HorizontalBlanking, min_hblank);
    }

    fn set_framing_limits(&mut self) -> Result<(), Error<CommE>> {
        self.store_framing_limits();
        if !self.state.is_powered() {
            // nothing programmed; the shift follows the stored blanking
            let vblank = self.controls.range(ControlId::VerticalBlanking).min as u32;
            self.long_exp_shift =
                timing::compute_frame_length(vblank, self.roi_height, vblank).shift;
            return Ok(());
        }
        // a changed shift rewrites exposure along with the frame length
        self.apply_control(ControlId::VerticalBlanking)?;
        self.apply_control(ControlId::HorizontalBlanking)
    }

    /// Limit the ROI origin so the window stays inside the pixel array
    fn store_roi_limits(&mut self) {
        let b = self.binning().factor();
        let max_x = PIXEL_ARRAY_WIDTH.saturating_sub(self.roi_width * b);
        let max_y = PIXEL_ARRAY_HEIGHT.saturating_sub(self.roi_height * b);
        for (id, max) in [(ControlId::RoiStartX, max_x), (ControlId::RoiStartY, max_y)] {
            let mut range = self.controls.range(id);
            range.max = i64::from(max);
            range.default = range.default.clamp(range.min, range.max);
            if self.controls.modify_range(id, range) {
                log::debug!("{:?} clamped to {}", id, self.controls.value(id));
            }
        }
    }
}
