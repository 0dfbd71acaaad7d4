/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

mod common;

use common::{attached, streaming};
use embedded_hal_mock::delay::MockNoop;
use imx477_i2c::{Config, ControlId, Error, PixelCode, TriggerMode, CONTROL_COUNT};
use rstest::rstest;

const FRAME_LENGTH: u16 = 0x0340;
const LINE_LENGTH: u16 = 0x0342;
const EXPOSURE: u16 = 0x0202;
const LONG_EXP_SHIFT: u16 = 0x3100;

#[test]
fn every_control_is_listed() {
    let (sensor, _, _) = attached(Config::default());
    assert_eq!(sensor.controls().iter().count(), CONTROL_COUNT);
}

#[test]
fn controls_are_deferred_while_powered_off() {
    let (mut sensor, bus, _) = attached(Config::default());
    assert_eq!(sensor.set_control(ControlId::Exposure, 1000).unwrap(), 1000);
    assert_eq!(sensor.set_control(ControlId::AnalogueGain, 500).unwrap(), 500);
    assert!(bus.writes().is_empty());
    assert_eq!(sensor.get_control(ControlId::Exposure).unwrap(), 1000);

    sensor.set_streaming(true, &mut MockNoop::new()).unwrap();
    assert_eq!(bus.reg16(EXPOSURE), 1000);
    assert_eq!(bus.reg16(0x0204), 500);
}

#[test]
fn default_timing_after_start() {
    let (sensor, bus, _) = streaming(Config::default());
    // vblank floor is the default exposure plus its offset
    assert_eq!(sensor.controls().value(ControlId::VerticalBlanking), 0x640 + 22);
    assert_eq!(bus.reg16(FRAME_LENGTH), 3040 + 0x640 + 22);
    assert_eq!(bus.reg8(LONG_EXP_SHIFT), 0);
    assert_eq!(bus.reg16(LINE_LENGTH), 4056 + 100);
    assert_eq!(bus.reg16(EXPOSURE), 0x640);
    assert_eq!(bus.reg16(0x020e), 0x100);
}

#[test]
fn long_vblank_uses_exposure_shift() {
    let (mut sensor, bus, _) = attached(Config::default());
    sensor.set_control(ControlId::VerticalBlanking, 70_000).unwrap();
    sensor.set_streaming(true, &mut MockNoop::new()).unwrap();

    assert_eq!(bus.reg16(FRAME_LENGTH), 36_520);
    assert_eq!(bus.reg8(LONG_EXP_SHIFT), 1);
    assert_eq!(bus.reg16(EXPOSURE), 0x640 >> 1);
    assert_eq!(sensor.long_exposure_shift(), 1);
    assert_eq!(sensor.timing_limits().long_exposure_shift, 1);
}

#[test]
fn shorter_vblank_drops_the_shift() {
    let (mut sensor, bus, _) = streaming(Config::default());
    sensor.set_control(ControlId::VerticalBlanking, 70_000).unwrap();
    assert_eq!(bus.reg16(EXPOSURE), 0x320);

    // clamped to the floor
    let stored = sensor.set_control(ControlId::VerticalBlanking, 100).unwrap();
    assert_eq!(stored, 0x640 + 22);
    assert_eq!(bus.reg8(LONG_EXP_SHIFT), 0);
    assert_eq!(bus.reg16(EXPOSURE), 0x640);
}

#[test]
fn exposure_raises_vblank() {
    let (mut sensor, bus, _) = streaming(Config::default());
    sensor.set_control(ControlId::Exposure, 5000).unwrap();

    assert_eq!(sensor.control_range(ControlId::VerticalBlanking).min, 5022);
    assert_eq!(sensor.controls().value(ControlId::VerticalBlanking), 5022);
    assert_eq!(bus.reg16(FRAME_LENGTH), 3040 + 5022);
    assert_eq!(bus.reg16(EXPOSURE), 5000);

    // lowering exposure lowers the floor but keeps the blanking
    sensor.set_control(ControlId::Exposure, 100).unwrap();
    assert_eq!(sensor.control_range(ControlId::VerticalBlanking).min, 122);
    assert_eq!(sensor.controls().value(ControlId::VerticalBlanking), 5022);
}

#[test]
fn hblank_sets_line_length() {
    let (mut sensor, bus, _) = streaming(Config::default());
    sensor.set_control(ControlId::HorizontalBlanking, 500).unwrap();
    assert_eq!(bus.reg16(LINE_LENGTH), 4056 + 500);
    sensor.set_control(ControlId::HorizontalBlanking, 0xfff0).unwrap();
    assert_eq!(bus.reg16(LINE_LENGTH), 0xfff0);
}

#[test]
fn flips_are_refused_while_streaming() {
    let (mut sensor, bus, _) = streaming(Config::default());
    bus.clear_log();
    assert!(matches!(
        sensor.set_control(ControlId::HorizontalFlip, 1),
        Err(Error::ControlBusy(ControlId::HorizontalFlip))
    ));
    assert_eq!(sensor.controls().value(ControlId::HorizontalFlip), 0);
    assert!(bus.writes().is_empty());
}

#[test]
fn flips_set_orientation_and_bayer_order() {
    let (mut sensor, bus, _) = attached(Config::default());
    sensor.set_control(ControlId::HorizontalFlip, 1).unwrap();
    assert!(bus.writes().is_empty());
    assert_eq!(sensor.get_format().code, PixelCode::Sgrbg12);

    sensor.power_on(&mut MockNoop::new()).unwrap();
    sensor.set_control(ControlId::VerticalFlip, 1).unwrap();
    assert_eq!(bus.reg8(0x0101), 3);
    assert_eq!(sensor.get_format().code, PixelCode::Sbggr12);
    // flipping re-programs the window
    assert_eq!(bus.writes_to(0x0344), 1);
}

#[rstest]
#[case(0, 0)]
#[case(1, 2)]
#[case(2, 1)]
#[case(3, 3)]
#[case(4, 4)]
fn test_pattern_menu(#[case] index: i64, #[case] reg: u16) {
    let (mut sensor, bus, _) = streaming(Config::default());
    sensor.set_control(ControlId::TestPattern, index).unwrap();
    assert_eq!(bus.reg16(0x0600), reg);
}

#[test]
fn test_pattern_colours() {
    let (mut sensor, bus, _) = streaming(Config::default());
    assert_eq!(bus.reg16(0x0602), 0xfff);
    sensor.set_control(ControlId::TestPatternRed, 0x123).unwrap();
    assert_eq!(bus.reg16(0x0602), 0x123);
    let stored = sensor.set_control(ControlId::TestPatternBlue, 0x2000).unwrap();
    assert_eq!(stored, 0xfff);
    assert_eq!(bus.reg16(0x0606), 0xfff);
}

#[test]
fn informational_controls_are_read_only() {
    let (mut sensor, _, _) = attached(Config::default());
    assert!(matches!(
        sensor.set_control(ControlId::PixelRate, 1),
        Err(Error::ReadOnlyControl(ControlId::PixelRate))
    ));
    assert_eq!(sensor.get_control(ControlId::PixelRate).unwrap(), 840_000_000);
    assert_eq!(sensor.get_control(ControlId::LinkFrequency).unwrap(), 450_000_000);
    assert!(matches!(
        sensor.set_control(ControlId::RawRead8, 1),
        Err(Error::ReadOnlyControl(ControlId::RawRead8))
    ));
}

#[test]
fn raw_writes_apply_while_powered_off() {
    let (mut sensor, bus, _) = attached(Config::default());
    sensor
        .set_control(ControlId::RawWrite16, (0x0202 << 16) | 0x1234)
        .unwrap();
    assert_eq!(bus.reg16(0x0202), 0x1234);

    sensor
        .set_control(ControlId::RawWrite8, (0x3000 << 16) | 0x01ab)
        .unwrap();
    assert_eq!(bus.reg8(0x3000), 0xab);
    assert_eq!(bus.writes().last().unwrap().data, vec![0xab]);
}

#[test]
fn raw_write_of_zero_does_nothing() {
    let (mut sensor, bus, _) = attached(Config::default());
    sensor.set_control(ControlId::RawWrite8, 0).unwrap();
    sensor.set_control(ControlId::RawWrite16, 0).unwrap();
    assert!(bus.writes().is_empty());
}

#[test]
fn raw_access_to_another_device() {
    let (mut sensor, bus, _) = attached(Config::default());
    sensor.set_control(ControlId::GenericTarget, 0x50).unwrap();
    sensor
        .set_control(ControlId::RawWriteGeneric8, (0x0010 << 16) | 0x42)
        .unwrap();
    assert_eq!(bus.reg8_at(0x50, 0x0010), 0x42);

    bus.poke(0x50, 0x0020, &[0x5a]);
    sensor.set_control(ControlId::ReadAddress, 0x20).unwrap();
    assert_eq!(sensor.get_control(ControlId::RawReadGeneric8).unwrap(), 0x5a);
}

#[test]
fn raw_reads_go_to_the_bus() {
    let (mut sensor, bus, _) = attached(Config::default());
    sensor.set_control(ControlId::ReadAddress, 0x0016).unwrap();
    assert_eq!(sensor.get_control(ControlId::RawRead16).unwrap(), 0x0477);
    assert_eq!(sensor.get_control(ControlId::RawRead8).unwrap(), 0x04);

    bus.poke(0x1a, 0x0016, &[0x03, 0x78]);
    assert_eq!(sensor.get_control(ControlId::RawRead16).unwrap(), 0x0378);

    bus.fail_all(true);
    assert!(matches!(
        sensor.get_control(ControlId::RawRead8),
        Err(Error::Control {
            id: ControlId::RawRead8,
            ..
        })
    ));
}

#[test]
fn roi_start_reprograms_window() {
    let (mut sensor, bus, _) = attached(Config::default());
    sensor.set_format(0x3012, 1920, 1080).unwrap();
    sensor.set_streaming(true, &mut MockNoop::new()).unwrap();

    sensor.set_control(ControlId::RoiStartX, 1070).unwrap();
    assert_eq!(bus.reg16(0x0344), 1068);
    assert_eq!(bus.reg16(0x0348), 1068 + 1920 - 1);
    // the requested start is kept
    assert_eq!(sensor.roi().start_x, 1070);
}

#[test]
fn roi_start_stays_inside_pixel_array() {
    let (mut sensor, bus, _) = attached(Config::default());
    sensor.set_format(0x3012, 1920, 1080).unwrap();
    assert_eq!(sensor.control_range(ControlId::RoiStartX).max, 4056 - 1920);
    assert_eq!(sensor.control_range(ControlId::RoiStartY).max, 3040 - 1080);
    sensor.set_streaming(true, &mut MockNoop::new()).unwrap();

    assert_eq!(sensor.set_control(ControlId::RoiStartX, 0xfff0).unwrap(), 2136);
    assert_eq!(sensor.set_control(ControlId::RoiStartY, 3000).unwrap(), 1960);
    assert_eq!(bus.reg16(0x0344), 2136);
    assert_eq!(bus.reg16(0x0348), 4055);
    assert_eq!(bus.reg16(0x0346), 1960);
    assert_eq!(bus.reg16(0x034a), 3039);
}

#[test]
fn binning_narrows_roi_start_range() {
    let (mut sensor, _, _) = attached(Config::default());
    sensor.set_format(0x3012, 1920, 1080).unwrap();
    sensor.set_control(ControlId::RoiStartX, 2000).unwrap();

    sensor.set_control(ControlId::Binning, 2).unwrap();
    assert_eq!(sensor.control_range(ControlId::RoiStartX).max, 4056 - 3840);
    assert_eq!(sensor.controls().value(ControlId::RoiStartX), 216);
    assert_eq!(sensor.control_range(ControlId::RoiStartY).max, 3040 - 2160);
}

#[test]
fn format_change_in_standby_rewrites_shifted_exposure() {
    let (mut sensor, bus, _) = streaming(Config::default());
    sensor.set_control(ControlId::VerticalBlanking, 70_000).unwrap();
    assert_eq!(bus.reg16(EXPOSURE), 0x320);
    sensor.stop_streaming();

    sensor.set_format(0x3012, 1920, 1080).unwrap();
    assert_eq!(sensor.long_exposure_shift(), 0);
    assert_eq!(bus.reg8(LONG_EXP_SHIFT), 0);
    assert_eq!(bus.reg16(EXPOSURE), 0x640);
}

#[test]
fn exposure_vblank_failure_is_reported_for_exposure() {
    let (mut sensor, bus, _) = streaming(Config::default());
    bus.fail_on(Some(FRAME_LENGTH));
    assert!(matches!(
        sensor.set_control(ControlId::Exposure, 5000),
        Err(Error::Control {
            id: ControlId::Exposure,
            ..
        })
    ));
}

#[test]
fn trigger_mode_registers_follow_role() {
    let (mut sensor, bus, _) = streaming(Config::default().with_trigger_mode(TriggerMode::Source));
    assert_eq!(bus.reg8(0x0350), 0);
    assert_eq!(bus.reg8(0x3f0b), 1);
    assert_eq!(bus.reg8(0x3041), 1);
    assert_eq!(bus.reg8(0x3040), 1);
    assert_eq!(bus.reg8(0x4b81), 1);

    // stored, takes effect on the next start
    bus.clear_log();
    sensor.set_control(ControlId::TriggerMode, 2).unwrap();
    assert!(bus.writes().is_empty());
    assert_eq!(sensor.trigger_mode(), TriggerMode::Sink);

    sensor.stop_streaming();
    sensor.start_streaming().unwrap();
    assert_eq!(bus.reg8(0x0350), 0);
    assert_eq!(bus.reg8(0x3f0b), 1);
    assert_eq!(bus.reg8(0x3041), 0);
    assert_eq!(bus.reg8(0x3040), 0);
    assert_eq!(bus.reg8(0x4b81), 0);
}

#[test]
fn batch_stops_at_first_failure_without_rollback() {
    let (mut sensor, bus, _) = streaming(Config::default());
    bus.fail_on(Some(0x0204));

    let result = sensor.set_controls(&[
        (ControlId::DigitalGain, 0x300),
        (ControlId::AnalogueGain, 10),
        (ControlId::TestPattern, 1),
    ]);
    assert!(matches!(
        result,
        Err(Error::Control {
            id: ControlId::AnalogueGain,
            ..
        })
    ));
    assert_eq!(bus.reg16(0x020e), 0x300);
    assert_eq!(bus.reg16(0x0600), 0);
}
