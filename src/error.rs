/*
Copyright (c) 2020 Todd Stellanova
LICENSE: BSD3 (see LICENSE file)
*/

use crate::controls::ControlId;
use thiserror::Error;

/// Errors in this crate
#[derive(Error, Debug)]
pub enum Error<CommE> {
    /// Sensor communication error
    #[error("bus transaction failed: {0:?}")]
    Comm(CommE),

    /// A register recipe stopped at the first write that failed.
    /// Writes before `address` have already landed on the sensor.
    #[error("write to register {address:#06x} failed: {cause:?}")]
    RegisterWrite { address: u16, cause: CommE },

    /// The requested pixel code has no mode table
    #[error("unsupported pixel code {0:#06x}")]
    UnsupportedFormat(u32),

    /// Frame size enumeration past the end of the table, or for a code
    /// that does not match the current flip state
    #[error("no such frame size")]
    InvalidFrameSize,

    /// Supply, clock or reset sequencing failed. Anything enabled before
    /// the failing stage has been turned back off.
    #[error("power sequencing failed while enabling {0:?}")]
    Power(PowerStage),

    /// Applying a control to the sensor failed. Controls applied earlier in
    /// the same batch are not rolled back.
    #[error("control {id:?} failed: {cause:?}")]
    Control { id: ControlId, cause: CommE },

    /// The control has no writable capability
    #[error("control {0:?} is read-only")]
    ReadOnlyControl(ControlId),

    /// The control changes the frame layout and cannot change while streaming
    #[error("control {0:?} cannot change while streaming")]
    ControlBusy(ControlId),

    /// Format and crop cannot change while streaming
    #[error("sensor is streaming")]
    Busy,

    /// Streaming needs the sensor powered on first
    #[error("sensor is powered off")]
    PoweredOff,

    /// The chip ID register holds an ID no recipe exists for
    #[error("unknown chip id {0:#06x}")]
    UnknownChip(u16),

    /// The chip found differs from the configured variant
    #[error("chip id mismatch: expected {expected:#06x}, found {found:#06x}")]
    ChipIdMismatch { expected: u16, found: u16 },

    /// Only a 24 MHz external clock is supported
    #[error("external clock frequency not supported: {0} Hz")]
    UnsupportedClock(u32),
}

/// Which part of the power-up sequence failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerStage {
    Supplies,
    Clock,
    Reset,
}

impl<CommE> Error<CommE> {
    /// Attribute a bus failure to the control whose application caused it
    pub(crate) fn for_control(self, id: ControlId) -> Self {
        match self {
            Error::Comm(cause) | Error::RegisterWrite { cause, .. } => {
                Error::Control { id, cause }
            }
            other => other,
        }
    }
}
