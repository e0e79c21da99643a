use thiserror::Error;

use crate::blocks::nrzi::StageKind;

#[derive(Debug, Error)]
pub enum CodingError {
    #[error("bus width must be between 1 and {max}, got {width}")]
    InvalidWidth { width: usize, max: usize },

    #[error("module name prefix `{0}` is not a valid Verilog identifier")]
    InvalidName(String),

    #[error("shift register length must be at least 1")]
    EmptyShiftRegister,

    #[error("no coding stages were selected")]
    NoStages,

    #[error("trace targets {0}, which is not part of the configured plan")]
    StageNotPlanned(StageKind),

    #[error("{mismatches} of {cycles} trace cycles did not match their expected output")]
    TraceMismatch { mismatches: usize, cycles: usize },
}
