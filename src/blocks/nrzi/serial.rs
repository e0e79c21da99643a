use serde::{Deserialize, Serialize};

use crate::blocks::Clocked;
use crate::IDLE_LEVEL;

/// Inputs of a serial coding stage for one clock cycle.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SerialInput {
    pub din: bool,
    /// Asserted while the bus is idle.
    pub idle: bool,
    /// Pipe `din` to `dout` with the same latency as the coded path.
    pub bypass: bool,
}

impl SerialInput {
    #[inline]
    pub fn data(din: bool) -> Self {
        Self {
            din,
            ..Default::default()
        }
    }

    #[inline]
    pub fn idle(din: bool) -> Self {
        Self {
            din,
            idle: true,
            bypass: false,
        }
    }

    #[inline]
    pub fn bypass(din: bool) -> Self {
        Self {
            din,
            idle: false,
            bypass: true,
        }
    }
}

/// Registered state of a serial coding stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct SerialState {
    /// The line level of the previous bit cell.
    pub last: bool,
    /// Output register. Only visible when the stage is pipelined.
    pub dout: bool,
}

impl Default for SerialState {
    fn default() -> Self {
        Self {
            last: IDLE_LEVEL,
            dout: false,
        }
    }
}

/// Evaluates one cycle of the serial NRZI decoder.
///
/// Returns the output visible during the cycle and the state after the clock edge.
pub fn decode_kernel(pipeline: bool, q: SerialState, input: SerialInput) -> (bool, SerialState) {
    let decoded = if input.bypass {
        input.din
    } else {
        !(q.last ^ input.din)
    };
    let d = SerialState {
        last: input.din | input.idle,
        dout: decoded,
    };
    (if pipeline { q.dout } else { decoded }, d)
}

/// Evaluates one cycle of the serial NRZI encoder.
///
/// Returns the output visible during the cycle and the state after the clock edge.
pub fn encode_kernel(pipeline: bool, q: SerialState, input: SerialInput) -> (bool, SerialState) {
    // A one holds the line level, a zero toggles it.
    let level = q.last == input.din;
    let encoded = if input.bypass { input.din } else { level };
    let d = SerialState {
        last: level | input.idle,
        dout: encoded,
    };
    (if pipeline { q.dout } else { encoded }, d)
}

/// Serial NRZI decoder.
///
/// `din` carries the line state with J represented by a 1 and K by a 0.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct SerialDecoder {
    pipeline: bool,
    state: SerialState,
}

impl SerialDecoder {
    pub fn new(pipeline: bool) -> Self {
        Self {
            pipeline,
            state: SerialState::default(),
        }
    }

    #[inline]
    pub fn pipeline(&self) -> bool {
        self.pipeline
    }

    #[inline]
    pub fn last(&self) -> bool {
        self.state.last
    }

    #[inline]
    pub fn state(&self) -> SerialState {
        self.state
    }
}

impl Clocked for SerialDecoder {
    type Input = SerialInput;
    type Output = bool;

    fn step(&mut self, input: SerialInput) -> bool {
        let (dout, d) = decode_kernel(self.pipeline, self.state, input);
        self.state = d;
        dout
    }

    fn reset(&mut self) {
        self.state = SerialState::default();
    }
}

/// Serial NRZI encoder.
///
/// `dout` carries the line state with J represented by a 1 and K by a 0.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct SerialEncoder {
    pipeline: bool,
    state: SerialState,
}

impl SerialEncoder {
    pub fn new(pipeline: bool) -> Self {
        Self {
            pipeline,
            state: SerialState::default(),
        }
    }

    #[inline]
    pub fn pipeline(&self) -> bool {
        self.pipeline
    }

    #[inline]
    pub fn last(&self) -> bool {
        self.state.last
    }

    #[inline]
    pub fn state(&self) -> SerialState {
        self.state
    }
}

impl Clocked for SerialEncoder {
    type Input = SerialInput;
    type Output = bool;

    fn step(&mut self, input: SerialInput) -> bool {
        let (dout, d) = encode_kernel(self.pipeline, self.state, input);
        self.state = d;
        dout
    }

    fn reset(&mut self) {
        self.state = SerialState::default();
    }
}
