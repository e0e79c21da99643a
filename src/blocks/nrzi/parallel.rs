use serde::{Deserialize, Serialize};

use crate::blocks::Clocked;
use crate::{word_mask, IDLE_LEVEL, MAX_WIDTH};

/// Inputs of a parallel coding stage for one clock cycle.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ParallelInput {
    /// Input word. Bit 0 is the earliest bit on the line.
    pub din: u64,
    /// Asserted when `din` is valid new data.
    pub din_valid: bool,
    /// Asserted when the bus goes idle. Should be deasserted the first time
    /// `din_valid` is asserted in a given transaction.
    pub idle: bool,
    /// Pipe `din` to `dout` with the standard latency.
    pub bypass: bool,
}

impl ParallelInput {
    #[inline]
    pub fn valid(din: u64) -> Self {
        Self {
            din,
            din_valid: true,
            ..Default::default()
        }
    }

    #[inline]
    pub fn invalid(din: u64) -> Self {
        Self {
            din,
            ..Default::default()
        }
    }

    #[inline]
    pub fn idle(din: u64) -> Self {
        Self {
            din,
            idle: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ParallelOutput {
    pub dout: u64,
    pub dout_valid: bool,
}

/// Registered state of a parallel coding stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ParallelState {
    /// The line level of the last bit cell of the most recent valid word.
    pub carry: bool,
    /// Output registers. Only visible when the stage is pipelined.
    pub out: ParallelOutput,
}

impl Default for ParallelState {
    fn default() -> Self {
        Self {
            carry: IDLE_LEVEL,
            out: ParallelOutput::default(),
        }
    }
}

#[inline]
fn top_bit(word: u64, width: usize) -> bool {
    (word >> (width - 1)) & 1 == 1
}

/// NRZI-decodes one word given the line level preceding bit 0.
pub fn decode_word(carry: bool, din: u64, width: usize) -> u64 {
    let mask = word_mask(width);
    let din = din & mask;
    let prev = ((din << 1) | carry as u64) & mask;
    !(prev ^ din) & mask
}

/// NRZI-encodes one word given the line level preceding bit 0.
///
/// Each coded bit is chained from the previous coded bit, so the result
/// matches the serial encoder fed with the word LSB first.
pub fn encode_word(carry: bool, din: u64, width: usize) -> u64 {
    (0..width)
        .fold((carry, 0u64), |(level, word), i| {
            let level = level == ((din >> i) & 1 == 1);
            (level, word | ((level as u64) << i))
        })
        .1
}

#[inline]
fn next_carry(carry: bool, input: &ParallelInput, top: bool) -> bool {
    if input.idle {
        IDLE_LEVEL
    } else if input.din_valid {
        top
    } else {
        carry
    }
}

#[inline]
fn select_output(
    pipeline: bool,
    q: &ParallelState,
    input: &ParallelInput,
    coded: u64,
    width: usize,
) -> (ParallelOutput, ParallelOutput) {
    let comb = ParallelOutput {
        dout: if input.bypass {
            input.din & word_mask(width)
        } else {
            coded
        },
        dout_valid: input.din_valid,
    };
    (if pipeline { q.out } else { comb }, comb)
}

/// Evaluates one cycle of the parallel NRZI decoder.
///
/// Returns the outputs visible during the cycle and the state after the clock edge.
pub fn decode_kernel(
    width: usize,
    pipeline: bool,
    q: ParallelState,
    input: ParallelInput,
) -> (ParallelOutput, ParallelState) {
    let decoded = decode_word(q.carry, input.din, width);
    let (out, comb) = select_output(pipeline, &q, &input, decoded, width);
    let d = ParallelState {
        carry: next_carry(q.carry, &input, top_bit(input.din, width)),
        out: comb,
    };
    (out, d)
}

/// Evaluates one cycle of the parallel NRZI encoder.
///
/// Returns the outputs visible during the cycle and the state after the clock edge.
pub fn encode_kernel(
    width: usize,
    pipeline: bool,
    q: ParallelState,
    input: ParallelInput,
) -> (ParallelOutput, ParallelState) {
    let encoded = encode_word(q.carry, input.din, width);
    let (out, comb) = select_output(pipeline, &q, &input, encoded, width);
    let d = ParallelState {
        carry: next_carry(q.carry, &input, top_bit(encoded, width)),
        out: comb,
    };
    (out, d)
}

fn check_width(width: usize) {
    assert!(
        (1..=MAX_WIDTH).contains(&width),
        "Bus width must be between 1 and {MAX_WIDTH}, got {width}"
    );
}

/// A parallel NRZI decoder.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ParallelDecoder {
    width: usize,
    pipeline: bool,
    state: ParallelState,
}

impl ParallelDecoder {
    pub fn new(width: usize, pipeline: bool) -> Self {
        check_width(width);
        Self {
            width,
            pipeline,
            state: ParallelState::default(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn pipeline(&self) -> bool {
        self.pipeline
    }

    #[inline]
    pub fn carry(&self) -> bool {
        self.state.carry
    }

    #[inline]
    pub fn state(&self) -> ParallelState {
        self.state
    }
}

impl Clocked for ParallelDecoder {
    type Input = ParallelInput;
    type Output = ParallelOutput;

    fn step(&mut self, input: ParallelInput) -> ParallelOutput {
        let (out, d) = decode_kernel(self.width, self.pipeline, self.state, input);
        self.state = d;
        out
    }

    fn reset(&mut self) {
        self.state = ParallelState::default();
    }
}

/// A parallel NRZI encoder.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ParallelEncoder {
    width: usize,
    pipeline: bool,
    state: ParallelState,
}

impl ParallelEncoder {
    pub fn new(width: usize, pipeline: bool) -> Self {
        check_width(width);
        Self {
            width,
            pipeline,
            state: ParallelState::default(),
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn pipeline(&self) -> bool {
        self.pipeline
    }

    #[inline]
    pub fn carry(&self) -> bool {
        self.state.carry
    }

    #[inline]
    pub fn state(&self) -> ParallelState {
        self.state
    }
}

impl Clocked for ParallelEncoder {
    type Input = ParallelInput;
    type Output = ParallelOutput;

    fn step(&mut self, input: ParallelInput) -> ParallelOutput {
        let (out, d) = encode_kernel(self.width, self.pipeline, self.state, input);
        self.state = d;
        out
    }

    fn reset(&mut self) {
        self.state = ParallelState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_worked_example() {
        let mut dec = ParallelDecoder::new(4, false);
        assert!(dec.carry());
        // Every bit cell toggles, so every decoded bit is a zero.
        let out = dec.step(ParallelInput::valid(0b1010));
        assert_eq!(out.dout, 0b0000);
        assert!(out.dout_valid);
        assert!(dec.carry());
    }

    #[test]
    fn decoder_carries_across_words() {
        let mut dec = ParallelDecoder::new(4, false);
        dec.step(ParallelInput::valid(0b0111));
        assert!(!dec.carry());
        // Bit 0 is compared against the previous word's top bit.
        assert_eq!(dec.step(ParallelInput::valid(0b0000)).dout, 0b1111);
        assert_eq!(dec.step(ParallelInput::valid(0b0001)).dout, 0b1100);
    }

    #[test]
    fn invalid_words_hold_carry() {
        for din in [0u64, 0xff, 0x80, 0x7f] {
            let mut dec = ParallelDecoder::new(8, false);
            let mut enc = ParallelEncoder::new(8, false);
            dec.step(ParallelInput::valid(0x01));
            enc.step(ParallelInput::valid(0xfe));
            let (dec_carry, enc_carry) = (dec.carry(), enc.carry());

            let out = dec.step(ParallelInput::invalid(din));
            assert!(!out.dout_valid);
            enc.step(ParallelInput::invalid(din));
            assert_eq!(dec.carry(), dec_carry);
            assert_eq!(enc.carry(), enc_carry);
        }
    }

    #[test]
    fn idle_takes_precedence_over_valid() {
        let mut dec = ParallelDecoder::new(8, false);
        dec.step(ParallelInput::valid(0x00));
        assert!(!dec.carry());
        dec.step(ParallelInput {
            din: 0x00,
            din_valid: true,
            idle: true,
            bypass: false,
        });
        assert!(dec.carry());
        // The next word is decoded against the J level.
        assert_eq!(
            dec.step(ParallelInput::valid(0xfe)).dout,
            decode_word(true, 0xfe, 8)
        );

        let mut enc = ParallelEncoder::new(8, false);
        enc.step(ParallelInput::valid(0x7f));
        assert!(!enc.carry());
        enc.step(ParallelInput::idle(0x00));
        assert!(enc.carry());
        assert_eq!(
            enc.step(ParallelInput::valid(0x5a)).dout,
            encode_word(true, 0x5a, 8)
        );
    }

    #[test]
    fn encoder_chains_through_coded_bits() {
        let mut enc = ParallelEncoder::new(4, false);
        // All ones hold the idle level, all zeros toggle it every bit.
        assert_eq!(enc.step(ParallelInput::valid(0b1111)).dout, 0b1111);
        assert_eq!(enc.step(ParallelInput::valid(0b0000)).dout, 0b1010);
        assert!(enc.carry());
        assert_eq!(enc.step(ParallelInput::valid(0b1110)).dout, 0b0000);
        assert!(!enc.carry());
    }

    #[test]
    fn bypass_is_identity() {
        for pipeline in [false, true] {
            let mut dec = ParallelDecoder::new(8, pipeline);
            let mut enc = ParallelEncoder::new(8, pipeline);
            let words = [0x3cu64, 0xa5, 0x00, 0xff, 0x1234];
            let inputs = words.map(|din| ParallelInput {
                bypass: true,
                ..ParallelInput::valid(din)
            });
            let dec_out = dec.run(inputs);
            let enc_out = enc.run(inputs);
            let offset = pipeline as usize;
            for (i, word) in words.iter().take(words.len() - offset).enumerate() {
                assert_eq!(dec_out[i + offset].dout, word & 0xff);
                assert_eq!(enc_out[i + offset].dout, word & 0xff);
            }
        }
    }

    #[test]
    fn bypass_leaves_carry_alone() {
        for pipeline in [false, true] {
            let mut dec = ParallelDecoder::new(8, pipeline);
            let mut enc = ParallelEncoder::new(8, pipeline);
            let mut plain_dec = ParallelDecoder::new(8, pipeline);
            let mut plain_enc = ParallelEncoder::new(8, pipeline);
            for din in [0x3cu64, 0xa5, 0x01, 0xfe, 0x80] {
                dec.step(ParallelInput {
                    bypass: true,
                    ..ParallelInput::valid(din)
                });
                enc.step(ParallelInput {
                    bypass: true,
                    ..ParallelInput::valid(din)
                });
                plain_dec.step(ParallelInput::valid(din));
                plain_enc.step(ParallelInput::valid(din));
                assert_eq!(dec.carry(), plain_dec.carry());
                assert_eq!(enc.carry(), plain_enc.carry());
            }
        }
    }

    #[test]
    fn idle_with_bypass() {
        let input = ParallelInput {
            din: 0x5a,
            din_valid: true,
            idle: true,
            bypass: true,
        };

        let mut dec = ParallelDecoder::new(8, false);
        dec.step(ParallelInput::valid(0x00));
        assert!(!dec.carry());
        let out = dec.step(input);
        assert_eq!(out.dout, 0x5a);
        assert!(out.dout_valid);
        assert!(dec.carry());

        let mut enc = ParallelEncoder::new(8, false);
        enc.step(ParallelInput::valid(0x7f));
        assert!(!enc.carry());
        let out = enc.step(input);
        assert_eq!(out.dout, 0x5a);
        assert!(enc.carry());
    }

    #[test]
    fn pipelined_valid_follows_data() {
        let mut dec = ParallelDecoder::new(8, true);
        let out = dec.run([
            ParallelInput::valid(0x12),
            ParallelInput::invalid(0x34),
            ParallelInput::valid(0x56),
        ]);
        assert_eq!(out[0], ParallelOutput::default());
        assert!(out[1].dout_valid);
        assert_eq!(out[1].dout, decode_word(true, 0x12, 8));
        assert!(!out[2].dout_valid);
    }

    #[test]
    fn full_width_words() {
        let mut enc = ParallelEncoder::new(64, false);
        let mut dec = ParallelDecoder::new(64, false);
        for word in [u64::MAX, 0, 0xdead_beef_0123_4567, 1 << 63] {
            let line = enc.step(ParallelInput::valid(word)).dout;
            assert_eq!(dec.step(ParallelInput::valid(line)).dout, word);
        }
    }

    #[test]
    fn words_are_masked_to_width() {
        assert_eq!(decode_word(false, 0xf0f, 4), 0b1110);
        assert_eq!(encode_word(true, 0xf0f, 4), 0b1111);
    }

    #[test]
    #[should_panic]
    fn zero_width_panics() {
        ParallelDecoder::new(0, false);
    }
}
