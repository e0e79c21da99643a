//! NRZI coding stages of the UTMI digital core.
//!
//! NRZI represents a logical 0 as a transition of the line level and a
//! logical 1 as no transition. Every stage keeps one bit of carry state, the
//! line level of the previous bit cell, which resets to the J (idle) level
//! whenever `idle` is asserted.

use std::fmt::{Display, Formatter};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use self::parallel::{ParallelDecoder, ParallelEncoder, ParallelInput, ParallelOutput};
use self::serial::{SerialDecoder, SerialEncoder, SerialInput};
use super::Clocked;
use crate::error::CodingError;
use crate::MAX_WIDTH;

pub mod parallel;
pub mod serial;

pub const DEFAULT_WIDTH: usize = 8;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    SerialDecoder,
    SerialEncoder,
    ParallelDecoder,
    ParallelEncoder,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::SerialDecoder,
        StageKind::SerialEncoder,
        StageKind::ParallelDecoder,
        StageKind::ParallelEncoder,
    ];

    #[inline]
    pub fn is_parallel(&self) -> bool {
        matches!(self, Self::ParallelDecoder | Self::ParallelEncoder)
    }

    /// Short name used in generated module names.
    pub fn abbrev(&self) -> &'static str {
        match self {
            Self::SerialDecoder => "ser_nrzi_dec",
            Self::SerialEncoder => "ser_nrzi_enc",
            Self::ParallelDecoder => "par_nrzi_dec",
            Self::ParallelEncoder => "par_nrzi_enc",
        }
    }
}

impl Display for StageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::SerialDecoder => "serial decoder",
            Self::SerialEncoder => "serial encoder",
            Self::ParallelDecoder => "parallel decoder",
            Self::ParallelEncoder => "parallel encoder",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Builder, Serialize, Deserialize)]
#[builder(derive(Debug))]
pub struct StageParams {
    kind: StageKind,
    /// Parallel bus width. Ignored by serial stages.
    #[builder(default = "DEFAULT_WIDTH")]
    width: usize,
    /// Register the stage outputs.
    #[builder(default)]
    pipeline: bool,
}

impl StageParams {
    pub const fn new(kind: StageKind, width: usize, pipeline: bool) -> Self {
        Self {
            kind,
            width,
            pipeline,
        }
    }

    #[inline]
    pub fn builder() -> StageParamsBuilder {
        StageParamsBuilder::default()
    }

    #[inline]
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// The number of bits consumed and produced per cycle.
    #[inline]
    pub fn width(&self) -> usize {
        if self.kind.is_parallel() {
            self.width
        } else {
            1
        }
    }

    #[inline]
    pub fn pipeline(&self) -> bool {
        self.pipeline
    }

    pub fn validate(&self) -> Result<(), CodingError> {
        let width = self.width();
        if width == 0 || width > MAX_WIDTH {
            return Err(CodingError::InvalidWidth {
                width,
                max: MAX_WIDTH,
            });
        }
        Ok(())
    }

    /// The name of the generated module for these parameters.
    pub fn name(&self, prefix: &str) -> arcstr::ArcStr {
        let suffix = if self.pipeline { "_p" } else { "" };
        if self.kind.is_parallel() {
            arcstr::format!(
                "{prefix}_{}_w{}{suffix}",
                self.kind.abbrev(),
                self.width
            )
        } else {
            arcstr::format!("{prefix}_{}{suffix}", self.kind.abbrev())
        }
    }
}

/// Any one of the coding stages, driven through the parallel interface.
///
/// Serial stages consume bit 0 of `din`, produce bit 0 of `dout` and always
/// report a valid output.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Stage {
    SerialDecoder(SerialDecoder),
    SerialEncoder(SerialEncoder),
    ParallelDecoder(ParallelDecoder),
    ParallelEncoder(ParallelEncoder),
}

impl Stage {
    pub fn new(params: &StageParams) -> Self {
        let pipeline = params.pipeline();
        match params.kind() {
            StageKind::SerialDecoder => Self::SerialDecoder(SerialDecoder::new(pipeline)),
            StageKind::SerialEncoder => Self::SerialEncoder(SerialEncoder::new(pipeline)),
            StageKind::ParallelDecoder => {
                Self::ParallelDecoder(ParallelDecoder::new(params.width(), pipeline))
            }
            StageKind::ParallelEncoder => {
                Self::ParallelEncoder(ParallelEncoder::new(params.width(), pipeline))
            }
        }
    }

    pub fn kind(&self) -> StageKind {
        match self {
            Self::SerialDecoder(_) => StageKind::SerialDecoder,
            Self::SerialEncoder(_) => StageKind::SerialEncoder,
            Self::ParallelDecoder(_) => StageKind::ParallelDecoder,
            Self::ParallelEncoder(_) => StageKind::ParallelEncoder,
        }
    }

    /// The current carry (last line level) of the stage.
    pub fn carry(&self) -> bool {
        match self {
            Self::SerialDecoder(s) => s.last(),
            Self::SerialEncoder(s) => s.last(),
            Self::ParallelDecoder(s) => s.carry(),
            Self::ParallelEncoder(s) => s.carry(),
        }
    }
}

fn serial_input(input: &ParallelInput) -> SerialInput {
    SerialInput {
        din: input.din & 1 == 1,
        idle: input.idle,
        bypass: input.bypass,
    }
}

fn serial_output(dout: bool) -> ParallelOutput {
    ParallelOutput {
        dout: dout as u64,
        dout_valid: true,
    }
}

impl Clocked for Stage {
    type Input = ParallelInput;
    type Output = ParallelOutput;

    fn step(&mut self, input: ParallelInput) -> ParallelOutput {
        match self {
            Self::SerialDecoder(s) => serial_output(s.step(serial_input(&input))),
            Self::SerialEncoder(s) => serial_output(s.step(serial_input(&input))),
            Self::ParallelDecoder(s) => s.step(input),
            Self::ParallelEncoder(s) => s.step(input),
        }
    }

    fn reset(&mut self) {
        match self {
            Self::SerialDecoder(s) => s.reset(),
            Self::SerialEncoder(s) => s.reset(),
            Self::ParallelDecoder(s) => s.reset(),
            Self::ParallelEncoder(s) => s.reset(),
        }
    }
}

#[cfg(test)]
mod tests {
    use paste::paste;

    use super::parallel::ParallelState;
    use super::*;
    use crate::blocks::shift_register::ShiftRegister;

    /// Deterministic pseudo-random words for exercising the stages.
    fn words(seed: u64, count: usize, width: usize) -> Vec<u64> {
        let mut x = seed | 1;
        (0..count)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 7;
                x ^= x << 17;
                x & crate::word_mask(width)
            })
            .collect()
    }

    fn bits_of(word: u64, width: usize) -> impl Iterator<Item = bool> {
        (0..width).map(move |i| (word >> i) & 1 == 1)
    }

    fn word_of(bits: impl IntoIterator<Item = bool>) -> u64 {
        bits.into_iter()
            .enumerate()
            .fold(0, |w, (i, b)| w | ((b as u64) << i))
    }

    macro_rules! test_serial_equivalence {
        ($($width: literal),*) => {
            paste! {
                $(
                    #[test]
                    fn [<parallel_decoder_matches_serial_w $width>]() {
                        let mut par = ParallelDecoder::new($width, false);
                        let mut ser = SerialDecoder::new(false);
                        for word in words(0x5eed + $width, 32, $width) {
                            let carry = par.carry();
                            assert_eq!(ser.last(), carry);
                            let expected = word_of(
                                ser.run(bits_of(word, $width).map(SerialInput::data)),
                            );
                            assert_eq!(par.step(ParallelInput::valid(word)).dout, expected);
                            assert_eq!(par.carry(), ser.last());
                        }
                    }

                    #[test]
                    fn [<parallel_encoder_matches_serial_w $width>]() {
                        let mut par = ParallelEncoder::new($width, false);
                        let mut ser = SerialEncoder::new(false);
                        for word in words(0xc0de + $width, 32, $width) {
                            let expected = word_of(
                                ser.run(bits_of(word, $width).map(SerialInput::data)),
                            );
                            assert_eq!(par.step(ParallelInput::valid(word)).dout, expected);
                            assert_eq!(par.carry(), ser.last());
                        }
                    }
                )*
            }
        };
    }

    test_serial_equivalence!(1, 4, 8, 16, 33, 64);

    #[test]
    fn parallel_round_trip_with_gaps() {
        let width = 8;
        let data = words(0xfeed, 64, width);
        let mut enc = ParallelEncoder::new(width, false);
        let mut dec = ParallelDecoder::new(width, false);

        let mut idle = true;
        let mut decoded = Vec::new();
        for (i, &word) in data.iter().enumerate() {
            // Interpose an invalid garbage word between every few valid ones.
            if i % 3 == 2 {
                let garbage = ParallelInput::invalid(!word);
                let line = enc.step(garbage);
                let out = dec.step(ParallelInput {
                    din: line.dout,
                    din_valid: line.dout_valid,
                    ..Default::default()
                });
                assert!(!out.dout_valid);
            }
            let line = enc.step(ParallelInput {
                idle,
                ..ParallelInput::valid(word)
            });
            let out = dec.step(ParallelInput {
                din: line.dout,
                din_valid: line.dout_valid,
                idle,
                bypass: false,
            });
            assert!(out.dout_valid);
            decoded.push(out.dout);
            idle = false;
        }
        assert_eq!(decoded, data);
    }

    #[test]
    fn pipelined_serial_round_trip() {
        let bits: Vec<bool> = bits_of(0x9c3e_51a7, 32).collect();
        let mut enc = SerialEncoder::new(true);
        let mut dec = SerialDecoder::new(false);
        // Align idle with the registered encoder output.
        let mut idle_delay = ShiftRegister::with_initial(1, true);

        let decoded: Vec<bool> = bits
            .iter()
            .chain(std::iter::once(&false))
            .enumerate()
            .map(|(t, &b)| {
                let idle = t == 0;
                let line = enc.step(SerialInput {
                    din: b,
                    idle,
                    bypass: false,
                });
                let idle = idle_delay.step(idle) || idle;
                dec.step(SerialInput {
                    din: line,
                    idle,
                    bypass: false,
                })
            })
            .collect();
        assert_eq!(decoded[1..], bits[..]);
    }

    #[test]
    fn stage_dispatch_uses_serial_bit_zero() {
        let params = StageParams::builder()
            .kind(StageKind::SerialEncoder)
            .build()
            .unwrap();
        let mut stage = Stage::new(&params);
        assert_eq!(stage.kind(), StageKind::SerialEncoder);
        let out = stage.run([0b10, 0b11, 0b10].map(ParallelInput::invalid));
        let douts: Vec<u64> = out.iter().map(|o| o.dout).collect();
        assert_eq!(douts, [0, 0, 1]);
        assert!(out.iter().all(|o| o.dout_valid));
        assert!(stage.carry());
        stage.reset();
        assert!(stage.carry());
    }

    #[test]
    fn stage_dispatch_parallel() {
        let params = StageParams::new(StageKind::ParallelDecoder, 4, true);
        let mut stage = Stage::new(&params);
        stage.step(ParallelInput::valid(0b1010));
        match stage {
            Stage::ParallelDecoder(dec) => assert_eq!(
                dec.state(),
                ParallelState {
                    carry: true,
                    out: ParallelOutput {
                        dout: 0,
                        dout_valid: true
                    }
                }
            ),
            _ => panic!("expected a parallel decoder"),
        }
    }

    #[test]
    fn params_builder_defaults() {
        let params = StageParams::builder()
            .kind(StageKind::ParallelEncoder)
            .build()
            .unwrap();
        assert_eq!(params.width(), DEFAULT_WIDTH);
        assert!(!params.pipeline());
        assert!(StageParams::builder().build().is_err());
    }

    #[test]
    fn params_names() {
        let par = StageParams::new(StageKind::ParallelDecoder, 16, true);
        assert_eq!(&*par.name("utmi"), "utmi_par_nrzi_dec_w16_p");
        let ser = StageParams::new(StageKind::SerialEncoder, 16, false);
        assert_eq!(&*ser.name("utmi"), "utmi_ser_nrzi_enc");
        assert_eq!(ser.width(), 1);
    }

    #[test]
    fn params_validation() {
        assert!(StageParams::new(StageKind::ParallelDecoder, 0, false)
            .validate()
            .is_err());
        assert!(StageParams::new(StageKind::ParallelEncoder, 65, false)
            .validate()
            .is_err());
        // Serial stages ignore the bus width.
        assert!(StageParams::new(StageKind::SerialDecoder, 0, false)
            .validate()
            .is_ok());
    }

    #[test]
    fn stage_kind_serde_names() {
        let kinds: Vec<StageKind> =
            serde_json::from_str(r#"["serial_decoder", "parallel_encoder"]"#).unwrap();
        assert_eq!(kinds, [StageKind::SerialDecoder, StageKind::ParallelEncoder]);
    }
}
