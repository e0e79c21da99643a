use serde::{Deserialize, Serialize};

use crate::MAX_WIDTH;

/// A fixed-width vector of bits, bit 0 first.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BitSignal {
    bits: Vec<bool>,
}

impl BitSignal {
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        Self {
            bits: bits.into_iter().collect(),
        }
    }

    /// The lower `width` bits of `value`.
    pub fn from_u64(value: u64, width: usize) -> Self {
        assert!(width <= MAX_WIDTH, "BitSignal width must be at most {MAX_WIDTH}");
        Self::from_bits((0..width).map(|i| (value >> i) & 1 == 1))
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.bits.len()
    }
}

impl std::fmt::Display for BitSignal {
    /// Formats the signal MSB first, the way a bus is written in Verilog.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.bits.iter().rev() {
            write!(f, "{}", if *b { '1' } else { '0' })?;
        }
        Ok(())
    }
}
