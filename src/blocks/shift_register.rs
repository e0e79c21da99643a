use super::Clocked;

/// A chain of single-bit registers.
///
/// The output is the last register of the chain, so an input bit appears on
/// the output `length` cycles after it is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftRegister {
    chain: Vec<bool>,
    initial: bool,
}

impl ShiftRegister {
    pub fn new(length: usize) -> Self {
        Self::with_initial(length, false)
    }

    /// Creates a shift register whose registers power up holding `initial`.
    pub fn with_initial(length: usize, initial: bool) -> Self {
        assert!(length > 0, "Shift register length must be at least 1");
        Self {
            chain: vec![initial; length],
            initial,
        }
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.chain.len()
    }

    #[inline]
    pub fn output(&self) -> bool {
        self.chain[self.chain.len() - 1]
    }
}

impl Clocked for ShiftRegister {
    type Input = bool;
    type Output = bool;

    fn step(&mut self, input: bool) -> bool {
        let output = self.output();
        self.chain.rotate_right(1);
        self.chain[0] = input;
        output
    }

    fn reset(&mut self) {
        self.chain.fill(self.initial);
    }
}
