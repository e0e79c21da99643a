pub mod nrzi;
pub mod shift_register;

/// A synchronous block in a single clock domain.
///
/// Each call to [`Clocked::step`] evaluates one clock cycle: it returns the
/// outputs visible during the cycle and then advances all registered state
/// across the clock edge.
pub trait Clocked {
    type Input;
    type Output;

    fn step(&mut self, input: Self::Input) -> Self::Output;

    /// Restores the power-up state.
    fn reset(&mut self);

    /// Steps once per input, collecting the outputs.
    fn run<I>(&mut self, inputs: I) -> Vec<Self::Output>
    where
        I: IntoIterator<Item = Self::Input>,
    {
        inputs.into_iter().map(|input| self.step(input)).collect()
    }
}
