pub mod bit_signal;
pub mod trace;
