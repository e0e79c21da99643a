pub use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use tera::Tera;

pub mod blocks;
pub mod cli;
pub mod config;
pub mod error;
pub mod paths;
pub mod plan;
pub mod verification;
pub mod verilog;

pub const BUILD_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/build");

/// The USB J (idle) line level, as seen by the coding stages.
pub const IDLE_LEVEL: bool = true;

/// The widest parallel bus a coding stage supports.
pub const MAX_WIDTH: usize = u64::BITS as usize;

lazy_static! {
    pub static ref TEMPLATES: Tera =
        match Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/*")) {
            Ok(t) => t,
            Err(e) => panic!("Error parsing templates: {e}"),
        };
}

/// A mask selecting the lower `width` bits of a word.
#[inline]
pub(crate) fn word_mask(width: usize) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}
