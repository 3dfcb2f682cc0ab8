//! Fixed-width bit-field and flag-register primitives.
//!
//! - **field** – `BitField<N>`: an N-bit unsigned value with wraparound
//!   arithmetic, shift/rotate (with and without carry), and low-bit helpers.
//!   `Wide<N>` is the wider-than-N-bit ALU scratch used for carry detection.
//! - **flags** – `FlagReg<N>`: a bitmask-named view over the same storage,
//!   with single-bit set/clear/test and contiguous multi-bit field ops.

pub mod field;
pub mod flags;

#[cfg(test)]
mod tests;
