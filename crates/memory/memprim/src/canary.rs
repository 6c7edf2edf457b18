//! Deterministic canary pattern used to seed working regions
//!
//! Byte `i` is the low byte of the running seed, and the seed advances by a
//! 32-bit multiplicative step. The sequence is cheap, reproducible and has
//! no long runs, so a stale or out-of-bounds write almost always changes
//! at least one byte.

/// Seed used for source regions
pub const SOURCE_SEED: u32 = 567;

/// Seed used for destination regions
pub const DEST_SEED: u32 = 123_514;

/// Multiplier of the canary recurrence
pub const CANARY_MULTIPLIER: u32 = 0x0123_4567;

/// Overwrite `buf` with the canary sequence for `seed`.
pub fn seed_canary(buf: &mut [u8], seed: u32) {
    let mut state = seed;
    for byte in buf {
        *byte = state as u8;
        state = state.wrapping_mul(CANARY_MULTIPLIER);
    }
}

/// Iterator over the canary sequence, for building expected buffers.
pub fn canary_bytes(seed: u32) -> impl Iterator<Item = u8> {
    std::iter::successors(Some(seed), |state| Some(state.wrapping_mul(CANARY_MULTIPLIER)))
        .map(|state| state as u8)
}
