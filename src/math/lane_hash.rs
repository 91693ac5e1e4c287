//! Stateless per-lane sampler shared with the compute kernel.
//!
//! The WGSL kernel and these host functions implement the same integer
//! hash, so a lane's draws depend only on `(salt, lane, step)` and can be
//! replayed on the host.

/// PCG-RXS-M-XS 32-bit output permutation applied to a single LCG step.
#[inline]
pub fn pcg_hash(input: u32) -> u32 {
    let state = input.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    (word >> 22) ^ word
}

/// Uniform in [0, 1] for one `(lane, step)` pair.
#[inline]
pub fn lane_uniform(salt: u32, lane: u32, step: u32) -> f32 {
    let h = pcg_hash(lane ^ pcg_hash(step ^ pcg_hash(salt)));
    h as f32 * (1.0 / 4_294_967_296.0)
}
