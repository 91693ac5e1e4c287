//! Random sources for the two backends.

pub mod fast_rng;
pub mod lane_hash;

pub use fast_rng::{FastRng, FastRngKind, Xoshiro256PlusPlus, box_muller_normal, uniform_open01};
pub use lane_hash::{lane_uniform, pcg_hash};
