use rand::Rng;
use rand::rngs::ThreadRng;

/// Selects the uniform source behind the scalar sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastRngKind {
    /// Seeded, reproducible stream.
    Xoshiro256PlusPlus,
    /// Process-wide thread-local generator; not reproducible.
    ThreadRng,
}

impl Default for FastRngKind {
    fn default() -> Self {
        Self::ThreadRng
    }
}

#[derive(Debug, Clone)]
pub struct Xoshiro256PlusPlus {
    state: [u64; 4],
}

impl Xoshiro256PlusPlus {
    #[inline]
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut sm = SplitMix64::new(seed);
        let mut state = [0_u64; 4];
        for item in &mut state {
            *item = sm.next_u64();
        }

        if state.iter().all(|&x| x == 0) {
            state[0] = 1;
        }

        Self { state }
    }

    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let result = (self.state[0].wrapping_add(self.state[3]))
            .rotate_left(23)
            .wrapping_add(self.state[0]);

        let t = self.state[1] << 17;

        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];

        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);

        result
    }

    /// Uniform in [0, 1) with 53 bits of precision.
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        let x = self.next_u64() >> 11;
        x as f64 * (1.0 / ((1_u64 << 53) as f64))
    }
}

#[derive(Debug)]
pub enum FastRng {
    Xoshiro256PlusPlus(Xoshiro256PlusPlus),
    ThreadRng(ThreadRng),
}

impl FastRng {
    #[inline]
    pub fn from_seed(kind: FastRngKind, seed: u64) -> Self {
        match kind {
            FastRngKind::Xoshiro256PlusPlus => {
                Self::Xoshiro256PlusPlus(Xoshiro256PlusPlus::seed_from_u64(seed))
            }
            FastRngKind::ThreadRng => Self::ThreadRng(rand::rng()),
        }
    }

    /// Seeded stream when `seed` is set, thread generator otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::from_seed(FastRngKind::Xoshiro256PlusPlus, seed),
            None => Self::from_seed(FastRngKind::ThreadRng, 0),
        }
    }

    #[inline]
    pub fn random_f64(&mut self) -> f64 {
        match self {
            Self::Xoshiro256PlusPlus(rng) => rng.next_f64(),
            Self::ThreadRng(rng) => rng.random::<f64>(),
        }
    }

    #[inline]
    pub fn random_u64(&mut self) -> u64 {
        match self {
            Self::Xoshiro256PlusPlus(rng) => rng.next_u64(),
            Self::ThreadRng(rng) => rng.random::<u64>(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    #[inline]
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

/// Uniform in (0, 1); zero draws are rejected so `ln(u)` stays finite.
#[inline]
pub fn uniform_open01(rng: &mut FastRng) -> f64 {
    loop {
        let u = rng.random_f64();
        if u > 0.0 {
            return u;
        }
    }
}

/// Standard normal draw via the Box-Muller transform (cosine branch).
#[inline]
pub fn box_muller_normal(rng: &mut FastRng) -> f64 {
    let u1 = uniform_open01(rng);
    let u2 = uniform_open01(rng);
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xoshiro_same_seed_reproduces_sequence() {
        let mut a = FastRng::from_seed(FastRngKind::Xoshiro256PlusPlus, 42);
        let mut b = FastRng::from_seed(FastRngKind::Xoshiro256PlusPlus, 42);

        for _ in 0..128 {
            assert_eq!(a.random_u64(), b.random_u64());
        }
    }

    #[test]
    fn xoshiro_produces_unit_interval() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for _ in 0..1000 {
            let u = rng.next_f64();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn thread_rng_draws_stay_in_open_interval() {
        let mut rng = FastRng::from_optional_seed(None);
        for _ in 0..1000 {
            let u = uniform_open01(&mut rng);
            assert!(u > 0.0 && u < 1.0);
        }
    }

    #[test]
    fn box_muller_moments_are_standard() {
        let mut rng = FastRng::from_optional_seed(Some(7));
        let n = 200_000;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for _ in 0..n {
            let z = box_muller_normal(&mut rng);
            assert!(z.is_finite());
            sum += z;
            sum_sq += z * z;
        }
        let mean = sum / n as f64;
        let var = sum_sq / n as f64 - mean * mean;
        assert!(mean.abs() < 0.01, "mean={mean}");
        assert!((var - 1.0).abs() < 0.02, "var={var}");
    }
}
