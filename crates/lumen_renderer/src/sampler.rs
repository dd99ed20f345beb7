//! Per-path random number sources.
//!
//! Every camera sample gets its own sampler from [`Sampler::create`], so
//! paths never share random state and a render is reproducible from its
//! seed regardless of how work is split across threads.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform variates for one path.
pub trait Sampler: Send {
    /// A pair of uniform values in `[0, 1)`.
    fn next_uv(&mut self) -> (f32, f32);

    /// A uniform value in `[0, 1)`.
    fn random(&mut self) -> f32;

    /// An independent sampler for path `index`.
    fn create(&self, index: u64) -> Self
    where
        Self: Sized;
}

/// Stream-per-index mix so nearby indices give unrelated seeds.
fn mix_seed(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Independent uniform samples from a seeded `StdRng`.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    seed: u64,
    rng: StdRng,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn next_uv(&mut self) -> (f32, f32) {
        (self.rng.gen(), self.rng.gen())
    }

    fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    fn create(&self, index: u64) -> Self {
        Self {
            seed: self.seed,
            rng: StdRng::seed_from_u64(mix_seed(self.seed, index)),
        }
    }
}

/// Jittered `n × n` strata for UV draws.
///
/// Successive `next_uv` calls walk the strata in a shuffled order and
/// restart once all of them were used; scalar randoms are plain uniform.
#[derive(Debug, Clone)]
pub struct StratifiedSampler {
    seed: u64,
    strata: u32,
    order: Vec<u32>,
    cursor: usize,
    rng: StdRng,
}

impl StratifiedSampler {
    pub fn new(seed: u64, strata: u32) -> Self {
        Self::with_rng(seed, strata.max(1), StdRng::seed_from_u64(seed))
    }

    fn with_rng(seed: u64, strata: u32, rng: StdRng) -> Self {
        let mut sampler = Self {
            seed,
            strata,
            order: (0..strata * strata).collect(),
            cursor: 0,
            rng,
        };
        sampler.shuffle();
        sampler
    }

    fn shuffle(&mut self) {
        // Fisher-Yates
        for i in (1..self.order.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            self.order.swap(i, j);
        }
        self.cursor = 0;
    }
}

impl Sampler for StratifiedSampler {
    fn next_uv(&mut self) -> (f32, f32) {
        if self.cursor == self.order.len() {
            self.shuffle();
        }
        let cell = self.order[self.cursor];
        self.cursor += 1;

        let n = self.strata as f32;
        let (cu, cv) = ((cell % self.strata) as f32, (cell / self.strata) as f32);
        let (ju, jv): (f32, f32) = (self.rng.gen(), self.rng.gen());
        (((cu + ju) / n).min(1.0 - f32::EPSILON), ((cv + jv) / n).min(1.0 - f32::EPSILON))
    }

    fn random(&mut self) -> f32 {
        self.rng.gen()
    }

    fn create(&self, index: u64) -> Self {
        Self::with_rng(self.seed, self.strata, StdRng::seed_from_u64(mix_seed(self.seed, index)))
    }
}

/// Replays fixed sequences, cycling when exhausted.
///
/// Used to drive the integrator down specific branches in tests.
#[derive(Debug, Clone)]
pub struct SequenceSampler {
    uvs: Vec<(f32, f32)>,
    randoms: Vec<f32>,
    uv_cursor: usize,
    random_cursor: usize,
}

impl SequenceSampler {
    /// Empty sequences fall back to 0.5.
    pub fn new(uvs: Vec<(f32, f32)>, randoms: Vec<f32>) -> Self {
        Self {
            uvs,
            randoms,
            uv_cursor: 0,
            random_cursor: 0,
        }
    }

    /// Always returns the same values.
    pub fn constant(u: f32, v: f32, random: f32) -> Self {
        Self::new(vec![(u, v)], vec![random])
    }
}

impl Sampler for SequenceSampler {
    fn next_uv(&mut self) -> (f32, f32) {
        if self.uvs.is_empty() {
            return (0.5, 0.5);
        }
        let uv = self.uvs[self.uv_cursor % self.uvs.len()];
        self.uv_cursor += 1;
        uv
    }

    fn random(&mut self) -> f32 {
        if self.randoms.is_empty() {
            return 0.5;
        }
        let r = self.randoms[self.random_cursor % self.randoms.len()];
        self.random_cursor += 1;
        r
    }

    fn create(&self, _index: u64) -> Self {
        Self::new(self.uvs.clone(), self.randoms.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_sampler_is_reproducible() {
        let base = RandomSampler::new(7);
        let mut a = base.create(3);
        let mut b = base.create(3);
        for _ in 0..16 {
            assert_eq!(a.random(), b.random());
            assert_eq!(a.next_uv(), b.next_uv());
        }
    }

    #[test]
    fn test_random_sampler_streams_differ() {
        let base = RandomSampler::new(7);
        let mut a = base.create(0);
        let mut b = base.create(1);
        let xs: Vec<f32> = (0..8).map(|_| a.random()).collect();
        let ys: Vec<f32> = (0..8).map(|_| b.random()).collect();
        assert_ne!(xs, ys);
        assert!(xs.iter().all(|x| (0.0..1.0).contains(x)));
    }

    #[test]
    fn test_stratified_covers_every_stratum() {
        let mut sampler = StratifiedSampler::new(11, 4).create(5);
        let mut seen = [false; 16];
        for _ in 0..16 {
            let (u, v) = sampler.next_uv();
            assert!((0.0..1.0).contains(&u) && (0.0..1.0).contains(&v));
            let cell = (v * 4.0) as usize * 4 + (u * 4.0) as usize;
            assert!(!seen[cell], "stratum {cell} drawn twice");
            seen[cell] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn test_sequence_sampler_cycles() {
        let mut sampler = SequenceSampler::new(vec![(0.1, 0.2), (0.3, 0.4)], vec![0.9]);
        assert_eq!(sampler.next_uv(), (0.1, 0.2));
        assert_eq!(sampler.next_uv(), (0.3, 0.4));
        assert_eq!(sampler.next_uv(), (0.1, 0.2));
        assert_eq!(sampler.random(), 0.9);
        assert_eq!(sampler.random(), 0.9);

        let mut fresh = sampler.create(42);
        assert_eq!(fresh.next_uv(), (0.1, 0.2));

        let mut empty = SequenceSampler::new(Vec::new(), Vec::new());
        assert_eq!(empty.next_uv(), (0.5, 0.5));
        assert_eq!(empty.random(), 0.5);
    }
}
