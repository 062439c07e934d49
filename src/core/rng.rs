//! Seedable PCG32 random number generator. The optimizer draws its
//! random node samples from it, the tests use it to generate
//! reproducible meshes and rays.

use hexf::*;

// pbrt
use crate::core::pbrt::Float;

pub const FLOAT_ONE_MINUS_EPSILON: Float = hexf32!("0x1.fffffep-1");
pub const PCG32_DEFAULT_STATE: u64 = 0x853c_49e6_748f_ea9b;
pub const PCG32_DEFAULT_STREAM: u64 = 0xda3e_39cb_94b9_5bdb;
pub const PCG32_MULT: u64 = 0x5851_f42d_4c95_7f2d;

#[derive(Debug, Copy, Clone)]
pub struct Rng {
    state: u64,
    inc: u64,
}

impl Default for Rng {
    fn default() -> Self {
        Rng {
            state: PCG32_DEFAULT_STATE,
            inc: PCG32_DEFAULT_STREAM,
        }
    }
}

impl Rng {
    /// A generator positioned on the stream selected by *seed*.
    pub fn new(seed: u64) -> Self {
        let mut rng: Rng = Rng::default();
        rng.set_sequence(seed);
        rng
    }
    pub fn set_sequence(&mut self, initseq: u64) {
        self.state = 0_u64;
        self.inc = initseq.wrapping_shl(1) | 1;
        self.uniform_uint32();
        self.state = self.state.wrapping_add(PCG32_DEFAULT_STATE);
        self.uniform_uint32();
    }
    pub fn uniform_uint32(&mut self) -> u32 {
        let oldstate: u64 = self.state;
        self.state = oldstate.wrapping_mul(PCG32_MULT).wrapping_add(self.inc);
        let xorshifted: u32 = (oldstate.wrapping_shr(18) ^ oldstate).wrapping_shr(27) as u32;
        let rot: u32 = oldstate.wrapping_shr(59) as u32;
        xorshifted.rotate_right(rot)
    }
    /// Uniform integer in `[0, b)` without modulo bias.
    pub fn uniform_uint32_bounded(&mut self, b: u32) -> u32 {
        assert!(b > 0, "empty range");
        let threshold: u32 = b.wrapping_neg() % b;
        loop {
            let r: u32 = self.uniform_uint32();
            if r >= threshold {
                return r % b;
            }
        }
    }
    pub fn uniform_float(&mut self) -> Float {
        (self.uniform_uint32() as Float * hexf32!("0x1.0p-32") as Float)
            .min(FLOAT_ONE_MINUS_EPSILON)
    }
    /// Uniform float in `[lo, hi)`.
    pub fn uniform_range(&mut self, lo: Float, hi: Float) -> Float {
        lo + (hi - lo) * self.uniform_float()
    }
    /// Fisher-Yates shuffle of *values*.
    pub fn shuffle<T>(&mut self, values: &mut [T]) {
        let n: usize = values.len();
        for i in (1..n).rev() {
            let j: usize = self.uniform_uint32_bounded((i + 1) as u32) as usize;
            values.swap(i, j);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::new(7);
        let mut b = Rng::new(7);
        for _ in 0..100 {
            assert_eq!(a.uniform_uint32(), b.uniform_uint32());
        }
        let mut c = Rng::new(8);
        let differs = (0..100).any(|_| a.uniform_uint32() != c.uniform_uint32());
        assert!(differs);
    }

    #[test]
    fn bounded_values_stay_in_range() {
        let mut rng = Rng::new(1);
        for b in 1..50_u32 {
            assert!(rng.uniform_uint32_bounded(b) < b);
        }
        for _ in 0..1000 {
            let f = rng.uniform_float();
            assert!((0.0..1.0).contains(&f));
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = Rng::new(3);
        let mut values: Vec<usize> = (0..64).collect();
        rng.shuffle(&mut values);
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..64).collect::<Vec<usize>>());
    }
}
