use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};

/// Uniform random numbers in `[0, 1)` plus the helpers the simulation draws
/// from them. Every random decision in the core goes through this trait so a
/// host can swap the source.
pub trait RandomSource {
    fn next_f32(&mut self) -> f32;

    fn bool(&mut self, probability: f32) -> bool {
        self.next_f32() < probability
    }

    fn int(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let span = (max - min + 1) as f32;
        let offset = (self.next_f32() * span).floor().min(span - 1.0);
        min + offset as i32
    }

    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }
}

/// Small deterministic generator (mulberry32) used by the simulator and tests.
#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }
}

impl RandomSource for Rng {
    fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        (out as f64 / 4_294_967_296.0) as f32
    }
}

/// OS-seeded source backing live sessions.
#[derive(Clone, Debug)]
pub struct EntropyRandom {
    inner: StdRng,
}

impl EntropyRandom {
    pub fn new() -> Self {
        Self {
            inner: StdRng::from_os_rng(),
        }
    }
}

impl Default for EntropyRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for EntropyRandom {
    fn next_f32(&mut self) -> f32 {
        self.inner.random::<f32>()
    }
}

/// Replays a fixed sequence of values, wrapping around at the end.
#[derive(Clone, Debug)]
pub struct ScriptedRandom {
    values: Vec<f32>,
    cursor: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values, cursor: 0 }
    }

    pub fn constant(value: f32) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for ScriptedRandom {
    fn next_f32(&mut self) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.cursor % self.values.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_repeats_sequence() {
        let mut a = Rng::new(77);
        let mut b = Rng::new(77);
        for _ in 0..64 {
            assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
        }
    }

    #[test]
    fn int_and_pick_index_stay_in_range_at_upper_edge() {
        let mut rng = ScriptedRandom::constant(1.0);
        assert_eq!(rng.int(1, 23), 23);
        assert_eq!(rng.pick_index(4), 3);
        assert!(!rng.bool(1.0));
    }

    #[test]
    fn scripted_values_wrap_around() {
        let mut rng = ScriptedRandom::new(vec![0.1, 0.9]);
        let drawn: Vec<f32> = (0..4).map(|_| rng.next_f32()).collect();
        assert_eq!(drawn, vec![0.1, 0.9, 0.1, 0.9]);
    }

    #[test]
    fn seeded_values_are_unit_interval() {
        let mut rng = Rng::new(9);
        for _ in 0..10_000 {
            let value = rng.next_f32();
            assert!((0.0..=1.0).contains(&value));
            let idx = rng.pick_index(7);
            assert!(idx < 7);
        }
    }

    #[test]
    fn entropy_source_draws_unit_interval() {
        let mut rng = EntropyRandom::new();
        for _ in 0..1_000 {
            let value = rng.next_f32();
            assert!((0.0..1.0).contains(&value));
        }
    }
}
