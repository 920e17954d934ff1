// src/chance.rs
use rand::Rng;

/// Source of the per-request draws the assistant makes.
pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0, 1)`.
    fn draw(&self) -> f64;

    /// Uniform index in `0..len`. `len` is never zero.
    fn pick(&self, len: usize) -> usize;
}

pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn draw(&self) -> f64 {
        rand::thread_rng().gen::<f64>()
    }

    fn pick(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Always returns the same draw and index (clamped to the range).
pub struct FixedRandom {
    pub draw: f64,
    pub index: usize,
}

impl FixedRandom {
    pub fn new(draw: f64) -> Self {
        FixedRandom { draw, index: 0 }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }
}

impl RandomSource for FixedRandom {
    fn draw(&self) -> f64 {
        self.draw
    }

    fn pick(&self, len: usize) -> usize {
        self.index.min(len.saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_range() {
        let random = ThreadRandom;
        for _ in 0..1000 {
            let d = random.draw();
            assert!((0.0..1.0).contains(&d));
            assert!(random.pick(3) < 3);
        }
    }

    #[test]
    fn fixed_random_clamps_index() {
        let random = FixedRandom::new(0.05).with_index(7);
        assert_eq!(random.draw(), 0.05);
        assert_eq!(random.pick(3), 2);
        assert_eq!(random.pick(10), 7);
    }
}
