//! The source of randomness behind every die.

use rand::Rng;

/// An injectable uniform-integer source. The engine asks for one face at a
/// time; implementations must return a value in `[1, size]`.
pub trait DieRoller {
    fn roll_die(&mut self, size: u64) -> u64;
}

impl<T: DieRoller + ?Sized> DieRoller for &mut T {
    fn roll_die(&mut self, size: u64) -> u64 {
        (**self).roll_die(size)
    }
}

/// The default source, backed by the thread-local RNG.
#[derive(Debug, Clone, Default)]
pub struct DefaultRng(rand::rngs::ThreadRng);

impl DieRoller for DefaultRng {
    fn roll_die(&mut self, size: u64) -> u64 {
        self.0.gen_range(1..=size)
    }
}

/// Adapts any [`rand::Rng`] (e.g. a seeded PCG) into a [`DieRoller`].
#[derive(Debug, Clone)]
pub struct RandRoller<R>(pub R);

impl<R: Rng> DieRoller for RandRoller<R> {
    fn roll_die(&mut self, size: u64) -> u64 {
        self.0.gen_range(1..=size)
    }
}

/// Replays a fixed sequence of faces, cycling when it runs out. Intended for
/// deterministic tests; the caller is responsible for queueing faces that are
/// valid for the dice being rolled.
///
/// # Panics
///
/// Panics if asked for a face with an empty queue.
#[derive(Debug, Clone)]
pub struct FixedRoller {
    faces: Vec<u64>,
    next: usize,
}

impl FixedRoller {
    pub fn new(faces: Vec<u64>) -> Self {
        Self { faces, next: 0 }
    }
}

impl DieRoller for FixedRoller {
    fn roll_die(&mut self, _size: u64) -> u64 {
        assert!(!self.faces.is_empty(), "FixedRoller has no faces queued");
        let face = self.faces[self.next % self.faces.len()];
        self.next += 1;
        face
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_roller_cycles() {
        let mut roller = FixedRoller::new(vec![3, 1]);
        assert_eq!(roller.roll_die(6), 3);
        assert_eq!(roller.roll_die(6), 1);
        assert_eq!(roller.roll_die(6), 3);
    }

    #[test]
    fn test_default_rng_in_range() {
        let mut rng = DefaultRng::default();
        for _ in 0..100 {
            let face = rng.roll_die(6);
            assert!((1..=6).contains(&face));
        }
    }
}
