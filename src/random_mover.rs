use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::movegen::Move;

const PROMOTION_LETTERS: [char; 4] = ['Q', 'R', 'B', 'N'];

/// Placeholder opponent: picks uniformly among the legal moves it is given.
pub struct RandomMover {
    rng: StdRng,
}

impl RandomMover {
    /// A fixed seed makes the sequence of choices reproducible.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn choose_move(&mut self, moves: &[Move]) -> Option<Move> {
        moves.choose(&mut self.rng).copied()
    }

    pub fn choose_promotion(&mut self) -> char {
        PROMOTION_LETTERS[self.rng.gen_range(0..PROMOTION_LETTERS.len())]
    }
}
