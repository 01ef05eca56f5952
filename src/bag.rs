//! 7-bag randomizer for piece generation
//!
//! All 7 pieces are shuffled, then dealt out before reshuffling. This
//! prevents long droughts. Each game owns its own seeded bag so a game
//! can be replayed from its seed.

use crate::tetromino::TetrominoType;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// The 7-bag piece randomizer
#[derive(Debug, Clone)]
pub struct Bag {
    rng: ChaCha8Rng,
    /// Preview queue for upcoming pieces
    queue: VecDeque<TetrominoType>,
}

impl Default for Bag {
    fn default() -> Self {
        Self::new()
    }
}

impl Bag {
    /// Create a bag with a random seed
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Create a bag with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        let mut bag = Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            queue: VecDeque::with_capacity(14),
        };
        bag.refill();
        bag
    }

    /// Get the next piece from the queue
    pub fn next(&mut self) -> TetrominoType {
        if self.queue.is_empty() {
            self.refill();
        }
        // Refilled above, never empty here
        self.queue.pop_front().unwrap_or(TetrominoType::I)
    }

    /// Refill the queue with a new shuffled bag
    fn refill(&mut self) {
        let mut new_bag = TetrominoType::all();
        new_bag.shuffle(&mut self.rng);
        self.queue.extend(new_bag);
    }
}
