//! 7-bag randomizer: every run of seven pieces holds each tetromino exactly once.

use crate::piece::TetrominoKind;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

/// Most pieces the Next preview may show.
pub const MAX_PREVIEW: usize = TetrominoKind::ALL.len();

#[derive(Debug, Clone)]
pub struct Bag {
    queue: VecDeque<TetrominoKind>,
    rng: StdRng,
}

impl Bag {
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Deterministic sequence for a given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        let mut b = Self {
            queue: VecDeque::with_capacity(2 * MAX_PREVIEW),
            rng,
        };
        b.refill();
        b
    }

    fn shuffled(&mut self) -> [TetrominoKind; 7] {
        let mut all = TetrominoKind::ALL;
        all.shuffle(&mut self.rng);
        all
    }

    fn refill(&mut self) {
        let all = self.shuffled();
        self.queue.extend(all);
    }

    /// Take the next piece. At least `MAX_PREVIEW` pieces stay queued afterwards.
    pub fn next(&mut self) -> TetrominoKind {
        let kind = match self.queue.pop_front() {
            Some(kind) => kind,
            None => {
                let [first, rest @ ..] = self.shuffled();
                self.queue.extend(rest);
                first
            }
        };
        if self.queue.len() < MAX_PREVIEW {
            self.refill();
        }
        kind
    }

    /// Upcoming pieces without consuming them (at most `MAX_PREVIEW`).
    pub fn peek(&self, n: usize) -> impl Iterator<Item = TetrominoKind> + '_ {
        self.queue.iter().copied().take(n.min(MAX_PREVIEW))
    }
}

impl Default for Bag {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_each_bag_holds_all_seven() {
        let mut bag = Bag::with_seed(7);
        for _ in 0..10 {
            let drawn: HashSet<_> = (0..7).map(|_| bag.next()).collect();
            assert_eq!(drawn.len(), 7);
        }
    }

    #[test]
    fn test_peek_matches_next() {
        let mut bag = Bag::with_seed(42);
        bag.next();
        bag.next();
        let preview: Vec<_> = bag.peek(3).collect();
        let drawn: Vec<_> = (0..3).map(|_| bag.next()).collect();
        assert_eq!(preview, drawn);
    }

    #[test]
    fn test_peek_always_has_a_full_preview() {
        let mut bag = Bag::with_seed(1);
        for _ in 0..30 {
            assert_eq!(bag.peek(MAX_PREVIEW).count(), MAX_PREVIEW);
            bag.next();
        }
        assert_eq!(bag.peek(100).count(), MAX_PREVIEW);
    }

    #[test]
    fn test_empty_queue_deals_a_fresh_bag() {
        let mut bag = Bag::with_seed(3);
        bag.queue.clear();
        let drawn: HashSet<_> = (0..7).map(|_| bag.next()).collect();
        assert_eq!(drawn.len(), 7);
        assert_eq!(bag.peek(MAX_PREVIEW).count(), MAX_PREVIEW);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let mut a = Bag::with_seed(99);
        let mut b = Bag::with_seed(99);
        for _ in 0..21 {
            assert_eq!(a.next(), b.next());
        }
    }
}
