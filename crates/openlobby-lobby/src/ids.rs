//! Sources of candidate lobby IDs.

use rand::Rng;

/// Produces candidate lobby IDs.
///
/// Candidates may repeat; the store rejects any that are already taken.
pub trait IdSource: Send {
    /// Draws the next candidate.
    fn next_id(&mut self) -> u64;
}

/// Uniform random 64-bit IDs from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdSource for RandomIds {
    fn next_id(&mut self) -> u64 {
        rand::rng().random()
    }
}
