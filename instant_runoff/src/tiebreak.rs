use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::{Candidate, RoundId};

/// Picks which of the candidates tied for the lowest count gets eliminated.
///
/// `tied` always holds at least two candidates, in roster order. The returned value is a
/// position in `tied`; the engine refuses positions that are out of range.
pub trait TieBreaker {
    fn choose(&mut self, tied: &[&Candidate], round: RoundId) -> usize;
}

impl<F> TieBreaker for F
where
    F: FnMut(&[&Candidate], RoundId) -> usize,
{
    fn choose(&mut self, tied: &[&Candidate], round: RoundId) -> usize {
        (*self)(tied, round)
    }
}

/// Uniform choice among the tied candidates.
pub struct UniformRandom<R> {
    rng: R,
}

impl UniformRandom<StdRng> {
    pub fn from_entropy() -> UniformRandom<StdRng> {
        UniformRandom::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> UniformRandom<StdRng> {
        UniformRandom::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> UniformRandom<R> {
    pub fn new(rng: R) -> UniformRandom<R> {
        UniformRandom { rng }
    }
}

impl<R: Rng> TieBreaker for UniformRandom<R> {
    fn choose(&mut self, tied: &[&Candidate], _round: RoundId) -> usize {
        if tied.len() <= 1 {
            return 0;
        }
        self.rng.gen_range(0..tied.len())
    }
}

/// Always eliminates the tied candidate listed first on the roster.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Default)]
pub struct CandidateOrder;

impl TieBreaker for CandidateOrder {
    fn choose(&mut self, _tied: &[&Candidate], _round: RoundId) -> usize {
        0
    }
}

/// Orders the tied candidates by a cryptographic hash of the seed, the round and their
/// names, and eliminates the first one.
///
/// The order is hard to guess in advance but is identical on every platform.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct HashedPermutation {
    seed: u32,
}

impl HashedPermutation {
    pub fn new(seed: u32) -> HashedPermutation {
        HashedPermutation { seed }
    }

    fn key(&self, round: RoundId, name: &str) -> String {
        sha256::digest(format!("{:08}{:08}{}", self.seed, round, name).as_str())
    }
}

impl TieBreaker for HashedPermutation {
    fn choose(&mut self, tied: &[&Candidate], round: RoundId) -> usize {
        let picked = tied
            .iter()
            .enumerate()
            .min_by_key(|(_, c)| self.key(round, c.name()))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        debug!(
            "HashedPermutation::choose: round {} picked {:?} among {:?}",
            round,
            tied.get(picked).map(|c| c.name()),
            tied.iter().map(|c| c.name()).collect::<Vec<_>>()
        );
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CandidateRegistry;

    fn tied() -> CandidateRegistry {
        CandidateRegistry::new(&["Alicia", "George", "Robert"]).unwrap()
    }

    #[test]
    fn seeded_random_is_reproducible() {
        let reg = tied();
        let cands: Vec<&Candidate> = reg.all().iter().collect();
        let picks = |seed: u64| -> Vec<usize> {
            let mut tb = UniformRandom::seeded(seed);
            (1..=20).map(|round| tb.choose(&cands, round)).collect()
        };
        assert_eq!(picks(42), picks(42));
        assert!(picks(42).iter().all(|idx| *idx < cands.len()));
    }

    #[test]
    fn random_choice_covers_every_tied_candidate() {
        let reg = tied();
        let cands: Vec<&Candidate> = reg.all().iter().collect();
        let mut tb = UniformRandom::seeded(7);
        let mut seen = [false; 3];
        for round in 0..200 {
            seen[tb.choose(&cands, round)] = true;
        }
        assert_eq!(seen, [true, true, true]);
    }

    #[test]
    fn candidate_order_picks_first() {
        let reg = tied();
        let cands: Vec<&Candidate> = reg.all().iter().collect();
        assert_eq!(CandidateOrder.choose(&cands, 3), 0);
    }

    #[test]
    fn hashed_permutation_is_stable() {
        let reg = tied();
        let cands: Vec<&Candidate> = reg.all().iter().collect();
        let mut a = HashedPermutation::new(12);
        let mut b = HashedPermutation::new(12);
        for round in 1..10 {
            let idx = a.choose(&cands, round);
            assert!(idx < cands.len());
            assert_eq!(idx, b.choose(&cands, round));
        }
        // The choice does not depend on the order the candidates are presented in.
        let reversed: Vec<&Candidate> = cands.iter().rev().cloned().collect();
        let idx = a.choose(&cands, 4);
        let ridx = a.choose(&reversed, 4);
        assert_eq!(cands[idx].name(), reversed[ridx].name());
    }

    #[test]
    fn closures_are_tie_breakers() {
        let reg = tied();
        let cands: Vec<&Candidate> = reg.all().iter().collect();
        let mut last = |tied: &[&Candidate], _round: RoundId| tied.len() - 1;
        assert_eq!(last.choose(&cands, 1), 2);
    }
}
