// ********* Input data structures ***********

use snafu::{ensure, Snafu};

use crate::tiebreak::{CandidateOrder, HashedPermutation, TieBreaker, UniformRandom};

/// The stable identifier of a candidate: its position in the roster.
///
/// Identifiers are assigned by the [`crate::CandidateRegistry`] in roster order, so
/// ordering identifiers is the same as ordering candidates by their place on the roster.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub struct CandidateId(pub(crate) u32);

impl CandidateId {
    /// The zero-based position of this candidate in the roster.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

/// A registered candidate. The name is the identity of the candidate.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Candidate {
    pub(crate) id: CandidateId,
    pub(crate) name: String,
}

impl Candidate {
    pub fn id(&self) -> CandidateId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub type RoundId = u32;

// ******** Output data structures *********

/// Where the ballots of an eliminated candidate went in the following round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EliminationStats {
    pub name: String,
    /// The other candidates that shared the lowest count, if a tiebreak was needed.
    pub tied_with: Vec<String>,
    pub transfers: Vec<(String, u64)>,
    pub exhausted: u64,
}

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundStats {
    pub round: RoundId,
    /// The vote count of every candidate still running, in roster order.
    pub tally: Vec<(String, u64)>,
    /// Ballots that did not count for anyone in this round.
    pub exhausted: u64,
    pub elected: Option<String>,
    pub eliminated: Option<EliminationStats>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VotingResult {
    pub winner: Option<String>,
    pub winning_percentage: u32,
    pub total_ballots: u64,
    pub round_stats: Vec<RoundStats>,
}

impl VotingResult {
    /// The tally of the last round that was counted.
    pub fn final_tally(&self) -> Option<&[(String, u64)]> {
        self.round_stats.last().map(|rs| rs.tally.as_slice())
    }
}

/// Errors that prevent the algorithm from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TallyError {
    #[snafu(display("the candidate roster is empty"))]
    EmptyRegistry {},

    #[snafu(display("candidate {name:?} is registered more than once"))]
    DuplicateCandidateName { name: String },

    #[snafu(display("no candidate is named {name:?}"))]
    NotFound { name: String },

    #[snafu(display("candidate id {id} is not part of the roster"))]
    UnknownCandidateId { id: u32 },

    #[snafu(display("the ballot has {len} choices, there is no choice at index {index}"))]
    NoChoiceAtRank { index: usize, len: usize },

    #[snafu(display("candidate {name:?} appears more than once on the ballot"))]
    DuplicateChoice { name: String },

    #[snafu(display("no ballots were submitted"))]
    NoBallots {},

    #[snafu(display("ballots cannot be added once counting has started"))]
    CountingStarted {},

    #[snafu(display("no votes counted yet"))]
    NoVotesCounted {},

    #[snafu(display("candidate {name:?} is no longer running"))]
    NotActive { name: String },

    #[snafu(display("a winner is already declared, no candidate can be eliminated"))]
    AlreadyDecided {},

    #[snafu(display("a single candidate remains, no candidate can be eliminated"))]
    NothingToEliminate {},

    #[snafu(display("the tiebreak picked position {index} among {tied} tied candidates"))]
    InvalidTieBreak { index: usize, tied: usize },

    #[snafu(display("the election does not have a winner yet"))]
    NoWinner {},

    #[snafu(display("all the candidates were eliminated without a winner (round {round})"))]
    DegenerateState { round: RoundId },

    #[snafu(display("invalid voting rules: {message}"))]
    InvalidRules { message: String },
}

// ********* Configuration **********

/// How to pick the candidate to eliminate when several share the lowest count.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Uniformly random, seeded from the operating system.
    Random,
    /// Uniformly random, from a fixed seed. Reruns eliminate the same candidates.
    RandomSeeded(u64),
    /// Hash-based permutation of the tied candidate names. Unlike the seeded
    /// mode, it does not depend on the random number generator implementation.
    Hashed(u32),
    /// Eliminates the tied candidate that comes first in the roster.
    UseCandidateOrder,
}

impl TieBreakMode {
    pub fn tie_breaker(&self) -> Box<dyn TieBreaker> {
        match *self {
            TieBreakMode::Random => Box::new(UniformRandom::from_entropy()),
            TieBreakMode::RandomSeeded(seed) => Box::new(UniformRandom::seeded(seed)),
            TieBreakMode::Hashed(seed) => Box::new(HashedPermutation::new(seed)),
            TieBreakMode::UseCandidateOrder => Box::new(CandidateOrder),
        }
    }
}

/// What to do with a ballot that ranks the same candidate more than once.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DuplicateCandidateMode {
    /// Accept the ballot. Only the first occurrence can ever receive the vote.
    SkipDuplicate,
    /// Refuse the ballot when it is added to the election.
    Reject,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VoteRules {
    pub tiebreak_mode: TieBreakMode,
    /// The share of all submitted ballots, in whole percent (rounded down),
    /// that a candidate needs to win before a single candidate remains.
    pub winning_percentage: u32,
    pub duplicate_candidate_mode: DuplicateCandidateMode,
}

impl VoteRules {
    pub const MAJORITY_PERCENTAGE: u32 = 51;

    pub const DEFAULT_RULES: VoteRules = VoteRules {
        tiebreak_mode: TieBreakMode::Random,
        winning_percentage: VoteRules::MAJORITY_PERCENTAGE,
        duplicate_candidate_mode: DuplicateCandidateMode::SkipDuplicate,
    };

    pub fn validate(&self) -> Result<(), TallyError> {
        ensure!(
            (1..=100).contains(&self.winning_percentage),
            InvalidRulesSnafu {
                message: format!(
                    "winning percentage must be between 1 and 100, got {}",
                    self.winning_percentage
                ),
            }
        );
        Ok(())
    }
}

impl Default for VoteRules {
    fn default() -> Self {
        VoteRules::DEFAULT_RULES
    }
}
