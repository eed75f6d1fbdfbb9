/*!
Instant-runoff (ranked-choice) tabulation.

Every ballot ranks candidates from a fixed roster. In each round a ballot counts for its
most preferred candidate that is still running. A candidate wins once it holds at least
51% of all submitted ballots (whole percent, rounded down) or once it is the only one left.
Otherwise the weakest candidate is eliminated, ties for the lowest count being broken by an
injected [`TieBreaker`], and its ballots move on to their next running choice.

```
use instant_runoff::*;

let registry = CandidateRegistry::new(&["Anna", "Bob"])?;
let mut ballots = Vec::new();
for _ in 0..6 {
    ballots.push(Ballot::from_names(&registry, &["Anna", "Bob"])?);
}
for _ in 0..4 {
    ballots.push(Ballot::from_names(&registry, &["Bob"])?);
}
let result = run_voting_stats(registry, &ballots, &VoteRules::DEFAULT_RULES)?;
assert_eq!(result.winner.as_deref(), Some("Anna"));
assert_eq!(result.round_stats.len(), 1);
# Ok::<(), TallyError>(())
```
*/
mod ballot;
pub mod builder;
mod config;
mod election;
pub mod manual;
mod registry;
mod tiebreak;

use log::{debug, info};
use snafu::{ensure, OptionExt};

use std::{
    collections::{BTreeMap, BTreeSet},
    ops::AddAssign,
    sync::Arc,
};

pub use crate::ballot::*;
pub use crate::config::*;
pub use crate::election::*;
pub use crate::registry::*;
pub use crate::tiebreak::*;

// **** Private structures ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
    const ONE: VoteCount = VoteCount(1);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

// **** Public structures ****

/// The outcome of one counting round.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Tally {
    round: RoundId,
    // Invariant: the keys are exactly the running candidates of this round.
    counts: BTreeMap<CandidateId, VoteCount>,
    exhausted: VoteCount,
    total_ballots: VoteCount,
}

impl Tally {
    pub fn round(&self) -> RoundId {
        self.round
    }

    /// The votes of a running candidate. `None` if the candidate was not running.
    pub fn votes_for(&self, cid: CandidateId) -> Option<u64> {
        self.counts.get(&cid).map(|vc| vc.0)
    }

    /// The running candidates and their votes, in roster order.
    pub fn iter(&self) -> impl Iterator<Item = (CandidateId, u64)> + '_ {
        self.counts.iter().map(|(cid, vc)| (*cid, vc.0))
    }

    /// The ballots that counted for some candidate.
    pub fn counted(&self) -> u64 {
        self.counts.values().copied().sum::<VoteCount>().0
    }

    /// The ballots that did not count for anyone in this round.
    pub fn exhausted(&self) -> u64 {
        self.exhausted.0
    }

    /// All the ballots submitted to the election, counted or not.
    pub fn total_ballots(&self) -> u64 {
        self.total_ballots.0
    }

    /// The share of all submitted ballots, in whole percent rounded down.
    pub fn percentage(&self, cid: CandidateId) -> Option<u64> {
        self.counts
            .get(&cid)
            .map(|vc| percentage_of(*vc, self.total_ballots))
    }

    fn lowest(&self) -> Vec<CandidateId> {
        match self.counts.values().min() {
            Some(min_count) => self
                .counts
                .iter()
                .filter_map(|(cid, vc)| if vc == min_count { Some(*cid) } else { None })
                .collect(),
            None => Vec::new(),
        }
    }
}

fn percentage_of(votes: VoteCount, total: VoteCount) -> u64 {
    if total == VoteCount::EMPTY {
        0
    } else {
        (votes.0 * 100) / total.0
    }
}

/// What happened when a candidate was eliminated.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Elimination {
    /// The round whose tally designated the candidate.
    pub round: RoundId,
    pub candidate: CandidateId,
    /// The other candidates that had the same lowest count.
    pub tied_with: Vec<CandidateId>,
    /// Where the ballots of the eliminated candidate went in the recount.
    pub transfers: Vec<(CandidateId, u64)>,
    pub exhausted: u64,
}

/// Counting state of one election: the ballots, the running candidates, the last tally and
/// the winner, if one has been found.
#[derive(Debug, Clone)]
pub struct TallyEngine {
    registry: Arc<CandidateRegistry>,
    ballots: Vec<Ballot>,
    active: BTreeSet<CandidateId>,
    tally: Option<Tally>,
    // The candidate each ballot counted for in the last round, by ballot position.
    current: Vec<Option<CandidateId>>,
    winner: Option<CandidateId>,
    round: RoundId,
    winning_percentage: u32,
}

impl TallyEngine {
    /// Sets up an election where every registered candidate is running.
    ///
    /// Fails if there is no ballot or if a ballot references a candidate outside the roster.
    pub fn new(
        registry: Arc<CandidateRegistry>,
        ballots: Vec<Ballot>,
        rules: &VoteRules,
    ) -> Result<TallyEngine, TallyError> {
        rules.validate()?;
        ensure!(!ballots.is_empty(), NoBallotsSnafu {});
        for ballot in ballots.iter() {
            for cid in ballot.choices() {
                registry.check(*cid)?;
            }
        }
        let active: BTreeSet<CandidateId> = registry.ids().collect();
        Ok(TallyEngine {
            registry,
            ballots,
            active,
            tally: None,
            current: Vec::new(),
            winner: None,
            round: 0,
            winning_percentage: rules.winning_percentage,
        })
    }

    /// Counts every ballot for its most preferred running candidate, then looks for a winner.
    pub fn run_round(&mut self) -> Result<&Tally, TallyError> {
        ensure!(
            !self.active.is_empty(),
            DegenerateStateSnafu { round: self.round }
        );
        let round = self.round + 1;
        let mut counts: BTreeMap<CandidateId, VoteCount> = self
            .active
            .iter()
            .map(|cid| (*cid, VoteCount::EMPTY))
            .collect();
        let mut exhausted = VoteCount::EMPTY;
        let mut current: Vec<Option<CandidateId>> = Vec::with_capacity(self.ballots.len());
        for ballot in self.ballots.iter() {
            let choice = ballot.current_choice(&self.active);
            let slot = match choice {
                Some(cid) => counts.get_mut(&cid),
                None => None,
            };
            match slot {
                Some(vc) => *vc += VoteCount::ONE,
                None => exhausted += VoteCount::ONE,
            }
            current.push(choice);
        }

        let tally = Tally {
            round,
            counts,
            exhausted,
            total_ballots: VoteCount(self.ballots.len() as u64),
        };
        info!("Round {} (winning threshold: {}%)", round, self.winning_percentage);
        for (cid, count) in tally.iter() {
            info!("      {} {}", count, self.name_of(cid));
        }
        debug!("run_round: round {} exhausted: {:?}", round, exhausted);

        self.round = round;
        self.current = current;
        self.tally = Some(tally);
        self.check_for_winner()?;
        self.tally.as_ref().context(NoVotesCountedSnafu {})
    }

    /// Declares the winner of the last round, if there is one.
    ///
    /// A lone running candidate always wins. Otherwise the winner is the candidate with the
    /// highest percentage that reaches the winning percentage; on equal percentages the one
    /// listed first on the roster is kept.
    pub fn check_for_winner(&mut self) -> Result<Option<CandidateId>, TallyError> {
        let tally = self.tally.as_ref().context(NoVotesCountedSnafu {})?;
        let winner = if self.active.len() == 1 {
            self.active.iter().next().copied()
        } else {
            let threshold = self.winning_percentage as u64;
            let mut best: Option<(CandidateId, u64)> = None;
            for (&cid, &count) in tally.counts.iter() {
                let pct = percentage_of(count, tally.total_ballots);
                if pct >= threshold && best.map_or(true, |(_, best_pct)| pct > best_pct) {
                    best = Some((cid, pct));
                }
            }
            best.map(|(cid, _)| cid)
        };
        if let Some(cid) = winner {
            if self.winner != winner {
                info!("      {} -> elected", self.name_of(cid));
            }
        }
        self.winner = winner;
        Ok(winner)
    }

    /// Eliminates one of the candidates with the lowest count and counts the ballots again.
    ///
    /// When several candidates share the lowest count, exactly one of them is removed, as
    /// chosen by `tie_breaker`.
    pub fn eliminate_weakest(
        &mut self,
        tie_breaker: &mut dyn TieBreaker,
    ) -> Result<Elimination, TallyError> {
        let tally = self.tally.as_ref().context(NoVotesCountedSnafu {})?;
        ensure!(self.winner.is_none(), AlreadyDecidedSnafu {});
        ensure!(self.active.len() > 1, NothingToEliminateSnafu {});
        let from_round = tally.round();

        let lowest = tally.lowest();
        debug!("eliminate_weakest: lowest: {:?}", lowest);
        let eliminated = match lowest.as_slice() {
            [single] => *single,
            _ => {
                let tied: Vec<&Candidate> = lowest
                    .iter()
                    .map(|cid| self.registry.check(*cid))
                    .collect::<Result<_, _>>()?;
                let idx = tie_breaker.choose(&tied, from_round);
                let picked = *lowest.get(idx).context(InvalidTieBreakSnafu {
                    index: idx,
                    tied: lowest.len(),
                })?;
                debug!(
                    "eliminate_weakest: tiebreak between {:?} picked {:?}",
                    lowest, picked
                );
                picked
            }
        };
        info!("      {} -> eliminated", self.name_of(eliminated));

        let previous = std::mem::take(&mut self.current);
        self.active.remove(&eliminated);
        self.run_round()?;

        let mut transfers: BTreeMap<CandidateId, VoteCount> = BTreeMap::new();
        let mut exhausted = VoteCount::EMPTY;
        for (before, after) in previous.iter().zip(self.current.iter()) {
            if *before != Some(eliminated) {
                continue;
            }
            match after {
                Some(cid) => *transfers.entry(*cid).or_insert(VoteCount::EMPTY) += VoteCount::ONE,
                None => exhausted += VoteCount::ONE,
            }
        }
        debug!(
            "eliminate_weakest: transfers: {:?} exhausted: {:?}",
            transfers, exhausted
        );

        Ok(Elimination {
            round: from_round,
            candidate: eliminated,
            tied_with: lowest.into_iter().filter(|cid| *cid != eliminated).collect(),
            transfers: transfers.into_iter().map(|(cid, vc)| (cid, vc.0)).collect(),
            exhausted: exhausted.0,
        })
    }

    /// The last tally.
    pub fn tally(&self) -> Result<&Tally, TallyError> {
        self.tally.as_ref().context(NoVotesCountedSnafu {})
    }

    pub fn winner(&self) -> Result<Option<CandidateId>, TallyError> {
        self.tally()?;
        Ok(self.winner)
    }

    /// The votes of a running candidate in the last round.
    pub fn votes_for(&self, cid: CandidateId) -> Result<u64, TallyError> {
        let tally = self.tally()?;
        let candidate = self.registry.check(cid)?;
        tally.votes_for(cid).context(NotActiveSnafu {
            name: candidate.name(),
        })
    }

    pub fn active(&self) -> &BTreeSet<CandidateId> {
        &self.active
    }

    pub fn is_active(&self, cid: CandidateId) -> bool {
        self.active.contains(&cid)
    }

    /// The running candidates, in roster order.
    pub fn active_candidates(&self) -> Vec<&Candidate> {
        self.active
            .iter()
            .filter_map(|cid| self.registry.get(*cid))
            .collect()
    }

    /// The number of rounds counted so far.
    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    pub fn total_ballots(&self) -> u64 {
        self.ballots.len() as u64
    }

    pub fn registry(&self) -> &CandidateRegistry {
        &self.registry
    }

    fn name_of(&self, cid: CandidateId) -> &str {
        self.registry.get(cid).map(|c| c.name()).unwrap_or("<unknown>")
    }
}

/// Runs a complete election with the given rules for the given ballots.
///
/// Arguments:
/// * `registry` the registered candidates for this election
/// * `ballots` the sealed ballots to count
/// * `rules` the rules that govern this election
pub fn run_voting_stats(
    registry: CandidateRegistry,
    ballots: &[Ballot],
    rules: &VoteRules,
) -> Result<VotingResult, TallyError> {
    let mut election = Election::new(registry, rules)?;
    for ballot in ballots.iter() {
        election.add_ballot(ballot.clone())?;
    }
    election.run()
}
