use std::sync::Arc;

use log::{debug, info, warn};
use snafu::{ensure, OptionExt};

use crate::config::*;
use crate::registry::CandidateRegistry;
use crate::tiebreak::TieBreaker;
use crate::{Ballot, Elimination, Tally, TallyEngine};

/// Drives one election: it collects ballots, starts the count, redistributes the votes
/// of eliminated candidates and keeps the statistics of every round.
///
/// ```
/// use instant_runoff::*;
///
/// let registry = CandidateRegistry::new(&["Anna", "Bob", "Clara"])?;
/// let mut election = Election::new(registry, &VoteRules::DEFAULT_RULES)?;
/// let votes: [&[&str]; 5] = [&["Anna"], &["Bob", "Anna"], &["Bob"], &["Clara", "Anna"], &["Anna", "Clara"]];
/// for names in votes.iter() {
///     let ballot = Ballot::from_names(election.registry(), names)?;
///     election.add_ballot(ballot)?;
/// }
/// assert!(election.can_start_counting());
/// election.start_counting()?;
/// assert!(!election.has_winner());
/// election.redistribute()?;
/// assert_eq!(election.winner()?.name(), "Anna");
/// # Ok::<(), TallyError>(())
/// ```
pub struct Election {
    registry: Arc<CandidateRegistry>,
    rules: VoteRules,
    ballots: Vec<Ballot>,
    tie_breaker: Box<dyn TieBreaker>,
    injected_tie_breaker: bool,
    engine: Option<TallyEngine>,
    history: Vec<RoundStats>,
}

impl Election {
    /// An election with no ballots. The tie breaker follows the rules.
    pub fn new(registry: CandidateRegistry, rules: &VoteRules) -> Result<Election, TallyError> {
        rules.validate()?;
        Ok(Election {
            registry: Arc::new(registry),
            rules: rules.clone(),
            ballots: Vec::new(),
            tie_breaker: rules.tiebreak_mode.tie_breaker(),
            injected_tie_breaker: false,
            engine: None,
            history: Vec::new(),
        })
    }

    /// Replaces the tie breaker derived from the rules.
    ///
    /// The tie breaker derived from the rules is rebuilt every time the count starts over.
    /// An injected one is not: its state carries over `reset` and `start_counting`.
    pub fn with_tie_breaker<T: TieBreaker + 'static>(self, tie_breaker: T) -> Election {
        Election {
            tie_breaker: Box::new(tie_breaker),
            injected_tie_breaker: true,
            ..self
        }
    }

    pub fn registry(&self) -> &CandidateRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &VoteRules {
        &self.rules
    }

    pub fn lookup(&self, name: &str) -> Result<&Candidate, TallyError> {
        let cid = self.registry.lookup_by_name(name)?;
        self.registry.check(cid)
    }

    /// Adds a sealed ballot. Ballots can only be added before counting starts.
    pub fn add_ballot(&mut self, ballot: Ballot) -> Result<(), TallyError> {
        ensure!(self.engine.is_none(), CountingStartedSnafu {});
        for cid in ballot.choices() {
            self.registry.check(*cid)?;
        }
        if let Some(cid) = ballot.duplicate_choice() {
            let name = self.registry.check(cid)?.name();
            match self.rules.duplicate_candidate_mode {
                DuplicateCandidateMode::SkipDuplicate => {
                    debug!("add_ballot: {:?} is ranked more than once", name);
                }
                DuplicateCandidateMode::Reject => {
                    warn!("add_ballot: rejecting ballot {:?}: duplicate {:?}", ballot, name);
                    return DuplicateChoiceSnafu { name }.fail();
                }
            }
        }
        self.ballots.push(ballot);
        Ok(())
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    /// True if the name is a candidate that is still running.
    pub fn is_valid_candidate(&self, name: &str) -> bool {
        match self.registry.lookup_by_name(name) {
            Ok(cid) => match &self.engine {
                Some(engine) => engine.is_active(cid),
                None => true,
            },
            Err(_) => false,
        }
    }

    /// The running candidates, in roster order.
    pub fn remaining_candidates(&self) -> Vec<&Candidate> {
        match &self.engine {
            Some(engine) => engine.active_candidates(),
            None => self.registry.all().iter().collect(),
        }
    }

    pub fn can_start_counting(&self) -> bool {
        !self.ballots.is_empty()
    }

    pub fn has_started(&self) -> bool {
        self.engine.is_some()
    }

    /// Counts the first round. Every candidate of the roster is running again, so calling
    /// it a second time starts the count over.
    pub fn start_counting(&mut self) -> Result<&Tally, TallyError> {
        ensure!(self.can_start_counting(), NoBallotsSnafu {});
        info!(
            "Counting {} ballots for {} candidates",
            self.ballots.len(),
            self.registry.len()
        );
        let mut engine = TallyEngine::new(self.registry.clone(), self.ballots.clone(), &self.rules)?;
        engine.run_round()?;
        self.restart_tie_breaker();
        self.history = vec![round_stats(&engine)?];
        let engine = self.engine.insert(engine);
        engine.tally()
    }

    /// Eliminates the weakest candidate and recounts.
    pub fn redistribute(&mut self) -> Result<Elimination, TallyError> {
        let engine = self.engine.as_mut().context(NoVotesCountedSnafu {})?;
        let elimination = engine.eliminate_weakest(self.tie_breaker.as_mut())?;
        let stats = elimination_stats(&self.registry, &elimination)?;
        if let Some(last) = self.history.last_mut() {
            last.eliminated = Some(stats);
        }
        self.history.push(round_stats(engine)?);
        Ok(elimination)
    }

    pub fn has_winner(&self) -> bool {
        matches!(
            self.engine.as_ref().map(|engine| engine.winner()),
            Some(Ok(Some(_)))
        )
    }

    pub fn winner(&self) -> Result<&Candidate, TallyError> {
        let engine = self.engine.as_ref().context(NoVotesCountedSnafu {})?;
        let cid = engine.winner()?.context(NoWinnerSnafu {})?;
        self.registry.check(cid)
    }

    /// The votes of a running candidate in the current round.
    pub fn votes_for(&self, name: &str) -> Result<u64, TallyError> {
        let engine = self.engine.as_ref().context(NoVotesCountedSnafu {})?;
        let cid = self.registry.lookup_by_name(name)?;
        engine.votes_for(cid)
    }

    pub fn current_tally(&self) -> Result<&Tally, TallyError> {
        let engine = self.engine.as_ref().context(NoVotesCountedSnafu {})?;
        engine.tally()
    }

    /// Drops the count: every candidate is running again and ballots can be added again.
    pub fn reset(&mut self) {
        debug!("reset: keeping {} ballots", self.ballots.len());
        self.engine = None;
        self.history.clear();
        self.restart_tie_breaker();
    }

    fn restart_tie_breaker(&mut self) {
        if !self.injected_tie_breaker {
            self.tie_breaker = self.rules.tiebreak_mode.tie_breaker();
        }
    }

    /// Counts rounds until a winner is found.
    pub fn run(&mut self) -> Result<VotingResult, TallyError> {
        if !self.has_started() {
            self.start_counting()?;
        }
        loop {
            let engine = self.engine.as_ref().context(NoVotesCountedSnafu {})?;
            if engine.winner()?.is_some() {
                break;
            }
            ensure!(
                engine.active().len() > 1,
                DegenerateStateSnafu {
                    round: engine.round()
                }
            );
            self.redistribute()?;
        }
        self.result()
    }

    /// The statistics of all the rounds counted so far.
    pub fn result(&self) -> Result<VotingResult, TallyError> {
        let engine = self.engine.as_ref().context(NoVotesCountedSnafu {})?;
        let winner = match engine.winner()? {
            Some(cid) => Some(self.registry.check(cid)?.name().to_string()),
            None => None,
        };
        Ok(VotingResult {
            winner,
            winning_percentage: self.rules.winning_percentage,
            total_ballots: engine.total_ballots(),
            round_stats: self.history.clone(),
        })
    }
}

fn round_stats(engine: &TallyEngine) -> Result<RoundStats, TallyError> {
    let tally = engine.tally()?;
    let registry = engine.registry();
    let named: Vec<(String, u64)> = tally
        .iter()
        .map(|(cid, count)| Ok((registry.check(cid)?.name().to_string(), count)))
        .collect::<Result<_, TallyError>>()?;
    let elected = match engine.winner()? {
        Some(cid) => Some(registry.check(cid)?.name().to_string()),
        None => None,
    };
    Ok(RoundStats {
        round: tally.round(),
        tally: named,
        exhausted: tally.exhausted(),
        elected,
        eliminated: None,
    })
}

fn elimination_stats(
    registry: &CandidateRegistry,
    elimination: &Elimination,
) -> Result<EliminationStats, TallyError> {
    let name_of = |cid: CandidateId| -> Result<String, TallyError> {
        Ok(registry.check(cid)?.name().to_string())
    };
    Ok(EliminationStats {
        name: name_of(elimination.candidate)?,
        tied_with: elimination
            .tied_with
            .iter()
            .map(|cid| name_of(*cid))
            .collect::<Result<_, _>>()?,
        transfers: elimination
            .transfers
            .iter()
            .map(|(cid, count)| Ok((name_of(*cid)?, *count)))
            .collect::<Result<_, TallyError>>()?,
        exhausted: elimination.exhausted,
    })
}
