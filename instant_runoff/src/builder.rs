use log::debug;
use snafu::OptionExt;

pub use crate::config::*;
use crate::{Ballot, CandidateRegistry, Election};

/// A builder for adding votes by candidate name.
///
/// ```
/// pub use instant_runoff::builder::Builder;
/// pub use instant_runoff::VoteRules;
/// # use instant_runoff::TallyError;
///
/// let mut builder = Builder::new(&VoteRules::DEFAULT_RULES)?
///     .candidates(&["Anna".to_string(), "Bob".to_string()])?;
///
/// builder.add_vote_simple(&["Anna".to_string(), "Bob".to_string()])?;
/// builder.add_vote_simple(&["Anna".to_string()])?;
/// assert!(builder.add_vote_simple(&["Clara".to_string()]).is_err());
///
/// let result = builder.build()?.run()?;
/// assert_eq!(result.winner.as_deref(), Some("Anna"));
///
/// # Ok::<(), TallyError>(())
/// ```
pub struct Builder {
    rules: VoteRules,
    registry: Option<CandidateRegistry>,
    ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &VoteRules) -> Result<Builder, TallyError> {
        rules.validate()?;
        Ok(Builder {
            rules: rules.clone(),
            registry: None,
            ballots: Vec::new(),
        })
    }

    /// Sets the roster. The votes added so far are dropped.
    pub fn candidates<S: AsRef<str>>(self, cands: &[S]) -> Result<Builder, TallyError> {
        Ok(Builder {
            rules: self.rules,
            registry: Some(CandidateRegistry::new(cands)?),
            ballots: Vec::new(),
        })
    }

    /// Adds a vote to the builder.
    ///
    /// The choices are the candidate names, most preferred first. Every name must be on the
    /// roster.
    pub fn add_vote_simple<S: AsRef<str>>(&mut self, candidates: &[S]) -> Result<(), TallyError> {
        let registry = self.registry.as_ref().context(EmptyRegistrySnafu {})?;
        let ballot = Ballot::from_names(registry, candidates)?;
        self.add_ballot(ballot)
    }

    /// Adds a sealed ballot.
    pub fn add_ballot(&mut self, ballot: Ballot) -> Result<(), TallyError> {
        let registry = self.registry.as_ref().context(EmptyRegistrySnafu {})?;
        for cid in ballot.choices() {
            registry.check(*cid)?;
        }
        self.ballots.push(ballot);
        Ok(())
    }

    pub fn registry(&self) -> Option<&CandidateRegistry> {
        self.registry.as_ref()
    }

    pub fn build(self) -> Result<Election, TallyError> {
        let registry = self.registry.context(EmptyRegistrySnafu {})?;
        debug!(
            "Builder::build: {} candidates, {} ballots",
            registry.len(),
            self.ballots.len()
        );
        let mut election = Election::new(registry, &self.rules)?;
        for ballot in self.ballots {
            election.add_ballot(ballot)?;
        }
        Ok(election)
    }
}
