use std::collections::{BTreeSet, HashSet};

use snafu::OptionExt;

use crate::config::*;
use crate::registry::CandidateRegistry;

/// Collects the choices of one voter, most preferred first.
///
/// Sealing consumes the builder, so a sealed [`Ballot`] can never grow.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct BallotBuilder {
    choices: Vec<CandidateId>,
}

impl BallotBuilder {
    pub fn new() -> BallotBuilder {
        BallotBuilder::default()
    }

    /// Appends the next preference.
    pub fn append(&mut self, cid: CandidateId) -> &mut BallotBuilder {
        self.choices.push(cid);
        self
    }

    /// Appends the next preference by candidate name.
    ///
    /// Nothing is appended if the name is not part of the roster.
    pub fn append_name(
        &mut self,
        registry: &CandidateRegistry,
        name: &str,
    ) -> Result<&mut BallotBuilder, TallyError> {
        let cid = registry.lookup_by_name(name)?;
        Ok(self.append(cid))
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn seal(self) -> Ballot {
        Ballot {
            choices: self.choices.into_boxed_slice(),
        }
    }
}

/// A sealed, immutable preference ranking.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Ballot {
    choices: Box<[CandidateId]>,
}

impl Ballot {
    /// Builds a sealed ballot in one step.
    pub fn from_choices<I: IntoIterator<Item = CandidateId>>(choices: I) -> Ballot {
        Ballot {
            choices: choices.into_iter().collect(),
        }
    }

    /// Resolves the names against the roster. Fails on the first unknown name.
    pub fn from_names<S: AsRef<str>>(
        registry: &CandidateRegistry,
        names: &[S],
    ) -> Result<Ballot, TallyError> {
        let mut builder = BallotBuilder::new();
        for name in names {
            builder.append_name(registry, name.as_ref())?;
        }
        Ok(builder.seal())
    }

    pub fn has_choice_at(&self, index: usize) -> bool {
        index < self.choices.len()
    }

    pub fn choice_at(&self, index: usize) -> Result<CandidateId, TallyError> {
        self.choices.get(index).copied().context(NoChoiceAtRankSnafu {
            index,
            len: self.choices.len(),
        })
    }

    /// An empty ballot abstains in every round.
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn choices(&self) -> &[CandidateId] {
        &self.choices
    }

    /// The most preferred choice that is still running, if any.
    ///
    /// Eliminated choices are skipped in rank order. `None` means the ballot is
    /// exhausted for this set of running candidates.
    pub fn current_choice(&self, active: &BTreeSet<CandidateId>) -> Option<CandidateId> {
        self.choices.iter().find(|cid| active.contains(*cid)).copied()
    }

    /// The first candidate that is ranked a second time, if any.
    pub fn duplicate_choice(&self) -> Option<CandidateId> {
        let mut seen: HashSet<CandidateId> = HashSet::new();
        self.choices.iter().find(|cid| !seen.insert(**cid)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> CandidateRegistry {
        CandidateRegistry::new(&["Ollie", "Alicia", "George", "Robert"]).unwrap()
    }

    #[test]
    fn choices_are_indexed_in_rank_order() {
        let reg = registry();
        let ballot = Ballot::from_names(&reg, &["Ollie", "Alicia", "George", "Robert"]).unwrap();
        assert!(ballot.has_choice_at(0));
        assert!(ballot.has_choice_at(3));
        assert!(!ballot.has_choice_at(10));
        assert_eq!(ballot.choice_at(0).unwrap(), reg.lookup_by_name("Ollie").unwrap());
        assert_eq!(
            ballot.choice_at(2).unwrap(),
            reg.lookup_by_name("George").unwrap()
        );
    }

    #[test]
    fn missing_rank_is_a_precondition_failure() {
        let ballot = Ballot::from_choices(vec![CandidateId(0)]);
        assert_eq!(
            ballot.choice_at(1),
            Err(TallyError::NoChoiceAtRank { index: 1, len: 1 })
        );
    }

    #[test]
    fn builder_seals_appended_choices() {
        let reg = registry();
        let mut builder = BallotBuilder::new();
        assert!(builder.is_empty());
        builder.append(CandidateId(0)).append(CandidateId(2));
        builder.append_name(&reg, "Robert").unwrap();
        let ballot = builder.seal();
        assert_eq!(
            ballot.choices(),
            &[CandidateId(0), CandidateId(2), CandidateId(3)]
        );
        assert!(!ballot.is_empty());
    }

    #[test]
    fn unknown_name_is_not_appended() {
        let reg = registry();
        let mut builder = BallotBuilder::new();
        builder.append_name(&reg, "Ollie").unwrap();
        assert!(builder.append_name(&reg, "Nobody").is_err());
        assert_eq!(builder.seal().len(), 1);
    }

    #[test]
    fn empty_ballot() {
        let ballot = BallotBuilder::new().seal();
        assert!(ballot.is_empty());
        assert!(!ballot.has_choice_at(0));
        let active: BTreeSet<CandidateId> = [CandidateId(0)].into_iter().collect();
        assert_eq!(ballot.current_choice(&active), None);
    }

    #[test]
    fn current_choice_skips_eliminated_candidates() {
        let ballot = Ballot::from_choices(vec![CandidateId(3), CandidateId(1), CandidateId(0)]);
        let active: BTreeSet<CandidateId> = [CandidateId(0), CandidateId(1)].into_iter().collect();
        assert_eq!(ballot.current_choice(&active), Some(CandidateId(1)));
        let last: BTreeSet<CandidateId> = [CandidateId(2)].into_iter().collect();
        assert_eq!(ballot.current_choice(&last), None);
    }

    #[test]
    fn duplicates_are_detected() {
        let ballot = Ballot::from_choices(vec![CandidateId(1), CandidateId(0), CandidateId(1)]);
        assert_eq!(ballot.duplicate_choice(), Some(CandidateId(1)));
        let clean = Ballot::from_choices(vec![CandidateId(1), CandidateId(0)]);
        assert_eq!(clean.duplicate_choice(), None);
    }
}
