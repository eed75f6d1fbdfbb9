use std::collections::HashMap;

use log::debug;
use snafu::{ensure, OptionExt};

use crate::config::*;

/// The fixed roster of an election.
///
/// The roster is established once, before any ballot is counted, and never changes
/// afterwards. Elimination does not touch the registry: the set of candidates still
/// running belongs to the [`crate::TallyEngine`].
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CandidateRegistry {
    candidates: Vec<Candidate>,
    by_name: HashMap<String, CandidateId>,
}

impl CandidateRegistry {
    /// Builds a registry from candidate names, in roster order.
    ///
    /// The roster must contain at least one candidate and names must be unique.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Result<CandidateRegistry, TallyError> {
        ensure!(!names.is_empty(), EmptyRegistrySnafu {});
        let mut candidates: Vec<Candidate> = Vec::with_capacity(names.len());
        let mut by_name: HashMap<String, CandidateId> = HashMap::new();
        for (idx, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let cid = CandidateId(idx as u32);
            ensure!(
                by_name.insert(name.to_string(), cid).is_none(),
                DuplicateCandidateNameSnafu { name }
            );
            candidates.push(Candidate {
                id: cid,
                name: name.to_string(),
            });
        }
        debug!("CandidateRegistry::new: {:?}", candidates);
        Ok(CandidateRegistry {
            candidates,
            by_name,
        })
    }

    /// Exact, case-sensitive lookup.
    pub fn lookup_by_name(&self, name: &str) -> Result<CandidateId, TallyError> {
        self.by_name
            .get(name)
            .copied()
            .context(NotFoundSnafu { name })
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// The full roster, in the order it was registered.
    pub fn all(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn get(&self, cid: CandidateId) -> Option<&Candidate> {
        self.candidates.get(cid.index())
    }

    pub(crate) fn check(&self, cid: CandidateId) -> Result<&Candidate, TallyError> {
        self.get(cid).context(UnknownCandidateIdSnafu { id: cid.0 })
    }

    pub fn ids(&self) -> impl Iterator<Item = CandidateId> + '_ {
        self.candidates.iter().map(|c| c.id)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false: a registry holds at least one candidate.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_keeps_order_and_names() {
        let reg = CandidateRegistry::new(&["Ollie", "Alicia", "George", "Robert"]).unwrap();
        let names: Vec<&str> = reg.all().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["Ollie", "Alicia", "George", "Robert"]);
        assert_eq!(reg.len(), 4);
        assert_eq!(reg.lookup_by_name("George").unwrap().index(), 2);
        assert_eq!(reg.get(CandidateId(1)).unwrap().name(), "Alicia");
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        let reg = CandidateRegistry::new(&["Ollie"]).unwrap();
        assert!(reg.contains_name("Ollie"));
        assert_eq!(
            reg.lookup_by_name("ollie"),
            Err(TallyError::NotFound {
                name: "ollie".to_string()
            })
        );
        assert!(reg.lookup_by_name("Ollie ").is_err());
    }

    #[test]
    fn empty_or_repeated_rosters_are_refused() {
        let empty: [&str; 0] = [];
        assert_eq!(
            CandidateRegistry::new(&empty),
            Err(TallyError::EmptyRegistry {})
        );
        assert_eq!(
            CandidateRegistry::new(&["A", "B", "A"]),
            Err(TallyError::DuplicateCandidateName {
                name: "A".to_string()
            })
        );
    }

    #[test]
    fn unknown_ids_are_reported() {
        let reg = CandidateRegistry::new(&["A", "B"]).unwrap();
        assert!(reg.check(CandidateId(1)).is_ok());
        assert_eq!(
            reg.check(CandidateId(2)),
            Err(TallyError::UnknownCandidateId { id: 2 })
        );
    }
}
