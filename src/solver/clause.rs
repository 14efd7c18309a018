use std::fmt::Debug;
use std::ops::{Index, IndexMut};

use super::types::{DecisionLevel, Lit};
use slotmap::{self, basic::IterMut, new_key_type, SlotMap};

// Note that default is ClauseKey::null()
new_key_type! {
  pub struct ClauseKey;
}

/// Arena for all clauses, originals and learnts alike. Handing out stable
/// keys keeps the watcher lists and reason slots free of lifetime trouble,
/// and makes garbage collection an explicit `free`.
#[derive(Default)]
pub struct ClauseAllocator {
    sm: SlotMap<ClauseKey, Clause>,
}

impl ClauseAllocator {
    pub fn new(n_clauses: usize) -> Self {
        Self {
            sm: SlotMap::with_capacity_and_key(n_clauses),
        }
    }

    // Create a new clause from the provided literals.
    pub fn alloc(&mut self, lits: &[Lit], learnt: bool) -> ClauseKey {
        self.sm
            .insert_with_key(|ck| Clause::with_key(lits, learnt, ck))
    }

    /// Reclaims a clause. The caller must have unwatched it first.
    pub fn free(&mut self, ck: ClauseKey) {
        self.sm.remove(ck);
    }

    pub fn len(&self) -> usize {
        self.sm.len()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, ClauseKey, Clause> {
        self.sm.iter_mut()
    }
}

impl Index<ClauseKey> for ClauseAllocator {
    type Output = Clause;
    fn index(&self, index: ClauseKey) -> &Self::Output {
        self.sm.get(index).unwrap()
    }
}

impl IndexMut<ClauseKey> for ClauseAllocator {
    fn index_mut(&mut self, index: ClauseKey) -> &mut Self::Output {
        self.sm.get_mut(index).unwrap()
    }
}

#[derive(Default, Clone)]
pub struct Clause {
    pub lits: Vec<Lit>,

    /// Reference to this clause in the slotmap (i.e. clause key)
    pub ck: ClauseKey,
    /// Activity, used to rank learnts for garbage collection
    pub act: f64,
    /// Whether clause was learnt
    pub learnt: bool,
}

impl Clause {
    fn with_key(lits: &[Lit], learnt: bool, ck: ClauseKey) -> Self {
        Self {
            lits: lits.to_vec(),
            ck,
            act: 0.,
            learnt,
        }
    }

    pub fn len(&self) -> usize {
        self.lits.len()
    }

    /// Increases the clause's activity. Returns whether the new activity
    /// exceeds the rescale limit.
    pub fn bump_activity(&mut self, inc: f64, lim: f64) -> bool {
        self.act += inc;
        self.act >= lim
    }
}

impl Debug for Clause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let lit_str = self
            .lits
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(",");
        write!(
            f,
            "Clause {{ len: {}, learnt: {}, lits: {} }}",
            self.len(),
            self.learnt,
            lit_str
        )
    }
}

impl Index<usize> for Clause {
    type Output = Lit;
    fn index(&self, i: usize) -> &Lit {
        &self.lits[i]
    }
}
impl IndexMut<usize> for Clause {
    fn index_mut(&mut self, i: usize) -> &mut Lit {
        &mut self.lits[i]
    }
}

// Record the reason and decision level for an implication (i.e. BCP result),
// if one exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Reason {
    // Slot key for clause (for decisions and assumptions, ck == None)
    pub ck: Option<ClauseKey>,
    // Decision level
    pub dl: DecisionLevel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::types::Lit;

    fn lits(ls: &[i64]) -> Vec<Lit> {
        ls.iter().map(|l| Lit::from_dimacs(*l)).collect()
    }

    #[test]
    fn alloc_and_free() {
        let mut ca = ClauseAllocator::new(4);
        let ck = ca.alloc(&lits(&[1, -2, 3]), false);
        assert_eq!(ca.len(), 1);
        assert_eq!(ca[ck].len(), 3);
        assert_eq!(ca[ck].ck, ck);
        assert!(!ca[ck].learnt);
        ca.free(ck);
        assert_eq!(ca.len(), 0);
    }

    #[test]
    fn bump_reports_rescale() {
        let mut ca = ClauseAllocator::new(1);
        let ck = ca.alloc(&lits(&[1, 2]), true);
        assert!(!ca[ck].bump_activity(1.0, 1e100));
        ca[ck].act = 1e100 - 0.5;
        assert!(ca[ck].bump_activity(1.0, 1e100));
    }
}
