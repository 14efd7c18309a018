use std::mem;

use super::{clause::ClauseKey, types::Lit, util::vec_with_size};

pub struct WatchList {
    // Literal -> list of Watchers (i.e. clauses in which this Lit is watched)
    occs: Vec<Vec<Watcher>>,
}

impl WatchList {
    // Creates a watch list covering n literals.
    pub fn new(n_lits: usize) -> Self {
        Self {
            occs: vec_with_size(n_lits, vec![]),
        }
    }

    // Adds a watcher to the literal's watched clauses list.
    pub fn add_watcher(&mut self, l: Lit, w: Watcher) {
        self.occs[l.idx()].push(w);
    }

    // Removes the first watcher for the given clause from the literal's list,
    // if present. Watchers are matched by clause key only; the blocker may
    // have been refreshed since the watcher was installed.
    pub fn remove_watcher(&mut self, l: Lit, ck: ClauseKey) {
        let ws = &mut self.occs[l.idx()];
        if let Some(i) = ws.iter().position(|w| w.ck == ck) {
            ws.remove(i);
        }
    }

    /// Hands ownership of this literal's watchers to the caller. Make sure to
    /// put them back with set_watchers.
    pub fn take_watchers(&mut self, l: Lit) -> Vec<Watcher> {
        mem::take(&mut self.occs[l.idx()])
    }

    pub fn set_watchers(&mut self, l: Lit, ws: Vec<Watcher>) {
        self.occs[l.idx()] = ws;
    }

    // Read-only view, for invariant checks.
    pub fn watchers(&self, l: Lit) -> &[Watcher] {
        &self.occs[l.idx()]
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub struct Watcher {
    pub ck: ClauseKey,
    /// Cached clause literal; if it is already true the clause is satisfied
    /// and propagation can skip the clause without touching its memory.
    pub blocker: Lit,
}

impl Watcher {
    pub fn new(ck: ClauseKey, blocker: Lit) -> Self {
        Self { ck, blocker }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::clause::ClauseAllocator;

    #[test]
    fn add_take_set_round_trip() {
        let mut ca = ClauseAllocator::new(1);
        let ck = ca.alloc(&[Lit::from_dimacs(1), Lit::from_dimacs(2)], false);
        let mut wl = WatchList::new(4);

        let l = Lit::from_dimacs(-2);
        wl.add_watcher(l, Watcher::new(ck, Lit::from_dimacs(1)));
        assert_eq!(wl.watchers(l).len(), 1);

        let ws = wl.take_watchers(l);
        assert_eq!(ws.len(), 1);
        assert!(wl.watchers(l).is_empty());
        wl.set_watchers(l, ws);
        assert_eq!(wl.watchers(l).len(), 1);
    }

    #[test]
    fn remove_matches_by_clause_key() {
        let mut ca = ClauseAllocator::new(2);
        let c1 = ca.alloc(&[Lit::from_dimacs(1), Lit::from_dimacs(2)], false);
        let c2 = ca.alloc(&[Lit::from_dimacs(1), Lit::from_dimacs(3)], false);
        let mut wl = WatchList::new(6);

        let l = Lit::from_dimacs(-1);
        wl.add_watcher(l, Watcher::new(c1, Lit::from_dimacs(2)));
        wl.add_watcher(l, Watcher::new(c2, Lit::from_dimacs(3)));

        // Blocker differs from the one installed; removal still finds c1.
        wl.remove_watcher(l, c1);
        assert_eq!(wl.watchers(l).len(), 1);
        assert_eq!(wl.watchers(l)[0].ck, c2);
    }
}
