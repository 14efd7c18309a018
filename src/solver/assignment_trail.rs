use super::types::{DecisionLevel, Lit};

// Assignment trail during search and inference.
//
// The suffix trail[bcp_idx..] doubles as the propagation queue: every literal
// past bcp_idx has been assigned true but its watchers have not been
// processed yet.
pub struct AssignmentStack {
    // Stack of Lits
    // Assignment trail (either from decision, or BCP)
    pub trail: Vec<Lit>,
    // lvl -> index into trail
    // Indices for decision level delimiters.
    // (i.e. after deciding lvl, dl_delim_idxs[lvl] == new decided var location)
    pub dl_delim_idxs: Vec<usize>,
    // Index from which to start BCP
    pub bcp_idx: usize,
}

impl AssignmentStack {
    pub fn new(n_vars: usize) -> Self {
        Self {
            trail: Vec::with_capacity(n_vars),
            dl_delim_idxs: Vec::new(),
            bcp_idx: 0,
        }
    }

    // Pushes a lit onto the trail (and thereby onto the propagation queue).
    pub fn push(&mut self, l: Lit) {
        self.trail.push(l);
    }

    // Pops the most recent assignment.
    pub fn pop(&mut self) -> Lit {
        self.trail.pop().unwrap()
    }

    pub fn len(&self) -> usize {
        self.trail.len()
    }

    // Gets the Lit in the trail at the index.
    pub fn get(&self, i: usize) -> Lit {
        self.trail[i]
    }

    // Gets the Lit at the current BCP index, then increments it.
    pub fn get_next_bcp_lit(&mut self) -> Option<Lit> {
        if self.bcp_idx >= self.trail.len() {
            None
        } else {
            let lit = self.trail[self.bcp_idx];
            self.bcp_idx += 1;
            Some(lit)
        }
    }

    // Sets the BCP index up to the trail head, draining the queue.
    pub fn set_bcp_idx_to_trail_head(&mut self) {
        self.bcp_idx = self.trail.len();
    }

    /// Checks if BCP index at end (i.e. all propagated).
    pub fn bcp_idx_at_end(&self) -> bool {
        self.bcp_idx >= self.trail.len()
    }

    /// Gets the delim index within the trail for the specified level.
    pub fn dl_delim_idx(&self, dl: DecisionLevel) -> usize {
        self.dl_delim_idxs[dl as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcp_queue_is_fifo_over_pushes() {
        let mut stack = AssignmentStack::new(4);
        stack.push(Lit::from_dimacs(1));
        stack.push(Lit::from_dimacs(-2));
        assert!(!stack.bcp_idx_at_end());
        assert_eq!(stack.get_next_bcp_lit(), Some(Lit::from_dimacs(1)));
        assert_eq!(stack.get_next_bcp_lit(), Some(Lit::from_dimacs(-2)));
        assert_eq!(stack.get_next_bcp_lit(), None);
        assert!(stack.bcp_idx_at_end());

        // New pushes re-open the queue.
        stack.push(Lit::from_dimacs(3));
        assert_eq!(stack.get_next_bcp_lit(), Some(Lit::from_dimacs(3)));
    }

    #[test]
    fn drain_skips_pending_entries() {
        let mut stack = AssignmentStack::new(4);
        stack.push(Lit::from_dimacs(1));
        stack.push(Lit::from_dimacs(2));
        stack.set_bcp_idx_to_trail_head();
        assert_eq!(stack.get_next_bcp_lit(), None);
    }
}
