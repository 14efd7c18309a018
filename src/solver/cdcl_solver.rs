use rand::Rng;
use std::{cmp::Ordering, mem, time::Instant};

use log::{debug, info};
use mut_binary_heap::BinaryHeap;
use ordered_float::OrderedFloat;

use crate::dimacs::sat_instance::SatInstance;

use super::{
    assignment_trail::AssignmentStack,
    clause::{ClauseAllocator, ClauseKey, Reason},
    config::{RestartPolicy, SearchParams, SolverConfig, RESCALE_F, RESCALE_LIM},
    stats::RuntimeStats,
    types::{
        lits_from_vars, DecisionLevel, LBool, Lit, SolveResult, SolveStatus, Var, F64, L_UNDEF,
    },
    util::{has_dup, vec_to_str, vec_with_size},
    watch_list::{WatchList, Watcher},
};

pub struct CdclSolver {
    ca: ClauseAllocator,
    /// Problem information: constraint clauses, learnt clauses.
    clauses: Vec<ClauseKey>,
    learnts: Vec<ClauseKey>,

    /// Search/inference fields.
    ///
    /// Current decision level in search; always equals the number of trail
    /// delimiters in force.
    decision_level: DecisionLevel,
    /// Assignment stack during search and inference; will need to rewind on
    /// conflicts. Its unpropagated suffix is the propagation queue.
    trail: AssignmentStack,
    /// Watch list (i.e. occurrence list) for literals to track which clauses
    /// are watching them.
    watches: WatchList,

    conf: SolverConfig,

    /// Variable/Literal metadata.
    ///
    /// We use separate vectors, as opposed to one struct, to optimize cache
    /// accesses if we only need some subset of the data.
    ///
    /// Var -> assignment (if exists)
    assigned: Vec<LBool>,
    /// Var -> reason information
    /// Useful for conflict analysis (i.e. needed when iterating backwards to
    /// detect the UIP)
    reasons: Vec<Reason>,
    /// Lit -> activity. Keyed per literal, so the two polarities of a
    /// variable compete independently for the next decision.
    acts: Vec<F64>,
    /// Keyed max-heap over the activities; stale (assigned) entries are
    /// filtered on pop.
    act_heap: BinaryHeap<Lit, F64>,
    /// Current activity increments; divided by their decay after each
    /// conflict.
    var_inc: f64,
    cla_inc: f64,

    /// Temporary computation structures, in order to prevent repetitive
    /// allocation/deallocation.
    ///
    /// Var -> bool
    /// Used to remember if a variable has already been seen in conflict
    /// analysis and clause minimization. Remember to clear using
    /// seen_to_clear!
    seen: Vec<bool>,
    /// Stack of vars whose seen values need clearing when analysis is done.
    seen_to_clear: Vec<Var>,
    /// Stack of lits used in conflict analysis for clause minimization.
    analyze_stack: Vec<Lit>,
    /// Scratch space for reason lits (copy to/from here to avoid mutable
    /// ownership issues)
    reason_lits: Vec<Lit>,
    /// Scratch space for learnt lits
    learnt_lits: Vec<Lit>,

    /// Stats.
    stats: RuntimeStats,
    /// Elapsed time.
    start: Instant,
}

impl CdclSolver {
    /// Creates a solver sized for `n_vars` variables. `n_clauses` is only a
    /// pre-allocation hint.
    pub fn new(conf: SolverConfig, n_vars: usize, n_clauses: usize) -> Self {
        let n_lits = lits_from_vars(n_vars);
        let acts = vec![OrderedFloat(0.); n_lits];
        let mut act_heap = BinaryHeap::with_capacity(n_lits);
        for idx in 0..n_lits {
            act_heap.push(Lit::from_index(idx), acts[idx]);
        }

        Self {
            ca: ClauseAllocator::new(n_clauses),
            clauses: vec![],
            learnts: vec![],
            decision_level: 0,
            trail: AssignmentStack::new(n_vars),
            watches: WatchList::new(n_lits),
            conf,
            assigned: vec![LBool::Undef; n_vars],
            reasons: vec_with_size(n_vars, Reason::default()),
            acts,
            act_heap,
            var_inc: 1.,
            cla_inc: 1.,
            seen: vec![false; n_vars],
            seen_to_clear: vec![],
            analyze_stack: vec![],
            reason_lits: vec![],
            learnt_lits: vec![],
            stats: RuntimeStats::default(),
            start: Instant::now(),
        }
    }

    /// Builds a solver from a parsed instance. Returns UNSAT when clause
    /// addition already refutes the formula (empty clause or contradicting
    /// units).
    pub fn from_instance(conf: SolverConfig, instance: &SatInstance) -> (Self, SolveStatus) {
        let mut solver = Self::new(conf, instance.n_vars, instance.n_clauses);
        for c in &instance.clauses {
            let lits = c
                .lits
                .iter()
                .map(|l| Lit::from_dimacs(*l))
                .collect::<Vec<_>>();
            let (ok, _) = solver.add_clause(&lits, false);
            if !ok {
                return (solver, SolveStatus::Unsat);
            }
        }
        (solver, SolveStatus::Unknown)
    }

    /// Repeatedly searches with growing budgets until the formula is decided.
    pub fn solve(&mut self) -> SolveResult {
        let mut params = SearchParams::initial(&self.conf, self.clauses.len());
        loop {
            self.stats.starts += 1;
            if let RestartPolicy::Luby { unit } = self.conf.restart_policy {
                params.max_conflicts = unit * self.luby();
            }
            info!(
                "restart {}: budget {} conflicts / {} learnts ({} learnt clauses, {} conflicts so far)",
                self.stats.starts,
                params.max_conflicts,
                params.max_learnts,
                self.num_learnts(),
                self.stats.conflicts
            );
            let status = self.search(&params);
            debug_assert!(status != SolveStatus::Unknown || self.decision_level() == 0);
            if status != SolveStatus::Unknown {
                let assignments = if status == SolveStatus::Sat {
                    self.assignments()
                } else {
                    vec![]
                };
                return SolveResult {
                    status,
                    elapsed: self.start.elapsed(),
                    assignments,
                };
            }
            if let RestartPolicy::Geometric { growth, .. } = self.conf.restart_policy {
                params.max_conflicts = (params.max_conflicts as f64 * growth).ceil() as u64;
            }
            params.max_learnts = (params.max_learnts as f64 * self.conf.learnt_growth).ceil() as usize;
        }
    }

    /// Searches for a satisfying assignment within the given budgets.
    /// Returns UNKNOWN with the trail cancelled to level 0 once the conflict
    /// budget is exhausted; the caller may re-enter with relaxed budgets.
    pub fn search(&mut self, params: &SearchParams) -> SolveStatus {
        let mut n_conflicts = 0u64;

        loop {
            let conflict = self.propagate();
            match conflict {
                Some(confl_ck) => {
                    self.stats.conflicts += 1;
                    n_conflicts += 1;

                    // A conflict with no decisions in force refutes the
                    // formula.
                    if self.decision_level == 0 {
                        return SolveStatus::Unsat;
                    }

                    debug!(
                        "(DL {}) analyzing conflict with cause {:?}",
                        self.decision_level, self.ca[confl_ck],
                    );
                    let (learnt_lits, bt_lvl) = self.analyze(confl_ck);
                    self.backtrack(bt_lvl);
                    self.record(learnt_lits);

                    self.var_inc /= params.var_decay;
                    self.cla_inc /= params.clause_decay;
                }
                None => {
                    debug_assert!(self.trail.bcp_idx_at_end());

                    if self.decision_level == 0 {
                        self.simplify_clauses();
                    }

                    if self.learnts.len() > params.max_learnts {
                        self.reduce_learnts();
                    }

                    if self.num_assigns() == self.num_variables() {
                        debug_assert!(
                            self.check_assignment(),
                            "search accepted a non-satisfying assignment"
                        );
                        return SolveStatus::Sat;
                    }

                    if n_conflicts >= params.max_conflicts {
                        self.backtrack(0);
                        return SolveStatus::Unknown;
                    }

                    self.stats.decisions += 1;
                    match self.pick_branch_lit() {
                        Some(lit) => {
                            debug!("deciding lit {lit}");
                            self.assume(lit);
                        }
                        None => return SolveStatus::Sat,
                    }
                }
            }
        }
    }

    /// Literal/variable accessors.
    ///
    /// Calculate value given a literal
    fn value(&self, l: Lit) -> LBool {
        self.assigned[l.var_idx()] ^ LBool::from(l.sign() as u8)
    }

    /// Get DL for this variable's assignment.
    fn level(&self, v: Var) -> DecisionLevel {
        self.reasons[v as usize].dl
    }

    pub fn num_variables(&self) -> usize {
        self.assigned.len()
    }

    pub fn num_clauses(&self) -> usize {
        self.clauses.len()
    }

    pub fn num_learnts(&self) -> usize {
        self.learnts.len()
    }

    pub fn num_assigns(&self) -> usize {
        self.assigned
            .iter()
            .map(|a| (*a != LBool::Undef) as usize)
            .sum()
    }

    pub fn decision_level(&self) -> DecisionLevel {
        self.decision_level
    }

    /// Clause addition.
    ///
    /// Adds a clause over the given literals. Non-learnt clauses are
    /// normalized first: clauses satisfied at the current level or containing
    /// complementary literals are dropped, false and duplicate literals are
    /// removed. Returns false when the formula became trivially
    /// unsatisfiable (empty clause, or a unit contradicting the current
    /// assignment), along with the key of the stored clause if one was
    /// created.
    pub fn add_clause(&mut self, lits: &[Lit], learnt: bool) -> (bool, Option<ClauseKey>) {
        let mut lits = lits.to_vec();
        if !learnt {
            lits.sort();
            let mut j = 0;
            let mut prev_lit = L_UNDEF;
            for i in 0..lits.len() {
                let lit = lits[i];
                let v = self.value(lit);
                // If already satisfied, or (p ^ !p) in same clause, don't add
                if v == LBool::True || lit == !prev_lit {
                    return (true, None);
                }
                // Otherwise, only keep if not already falsified and lit not
                // same as prev
                if v != LBool::False && lit != prev_lit {
                    prev_lit = lit;
                    lits[j] = prev_lit;
                    j += 1;
                }
            }
            lits.truncate(j);
        }
        debug_assert!(learnt || !has_dup(&lits));

        match lits.len() {
            0 => (false, None),
            1 => (self.enqueue(lits[0], None), None),
            _ => {
                let ck = self.ca.alloc(&lits, learnt);
                if learnt {
                    self.learnts.push(ck);
                    self.stats.n_learnts += 1;
                } else {
                    self.clauses.push(ck);
                    self.stats.n_clauses += 1;
                }
                self.attach_clause(ck);
                for l in &lits {
                    self.bump_lit_activity(*l);
                }
                (true, Some(ck))
            }
        }
    }

    /// Adds the learnt clause produced by analyze and asserts its first
    /// literal. The asserting literal is unit at the backjump level, so the
    /// enqueue always succeeds.
    fn record(&mut self, lits: Vec<Lit>) {
        debug!("recording learnt clause [{}]", vec_to_str(&lits));
        if lits.len() == 1 {
            self.stats.n_unit_learnts += 1;
        }
        let (ok, ck) = self.add_clause(&lits, true);
        debug_assert!(ok);
        let asserted = self.enqueue(lits[0], ck);
        debug_assert!(asserted);
    }

    /// Attaches a clause to watchlists.
    fn attach_clause(&mut self, ck: ClauseKey) {
        let (c0, c1, c_len, learnt) = {
            let c = &self.ca[ck];
            (c[0], c[1], c.len(), c.learnt)
        };
        debug_assert!(c_len > 1);
        self.watches.add_watcher(!c0, Watcher::new(ck, c1));
        self.watches.add_watcher(!c1, Watcher::new(ck, c0));
        if learnt {
            self.stats.n_learnt_lits += c_len as u64;
        } else {
            self.stats.n_clause_lits += c_len as u64;
        }
    }

    /// Trail bookkeeping.
    ///
    /// Records an assignment making `lit` true, appending it to the trail
    /// (and thereby to the propagation queue). If the variable is already
    /// assigned, reports whether the existing assignment agrees with `lit`.
    fn enqueue(&mut self, lit: Lit, reason: Option<ClauseKey>) -> bool {
        match self.value(lit) {
            LBool::True => true,
            LBool::False => false,
            LBool::Undef => {
                self.assigned[lit.var_idx()] = LBool::from_sign(!lit.sign());
                self.reasons[lit.var_idx()] = Reason {
                    ck: reason,
                    dl: self.decision_level,
                };
                debug!(
                    "assigning {} at level {} (cause: {:?})",
                    lit, self.decision_level, reason
                );
                self.trail.push(lit);
                true
            }
        }
    }

    /// Undoes the most recent assignment, re-inserting both polarities of
    /// the freed variable into the activity heap.
    fn undo_one(&mut self) {
        let lit = self.trail.pop();
        let var = lit.var_idx();
        self.assigned[var] = LBool::Undef;
        self.reasons[var] = Reason::default();
        self.act_heap.push(lit, self.acts[lit.idx()]);
        self.act_heap.push(!lit, self.acts[(!lit).idx()]);
    }

    /// Opens a new decision level and assumes `lit`. Reports whether the
    /// assumption was consistent with the current assignment.
    fn assume(&mut self, lit: Lit) -> bool {
        self.trail.dl_delim_idxs.push(self.trail.len());
        self.decision_level += 1;
        debug_assert!(self.decision_level as usize == self.trail.dl_delim_idxs.len());
        self.enqueue(lit, None)
    }

    // Backtrack to the desired decision level, cleaning up the trail as
    // necessary.
    fn backtrack(&mut self, dl: DecisionLevel) {
        if self.decision_level <= dl {
            return;
        }

        let lvl_delim_idx = self.trail.dl_delim_idx(dl);
        debug!(
            "backtracking to DL {dl} (idx: {}, current trail: [{}])",
            lvl_delim_idx,
            vec_to_str(&self.trail.trail)
        );

        while self.trail.len() > lvl_delim_idx {
            self.undo_one();
        }

        // After clearing the trail, the queue holds nothing unpropagated.
        self.trail.set_bcp_idx_to_trail_head();
        self.trail.dl_delim_idxs.truncate(dl as usize);
        self.decision_level = dl;
    }

    // Implements BCP (unit propagation), consuming the propagation queue in
    // FIFO order. Returns the conflicting clause if one is found.
    fn propagate(&mut self) -> Option<ClauseKey> {
        let mut conflict = None;
        let mut n_props = 0;

        while let Some(l) = self.trail.get_next_bcp_lit() {
            n_props += 1;
            conflict = self.propagate_watchers(l);
            if conflict.is_some() {
                break;
            }
        }

        self.stats.propagations += n_props;
        conflict
    }

    /// Notifies every clause watching `l` that `l` just became true. Each
    /// clause either re-watches `l`, moves to a fresh watcher, or turns out
    /// unit/conflicting. On conflict, the unprocessed suffix of the watcher
    /// list is reinstalled (so the watcher invariant survives) and the
    /// propagation queue is drained.
    fn propagate_watchers(&mut self, l: Lit) -> Option<ClauseKey> {
        let mut conflict = None;
        let mut watchers = self.watches.take_watchers(l);
        let (mut i, mut j) = (0, 0);
        let n_ws = watchers.len();

        debug!("propagating {l} with {n_ws} watchers");

        'next_watcher: while i < n_ws {
            debug_assert!(conflict.is_none());

            let w_i = watchers[i];
            // See if we can skip this clause entirely.
            if self.value(w_i.blocker) == LBool::True {
                watchers[j] = w_i;
                i += 1;
                j += 1;
                continue;
            }

            // For the invariant, make sure the falsified lit is the second
            // value in the clause.
            let neg_l = !l;
            let ck = w_i.ck;
            let (first, c_len) = {
                let c = &mut self.ca[ck];
                if c[0] == neg_l {
                    c.lits.swap(0, 1);
                }
                debug_assert!(c[1] == neg_l);
                i += 1;
                (c[0], c.len())
            };

            // If the first watcher is not the blocker and is already true,
            // then this clause is satisfied; keep watching l.
            let w_first = Watcher::new(ck, first);
            if first != w_i.blocker && self.value(first) == LBool::True {
                watchers[j] = w_first;
                j += 1;
                continue;
            }

            // Find a new watcher among the remaining literals.
            for k in 2..c_len {
                if self.value(self.ca[ck][k]) != LBool::False {
                    let c = &mut self.ca[ck];
                    c.lits.swap(1, k);
                    let new_watch = !c[1];
                    self.watches.add_watcher(new_watch, w_first);
                    debug!("moved watcher of {:?} to {new_watch}", self.ca[ck]);
                    continue 'next_watcher;
                }
            }

            // No replacement: the clause is unit or conflicting. It stays
            // watched on l either way.
            watchers[j] = w_first;
            j += 1;
            if !self.enqueue(first, Some(ck)) {
                debug!("conflict on {first} in {:?}", self.ca[ck]);
                conflict = Some(ck);
                self.trail.set_bcp_idx_to_trail_head();
                // Copy remaining watchers over so none are lost.
                while i < n_ws {
                    watchers[j] = watchers[i];
                    i += 1;
                    j += 1;
                }
            }
        }

        // Drop the watchers that moved to other literals.
        watchers.truncate(j);
        self.watches.set_watchers(l, watchers);

        conflict
    }

    /// Conflict analysis (first UIP). Resolves backward over the implication
    /// graph from the conflicting clause, following reason pointers through
    /// the trail, until exactly one literal of the current decision level
    /// remains. Returns the learnt clause (asserting literal first) and the
    /// level to backjump to.
    fn analyze(&mut self, confl: ClauseKey) -> (Vec<Lit>, DecisionLevel) {
        // The literal currently being resolved on.
        let mut a_lit: Option<Lit> = None;
        let mut lits_to_bump = Vec::with_capacity(32);
        self.learnt_lits.clear();
        // Slot 0 is reserved for the asserting literal.
        self.learnt_lits.resize(1, Lit::default());
        self.seen_to_clear.clear();

        let mut trail_idx = self.trail.len() - 1;
        let mut trail_ctr = 0;
        let mut curr_ck = Some(confl);
        let mut rescale_clauses = false;
        loop {
            debug_assert!(curr_ck.is_some());

            let learnt = {
                let c = &self.ca[curr_ck.unwrap()];
                debug!("reason (ctr: {trail_ctr}): {:?}", c);
                debug_assert!(!has_dup(&c.lits));

                self.reason_lits.resize(c.lits.len(), Lit::default());
                self.reason_lits.copy_from_slice(&c.lits);
                c.learnt
            };
            // Bump learnt clauses visited during analysis so they are
            // prioritized by garbage collection.
            if learnt {
                rescale_clauses |= {
                    let c = &mut self.ca[curr_ck.unwrap()];
                    c.bump_activity(self.cla_inc, RESCALE_LIM)
                };
            }

            // The reason projection: the whole clause for the initial
            // conflict, everything but the asserting slot afterwards.
            let s_idx = if a_lit.is_none() { 0 } else { 1 };
            for lit in &self.reason_lits[s_idx..] {
                let var = lit.var();
                let lvl = self.level(var);
                // Skip 0-DL lits; those are permanent facts.
                if lvl > 0 && !self.seen[lit.var_idx()] {
                    self.seen[lit.var_idx()] = true;
                    lits_to_bump.push(*lit);
                    // Current-level lits are resolved away via the trail
                    // walk; everything below lands in the learnt clause.
                    if lvl >= self.decision_level {
                        trail_ctr += 1;
                    } else {
                        self.learnt_lits.push(*lit);
                    }
                }
            }

            // Walk backwards to the most recent marked trail entry; it is the
            // next resolvent.
            while !self.seen[self.trail.get(trail_idx).var_idx()] {
                trail_idx -= 1;
            }
            let p = self.trail.get(trail_idx);
            a_lit = Some(p);
            curr_ck = self.reasons[p.var_idx()].ck;
            self.seen[p.var_idx()] = false;
            trail_ctr -= 1;

            debug_assert!(curr_ck.is_some() || trail_ctr == 0);
            if trail_ctr < 1 {
                debug!("found UIP {}", p);
                break;
            }
        }

        if rescale_clauses {
            self.rescale_clause_activity();
        }
        for lit in lits_to_bump {
            self.bump_lit_activity(lit);
        }

        // The learnt clause asserts the negation of the UIP.
        self.learnt_lits[0] = !a_lit.unwrap();

        // Mark seen vars to be cleared once minimization is done with them.
        for l in &self.learnt_lits {
            self.seen_to_clear.push(l.var());
        }

        let mut lits = mem::take(&mut self.learnt_lits);
        self.minimize_learnt(&mut lits);
        self.learnt_lits = lits;

        // Find the backjump level: 0 for a unit learnt clause, otherwise the
        // highest level among the non-asserting literals. The second slot is
        // swapped to a literal of that level so it gets watched.
        let bt_lvl = if self.learnt_lits.len() == 1 {
            0
        } else {
            let (max_i, max_lvl) = self.learnt_lits[1..]
                .iter()
                .enumerate()
                .max_by(|(_, l1), (_, l2)| self.level(l1.var()).cmp(&self.level(l2.var())))
                .map(|(i, l)| (i + 1, self.level(l.var())))
                .unwrap();
            self.learnt_lits.swap(1, max_i);
            debug_assert!(!has_dup(&self.learnt_lits));
            max_lvl
        };

        for v in &self.seen_to_clear {
            self.seen[*v as usize] = false;
        }
        self.seen_to_clear.clear();

        (self.learnt_lits.clone(), bt_lvl)
    }

    /// Minimizes a learnt clause by filtering redundant literals: a literal
    /// is dropped when its reason clause is subsumed by the rest of the
    /// learnt clause. The asserting slot is never touched.
    fn minimize_learnt(&mut self, lits: &mut Vec<Lit>) {
        let abs_lvls = self.abstract_levels(&lits[1..]);
        let mut j = 1;
        for i in 1..lits.len() {
            let l = lits[i];
            if self.reasons[l.var_idx()].ck.is_none() || !self.is_redundant(l, abs_lvls) {
                lits[j] = l;
                j += 1;
            }
        }
        lits.truncate(j);
    }

    /// Determines whether a literal is redundant, DFS-ing through reason
    /// clauses. Only levels present in the learnt clause may be traversed;
    /// hitting a decision or an outside level makes the literal necessary.
    fn is_redundant(&mut self, l: Lit, abs_lvls: usize) -> bool {
        self.analyze_stack.clear();
        self.analyze_stack.push(l);
        let top = self.seen_to_clear.len();
        while let Some(l) = self.analyze_stack.pop() {
            debug_assert!(self.reasons[l.var_idx()].ck.is_some());
            let ck = self.reasons[l.var_idx()].ck.unwrap();
            self.reason_lits.clear();
            self.reason_lits.extend_from_slice(&self.ca[ck].lits[1..]);
            for i in 0..self.reason_lits.len() {
                let c_lit = self.reason_lits[i];
                let var = c_lit.var();
                let lvl = self.level(var);
                if !self.seen[c_lit.var_idx()] && lvl > 0 {
                    if self.reasons[c_lit.var_idx()].ck.is_some()
                        && (self.abstract_level(var) & abs_lvls) != 0
                    {
                        self.seen[c_lit.var_idx()] = true;
                        self.analyze_stack.push(c_lit);
                        self.seen_to_clear.push(var);
                    } else {
                        // This literal provides information the learnt clause
                        // doesn't already carry; undo the speculative marks.
                        for v in &self.seen_to_clear[top..] {
                            self.seen[*v as usize] = false;
                        }
                        self.seen_to_clear.truncate(top);
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Computes the abstract level for a single variable, a 32-bit coarse
    /// signature of its decision level.
    fn abstract_level(&self, v: Var) -> usize {
        1 << (self.level(v) & 31)
    }

    fn abstract_levels(&self, lits: &[Lit]) -> usize {
        let mut abs_lvl = 0;
        lits.iter()
            .for_each(|l| abs_lvl |= self.abstract_level(l.var()));
        abs_lvl
    }

    /// Decision heuristic: pop the activity heap until an unassigned literal
    /// surfaces. None means every variable is assigned.
    fn pick_branch_lit(&mut self) -> Option<Lit> {
        if let Some(freq) = self.conf.rand_var {
            if rand::thread_rng().gen::<f64>() < freq {
                let v = rand::thread_rng().gen_range(0..self.num_variables() as Var);
                if self.assigned[v as usize] == LBool::Undef {
                    self.stats.rand_decisions += 1;
                    let sign = self.conf.rand_pol && rand::thread_rng().gen_bool(0.5);
                    return Some(Lit::new(v, sign));
                }
            }
        }

        while let Some((lit, _act)) = self.act_heap.pop_with_key() {
            if self.assigned[lit.var_idx()] == LBool::Undef {
                return Some(lit);
            }
        }
        None
    }

    /// Activity bookkeeping.
    ///
    /// Bumps the activity of a literal, rescaling everything once the limit
    /// is crossed, and refreshes the heap priority if the literal is queued.
    fn bump_lit_activity(&mut self, l: Lit) {
        let idx = l.idx();
        self.acts[idx] += self.var_inc;
        if self.acts[idx] >= OrderedFloat(RESCALE_LIM) {
            self.rescale_lit_activity();
        }
        if let Some(mut act) = self.act_heap.get_mut(&l) {
            *act = self.acts[l.idx()];
        }
    }

    /// Rescales all literal activities and the increment back into range,
    /// preserving their relative order, then rebuilds the heap.
    fn rescale_lit_activity(&mut self) {
        debug!("rescaling literal activities by {RESCALE_F}");
        for a in &mut self.acts {
            *a *= RESCALE_F;
        }
        self.var_inc *= RESCALE_F;
        self.rebuild_heap();
    }

    /// Rescales clause activities and the clause increment.
    fn rescale_clause_activity(&mut self) {
        for (_, c) in self.ca.iter_mut() {
            c.act *= RESCALE_F;
        }
        self.cla_inc *= RESCALE_F;
    }

    /// Rebuild the heap from the activity list, keeping only unassigned
    /// literals.
    fn rebuild_heap(&mut self) {
        let n_lits = lits_from_vars(self.num_variables());
        self.act_heap = BinaryHeap::with_capacity(n_lits);
        for idx in 0..n_lits {
            let lit = Lit::from_index(idx);
            if self.assigned[lit.var_idx()] == LBool::Undef {
                self.act_heap.push(lit, self.acts[idx]);
            }
        }
    }

    /// Clause store maintenance.
    ///
    /// Top-level simplification: removes satisfied clauses from both stores
    /// and strips permanently-false literals from the survivors. Only sound
    /// at decision level 0.
    fn simplify_clauses(&mut self) {
        debug_assert!(self.decision_level == 0);
        self.remove_satisfied_learnts();
        if self.conf.remove_satisfied {
            self.remove_satisfied_constraints();
        }
        self.shrink_false_literals();
        self.rebuild_heap();
        debug!(
            "simplified: {} constraints, {} learnts, {} allocated",
            self.clauses.len(),
            self.learnts.len(),
            self.ca.len()
        );
    }

    /// Remove satisfied clauses from the constraint database.
    fn remove_satisfied_constraints(&mut self) {
        let mut j = 0;
        for i in 0..self.clauses.len() {
            let ck = self.clauses[i];
            if self.satisfied(ck) {
                self.detach_and_free(ck);
            } else {
                self.clauses[j] = ck;
                j += 1;
            }
        }
        self.clauses.truncate(j);
    }

    /// Remove satisfied clauses from the learnt clauses database.
    fn remove_satisfied_learnts(&mut self) {
        let mut j = 0;
        for i in 0..self.learnts.len() {
            let ck = self.learnts[i];
            if self.satisfied(ck) {
                self.detach_and_free(ck);
            } else {
                self.learnts[j] = ck;
                j += 1;
            }
        }
        self.learnts.truncate(j);
    }

    /// Drops literals false at level 0 from every stored clause. The watched
    /// slots are left alone: a falsified watcher would already have made the
    /// clause unit or conflicting during propagation.
    fn shrink_false_literals(&mut self) {
        for i in 0..self.clauses.len() {
            self.shrink_clause(self.clauses[i]);
        }
        for i in 0..self.learnts.len() {
            self.shrink_clause(self.learnts[i]);
        }
    }

    fn shrink_clause(&mut self, ck: ClauseKey) {
        debug_assert!(self.value(self.ca[ck][0]) != LBool::False);
        debug_assert!(self.value(self.ca[ck][1]) != LBool::False);
        let mut dropped = 0;
        let mut k = 2;
        while k < self.ca[ck].len() {
            if self.value(self.ca[ck][k]) == LBool::False {
                let c = &mut self.ca[ck];
                c.lits.swap_remove(k);
                dropped += 1;
            } else {
                k += 1;
            }
        }
        if self.ca[ck].learnt {
            self.stats.n_learnt_lits -= dropped;
        } else {
            self.stats.n_clause_lits -= dropped;
        }
    }

    /// Check if a clause is satisfied under the current assignment.
    fn satisfied(&self, ck: ClauseKey) -> bool {
        self.ca[ck].lits.iter().any(|l| self.value(*l) == LBool::True)
    }

    /// Whether the clause is the reason of the assignment it propagated; such
    /// clauses cannot be collected.
    fn locked(&self, ck: ClauseKey) -> bool {
        let c0 = self.ca[ck][0];
        self.reasons[c0.var_idx()].ck == Some(ck)
    }

    /// Unwatches a clause, releases any level-0 reason pointing at it, and
    /// returns its memory to the arena.
    fn detach_and_free(&mut self, ck: ClauseKey) {
        debug!("removing clause {:?}", self.ca[ck]);
        let (c0, c1, c_len, learnt) = {
            let c = &self.ca[ck];
            (c[0], c[1], c.len(), c.learnt)
        };
        self.watches.remove_watcher(!c0, ck);
        self.watches.remove_watcher(!c1, ck);
        debug_assert!(!self.watches.watchers(!c0).iter().any(|w| w.ck == ck));
        debug_assert!(!self.watches.watchers(!c1).iter().any(|w| w.ck == ck));
        // A level-0 implication may still name this clause as its reason.
        // The entry is a permanent fact, so the slot can be cleared.
        if self.reasons[c0.var_idx()].ck == Some(ck) {
            self.reasons[c0.var_idx()].ck = None;
        }
        if learnt {
            self.stats.n_learnts -= 1;
            self.stats.n_learnt_lits -= c_len as u64;
        } else {
            self.stats.n_clauses -= 1;
            self.stats.n_clause_lits -= c_len as u64;
        }
        self.ca.free(ck);
    }

    /// Learnt-clause garbage collection: sorts the learnt store by ascending
    /// activity and drops the lower half, keeping clauses that are locked as
    /// reasons of current assignments.
    fn reduce_learnts(&mut self) {
        let mut learnts = mem::take(&mut self.learnts);
        learnts.sort_by(|c1, c2| {
            let (a1, a2) = (self.ca[*c1].act, self.ca[*c2].act);
            if a1 < a2 {
                Ordering::Less
            } else if a2 < a1 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        });

        let n_to_drop = learnts.len() / 2;
        let mut kept = Vec::with_capacity(learnts.len() - n_to_drop);
        for (i, ck) in learnts.iter().enumerate() {
            if i < n_to_drop && !self.locked(*ck) {
                self.detach_and_free(*ck);
            } else {
                kept.push(*ck);
            }
        }
        debug!(
            "trimmed learnt store from {} to {} clauses",
            n_to_drop + kept.len(),
            kept.len()
        );
        self.learnts = kept;
        self.stats.deletions += 1;
    }

    /// Restart bookkeeping.
    ///
    /// The Luby sequence value for the current restart count.
    fn luby(&self) -> u64 {
        let mut n_restarts = self.stats.starts - 1;
        let (mut sz, mut seq) = (1u64, 0u32);
        while sz < n_restarts + 1 {
            seq += 1;
            sz = 2 * sz + 1;
        }
        while sz - 1 != n_restarts {
            sz = (sz - 1) >> 1;
            seq -= 1;
            n_restarts %= sz;
        }
        1 << seq
    }

    /// Model output.
    ///
    /// Checks that the current assignment satisfies every constraint clause.
    pub fn check_assignment(&self) -> bool {
        self.clauses.iter().all(|ck| self.satisfied(*ck))
    }

    /// Emit assignments back in original DIMACS form.
    pub fn assignments(&self) -> Vec<Lit> {
        let mut model = Vec::with_capacity(self.num_variables());
        for (v, ass) in self.assigned.iter().enumerate() {
            model.push(Lit::new(v as Var, !bool::from(*ass)));
        }
        model
    }

    /// Prints the model as a DIMACS `v` line.
    pub fn print_model(&self) {
        println!("v {} 0", vec_to_str(&self.assignments()));
    }

    /// Prints solver statistics as DIMACS comment lines.
    pub fn print_stats(&self) {
        println!("c restarts       : {}", self.stats.starts);
        println!("c conflicts      : {}", self.stats.conflicts);
        println!(
            "c decisions      : {} ({} random)",
            self.stats.decisions, self.stats.rand_decisions
        );
        println!("c propagations   : {}", self.stats.propagations);
        println!(
            "c clauses        : {} ({} lits)",
            self.stats.n_clauses, self.stats.n_clause_lits
        );
        println!(
            "c learnt clauses : {} ({} lits)",
            self.stats.n_learnts, self.stats.n_learnt_lits
        );
        println!("c learnt units   : {}", self.stats.n_unit_learnts);
        println!("c deletions      : {}", self.stats.deletions);
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::dimacs::parser::DimacsParser;

    fn lit(l: i64) -> Lit {
        Lit::from_dimacs(l)
    }

    fn solver(n_vars: usize) -> CdclSolver {
        CdclSolver::new(SolverConfig::default(), n_vars, 16)
    }

    fn solver_with(n_vars: usize, clauses: &[&[i64]]) -> CdclSolver {
        let mut s = solver(n_vars);
        for c in clauses {
            let lits = c.iter().map(|l| lit(*l)).collect::<Vec<_>>();
            let (ok, _) = s.add_clause(&lits, false);
            assert!(ok);
        }
        s
    }

    fn params() -> SearchParams {
        SearchParams {
            max_conflicts: 100,
            max_learnts: 100,
            var_decay: 0.95,
            clause_decay: 0.999,
        }
    }

    /// No clause may be unit (or false) after a clean propagation pass.
    fn assert_no_unit_clauses(s: &CdclSolver) {
        for ck in s.clauses.iter().chain(s.learnts.iter()) {
            let c = &s.ca[*ck];
            if c.lits.iter().any(|l| s.value(*l) == LBool::True) {
                continue;
            }
            let undef = c
                .lits
                .iter()
                .filter(|l| s.value(**l) == LBool::Undef)
                .count();
            assert!(undef >= 2, "clause {:?} is unit or conflicting", c);
        }
    }

    /// Every stored clause must sit in exactly the watcher lists of its
    /// first two literals' negations.
    fn assert_watcher_invariant(s: &CdclSolver) {
        for ck in s.clauses.iter().chain(s.learnts.iter()) {
            let c = &s.ca[*ck];
            assert!(c.len() >= 2);
            for idx in 0..lits_from_vars(s.num_variables()) {
                let l = Lit::from_index(idx);
                let present = s.watches.watchers(l).iter().filter(|w| w.ck == *ck).count();
                let expected = (l == !c[0]) as usize + (l == !c[1]) as usize;
                assert_eq!(present, expected, "watcher mismatch for {:?} at {}", c, l);
            }
        }
    }

    #[test]
    fn add_clause_empty_is_unsat() {
        let mut s = solver(2);
        assert_eq!(s.add_clause(&[], false), (false, None));
    }

    #[test]
    fn add_clause_unit_enqueues() {
        let mut s = solver(10);
        let (ok, ck) = s.add_clause(&[lit(1)], false);
        assert!(ok);
        assert!(ck.is_none());
        assert!(s.clauses.is_empty());
        assert_eq!(s.value(lit(1)), LBool::True);
        assert_eq!(s.trail.len(), 1);
        assert!(!s.trail.bcp_idx_at_end());
    }

    #[test]
    fn add_clause_conflicting_units_are_unsat() {
        let mut s = solver(2);
        assert!(s.add_clause(&[lit(1)], false).0);
        assert_eq!(s.add_clause(&[lit(-1)], false), (false, None));
    }

    #[test]
    fn add_clause_tautology_and_satisfied_are_dropped() {
        let mut s = solver(3);
        assert_eq!(s.add_clause(&[lit(1), lit(-1)], false), (true, None));
        assert!(s.add_clause(&[lit(2)], false).0);
        assert_eq!(s.add_clause(&[lit(2), lit(3)], false), (true, None));
        assert!(s.clauses.is_empty());
    }

    #[test]
    fn add_clause_installs_watchers() {
        let mut s = solver(10);
        let (ok, ck) = s.add_clause(&[lit(-1), lit(2), lit(3)], false);
        assert!(ok);
        let ck = ck.unwrap();
        assert_eq!(s.clauses.len(), 1);
        // The clause watches its first two literals, so it sits in the
        // watcher lists of their negations.
        for l in [lit(1), lit(-2)] {
            assert_eq!(s.watches.watchers(l).len(), 1);
            assert_eq!(s.watches.watchers(l)[0].ck, ck);
        }
        assert_watcher_invariant(&s);
    }

    #[test]
    fn add_clause_drops_falsified_literals() {
        let mut s = solver(10);
        assert!(s.add_clause(&[lit(1)], false).0);
        let (ok, ck) = s.add_clause(&[lit(-1), lit(2), lit(3)], false);
        assert!(ok);
        // The false literal was stripped on addition.
        assert_eq!(s.ca[ck.unwrap()].lits, vec![lit(2), lit(3)]);
        assert_watcher_invariant(&s);
    }

    #[test]
    fn enqueue_checks_consistency() {
        let mut s = solver(5);
        assert!(s.enqueue(lit(2), None));
        assert_eq!(s.value(lit(2)), LBool::True);
        assert_eq!(s.trail.len(), 1);
        // Re-assignment agrees / disagrees.
        assert!(s.enqueue(lit(2), None));
        assert!(!s.enqueue(lit(-2), None));
        assert_eq!(s.trail.len(), 1);
    }

    #[test]
    fn propagate_implies_from_assumption() {
        let mut s = solver_with(10, &[&[-1, -2], &[2, -3]]);
        s.assume(lit(1));
        assert_eq!(s.propagate(), None);
        assert_eq!(s.value(lit(2)), LBool::False);
        assert_eq!(s.value(lit(3)), LBool::False);
        assert_no_unit_clauses(&s);
        assert_watcher_invariant(&s);
    }

    #[test]
    fn propagate_implies_from_unit() {
        let mut s = solver_with(3, &[&[-1, 2, 3], &[-1, -2]]);
        assert!(s.add_clause(&[lit(1)], false).0);
        assert_eq!(s.propagate(), None);
        assert_eq!(s.value(lit(2)), LBool::False);
        assert_eq!(s.value(lit(3)), LBool::True);
    }

    #[test]
    fn trail_and_assignment_agree_after_propagation() {
        let mut s = solver_with(3, &[&[-1, 2, 3], &[-1, -2]]);
        assert!(s.add_clause(&[lit(1)], false).0);
        assert_eq!(s.propagate(), None);

        // Every trail entry is true, and assigned vars appear exactly once.
        for l in &s.trail.trail {
            assert_eq!(s.value(*l), LBool::True);
        }
        assert_eq!(s.num_assigns(), s.trail.len());
        for v in 0..s.num_variables() {
            let on_trail = s
                .trail
                .trail
                .iter()
                .filter(|l| l.var_idx() == v)
                .count();
            let expected = (s.assigned[v] != LBool::Undef) as usize;
            assert_eq!(on_trail, expected);
        }
    }

    #[test]
    fn analyze_learns_negated_assumption() {
        let mut s = solver_with(10, &[&[-1, -2], &[2, -3], &[-1, 2, 3]]);
        s.assume(lit(1));
        let confl = s.propagate();
        assert!(confl.is_some());

        let (learnt, level) = s.analyze(confl.unwrap());
        assert_eq!(learnt, vec![lit(-1)]);
        assert_eq!(level, 0);
        // Soundness: at production time every learnt literal is false, and
        // the asserting literal sits at the current decision level.
        for l in &learnt {
            assert_eq!(s.value(*l), LBool::False);
        }
        assert_eq!(s.level(learnt[0].var()), s.decision_level);
    }

    #[test]
    fn assume_cancel_round_trip_restores_state() {
        let mut s = solver_with(4, &[&[-1, 2], &[-2, 3]]);
        assert_eq!(s.propagate(), None);

        let trail = s.trail.trail.clone();
        let delims = s.trail.dl_delim_idxs.clone();
        let bcp_idx = s.trail.bcp_idx;
        let assigned = s.assigned.clone();
        let reasons = s.reasons.clone();
        let dl = s.decision_level;

        s.assume(lit(1));
        assert_eq!(s.propagate(), None);
        assert_eq!(s.value(lit(3)), LBool::True);
        s.backtrack(0);

        assert_eq!(s.trail.trail, trail);
        assert_eq!(s.trail.dl_delim_idxs, delims);
        assert_eq!(s.trail.bcp_idx, bcp_idx);
        assert_eq!(s.assigned, assigned);
        assert_eq!(s.reasons, reasons);
        assert_eq!(s.decision_level, dl);
    }

    #[test]
    fn search_refutes_the_square() {
        let mut s = solver_with(10, &[&[1, 2], &[-1, 2], &[-1, -2], &[1, -2]]);
        assert_eq!(s.search(&params()), SolveStatus::Unsat);
    }

    #[test]
    fn search_satisfies_single_unit() {
        let mut s = solver(1);
        assert!(s.add_clause(&[lit(1)], false).0);
        assert_eq!(s.search(&params()), SolveStatus::Sat);
        assert_eq!(s.assignments(), vec![lit(1)]);
        assert!(s.check_assignment());
    }

    #[test]
    fn search_finds_the_unique_model() {
        let mut s = solver_with(3, &[&[1], &[-1, 2], &[-2, 3]]);
        assert_eq!(s.search(&params()), SolveStatus::Sat);
        assert_eq!(s.assignments(), vec![lit(1), lit(2), lit(3)]);
        assert!(s.check_assignment());
    }

    #[test]
    fn search_respects_conflict_budget() {
        let mut s = solver_with(2, &[&[1, 2], &[-1, 2]]);
        let p = SearchParams {
            max_conflicts: 0,
            ..params()
        };
        assert_eq!(s.search(&p), SolveStatus::Unknown);
        assert_eq!(s.decision_level(), 0);
        assert_eq!(s.trail.len(), 0);
    }

    #[test]
    fn solve_decides_after_restarts() {
        let mut s = solver_with(2, &[&[1, 2], &[-1, 2]]);
        s.conf.restart_policy = RestartPolicy::Geometric {
            init: 1,
            growth: 1.1,
        };
        let res = s.solve();
        assert_eq!(res.status, SolveStatus::Sat);
        assert!(s.check_assignment());
    }

    #[test]
    fn solve_refutes_pigeonhole() {
        // Three pigeons, two holes; var 2*(i-1)+j means pigeon i sits in
        // hole j.
        let mut clauses: Vec<Vec<i64>> = vec![vec![1, 2], vec![3, 4], vec![5, 6]];
        for hole in [1i64, 2] {
            let in_hole = [hole, hole + 2, hole + 4];
            for a in 0..3 {
                for b in (a + 1)..3 {
                    clauses.push(vec![-in_hole[a], -in_hole[b]]);
                }
            }
        }
        let refs = clauses.iter().map(|c| c.as_slice()).collect::<Vec<_>>();
        let mut s = solver_with(6, &refs);
        let res = s.solve();
        assert_eq!(res.status, SolveStatus::Unsat);
    }

    #[test]
    fn luby_restarts_also_terminate() {
        let mut s = solver_with(10, &[&[1, 2], &[-1, 2], &[-1, -2], &[1, -2]]);
        s.conf.restart_policy = RestartPolicy::Luby { unit: 1 };
        assert_eq!(s.solve().status, SolveStatus::Unsat);
    }

    #[test]
    fn heap_pops_highest_activity_literal_first() {
        let mut s = solver(3);
        for _ in 0..3 {
            s.bump_lit_activity(lit(-3));
        }
        for _ in 0..2 {
            s.bump_lit_activity(lit(2));
        }
        s.bump_lit_activity(lit(1));

        assert_eq!(s.pick_branch_lit(), Some(lit(-3)));
        s.assume(lit(-3));
        assert_eq!(s.pick_branch_lit(), Some(lit(2)));
    }

    #[test]
    fn rescaling_preserves_decision_order() {
        let mut s = solver(3);
        s.bump_lit_activity(lit(2));
        s.bump_lit_activity(lit(2));
        s.acts[lit(-3).idx()] = OrderedFloat(RESCALE_LIM);
        s.bump_lit_activity(lit(-3));
        // The bump above crossed the limit and rescaled everything back into
        // range without reordering.
        assert!(s.acts[lit(-3).idx()] < OrderedFloat(RESCALE_LIM));
        assert!(s.acts[lit(-3).idx()] > s.acts[lit(2).idx()]);
        assert!(s.acts[lit(2).idx()] > s.acts[lit(1).idx()]);
        assert!(s.var_inc < 1.);

        assert_eq!(s.pick_branch_lit(), Some(lit(-3)));
        s.assume(lit(-3));
        assert_eq!(s.pick_branch_lit(), Some(lit(2)));
    }

    #[test]
    fn reduce_learnts_keeps_upper_activity_half() {
        let mut s = solver(3);
        let mut cks = vec![];
        for act in [3., 1., 2., 4.] {
            let (ok, ck) = s.add_clause(&[lit(1), lit(2), lit(3)], true);
            assert!(ok);
            let ck = ck.unwrap();
            s.ca[ck].act = act;
            cks.push(ck);
        }
        s.reduce_learnts();
        assert_eq!(s.learnts.len(), 2);
        assert!(s.learnts.contains(&cks[0]));
        assert!(s.learnts.contains(&cks[3]));
        assert_watcher_invariant(&s);
    }

    #[test]
    fn reduce_learnts_spares_locked_reasons() {
        let mut s = solver(4);
        let (_, locked_ck) = s.add_clause(&[lit(-1), lit(2)], true);
        let locked_ck = locked_ck.unwrap();
        for act in [1., 2., 3.] {
            let (_, ck) = s.add_clause(&[lit(2), lit(3), lit(4)], true);
            s.ca[ck.unwrap()].act = act;
        }

        s.assume(lit(1));
        assert_eq!(s.propagate(), None);
        assert!(s.locked(locked_ck));

        s.reduce_learnts();
        // The locked clause has the lowest activity but survives; the next
        // lowest is collected instead.
        assert_eq!(s.learnts.len(), 3);
        assert!(s.learnts.contains(&locked_ck));
    }

    #[test]
    fn simplify_drops_satisfied_and_false_literals() {
        let mut s = solver(4);
        let (_, kept) = s.add_clause(&[lit(2), lit(3), lit(-1)], false);
        let kept = kept.unwrap();
        assert!(s.add_clause(&[lit(1), lit(4)], false).0);
        assert!(s.add_clause(&[lit(1)], false).0);
        assert_eq!(s.propagate(), None);

        s.simplify_clauses();
        // [1, 4] was satisfied by the unit; the kept clause lost its false
        // literal.
        assert_eq!(s.clauses, vec![kept]);
        assert_eq!(s.ca[kept].len(), 2);
        assert!(s.watches.watchers(lit(-1)).is_empty());
        assert!(s.watches.watchers(lit(-4)).is_empty());
        assert_watcher_invariant(&s);
    }

    #[test]
    fn dimacs_unsat_round_trip() {
        let input = "c the four-clause square\np cnf 2 4\n1 2 0\n-1 2 0\n-1 -2 0\n1 -2 0\n";
        let instance = DimacsParser::parse_reader(Cursor::new(input)).unwrap();
        let (mut s, status) = CdclSolver::from_instance(SolverConfig::default(), &instance);
        assert_eq!(status, SolveStatus::Unknown);
        assert_eq!(s.solve().status, SolveStatus::Unsat);
    }

    #[test]
    fn dimacs_sat_round_trip_emits_the_model() {
        let input = "p cnf 3 3\n1 0\n-1 2 0\n-2 3 0\n";
        let instance = DimacsParser::parse_reader(Cursor::new(input)).unwrap();
        let (mut s, status) = CdclSolver::from_instance(SolverConfig::default(), &instance);
        assert_eq!(status, SolveStatus::Unknown);
        let res = s.solve();
        assert_eq!(res.status, SolveStatus::Sat);
        assert_eq!(res.assignments, vec![lit(1), lit(2), lit(3)]);
    }

    #[test]
    fn trivially_unsat_instance_is_caught_on_construction() {
        let input = "p cnf 1 2\n1 0\n-1 0\n";
        let instance = DimacsParser::parse_reader(Cursor::new(input)).unwrap();
        let (_, status) = CdclSolver::from_instance(SolverConfig::default(), &instance);
        assert_eq!(status, SolveStatus::Unsat);
    }
}
