#[derive(Clone, Debug, Default)]
pub struct RuntimeStats {
    /// Record total (i.e. monotonically increasing) number of:
    /// - starts: number of (re)starts.
    /// - decisions: number of assumptions made.
    /// - rand_decisions: number of random decisions made.
    /// - propagations: number of propagations made.
    /// - conflicts: number of conflicts that occur.
    /// - deletions: number of learnt-store trims performed.
    pub starts: u64,
    pub decisions: u64,
    pub rand_decisions: u64,
    pub propagations: u64,
    pub conflicts: u64,
    pub deletions: u64,

    /// Record current values of:
    /// - n_clauses: num og constraint clauses
    /// - n_clause_lits: num lits in constraint clauses
    /// - n_learnts: num learnt clauses
    /// - n_learnt_lits: num lits in learnt clauses
    /// - n_unit_learnts: num learnt clauses that were unit (asserted at level 0)
    pub n_clauses: u64,
    pub n_clause_lits: u64,
    pub n_learnts: u64,
    pub n_learnt_lits: u64,
    pub n_unit_learnts: u64,
}
