// Restart policy configs.
pub const GEOMETRIC_DEFAULT: RestartPolicy = RestartPolicy::Geometric {
    init: 100,
    growth: 1.1,
};
pub const LUBY_DEFAULT: RestartPolicy = RestartPolicy::Luby { unit: 256 };

// Learnt-store budget: initial fraction of the constraint count, and growth
// per restart.
pub const MAX_LEARNT_F_DEFAULT: f64 = 1.0 / 3.0;
pub const LEARNT_GROWTH_DEFAULT: f64 = 1.5;

// Activity decays (the increment is divided by these after every conflict).
pub const VAR_DECAY_DEFAULT: f64 = 0.95;
pub const CLAUSE_DECAY_DEFAULT: f64 = 0.999;

// Rescale every activity once any of them crosses the limit.
pub const RESCALE_LIM: f64 = 1e100;
pub const RESCALE_F: f64 = 1e-100;

pub struct SolverConfig {
    /// Initial scaling factor for max learnt clauses relative to # clauses
    pub max_learnt_f: f64,
    /// Growth factor for the learnt budget on each restart
    pub learnt_growth: f64,

    /// Whether to remove satisfied constraint clauses at top level
    pub remove_satisfied: bool,

    /// Restart policy
    pub restart_policy: RestartPolicy,

    /// Activity decays for literals and learnt clauses
    pub var_decay: f64,
    pub clause_decay: f64,

    /// Whether to randomly decide literals (and with what frequency), and
    /// whether such decisions also randomize polarity
    pub rand_var: Option<f64>,
    pub rand_pol: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_learnt_f: MAX_LEARNT_F_DEFAULT,
            learnt_growth: LEARNT_GROWTH_DEFAULT,
            remove_satisfied: true,
            restart_policy: GEOMETRIC_DEFAULT,
            var_decay: VAR_DECAY_DEFAULT,
            clause_decay: CLAUSE_DECAY_DEFAULT,
            rand_var: None,
            rand_pol: false,
        }
    }
}

// Config options for the restart policy.
#[derive(Clone, Copy, Debug)]
pub enum RestartPolicy {
    /// Fixed starting conflict budget, multiplied by `growth` per restart.
    Geometric { init: u64, growth: f64 },
    /// Conflict budget follows the Luby sequence scaled by `unit`.
    Luby { unit: u64 },
}

/// Budgets and decays for a single Search call. Grown by the restart loop on
/// every UNKNOWN return.
#[derive(Clone, Copy, Debug)]
pub struct SearchParams {
    /// Conflict budget; exceeding it cancels to level 0 and returns UNKNOWN.
    pub max_conflicts: u64,
    /// Learnt-store size that triggers a trim.
    pub max_learnts: usize,
    pub var_decay: f64,
    pub clause_decay: f64,
}

impl SearchParams {
    pub fn initial(conf: &SolverConfig, n_clauses: usize) -> Self {
        let max_conflicts = match conf.restart_policy {
            RestartPolicy::Geometric { init, .. } => init,
            RestartPolicy::Luby { unit } => unit,
        };
        Self {
            max_conflicts,
            max_learnts: (n_clauses as f64 * conf.max_learnt_f) as usize,
            var_decay: conf.var_decay,
            clause_decay: conf.clause_decay,
        }
    }
}
