use std::fmt::Debug;

use fxhash::FxHashSet;

/// A parsed DIMACS CNF formula. Literals stay in their signed integer form;
/// the solver converts them on addition.
#[derive(Clone)]
pub struct SatInstance {
    pub n_vars: usize,
    pub n_clauses: usize,
    pub clauses: Vec<Clause>,
    // (Positive) set of all variables that actually occur in the instance
    pub vars: FxHashSet<Variable>,
}

impl Debug for SatInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "n_vars: {}\tn_clauses: {}", self.n_vars, self.n_clauses)?;
        for c in &self.clauses {
            write!(f, "Clause:")?;
            for l in &c.lits {
                write!(f, " {l}")?;
            }
            writeln!(f)?;
        }
        writeln!(f)
    }
}

#[derive(Clone)]
pub struct Clause {
    pub lits: Vec<Literal>,
}

pub type Literal = i64;
pub type Variable = i64;
