use std::fmt::Display;
use std::ops::{BitXor, Not, Shr};
use std::time::Duration;

use ordered_float::OrderedFloat;

/// Representation for decision levels so I'm consistent
pub type DecisionLevel = u32;

/// Let us use f64s as Ord
pub type F64 = OrderedFloat<f64>;

/// Representation of a variable. Variables are 0-based internally; DIMACS
/// numbering is 1-based and converted at the edges.
pub type Var = i64;

/// How to compute n lits from v vars? Given v vars, n = v * 2. This works for
/// indexing, since our first variable starts at 0.
pub fn lits_from_vars(n_vars: usize) -> usize {
    n_vars * 2
}

/// Representation of a literal, using the MiniSat convention: lit.v = 2 * var + sign
#[derive(Hash, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Lit {
    pub v: i64,
}

// Custom marker for Lits; since we scale the literals up, and thus use no
// negatives, there should be no conflicts here.
pub const L_UNDEF: Lit = Lit { v: -2 };

impl Lit {
    // Here, a TRUE sign == NEGATIVE
    pub fn new(v: Var, sign: bool) -> Lit {
        Lit {
            v: v + v + (sign as i64),
        }
    }

    /// Builds a literal back from its per-literal array index.
    pub fn from_index(idx: usize) -> Lit {
        Lit { v: idx as i64 }
    }

    /// Converts a signed DIMACS integer (magnitude >= 1) into a literal.
    pub fn from_dimacs(l: i64) -> Lit {
        Lit::new(l.abs() - 1, l < 0)
    }

    /// The signed DIMACS integer for this literal.
    pub fn to_dimacs(self) -> i64 {
        let v = self.var() + 1;
        if self.sign() {
            -v
        } else {
            v
        }
    }

    // Returns true if sign is negative.
    pub fn sign(&self) -> bool {
        self.v & 1 != 0
    }

    pub fn var(&self) -> Var {
        self.v.shr(1)
    }

    // Variable, but cast as usize to index
    pub fn var_idx(&self) -> usize {
        self.v.shr(1) as usize
    }

    // Get v as an index
    #[inline(always)]
    pub fn idx(&self) -> usize {
        self.v as usize
    }
}

impl Not for Lit {
    type Output = Self;
    fn not(self) -> Lit {
        Self { v: self.v ^ 1 }
    }
}

impl Display for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_dimacs())
    }
}

// Represent false, true, or UNDEF (i.e. not yet assigned). We prefer this over
// an Option<bool>, since we only really have 3 values (i.e. u8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LBool {
    True = 0,
    False = 1,
    Undef = 2,
}

impl LBool {
    pub fn from_sign(s: bool) -> LBool {
        LBool::from(!s as u8)
    }
}

impl From<LBool> for bool {
    #[inline(always)]
    fn from(value: LBool) -> Self {
        matches!(value, LBool::True)
    }
}

impl From<u8> for LBool {
    #[inline(always)]
    fn from(value: u8) -> Self {
        match value {
            0 => Self::True,
            1 => Self::False,
            _ => Self::Undef,
        }
    }
}

impl Default for LBool {
    fn default() -> Self {
        Self::Undef
    }
}

impl BitXor for LBool {
    type Output = Self;
    fn bitxor(self, rhs: Self) -> LBool {
        LBool::from((self as u8).bitxor(rhs as u8))
    }
}

// Status markers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    Unknown,
    Sat,
    Unsat,
}

impl Display for SolveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveStatus::Unknown => write!(f, "UNKNOWN"),
            SolveStatus::Sat => write!(f, "SATISFIABLE"),
            SolveStatus::Unsat => write!(f, "UNSATISFIABLE"),
        }
    }
}

/// The outcome of a full solve: final status, wall time, and (when
/// satisfiable) the model in DIMACS form.
pub struct SolveResult {
    pub status: SolveStatus,
    pub elapsed: Duration,
    pub assignments: Vec<Lit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lit_encoding() {
        let l = Lit::from_dimacs(1);
        assert_eq!(l.var(), 0);
        assert!(!l.sign());
        assert_eq!(l.idx(), 0);

        let l = Lit::from_dimacs(-1);
        assert_eq!(l.var(), 0);
        assert!(l.sign());
        assert_eq!(l.idx(), 1);

        let l = Lit::from_dimacs(3);
        assert_eq!(l.var(), 2);
        assert_eq!(l.idx(), 4);
        assert_eq!((!l).idx(), 5);
        assert_eq!(!!l, l);
    }

    #[test]
    fn lit_dimacs_round_trip() {
        for i in [1i64, -1, 2, -2, 7, -7] {
            assert_eq!(Lit::from_dimacs(i).to_dimacs(), i);
            assert_eq!(Lit::from_dimacs(i).to_string(), i.to_string());
        }
    }

    #[test]
    fn lbool_xor_gives_literal_value() {
        // Assignment xor sign yields the literal's value; Undef absorbs.
        assert_eq!(LBool::True ^ LBool::from(false as u8), LBool::True);
        assert_eq!(LBool::True ^ LBool::from(true as u8), LBool::False);
        assert_eq!(LBool::Undef ^ LBool::from(true as u8), LBool::Undef);
    }
}
