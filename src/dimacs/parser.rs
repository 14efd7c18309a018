use anyhow::{Context, Result};
use fxhash::FxHashSet;
use log::debug;
use std::{
    fs::File,
    io::{BufRead, BufReader, Error, ErrorKind},
    path::Path,
};

use super::sat_instance::{Clause, SatInstance};

pub struct DimacsParser {
    file: File,
}

impl DimacsParser {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<DimacsParser> {
        let file = File::open(path)?;
        Ok(Self { file })
    }

    // Parses the file provided during construction into a SAT instance.
    pub fn parse(self) -> Result<SatInstance> {
        Self::parse_reader(BufReader::new(self.file))
    }

    /// Parses DIMACS CNF from any buffered reader: comment lines, one
    /// `p cnf <vars> <clauses>` problem line, then clause lines. A clause is
    /// terminated by the first `0` on its line; anything after it is ignored.
    pub fn parse_reader<R: BufRead>(reader: R) -> Result<SatInstance> {
        let mut lines = reader.lines();
        let mut line = loop {
            let l = lines
                .next()
                .ok_or_else(|| Error::from(ErrorKind::UnexpectedEof))
                .context("DIMACS file has no problem line")??;
            if !l.starts_with('c') && !l.trim().is_empty() {
                break l;
            }
        };
        // Line now has the problem line; read it
        let tokens = line.split_whitespace().collect::<Vec<_>>();
        if tokens.len() != 4 || tokens[0] != "p" {
            return Err(Error::from(ErrorKind::InvalidInput))
                .context("DIMACS file does not have a well-formed problem line");
        }
        if tokens[1] != "cnf" {
            return Err(Error::from(ErrorKind::InvalidInput))
                .context("DIMACS file format is not cnf");
        }
        // Parse variable and clause counts
        let n_vars = tokens[2].parse::<usize>().context("nVars is not a count")?;
        let n_clauses = tokens[3]
            .parse::<usize>()
            .context("nClauses is not a count")?;

        let mut sat_instance = SatInstance {
            n_vars,
            n_clauses,
            clauses: Vec::with_capacity(n_clauses),
            vars: FxHashSet::default(),
        };
        // Parse clauses
        for next in lines {
            line = next?;
            let tokens = line.split_whitespace().collect::<Vec<_>>();
            // Skip comments and blank lines
            if tokens.is_empty() || tokens[0].starts_with('c') {
                continue;
            }

            let mut lits = vec![];
            let mut terminated = false;
            for tok in &tokens {
                let l = tok
                    .parse::<i64>()
                    .with_context(|| format!("clause literal {tok} is not an integer"))?;
                if l == 0 {
                    terminated = true;
                    break;
                }
                if l.unsigned_abs() as usize > n_vars {
                    return Err(Error::from(ErrorKind::InvalidInput))
                        .with_context(|| format!("literal {l} is out of range [1, {n_vars}]"));
                }
                sat_instance.vars.insert(l.abs());
                lits.push(l);
            }
            if !terminated {
                return Err(Error::from(ErrorKind::InvalidInput))
                    .with_context(|| format!("clause line '{}' is not 0-terminated", line));
            }
            sat_instance.clauses.push(Clause { lits });
        }

        debug!("{:#?}", &sat_instance);

        Ok(sat_instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(s: &str) -> Result<SatInstance> {
        DimacsParser::parse_reader(Cursor::new(s.to_string()))
    }

    #[test]
    fn parses_a_simple_formula() {
        let inst = parse("c hello\nc world\np cnf 3 2\n1 -2 0\n2 3 0\n").unwrap();
        assert_eq!(inst.n_vars, 3);
        assert_eq!(inst.n_clauses, 2);
        assert_eq!(inst.clauses.len(), 2);
        assert_eq!(inst.clauses[0].lits, vec![1, -2]);
        assert_eq!(inst.clauses[1].lits, vec![2, 3]);
        assert_eq!(inst.vars.len(), 3);
    }

    #[test]
    fn clause_ends_at_first_zero() {
        let inst = parse("p cnf 2 1\n1 0 -2 0\n").unwrap();
        assert_eq!(inst.clauses.len(), 1);
        assert_eq!(inst.clauses[0].lits, vec![1]);
    }

    #[test]
    fn skips_interleaved_comments() {
        let inst = parse("p cnf 2 2\nc between\n1 2 0\n\n-1 0\n").unwrap();
        assert_eq!(inst.clauses.len(), 2);
    }

    #[test]
    fn rejects_missing_problem_line() {
        assert!(parse("1 2 0\n").is_err());
        assert!(parse("c only comments\n").is_err());
    }

    #[test]
    fn rejects_non_cnf_format() {
        assert!(parse("p sat 3 2\n1 2 0\n").is_err());
    }

    #[test]
    fn rejects_out_of_range_literals() {
        assert!(parse("p cnf 2 1\n1 -3 0\n").is_err());
    }

    #[test]
    fn rejects_unterminated_clause() {
        assert!(parse("p cnf 2 1\n1 2\n").is_err());
    }

    #[test]
    fn rejects_non_integer_literals() {
        assert!(parse("p cnf 2 1\n1 x 0\n").is_err());
    }
}
