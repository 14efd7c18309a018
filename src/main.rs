use anyhow::Result;
use clap::Parser;
use log::info;

mod dimacs;
mod solver;

use dimacs::parser::DimacsParser;
use solver::{
    cdcl_solver::CdclSolver,
    config::{RestartPolicy, SolverConfig, LUBY_DEFAULT},
    types::SolveStatus,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// File path of the DIMACS CNF instance to solve
    pub path: String,

    /// Use Luby restarts instead of geometric budget growth
    #[arg(short, long)]
    pub luby: bool,

    /// Frequency of random branch decisions (0 disables them)
    #[arg(long, default_value_t = 0.0)]
    pub rand_var: f64,

    /// Whether to randomize the polarity of random decisions
    #[arg(long)]
    pub rand_pol: bool,

    /// Keep satisfied problem clauses during top-level simplification
    #[arg(long)]
    pub keep_satisfied: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::builder()
        .filter(None, log::LevelFilter::Info)
        .parse_default_env()
        .init();

    // Get instance
    let instance = DimacsParser::new(&args.path)?.parse()?;
    info!(
        "parsed {} ({} vars, {} distinct, {} clauses)",
        args.path,
        instance.n_vars,
        instance.vars.len(),
        instance.n_clauses
    );

    let mut cfg = SolverConfig::default();
    if args.luby {
        cfg.restart_policy = LUBY_DEFAULT;
    }
    cfg.rand_var = (args.rand_var > 0.).then_some(args.rand_var);
    cfg.rand_pol = args.rand_pol;
    cfg.remove_satisfied = !args.keep_satisfied;
    if let RestartPolicy::Geometric { init, .. } = cfg.restart_policy {
        info!("starting with a budget of {init} conflicts");
    }

    let (mut solver, status) = CdclSolver::from_instance(cfg, &instance);
    info!(
        "solver holds {} clauses over {} variables",
        solver.num_clauses(),
        solver.num_variables()
    );
    if status == SolveStatus::Unsat {
        // Clause addition already refuted the formula.
        println!("s UNSATISFIABLE");
        solver.print_stats();
        return Ok(());
    }

    let res = solver.solve();
    match res.status {
        SolveStatus::Sat => {
            println!("s SATISFIABLE");
            solver.print_model();
        }
        SolveStatus::Unsat => println!("s UNSATISFIABLE"),
        SolveStatus::Unknown => panic!("solver should never return UNKNOWN from solve"),
    }
    solver.print_stats();
    info!("solved {} ({}) in {:#?}", args.path, res.status, res.elapsed);

    Ok(())
}
