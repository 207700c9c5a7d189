extern crate bddsat;

use std::{env, io, process};

use bddsat::{
    dimacs,
    solver::{Instance, Outcome, SignatureKind, SolutionMode, SolveError, SolverConfig},
};
use thiserror::Error;

#[derive(Error, Debug)]
enum Error {
    #[error("failed to parse input")]
    ParsingError(#[from] dimacs::DimacsError),
    #[error("search failed")]
    SolveError(#[from] SolveError),
    #[error("failed to write output")]
    IO(#[from] io::Error),
    #[error("usage: count_dimacs [--blocking] [--cutset] [--max-nodes N] [--decompose] <problem file>")]
    Usage,
}

struct Options {
    path: String,
    config: SolverConfig,
    decompose: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Options, Error> {
    let mut config = SolverConfig::default();
    let mut decompose = false;
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--blocking" => config.mode = SolutionMode::Blocking,
            "--cutset" => config.signature = SignatureKind::Cutset,
            "--decompose" => decompose = true,
            "--max-nodes" => {
                let n = args.next().and_then(|n| n.parse().ok()).ok_or(Error::Usage)?;
                config.max_nodes = Some(n);
            }
            _ if path.is_none() && !arg.starts_with("--") => path = Some(arg),
            _ => return Err(Error::Usage),
        }
    }
    Ok(Options {
        path: path.ok_or(Error::Usage)?,
        config,
        decompose,
    })
}

fn main() {
    env_logger::init();
    match parse_args(env::args().skip(1)).and_then(run) {
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
        Ok(Outcome::TriviallyUnsatisfiable) => process::exit(20),
        Ok(_) => {}
    }
}

fn run(options: Options) -> Result<Outcome, Error> {
    let formula = dimacs::parse(&options.path)?;
    eprintln!(
        "c {} variables, {} clauses",
        formula.variable_count(),
        formula.clauses().len()
    );

    let mut instance = Instance::with_config(formula, options.config);
    let solution = instance.solve()?;
    match solution.outcome() {
        Outcome::TriviallyUnsatisfiable => println!("s UNSATISFIABLE (trivial)"),
        Outcome::Unsatisfiable => println!("s UNSATISFIABLE"),
        Outcome::Satisfiable => println!("s SATISFIABLE"),
        Outcome::Interrupted => println!("s UNKNOWN"),
    }
    println!("c solutions {}", solution.count());
    println!("c stats {:?}", solution.stats());
    if options.decompose {
        solution.write_decomposition(&mut io::stdout().lock())?;
    }
    Ok(solution.outcome())
}
