extern crate bddsat;

use std::{env, process};

use bddsat::{
    instance::*,
    solver::{Instance, Reducer},
};
use itertools::Itertools;

/// Cell `(row, col)` is variable `row * n + col`.
fn queens(n: usize) -> Formula {
    let cell = |row: usize, col: usize| Variable((row * n + col) as u64);
    let mut formula = Formula::new(n * n);

    // At least one queen per row
    for row in 0..n {
        let literals = (0..n).map(|col| Literal::new(cell(row, col), true)).collect_vec();
        formula.add_clause(&literals);
    }

    // No two queens attack each other
    let cells = (0..n).cartesian_product(0..n).collect_vec();
    for (&(r1, c1), &(r2, c2)) in cells.iter().tuple_combinations() {
        let attacks = r1 == r2 || c1 == c2 || r1.abs_diff(r2) == c1.abs_diff(c2);
        if attacks {
            formula.add_clause(&[
                Literal::new(cell(r1, c1), false),
                Literal::new(cell(r2, c2), false),
            ]);
        }
    }
    formula
}

fn main() {
    env_logger::init();
    let n = match env::args().nth(1).map(|arg| arg.parse::<usize>()) {
        None => 8,
        Some(Ok(n)) => n,
        Some(Err(_)) => {
            eprintln!("n_queens [board size]");
            process::exit(1);
        }
    };

    let mut instance = Instance::new(queens(n));
    match instance.solve() {
        Ok(solution) => {
            let mut reducer = Reducer::default();
            println!("{} queens: {} placements", n, solution.count());
            println!(
                "diagram: {} nodes, {} after reduction",
                solution.decompose().len(),
                solution.reduce(&mut reducer)
            );
            println!("{:?}", solution.stats());
        }
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}
