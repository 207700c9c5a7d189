use super::{Clause, Literal};

/// A CNF formula over the variables `0..variable_count`. The variable order used by the solver
/// and by the diagram it builds is the index order.
#[derive(Clone, Debug, Default)]
pub struct Formula {
    variable_count: usize,
    clauses: Vec<Clause>,
}

impl Formula {
    pub fn new(variable_count: usize) -> Formula {
        Formula {
            variable_count,
            clauses: vec![],
        }
    }

    /// Builds a formula from signed DIMACS clauses. The variable count grows to cover any
    /// variable mentioned.
    pub fn from_dimacs(variable_count: usize, clauses: &[Vec<i64>]) -> Formula {
        let mut formula = Formula::new(variable_count);
        for clause in clauses {
            let literals: Vec<Literal> = clause
                .iter()
                .filter_map(|&v| Literal::from_dimacs(v))
                .collect();
            formula.add_clause(&literals);
        }
        formula
    }

    pub fn add_clause(&mut self, literals: &[Literal]) {
        if let Some(max) = literals.iter().map(|l| l.var().index() + 1).max() {
            self.variable_count = self.variable_count.max(max);
        }
        let id = self.clauses.len();
        self.clauses.push(Clause::new_with_id(id, literals));
    }

    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Evaluates the formula under a complete assignment indexed by variable.
    pub fn evaluate(&self, assignment: &[bool]) -> bool {
        self.clauses.iter().all(|c| c.evaluate(assignment))
    }
}
