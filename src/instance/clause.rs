use core::fmt;
use std::hash::Hasher;

use super::Literal;

/// An input clause. Literals are kept sorted by variable so the span of a clause in the
/// variable order is its first and last literal.
#[derive(Clone, Eq, Ord)]
pub struct Clause {
    id: usize,
    literals: Vec<Literal>,
}

impl std::hash::Hash for Clause {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::cmp::PartialEq for Clause {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl std::cmp::PartialOrd for Clause {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Clause {
    pub fn new(lits: &[Literal]) -> Clause {
        Self::new_with_id(0, lits)
    }

    pub fn new_with_id(ix: usize, lits: &[Literal]) -> Clause {
        let mut literals = lits.to_vec();
        literals.sort_by_key(|l| (l.var(), l.polarity()));
        Clause { id: ix, literals }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn len(&self) -> usize {
        self.literals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.literals.is_empty()
    }

    pub fn is_unit(&self) -> bool {
        self.len() == 1
    }

    pub fn literals(&self) -> &[Literal] {
        &self.literals
    }

    /// True when the clause contains both polarities of some variable.
    pub fn is_tautology(&self) -> bool {
        self.literals
            .windows(2)
            .any(|pair| pair[0] == pair[1].invert())
    }

    /// Evaluates the clause under a complete assignment indexed by variable.
    pub fn evaluate(&self, assignment: &[bool]) -> bool {
        self.literals
            .iter()
            .any(|l| l.evaluate(assignment[l.var().index()]))
    }
}

impl fmt::Debug for Clause {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut fst = true;
        for &lit in &self.literals {
            if !fst {
                write!(f, ", ")?;
            }
            fst = false;
            write!(f, "{:?}", lit)?;
        }
        Ok(())
    }
}
