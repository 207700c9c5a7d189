use num_bigint::BigUint;
use num_traits::{One, Zero};

/// The running number of satisfying assignments found. It stays exact unless the search is
/// interrupted, in which case it is a lower bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionCounter {
    total: BigUint,
    exact: bool,
}

impl Default for SolutionCounter {
    fn default() -> Self {
        SolutionCounter {
            total: BigUint::zero(),
            exact: true,
        }
    }
}

impl SolutionCounter {
    pub fn new() -> SolutionCounter {
        SolutionCounter::default()
    }

    pub(crate) fn add_one(&mut self) {
        self.total += BigUint::one();
    }

    pub(crate) fn add(&mut self, solutions: &BigUint) {
        self.total += solutions;
    }

    pub(crate) fn mark_inexact(&mut self) {
        self.exact = false;
    }

    pub fn value(&self) -> &BigUint {
        &self.total
    }

    pub fn is_exact(&self) -> bool {
        self.exact
    }
}
