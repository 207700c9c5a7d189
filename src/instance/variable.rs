use std::fmt;

/// Variables are identified by their position in the fixed variable order. DIMACS variable `k`
/// is `Variable(k - 1)`.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Variable(pub u64);

impl Variable {
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(ix: usize) -> Variable {
        Variable(ix as u64)
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}
