use crate::instance::*;
use core::fmt;

/// The current partial assignment, indexed densely by variable.
#[derive(Clone)]
pub(crate) struct Assignment {
    values: Vec<Option<bool>>,
    assigned: usize,
}

impl Assignment {
    pub(crate) fn new(variable_count: usize) -> Assignment {
        Assignment {
            values: vec![None; variable_count],
            assigned: 0,
        }
    }

    pub(crate) fn add(&mut self, lit: Literal) {
        let slot = &mut self.values[lit.var().index()];
        if slot.is_none() {
            self.assigned += 1;
        }
        *slot = Some(lit.polarity());
    }

    pub(crate) fn get(&self, var: Variable) -> Option<bool> {
        self.values[var.index()]
    }

    /// The truth value of a literal under the assignment, if its variable is set.
    pub(crate) fn value(&self, lit: Literal) -> Option<bool> {
        self.values[lit.var().index()].map(|v| v == lit.polarity())
    }

    pub(crate) fn contains(&self, lit: Literal) -> bool {
        self.value(lit) == Some(true)
    }

    pub(crate) fn remove(&mut self, lit: Literal) {
        let removed = self.values[lit.var().index()].take();
        if removed != Some(lit.polarity()) {
            panic!("removed different value from entry set: {:?}", lit)
        }
        self.assigned -= 1;
    }

    pub(crate) fn size(&self) -> usize {
        self.assigned
    }

    /// The lowest variable at or after `from` that has no value, or the variable count when
    /// every such variable is set.
    pub(crate) fn first_unassigned_from(&self, from: usize) -> usize {
        self.values[from.min(self.values.len())..]
            .iter()
            .position(|v| v.is_none())
            .map(|offset| from + offset)
            .unwrap_or(self.values.len())
    }

    /// A complete assignment, or None if any variable is unset.
    pub(crate) fn as_complete(&self) -> Option<Vec<bool>> {
        self.values.iter().copied().collect()
    }

    pub(crate) fn evaluate(&self, literals: &[Literal]) -> EvaluationResult {
        let mut result = EvaluationResult::False;
        for &literal in literals {
            match self.value(literal) {
                Some(true) => return EvaluationResult::True,
                Some(false) => {}
                None => result = EvaluationResult::Unknown,
            }
        }
        result
    }
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (ix, value) in self.values.iter().enumerate() {
            if let Some(value) = value {
                if !first {
                    write!(f, ", ")?;
                }
                first = false;
                write!(f, "{:?}={:?}", Variable::from_index(ix), value)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum EvaluationResult {
    True,
    False,
    Unknown,
}
