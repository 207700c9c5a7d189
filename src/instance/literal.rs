use std::fmt;

use super::Variable;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal(u64);

pub const MAX_VARIABLE: u64 = 1 << 62;

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.polarity() {
            write!(f, "{:?}", self.var())
        } else {
            write!(f, "!{:?}", self.var())
        }
    }
}

impl Literal {
    pub fn new(var: Variable, polarity: bool) -> Literal {
        if var.0 >= MAX_VARIABLE {
            panic!("variable too large - must be < 2^62");
        }
        Literal((var.0 << 1) | (polarity as u64))
    }

    /// Converts a signed DIMACS literal (`3`, `-7`). Zero is the clause terminator and has no
    /// literal.
    pub fn from_dimacs(value: i64) -> Option<Literal> {
        match value {
            0 => None,
            v if v.unsigned_abs() > MAX_VARIABLE => None,
            v => Some(Literal::new(Variable(v.unsigned_abs() - 1), v > 0)),
        }
    }

    pub fn to_dimacs(&self) -> i64 {
        let v = self.var().0 as i64 + 1;
        if self.polarity() {
            v
        } else {
            -v
        }
    }

    pub fn var(&self) -> Variable {
        Variable(self.0 >> 1)
    }

    pub fn polarity(&self) -> bool {
        (self.0 & 1) != 0
    }

    pub fn invert(&self) -> Literal {
        Literal(self.0 ^ 1)
    }

    /// Dense index of the literal, used to address watch lists.
    pub(crate) fn code(&self) -> usize {
        self.0 as usize
    }

    /// The truth value of this literal when its variable is set to `value`.
    pub fn evaluate(&self, value: bool) -> bool {
        self.polarity() == value
    }
}

#[cfg(test)]
mod test {
    use crate::instance::*;

    #[test]
    fn test_literal_bookkeeping() {
        for idx in vec![0, 10000000, 1000, 1 << 46] {
            let var = Variable(idx);
            let lit = Literal::new(var, true);
            assert_eq!(lit.var(), var);
            assert_eq!(lit.invert().var(), var);
            assert_eq!(lit.polarity(), true);
            assert_eq!(lit.invert().polarity(), false);
            assert_eq!(lit.invert().code(), lit.code() ^ 1);
        }
    }

    #[test]
    fn test_dimacs_conversion() {
        assert_eq!(Literal::from_dimacs(0), None);
        let lit = Literal::from_dimacs(-3).unwrap();
        assert_eq!(lit.var(), Variable(2));
        assert!(!lit.polarity());
        assert_eq!(lit.to_dimacs(), -3);
        assert_eq!(Literal::from_dimacs(1), Some(Literal::new(Variable(0), true)));
        assert!(lit.evaluate(false));
        assert!(!lit.evaluate(true));
    }
}
