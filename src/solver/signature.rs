use std::fmt;

use crate::instance::{Literal, Variable};

use super::{assignment_set::Assignment, config::SignatureKind};

/// Identifies the residual subproblem at a position: two prefixes with equal signatures leave
/// the same function over the remaining variables. A set bit marks an element of the position's
/// frontier (a cut clause still unsatisfied, or a separator variable set to true).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    position: u32,
    bits: Box<[u64]>,
}

impl Signature {
    pub fn position(&self) -> usize {
        self.position as usize
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "@{}:", self.position)?;
        for word in self.bits.iter() {
            write!(f, "{:016x}", word)?;
        }
        Ok(())
    }
}

struct SignatureBuilder {
    bits: Vec<u64>,
    len: usize,
}

impl SignatureBuilder {
    fn with_width(width: usize) -> SignatureBuilder {
        SignatureBuilder {
            bits: vec![0; width.div_ceil(64)],
            len: 0,
        }
    }

    fn push(&mut self, bit: bool) {
        if bit {
            self.bits[self.len / 64] |= 1 << (self.len % 64);
        }
        self.len += 1;
    }

    fn finish(self, position: usize) -> Signature {
        Signature {
            position: position as u32,
            bits: self.bits.into_boxed_slice(),
        }
    }
}

pub(crate) trait SignatureStrategy {
    /// The signature at `position`. Every variable before the position must be assigned.
    fn signature(&self, position: usize, assignment: &Assignment) -> Signature;

    /// The largest frontier over all positions: the cutwidth or pathwidth of the order.
    fn max_width(&self) -> usize;
}

pub(crate) fn signature_strategy(
    kind: SignatureKind,
    variable_count: usize,
    clauses: &[&[Literal]],
) -> Box<dyn SignatureStrategy> {
    match kind {
        SignatureKind::Cutset => Box::new(CutsetSignature::new(variable_count, clauses)),
        SignatureKind::Separator => Box::new(SeparatorSignature::new(variable_count, clauses)),
    }
}

/// The variable span of a clause, as (lowest, highest) variable index.
fn span(clause: &[Literal]) -> Option<(usize, usize)> {
    let lo = clause.iter().map(|l| l.var().index()).min()?;
    let hi = clause.iter().map(|l| l.var().index()).max()?;
    Some((lo, hi))
}

/// Keys positions by which cut clauses (clauses with variables on both sides of the position)
/// the prefix has not yet satisfied.
pub(crate) struct CutsetSignature {
    clauses: Vec<Vec<Literal>>,
    // For each position, the clauses cut by it
    cuts: Vec<Vec<usize>>,
}

impl CutsetSignature {
    pub(crate) fn new(variable_count: usize, clauses: &[&[Literal]]) -> CutsetSignature {
        let mut cuts = vec![vec![]; variable_count + 1];
        let mut kept = vec![];
        for clause in clauses {
            let Some((lo, hi)) = span(clause) else {
                continue;
            };
            if lo == hi {
                continue;
            }
            for cut in cuts[lo + 1..=hi].iter_mut() {
                cut.push(kept.len());
            }
            kept.push(clause.to_vec());
        }
        CutsetSignature {
            clauses: kept,
            cuts,
        }
    }
}

impl SignatureStrategy for CutsetSignature {
    fn signature(&self, position: usize, assignment: &Assignment) -> Signature {
        let cut = &self.cuts[position];
        let mut builder = SignatureBuilder::with_width(cut.len());
        for &clause in cut {
            let satisfied = self.clauses[clause]
                .iter()
                .any(|&l| l.var().index() < position && assignment.contains(l));
            builder.push(!satisfied);
        }
        builder.finish(position)
    }

    fn max_width(&self) -> usize {
        self.cuts.iter().map(|c| c.len()).max().unwrap_or(0)
    }
}

/// Keys positions by the values of the prefix variables that still share a clause with a
/// variable at or after the position.
pub(crate) struct SeparatorSignature {
    separators: Vec<Vec<Variable>>,
}

impl SeparatorSignature {
    pub(crate) fn new(variable_count: usize, clauses: &[&[Literal]]) -> SeparatorSignature {
        // The furthest variable each variable shares a clause with
        let mut reach: Vec<usize> = (0..variable_count).collect();
        for clause in clauses {
            let Some((_, hi)) = span(clause) else {
                continue;
            };
            for lit in clause.iter() {
                let r = &mut reach[lit.var().index()];
                *r = (*r).max(hi);
            }
        }
        let mut separators = vec![vec![]; variable_count + 1];
        for (v, &r) in reach.iter().enumerate() {
            for separator in separators[v + 1..=r].iter_mut() {
                separator.push(Variable::from_index(v));
            }
        }
        SeparatorSignature { separators }
    }
}

impl SignatureStrategy for SeparatorSignature {
    fn signature(&self, position: usize, assignment: &Assignment) -> Signature {
        let separator = &self.separators[position];
        let mut builder = SignatureBuilder::with_width(separator.len());
        for &var in separator {
            builder.push(assignment.get(var) == Some(true));
        }
        builder.finish(position)
    }

    fn max_width(&self) -> usize {
        self.separators.iter().map(|s| s.len()).max().unwrap_or(0)
    }
}
