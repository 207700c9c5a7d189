use log::{debug, trace};

use crate::instance::Literal;

use super::clause_index::ClauseIndex;

/// Where a stored clause came from. Original clauses define the formula; learnt clauses are
/// implied by it and may be discarded; blocking clauses exclude recorded solutions and are never
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ClauseKind {
    Original,
    Learnt,
    Blocking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ClauseRef(u32);

impl ClauseRef {
    pub(crate) fn from_index(ix: usize) -> ClauseRef {
        ClauseRef(ix as u32)
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug)]
pub(crate) struct ClauseStore {
    clauses: ClauseList,
    index: ClauseIndex,
    live_learnt: usize,
}

impl ClauseStore {
    pub(crate) fn new(variable_count: usize) -> ClauseStore {
        ClauseStore {
            clauses: ClauseList::default(),
            index: ClauseIndex::new(variable_count),
            live_learnt: 0,
        }
    }

    /// Stores a clause and watches its first two literals. Callers order the literals so the
    /// first two are the ones the watch invariant needs.
    pub(crate) fn add_clause(&mut self, literals: &[Literal], kind: ClauseKind) -> ClauseRef {
        let clause = self.clauses.push(literals, kind);
        if literals.len() >= 2 {
            self.index.watch_clause(clause, literals);
        }
        if kind == ClauseKind::Learnt {
            self.live_learnt += 1;
        }
        trace!("added {:?} clause {:?}: {:?}", kind, clause, literals);
        clause
    }

    pub(crate) fn literals(&self, clause: ClauseRef) -> &[Literal] {
        self.clauses.literals(clause)
    }

    #[cfg(test)]
    pub(crate) fn kind(&self, clause: ClauseRef) -> ClauseKind {
        self.clauses.headers[clause.index()].kind
    }

    #[cfg(test)]
    pub(crate) fn is_deleted(&self, clause: ClauseRef) -> bool {
        self.clauses.headers[clause.index()].deleted
    }

    /// Original clauses, in insertion order.
    pub(crate) fn originals(&self) -> impl Iterator<Item = ClauseRef> + '_ {
        self.clauses
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.kind == ClauseKind::Original)
            .map(|(ix, _)| ClauseRef::from_index(ix))
    }

    pub(crate) fn live_learnt(&self) -> usize {
        self.live_learnt
    }

    /// Gives mutable access to both the clause literals and the watch index, so propagation can
    /// rewrite watches while walking clauses.
    pub(crate) fn split_mut(&mut self) -> (ClauseLiterals<'_>, &mut ClauseIndex) {
        (ClauseLiterals { list: &mut self.clauses }, &mut self.index)
    }

    /// Discards the older half of the learnt clauses that are longer than two literals and are
    /// not the reason for a current assignment. Returns how many were discarded.
    pub(crate) fn discard_learnts<F: Fn(ClauseRef) -> bool>(&mut self, locked: F) -> usize {
        let candidates: Vec<ClauseRef> = self
            .clauses
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| h.kind == ClauseKind::Learnt && !h.deleted && h.length > 2)
            .map(|(ix, _)| ClauseRef::from_index(ix))
            .filter(|&clause| !locked(clause))
            .collect();
        let discard = &candidates[..candidates.len() / 2];
        for clause in discard {
            self.clauses.headers[clause.index()].deleted = true;
        }
        let clauses = &self.clauses;
        self.index.retain(|clause| !clauses.headers[clause.index()].deleted);
        self.live_learnt -= discard.len();
        debug!("discarded {} learnt clauses", discard.len());
        discard.len()
    }
}

/// Mutable view over the clause literals, handed out alongside the watch index.
pub(crate) struct ClauseLiterals<'a> {
    list: &'a mut ClauseList,
}

impl<'a> ClauseLiterals<'a> {
    pub(crate) fn literals_mut(&mut self, clause: ClauseRef) -> &mut [Literal] {
        self.list.literals_mut(clause)
    }
}

#[derive(Debug, Clone, Copy)]
struct ClauseHeader {
    offset: usize,
    length: usize,
    kind: ClauseKind,
    deleted: bool,
}

/// A dense store of clauses.
#[derive(Debug, Default)]
struct ClauseList {
    // We store all the literals in the clauses contiguously
    literals: Vec<Literal>,
    // And then store the offsets for a particular clause
    headers: Vec<ClauseHeader>,
}

impl ClauseList {
    fn push(&mut self, literals: &[Literal], kind: ClauseKind) -> ClauseRef {
        let clause = ClauseRef::from_index(self.headers.len());
        self.headers.push(ClauseHeader {
            offset: self.literals.len(),
            length: literals.len(),
            kind,
            deleted: false,
        });
        self.literals.extend_from_slice(literals);
        clause
    }

    fn literals(&self, clause: ClauseRef) -> &[Literal] {
        let header = &self.headers[clause.index()];
        &self.literals[header.offset..header.offset + header.length]
    }

    fn literals_mut(&mut self, clause: ClauseRef) -> &mut [Literal] {
        let header = &self.headers[clause.index()];
        &mut self.literals[header.offset..header.offset + header.length]
    }
}

#[cfg(test)]
mod test {
    use itertools::Itertools;

    use crate::instance::{Literal, Variable};

    use super::{ClauseKind, ClauseStore};

    #[test]
    fn test_iter_clause_store() {
        let a = Literal::new(Variable(0), true);
        let b = Literal::new(Variable(1), true);
        let c = Literal::new(Variable(2), true);

        let mut cs = ClauseStore::new(3);
        let long = cs.add_clause(&[a, b, c], ClauseKind::Original);
        let pair = cs.add_clause(&[b, c], ClauseKind::Original);
        let learnt = cs.add_clause(&[c.invert(), a], ClauseKind::Learnt);
        let unit = cs.add_clause(&[c], ClauseKind::Original);

        let originals = cs.originals().collect_vec();
        assert_eq!(originals, vec![long, pair, unit]);
        assert_eq!(cs.literals(long), &[a, b, c]);
        assert_eq!(cs.literals(pair), &[b, c]);
        assert_eq!(cs.literals(learnt), &[c.invert(), a]);
        assert_eq!(cs.literals(unit), &[c]);
        assert_eq!(cs.kind(learnt), ClauseKind::Learnt);
        assert_eq!(cs.live_learnt(), 1);

        let (mut lits, index) = cs.split_mut();
        lits.literals_mut(long).swap(0, 2);
        assert_eq!(index.watchers(b).len(), 2);
        assert_eq!(cs.literals(long), &[c, b, a]);
    }

    #[test]
    fn test_discard_learnts() {
        let lits = (0..4)
            .map(|i| Literal::new(Variable(i), true))
            .collect_vec();
        let mut cs = ClauseStore::new(4);
        let first = cs.add_clause(&[lits[0], lits[1], lits[2]], ClauseKind::Learnt);
        let second = cs.add_clause(&[lits[1], lits[2], lits[3]], ClauseKind::Learnt);
        let third = cs.add_clause(&[lits[0], lits[2], lits[3]], ClauseKind::Learnt);
        let blocking = cs.add_clause(&[lits[0], lits[1], lits[3]], ClauseKind::Blocking);
        let binary = cs.add_clause(&[lits[0], lits[3]], ClauseKind::Learnt);
        assert_eq!(cs.live_learnt(), 4);

        // `second` is locked, leaving two candidates of which the older is dropped
        let discarded = cs.discard_learnts(|clause| clause == second);
        assert_eq!(discarded, 1);
        assert!(cs.is_deleted(first));
        assert!(!cs.is_deleted(second));
        assert!(!cs.is_deleted(third));
        assert!(!cs.is_deleted(blocking));
        assert!(!cs.is_deleted(binary));
        assert_eq!(cs.live_learnt(), 3);

        let (_, index) = cs.split_mut();
        assert!(index
            .watchers(lits[0])
            .iter()
            .all(|w| w.clause != first));
    }
}
