use log::trace;

use crate::instance::*;

use super::backtrack::Conflict;
use super::clause_index::Watcher;
use super::clause_store::{ClauseKind, ClauseStore};
use super::trail::Trail;

/// Two-watched-literal unit propagation. Every stored clause of two or more literals watches its
/// first two literals; when a watched literal becomes false a replacement is searched for, and if
/// none exists the clause is unit (its first literal is inferred) or conflicting.
pub(crate) struct UnitPropagator<'a> {
    clause_store: &'a mut ClauseStore,
    trail: &'a mut Trail,
}

impl<'a> UnitPropagator<'a> {
    pub(crate) fn new(clause_store: &'a mut ClauseStore, trail: &'a mut Trail) -> UnitPropagator<'a> {
        UnitPropagator {
            clause_store,
            trail,
        }
    }

    /// Propagates every pending assignment. Returns the number of assignments propagated and
    /// the first conflict found, if any.
    pub(crate) fn propagate(&mut self) -> (usize, Option<Conflict>) {
        let mut propagated = 0;
        while let Some(literal) = self.trail.next_unpropagated() {
            propagated += 1;
            if let Some(conflict) = self.propagate_literal(literal) {
                return (propagated, Some(conflict));
            }
        }
        (propagated, None)
    }

    fn propagate_literal(&mut self, literal: Literal) -> Option<Conflict> {
        let false_literal = literal.invert();
        let (mut clauses, index) = self.clause_store.split_mut();
        let mut watchers = index.take(false_literal);
        let mut conflict = None;

        let mut kept = 0;
        let mut ix = 0;
        while ix < watchers.len() {
            let watcher = watchers[ix];
            ix += 1;
            if self.trail.value(watcher.blocker) == Some(true) {
                watchers[kept] = watcher;
                kept += 1;
                continue;
            }

            let lits = clauses.literals_mut(watcher.clause);
            // Keep the falsified watch in the second slot
            if lits[0] == false_literal {
                lits.swap(0, 1);
            }
            let first = lits[0];
            if first != watcher.blocker && self.trail.value(first) == Some(true) {
                watchers[kept] = Watcher {
                    clause: watcher.clause,
                    blocker: first,
                };
                kept += 1;
                continue;
            }

            let replacement =
                (2..lits.len()).find(|&k| self.trail.value(lits[k]) != Some(false));
            if let Some(k) = replacement {
                lits.swap(1, k);
                index.watch(
                    lits[1],
                    Watcher {
                        clause: watcher.clause,
                        blocker: first,
                    },
                );
                continue;
            }

            watchers[kept] = Watcher {
                clause: watcher.clause,
                blocker: first,
            };
            kept += 1;
            match self.trail.value(first) {
                Some(false) => {
                    trace!("conflict on {:?} propagating {:?}", watcher.clause, literal);
                    conflict = Some(Conflict {
                        conflicting_literal: literal,
                        conflicting_clause: watcher.clause,
                    });
                    while ix < watchers.len() {
                        watchers[kept] = watchers[ix];
                        kept += 1;
                        ix += 1;
                    }
                }
                _ => {
                    trace!("inferred {:?} from {:?}", first, watcher.clause);
                    self.trail.add_inferred(first, Some(watcher.clause));
                }
            }
        }
        watchers.truncate(kept);
        index.restore(false_literal, watchers);
        conflict
    }
}

pub(crate) enum InitialAssignmentResult {
    Conflict,
    Assignment(usize),
}

/// Loads the normalized clauses of the formula into the store and runs unit propagation at
/// level zero. Clauses are expected sorted and free of duplicate literals and tautologies.
pub(crate) fn find_initial_assignment(
    clauses: &[Vec<Literal>],
    clause_store: &mut ClauseStore,
    trail: &mut Trail,
) -> InitialAssignmentResult {
    let mut units = vec![];
    for literals in clauses {
        match literals.len() {
            0 => return InitialAssignmentResult::Conflict,
            1 => {
                let clause = clause_store.add_clause(literals, ClauseKind::Original);
                units.push((literals[0], clause));
            }
            _ => {
                clause_store.add_clause(literals, ClauseKind::Original);
            }
        }
    }

    for (unit, clause) in units {
        match trail.value(unit) {
            Some(true) => {}
            Some(false) => return InitialAssignmentResult::Conflict,
            None => trail.add_inferred(unit, Some(clause)),
        }
    }

    match UnitPropagator::new(clause_store, trail).propagate() {
        (_, Some(conflict)) => {
            trace!("conflict during initial propagation: {:?}", conflict);
            InitialAssignmentResult::Conflict
        }
        (_, None) => InitialAssignmentResult::Assignment(trail.len()),
    }
}
