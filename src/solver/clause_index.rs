use crate::instance::Literal;

use super::clause_store::ClauseRef;

/// A registered watch on one of the first two literals of a clause. When the blocker is
/// already true the clause does not need to be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Watcher {
    pub(crate) clause: ClauseRef,
    pub(crate) blocker: Literal,
}

/// Maps each literal to the clauses currently watching it. A clause is visited when its watched
/// literal becomes false.
#[derive(Debug, Clone)]
pub(crate) struct ClauseIndex {
    watchers: Vec<Vec<Watcher>>,
}

impl ClauseIndex {
    pub(crate) fn new(variable_count: usize) -> ClauseIndex {
        ClauseIndex {
            watchers: vec![vec![]; variable_count * 2],
        }
    }

    /// Registers watches on the first two literals of a clause.
    pub(crate) fn watch_clause(&mut self, clause: ClauseRef, literals: &[Literal]) {
        debug_assert!(literals.len() >= 2);
        self.watch(literals[0], Watcher { clause, blocker: literals[1] });
        self.watch(literals[1], Watcher { clause, blocker: literals[0] });
    }

    pub(crate) fn watch(&mut self, literal: Literal, watcher: Watcher) {
        self.watchers[literal.code()].push(watcher);
    }

    /// Takes the watch list of a literal out of the index so it can be rewritten while other
    /// lists receive new watches. It must be handed back with `restore`.
    pub(crate) fn take(&mut self, literal: Literal) -> Vec<Watcher> {
        std::mem::take(&mut self.watchers[literal.code()])
    }

    pub(crate) fn restore(&mut self, literal: Literal, watchers: Vec<Watcher>) {
        let slot = &mut self.watchers[literal.code()];
        debug_assert!(slot.is_empty());
        *slot = watchers;
    }

    #[cfg(test)]
    pub(crate) fn watchers(&self, literal: Literal) -> &[Watcher] {
        &self.watchers[literal.code()]
    }

    /// Drops watches on clauses matching the predicate.
    pub(crate) fn retain<F: Fn(ClauseRef) -> bool>(&mut self, keep: F) {
        for list in self.watchers.iter_mut() {
            list.retain(|w| keep(w.clause));
        }
    }
}
