use crate::instance::*;
use core::fmt;

use super::assignment_set::Assignment;
use super::clause_store::ClauseRef;
use super::knowledge_graph::{KnowledgeGraph, Node};

/// The assignment stack of the search. Should be the source of truth for what needs to be
/// reverted upon backtrack.
///
/// Entries are grouped into decision levels, each opened by a reasonless literal (a decision or
/// a flipped decision). Levels are further split into sub-levels: a new sub-level starts at the
/// opening literal and at every literal asserted by a learnt clause.
#[derive(Clone)]
pub(crate) struct Trail {
    entries: Vec<Literal>,
    // Index of the first entry of each decision level above zero
    level_starts: Vec<usize>,
    sublevel_starts: Vec<usize>,
    // Entries before this index have been propagated
    propagated: usize,
    assignment: Assignment,
    graph: KnowledgeGraph,
}

impl Trail {
    pub(crate) fn new(variable_count: usize) -> Trail {
        Trail {
            entries: vec![],
            level_starts: vec![],
            sublevel_starts: vec![],
            propagated: 0,
            assignment: Assignment::new(variable_count),
            graph: KnowledgeGraph::new(variable_count),
        }
    }

    /// The number of decisions in the current assignment
    pub(crate) fn current_decision_level(&self) -> usize {
        self.level_starts.len()
    }

    pub(crate) fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub(crate) fn value(&self, literal: Literal) -> Option<bool> {
        self.assignment.value(literal)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn entries(&self) -> &[Literal] {
        &self.entries
    }

    pub(crate) fn vertex(&self, var: Variable) -> &Node {
        self.graph.vertex(var)
    }

    pub(crate) fn level_of(&self, var: Variable) -> usize {
        self.graph.vertex(var).level
    }

    pub(crate) fn reason(&self, var: Variable) -> Option<ClauseRef> {
        self.graph.vertex(var).reason
    }

    pub(crate) fn level_start(&self, level: usize) -> usize {
        match level {
            0 => 0,
            l => self.level_starts[l - 1],
        }
    }

    pub(crate) fn current_sublevel_start(&self) -> usize {
        let level_start = self.level_start(self.current_decision_level());
        self.sublevel_starts
            .last()
            .map_or(level_start, |&s| s.max(level_start))
    }

    /// The literal that opened the given decision level
    #[cfg(test)]
    pub(crate) fn decision(&self, level: usize) -> Literal {
        self.entries[self.level_starts[level - 1]]
    }

    /// The opening literals of every decision level, lowest level first
    pub(crate) fn decisions(&self) -> Vec<Literal> {
        self.level_starts.iter().map(|&s| self.entries[s]).collect()
    }

    /// Opens a new decision level with a reasonless literal.
    pub(crate) fn add_decision(&mut self, literal: Literal) {
        self.require_unset(literal);
        let position = self.entries.len();
        self.level_starts.push(position);
        self.sublevel_starts.push(position);
        self.graph
            .add_decision(literal, self.current_decision_level(), position);
        self.push(literal);
    }

    /// Records an inferred assignment at the current level. Only units of the input formula are
    /// inferred without a reason, at level zero.
    pub(crate) fn add_inferred(&mut self, literal: Literal, reason: Option<ClauseRef>) {
        self.require_unset(literal);
        let position = self.entries.len();
        let level = self.current_decision_level();
        match reason {
            Some(clause) => self.graph.add_inferred(literal, level, position, clause),
            None => self.graph.add_decision(literal, level, position),
        }
        self.push(literal);
    }

    /// Records the literal asserted by a learnt clause. It opens a new sub-level.
    pub(crate) fn add_asserted(&mut self, literal: Literal, reason: ClauseRef) {
        self.sublevel_starts.push(self.entries.len());
        self.add_inferred(literal, Some(reason));
    }

    fn push(&mut self, literal: Literal) {
        self.assignment.add(literal);
        self.entries.push(literal);
    }

    /// The next assignment whose consequences have not been propagated yet.
    pub(crate) fn next_unpropagated(&mut self) -> Option<Literal> {
        let literal = *self.entries.get(self.propagated)?;
        self.propagated += 1;
        Some(literal)
    }

    /// Drops every decision level above `level`. Returns the number of assignments undone.
    pub(crate) fn backtrack(&mut self, level: usize) -> usize {
        if level >= self.current_decision_level() {
            return 0;
        }
        self.truncate(self.level_start(level + 1))
    }

    /// Drops every assignment at or after `position`, along with the levels and sub-levels that
    /// started there. Returns the number of assignments undone.
    pub(crate) fn truncate(&mut self, position: usize) -> usize {
        let dropped = self.entries.len().saturating_sub(position);
        for literal in self.entries.drain(position..) {
            self.assignment.remove(literal);
        }
        debug_assert_eq!(self.assignment.size(), self.entries.len());
        while self.level_starts.last().is_some_and(|&s| s >= position) {
            self.level_starts.pop();
        }
        while self.sublevel_starts.last().is_some_and(|&s| s >= position) {
            self.sublevel_starts.pop();
        }
        self.propagated = self.propagated.min(position);
        dropped
    }

    #[cfg(debug_assertions)]
    fn require_unset(&self, literal: Literal) {
        if self.assignment.contains(literal) {
            panic!("{:?} already in assignment", literal);
        }
        if self.assignment.contains(literal.invert()) {
            panic!("inverse {:?} already in assignment", literal.invert())
        }
    }

    #[cfg(not(debug_assertions))]
    fn require_unset(&self, _literal: Literal) {}
}

impl fmt::Debug for Trail {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Trail {{ depth={:?}, assignment=[{:?}] }}",
            self.current_decision_level(),
            self.assignment()
        )
    }
}
