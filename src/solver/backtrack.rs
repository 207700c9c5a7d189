use itertools::Itertools;
use log::trace;

use crate::instance::Literal;

use super::{
    clause_store::{ClauseRef, ClauseStore},
    config::{BacktrackKind, UipGranularity},
    error::SolveError,
    trail::Trail,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Conflict {
    pub(crate) conflicting_literal: Literal,
    pub(crate) conflicting_clause: ClauseRef,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct AnalyzedConflict {
    /// The asserting literal comes first, followed by the literal assigned most recently among
    /// the rest.
    pub(crate) learnt_clause: Vec<Literal>,
    /// The level at which the learnt clause becomes unit.
    pub(crate) asserting_level: usize,
    /// Set when the learnt clause keeps other literals of the current decision level: the trail
    /// is cut back to this position (the start of the conflicting sub-level) instead.
    pub(crate) sublevel_start: Option<usize>,
}

impl AnalyzedConflict {
    pub(crate) fn asserting_literal(&self) -> Literal {
        self.learnt_clause[0]
    }
}

/// Derives a learnt clause from a conflict by resolving backwards along the trail until a
/// single literal of the conflicting level (or sub-level) remains.
pub(crate) struct ConflictAnalyzer {
    granularity: UipGranularity,
    seen: Vec<bool>,
}

impl ConflictAnalyzer {
    pub(crate) fn new(granularity: UipGranularity, variable_count: usize) -> ConflictAnalyzer {
        ConflictAnalyzer {
            granularity,
            seen: vec![false; variable_count],
        }
    }

    pub(crate) fn analyse_conflict(
        &mut self,
        clause_store: &ClauseStore,
        trail: &Trail,
        conflict: &Conflict,
    ) -> Result<AnalyzedConflict, SolveError> {
        let conflicting = clause_store.literals(conflict.conflicting_clause);
        self.analyse_literals(clause_store, trail, conflicting)
            .ok_or_else(|| SolveError::MissingUip(conflicting.to_vec()))?
    }

    /// Analyses a set of literals that are all false under the trail, such as a conflicting
    /// clause or the negated decisions of a solution. Returns None when none of them belongs to
    /// the current decision level.
    pub(crate) fn analyse_literals(
        &mut self,
        clause_store: &ClauseStore,
        trail: &Trail,
        conflicting: &[Literal],
    ) -> Option<Result<AnalyzedConflict, SolveError>> {
        let level = trail.current_decision_level();
        let level_start = trail.level_start(level);
        let at_or_after = |boundary: usize| {
            conflicting.iter().any(|l| {
                let vertex = trail.vertex(l.var());
                vertex.level > 0 && vertex.position >= boundary
            })
        };
        if level == 0 || !at_or_after(level_start) {
            return None;
        }
        let mut boundary = match self.granularity {
            UipGranularity::DecisionLevel => level_start,
            UipGranularity::SubLevel => trail.current_sublevel_start(),
        };
        if !at_or_after(boundary) {
            boundary = level_start;
        }
        trace!("analysing {:?} from position {}", conflicting, boundary);

        let mut result = self.resolve(clause_store, trail, conflicting, boundary);
        if let Ok(learnt) = &result {
            // A sub-level's opening literal is implied by the levels below it, so cutting back
            // to it would only flip it against its own reason.
            if boundary > level_start && trail.vertex(learnt[0].var()).position == boundary {
                trace!("UIP {:?} opens the sub-level, analysing the whole level", learnt[0]);
                for lit in &learnt[1..] {
                    self.seen[lit.var().index()] = false;
                }
                boundary = level_start;
                result = self.resolve(clause_store, trail, conflicting, boundary);
            }
        }
        if result.is_err() {
            self.seen.fill(false);
        }
        Some(result.map(|mut learnt| {
            for lit in &learnt[1..] {
                self.seen[lit.var().index()] = false;
            }
            if let Some((ix, _)) = learnt[1..]
                .iter()
                .enumerate()
                .max_by_key(|(_, l)| trail.vertex(l.var()).position)
            {
                learnt.swap(1, ix + 1);
            }

            let keeps_current = learnt[1..].iter().any(|l| trail.level_of(l.var()) == level);
            let (asserting_level, sublevel_start) = if keeps_current {
                (level, Some(boundary))
            } else {
                (learnt.get(1).map_or(0, |l| trail.level_of(l.var())), None)
            };
            trace!(
                "learnt {} asserting at {} (sub-level cut: {:?})",
                clause_levels(trail, &learnt),
                asserting_level,
                sublevel_start
            );
            AnalyzedConflict {
                learnt_clause: learnt,
                asserting_level,
                sublevel_start,
            }
        }))
    }

    fn resolve(
        &mut self,
        clause_store: &ClauseStore,
        trail: &Trail,
        conflicting: &[Literal],
        boundary: usize,
    ) -> Result<Vec<Literal>, SolveError> {
        // Slot 0 is replaced by the asserting literal once it is known
        let mut learnt = vec![conflicting[0]];
        let mut pending = 0usize;
        let mut cursor = trail.len();
        let mut clause = conflicting;
        let mut pivot: Option<Literal> = None;

        loop {
            for &lit in clause {
                let var = lit.var();
                if pivot.is_some_and(|p| p.var() == var) || self.seen[var.index()] {
                    continue;
                }
                let vertex = trail.vertex(var);
                if vertex.level == 0 {
                    continue;
                }
                self.seen[var.index()] = true;
                if vertex.position >= boundary {
                    pending += 1;
                } else {
                    learnt.push(lit);
                }
            }

            let next = loop {
                cursor -= 1;
                let lit = trail.entries()[cursor];
                if self.seen[lit.var().index()] {
                    break lit;
                }
            };
            self.seen[next.var().index()] = false;
            pending -= 1;
            pivot = Some(next);
            if pending == 0 {
                learnt[0] = next.invert();
                return Ok(learnt);
            }
            let reason = trail
                .reason(next.var())
                .ok_or(SolveError::MissingReason(next.var()))?;
            clause = clause_store.literals(reason);
        }
    }
}

pub(crate) trait BacktrackStrategy {
    /// Calculates how far we should roll back the search tree: the decision level to keep.
    fn find_backtrack_point(
        &mut self,
        clause_store: &ClauseStore,
        trail: &Trail,
        conflicting: &[Literal],
        analyzed_conflict: &AnalyzedConflict,
    ) -> usize;
}

pub(crate) fn backtrack_strategy(
    kind: BacktrackKind,
    variable_count: usize,
) -> Box<dyn BacktrackStrategy> {
    match kind {
        BacktrackKind::Chronological => Box::new(ChronologicalBacktrackStrategy {}),
        BacktrackKind::Backjump => Box::new(BackjumpStrategy {}),
        BacktrackKind::ConflictBackjump => {
            Box::new(ConflictBackjumpStrategy::new(variable_count))
        }
        BacktrackKind::Combined => Box::new(CombinedBackjumpStrategy {
            conflict_backjump: ConflictBackjumpStrategy::new(variable_count),
        }),
    }
}

/// Undo only the most recent decision.
pub(crate) struct ChronologicalBacktrackStrategy {}

impl BacktrackStrategy for ChronologicalBacktrackStrategy {
    fn find_backtrack_point(
        &mut self,
        _clause_store: &ClauseStore,
        trail: &Trail,
        _conflicting: &[Literal],
        _analyzed_conflict: &AnalyzedConflict,
    ) -> usize {
        trail.current_decision_level().saturating_sub(1)
    }
}

pub(crate) struct BackjumpStrategy {}

impl BacktrackStrategy for BackjumpStrategy {
    fn find_backtrack_point(
        &mut self,
        _clause_store: &ClauseStore,
        _trail: &Trail,
        _conflicting: &[Literal],
        analyzed_conflict: &AnalyzedConflict,
    ) -> usize {
        analyzed_conflict.asserting_level
    }
}

/// Jumps to the deepest earlier decision the conflict depends on, found by following reasons
/// back from the conflicting literals.
pub(crate) struct ConflictBackjumpStrategy {
    marked: Vec<bool>,
}

impl ConflictBackjumpStrategy {
    fn new(variable_count: usize) -> ConflictBackjumpStrategy {
        ConflictBackjumpStrategy {
            marked: vec![false; variable_count],
        }
    }

    fn deepest_decision(
        &mut self,
        clause_store: &ClauseStore,
        trail: &Trail,
        conflicting: &[Literal],
    ) -> usize {
        let level = trail.current_decision_level();
        for lit in conflicting {
            self.marked[lit.var().index()] = true;
        }
        let mut deepest = 0;
        for lit in trail.entries().iter().rev() {
            let var = lit.var();
            if !std::mem::take(&mut self.marked[var.index()]) {
                continue;
            }
            let vertex = trail.vertex(var);
            match vertex.reason {
                Some(reason) => {
                    for antecedent in clause_store.literals(reason) {
                        if antecedent.var() != var {
                            self.marked[antecedent.var().index()] = true;
                        }
                    }
                }
                None if vertex.level < level => deepest = deepest.max(vertex.level),
                None => {}
            }
        }
        trace!(
            "conflict set decisions below {}: deepest {}",
            level,
            deepest
        );
        deepest
    }
}

impl BacktrackStrategy for ConflictBackjumpStrategy {
    fn find_backtrack_point(
        &mut self,
        clause_store: &ClauseStore,
        trail: &Trail,
        conflicting: &[Literal],
        _analyzed_conflict: &AnalyzedConflict,
    ) -> usize {
        self.deepest_decision(clause_store, trail, conflicting)
    }
}

/// The deeper of the backjump and conflict-directed backjump levels.
pub(crate) struct CombinedBackjumpStrategy {
    conflict_backjump: ConflictBackjumpStrategy,
}

impl BacktrackStrategy for CombinedBackjumpStrategy {
    fn find_backtrack_point(
        &mut self,
        clause_store: &ClauseStore,
        trail: &Trail,
        conflicting: &[Literal],
        analyzed_conflict: &AnalyzedConflict,
    ) -> usize {
        let conflict_level = self
            .conflict_backjump
            .deepest_decision(clause_store, trail, conflicting);
        [analyzed_conflict.asserting_level, conflict_level]
            .into_iter()
            .max()
            .unwrap_or_default()
    }
}

/// Renders the levels of a clause's literals, for tracing.
fn clause_levels(trail: &Trail, literals: &[Literal]) -> String {
    literals
        .iter()
        .map(|l| format!("{:?}@{}", l, trail.level_of(l.var())))
        .join(" ")
}
