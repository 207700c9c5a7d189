use std::fmt;
use std::io::{self, Write};

use fnv::FnvHashSet;
use log::{debug, info, trace};
use num_bigint::BigUint;

use crate::instance::*;

use super::assignment_set::EvaluationResult;
use super::backtrack::{
    backtrack_strategy, AnalyzedConflict, BacktrackStrategy, Conflict, ConflictAnalyzer,
};
use super::cache::Cache;
use super::clause_store::{ClauseKind, ClauseRef, ClauseStore};
use super::config::{CacheFrequency, SolutionMode, SolverConfig};
use super::counter::SolutionCounter;
use super::dfs_path::{DFSPath, Phase};
use super::diagram::{DecomposedNode, Diagram, NodeRef, ReductionSink};
use super::error::SolveError;
use super::interrupt::Interrupt;
use super::signature::{signature_strategy, Signature, SignatureStrategy};
use super::sorted_vec::sort_and_dedupe;
use super::trail::Trail;
use super::unit_propagator::{find_initial_assignment, InitialAssignmentResult, UnitPropagator};

/// Called with the running count after every recorded solution or cache hit.
pub type SolutionObserver = Box<dyn FnMut(&SolutionCounter)>;

/// A formula together with the options for enumerating its solutions.
pub struct Instance {
    formula: Formula,
    config: SolverConfig,
    interrupt: Interrupt,
    observer: Option<SolutionObserver>,
}

impl Instance {
    pub fn new(formula: Formula) -> Instance {
        Self::with_config(formula, SolverConfig::default())
    }

    pub fn with_config(formula: Formula, config: SolverConfig) -> Instance {
        Instance {
            formula,
            config,
            interrupt: Interrupt::new(),
            observer: None,
        }
    }

    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// A handle that stops a running `solve` at its next decision. The partial result is
    /// returned with `Outcome::Interrupted` and an inexact count.
    pub fn interrupt_handle(&self) -> Interrupt {
        self.interrupt.clone()
    }

    pub fn on_solution<F: FnMut(&SolutionCounter) + 'static>(&mut self, observer: F) {
        self.observer = Some(Box::new(observer));
    }

    /// Enumerates every satisfying assignment, counting them and building the diagram that
    /// accepts exactly them.
    pub fn solve(&mut self) -> Result<Solution, SolveError> {
        let variable_count = self.formula.variable_count();
        let clauses = normalize(&self.formula);
        info!(
            "solving {} variables, {} clauses ({} mode, {} signatures, {})",
            variable_count,
            clauses.len(),
            self.config.mode,
            self.config.signature,
            self.config.backtrack
        );

        let search = Search::new(
            &self.config,
            variable_count,
            &clauses,
            self.interrupt.clone(),
            self.observer.as_mut(),
        );
        let mut search = match search {
            Some(search) => search,
            None => {
                info!("formula is unsatisfiable after initial propagation");
                return Ok(Solution {
                    outcome: Outcome::TriviallyUnsatisfiable,
                    counter: SolutionCounter::new(),
                    diagram: Diagram::new(variable_count),
                    root: NodeRef::REJECT,
                    stats: EvaluationStats::default(),
                });
            }
        };

        let end = match self.config.mode {
            SolutionMode::NonBlocking => search.run_non_blocking()?,
            SolutionMode::Blocking => search.run_blocking()?,
        };
        let (outcome, root) = match end {
            SearchEnd::Complete(NodeRef::REJECT) => (Outcome::Unsatisfiable, NodeRef::REJECT),
            SearchEnd::Complete(root) => (Outcome::Satisfiable, root),
            SearchEnd::Interrupted(root) => (Outcome::Interrupted, root),
        };
        let solution = search.finish(outcome, root);
        info!("{:?}", solution);
        Ok(solution)
    }
}

/// Sorts clause literals, drops repeated literals and tautologies.
fn normalize(formula: &Formula) -> Vec<Vec<Literal>> {
    formula
        .clauses()
        .iter()
        .filter(|clause| !clause.is_tautology())
        .map(|clause| {
            let mut literals = clause.literals().to_vec();
            sort_and_dedupe(&mut literals);
            literals
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Satisfiable,
    Unsatisfiable,
    /// Initial unit propagation alone refuted the formula.
    TriviallyUnsatisfiable,
    /// The search was stopped early; the diagram and count cover the solutions found so far.
    Interrupted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvaluationStats {
    pub decisions: usize,
    pub propagations: usize,
    pub conflicts: usize,
    pub learnt_clauses: usize,
    pub discarded_clauses: usize,
    pub blocking_clauses: usize,
    /// Complete assignments reached by the search
    pub leaves: usize,
    pub cache_lookups: usize,
    pub cache_hits: usize,
    /// Branch closings that found their node already cached, expected to stay zero
    pub cache_duplicates: usize,
    pub refreshes: usize,
    pub diagram_nodes: usize,
    /// The largest cache key width: cutwidth or pathwidth, depending on the signature
    pub frontier_width: usize,
}

pub struct Solution {
    outcome: Outcome,
    counter: SolutionCounter,
    diagram: Diagram,
    root: NodeRef,
    stats: EvaluationStats,
}

impl Solution {
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn count(&self) -> &BigUint {
        self.counter.value()
    }

    pub fn is_exact(&self) -> bool {
        self.counter.is_exact()
    }

    pub fn counter(&self) -> &SolutionCounter {
        &self.counter
    }

    pub fn root(&self) -> NodeRef {
        self.root
    }

    pub fn diagram(&self) -> &Diagram {
        &self.diagram
    }

    pub fn stats(&self) -> &EvaluationStats {
        &self.stats
    }

    /// Whether the complete assignment is one of the recorded solutions.
    pub fn accepts(&self, assignment: &[bool]) -> bool {
        self.diagram.evaluate(self.root, assignment)
    }

    pub fn decompose(&self) -> Vec<DecomposedNode> {
        self.diagram.decompose(self.root)
    }

    /// Writes the decomposition listing: a header with the variable and node counts, then one
    /// `id variable low high` line per decision node with one-based variables.
    pub fn write_decomposition<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let listing = self.decompose();
        writeln!(
            out,
            "c bdd {} {} root {}",
            self.diagram.variable_count(),
            listing.len(),
            listing
                .last()
                .map_or((self.root == NodeRef::terminal(true)) as usize, |n| n.id)
        )?;
        for node in listing {
            writeln!(
                out,
                "{} {} {} {}",
                node.id,
                node.variable.0 + 1,
                node.low,
                node.high
            )?;
        }
        Ok(())
    }

    /// Hands the diagram to a post-processing sink, returning the size it reports.
    pub fn reduce<S: ReductionSink>(&self, sink: &mut S) -> usize {
        sink.reduce(&self.diagram, self.root, self.diagram.variable_count())
    }
}

impl fmt::Debug for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {} solutions", self.outcome, self.count())?;
        if !self.is_exact() {
            write!(f, " (lower bound)")?;
        }
        write!(f, "; stats={:?}", self.stats)
    }
}

enum SearchEnd {
    Complete(NodeRef),
    Interrupted(NodeRef),
}

enum CacheLookup {
    Hit(usize, NodeRef),
    Miss(Option<Signature>),
}

/// The state of one enumeration run.
struct Search<'a> {
    config: &'a SolverConfig,
    variable_count: usize,
    clause_store: ClauseStore,
    trail: Trail,
    analyzer: ConflictAnalyzer,
    strategy: Box<dyn BacktrackStrategy>,
    signatures: Box<dyn SignatureStrategy>,
    cache: Cache,
    diagram: Diagram,
    path: DFSPath,
    counter: SolutionCounter,
    stats: EvaluationStats,
    interrupt: Interrupt,
    observer: Option<&'a mut SolutionObserver>,
    // Learnt unit clauses are not watched; they are re-asserted whenever backtracking undoes them
    learnt_units: Vec<(Literal, ClauseRef)>,
    known_units: FnvHashSet<Literal>,
    refresh_at: Option<usize>,
}

impl<'a> Search<'a> {
    /// Loads the clauses and propagates at level zero. Returns None if that refutes the formula.
    fn new(
        config: &'a SolverConfig,
        variable_count: usize,
        clauses: &[Vec<Literal>],
        interrupt: Interrupt,
        observer: Option<&'a mut SolutionObserver>,
    ) -> Option<Search<'a>> {
        let mut clause_store = ClauseStore::new(variable_count);
        let mut trail = Trail::new(variable_count);
        match find_initial_assignment(clauses, &mut clause_store, &mut trail) {
            InitialAssignmentResult::Conflict => return None,
            InitialAssignmentResult::Assignment(units) => {
                info!("inferred {} units pre traversal", units)
            }
        }

        // Clauses satisfied at level zero can no longer separate residual problems
        let open: Vec<&[Literal]> = clause_store
            .originals()
            .map(|clause| clause_store.literals(clause))
            .filter(|literals| trail.assignment().evaluate(literals) != EvaluationResult::True)
            .collect();
        let signatures = signature_strategy(config.signature, variable_count, &open);
        let refresh_at = match config.mode {
            SolutionMode::NonBlocking => config.max_nodes,
            SolutionMode::Blocking => None,
        };

        Some(Search {
            config,
            variable_count,
            clause_store,
            trail,
            analyzer: ConflictAnalyzer::new(config.uip, variable_count),
            strategy: backtrack_strategy(config.backtrack, variable_count),
            signatures,
            cache: Cache::new(config.cache_enabled && config.mode == SolutionMode::NonBlocking),
            diagram: Diagram::new(variable_count),
            path: DFSPath::new(),
            counter: SolutionCounter::new(),
            stats: EvaluationStats::default(),
            interrupt,
            observer,
            learnt_units: vec![],
            known_units: FnvHashSet::default(),
            refresh_at,
        })
    }

    fn finish(mut self, outcome: Outcome, root: NodeRef) -> Solution {
        self.stats.cache_lookups = self.cache.lookups();
        self.stats.cache_hits = self.cache.hits();
        self.stats.cache_duplicates = self.cache.duplicates();
        self.stats.diagram_nodes = self.diagram.len();
        self.stats.frontier_width = self.signatures.max_width();
        Solution {
            outcome,
            counter: self.counter,
            diagram: self.diagram,
            root,
            stats: self.stats,
        }
    }

    /// Explores both branches of every decision, closing each branch into a diagram node.
    fn run_non_blocking(&mut self) -> Result<SearchEnd, SolveError> {
        loop {
            self.refresh_if_needed();
            debug_assert_eq!(self.trail.current_decision_level(), self.path.depth());

            if let Some(conflict) = self.propagate() {
                if let Some(root) = self.resolve_conflict(conflict)? {
                    return Ok(SearchEnd::Complete(root));
                }
                continue;
            }

            let level = self.trail.current_decision_level();
            let frontier = self
                .trail
                .assignment()
                .first_unassigned_from(self.path.branch_start(level));
            if frontier == self.variable_count {
                self.record_leaf();
                let node = self.chain(level, frontier, NodeRef::terminal(true), true)?;
                if let Some(root) = self.close_branch(node)? {
                    return Ok(SearchEnd::Complete(root));
                }
                continue;
            }

            let signature = match self.consult_cache(level, frontier) {
                CacheLookup::Hit(position, node) => {
                    self.counter.add(self.diagram.count(node));
                    self.notify();
                    let node = self.chain(level, position, node, true)?;
                    if let Some(root) = self.close_branch(node)? {
                        return Ok(SearchEnd::Complete(root));
                    }
                    continue;
                }
                CacheLookup::Miss(signature) => signature,
            };

            if self.interrupt.is_interrupted() {
                info!("interrupted after {} solutions", self.counter.value());
                return Ok(SearchEnd::Interrupted(self.abandon()?));
            }
            let literal = Literal::new(Variable::from_index(frontier), self.config.polarity);
            self.stats.decisions += 1;
            self.path.push(literal, signature);
            self.trail.add_decision(literal);
        }
    }

    /// Records each solution as it is found and blocks the decisions that led to it.
    fn run_blocking(&mut self) -> Result<SearchEnd, SolveError> {
        let mut root = NodeRef::REJECT;
        loop {
            if let Some(conflict) = self.propagate() {
                self.stats.conflicts += 1;
                if self.trail.current_decision_level() == 0 {
                    return Ok(SearchEnd::Complete(root));
                }
                let analyzed =
                    self.analyzer
                        .analyse_conflict(&self.clause_store, &self.trail, &conflict)?;
                let conflicting = self.clause_store.literals(conflict.conflicting_clause).to_vec();
                self.backjump(analyzed, &conflicting, 0, ClauseKind::Learnt);
                continue;
            }

            let frontier = self.trail.assignment().first_unassigned_from(0);
            if frontier == self.variable_count {
                root = self.record_cube(root)?;
                self.record_leaf();
                let blocking: Vec<Literal> =
                    self.trail.decisions().iter().rev().map(|d| d.invert()).collect();
                if blocking.is_empty() {
                    return Ok(SearchEnd::Complete(root));
                }
                self.stats.blocking_clauses += 1;
                let analyzed = self
                    .analyzer
                    .analyse_literals(&self.clause_store, &self.trail, &blocking)
                    .ok_or_else(|| SolveError::MissingUip(blocking.clone()))??;
                self.backjump(analyzed, &blocking, 0, ClauseKind::Blocking);
                continue;
            }

            if self.interrupt.is_interrupted() {
                info!("interrupted after {} solutions", self.counter.value());
                self.counter.mark_inexact();
                return Ok(SearchEnd::Interrupted(root));
            }
            let literal = Literal::new(Variable::from_index(frontier), self.config.polarity);
            self.stats.decisions += 1;
            self.trail.add_decision(literal);
        }
    }

    /// Adds the current complete assignment to the diagram under `root`.
    fn record_cube(&mut self, root: NodeRef) -> Result<NodeRef, SolveError> {
        let assignment = self.trail.assignment();
        let values = assignment.as_complete().ok_or_else(|| {
            SolveError::UnassignedChain(Variable::from_index(assignment.first_unassigned_from(0)))
        })?;
        Ok(self.diagram.insert_cube(root, &values))
    }

    /// Propagates to a fixpoint, re-asserting learnt units that backtracking undid.
    fn propagate(&mut self) -> Option<Conflict> {
        loop {
            let (propagated, conflict) =
                UnitPropagator::new(&mut self.clause_store, &mut self.trail).propagate();
            self.stats.propagations += propagated;
            if conflict.is_some() {
                return conflict;
            }

            let mut asserted = false;
            for &(unit, clause) in &self.learnt_units {
                match self.trail.value(unit) {
                    Some(true) => {}
                    Some(false) => {
                        return Some(Conflict {
                            conflicting_literal: unit.invert(),
                            conflicting_clause: clause,
                        })
                    }
                    None => {
                        self.trail.add_inferred(unit, Some(clause));
                        asserted = true;
                    }
                }
            }
            if !asserted {
                return None;
            }
        }
    }

    /// Handles a conflict in non-blocking mode. Returns the root once the whole search has
    /// closed.
    fn resolve_conflict(&mut self, conflict: Conflict) -> Result<Option<NodeRef>, SolveError> {
        self.stats.conflicts += 1;
        let level = self.trail.current_decision_level();
        if level == 0 {
            debug!("conflict at level 0");
            return self.close_branch(NodeRef::REJECT);
        }

        let analyzed = self
            .analyzer
            .analyse_conflict(&self.clause_store, &self.trail, &conflict)?;
        let protected = self.path.protected_level();
        if analyzed.sublevel_start.is_none() && protected == level {
            // The branch being explored has no solutions. Jumping past it would lose the
            // committed first branch, so it closes empty instead.
            debug!("conflict closes second branch at level {}", level);
            let unit = analyzed.asserting_literal();
            if analyzed.learnt_clause.len() == 1 && !self.known_units.contains(&unit) {
                let clause = self
                    .clause_store
                    .add_clause(&analyzed.learnt_clause, ClauseKind::Learnt);
                self.stats.learnt_clauses += 1;
                self.remember_unit(unit, clause);
            }
            return self.close_branch(NodeRef::REJECT);
        }

        let conflicting = self.clause_store.literals(conflict.conflicting_clause).to_vec();
        self.backjump(analyzed, &conflicting, protected, ClauseKind::Learnt);
        Ok(None)
    }

    /// Undoes the search down to the level chosen by the backtrack strategy (never below `floor`
    /// or the asserting level) and asserts the learnt clause there.
    fn backjump(
        &mut self,
        analyzed: AnalyzedConflict,
        conflicting: &[Literal],
        floor: usize,
        kind: ClauseKind,
    ) {
        if let Some(position) = analyzed.sublevel_start {
            trace!("cutting back to sub-level at {}", position);
            self.trail.truncate(position);
        } else {
            let target = self
                .strategy
                .find_backtrack_point(&self.clause_store, &self.trail, conflicting, &analyzed)
                .max(analyzed.asserting_level)
                .max(floor);
            debug!(
                "backtracking from level {} to {}",
                self.trail.current_decision_level(),
                target
            );
            self.path.truncate(target);
            self.trail.backtrack(target);
        }
        self.learn(analyzed, kind);
    }

    fn learn(&mut self, analyzed: AnalyzedConflict, kind: ClauseKind) {
        let asserting = analyzed.asserting_literal();
        let clause = self.clause_store.add_clause(&analyzed.learnt_clause, kind);
        match kind {
            ClauseKind::Blocking => {}
            _ => self.stats.learnt_clauses += 1,
        }
        if analyzed.learnt_clause.len() == 1 {
            self.remember_unit(asserting, clause);
        }
        self.trail.add_asserted(asserting, clause);
        self.discard_learnts_if_needed();
    }

    /// Keeps a learnt unit for re-assertion. Returns false if it was already known.
    fn remember_unit(&mut self, unit: Literal, clause: ClauseRef) -> bool {
        if !self.known_units.insert(unit) {
            return false;
        }
        self.learnt_units.push((unit, clause));
        true
    }

    fn discard_learnts_if_needed(&mut self) {
        let Some(limit) = self.config.max_learnts else {
            return;
        };
        if self.clause_store.live_learnt() <= limit {
            return;
        }
        let locked: FnvHashSet<ClauseRef> = self
            .trail
            .entries()
            .iter()
            .filter_map(|l| self.trail.reason(l.var()))
            .collect();
        self.stats.discarded_clauses += self
            .clause_store
            .discard_learnts(|clause| locked.contains(&clause));
    }

    /// Closes the branch at the current level with `result`: either moves its frame to the
    /// second branch, or builds the frame's node and keeps closing outwards. Returns the root
    /// once the root branch closes.
    fn close_branch(&mut self, mut result: NodeRef) -> Result<Option<NodeRef>, SolveError> {
        loop {
            let level = self.path.depth();
            let phase = match self.path.top() {
                None => return Ok(Some(result)),
                Some(frame) => frame.phase,
            };
            match phase {
                Phase::First => {
                    if let Some(flipped) = self.path.flip(result) {
                        trace!("first branch at level {} closed with {:?}", level, result);
                        self.trail.backtrack(level - 1);
                        self.trail.add_decision(flipped);
                    }
                    return Ok(None);
                }
                Phase::Second(first) => {
                    let Some(frame) = self.path.pop() else {
                        return Ok(Some(result));
                    };
                    let var = frame.literal.var();
                    let (low, high) = match frame.literal.polarity() {
                        true => (result, first),
                        false => (first, result),
                    };
                    let node = self.diagram.make_node(var, low, high);
                    trace!("closed {:?} at level {} as {:?}", var, level, node);
                    if let Some(signature) = frame.signature {
                        self.cache.insert(signature, node)?;
                    }
                    self.trail.backtrack(level - 1);
                    result = self.chain(level - 1, var.index(), node, true)?;
                }
            }
        }
    }

    /// Extends `node`, the result at position `end`, back to the start of the branch at `level`.
    /// Every variable in between was implied, so its node sends the implied value on and rejects
    /// the other.
    fn chain(
        &mut self,
        level: usize,
        end: usize,
        mut node: NodeRef,
        store: bool,
    ) -> Result<NodeRef, SolveError> {
        let store = store && self.config.cache_frequency == CacheFrequency::EveryVariable;
        for position in (self.path.branch_start(level)..end).rev() {
            let var = Variable::from_index(position);
            let value = self
                .trail
                .assignment()
                .get(var)
                .ok_or(SolveError::UnassignedChain(var))?;
            node = match value {
                true => self.diagram.make_node(var, NodeRef::REJECT, node),
                false => self.diagram.make_node(var, node, NodeRef::REJECT),
            };
            if store && self.cache.is_enabled() {
                let signature = self.signatures.signature(position, self.trail.assignment());
                self.cache.fill(signature, node)?;
            }
        }
        Ok(node)
    }

    /// Looks for a stored result along the current branch, up to and including the frontier.
    fn consult_cache(&mut self, level: usize, frontier: usize) -> CacheLookup {
        if !self.cache.is_enabled() {
            return CacheLookup::Miss(None);
        }
        if self.config.cache_frequency == CacheFrequency::EveryVariable {
            let checked = *self.path.checked_mut(level);
            for position in self.path.branch_start(level).max(checked)..frontier {
                let signature = self.signatures.signature(position, self.trail.assignment());
                if let Some(node) = self.cache.lookup(&signature) {
                    return CacheLookup::Hit(position, node);
                }
            }
            *self.path.checked_mut(level) = checked.max(frontier);
        }
        let signature = self.signatures.signature(frontier, self.trail.assignment());
        match self.cache.lookup(&signature) {
            Some(node) => CacheLookup::Hit(frontier, node),
            None => CacheLookup::Miss(Some(signature)),
        }
    }

    /// Closes every open frame after an interrupt, treating unexplored branches as rejecting.
    /// Nothing is cached, since the nodes built here are incomplete.
    fn abandon(&mut self) -> Result<NodeRef, SolveError> {
        self.counter.mark_inexact();
        let mut result = NodeRef::REJECT;
        while let Some(frame) = self.path.pop() {
            let level = self.path.depth() + 1;
            let var = frame.literal.var();
            // Results on the side of the first literal and of its negation
            let (taken, other) = match frame.phase {
                Phase::First => (result, NodeRef::REJECT),
                Phase::Second(first) => (first, result),
            };
            let (low, high) = match frame.literal.polarity() {
                true => (other, taken),
                false => (taken, other),
            };
            let node = self.diagram.make_node(var, low, high);
            self.trail.backtrack(level - 1);
            result = self.chain(level - 1, var.index(), node, false)?;
        }
        Ok(result)
    }

    fn record_leaf(&mut self) {
        debug_assert!(
            self.clause_store.originals().all(|clause| {
                self.trail
                    .assignment()
                    .evaluate(self.clause_store.literals(clause))
                    == EvaluationResult::True
            }),
            "leaf falsifies an input clause"
        );
        trace!("solution: {:?}", self.trail.assignment());
        self.stats.leaves += 1;
        self.counter.add_one();
        self.notify();
    }

    fn notify(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            (**observer)(&self.counter);
        }
    }

    /// Flushes the cache each time the diagram grows past the node budget.
    fn refresh_if_needed(&mut self) {
        let Some(threshold) = self.refresh_at else {
            return;
        };
        if self.diagram.len() <= threshold {
            return;
        }
        self.cache.clear();
        self.stats.refreshes += 1;
        self.refresh_at = self.config.max_nodes.map(|m| self.diagram.len() + m);
        info!("cache refreshed at {} nodes", self.diagram.len());
    }
}

#[cfg(test)]
mod test {
    use std::{cell::Cell, rc::Rc};

    use itertools::iproduct;
    use num_bigint::BigUint;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::{
        instance::*,
        solver::{
            config::*,
            clause_store::ClauseKind,
            diagram::{NodeRef, Reducer},
            dfs::{Instance, Outcome, Search, Solution},
            error::SolveError,
            interrupt::Interrupt,
        },
    };

    fn solve(formula: &Formula, config: SolverConfig) -> Solution {
        Instance::with_config(formula.clone(), config)
            .solve()
            .expect("search failed")
    }

    fn brute_force(formula: &Formula) -> Vec<Vec<bool>> {
        let n = formula.variable_count();
        (0..1u64 << n)
            .map(|bits| (0..n).map(|i| bits >> i & 1 == 1).collect::<Vec<_>>())
            .filter(|assignment| formula.evaluate(assignment))
            .collect()
    }

    fn all_configs() -> Vec<SolverConfig> {
        iproduct!(
            [SignatureKind::Cutset, SignatureKind::Separator],
            [CacheFrequency::Decisions, CacheFrequency::EveryVariable],
            [true, false],
            [
                BacktrackKind::Chronological,
                BacktrackKind::Backjump,
                BacktrackKind::ConflictBackjump,
                BacktrackKind::Combined
            ],
            [UipGranularity::DecisionLevel, UipGranularity::SubLevel],
            [SolutionMode::NonBlocking, SolutionMode::Blocking],
            [false, true]
        )
        .map(
            |(signature, cache_frequency, cache_enabled, backtrack, uip, mode, polarity)| {
                SolverConfig {
                    signature,
                    cache_frequency,
                    cache_enabled,
                    backtrack,
                    uip,
                    mode,
                    polarity,
                    ..SolverConfig::default()
                }
            },
        )
        .collect()
    }

    fn random_formula(rng: &mut StdRng, max_vars: usize, max_clauses: usize) -> Formula {
        let n = rng.gen_range(1..=max_vars);
        let mut formula = Formula::new(n);
        for _ in 0..rng.gen_range(0..=max_clauses) {
            let len = rng.gen_range(1..=3);
            let literals: Vec<Literal> = (0..len)
                .map(|_| {
                    Literal::new(Variable(rng.gen_range(0..n) as u64), rng.gen_bool(0.5))
                })
                .collect();
            formula.add_clause(&literals);
        }
        formula
    }

    #[test]
    fn test_single_positive_unit() {
        let _ = env_logger::builder().is_test(true).try_init();
        let formula = Formula::from_dimacs(1, &[vec![1]]);
        for config in all_configs() {
            let solution = solve(&formula, config);
            assert_eq!(solution.outcome(), Outcome::Satisfiable);
            assert_eq!(solution.count(), &BigUint::from(1u32));
            assert!(solution.is_exact());
            let root = solution.diagram().node(solution.root()).unwrap();
            assert_eq!(root.variable, Variable(0));
            assert_eq!((root.low, root.high), (NodeRef::REJECT, NodeRef::ACCEPT));
        }
    }

    #[test]
    fn test_binary_clause() {
        let formula = Formula::from_dimacs(2, &[vec![1, 2]]);
        for config in all_configs() {
            let solution = solve(&formula, config.clone());
            assert_eq!(solution.count(), &BigUint::from(3u32), "{:?}", config);
            assert!(!solution.accepts(&[false, false]));
            assert!(solution.accepts(&[true, false]));
            assert!(solution.accepts(&[false, true]));
            assert!(solution.accepts(&[true, true]));
        }
    }

    #[test]
    fn test_overlapping_clauses() {
        let formula = Formula::from_dimacs(3, &[vec![1, 2], vec![2, 3]]);
        for config in all_configs() {
            let solution = solve(&formula, config);
            assert_eq!(solution.count(), &BigUint::from(5u32));
            assert!(!solution.accepts(&[false, false, false]));
            assert!(!solution.accepts(&[false, false, true]));
            assert!(!solution.accepts(&[true, false, false]));
        }

        let mut instance = Instance::with_config(
            formula.clone(),
            SolverConfig {
                cache_enabled: false,
                ..SolverConfig::default()
            },
        );
        let handle = instance.interrupt_handle();
        instance.on_solution(move |_| handle.interrupt());
        let partial = instance.solve().unwrap();
        assert_eq!(partial.outcome(), Outcome::Interrupted);
        assert!(!partial.is_exact());
        assert!(partial.count() >= &BigUint::from(1u32));
        assert!(partial.count() <= &BigUint::from(5u32));
        for bits in 0..8u32 {
            let assignment: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
            if partial.accepts(&assignment) {
                assert!(formula.evaluate(&assignment));
            }
        }
    }

    #[test]
    fn test_trivially_unsatisfiable() {
        let formula = Formula::from_dimacs(1, &[vec![1], vec![-1]]);
        let solution = solve(&formula, SolverConfig::default());
        assert_eq!(solution.outcome(), Outcome::TriviallyUnsatisfiable);
        assert_eq!(solution.count(), &BigUint::from(0u32));
        assert_eq!(solution.root(), NodeRef::REJECT);

        let empty_clause = Formula::from_dimacs(2, &[vec![1, 2], vec![]]);
        assert_eq!(
            solve(&empty_clause, SolverConfig::default()).outcome(),
            Outcome::TriviallyUnsatisfiable
        );
    }

    #[test]
    fn test_unsatisfiable_after_search() {
        let formula = Formula::from_dimacs(
            2,
            &[vec![1, 2], vec![1, -2], vec![-1, 2], vec![-1, -2]],
        );
        for config in all_configs() {
            let solution = solve(&formula, config);
            assert_eq!(solution.outcome(), Outcome::Unsatisfiable);
            assert_eq!(solution.count(), &BigUint::from(0u32));
            assert!(solution.is_exact());
            assert_eq!(solution.root(), NodeRef::REJECT);
        }
    }

    #[test]
    fn test_empty_formula() {
        let no_vars = Formula::new(0);
        let solution = solve(&no_vars, SolverConfig::default());
        assert_eq!(solution.count(), &BigUint::from(1u32));
        assert_eq!(solution.root(), NodeRef::ACCEPT);

        // Every level after the first closes through the cache
        let solution = solve(&Formula::new(70), SolverConfig::default());
        assert_eq!(solution.count(), &(BigUint::from(1u32) << 70));
        assert_eq!(solution.stats().leaves, 2);
    }

    #[test]
    fn test_tautologies_and_duplicates_dropped() {
        let formula = Formula::from_dimacs(3, &[vec![1, -1, 2], vec![3, 3, 2]]);
        let solution = solve(&formula, SolverConfig::default());
        assert_eq!(solution.count(), &BigUint::from(6u32));
    }

    #[test]
    fn test_interrupt_after_first_solution() {
        for mode in [SolutionMode::NonBlocking, SolutionMode::Blocking] {
            let formula = Formula::new(20);
            // Without the cache every further solution needs another decision
            let mut instance = Instance::with_config(
                formula,
                SolverConfig {
                    mode,
                    cache_enabled: false,
                    ..SolverConfig::default()
                },
            );
            let handle = instance.interrupt_handle();
            instance.on_solution(move |_| handle.interrupt());
            let solution = instance.solve().unwrap();

            assert_eq!(solution.outcome(), Outcome::Interrupted);
            assert!(!solution.is_exact());
            assert!(solution.count() >= &BigUint::from(1u32));
            assert!(solution.count() <= &(BigUint::from(1u32) << 20));
            assert_eq!(
                &solution.diagram().model_count(solution.root()),
                solution.count()
            );
        }
    }

    #[test]
    fn test_interrupt_counts_are_monotone() {
        let formula = Formula::from_dimacs(6, &[vec![1, 2], vec![-3, 4], vec![5, -6, 1]]);
        let exact = brute_force(&formula).len();
        let mut previous = BigUint::from(0u32);
        for stop_after in 1..=exact {
            let mut instance = Instance::with_config(
                formula.clone(),
                SolverConfig {
                    cache_enabled: false,
                    ..SolverConfig::default()
                },
            );
            let handle = instance.interrupt_handle();
            let seen = Rc::new(Cell::new(0));
            let counter = seen.clone();
            instance.on_solution(move |_| {
                counter.set(counter.get() + 1);
                if counter.get() >= stop_after {
                    handle.interrupt();
                }
            });
            let solution = instance.solve().unwrap();
            assert!(solution.count() >= &previous);
            assert!(solution.count() <= &BigUint::from(exact));
            assert_eq!(
                &solution.diagram().model_count(solution.root()),
                solution.count()
            );
            for assignment in brute_force(&formula) {
                if !solution.accepts(&assignment) {
                    assert!(!solution.is_exact());
                }
            }
            previous = solution.count().clone();
        }
        assert_eq!(previous, BigUint::from(exact));
    }

    #[test]
    fn test_independent_halves_hit_cache() {
        let formula = Formula::from_dimacs(4, &[vec![1, 2], vec![3, 4]]);
        let with_cache = solve(&formula, SolverConfig::default());
        let without_cache = solve(
            &formula,
            SolverConfig {
                cache_enabled: false,
                ..SolverConfig::default()
            },
        );
        assert_eq!(with_cache.count(), &BigUint::from(9u32));
        assert_eq!(without_cache.count(), &BigUint::from(9u32));
        assert!(with_cache.stats().cache_hits > 0);
        assert_eq!(without_cache.stats().cache_hits, 0);
        assert_eq!(with_cache.decompose(), without_cache.decompose());
        assert!(with_cache.stats().decisions < without_cache.stats().decisions);
    }

    #[test]
    fn test_random_formulas_against_brute_force() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let configs = all_configs();
        for _ in 0..40 {
            let formula = random_formula(&mut rng, 7, 10);
            let expected = brute_force(&formula);
            let reference = solve(&formula, SolverConfig::default());
            for config in configs.iter() {
                let solution = solve(&formula, config.clone());
                assert!(solution.is_exact());
                assert_eq!(
                    solution.count(),
                    &BigUint::from(expected.len()),
                    "{:?} {:?}",
                    config,
                    formula
                );
                assert_eq!(
                    &solution.diagram().model_count(solution.root()),
                    solution.count()
                );
                for assignment in expected.iter() {
                    assert!(solution.accepts(assignment));
                }
                assert_eq!(solution.decompose(), reference.decompose(), "{:?}", config);
            }
        }
    }

    #[test]
    fn test_larger_random_formulas_across_strategies() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10 {
            let formula = random_formula(&mut rng, 12, 30);
            let expected = BigUint::from(brute_force(&formula).len());
            for (backtrack, uip) in iproduct!(
                [
                    BacktrackKind::Chronological,
                    BacktrackKind::Backjump,
                    BacktrackKind::ConflictBackjump,
                    BacktrackKind::Combined
                ],
                [UipGranularity::DecisionLevel, UipGranularity::SubLevel]
            ) {
                for signature in [SignatureKind::Cutset, SignatureKind::Separator] {
                    let config = SolverConfig {
                        backtrack,
                        uip,
                        signature,
                        ..SolverConfig::default()
                    };
                    assert_eq!(solve(&formula, config).count(), &expected);
                }
            }
        }
    }

    #[test]
    fn test_refresh_keeps_results() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            let formula = random_formula(&mut rng, 10, 12);
            let plain = solve(&formula, SolverConfig::default());
            let refreshed = solve(
                &formula,
                SolverConfig {
                    max_nodes: Some(2),
                    ..SolverConfig::default()
                },
            );
            assert_eq!(plain.count(), refreshed.count());
            assert_eq!(plain.decompose(), refreshed.decompose());
        }

        let free = solve(
            &Formula::new(6),
            SolverConfig {
                max_nodes: Some(2),
                ..SolverConfig::default()
            },
        );
        assert_eq!(free.count(), &BigUint::from(64u32));
        assert!(free.stats().refreshes > 0);

        // Blocking mode ignores the node budget
        let formula = Formula::from_dimacs(4, &[vec![1, 2], vec![3, 4]]);
        let blocking = solve(
            &formula,
            SolverConfig {
                mode: SolutionMode::Blocking,
                max_nodes: Some(1),
                ..SolverConfig::default()
            },
        );
        assert_eq!(blocking.stats().refreshes, 0);
    }

    #[test]
    fn test_discarding_learnts_keeps_results() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..10 {
            let formula = random_formula(&mut rng, 10, 40);
            let expected = BigUint::from(brute_force(&formula).len());
            for mode in [SolutionMode::NonBlocking, SolutionMode::Blocking] {
                let config = SolverConfig {
                    mode,
                    max_learnts: Some(0),
                    ..SolverConfig::default()
                };
                assert_eq!(solve(&formula, config).count(), &expected);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let mut rng = StdRng::seed_from_u64(3);
        let formula = random_formula(&mut rng, 10, 25);
        for config in all_configs() {
            let first = solve(&formula, config.clone());
            let second = solve(&formula, config);
            assert_eq!(first.stats(), second.stats());
            assert_eq!(first.decompose(), second.decompose());
        }
    }

    #[test]
    fn test_write_decomposition_and_reduce() {
        let formula = Formula::from_dimacs(2, &[vec![-1, 2]]);
        let solution = solve(&formula, SolverConfig::default());
        let mut out = vec![];
        solution.write_decomposition(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // x1 free under !x0, forced true under x0
        assert_eq!(lines[0], "c bdd 2 3 root 4");
        assert_eq!(lines[1], "2 2 1 1");
        assert_eq!(lines[2], "3 2 0 1");
        assert_eq!(lines[3], "4 1 2 3");

        let mut reducer = Reducer::default();
        assert_eq!(solution.reduce(&mut reducer), 2);
    }

    #[test]
    fn test_pigeonhole_is_unsatisfiable() {
        // Four pigeons in three holes; p(i, j) is variable 3i + j + 1
        let p = |i: i64, j: i64| 3 * i + j + 1;
        let mut clauses = vec![];
        for i in 0..4 {
            clauses.push((0..3).map(|j| p(i, j)).collect::<Vec<_>>());
        }
        for j in 0..3 {
            for a in 0..4 {
                for b in (a + 1)..4 {
                    clauses.push(vec![-p(a, j), -p(b, j)]);
                }
            }
        }
        let formula = Formula::from_dimacs(12, &clauses);
        for config in all_configs() {
            let solution = solve(&formula, config);
            assert_eq!(solution.outcome(), Outcome::Unsatisfiable);
            assert!(solution.stats().conflicts > 0);
        }
    }

    fn random_3sat(rng: &mut StdRng, n: usize, clause_count: usize) -> Formula {
        let mut formula = Formula::new(n);
        for _ in 0..clause_count {
            let literals: Vec<Literal> = (0..3)
                .map(|_| Literal::new(Variable(rng.gen_range(0..n) as u64), rng.gen_bool(0.5)))
                .collect();
            formula.add_clause(&literals);
        }
        formula
    }

    #[test]
    fn test_asserted_sublevel_literal_does_not_loop() {
        let formula = Formula::from_dimacs(
            8,
            &[
                vec![-3, -5, -6],
                vec![-1, -2, 6],
                vec![2, -4, -4],
                vec![-3, -4, 8],
                vec![1, 2, -5],
                vec![1, 2, -8],
                vec![-1, -2, 2],
                vec![2, -4, 5],
                vec![-1, -6, 6],
                vec![2, -4, 7],
                vec![-5, 6, -8],
                vec![2, 2, 6],
                vec![-1, 1, 4],
                vec![-1, -8, 8],
                vec![-1, 4, -8],
                vec![-2, 4, 7],
                vec![-1, -5, -8],
                vec![2, -3, 3],
                vec![-5, 5, 7],
                vec![2, 6, -7],
            ],
        );
        let expected = brute_force(&formula);
        assert_eq!(expected.len(), 51);
        let reference = solve(&formula, SolverConfig::default());
        for config in all_configs() {
            let solution = solve(&formula, config.clone());
            assert_eq!(solution.count(), &BigUint::from(51u32), "{:?}", config);
            for assignment in expected.iter() {
                assert!(solution.accepts(assignment));
            }
            assert_eq!(solution.decompose(), reference.decompose(), "{:?}", config);
        }
    }

    #[test]
    fn test_blocking_mode_on_denser_formulas() {
        let mut rng = StdRng::seed_from_u64(0xb10c);
        for _ in 0..12 {
            let n = rng.gen_range(8..=12);
            let formula = random_3sat(&mut rng, n, n * 5 / 2);
            let expected = BigUint::from(brute_force(&formula).len());
            let reference = solve(&formula, SolverConfig::default());
            assert_eq!(reference.count(), &expected);
            for (backtrack, uip, polarity) in iproduct!(
                [
                    BacktrackKind::Chronological,
                    BacktrackKind::Backjump,
                    BacktrackKind::ConflictBackjump,
                    BacktrackKind::Combined
                ],
                [UipGranularity::DecisionLevel, UipGranularity::SubLevel],
                [false, true]
            ) {
                let config = SolverConfig {
                    mode: SolutionMode::Blocking,
                    backtrack,
                    uip,
                    polarity,
                    ..SolverConfig::default()
                };
                let solution = solve(&formula, config.clone());
                assert_eq!(solution.count(), &expected, "{:?} {:?}", config, formula);
                assert_eq!(solution.decompose(), reference.decompose(), "{:?}", config);
            }
        }
    }

    #[test]
    fn test_chained_nodes_are_not_stored_twice() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..20 {
            let formula = random_formula(&mut rng, 8, 14);
            for (signature, uip) in iproduct!(
                [SignatureKind::Cutset, SignatureKind::Separator],
                [UipGranularity::DecisionLevel, UipGranularity::SubLevel]
            ) {
                let config = SolverConfig {
                    signature,
                    uip,
                    cache_frequency: CacheFrequency::EveryVariable,
                    ..SolverConfig::default()
                };
                let solution = solve(&formula, config);
                assert_eq!(solution.stats().cache_duplicates, 0, "{:?}", formula);
            }
        }
    }

    #[test]
    fn test_recording_a_partial_cube_is_an_error() {
        let config = SolverConfig {
            mode: SolutionMode::Blocking,
            ..SolverConfig::default()
        };
        let mut search = Search::new(&config, 2, &[], Interrupt::new(), None).unwrap();
        assert!(matches!(
            search.record_cube(NodeRef::REJECT),
            Err(SolveError::UnassignedChain(Variable(0)))
        ));

        search.trail.add_decision(Literal::new(Variable(0), true));
        assert!(matches!(
            search.record_cube(NodeRef::REJECT),
            Err(SolveError::UnassignedChain(Variable(1)))
        ));

        search.trail.add_decision(Literal::new(Variable(1), false));
        let root = search.record_cube(NodeRef::REJECT).unwrap();
        assert_eq!(search.diagram.model_count(root), BigUint::from(1u32));
    }

    #[test]
    fn test_learnt_units_are_remembered_once() {
        let config = SolverConfig::default();
        let mut search = Search::new(&config, 3, &[], Interrupt::new(), None).unwrap();
        let unit = Literal::new(Variable(2), false);
        let clause = search.clause_store.add_clause(&[unit], ClauseKind::Learnt);
        assert!(search.remember_unit(unit, clause));
        assert!(!search.remember_unit(unit, clause));
        assert!(search.remember_unit(unit.invert(), clause));
        assert_eq!(search.learnt_units.len(), 2);
        assert!(search.known_units.contains(&unit));
    }
}
