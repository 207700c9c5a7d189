/// Session options. Every combination is valid; each option is read once when the search starts.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    pub signature: SignatureKind,
    pub cache_frequency: CacheFrequency,
    /// With the cache disabled every lookup misses and nothing is stored.
    pub cache_enabled: bool,
    pub backtrack: BacktrackKind,
    pub uip: UipGranularity,
    pub mode: SolutionMode,
    /// Flush the cache each time this many further diagram nodes have been created. Only
    /// honoured in non-blocking mode.
    pub max_nodes: Option<usize>,
    /// Discard old learnt clauses once more than this many are live.
    pub max_learnts: Option<usize>,
    /// The polarity tried first at each decision.
    pub polarity: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            signature: SignatureKind::Separator,
            cache_frequency: CacheFrequency::Decisions,
            cache_enabled: true,
            backtrack: BacktrackKind::Combined,
            uip: UipGranularity::SubLevel,
            mode: SolutionMode::NonBlocking,
            max_nodes: None,
            max_learnts: None,
            polarity: false,
        }
    }
}

/// How a residual subproblem is keyed in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    /// The cut clauses at the position not yet satisfied by the assigned prefix.
    Cutset,
    /// The values of the prefix variables that share a clause with a later variable.
    Separator,
}

impl std::fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cutset => write!(f, "cutset"),
            Self::Separator => write!(f, "separator"),
        }
    }
}

/// Where the cache is consulted and populated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFrequency {
    /// Only at decision points.
    Decisions,
    /// At every variable position, including positions fixed by propagation.
    EveryVariable,
}

impl std::fmt::Display for CacheFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decisions => write!(f, "decisions"),
            Self::EveryVariable => write!(f, "every-variable"),
        }
    }
}

/// How far to undo the search after a conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BacktrackKind {
    /// Undo only the most recent decision level.
    Chronological,
    /// Jump to the asserting level of the learnt clause.
    Backjump,
    /// Jump to the deepest decision the conflict depends on.
    ConflictBackjump,
    /// The deeper of the two jumps above.
    Combined,
}

impl std::fmt::Display for BacktrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chronological => write!(f, "bt"),
            Self::Backjump => write!(f, "bj"),
            Self::ConflictBackjump => write!(f, "cbj"),
            Self::Combined => write!(f, "bj+cbj"),
        }
    }
}

/// The granularity at which the first unique implication point is searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UipGranularity {
    DecisionLevel,
    SubLevel,
}

impl std::fmt::Display for UipGranularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecisionLevel => write!(f, "dlevel"),
            Self::SubLevel => write!(f, "sublevel"),
        }
    }
}

/// How recorded solutions are excluded from the rest of the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SolutionMode {
    /// Add a clause excluding the decisions that led to each solution.
    Blocking,
    /// Explore both branches of every decision and build the diagram as branches close.
    NonBlocking,
}

impl std::fmt::Display for SolutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blocking => write!(f, "blocking"),
            Self::NonBlocking => write!(f, "non-blocking"),
        }
    }
}
