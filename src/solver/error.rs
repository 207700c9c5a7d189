use thiserror::Error;

use crate::instance::{Literal, Variable};

use super::diagram::NodeRef;
use super::signature::Signature;

/// Internal invariant violations. These indicate a bug in the search, not a property of the
/// input formula.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("conflict analysis found no literal of the current level in {0:?}")]
    MissingUip(Vec<Literal>),
    #[error("{0:?} was inferred without a reason")]
    MissingReason(Variable),
    #[error("cache entry at {signature:?} maps to {existing:?}, rebuilt subgraph is {rebuilt:?}")]
    InconsistentCache {
        signature: Signature,
        existing: NodeRef,
        rebuilt: NodeRef,
    },
    #[error("{0:?} is unassigned inside a committed branch")]
    UnassignedChain(Variable),
}
