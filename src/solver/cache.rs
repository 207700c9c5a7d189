use fnv::FnvHashMap;
use log::{trace, warn};

use super::{diagram::NodeRef, error::SolveError, signature::Signature};

/// Maps residual-subproblem signatures to the diagram node that represents them. A disabled
/// cache misses on every lookup and stores nothing.
pub(crate) struct Cache {
    enabled: bool,
    entries: FnvHashMap<Signature, NodeRef>,
    lookups: usize,
    hits: usize,
    duplicates: usize,
}

impl Cache {
    pub(crate) fn new(enabled: bool) -> Cache {
        Cache {
            enabled,
            entries: FnvHashMap::default(),
            lookups: 0,
            hits: 0,
            duplicates: 0,
        }
    }

    pub(crate) fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn lookup(&mut self, signature: &Signature) -> Option<NodeRef> {
        if !self.enabled {
            return None;
        }
        self.lookups += 1;
        let found = self.entries.get(signature).copied();
        if let Some(node) = found {
            self.hits += 1;
            trace!("cache hit {:?} -> {:?}", signature, node);
        }
        found
    }

    /// Records the node for a signature. Storing a different node under a known signature means
    /// two equal residual subproblems were given different functions, which is an error.
    pub(crate) fn insert(&mut self, signature: Signature, node: NodeRef) -> Result<(), SolveError> {
        if !self.enabled {
            return Ok(());
        }
        match self.entries.get(&signature) {
            Some(&existing) if existing == node => {
                warn!("{:?} stored twice for {:?}", node, signature);
                self.duplicates += 1;
                Ok(())
            }
            Some(&existing) => Err(SolveError::InconsistentCache {
                signature,
                existing,
                rebuilt: node,
            }),
            None => {
                trace!("cache store {:?} -> {:?}", signature, node);
                self.entries.insert(signature, node);
                Ok(())
            }
        }
    }

    /// Like `insert`, but an equal entry is expected: nodes along an implied chain are often
    /// stored already by an earlier pass over the same residual subproblem.
    pub(crate) fn fill(&mut self, signature: Signature, node: NodeRef) -> Result<(), SolveError> {
        if !self.enabled {
            return Ok(());
        }
        match self.entries.get(&signature) {
            Some(&existing) if existing == node => Ok(()),
            _ => self.insert(signature, node),
        }
    }

    /// Drops every entry. Nodes in the diagram are unaffected.
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn lookups(&self) -> usize {
        self.lookups
    }

    pub(crate) fn hits(&self) -> usize {
        self.hits
    }

    /// Inserts that found the same node already stored
    pub(crate) fn duplicates(&self) -> usize {
        self.duplicates
    }
}
