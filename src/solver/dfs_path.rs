use crate::instance::*;
use core::fmt;

use super::{diagram::NodeRef, signature::Signature};

/// Which branch of a decision is being explored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    First,
    /// The first branch closed with this node; the flipped branch is being explored.
    Second(NodeRef),
}

/// A decision whose two branches are explored in turn. Frame `k` (one-based) owns decision
/// level `k` of the trail.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    /// The literal the first branch was taken with
    pub(crate) literal: Literal,
    pub(crate) phase: Phase,
    /// The cache key of the residual problem at the decision, when the cache is consulted there
    pub(crate) signature: Option<Signature>,
    // Positions of the current branch before this one have already missed the cache
    checked: usize,
}

/// Stores the traversal path of the DFS. Note: the root is not a frame; it owns decision level 0
/// and its branch starts at the first variable.
#[derive(Clone, Default)]
pub(crate) struct DFSPath {
    frames: Vec<Frame>,
    root_checked: usize,
}

impl DFSPath {
    pub(crate) fn new() -> DFSPath {
        DFSPath::default()
    }

    /// The number of open decisions
    pub(crate) fn depth(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn push(&mut self, literal: Literal, signature: Option<Signature>) {
        self.frames.push(Frame {
            literal,
            phase: Phase::First,
            signature,
            checked: literal.var().index() + 1,
        });
    }

    pub(crate) fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub(crate) fn top(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Moves the top frame to its second branch.
    pub(crate) fn flip(&mut self, first: NodeRef) -> Option<Literal> {
        let frame = self.frames.last_mut()?;
        frame.phase = Phase::Second(first);
        frame.checked = frame.literal.var().index() + 1;
        Some(frame.literal.invert())
    }

    /// Drops the frames above `level`.
    pub(crate) fn truncate(&mut self, level: usize) {
        self.frames.truncate(level);
    }

    /// The deepest level whose first branch has already been committed to the diagram. Jumping
    /// below it would lose that branch.
    pub(crate) fn protected_level(&self) -> usize {
        self.frames
            .iter()
            .rposition(|f| matches!(f.phase, Phase::Second(_)))
            .map_or(0, |ix| ix + 1)
    }

    /// The first variable of the branch explored at `level`.
    pub(crate) fn branch_start(&self, level: usize) -> usize {
        match level {
            0 => 0,
            l => self.frames[l - 1].literal.var().index() + 1,
        }
    }

    pub(crate) fn checked_mut(&mut self, level: usize) -> &mut usize {
        match level {
            0 => &mut self.root_checked,
            l => &mut self.frames[l - 1].checked,
        }
    }
}

impl fmt::Debug for DFSPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "DFSPath [")?;
        for (ix, frame) in self.frames.iter().enumerate() {
            if ix > 0 {
                write!(f, ", ")?;
            }
            match frame.phase {
                Phase::First => write!(f, "{:?}", frame.literal)?,
                Phase::Second(_) => write!(f, "{:?}'", frame.literal.invert())?,
            }
        }
        write!(f, "]")
    }
}
