use std::fmt;

use fnv::FnvHashMap;
use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::instance::Variable;

/// A handle to a node of a `Diagram`. The two terminals have fixed handles.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(u32);

impl NodeRef {
    pub const REJECT: NodeRef = NodeRef(0);
    pub const ACCEPT: NodeRef = NodeRef(1);

    /// One of the two persistent terminals.
    pub fn terminal(accept: bool) -> NodeRef {
        match accept {
            true => NodeRef::ACCEPT,
            false => NodeRef::REJECT,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.0 < 2
    }

    fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            NodeRef::REJECT => write!(f, "reject"),
            NodeRef::ACCEPT => write!(f, "accept"),
            NodeRef(ix) => write!(f, "n{}", ix),
        }
    }
}

/// A decision node: `low` is followed when `variable` is false, `high` when it is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagramNode {
    pub variable: Variable,
    pub low: NodeRef,
    pub high: NodeRef,
}

/// An ordered binary decision diagram over the variables in index order. Nodes are hash-consed,
/// so two nodes with the same variable and children are the same node, and a test whose both
/// branches reject is replaced by the reject terminal. Redundant tests with two equal non-reject
/// branches are kept; `Reducer` removes them.
///
/// Each node carries the number of assignments to the variables from its own position onwards
/// that reach accept. The accept terminal sits at position `variable_count`.
#[derive(Debug, Clone)]
pub struct Diagram {
    variable_count: usize,
    nodes: Vec<DiagramNode>,
    counts: Vec<BigUint>,
    unique_table: FnvHashMap<DiagramNode, NodeRef>,
}

impl Diagram {
    pub fn new(variable_count: usize) -> Diagram {
        let terminal = DiagramNode {
            variable: Variable::from_index(variable_count),
            low: NodeRef::REJECT,
            high: NodeRef::REJECT,
        };
        Diagram {
            variable_count,
            nodes: vec![terminal, terminal],
            counts: vec![BigUint::zero(), BigUint::one()],
            unique_table: FnvHashMap::default(),
        }
    }

    pub fn variable_count(&self) -> usize {
        self.variable_count
    }

    /// The number of decision nodes allocated so far.
    pub fn len(&self) -> usize {
        self.nodes.len() - 2
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The decision node behind a handle, or None for a terminal.
    pub fn node(&self, node: NodeRef) -> Option<DiagramNode> {
        match node.is_terminal() {
            true => None,
            false => Some(self.nodes[node.index()]),
        }
    }

    /// The position of a node in the variable order; terminals sit past the last variable.
    pub fn level(&self, node: NodeRef) -> usize {
        match node.is_terminal() {
            true => self.variable_count,
            false => self.nodes[node.index()].variable.index(),
        }
    }

    pub(crate) fn make_node(&mut self, variable: Variable, low: NodeRef, high: NodeRef) -> NodeRef {
        if low == NodeRef::REJECT && high == NodeRef::REJECT {
            return NodeRef::REJECT;
        }
        debug_assert!(self.level(low) > variable.index() || low == NodeRef::REJECT);
        debug_assert!(self.level(high) > variable.index() || high == NodeRef::REJECT);
        let key = DiagramNode {
            variable,
            low,
            high,
        };
        if let Some(&existing) = self.unique_table.get(&key) {
            return existing;
        }
        let count = self.scaled_count(low, variable.index() + 1)
            + self.scaled_count(high, variable.index() + 1);
        let node = NodeRef(self.nodes.len() as u32);
        self.nodes.push(key);
        self.counts.push(count);
        self.unique_table.insert(key, node);
        node
    }

    /// Accepting assignments of the variables from the node's own position onwards.
    pub fn count(&self, node: NodeRef) -> &BigUint {
        &self.counts[node.index()]
    }

    /// Accepting assignments of all variables, treating those above the root as free.
    pub fn model_count(&self, root: NodeRef) -> BigUint {
        self.scaled_count(root, 0)
    }

    fn scaled_count(&self, node: NodeRef, from: usize) -> BigUint {
        if node == NodeRef::REJECT {
            return BigUint::zero();
        }
        self.count(node) << (self.level(node) - from)
    }

    /// Follows a complete assignment from the root to a terminal.
    pub fn evaluate(&self, root: NodeRef, assignment: &[bool]) -> bool {
        let mut current = root;
        while let Some(node) = self.node(current) {
            current = match assignment[node.variable.index()] {
                true => node.high,
                false => node.low,
            };
        }
        current == NodeRef::ACCEPT
    }

    /// The children of `node` when `variable` is tested at position `variable`, treating a skipped
    /// test as a don't-care.
    fn cofactors(&self, node: NodeRef, variable: usize) -> (NodeRef, NodeRef) {
        match self.node(node) {
            Some(n) if n.variable.index() == variable => (n.low, n.high),
            _ if node == NodeRef::REJECT => (NodeRef::REJECT, NodeRef::REJECT),
            _ => (node, node),
        }
    }

    /// Adds a complete assignment to the set accepted by `root`, returning the new root.
    pub(crate) fn insert_cube(&mut self, root: NodeRef, assignment: &[bool]) -> NodeRef {
        let mut path = Vec::with_capacity(self.variable_count);
        let mut current = root;
        for (v, &value) in assignment.iter().enumerate() {
            path.push(current);
            let (low, high) = self.cofactors(current, v);
            current = if value { high } else { low };
        }

        let mut rebuilt = NodeRef::ACCEPT;
        for (v, &value) in assignment.iter().enumerate().rev() {
            let (low, high) = self.cofactors(path[v], v);
            let variable = Variable::from_index(v);
            rebuilt = match value {
                true => self.make_node(variable, low, rebuilt),
                false => self.make_node(variable, rebuilt, high),
            };
        }
        rebuilt
    }

    /// Lists the nodes reachable from `root`, children before parents, renumbered so that the
    /// reject terminal is 0, accept is 1 and decision nodes count up from 2 in the order a
    /// low-first depth-first walk finishes them. Equal functions give equal listings.
    pub fn decompose(&self, root: NodeRef) -> Vec<DecomposedNode> {
        let mut ids: FnvHashMap<NodeRef, usize> = FnvHashMap::default();
        ids.insert(NodeRef::REJECT, 0);
        ids.insert(NodeRef::ACCEPT, 1);
        let mut listing = vec![];
        let mut stack = vec![(root, false)];
        while let Some((current, expanded)) = stack.pop() {
            if ids.contains_key(&current) {
                continue;
            }
            let node = self.nodes[current.index()];
            if expanded {
                let id = listing.len() + 2;
                ids.insert(current, id);
                listing.push(DecomposedNode {
                    id,
                    variable: node.variable,
                    low: ids[&node.low],
                    high: ids[&node.high],
                });
            } else {
                stack.push((current, true));
                stack.push((node.high, false));
                stack.push((node.low, false));
            }
        }
        listing
    }
}

/// One line of a `Diagram::decompose` listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecomposedNode {
    pub id: usize,
    pub variable: Variable,
    pub low: usize,
    pub high: usize,
}

/// Receives the finished diagram for post-processing, such as minimization or export, and
/// reports the size of what it produced.
pub trait ReductionSink {
    fn reduce(&mut self, diagram: &Diagram, root: NodeRef, variable_count: usize) -> usize;
}

/// Produces the fully reduced form: tests whose branches agree are dropped and isomorphic
/// subgraphs merged. Reports the number of decision nodes left.
#[derive(Debug, Default)]
pub struct Reducer {
    nodes: Vec<(Variable, usize, usize)>,
}

impl Reducer {
    pub fn nodes(&self) -> &[(Variable, usize, usize)] {
        &self.nodes
    }
}

impl ReductionSink for Reducer {
    fn reduce(&mut self, diagram: &Diagram, root: NodeRef, _variable_count: usize) -> usize {
        self.nodes.clear();
        let mut unique: FnvHashMap<(Variable, usize, usize), usize> = FnvHashMap::default();
        // Reduced ids of the listing entries; terminals keep 0 and 1
        let mut reduced = vec![0, 1];
        for entry in diagram.decompose(root) {
            let low = reduced[entry.low];
            let high = reduced[entry.high];
            let id = if low == high {
                low
            } else {
                let key = (entry.variable, low, high);
                *unique.entry(key).or_insert_with(|| {
                    self.nodes.push(key);
                    self.nodes.len() + 1
                })
            };
            reduced.push(id);
        }
        self.nodes.len()
    }
}
