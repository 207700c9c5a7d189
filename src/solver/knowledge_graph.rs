use log::trace;

use crate::instance::*;

use super::clause_store::ClauseRef;

// As we process and make deductions (through unit propogation), we would like to store the graph. This is the global knowledge graph.
// Only the vertices of currently assigned variables are meaningful.
#[derive(Debug, Clone)]
pub(crate) struct KnowledgeGraph {
    vertices: Vec<Node>,
}

impl KnowledgeGraph {
    pub(crate) fn new(variable_count: usize) -> KnowledgeGraph {
        KnowledgeGraph {
            vertices: vec![
                Node {
                    level: 0,
                    position: 0,
                    reason: None,
                };
                variable_count
            ],
        }
    }

    /// Records an assignment without a reason: a decision, a flipped decision, or a unit of the
    /// input formula at level zero.
    pub(crate) fn add_decision(&mut self, decision: Literal, level: usize, position: usize) {
        trace!("decision: {:?} @ {}", decision, level);
        self.vertices[decision.var().index()] = Node {
            level,
            position,
            reason: None,
        };
    }

    pub(crate) fn add_inferred(
        &mut self,
        inferred: Literal,
        level: usize,
        position: usize,
        reason: ClauseRef,
    ) {
        trace!("inference: {:?} @ {} from {:?}", inferred, level, reason);
        self.vertices[inferred.var().index()] = Node {
            level,
            position,
            reason: Some(reason),
        };
    }

    pub(crate) fn vertex(&self, var: Variable) -> &Node {
        &self.vertices[var.index()]
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
    // The decision level the variable was assigned at
    pub(crate) level: usize,
    // The index of the assignment in the trail
    pub(crate) position: usize,
    // The clause that allowed us to infer our way here
    pub(crate) reason: Option<ClauseRef>,
}
