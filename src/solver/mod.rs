mod assignment_set;
mod backtrack;
mod cache;
mod clause_index;
mod clause_store;
mod config;
mod counter;
mod dfs;
mod dfs_path;
mod diagram;
mod error;
mod interrupt;
mod knowledge_graph;
mod signature;
mod sorted_vec;
mod trail;
mod unit_propagator;

pub use crate::solver::config::*;
pub use crate::solver::counter::SolutionCounter;
pub use crate::solver::dfs::*;
pub use crate::solver::diagram::{
    DecomposedNode, Diagram, DiagramNode, NodeRef, ReductionSink, Reducer,
};
pub use crate::solver::error::SolveError;
pub use crate::solver::interrupt::Interrupt;
pub use crate::solver::signature::Signature;
