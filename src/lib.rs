pub mod dimacs;
pub mod instance;
pub mod solver;
