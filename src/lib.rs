pub mod acec;
pub mod aig;
pub mod cnf;
pub mod miter;
pub mod sat;

// Re-exporting symbols and modules.
pub use acec::{AcecOptions, AcecReport, AcecStatus, check_equivalence, check_miter};
pub use aig::dfs;
pub use aig::dot;
pub use aig::{Aig, AigEdge, AigError, AigNode, FaninId, NodeId, Result};
