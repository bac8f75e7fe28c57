use thiserror::Error;

use crate::{acec::AcecError, miter::MiterError, sat::SolverError};

use super::NodeId;

/// The result of an AIG operation.
pub type Result<T> = std::result::Result<T, AigError>;

/// Error returned when an AIG operation failed.
#[derive(Debug, Error)]
pub enum AigError {
    /// The node with given id does not exist.
    #[error("node with id={0} does not exist")]
    NodeDoesNotExist(NodeId),

    /// Invalid operation on a node which does not have such specified fanin.
    /// Only gates have fanins.
    #[error("the node has no such fanin")]
    NoFanin,

    /// A gate refers to a fanin which is not strictly older than itself.
    #[error("node id={node} has fanin id={fanin} which breaks the topological order")]
    InvalidFanin { node: NodeId, fanin: NodeId },

    /// The AIG has reached an invalid state. This should never happen.
    #[error("the AIG has reached an invalid state - this should not happen - error: {0}")]
    InvalidState(String),

    /// Just forwarding a [`MiterError`].
    #[error("{0}")]
    MiterError(#[from] MiterError),

    /// Just forwarding an [`AcecError`].
    #[error("{0}")]
    AcecError(#[from] AcecError),

    /// Just forwarding a [`SolverError`].
    #[error("{0}")]
    SolverError(#[from] SolverError),
}
