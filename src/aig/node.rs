use super::{AigEdge, AigError, FaninId, Result};

/// A node id.
///
/// Ids index the node arena of an [`Aig`](crate::Aig). The constant node [`AigNode::False`] has
/// id 0, and every gate has a larger id than both of its fanins.
pub type NodeId = usize;

/// An AIG node.
///
/// Nodes do not carry their own id, the arena position is the id. Gates only store their fanins,
/// fanouts are computed on demand (see [`Aig::fanout_counts`](crate::Aig::fanout_counts)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AigNode {
    /// The constant low/false signal.
    False,
    /// A primary input, carrying its position among the inputs.
    Input(usize),
    /// An AND gate with two fanins.
    And { fanin0: AigEdge, fanin1: AigEdge },
    /// An XOR-marked AND gate. Fanins are never complemented, the inversion is pushed to the
    /// edges pointing at the gate.
    Xor { fanin0: AigEdge, fanin1: AigEdge },
}

impl AigNode {
    pub fn is_false(&self) -> bool {
        matches!(self, AigNode::False)
    }

    pub fn is_input(&self) -> bool {
        matches!(self, AigNode::Input(_))
    }

    pub fn is_and(&self) -> bool {
        matches!(self, AigNode::And { .. })
    }

    pub fn is_xor(&self) -> bool {
        matches!(self, AigNode::Xor { .. })
    }

    /// Either an AND or an XOR gate.
    pub fn is_gate(&self) -> bool {
        self.is_and() || self.is_xor()
    }

    /// Position of the input among the primary inputs.
    pub fn input_index(&self) -> Option<usize> {
        match self {
            AigNode::Input(index) => Some(*index),
            _ => None,
        }
    }

    /// Returns both fanins of a gate, `None` for terminals.
    pub fn fanins(&self) -> Option<[AigEdge; 2]> {
        match self {
            AigNode::And { fanin0, fanin1 } | AigNode::Xor { fanin0, fanin1 } => {
                Some([*fanin0, *fanin1])
            }
            _ => None,
        }
    }

    /// Returns the requested fanin, or an error if the node is not a gate.
    pub fn get_fanin(&self, fanin: FaninId) -> Result<AigEdge> {
        let [fanin0, fanin1] = self.fanins().ok_or(AigError::NoFanin)?;
        Ok(match fanin {
            FaninId::Fanin0 => fanin0,
            FaninId::Fanin1 => fanin1,
        })
    }
}
