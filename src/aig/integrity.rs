use crate::{Aig, AigEdge, AigError, AigNode, NodeId, Result};

impl Aig {
    /// Checking if the AIG structure is correct:
    /// - only node 0 is the constant `False`
    /// - inputs are registered at the position they claim
    /// - gates only refer to strictly older nodes, xor gates have regular fanins
    /// - the structural hash table maps every gate to itself
    /// - outputs refer to existing nodes.
    ///
    /// This function was written for debug purposes, as the library is supposed to maintain
    /// integrity of the AIG at any moment.
    pub fn check_integrity(&self) -> Result<()> {
        if self.nodes.first() != Some(&AigNode::False) {
            return Err(AigError::InvalidState(
                "node 0 must be the constant false node".to_string(),
            ));
        }

        for (id, node) in self.nodes.iter().enumerate() {
            self.check_node_integrity(id, node)?;
        }

        if self.strash.len() != self.num_gates() {
            return Err(AigError::InvalidState(format!(
                "{} hashed gates for {} gates",
                self.strash.len(),
                self.num_gates()
            )));
        }

        // Checking that all outputs are registered as nodes
        for output in &self.outputs {
            self.check_edge_integrity(output, self.nodes.len())?;
        }

        Ok(())
    }

    fn check_node_integrity(&self, id: NodeId, node: &AigNode) -> Result<()> {
        match node {
            AigNode::False => {
                if id != 0 {
                    return Err(AigError::InvalidState(format!(
                        "constant node found at id={}",
                        id
                    )));
                }
            }
            AigNode::Input(index) => {
                if self.inputs.get(*index) != Some(&id) {
                    return Err(AigError::InvalidState(format!(
                        "input id={} claims index {} which is not registered",
                        id, index
                    )));
                }
            }
            AigNode::And { fanin0, fanin1 } | AigNode::Xor { fanin0, fanin1 } => {
                self.check_edge_integrity(fanin0, id)?;
                self.check_edge_integrity(fanin1, id)?;
                if node.is_xor() && (fanin0.get_complement() || fanin1.get_complement()) {
                    return Err(AigError::InvalidState(format!(
                        "xor gate id={} has a complemented fanin",
                        id
                    )));
                }
                if self.strash.get(node) != Some(&id) {
                    return Err(AigError::InvalidState(format!(
                        "gate id={} is not in the structural hash table",
                        id
                    )));
                }
            }
        }
        Ok(())
    }

    /// The edge must point at an existing node older than `bound`.
    fn check_edge_integrity(&self, edge: &AigEdge, bound: NodeId) -> Result<()> {
        let fanin = edge.get_node_id();
        if fanin >= self.nodes.len() {
            return Err(AigError::NodeDoesNotExist(fanin));
        }
        if fanin >= bound {
            return Err(AigError::InvalidFanin {
                node: bound,
                fanin,
            });
        }
        Ok(())
    }
}
