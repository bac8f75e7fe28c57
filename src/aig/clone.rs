use crate::{Aig, AigEdge, AigError, AigNode, NodeId, Result};

/// Maps a literal of a source AIG through a node mapping table.
pub(crate) fn map_edge(map: &[AigEdge], edge: AigEdge) -> AigEdge {
    map[edge.get_node_id()].not_if(edge.get_complement())
}

impl Aig {
    /// Recreates a gate of another AIG inside `self`, its fanins being translated through `map`.
    /// Terminals are answered from `map` directly.
    pub fn copy_node(&mut self, node: &AigNode, id: NodeId, map: &[AigEdge]) -> Result<AigEdge> {
        match node {
            AigNode::False => Ok(AigEdge::FALSE),
            AigNode::Input(_) => map
                .get(id)
                .copied()
                .ok_or(AigError::NodeDoesNotExist(id)),
            AigNode::And { fanin0, fanin1 } => {
                self.new_and(map_edge(map, *fanin0), map_edge(map, *fanin1))
            }
            AigNode::Xor { fanin0, fanin1 } => {
                self.new_xor(map_edge(map, *fanin0), map_edge(map, *fanin1))
            }
        }
    }

    /// Copies all the logic of `other` into `self`, the inputs of `other` being driven by `inputs`.
    /// Outputs of `other` are not registered, the returned table maps every node of `other`
    /// to its literal in `self`.
    ///
    /// The strategy is the one of a deep clone:
    /// - map constant and inputs
    /// - create gates in topological order.
    pub fn append(&mut self, other: &Aig, inputs: &[AigEdge]) -> Result<Vec<AigEdge>> {
        if inputs.len() != other.num_inputs() {
            return Err(AigError::InvalidState(format!(
                "appending an AIG with {} inputs using {} literals",
                other.num_inputs(),
                inputs.len()
            )));
        }
        let mut map = vec![AigEdge::FALSE; other.num_nodes()];
        for (id, node) in other.nodes.iter().enumerate() {
            map[id] = match node {
                AigNode::Input(index) => inputs[*index],
                _ => self.copy_node(node, id, &map)?,
            };
        }
        Ok(map)
    }

    /// Returns a copy keeping all the inputs but only the selected outputs (in the given order),
    /// and only the logic they depend on.
    pub fn dup_with_outputs(&self, outputs: &[usize]) -> Result<Aig> {
        let mut aig = Aig::with_inputs(self.num_inputs());
        let selected = outputs
            .iter()
            .map(|&i| {
                self.outputs.get(i).copied().ok_or(AigError::InvalidState(format!(
                    "output index {} out of {} outputs",
                    i,
                    self.outputs.len()
                )))
            })
            .collect::<Result<Vec<AigEdge>>>()?;

        let cone = self.cone(&selected.iter().map(|e| e.get_node_id()).collect::<Vec<_>>());
        let mut map = vec![AigEdge::FALSE; self.num_nodes()];
        for id in cone {
            map[id] = match &self.nodes[id] {
                AigNode::Input(index) => aig.get_input(*index)?,
                node => aig.copy_node(node, id, &map)?,
            };
        }
        for output in selected {
            aig.add_output(map_edge(&map, output))?;
        }
        Ok(aig)
    }

    /// Call this function when you are done with your rewrite.
    /// Returns a compacted copy where all nodes that are not reachable from an output are gone.
    pub fn cleanup(&self) -> Result<Aig> {
        self.dup_with_outputs(&(0..self.outputs.len()).collect::<Vec<_>>())
    }
}
