//! Module defining the [`Aig`] struct, as well as [`AigNode`], [`AigEdge`] and some others relevant structs.
//!
//! The graph is an arena: nodes live in a `Vec` and refer to each other by [`NodeId`].
//! Every other structure of the crate (adder records, boxes, monomials) only stores ids.
//!
//! To start proving combinational equivalence, check [`crate::miter::Miter`] and [`crate::sat`].

mod clone;
pub mod dfs;
pub mod dot;
pub mod edge;
pub mod error;
mod integrity;
pub mod node;
pub mod sim;
pub mod trav;

use std::{collections::HashMap, ops::Range};

pub(crate) use clone::map_edge;
pub use edge::{AigEdge, FaninId};
pub use error::{AigError, Result};
pub use node::{AigNode, NodeId};

/// A whole AIG.
///
/// Nodes are appended to an arena and never removed, so ids are stable and topologically
/// ordered: every gate has a larger id than its fanins. Gates are structurally hashed on creation,
/// so asking twice for the same gate returns the same edge.
///
/// To get rid of logic that no output depends on, call [`.cleanup()`], which returns a compacted copy.
///
/// [`.cleanup()`]: Aig::cleanup
#[derive(Debug, Clone)]
pub struct Aig {
    nodes: Vec<AigNode>,
    inputs: Vec<NodeId>,
    outputs: Vec<AigEdge>,
    strash: HashMap<AigNode, NodeId>,
}

impl Default for Aig {
    fn default() -> Self {
        Aig::new()
    }
}

impl Aig {
    /// Create a brand new AIG (constant node [`AigNode::False`] included).
    pub fn new() -> Self {
        Aig {
            nodes: vec![AigNode::False],
            inputs: Vec::new(),
            outputs: Vec::new(),
            strash: HashMap::new(),
        }
    }

    /// Create a new AIG with `n` primary inputs already allocated.
    pub fn with_inputs(n: usize) -> Self {
        let mut aig = Aig::new();
        for _ in 0..n {
            aig.add_input();
        }
        aig
    }

    /// Retrieves a node from its id.
    pub fn get_node(&self, id: NodeId) -> Option<&AigNode> {
        self.nodes.get(id)
    }

    /// Retrieves a node from its id, failing if it does not exist.
    pub fn node(&self, id: NodeId) -> Result<&AigNode> {
        self.nodes.get(id).ok_or(AigError::NodeDoesNotExist(id))
    }

    /// Number of nodes, constant included.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Number of AND and XOR gates.
    pub fn num_gates(&self) -> usize {
        self.nodes.len() - self.inputs.len() - 1
    }

    /// Number of XOR-marked gates.
    pub fn num_xors(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_xor()).count()
    }

    /// All node ids, in topological order.
    pub fn node_ids(&self) -> Range<NodeId> {
        0..self.nodes.len()
    }

    /// Ids of the AND and XOR gates, in topological order.
    pub fn gate_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.node_ids().filter(|&id| self.nodes[id].is_gate())
    }

    /// Retrieves inputs id (in input order).
    pub fn get_inputs(&self) -> &[NodeId] {
        &self.inputs
    }

    /// The positive literal of the `index`-th input.
    pub fn get_input(&self, index: usize) -> Result<AigEdge> {
        self.inputs
            .get(index)
            .map(|&id| AigEdge::new(id, false))
            .ok_or(AigError::InvalidState(format!(
                "input index {} out of {} inputs",
                index,
                self.inputs.len()
            )))
    }

    /// Retrieves outputs.
    pub fn get_outputs(&self) -> &[AigEdge] {
        &self.outputs
    }

    /// Returns the fanins of a node (`None` for terminals).
    pub fn fanins(&self, id: NodeId) -> Option<[AigEdge; 2]> {
        self.nodes.get(id)?.fanins()
    }

    fn check_edge(&self, edge: AigEdge) -> Result<()> {
        if edge.node < self.nodes.len() {
            Ok(())
        } else {
            Err(AigError::NodeDoesNotExist(edge.node))
        }
    }

    fn push_node(&mut self, node: AigNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        id
    }

    /// Create a new primary input and return its positive literal.
    pub fn add_input(&mut self) -> AigEdge {
        let index = self.inputs.len();
        let id = self.push_node(AigNode::Input(index));
        self.inputs.push(id);
        AigEdge::new(id, false)
    }

    fn and_key(fanin0: AigEdge, fanin1: AigEdge) -> AigNode {
        let (fanin0, fanin1) = if fanin0 <= fanin1 {
            (fanin0, fanin1)
        } else {
            (fanin1, fanin0)
        };
        AigNode::And { fanin0, fanin1 }
    }

    /// Create a new and gate (or retrieve it if the exact same gate already exists).
    ///
    /// Trivial cases are simplified without creating any node:
    ///
    /// ```rust
    /// use acec::{Aig, AigEdge};
    /// let mut aig = Aig::new();
    /// let a = aig.add_input();
    /// let b = aig.add_input();
    /// assert_eq!(aig.new_and(a, AigEdge::TRUE).unwrap(), a);
    /// assert_eq!(aig.new_and(a, !a).unwrap(), AigEdge::FALSE);
    /// let ab = aig.new_and(a, b).unwrap();
    /// assert_eq!(aig.new_and(b, a).unwrap(), ab);
    /// ```
    pub fn new_and(&mut self, fanin0: AigEdge, fanin1: AigEdge) -> Result<AigEdge> {
        self.check_edge(fanin0)?;
        self.check_edge(fanin1)?;

        if fanin0.is_cst_false() || fanin1.is_cst_false() || fanin0.is_complement_of(&fanin1) {
            return Ok(AigEdge::FALSE);
        }
        if fanin0.is_cst_true() || fanin0 == fanin1 {
            return Ok(fanin1);
        }
        if fanin1.is_cst_true() {
            return Ok(fanin0);
        }

        let key = Aig::and_key(fanin0, fanin1);
        if let Some(&id) = self.strash.get(&key) {
            return Ok(AigEdge::new(id, false));
        }
        let id = self.push_node(key);
        self.strash.insert(key, id);
        Ok(AigEdge::new(id, false))
    }

    /// Create a new XOR-marked gate (or retrieve it).
    ///
    /// Complemented fanins are normalized away: the returned edge carries the inversion.
    pub fn new_xor(&mut self, fanin0: AigEdge, fanin1: AigEdge) -> Result<AigEdge> {
        self.check_edge(fanin0)?;
        self.check_edge(fanin1)?;

        let complement = fanin0.complement ^ fanin1.complement;
        let (a, b) = (fanin0.regular(), fanin1.regular());

        if a == b {
            return Ok(AigEdge::FALSE.not_if(complement));
        }
        if a.is_cst() {
            return Ok(b.not_if(complement));
        }
        if b.is_cst() {
            return Ok(a.not_if(complement));
        }

        let (a, b) = if a < b { (a, b) } else { (b, a) };
        let key = AigNode::Xor {
            fanin0: a,
            fanin1: b,
        };
        let id = match self.strash.get(&key) {
            Some(&id) => id,
            None => {
                let id = self.push_node(key);
                self.strash.insert(key, id);
                id
            }
        };
        Ok(AigEdge::new(id, complement))
    }

    /// `a | b`, built from an and gate.
    pub fn new_or(&mut self, fanin0: AigEdge, fanin1: AigEdge) -> Result<AigEdge> {
        Ok(!self.new_and(!fanin0, !fanin1)?)
    }

    /// `sel ? then : other`.
    pub fn new_mux(&mut self, sel: AigEdge, then: AigEdge, other: AigEdge) -> Result<AigEdge> {
        let t = self.new_and(sel, then)?;
        let e = self.new_and(!sel, other)?;
        self.new_or(t, e)
    }

    /// Majority of three literals.
    pub fn new_maj(&mut self, a: AigEdge, b: AigEdge, c: AigEdge) -> Result<AigEdge> {
        let ab = self.new_and(a, b)?;
        let a_or_b = self.new_or(a, b)?;
        let rest = self.new_and(c, a_or_b)?;
        self.new_or(ab, rest)
    }

    /// Looks up an and gate in the structural hash table without creating it.
    /// Constant and trivial cases are answered as [`Aig::new_and`] would.
    pub fn lookup_and(&self, fanin0: AigEdge, fanin1: AigEdge) -> Option<AigEdge> {
        if fanin0.node >= self.nodes.len() || fanin1.node >= self.nodes.len() {
            return None;
        }
        if fanin0.is_cst_false() || fanin1.is_cst_false() || fanin0.is_complement_of(&fanin1) {
            return Some(AigEdge::FALSE);
        }
        if fanin0.is_cst_true() || fanin0 == fanin1 {
            return Some(fanin1);
        }
        if fanin1.is_cst_true() {
            return Some(fanin0);
        }
        self.strash
            .get(&Aig::and_key(fanin0, fanin1))
            .map(|&id| AigEdge::new(id, false))
    }

    /// Mark an existing literal as an output.
    pub fn add_output(&mut self, edge: AigEdge) -> Result<()> {
        self.check_edge(edge)?;
        self.outputs.push(edge);
        Ok(())
    }

    /// Redirect the `index`-th output to another literal.
    pub fn set_output(&mut self, index: usize, edge: AigEdge) -> Result<()> {
        self.check_edge(edge)?;
        let len = self.outputs.len();
        let output = self
            .outputs
            .get_mut(index)
            .ok_or(AigError::InvalidState(format!(
                "output index {} out of {} outputs",
                index, len
            )))?;
        *output = edge;
        Ok(())
    }

    /// Number of references to each node: one per gate fanin plus one per output.
    pub fn fanout_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.nodes.len()];
        for node in &self.nodes {
            if let Some([fanin0, fanin1]) = node.fanins() {
                counts[fanin0.node] += 1;
                counts[fanin1.node] += 1;
            }
        }
        for output in &self.outputs {
            counts[output.node] += 1;
        }
        counts
    }

    /// Returns the transitive fanin of the given roots (roots included), in topological order.
    pub fn cone(&self, roots: &[NodeId]) -> Vec<NodeId> {
        let mut seen = trav::TravIds::new(self.nodes.len());
        seen.increment();
        let mut cone = Vec::new();
        let mut dfs = dfs::Dfs::from_nodes(roots.to_vec());
        while let Some(id) = dfs.next(self) {
            if seen.set_current(id) {
                cone.push(id);
            }
        }
        cone.sort_unstable();
        cone
    }
}

impl PartialEq for Aig {
    /// Two AIGs are equal if they have the same node arena, inputs and outputs.
    /// This is structural equality, see [`crate::sat`] for functional equivalence.
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.inputs == other.inputs && self.outputs == other.outputs
    }
}

impl Eq for Aig {}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_input_test() {
        let mut aig = Aig::new();
        let a = aig.add_input();
        let b = aig.add_input();
        assert_eq!(a, AigEdge::new(1, false));
        assert_eq!(b, AigEdge::new(2, false));
        assert_eq!(aig.get_inputs(), &[1, 2]);
        assert_eq!(aig.get_input(1).unwrap(), b);
        assert!(aig.get_input(2).is_err());
        assert_eq!(aig.node(2).unwrap(), &AigNode::Input(1));
        assert!(aig.node(3).is_err());
    }

    #[test]
    fn new_and_test() {
        let mut aig = Aig::with_inputs(2);
        let a = aig.get_input(0).unwrap();
        let b = aig.get_input(1).unwrap();

        assert_eq!(aig.new_and(a, AigEdge::FALSE).unwrap(), AigEdge::FALSE);
        assert_eq!(aig.new_and(AigEdge::TRUE, b).unwrap(), b);
        assert_eq!(aig.new_and(a, a).unwrap(), a);
        assert_eq!(aig.new_and(a, !a).unwrap(), AigEdge::FALSE);
        assert_eq!(aig.num_gates(), 0);

        let ab = aig.new_and(a, !b).unwrap();
        assert_eq!(aig.new_and(!b, a).unwrap(), ab);
        assert_eq!(aig.num_gates(), 1);
        assert_eq!(aig.lookup_and(!b, a), Some(ab));
        assert_eq!(aig.lookup_and(b, a), None);

        assert!(aig.new_and(a, AigEdge::new(42, false)).is_err());
    }

    #[test]
    fn new_xor_test() {
        let mut aig = Aig::with_inputs(2);
        let a = aig.get_input(0).unwrap();
        let b = aig.get_input(1).unwrap();

        assert_eq!(aig.new_xor(a, a).unwrap(), AigEdge::FALSE);
        assert_eq!(aig.new_xor(a, !a).unwrap(), AigEdge::TRUE);
        assert_eq!(aig.new_xor(a, AigEdge::TRUE).unwrap(), !a);

        let x = aig.new_xor(a, b).unwrap();
        assert!(!x.get_complement());
        assert_eq!(aig.new_xor(!a, b).unwrap(), !x);
        assert_eq!(aig.new_xor(!b, !a).unwrap(), x);
        assert_eq!(aig.num_xors(), 1);
        if let AigNode::Xor { fanin0, fanin1 } = aig.node(x.get_node_id()).unwrap() {
            assert!(!fanin0.get_complement() && !fanin1.get_complement());
        } else {
            panic!("expected an xor gate");
        }
    }

    #[test]
    fn outputs_test() {
        let mut aig = Aig::with_inputs(2);
        let a = aig.get_input(0).unwrap();
        let b = aig.get_input(1).unwrap();
        let o = aig.new_or(a, b).unwrap();
        aig.add_output(o).unwrap();
        aig.add_output(!a).unwrap();
        assert_eq!(aig.get_outputs(), &[o, !a]);

        aig.set_output(1, AigEdge::FALSE).unwrap();
        assert_eq!(aig.get_outputs()[1], AigEdge::FALSE);
        assert!(aig.set_output(2, a).is_err());
        assert!(aig.add_output(AigEdge::new(9, false)).is_err());
    }

    #[test]
    fn fanout_counts_test() {
        let mut aig = Aig::with_inputs(3);
        let a = aig.get_input(0).unwrap();
        let b = aig.get_input(1).unwrap();
        let c = aig.get_input(2).unwrap();
        let ab = aig.new_and(a, b).unwrap();
        let abc = aig.new_and(ab, !c).unwrap();
        aig.add_output(abc).unwrap();
        aig.add_output(ab).unwrap();

        let counts = aig.fanout_counts();
        assert_eq!(counts[a.get_node_id()], 1);
        assert_eq!(counts[c.get_node_id()], 1);
        assert_eq!(counts[ab.get_node_id()], 2);
        assert_eq!(counts[abc.get_node_id()], 1);
    }

    #[test]
    fn cone_test() {
        let mut aig = Aig::with_inputs(3);
        let a = aig.get_input(0).unwrap();
        let b = aig.get_input(1).unwrap();
        let c = aig.get_input(2).unwrap();
        let ab = aig.new_and(a, b).unwrap();
        let bc = aig.new_xor(b, c).unwrap();
        assert_eq!(aig.cone(&[ab.get_node_id()]), vec![1, 2, ab.get_node_id()]);
        assert_eq!(aig.cone(&[bc.get_node_id()]), vec![2, 3, bc.get_node_id()]);
    }

    #[test]
    fn mux_maj_test() {
        let mut aig = Aig::with_inputs(3);
        let a = aig.get_input(0).unwrap();
        let b = aig.get_input(1).unwrap();
        let c = aig.get_input(2).unwrap();
        let m = aig.new_mux(a, b, c).unwrap();
        let maj = aig.new_maj(a, b, c).unwrap();
        aig.add_output(m).unwrap();
        aig.add_output(maj).unwrap();
        for x in 0..8u32 {
            let bits = [x & 1 == 1, x & 2 == 2, x & 4 == 4];
            let out = aig.eval(&bits).unwrap();
            assert_eq!(out[0], if bits[0] { bits[1] } else { bits[2] });
            let ones = bits.iter().filter(|&&v| v).count();
            assert_eq!(out[1], ones >= 2);
        }
    }
}
