//! Bottom-up enumeration of small cuts.
//!
//! The cuts of a gate are the pairwise unions of the cuts of its fanins (the trivial cut of a
//! fanin included), keeping the ones with at most `cut_size` leaves. The function of the gate
//! over each cut is then evaluated by truth-table propagation from the leaves.

use log::debug;

use crate::{
    Aig, AigError, AigNode, NodeId, Result,
    aig::trav::StampedValues,
};

use super::truth::VAR_PATTERNS;

/// Cut enumeration limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutParams {
    /// Largest number of leaves, at most 6.
    pub cut_size: usize,
    /// Largest number of non-trivial cuts kept per node.
    pub max_cuts: usize,
}

impl Default for CutParams {
    fn default() -> Self {
        CutParams {
            cut_size: 3,
            max_cuts: 64,
        }
    }
}

/// A set of leaves supporting the function of a node, together with this function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cut {
    /// Sorted, without duplicates.
    pub leaves: Vec<NodeId>,
    /// Function of the node over the leaves, leaf `i` being variable `i`.
    pub truth: u64,
}

impl Cut {
    pub fn trivial(id: NodeId) -> Self {
        Cut {
            leaves: vec![id],
            truth: VAR_PATTERNS[0],
        }
    }

    pub fn size(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_trivial(&self, id: NodeId) -> bool {
        self.leaves.len() == 1 && self.leaves[0] == id
    }
}

/// Union of two sorted leaf sets, `None` if it has more than `limit` leaves.
fn merge_leaves(a: &[NodeId], b: &[NodeId], limit: usize) -> Option<Vec<NodeId>> {
    let mut merged = Vec::with_capacity(limit);
    let (mut i, mut j) = (0, 0);
    while i < a.len() || j < b.len() {
        let next = if j == b.len() || (i < a.len() && a[i] < b[j]) {
            i += 1;
            a[i - 1]
        } else if i == a.len() || b[j] < a[i] {
            j += 1;
            b[j - 1]
        } else {
            i += 1;
            j += 1;
            a[i - 1]
        };
        if merged.len() == limit {
            return None;
        }
        merged.push(next);
    }
    Some(merged)
}

/// Whether the sorted leaf set `a` is included in the sorted leaf set `b`.
fn is_subset(a: &[NodeId], b: &[NodeId]) -> bool {
    a.len() <= b.len() && a.iter().all(|l| b.binary_search(l).is_ok())
}

/// Number of leaves referenced only once, which are likely to be inside a tree of logic.
fn tree_leaves(leaves: &[NodeId], refs: &[u32]) -> usize {
    leaves.iter().filter(|&&l| refs[l] == 1).count()
}

/// Evaluates `root` over `leaves` by propagating the leaf patterns.
/// `memo` is reset on entry, the walk stops at the leaves.
pub fn cut_truth(
    aig: &Aig,
    root: NodeId,
    leaves: &[NodeId],
    memo: &mut StampedValues<u64>,
) -> Result<u64> {
    memo.clear();
    memo.insert(0, 0);
    for (i, &leaf) in leaves.iter().enumerate() {
        memo.insert(leaf, VAR_PATTERNS[i]);
    }
    truth_rec(aig, root, memo)
}

fn truth_rec(aig: &Aig, id: NodeId, memo: &mut StampedValues<u64>) -> Result<u64> {
    if let Some(value) = memo.get(id) {
        return Ok(value);
    }
    let value = match aig.node(id)? {
        AigNode::And { fanin0, fanin1 } => {
            let v0 = truth_rec(aig, fanin0.get_node_id(), memo)?;
            let v1 = truth_rec(aig, fanin1.get_node_id(), memo)?;
            phase(v0, fanin0.get_complement()) & phase(v1, fanin1.get_complement())
        }
        AigNode::Xor { fanin0, fanin1 } => {
            let v0 = truth_rec(aig, fanin0.get_node_id(), memo)?;
            let v1 = truth_rec(aig, fanin1.get_node_id(), memo)?;
            v0 ^ v1
        }
        _ => {
            return Err(AigError::InvalidState(format!(
                "terminal node id={} is not covered by the cut",
                id
            )));
        }
    };
    memo.insert(id, value);
    Ok(value)
}

fn phase(value: u64, complement: bool) -> u64 {
    if complement { !value } else { value }
}

/// The cuts of every node. `cuts[id]` ends with the trivial cut of `id`.
#[derive(Debug, Clone)]
pub struct CutSet {
    cuts: Vec<Vec<Cut>>,
}

impl CutSet {
    /// Enumerates the cuts of all the nodes of `aig`, in topological order.
    ///
    /// Cuts containing another cut of the same node are dropped. The others are ranked by
    /// number of single-reference leaves, then by size, before being truncated to `max_cuts`.
    pub fn enumerate(aig: &Aig, params: CutParams) -> Result<Self> {
        let size = params.cut_size.min(6);
        let refs = aig.fanout_counts();
        let mut memo = StampedValues::new(aig.num_nodes());
        let mut cuts: Vec<Vec<Cut>> = Vec::with_capacity(aig.num_nodes());
        let mut total = 0;
        for id in aig.node_ids() {
            let node = aig.node(id)?;
            let Some([fanin0, fanin1]) = node.fanins() else {
                cuts.push(if node.is_false() {
                    Vec::new()
                } else {
                    vec![Cut::trivial(id)]
                });
                continue;
            };
            let mut merged: Vec<Vec<NodeId>> = Vec::new();
            for c0 in &cuts[fanin0.get_node_id()] {
                for c1 in &cuts[fanin1.get_node_id()] {
                    if let Some(leaves) = merge_leaves(&c0.leaves, &c1.leaves, size) {
                        if !merged.contains(&leaves) {
                            merged.push(leaves);
                        }
                    }
                }
            }
            let mut kept: Vec<Vec<NodeId>> = merged
                .iter()
                .filter(|l| {
                    !merged
                        .iter()
                        .any(|other| other.len() < l.len() && is_subset(other, l))
                })
                .cloned()
                .collect();
            kept.sort_by_key(|l| (tree_leaves(l, &refs), l.len()));
            kept.truncate(params.max_cuts);

            let mut list = Vec::with_capacity(kept.len() + 1);
            for leaves in kept {
                let truth = cut_truth(aig, id, &leaves, &mut memo)?;
                list.push(Cut { leaves, truth });
            }
            total += list.len();
            list.push(Cut::trivial(id));
            cuts.push(list);
        }
        debug!(
            "{} cuts of at most {} leaves over {} gates",
            total,
            size,
            aig.num_gates()
        );
        Ok(CutSet { cuts })
    }

    /// Cuts of node `id`, trivial cut last.
    pub fn cuts(&self, id: NodeId) -> &[Cut] {
        self.cuts.get(id).map(|c| c.as_slice()).unwrap_or(&[])
    }

    /// Non-trivial cuts of node `id`.
    pub fn gate_cuts(&self, id: NodeId) -> impl Iterator<Item = &Cut> {
        self.cuts(id).iter().filter(move |c| !c.is_trivial(id))
    }
}
