//! Reinsertion of a box in normalized form.
//!
//! The leaves of every rank are summed again with a fixed arrangement of full and half adders,
//! column by column, and each root is replaced by the column bit of its rank. Two circuits whose
//! boxes share their leaves thus end up with the same adder logic.

use std::collections::{HashSet, VecDeque};

use log::{debug, warn};

use crate::{Aig, AigEdge, AigNode, NodeId, Result, aig::map_edge};

use super::tree::AdderBox;

/// Full adder out of native exclusive or gates. Returns `(sum, carry)`.
fn full_adder(aig: &mut Aig, a: AigEdge, b: AigEdge, c: AigEdge) -> Result<(AigEdge, AigEdge)> {
    let s1 = aig.new_xor(a, b)?;
    let sum = aig.new_xor(s1, c)?;
    let g = aig.new_and(a, b)?;
    let p = aig.new_and(s1, c)?;
    Ok((sum, aig.new_or(g, p)?))
}

/// Sums weighted columns of literals. Returns one bit per column, the carry out of the last
/// column is dropped.
pub fn reduce_columns(aig: &mut Aig, mut columns: Vec<Vec<AigEdge>>) -> Result<Vec<AigEdge>> {
    let width = columns.len();
    columns.push(Vec::new());
    for w in 0..width {
        let mut column: VecDeque<AigEdge> = columns[w].drain(..).collect();
        while column.len() > 1 {
            let a = column.pop_front().unwrap_or(AigEdge::FALSE);
            let b = column.pop_front().unwrap_or(AigEdge::FALSE);
            let (sum, carry) = match column.pop_front() {
                Some(c) => full_adder(aig, a, b, c)?,
                None => (aig.new_xor(a, b)?, aig.new_and(a, b)?),
            };
            column.push_back(sum);
            columns[w + 1].push(carry);
        }
        columns[w] = column.into_iter().collect();
    }
    Ok(columns
        .into_iter()
        .take(width)
        .map(|c| c.first().copied().unwrap_or(AigEdge::FALSE))
        .collect())
}

/// Why a box cannot be reinserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    NoRoot,
    /// A rank holds several roots, or none inside the root range.
    RootCount { rank: usize, roots: usize },
    /// Leaves outside the range of root ranks.
    LeafOutOfRange { rank: usize },
    /// A leaf depends on a root.
    LeafAfterRoot { leaf: NodeId },
}

/// Range of ranks holding roots, each of them exactly one.
fn root_range(b: &AdderBox) -> std::result::Result<(usize, usize), Rejection> {
    let lo = b.roots.iter().position(|r| !r.is_empty()).ok_or(Rejection::NoRoot)?;
    let hi = b.roots.iter().rposition(|r| !r.is_empty()).ok_or(Rejection::NoRoot)?;
    for rank in lo..=hi {
        let roots = b.roots[rank].len();
        if roots != 1 || b.roots[rank][0].is_cst() {
            return Err(Rejection::RootCount { rank, roots });
        }
    }
    for (rank, leaves) in b.leaves.iter().enumerate() {
        if !leaves.is_empty() && (rank < lo || rank > hi) {
            return Err(Rejection::LeafOutOfRange { rank });
        }
    }
    Ok((lo, hi))
}

/// Leaves of a rank in reinsertion order: shared ones first, then unique ones, when the box
/// went through the matcher.
fn ordered_leaves(b: &AdderBox, rank: usize) -> Vec<AigEdge> {
    let matched = b.shared[rank].len() + b.unique[rank].len() == b.leaves[rank].len();
    if matched {
        b.shared[rank]
            .iter()
            .chain(b.unique[rank].iter())
            .copied()
            .collect()
    } else {
        b.leaves[rank].clone()
    }
}

/// Checks whether `b` can be reinserted in `aig`.
pub fn check(aig: &Aig, b: &AdderBox) -> std::result::Result<(usize, usize), Rejection> {
    let range = root_range(b)?;
    let roots: HashSet<NodeId> = b.roots.iter().flatten().map(|e| e.get_node_id()).collect();
    let leaves: Vec<NodeId> = b.leaves.iter().flatten().map(|e| e.get_node_id()).collect();
    for &leaf in &leaves {
        if aig.cone(&[leaf]).iter().any(|id| roots.contains(id)) {
            return Err(Rejection::LeafAfterRoot { leaf });
        }
    }
    Ok(range)
}

/// Copy of `aig` where the roots of `b` are recomputed from its leaves by normalized adders.
/// `None` when the box cannot be reinserted.
pub fn rewrite(aig: &Aig, b: &AdderBox) -> Result<Option<Aig>> {
    let (lo, hi) = match check(aig, b) {
        Ok(range) => range,
        Err(rejection) => {
            warn!("box cannot be reinserted: {:?}", rejection);
            return Ok(None);
        }
    };

    let mut out = Aig::with_inputs(aig.num_inputs());
    let mut map = vec![AigEdge::FALSE; aig.num_nodes()];
    let mut done = vec![false; aig.num_nodes()];
    let copy = |id: NodeId, out: &mut Aig, map: &mut Vec<AigEdge>| -> Result<()> {
        let node = aig.node(id)?;
        let edge = match node {
            AigNode::Input(index) => out.get_input(*index)?,
            _ => out.copy_node(node, id, map)?,
        };
        map[id] = edge;
        Ok(())
    };

    let leaf_ids: Vec<NodeId> = b.leaves.iter().flatten().map(|e| e.get_node_id()).collect();
    for id in aig.cone(&leaf_ids) {
        copy(id, &mut out, &mut map)?;
        done[id] = true;
    }

    let columns: Vec<Vec<AigEdge>> = (lo..=hi)
        .map(|r| {
            ordered_leaves(b, r)
                .into_iter()
                .map(|leaf| map_edge(&map, leaf))
                .collect()
        })
        .collect();
    let gates = out.num_gates();
    let bits = reduce_columns(&mut out, columns)?;
    debug!(
        "{} gates reinserted for ranks {} to {}",
        out.num_gates() - gates,
        lo,
        hi
    );
    for (r, bit) in (lo..=hi).zip(bits) {
        let root = b.roots[r][0];
        map[root.get_node_id()] = bit.not_if(root.get_complement());
        done[root.get_node_id()] = true;
    }

    for id in aig.node_ids() {
        if !done[id] {
            copy(id, &mut out, &mut map)?;
        }
    }
    for &output in aig.get_outputs() {
        out.add_output(map_edge(&map, output))?;
    }
    Ok(Some(out.cleanup()?))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::acec::{adder::AdderSet, cuts::CutParams, testing};

    fn derive(aig: &Aig) -> Option<AdderBox> {
        let set = AdderSet::detect(aig, CutParams::default()).unwrap();
        AdderBox::derive(aig, &set, None).unwrap()
    }

    #[test]
    fn reduce_columns_test() {
        let mut aig = Aig::with_inputs(5);
        let x: Vec<AigEdge> = (0..5).map(|i| aig.get_input(i).unwrap()).collect();
        // x0 + x1 + x2 + 2 * (x3 + x4), on three bits
        let columns = vec![vec![x[0], x[1], x[2]], vec![x[3], x[4]], Vec::new()];
        let bits = reduce_columns(&mut aig, columns).unwrap();
        assert_eq!(bits.len(), 3);
        for bit in bits {
            aig.add_output(bit).unwrap();
        }
        for m in 0..32u32 {
            let inputs: Vec<bool> = (0..5).map(|i| (m >> i) & 1 == 1).collect();
            let expected = (m & 1) + ((m >> 1) & 1) + ((m >> 2) & 1)
                + 2 * (((m >> 3) & 1) + ((m >> 4) & 1));
            assert_eq!(aig.output_value(&inputs, false).unwrap(), (expected & 7) as i128);
        }
    }

    #[test]
    fn ripple_carry_adder_test() {
        for native in [true, false] {
            let aig = testing::ripple_carry_adder(3, native);
            let b = derive(&aig).unwrap();
            let rewritten = rewrite(&aig, &b).unwrap().unwrap();
            assert!(rewritten.check_integrity().is_ok());
            assert!(testing::same_truth_tables(&aig, &rewritten));
        }
    }

    #[test]
    fn multiplier_test() {
        for native in [true, false] {
            let aig = testing::csa_multiplier(3, native);
            let b = derive(&aig).unwrap();
            if let Some(rewritten) = rewrite(&aig, &b).unwrap() {
                assert!(testing::same_truth_tables(&aig, &rewritten));
            }
        }
    }

    #[test]
    fn rejection_test() {
        let mut aig = Aig::with_inputs(2);
        let a = aig.get_input(0).unwrap();
        let c = aig.get_input(1).unwrap();
        let ab = aig.new_and(a, c).unwrap();
        aig.add_output(ab).unwrap();

        let b = AdderBox::with_ranks(2);
        assert_eq!(check(&aig, &b), Err(Rejection::NoRoot));

        let mut b = AdderBox::with_ranks(2);
        b.roots[0] = vec![a, c];
        assert_eq!(check(&aig, &b), Err(Rejection::RootCount { rank: 0, roots: 2 }));

        let mut b = AdderBox::with_ranks(2);
        b.roots[1] = vec![a];
        b.leaves[0] = vec![c];
        assert_eq!(check(&aig, &b), Err(Rejection::LeafOutOfRange { rank: 0 }));

        let mut b = AdderBox::with_ranks(2);
        b.roots[0] = vec![a];
        b.leaves[0] = vec![ab];
        assert_eq!(
            check(&aig, &b),
            Err(Rejection::LeafAfterRoot {
                leaf: ab.get_node_id()
            })
        );
        assert!(rewrite(&aig, &b).unwrap().is_none());
    }
}
