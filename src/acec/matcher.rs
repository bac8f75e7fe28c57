//! Alignment of the boxes of two circuits.
//!
//! Both circuits are copied into one structurally hashed graph sharing the inputs, and the leaves
//! of both boxes are replaced by their representative literal in that graph. Leaves are then
//! compared rank by rank.

use log::debug;

use crate::{Aig, AigEdge, Result, aig::map_edge, miter::MiterError};

use super::{
    AcecError,
    equiv::{EquivClasses, EquivParams},
    tree::AdderBox,
};

/// Both circuits in one graph.
#[derive(Debug, Clone)]
pub struct Combined {
    pub aig: Aig,
    pub map_a: Vec<AigEdge>,
    pub map_b: Vec<AigEdge>,
}

impl Combined {
    pub fn new(a: &Aig, b: &Aig) -> Result<Self> {
        if a.num_inputs() != b.num_inputs() {
            return Err(MiterError::MiterDifferentInputs(a.num_inputs(), b.num_inputs()).into());
        }
        let mut aig = Aig::with_inputs(a.num_inputs());
        let inputs = (0..a.num_inputs())
            .map(|i| aig.get_input(i))
            .collect::<Result<Vec<AigEdge>>>()?;
        let map_a = aig.append(a, &inputs)?;
        let map_b = aig.append(b, &inputs)?;
        Ok(Combined { aig, map_a, map_b })
    }
}

/// What the matcher did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchStats {
    /// 1 if the first box was moved one rank up, -1 if the second one was.
    pub shift: i32,
    /// Pairs of equal leaves replaced by one leaf a rank higher.
    pub moved: usize,
    pub shared: usize,
    pub unique_a: usize,
    pub unique_b: usize,
}

impl MatchStats {
    pub fn fully_shared(&self) -> bool {
        self.unique_a == 0 && self.unique_b == 0
    }
}

/// A leaf and its representative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Keyed {
    key: AigEdge,
    edge: AigEdge,
}

/// Number of equal keys in two sorted lists.
fn count_common(x: &[Keyed], y: &[Keyed]) -> usize {
    let (mut i, mut j, mut count) = (0, 0, 0);
    while i < x.len() && j < y.len() {
        match x[i].key.cmp(&y[j].key) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                count += 1;
                i += 1;
                j += 1;
            }
        }
    }
    count
}

/// Matches when rank `r` of `a` faces rank `r + shift` of `b`.
fn count_shifted(a: &[Vec<Keyed>], b: &[Vec<Keyed>], shift: isize) -> usize {
    a.iter()
        .enumerate()
        .filter_map(|(r, x)| {
            let rb = r as isize + shift;
            (rb >= 0)
                .then(|| b.get(rb as usize))
                .flatten()
                .map(|y| count_common(x, y))
        })
        .sum()
}

/// Replaces every pair of equal keys in a rank by a single leaf in the next rank.
fn move_duplicates(ranks: &mut Vec<Vec<Keyed>>) -> usize {
    let mut moved = 0;
    let mut r = 0;
    while r < ranks.len() {
        ranks[r].sort_unstable();
        let mut kept = Vec::with_capacity(ranks[r].len());
        let mut up = Vec::new();
        let mut iter = ranks[r].iter().copied().peekable();
        while let Some(leaf) = iter.next() {
            if iter.peek().is_some_and(|next| next.key == leaf.key) {
                iter.next();
                up.push(leaf);
            } else {
                kept.push(leaf);
            }
        }
        ranks[r] = kept;
        if !up.is_empty() {
            moved += up.len();
            if r + 1 == ranks.len() {
                ranks.push(Vec::new());
            }
            ranks[r + 1].extend(up);
        }
        r += 1;
    }
    moved
}

fn keyed(
    leaves: &[Vec<AigEdge>],
    map: &[AigEdge],
    classes: &EquivClasses,
) -> Vec<Vec<Keyed>> {
    leaves
        .iter()
        .map(|rank| {
            let mut rank: Vec<Keyed> = rank
                .iter()
                .map(|&edge| Keyed {
                    key: classes.repr(map_edge(map, edge)),
                    edge,
                })
                .collect();
            rank.sort_unstable();
            rank
        })
        .collect()
}

/// Aligns `box_a` (derived from `a`) with `box_b` (derived from `b`), and fills their
/// `shared` and `unique` leaves. Both boxes end up with the same number of ranks, their
/// leaves rewritten in the aligned form.
pub fn match_boxes(
    a: &Aig,
    b: &Aig,
    box_a: &mut AdderBox,
    box_b: &mut AdderBox,
    params: EquivParams,
) -> Result<MatchStats> {
    let combined = Combined::new(a, b)?;
    let mut candidates: Vec<_> = box_a
        .leaves
        .iter()
        .flatten()
        .map(|&e| map_edge(&combined.map_a, e).get_node_id())
        .chain(
            box_b
                .leaves
                .iter()
                .flatten()
                .map(|&e| map_edge(&combined.map_b, e).get_node_id()),
        )
        .collect();
    candidates.sort_unstable();
    candidates.dedup();
    let classes = EquivClasses::compute(&combined.aig, &candidates, params)?;

    let mut ka = keyed(&box_a.leaves, &combined.map_a, &classes);
    let mut kb = keyed(&box_b.leaves, &combined.map_b, &classes);

    let mut stats = MatchStats::default();
    let same = count_shifted(&ka, &kb, 0);
    let up = count_shifted(&ka, &kb, 1);
    let down = count_shifted(&ka, &kb, -1);
    debug!("leaf matches at shift 0: {}, +1: {}, -1: {}", same, up, down);
    if up > same && up >= down {
        box_a.insert_front_rank();
        ka.insert(0, Vec::new());
        stats.shift = 1;
    } else if down > same {
        box_b.insert_front_rank();
        kb.insert(0, Vec::new());
        stats.shift = -1;
    }

    stats.moved = move_duplicates(&mut ka) + move_duplicates(&mut kb);
    let ranks = ka.len().max(kb.len()).max(box_a.num_ranks()).max(box_b.num_ranks());
    ka.resize(ranks, Vec::new());
    kb.resize(ranks, Vec::new());
    box_a.resize(ranks);
    box_b.resize(ranks);

    for r in 0..ranks {
        let (x, y) = (&ka[r], &kb[r]);
        let (mut sa, mut sb, mut ua, mut ub) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());
        let (mut i, mut j) = (0, 0);
        while i < x.len() && j < y.len() {
            match x[i].key.cmp(&y[j].key) {
                std::cmp::Ordering::Less => {
                    ua.push(x[i].edge);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    ub.push(y[j].edge);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    sa.push(x[i].edge);
                    sb.push(y[j].edge);
                    i += 1;
                    j += 1;
                }
            }
        }
        ua.extend(x[i..].iter().map(|k| k.edge));
        ub.extend(y[j..].iter().map(|k| k.edge));

        if sa.len() != sb.len() {
            return Err(AcecError::SharedRankMismatch {
                rank: r,
                shared_a: sa.len(),
                shared_b: sb.len(),
            }
            .into());
        }
        for (k, s, u) in [(x, &sa, &ua), (y, &sb, &ub)] {
            if s.len() + u.len() != k.len() {
                return Err(AcecError::LeafCountMismatch {
                    rank: r,
                    expected: k.len(),
                    found: s.len() + u.len(),
                }
                .into());
            }
        }

        stats.shared += sa.len();
        stats.unique_a += ua.len();
        stats.unique_b += ub.len();
        box_a.leaves[r] = x.iter().map(|k| k.edge).collect();
        box_b.leaves[r] = y.iter().map(|k| k.edge).collect();
        box_a.shared[r] = sa;
        box_b.shared[r] = sb;
        box_a.unique[r] = ua;
        box_b.unique[r] = ub;
    }
    debug!(
        "{} shared leaf pairs, {} and {} unique leaves, shift {}, {} duplicates moved",
        stats.shared, stats.unique_a, stats.unique_b, stats.shift, stats.moved
    );
    Ok(stats)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::acec::{adder::AdderSet, cuts::CutParams, testing};

    fn derive(aig: &Aig) -> AdderBox {
        let set = AdderSet::detect(aig, CutParams::default()).unwrap();
        AdderBox::derive(aig, &set, None).unwrap().unwrap()
    }

    #[test]
    fn identical_test() {
        let a = testing::ripple_carry_adder(3, true);
        let b = a.clone();
        let mut box_a = derive(&a);
        let mut box_b = derive(&b);
        let stats =
            match_boxes(&a, &b, &mut box_a, &mut box_b, EquivParams::default()).unwrap();
        assert_eq!(stats.shift, 0);
        assert_eq!(stats.moved, 0);
        assert!(stats.fully_shared());
        assert_eq!(stats.shared, box_a.num_leaves());
        for r in 0..box_a.num_ranks() {
            assert_eq!(box_a.shared[r].len(), box_a.leaves[r].len());
            assert_eq!(box_a.shared[r], box_b.shared[r]);
        }
    }

    #[test]
    fn structurally_different_test() {
        let a = testing::ripple_carry_adder(3, true);
        let b = testing::ripple_carry_adder(3, false);
        let mut box_a = derive(&a);
        let mut box_b = derive(&b);
        let stats =
            match_boxes(&a, &b, &mut box_a, &mut box_b, EquivParams::default()).unwrap();
        assert!(stats.fully_shared());
        assert_eq!(stats.shared, 7);
        assert_eq!(box_a.num_ranks(), box_b.num_ranks());
    }

    #[test]
    fn shift_and_duplicates_test() {
        let aig = Aig::with_inputs(7);
        let x: Vec<AigEdge> = (0..7).map(|i| aig.get_input(i).unwrap()).collect();

        let mut box_a = AdderBox::with_ranks(2);
        box_a.leaves[0] = vec![x[0], x[1], x[2], x[6]];
        box_a.leaves[1] = vec![x[3], x[4], x[5]];
        // same leaves, permuted, one rank higher, with x6 counted twice below
        let mut box_b = AdderBox::with_ranks(3);
        box_b.leaves[0] = vec![x[6], x[6]];
        box_b.leaves[1] = vec![x[2], x[0], x[1]];
        box_b.leaves[2] = vec![x[5], x[3], x[4]];

        let stats = match_boxes(
            &aig,
            &aig,
            &mut box_a,
            &mut box_b,
            EquivParams::default(),
        )
        .unwrap();
        assert_eq!(stats.shift, 1);
        assert_eq!(stats.moved, 1);
        assert_eq!(stats.shared, 7);
        assert!(stats.fully_shared());
        assert!(box_a.leaves[0].is_empty());
        assert!(box_b.leaves[0].is_empty());
        assert_eq!(box_a.shared[1], box_b.shared[1]);
        assert_eq!(box_a.shared[1].len(), 4);
        assert_eq!(box_a.shared[2].len(), 3);
    }

    /// 3-bit ripple-carry adder over inputs 0..3 and 3..6, with a carry in computed from
    /// inputs 6 and 7. With `half`, that carry in comes from a half adder, one rank below, and
    /// the operands of the full adders are permuted.
    fn carry_in_adder(half: bool) -> Aig {
        let mut aig = Aig::with_inputs(8);
        let x: Vec<AigEdge> = (0..8).map(|i| aig.get_input(i).unwrap()).collect();
        let mut carry = if half {
            let (sum, carry) = testing::half_adder(&mut aig, x[6], x[7], true);
            aig.add_output(sum).unwrap();
            carry
        } else {
            aig.new_and(x[6], x[7]).unwrap()
        };
        for i in 0..3 {
            let (a, b) = if half { (x[3 + i], x[i]) } else { (x[i], x[3 + i]) };
            let (sum, c) = testing::full_adder(&mut aig, a, b, carry, true);
            aig.add_output(sum).unwrap();
            carry = c;
        }
        aig.add_output(carry).unwrap();
        aig
    }

    #[test]
    fn shifted_circuit_test() {
        let a = carry_in_adder(false);
        let b = carry_in_adder(true);
        let mut box_a = derive(&a);
        let mut box_b = derive(&b);
        assert_eq!(box_a.num_adders(), 3);
        assert_eq!(box_b.num_adders(), 4);
        assert_eq!(box_b.leaves[0].len(), 2);

        let stats =
            match_boxes(&a, &b, &mut box_a, &mut box_b, EquivParams::default()).unwrap();
        assert_eq!(stats.shift, 1);
        assert_eq!(stats.moved, 0);
        // the operand bits are shared, the carry in of `a` and the half adder operands are not
        assert_eq!(stats.shared, 6);
        assert_eq!(stats.unique_a, 1);
        assert_eq!(stats.unique_b, 2);
        assert_eq!(box_a.num_ranks(), box_b.num_ranks());
        assert!(box_a.leaves[0].is_empty());
        assert_eq!(box_b.unique[0].len(), 2);
        for r in 1..4 {
            assert_eq!(box_a.shared[r].len(), 2);
            assert_eq!(box_b.shared[r].len(), 2);
        }
        assert_eq!(box_a.unique[1].len(), 1);
    }

    #[test]
    fn move_duplicates_test() {
        let k = |n: usize| Keyed {
            key: AigEdge::new(n, false),
            edge: AigEdge::new(n, false),
        };
        let mut ranks = vec![vec![k(1), k(2), k(1), k(1)], vec![k(1)]];
        assert_eq!(move_duplicates(&mut ranks), 2);
        assert_eq!(ranks[0], vec![k(1), k(2)]);
        assert!(ranks[1].is_empty());
        assert_eq!(ranks[2], vec![k(1)]);
    }

    #[test]
    fn combined_test() {
        let a = testing::ripple_carry_adder(2, true);
        let b = Aig::with_inputs(3);
        assert!(Combined::new(&a, &b).is_err());
        let combined = Combined::new(&a, &a).unwrap();
        assert_eq!(combined.map_a, combined.map_b);
    }
}
