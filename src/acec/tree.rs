//! Assembly of adders into ranked trees.
//!
//! Adders are linked whenever an operand of one adder (the parent) is the sum or the carry of
//! another one (the child). A sum link keeps the rank, a carry link goes one rank up. Output
//! phases are pushed from parents to children so that, in the derived phases, every adder
//! satisfies `in0 + in1 + in2 = sum + 2 * carry` on literals. Summed over a tree, the weighted
//! leaves then equal the weighted roots.
//!
//! Links that disagree on a phase or a rank are cut, their operand becoming a leaf.

use std::collections::{HashMap, HashSet, VecDeque};

use log::{debug, info};

use crate::{
    Aig, AigEdge, NodeId, Result,
    aig::trav::StampedValues,
};

use super::{
    AcecError,
    adder::{Adder, AdderSet},
    chain::{carry_map, chain_lengths, check_chain_mapping, collect_chains},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LinkKind {
    Sum,
    Carry,
}

/// Operand `operand` of `parent` is an output of `child`.
#[derive(Debug, Clone, Copy)]
struct Link {
    parent: usize,
    operand: usize,
    child: usize,
    kind: LinkKind,
    alive: bool,
}

/// One recovered adder tree, with its interface.
///
/// Every per-rank vector has the same length: one more than the highest adder rank, since the
/// carries of the top adders are roots one rank above. Literals are given in the derived phases,
/// so that `sum(2^r * leaves[r]) == sum(2^r * roots[r])` holds for every input assignment.
///
/// The box only holds node ids: it is tied to the graph it was derived from, but does not
/// borrow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdderBox {
    pub adders: Vec<Vec<Adder>>,
    pub leaves: Vec<Vec<AigEdge>>,
    pub roots: Vec<Vec<AigEdge>>,
    /// Filled by the matcher: leaves with an equivalent counterpart in the other box.
    pub shared: Vec<Vec<AigEdge>>,
    /// Filled by the matcher: the other leaves.
    pub unique: Vec<Vec<AigEdge>>,
}

impl AdderBox {
    /// Empty box with `ranks` ranks.
    pub fn with_ranks(ranks: usize) -> Self {
        AdderBox {
            adders: vec![Vec::new(); ranks],
            leaves: vec![Vec::new(); ranks],
            roots: vec![Vec::new(); ranks],
            shared: vec![Vec::new(); ranks],
            unique: vec![Vec::new(); ranks],
        }
    }

    /// Derives the largest tree of `set`, `None` if there is no adder to start from.
    ///
    /// With `min_chain_len`, only the adders of carry chains at least that long are used.
    pub fn derive(aig: &Aig, set: &AdderSet, min_chain_len: Option<usize>) -> Result<Option<Self>> {
        Ok(AdderBox::derive_all(aig, set, min_chain_len)?.into_iter().next())
    }

    /// Derives every tree of `set`, largest first.
    pub fn derive_all(
        aig: &Aig,
        set: &AdderSet,
        min_chain_len: Option<usize>,
    ) -> Result<Vec<Self>> {
        let mut adders = set.adders().to_vec();
        let map = carry_map(&adders)?;
        chain_lengths(&mut adders, &map);

        if let Some(min_len) = min_chain_len {
            let chains = collect_chains(aig, &adders, &map, min_len)?;
            check_chain_mapping(&adders, &chains)?;
            let kept: HashSet<usize> = chains.iter().flatten().copied().collect();
            adders = adders
                .into_iter()
                .enumerate()
                .filter(|(i, _)| kept.contains(i))
                .map(|(_, a)| a)
                .collect();
        }
        if adders.is_empty() {
            return Ok(Vec::new());
        }

        let mut links = find_links(&adders)?;
        propagate_phases(&mut adders, &mut links);
        let (ranks, components) = assign_ranks(&adders, &mut links);

        let mut boxes = Vec::with_capacity(components.len());
        for component in &components {
            let b = build_box(&adders, &links, &ranks, component);
            b.verify_phases(aig)?;
            boxes.push(b);
        }
        boxes.sort_by(|x, y| {
            y.num_adders()
                .cmp(&x.num_adders())
                .then_with(|| x.min_carry().cmp(&y.min_carry()))
        });
        if let Some(b) = boxes.first() {
            info!(
                "{} trees, largest has {} adders over {} ranks",
                boxes.len(),
                b.num_adders(),
                b.num_ranks()
            );
        }
        Ok(boxes)
    }

    pub fn num_ranks(&self) -> usize {
        self.roots.len()
    }

    pub fn num_adders(&self) -> usize {
        self.adders.iter().map(|r| r.len()).sum()
    }

    pub fn num_leaves(&self) -> usize {
        self.leaves.iter().map(|r| r.len()).sum()
    }

    pub fn num_roots(&self) -> usize {
        self.roots.iter().map(|r| r.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_adders() == 0
    }

    fn min_carry(&self) -> NodeId {
        self.adders
            .iter()
            .flatten()
            .map(|a| a.carry)
            .min()
            .unwrap_or(0)
    }

    /// Carry roots below the top rank, that is carries leaving the tree before the end.
    pub fn num_unmatched_carries(&self) -> usize {
        let top = self.num_ranks().saturating_sub(1);
        let carries: HashSet<NodeId> = self.adders.iter().flatten().map(|a| a.carry).collect();
        self.roots
            .iter()
            .enumerate()
            .filter(|&(r, _)| r < top)
            .flat_map(|(_, roots)| roots)
            .filter(|root| carries.contains(&root.get_node_id()))
            .count()
    }

    /// Rank of every root node.
    pub fn root_ranks(&self) -> HashMap<NodeId, usize> {
        let mut ranks = HashMap::new();
        for (r, roots) in self.roots.iter().enumerate() {
            for root in roots {
                ranks.insert(root.get_node_id(), r);
            }
        }
        ranks
    }

    /// Inserts an empty rank below rank 0, shifting everything one rank up.
    pub fn insert_front_rank(&mut self) {
        self.adders.insert(0, Vec::new());
        self.leaves.insert(0, Vec::new());
        self.roots.insert(0, Vec::new());
        self.shared.insert(0, Vec::new());
        self.unique.insert(0, Vec::new());
    }

    /// Brings every per-rank vector to `ranks` ranks.
    pub fn resize(&mut self, ranks: usize) {
        self.adders.resize(ranks, Vec::new());
        self.leaves.resize(ranks, Vec::new());
        self.roots.resize(ranks, Vec::new());
        self.shared.resize(ranks, Vec::new());
        self.unique.resize(ranks, Vec::new());
    }

    /// Recomputes the function of every adder and compares it with the one its derived phases
    /// announce.
    pub fn verify_phases(&self, aig: &Aig) -> Result<()> {
        let mut memo = StampedValues::new(aig.num_nodes());
        for (rank, adders) in self.adders.iter().enumerate() {
            for (index, adder) in adders.iter().enumerate() {
                if adder.compute_truths(aig, &mut memo)? != adder.derived_truths() {
                    return Err(AcecError::PhaseVerification {
                        rank,
                        adder: index,
                        sum: adder.sum,
                        carry: adder.carry,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Logs the box, rank by rank.
    pub fn dump(&self, verbose: bool) {
        for r in 0..self.num_ranks() {
            let line = format!(
                "rank {:>3}: {} adders, {} leaves ({} shared, {} unique), roots {:?}",
                r,
                self.adders[r].len(),
                self.leaves[r].len(),
                self.shared[r].len(),
                self.unique[r].len(),
                self.roots[r]
            );
            if verbose {
                info!("{}", line);
            } else {
                debug!("{}", line);
            }
        }
    }
}

fn find_links(adders: &[Adder]) -> Result<Vec<Link>> {
    let carries = carry_map(adders)?;
    let mut sums: HashMap<NodeId, usize> = HashMap::with_capacity(adders.len());
    for (i, adder) in adders.iter().enumerate() {
        sums.entry(adder.sum).or_insert(i);
    }
    let mut links = Vec::new();
    for (parent, adder) in adders.iter().enumerate() {
        for (operand, input) in adder.operands().iter().enumerate() {
            let found = match carries.get(input) {
                Some(&child) => Some((child, LinkKind::Carry)),
                None => sums.get(input).map(|&child| (child, LinkKind::Sum)),
            };
            if let Some((child, kind)) = found {
                links.push(Link {
                    parent,
                    operand,
                    child,
                    kind,
                    alive: true,
                });
            }
        }
    }
    debug!("{} links between {} adders", links.len(), adders.len());
    Ok(links)
}

/// Decides the output phase of every adder, parents before children.
/// A child output may only be used once, and only under one phase.
///
/// An adder no parent constrains (a root of the tree, or one whose links were all cut) takes
/// the majority phase of its detected operands: complemented when at least two of them are
/// complemented, so that most operands enter it uncomplemented.
fn propagate_phases(adders: &mut [Adder], links: &mut [Link]) {
    let mut order: Vec<usize> = (0..adders.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(adders[i].sum.min(adders[i].carry)));

    let mut by_parent: Vec<Vec<usize>> = vec![Vec::new(); adders.len()];
    for (l, link) in links.iter().enumerate() {
        by_parent[link.parent].push(l);
    }

    let mut phases: Vec<Option<bool>> = vec![None; adders.len()];
    let mut used: HashSet<(usize, bool)> = HashSet::new();
    let mut broken = 0;
    for i in order {
        // a free adder takes the phase that leaves most of its operands uncomplemented
        let free = (adders[i].signs.input_phase() & 0x7).count_ones() >= 2;
        let phi = *phases[i].get_or_insert(free);
        let half = adders[i].is_half();
        adders[i].signs.derive(phi, half);
        for &l in &by_parent[i] {
            let Link {
                operand,
                child,
                kind,
                ..
            } = links[l];
            let is_sum = kind == LinkKind::Sum;
            let need = adders[i].signs.derived_input(operand)
                ^ (is_sum && adders[child].signs.sum_phase());
            let fits = match phases[child] {
                None => {
                    phases[child] = Some(need);
                    true
                }
                Some(phi) => phi == need,
            };
            if !fits || !used.insert((child, is_sum)) {
                links[l].alive = false;
                broken += 1;
            }
        }
    }
    if broken > 0 {
        debug!("{} links cut by the phase assignment", broken);
    }
}

/// Ranks relative to each connected component, normalized so that each component starts at
/// rank 0. Returns the ranks and the components.
fn assign_ranks(adders: &[Adder], links: &mut [Link]) -> (Vec<usize>, Vec<Vec<usize>>) {
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); adders.len()];
    for (l, link) in links.iter().enumerate() {
        if link.alive {
            incident[link.parent].push(l);
            incident[link.child].push(l);
        }
    }

    let mut ranks: Vec<Option<i64>> = vec![None; adders.len()];
    let mut components = Vec::new();
    let mut broken = 0;
    for start in 0..adders.len() {
        if ranks[start].is_some() {
            continue;
        }
        ranks[start] = Some(0);
        let mut component = vec![start];
        let mut queue = VecDeque::from([start]);
        while let Some(u) = queue.pop_front() {
            let ru = ranks[u].unwrap_or(0);
            for &l in &incident[u] {
                if !links[l].alive {
                    continue;
                }
                let step = match links[l].kind {
                    LinkKind::Sum => 0,
                    LinkKind::Carry => 1,
                };
                let (other, expected) = if links[l].parent == u {
                    (links[l].child, ru - step)
                } else {
                    (links[l].parent, ru + step)
                };
                match ranks[other] {
                    None => {
                        ranks[other] = Some(expected);
                        component.push(other);
                        queue.push_back(other);
                    }
                    Some(r) if r != expected => {
                        links[l].alive = false;
                        broken += 1;
                    }
                    Some(_) => (),
                }
            }
        }
        let low = component
            .iter()
            .filter_map(|&i| ranks[i])
            .min()
            .unwrap_or(0);
        for &i in &component {
            ranks[i] = ranks[i].map(|r| r - low);
        }
        component.sort_unstable();
        components.push(component);
    }
    if broken > 0 {
        debug!("{} links cut by the rank assignment", broken);
    }
    let ranks = ranks
        .into_iter()
        .map(|r| r.unwrap_or(0).max(0) as usize)
        .collect();
    (ranks, components)
}

fn build_box(adders: &[Adder], links: &[Link], ranks: &[usize], component: &[usize]) -> AdderBox {
    let top = component.iter().map(|&i| ranks[i]).max().unwrap_or(0);
    let mut b = AdderBox::with_ranks(top + 2);

    let mut linked: HashSet<(usize, usize)> = HashSet::new();
    let mut consumed: HashSet<(usize, LinkKind)> = HashSet::new();
    for link in links.iter().filter(|l| l.alive) {
        linked.insert((link.parent, link.operand));
        consumed.insert((link.child, link.kind));
    }

    for &i in component {
        let adder = &adders[i];
        let r = ranks[i];
        b.adders[r].push(*adder);
        for (k, &input) in adder.operands().iter().enumerate() {
            if !linked.contains(&(i, k)) {
                b.leaves[r].push(AigEdge::new(input, adder.signs.derived_input(k)));
            }
        }
        if adder.signs.is_complemented_half() {
            b.leaves[r].push(AigEdge::TRUE);
        }
        if !consumed.contains(&(i, LinkKind::Sum)) {
            b.roots[r].push(AigEdge::new(adder.sum, adder.signs.derived_sum_phase()));
        }
        if !consumed.contains(&(i, LinkKind::Carry)) {
            b.roots[r + 1].push(AigEdge::new(adder.carry, adder.signs.output_phase()));
        }
    }
    for r in 0..b.num_ranks() {
        b.adders[r].sort_by_key(|a| a.carry);
        b.leaves[r].sort_unstable();
        b.roots[r].sort_unstable();
    }
    b
}
