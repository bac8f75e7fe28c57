//! Detection of Booth-encoded partial product cells.
//!
//! A radix-4 Booth partial product bit is a small function of the multiplicand bits and of the
//! encoded multiplier digit. Whatever its gate-level realization, it is found here by its
//! function: every gate whose minimized cut function belongs to one of the library classes is a
//! cell, and its whole fan-in cone, encoder logic included, is marked so that the adder passes
//! leave it alone.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{Aig, NodeId, Result, aig::trav::TravIds};

use super::{
    adder::AdderSet,
    cuts::{CutParams, CutSet},
    truth::{min_base, stretch, transform},
};

/// Kind of a recognized cell, after the library table it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BoothKind {
    /// Complete five-input partial product bit.
    Cell,
    /// Four-input cell at the low end of a row.
    Front,
    /// Four-input cell at the high end of an unsigned row.
    BackUnsigned,
    /// Four-input cell at the high end of a signed row.
    BackSigned,
}

/// Base functions of the library. Every function obtained from one of them by permuting and
/// complementing its inputs, or complementing its output, belongs to the same kind.
const BASES: [(BoothKind, u64, usize); 4] = [
    (BoothKind::Cell, 0xF335_ACC0, 5),
    (BoothKind::Front, 0x35C0, 4),
    (BoothKind::BackUnsigned, 0xACC0, 4),
    (BoothKind::BackSigned, 0xF3C0, 4),
];

/// Output-normalized form: the function is complemented if needed so that `f(0) = 0`.
fn normalize(truth: u64) -> u64 {
    if truth & 1 == 1 { !truth } else { truth }
}

/// All the permutations of `0..n`.
fn permutations(n: usize) -> Vec<Vec<usize>> {
    if n == 0 {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for perm in permutations(n - 1) {
        for pos in 0..n {
            let mut p = perm.clone();
            p.insert(pos, n - 1);
            result.push(p);
        }
    }
    result
}

/// The known cell functions, stretched to 64 bits and normalized.
#[derive(Debug, Clone)]
pub struct BoothLibrary {
    classes: HashMap<u64, (BoothKind, usize)>,
}

impl Default for BoothLibrary {
    fn default() -> Self {
        BoothLibrary::new()
    }
}

impl BoothLibrary {
    /// Generates the orbit of every base function.
    pub fn new() -> Self {
        let mut classes = HashMap::new();
        for (kind, base, nvars) in BASES {
            for perm in permutations(nvars) {
                for neg in 0..(1u32 << nvars) {
                    let t = normalize(transform(base, nvars, &perm, neg));
                    classes.entry(t).or_insert((kind, nvars));
                }
            }
        }
        BoothLibrary { classes }
    }

    /// Kind of the `nvars`-input function `truth`, if it is a library function.
    pub fn classify(&self, truth: u64, nvars: usize) -> Option<BoothKind> {
        let t = normalize(stretch(truth, nvars));
        match self.classes.get(&t) {
            Some(&(kind, n)) if n == nvars => Some(kind),
            _ => None,
        }
    }

    /// Number of functions of the given kind.
    pub fn class_size(&self, kind: BoothKind) -> usize {
        self.classes.values().filter(|(k, _)| *k == kind).count()
    }
}

/// Cut enumeration limits of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoothParams {
    /// At most 6.
    pub cut_size: usize,
    pub max_cuts: usize,
}

impl Default for BoothParams {
    fn default() -> Self {
        BoothParams {
            cut_size: 6,
            max_cuts: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoothCell {
    pub root: NodeId,
    /// Minimized support of the cell function.
    pub leaves: Vec<NodeId>,
    pub kind: BoothKind,
    pub truth: u64,
}

/// Outcome of the detection on one graph.
#[derive(Debug, Clone)]
pub struct BoothReport {
    pub cells: Vec<BoothCell>,
    /// Cell outputs and every node feeding them.
    inside: TravIds,
    /// Leaf that a front cell adds to a complete cell, when there is one.
    pub front: Option<NodeId>,
    /// Leaf that a back cell adds to a complete cell, when there is one.
    pub back: Option<NodeId>,
    pub signed: bool,
}

impl BoothReport {
    /// Runs the detector on every gate of `aig`.
    pub fn detect(aig: &Aig, library: &BoothLibrary, params: BoothParams) -> Result<Self> {
        let cuts = CutSet::enumerate(
            aig,
            CutParams {
                cut_size: params.cut_size.min(6),
                max_cuts: params.max_cuts,
            },
        )?;

        let mut cells = Vec::new();
        for id in aig.gate_ids() {
            let mut found_five = false;
            let mut found_four = false;
            for cut in cuts.gate_cuts(id) {
                let mut leaves = cut.leaves.clone();
                let truth = min_base(cut.truth, &mut leaves);
                let n = leaves.len();
                let wanted = (n == 5 && !found_five) || (n == 4 && !found_four);
                if !wanted {
                    continue;
                }
                if let Some(kind) = library.classify(truth, n) {
                    found_five |= n == 5;
                    found_four |= n == 4;
                    cells.push(BoothCell {
                        root: id,
                        leaves,
                        kind,
                        truth: normalize(stretch(truth, n)),
                    });
                }
            }
        }

        let mut inside = TravIds::new(aig.num_nodes());
        inside.increment();
        for cell in &cells {
            mark_cell(aig, cell, &mut inside);
        }

        let five: Vec<&[NodeId]> = cells
            .iter()
            .filter(|c| c.kind == BoothKind::Cell)
            .map(|c| c.leaves.as_slice())
            .collect();
        let num_five = five.len();
        let mut report = BoothReport {
            cells: Vec::new(),
            inside,
            front: None,
            back: None,
            signed: false,
        };
        for cell in cells.iter().filter(|c| c.kind != BoothKind::Cell) {
            let Some(extra) = diff_exactly_one(&five, &cell.leaves) else {
                continue;
            };
            match cell.kind {
                BoothKind::Front => report.front = Some(extra),
                BoothKind::BackSigned => {
                    report.back = Some(extra);
                    report.signed = true;
                }
                _ => report.back = Some(extra),
            }
        }
        report.cells = cells;
        debug!(
            "{} booth cells ({} complete), front {:?}, back {:?}, signed {}",
            report.cells.len(),
            num_five,
            report.front,
            report.back,
            report.signed
        );
        Ok(report)
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn num_cells_of(&self, kind: BoothKind) -> usize {
        self.cells.iter().filter(|c| c.kind == kind).count()
    }

    /// Whether the node is a cell output or lies in the fan-in cone of one.
    pub fn is_inside(&self, id: NodeId) -> bool {
        self.inside.is_current(id)
    }

    /// Drops the adders of `set` with an output inside a cell. Returns how many were dropped.
    pub fn exclude_from(&self, set: &mut AdderSet) -> usize {
        set.exclude(&self.inside)
    }

    /// Splits the cell leaves into the two operands of the multiplier, by counting how often
    /// each leaf is used. Multiplicand bits are used by one or two cells of each row,
    /// multiplier bits by every cell of their rows.
    pub fn operand_groups(&self) -> (Vec<NodeId>, Vec<NodeId>) {
        let mut counts: HashMap<NodeId, usize> = HashMap::new();
        for cell in self.cells.iter().filter(|c| c.kind == BoothKind::Cell) {
            for &leaf in &cell.leaves {
                *counts.entry(leaf).or_insert(0) += 1;
            }
        }
        counts.remove(&0);
        let mut ordered: Vec<(NodeId, usize)> = counts.iter().map(|(&l, &c)| (l, c)).collect();
        ordered.sort_unstable();

        let mut taken: HashSet<NodeId> = HashSet::new();
        let group = |pivot: NodeId, value: usize, taken: &mut HashSet<NodeId>| {
            let mut group = vec![pivot];
            taken.insert(pivot);
            for &(leaf, count) in &ordered {
                if !taken.contains(&leaf) && (count == value || count == 2 * value) {
                    group.push(leaf);
                    taken.insert(leaf);
                }
            }
            group
        };

        let Some(&(pivot, value)) = ordered.iter().min_by_key(|&&(l, c)| (c, l)) else {
            return (Vec::new(), Vec::new());
        };
        let first = group(pivot, value, &mut taken);
        let second = match self.front {
            Some(front) if !taken.contains(&front) => {
                let value = counts.get(&front).copied().unwrap_or(0);
                group(front, value, &mut taken)
            }
            _ => Vec::new(),
        };
        (first, second)
    }
}

/// Marks the cell root and its transitive fan-in, down to the primary inputs.
fn mark_cell(aig: &Aig, cell: &BoothCell, inside: &mut TravIds) {
    let mut stack = vec![cell.root];
    while let Some(id) = stack.pop() {
        // a marked node already has its cone marked
        if !inside.set_current(id) {
            continue;
        }
        if let Some(fanins) = aig.fanins(id) {
            stack.extend(fanins.iter().map(|f| f.get_node_id()));
        }
    }
}

/// The only leaf of `cut` missing from some complete cell, `None` if `cut` is already covered
/// by a complete cell or differs from all of them by more than one leaf.
fn diff_exactly_one(five: &[&[NodeId]], cut: &[NodeId]) -> Option<NodeId> {
    if five.iter().any(|f| cut.iter().all(|l| f.contains(l))) {
        return None;
    }
    five.iter().find_map(|f| {
        let mut missing = cut.iter().filter(|l| !f.contains(l));
        match (missing.next(), missing.next()) {
            (Some(&extra), None) => Some(extra),
            _ => None,
        }
    })
}
