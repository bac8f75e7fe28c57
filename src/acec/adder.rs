//! Recognition of full and half adders.
//!
//! Full adders are found on 3-cuts: an XOR3 cut and a MAJ3 cut over the same three leaves form
//! one adder, the XOR3 node being the sum and the MAJ3 node the carry.
//! Half adders are found structurally, either on native XOR gates or on the three-AND
//! exclusive-or pattern of plain AIGs.
//!
//! Every record follows one model, a half adder having a constant third operand:
//! - `carry = MAJ(in0 ^ p0, in1 ^ p1, in2 ^ p2)`
//! - `sum = XOR3(in0 ^ p0, in1 ^ p1, in2 ^ p2) ^ q`
//!
//! where `p` and `q` are stored in [`AdderSigns`].

use std::collections::{BTreeMap, HashMap, HashSet};

use log::debug;

use crate::{
    Aig, AigEdge, AigNode, NodeId, Result,
    aig::trav::{StampedValues, TravIds},
};

use super::{
    cuts::{CutParams, CutSet, cut_truth},
    truth::{XOR2, XOR3, maj3_phase},
};

/// Leaf patterns of the three operands. A missing third operand is the constant 0.
const PATTERNS: [u8; 3] = [0xAA, 0xCC, 0xF0];

/// Packed polarity bits of an adder.
///
/// | bits  | meaning                                  |
/// |-------|------------------------------------------|
/// | 0..2  | detected input phases `p`                |
/// | 3     | detected sum phase `q`                   |
/// | 8..10 | derived input phases `p ^ phi`           |
/// | 11    | derived sum phase `q ^ phi`              |
/// | 12    | derived output phase `phi`               |
/// | 16    | complemented half adder (`p2 ^ phi = 1`) |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AdderSigns(u32);

impl AdderSigns {
    const INPUTS: u32 = 0x7;
    const SUM: u32 = 1 << 3;
    const DERIVED_SHIFT: u32 = 8;
    const DERIVED_SUM: u32 = 1 << 11;
    const OUTPUT: u32 = 1 << 12;
    const COMPLEMENTED_HALF: u32 = 1 << 16;

    pub fn new(input_phase: u8, sum_phase: bool) -> Self {
        let mut bits = input_phase as u32 & AdderSigns::INPUTS;
        if sum_phase {
            bits |= AdderSigns::SUM;
        }
        AdderSigns(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    pub fn input_phase(&self) -> u8 {
        (self.0 & AdderSigns::INPUTS) as u8
    }

    pub fn sum_phase(&self) -> bool {
        self.0 & AdderSigns::SUM != 0
    }

    pub fn derived_input_phase(&self) -> u8 {
        ((self.0 >> AdderSigns::DERIVED_SHIFT) & AdderSigns::INPUTS) as u8
    }

    /// Derived phase of operand `k`.
    pub fn derived_input(&self, k: usize) -> bool {
        (self.derived_input_phase() >> k) & 1 == 1
    }

    pub fn derived_sum_phase(&self) -> bool {
        self.0 & AdderSigns::DERIVED_SUM != 0
    }

    pub fn output_phase(&self) -> bool {
        self.0 & AdderSigns::OUTPUT != 0
    }

    pub fn is_complemented_half(&self) -> bool {
        self.0 & AdderSigns::COMPLEMENTED_HALF != 0
    }

    /// Records the output phase `phi` and the phases it induces.
    pub fn derive(&mut self, phi: bool, half: bool) {
        self.0 &= AdderSigns::INPUTS | AdderSigns::SUM;
        let mask = if phi { AdderSigns::INPUTS } else { 0 };
        let derived = (self.0 & AdderSigns::INPUTS) ^ mask;
        self.0 |= derived << AdderSigns::DERIVED_SHIFT;
        if self.sum_phase() ^ phi {
            self.0 |= AdderSigns::DERIVED_SUM;
        }
        if phi {
            self.0 |= AdderSigns::OUTPUT;
        }
        if half && derived & 0x4 != 0 {
            self.0 |= AdderSigns::COMPLEMENTED_HALF;
        }
    }

    /// Exchanges the phase bits (detected and derived) of operands `i` and `j`.
    pub fn swap_inputs(&mut self, i: usize, j: usize) {
        for shift in [0, AdderSigns::DERIVED_SHIFT] {
            let bi = (self.0 >> (shift as usize + i)) & 1;
            let bj = (self.0 >> (shift as usize + j)) & 1;
            if bi != bj {
                self.0 ^= (1 << (shift as usize + i)) | (1 << (shift as usize + j));
            }
        }
    }
}

/// A recognized adder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Adder {
    /// Operands. The third one is 0 for a half adder.
    pub inputs: [NodeId; 3],
    pub sum: NodeId,
    pub carry: NodeId,
    pub signs: AdderSigns,
    /// Truth tables of the sum and carry nodes over the operands.
    pub truths: (u8, u8),
}

impl Adder {
    /// Builds the record from the truth tables of its outputs, `None` if they are not
    /// the ones of an adder.
    pub fn from_truths(
        inputs: [NodeId; 3],
        sum: NodeId,
        carry: NodeId,
        truths: (u8, u8),
    ) -> Option<Adder> {
        let half = inputs[2] == 0;
        let p = carry_phase(truths.1, half)?;
        let expected = xor3_with_phase(p, half);
        let q = if truths.0 == expected {
            false
        } else if truths.0 == !expected {
            true
        } else {
            return None;
        };
        Some(Adder {
            inputs,
            sum,
            carry,
            signs: AdderSigns::new(p, q),
            truths,
        })
    }

    pub fn is_half(&self) -> bool {
        self.inputs[2] == 0
    }

    pub fn is_full(&self) -> bool {
        !self.is_half()
    }

    /// The actual operands (two for a half adder).
    pub fn operands(&self) -> &[NodeId] {
        if self.is_half() {
            &self.inputs[..2]
        } else {
            &self.inputs
        }
    }

    /// Exchanges operands `i` and `j` together with their phases.
    pub fn swap_inputs(&mut self, i: usize, j: usize) {
        self.inputs.swap(i, j);
        self.signs.swap_inputs(i, j);
        self.truths = (
            swap_pattern_vars(self.truths.0, i, j),
            swap_pattern_vars(self.truths.1, i, j),
        );
    }

    /// Recomputes the truth tables of the outputs over the operands, in the graph.
    pub fn compute_truths(&self, aig: &Aig, memo: &mut StampedValues<u64>) -> Result<(u8, u8)> {
        let leaves = self.operands();
        let sum = cut_truth(aig, self.sum, leaves, memo)?;
        let carry = cut_truth(aig, self.carry, leaves, memo)?;
        Ok((sum as u8, carry as u8))
    }

    /// Expected sum and carry truth tables under the derived phases.
    pub fn derived_truths(&self) -> (u8, u8) {
        let p = self.signs.derived_input_phase();
        let half = self.is_half();
        (
            xor3_with_phase(p, half) ^ if self.signs.derived_sum_phase() { 0xFF } else { 0 },
            maj_with_phase(p, half) ^ if self.signs.output_phase() { 0xFF } else { 0 },
        )
    }
}

fn operand_patterns(phase: u8, half: bool) -> [u8; 3] {
    let mut patterns = PATTERNS;
    if half {
        patterns[2] = 0;
    }
    for (k, pattern) in patterns.iter_mut().enumerate() {
        if (phase >> k) & 1 == 1 {
            *pattern = !*pattern;
        }
    }
    patterns
}

/// `MAJ(in ^ p)` over the operand patterns.
pub fn maj_with_phase(phase: u8, half: bool) -> u8 {
    let [a, b, c] = operand_patterns(phase, half);
    (a & b) | (a & c) | (b & c)
}

/// `XOR3(in ^ p)` over the operand patterns.
pub fn xor3_with_phase(phase: u8, half: bool) -> u8 {
    let [a, b, c] = operand_patterns(phase, half);
    a ^ b ^ c
}

/// Input phases of a carry truth table.
fn carry_phase(truth: u8, half: bool) -> Option<u8> {
    if !half {
        return maj3_phase(truth);
    }
    (0..8u8).find(|&p| maj_with_phase(p, true) == truth)
}

/// Exchanges two of the three pattern variables of an 8-bit truth table.
fn swap_pattern_vars(truth: u8, i: usize, j: usize) -> u8 {
    super::truth::swap_vars(truth as u64, i, j) as u8
}

/// A two-input exclusive or cut not absorbed by any adder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XorCut {
    pub leaves: [NodeId; 2],
    pub node: NodeId,
}

/// The adders of one circuit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AdderSet {
    adders: Vec<Adder>,
    xor_cuts: Vec<XorCut>,
}

impl AdderSet {
    /// Detects every full and half adder of `aig`.
    ///
    /// Records are ordered full adders first, each group sorted by carry id. When two records
    /// claim the same carry, the first one is kept.
    pub fn detect(aig: &Aig, params: CutParams) -> Result<Self> {
        let params = CutParams {
            cut_size: 3,
            ..params
        };
        let cuts = CutSet::enumerate(aig, params)?;

        let mut xor3: Vec<([NodeId; 3], NodeId, u8)> = Vec::new();
        let mut maj3: Vec<([NodeId; 3], NodeId, u8)> = Vec::new();
        let mut xor2: Vec<XorCut> = Vec::new();
        for id in aig.gate_ids() {
            for cut in cuts.gate_cuts(id) {
                let truth = cut.truth as u8;
                match cut.leaves[..] {
                    [a, b] if truth == XOR2 || truth == !XOR2 => xor2.push(XorCut {
                        leaves: [a, b],
                        node: id,
                    }),
                    [a, b, c] if truth == XOR3 || truth == !XOR3 => {
                        xor3.push(([a, b, c], id, truth))
                    }
                    [a, b, c] if maj3_phase(truth).is_some() => maj3.push(([a, b, c], id, truth)),
                    _ => (),
                }
            }
        }
        xor3.sort_unstable();
        maj3.sort_unstable();

        // Merge-join on the leaves, one xor with one majority
        let mut full = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < xor3.len() && j < maj3.len() {
            let (leaves, sum, sum_truth) = xor3[i];
            let (other, carry, carry_truth) = maj3[j];
            if leaves == other {
                if let Some(adder) =
                    Adder::from_truths(leaves, sum, carry, (sum_truth, carry_truth))
                {
                    full.push(adder);
                }
                i += 1;
                j += 1;
            } else if leaves < other {
                i += 1;
            } else {
                j += 1;
            }
        }
        full.sort_by_key(|a| (a.carry, a.sum));
        debug!(
            "{} xor3 cuts, {} maj3 cuts, {} full adders",
            xor3.len(),
            maj3.len(),
            full.len()
        );

        let mut half = detect_half_adders(aig)?;
        let inner = full_adder_interiors(aig, &full)?;
        let sums: HashSet<NodeId> = full.iter().map(|a| a.sum).collect();
        let before = half.len();
        half.retain(|a| {
            !inner.is_current(a.sum) && !inner.is_current(a.carry) && !sums.contains(&a.sum)
        });
        half.sort_by_key(|a| (a.carry, a.sum));
        debug!(
            "{} half adders, {} inside full adders",
            half.len(),
            before - half.len()
        );

        let mut adders = Vec::with_capacity(full.len() + half.len());
        let mut carries: HashMap<NodeId, usize> = HashMap::new();
        for adder in full.into_iter().chain(half) {
            if let Some(&first) = carries.get(&adder.carry) {
                debug!(
                    "carry {} claimed by adders {} and {}, keeping the first",
                    adder.carry, first, adders.len()
                );
                continue;
            }
            carries.insert(adder.carry, adders.len());
            adders.push(adder);
        }

        let used: HashSet<NodeId> = adders.iter().flat_map(|a| [a.sum, a.carry]).collect();
        xor2.retain(|x| !used.contains(&x.node) && !inner.is_current(x.node));
        xor2.sort_unstable_by_key(|x| (x.node, x.leaves));
        xor2.dedup();

        Ok(AdderSet {
            adders,
            xor_cuts: xor2,
        })
    }

    pub fn from_adders(adders: Vec<Adder>) -> Self {
        AdderSet {
            adders,
            xor_cuts: Vec::new(),
        }
    }

    pub fn adders(&self) -> &[Adder] {
        &self.adders
    }

    pub fn len(&self) -> usize {
        self.adders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adders.is_empty()
    }

    pub fn num_full(&self) -> usize {
        self.adders.iter().filter(|a| a.is_full()).count()
    }

    pub fn num_half(&self) -> usize {
        self.adders.iter().filter(|a| a.is_half()).count()
    }

    /// Two-input exclusive or cuts not used by any adder.
    pub fn xor_cuts(&self) -> &[XorCut] {
        &self.xor_cuts
    }

    /// Drops the adders with an output marked in `marks`.
    pub fn exclude(&mut self, marks: &TravIds) -> usize {
        let before = self.adders.len();
        self.adders
            .retain(|a| !marks.is_current(a.sum) && !marks.is_current(a.carry));
        before - self.adders.len()
    }

    /// Number of adders per `(sum, carry)` truth table pair.
    pub fn truth_histogram(&self) -> BTreeMap<(u8, u8), usize> {
        let mut histogram = BTreeMap::new();
        for adder in &self.adders {
            *histogram.entry(adder.truths).or_insert(0) += 1;
        }
        histogram
    }
}

/// Marks the nodes strictly between the outputs of each full adder and its operands.
fn full_adder_interiors(aig: &Aig, full: &[Adder]) -> Result<TravIds> {
    let mut inner = TravIds::new(aig.num_nodes());
    inner.increment();
    let mut leaves = TravIds::new(aig.num_nodes());
    for adder in full {
        leaves.increment();
        for &leaf in &adder.inputs {
            leaves.set_current(leaf);
        }
        let mut stack = Vec::new();
        for output in [adder.sum, adder.carry] {
            if let Some(fanins) = aig.fanins(output) {
                stack.extend(fanins.iter().map(|f| f.get_node_id()));
            }
        }
        while let Some(id) = stack.pop() {
            if !leaves.set_current(id) {
                continue;
            }
            if !aig.node(id)?.is_gate() {
                continue;
            }
            inner.set_current(id);
            if let Some(fanins) = aig.fanins(id) {
                stack.extend(fanins.iter().map(|f| f.get_node_id()));
            }
        }
    }
    Ok(inner)
}

/// Recognizes `AND(!AND(x, y), !AND(!x, !y))`-like exclusive ors.
/// Returns the regular operands and whether the inner and gates have differently complemented
/// operands.
pub fn recognize_xor(aig: &Aig, id: NodeId) -> Option<(AigEdge, AigEdge, bool)> {
    let AigNode::And { fanin0, fanin1 } = aig.get_node(id)? else {
        return None;
    };
    if !fanin0.get_complement() || !fanin1.get_complement() {
        return None;
    }
    let AigNode::And {
        fanin0: a0,
        fanin1: b0,
    } = aig.get_node(fanin0.get_node_id())?
    else {
        return None;
    };
    let AigNode::And {
        fanin0: a1,
        fanin1: b1,
    } = aig.get_node(fanin1.get_node_id())?
    else {
        return None;
    };
    if a0.get_node_id() != a1.get_node_id() || b0.get_node_id() != b1.get_node_id() {
        return None;
    }
    if !a0.is_complement_of(a1) || !b0.is_complement_of(b1) {
        return None;
    }
    let compl_diff = a0.get_complement() ^ b0.get_complement();
    Some((a0.regular(), b0.regular(), compl_diff))
}

/// Records `(xor, and)` if `AND(x ^ cx, y ^ cy)` exists in the graph.
fn probe_and(
    aig: &Aig,
    pairs: &mut Vec<(NodeId, NodeId, AigEdge, AigEdge)>,
    xor: NodeId,
    (x, cx): (AigEdge, bool),
    (y, cy): (AigEdge, bool),
) {
    if let Some(and) = aig.lookup_and(x.not_if(cx), y.not_if(cy)) {
        if aig.get_node(and.get_node_id()).is_some_and(|n| n.is_and()) {
            pairs.push((xor, and.get_node_id(), x, y));
        }
    }
}

/// Half adders as `(xor, and)` pairs, then turned into records.
fn detect_half_adders(aig: &Aig) -> Result<Vec<Adder>> {
    let mut pairs: Vec<(NodeId, NodeId, AigEdge, AigEdge)> = Vec::new();

    if aig.num_xors() > 0 {
        for id in aig.gate_ids() {
            let Some(AigNode::Xor { fanin0, fanin1 }) = aig.get_node(id) else {
                continue;
            };
            for (c0, c1) in [(false, false), (true, true), (false, true), (true, false)] {
                probe_and(aig, &mut pairs, id, (*fanin0, c0), (*fanin1, c1));
            }
        }
    } else {
        let refs = aig.fanout_counts();
        for id in aig.gate_ids() {
            let Some((x, y, compl_diff)) = recognize_xor(aig, id) else {
                continue;
            };
            if let Some([fanin0, fanin1]) = aig.fanins(id) {
                for fanin in [fanin0, fanin1] {
                    if refs[fanin.get_node_id()] > 1 {
                        pairs.push((id, fanin.get_node_id(), x, y));
                    }
                }
            }
            let combos = if compl_diff {
                [(false, false), (true, true)]
            } else {
                [(false, true), (true, false)]
            };
            for (cx, cy) in combos {
                probe_and(aig, &mut pairs, id, (x, cx), (y, cy));
            }
        }
    }

    let mut memo = StampedValues::new(aig.num_nodes());
    let mut half = Vec::with_capacity(pairs.len());
    for (sum, carry, x, y) in pairs {
        let (a, b) = if x.get_node_id() < y.get_node_id() {
            (x.get_node_id(), y.get_node_id())
        } else {
            (y.get_node_id(), x.get_node_id())
        };
        let leaves = [a, b];
        let sum_truth = cut_truth(aig, sum, &leaves, &mut memo)? as u8;
        let carry_truth = cut_truth(aig, carry, &leaves, &mut memo)? as u8;
        if let Some(adder) = Adder::from_truths([a, b, 0], sum, carry, (sum_truth, carry_truth)) {
            half.push(adder);
        }
    }
    Ok(half)
}
