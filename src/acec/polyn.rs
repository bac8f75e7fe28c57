//! Polynomials over the nodes of a graph.
//!
//! A polynomial maps monomials (sets of node ids, each node standing for its 0/1 value) to
//! integer coefficients. Coefficients are kept as sets of signed powers of two: exponent `e > 0`
//! stands for `+2^(e-1)` and `e < 0` for `-2^(-e-1)`. Monomials and coefficient sets are interned,
//! id 0 being the empty set: an empty coefficient set is the coefficient 0.
//!
//! Interned ids are only meaningful inside the [`PolynBuilder`] that issued them.
//!
//! The builder starts from the weighted outputs and replaces gates by the polynomial of their
//! fanins, always expanding the monomial whose largest gate is the largest, until only leaves
//! are left.

use std::{
    collections::{BinaryHeap, HashMap, HashSet},
    hash::Hash,
};

use log::debug;

use crate::{Aig, AigEdge, AigNode, NodeId, Result};

use super::{AcecError, tree::AdderBox};

/// Hash-consing table, id 0 being the empty set.
#[derive(Debug, Clone)]
pub struct Interner<T> {
    ids: HashMap<Vec<T>, usize>,
    items: Vec<Vec<T>>,
}

impl<T: Clone + Eq + Hash> Default for Interner<T> {
    fn default() -> Self {
        Interner::new()
    }
}

impl<T: Clone + Eq + Hash> Interner<T> {
    pub fn new() -> Self {
        let mut ids = HashMap::new();
        ids.insert(Vec::new(), 0);
        Interner {
            ids,
            items: vec![Vec::new()],
        }
    }

    /// Id of a set, given in canonical (sorted) order.
    pub fn intern(&mut self, item: Vec<T>) -> usize {
        if let Some(&id) = self.ids.get(&item) {
            return id;
        }
        let id = self.items.len();
        self.items.push(item.clone());
        self.ids.insert(item, id);
        id
    }

    pub fn get(&self, id: usize) -> &[T] {
        &self.items[id]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.len() <= 1
    }
}

/// Signed exponent of `sign * 2^k`.
fn exponent(k: u32, negative: bool) -> i32 {
    let e = k as i32 + 1;
    if negative { -e } else { e }
}

fn magnitude(e: i32) -> u32 {
    e.unsigned_abs() - 1
}

/// Adds the term `e` to the canonical set `coef`.
///
/// Equal terms carry into the next power, opposite terms annihilate, and opposite terms of
/// adjacent powers collapse to the smaller power with the sign of the larger one.
pub fn add_term(coef: &mut Vec<i32>, e: i32) {
    let mut e = e;
    loop {
        if let Some(pos) = coef.iter().position(|&c| c == e) {
            coef.remove(pos);
            e += e.signum();
            continue;
        }
        if let Some(pos) = coef.iter().position(|&c| c == -e) {
            coef.remove(pos);
            break;
        }
        if let Some(pos) = coef
            .iter()
            .position(|&c| c.signum() != e.signum() && magnitude(c).abs_diff(magnitude(e)) == 1)
        {
            let c = coef.remove(pos);
            let larger = if magnitude(c) > magnitude(e) { c } else { e };
            e = exponent(magnitude(c).min(magnitude(e)), larger < 0);
            continue;
        }
        coef.push(e);
        coef.sort_unstable();
        break;
    }
}

/// Value of a coefficient set, `None` if it does not fit in an `i128`.
pub fn coef_value(coef: &[i32]) -> Option<i128> {
    coef.iter().try_fold(0i128, |acc, &e| {
        let v = 2i128.checked_pow(magnitude(e))?;
        acc.checked_add(if e < 0 { -v } else { v })
    })
}

/// Signed powers of two summing to `value`.
fn terms_of(value: i64) -> Vec<i32> {
    let negative = value < 0;
    let mut v = value.unsigned_abs();
    let mut terms = Vec::new();
    while v != 0 {
        let k = v.trailing_zeros();
        terms.push(exponent(k, negative));
        v &= v - 1;
    }
    terms
}

/// Small polynomial with plain integer coefficients, used for one gate expansion.
type Local = Vec<(i64, Vec<NodeId>)>;

fn local_literal(edge: AigEdge) -> Local {
    let id = edge.get_node_id();
    match (id, edge.get_complement()) {
        (0, false) => Vec::new(),
        (0, true) => vec![(1, Vec::new())],
        (_, false) => vec![(1, vec![id])],
        (_, true) => vec![(1, Vec::new()), (-1, vec![id])],
    }
}

fn local_mul(x: &Local, y: &Local) -> Local {
    let mut result = Local::new();
    for (cx, mx) in x {
        for (cy, my) in y {
            let mut m = mx.clone();
            m.extend(my);
            m.sort_unstable();
            m.dedup();
            result.push((cx * cy, m));
        }
    }
    local_normalize(result)
}

fn local_normalize(poly: Local) -> Local {
    let mut sums: HashMap<Vec<NodeId>, i64> = HashMap::new();
    for (c, m) in poly {
        *sums.entry(m).or_insert(0) += c;
    }
    let mut result: Local = sums
        .into_iter()
        .filter(|(_, c)| *c != 0)
        .map(|(m, c)| (c, m))
        .collect();
    result.sort_unstable_by(|x, y| x.1.cmp(&y.1));
    result
}

/// Polynomial of a gate over its fanins.
fn expansion(node: &AigNode) -> Option<Local> {
    match node {
        AigNode::And { fanin0, fanin1 } => {
            Some(local_mul(&local_literal(*fanin0), &local_literal(*fanin1)))
        }
        AigNode::Xor { fanin0, fanin1 } => {
            let x = local_literal(*fanin0);
            let y = local_literal(*fanin1);
            let mut sum = x.clone();
            sum.extend(y.iter().cloned());
            sum.extend(local_mul(&x, &y).into_iter().map(|(c, m)| (-2 * c, m)));
            Some(local_normalize(sum))
        }
        _ => None,
    }
}

/// One term of a built polynomial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub coef: Vec<i32>,
    pub monomial: Vec<NodeId>,
}

impl Term {
    pub fn value(&self) -> Option<i128> {
        coef_value(&self.coef)
    }

    fn max_magnitude(&self) -> u32 {
        self.coef.iter().map(|&e| magnitude(e)).max().unwrap_or(0)
    }
}

/// A built polynomial, terms sorted by decreasing largest power then by first node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Polynomial {
    pub terms: Vec<Term>,
}

impl Polynomial {
    /// Value of the polynomial, `value(id)` giving the value of the node `id`.
    /// `None` on overflow.
    pub fn evaluate(&self, value: impl Fn(NodeId) -> bool) -> Option<i128> {
        self.terms
            .iter()
            .filter(|t| t.monomial.iter().all(|&id| value(id)))
            .try_fold(0i128, |acc, t| acc.checked_add(t.value()?))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Whether every monomial holds at most one node.
    pub fn is_linear(&self) -> bool {
        self.terms.iter().all(|t| t.monomial.len() <= 1)
    }
}

/// Expands weighted literals of a graph into a polynomial over leaves.
pub struct PolynBuilder<'a> {
    aig: &'a Aig,
    /// Nodes that are not expanded, besides inputs.
    stops: HashSet<NodeId>,
    coefs: Interner<i32>,
    monomials: Interner<NodeId>,
    /// Coefficient set id of every monomial id.
    table: HashMap<usize, usize>,
    queue: BinaryHeap<(NodeId, usize)>,
    expanded: usize,
}

impl<'a> PolynBuilder<'a> {
    pub fn new(aig: &'a Aig, stops: impl IntoIterator<Item = NodeId>) -> Self {
        PolynBuilder {
            aig,
            stops: stops.into_iter().collect(),
            coefs: Interner::new(),
            monomials: Interner::new(),
            table: HashMap::new(),
            queue: BinaryHeap::new(),
            expanded: 0,
        }
    }

    /// Largest gate of a monomial that still has to be expanded.
    fn pivot(&self, monomial: &[NodeId]) -> Option<NodeId> {
        monomial
            .iter()
            .rev()
            .copied()
            .find(|id| !self.stops.contains(id) && self.aig.fanins(*id).is_some())
    }

    /// Adds `sign * 2^k * monomial` to the polynomial.
    fn add(&mut self, monomial: Vec<NodeId>, k: u32, negative: bool) {
        let mid = self.monomials.intern(monomial);
        let cid = self.table.get(&mid).copied().unwrap_or(0);
        let mut coef = self.coefs.get(cid).to_vec();
        add_term(&mut coef, exponent(k, negative));
        let cid = self.coefs.intern(coef);
        self.table.insert(mid, cid);
        if let Some(pivot) = self.pivot(self.monomials.get(mid)) {
            self.queue.push((pivot, mid));
        }
    }

    /// Adds `sign * 2^k * literal`.
    pub fn add_literal(&mut self, edge: AigEdge, k: u32, negative: bool) {
        for (c, m) in local_literal(edge) {
            self.add(m, k, negative ^ (c < 0));
        }
    }

    /// Adds the outputs of the graph, output `i` weighing `2^i`. When `signed`, the last output
    /// weighs `-2^(n-1)`.
    pub fn add_outputs(&mut self, signed: bool) {
        let outputs = self.aig.get_outputs().to_vec();
        let n = outputs.len();
        for (i, edge) in outputs.into_iter().enumerate() {
            self.add_literal(edge, i as u32, signed && i + 1 == n);
        }
    }

    /// Expands every monomial down to the leaves.
    pub fn build(mut self) -> Result<Polynomial> {
        while let Some((pivot, mid)) = self.queue.pop() {
            let cid = self.table.get(&mid).copied().unwrap_or(0);
            if cid == 0 {
                continue;
            }
            let monomial = self.monomials.get(mid).to_vec();
            if self.pivot(&monomial) != Some(pivot) {
                continue;
            }
            let node = self.aig.node(pivot)?;
            let Some(local) = expansion(node) else {
                return Err(AcecError::UnexpandedMonomial(pivot).into());
            };
            let coef = self.coefs.get(cid).to_vec();
            self.table.insert(mid, 0);
            self.expanded += 1;

            let rest: Vec<NodeId> = monomial.iter().copied().filter(|&id| id != pivot).collect();
            for (c, m) in local {
                let mut merged = rest.clone();
                merged.extend(m);
                merged.sort_unstable();
                merged.dedup();
                if self.pivot(&merged).is_some_and(|p| p >= pivot) {
                    return Err(AcecError::InvalidOrder(pivot).into());
                }
                for t in terms_of(c) {
                    for &e in &coef {
                        let k = magnitude(t) + magnitude(e);
                        self.add(merged.clone(), k, (t < 0) != (e < 0));
                    }
                }
            }
        }

        let mut terms = Vec::new();
        for (&mid, &cid) in &self.table {
            if cid == 0 {
                continue;
            }
            let monomial = self.monomials.get(mid).to_vec();
            if let Some(pivot) = self.pivot(&monomial) {
                return Err(AcecError::UnexpandedMonomial(pivot).into());
            }
            terms.push(Term {
                coef: self.coefs.get(cid).to_vec(),
                monomial,
            });
        }
        terms.sort_by(|x, y| {
            y.max_magnitude()
                .cmp(&x.max_magnitude())
                .then_with(|| x.monomial.first().cmp(&y.monomial.first()))
                .then_with(|| x.monomial.cmp(&y.monomial))
        });
        debug!(
            "{} gates expanded, {} monomials and {} coefficient sets interned, {} terms left",
            self.expanded,
            self.monomials.len(),
            self.coefs.len(),
            terms.len()
        );
        Ok(Polynomial { terms })
    }
}

/// Polynomial of the outputs of a circuit, over its inputs.
pub fn output_polynomial(aig: &Aig, signed: bool) -> Result<Polynomial> {
    let mut builder = PolynBuilder::new(aig, []);
    builder.add_outputs(signed);
    builder.build()
}

/// Polynomial of the weighted roots of a box, over its leaves.
pub fn box_polynomial(aig: &Aig, b: &AdderBox) -> Result<Polynomial> {
    let leaves = b.leaves.iter().flatten().map(|e| e.get_node_id());
    let mut builder = PolynBuilder::new(aig, leaves);
    for (r, roots) in b.roots.iter().enumerate() {
        for &root in roots {
            builder.add_literal(root, r as u32, false);
        }
    }
    builder.build()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        aig::sim::{exhaustive_patterns, pattern_bits},
        acec::{adder::AdderSet, cuts::CutParams, testing},
    };

    fn value(coef: &[i32]) -> i128 {
        coef_value(coef).unwrap()
    }

    #[test]
    fn add_term_test() {
        let mut coef = Vec::new();
        add_term(&mut coef, exponent(2, false));
        assert_eq!(coef, vec![3]);
        // 4 + 4 = 8
        add_term(&mut coef, exponent(2, false));
        assert_eq!(coef, vec![4]);
        // 8 - 8 = 0
        add_term(&mut coef, exponent(3, true));
        assert!(coef.is_empty());

        // 4 - 1 - 2 = 1
        let mut coef = vec![exponent(2, false)];
        add_term(&mut coef, exponent(0, true));
        assert_eq!(value(&coef), 3);
        add_term(&mut coef, exponent(1, true));
        assert_eq!(coef, vec![exponent(0, false)]);

        // 2 - 4 = -2
        let mut coef = vec![exponent(1, false)];
        add_term(&mut coef, exponent(2, true));
        assert_eq!(coef, vec![exponent(1, true)]);
    }

    #[test]
    fn coef_zero_test() {
        // any sequence of additions summing to 0 leaves the empty set
        let values = [5i64, -3, 12, -7, -7, 1, -1];
        let mut coef = Vec::new();
        let mut total = 0i128;
        for v in values {
            for t in terms_of(v) {
                add_term(&mut coef, t);
            }
            total += v as i128;
            assert_eq!(value(&coef), total);
        }
        assert_eq!(total, 0);
        assert!(coef.is_empty());
    }

    #[test]
    fn coef_overflow_test() {
        assert_eq!(coef_value(&[exponent(126, false)]), Some(1i128 << 126));
        assert_eq!(coef_value(&[exponent(127, true)]), None);
        assert_eq!(coef_value(&[exponent(130, false)]), None);
        // 2^126 + 2^126 does not fit either
        assert_eq!(
            coef_value(&[exponent(126, false), exponent(125, false), exponent(125, false)]),
            None
        );

        let mut aig = Aig::with_inputs(1);
        let x = aig.get_input(0).unwrap();
        for _ in 0..130 {
            aig.add_output(x).unwrap();
        }
        let poly = output_polynomial(&aig, false).unwrap();
        assert_eq!(poly.evaluate(|_| false), Some(0));
        assert_eq!(poly.evaluate(|_| true), None);
    }

    #[test]
    fn interner_test() {
        let mut interner: Interner<NodeId> = Interner::new();
        assert!(interner.is_empty());
        assert_eq!(interner.intern(Vec::new()), 0);
        let x = interner.intern(vec![1, 3]);
        let y = interner.intern(vec![2]);
        assert_eq!(interner.intern(vec![1, 3]), x);
        assert_ne!(x, y);
        assert_eq!(interner.get(x), &[1, 3]);
        assert_eq!(interner.len(), 3);
    }

    fn check_exhaustive(aig: &Aig, poly: &Polynomial, signed: bool) {
        let n = aig.num_inputs();
        let words = if n > 6 { 1usize << (n - 6) } else { 1 };
        for word in 0..words {
            let patterns = exhaustive_patterns(n, word);
            for bit in 0..64 {
                let bits = pattern_bits(&patterns, bit);
                let expected = aig.output_value(&bits, signed).unwrap();
                let got = poly.evaluate(|id| match aig.get_node(id) {
                    Some(AigNode::Input(i)) => bits[*i],
                    _ => false,
                });
                assert_eq!(got, Some(expected));
            }
        }
    }

    #[test]
    fn ripple_carry_adder_test() {
        for native in [true, false] {
            let aig = testing::ripple_carry_adder(3, native);
            let poly = output_polynomial(&aig, false).unwrap();
            assert!(poly.is_linear());
            assert_eq!(poly.len(), 7);
            check_exhaustive(&aig, &poly, false);
            // a2 and b2 weigh 4
            assert_eq!(poly.terms[0].value(), Some(4));
            assert_eq!(poly.terms[1].value(), Some(4));
        }
    }

    #[test]
    fn multiplier_test() {
        let aig = testing::csa_multiplier(3, true);
        let poly = output_polynomial(&aig, false).unwrap();
        // one monomial a_i b_j per partial product
        assert_eq!(poly.len(), 9);
        assert!(poly.terms.iter().all(|t| t.monomial.len() == 2));
        check_exhaustive(&aig, &poly, false);
        check_exhaustive(&aig, &output_polynomial(&aig, true).unwrap(), true);
    }

    #[test]
    fn random_network_test() {
        for seed in 0..4 {
            let aig = testing::random_network(6, 24, 4, seed);
            for signed in [false, true] {
                let poly = output_polynomial(&aig, signed).unwrap();
                check_exhaustive(&aig, &poly, signed);
            }
        }
    }

    #[test]
    fn box_polynomial_test() {
        let aig = testing::csa_multiplier(3, false);
        let set = AdderSet::detect(&aig, CutParams::default()).unwrap();
        let b = AdderBox::derive(&aig, &set, None).unwrap().unwrap();
        let poly = box_polynomial(&aig, &b).unwrap();
        assert!(poly.is_linear());

        let values = aig.simulate(&exhaustive_patterns(6, 0)).unwrap();
        for bit in 0..64 {
            let got = poly.evaluate(|id| (values[id] >> bit) & 1 == 1);
            assert_eq!(got, Some(testing::weighted_sum(&values, &b.leaves, bit)));
        }
    }
}
