//! Circuit builders shared by the tests.

use rand::{RngCore, SeedableRng, rngs::StdRng};

use crate::{
    Aig, AigEdge,
    aig::sim::{edge_value, exhaustive_patterns},
};

use super::tree::AdderBox;

/// Exclusive or, either as a native gate or as three and gates.
pub fn xor(aig: &mut Aig, x: AigEdge, y: AigEdge, native: bool) -> AigEdge {
    if native {
        return aig.new_xor(x, y).unwrap();
    }
    let t0 = aig.new_and(x, !y).unwrap();
    let t1 = aig.new_and(!x, y).unwrap();
    aig.new_or(t0, t1).unwrap()
}

/// Full adder built from two half adders. Returns `(sum, carry)`.
pub fn full_adder(
    aig: &mut Aig,
    a: AigEdge,
    b: AigEdge,
    c: AigEdge,
    native: bool,
) -> (AigEdge, AigEdge) {
    let s1 = xor(aig, a, b, native);
    let sum = xor(aig, s1, c, native);
    let g = aig.new_and(a, b).unwrap();
    let p = aig.new_and(s1, c).unwrap();
    let carry = aig.new_or(g, p).unwrap();
    (sum, carry)
}

pub fn half_adder(aig: &mut Aig, a: AigEdge, b: AigEdge, native: bool) -> (AigEdge, AigEdge) {
    let sum = xor(aig, a, b, native);
    let carry = aig.new_and(a, b).unwrap();
    (sum, carry)
}

/// `n`-bit ripple-carry adder with carry in.
/// Inputs are `a[0..n]`, `b[0..n]`, `cin`. Outputs are `s[0..n]`, `cout`.
pub fn ripple_carry_adder(n: usize, native: bool) -> Aig {
    let mut aig = Aig::with_inputs(2 * n + 1);
    let mut carry = aig.get_input(2 * n).unwrap();
    let mut sums = Vec::with_capacity(n);
    for i in 0..n {
        let a = aig.get_input(i).unwrap();
        let b = aig.get_input(n + i).unwrap();
        let (s, c) = full_adder(&mut aig, a, b, carry, native);
        sums.push(s);
        carry = c;
    }
    for s in sums {
        aig.add_output(s).unwrap();
    }
    aig.add_output(carry).unwrap();
    aig
}

/// Reduces columns of weighted bits with full and half adders until one bit per column is left.
/// Returns one literal per column, `width` columns.
pub fn reduce_columns(
    aig: &mut Aig,
    mut columns: Vec<Vec<AigEdge>>,
    width: usize,
    native: bool,
) -> Vec<AigEdge> {
    columns.resize(width + 1, Vec::new());
    for w in 0..width {
        while columns[w].len() > 1 {
            let (sum, carry) = if columns[w].len() >= 3 {
                let a = columns[w].remove(0);
                let b = columns[w].remove(0);
                let c = columns[w].remove(0);
                full_adder(aig, a, b, c, native)
            } else {
                let a = columns[w].remove(0);
                let b = columns[w].remove(0);
                half_adder(aig, a, b, native)
            };
            columns[w].push(sum);
            columns[w + 1].push(carry);
        }
    }
    columns
        .into_iter()
        .take(width)
        .map(|c| c.first().copied().unwrap_or(AigEdge::FALSE))
        .collect()
}

/// `n x n` unsigned multiplier: and-gate partial products reduced by a carry-save adder tree.
/// Inputs are `a[0..n]`, `b[0..n]`, outputs the `2n` product bits.
pub fn csa_multiplier(n: usize, native: bool) -> Aig {
    let mut aig = Aig::with_inputs(2 * n);
    let mut columns = vec![Vec::new(); 2 * n];
    for i in 0..n {
        for j in 0..n {
            let a = aig.get_input(i).unwrap();
            let b = aig.get_input(n + j).unwrap();
            let pp = aig.new_and(a, b).unwrap();
            columns[i + j].push(pp);
        }
    }
    for bit in reduce_columns(&mut aig, columns, 2 * n, native) {
        aig.add_output(bit).unwrap();
    }
    aig
}

/// Radix-4 Booth partial products of the multiplicand `a` for the digit `-2 hi + mid + lo`.
/// The `a.len() + 1` returned bits read as a two's complement number of sign `hi`, to which
/// `hi` is added at the lowest weight.
pub fn booth_partial_products(
    aig: &mut Aig,
    a: &[AigEdge],
    [lo, mid, hi]: [AigEdge; 3],
    native: bool,
) -> Vec<AigEdge> {
    let one = xor(aig, mid, lo, native);
    let both = aig.new_and(mid, lo).unwrap();
    let none = aig.new_and(!mid, !lo).unwrap();
    let two = aig.new_mux(hi, none, both).unwrap();
    let mut row = Vec::with_capacity(a.len() + 1);
    for j in 0..=a.len() {
        let high = a.get(j).copied().unwrap_or(AigEdge::FALSE);
        let low = if j > 0 { a[j - 1] } else { AigEdge::FALSE };
        let t1 = aig.new_and(one, high).unwrap();
        let t2 = aig.new_and(two, low).unwrap();
        let select = aig.new_or(t1, t2).unwrap();
        row.push(xor(aig, select, hi, native));
    }
    row
}

/// One Booth row over an `n`-bit multiplicand.
/// Inputs are `a[0..n]`, then the digit bits `lo`, `mid`, `hi`. Outputs are the `n + 1` row
/// bits, then `hi`.
pub fn booth_row(n: usize, native: bool) -> Aig {
    let mut aig = Aig::with_inputs(n + 3);
    let a: Vec<AigEdge> = (0..n).map(|i| aig.get_input(i).unwrap()).collect();
    let digit = [n, n + 1, n + 2].map(|i| aig.get_input(i).unwrap());
    for bit in booth_partial_products(&mut aig, &a, digit, native) {
        aig.add_output(bit).unwrap();
    }
    aig.add_output(digit[2]).unwrap();
    aig
}

/// Random network of and and xor gates with random complemented fanins.
pub fn random_network(num_inputs: usize, num_gates: usize, num_outputs: usize, seed: u64) -> Aig {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut aig = Aig::with_inputs(num_inputs);
    let mut signals: Vec<AigEdge> = (0..num_inputs).map(|i| aig.get_input(i).unwrap()).collect();
    while signals.len() < num_inputs + num_gates {
        let r = rng.next_u64();
        let x = signals[(r % signals.len() as u64) as usize].not_if(r & (1 << 40) != 0);
        let y = signals[((r >> 16) % signals.len() as u64) as usize].not_if(r & (1 << 41) != 0);
        let g = if r & (1 << 42) != 0 {
            aig.new_xor(x, y).unwrap()
        } else {
            aig.new_and(x, y).unwrap()
        };
        // strashed or constant results do not count as new gates
        if g.is_cst() || signals.iter().any(|s| s.get_node_id() == g.get_node_id()) {
            continue;
        }
        signals.push(g);
    }
    for s in signals.iter().rev().take(num_outputs) {
        aig.add_output(*s).unwrap();
    }
    aig
}

/// Circuit computing the `nvars`-input function `truth` with a tree of multiplexers.
pub fn from_truth_table(truth: u64, nvars: usize) -> Aig {
    let mut aig = Aig::with_inputs(nvars);
    let out = shannon(&mut aig, truth, nvars);
    aig.add_output(out).unwrap();
    aig
}

fn shannon(aig: &mut Aig, truth: u64, var: usize) -> AigEdge {
    let width = 1u32 << var;
    let mask = if width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
    let t = truth & mask;
    if t == 0 {
        return AigEdge::FALSE;
    }
    if t == mask {
        return AigEdge::TRUE;
    }
    let half = width / 2;
    let low = t & ((1u64 << half) - 1);
    let high = t >> half;
    let sel = aig.get_input(var - 1).unwrap();
    let e = shannon(aig, low, var - 1);
    let h = shannon(aig, high, var - 1);
    aig.new_mux(sel, h, e).unwrap()
}

/// Exhaustively checks that two circuits compute the same outputs.
pub fn same_truth_tables(a: &Aig, b: &Aig) -> bool {
    a.output_truth_tables().unwrap() == b.output_truth_tables().unwrap()
}

/// Weighted sum of literals, rank `r` weighing `2^r`, at `bit` of the simulation words.
pub fn weighted_sum(values: &[u64], ranks: &[Vec<AigEdge>], bit: u32) -> i128 {
    ranks
        .iter()
        .enumerate()
        .map(|(r, edges)| {
            edges
                .iter()
                .map(|&e| ((edge_value(values, e) >> bit) & 1) as i128)
                .sum::<i128>()
                << r
        })
        .sum()
}

/// Checks exhaustively that the weighted leaves of the box equal its weighted roots.
pub fn box_identity_holds(aig: &Aig, b: &AdderBox) -> bool {
    let n = aig.num_inputs();
    let words = if n > 6 { 1usize << (n - 6) } else { 1 };
    for word in 0..words {
        let values = aig.simulate(&exhaustive_patterns(n, word)).unwrap();
        for bit in 0..64 {
            if weighted_sum(&values, &b.leaves, bit) != weighted_sum(&values, &b.roots, bit) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod test {
    use super::*;

    fn bits(m: u64, n: usize) -> Vec<bool> {
        (0..n).map(|i| (m >> i) & 1 == 1).collect()
    }

    #[test]
    fn ripple_carry_adder_test() {
        for native in [true, false] {
            let aig = ripple_carry_adder(3, native);
            for m in 0..128u64 {
                let a = m & 7;
                let b = (m >> 3) & 7;
                let c = (m >> 6) & 1;
                let out = aig.output_value(&bits(m, 7), false).unwrap();
                assert_eq!(out, (a + b + c) as i128);
            }
        }
    }

    #[test]
    fn csa_multiplier_test() {
        let aig = csa_multiplier(3, true);
        assert_eq!(aig.num_outputs(), 6);
        for m in 0..64u64 {
            let a = m & 7;
            let b = (m >> 3) & 7;
            assert_eq!(aig.output_value(&bits(m, 6), false).unwrap(), (a * b) as i128);
        }
    }

    #[test]
    fn booth_row_test() {
        for native in [true, false] {
            let aig = booth_row(3, native);
            assert_eq!(aig.num_outputs(), 5);
            for m in 0..64u64 {
                let a = (m & 7) as i128;
                let [lo, mid, hi] = [3, 4, 5].map(|i| ((m >> i) & 1) as i128);
                // the last output is the sign, and is also added at weight 1
                let row = aig.output_value(&bits(m, 6), true).unwrap() + hi;
                assert_eq!(row, (-2 * hi + mid + lo) * a);
            }
        }
    }

    #[test]
    fn from_truth_table_test() {
        let aig = from_truth_table(0xACC0, 4);
        for m in 0..16u64 {
            let expected = (0xACC0u64 >> m) & 1 == 1;
            assert_eq!(aig.eval(&bits(m, 4)).unwrap(), vec![expected]);
        }
    }

    #[test]
    fn random_network_test() {
        let aig = random_network(6, 20, 3, 7);
        assert_eq!(aig.num_inputs(), 6);
        assert_eq!(aig.num_outputs(), 3);
        assert!(aig.num_gates() <= 20);
        assert!(aig.check_integrity().is_ok());
    }
}
