//! Truth tables of up to six variables, stored in a `u64`.
//!
//! Variable `i` is the projection [`VAR_PATTERNS[i]`](VAR_PATTERNS). A function of `n < 6`
//! variables is always kept stretched to 64 bits, so the unused variables are don't cares.

pub use crate::aig::sim::VAR_PATTERNS;

/// Three-input exclusive or over the leaf patterns `0xAA`, `0xCC`, `0xF0`.
pub const XOR3: u8 = 0x96;
/// Three-input majority over the leaf patterns `0xAA`, `0xCC`, `0xF0`.
pub const MAJ3: u8 = 0xE8;
/// Two-input exclusive or over the leaf patterns `0xAA`, `0xCC`.
pub const XOR2: u8 = 0x66;

/// Replicates the table of an `nvars`-variable function over 64 bits.
pub fn stretch(truth: u64, nvars: usize) -> u64 {
    let mut t = if nvars >= 6 {
        truth
    } else {
        truth & ((1u64 << (1 << nvars)) - 1)
    };
    let mut width = 1usize << nvars;
    while width < 64 {
        t |= t << width;
        width <<= 1;
    }
    t
}

/// Whether the function depends on variable `var`.
pub fn has_var(truth: u64, var: usize) -> bool {
    let shift = 1 << var;
    ((truth >> shift) & !VAR_PATTERNS[var]) != (truth & !VAR_PATTERNS[var])
}

/// Replaces variable `var` by its complement.
pub fn flip_var(truth: u64, var: usize) -> u64 {
    let shift = 1 << var;
    let mask = VAR_PATTERNS[var];
    ((truth & mask) >> shift) | ((truth & !mask) << shift)
}

/// Exchanges variables `i` and `j`.
pub fn swap_vars(truth: u64, i: usize, j: usize) -> u64 {
    if i == j {
        return truth;
    }
    let mut result = 0u64;
    for m in 0..64u32 {
        if (truth >> m) & 1 == 0 {
            continue;
        }
        let bi = (m >> i) & 1;
        let bj = (m >> j) & 1;
        let swapped = (m & !(1 << i) & !(1 << j)) | (bi << j) | (bj << i);
        result |= 1u64 << swapped;
    }
    result
}

/// `g(x) = f(y)` with `y[perm[k]] = x[k] ^ neg[k]`, for a function of `nvars` variables.
pub fn transform(truth: u64, nvars: usize, perm: &[usize], neg: u32) -> u64 {
    let mut result = 0u64;
    for m in 0..(1u32 << nvars) {
        let mut y = 0u32;
        for (k, &p) in perm.iter().enumerate().take(nvars) {
            let bit = ((m >> k) ^ (neg >> k)) & 1;
            y |= bit << p;
        }
        if (truth >> y) & 1 == 1 {
            result |= 1u64 << m;
        }
    }
    stretch(result, nvars)
}

/// Removes the variables the function does not depend on, compacting `leaves` accordingly.
pub fn min_base<T: Copy>(truth: u64, leaves: &mut Vec<T>) -> u64 {
    let mut t = truth;
    let mut kept = Vec::with_capacity(leaves.len());
    for (v, &leaf) in leaves.iter().enumerate() {
        if has_var(truth, v) {
            // every position below v that is not kept is a don't care
            t = swap_vars(t, kept.len(), v);
            kept.push(leaf);
        }
    }
    *leaves = kept;
    stretch(t, leaves.len())
}

/// Input phases `p` such that `truth == MAJ3(x0 ^ p0, x1 ^ p1, x2 ^ p2)`.
pub fn maj3_phase(truth: u8) -> Option<u8> {
    (0..8u8).find(|&p| maj3_with_phase(p) == truth)
}

/// `MAJ3(x0 ^ p0, x1 ^ p1, x2 ^ p2)` over three variables.
pub fn maj3_with_phase(phase: u8) -> u8 {
    let mut t = MAJ3 as u64;
    for v in 0..3 {
        if (phase >> v) & 1 == 1 {
            t = flip_var(t, v);
        }
    }
    (t & 0xFF) as u8
}

/// Majority of three words.
pub fn maj(a: u64, b: u64, c: u64) -> u64 {
    (a & b) | (a & c) | (b & c)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn stretch_test() {
        assert_eq!(stretch(0x6, 2), 0x6666_6666_6666_6666);
        assert_eq!(stretch(0x96, 3), 0x9696_9696_9696_9696);
        assert_eq!(stretch(0x1, 0), u64::MAX);
    }

    #[test]
    fn has_var_test() {
        let t = VAR_PATTERNS[0] & VAR_PATTERNS[2];
        assert!(has_var(t, 0));
        assert!(!has_var(t, 1));
        assert!(has_var(t, 2));
        assert!(!has_var(t, 5));
    }

    #[test]
    fn flip_swap_test() {
        assert_eq!(flip_var(VAR_PATTERNS[1], 1), !VAR_PATTERNS[1]);
        assert_eq!(flip_var(VAR_PATTERNS[0], 1), VAR_PATTERNS[0]);
        assert_eq!(swap_vars(VAR_PATTERNS[0], 0, 4), VAR_PATTERNS[4]);
        let t = VAR_PATTERNS[0] & !VAR_PATTERNS[3];
        assert_eq!(swap_vars(t, 3, 0), VAR_PATTERNS[3] & !VAR_PATTERNS[0]);
    }

    #[test]
    fn transform_test() {
        // and of x0 and !x1
        let f = 0x2u64;
        assert_eq!(transform(f, 2, &[0, 1], 0), stretch(0x2, 2));
        // g(x) = f(x1, x0) = x1 & !x0
        assert_eq!(transform(f, 2, &[1, 0], 0), stretch(0x4, 2));
        // g(x) = f(!x0, x1) = !x0 & !x1
        assert_eq!(transform(f, 2, &[0, 1], 0b01), stretch(0x1, 2));
    }

    #[test]
    fn min_base_test() {
        let mut leaves = vec![10, 11, 12, 13];
        let t = VAR_PATTERNS[1] ^ VAR_PATTERNS[3];
        let reduced = min_base(t, &mut leaves);
        assert_eq!(leaves, vec![11, 13]);
        assert_eq!(reduced, stretch(0x6, 2));

        let mut leaves = vec![1, 2];
        assert_eq!(min_base(0, &mut leaves), 0);
        assert!(leaves.is_empty());
    }

    #[test]
    fn maj3_phase_test() {
        for truth in [0xE8u8, 0xD4, 0xB2, 0x71, 0x17, 0x2B, 0x4D, 0x8E] {
            let p = maj3_phase(truth).unwrap();
            assert_eq!(maj3_with_phase(p), truth);
        }
        assert_eq!(maj3_phase(0xE8), Some(0));
        assert_eq!(maj3_phase(0x17), Some(7));
        assert_eq!(maj3_phase(XOR3), None);
        assert_eq!(maj(0b1100, 0b1010, 0b0110), 0b1110);
    }
}
