//! Bit-parallel simulation of an [`Aig`]: 64 input patterns are evaluated at once,
//! one `u64` word per node.

use rand::{RngCore, rngs::StdRng};

use crate::{Aig, AigEdge, AigError, AigNode, Result};

/// Projection functions of the first six variables over 64 minterms.
pub const VAR_PATTERNS: [u64; 6] = [
    0xAAAA_AAAA_AAAA_AAAA,
    0xCCCC_CCCC_CCCC_CCCC,
    0xF0F0_F0F0_F0F0_F0F0,
    0xFF00_FF00_FF00_FF00,
    0xFFFF_0000_FFFF_0000,
    0xFFFF_FFFF_0000_0000,
];

/// Largest number of inputs accepted by exhaustive simulation.
pub const MAX_EXHAUSTIVE_INPUTS: usize = 16;

/// Value of a literal given the node values.
pub fn edge_value(values: &[u64], edge: AigEdge) -> u64 {
    let v = values[edge.node];
    if edge.complement { !v } else { v }
}

/// Input words for the `word`-th block of 64 minterms of an exhaustive enumeration.
/// Minterm `m` assigns bit `i` of `m` to input `i`.
pub fn exhaustive_patterns(num_inputs: usize, word: usize) -> Vec<u64> {
    (0..num_inputs)
        .map(|i| {
            if i < 6 {
                VAR_PATTERNS[i]
            } else if (word >> (i - 6)) & 1 == 1 {
                u64::MAX
            } else {
                0
            }
        })
        .collect()
}

/// Extracts the input assignment stored at `bit` of the given input words.
pub fn pattern_bits(inputs: &[u64], bit: u32) -> Vec<bool> {
    inputs.iter().map(|w| (w >> bit) & 1 == 1).collect()
}

impl Aig {
    /// Simulates 64 patterns at once. `inputs[i]` holds the 64 values of the `i`-th input.
    /// Returns the value word of every node.
    pub fn simulate(&self, inputs: &[u64]) -> Result<Vec<u64>> {
        if inputs.len() != self.inputs.len() {
            return Err(AigError::InvalidState(format!(
                "simulation got {} input words for {} inputs",
                inputs.len(),
                self.inputs.len()
            )));
        }
        let mut values = vec![0u64; self.nodes.len()];
        for (id, node) in self.nodes.iter().enumerate() {
            values[id] = match node {
                AigNode::False => 0,
                AigNode::Input(index) => inputs[*index],
                AigNode::And { fanin0, fanin1 } => {
                    edge_value(&values, *fanin0) & edge_value(&values, *fanin1)
                }
                AigNode::Xor { fanin0, fanin1 } => {
                    edge_value(&values, *fanin0) ^ edge_value(&values, *fanin1)
                }
            };
        }
        Ok(values)
    }

    /// Simulates 64 patterns at once and returns one word per output.
    pub fn simulate_outputs(&self, inputs: &[u64]) -> Result<Vec<u64>> {
        let values = self.simulate(inputs)?;
        Ok(self
            .outputs
            .iter()
            .map(|&output| edge_value(&values, output))
            .collect())
    }

    /// Evaluates the outputs for a single input assignment.
    pub fn eval(&self, inputs: &[bool]) -> Result<Vec<bool>> {
        let words: Vec<u64> = inputs.iter().map(|&b| if b { 1 } else { 0 }).collect();
        Ok(self
            .simulate_outputs(&words)?
            .into_iter()
            .map(|w| w & 1 == 1)
            .collect())
    }

    /// Reads the outputs as an integer, output `i` having weight `2^i`.
    /// If `signed`, the last output has weight `-2^(n-1)`.
    pub fn output_value(&self, inputs: &[bool], signed: bool) -> Result<i128> {
        let outputs = self.eval(inputs)?;
        let n = outputs.len();
        Ok(outputs
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .map(|(i, _)| {
                if signed && i + 1 == n {
                    -(1i128 << i)
                } else {
                    1i128 << i
                }
            })
            .sum())
    }

    /// Exhaustive truth tables of the outputs, one `Vec<u64>` of `max(1, 2^n / 64)` words per output.
    pub fn output_truth_tables(&self) -> Result<Vec<Vec<u64>>> {
        let n = self.inputs.len();
        if n > MAX_EXHAUSTIVE_INPUTS {
            return Err(AigError::InvalidState(format!(
                "exhaustive simulation limited to {} inputs, got {}",
                MAX_EXHAUSTIVE_INPUTS, n
            )));
        }
        let num_words = if n <= 6 { 1 } else { 1 << (n - 6) };
        let mask = if n < 6 { (1u64 << (1 << n)) - 1 } else { u64::MAX };
        let mut tables = vec![Vec::with_capacity(num_words); self.outputs.len()];
        for word in 0..num_words {
            let outputs = self.simulate_outputs(&exhaustive_patterns(n, word))?;
            for (table, value) in tables.iter_mut().zip(outputs) {
                table.push(value & mask);
            }
        }
        Ok(tables)
    }

    /// One random word per input.
    pub fn random_patterns(&self, rng: &mut StdRng) -> Vec<u64> {
        (0..self.inputs.len()).map(|_| rng.next_u64()).collect()
    }
}
