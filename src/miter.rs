//! Generate miters between two circuits.
//!
//! To prove combinational equivalence checking (CEC) between two circuits `a` and `b`:
//! - generate miter from `a` and `b` with [`Miter::new`]
//! - every miter output is the XOR of a pair of corresponding outputs
//! - prove every miter output constant false with a SAT solver (see [`crate::sat`]).
//!
//! A circuit which already is a miter can be split back into two circuits
//! with [`demiter_dual`] or [`demiter_halves`].

use thiserror::Error;

use crate::{Aig, AigEdge, NodeId, Result, aig::map_edge};

/// Error returned when an operation related to the miter fails.
#[derive(Debug, Error)]
pub enum MiterError {
    /// Creation of a miter failed because the two AIGs have a different number of inputs.
    /// Inputs are matched by position.
    #[error("AIGs have different inputs : {0} vs {1}")]
    MiterDifferentInputs(usize, usize),

    /// Creation of a miter failed because the two AIGs have a different number of outputs.
    #[error("trying to construct a miter between two AIGs with different outputs : {0} vs {1}")]
    MiterDifferentOutputs(usize, usize),

    /// A node was not mapped to any SAT literal.
    #[error("node id {0} is not mapped to any literal")]
    UnmappedNodeToLit(NodeId),

    /// A dual-output miter must have an even number of outputs.
    #[error("cannot split a miter with an odd number of outputs ({0})")]
    OddOutputCount(usize),
}

/// A miter between two AIGs, sharing their inputs.
///
/// For background on what is a miter, please check
/// [Verification of large synthesized designs](https://doi.org/10.1109/ICCAD.1993.580110) by D. Brand.
///
/// Both circuits are copied into a single structurally hashed AIG, so identical logic collapses.
/// Output `i` of the miter is `a_i XOR b_i`: the circuits are equivalent iff every miter output
/// is constant false.
#[derive(Debug, Clone)]
pub struct Miter {
    aig: Aig,
    /// Maps nodes of `a` to literals of the miter.
    map_a: Vec<AigEdge>,
    /// Maps nodes of `b` to literals of the miter.
    map_b: Vec<AigEdge>,
    /// The compared output literals, in the miter.
    pairs: Vec<(AigEdge, AigEdge)>,
}

impl Miter {
    /// Create miter between two AIGs.
    ///
    /// This will fail if the given AIGs have a different number of inputs or outputs.
    pub fn new(a: &Aig, b: &Aig) -> Result<Self> {
        if a.num_inputs() != b.num_inputs() {
            return Err(MiterError::MiterDifferentInputs(a.num_inputs(), b.num_inputs()).into());
        }
        if a.num_outputs() != b.num_outputs() {
            return Err(
                MiterError::MiterDifferentOutputs(a.num_outputs(), b.num_outputs()).into(),
            );
        }

        let mut aig = Aig::with_inputs(a.num_inputs());
        let inputs = (0..a.num_inputs())
            .map(|i| aig.get_input(i))
            .collect::<Result<Vec<AigEdge>>>()?;
        let map_a = aig.append(a, &inputs)?;
        let map_b = aig.append(b, &inputs)?;

        let mut pairs = Vec::with_capacity(a.num_outputs());
        for (&oa, &ob) in a.get_outputs().iter().zip(b.get_outputs()) {
            let la = map_edge(&map_a, oa);
            let lb = map_edge(&map_b, ob);
            let z = aig.new_xor(la, lb)?;
            aig.add_output(z)?;
            pairs.push((la, lb));
        }

        Ok(Miter {
            aig,
            map_a,
            map_b,
            pairs,
        })
    }

    /// The miter itself.
    pub fn get_aig(&self) -> &Aig {
        &self.aig
    }

    pub fn num_outputs(&self) -> usize {
        self.pairs.len()
    }

    /// The compared literals of the `i`-th output pair, in the miter.
    pub fn output_pair(&self, i: usize) -> Option<(AigEdge, AigEdge)> {
        self.pairs.get(i).copied()
    }

    /// Literal of node `id` of `a`, in the miter.
    pub fn lit_a(&self, id: NodeId) -> Option<AigEdge> {
        self.map_a.get(id).copied()
    }

    /// Literal of node `id` of `b`, in the miter.
    pub fn lit_b(&self, id: NodeId) -> Option<AigEdge> {
        self.map_b.get(id).copied()
    }

    /// Number of outputs proven by structural hashing alone.
    pub fn num_trivial_outputs(&self) -> usize {
        self.aig
            .get_outputs()
            .iter()
            .filter(|o| o.is_cst_false())
            .count()
    }
}

/// Splits a dual-output miter: outputs `2i` go to the first circuit, outputs `2i + 1` to the second.
pub fn demiter_dual(miter: &Aig) -> Result<(Aig, Aig)> {
    let n = miter.num_outputs();
    if n % 2 == 1 {
        return Err(MiterError::OddOutputCount(n).into());
    }
    let even: Vec<usize> = (0..n).step_by(2).collect();
    let odd: Vec<usize> = (1..n).step_by(2).collect();
    Ok((miter.dup_with_outputs(&even)?, miter.dup_with_outputs(&odd)?))
}

/// Splits a two-word miter: the first half of the outputs against the second half.
pub fn demiter_halves(miter: &Aig) -> Result<(Aig, Aig)> {
    let n = miter.num_outputs();
    if n % 2 == 1 {
        return Err(MiterError::OddOutputCount(n).into());
    }
    let first: Vec<usize> = (0..n / 2).collect();
    let second: Vec<usize> = (n / 2..n).collect();
    Ok((
        miter.dup_with_outputs(&first)?,
        miter.dup_with_outputs(&second)?,
    ))
}
