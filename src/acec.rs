//! Arithmetic circuit equivalence checking.
//!
//! Two circuits computing the same arithmetic function (typically two multipliers) are compared
//! by first recovering their adder trees, then aligning the trees and rebuilding them the same
//! way in both circuits, so that the final SAT-based check only has to deal with the logic
//! around them:
//! - [`adder`] finds full and half adders with [`cuts`] and [`truth`] tables
//! - [`tree`] assembles them into a ranked [`AdderBox`](tree::AdderBox), [`booth`] keeps Booth
//!   partial product cells out of it
//! - [`matcher`] aligns the boxes of both circuits over the classes of [`equiv`]
//! - [`rewrite`] reinserts each box in normalized form.
//!
//! When a step finds nothing to work with, the original circuits go to the solver unmodified.
//! [`polyn`] provides the algebraic view of a circuit or a box.
//!
//! ```rust
//! use acec::{AcecOptions, AcecStatus, Aig, check_equivalence};
//!
//! let mut a = Aig::with_inputs(2);
//! let x = a.get_input(0).unwrap();
//! let y = a.get_input(1).unwrap();
//! let s = a.new_xor(x, y).unwrap();
//! a.add_output(s).unwrap();
//!
//! let mut b = Aig::with_inputs(2);
//! let x = b.get_input(0).unwrap();
//! let y = b.get_input(1).unwrap();
//! let or = b.new_or(x, y).unwrap();
//! let and = b.new_and(x, y).unwrap();
//! let s = b.new_and(or, !and).unwrap();
//! b.add_output(s).unwrap();
//!
//! let report = check_equivalence(&a, &b, &AcecOptions::default()).unwrap();
//! assert_eq!(report.status, AcecStatus::Equivalent);
//! ```

pub mod adder;
pub mod booth;
pub mod chain;
pub mod cuts;
pub mod equiv;
pub mod matcher;
pub mod polyn;
pub mod rewrite;
#[cfg(test)]
pub(crate) mod testing;
pub mod tree;
pub mod truth;

use std::fmt::Display;

use log::{debug, info, warn};
use thiserror::Error;

use crate::{
    Aig, AigEdge, NodeId, Result,
    miter::{demiter_dual, demiter_halves},
    sat::{EquivSolver, SatCec, SolverConfig, SolverVerdict},
};

use adder::AdderSet;
use booth::{BoothLibrary, BoothParams, BoothReport};
use cuts::CutParams;
use equiv::EquivParams;
use matcher::{MatchStats, match_boxes};
use tree::AdderBox;

/// Error returned when an internal invariant of the arithmetic pipeline is broken.
/// None of them depends on the input circuits: they all denote a bug.
#[derive(Debug, Error)]
pub enum AcecError {
    /// An adder does not compute what its derived phases announce.
    #[error(
        "adder {adder} of rank {rank} (sum id={sum}, carry id={carry}) fails phase verification"
    )]
    PhaseVerification {
        rank: usize,
        adder: usize,
        sum: NodeId,
        carry: NodeId,
    },

    /// Two adders drive the same output.
    #[error("node id={carry} is driven by adders {first} and {second}")]
    DuplicateCarry {
        carry: NodeId,
        first: usize,
        second: usize,
    },

    /// The two boxes do not share the same number of leaves at a rank.
    #[error("rank {rank} shares {shared_a} leaves on one side and {shared_b} on the other")]
    SharedRankMismatch {
        rank: usize,
        shared_a: usize,
        shared_b: usize,
    },

    /// Shared and unique leaves of a rank do not add up to its leaves.
    #[error("rank {rank} has {expected} leaves but {found} shared and unique ones")]
    LeafCountMismatch {
        rank: usize,
        expected: usize,
        found: usize,
    },

    /// A monomial still refers to a gate once the polynomial is built.
    #[error("monomial left with gate id={0}")]
    UnexpandedMonomial(NodeId),

    /// Expanding a gate brought a gate that is not older than itself.
    #[error("expanding gate id={0} breaks the topological order")]
    InvalidOrder(NodeId),
}

/// Options of [`check_equivalence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcecOptions {
    pub conflict_limit: u64,
    /// In seconds, 0 means no limit.
    pub time_limit: u64,
    /// The first circuit is a miter, the second one is ignored.
    pub treat_as_miter: bool,
    /// Miter outputs are pairs `(2i, 2i + 1)`.
    pub dual_output: bool,
    /// Miter outputs are two words, first half against second half.
    pub two_output: bool,
    /// Keep Booth partial product cells out of the adder trees.
    pub booth_mode: bool,
    /// Do not log the verdict.
    pub silent: bool,
    /// Log the boxes rank by rank.
    pub verbose: bool,
    /// Only keep adders of carry chains at least that long.
    pub min_chain_len: Option<usize>,
    /// Simulation rounds used to find equivalent leaves.
    pub equiv_sim_words: usize,
    pub seed: u64,
}

impl Default for AcecOptions {
    fn default() -> Self {
        AcecOptions {
            conflict_limit: 1000,
            time_limit: 0,
            treat_as_miter: false,
            dual_output: false,
            two_output: false,
            booth_mode: false,
            silent: false,
            verbose: false,
            min_chain_len: None,
            equiv_sim_words: 4,
            seed: 0,
        }
    }
}

impl AcecOptions {
    pub fn solver_config(&self) -> SolverConfig {
        SolverConfig {
            conflict_limit: self.conflict_limit,
            time_limit: self.time_limit,
            verbose: self.verbose,
        }
    }

    pub fn equiv_params(&self) -> EquivParams {
        EquivParams {
            sim_words: self.equiv_sim_words,
            sat_budget: self.conflict_limit,
            seed: self.seed,
        }
    }
}

/// Final verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcecStatus {
    Equivalent,
    NotEquivalent,
    /// The solver ran out of resources.
    Unknown,
}

impl Display for AcecStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcecStatus::Equivalent => write!(f, "equivalent"),
            AcecStatus::NotEquivalent => write!(f, "not equivalent"),
            AcecStatus::Unknown => write!(f, "undecided"),
        }
    }
}

/// Steps of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcecState {
    Start,
    BoxDerived,
    BoxesMatched,
    Rewritten,
    Fallback,
    Verified,
}

/// Why the original circuits were handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// No adder tree in circuit `circuit` (0 or 1).
    DetectionMiss { circuit: usize },
    /// The boxes do not share any leaf.
    StructuralMismatch,
    /// The box of circuit `circuit` cannot be reinserted.
    RewriteRejected { circuit: usize },
    /// A single-output-set miter has nothing to pair, it goes to the solver as is.
    PlainMiter,
}

/// Outcome of [`check_equivalence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcecReport {
    pub status: AcecStatus,
    /// First output found to differ.
    pub failed_output: Option<usize>,
    /// States visited, in order.
    pub trace: Vec<AcecState>,
    pub fallback: Option<FallbackReason>,
    pub matched: Option<MatchStats>,
    /// Whether the last two outputs were proven by the normalization alone.
    pub stripped: bool,
}

impl AcecReport {
    fn new() -> Self {
        AcecReport {
            status: AcecStatus::Unknown,
            failed_output: None,
            trace: vec![AcecState::Start],
            fallback: None,
            matched: None,
            stripped: false,
        }
    }

    fn enter(&mut self, state: AcecState) {
        let from = self.trace.last().copied().unwrap_or(AcecState::Start);
        info!("{:?} -> {:?}", from, state);
        self.trace.push(state);
    }

    fn conclude(&mut self, verdict: SolverVerdict, options: &AcecOptions) {
        (self.status, self.failed_output) = match verdict {
            SolverVerdict::Equivalent => (AcecStatus::Equivalent, None),
            SolverVerdict::NotEquivalent { output, .. } => {
                (AcecStatus::NotEquivalent, Some(output))
            }
            SolverVerdict::Unknown => (AcecStatus::Unknown, None),
        };
        self.enter(AcecState::Verified);
        if !options.silent {
            match self.failed_output {
                Some(output) => info!("circuits are {} (output {})", self.status, output),
                None => info!("circuits are {}", self.status),
            }
        }
    }
}

/// Checks whether `a` and `b` compute the same outputs, inputs and outputs being matched by
/// position. With [`AcecOptions::treat_as_miter`], `a` is a miter and `b` is ignored.
pub fn check_equivalence(a: &Aig, b: &Aig, options: &AcecOptions) -> Result<AcecReport> {
    let mut solver = SatCec::new(4, options.seed);
    check_equivalence_with(a, b, options, &mut solver)
}

/// [`check_equivalence`] with the given solver.
pub fn check_equivalence_with(
    a: &Aig,
    b: &Aig,
    options: &AcecOptions,
    solver: &mut impl EquivSolver,
) -> Result<AcecReport> {
    if options.treat_as_miter {
        if b.num_nodes() > 1 || b.num_outputs() > 0 {
            warn!("second circuit ignored, the first one is checked as a miter");
        }
        return check_miter(a, options, solver);
    }
    run(a, b, options, solver)
}

/// Checks a miter: its output pairs if it is a dual-output or a two-word miter, otherwise that
/// every output is constant 0.
pub fn check_miter(
    miter: &Aig,
    options: &AcecOptions,
    solver: &mut impl EquivSolver,
) -> Result<AcecReport> {
    if options.dual_output {
        let (a, b) = demiter_dual(miter)?;
        return run(&a, &b, options, solver);
    }
    if options.two_output {
        let (a, b) = demiter_halves(miter)?;
        return run(&a, &b, options, solver);
    }
    let mut report = AcecReport::new();
    report.fallback = Some(FallbackReason::PlainMiter);
    report.enter(AcecState::Fallback);
    let verdict = solver.solve_miter(miter, &options.solver_config())?;
    report.conclude(verdict, options);
    Ok(report)
}

/// Finds the adders of `aig` and assembles its largest tree.
pub fn derive_box(aig: &Aig, options: &AcecOptions) -> Result<Option<AdderBox>> {
    let mut set = AdderSet::detect(aig, CutParams::default())?;
    if options.booth_mode {
        let library = BoothLibrary::new();
        let booth = BoothReport::detect(aig, &library, BoothParams::default())?;
        let dropped = booth.exclude_from(&mut set);
        debug!(
            "{} booth cells, {} adders dropped inside them",
            booth.num_cells(),
            dropped
        );
    }
    let b = AdderBox::derive(aig, &set, options.min_chain_len)?;
    if let Some(b) = &b {
        b.dump(options.verbose);
    }
    Ok(b)
}

fn run(
    a: &Aig,
    b: &Aig,
    options: &AcecOptions,
    solver: &mut impl EquivSolver,
) -> Result<AcecReport> {
    let mut report = AcecReport::new();
    let Some(mut box_a) = derive_box(a, options)? else {
        return fall_back(
            report,
            FallbackReason::DetectionMiss { circuit: 0 },
            a,
            b,
            options,
            solver,
        );
    };
    let Some(mut box_b) = derive_box(b, options)? else {
        return fall_back(
            report,
            FallbackReason::DetectionMiss { circuit: 1 },
            a,
            b,
            options,
            solver,
        );
    };
    report.enter(AcecState::BoxDerived);

    let stats = match_boxes(a, b, &mut box_a, &mut box_b, options.equiv_params())?;
    report.matched = Some(stats);
    if stats.shared == 0 {
        return fall_back(report, FallbackReason::StructuralMismatch, a, b, options, solver);
    }
    if options.verbose {
        box_a.dump(true);
        box_b.dump(true);
    }
    report.enter(AcecState::BoxesMatched);

    let Some(mut rewritten_a) = rewrite::rewrite(a, &box_a)? else {
        return fall_back(
            report,
            FallbackReason::RewriteRejected { circuit: 0 },
            a,
            b,
            options,
            solver,
        );
    };
    let Some(mut rewritten_b) = rewrite::rewrite(b, &box_b)? else {
        return fall_back(
            report,
            FallbackReason::RewriteRejected { circuit: 1 },
            a,
            b,
            options,
            solver,
        );
    };
    report.enter(AcecState::Rewritten);

    if strippable(a, b, &box_a, &box_b, &stats) {
        let n = a.num_outputs();
        for i in n - 2..n {
            rewritten_a.set_output(i, AigEdge::FALSE)?;
            rewritten_b.set_output(i, AigEdge::FALSE)?;
        }
        report.stripped = true;
        debug!("outputs {} and {} proven by normalization", n - 2, n - 1);
    }

    let verdict = solver.solve(&rewritten_a, &rewritten_b, &options.solver_config())?;
    report.conclude(verdict, options);
    Ok(report)
}

/// Hands the original circuits to the solver.
fn fall_back(
    mut report: AcecReport,
    reason: FallbackReason,
    a: &Aig,
    b: &Aig,
    options: &AcecOptions,
    solver: &mut impl EquivSolver,
) -> Result<AcecReport> {
    info!("falling back to plain equivalence checking: {:?}", reason);
    report.fallback = Some(reason);
    report.enter(AcecState::Fallback);
    let verdict = solver.solve(a, b, &options.solver_config())?;
    report.conclude(verdict, options);
    Ok(report)
}

/// Rank of the root driving output `index`, and whether the output is the complement of the
/// column bit of that rank.
fn output_root(aig: &Aig, b: &AdderBox, index: usize) -> Option<(usize, bool)> {
    let output = aig.get_outputs().get(index)?;
    b.roots.iter().enumerate().find_map(|(r, roots)| {
        roots
            .iter()
            .find(|root| root.get_node_id() == output.get_node_id())
            .map(|root| (r, root.get_complement() != output.get_complement()))
    })
}

/// The last two outputs are equal in both rewritten circuits when every leaf is shared and
/// both outputs come from the same column bits in the same phases.
fn strippable(a: &Aig, b: &Aig, box_a: &AdderBox, box_b: &AdderBox, stats: &MatchStats) -> bool {
    let n = a.num_outputs();
    if !stats.fully_shared() || n < 2 || b.num_outputs() != n {
        return false;
    }
    (n - 2..n).all(|i| {
        let root = output_root(a, box_a, i);
        root.is_some() && root == output_root(b, box_b, i)
    })
}
