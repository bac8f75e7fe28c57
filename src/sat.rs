//! The SAT-based equivalence solver used to finish (or replace) the arithmetic pipeline.
//!
//! [`EquivSolver`] is the seam: the pipeline only ever hands circuits to it.
//! [`SatCec`] is the default implementation, backed by [`varisat`]:
//! - a few rounds of random simulation hunt for a cheap counterexample
//! - every miter output is then encoded with [`Cnf::from_cone`] and asserted true
//! - UNSAT for every output means equivalence.

use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use log::debug;
use rand::{SeedableRng, rngs::StdRng};
use thiserror::Error;
use varisat::{ExtendFormula, Solver};

use crate::{
    Aig, AigEdge, Result,
    aig::sim::pattern_bits,
    cnf::Cnf,
    miter::Miter,
};

/// Error returned when the SAT backend fails.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The backend itself failed.
    #[error("SAT backend failed: {0}")]
    Backend(String),

    /// A satisfying assignment does not set the miter output when simulated.
    #[error("counterexample for output {0} does not replay on the miter")]
    SpuriousCounterexample(usize),
}

/// Resource limits handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolverConfig {
    pub conflict_limit: u64,
    /// In seconds, 0 means no limit.
    pub time_limit: u64,
    pub verbose: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            conflict_limit: 1000,
            time_limit: 0,
            verbose: false,
        }
    }
}

impl SolverConfig {
    fn deadline(&self, start: Instant) -> Option<Instant> {
        if self.time_limit == 0 {
            None
        } else {
            Some(start + Duration::from_secs(self.time_limit))
        }
    }
}

/// Outcome of an equivalence query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolverVerdict {
    Equivalent,
    /// Output `output` differs under the input assignment `counterexample`.
    NotEquivalent {
        output: usize,
        counterexample: Vec<bool>,
    },
    /// A resource limit was reached.
    Unknown,
}

/// A combinational equivalence checker.
pub trait EquivSolver {
    /// Proves that `a` and `b` compute the same outputs, inputs and outputs being matched by position.
    fn solve(&mut self, a: &Aig, b: &Aig, config: &SolverConfig) -> Result<SolverVerdict> {
        let miter = Miter::new(a, b)?;
        self.solve_miter(miter.get_aig(), config)
    }

    /// Proves that every output of `miter` is constant false.
    fn solve_miter(&mut self, miter: &Aig, config: &SolverConfig) -> Result<SolverVerdict>;
}

/// Simulation-then-SAT equivalence checker.
#[derive(Debug, Clone)]
pub struct SatCec {
    sim_rounds: usize,
    seed: u64,
}

impl Default for SatCec {
    fn default() -> Self {
        SatCec {
            sim_rounds: 4,
            seed: 0,
        }
    }
}

impl SatCec {
    pub fn new(sim_rounds: usize, seed: u64) -> Self {
        SatCec { sim_rounds, seed }
    }

    /// Looks for a differing output with random simulation.
    fn simulate(&self, miter: &Aig) -> Result<Option<SolverVerdict>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        for _ in 0..self.sim_rounds {
            let patterns = miter.random_patterns(&mut rng);
            let outputs = miter.simulate_outputs(&patterns)?;
            if let Some((output, word)) = outputs.iter().enumerate().find(|(_, w)| **w != 0) {
                let counterexample = pattern_bits(&patterns, word.trailing_zeros());
                debug!("simulation disproved output {}", output);
                return Ok(Some(SolverVerdict::NotEquivalent {
                    output,
                    counterexample,
                }));
            }
        }
        Ok(None)
    }

    /// Asserts the miter output and hands the cone to varisat.
    fn solve_output(miter: &Aig, output: AigEdge) -> Result<Option<Vec<bool>>> {
        let (mut cnf, litmap) = Cnf::from_cone(miter, &[output.get_node_id()])?;
        cnf.add_edge_is_true(output, &litmap)?;
        let Some(model) = solve_cnf(&cnf)? else {
            return Ok(None);
        };
        let counterexample = miter
            .get_inputs()
            .iter()
            .map(|id| litmap.get(id).is_some_and(|lit| model.contains(&lit.var())))
            .collect();
        Ok(Some(counterexample))
    }
}

impl EquivSolver for SatCec {
    fn solve_miter(&mut self, miter: &Aig, config: &SolverConfig) -> Result<SolverVerdict> {
        let start = Instant::now();
        let deadline = config.deadline(start);

        if let Some(verdict) = self.simulate(miter)? {
            return Ok(verdict);
        }

        for (output, &edge) in miter.get_outputs().iter().enumerate() {
            if edge.is_cst_false() {
                continue;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                debug!("time limit reached before output {}", output);
                return Ok(SolverVerdict::Unknown);
            }
            if let Some(counterexample) = SatCec::solve_output(miter, edge)? {
                if !miter.eval(&counterexample)?[output] {
                    return Err(SolverError::SpuriousCounterexample(output).into());
                }
                if config.verbose {
                    debug!("output {} disproved after {:?}", output, start.elapsed());
                }
                return Ok(SolverVerdict::NotEquivalent {
                    output,
                    counterexample,
                });
            }
        }

        if config.verbose {
            debug!(
                "{} outputs proven in {:?}",
                miter.num_outputs(),
                start.elapsed()
            );
        }
        Ok(SolverVerdict::Equivalent)
    }
}

/// Runs varisat on the CNF. Returns the set of true variables if SAT.
fn solve_cnf(cnf: &Cnf) -> Result<Option<HashSet<u64>>> {
    let mut solver = Solver::new();
    for clause in cnf.clauses() {
        let lits: Vec<varisat::Lit> = clause
            .lits()
            .iter()
            .map(|lit| varisat::Lit::from_dimacs(lit.to_dimacs() as isize))
            .collect();
        solver.add_clause(&lits);
    }
    let sat = solver
        .solve()
        .map_err(|e| SolverError::Backend(e.to_string()))?;
    if !sat {
        return Ok(None);
    }
    let model = solver
        .model()
        .ok_or(SolverError::Backend("no model for a SAT answer".to_string()))?;
    Ok(Some(
        model
            .iter()
            .filter(|l| l.is_positive())
            .map(|l| l.var().to_dimacs() as u64)
            .collect(),
    ))
}

/// Proves that two literals of `aig` are equivalent.
/// Returns `false` when a distinguishing input assignment exists.
pub fn prove_equal(aig: &Aig, a: AigEdge, b: AigEdge) -> Result<bool> {
    if a == b {
        return Ok(true);
    }
    if a.is_complement_of(&b) {
        return Ok(false);
    }
    let (mut cnf, litmap) = Cnf::from_cone(aig, &[a.get_node_id(), b.get_node_id()])?;
    cnf.add_edges_differ(a, b, &litmap)?;
    Ok(solve_cnf(&cnf)?.is_none())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::aig::sim::edge_value;

    /// Patterns (out of the 64 simulated ones) under which two literals differ.
    fn differ_under(values: &[u64], a: AigEdge, b: AigEdge) -> u64 {
        edge_value(values, a) ^ edge_value(values, b)
    }

    fn adder2(swap: bool) -> Aig {
        // 1-bit full adder written two ways
        let mut aig = Aig::with_inputs(3);
        let a = aig.get_input(0).unwrap();
        let b = aig.get_input(1).unwrap();
        let c = aig.get_input(2).unwrap();
        let (x, y) = if swap { (c, a) } else { (a, c) };
        let s1 = aig.new_xor(x, b).unwrap();
        let sum = aig.new_xor(s1, y).unwrap();
        let carry = if swap {
            let t = aig.new_and(s1, y).unwrap();
            let g = aig.new_and(x, b).unwrap();
            aig.new_or(t, g).unwrap()
        } else {
            aig.new_maj(a, b, c).unwrap()
        };
        aig.add_output(sum).unwrap();
        aig.add_output(carry).unwrap();
        aig
    }

    #[test]
    fn solve_equivalent_test() {
        let a = adder2(false);
        let b = adder2(true);
        let mut cec = SatCec::default();
        let verdict = cec.solve(&a, &b, &SolverConfig::default()).unwrap();
        assert_eq!(verdict, SolverVerdict::Equivalent);
    }

    #[test]
    fn solve_not_equivalent_test() {
        let a = adder2(false);
        let mut b = adder2(true);
        let o = b.get_outputs()[1];
        b.set_output(1, !o).unwrap();
        // no simulation: the answer must come from the solver
        let mut cec = SatCec::new(0, 0);
        let verdict = cec.solve(&a, &b, &SolverConfig::default()).unwrap();
        match verdict {
            SolverVerdict::NotEquivalent {
                output,
                counterexample,
            } => {
                assert_eq!(output, 1);
                assert_ne!(
                    a.eval(&counterexample).unwrap()[1],
                    b.eval(&counterexample).unwrap()[1]
                );
            }
            _ => panic!("expected a counterexample"),
        }
    }

    #[test]
    fn solve_miter_test() {
        let mut miter = Aig::with_inputs(2);
        let a = miter.get_input(0).unwrap();
        let b = miter.get_input(1).unwrap();
        let ab = miter.new_and(a, b).unwrap();
        let t = miter.new_and(ab, !a).unwrap();
        miter.add_output(t).unwrap();
        miter.add_output(AigEdge::FALSE).unwrap();
        let mut cec = SatCec::default();
        assert_eq!(
            cec.solve_miter(&miter, &SolverConfig::default()).unwrap(),
            SolverVerdict::Equivalent
        );

        // Only one minterm sets this output, simulation will most likely miss it
        let x = miter.add_input();
        let y = miter.add_input();
        let xy = miter.new_and(x, y).unwrap();
        let rare = miter.new_and(xy, ab).unwrap();
        miter.add_output(rare).unwrap();
        let mut cec = SatCec::new(0, 0);
        assert!(matches!(
            cec.solve_miter(&miter, &SolverConfig::default()).unwrap(),
            SolverVerdict::NotEquivalent { output: 2, .. }
        ));
    }

    #[test]
    fn prove_equal_test() {
        let mut aig = Aig::with_inputs(2);
        let a = aig.get_input(0).unwrap();
        let b = aig.get_input(1).unwrap();
        let x = aig.new_xor(a, b).unwrap();
        let or = aig.new_or(a, b).unwrap();
        let ab = aig.new_and(a, b).unwrap();
        let x2 = aig.new_and(or, !ab).unwrap();
        assert!(prove_equal(&aig, x, x2).unwrap());
        assert!(!prove_equal(&aig, x, !x2).unwrap());
        assert!(!prove_equal(&aig, x, or).unwrap());
        assert!(prove_equal(&aig, AigEdge::FALSE, AigEdge::FALSE).unwrap());

        let values = aig.simulate(&[0b1100, 0b1010]).unwrap();
        assert_eq!(differ_under(&values, x, x2) & 0xF, 0);
        assert_eq!(differ_under(&values, x, or) & 0xF, 0b1000);
    }
}
