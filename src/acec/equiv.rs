//! Equivalence classes of nodes, computed on one graph.
//!
//! Candidates are grouped by random simulation signature (up to complementation), then every
//! member of a group is checked against the representatives of the group with a SAT call.
//! A node only joins a class once the SAT call proves it, so the classes are exact. Nodes that
//! could not be proven, or that were left over once the SAT budget ran out, stay alone.

use std::collections::HashMap;

use log::debug;
use rand::{SeedableRng, rngs::StdRng};

use crate::{Aig, AigEdge, NodeId, Result, sat::prove_equal};

/// Limits of the computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EquivParams {
    /// 64-pattern simulation rounds.
    pub sim_words: usize,
    /// Total number of SAT calls.
    pub sat_budget: u64,
    pub seed: u64,
}

impl Default for EquivParams {
    fn default() -> Self {
        EquivParams {
            sim_words: 4,
            sat_budget: 1000,
            seed: 0,
        }
    }
}

/// Representative literal of every candidate node.
#[derive(Debug, Clone, Default)]
pub struct EquivClasses {
    repr: HashMap<NodeId, AigEdge>,
    sat_calls: u64,
}

impl EquivClasses {
    /// Computes the classes of `candidates` in `aig`. The constant node always takes part.
    pub fn compute(aig: &Aig, candidates: &[NodeId], params: EquivParams) -> Result<Self> {
        let mut nodes: Vec<NodeId> = candidates.to_vec();
        nodes.push(0);
        nodes.sort_unstable();
        nodes.dedup();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut signatures: Vec<Vec<u64>> = vec![Vec::with_capacity(params.sim_words); nodes.len()];
        for _ in 0..params.sim_words.max(1) {
            let values = aig.simulate(&aig.random_patterns(&mut rng))?;
            for (sig, &id) in signatures.iter_mut().zip(&nodes) {
                sig.push(values[id]);
            }
        }

        // normalized so that the first pattern evaluates to 0
        let mut groups: HashMap<Vec<u64>, Vec<(NodeId, bool)>> = HashMap::new();
        for (sig, &id) in signatures.into_iter().zip(&nodes) {
            let phase = sig.first().is_some_and(|w| w & 1 == 1);
            let key = if phase {
                sig.iter().map(|w| !w).collect()
            } else {
                sig
            };
            groups.entry(key).or_default().push((id, phase));
        }

        let mut classes = EquivClasses::default();
        let mut merged = 0;
        let mut groups: Vec<Vec<(NodeId, bool)>> = groups.into_values().collect();
        groups.sort_unstable();
        for group in groups {
            let mut heads: Vec<(NodeId, bool)> = Vec::new();
            for (id, phase) in group {
                let mut found = None;
                for &(head, head_phase) in &heads {
                    if classes.sat_calls >= params.sat_budget {
                        break;
                    }
                    classes.sat_calls += 1;
                    let a = AigEdge::new(head, head_phase);
                    let b = AigEdge::new(id, phase);
                    if prove_equal(aig, a, b)? {
                        found = Some(AigEdge::new(head, head_phase ^ phase));
                        break;
                    }
                }
                match found {
                    Some(repr) => {
                        classes.repr.insert(id, repr);
                        merged += 1;
                    }
                    None => {
                        classes.repr.insert(id, AigEdge::new(id, false));
                        heads.push((id, phase));
                    }
                }
            }
        }
        debug!(
            "{} candidates, {} merged into a representative, {} sat calls",
            nodes.len(),
            merged,
            classes.sat_calls
        );
        Ok(classes)
    }

    /// Representative of a literal. Nodes that were not candidates represent themselves.
    pub fn repr(&self, edge: AigEdge) -> AigEdge {
        match self.repr.get(&edge.get_node_id()) {
            Some(r) => r.not_if(edge.get_complement()),
            None => edge,
        }
    }

    /// Number of SAT calls spent.
    pub fn sat_calls(&self) -> u64 {
        self.sat_calls
    }

    /// Number of nodes mapped to another node.
    pub fn num_merged(&self) -> usize {
        self.repr
            .iter()
            .filter(|(id, r)| r.get_node_id() != **id)
            .count()
    }
}
