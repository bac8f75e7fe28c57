//! Tseitin encoding of AIG cones into a CNF that can be handed to a SAT solver.
//!
//! To prove that two literals of a (miter) AIG are equivalent:
//! - encode the cone of both literals with [`Cnf::from_cone`]
//! - assert that they differ with [`Cnf::add_xor_whose_output_is_true`]
//! - check that the CNF is **UNSAT** with a SAT solver (see [`crate::sat`]).
//!
//! If the resulting CNF is SAT, the model is a counterexample.

use std::{collections::HashMap, ops::Not};

use crate::{Aig, AigEdge, AigNode, NodeId, Result, miter::MiterError};

/// A SAT literal, in DIMACS convention.
///
/// Note that all AIG nodes do not correspond to a SAT literal.
/// For example, [`AigNode::False`] node do not map to any literal, but rather is omitted
/// as false boolean variables can be removed from a clause without changing the problem.
/// Clauses that contain a true boolean variable (ie a complemented edge to [`AigNode::False`] node)
/// are obviously true and don't need to be emitted.
///
/// These cases are handled by the internal `LitRes` data structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Lit(i64);

impl Not for Lit {
    type Output = Self;

    fn not(self) -> Self::Output {
        Lit(-self.0)
    }
}

impl From<i64> for Lit {
    fn from(value: i64) -> Self {
        if value == 0 {
            panic!("Tried to create a Lit from 0. 0 is not a valid literal in DIMACS format.");
        }
        Lit(value)
    }
}

impl Lit {
    /// The signed DIMACS value.
    pub fn to_dimacs(self) -> i64 {
        self.0
    }

    /// The (positive) variable index.
    pub fn var(self) -> u64 {
        self.0.unsigned_abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LitRes {
    False,
    True,
    Lit(Lit),
}

impl Not for LitRes {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            LitRes::False => LitRes::True,
            LitRes::True => LitRes::False,
            LitRes::Lit(lit) => LitRes::Lit(!lit),
        }
    }
}

impl From<Lit> for LitRes {
    fn from(value: Lit) -> Self {
        LitRes::Lit(value)
    }
}

/// A SAT clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause(Vec<Lit>);

impl Clause {
    /// A new empty clause.
    pub fn new() -> Self {
        Clause(Vec::new())
    }

    pub fn lits(&self) -> &[Lit] {
        &self.0
    }

    /// Returns the true SAT clause once we got rid of `True` and `False` literals.
    /// If there is a `True`, then the Clause is obviously satisfied, so we return None.
    /// `False` literals are omitted, and real literals are added to the clause.
    /// If the clause is empty (lits were only `False`), an empty clause is returned:
    /// it cannot be satisfied.
    fn from_lit_res(lits: Vec<LitRes>) -> Option<Clause> {
        let mut literals = Vec::new();

        for lit_res in lits {
            match lit_res {
                LitRes::True => return None,
                LitRes::False => (),
                LitRes::Lit(lit) => literals.push(lit),
            }
        }

        Some(Clause(literals))
    }
}

impl Default for Clause {
    fn default() -> Self {
        Clause::new()
    }
}

impl From<Vec<Lit>> for Clause {
    fn from(value: Vec<Lit>) -> Self {
        Clause(value)
    }
}

/// A SAT CNF that can be passed to a SAT solver.
///
/// It provides useful methods to create a miter such as [`add_xor`], [`add_xor_whose_output_is_true`],
/// and [`add_or_whose_output_is_true`], which can be used to finish the construction of the miter.
///
/// [`add_xor`]: Cnf::add_xor
/// [`add_xor_whose_output_is_true`]: Cnf::add_xor_whose_output_is_true
/// [`add_or_whose_output_is_true`]: Cnf::add_or_whose_output_is_true
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cnf {
    clauses: Vec<Clause>,
    num_vars: u64,
}

impl Cnf {
    /// A new empty CNF.
    pub fn new() -> Self {
        Cnf::default()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Largest variable index used so far.
    pub fn num_vars(&self) -> u64 {
        self.num_vars
    }

    /// Returns a yet unused SAT literal.
    pub fn fresh_lit(&mut self) -> Lit {
        self.num_vars += 1;
        Lit(self.num_vars as i64)
    }

    /// Add the given clause to the CNF.
    pub fn add_clause(&mut self, clause: Clause) {
        for lit in &clause.0 {
            self.num_vars = self.num_vars.max(lit.var());
        }
        self.clauses.push(clause);
    }

    /// Add the given clause to the CNF, else does nothing.
    pub fn add_clause_if(&mut self, clause: Option<Clause>) {
        if let Some(c) = clause {
            self.add_clause(c);
        }
    }

    /// Encodes the transitive fanin of `roots` (constant excluded).
    /// Returns the CNF together with the literal of every encoded node.
    pub fn from_cone(aig: &Aig, roots: &[NodeId]) -> Result<(Cnf, HashMap<NodeId, Lit>)> {
        let mut cnf = Cnf::new();
        let mut litmap = HashMap::new();
        for id in aig.cone(roots) {
            if id == 0 {
                continue;
            }
            let lit = cnf.fresh_lit();
            litmap.insert(id, lit);
            cnf.add_clauses_node(aig.node(id)?, &litmap, lit)?;
        }
        Ok((cnf, litmap))
    }

    /// Add clauses induced by the node, `z` being the literal of the node itself.
    pub fn add_clauses_node(
        &mut self,
        node: &AigNode,
        litmap: &HashMap<NodeId, Lit>,
        z: Lit,
    ) -> Result<()> {
        let z = LitRes::from(z);
        match node {
            AigNode::And { fanin0, fanin1 } => {
                let a = literal_res(fanin0, litmap)?;
                let b = literal_res(fanin1, litmap)?;

                self.add_clause_if(Clause::from_lit_res(vec![a, !z]));
                self.add_clause_if(Clause::from_lit_res(vec![b, !z]));
                self.add_clause_if(Clause::from_lit_res(vec![!a, !b, z]));
            }
            AigNode::Xor { fanin0, fanin1 } => {
                let a = literal_res(fanin0, litmap)?;
                let b = literal_res(fanin1, litmap)?;
                self.add_xor_res(a, b, z);
            }
            // The other nodes do not induce any clause, they only generate literals
            _ => (),
        }
        Ok(())
    }

    fn add_xor_res(&mut self, a: LitRes, b: LitRes, z: LitRes) {
        self.add_clause_if(Clause::from_lit_res(vec![a, b, !z]));
        self.add_clause_if(Clause::from_lit_res(vec![a, !b, z]));
        self.add_clause_if(Clause::from_lit_res(vec![!a, b, z]));
        self.add_clause_if(Clause::from_lit_res(vec![!a, !b, !z]));
    }

    /// Add clauses that encode `z = XOR(a, b)`.
    pub fn add_xor(&mut self, a: Lit, b: Lit, z: Lit) {
        self.add_xor_res(a.into(), b.into(), z.into());
    }

    /// Add clauses that encode `XOR(a, b) = true`.
    ///
    /// This is the function to use if you want to compare two internal nodes of a miter:
    /// the CNF is UNSAT iff both literals are equivalent.
    pub fn add_xor_whose_output_is_true(&mut self, a: Lit, b: Lit) {
        self.add_clause(Clause::from(vec![a, b]));
        self.add_clause(Clause::from(vec![!a, !b]));
    }

    /// Add clauses that encode `OR(inputs) = true`.
    ///
    /// This is the last node of the miter to compare two circuits.
    /// We assume that the output is true, which means there are at least a pair of outputs
    /// which differ for the same set of inputs:
    /// - if this is possible (ie the CNF is SAT), then circuits are not equivalent
    /// - if the CNF is UNSAT, then circuits are equivalent.
    pub fn add_or_whose_output_is_true(&mut self, inputs: Vec<Lit>) {
        self.add_clause(Clause::from(inputs));
    }

    /// Asserts that the given AIG literal is true.
    pub fn add_edge_is_true(
        &mut self,
        edge: AigEdge,
        litmap: &HashMap<NodeId, Lit>,
    ) -> Result<()> {
        let lit = literal_res(&edge, litmap)?;
        self.add_clause_if(Clause::from_lit_res(vec![lit]));
        Ok(())
    }

    /// Asserts that two AIG literals differ.
    /// The CNF is then UNSAT iff both literals are equivalent.
    pub fn add_edges_differ(
        &mut self,
        a: AigEdge,
        b: AigEdge,
        litmap: &HashMap<NodeId, Lit>,
    ) -> Result<()> {
        let a = literal_res(&a, litmap)?;
        let b = literal_res(&b, litmap)?;
        self.add_clause_if(Clause::from_lit_res(vec![a, b]));
        self.add_clause_if(Clause::from_lit_res(vec![!a, !b]));
        Ok(())
    }
}

fn literal_res(edge: &AigEdge, litmap: &HashMap<NodeId, Lit>) -> Result<LitRes> {
    let id = edge.get_node_id();
    let lit = if id == 0 {
        LitRes::False
    } else {
        LitRes::from(*litmap.get(&id).ok_or(MiterError::UnmappedNodeToLit(id))?)
    };
    Ok(if edge.get_complement() { !lit } else { lit })
}
