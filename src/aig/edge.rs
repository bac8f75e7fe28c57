//! An [`AigEdge`] points at an [`AigNode`] and can be complemented (indicates the presence of a NOT gate).
//!
//! Edges double as *literals*: a `(node, polarity)` pair with the packed encoding
//! `2 * node + complement` (see [`AigEdge::lit`]).
//!
//! [`AigNode`]: crate::AigNode

use std::ops::Not;

use crate::NodeId;

/// Unambiguous fanin selector.
#[derive(Debug, Clone, Copy)]
pub enum FaninId {
    Fanin0,
    Fanin1,
}

impl From<bool> for FaninId {
    fn from(value: bool) -> Self {
        if value {
            FaninId::Fanin1
        } else {
            FaninId::Fanin0
        }
    }
}

impl From<usize> for FaninId {
    fn from(value: usize) -> Self {
        if value == 0 {
            FaninId::Fanin0
        } else if value == 1 {
            FaninId::Fanin1
        } else {
            panic!("could not create FaninId from value={}", value)
        }
    }
}

/// A directed edge representing a fanin for AIG nodes.
///
/// The edge can carry an inverter according to the value of `complement`.
/// Ordering follows the packed literal, so sorting edges sorts by node first.
///
/// For example:
///
/// ```rust
/// use acec::{Aig, AigEdge};
/// let mut aig = Aig::new();
/// let a = aig.add_input();
/// assert_eq!(a, !!a);
/// assert!(AigEdge::FALSE.is_cst_false());
/// assert!((!AigEdge::FALSE).is_cst_true());
/// assert_eq!(AigEdge::from_lit(a.lit()), a);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AigEdge {
    /// The node the edge is refering to.
    pub(crate) node: NodeId,
    /// Set to true if signal should be inverted.
    pub(crate) complement: bool,
}

impl Not for AigEdge {
    type Output = Self;

    fn not(mut self) -> Self::Output {
        self.complement = !self.complement;
        self
    }
}

impl From<&AigEdge> for (NodeId, bool) {
    fn from(edge: &AigEdge) -> Self {
        (edge.node, edge.complement)
    }
}

impl AigEdge {
    /// The constant false literal.
    pub const FALSE: AigEdge = AigEdge {
        node: 0,
        complement: false,
    };

    /// The constant true literal.
    pub const TRUE: AigEdge = AigEdge {
        node: 0,
        complement: true,
    };

    pub fn new(node: NodeId, complement: bool) -> Self {
        AigEdge { node, complement }
    }

    /// Rebuilds an edge from its packed literal.
    pub fn from_lit(lit: usize) -> Self {
        AigEdge {
            node: lit >> 1,
            complement: lit & 1 == 1,
        }
    }

    /// The packed literal `2 * node + complement`.
    pub fn lit(&self) -> usize {
        (self.node << 1) | self.complement as usize
    }

    pub fn get_node_id(&self) -> NodeId {
        self.node
    }

    pub fn get_complement(&self) -> bool {
        self.complement
    }

    /// Complements the edge if `cond` holds.
    pub fn not_if(self, cond: bool) -> Self {
        if cond { !self } else { self }
    }

    /// The same edge without inversion.
    pub fn regular(self) -> Self {
        AigEdge {
            node: self.node,
            complement: false,
        }
    }

    pub fn is_cst(&self) -> bool {
        self.node == 0
    }

    pub fn is_cst_false(&self) -> bool {
        self.node == 0 && !self.complement
    }

    pub fn is_cst_true(&self) -> bool {
        self.node == 0 && self.complement
    }

    pub fn is_complement_of(&self, other: &AigEdge) -> bool {
        self.node == other.node && self.complement ^ other.complement
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lit_test() {
        let e = AigEdge::new(7, true);
        assert_eq!(e.lit(), 15);
        assert_eq!(AigEdge::from_lit(15), e);
        assert_eq!((!e).lit(), 14);
        assert_eq!(e.regular(), AigEdge::new(7, false));
        assert_eq!(e.not_if(false), e);
        assert_eq!(e.not_if(true), !e);
    }

    #[test]
    fn complement_test() {
        let e = AigEdge::new(3, false);
        assert!(e.is_complement_of(&!e));
        assert!(!e.is_complement_of(&e));
        assert!(!e.is_complement_of(&AigEdge::new(4, true)));
        assert!(AigEdge::FALSE.is_cst() && AigEdge::TRUE.is_cst());
        assert!(!e.is_cst());
    }

    #[test]
    fn order_test() {
        let mut edges = vec![
            AigEdge::new(4, false),
            AigEdge::new(2, true),
            AigEdge::new(2, false),
        ];
        edges.sort();
        assert_eq!(
            edges,
            vec![
                AigEdge::new(2, false),
                AigEdge::new(2, true),
                AigEdge::new(4, false)
            ]
        );
    }

    #[test]
    #[should_panic]
    fn invalid_fanin_id_test() {
        _ = FaninId::from(2usize);
    }
}
