//! Provides a DFS visitor to allow simple AIG traversal.
//!
//! See [`Dfs`] for details.
//!
//! [`Dfs`]: Dfs

use std::collections::HashSet;

use crate::{Aig, NodeId};

/// A simple DFS visitor.
///
/// Nodes are yielded in preorder. You can:
/// - start a DFS from a node using [`from_node`] (or several with [`from_nodes`])
/// - or visit all the AIG by starting from the outputs using [`from_outputs`].
///
/// In the latter case, it will start by the fanin of the first output,
/// then explore all non-previously-explored nodes from the fanin of the second output,
/// and so on until all the outputs have been processed.
///
/// [`from_node`]: Dfs::from_node
/// [`from_nodes`]: Dfs::from_nodes
/// [`from_outputs`]: Dfs::from_outputs
///
/// Example:
///
/// ```rust
/// use acec::{Aig, dfs::Dfs};
/// let mut aig = Aig::new();
/// let a = aig.add_input();
/// let b = aig.add_input();
/// let ab = aig.new_and(a, b).unwrap();
/// aig.add_output(ab).unwrap();
/// let mut dfs = Dfs::from_outputs(&aig);
/// let mut visited = Vec::new();
/// while let Some(id) = dfs.next(&aig) {
///     visited.push(id);
/// }
/// assert_eq!(visited.len(), 3);
/// ```
///
/// Inspired by [petgraph DFS](https://docs.rs/petgraph/latest/petgraph/visit/struct.Dfs.html).
pub struct Dfs {
    /// Must maintain the following invariant:
    /// - all nodes on the stack have not been visited yet
    /// - their `seen` flag is set to true to avoid adding them one more time to the stack
    /// - the different outputs from which to start a DFS are in starts
    ///   (they might have been visited already by the time we start the DFS from them,
    ///   and will simply be discarded if that's the case).
    stack: Vec<NodeId>,
    seen: HashSet<NodeId>,
    starts: Vec<NodeId>,
}

impl Dfs {
    /// Create a DFS from the initial start node.
    /// You will only browse the fanin of this node.
    pub fn from_node(start: NodeId) -> Self {
        Dfs {
            stack: vec![start],
            seen: HashSet::from([start]),
            starts: Vec::new(),
        }
    }

    /// Create a DFS browsing the fanins of several start nodes, first one first.
    pub fn from_nodes(mut starts: Vec<NodeId>) -> Self {
        starts.reverse();
        let mut dfs = Dfs {
            stack: Vec::new(),
            seen: HashSet::new(),
            starts,
        };
        dfs.new_start();
        dfs
    }

    /// Create a DFS from the outputs of the given AIG.
    /// It will explore all the logic the outputs depend on.
    pub fn from_outputs(aig: &Aig) -> Self {
        Dfs::from_nodes(
            aig.get_outputs()
                .iter()
                .map(|output| output.get_node_id())
                .collect(),
        )
    }

    /// Returns true if we are ready to start again! Else false, we are done.
    /// Should only be called when stack is empty (ie we are done with the current fanin).
    fn new_start(&mut self) -> bool {
        assert!(self.stack.is_empty());

        while let Some(id) = self.starts.pop() {
            if self.seen.insert(id) {
                self.stack.push(id);
                return true;
            }
        }
        false
    }

    /// Yield the next node of the DFS, or None if it is done.
    /// Ids that do not belong to the AIG are yielded but not expanded.
    pub fn next(&mut self, aig: &Aig) -> Option<NodeId> {
        loop {
            if let Some(id) = self.stack.pop() {
                if let Some(fanins) = aig.fanins(id) {
                    for fanin in fanins.iter().rev() {
                        let child = fanin.get_node_id();
                        if self.seen.insert(child) {
                            self.stack.push(child);
                        }
                    }
                }
                return Some(id);
            }
            if !self.new_start() {
                return None;
            }
        }
    }
}
