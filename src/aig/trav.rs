//! Invocation-scoped traversal marks.
//!
//! Recursive walks (cone marking, phase propagation, truth-table evaluation) never write into
//! the graph. They own one of these side tables instead, and bump its generation to start a new
//! traversal in O(1).

use crate::NodeId;

/// One-shot visited marker based on generation stamps.
///
/// ```rust
/// use acec::aig::trav::TravIds;
/// let mut trav = TravIds::new(4);
/// trav.increment();
/// assert!(trav.set_current(2));
/// assert!(!trav.set_current(2));
/// trav.increment();
/// assert!(!trav.is_current(2));
/// ```
#[derive(Debug, Clone)]
pub struct TravIds {
    stamps: Vec<u32>,
    current: u32,
}

impl TravIds {
    pub fn new(size: usize) -> Self {
        TravIds {
            stamps: vec![0; size],
            current: 1,
        }
    }

    /// Starts a new traversal, invalidating every previous mark.
    pub fn increment(&mut self) {
        if self.current == u32::MAX {
            self.stamps.iter_mut().for_each(|s| *s = 0);
            self.current = 0;
        }
        self.current += 1;
    }

    pub fn is_current(&self, id: NodeId) -> bool {
        self.stamps.get(id).is_some_and(|&s| s == self.current)
    }

    /// Marks the node, returns false if it was already marked in this traversal.
    pub fn set_current(&mut self, id: NodeId) -> bool {
        if id >= self.stamps.len() {
            self.stamps.resize(id + 1, 0);
        }
        if self.stamps[id] == self.current {
            false
        } else {
            self.stamps[id] = self.current;
            true
        }
    }
}

/// Memo table whose entries are only valid for the current generation.
#[derive(Debug, Clone)]
pub struct StampedValues<T> {
    marks: TravIds,
    values: Vec<T>,
}

impl<T: Copy + Default> StampedValues<T> {
    pub fn new(size: usize) -> Self {
        StampedValues {
            marks: TravIds::new(size),
            values: vec![T::default(); size],
        }
    }

    /// Forgets every stored value.
    pub fn clear(&mut self) {
        self.marks.increment();
    }

    pub fn get(&self, id: NodeId) -> Option<T> {
        if self.marks.is_current(id) {
            Some(self.values[id])
        } else {
            None
        }
    }

    pub fn insert(&mut self, id: NodeId, value: T) {
        if id >= self.values.len() {
            self.values.resize(id + 1, T::default());
        }
        self.marks.set_current(id);
        self.values[id] = value;
    }
}
