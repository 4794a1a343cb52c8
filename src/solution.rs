// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Fixed-size records shipped through the channel slots.
// Every field is an `i32` so the slot layout is identical in every process
// built from this crate.

use std::fmt;

use crate::error::{Error, Result};

/// Most removed edges a single solution can carry.
pub const MAX_EDGES: usize = 8;

/// A vertex and the colour it was given (0, 1 or 2).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Node {
    pub value: i32,
    pub colour: i32,
}

impl Node {
    pub const fn new(value: i32, colour: i32) -> Self {
        Self { value, colour }
    }
}

/// An undirected edge between two coloured vertices.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Edge {
    pub n1: Node,
    pub n2: Node,
}

impl Edge {
    pub const fn new(n1: Node, n2: Node) -> Self {
        Self { n1, n2 }
    }

    /// Both endpoints share a colour.
    pub fn is_conflicting(&self) -> bool {
        self.n1.colour == self.n2.colour
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.n1.value, self.n2.value)
    }
}

/// The edges a generator removed to make its colouring proper.
///
/// `amount == 0` means the input graph is 3-colourable as given.
/// `amount == NO_SOLUTION_AMOUNT` means more than [`MAX_EDGES`] edges would
/// have to go; the edges array is meaningless then.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Solution {
    amount: i32,
    edges: [Edge; MAX_EDGES],
}

impl Solution {
    /// Sentinel amount for "no solution within the edge budget". Any real
    /// amount is at most `MAX_EDGES`, so this can never collide with one.
    pub const NO_SOLUTION_AMOUNT: i32 = i32::MAX;

    pub const fn no_solution() -> Self {
        Self {
            amount: Self::NO_SOLUTION_AMOUNT,
            edges: [Edge::new(Node::new(0, 0), Node::new(0, 0)); MAX_EDGES],
        }
    }

    /// Build a solution from the removed edges, or the sentinel when there
    /// are more than [`MAX_EDGES`] of them.
    pub fn from_removed(removed: &[Edge]) -> Self {
        if removed.len() > MAX_EDGES {
            return Self::no_solution();
        }
        let mut edges = [Edge::default(); MAX_EDGES];
        edges[..removed.len()].copy_from_slice(removed);
        Self {
            amount: removed.len() as i32,
            edges,
        }
    }

    pub fn amount(&self) -> i32 {
        self.amount
    }

    pub fn is_colourable(&self) -> bool {
        self.amount == 0
    }

    pub fn is_no_solution(&self) -> bool {
        self.amount == Self::NO_SOLUTION_AMOUNT
    }

    /// The removed edges. Empty for the sentinel.
    pub fn removed(&self) -> &[Edge] {
        if self.is_no_solution() {
            return &[];
        }
        &self.edges[..self.amount as usize]
    }

    /// `self` removes strictly fewer edges than `other`.
    pub fn improves_on(&self, other: &Solution) -> bool {
        self.amount < other.amount
    }

    /// Reject records whose amount is neither a real count nor the sentinel.
    pub fn validate(&self) -> Result<()> {
        let real = (0..=MAX_EDGES as i32).contains(&self.amount);
        if real || self.is_no_solution() {
            return Ok(());
        }
        Err(Error::Protocol(format!(
            "solution amount {} outside 0..={MAX_EDGES}",
            self.amount
        )))
    }
}

impl Default for Solution {
    fn default() -> Self {
        Self::no_solution()
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_no_solution() {
            return f.write_str("no solution");
        }
        for (i, edge) in self.removed().iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{edge}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(a: i32, b: i32) -> Edge {
        Edge::new(Node::new(a, 0), Node::new(b, 0))
    }

    #[test]
    fn record_layout_is_fixed_width() {
        assert_eq!(std::mem::size_of::<Node>(), 8);
        assert_eq!(std::mem::size_of::<Edge>(), 16);
        assert_eq!(std::mem::size_of::<Solution>(), 4 + 16 * MAX_EDGES);
        assert_eq!(std::mem::align_of::<Solution>(), 4);
    }

    #[test]
    fn from_removed_keeps_edges_in_order() {
        let s = Solution::from_removed(&[edge(1, 2), edge(3, 4)]);
        assert_eq!(s.amount(), 2);
        assert_eq!(s.removed(), &[edge(1, 2), edge(3, 4)]);
        assert_eq!(s.to_string(), "1-2 3-4");
    }

    #[test]
    fn too_many_removed_edges_is_the_sentinel() {
        let many: Vec<Edge> = (0..=MAX_EDGES as i32).map(|i| edge(i, i + 1)).collect();
        let s = Solution::from_removed(&many);
        assert!(s.is_no_solution());
        assert!(s.removed().is_empty());

        let exact = Solution::from_removed(&many[..MAX_EDGES]);
        assert_eq!(exact.amount(), MAX_EDGES as i32);
    }

    #[test]
    fn empty_removal_is_colourable() {
        let s = Solution::from_removed(&[]);
        assert!(s.is_colourable());
        assert_eq!(s.to_string(), "");
    }

    #[test]
    fn improvement_is_strict() {
        let one = Solution::from_removed(&[edge(1, 2)]);
        let other_one = Solution::from_removed(&[edge(5, 6)]);
        assert!(one.improves_on(&Solution::no_solution()));
        assert!(!other_one.improves_on(&one));
        assert!(!Solution::no_solution().improves_on(&Solution::no_solution()));
    }

    #[test]
    fn validate_rejects_out_of_range_amounts() {
        assert!(Solution::no_solution().validate().is_ok());
        assert!(Solution::from_removed(&[]).validate().is_ok());

        let mut bad = Solution::from_removed(&[]);
        bad.amount = MAX_EDGES as i32 + 1;
        assert!(matches!(bad.validate(), Err(Error::Protocol(_))));
        bad.amount = -1;
        assert!(matches!(bad.validate(), Err(Error::Protocol(_))));
    }

    #[test]
    fn conflicting_edges() {
        assert!(Edge::new(Node::new(0, 2), Node::new(1, 2)).is_conflicting());
        assert!(!Edge::new(Node::new(0, 1), Node::new(1, 2)).is_conflicting());
    }
}
