// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Input graphs and the randomised 3-colouring heuristic generators run.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::solution::{Edge, Node, Solution};

/// Number of colours a vertex can take.
pub const COLOURS: i32 = 3;

/// An undirected graph given as a list of edges between integer vertices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    edges: Vec<(i32, i32)>,
}

impl Graph {
    /// Parse `"<int>-<int>"` tokens. At least one token is required.
    pub fn parse<I, S>(tokens: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let edges = tokens
            .into_iter()
            .map(|token| {
                let token = token.as_ref();
                parse_edge(token).ok_or_else(|| {
                    Error::Usage(format!("malformed edge {token:?}, expected <int>-<int>"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        if edges.is_empty() {
            return Err(Error::Usage("at least one edge is required".into()));
        }
        Ok(Self { edges })
    }

    pub fn edges(&self) -> &[(i32, i32)] {
        &self.edges
    }

    /// Distinct vertices in ascending order.
    pub fn vertices(&self) -> Vec<i32> {
        let mut v: Vec<i32> = self.edges.iter().flat_map(|&(a, b)| [a, b]).collect();
        v.sort_unstable();
        v.dedup();
        v
    }
}

// The first integer may carry a sign, so split at the first '-' after it.
fn parse_edge(token: &str) -> Option<(i32, i32)> {
    let (split, _) = token.char_indices().skip(1).find(|&(_, c)| c == '-')?;
    let a = token[..split].parse().ok()?;
    let b = token[split + 1..].parse().ok()?;
    Some((a, b))
}

/// Produces a candidate solution for a graph. Called once per generator
/// iteration; implementations are expected to vary their output.
pub trait Heuristic {
    fn generate(&mut self, graph: &Graph) -> Solution;
}

impl<F> Heuristic for F
where
    F: FnMut(&Graph) -> Solution,
{
    fn generate(&mut self, graph: &Graph) -> Solution {
        self(graph)
    }
}

/// Colours every vertex uniformly at random, then removes each edge whose
/// endpoints ended up with the same colour.
pub struct RandomColouring<R = StdRng> {
    rng: R,
}

impl RandomColouring<StdRng> {
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomColouring<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Fresh colouring of every edge. A vertex gets the same colour in
    /// every edge it appears in.
    pub fn colour(&mut self, graph: &Graph) -> Vec<Edge> {
        let mut colours: HashMap<i32, i32> = HashMap::new();
        let mut node = |value: i32| {
            let colour = *colours
                .entry(value)
                .or_insert_with(|| self.rng.gen_range(0..COLOURS));
            Node::new(value, colour)
        };
        graph
            .edges()
            .iter()
            .map(|&(a, b)| {
                let n1 = node(a);
                let n2 = node(b);
                Edge::new(n1, n2)
            })
            .collect()
    }
}

impl<R: Rng> Heuristic for RandomColouring<R> {
    fn generate(&mut self, graph: &Graph) -> Solution {
        let removed: Vec<Edge> = self
            .colour(graph)
            .into_iter()
            .filter(Edge::is_conflicting)
            .collect();
        Solution::from_removed(&removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::MAX_EDGES;

    #[test]
    fn parses_edge_tokens() {
        let g = Graph::parse(["0-1", "1-2", "2-0"]).unwrap();
        assert_eq!(g.edges(), &[(0, 1), (1, 2), (2, 0)]);
        assert_eq!(g.vertices(), vec![0, 1, 2]);
    }

    #[test]
    fn parses_signed_vertices() {
        let g = Graph::parse(["-1-2", "3--4"]).unwrap();
        assert_eq!(g.edges(), &[(-1, 2), (3, -4)]);
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["", "1", "1-", "-1", "a-b", "1-2-3", "1 - 2", "1_2"] {
            let err = Graph::parse([bad]).unwrap_err();
            assert!(matches!(err, Error::Usage(_)), "{bad:?} accepted");
        }
    }

    #[test]
    fn rejects_empty_input() {
        let none: [&str; 0] = [];
        assert!(matches!(Graph::parse(none), Err(Error::Usage(_))));
    }

    #[test]
    fn colouring_is_consistent_per_vertex() {
        let g = Graph::parse(["0-1", "1-2", "2-0", "0-3"]).unwrap();
        let mut h = RandomColouring::seeded(7);
        for _ in 0..50 {
            let edges = h.colour(&g);
            let mut seen: HashMap<i32, i32> = HashMap::new();
            for e in &edges {
                for n in [e.n1, e.n2] {
                    assert!((0..COLOURS).contains(&n.colour));
                    assert_eq!(*seen.entry(n.value).or_insert(n.colour), n.colour);
                }
            }
        }
    }

    #[test]
    fn triangle_is_eventually_coloured_properly() {
        let g = Graph::parse(["0-1", "1-2", "2-0"]).unwrap();
        let mut h = RandomColouring::seeded(42);
        let found = (0..1000).any(|_| h.generate(&g).is_colourable());
        assert!(found);
    }

    #[test]
    fn removed_edges_are_the_conflicting_ones() {
        let g = Graph::parse(["0-1", "1-2", "2-3", "3-0"]).unwrap();
        let mut h = RandomColouring::seeded(3);
        for _ in 0..50 {
            let s = h.generate(&g);
            assert!(s.amount() <= 4);
            assert!(s.removed().iter().all(Edge::is_conflicting));
        }
    }

    #[test]
    fn too_many_conflicts_yield_the_sentinel() {
        let loops: Vec<&str> = vec!["5-5"; MAX_EDGES + 1];
        let g = Graph::parse(&loops).unwrap();
        let mut h = RandomColouring::seeded(1);
        assert!(h.generate(&g).is_no_solution());
    }

    #[test]
    fn same_seed_same_solutions() {
        let g = Graph::parse(["0-1", "1-2", "2-0", "2-3"]).unwrap();
        let mut a = RandomColouring::seeded(99);
        let mut b = RandomColouring::seeded(99);
        for _ in 0..20 {
            assert_eq!(a.generate(&g), b.generate(&g));
        }
    }
}
