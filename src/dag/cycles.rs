// src/dag/cycles.rs

//! Simple-cycle enumeration over a graph given as adjacency lists of node
//! indices.
//!
//! This follows Johnson's algorithm: for every start node `s` (in index
//! order) we search for circuits through `s` inside the subgraph of nodes
//! with index `>= s`, using the blocked / blocked-by bookkeeping so that each
//! vertex is only re-explored once a new path out of it could exist.
//!
//! Every cycle is reported exactly once, starting at its smallest index.

use std::collections::HashSet;

/// Enumerate all simple cycles of `adjacency`.
///
/// `adjacency[v]` lists the successors of `v`. Successor lists must not
/// contain duplicates. A self-loop yields a cycle of length one.
pub fn simple_cycles(adjacency: &[Vec<usize>]) -> Vec<Vec<usize>> {
    if is_acyclic(adjacency) {
        return Vec::new();
    }

    let n = adjacency.len();
    let mut cycles = Vec::new();

    for start in 0..n {
        let mut search = CircuitSearch {
            adjacency,
            start,
            blocked: vec![false; n],
            blocked_by: vec![HashSet::new(); n],
            stack: Vec::new(),
            cycles: &mut cycles,
        };
        search.circuit(start);
    }

    cycles
}

/// Peel nodes with no remaining predecessors; anything left over sits on or
/// behind a cycle.
fn is_acyclic(adjacency: &[Vec<usize>]) -> bool {
    let mut incoming = vec![0usize; adjacency.len()];
    for successors in adjacency {
        for &w in successors {
            incoming[w] += 1;
        }
    }

    let mut ready: Vec<usize> = (0..adjacency.len())
        .filter(|&v| incoming[v] == 0)
        .collect();
    let mut peeled = 0;

    while let Some(v) = ready.pop() {
        peeled += 1;
        for &w in &adjacency[v] {
            incoming[w] -= 1;
            if incoming[w] == 0 {
                ready.push(w);
            }
        }
    }

    peeled == adjacency.len()
}

struct CircuitSearch<'a> {
    adjacency: &'a [Vec<usize>],
    start: usize,
    blocked: Vec<bool>,
    blocked_by: Vec<HashSet<usize>>,
    stack: Vec<usize>,
    cycles: &'a mut Vec<Vec<usize>>,
}

impl CircuitSearch<'_> {
    fn circuit(&mut self, v: usize) -> bool {
        let adjacency = self.adjacency;
        let mut found = false;

        self.stack.push(v);
        self.blocked[v] = true;

        for &w in &adjacency[v] {
            if w < self.start {
                continue;
            }
            if w == self.start {
                self.cycles.push(self.stack.clone());
                found = true;
            } else if !self.blocked[w] && self.circuit(w) {
                found = true;
            }
        }

        if found {
            self.unblock(v);
        } else {
            for &w in &adjacency[v] {
                if w >= self.start {
                    self.blocked_by[w].insert(v);
                }
            }
        }

        self.stack.pop();
        found
    }

    fn unblock(&mut self, v: usize) {
        let mut pending = vec![v];
        while let Some(u) = pending.pop() {
            if !self.blocked[u] {
                continue;
            }
            self.blocked[u] = false;
            pending.extend(self.blocked_by[u].drain());
        }
    }
}
