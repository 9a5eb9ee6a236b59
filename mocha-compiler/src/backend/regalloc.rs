//! Chaitin-style graph-coloring register allocation.
//!
//! Nodes are locations; for every instruction, each pair drawn from
//! `kill ∪ out` interferes.  The graph is colored with the general-purpose
//! register count by repeated lowest-degree-first removal; nodes that cannot
//! be colored stay memory-resident (the emitter materializes them through
//! the scratch pair on every use).  Ids are totally ordered and ties break
//! toward the lowest id, so allocation is deterministic.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::tac::{Instr, LocationId, LocationTable, Segment};

use super::liveness::Liveness;
use super::mips::abi::{Reg, GP_REGS, NUM_GP_REGS};

/// Physical registers chosen for one function window.  Locations absent from
/// the map are memory operands on every use.
pub type RegAssignment = BTreeMap<LocationId, Reg>;

#[derive(Debug, Default)]
pub struct InterferenceGraph {
    adj: BTreeMap<LocationId, BTreeSet<LocationId>>,
}

impl InterferenceGraph {
    /// Build the graph for `instrs[begin..=end]`, returning it together with
    /// the candidate set (the union of `kill ∪ gen` over the window).
    pub fn build(
        instrs: &[Instr],
        begin: usize,
        end: usize,
        liveness: &Liveness,
    ) -> (InterferenceGraph, BTreeSet<LocationId>) {
        let mut graph = InterferenceGraph::default();
        let mut candidates = BTreeSet::new();

        for i in begin..=end {
            let instr = &instrs[i];
            let kill = instr.kill_set();

            let mut interfering: BTreeSet<LocationId> = kill.clone();
            interfering.extend(liveness.live_out_at(i).iter().copied());
            for &u in &interfering {
                for &v in &interfering {
                    graph.add_edge(u, v);
                }
            }

            candidates.extend(kill);
            candidates.extend(instr.gen());
        }

        // Candidates that never interfere still need a node so they can be
        // colored (degree zero).
        for &loc in &candidates {
            graph.adj.entry(loc).or_default();
        }
        (graph, candidates)
    }

    /// Edges are undirected; self-edges are dropped.
    fn add_edge(&mut self, u: LocationId, v: LocationId) {
        if u == v {
            return;
        }
        self.adj.entry(u).or_default().insert(v);
        self.adj.entry(v).or_default().insert(u);
    }

    pub fn interferes(&self, u: LocationId, v: LocationId) -> bool {
        self.adj.get(&u).is_some_and(|n| n.contains(&v))
    }

    pub fn neighbors(&self, u: LocationId) -> Option<&BTreeSet<LocationId>> {
        self.adj.get(&u)
    }

    /// Color the graph with `k` colors numbered `1..=k`; color `0` means no
    /// register.
    ///
    /// Simplification repeatedly removes the remaining node of lowest degree
    /// (lowest id on ties).  A node whose degree is still `>= k` at removal
    /// time is given up on rather than spilled properly; its home slot is
    /// its only storage.  Reinsertion assigns each node the smallest color
    /// unused among its already-colored neighbors.
    pub fn kcolor(&self, k: usize) -> BTreeMap<LocationId, usize> {
        let mut degrees: BTreeMap<LocationId, usize> = self
            .adj
            .iter()
            .map(|(&id, neighbors)| (id, neighbors.len()))
            .collect();
        let mut stack = Vec::with_capacity(degrees.len());
        let mut colors: BTreeMap<LocationId, usize> = BTreeMap::new();

        while !degrees.is_empty() {
            let (&node, &degree) = degrees
                .iter()
                .min_by_key(|&(&id, &deg)| (deg, id))
                .expect("degree map is non-empty");
            degrees.remove(&node);
            for neighbor in &self.adj[&node] {
                if let Some(d) = degrees.get_mut(neighbor) {
                    *d -= 1;
                }
            }
            if degree < k {
                stack.push(node);
            } else {
                colors.insert(node, 0);
            }
        }

        while let Some(node) = stack.pop() {
            let taken: BTreeSet<usize> = self.adj[&node]
                .iter()
                .filter_map(|n| colors.get(n).copied())
                .collect();
            let color = (1..=k)
                .find(|c| !taken.contains(c))
                .expect("a simplified node always has a free color");
            colors.insert(node, color);
        }
        colors
    }
}

/// Allocate registers for one function window.
///
/// Only frame-resident locations are given registers: a global cached in a
/// register would go stale across calls, so gp-relative operands always go
/// through memory.
pub fn allocate(
    instrs: &[Instr],
    begin: usize,
    end: usize,
    liveness: &Liveness,
    locations: &LocationTable,
) -> RegAssignment {
    let (graph, candidates) = InterferenceGraph::build(instrs, begin, end, liveness);
    let colors = graph.kcolor(NUM_GP_REGS);

    let mut assignment = RegAssignment::new();
    for loc in candidates {
        if locations[loc].segment != Segment::FpRelative {
            continue;
        }
        if let Some(&color) = colors.get(&loc) {
            if color > 0 {
                assignment.insert(loc, GP_REGS[color - 1]);
            }
        }
    }
    debug!(
        "window {begin}..{end}: {} location(s) assigned registers",
        assignment.len()
    );
    assignment
}
