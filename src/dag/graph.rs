// src/dag/graph.rs

use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, VecDeque};

use petgraph::Direction::{Incoming, Outgoing};
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{PipelineError, Result};
use crate::types::StepName;

/// Interned node handle. `DiGraphMap` wants `Copy` node weights, so names
/// live in `names` and the graph itself only stores indices into it.
type NodeId = usize;

/// Directed acyclic graph of step names.
///
/// An edge `a -> b` means `a` must complete before `b` runs. The graph is
/// acyclic at every observable point: an [`add`](DagGraph::add) that would
/// introduce a cycle is rolled back in full and reported as
/// [`PipelineError::DagCycle`].
///
/// Topological order is recomputed on every successful insertion and
/// cached. Ties are broken deterministically:
/// - nodes without prerequisites are seeded by descending out-degree, then
///   by insertion order;
/// - nodes unblocked later are visited first-in, first-out.
#[derive(Debug, Clone, Default)]
pub struct DagGraph {
    names: Vec<StepName>,
    ids: HashMap<StepName, NodeId>,
    graph: DiGraphMap<NodeId, ()>,
    ordered: Vec<NodeId>,
}

/// State needed to undo a failed insertion.
struct Checkpoint {
    node_count: usize,
    graph: DiGraphMap<NodeId, ()>,
}

impl DagGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from `(item, dependents)` pairs, applying
    /// [`add`](DagGraph::add) to each in turn.
    pub fn from_adjacency<'a, I, D>(adjacency: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: AsRef<[&'a str]>,
    {
        let mut dag = Self::new();
        for (item, dependents) in adjacency {
            dag.add(item, dependents.as_ref())?;
        }
        Ok(dag)
    }

    /// Ensure `item` is a node and add an edge `item -> d` for every `d` in
    /// `dependents`.
    ///
    /// Re-adding edges that already exist is a no-op. If the result would
    /// contain a cycle anywhere, the graph is restored to its previous state
    /// and a [`PipelineError::DagCycle`] naming `item` and `dependents` is
    /// returned.
    pub fn add(&mut self, item: &str, dependents: &[&str]) -> Result<()> {
        if dependents.iter().any(|d| *d == item) {
            return Err(cycle_error(item, dependents));
        }

        let checkpoint = self.checkpoint();

        let from = self.intern(item);
        for dependent in dependents {
            let to = self.intern(dependent);
            self.graph.add_edge(from, to, ());
        }

        let order = self.topsort();
        if order.len() != self.graph.node_count() {
            self.rollback(checkpoint);
            debug!(item, ?dependents, "rejected insertion: would create a cycle");
            return Err(cycle_error(item, dependents));
        }

        self.ordered = order;
        Ok(())
    }

    /// Snapshot of the last computed topological order.
    pub fn ordered(&self) -> Vec<StepName> {
        self.ordered.iter().map(|id| self.names[*id].clone()).collect()
    }

    /// Nodes with no incoming edges (no prerequisites), in insertion order.
    pub fn isolated(&self) -> Vec<StepName> {
        self.graph
            .nodes()
            .filter(|id| self.in_degree(*id) == 0)
            .map(|id| self.names[id].clone())
            .collect()
    }

    /// Nodes with a direct edge into `node`.
    pub fn edges_to(&self, node: &str) -> BTreeSet<StepName> {
        self.neighbours(node, Incoming)
    }

    /// Nodes with a direct edge out of `node`.
    pub fn edges_from(&self, node: &str) -> BTreeSet<StepName> {
        self.neighbours(node, Outgoing)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.ids.contains_key(node)
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        match (self.ids.get(from), self.ids.get(to)) {
            (Some(a), Some(b)) => self.graph.contains_edge(*a, *b),
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All node names, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.graph.nodes().map(|id| self.names[id].as_str())
    }

    /// All edges as `(prerequisite, dependent)` pairs, in insertion order of
    /// their source nodes.
    pub fn edges(&self) -> Vec<(StepName, StepName)> {
        self.graph
            .all_edges()
            .map(|(a, b, _)| (self.names[a].clone(), self.names[b].clone()))
            .collect()
    }

    fn intern(&mut self, name: &str) -> NodeId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        self.graph.add_node(id);
        id
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            node_count: self.names.len(),
            graph: self.graph.clone(),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        for name in self.names.drain(checkpoint.node_count..) {
            self.ids.remove(&name);
        }
        self.graph = checkpoint.graph;
    }

    fn in_degree(&self, id: NodeId) -> usize {
        self.graph.neighbors_directed(id, Incoming).count()
    }

    fn out_degree(&self, id: NodeId) -> usize {
        self.graph.neighbors_directed(id, Outgoing).count()
    }

    fn neighbours(&self, node: &str, direction: petgraph::Direction) -> BTreeSet<StepName> {
        match self.ids.get(node) {
            Some(id) => self
                .graph
                .neighbors_directed(*id, direction)
                .map(|n| self.names[n].clone())
                .collect(),
            None => BTreeSet::new(),
        }
    }

    /// Kahn's algorithm with the tie-break described on [`DagGraph`].
    ///
    /// Returns fewer nodes than the graph holds iff the graph has a cycle.
    fn topsort(&self) -> Vec<NodeId> {
        let mut in_degree: HashMap<NodeId, usize> = self
            .graph
            .nodes()
            .map(|id| (id, self.in_degree(id)))
            .collect();

        let mut roots: Vec<NodeId> = self
            .graph
            .nodes()
            .filter(|id| in_degree[id] == 0)
            .collect();
        // Stable: equal out-degrees keep insertion order.
        roots.sort_by_key(|id| Reverse(self.out_degree(*id)));

        let mut to_visit: VecDeque<NodeId> = roots.into();
        let mut visited = Vec::with_capacity(self.graph.node_count());

        while let Some(node) = to_visit.pop_front() {
            for next in self.graph.neighbors_directed(node, Outgoing) {
                if let Some(remaining) = in_degree.get_mut(&next) {
                    *remaining -= 1;
                    if *remaining == 0 {
                        to_visit.push_back(next);
                    }
                }
            }
            visited.push(node);
        }

        visited
    }
}

fn cycle_error(item: &str, dependents: &[&str]) -> PipelineError {
    PipelineError::DagCycle {
        item: item.to_string(),
        dependents: dependents.iter().map(|d| d.to_string()).collect(),
    }
}
