//! In-memory knowledge graph built on petgraph.
//!
//! One node per note, one directed edge per resolved reference. Parallel
//! edges and self-loops are kept, so degrees count link occurrences.

use petgraph::Direction::{Incoming, Outgoing};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use vaultgraph_core::{Note, NoteId};

/// Node payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NoteId,
    pub path: String,
    pub title: String,
}

impl From<&Note> for GraphNode {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.clone(),
            path: note.path.clone(),
            title: note.title.clone(),
        }
    }
}

/// Directed knowledge graph; edge weights are reference ids
#[derive(Debug, Clone, Default)]
pub struct KnowledgeGraph {
    graph: DiGraph<GraphNode, String>,
    index: HashMap<NoteId, NodeIndex>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node, returning the existing one for a known id
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Add an edge between two known notes; returns false if either is missing
    pub fn add_edge(&mut self, source: &NoteId, target: &NoteId, reference_id: String) -> bool {
        match (self.index.get(source), self.index.get(target)) {
            (Some(&s), Some(&t)) => {
                self.graph.add_edge(s, t, reference_id);
                true
            }
            _ => false,
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &NoteId) -> bool {
        self.index.contains_key(id)
    }

    /// Underlying petgraph graph
    pub fn inner(&self) -> &DiGraph<GraphNode, String> {
        &self.graph
    }

    /// Node payloads in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.graph.node_weights()
    }

    pub fn node(&self, id: &NoteId) -> Option<&GraphNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Edges as `(source, target)` note id pairs
    pub fn edges(&self) -> impl Iterator<Item = (&NoteId, &NoteId)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()].id, &self.graph[e.target()].id))
    }

    pub fn in_degree(&self, id: &NoteId) -> usize {
        self.degree(id, Incoming)
    }

    pub fn out_degree(&self, id: &NoteId) -> usize {
        self.degree(id, Outgoing)
    }

    fn degree(&self, id: &NoteId, direction: petgraph::Direction) -> usize {
        self.index
            .get(id)
            .map_or(0, |&idx| self.graph.edges_directed(idx, direction).count())
    }

    /// Whether a note has neither incoming nor outgoing edges
    pub fn is_isolated_node(&self, id: &NoteId) -> bool {
        self.contains(id) && self.in_degree(id) == 0 && self.out_degree(id) == 0
    }

    /// `E / (N * (N - 1))`, or 0 for graphs with fewer than two nodes
    pub fn density(&self) -> f64 {
        let n = self.graph.node_count();
        if n <= 1 {
            return 0.0;
        }
        self.graph.edge_count() as f64 / (n * (n - 1)) as f64
    }

    /// Connected components of the undirected projection
    pub fn components(&self) -> Vec<BTreeSet<NoteId>> {
        let mut sets = UnionFind::new(self.graph.node_count());
        for edge in self.graph.edge_references() {
            sets.union(edge.source().index(), edge.target().index());
        }

        let mut groups: HashMap<usize, BTreeSet<NoteId>> = HashMap::new();
        for idx in self.graph.node_indices() {
            groups
                .entry(sets.find(idx.index()))
                .or_default()
                .insert(self.graph[idx].id.clone());
        }

        let mut components: Vec<_> = groups.into_values().collect();
        components.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.first().cmp(&b.first())));
        components
    }

    /// Induced subgraph of every node within `radius` hops of `center`,
    /// following edges in both directions.
    ///
    /// Returns `None` when `center` is not in the graph. An isolated center
    /// yields a single-node graph.
    pub fn neighborhood(&self, center: &NoteId, radius: usize) -> Option<KnowledgeGraph> {
        let &start = self.index.get(center)?;

        let mut visited: HashSet<NodeIndex> = HashSet::from([start]);
        let mut queue = VecDeque::from([(start, 0usize)]);
        while let Some((idx, hops)) = queue.pop_front() {
            if hops == radius {
                continue;
            }
            let neighbors = self
                .graph
                .neighbors_directed(idx, Outgoing)
                .chain(self.graph.neighbors_directed(idx, Incoming));
            for next in neighbors {
                if visited.insert(next) {
                    queue.push_back((next, hops + 1));
                }
            }
        }

        Some(self.induced(&visited))
    }

    fn induced(&self, keep: &HashSet<NodeIndex>) -> KnowledgeGraph {
        let mut sub = KnowledgeGraph::new();
        for idx in self.graph.node_indices().filter(|idx| keep.contains(idx)) {
            sub.add_node(self.graph[idx].clone());
        }
        for edge in self.graph.edge_references() {
            if keep.contains(&edge.source()) && keep.contains(&edge.target()) {
                sub.add_edge(
                    &self.graph[edge.source()].id,
                    &self.graph[edge.target()].id,
                    edge.weight().clone(),
                );
            }
        }
        sub
    }
}
