//! Centrality and clustering algorithms.
//!
//! [`GraphAlgorithms`] is the seam between the engine and whatever computes
//! the numbers. [`StandardAlgorithms`] implements the usual definitions
//! directly over petgraph:
//!
//! - PageRank with uniform teleport and dangling redistribution; parallel
//!   edges add weight
//! - Normalized Brandes betweenness for directed graphs
//! - Closeness over incoming shortest paths with the Wasserman-Faust
//!   correction for unreachable nodes
//! - Local clustering coefficient on the undirected simple projection
//!
//! All scores are returned as a vector indexed by node index.

use petgraph::Direction::{Incoming, Outgoing};
use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;
use vaultgraph_core::EngineConfig;

use crate::graph::{GraphNode, KnowledgeGraph};

/// Numerical failures; callers absorb these into zero-valued metrics
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AlgorithmError {
    #[error("{algorithm} did not converge within {iterations} iterations")]
    NonConvergence {
        algorithm: &'static str,
        iterations: usize,
    },

    #[error("{algorithm} produced degenerate output: {reason}")]
    Degenerate {
        algorithm: &'static str,
        reason: String,
    },
}

pub type Scores = Vec<f64>;

/// Per-node metric computations
pub trait GraphAlgorithms: Send + Sync {
    fn pagerank(&self, graph: &KnowledgeGraph) -> Result<Scores, AlgorithmError>;
    fn betweenness(&self, graph: &KnowledgeGraph) -> Result<Scores, AlgorithmError>;
    fn closeness(&self, graph: &KnowledgeGraph) -> Result<Scores, AlgorithmError>;
    fn clustering(&self, graph: &KnowledgeGraph) -> Result<Scores, AlgorithmError>;
}

/// Default algorithm set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StandardAlgorithms {
    pub damping: f64,
    pub max_iterations: usize,
    pub tolerance: f64,
}

impl Default for StandardAlgorithms {
    fn default() -> Self {
        Self {
            damping: 0.85,
            max_iterations: 100,
            tolerance: 1e-6,
        }
    }
}

impl StandardAlgorithms {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            damping: config.pagerank_damping,
            max_iterations: config.pagerank_max_iterations,
            tolerance: config.pagerank_tolerance,
        }
    }
}

type Graph = DiGraph<GraphNode, String>;

/// Distinct neighbors per node, excluding the node itself
fn simple_neighbors(graph: &Graph, direction: petgraph::Direction) -> Vec<Vec<usize>> {
    graph
        .node_indices()
        .map(|idx| {
            let set: BTreeSet<usize> = graph
                .neighbors_directed(idx, direction)
                .map(|n| n.index())
                .filter(|&n| n != idx.index())
                .collect();
            set.into_iter().collect()
        })
        .collect()
}

fn check_finite(algorithm: &'static str, scores: Scores) -> Result<Scores, AlgorithmError> {
    if scores.iter().all(|s| s.is_finite()) {
        Ok(scores)
    } else {
        Err(AlgorithmError::Degenerate {
            algorithm,
            reason: "non-finite score".to_string(),
        })
    }
}

impl GraphAlgorithms for StandardAlgorithms {
    fn pagerank(&self, graph: &KnowledgeGraph) -> Result<Scores, AlgorithmError> {
        let g = graph.inner();
        let n = g.node_count();
        if n == 0 {
            return Ok(Vec::new());
        }
        if self.damping.is_nan() || self.damping <= 0.0 || self.damping >= 1.0 {
            return Err(AlgorithmError::Degenerate {
                algorithm: "pagerank",
                reason: format!("damping {} outside (0, 1)", self.damping),
            });
        }

        let alpha = self.damping;
        let uniform = 1.0 / n as f64;
        let out_weight: Vec<f64> = g
            .node_indices()
            .map(|idx| g.edges_directed(idx, Outgoing).count() as f64)
            .collect();
        let dangling: Vec<usize> = (0..n).filter(|&i| out_weight[i] == 0.0).collect();

        let mut x = vec![uniform; n];
        for _ in 0..self.max_iterations {
            let last = std::mem::replace(&mut x, vec![0.0; n]);
            let dangle_sum: f64 = alpha * dangling.iter().map(|&i| last[i]).sum::<f64>();

            for edge in g.edge_references() {
                let s = edge.source().index();
                x[edge.target().index()] += alpha * last[s] / out_weight[s];
            }
            for value in x.iter_mut() {
                *value += dangle_sum * uniform + (1.0 - alpha) * uniform;
            }

            let err: f64 = x.iter().zip(&last).map(|(a, b)| (a - b).abs()).sum();
            if err < n as f64 * self.tolerance {
                return check_finite("pagerank", x);
            }
        }

        Err(AlgorithmError::NonConvergence {
            algorithm: "pagerank",
            iterations: self.max_iterations,
        })
    }

    fn betweenness(&self, graph: &KnowledgeGraph) -> Result<Scores, AlgorithmError> {
        let g = graph.inner();
        let n = g.node_count();
        let successors = simple_neighbors(g, Outgoing);
        let mut centrality = vec![0.0; n];

        for s in 0..n {
            let mut stack = Vec::with_capacity(n);
            let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut sigma = vec![0.0f64; n];
            let mut dist: Vec<Option<usize>> = vec![None; n];
            sigma[s] = 1.0;
            dist[s] = Some(0);

            let mut queue = VecDeque::from([s]);
            while let Some(v) = queue.pop_front() {
                stack.push(v);
                let dv = dist[v].unwrap_or(0);
                for &w in &successors[v] {
                    if dist[w].is_none() {
                        dist[w] = Some(dv + 1);
                        queue.push_back(w);
                    }
                    if dist[w] == Some(dv + 1) {
                        sigma[w] += sigma[v];
                        preds[w].push(v);
                    }
                }
            }

            let mut delta = vec![0.0f64; n];
            while let Some(w) = stack.pop() {
                for &v in &preds[w] {
                    delta[v] += sigma[v] / sigma[w] * (1.0 + delta[w]);
                }
                if w != s {
                    centrality[w] += delta[w];
                }
            }
        }

        if n > 2 {
            let scale = 1.0 / ((n - 1) * (n - 2)) as f64;
            for value in centrality.iter_mut() {
                *value *= scale;
            }
        }

        check_finite("betweenness", centrality)
    }

    fn closeness(&self, graph: &KnowledgeGraph) -> Result<Scores, AlgorithmError> {
        let g = graph.inner();
        let n = g.node_count();
        let predecessors = simple_neighbors(g, Incoming);
        let mut closeness = vec![0.0; n];

        for (target, score) in closeness.iter_mut().enumerate() {
            // distances from every node that can reach `target`
            let mut dist: Vec<Option<usize>> = vec![None; n];
            dist[target] = Some(0);
            let mut queue = VecDeque::from([target]);
            let mut reached = 0usize;
            let mut total = 0usize;

            while let Some(v) = queue.pop_front() {
                let dv = dist[v].unwrap_or(0);
                reached += 1;
                total += dv;
                for &u in &predecessors[v] {
                    if dist[u].is_none() {
                        dist[u] = Some(dv + 1);
                        queue.push_back(u);
                    }
                }
            }

            if total > 0 && n > 1 {
                let others = (reached - 1) as f64;
                *score = (others / total as f64) * (others / (n - 1) as f64);
            }
        }

        check_finite("closeness", closeness)
    }

    fn clustering(&self, graph: &KnowledgeGraph) -> Result<Scores, AlgorithmError> {
        let g = graph.inner();
        let n = g.node_count();

        let adjacency: Vec<BTreeSet<usize>> = g
            .node_indices()
            .map(|idx| {
                g.neighbors_undirected(idx)
                    .map(|m| m.index())
                    .filter(|&m| m != idx.index())
                    .collect()
            })
            .collect();

        let scores = (0..n)
            .map(|v| {
                let neighbors: Vec<usize> = adjacency[v].iter().copied().collect();
                let degree = neighbors.len();
                if degree < 2 {
                    return 0.0;
                }
                let mut links = 0usize;
                for (i, &a) in neighbors.iter().enumerate() {
                    for &b in &neighbors[i + 1..] {
                        if adjacency[a].contains(&b) {
                            links += 1;
                        }
                    }
                }
                2.0 * links as f64 / (degree * (degree - 1)) as f64
            })
            .collect();

        check_finite("clustering", scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultgraph_core::NoteId;

    fn graph(n: usize, edges: &[(usize, usize)]) -> KnowledgeGraph {
        let mut g = KnowledgeGraph::new();
        for i in 0..n {
            g.add_node(GraphNode {
                id: NoteId::from(format!("n{}", i)),
                path: format!("n{}.md", i),
                title: format!("n{}", i),
            });
        }
        for (k, (s, t)) in edges.iter().enumerate() {
            g.add_edge(
                &NoteId::from(format!("n{}", s)),
                &NoteId::from(format!("n{}", t)),
                format!("e{}", k),
            );
        }
        g
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_pagerank_empty_and_cycle() {
        let algos = StandardAlgorithms::default();
        assert!(algos.pagerank(&KnowledgeGraph::new()).unwrap().is_empty());

        let cycle = graph(3, &[(0, 1), (1, 2), (2, 0)]);
        let scores = algos.pagerank(&cycle).unwrap();
        assert!(scores.iter().all(|&s| close(s, 1.0 / 3.0)));
    }

    #[test]
    fn test_pagerank_sums_to_one_with_dangling_nodes() {
        let algos = StandardAlgorithms::default();
        let g = graph(3, &[(0, 1)]);
        let scores = algos.pagerank(&g).unwrap();
        assert!(close(scores.iter().sum::<f64>(), 1.0));
        assert!(scores[1] > scores[0]);
        assert!(close(scores[0], scores[2]));
    }

    #[test]
    fn test_pagerank_non_convergence() {
        let algos = StandardAlgorithms {
            max_iterations: 1,
            tolerance: 1e-12,
            ..StandardAlgorithms::default()
        };
        let g = graph(3, &[(0, 1)]);
        assert!(matches!(
            algos.pagerank(&g),
            Err(AlgorithmError::NonConvergence { .. })
        ));
    }

    #[test]
    fn test_betweenness_path() {
        // 0 -> 1 -> 2: node 1 sits on the only 0..2 path
        let scores = StandardAlgorithms::default()
            .betweenness(&graph(3, &[(0, 1), (1, 2)]))
            .unwrap();
        assert!(close(scores[0], 0.0));
        assert!(close(scores[1], 0.5));
        assert!(close(scores[2], 0.0));
    }

    #[test]
    fn test_betweenness_ignores_parallel_edges() {
        let single = StandardAlgorithms::default()
            .betweenness(&graph(3, &[(0, 1), (1, 2)]))
            .unwrap();
        let doubled = StandardAlgorithms::default()
            .betweenness(&graph(3, &[(0, 1), (0, 1), (1, 2)]))
            .unwrap();
        assert_eq!(single, doubled);
    }

    #[test]
    fn test_closeness_uses_incoming_paths() {
        // 0 -> 1 -> 2
        let scores = StandardAlgorithms::default()
            .closeness(&graph(3, &[(0, 1), (1, 2)]))
            .unwrap();
        assert!(close(scores[0], 0.0));
        // node 1 reached from 0 at distance 1: (1/1) * (1/2)
        assert!(close(scores[1], 0.5));
        // node 2 reached from 1 (1) and 0 (2): (2/3) * (2/2)
        assert!(close(scores[2], 2.0 / 3.0));
    }

    #[test]
    fn test_clustering_triangle_and_star() {
        let algos = StandardAlgorithms::default();
        let triangle = algos.clustering(&graph(3, &[(0, 1), (1, 2), (2, 0)])).unwrap();
        assert!(triangle.iter().all(|&c| close(c, 1.0)));

        let star = algos
            .clustering(&graph(4, &[(0, 1), (0, 2), (0, 3), (0, 0)]))
            .unwrap();
        assert!(star.iter().all(|&c| close(c, 0.0)));
    }

    #[test]
    fn test_clustering_partial() {
        // 0 linked to 1, 2, 3; only 1-2 closes a triangle
        let scores = StandardAlgorithms::default()
            .clustering(&graph(4, &[(0, 1), (0, 2), (0, 3), (1, 2)]))
            .unwrap();
        assert!(close(scores[0], 1.0 / 3.0));
        assert!(close(scores[1], 1.0));
        assert!(close(scores[3], 0.0));
    }

    #[test]
    fn test_invalid_damping_is_degenerate() {
        let algos = StandardAlgorithms {
            damping: 1.5,
            ..StandardAlgorithms::default()
        };
        assert!(matches!(
            algos.pagerank(&graph(2, &[(0, 1)])),
            Err(AlgorithmError::Degenerate { .. })
        ));
    }
}
