//! Service Graph (C2) — an in-memory directed multigraph of services with
//! BFS shortest-path and DFS reachability queries.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// A directed client -> server edge with request/latency statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEdge {
    pub source: String,
    pub target: String,
    pub request_count: u64,
    pub failure_count: u64,
    pub request_rate: f64,
    pub failure_rate: f64,
    pub error_rate: f64,
    pub avg_latency_ms: f64,
    pub p99_latency_ms: f64,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

impl ServiceEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            request_count: 0,
            failure_count: 0,
            request_rate: 0.0,
            failure_rate: 0.0,
            error_rate: 0.0,
            avg_latency_ms: 0.0,
            p99_latency_ms: 0.0,
            attributes: HashMap::new(),
        }
    }

    /// Recompute `error_rate` from counts. `request_count == 0` clamps to
    /// zero rather than dividing by zero (spec.md §3 invariant).
    pub fn recompute_error_rate(&mut self) {
        self.error_rate = if self.request_count > 0 {
            self.failure_count as f64 / self.request_count as f64
        } else {
            0.0
        };
    }
}

#[derive(Debug, Default)]
struct GraphState {
    edges: BTreeMap<(String, String), ServiceEdge>,
    nodes: HashSet<String>,
    outgoing: HashMap<String, HashSet<String>>,
    incoming: HashMap<String, HashSet<String>>,
}

impl GraphState {
    fn rebuild_adjacency(&mut self) {
        self.outgoing.clear();
        self.incoming.clear();
        for (source, target) in self.edges.keys() {
            self.outgoing
                .entry(source.clone())
                .or_default()
                .insert(target.clone());
            self.incoming
                .entry(target.clone())
                .or_default()
                .insert(source.clone());
        }
    }
}

/// Owns all service nodes and edges. Readers (collector, chain builder)
/// and the single writer (graph builder refreshing edges) share one
/// reader-writer lock — simple and correct at the sizes this engine
/// operates over (spec.md §4.2/§9).
#[derive(Debug, Default)]
pub struct ServiceGraph {
    state: RwLock<GraphState>,
}

impl ServiceGraph {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(GraphState::default()),
        }
    }

    /// Insert a new edge or replace the existing one keyed by
    /// `(source, target)`. Adjacency indexes are rebuilt in full — the
    /// graph is small relative to analysis cost, so a full rebuild on
    /// every mutation keeps the logic trivially correct.
    pub fn add_edge(&self, edge: ServiceEdge) -> Result<(), GraphError> {
        let mut state = self.state.write().map_err(|_| GraphError::LockPoisoned)?;
        state.nodes.insert(edge.source.clone());
        state.nodes.insert(edge.target.clone());
        state
            .edges
            .insert((edge.source.clone(), edge.target.clone()), edge);
        state.rebuild_adjacency();
        Ok(())
    }

    pub fn get_edge(&self, source: &str, target: &str) -> Result<Option<ServiceEdge>, GraphError> {
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(state
            .edges
            .get(&(source.to_string(), target.to_string()))
            .cloned())
    }

    /// Sorted outgoing+incoming neighbor service names.
    pub fn neighbors(&self, service: &str) -> Result<Vec<String>, GraphError> {
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        let mut set = BTreeMap::new();
        if let Some(out) = state.outgoing.get(service) {
            for n in out {
                set.insert(n.clone(), ());
            }
        }
        if let Some(inc) = state.incoming.get(service) {
            for n in inc {
                set.insert(n.clone(), ());
            }
        }
        Ok(set.into_keys().collect())
    }

    /// Services `service` directly calls, sorted.
    pub fn downstream(&self, service: &str) -> Result<Vec<String>, GraphError> {
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        let mut v: Vec<String> = state
            .outgoing
            .get(service)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        v.sort();
        Ok(v)
    }

    /// Services that directly call `service`, sorted.
    pub fn upstream(&self, service: &str) -> Result<Vec<String>, GraphError> {
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        let mut v: Vec<String> = state
            .incoming
            .get(service)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default();
        v.sort();
        Ok(v)
    }

    /// True iff `candidate` can reach `target` by following edges
    /// forward, i.e. `candidate` is upstream of `target`. DFS with a
    /// visited set tolerates cycles. `IsUpstream(x, x) == false`
    /// (spec.md §8) since a node never calls itself along this graph.
    pub fn is_upstream(&self, candidate: &str, target: &str) -> Result<bool, GraphError> {
        if candidate == target {
            return Ok(false);
        }
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        let mut visited = HashSet::new();
        let mut stack = vec![candidate.to_string()];
        while let Some(node) = stack.pop() {
            if node == target {
                return Ok(true);
            }
            if !visited.insert(node.clone()) {
                continue;
            }
            if let Some(next) = state.outgoing.get(&node) {
                for n in next {
                    if !visited.contains(n) {
                        stack.push(n.clone());
                    }
                }
            }
        }
        Ok(false)
    }

    /// BFS shortest path from `source` to `target`, inclusive of both
    /// endpoints. `source == target` returns a one-element path.
    /// Returns `None` if no path exists.
    pub fn shortest_path(&self, source: &str, target: &str) -> Result<Option<Vec<String>>, GraphError> {
        if source == target {
            return Ok(Some(vec![source.to_string()]));
        }
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        if !state.nodes.contains(source) || !state.nodes.contains(target) {
            return Ok(None);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        let mut parent: HashMap<String, String> = HashMap::new();
        visited.insert(source.to_string());
        queue.push_back(source.to_string());

        while let Some(node) = queue.pop_front() {
            if node == target {
                let mut path = vec![target.to_string()];
                let mut cur = target.to_string();
                while let Some(p) = parent.get(&cur) {
                    path.push(p.clone());
                    cur = p.clone();
                }
                path.reverse();
                return Ok(Some(path));
            }
            let mut next_nodes: Vec<String> = state
                .outgoing
                .get(&node)
                .map(|s| s.iter().cloned().collect())
                .unwrap_or_default();
            next_nodes.sort();
            for next in next_nodes {
                if visited.insert(next.clone()) {
                    parent.insert(next.clone(), node.clone());
                    queue.push_back(next);
                }
            }
        }
        Ok(None)
    }

    /// All service names, sorted.
    pub fn all_nodes(&self) -> Result<Vec<String>, GraphError> {
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        let mut v: Vec<String> = state.nodes.iter().cloned().collect();
        v.sort();
        Ok(v)
    }

    /// All edges, sorted by (source, target).
    pub fn all_edges(&self) -> Result<Vec<ServiceEdge>, GraphError> {
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(state.edges.values().cloned().collect())
    }

    pub fn size(&self) -> Result<usize, GraphError> {
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(state.nodes.len())
    }

    pub fn edge_count(&self) -> Result<usize, GraphError> {
        let state = self.state.read().map_err(|_| GraphError::LockPoisoned)?;
        Ok(state.edges.len())
    }

    pub fn clear(&self) -> Result<(), GraphError> {
        let mut state = self.state.write().map_err(|_| GraphError::LockPoisoned)?;
        *state = GraphState::default();
        Ok(())
    }
}
