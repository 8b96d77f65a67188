//! Bounded cycle detection.
//!
//! Finds simple directed cycles of 3 to 5 accounts:
//! - Candidate starts: accounts that both send and receive
//! - Strongly connected component pre-filter (iterative Tarjan)
//! - Depth-bounded DFS per start, highest total degree first
//! - Rotation-insensitive deduplication
//! - Single wall-clock deadline and optional cycle cap

use crate::messages::{CycleOutput, DetectionInput};
use crate::types::{Cycle, CycleSearchResult, TruncationReason};
use async_trait::async_trait;
use forensicflow_core::config::CycleConfig;
use forensicflow_core::error::{FlowError, Result};
use forensicflow_core::traits::BatchKernel;
use forensicflow_core::{domain::Domain, kernel::KernelMetadata, traits::AnalysisKernel};
use forensicflow_graph::graph::TransactionGraph;
use forensicflow_graph::types::AccountIdx;
use hashbrown::HashSet;
use std::time::{Duration, Instant};
use tracing::debug;

/// Shortest reported cycle, in accounts.
pub const MIN_CYCLE_LEN: usize = 3;
/// Longest reported cycle, in accounts.
pub const MAX_CYCLE_LEN: usize = 5;

// ============================================================================
// Strongly Connected Components
// ============================================================================

const UNVISITED: usize = usize::MAX;

struct Frame {
    node: AccountIdx,
    successors: Vec<AccountIdx>,
    pos: usize,
}

/// Strongly connected components of the subgraph induced by `include`.
///
/// Iterative Tarjan; components are returned in completion order.
pub fn strongly_connected_components(
    graph: &TransactionGraph,
    include: &[bool],
) -> Vec<Vec<AccountIdx>> {
    let n = graph.num_accounts();
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<AccountIdx> = Vec::new();
    let mut next_index = 0usize;
    let mut components = Vec::new();

    let successors = |v: AccountIdx| -> Vec<AccountIdx> {
        graph
            .successors(v)
            .into_iter()
            .filter(|&w| include[w])
            .collect()
    };

    for root in 0..n {
        if !include[root] || index[root] != UNVISITED {
            continue;
        }

        index[root] = next_index;
        lowlink[root] = next_index;
        next_index += 1;
        stack.push(root);
        on_stack[root] = true;
        let mut call = vec![Frame {
            node: root,
            successors: successors(root),
            pos: 0,
        }];

        while let Some(frame) = call.last_mut() {
            let v = frame.node;
            if let Some(&w) = frame.successors.get(frame.pos) {
                frame.pos += 1;
                if index[w] == UNVISITED {
                    index[w] = next_index;
                    lowlink[w] = next_index;
                    next_index += 1;
                    stack.push(w);
                    on_stack[w] = true;
                    call.push(Frame {
                        node: w,
                        successors: successors(w),
                        pos: 0,
                    });
                } else if on_stack[w] {
                    lowlink[v] = lowlink[v].min(index[w]);
                }
                continue;
            }

            call.pop();
            if let Some(parent) = call.last() {
                lowlink[parent.node] = lowlink[parent.node].min(lowlink[v]);
            }

            if lowlink[v] == index[v] {
                let mut component = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }

    components
}

// ============================================================================
// Depth-bounded Search
// ============================================================================

struct CycleSearch<'a> {
    graph: &'a TransactionGraph,
    /// Successors restricted to the node's own component, first occurrence only.
    successors: &'a [Vec<AccountIdx>],
    max_cycles: Option<usize>,
    seen: HashSet<Vec<AccountIdx>>,
    cycles: Vec<Cycle>,
    on_path: Vec<bool>,
    path: Vec<AccountIdx>,
}

impl CycleSearch<'_> {
    fn limit_reached(&self) -> bool {
        self.max_cycles.is_some_and(|max| self.cycles.len() >= max)
    }

    fn canonical_key(&self) -> Vec<AccountIdx> {
        let pivot = (0..self.path.len())
            .min_by(|&a, &b| {
                self.graph
                    .account_id(self.path[a])
                    .cmp(self.graph.account_id(self.path[b]))
            })
            .unwrap_or(0);
        let mut key = Vec::with_capacity(self.path.len());
        key.extend_from_slice(&self.path[pivot..]);
        key.extend_from_slice(&self.path[..pivot]);
        key
    }

    fn record(&mut self) {
        let key = self.canonical_key();
        if self.seen.insert(key) {
            self.cycles.push(Cycle {
                members: self
                    .path
                    .iter()
                    .map(|&idx| self.graph.account_id(idx).to_string())
                    .collect(),
            });
        }
    }

    /// Walk from `current`; returns true once the cycle cap is hit.
    fn walk(&mut self, current: AccountIdx, start: AccountIdx) -> bool {
        self.path.push(current);
        self.on_path[current] = true;

        let successors = self.successors;
        let mut stop = false;
        for &next in &successors[current] {
            if next == start {
                if (MIN_CYCLE_LEN..=MAX_CYCLE_LEN).contains(&self.path.len()) {
                    self.record();
                    if self.limit_reached() {
                        stop = true;
                        break;
                    }
                }
            } else if !self.on_path[next]
                && self.path.len() < MAX_CYCLE_LEN
                && self.walk(next, start)
            {
                stop = true;
                break;
            }
        }

        self.path.pop();
        self.on_path[current] = false;
        stop
    }
}

// ============================================================================
// Cycle Detector Kernel
// ============================================================================

/// Cycle detection kernel.
///
/// Reports every distinct directed cycle of 3 to 5 accounts reachable before
/// the deadline. Each cycle is reported once regardless of rotation.
#[derive(Debug, Clone)]
pub struct CycleDetector {
    metadata: KernelMetadata,
    config: CycleConfig,
}

impl Default for CycleDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl CycleDetector {
    /// Create a new cycle detector with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CycleConfig::default())
    }

    /// Create a cycle detector with the given configuration.
    #[must_use]
    pub fn with_config(config: CycleConfig) -> Self {
        Self {
            metadata: KernelMetadata::batch("detect/cycles", Domain::PatternDetection)
                .with_description("Directed cycles of length 3-5 with SCC pruning")
                .with_throughput(10_000)
                .with_latency_us(5_000.0),
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &CycleConfig {
        &self.config
    }

    /// Search the graph for cycles.
    pub fn compute(graph: &TransactionGraph, config: &CycleConfig) -> CycleSearchResult {
        let started = Instant::now();
        let n = graph.num_accounts();

        let eligible: Vec<bool> = (0..n)
            .map(|idx| graph.stats(idx).is_bidirectional())
            .collect();

        // Component id per node; only nodes that can lie on a cycle of 3+.
        let mut component: Vec<Option<usize>> = vec![None; n];
        if config.scc_prefilter {
            let sccs = strongly_connected_components(graph, &eligible);
            for (id, members) in sccs
                .iter()
                .filter(|c| c.len() >= MIN_CYCLE_LEN)
                .enumerate()
            {
                for &member in members {
                    component[member] = Some(id);
                }
            }
        } else {
            for (idx, slot) in component.iter_mut().enumerate() {
                if eligible[idx] {
                    *slot = Some(0);
                }
            }
        }

        let successors: Vec<Vec<AccountIdx>> = (0..n)
            .map(|v| match component[v] {
                Some(c) => graph
                    .successors(v)
                    .into_iter()
                    .filter(|&w| component[w] == Some(c))
                    .collect(),
                None => Vec::new(),
            })
            .collect();

        let mut starts: Vec<AccountIdx> = (0..n).filter(|&v| component[v].is_some()).collect();
        starts.sort_by(|&a, &b| {
            graph
                .stats(b)
                .total_degree()
                .cmp(&graph.stats(a).total_degree())
        });

        let mut search = CycleSearch {
            graph,
            successors: &successors,
            max_cycles: config.max_cycles,
            seen: HashSet::new(),
            cycles: Vec::new(),
            on_path: vec![false; n],
            path: Vec::with_capacity(MAX_CYCLE_LEN),
        };

        let timeout = config.timeout();
        let mut truncated = None;
        let mut starts_searched = 0;
        for &start in &starts {
            if search.limit_reached() {
                truncated = Some(TruncationReason::CycleLimit);
                break;
            }
            if started.elapsed() >= timeout {
                truncated = Some(TruncationReason::Timeout);
                break;
            }
            starts_searched += 1;
            if search.walk(start, start) {
                truncated = Some(TruncationReason::CycleLimit);
                break;
            }
        }

        debug!(
            candidates = starts.len(),
            starts_searched,
            cycles = search.cycles.len(),
            truncated = ?truncated,
            "cycle search finished"
        );

        CycleSearchResult {
            cycles: search.cycles,
            truncated,
            candidates: starts.len(),
            starts_searched,
        }
    }

    /// Search with an explicit deadline budget, overriding the configured one.
    pub fn compute_with_timeout(
        graph: &TransactionGraph,
        config: &CycleConfig,
        timeout: Duration,
    ) -> CycleSearchResult {
        let config = CycleConfig {
            timeout_ms: timeout.as_millis() as u64,
            ..config.clone()
        };
        Self::compute(graph, &config)
    }
}

impl AnalysisKernel for CycleDetector {
    fn metadata(&self) -> &KernelMetadata {
        &self.metadata
    }

    fn validate(&self) -> Result<()> {
        if self.config.max_cycles == Some(0) {
            return Err(FlowError::config("cycles.max_cycles must be positive"));
        }
        Ok(())
    }
}

#[async_trait]
impl BatchKernel<DetectionInput, CycleOutput> for CycleDetector {
    async fn execute(&self, input: DetectionInput) -> Result<CycleOutput> {
        self.validate()?;
        let start = Instant::now();
        let result = Self::compute(&input.graph, &self.config);
        Ok(CycleOutput {
            result,
            compute_time_us: start.elapsed().as_micros() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forensicflow_graph::builder::GraphBuilder;
    use forensicflow_graph::types::Transaction;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn graph(edges: &[(&str, &str)]) -> TransactionGraph {
        let txs: Vec<Transaction> = edges
            .iter()
            .enumerate()
            .map(|(i, (s, r))| Transaction::at_epoch(format!("T{i}"), *s, *r, 100.0, i as i64 * 60))
            .collect();
        GraphBuilder::compute(&txs)
    }

    fn members(result: &CycleSearchResult) -> Vec<Vec<&str>> {
        result
            .cycles
            .iter()
            .map(|c| c.members.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn test_cycle_detector_metadata() {
        let kernel = CycleDetector::new();
        assert_eq!(kernel.metadata().id, "detect/cycles");
        assert_eq!(kernel.metadata().domain, Domain::PatternDetection);
    }

    #[test]
    fn test_triangle() {
        let g = graph(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let result = CycleDetector::compute(&g, &CycleConfig::default());
        assert_eq!(members(&result), vec![vec!["A", "B", "C"]]);
        assert_eq!(result.truncated, None);
        assert_eq!(result.candidates, 3);
    }

    #[test]
    fn test_two_cycle_ignored() {
        let g = graph(&[("A", "B"), ("B", "A")]);
        let result = CycleDetector::compute(&g, &CycleConfig::default());
        assert!(result.cycles.is_empty());
        assert_eq!(result.candidates, 0);
    }

    #[test]
    fn test_six_cycle_ignored() {
        let g = graph(&[
            ("A", "B"),
            ("B", "C"),
            ("C", "D"),
            ("D", "E"),
            ("E", "F"),
            ("F", "A"),
        ]);
        let result = CycleDetector::compute(&g, &CycleConfig::default());
        assert!(result.cycles.is_empty());
    }

    #[test]
    fn test_five_cycle_found() {
        let g = graph(&[("A", "B"), ("B", "C"), ("C", "D"), ("D", "E"), ("E", "A")]);
        let result = CycleDetector::compute(&g, &CycleConfig::default());
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.cycles[0].len(), 5);
    }

    #[test]
    fn test_duplicate_edges_single_cycle() {
        let g = graph(&[
            ("A", "B"),
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("C", "A"),
        ]);
        let result = CycleDetector::compute(&g, &CycleConfig::default());
        assert_eq!(result.cycles.len(), 1);
    }

    #[test]
    fn test_start_order_by_degree() {
        // X carries the most transfers, so the walk starts there.
        let g = graph(&[
            ("A", "B"),
            ("B", "X"),
            ("X", "A"),
            ("X", "Q"),
            ("Q", "X"),
        ]);
        let result = CycleDetector::compute(&g, &CycleConfig::default());
        assert_eq!(members(&result), vec![vec!["X", "A", "B"]]);
    }

    #[test]
    fn test_overlapping_cycles() {
        let g = graph(&[
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("C", "D"),
            ("D", "A"),
        ]);
        let result = CycleDetector::compute(&g, &CycleConfig::default());
        assert_eq!(result.cycles.len(), 2);
        let lens: Vec<usize> = result.cycles.iter().map(Cycle::len).collect();
        assert!(lens.contains(&3));
        assert!(lens.contains(&4));
    }

    #[test]
    fn test_cycle_limit() {
        let g = graph(&[
            ("A", "B"),
            ("B", "C"),
            ("C", "A"),
            ("D", "E"),
            ("E", "F"),
            ("F", "D"),
        ]);
        let config = CycleConfig {
            max_cycles: Some(1),
            ..Default::default()
        };
        let result = CycleDetector::compute(&g, &config);
        assert_eq!(result.cycles.len(), 1);
        assert_eq!(result.truncated, Some(TruncationReason::CycleLimit));
    }

    #[test]
    fn test_zero_timeout_truncates() {
        let g = graph(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let result =
            CycleDetector::compute_with_timeout(&g, &CycleConfig::default(), Duration::ZERO);
        assert!(result.cycles.is_empty());
        assert_eq!(result.truncated, Some(TruncationReason::Timeout));
        assert_eq!(result.starts_searched, 0);
    }

    #[test]
    fn test_scc_components() {
        let g = graph(&[("A", "B"), ("B", "C"), ("C", "A"), ("C", "D"), ("D", "E")]);
        let include = vec![true; g.num_accounts()];
        let sccs = strongly_connected_components(&g, &include);
        let mut sizes: Vec<usize> = sccs.iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 1, 3]);
    }

    #[test]
    fn test_prefilter_matches_unfiltered() {
        let mut rng = StdRng::seed_from_u64(7);
        let ids: Vec<String> = (0..25).map(|i| format!("ACC_{i:03}")).collect();
        let edges: Vec<(String, String)> = (0..90)
            .map(|_| {
                let s = rng.gen_range(0..ids.len());
                let mut r = rng.gen_range(0..ids.len());
                if r == s {
                    r = (r + 1) % ids.len();
                }
                (ids[s].clone(), ids[r].clone())
            })
            .collect();
        let refs: Vec<(&str, &str)> = edges.iter().map(|(s, r)| (s.as_str(), r.as_str())).collect();
        let g = graph(&refs);

        let unbounded = CycleConfig {
            timeout_ms: 60_000,
            max_cycles: None,
            scc_prefilter: true,
        };
        let with_scc = CycleDetector::compute(&g, &unbounded);
        let without_scc = CycleDetector::compute(
            &g,
            &CycleConfig {
                scc_prefilter: false,
                ..unbounded.clone()
            },
        );

        let canon = |r: &CycleSearchResult| {
            let mut keys: Vec<Vec<String>> = r
                .cycles
                .iter()
                .map(|c| c.canonical().into_iter().map(str::to_string).collect())
                .collect();
            keys.sort();
            keys
        };
        assert_eq!(canon(&with_scc), canon(&without_scc));

        // Every reported cycle is genuine, simple, 3-5 long and unique up to rotation.
        let mut keys = hashbrown::HashSet::new();
        for cycle in &with_scc.cycles {
            assert!((MIN_CYCLE_LEN..=MAX_CYCLE_LEN).contains(&cycle.len()));
            let distinct: hashbrown::HashSet<&String> = cycle.members.iter().collect();
            assert_eq!(distinct.len(), cycle.len());
            for i in 0..cycle.len() {
                let from = g.index_of(&cycle.members[i]).unwrap();
                let to = g.index_of(&cycle.members[(i + 1) % cycle.len()]).unwrap();
                assert!(g.successors(from).contains(&to));
            }
            assert!(keys.insert(cycle.canonical().join("->")));
        }
    }

    #[tokio::test]
    async fn test_cycle_detector_execute() {
        let kernel = CycleDetector::new();
        let g = graph(&[("A", "B"), ("B", "C"), ("C", "A")]);
        let out = kernel.execute(DetectionInput::from(g)).await.unwrap();
        assert_eq!(out.result.cycles.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let kernel = CycleDetector::with_config(CycleConfig {
            max_cycles: Some(0),
            ..Default::default()
        });
        let g = graph(&[("A", "B")]);
        assert!(kernel.execute(DetectionInput::from(g)).await.is_err());
    }
}
