use crate::{CallChain, DepEdgeKind, DepNodeKind, Implementation, ProjectId, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepNode {
    pub path: String,
    pub kind: DepNodeKind,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}

impl DepNode {
    pub fn package(path: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: DepNodeKind::Package,
            dependencies: Vec::new(),
            dependents: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepEdge {
    pub from: String,
    pub to: String,
    pub kind: DepEdgeKind,
}

/// Package-level dependency graph. Nodes are keyed by import path in a
/// sorted map so iteration order is reproducible. External dependency paths
/// may appear as edge targets without having a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub root: String,
    pub nodes: BTreeMap<String, DepNode>,
    pub edges: Vec<DepEdge>,
}

impl DependencyGraph {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircularDependency {
    /// Closed walk; the first element is the logical target of the closing
    /// edge from the last element.
    pub cycle: Vec<String>,
    pub severity: Severity,
    /// DFS path that led into the cycle, cycle included.
    pub impact: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectMetrics {
    pub total_files: usize,
    pub total_functions: usize,
    pub total_structs: usize,
    pub total_interfaces: usize,
    /// Approximated as the sum of per-file maximum function end lines; an
    /// acknowledged underestimate, sufficient for relative comparison.
    pub total_lines: u64,
    /// Function key → cyclomatic complexity.
    pub cyclomatic_complexity: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub project_id: ProjectId,
    pub timestamp_unix: i64,
    pub dependency_graph: DependencyGraph,
    pub interface_implementations: Vec<Implementation>,
    pub call_chains: Vec<CallChain>,
    pub circular_dependencies: Vec<CircularDependency>,
    pub metrics: Option<ProjectMetrics>,
}
