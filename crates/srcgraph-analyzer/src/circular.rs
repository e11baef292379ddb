//! Cycle detection over the dependency graph: depth-first search with
//! visited and on-stack marks plus an explicit path stack. Every back-edge
//! into the stack reports the cycle slice of the current path.

use srcgraph_core::{CircularDependency, DependencyGraph, Severity};
use std::collections::HashSet;
use tracing::debug;

pub fn detect_cycles(graph: &DependencyGraph) -> Vec<CircularDependency> {
    let mut detector = Detector {
        graph,
        visited: HashSet::new(),
        on_stack: HashSet::new(),
        path: Vec::new(),
        found: Vec::new(),
    };

    // Sorted node iteration keeps reported cycles reproducible.
    for path in graph.nodes.keys() {
        if !detector.visited.contains(path.as_str()) {
            detector.visit(path);
        }
    }

    if !detector.found.is_empty() {
        debug!("detected {} circular dependencies", detector.found.len());
    }
    detector.found
}

struct Detector<'a> {
    graph: &'a DependencyGraph,
    visited: HashSet<String>,
    on_stack: HashSet<String>,
    path: Vec<String>,
    found: Vec<CircularDependency>,
}

impl<'a> Detector<'a> {
    fn visit(&mut self, node: &str) {
        self.visited.insert(node.to_string());
        self.on_stack.insert(node.to_string());
        self.path.push(node.to_string());

        let dependencies = self
            .graph
            .nodes
            .get(node)
            .map(|n| n.dependencies.clone())
            .unwrap_or_default();
        for dep in dependencies {
            if !self.graph.contains(&dep) {
                continue;
            }
            if !self.visited.contains(&dep) {
                self.visit(&dep);
            } else if self.on_stack.contains(&dep) {
                self.report_cycle(&dep);
            }
        }

        self.path.pop();
        self.on_stack.remove(node);
    }

    fn report_cycle(&mut self, back_edge_target: &str) {
        let start = self
            .path
            .iter()
            .position(|p| p == back_edge_target)
            .unwrap_or(0);
        let cycle: Vec<String> = self.path[start..].to_vec();
        self.found.push(CircularDependency {
            severity: Severity::from_cycle_len(cycle.len()),
            impact: self.path.clone(),
            cycle,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srcgraph_core::{DepEdge, DepEdgeKind, DepNode};

    fn graph(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut graph = DependencyGraph::new("/p");
        for (from, to) in edges {
            graph
                .nodes
                .entry(from.to_string())
                .or_insert_with(|| DepNode::package(from));
            graph
                .nodes
                .entry(to.to_string())
                .or_insert_with(|| DepNode::package(to));
        }
        for (from, to) in edges {
            graph
                .nodes
                .get_mut(*from)
                .unwrap()
                .dependencies
                .push(to.to_string());
            graph
                .nodes
                .get_mut(*to)
                .unwrap()
                .dependents
                .push(from.to_string());
            graph.edges.push(DepEdge {
                from: from.to_string(),
                to: to.to_string(),
                kind: DepEdgeKind::Import,
            });
        }
        graph
    }

    #[test]
    fn three_package_cycle_is_high_severity() {
        let graph = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycles = detect_cycles(&graph);

        assert_eq!(cycles.len(), 1);
        let cycle = &cycles[0];
        assert_eq!(cycle.cycle.len(), 3);
        assert_eq!(cycle.severity, Severity::High);
        for pkg in ["a", "b", "c"] {
            assert!(cycle.cycle.contains(&pkg.to_string()));
        }
    }

    #[test]
    fn dag_reports_no_cycles() {
        let graph = graph(&[("a", "b"), ("a", "c"), ("b", "c")]);
        assert!(detect_cycles(&graph).is_empty());
    }

    #[test]
    fn two_package_cycle_has_minimum_length() {
        let graph = graph(&[("a", "b"), ("b", "a")]);
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle.len(), 2);
    }

    #[test]
    fn reported_cycles_are_closed_walks() {
        let graph = graph(&[("a", "b"), ("b", "c"), ("c", "a"), ("x", "a")]);
        let cycles = detect_cycles(&graph);
        for cycle in &cycles {
            assert!(cycle.cycle.len() >= 2);
            // Every consecutive pair is an edge, and the last element loops
            // back to the first.
            for pair in cycle.cycle.windows(2) {
                assert!(graph.nodes[&pair[0]].dependencies.contains(&pair[1]));
            }
            let last = cycle.cycle.last().unwrap();
            let first = &cycle.cycle[0];
            assert!(graph.nodes[last].dependencies.contains(first));
        }
    }

    #[test]
    fn longer_cycles_rank_lower() {
        let graph = graph(&[
            ("a", "b"),
            ("b", "c"),
            ("c", "d"),
            ("d", "e"),
            ("e", "f"),
            ("f", "a"),
        ]);
        let cycles = detect_cycles(&graph);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].severity, Severity::Low);
    }
}
