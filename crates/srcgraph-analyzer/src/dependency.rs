//! Package-level dependency graph. One node per parsed package; edges for
//! every deduplicated import, including externals that never get a node of
//! their own.

use srcgraph_core::{DepEdge, DepEdgeKind, DepNode, DependencyGraph, PackageInfo};
use tracing::debug;

pub fn build_dependency_graph(root: &str, packages: &[PackageInfo]) -> DependencyGraph {
    let mut graph = DependencyGraph::new(root);

    for pkg in packages {
        let mut dependencies: Vec<String> = Vec::new();
        for file in &pkg.files {
            for dep in &file.dependencies {
                if !dependencies.contains(dep) {
                    dependencies.push(dep.clone());
                }
            }
        }

        for dep in &dependencies {
            graph.edges.push(DepEdge {
                from: pkg.import_path.clone(),
                to: dep.clone(),
                kind: DepEdgeKind::Import,
            });
        }

        let mut node = DepNode::package(&pkg.import_path);
        node.dependencies = dependencies;
        graph.nodes.insert(pkg.import_path.clone(), node);
    }

    // Dependents only exist for targets that have a node; external paths
    // stay edge-only.
    let edges = graph.edges.clone();
    for edge in &edges {
        if let Some(target) = graph.nodes.get_mut(&edge.to) {
            if !target.dependents.contains(&edge.from) {
                target.dependents.push(edge.from.clone());
            }
        }
    }

    debug!(
        "dependency graph: {} nodes, {} edges",
        graph.nodes.len(),
        graph.edges.len()
    );
    graph
}
