//! Read-side report surface over a stored graph: whole-project dumps,
//! per-node relation views, layered dependency listings, call-graph slices,
//! and project statistics.

use crate::memory::MemoryGraph;
use serde::{Deserialize, Serialize};
use srcgraph_core::{
    GraphNode, GraphRelationship, NodeId, NodeKind, ProjectId, RelationshipKind,
};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

const TOP_N: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeWithRelations {
    pub node: GraphNode,
    pub incoming: Vec<GraphRelationship>,
    pub outgoing: Vec<GraphRelationship>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyLayer {
    pub package: String,
    pub direct_dependencies: Vec<String>,
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallGraphEntry {
    pub function: String,
    pub package: Option<String>,
    pub outgoing_calls: Vec<String>,
    pub incoming_callers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectStatistics {
    pub nodes_by_kind: BTreeMap<String, usize>,
    pub relationships_by_kind: BTreeMap<String, usize>,
    pub top_packages_by_files: Vec<(String, usize)>,
    pub top_functions_by_callers: Vec<(String, usize)>,
}

pub struct ReportService<'a> {
    graph: &'a MemoryGraph,
}

impl<'a> ReportService<'a> {
    pub fn new(graph: &'a MemoryGraph) -> Self {
        Self { graph }
    }

    /// Every node and relationship scoped to the project.
    pub fn project_graph(
        &self,
        project_id: &ProjectId,
    ) -> (Vec<GraphNode>, Vec<GraphRelationship>) {
        (
            self.graph.nodes(project_id),
            self.graph.relationships(project_id),
        )
    }

    pub fn node_with_relations(
        &self,
        project_id: &ProjectId,
        node_id: NodeId,
    ) -> Option<NodeWithRelations> {
        let node = self.graph.node(project_id, node_id)?;
        let relationships = self.graph.relationships(project_id);
        let (incoming, outgoing): (Vec<_>, Vec<_>) = relationships
            .into_iter()
            .filter(|r| r.from == node_id || r.to == node_id)
            .partition(|r| r.to == node_id);
        Some(NodeWithRelations {
            node,
            incoming,
            outgoing,
        })
    }

    /// Layered dependency view: breadth-first from the named package over
    /// `DependsOn`, each layer annotated with its depth.
    pub fn dependency_graph(
        &self,
        project_id: &ProjectId,
        package_name: &str,
    ) -> Vec<DependencyLayer> {
        let nodes = self.graph.nodes(project_id);
        let relationships = self.graph.relationships(project_id);

        let packages: HashMap<NodeId, &GraphNode> = nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Package)
            .map(|n| (n.id, n))
            .collect();
        let mut depends_on: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for rel in &relationships {
            if rel.kind == RelationshipKind::DependsOn {
                depends_on.entry(rel.from).or_default().push(rel.to);
            }
        }

        let Some(start) = packages
            .values()
            .find(|n| n.name == package_name || n.path.as_deref() == Some(package_name))
        else {
            return Vec::new();
        };

        let mut layers = Vec::new();
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
        seen.insert(start.id);
        queue.push_back((start.id, 0));

        while let Some((id, depth)) = queue.pop_front() {
            let Some(node) = packages.get(&id) else {
                continue;
            };
            let mut direct: Vec<String> = depends_on
                .get(&id)
                .into_iter()
                .flatten()
                .filter_map(|dep| packages.get(dep))
                .map(|dep| dep.path.clone().unwrap_or_else(|| dep.name.clone()))
                .collect();
            direct.sort();
            layers.push(DependencyLayer {
                package: node.path.clone().unwrap_or_else(|| node.name.clone()),
                direct_dependencies: direct,
                depth,
            });
            for dep in depends_on.get(&id).into_iter().flatten() {
                if seen.insert(*dep) {
                    queue.push_back((*dep, depth + 1));
                }
            }
        }
        layers
    }

    /// Call-graph slice around every function carrying the given name:
    /// reachable callees plus the direct callers of each visited node.
    pub fn call_graph(&self, project_id: &ProjectId, function_name: &str) -> Vec<CallGraphEntry> {
        let nodes = self.graph.nodes(project_id);
        let relationships = self.graph.relationships(project_id);

        let functions: HashMap<NodeId, &GraphNode> = nodes
            .iter()
            .filter(|n| matches!(n.kind, NodeKind::Function | NodeKind::Method))
            .map(|n| (n.id, n))
            .collect();
        let mut callees: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut callers: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for rel in &relationships {
            if rel.kind == RelationshipKind::Calls {
                callees.entry(rel.from).or_default().push(rel.to);
                callers.entry(rel.to).or_default().push(rel.from);
            }
        }

        let mut queue: VecDeque<NodeId> = functions
            .values()
            .filter(|n| n.name == function_name)
            .map(|n| n.id)
            .collect();
        let mut seen: HashSet<NodeId> = queue.iter().copied().collect();
        let mut entries = Vec::new();

        while let Some(id) = queue.pop_front() {
            let Some(node) = functions.get(&id) else {
                continue;
            };
            let name_of = |id: &NodeId| functions.get(id).map(|n| n.name.clone());
            entries.push(CallGraphEntry {
                function: node.name.clone(),
                package: node
                    .properties
                    .get("package")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                outgoing_calls: callees
                    .get(&id)
                    .into_iter()
                    .flatten()
                    .filter_map(name_of)
                    .collect(),
                incoming_callers: callers
                    .get(&id)
                    .into_iter()
                    .flatten()
                    .filter_map(name_of)
                    .collect(),
            });
            for callee in callees.get(&id).into_iter().flatten() {
                if seen.insert(*callee) {
                    queue.push_back(*callee);
                }
            }
        }
        entries
    }

    pub fn project_statistics(&self, project_id: &ProjectId) -> ProjectStatistics {
        let nodes = self.graph.nodes(project_id);
        let relationships = self.graph.relationships(project_id);

        let mut nodes_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for node in &nodes {
            *nodes_by_kind.entry(node.kind.to_string()).or_default() += 1;
        }
        let mut relationships_by_kind: BTreeMap<String, usize> = BTreeMap::new();
        for rel in &relationships {
            *relationships_by_kind
                .entry(rel.kind.to_string())
                .or_default() += 1;
        }

        // Contains fan-out gives files per package.
        let mut files_per_package: BTreeMap<String, usize> = BTreeMap::new();
        let by_id: HashMap<NodeId, &GraphNode> = nodes.iter().map(|n| (n.id, n)).collect();
        for rel in &relationships {
            if rel.kind != RelationshipKind::Contains {
                continue;
            }
            let Some(pkg) = by_id.get(&rel.from) else {
                continue;
            };
            if pkg.kind == NodeKind::Package {
                *files_per_package.entry(pkg.name.clone()).or_default() += 1;
            }
        }
        let mut callers_per_function: BTreeMap<String, usize> = BTreeMap::new();
        for rel in &relationships {
            if rel.kind != RelationshipKind::Calls {
                continue;
            }
            if let Some(callee) = by_id.get(&rel.to) {
                *callers_per_function.entry(callee.name.clone()).or_default() += 1;
            }
        }

        ProjectStatistics {
            nodes_by_kind,
            relationships_by_kind,
            top_packages_by_files: top_n(files_per_package),
            top_functions_by_callers: top_n(callers_per_function),
        }
    }
}

fn top_n(counts: BTreeMap<String, usize>) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(TOP_N);
    entries
}
