//! In-memory `GraphSink`. Backs the report surface and the test-suite;
//! production deployments substitute a property-graph database driver with
//! the same contract.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use srcgraph_core::{
    AnalysisResult, GraphNode, GraphRelationship, GraphSink, NodeId, ProjectId, Result,
    SrcGraphError,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Default, Clone)]
pub(crate) struct ProjectData {
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<GraphRelationship>,
}

#[derive(Debug)]
pub struct MemoryGraph {
    projects: DashMap<ProjectId, ProjectData>,
    batch_size: usize,
}

impl Default for MemoryGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
            batch_size: 1000,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn nodes(&self, project_id: &ProjectId) -> Vec<GraphNode> {
        self.projects
            .get(project_id)
            .map(|p| p.nodes.clone())
            .unwrap_or_default()
    }

    pub fn relationships(&self, project_id: &ProjectId) -> Vec<GraphRelationship> {
        self.projects
            .get(project_id)
            .map(|p| p.relationships.clone())
            .unwrap_or_default()
    }

    pub fn node(&self, project_id: &ProjectId, node_id: NodeId) -> Option<GraphNode> {
        self.projects
            .get(project_id)?
            .nodes
            .iter()
            .find(|n| n.id == node_id)
            .cloned()
    }
}

#[async_trait]
impl GraphSink for MemoryGraph {
    async fn initialize_project(&self, project_id: &ProjectId) -> Result<()> {
        // Idempotent: any prior graph under this project id is dropped.
        self.projects.insert(project_id.clone(), ProjectData::default());
        debug!(project = %project_id, "project initialized");
        Ok(())
    }

    async fn store_analysis(&self, project_id: &ProjectId, result: &AnalysisResult) -> Result<()> {
        let mut data = ProjectData::default();

        // Nodes land before relationships; both are tagged with the project.
        for batch in result.nodes.chunks(self.batch_size) {
            for node in batch {
                let mut node = node.clone();
                node.properties.insert(
                    "project_id".to_string(),
                    Value::String(project_id.to_string()),
                );
                data.nodes.push(node);
            }
        }
        for batch in result.relationships.chunks(self.batch_size) {
            for rel in batch {
                let mut rel = rel.clone();
                rel.properties.insert(
                    "project_id".to_string(),
                    Value::String(project_id.to_string()),
                );
                data.relationships.push(rel);
            }
        }

        info!(
            project = %project_id,
            nodes = data.nodes.len(),
            relationships = data.relationships.len(),
            "analysis stored"
        );
        self.projects.insert(project_id.clone(), data);
        Ok(())
    }

    /// Minimal generic query path. Supported queries: `count_nodes` and
    /// `count_relationships`, optionally filtered by a `kind` parameter.
    async fn execute_query(
        &self,
        query: &str,
        params: BTreeMap<String, Value>,
    ) -> Result<Vec<BTreeMap<String, Value>>> {
        let project_id = params
            .get("project_id")
            .and_then(Value::as_str)
            .map(ProjectId::from);
        let kind = params.get("kind").and_then(Value::as_str);

        let count = |projects: &DashMap<ProjectId, ProjectData>, relationships: bool| -> u64 {
            projects
                .iter()
                .filter(|entry| {
                    project_id
                        .as_ref()
                        .map_or(true, |wanted| entry.key() == wanted)
                })
                .map(|entry| {
                    if relationships {
                        entry
                            .value()
                            .relationships
                            .iter()
                            .filter(|r| kind.map_or(true, |k| r.kind.to_string() == k))
                            .count() as u64
                    } else {
                        entry
                            .value()
                            .nodes
                            .iter()
                            .filter(|n| kind.map_or(true, |k| n.kind.to_string() == k))
                            .count() as u64
                    }
                })
                .sum()
        };

        match query.trim() {
            "count_nodes" => {
                let mut row = BTreeMap::new();
                row.insert("count".to_string(), Value::from(count(&self.projects, false)));
                Ok(vec![row])
            }
            "count_relationships" => {
                let mut row = BTreeMap::new();
                row.insert("count".to_string(), Value::from(count(&self.projects, true)));
                Ok(vec![row])
            }
            other => Err(SrcGraphError::SinkFailed(format!(
                "unsupported query: {}",
                other
            ))),
        }
    }
}
