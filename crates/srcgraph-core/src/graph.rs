use crate::{NodeId, NodeKind, ProjectId, RelationshipId, RelationshipKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub name: String,
    pub path: Option<String>,
    pub properties: BTreeMap<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl GraphNode {
    pub fn new<T: Into<String>>(kind: NodeKind, name: T) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            name: name.into(),
            path: None,
            properties: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_path<T: Into<String>>(mut self, path: T) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_property<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphRelationship {
    pub id: RelationshipId,
    pub kind: RelationshipKind,
    pub from: NodeId,
    pub to: NodeId,
    pub properties: BTreeMap<String, Value>,
}

impl GraphRelationship {
    pub fn new(kind: RelationshipKind, from: NodeId, to: NodeId) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            from,
            to,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property<T: Into<Value>>(mut self, key: &str, value: T) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub files: usize,
    pub packages: usize,
    pub functions: usize,
    pub structs: usize,
}

/// Final projection of one pipeline run, ready for a `GraphSink`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub project_id: ProjectId,
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<GraphRelationship>,
    pub totals: Totals,
    pub analyzed_at: DateTime<Utc>,
    pub duration: Duration,
}
