use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type NodeId = Uuid;
pub type RelationshipId = Uuid;

/// Opaque project identity. Namespaces every node and relationship the
/// pipeline emits; assigned by the caller, never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ProjectId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Package,
    File,
    Function,
    Method,
    Struct,
    Interface,
    Constant,
    Variable,
    Import,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeKind::Package => "Package",
            NodeKind::File => "File",
            NodeKind::Function => "Function",
            NodeKind::Method => "Method",
            NodeKind::Struct => "Struct",
            NodeKind::Interface => "Interface",
            NodeKind::Constant => "Constant",
            NodeKind::Variable => "Variable",
            NodeKind::Import => "Import",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Package" => Ok(NodeKind::Package),
            "File" => Ok(NodeKind::File),
            "Function" => Ok(NodeKind::Function),
            "Method" => Ok(NodeKind::Method),
            "Struct" => Ok(NodeKind::Struct),
            "Interface" => Ok(NodeKind::Interface),
            "Constant" => Ok(NodeKind::Constant),
            "Variable" => Ok(NodeKind::Variable),
            "Import" => Ok(NodeKind::Import),
            other => Err(format!("unknown node kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipKind {
    Contains,
    Defines,
    Calls,
    Implements,
    Embeds,
    Imports,
    BelongsTo,
    References,
    DependsOn,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationshipKind::Contains => "Contains",
            RelationshipKind::Defines => "Defines",
            RelationshipKind::Calls => "Calls",
            RelationshipKind::Implements => "Implements",
            RelationshipKind::Embeds => "Embeds",
            RelationshipKind::Imports => "Imports",
            RelationshipKind::BelongsTo => "BelongsTo",
            RelationshipKind::References => "References",
            RelationshipKind::DependsOn => "DependsOn",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for RelationshipKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Contains" => Ok(RelationshipKind::Contains),
            "Defines" => Ok(RelationshipKind::Defines),
            "Calls" => Ok(RelationshipKind::Calls),
            "Implements" => Ok(RelationshipKind::Implements),
            "Embeds" => Ok(RelationshipKind::Embeds),
            "Imports" => Ok(RelationshipKind::Imports),
            "BelongsTo" => Ok(RelationshipKind::BelongsTo),
            "References" => Ok(RelationshipKind::References),
            "DependsOn" => Ok(RelationshipKind::DependsOn),
            other => Err(format!("unknown relationship kind: {}", other)),
        }
    }
}

/// Underlying shape of a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Struct,
    Interface,
    Alias,
    Basic,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepNodeKind {
    File,
    Package,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepEdgeKind {
    Import,
}

/// Qualitative weight of a circular dependency. Shorter cycles couple fewer
/// packages more tightly and rank higher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    pub fn from_cycle_len(len: usize) -> Self {
        match len {
            0..=3 => Severity::High,
            4..=5 => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_round_trips_through_display() {
        for kind in [
            NodeKind::Package,
            NodeKind::File,
            NodeKind::Function,
            NodeKind::Method,
            NodeKind::Struct,
            NodeKind::Interface,
            NodeKind::Constant,
            NodeKind::Variable,
            NodeKind::Import,
        ] {
            assert_eq!(kind.to_string().parse::<NodeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn severity_tracks_cycle_length() {
        assert_eq!(Severity::from_cycle_len(2), Severity::High);
        assert_eq!(Severity::from_cycle_len(3), Severity::High);
        assert_eq!(Severity::from_cycle_len(4), Severity::Medium);
        assert_eq!(Severity::from_cycle_len(5), Severity::Medium);
        assert_eq!(Severity::from_cycle_len(6), Severity::Low);
    }
}
