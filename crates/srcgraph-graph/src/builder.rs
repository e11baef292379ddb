//! Projects a parse result and analysis report into graph nodes and
//! relationships. Cross-linking goes through key→id indices built during
//! emission; nothing in the hot path scans.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use srcgraph_core::{
    AnalysisReport, AnalysisResult, BuilderConfig, FunctionInfo, GraphNode, GraphRelationship,
    NodeId, NodeKind, PackageInfo, ParseResult, ProjectId, RelationshipKind, Result, SrcGraphError,
    Totals, TypeInfo, TypeKind, ValueInfo,
};
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct GraphBuilder {
    config: BuilderConfig,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            config: BuilderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn build(
        &self,
        project_id: &ProjectId,
        parse: &ParseResult,
        report: &AnalysisReport,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResult> {
        let start = Instant::now();

        // Flattened interface method sets, serialized onto interface nodes.
        let mut interface_methods: FxHashMap<String, serde_json::Value> = FxHashMap::default();
        for iface in &parse.interfaces {
            if let Ok(methods) = serde_json::to_value(&iface.methods) {
                interface_methods.insert(iface.key(), methods);
            }
        }

        let mut emitter = Emitter::new(&self.config, interface_methods);

        let mut packages: Vec<&PackageInfo> = parse.packages.iter().collect();
        packages.sort_by(|a, b| a.import_path.cmp(&b.import_path));

        for pkg in &packages {
            emitter.emit_package(pkg);
        }

        let total_files: usize = packages.iter().map(|p| p.files.len()).sum();
        let chunk_size = self.config.chunk_size.max(1);
        let chunked = total_files > 2 * chunk_size;
        let mut files_done = 0usize;

        for pkg in &packages {
            if cancel.is_cancelled() {
                return Err(SrcGraphError::Cancelled);
            }
            let mut files: Vec<_> = pkg.files.iter().collect();
            files.sort_by(|a, b| a.path.cmp(&b.path));
            let by_file = group_declarations(pkg);

            for file in files {
                emitter.emit_file(pkg, file, by_file.get(&file.path));
                files_done += 1;
                if chunked && files_done % chunk_size == 0 {
                    // Give the runtime a chance to reclaim between chunks.
                    tokio::task::yield_now().await;
                }
            }
        }

        for pkg in &packages {
            emitter.link_methods_to_types(pkg);
        }
        emitter.emit_implementations(report);
        emitter.emit_call_chains(report);
        emitter.emit_dependencies(report);

        if emitter.skipped > 0 {
            warn!(
                "skipped {} relationships with unresolved endpoints",
                emitter.skipped
            );
        }

        let totals = Totals {
            files: total_files,
            packages: packages.len(),
            functions: packages.iter().map(|p| p.functions.len()).sum(),
            structs: packages
                .iter()
                .flat_map(|p| p.types.iter())
                .filter(|t| t.kind == TypeKind::Struct)
                .count(),
        };

        let result = AnalysisResult {
            project_id: project_id.clone(),
            nodes: emitter.nodes,
            relationships: emitter.relationships,
            totals,
            analyzed_at: chrono::Utc::now(),
            duration: start.elapsed(),
        };
        verify_consistency(&result)?;

        info!(
            nodes = result.nodes.len(),
            relationships = result.relationships.len(),
            "graph build complete in {:?}",
            result.duration
        );
        Ok(result)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Endpoint ids must all resolve inside the emitted node set; anything else
/// is an internal inconsistency.
fn verify_consistency(result: &AnalysisResult) -> Result<()> {
    let mut ids: FxHashSet<NodeId> = FxHashSet::default();
    for node in &result.nodes {
        if !ids.insert(node.id) {
            return Err(SrcGraphError::BuildFailed(format!(
                "duplicate node id {}",
                node.id
            )));
        }
    }
    for rel in &result.relationships {
        if !ids.contains(&rel.from) || !ids.contains(&rel.to) {
            return Err(SrcGraphError::BuildFailed(format!(
                "relationship {} has an unresolved endpoint",
                rel.id
            )));
        }
    }
    Ok(())
}

enum FileDecl<'a> {
    Func(&'a FunctionInfo),
    Type(&'a TypeInfo),
    Const(&'a ValueInfo),
    Var(&'a ValueInfo),
}

impl<'a> FileDecl<'a> {
    fn line(&self) -> u32 {
        match self {
            FileDecl::Func(f) => f.line_start,
            FileDecl::Type(t) => t.line_start,
            FileDecl::Const(v) | FileDecl::Var(v) => v.line,
        }
    }
}

/// Declarations grouped per file and restored to source order by line.
fn group_declarations(pkg: &PackageInfo) -> FxHashMap<PathBuf, Vec<FileDecl<'_>>> {
    let mut by_file: FxHashMap<PathBuf, Vec<FileDecl<'_>>> = FxHashMap::default();
    for func in &pkg.functions {
        by_file
            .entry(func.file.clone())
            .or_default()
            .push(FileDecl::Func(func));
    }
    for ty in &pkg.types {
        by_file
            .entry(ty.file.clone())
            .or_default()
            .push(FileDecl::Type(ty));
    }
    for value in &pkg.constants {
        by_file
            .entry(value.file.clone())
            .or_default()
            .push(FileDecl::Const(value));
    }
    for value in &pkg.variables {
        by_file
            .entry(value.file.clone())
            .or_default()
            .push(FileDecl::Var(value));
    }
    for decls in by_file.values_mut() {
        decls.sort_by_key(|d| d.line());
    }
    by_file
}

struct Emitter<'c> {
    config: &'c BuilderConfig,
    interface_methods: FxHashMap<String, serde_json::Value>,
    nodes: Vec<GraphNode>,
    relationships: Vec<GraphRelationship>,
    package_ids: FxHashMap<String, NodeId>,
    file_ids: FxHashMap<PathBuf, NodeId>,
    type_ids: FxHashMap<String, NodeId>,
    function_ids: FxHashMap<String, NodeId>,
    skipped: u64,
}

impl<'c> Emitter<'c> {
    fn new(config: &'c BuilderConfig, interface_methods: FxHashMap<String, serde_json::Value>) -> Self {
        Self {
            config,
            interface_methods,
            nodes: Vec::new(),
            relationships: Vec::new(),
            package_ids: FxHashMap::default(),
            file_ids: FxHashMap::default(),
            type_ids: FxHashMap::default(),
            function_ids: FxHashMap::default(),
            skipped: 0,
        }
    }

    fn emit_package(&mut self, pkg: &PackageInfo) {
        let node = GraphNode::new(NodeKind::Package, pkg.short_name.clone())
            .with_path(pkg.import_path.clone());
        self.package_ids.insert(pkg.import_path.clone(), node.id);
        self.nodes.push(node);
    }

    fn emit_file(
        &mut self,
        pkg: &PackageInfo,
        file: &srcgraph_core::FileInfo,
        decls: Option<&Vec<FileDecl<'_>>>,
    ) {
        // With file nodes disabled, definitions hang off the package node.
        let parent_id = if self.config.create_file_nodes {
            let name = file
                .path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| file.path.display().to_string());
            let node = GraphNode::new(NodeKind::File, name)
                .with_path(file.path.display().to_string())
                .with_property("package", pkg.short_name.clone());
            let file_id = node.id;
            self.file_ids.insert(file.path.clone(), file_id);
            self.nodes.push(node);

            if let Some(&pkg_id) = self.package_ids.get(&pkg.import_path) {
                self.relationships.push(GraphRelationship::new(
                    RelationshipKind::Contains,
                    pkg_id,
                    file_id,
                ));
            }

            for import in &file.imports {
                let mut node = GraphNode::new(NodeKind::Import, import.package_name.clone())
                    .with_path(import.path.clone())
                    .with_property(
                        "name_source",
                        match import.name_source {
                            srcgraph_core::ImportNameSource::Resolved => "resolved",
                            srcgraph_core::ImportNameSource::Heuristic => "heuristic",
                        },
                    );
                if let Some(alias) = &import.alias {
                    node = node.with_property("alias", alias.clone());
                }
                let import_id = node.id;
                self.nodes.push(node);
                self.relationships.push(GraphRelationship::new(
                    RelationshipKind::Imports,
                    file_id,
                    import_id,
                ));
            }
            file_id
        } else {
            match self.package_ids.get(&pkg.import_path) {
                Some(&id) => id,
                None => return,
            }
        };

        let Some(decls) = decls else {
            return;
        };
        for decl in decls {
            let node_id = match decl {
                FileDecl::Func(func) => self.emit_function(func),
                FileDecl::Type(ty) => self.emit_type(ty),
                FileDecl::Const(value) => self.emit_value(value, NodeKind::Constant),
                FileDecl::Var(value) => self.emit_value(value, NodeKind::Variable),
            };
            self.relationships.push(GraphRelationship::new(
                RelationshipKind::Defines,
                parent_id,
                node_id,
            ));
        }
    }

    fn emit_function(&mut self, func: &FunctionInfo) -> NodeId {
        let kind = if func.is_method() {
            NodeKind::Method
        } else {
            NodeKind::Function
        };
        let mut node = GraphNode::new(kind, func.name.clone())
            .with_path(func.file.display().to_string())
            .with_property("package", func.package_path.clone())
            .with_property("signature", func.signature_text.clone())
            .with_property("exported", func.is_exported);
        if let Some(receiver) = &func.receiver {
            node = node
                .with_property("receiver", receiver.text.clone())
                .with_property("receiver_type", receiver.base_name.clone());
        }
        if let Some(complexity) = func.complexity {
            node = node.with_property("complexity", complexity);
        }
        if self.config.include_line_numbers {
            node = node
                .with_property("line_start", func.line_start)
                .with_property("line_end", func.line_end);
        }
        self.function_ids.insert(func.key(), node.id);
        let id = node.id;
        self.nodes.push(node);
        id
    }

    fn emit_type(&mut self, ty: &TypeInfo) -> NodeId {
        let kind = match ty.kind {
            TypeKind::Interface => NodeKind::Interface,
            _ => NodeKind::Struct,
        };
        let mut node = GraphNode::new(kind, ty.name.clone())
            .with_path(ty.file.display().to_string())
            .with_property("package", ty.package_path.clone())
            .with_property("underlying", ty.underlying.clone())
            .with_property("exported", ty.is_exported);
        if !ty.fields.is_empty() {
            if let Ok(fields) = serde_json::to_value(&ty.fields) {
                node = node.with_property("fields", fields);
            }
        }
        if ty.kind == TypeKind::Interface {
            if let Some(methods) = self.interface_methods.get(&ty.key()) {
                node = node.with_property("methods", methods.clone());
            }
        } else if !ty.methods.is_empty() {
            if let Ok(methods) = serde_json::to_value(&ty.methods) {
                node = node.with_property("methods", methods);
            }
        }
        if !ty.embeds.is_empty() {
            if let Ok(embeds) = serde_json::to_value(&ty.embeds) {
                node = node.with_property("embeds", embeds);
            }
        }
        if self.config.include_line_numbers {
            node = node
                .with_property("line_start", ty.line_start)
                .with_property("line_end", ty.line_end);
        }
        self.type_ids.insert(ty.key(), node.id);
        let id = node.id;
        self.nodes.push(node);
        id
    }

    fn emit_value(&mut self, value: &ValueInfo, kind: NodeKind) -> NodeId {
        let mut node = GraphNode::new(kind, value.name.clone())
            .with_path(value.file.display().to_string())
            .with_property("package", value.package_path.clone())
            .with_property("exported", value.is_exported);
        if let Some(type_text) = &value.type_text {
            node = node.with_property("type", type_text.clone());
        }
        if let Some(value_text) = &value.value_text {
            node = node.with_property("value", value_text.clone());
        }
        if let Some(checker_value) = &value.checker_value {
            node = node.with_property("static_value", checker_value.clone());
        }
        if self.config.include_line_numbers {
            node = node.with_property("line", value.line);
        }
        let id = node.id;
        self.nodes.push(node);
        id
    }

    /// Rule 7: `BelongsTo` from each method to the struct named by its
    /// receiver base name within the same package.
    fn link_methods_to_types(&mut self, pkg: &PackageInfo) {
        for func in &pkg.functions {
            let Some(receiver) = &func.receiver else {
                continue;
            };
            let type_key = receiver
                .type_key
                .clone()
                .unwrap_or_else(|| format!("{}.{}", pkg.import_path, receiver.base_name));
            let method_id = self.function_ids.get(&func.key()).copied();
            let type_id = self.type_ids.get(&type_key).copied();
            match (method_id, type_id) {
                (Some(from), Some(to)) => {
                    self.relationships.push(GraphRelationship::new(
                        RelationshipKind::BelongsTo,
                        from,
                        to,
                    ));
                }
                _ => self.skip(&format!("method {} → {}", func.key(), type_key)),
            }
        }
    }

    /// Rule 8: one `Implements` per recorded implementation, complete or
    /// not.
    fn emit_implementations(&mut self, report: &AnalysisReport) {
        for implementation in &report.interface_implementations {
            let Some(iface) = &implementation.interface else {
                continue;
            };
            let from = self.type_ids.get(&implementation.ty.key()).copied();
            let to = self.type_ids.get(&iface.key()).copied();
            match (from, to) {
                (Some(from), Some(to)) => {
                    let mut rel =
                        GraphRelationship::new(RelationshipKind::Implements, from, to)
                            .with_property("is_complete", implementation.is_complete);
                    if let Ok(missing) = serde_json::to_value(&implementation.missing_methods) {
                        rel = rel.with_property("missing_methods", missing);
                    }
                    self.relationships.push(rel);
                }
                _ => self.skip(&format!(
                    "implementation {} → {}",
                    implementation.ty.key(),
                    iface.key()
                )),
            }
        }
    }

    /// Rule 9: `Calls` per chain; dangling callers or callees are skipped
    /// silently and only counted.
    fn emit_call_chains(&mut self, report: &AnalysisReport) {
        for chain in &report.call_chains {
            let from = self.function_ids.get(&chain.caller.key()).copied();
            let to = self.function_ids.get(&chain.callee.key()).copied();
            match (from, to) {
                (Some(from), Some(to)) => {
                    let mut rel = GraphRelationship::new(RelationshipKind::Calls, from, to)
                        .with_property("is_recursive", chain.is_recursive);
                    if let Ok(sites) = serde_json::to_value(&chain.sites) {
                        rel = rel.with_property("call_sites", sites);
                    }
                    self.relationships.push(rel);
                }
                _ => self.skip(&format!(
                    "call {} → {}",
                    chain.caller.key(),
                    chain.callee.key()
                )),
            }
        }
    }

    /// Rule 10: `DependsOn` for dependency edges that resolve internally.
    fn emit_dependencies(&mut self, report: &AnalysisReport) {
        for edge in &report.dependency_graph.edges {
            let from = self.package_ids.get(&edge.from).copied();
            let to = self.package_ids.get(&edge.to).copied();
            if let (Some(from), Some(to)) = (from, to) {
                self.relationships.push(GraphRelationship::new(
                    RelationshipKind::DependsOn,
                    from,
                    to,
                ));
            }
            // External targets have no node and no relationship.
        }
    }

    fn skip(&mut self, what: &str) {
        self.skipped += 1;
        debug!("skipping relationship with unresolved endpoint: {}", what);
    }
}
