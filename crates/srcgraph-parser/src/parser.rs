//! The parser stage: validates the project root, invokes the
//! `PackageLoader`, and translates its output into the language-neutral
//! records every later stage consumes. Linking passes attach methods to
//! their named types, flatten interface method sets, discover
//! implementations, and tie parsed functions to the IR.

use crate::{collect, extract, implementations, loader, perf, rta};
use rustc_hash::{FxHashMap, FxHashSet};
use srcgraph_core::{
    CallSite, Decl, FieldInfo, FileInfo, FunctionInfo, ImportInfo, ImportNameSource,
    InterfaceInfo, IrProgram, LoadOptions, MethodSig, PackageInfo, PackageLoader, ParseResult,
    ParserConfig, PerformanceStats, ReceiverRef, Result, SourceModule, SrcGraphError, TypeInfo,
    TypeKind, TypeShape, TypeTable, ValueInfo,
};
use std::path::Path;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct SourceParser<L> {
    loader: L,
    config: ParserConfig,
}

impl<L: PackageLoader> SourceParser<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Full project parse. Load errors are fatal; missing type info or IR
    /// degrades to the syntactic fallbacks.
    pub async fn parse_project(
        &self,
        project_root: &Path,
        cancel: &CancellationToken,
    ) -> Result<ParseResult> {
        let root = collect::validate_root(project_root)?;
        info!("parsing project at {}", root.display());

        let sampler = self
            .config
            .enable_performance_stats
            .then(perf::MemorySampler::start);
        let preparation_start = Instant::now();

        let options = LoadOptions {
            include_tests: self.config.include_tests,
            include_vendor: self.config.include_vendor,
            need_ir: self.config.enable_ir,
        };
        let output = self.loader.load(&root, &options, cancel).await?;
        if !output.errors.is_empty() {
            return Err(SrcGraphError::LoadFailed(
                output.errors.iter().map(|e| e.render()).collect(),
            ));
        }
        let preparation = preparation_start.elapsed();

        let construction_start = Instant::now();
        let types = output.types.as_ref();

        let mut modules = output.modules;
        modules.sort_by(|a, b| a.import_path.cmp(&b.import_path));

        let mut packages = Vec::with_capacity(modules.len());
        let mut total_lines: u64 = 0;
        for module in &modules {
            if cancel.is_cancelled() {
                return Err(SrcGraphError::Cancelled);
            }
            let (package, lines) = translate_module(module, types);
            total_lines += lines;
            packages.push(package);
        }

        link_methods(&mut packages, types);
        flatten_interfaces(&mut packages, types);
        implementations::discover_implementations(&mut packages, types);

        if let Some(ir) = output.ir.as_ref() {
            link_ir(&mut packages, ir);
        }

        let call_graph = match output.ir.as_ref() {
            Some(ir) if self.config.enable_call_graph => {
                let impls = complete_implementations(&packages);
                let mains: FxHashSet<String> = packages
                    .iter()
                    .filter(|p| p.short_name == "main")
                    .map(|p| p.import_path.clone())
                    .collect();
                Some(rta::build_call_graph(ir, &impls, &mains))
            }
            _ => None,
        };

        let construction = construction_start.elapsed();
        let interfaces: Vec<InterfaceInfo> = packages
            .iter()
            .flat_map(|p| p.interfaces.iter().cloned())
            .collect();

        let stats = sampler.map(|sampler| {
            let sample = sampler.finish();
            perf::check_thresholds(construction, &sample);
            let elapsed = (preparation + construction).as_secs_f64().max(f64::EPSILON);
            let total_files: usize = packages.iter().map(|p| p.files.len()).sum();
            PerformanceStats {
                preparation,
                construction,
                start_memory_bytes: sample.start_bytes,
                end_memory_bytes: sample.end_bytes,
                peak_memory_bytes: sample.peak_bytes,
                files_per_second: total_files as f64 / elapsed,
                lines_per_second: total_lines as f64 / elapsed,
            }
        });

        info!(
            "parsed {} packages, {} interfaces",
            packages.len(),
            interfaces.len()
        );

        Ok(ParseResult {
            project_root: root,
            packages,
            interfaces,
            ir: output.ir,
            call_graph,
            stats,
        })
    }

    /// Single-file mode: parse failures come back directly instead of being
    /// promoted to a load failure.
    pub async fn parse_file(&self, project_root: &Path, file: &Path) -> Result<PackageInfo> {
        let root = collect::validate_root(project_root)?;
        let file = collect::validate_file_in_root(&root, file)?;

        let content = std::fs::read_to_string(&file)?;
        let source = extract::parse_source_file(&file, &content)?;

        let modules = loader::group_into_modules(&root, vec![source]);
        let module = modules
            .into_iter()
            .next()
            .ok_or_else(|| SrcGraphError::ParseFailed {
                file: file.display().to_string(),
                message: "no package produced".to_string(),
            })?;

        let (package, _) = translate_module(&module, None);
        let mut packages = vec![package];
        link_methods(&mut packages, None);
        flatten_interfaces(&mut packages, None);
        implementations::discover_implementations(&mut packages, None);
        packages.pop().ok_or_else(|| SrcGraphError::ParseFailed {
            file: file.display().to_string(),
            message: "no package produced".to_string(),
        })
    }
}

fn translate_module(module: &SourceModule, types: Option<&TypeTable>) -> (PackageInfo, u64) {
    let mut package = PackageInfo::new(&module.import_path, &module.short_name);
    let mut lines: u64 = 0;

    let mut files: Vec<_> = module.files.iter().collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));

    for file in files {
        lines += u64::from(file.line_count);

        let mut imports = Vec::new();
        let mut dependencies = Vec::new();
        for import in &file.imports {
            let (package_name, name_source) = match module
                .imported_packages
                .get(&import.path)
                .cloned()
                .or_else(|| import.package_name.clone())
            {
                Some(name) => (name, ImportNameSource::Resolved),
                None => {
                    // Last path segment; directories and package names may
                    // disagree, so the source is flagged.
                    let fallback = import
                        .path
                        .rsplit('/')
                        .next()
                        .unwrap_or(&import.path)
                        .to_string();
                    (fallback, ImportNameSource::Heuristic)
                }
            };
            if !dependencies.contains(&import.path) {
                dependencies.push(import.path.clone());
            }
            imports.push(ImportInfo {
                path: import.path.clone(),
                alias: import.alias.clone(),
                package_name,
                name_source,
                line: import.line,
            });
        }

        package.files.push(FileInfo {
            path: file.path.clone(),
            package_name: file.package_name.clone(),
            imports,
            dependencies,
        });

        for decl in &file.decls {
            match decl {
                Decl::Func(func) => {
                    let receiver = func.receiver.as_ref().map(|text| ReceiverRef {
                        text: text.clone(),
                        base_name: extract::base_type_name(text).to_string(),
                        type_key: None,
                    });
                    let mut info = FunctionInfo {
                        name: func.name.clone(),
                        package_path: module.import_path.clone(),
                        file: file.path.clone(),
                        receiver,
                        signature_text: func.signature_text.clone(),
                        signature: None,
                        type_signature: format!(
                            "({}) ({})",
                            func.params_text, func.results_text
                        ),
                        line_start: func.span.start_line,
                        line_end: func.span.end_line,
                        is_exported: srcgraph_core::is_exported_name(&func.name),
                        calls: func
                            .calls
                            .iter()
                            .map(|call| CallSite {
                                file: file.path.clone(),
                                line: call.line,
                                column: call.column,
                                expression: Some(call.expression.clone()),
                                target: call.resolved.clone(),
                            })
                            .collect(),
                        complexity: func.complexity,
                        ir: None,
                    };
                    if let Some(table) = types {
                        info.signature = table.signatures.get(&info.key()).cloned();
                    }
                    package.functions.push(info);
                }
                Decl::Type(ty) => {
                    let (kind, underlying, fields, embeds) = match &ty.shape {
                        TypeShape::Struct { fields } => {
                            let embeds = fields
                                .iter()
                                .filter(|f| f.is_anonymous)
                                .map(|f| f.type_text.clone())
                                .collect();
                            let fields = fields
                                .iter()
                                .map(|f| FieldInfo {
                                    name: f.name.clone(),
                                    type_text: f.type_text.clone(),
                                    tag: f.tag.clone(),
                                    is_exported: srcgraph_core::is_exported_name(&f.name),
                                    is_anonymous: f.is_anonymous,
                                })
                                .collect();
                            (TypeKind::Struct, "struct".to_string(), fields, embeds)
                        }
                        TypeShape::Interface { embeds, .. } => (
                            TypeKind::Interface,
                            "interface".to_string(),
                            Vec::new(),
                            embeds.clone(),
                        ),
                        TypeShape::Alias { target } => {
                            (TypeKind::Alias, target.clone(), Vec::new(), Vec::new())
                        }
                        TypeShape::Basic { underlying } => {
                            (TypeKind::Basic, underlying.clone(), Vec::new(), Vec::new())
                        }
                        TypeShape::Other { underlying } => {
                            (TypeKind::Other, underlying.clone(), Vec::new(), Vec::new())
                        }
                    };

                    if let TypeShape::Interface { methods, embeds } = &ty.shape {
                        package.interfaces.push(InterfaceInfo {
                            name: ty.name.clone(),
                            package_path: module.import_path.clone(),
                            methods: methods
                                .iter()
                                .map(|m| MethodSig {
                                    name: m.name.clone(),
                                    signature: m.signature(),
                                })
                                .collect(),
                            embeds: embeds.clone(),
                            implementations: Vec::new(),
                            line_start: ty.span.start_line,
                            line_end: ty.span.end_line,
                            is_exported: srcgraph_core::is_exported_name(&ty.name),
                        });
                    }

                    package.types.push(TypeInfo {
                        name: ty.name.clone(),
                        package_path: module.import_path.clone(),
                        file: file.path.clone(),
                        kind,
                        underlying,
                        fields,
                        methods: Vec::new(),
                        embeds,
                        implemented_interfaces: Vec::new(),
                        is_exported: srcgraph_core::is_exported_name(&ty.name),
                        line_start: ty.span.start_line,
                        line_end: ty.span.end_line,
                    });
                }
                Decl::Const(value) => {
                    package.constants.push(translate_value(
                        value,
                        &module.import_path,
                        &file.path,
                        types,
                        true,
                    ));
                }
                Decl::Var(value) => {
                    package.variables.push(translate_value(
                        value,
                        &module.import_path,
                        &file.path,
                        types,
                        false,
                    ));
                }
            }
        }
    }

    (package, lines)
}

fn translate_value(
    value: &srcgraph_core::ValueDecl,
    package_path: &str,
    file: &std::path::Path,
    types: Option<&TypeTable>,
    is_const: bool,
) -> ValueInfo {
    let checker_value = if is_const {
        types.and_then(|t| {
            t.const_values
                .get(&format!("{}.{}", package_path, value.name))
                .cloned()
        })
    } else {
        None
    };
    ValueInfo {
        name: value.name.clone(),
        package_path: package_path.to_string(),
        file: file.to_path_buf(),
        type_text: value.type_text.clone(),
        value_text: value.value_text.clone(),
        checker_value,
        line: value.line,
        is_exported: srcgraph_core::is_exported_name(&value.name),
    }
}

/// Attaches methods to their named types. Receiver text is normalized by
/// the checker when one ran; otherwise pointer and package decoration are
/// stripped and the base name is looked up in the method's own package.
fn link_methods(packages: &mut [PackageInfo], types: Option<&TypeTable>) {
    let mut type_index: FxHashMap<String, (usize, usize)> = FxHashMap::default();
    for (pkg_idx, pkg) in packages.iter().enumerate() {
        for (type_idx, ty) in pkg.types.iter().enumerate() {
            type_index.insert(ty.key(), (pkg_idx, type_idx));
        }
    }

    let mut links: Vec<(usize, usize, String, (usize, usize))> = Vec::new();
    for (pkg_idx, pkg) in packages.iter().enumerate() {
        for (func_idx, func) in pkg.functions.iter().enumerate() {
            let Some(receiver) = &func.receiver else {
                continue;
            };
            let type_key = types
                .and_then(|t| t.receiver_types.get(&receiver.text).cloned())
                .unwrap_or_else(|| format!("{}.{}", pkg.import_path, receiver.base_name));
            match type_index.get(&type_key) {
                Some(&target) => links.push((pkg_idx, func_idx, type_key, target)),
                None => debug!(
                    "receiver {} of {} does not resolve to a parsed type",
                    receiver.text,
                    func.key()
                ),
            }
        }
    }

    for (pkg_idx, func_idx, type_key, (type_pkg_idx, type_idx)) in links {
        let func_key = packages[pkg_idx].functions[func_idx].key();
        if let Some(receiver) = packages[pkg_idx].functions[func_idx].receiver.as_mut() {
            receiver.type_key = Some(type_key);
        }
        packages[type_pkg_idx].types[type_idx].methods.push(func_key);
    }
}

/// Expands interface embeds into flattened method sets. The checker's
/// method set wins when present; otherwise embeds are resolved inside the
/// parse set, unqualified names in the owning package and qualified names
/// by package short name.
fn flatten_interfaces(packages: &mut [PackageInfo], types: Option<&TypeTable>) {
    let mut by_key: FxHashMap<String, Vec<MethodSig>> = FxHashMap::default();
    let mut embeds_of: FxHashMap<String, Vec<String>> = FxHashMap::default();
    let mut by_short_name: FxHashMap<(String, String), String> = FxHashMap::default();

    for pkg in packages.iter() {
        let short = pkg.short_name.clone();
        for iface in &pkg.interfaces {
            by_key.insert(iface.key(), iface.methods.clone());
            embeds_of.insert(iface.key(), iface.embeds.clone());
            by_short_name
                .entry((short.clone(), iface.name.clone()))
                .or_insert_with(|| iface.key());
        }
    }

    fn resolve(
        key: &str,
        package_path: &str,
        by_key: &FxHashMap<String, Vec<MethodSig>>,
        embeds_of: &FxHashMap<String, Vec<String>>,
        by_short_name: &FxHashMap<(String, String), String>,
        types: Option<&TypeTable>,
        visiting: &mut FxHashSet<String>,
    ) -> Vec<MethodSig> {
        if let Some(set) = types.and_then(|t| t.method_set(key)) {
            let mut methods: Vec<MethodSig> = set.value_methods.clone();
            methods.extend(set.pointer_methods.iter().cloned());
            return methods;
        }
        if !visiting.insert(key.to_string()) {
            return Vec::new();
        }

        let mut methods = by_key.get(key).cloned().unwrap_or_default();
        for embed in embeds_of.get(key).cloned().unwrap_or_default() {
            let embed_key = match embed.rsplit_once('.') {
                Some((pkg_short, name)) => by_short_name
                    .get(&(pkg_short.to_string(), name.to_string()))
                    .cloned(),
                None => Some(format!("{}.{}", package_path, embed)),
            };
            let Some(embed_key) = embed_key else {
                warn!("embedded interface {} not found in parse set", embed);
                continue;
            };
            let embed_pkg = embed_key.rsplit_once('.').map(|(p, _)| p).unwrap_or("");
            for method in resolve(
                &embed_key,
                embed_pkg,
                by_key,
                embeds_of,
                by_short_name,
                types,
                visiting,
            ) {
                if !methods.iter().any(|m| m.name == method.name) {
                    methods.push(method);
                }
            }
        }
        visiting.remove(key);
        methods
    }

    for pkg_idx in 0..packages.len() {
        let package_path = packages[pkg_idx].import_path.clone();
        for iface_idx in 0..packages[pkg_idx].interfaces.len() {
            let key = packages[pkg_idx].interfaces[iface_idx].key();
            let mut visiting = FxHashSet::default();
            let methods = resolve(
                &key,
                &package_path,
                &by_key,
                &embeds_of,
                &by_short_name,
                types,
                &mut visiting,
            );
            packages[pkg_idx].interfaces[iface_idx].methods = methods;
        }
    }
}

/// Ties parsed functions to the IR function table through
/// `"<pkg>.[<recv>.]<name>"` keys built from normalized receiver strings.
fn link_ir(packages: &mut [PackageInfo], ir: &IrProgram) {
    for pkg in packages.iter_mut() {
        let mut linked = false;
        for func in pkg.functions.iter_mut() {
            if let Some(id) = ir.lookup(&func.key()) {
                func.ir = Some(id);
                linked = true;
            }
        }
        pkg.has_ir = linked;
    }
}

/// Interface key → concrete type keys, complete implementations only.
fn complete_implementations(packages: &[PackageInfo]) -> FxHashMap<String, Vec<String>> {
    let mut impls: FxHashMap<String, Vec<String>> = FxHashMap::default();
    for pkg in packages {
        for iface in &pkg.interfaces {
            for implementation in &iface.implementations {
                if implementation.is_complete {
                    impls
                        .entry(iface.key())
                        .or_default()
                        .push(implementation.ty.key());
                }
            }
        }
    }
    impls
}
