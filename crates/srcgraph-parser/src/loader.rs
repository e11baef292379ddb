//! Built-in syntax-only `PackageLoader`. Walks the project root, parses
//! every AL file with tree-sitter, and groups files into packages by
//! directory. Produces no type table and no IR; downstream stages use their
//! syntactic fallbacks.

use crate::collect;
use crate::extract;
use async_trait::async_trait;
use crossbeam_channel::bounded;
use srcgraph_core::{
    LoadDiagnostic, LoadOptions, LoadOutput, PackageLoader, ParserConfig, Result, SourceFile,
    SourceModule, SrcGraphError,
};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::thread;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct SyntacticLoader {
    config: ParserConfig,
    max_concurrency: usize,
}

impl SyntacticLoader {
    pub fn new() -> Self {
        Self {
            config: ParserConfig::default(),
            max_concurrency: num_cpus::get().min(4),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Values below 1 mean sequential parsing.
    pub fn with_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }
}

impl Default for SyntacticLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PackageLoader for SyntacticLoader {
    async fn load(
        &self,
        project_root: &Path,
        options: &LoadOptions,
        cancel: &CancellationToken,
    ) -> Result<LoadOutput> {
        let root = project_root.to_path_buf();
        let mut config = self.config.clone();
        config.include_tests = options.include_tests;
        config.include_vendor = options.include_vendor;
        let workers = self.max_concurrency;
        let cancel = cancel.clone();

        tokio::task::spawn_blocking(move || load_blocking(&root, &config, workers, &cancel))
            .await
            .map_err(|e| SrcGraphError::LoadFailed(vec![format!("loader task failed: {}", e)]))?
    }
}

fn load_blocking(
    root: &Path,
    config: &ParserConfig,
    workers: usize,
    cancel: &CancellationToken,
) -> Result<LoadOutput> {
    let paths = collect::collect_source_files(root, config)?;
    info!("loading {} source files from {}", paths.len(), root.display());

    let (mut files, errors) = parse_files(paths, workers, cancel);
    if cancel.is_cancelled() {
        return Err(SrcGraphError::Cancelled);
    }

    // Reorder after the parallel stage so grouping is deterministic.
    files.sort_by(|a, b| a.path.cmp(&b.path));

    let modules = group_into_modules(root, files);
    debug!("grouped into {} packages", modules.len());

    Ok(LoadOutput {
        modules,
        types: None,
        ir: None,
        errors,
    })
}

/// Producer/worker/collector pipeline over bounded channels. The walk
/// result is the producer; closing the path channel signals completion; the
/// collector drains until every worker has hung up.
fn parse_files(
    paths: Vec<PathBuf>,
    workers: usize,
    cancel: &CancellationToken,
) -> (Vec<SourceFile>, Vec<LoadDiagnostic>) {
    if paths.is_empty() {
        return (Vec::new(), Vec::new());
    }
    let workers = workers.max(1).min(paths.len());

    let (path_tx, path_rx) = bounded::<PathBuf>(workers * 2);
    let (result_tx, result_rx) =
        bounded::<std::result::Result<SourceFile, LoadDiagnostic>>(workers * 2);

    thread::scope(|scope| {
        scope.spawn(move || {
            for path in paths {
                if cancel.is_cancelled() {
                    break;
                }
                if path_tx.send(path).is_err() {
                    break;
                }
            }
        });

        for _ in 0..workers {
            let rx = path_rx.clone();
            let tx = result_tx.clone();
            scope.spawn(move || {
                for path in rx.iter() {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let outcome = std::fs::read_to_string(&path)
                        .map_err(|e| LoadDiagnostic {
                            file: Some(path.clone()),
                            message: format!("read failed: {}", e),
                        })
                        .and_then(|content| {
                            extract::parse_source_file(&path, &content).map_err(|e| {
                                LoadDiagnostic {
                                    file: Some(path.clone()),
                                    message: e.to_string(),
                                }
                            })
                        });
                    if tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(path_rx);
        drop(result_tx);

        let mut files = Vec::new();
        let mut errors = Vec::new();
        for outcome in result_rx.iter() {
            match outcome {
                Ok(file) => files.push(file),
                Err(diag) => errors.push(diag),
            }
        }
        (files, errors)
    })
}

/// Groups parsed files into packages by directory. The import path is the
/// module path plus the root-relative directory; the short name comes from
/// the package clause.
pub(crate) fn group_into_modules(root: &Path, files: Vec<SourceFile>) -> Vec<SourceModule> {
    let module_path = read_module_path(root);
    let mut modules: BTreeMap<String, SourceModule> = BTreeMap::new();

    for file in files {
        let import_path = match file.path.parent().and_then(|p| p.strip_prefix(root).ok()) {
            Some(rel) if rel.as_os_str().is_empty() => module_path.clone(),
            Some(rel) => format!("{}/{}", module_path, to_slash(rel)),
            None => module_path.clone(),
        };

        let module = modules.entry(import_path.clone()).or_insert_with(|| {
            let short = if file.package_name.is_empty() {
                import_path
                    .rsplit('/')
                    .next()
                    .unwrap_or(&import_path)
                    .to_string()
            } else {
                file.package_name.clone()
            };
            SourceModule::new(&import_path, &short)
        });
        module.files.push(file);
    }

    // Resolve short names for intra-project imports; everything else stays
    // unresolved and gets the heuristic fallback downstream.
    let known: BTreeMap<String, String> = modules
        .values()
        .map(|m| (m.import_path.clone(), m.short_name.clone()))
        .collect();
    for module in modules.values_mut() {
        let mut imported = BTreeMap::new();
        for file in &module.files {
            for import in &file.imports {
                if let Some(short) = known.get(&import.path) {
                    imported.insert(import.path.clone(), short.clone());
                }
            }
        }
        module.imported_packages = imported;
    }

    modules.into_values().collect()
}

/// Module path from the root manifest when present, directory name
/// otherwise.
fn read_module_path(root: &Path) -> String {
    if let Ok(content) = std::fs::read_to_string(root.join("go.mod")) {
        for line in content.lines() {
            if let Some(rest) = line.trim().strip_prefix("module ") {
                let path = rest.trim().trim_matches('"');
                if !path.is_empty() {
                    return path.to_string();
                }
            }
        }
    }
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
