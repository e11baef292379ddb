use crate::{AnalysisResult, IrProgram, ProjectId, Result, SourceModule, TypeTable};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    pub include_tests: bool,
    pub include_vendor: bool,
    pub need_ir: bool,
}

#[derive(Debug, Clone)]
pub struct LoadDiagnostic {
    pub file: Option<PathBuf>,
    pub message: String,
}

impl LoadDiagnostic {
    pub fn render(&self) -> String {
        match &self.file {
            Some(file) => format!("{}: {}", file.display(), self.message),
            None => self.message.clone(),
        }
    }
}

/// Everything a loader produced for one project root. `types` and `ir` are
/// absent when the loader only had syntax; downstream stages degrade to
/// their documented fallbacks.
#[derive(Debug, Clone, Default)]
pub struct LoadOutput {
    pub modules: Vec<SourceModule>,
    pub types: Option<TypeTable>,
    pub ir: Option<IrProgram>,
    pub errors: Vec<LoadDiagnostic>,
}

/// Locates and loads AL packages under a project root.
#[async_trait]
pub trait PackageLoader: Send + Sync {
    async fn load(
        &self,
        project_root: &Path,
        options: &LoadOptions,
        cancel: &CancellationToken,
    ) -> Result<LoadOutput>;
}

/// Persists the emitted graph and answers generic queries.
#[async_trait]
pub trait GraphSink: Send + Sync {
    /// Idempotent: clears any prior graph stored under this project id.
    async fn initialize_project(&self, project_id: &ProjectId) -> Result<()>;

    /// Creates all nodes, then all relationships, tagging every entity with
    /// the project id.
    async fn store_analysis(&self, project_id: &ProjectId, result: &AnalysisResult) -> Result<()>;

    async fn execute_query(
        &self,
        query: &str,
        params: BTreeMap<String, Value>,
    ) -> Result<Vec<BTreeMap<String, Value>>>;
}
