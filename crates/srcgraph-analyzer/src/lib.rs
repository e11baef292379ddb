//! The analyzer stage: fans the parse result out into the dependency graph,
//! cycle report, call chains, implementation list, and metrics, then bundles
//! everything into one report. The first failing sub-stage short-circuits.

pub mod callchain;
pub mod circular;
pub mod dependency;
pub mod implementations;
pub mod metrics;

use chrono::Utc;
use srcgraph_core::{
    AnalysisReport, AnalyzerConfig, ParseResult, ProjectId, Result, SrcGraphError,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            config: AnalyzerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AnalyzerConfig) -> Self {
        self.config = config;
        self
    }

    pub async fn analyze(
        &self,
        project_id: &ProjectId,
        result: &ParseResult,
        cancel: &CancellationToken,
    ) -> Result<AnalysisReport> {
        let checkpoint = |cancel: &CancellationToken| -> Result<()> {
            if cancel.is_cancelled() {
                Err(SrcGraphError::Cancelled)
            } else {
                Ok(())
            }
        };

        checkpoint(cancel)?;
        let dependency_graph = dependency::build_dependency_graph(
            &result.project_root.display().to_string(),
            &result.packages,
        );

        checkpoint(cancel)?;
        let circular_dependencies = circular::detect_cycles(&dependency_graph);

        checkpoint(cancel)?;
        let interface_implementations = implementations::collect_implementations(result);

        checkpoint(cancel)?;
        let call_chains = callchain::map_call_chains(result);

        checkpoint(cancel)?;
        let metrics = self
            .config
            .enable_metrics
            .then(|| metrics::compute_metrics(result));

        info!(
            project = %project_id,
            cycles = circular_dependencies.len(),
            chains = call_chains.len(),
            implementations = interface_implementations.len(),
            "analysis complete"
        );

        Ok(AnalysisReport {
            project_id: project_id.clone(),
            timestamp_unix: Utc::now().timestamp(),
            dependency_graph,
            interface_implementations,
            call_chains,
            circular_dependencies,
            metrics,
        })
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srcgraph_core::{FileInfo, PackageInfo};
    use std::path::PathBuf;

    fn package(path: &str, deps: &[&str]) -> PackageInfo {
        let mut pkg = PackageInfo::new(path, path.rsplit('/').next().unwrap());
        pkg.files.push(FileInfo {
            path: PathBuf::from(format!("/p/{}/f.go", path)),
            package_name: pkg.short_name.clone(),
            imports: Vec::new(),
            dependencies: deps.iter().map(|d| d.to_string()).collect(),
        });
        pkg
    }

    fn parse_result(packages: Vec<PackageInfo>) -> ParseResult {
        ParseResult {
            project_root: PathBuf::from("/p"),
            packages,
            interfaces: Vec::new(),
            ir: None,
            call_graph: None,
            stats: None,
        }
    }

    #[tokio::test]
    async fn empty_project_analyzes_without_error() {
        let report = Analyzer::new()
            .analyze(
                &ProjectId::from("empty"),
                &parse_result(Vec::new()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(report.dependency_graph.nodes.is_empty());
        assert!(report.circular_dependencies.is_empty());
        assert!(report.call_chains.is_empty());
        let metrics = report.metrics.unwrap();
        assert_eq!(metrics.total_files, 0);
    }

    #[tokio::test]
    async fn simple_cycle_is_reported() {
        let packages = vec![
            package("a", &["b"]),
            package("b", &["c"]),
            package("c", &["a"]),
        ];
        let report = Analyzer::new()
            .analyze(
                &ProjectId::from("cyclic"),
                &parse_result(packages),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.circular_dependencies.len(), 1);
        assert_eq!(report.circular_dependencies[0].cycle.len(), 3);
    }

    #[tokio::test]
    async fn cancellation_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = Analyzer::new()
            .analyze(&ProjectId::from("p"), &parse_result(Vec::new()), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SrcGraphError::Cancelled));
    }

    #[tokio::test]
    async fn metrics_can_be_disabled() {
        let report = Analyzer::new()
            .with_config(AnalyzerConfig {
                enable_metrics: false,
            })
            .analyze(
                &ProjectId::from("p"),
                &parse_result(vec![package("a", &[])]),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert!(report.metrics.is_none());
    }

    #[tokio::test]
    async fn dependency_graph_invariant_holds() {
        let packages = vec![package("a", &["b", "ext"]), package("b", &[])];
        let report = Analyzer::new()
            .analyze(
                &ProjectId::from("p"),
                &parse_result(packages),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let graph = &report.dependency_graph;
        for edge in &graph.edges {
            if let Some(target) = graph.nodes.get(&edge.to) {
                assert!(target.dependents.contains(&edge.from));
                assert!(graph.nodes[&edge.from].dependencies.contains(&edge.to));
            }
        }
    }
}
