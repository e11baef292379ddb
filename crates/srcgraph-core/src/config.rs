use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Directory names skipped during the walk.
    pub ignore_dirs: Vec<String>,
    /// File names skipped during the walk.
    pub ignore_files: Vec<String>,
    pub include_tests: bool,
    pub include_vendor: bool,
    pub enable_ir: bool,
    pub enable_call_graph: bool,
    pub enable_performance_stats: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: vec![
                ".git".to_string(),
                ".idea".to_string(),
                ".vscode".to_string(),
                "node_modules".to_string(),
            ],
            ignore_files: Vec::new(),
            include_tests: true,
            include_vendor: false,
            enable_ir: true,
            enable_call_graph: true,
            enable_performance_stats: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    pub enable_metrics: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuilderConfig {
    pub include_line_numbers: bool,
    /// Accepted for surface compatibility; comment preservation is out of
    /// scope and the flag has no effect.
    pub include_comments: bool,
    pub create_file_nodes: bool,
    pub batch_size: usize,
    pub chunk_size: usize,
    /// Non-positive values are tolerated and mean sequential execution.
    pub max_concurrency: i32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            include_line_numbers: true,
            include_comments: false,
            create_file_nodes: true,
            batch_size: 1000,
            chunk_size: 500,
            max_concurrency: 4,
        }
    }
}
