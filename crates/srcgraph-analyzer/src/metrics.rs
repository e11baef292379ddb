use rustc_hash::FxHashMap;
use srcgraph_core::{ParseResult, ProjectMetrics, TypeKind};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub fn compute_metrics(result: &ParseResult) -> ProjectMetrics {
    let mut total_files = 0;
    let mut total_functions = 0;
    let mut total_structs = 0;
    let mut max_end_line: FxHashMap<&PathBuf, u32> = FxHashMap::default();
    let mut cyclomatic_complexity: BTreeMap<String, f32> = BTreeMap::new();

    for pkg in &result.packages {
        total_files += pkg.files.len();
        total_functions += pkg.functions.len();
        total_structs += pkg
            .types
            .iter()
            .filter(|t| t.kind == TypeKind::Struct)
            .count();

        for func in &pkg.functions {
            let entry = max_end_line.entry(&func.file).or_insert(0);
            *entry = (*entry).max(func.line_end);
            if let Some(complexity) = func.complexity {
                cyclomatic_complexity.insert(func.key(), complexity);
            }
        }
    }

    // Known underestimate: trailing declarations after the last function
    // body are not counted.
    let total_lines: u64 = max_end_line.values().map(|&l| u64::from(l)).sum();

    ProjectMetrics {
        total_files,
        total_functions,
        total_structs,
        total_interfaces: result.interfaces.len(),
        total_lines,
        cyclomatic_complexity,
    }
}
