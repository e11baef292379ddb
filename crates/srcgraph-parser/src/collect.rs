use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use srcgraph_core::{ParserConfig, Result, SrcGraphError};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Validates and normalizes a project root: non-empty, existing, a
/// directory. Returns the canonical absolute path every later check is
/// anchored to.
pub fn validate_root(root: &Path) -> Result<PathBuf> {
    if root.as_os_str().is_empty() {
        return Err(SrcGraphError::PathInvalid("empty path".to_string()));
    }
    let canonical = root
        .canonicalize()
        .map_err(|e| SrcGraphError::PathInvalid(format!("{}: {}", root.display(), e)))?;
    if !canonical.is_dir() {
        return Err(SrcGraphError::PathInvalid(format!(
            "not a directory: {}",
            canonical.display()
        )));
    }
    Ok(canonical)
}

/// Ensures `file` lies under the normalized `root`. Traversal inputs that
/// escape the root after normalization are rejected.
pub fn validate_file_in_root(root: &Path, file: &Path) -> Result<PathBuf> {
    if file.as_os_str().is_empty() {
        return Err(SrcGraphError::PathInvalid("empty path".to_string()));
    }
    let canonical = file
        .canonicalize()
        .map_err(|e| SrcGraphError::PathInvalid(format!("{}: {}", file.display(), e)))?;
    if !canonical.starts_with(root) {
        return Err(SrcGraphError::PathInvalid(format!(
            "outside project root: {}",
            canonical.display()
        )));
    }
    Ok(canonical)
}

/// Collects AL source files under `root`, honoring the parser
/// configuration. Paths come back sorted so downstream output is
/// reproducible regardless of walk order.
pub fn collect_source_files(root: &Path, config: &ParserConfig) -> Result<Vec<PathBuf>> {
    let ignore_files = build_globset(&config.ignore_files);

    let mut walker = WalkBuilder::new(root);
    walker
        .hidden(false)
        .git_ignore(false)
        .git_exclude(false)
        .ignore(false);

    let ignore_dirs = config.ignore_dirs.clone();
    walker.filter_entry(move |entry| {
        let is_dir = entry.file_type().map_or(false, |t| t.is_dir());
        let name = entry.file_name().to_string_lossy();
        !(is_dir && ignore_dirs.iter().any(|d| d.as_str() == name.as_ref()))
    });

    let mut paths = Vec::new();
    for dent in walker.build() {
        let dent = match dent {
            Ok(d) => d,
            Err(e) => {
                warn!("walker error: {}", e);
                continue;
            }
        };
        let path = dent.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some("go") {
            continue;
        }

        let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if !config.include_tests && file_name.ends_with("_test.go") {
            continue;
        }
        if !config.include_vendor && in_vendor(root, path) {
            continue;
        }
        if let Some(ref set) = ignore_files {
            if set.is_match(path) {
                continue;
            }
        }

        paths.push(path.to_path_buf());
    }

    paths.sort();
    debug!("collected {} source files under {}", paths.len(), root.display());
    Ok(paths)
}

fn in_vendor(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .map(|rel| rel.components().any(|c| c.as_os_str() == "vendor"))
        .unwrap_or(false)
}

fn build_globset<S: AsRef<str>>(patterns: &[S]) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut added = false;
    for pattern in patterns {
        match Glob::new(pattern.as_ref()) {
            Ok(glob) => {
                builder.add(glob);
                added = true;
            }
            Err(e) => warn!("invalid ignore pattern '{}': {}", pattern.as_ref(), e),
        }
    }
    if added {
        builder.build().ok()
    } else {
        None
    }
}
