//! Caller→callee mapping. The IR call graph is authoritative when the
//! parser produced one; otherwise chains are recovered from syntactic call
//! sites through a function-key index.

use rustc_hash::FxHashMap;
use srcgraph_core::{CallChain, CallSite, FunctionRef, IrProgram, ParseResult};
use std::path::PathBuf;
use tracing::debug;

pub fn map_call_chains(result: &ParseResult) -> Vec<CallChain> {
    match (&result.ir, &result.call_graph) {
        (Some(ir), Some(graph)) => {
            let chains = from_ir(ir, graph);
            debug!("mapped {} call chains from the IR call graph", chains.len());
            chains
        }
        _ => {
            let chains = from_syntax(result);
            debug!("mapped {} call chains syntactically", chains.len());
            chains
        }
    }
}

fn from_ir(ir: &IrProgram, graph: &srcgraph_core::CallGraph) -> Vec<CallChain> {
    graph
        .edges
        .iter()
        .map(|edge| {
            let caller = ir.func(edge.caller);
            let callee = ir.func(edge.callee);
            let caller_ref = FunctionRef {
                package: caller.package.clone(),
                receiver: caller.receiver.clone(),
                name: caller.name.clone(),
            };
            let callee_ref = FunctionRef {
                package: callee.package.clone(),
                receiver: callee.receiver.clone(),
                name: callee.name.clone(),
            };
            let site = CallSite {
                file: caller.file.clone().unwrap_or_default(),
                line: edge.line,
                column: 0,
                expression: None,
                target: Some(callee_ref.clone()),
            };
            CallChain::new(caller_ref, callee_ref, vec![site])
        })
        .collect()
}

fn from_syntax(result: &ParseResult) -> Vec<CallChain> {
    // `"<pkg>.[<recv>.]<name>"` → declared function.
    let mut index: FxHashMap<String, FunctionRef> = FxHashMap::default();
    // Named type → owning package, for the receiver package correction.
    let mut type_packages: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    // File → import short name (or alias) → import path.
    let mut file_imports: FxHashMap<&PathBuf, FxHashMap<&str, &str>> = FxHashMap::default();

    for pkg in &result.packages {
        for func in &pkg.functions {
            index.insert(func.key(), func.func_ref());
        }
        for ty in &pkg.types {
            type_packages
                .entry(ty.name.as_str())
                .or_default()
                .push(ty.package_path.as_str());
        }
        for file in &pkg.files {
            let imports = file_imports.entry(&file.path).or_default();
            for import in &file.imports {
                let name = import.alias.as_deref().unwrap_or(&import.package_name);
                imports.insert(name, import.path.as_str());
            }
        }
    }

    let mut chains: Vec<CallChain> = Vec::new();
    let mut chain_index: FxHashMap<(String, String), usize> = FxHashMap::default();

    let mut push_site = |caller: FunctionRef, callee: FunctionRef, site: CallSite| {
        let key = (caller.key(), callee.key());
        match chain_index.get(&key).copied() {
            Some(idx) => chains[idx].sites.push(site),
            None => {
                chain_index.insert(key, chains.len());
                chains.push(CallChain::new(caller, callee, vec![site]));
            }
        }
    };

    for pkg in &result.packages {
        for func in &pkg.functions {
            let caller = func.func_ref();
            for call in &func.calls {
                if let Some(target) = &call.target {
                    let callee = correct_receiver_package(target, &pkg.import_path, &type_packages);
                    push_site(caller.clone(), callee, call.clone());
                    continue;
                }
                let Some(expression) = &call.expression else {
                    continue;
                };
                if let Some(callee) =
                    resolve_expression(expression, pkg, &call.file, &index, &file_imports)
                {
                    push_site(caller.clone(), callee, call.clone());
                }
            }
        }
    }

    chains
}

/// When the callee's receiver names a type living in a different package,
/// that package wins; otherwise the caller's package is the default.
fn correct_receiver_package(
    target: &FunctionRef,
    caller_package: &str,
    type_packages: &FxHashMap<&str, Vec<&str>>,
) -> FunctionRef {
    let mut callee = target.clone();
    if callee.package.is_empty() {
        callee.package = caller_package.to_string();
    }
    if let Some(receiver) = &callee.receiver {
        let known = type_packages.get(receiver.as_str());
        let resolves_in_place = known
            .map(|pkgs| pkgs.contains(&callee.package.as_str()))
            .unwrap_or(false);
        if !resolves_in_place {
            if let Some([only]) = known.map(Vec::as_slice) {
                callee.package = only.to_string();
            }
        }
    }
    callee
}

/// Syntactic resolution: unqualified names are free functions in the
/// caller's package; `pkg.Name` resolves through the file's imports. Method
/// calls on values stay unresolved without type information.
fn resolve_expression(
    expression: &str,
    pkg: &srcgraph_core::PackageInfo,
    file: &PathBuf,
    index: &FxHashMap<String, FunctionRef>,
    file_imports: &FxHashMap<&PathBuf, FxHashMap<&str, &str>>,
) -> Option<FunctionRef> {
    match expression.rsplit_once('.') {
        None => index
            .get(&format!("{}.{}", pkg.import_path, expression))
            .cloned(),
        Some((head, name)) => {
            let import_path = file_imports.get(file)?.get(head)?;
            index.get(&format!("{}.{}", import_path, name)).cloned()
        }
    }
}
