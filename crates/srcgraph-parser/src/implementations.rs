//! Interface-implementation discovery. Candidates are pruned through a
//! method-count index, then checked with the type checker's method sets when
//! a `TypeTable` is present, or by parameter-type-string comparison when
//! only syntax was available.

use rustc_hash::FxHashMap;
use srcgraph_core::{
    Implementation, MethodSig, PackageInfo, TypeKind, TypeRef, TypeTable,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

struct TypeMeta {
    key: String,
    package: String,
    name: String,
    pkg_idx: usize,
    type_idx: usize,
    /// (method name, function key, syntactic type signature)
    methods: Vec<(String, String, String)>,
    method_count: usize,
}

pub fn discover_implementations(packages: &mut [PackageInfo], types: Option<&TypeTable>) {
    let metas = collect_type_metas(packages, types);

    // Method-count index: interfaces only probe candidates with at least as
    // many methods as the interface requires.
    let mut count_index: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    let mut name_index: FxHashMap<String, Vec<usize>> = FxHashMap::default();
    for (idx, meta) in metas.iter().enumerate() {
        count_index.entry(meta.method_count).or_default().push(idx);
        for (name, _, _) in &meta.methods {
            name_index.entry(name.clone()).or_default().push(idx);
        }
    }

    let interfaces: Vec<(usize, usize, String, Vec<MethodSig>)> = packages
        .iter()
        .enumerate()
        .flat_map(|(pkg_idx, pkg)| {
            pkg.interfaces
                .iter()
                .enumerate()
                .map(move |(iface_idx, iface)| {
                    (pkg_idx, iface_idx, iface.key(), iface.methods.clone())
                })
        })
        .collect();

    for (pkg_idx, iface_idx, iface_key, methods) in interfaces {
        let needed = methods.len();

        let mut complete: Vec<usize> = Vec::new();
        for (_, bucket) in count_index.range(needed..) {
            for &meta_idx in bucket {
                let meta = &metas[meta_idx];
                let (matched, missing) = check_methods(meta, &methods, types);
                if missing.is_empty() {
                    complete.push(meta_idx);
                    record(
                        packages,
                        meta,
                        pkg_idx,
                        iface_idx,
                        &iface_key,
                        true,
                        matched,
                        missing,
                    );
                }
            }
        }

        // Partial matches live below the count threshold too; anything with
        // at least one matching method name is worth recording.
        let mut partial_candidates: BTreeSet<usize> = BTreeSet::new();
        for sig in &methods {
            if let Some(bucket) = name_index.get(&sig.name) {
                partial_candidates.extend(bucket.iter().copied());
            }
        }
        for meta_idx in partial_candidates {
            if complete.contains(&meta_idx) {
                continue;
            }
            let meta = &metas[meta_idx];
            let (matched, missing) = check_methods(meta, &methods, types);
            if !matched.is_empty() && !missing.is_empty() {
                record(
                    packages,
                    meta,
                    pkg_idx,
                    iface_idx,
                    &iface_key,
                    false,
                    matched,
                    missing,
                );
            }
        }
    }

    let total: usize = packages
        .iter()
        .flat_map(|p| p.interfaces.iter())
        .map(|i| i.implementations.len())
        .sum();
    debug!("implementation discovery recorded {} candidates", total);
}

fn collect_type_metas(packages: &[PackageInfo], types: Option<&TypeTable>) -> Vec<TypeMeta> {
    let mut func_meta: FxHashMap<String, (String, String)> = FxHashMap::default();
    for pkg in packages.iter() {
        for func in &pkg.functions {
            func_meta.insert(
                func.key(),
                (func.name.clone(), func.type_signature.clone()),
            );
        }
    }

    let mut metas = Vec::new();
    for (pkg_idx, pkg) in packages.iter().enumerate() {
        for (type_idx, ty) in pkg.types.iter().enumerate() {
            // Interfaces are matched as targets, not as implementors.
            if ty.kind == TypeKind::Interface {
                continue;
            }
            let key = ty.key();
            let mut methods = Vec::new();
            for func_key in &ty.methods {
                if let Some((name, sig)) = func_meta.get(func_key) {
                    methods.push((name.clone(), func_key.clone(), sig.clone()));
                }
            }
            let method_count = match types.and_then(|t| t.method_set(&key)) {
                Some(set) => set.len(),
                None => methods.len(),
            };
            metas.push(TypeMeta {
                key,
                package: ty.package_path.clone(),
                name: ty.name.clone(),
                pkg_idx,
                type_idx,
                methods,
                method_count,
            });
        }
    }
    metas
}

/// Returns (matched interface-method-name → function key, missing names).
fn check_methods(
    meta: &TypeMeta,
    iface_methods: &[MethodSig],
    types: Option<&TypeTable>,
) -> (BTreeMap<String, String>, Vec<String>) {
    let mut matched = BTreeMap::new();
    let mut missing = Vec::new();

    match types {
        Some(table) if table.method_set(&meta.key).is_some() => {
            let missing_names = table.missing_methods(&meta.key, iface_methods);
            for sig in iface_methods {
                if missing_names.contains(&sig.name) {
                    missing.push(sig.name.clone());
                } else {
                    let func_key = meta
                        .methods
                        .iter()
                        .find(|(name, _, _)| *name == sig.name)
                        .map(|(_, key, _)| key.clone())
                        .unwrap_or_else(|| format!("{}.{}", meta.key, sig.name));
                    matched.insert(sig.name.clone(), func_key);
                }
            }
        }
        _ => {
            for sig in iface_methods {
                match meta
                    .methods
                    .iter()
                    .find(|(name, _, found_sig)| *name == sig.name && *found_sig == sig.signature)
                {
                    Some((_, func_key, _)) => {
                        matched.insert(sig.name.clone(), func_key.clone());
                    }
                    None => missing.push(sig.name.clone()),
                }
            }
        }
    }

    (matched, missing)
}

#[allow(clippy::too_many_arguments)]
fn record(
    packages: &mut [PackageInfo],
    meta: &TypeMeta,
    iface_pkg_idx: usize,
    iface_idx: usize,
    iface_key: &str,
    is_complete: bool,
    matched: BTreeMap<String, String>,
    missing: Vec<String>,
) {
    let implementation = Implementation {
        ty: TypeRef::new(&meta.package, &meta.name),
        interface: None,
        is_complete,
        matched_methods: matched,
        missing_methods: missing,
    };
    packages[iface_pkg_idx].interfaces[iface_idx]
        .implementations
        .push(implementation);

    if is_complete {
        let ty = &mut packages[meta.pkg_idx].types[meta.type_idx];
        if !ty.implemented_interfaces.iter().any(|k| k == iface_key) {
            ty.implemented_interfaces.push(iface_key.to_string());
        }
    }
}
