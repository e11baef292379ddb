//! Rapid Type Analysis over the IR program: starting from the entry points,
//! track the set of concretely instantiated types and resolve interface
//! calls only to implementations whose concrete type has been observed.

use rustc_hash::{FxHashMap, FxHashSet};
use srcgraph_core::{CallGraph, CallGraphEdge, IrCallTarget, IrFuncId, IrProgram};
use std::collections::VecDeque;
use tracing::debug;

pub fn build_call_graph(
    ir: &IrProgram,
    implementations: &FxHashMap<String, Vec<String>>,
    main_packages: &FxHashSet<String>,
) -> CallGraph {
    let mut entries: Vec<IrFuncId> = ir
        .ids()
        .filter(|&id| {
            let f = ir.func(id);
            let is_main =
                f.receiver.is_none() && f.name == "main" && main_packages.contains(&f.package);
            is_main || f.is_init()
        })
        .collect();
    if entries.is_empty() {
        entries = ir.ids().filter(|&id| ir.func(id).is_exported()).collect();
    }
    debug!("call graph construction from {} entry points", entries.len());

    // Concrete type → interfaces it implements, for pending-call resolution.
    let mut interfaces_of: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for (iface, types) in implementations {
        for ty in types {
            interfaces_of
                .entry(ty.as_str())
                .or_default()
                .push(iface.as_str());
        }
    }

    let mut reachable: FxHashSet<IrFuncId> = FxHashSet::default();
    let mut instantiated: FxHashSet<String> = FxHashSet::default();
    // Interface key → unresolved dynamic calls awaiting new types.
    let mut pending: FxHashMap<String, Vec<(IrFuncId, String, u32)>> = FxHashMap::default();
    let mut edge_set: FxHashSet<(IrFuncId, IrFuncId)> = FxHashSet::default();
    let mut edges: Vec<CallGraphEdge> = Vec::new();
    let mut worklist: VecDeque<IrFuncId> = entries.into_iter().collect();

    let add_edge = |edges: &mut Vec<CallGraphEdge>,
                        edge_set: &mut FxHashSet<(IrFuncId, IrFuncId)>,
                        worklist: &mut VecDeque<IrFuncId>,
                        caller: IrFuncId,
                        callee: IrFuncId,
                        line: u32| {
        if edge_set.insert((caller, callee)) {
            edges.push(CallGraphEdge {
                caller,
                callee,
                line,
            });
        }
        worklist.push_back(callee);
    };

    while let Some(id) = worklist.pop_front() {
        if !reachable.insert(id) {
            continue;
        }
        let func = ir.func(id);

        for ty in &func.instantiated {
            if !instantiated.insert(ty.clone()) {
                continue;
            }
            // A newly observed type may satisfy interface calls seen earlier.
            let Some(ifaces) = interfaces_of.get(ty.as_str()) else {
                continue;
            };
            for iface in ifaces {
                let Some(calls) = pending.get(*iface) else {
                    continue;
                };
                for (caller, method, line) in calls.clone() {
                    if let Some(callee) = ir.method_on(ty, &method) {
                        add_edge(&mut edges, &mut edge_set, &mut worklist, caller, callee, line);
                    }
                }
            }
        }

        for call in &func.calls {
            match &call.target {
                IrCallTarget::Direct(callee) => {
                    add_edge(&mut edges, &mut edge_set, &mut worklist, id, *callee, call.line);
                }
                IrCallTarget::Interface { interface, method } => {
                    if let Some(types) = implementations.get(interface) {
                        for ty in types {
                            if !instantiated.contains(ty) {
                                continue;
                            }
                            if let Some(callee) = ir.method_on(ty, method) {
                                add_edge(
                                    &mut edges,
                                    &mut edge_set,
                                    &mut worklist,
                                    id,
                                    callee,
                                    call.line,
                                );
                            }
                        }
                    }
                    pending
                        .entry(interface.clone())
                        .or_default()
                        .push((id, method.clone(), call.line));
                }
            }
        }
    }

    debug!(
        "call graph: {} edges over {} reachable functions",
        edges.len(),
        reachable.len()
    );
    CallGraph { edges }
}
