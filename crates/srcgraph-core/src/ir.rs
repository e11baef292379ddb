//! Whole-program intermediate representation handle. Functions live in a
//! pool and are referred to by stable [`IrFuncId`] indices; the side tables
//! make direct and dynamic dispatch resolvable without retained pointers.

use crate::model::is_exported_name;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct IrFuncId(pub usize);

#[derive(Debug, Clone)]
pub enum IrCallTarget {
    /// Statically resolved callee.
    Direct(IrFuncId),
    /// Dynamic dispatch through an interface method.
    Interface { interface: String, method: String },
}

#[derive(Debug, Clone)]
pub struct IrCall {
    pub target: IrCallTarget,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct IrFunction {
    pub package: String,
    pub name: String,
    /// Base name of the receiver type, checker-normalized.
    pub receiver: Option<String>,
    /// Position-table entry for the function body.
    pub file: Option<std::path::PathBuf>,
    pub line: u32,
    pub calls: Vec<IrCall>,
    /// Type keys of concrete types this function instantiates.
    pub instantiated: Vec<String>,
}

impl IrFunction {
    /// `"<pkg>.[<recv>.]<name>"`, matching the parser's function keys.
    pub fn key(&self) -> String {
        match &self.receiver {
            Some(recv) => format!("{}.{}.{}", self.package, recv, self.name),
            None => format!("{}.{}", self.package, self.name),
        }
    }

    pub fn is_init(&self) -> bool {
        self.receiver.is_none() && self.name == "init"
    }

    pub fn is_exported(&self) -> bool {
        is_exported_name(&self.name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IrProgram {
    functions: Vec<IrFunction>,
    index: FxHashMap<String, IrFuncId>,
    /// (type key, method name) → implementing function.
    methods: FxHashMap<(String, String), IrFuncId>,
}

impl IrProgram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_function(&mut self, func: IrFunction) -> IrFuncId {
        let id = IrFuncId(self.functions.len());
        self.index.insert(func.key(), id);
        if let Some(recv) = &func.receiver {
            let type_key = format!("{}.{}", func.package, recv);
            self.methods.insert((type_key, func.name.clone()), id);
        }
        self.functions.push(func);
        id
    }

    pub fn func(&self, id: IrFuncId) -> &IrFunction {
        &self.functions[id.0]
    }

    pub fn func_mut(&mut self, id: IrFuncId) -> &mut IrFunction {
        &mut self.functions[id.0]
    }

    pub fn lookup(&self, key: &str) -> Option<IrFuncId> {
        self.index.get(key).copied()
    }

    /// Implementing function of `method` on the concrete type `type_key`.
    pub fn method_on(&self, type_key: &str, method: &str) -> Option<IrFuncId> {
        self.methods
            .get(&(type_key.to_string(), method.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = IrFuncId> + '_ {
        (0..self.functions.len()).map(IrFuncId)
    }
}

/// Interprocedural call-graph edges produced from the IR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallGraphEdge {
    pub caller: IrFuncId,
    pub callee: IrFuncId,
    pub line: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    pub edges: Vec<CallGraphEdge>,
}
