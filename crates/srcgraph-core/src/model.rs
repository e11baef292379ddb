use crate::TypeKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// AL exported-name convention: a leading uppercase letter.
pub fn is_exported_name(name: &str) -> bool {
    name.chars().next().map_or(false, |c| c.is_uppercase())
}

/// Identity of a function or method, qualified by package and receiver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionRef {
    pub package: String,
    pub receiver: Option<String>,
    pub name: String,
}

impl FunctionRef {
    pub fn free(package: &str, name: &str) -> Self {
        Self {
            package: package.to_string(),
            receiver: None,
            name: name.to_string(),
        }
    }

    pub fn method(package: &str, receiver: &str, name: &str) -> Self {
        Self {
            package: package.to_string(),
            receiver: Some(receiver.to_string()),
            name: name.to_string(),
        }
    }

    /// `"<pkg>.[<recv>.]<name>"`, the identity used by every cross-link map.
    pub fn key(&self) -> String {
        match &self.receiver {
            Some(recv) => format!("{}.{}.{}", self.package, recv, self.name),
            None => format!("{}.{}", self.package, self.name),
        }
    }
}

/// Identity of a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub package: String,
    pub name: String,
}

impl TypeRef {
    pub fn new(package: &str, name: &str) -> Self {
        Self {
            package: package.to_string(),
            name: name.to_string(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterfaceRef {
    pub package: String,
    pub name: String,
}

impl InterfaceRef {
    pub fn new(package: &str, name: &str) -> Self {
        Self {
            package: package.to_string(),
            name: name.to_string(),
        }
    }

    pub fn key(&self) -> String {
        format!("{}.{}", self.package, self.name)
    }
}

/// How an import's package short name was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportNameSource {
    /// Reported by the loader.
    Resolved,
    /// Last path segment; directories and package names may disagree.
    Heuristic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportInfo {
    pub path: String,
    pub alias: Option<String>,
    pub package_name: String,
    pub name_source: ImportNameSource,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: PathBuf,
    pub package_name: String,
    pub imports: Vec<ImportInfo>,
    /// Deduplicated import paths, in first-seen order.
    pub dependencies: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSite {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
    pub expression: Option<String>,
    /// Resolved callee when type information was available at parse time.
    pub target: Option<FunctionRef>,
}

/// Receiver of a method: normalized text plus a handle to the named type
/// when it resolves inside the parsed project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverRef {
    /// Receiver type text as written, e.g. `*FileWriter`.
    pub text: String,
    /// Base name with pointer and package decoration stripped.
    pub base_name: String,
    /// `"<pkg>.<base>"` when the named type exists in the parse result.
    pub type_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionInfo {
    pub name: String,
    pub package_path: String,
    /// File the declaration lives in.
    pub file: PathBuf,
    pub receiver: Option<ReceiverRef>,
    /// Declaration text as written in source.
    pub signature_text: String,
    /// Canonical signature from the type checker, when available.
    pub signature: Option<String>,
    /// Parameter/result type strings extracted syntactically, for the
    /// comparison fallback when no checker ran.
    pub type_signature: String,
    pub line_start: u32,
    pub line_end: u32,
    pub is_exported: bool,
    pub calls: Vec<CallSite>,
    pub complexity: Option<f32>,
    /// Handle into the IR function table, when IR was loaded.
    pub ir: Option<crate::IrFuncId>,
}

impl FunctionInfo {
    pub fn func_ref(&self) -> FunctionRef {
        FunctionRef {
            package: self.package_path.clone(),
            receiver: self.receiver.as_ref().map(|r| r.base_name.clone()),
            name: self.name.clone(),
        }
    }

    pub fn key(&self) -> String {
        self.func_ref().key()
    }

    pub fn is_method(&self) -> bool {
        self.receiver.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    pub type_text: String,
    pub tag: Option<String>,
    pub is_exported: bool,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeInfo {
    pub name: String,
    pub package_path: String,
    pub file: PathBuf,
    pub kind: TypeKind,
    pub underlying: String,
    pub fields: Vec<FieldInfo>,
    /// Function keys of attached methods, identity links into the owning
    /// package's function list.
    pub methods: Vec<String>,
    pub embeds: Vec<String>,
    /// Interface keys this type was found to implement.
    pub implemented_interfaces: Vec<String>,
    pub is_exported: bool,
    pub line_start: u32,
    pub line_end: u32,
}

impl TypeInfo {
    pub fn type_ref(&self) -> TypeRef {
        TypeRef::new(&self.package_path, &self.name)
    }

    pub fn key(&self) -> String {
        self.type_ref().key()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    pub signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    pub ty: TypeRef,
    /// Owning interface; filled by the analyzer when flattening, implied by
    /// the enclosing `InterfaceInfo` on the parser record.
    pub interface: Option<InterfaceRef>,
    pub is_complete: bool,
    /// Interface method name → implementing function key.
    pub matched_methods: BTreeMap<String, String>,
    pub missing_methods: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceInfo {
    pub name: String,
    pub package_path: String,
    /// Flattened method set, embeds expanded.
    pub methods: Vec<MethodSig>,
    pub embeds: Vec<String>,
    pub implementations: Vec<Implementation>,
    pub line_start: u32,
    pub line_end: u32,
    pub is_exported: bool,
}

impl InterfaceInfo {
    pub fn interface_ref(&self) -> InterfaceRef {
        InterfaceRef::new(&self.package_path, &self.name)
    }

    pub fn key(&self) -> String {
        self.interface_ref().key()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallChain {
    pub caller: FunctionRef,
    pub callee: FunctionRef,
    pub sites: Vec<CallSite>,
    pub is_recursive: bool,
}

impl CallChain {
    pub fn new(caller: FunctionRef, callee: FunctionRef, sites: Vec<CallSite>) -> Self {
        let is_recursive = caller.key() == callee.key();
        Self {
            caller,
            callee,
            sites,
            is_recursive,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueInfo {
    pub name: String,
    pub package_path: String,
    pub file: PathBuf,
    pub type_text: Option<String>,
    /// Initializer text from the AST.
    pub value_text: Option<String>,
    /// Statically folded value from the type checker, when provided.
    pub checker_value: Option<String>,
    pub line: u32,
    pub is_exported: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub preparation: Duration,
    pub construction: Duration,
    pub start_memory_bytes: u64,
    pub end_memory_bytes: u64,
    pub peak_memory_bytes: u64,
    pub files_per_second: f64,
    pub lines_per_second: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub import_path: String,
    pub short_name: String,
    pub files: Vec<FileInfo>,
    pub functions: Vec<FunctionInfo>,
    pub types: Vec<TypeInfo>,
    pub interfaces: Vec<InterfaceInfo>,
    pub constants: Vec<ValueInfo>,
    pub variables: Vec<ValueInfo>,
    /// Whether at least one function in this package linked to the IR.
    pub has_ir: bool,
}

impl PackageInfo {
    pub fn new(import_path: &str, short_name: &str) -> Self {
        Self {
            import_path: import_path.to_string(),
            short_name: short_name.to_string(),
            files: Vec::new(),
            functions: Vec::new(),
            types: Vec::new(),
            interfaces: Vec::new(),
            constants: Vec::new(),
            variables: Vec::new(),
            has_ir: false,
        }
    }
}

/// Output of the parser stage.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub project_root: PathBuf,
    /// Ordered by import path.
    pub packages: Vec<PackageInfo>,
    /// All interfaces across packages, aggregated for convenience.
    pub interfaces: Vec<InterfaceInfo>,
    pub ir: Option<crate::IrProgram>,
    pub call_graph: Option<crate::CallGraph>,
    pub stats: Option<PerformanceStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_keys_qualify_receiver() {
        assert_eq!(FunctionRef::free("pkg/a", "Run").key(), "pkg/a.Run");
        assert_eq!(
            FunctionRef::method("pkg/a", "Server", "Run").key(),
            "pkg/a.Server.Run"
        );
    }

    #[test]
    fn call_chain_recursion_is_identity_based() {
        let f = FunctionRef::free("pkg/a", "factorial");
        let chain = CallChain::new(f.clone(), f, Vec::new());
        assert!(chain.is_recursive);

        let chain = CallChain::new(
            FunctionRef::free("pkg/a", "factorial"),
            FunctionRef::free("pkg/b", "factorial"),
            Vec::new(),
        );
        assert!(!chain.is_recursive);
    }

    #[test]
    fn exported_names_start_uppercase() {
        assert!(is_exported_name("Write"));
        assert!(!is_exported_name("write"));
        assert!(!is_exported_name(""));
    }
}
