//! Loader-facing source records: the syntax-level view of a package that a
//! `PackageLoader` hands to the parser stage. Declarations keep source order;
//! everything type-checker-derived lives in [`crate::TypeTable`] instead.

use crate::FunctionRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportDecl {
    pub path: String,
    pub alias: Option<String>,
    /// Short name of the imported package as reported by the loader; absent
    /// when only syntax was available.
    pub package_name: Option<String>,
    pub line: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallExpr {
    pub expression: String,
    pub line: u32,
    pub column: u32,
    /// Callee resolved by the type checker, when the loader ran one.
    pub resolved: Option<FunctionRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuncDecl {
    pub name: String,
    /// Receiver type text as written (`*FileWriter`), `None` for free
    /// functions.
    pub receiver: Option<String>,
    pub params_text: String,
    pub results_text: String,
    /// Declaration header as written, body excluded.
    pub signature_text: String,
    pub span: Span,
    pub calls: Vec<CallExpr>,
    pub complexity: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub type_text: String,
    pub tag: Option<String>,
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceMethodDecl {
    pub name: String,
    pub params_text: String,
    pub results_text: String,
}

impl InterfaceMethodDecl {
    /// Textual signature used when no type checker ran.
    pub fn signature(&self) -> String {
        format!("({}) ({})", self.params_text, self.results_text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeShape {
    Struct {
        fields: Vec<FieldDecl>,
    },
    Interface {
        methods: Vec<InterfaceMethodDecl>,
        embeds: Vec<String>,
    },
    Alias {
        target: String,
    },
    Basic {
        underlying: String,
    },
    Other {
        underlying: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub shape: TypeShape,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValueDecl {
    pub name: String,
    pub type_text: Option<String>,
    pub value_text: Option<String>,
    pub line: u32,
}

/// A top-level declaration, in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Decl {
    Func(FuncDecl),
    Type(TypeDecl),
    Const(ValueDecl),
    Var(ValueDecl),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Package short name from the package clause.
    pub package_name: String,
    pub imports: Vec<ImportDecl>,
    pub decls: Vec<Decl>,
    pub line_count: u32,
}

/// One loaded package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceModule {
    pub import_path: String,
    pub short_name: String,
    pub files: Vec<SourceFile>,
    /// Import path → short name for packages the loader resolved.
    pub imported_packages: BTreeMap<String, String>,
}

impl SourceModule {
    pub fn new(import_path: &str, short_name: &str) -> Self {
        Self {
            import_path: import_path.to_string(),
            short_name: short_name.to_string(),
            files: Vec::new(),
            imported_packages: BTreeMap::new(),
        }
    }
}
