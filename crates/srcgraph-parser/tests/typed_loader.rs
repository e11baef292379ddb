//! Parser-stage tests against a fixture loader that supplies full
//! type-checker output and an IR program, the way a real type-checking
//! loader would.

use async_trait::async_trait;
use srcgraph_core::{
    CallExpr, Decl, FuncDecl, FunctionRef, InterfaceMethodDecl, IrCall, IrCallTarget, IrFunction,
    IrProgram, LoadOptions, LoadOutput, MethodSet, MethodSig, PackageLoader, Result, SourceFile,
    SourceModule, Span, TypeDecl, TypeShape, TypeTable, ValueDecl,
};
use srcgraph_parser::SourceParser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

struct TypedLoader {
    output: LoadOutput,
}

#[async_trait]
impl PackageLoader for TypedLoader {
    async fn load(
        &self,
        _project_root: &Path,
        _options: &LoadOptions,
        _cancel: &CancellationToken,
    ) -> Result<LoadOutput> {
        Ok(self.output.clone())
    }
}

fn span(start: u32, end: u32) -> Span {
    Span {
        start_line: start,
        start_column: 1,
        end_line: end,
        end_column: 1,
    }
}

fn write_sig() -> String {
    "([]byte) (int, error)".to_string()
}

fn fixture_output() -> LoadOutput {
    let mut main_module = SourceModule::new("app", "main");
    main_module
        .imported_packages
        .insert("app/store".to_string(), "store".to_string());
    main_module.files.push(SourceFile {
        path: PathBuf::from("/proj/main.go"),
        package_name: "main".to_string(),
        imports: vec![srcgraph_core::ImportDecl {
            path: "app/store".to_string(),
            alias: None,
            package_name: Some("store".to_string()),
            line: 3,
        }],
        decls: vec![Decl::Func(FuncDecl {
            name: "main".to_string(),
            receiver: None,
            params_text: String::new(),
            results_text: String::new(),
            signature_text: "func main()".to_string(),
            span: span(5, 9),
            calls: vec![
                CallExpr {
                    expression: "store.NewFileWriter".to_string(),
                    line: 6,
                    column: 7,
                    resolved: Some(FunctionRef::free("app/store", "NewFileWriter")),
                },
                CallExpr {
                    expression: "w.Write".to_string(),
                    line: 7,
                    column: 2,
                    resolved: Some(FunctionRef::method("app/store", "FileWriter", "Write")),
                },
            ],
            complexity: Some(1.0),
        })],
        line_count: 10,
    });

    let mut store_module = SourceModule::new("app/store", "store");
    store_module.files.push(SourceFile {
        path: PathBuf::from("/proj/store/store.go"),
        package_name: "store".to_string(),
        imports: Vec::new(),
        decls: vec![
            Decl::Const(ValueDecl {
                name: "DefaultMode".to_string(),
                type_text: None,
                value_text: Some("0o644".to_string()),
                line: 3,
            }),
            Decl::Type(TypeDecl {
                name: "Writer".to_string(),
                shape: TypeShape::Interface {
                    methods: vec![InterfaceMethodDecl {
                        name: "Write".to_string(),
                        params_text: "[]byte".to_string(),
                        results_text: "int, error".to_string(),
                    }],
                    embeds: Vec::new(),
                },
                span: span(5, 7),
            }),
            Decl::Type(TypeDecl {
                name: "FileWriter".to_string(),
                shape: TypeShape::Struct { fields: Vec::new() },
                span: span(9, 9),
            }),
            Decl::Func(FuncDecl {
                name: "NewFileWriter".to_string(),
                receiver: None,
                params_text: String::new(),
                results_text: "*FileWriter".to_string(),
                signature_text: "func NewFileWriter() *FileWriter".to_string(),
                span: span(11, 13),
                calls: Vec::new(),
                complexity: Some(1.0),
            }),
            Decl::Func(FuncDecl {
                name: "Write".to_string(),
                receiver: Some("*FileWriter".to_string()),
                params_text: "[]byte".to_string(),
                results_text: "int, error".to_string(),
                signature_text: "func (w *FileWriter) Write(p []byte) (int, error)".to_string(),
                span: span(15, 17),
                calls: Vec::new(),
                complexity: Some(1.0),
            }),
        ],
        line_count: 18,
    });

    let mut types = TypeTable::new();
    types.method_sets.insert(
        "app/store.FileWriter".to_string(),
        MethodSet {
            value_methods: Vec::new(),
            pointer_methods: vec![MethodSig {
                name: "Write".to_string(),
                signature: write_sig(),
            }],
        },
    );
    types.method_sets.insert(
        "app/store.Writer".to_string(),
        MethodSet {
            value_methods: vec![MethodSig {
                name: "Write".to_string(),
                signature: write_sig(),
            }],
            pointer_methods: Vec::new(),
        },
    );
    types.signatures.insert(
        "app/store.FileWriter.Write".to_string(),
        "func([]byte) (int, error)".to_string(),
    );
    types.signatures.insert(
        "app/store.NewFileWriter".to_string(),
        "func() *app/store.FileWriter".to_string(),
    );
    types
        .const_values
        .insert("app/store.DefaultMode".to_string(), "420".to_string());
    types.receiver_types.insert(
        "*FileWriter".to_string(),
        "app/store.FileWriter".to_string(),
    );

    let mut ir = IrProgram::new();
    let ir_main = ir.add_function(IrFunction {
        package: "app".to_string(),
        name: "main".to_string(),
        receiver: None,
        file: Some(PathBuf::from("/proj/main.go")),
        line: 5,
        calls: Vec::new(),
        instantiated: vec!["app/store.FileWriter".to_string()],
    });
    let ir_new = ir.add_function(IrFunction {
        package: "app/store".to_string(),
        name: "NewFileWriter".to_string(),
        receiver: None,
        file: Some(PathBuf::from("/proj/store/store.go")),
        line: 11,
        calls: Vec::new(),
        instantiated: vec!["app/store.FileWriter".to_string()],
    });
    let _ir_write = ir.add_function(IrFunction {
        package: "app/store".to_string(),
        name: "Write".to_string(),
        receiver: Some("FileWriter".to_string()),
        file: Some(PathBuf::from("/proj/store/store.go")),
        line: 15,
        calls: Vec::new(),
        instantiated: Vec::new(),
    });
    ir.func_mut(ir_main).calls.push(IrCall {
        target: IrCallTarget::Direct(ir_new),
        line: 6,
    });
    ir.func_mut(ir_main).calls.push(IrCall {
        target: IrCallTarget::Interface {
            interface: "app/store.Writer".to_string(),
            method: "Write".to_string(),
        },
        line: 7,
    });

    LoadOutput {
        modules: vec![main_module, store_module],
        types: Some(types),
        ir: Some(ir),
        errors: Vec::new(),
    }
}

async fn parse_fixture() -> srcgraph_core::ParseResult {
    let dir = tempfile::tempdir().unwrap();
    let parser = SourceParser::new(TypedLoader {
        output: fixture_output(),
    });
    let result = parser
        .parse_project(dir.path(), &CancellationToken::new())
        .await
        .unwrap();
    drop(dir);
    result
}

#[tokio::test]
async fn checker_signatures_and_receivers_are_attached() {
    let result = parse_fixture().await;

    let store = result
        .packages
        .iter()
        .find(|p| p.import_path == "app/store")
        .unwrap();
    let write = store.functions.iter().find(|f| f.name == "Write").unwrap();
    assert_eq!(
        write.signature.as_deref(),
        Some("func([]byte) (int, error)")
    );
    assert_eq!(
        write.receiver.as_ref().unwrap().type_key.as_deref(),
        Some("app/store.FileWriter")
    );

    let constant = &store.constants[0];
    assert_eq!(constant.checker_value.as_deref(), Some("420"));
    assert_eq!(constant.value_text.as_deref(), Some("0o644"));
}

#[tokio::test]
async fn subtype_check_uses_the_checker_method_sets() {
    let result = parse_fixture().await;

    let writer = result
        .interfaces
        .iter()
        .find(|i| i.name == "Writer")
        .unwrap();
    assert_eq!(writer.implementations.len(), 1);
    let implementation = &writer.implementations[0];
    assert!(implementation.is_complete);
    assert_eq!(implementation.ty.key(), "app/store.FileWriter");
    assert_eq!(
        implementation
            .matched_methods
            .get("Write")
            .map(String::as_str),
        Some("app/store.FileWriter.Write")
    );
}

#[tokio::test]
async fn functions_link_to_the_ir_table() {
    let result = parse_fixture().await;

    let ir = result.ir.as_ref().unwrap();
    for pkg in &result.packages {
        assert!(pkg.has_ir, "package {} missed IR linking", pkg.import_path);
        for func in &pkg.functions {
            let id = func.ir.expect("function should link to IR");
            assert_eq!(ir.func(id).key(), func.key());
        }
    }
}

#[tokio::test]
async fn rta_resolves_dynamic_dispatch_to_instantiated_types() {
    let result = parse_fixture().await;

    let ir = result.ir.as_ref().unwrap();
    let graph = result.call_graph.as_ref().unwrap();
    let keys: Vec<(String, String)> = graph
        .edges
        .iter()
        .map(|e| (ir.func(e.caller).key(), ir.func(e.callee).key()))
        .collect();

    assert!(keys.contains(&("app.main".to_string(), "app/store.NewFileWriter".to_string())));
    assert!(keys.contains(&(
        "app.main".to_string(),
        "app/store.FileWriter.Write".to_string()
    )));
}
