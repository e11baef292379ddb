//! Syntactic extraction of one AL source file into [`SourceFile`] records
//! using the tree-sitter grammar. Produces no type information; the typed
//! path arrives through an external loader.

use srcgraph_core::source::{
    CallExpr, Decl, FieldDecl, FuncDecl, ImportDecl, InterfaceMethodDecl, SourceFile, Span,
    TypeDecl, TypeShape, ValueDecl,
};
use srcgraph_core::{Result, SrcGraphError};
use std::path::Path;
use tree_sitter::{Node, Parser};

const BUILTIN_TYPES: &[&str] = &[
    "bool", "string", "byte", "rune", "int", "int8", "int16", "int32", "int64", "uint", "uint8",
    "uint16", "uint32", "uint64", "uintptr", "float32", "float64", "complex64", "complex128",
];

/// Parses `content` and extracts every top-level declaration in source
/// order. A tree containing syntax errors is reported as `ParseFailed`.
pub fn parse_source_file(path: &Path, content: &str) -> Result<SourceFile> {
    let mut parser = Parser::new();
    let language = tree_sitter_go::LANGUAGE.into();
    parser
        .set_language(&language)
        .map_err(|e| SrcGraphError::ParseFailed {
            file: path.display().to_string(),
            message: format!("grammar unavailable: {}", e),
        })?;

    let tree = parser
        .parse(content, None)
        .ok_or_else(|| SrcGraphError::ParseFailed {
            file: path.display().to_string(),
            message: "parser returned no tree".to_string(),
        })?;

    if tree.root_node().has_error() {
        return Err(SrcGraphError::ParseFailed {
            file: path.display().to_string(),
            message: "syntax error".to_string(),
        });
    }

    let extractor = Extractor { content };
    let root = tree.root_node();

    let mut package_name = String::new();
    let mut imports = Vec::new();
    let mut decls = Vec::new();

    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "package_clause" => {
                if let Some(name) = extractor.package_identifier(&child) {
                    package_name = name;
                }
            }
            "import_declaration" => extractor.collect_imports(&child, &mut imports),
            "function_declaration" => {
                if let Some(func) = extractor.function(&child, None) {
                    decls.push(Decl::Func(func));
                }
            }
            "method_declaration" => {
                let receiver = extractor.receiver_type_text(&child);
                if let Some(func) = extractor.function(&child, receiver) {
                    decls.push(Decl::Func(func));
                }
            }
            "type_declaration" => extractor.collect_types(&child, &mut decls),
            "const_declaration" => extractor.collect_values(&child, "const_spec", &mut decls, true),
            "var_declaration" => extractor.collect_values(&child, "var_spec", &mut decls, false),
            _ => {}
        }
    }

    Ok(SourceFile {
        path: path.to_path_buf(),
        package_name,
        imports,
        decls,
        line_count: content.lines().count() as u32,
    })
}

struct Extractor<'a> {
    content: &'a str,
}

impl<'a> Extractor<'a> {
    fn text(&self, node: &Node) -> String {
        node.utf8_text(self.content.as_bytes())
            .unwrap_or("")
            .to_string()
    }

    fn span(&self, node: &Node) -> Span {
        Span {
            start_line: node.start_position().row as u32 + 1,
            start_column: node.start_position().column as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            end_column: node.end_position().column as u32 + 1,
        }
    }

    fn package_identifier(&self, node: &Node) -> Option<String> {
        let mut cursor = node.walk();
        let result = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "package_identifier")
            .map(|c| self.text(&c));
        result
    }

    fn collect_imports(&self, node: &Node, out: &mut Vec<ImportDecl>) {
        let mut stack = vec![*node];
        while let Some(current) = stack.pop() {
            let mut cursor = current.walk();
            for child in current.named_children(&mut cursor) {
                match child.kind() {
                    "import_spec" => {
                        if let Some(import) = self.import_spec(&child) {
                            out.push(import);
                        }
                    }
                    "import_spec_list" => stack.push(child),
                    _ => {}
                }
            }
        }
    }

    fn import_spec(&self, node: &Node) -> Option<ImportDecl> {
        let path_node = node.child_by_field_name("path")?;
        let path = self
            .text(&path_node)
            .trim_matches(|c| c == '"' || c == '`')
            .to_string();
        if path.is_empty() {
            return None;
        }
        let alias = node.child_by_field_name("name").map(|n| self.text(&n));
        Some(ImportDecl {
            path,
            alias,
            package_name: None,
            line: node.start_position().row as u32 + 1,
        })
    }

    /// Receiver type text, parens and parameter name stripped: `w *Writer`
    /// inside `(w *Writer)` yields `*Writer`.
    fn receiver_type_text(&self, node: &Node) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut cursor = receiver.walk();
        let param = receiver
            .named_children(&mut cursor)
            .find(|c| c.kind() == "parameter_declaration")?;
        let type_node = param.child_by_field_name("type")?;
        Some(normalize_ws(&self.text(&type_node)))
    }

    fn function(&self, node: &Node, receiver: Option<String>) -> Option<FuncDecl> {
        let name_node = node.child_by_field_name("name")?;
        let name = self.text(&name_node);

        let params = node.child_by_field_name("parameters");
        let params_text = params.map(|p| self.parameter_types(&p)).unwrap_or_default();
        let results_text = self.result_types(node.child_by_field_name("result"));

        let body = node.child_by_field_name("body");
        let signature_text = match &body {
            Some(b) => self.content[node.start_byte()..b.start_byte()]
                .trim_end()
                .to_string(),
            None => self.text(node),
        };

        let mut calls = Vec::new();
        if let Some(body) = &body {
            self.collect_calls(body, &mut calls);
        }

        let complexity = body.map(|b| cyclomatic_complexity(&b));

        Some(FuncDecl {
            name,
            receiver,
            params_text,
            results_text,
            signature_text,
            span: self.span(node),
            calls,
            complexity,
        })
    }

    fn collect_calls(&self, node: &Node, out: &mut Vec<CallExpr>) {
        if node.kind() == "call_expression" {
            if let Some(function) = node.child_by_field_name("function") {
                let expression = normalize_ws(&self.text(&function));
                if !expression.is_empty() {
                    out.push(CallExpr {
                        expression,
                        line: node.start_position().row as u32 + 1,
                        column: node.start_position().column as u32 + 1,
                        resolved: None,
                    });
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_calls(&child, out);
        }
    }

    fn collect_types(&self, node: &Node, out: &mut Vec<Decl>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "type_spec" => {
                    if let Some(decl) = self.type_spec(&child) {
                        out.push(Decl::Type(decl));
                    }
                }
                "type_alias" => {
                    if let Some(decl) = self.type_alias(&child) {
                        out.push(Decl::Type(decl));
                    }
                }
                _ => {}
            }
        }
    }

    fn type_spec(&self, node: &Node) -> Option<TypeDecl> {
        let name = self.text(&node.child_by_field_name("name")?);
        let type_node = node.child_by_field_name("type")?;

        let shape = match type_node.kind() {
            "struct_type" => TypeShape::Struct {
                fields: self.struct_fields(&type_node),
            },
            "interface_type" => {
                let (methods, embeds) = self.interface_members(&type_node);
                TypeShape::Interface { methods, embeds }
            }
            "type_identifier" => {
                let underlying = self.text(&type_node);
                if BUILTIN_TYPES.contains(&underlying.as_str()) {
                    TypeShape::Basic { underlying }
                } else {
                    TypeShape::Other { underlying }
                }
            }
            _ => TypeShape::Other {
                underlying: normalize_ws(&self.text(&type_node)),
            },
        };

        Some(TypeDecl {
            name,
            shape,
            span: self.span(node),
        })
    }

    fn type_alias(&self, node: &Node) -> Option<TypeDecl> {
        let name = self.text(&node.child_by_field_name("name")?);
        let target = node
            .child_by_field_name("type")
            .map(|t| normalize_ws(&self.text(&t)))
            .unwrap_or_default();
        Some(TypeDecl {
            name,
            shape: TypeShape::Alias { target },
            span: self.span(node),
        })
    }

    fn struct_fields(&self, node: &Node) -> Vec<FieldDecl> {
        let mut fields = Vec::new();
        let mut cursor = node.walk();
        let Some(list) = node
            .named_children(&mut cursor)
            .find(|c| c.kind() == "field_declaration_list")
        else {
            return fields;
        };

        let mut list_cursor = list.walk();
        for field in list.named_children(&mut list_cursor) {
            if field.kind() != "field_declaration" {
                continue;
            }
            let type_text = field
                .child_by_field_name("type")
                .map(|t| normalize_ws(&self.text(&t)))
                .unwrap_or_default();
            let tag = field.child_by_field_name("tag").map(|t| {
                self.text(&t)
                    .trim_matches(|c| c == '`' || c == '"')
                    .to_string()
            });

            let mut name_cursor = field.walk();
            let names: Vec<String> = field
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| self.text(&n))
                .collect();

            if names.is_empty() {
                // Embedded field: the name is the base of the type.
                fields.push(FieldDecl {
                    name: base_type_name(&type_text).to_string(),
                    type_text,
                    tag,
                    is_anonymous: true,
                });
            } else {
                for name in names {
                    fields.push(FieldDecl {
                        name,
                        type_text: type_text.clone(),
                        tag: tag.clone(),
                        is_anonymous: false,
                    });
                }
            }
        }
        fields
    }

    fn interface_members(&self, node: &Node) -> (Vec<InterfaceMethodDecl>, Vec<String>) {
        let mut methods = Vec::new();
        let mut embeds = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "method_elem" | "method_spec" => {
                    let Some(name_node) = child.child_by_field_name("name") else {
                        continue;
                    };
                    let params_text = child
                        .child_by_field_name("parameters")
                        .map(|p| self.parameter_types(&p))
                        .unwrap_or_default();
                    let results_text = self.result_types(child.child_by_field_name("result"));
                    methods.push(InterfaceMethodDecl {
                        name: self.text(&name_node),
                        params_text,
                        results_text,
                    });
                }
                "type_elem" | "type_identifier" | "qualified_type" => {
                    let embed = normalize_ws(&self.text(&child));
                    if !embed.is_empty() {
                        embeds.push(embed);
                    }
                }
                _ => {}
            }
        }
        (methods, embeds)
    }

    fn collect_values(&self, node: &Node, spec_kind: &str, out: &mut Vec<Decl>, is_const: bool) {
        let mut cursor = node.walk();
        for spec in node.named_children(&mut cursor) {
            if spec.kind() != spec_kind {
                continue;
            }
            let type_text = spec
                .child_by_field_name("type")
                .map(|t| normalize_ws(&self.text(&t)));

            let mut name_cursor = spec.walk();
            let names: Vec<String> = spec
                .children_by_field_name("name", &mut name_cursor)
                .map(|n| self.text(&n))
                .collect();

            let values: Vec<String> = match spec.child_by_field_name("value") {
                Some(value_node) if value_node.kind() == "expression_list" => {
                    let mut value_cursor = value_node.walk();
                    value_node
                        .named_children(&mut value_cursor)
                        .map(|v| normalize_ws(&self.text(&v)))
                        .collect()
                }
                Some(value_node) => vec![normalize_ws(&self.text(&value_node))],
                None => Vec::new(),
            };

            let line = spec.start_position().row as u32 + 1;
            for (i, name) in names.into_iter().enumerate() {
                let value_text = if values.len() == 1 && i > 0 {
                    // Grouped names sharing one initializer keep the whole text.
                    Some(values[0].clone())
                } else {
                    values.get(i).cloned()
                };
                let decl = ValueDecl {
                    name,
                    type_text: type_text.clone(),
                    value_text,
                    line,
                };
                out.push(if is_const {
                    Decl::Const(decl)
                } else {
                    Decl::Var(decl)
                });
            }
        }
    }

    /// Comma-joined parameter type strings, names dropped so signatures
    /// compare across declaration styles.
    fn parameter_types(&self, params: &Node) -> String {
        let mut types = Vec::new();
        let mut cursor = params.walk();
        for param in params.named_children(&mut cursor) {
            match param.kind() {
                "parameter_declaration" => {
                    let Some(type_node) = param.child_by_field_name("type") else {
                        continue;
                    };
                    let type_text = normalize_ws(&self.text(&type_node));
                    let mut name_cursor = param.walk();
                    let name_count = param
                        .children_by_field_name("name", &mut name_cursor)
                        .count();
                    for _ in 0..name_count.max(1) {
                        types.push(type_text.clone());
                    }
                }
                "variadic_parameter_declaration" => {
                    let type_text = param
                        .child_by_field_name("type")
                        .map(|t| normalize_ws(&self.text(&t)))
                        .unwrap_or_default();
                    types.push(format!("...{}", type_text));
                }
                _ => {}
            }
        }
        types.join(", ")
    }

    fn result_types(&self, result: Option<Node>) -> String {
        match result {
            Some(node) if node.kind() == "parameter_list" => self.parameter_types(&node),
            Some(node) => normalize_ws(&self.text(&node)),
            None => String::new(),
        }
    }
}

/// Cyclomatic complexity: 1 + decision points in the body.
fn cyclomatic_complexity(body: &Node) -> f32 {
    1.0 + count_decision_points(body) as f32
}

fn count_decision_points(node: &Node) -> usize {
    let mut count = match node.kind() {
        "if_statement" | "for_statement" | "expression_case" | "type_case"
        | "communication_case" | "default_case" => 1,
        "binary_expression" => {
            let mut ops = 0;
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                if matches!(child.kind(), "&&" | "||") {
                    ops += 1;
                }
            }
            ops
        }
        _ => 0,
    };

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        count += count_decision_points(&child);
    }
    count
}

/// Strips pointer, slice, and package decoration down to the base name:
/// `*pkg.T`, `[]T`, and `pkg.T` all yield `T`.
pub fn base_type_name(type_text: &str) -> &str {
    let stripped = type_text
        .trim_start_matches('*')
        .trim_start_matches("[]")
        .trim_start_matches('*');
    match stripped.rsplit_once('.') {
        Some((_, base)) => base,
        None => stripped,
    }
}

fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse(content: &str) -> SourceFile {
        parse_source_file(&PathBuf::from("/tmp/fixture.go"), content).unwrap()
    }

    #[test]
    fn extracts_package_imports_and_functions() {
        let file = parse(
            r#"package service

import (
    "fmt"
    log "github.com/acme/logging"
)

func Run(name string) error {
    fmt.Println(name)
    return nil
}
"#,
        );

        assert_eq!(file.package_name, "service");
        assert_eq!(file.imports.len(), 2);
        assert_eq!(file.imports[0].path, "fmt");
        assert_eq!(file.imports[1].path, "github.com/acme/logging");
        assert_eq!(file.imports[1].alias.as_deref(), Some("log"));

        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected function decl");
        };
        assert_eq!(func.name, "Run");
        assert!(func.receiver.is_none());
        assert_eq!(func.params_text, "string");
        assert_eq!(func.results_text, "error");
        assert_eq!(func.calls.len(), 1);
        assert_eq!(func.calls[0].expression, "fmt.Println");
    }

    #[test]
    fn extracts_methods_with_receiver_type() {
        let file = parse(
            r#"package store

type FileWriter struct{}

func (w *FileWriter) Write(p []byte) (int, error) {
    return len(p), nil
}
"#,
        );

        let func = file
            .decls
            .iter()
            .find_map(|d| match d {
                Decl::Func(f) => Some(f),
                _ => None,
            })
            .unwrap();
        assert_eq!(func.name, "Write");
        assert_eq!(func.receiver.as_deref(), Some("*FileWriter"));
        assert_eq!(func.params_text, "[]byte");
        assert_eq!(func.results_text, "int, error");
        assert!(func.signature_text.starts_with("func (w *FileWriter) Write"));
    }

    #[test]
    fn extracts_struct_fields_with_tags_and_embeds() {
        let file = parse(
            r#"package model

type Base struct{}

type User struct {
    Base
    Name string `json:"name"`
    age  int
}
"#,
        );

        let user = file
            .decls
            .iter()
            .find_map(|d| match d {
                Decl::Type(t) if t.name == "User" => Some(t),
                _ => None,
            })
            .unwrap();
        let TypeShape::Struct { fields } = &user.shape else {
            panic!("expected struct shape");
        };
        assert_eq!(fields.len(), 3);
        assert!(fields[0].is_anonymous);
        assert_eq!(fields[0].name, "Base");
        assert_eq!(fields[1].name, "Name");
        assert_eq!(fields[1].tag.as_deref(), Some(r#"json:"name""#));
        assert_eq!(fields[2].name, "age");
    }

    #[test]
    fn extracts_interface_methods_and_embeds() {
        let file = parse(
            r#"package io

type Closer interface {
    Close() error
}

type WriteCloser interface {
    Closer
    Write(p []byte) (n int, err error)
}
"#,
        );

        let wc = file
            .decls
            .iter()
            .find_map(|d| match d {
                Decl::Type(t) if t.name == "WriteCloser" => Some(t),
                _ => None,
            })
            .unwrap();
        let TypeShape::Interface { methods, embeds } = &wc.shape else {
            panic!("expected interface shape");
        };
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "Write");
        assert_eq!(methods[0].params_text, "[]byte");
        assert_eq!(methods[0].results_text, "int, error");
        assert_eq!(embeds, &vec!["Closer".to_string()]);
    }

    #[test]
    fn extracts_consts_and_vars_one_record_per_name() {
        let file = parse(
            r#"package config

const (
    DefaultPort = 8080
    name, kind  = "srv", "web"
)

var Verbose bool
"#,
        );

        let consts: Vec<_> = file
            .decls
            .iter()
            .filter_map(|d| match d {
                Decl::Const(c) => Some(c),
                _ => None,
            })
            .collect();
        assert_eq!(consts.len(), 3);
        assert_eq!(consts[0].name, "DefaultPort");
        assert_eq!(consts[0].value_text.as_deref(), Some("8080"));
        assert_eq!(consts[1].name, "name");
        assert_eq!(consts[1].value_text.as_deref(), Some(r#""srv""#));
        assert_eq!(consts[2].name, "kind");
        assert_eq!(consts[2].value_text.as_deref(), Some(r#""web""#));

        let vars: Vec<_> = file
            .decls
            .iter()
            .filter_map(|d| match d {
                Decl::Var(v) => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(vars.len(), 1);
        assert_eq!(vars[0].name, "Verbose");
        assert_eq!(vars[0].type_text.as_deref(), Some("bool"));
    }

    #[test]
    fn syntax_errors_are_parse_failures() {
        let err = parse_source_file(
            &PathBuf::from("/tmp/broken.go"),
            "package broken\n\nfunc oops( {\n",
        )
        .unwrap_err();
        assert!(matches!(err, SrcGraphError::ParseFailed { .. }));
    }

    #[test]
    fn complexity_counts_branches() {
        let file = parse(
            r#"package c

func branchy(n int) int {
    if n > 0 && n < 10 {
        return n
    }
    for i := 0; i < n; i++ {
        n--
    }
    return n
}
"#,
        );
        let Decl::Func(func) = &file.decls[0] else {
            panic!("expected function");
        };
        // 1 + if + && + for
        assert_eq!(func.complexity, Some(4.0));
    }

    #[test]
    fn base_type_name_strips_decoration() {
        assert_eq!(base_type_name("*pkg.T"), "T");
        assert_eq!(base_type_name("pkg.T"), "T");
        assert_eq!(base_type_name("*T"), "T");
        assert_eq!(base_type_name("[]*T"), "T");
        assert_eq!(base_type_name("T"), "T");
    }
}
