//! Import specifier and export name extraction.
//!
//! Pure function over a [`SyntaxTree`]: no filesystem access, no resolution.
//! Specifiers come back exactly as written (`'./util'`, `'react'`), in
//! document order, deduplicated.

use super::syntax::{SyntaxKind, SyntaxNode, SyntaxTree};

/// Module-level facts of one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleFacts {
    /// Raw module specifiers from static imports, re-exports, `require`
    /// calls and dynamic `import()`
    pub specifiers: Vec<String>,
    /// Exported names; `"default"` for default exports, `"*"` for star re-exports
    pub exports: Vec<String>,
}

impl ModuleFacts {
    fn add_specifier(&mut self, spec: &str) {
        if !spec.is_empty() && !self.specifiers.iter().any(|s| s == spec) {
            self.specifiers.push(spec.to_string());
        }
    }

    fn add_export(&mut self, name: &str) {
        if !name.is_empty() && !self.exports.iter().any(|e| e == name) {
            self.exports.push(name.to_string());
        }
    }
}

pub fn extract_module_facts(tree: &SyntaxTree) -> ModuleFacts {
    let mut facts = ModuleFacts::default();

    tree.root().walk(|node| match node.kind() {
        SyntaxKind::ImportDecl => {
            if let Some(source) = module_source(node) {
                if let Some(spec) = tree.string_value(source) {
                    facts.add_specifier(spec);
                }
            }
        }
        SyntaxKind::ExportDecl => {
            if let Some(source) = node.child_by_field("source") {
                if let Some(spec) = tree.string_value(source) {
                    facts.add_specifier(spec);
                }
            }
            collect_export_names(tree, node, &mut facts);
        }
        SyntaxKind::Call => {
            if let Some(spec) = call_specifier(tree, node) {
                facts.add_specifier(spec);
            }
        }
        SyntaxKind::Assignment => {
            if let Some(name) = commonjs_export(tree, node) {
                facts.add_export(&name);
            }
        }
        _ => {}
    });

    facts
}

/// The `source` string of an import, including TS `import x = require('y')`.
fn module_source(import: &SyntaxNode) -> Option<&SyntaxNode> {
    import.child_by_field("source").or_else(|| {
        import
            .find_child(SyntaxKind::ImportRequireClause)
            .and_then(|clause| clause.child_by_field("source").or_else(|| clause.find_child(SyntaxKind::StringLiteral)))
    })
}

/// `require('x')` or `import('x')` with a literal first argument.
fn call_specifier<'t>(tree: &'t SyntaxTree, call: &SyntaxNode) -> Option<&'t str> {
    let callee = call.child_by_field("function")?;
    let is_loader = match callee.kind() {
        SyntaxKind::DynamicImport => true,
        SyntaxKind::Identifier => tree.text(callee) == "require",
        _ => false,
    };
    if !is_loader {
        return None;
    }
    let args = call.child_by_field("arguments")?;
    let first = args.children().first()?;
    tree.string_value(first)
}

fn collect_export_names(tree: &SyntaxTree, export: &SyntaxNode, facts: &mut ModuleFacts) {
    if export.has_child(SyntaxKind::DefaultKeyword) {
        facts.add_export("default");
        return;
    }

    if export.has_child(SyntaxKind::Star) {
        facts.add_export("*");
    }

    if let Some(ns) = export.find_child(SyntaxKind::NamespaceExport) {
        if let Some(name) = ns.children().last() {
            facts.add_export(name_text(tree, name));
        }
    }

    if let Some(clause) = export.find_child(SyntaxKind::ExportClause) {
        clause.for_each_child(|spec| {
            if spec.kind() != SyntaxKind::ExportSpecifier {
                return;
            }
            let exported = spec.child_by_field("alias").or_else(|| spec.child_by_field("name"));
            if let Some(exported) = exported {
                facts.add_export(name_text(tree, exported));
            }
        });
    }

    if let Some(decl) = export.child_by_field("declaration") {
        declaration_names(tree, decl, facts);
    }
}

fn declaration_names(tree: &SyntaxTree, decl: &SyntaxNode, facts: &mut ModuleFacts) {
    match decl.kind() {
        SyntaxKind::FunctionDecl
        | SyntaxKind::ClassDecl
        | SyntaxKind::InterfaceDecl
        | SyntaxKind::TypeAliasDecl
        | SyntaxKind::EnumDecl
        | SyntaxKind::NamespaceDecl => {
            if let Some(name) = decl.child_by_field("name") {
                facts.add_export(name_text(tree, name));
            }
        }
        SyntaxKind::VariableDecl => {
            decl.for_each_child(|declarator| {
                if declarator.kind() != SyntaxKind::VariableDeclarator {
                    return;
                }
                if let Some(name) = declarator.child_by_field("name") {
                    binding_names(tree, name, facts);
                }
            });
        }
        // `export declare function f(): void;`
        SyntaxKind::AmbientDecl => {
            decl.for_each_child(|inner| declaration_names(tree, inner, facts));
        }
        _ => {}
    }
}

/// Names bound by an identifier or a destructuring pattern.
fn binding_names(tree: &SyntaxTree, pattern: &SyntaxNode, facts: &mut ModuleFacts) {
    match pattern.kind() {
        SyntaxKind::Identifier => facts.add_export(tree.text(pattern)),
        SyntaxKind::ObjectPattern | SyntaxKind::ArrayPattern => pattern.walk(|n| {
            // property keys (`{ key: local }`) are not bindings
            if n.kind() == SyntaxKind::Identifier && n.raw_kind() != "property_identifier" {
                facts.add_export(tree.text(n));
            }
        }),
        _ => {}
    }
}

/// `module.exports = x` → "default"; `exports.a = x` / `module.exports.a = x` → "a".
fn commonjs_export(tree: &SyntaxTree, assignment: &SyntaxNode) -> Option<String> {
    let left = assignment.child_by_field("left")?;
    if left.kind() != SyntaxKind::MemberAccess {
        return None;
    }
    let target = tree.text(left).replace(char::is_whitespace, "");
    if target == "module.exports" {
        return Some("default".to_string());
    }
    let property = target
        .strip_prefix("module.exports.")
        .or_else(|| target.strip_prefix("exports."))?;
    if !property.is_empty() && property.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$') {
        Some(property.to_string())
    } else {
        None
    }
}

fn name_text<'t>(tree: &'t SyntaxTree, node: &SyntaxNode) -> &'t str {
    tree.string_value(node).unwrap_or_else(|| tree.text(node))
}
