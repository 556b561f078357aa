//! Generic immutable syntax tree.
//!
//! Converted once from a tree-sitter parse. Grammar-specific node names are
//! normalized into [`SyntaxKind`] so extraction code never matches on a
//! particular parser's vocabulary. Only named nodes are kept, plus the two
//! anonymous tokens whose presence changes export meaning (`default`, `*`).

use std::ops::Range;

use super::Language;

/// Normalized node kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    Program,
    ImportDecl,
    ImportRequireClause,
    ExportDecl,
    ExportClause,
    ExportSpecifier,
    NamespaceExport,
    /// The `import` callee of a dynamic `import("x")`
    DynamicImport,
    Call,
    Arguments,
    StringLiteral,
    TemplateString,
    TemplateSubstitution,
    Identifier,
    MemberAccess,
    Assignment,
    FunctionDecl,
    ClassDecl,
    VariableDecl,
    VariableDeclarator,
    InterfaceDecl,
    TypeAliasDecl,
    EnumDecl,
    NamespaceDecl,
    AmbientDecl,
    ObjectPattern,
    ArrayPattern,
    DefaultKeyword,
    Star,
    Error,
    Other,
}

/// Map a JavaScript/TypeScript grammar node kind to a [`SyntaxKind`].
pub fn normalize_kind(raw: &str) -> SyntaxKind {
    match raw {
        "program" => SyntaxKind::Program,
        "import_statement" => SyntaxKind::ImportDecl,
        "import_require_clause" => SyntaxKind::ImportRequireClause,
        "export_statement" => SyntaxKind::ExportDecl,
        "export_clause" => SyntaxKind::ExportClause,
        "export_specifier" => SyntaxKind::ExportSpecifier,
        "namespace_export" => SyntaxKind::NamespaceExport,
        "import" => SyntaxKind::DynamicImport,
        "call_expression" => SyntaxKind::Call,
        "arguments" => SyntaxKind::Arguments,
        "string" => SyntaxKind::StringLiteral,
        "template_string" => SyntaxKind::TemplateString,
        "template_substitution" => SyntaxKind::TemplateSubstitution,
        "identifier"
        | "property_identifier"
        | "type_identifier"
        | "shorthand_property_identifier"
        | "shorthand_property_identifier_pattern" => SyntaxKind::Identifier,
        "member_expression" => SyntaxKind::MemberAccess,
        "assignment_expression" => SyntaxKind::Assignment,
        "function_declaration"
        | "generator_function_declaration"
        | "function_signature"
        | "function" => SyntaxKind::FunctionDecl,
        "class_declaration" | "abstract_class_declaration" | "class" => SyntaxKind::ClassDecl,
        "lexical_declaration" | "variable_declaration" => SyntaxKind::VariableDecl,
        "variable_declarator" => SyntaxKind::VariableDeclarator,
        "interface_declaration" => SyntaxKind::InterfaceDecl,
        "type_alias_declaration" => SyntaxKind::TypeAliasDecl,
        "enum_declaration" => SyntaxKind::EnumDecl,
        "internal_module" | "module" => SyntaxKind::NamespaceDecl,
        "ambient_declaration" => SyntaxKind::AmbientDecl,
        "object_pattern" => SyntaxKind::ObjectPattern,
        "array_pattern" => SyntaxKind::ArrayPattern,
        "default" => SyntaxKind::DefaultKeyword,
        "*" => SyntaxKind::Star,
        "ERROR" => SyntaxKind::Error,
        _ => SyntaxKind::Other,
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    kind: SyntaxKind,
    raw_kind: &'static str,
    field: Option<&'static str>,
    range: Range<usize>,
    children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    /// Grammar node name, for diagnostics and rare disambiguation.
    pub fn raw_kind(&self) -> &'static str {
        self.raw_kind
    }

    /// Field name this node occupies in its parent, if any.
    pub fn field(&self) -> Option<&'static str> {
        self.field
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.range.clone()
    }

    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    pub fn for_each_child(&self, f: impl FnMut(&SyntaxNode)) {
        self.children.iter().for_each(f);
    }

    pub fn child_by_field(&self, field: &str) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.field == Some(field))
    }

    pub fn find_child(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn has_child(&self, kind: SyntaxKind) -> bool {
        self.find_child(kind).is_some()
    }

    /// Pre-order traversal of this node and all descendants.
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(&'a SyntaxNode)) {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            visit(node);
            stack.extend(node.children.iter().rev());
        }
    }

    /// First descendant (pre-order, excluding self) matching `pred`.
    pub fn find_descendant(&self, pred: impl Fn(&SyntaxNode) -> bool) -> Option<&SyntaxNode> {
        let mut stack: Vec<&SyntaxNode> = self.children.iter().rev().collect();
        while let Some(node) = stack.pop() {
            if pred(node) {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }

    fn leaf(node: &tree_sitter::Node, field: Option<&'static str>) -> Self {
        let raw_kind = node.kind();
        Self {
            kind: normalize_kind(raw_kind),
            raw_kind,
            field,
            range: node.start_byte()..node.end_byte(),
            children: Vec::new(),
        }
    }
}

/// A parsed file: the owned source text plus its generic tree.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    language: Language,
    has_errors: bool,
    root: SyntaxNode,
}

fn keep(node: &tree_sitter::Node) -> bool {
    node.is_named() || matches!(node.kind(), "default" | "*")
}

impl SyntaxTree {
    /// Convert a tree-sitter tree without recursion, so deeply nested
    /// expressions cannot exhaust a worker thread's stack.
    pub fn from_tree_sitter(tree: &tree_sitter::Tree, source: String, language: Language) -> Self {
        let ts_root = tree.root_node();
        let has_errors = ts_root.has_error();
        let mut stack = vec![SyntaxNode::leaf(&ts_root, None)];
        let mut cursor = ts_root.walk();

        if cursor.goto_first_child() {
            'outer: loop {
                let node = cursor.node();
                if keep(&node) {
                    stack.push(SyntaxNode::leaf(&node, cursor.field_name()));
                    if cursor.goto_first_child() {
                        continue;
                    }
                    attach_top(&mut stack);
                }

                loop {
                    if cursor.goto_next_sibling() {
                        break;
                    }
                    if !cursor.goto_parent() || stack.len() == 1 {
                        break 'outer;
                    }
                    attach_top(&mut stack);
                }
            }
        }

        while stack.len() > 1 {
            attach_top(&mut stack);
        }
        let root = stack.pop().unwrap_or_else(|| SyntaxNode::leaf(&ts_root, None));

        Self {
            source,
            language,
            has_errors,
            root,
        }
    }

    pub fn root(&self) -> &SyntaxNode {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// The parse recovered from at least one syntax error.
    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn text(&self, node: &SyntaxNode) -> &str {
        self.source.get(node.byte_range()).unwrap_or("")
    }

    /// Unquoted value of a string literal, or of a template string without
    /// substitutions. `None` for anything dynamic.
    pub fn string_value(&self, node: &SyntaxNode) -> Option<&str> {
        match node.kind() {
            SyntaxKind::StringLiteral => strip_quotes(self.text(node), &['\'', '"']),
            SyntaxKind::TemplateString if !node.has_child(SyntaxKind::TemplateSubstitution) => {
                strip_quotes(self.text(node), &['`'])
            }
            _ => None,
        }
    }
}

fn attach_top(stack: &mut Vec<SyntaxNode>) {
    if stack.len() < 2 {
        return;
    }
    if let Some(done) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            parent.children.push(done);
        }
    }
}

fn strip_quotes<'a>(text: &'a str, quotes: &[char]) -> Option<&'a str> {
    let first = text.chars().next()?;
    if text.len() < 2 || !quotes.contains(&first) || !text.ends_with(first) {
        return None;
    }
    text.get(1..text.len() - 1)
}
