//! Go source model: tree-sitter parse, position index and call lifting.

pub mod expr;
pub mod lift;
pub mod literal;

use std::path::{Path, PathBuf};

use tree_sitter::{Node, Parser, Tree};

use crate::error::ParseError;

pub use expr::{
    ArrayType, BasicLit, CallExpr, CompositeLit, Expr, ExprList, Ident, ListLayout, LitKind,
    SelectorExpr, Span, Verbatim,
};
pub use literal::{quote, unquote, unquote_or_trim};

/// Create a parser loaded with the Go grammar.
pub fn new_parser() -> Result<Parser, tree_sitter::LanguageError> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_go::LANGUAGE.into())?;
    Ok(parser)
}

// ─── Positions ───────────────────────────────────────────────────────

/// A resolved source position. Line and column are 1-based; column counts bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub filename: PathBuf,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Byte offset → line/column lookup for one buffer.
#[derive(Debug, Clone)]
pub struct PositionIndex {
    filename: PathBuf,
    line_starts: Vec<usize>,
}

impl PositionIndex {
    pub fn new(filename: impl Into<PathBuf>, text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self { filename: filename.into(), line_starts }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn line(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    pub fn position(&self, offset: usize) -> Position {
        let line = self.line(offset);
        let line_start = self.line_starts[line.saturating_sub(1)];
        Position {
            filename: self.filename.clone(),
            offset,
            line,
            column: offset - line_start + 1,
        }
    }
}

// ─── Parsed file ─────────────────────────────────────────────────────

/// One parsed Go source buffer.
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    pub tree: Tree,
    pub package_name: String,
    pub index: PositionIndex,
}

impl SourceFile {
    /// Parse `text`. Any syntax error rejects the whole buffer.
    pub fn parse(parser: &mut Parser, path: &Path, text: String) -> Result<Self, ParseError> {
        let tree = parser.parse(&text, None).ok_or(ParseError::NoTree)?;
        let index = PositionIndex::new(path, &text);

        let root = tree.root_node();
        if root.has_error() {
            let at = first_error(root).unwrap_or(root).start_byte();
            let pos = index.position(at);
            return Err(ParseError::Syntax { line: pos.line, column: pos.column });
        }

        let package_name = package_name(root, &text).ok_or(ParseError::MissingPackage)?;

        Ok(Self { path: path.to_path_buf(), text, tree, package_name, index })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn node_text(&self, node: Node) -> &str {
        &self.text[node.byte_range()]
    }

    /// Whether the file imports `path`, in any import form.
    pub fn has_import(&self, path: &str) -> bool {
        let root = self.root();
        let mut cursor = root.walk();
        root.children(&mut cursor)
            .filter(|n| n.kind() == "import_declaration")
            .any(|decl| {
                let mut specs = Vec::new();
                collect_import_specs(decl, &mut specs);
                specs.iter().any(|spec| {
                    spec.child_by_field_name("path")
                        .is_some_and(|p| unquote_or_trim(self.node_text(p)) == path)
                })
            })
    }

    /// Lift every call expression whose callee is `x.<method>` with `method`
    /// in `methods`, outermost first, in source order.
    pub fn method_calls(&self, methods: &[&str]) -> Vec<CallExpr> {
        let mut out = Vec::new();
        self.collect_method_calls(self.root(), methods, &mut out);
        out
    }

    fn collect_method_calls(&self, node: Node, methods: &[&str], out: &mut Vec<CallExpr>) {
        if node.kind() == "call_expression" && self.callee_method_in(node, methods) {
            if let Some(call) = lift::lift_call(node, &self.text) {
                out.push(call);
            }
        }
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            self.collect_method_calls(child, methods, out);
        }
    }

    fn callee_method_in(&self, call: Node, methods: &[&str]) -> bool {
        call.child_by_field_name("function")
            .filter(|f| f.kind() == "selector_expression")
            .and_then(|f| f.child_by_field_name("field"))
            .is_some_and(|field| methods.contains(&self.node_text(field)))
    }
}

fn collect_import_specs<'t>(node: Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_spec" => out.push(child),
            "import_spec_list" => collect_import_specs(child, out),
            _ => {}
        }
    }
}

fn package_name(root: Node, text: &str) -> Option<String> {
    let mut cursor = root.walk();
    let clause = root.children(&mut cursor).find(|n| n.kind() == "package_clause")?;
    let mut cursor = clause.walk();
    let ident = clause.named_children(&mut cursor).find(|n| n.kind() == "package_identifier")?;
    Some(text[ident.byte_range()].to_string())
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}
