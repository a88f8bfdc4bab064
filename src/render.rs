//! Rendering edited calls back into source text, and the follow-up pass that
//! corrects injected line numbers against the rendered output.
//!
//! Rendering splices: text outside edited calls is copied byte for byte, and
//! inside an edited call every unchanged subtree is copied from its original
//! span. Only changed or fabricated nodes are printed, in gofmt's canonical
//! single-line form.

use std::cmp::Reverse;
use std::path::Path;

use tracing::debug;
use tree_sitter::Parser;

use crate::callsite::{
    FileScope, LEVEL_METHODS, SiteSettings, ZAP_IMPORT, classify, find_wrapped_field,
};
use crate::funcs::FunctionIndex;
use crate::syntax::{CallExpr, Expr, ExprList, SourceFile, Span, quote, unquote};

pub struct Renderer<'a> {
    src: &'a str,
    /// Edited top-level calls, outermost first.
    edits: Vec<(Span, &'a CallExpr)>,
}

impl<'a> Renderer<'a> {
    /// `edits` are calls lifted from `src` and modified since.
    pub fn new(src: &'a str, edits: impl IntoIterator<Item = &'a CallExpr>) -> Self {
        let mut edits: Vec<(Span, &CallExpr)> = edits
            .into_iter()
            .filter_map(|call| call.span.clone().map(|span| (span, call)))
            .collect();
        edits.sort_by_key(|(span, _)| (span.start, Reverse(span.end)));
        Self { src, edits }
    }

    /// The whole source with every edit applied.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.src.len() + 64 * self.edits.len());
        self.copy_range(0..self.src.len(), &mut out);
        out
    }

    /// Text of a single call, with nested edits applied.
    pub fn render_call(&self, call: &CallExpr) -> String {
        let mut out = String::new();
        self.write_call(call, &mut out);
        out
    }

    /// Copy `range` of the source, substituting edits that lie inside it.
    fn copy_range(&self, range: Span, out: &mut String) {
        let mut cursor = range.start;
        for (span, call) in &self.edits {
            if span.start < cursor || span.end > range.end {
                continue;
            }
            out.push_str(&self.src[cursor..span.start]);
            self.write_call(call, out);
            cursor = span.end;
        }
        out.push_str(&self.src[cursor..range.end]);
    }

    fn write_expr(&self, expr: &Expr, out: &mut String) {
        if let Some(span) = expr.pristine_span() {
            self.copy_range(span, out);
            return;
        }
        match expr {
            Expr::Call(call) => self.write_call(call, out),
            Expr::Selector(sel) => {
                self.write_expr(&sel.x, out);
                out.push('.');
                out.push_str(&sel.sel.name);
            }
            Expr::Ident(ident) => out.push_str(&ident.name),
            Expr::BasicLit(lit) => out.push_str(&lit.value),
            Expr::CompositeLit(lit) => {
                if let Some(ty) = &lit.ty {
                    self.write_expr(ty, out);
                }
                out.push('{');
                self.write_list(&lit.elts, false, out);
                out.push('}');
            }
            Expr::ArrayType(arr) => {
                out.push('[');
                if let Some(len) = &arr.len {
                    self.write_expr(len, out);
                }
                out.push(']');
                self.write_expr(&arr.elt, out);
            }
            Expr::Verbatim(v) => self.copy_range(v.span.clone(), out),
        }
    }

    fn write_call(&self, call: &CallExpr, out: &mut String) {
        self.write_expr(&call.fun, out);
        out.push('(');
        self.write_list(&call.args, call.ellipsis, out);
        out.push(')');
    }

    fn write_list(&self, list: &ExprList, ellipsis: bool, out: &mut String) {
        let layout = list.layout();
        if let Some(layout) = layout {
            out.push_str(&layout.open);
        }
        for (i, item) in list.iter().enumerate() {
            if i > 0 {
                let sep = layout.and_then(|l| l.seps.get(i - 1)).map_or(", ", String::as_str);
                out.push_str(sep);
            }
            self.write_expr(item, out);
        }
        if ellipsis {
            out.push_str("...");
        }
        if let Some(layout) = layout {
            out.push_str(&layout.close);
        }
    }
}

/// Render `src` with the given edited calls spliced in.
pub fn render_source(src: &str, edits: &[CallExpr]) -> String {
    Renderer::new(src, edits).render()
}

/// Re-parse rendered output and rewrite every tracked-field literal whose
/// value no longer matches the call's actual position.
///
/// Output that cannot be re-parsed is returned unchanged.
pub fn reconcile(parser: &mut Parser, output: String, path: &Path, settings: &SiteSettings) -> String {
    let file = match SourceFile::parse(parser, path, output.clone()) {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "Skipping line correction");
            return output;
        }
    };
    if !file.has_import(ZAP_IMPORT) {
        return output;
    }

    let funcs = FunctionIndex::build(&file);
    let scope = FileScope::new(&file, &funcs, settings);

    let mut fixes: Vec<(Span, String)> = Vec::new();
    for call in file.method_calls(&LEVEL_METHODS) {
        let Some(target) = classify(&call, &scope) else {
            continue;
        };
        let Some((span, value)) = field_literal(&call, target.existing_index, settings.field_key)
        else {
            continue;
        };
        let Some(actual) = unquote(&value) else {
            continue;
        };
        if actual != target.expected {
            fixes.push((span, quote(&target.expected)));
        }
    }

    if fixes.is_empty() {
        return output;
    }
    debug!(path = %path.display(), count = fixes.len(), "Correcting injected line numbers");

    // Back to front, so earlier offsets stay valid.
    fixes.sort_by_key(|(span, _)| Reverse(span.start));
    let mut text = file.text;
    for (span, replacement) in fixes {
        text.replace_range(span, &replacement);
    }
    text
}

/// Span and raw text of the tracked field's value literal.
fn field_literal(call: &CallExpr, existing: Option<usize>, key: &str) -> Option<(Span, String)> {
    let field = if call.ellipsis {
        find_wrapped_field(call.args.last()?, key)?.field
    } else {
        call.args.get(existing?)?.as_call()?
    };
    let lit = field.args.get(1)?.as_basic_lit()?;
    Some((lit.span.clone()?, lit.value.clone()))
}
