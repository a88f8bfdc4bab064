//! Expression model for the call shapes the patcher inspects and fabricates.
//!
//! Nodes lifted from source remember their byte span so that untouched
//! subtrees can be copied verbatim when the file is re-rendered. Fabricated
//! nodes have no span and are printed canonically.

use std::ops::Range;

use super::literal::quote;

pub type Span = Range<usize>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Call(CallExpr),
    Selector(SelectorExpr),
    Ident(Ident),
    BasicLit(BasicLit),
    CompositeLit(CompositeLit),
    ArrayType(ArrayType),
    /// Any other expression, carried as its original source text.
    Verbatim(Verbatim),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub pos: usize,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LitKind {
    String,
    Number,
    Rune,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicLit {
    pub kind: LitKind,
    /// Raw literal text including quotes.
    pub value: String,
    pub pos: usize,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorExpr {
    pub x: Box<Expr>,
    pub sel: Ident,
    pub pos: usize,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallExpr {
    pub fun: Box<Expr>,
    pub args: ExprList,
    /// The last argument is expanded with `...`.
    pub ellipsis: bool,
    pub lparen: usize,
    pub pos: usize,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeLit {
    pub ty: Option<Box<Expr>>,
    pub elts: ExprList,
    pub lbrace: usize,
    pub pos: usize,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayType {
    /// `None` for slice types.
    pub len: Option<Box<Expr>>,
    pub elt: Box<Expr>,
    pub lbrack: usize,
    pub span: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verbatim {
    pub span: Span,
}

/// Source text around the items of a delimited list, excluding the delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListLayout {
    /// Between the opening delimiter and the first item.
    pub open: String,
    /// `seps[i]` sits between item `i` and item `i + 1` (comma included).
    pub seps: Vec<String>,
    /// Between the last item (or its `...`) and the closing delimiter.
    pub close: String,
}

/// Items of an argument list or composite literal body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprList {
    items: Vec<Expr>,
    layout: Option<ListLayout>,
    dirty: bool,
}

// ─── Constructors ────────────────────────────────────────────────────

impl Ident {
    pub fn new(name: impl Into<String>, pos: usize) -> Self {
        Self { name: name.into(), pos, span: None }
    }
}

impl BasicLit {
    /// A quoted string literal holding `value`.
    pub fn string(value: &str, pos: usize) -> Self {
        Self { kind: LitKind::String, value: quote(value), pos, span: None }
    }
}

impl Expr {
    pub fn ident(name: impl Into<String>, pos: usize) -> Self {
        Expr::Ident(Ident::new(name, pos))
    }

    /// `x.sel` where `x` is a plain identifier.
    pub fn selector(x: &str, sel: &str, pos: usize) -> Self {
        Expr::Selector(SelectorExpr {
            x: Box::new(Expr::ident(x, pos)),
            sel: Ident::new(sel, pos),
            pos,
            span: None,
        })
    }

    pub fn string_lit(value: &str, pos: usize) -> Self {
        Expr::BasicLit(BasicLit::string(value, pos))
    }

    /// Position of the node's first token (adopted position for fabricated nodes).
    pub fn pos(&self) -> usize {
        match self {
            Expr::Call(c) => c.pos,
            Expr::Selector(s) => s.pos,
            Expr::Ident(i) => i.pos,
            Expr::BasicLit(b) => b.pos,
            Expr::CompositeLit(c) => c.pos,
            Expr::ArrayType(a) => a.lbrack,
            Expr::Verbatim(v) => v.span.start,
        }
    }

    pub fn as_call(&self) -> Option<&CallExpr> {
        match self {
            Expr::Call(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_call_mut(&mut self) -> Option<&mut CallExpr> {
        match self {
            Expr::Call(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_ident(&self) -> Option<&Ident> {
        match self {
            Expr::Ident(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_basic_lit(&self) -> Option<&BasicLit> {
        match self {
            Expr::BasicLit(b) => Some(b),
            _ => None,
        }
    }

    /// If this is `pkg.Name` with a plain identifier on the left, return both parts.
    pub fn as_qualified(&self) -> Option<(&str, &str)> {
        match self {
            Expr::Selector(s) => s.x.as_ident().map(|x| (x.name.as_str(), s.sel.name.as_str())),
            _ => None,
        }
    }

    /// Span of the original text this subtree can be copied from, or `None`
    /// when the subtree was fabricated or changed since it was lifted.
    pub fn pristine_span(&self) -> Option<Span> {
        match self {
            Expr::Call(c) => c.pristine_span(),
            Expr::Selector(s) => {
                let span = s.span.clone()?;
                (s.x.is_pristine() && s.sel.span.is_some()).then_some(span)
            }
            Expr::Ident(i) => i.span.clone(),
            Expr::BasicLit(b) => b.span.clone(),
            Expr::CompositeLit(c) => {
                let span = c.span.clone()?;
                let ty_ok = c.ty.as_ref().is_none_or(|t| t.is_pristine());
                (ty_ok && c.elts.is_pristine()).then_some(span)
            }
            Expr::ArrayType(a) => {
                let span = a.span.clone()?;
                let len_ok = a.len.as_ref().is_none_or(|l| l.is_pristine());
                (len_ok && a.elt.is_pristine()).then_some(span)
            }
            Expr::Verbatim(v) => Some(v.span.clone()),
        }
    }

    pub fn is_pristine(&self) -> bool {
        self.pristine_span().is_some()
    }

    /// Overwrite the position of this node and all fabricated descendants.
    pub fn set_pos(&mut self, pos: usize) {
        match self {
            Expr::Call(c) => c.set_pos(pos),
            Expr::Selector(s) => {
                s.x.set_pos(pos);
                s.sel.pos = pos;
                s.pos = pos;
            }
            Expr::Ident(i) => i.pos = pos,
            Expr::BasicLit(b) => b.pos = pos,
            Expr::CompositeLit(c) => {
                if let Some(ty) = c.ty.as_mut() {
                    ty.set_pos(pos);
                }
                for e in c.elts.iter_mut() {
                    e.set_pos(pos);
                }
                c.lbrace = pos;
                c.pos = pos;
            }
            Expr::ArrayType(a) => {
                if let Some(len) = a.len.as_mut() {
                    len.set_pos(pos);
                }
                a.elt.set_pos(pos);
                a.lbrack = pos;
            }
            Expr::Verbatim(_) => {}
        }
    }
}

impl CallExpr {
    /// A fabricated call `fun(args...)`.
    pub fn new(fun: Expr, args: Vec<Expr>, pos: usize) -> Self {
        Self {
            fun: Box::new(fun),
            args: ExprList::new(args),
            ellipsis: false,
            lparen: pos,
            pos,
            span: None,
        }
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.fun.set_pos(pos);
        for a in self.args.iter_mut() {
            a.set_pos(pos);
        }
        self.lparen = pos;
        self.pos = pos;
    }

    /// Original span, if neither the callee nor the arguments were edited.
    pub fn pristine_span(&self) -> Option<Span> {
        let span = self.span.clone()?;
        (self.fun.is_pristine() && self.args.is_pristine()).then_some(span)
    }

    /// Selector method name when the callee is `x.Method`.
    pub fn method_name(&self) -> Option<&str> {
        match self.fun.as_ref() {
            Expr::Selector(s) => Some(s.sel.name.as_str()),
            _ => None,
        }
    }
}

// ─── List editing ────────────────────────────────────────────────────

impl ExprList {
    /// A fabricated list, rendered with `, ` separators.
    pub fn new(items: Vec<Expr>) -> Self {
        Self { items, layout: None, dirty: false }
    }

    pub(crate) fn with_layout(items: Vec<Expr>, layout: ListLayout) -> Self {
        Self { items, layout: Some(layout), dirty: false }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Expr> {
        self.items.get(idx)
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut Expr> {
        self.items.get_mut(idx)
    }

    pub fn last(&self) -> Option<&Expr> {
        self.items.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expr> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Expr> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[Expr] {
        &self.items
    }

    pub fn layout(&self) -> Option<&ListLayout> {
        self.layout.as_ref()
    }

    /// Unchanged since lifting, and every item is unchanged too.
    pub fn is_pristine(&self) -> bool {
        self.layout.is_some() && !self.dirty && self.items.iter().all(Expr::is_pristine)
    }

    /// Splice `expr` in at `idx` (clamped to the list length). Trailing
    /// comments of existing items stay on their lines.
    pub fn insert(&mut self, idx: usize, expr: Expr) {
        let idx = idx.min(self.items.len());
        let len = self.items.len();
        if let Some(layout) = self.layout.as_mut() {
            if len > 0 {
                layout.insert_separator(idx, len);
            }
        }
        self.items.insert(idx, expr);
        self.dirty = true;
    }

    /// Remove and return the item at `idx`, together with its trailing comment.
    pub fn remove(&mut self, idx: usize) -> Expr {
        let len = self.items.len();
        if let Some(layout) = self.layout.as_mut() {
            layout.remove_separator(idx, len);
        }
        self.dirty = true;
        self.items.remove(idx)
    }

    /// Put `expr` at `idx`, returning the previous item.
    pub fn replace(&mut self, idx: usize, expr: Expr) -> Expr {
        self.dirty = true;
        std::mem::replace(&mut self.items[idx], expr)
    }

    /// Rebuild item `idx` from its current value.
    pub fn map_item(&mut self, idx: usize, f: impl FnOnce(Expr) -> Expr) {
        let placeholder = Expr::Verbatim(Verbatim { span: 0..0 });
        let old = std::mem::replace(&mut self.items[idx], placeholder);
        self.items[idx] = f(old);
        self.dirty = true;
    }

    /// Reorder items so that new item `i` is old item `order[i]`.
    ///
    /// An item's trailing comment moves with it when every moved item ends
    /// its line; otherwise separators stay where they are.
    pub fn permute(&mut self, order: &[usize]) {
        debug_assert_eq!(order.len(), self.items.len());
        if let Some(layout) = self.layout.as_mut() {
            layout.permute_trailing(order);
        }
        let mut old: Vec<Option<Expr>> = std::mem::take(&mut self.items).into_iter().map(Some).collect();
        self.items = order.iter().filter_map(|&i| old.get_mut(i).and_then(Option::take)).collect();
        self.dirty = true;
    }
}

// ─── Separators ──────────────────────────────────────────────────────
//
// The text after item `i` (`seps[i]`, or `close` for the last item) splits
// at its first line break: everything before it (comma, same-line comment)
// belongs to item `i`, the break and indentation belong to the position.

impl ListLayout {
    /// Text after item `i` of a list with `len` items.
    fn after(&self, i: usize, len: usize) -> &str {
        if i + 1 == len { &self.close } else { &self.seps[i] }
    }

    fn insert_separator(&mut self, idx: usize, len: usize) {
        let template = if idx == 0 {
            self.seps.first()
        } else {
            self.seps.get(idx - 1).or(self.seps.last())
        };
        let fresh = template
            .map(|s| clean_separator(s))
            .unwrap_or_else(|| default_separator(&self.open));

        if idx < len {
            // The new item takes the separator after it.
            self.seps.insert(idx, fresh);
            return;
        }

        let (owned, boundary) = split_trailing(&self.close);
        if owned.contains(',') && !boundary.is_empty() {
            // Appending after a multi-line last item: its comment stays on its line.
            let item_break = match split_trailing(&fresh).1 {
                "" => format!("{boundary}\t"),
                b => b.to_string(),
            };
            let sep = format!("{}{item_break}", owned.trim_end());
            self.close = format!(",{boundary}");
            self.seps.push(sep);
        } else {
            self.seps.push(fresh);
        }
    }

    fn remove_separator(&mut self, idx: usize, len: usize) {
        if self.seps.is_empty() {
            return;
        }
        if idx + 1 < len {
            self.seps.remove(idx);
            return;
        }

        // Removing the last item: the previous item now ends the list.
        let prev = self.seps.remove(idx - 1);
        let (prev_owned, _) = split_trailing(&prev);
        let (close_owned, close_boundary) = split_trailing(&self.close);
        if close_owned.contains(',') && !close_boundary.is_empty() {
            self.close = format!("{}{close_boundary}", prev_owned.trim_end());
        }
    }

    fn permute_trailing(&mut self, order: &[usize]) {
        let len = order.len();
        if self.seps.len() + 1 != len {
            return;
        }
        let moved: Vec<usize> = (0..len).filter(|&j| order[j] != j).collect();
        if moved.iter().any(|&j| split_trailing(self.after(j, len)).1.is_empty()) {
            return;
        }

        let owned: Vec<String> = (0..len)
            .map(|i| split_trailing(self.after(i, len)).0.to_string())
            .collect();
        for &j in &moved {
            let boundary = split_trailing(self.after(j, len)).1.to_string();
            let text = format!("{}{boundary}", owned[order[j]]);
            if j + 1 == len {
                self.close = text;
            } else {
                self.seps[j] = text;
            }
        }
    }
}

/// Split at the first line break (a `\r\n` pair counts as the break).
fn split_trailing(s: &str) -> (&str, &str) {
    match s.find('\n') {
        Some(nl) if s[..nl].ends_with('\r') => s.split_at(nl - 1),
        Some(nl) => s.split_at(nl),
        None => (s, ""),
    }
}

/// Comma plus the final line break and indentation of `s`, keeping CRLF.
fn line_break_separator(s: &str) -> Option<String> {
    let nl = s.rfind('\n')?;
    let indent = &s[nl + 1..];
    if !indent.trim().is_empty() {
        return None;
    }
    let eol = if s[..nl].ends_with('\r') { "\r\n" } else { "\n" };
    Some(format!(",{eol}{indent}"))
}

/// Keep only the comma and the line break/indentation of a copied separator,
/// so comments are not duplicated.
fn clean_separator(sep: &str) -> String {
    line_break_separator(sep).unwrap_or_else(|| ", ".to_string())
}

fn default_separator(open: &str) -> String {
    line_break_separator(open).unwrap_or_else(|| ", ".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laid_out(items: Vec<Expr>, seps: &[&str]) -> ExprList {
        laid_out_with(items, seps, "")
    }

    fn laid_out_with(items: Vec<Expr>, seps: &[&str], close: &str) -> ExprList {
        ExprList::with_layout(
            items,
            ListLayout {
                open: String::new(),
                seps: seps.iter().map(|s| s.to_string()).collect(),
                close: close.to_string(),
            },
        )
    }

    fn idents(names: &[&str]) -> Vec<Expr> {
        names.iter().enumerate().map(|(i, n)| Expr::ident(*n, i * 4)).collect()
    }

    fn names(list: &ExprList) -> Vec<String> {
        list.iter().map(|e| e.as_ident().unwrap().name.clone()).collect()
    }

    #[test]
    fn test_insert_copies_neighbour_separator() {
        let mut list = laid_out(vec![Expr::ident("a", 0), Expr::ident("b", 3)], &[",\n\t\t"]);
        list.insert(1, Expr::ident("x", 0));
        assert_eq!(list.len(), 3);
        assert_eq!(list.layout().unwrap().seps, vec![",\n\t\t", ",\n\t\t"]);
    }

    #[test]
    fn test_insert_drops_comments_from_copied_separator() {
        let mut list = laid_out(vec![Expr::ident("a", 0), Expr::ident("b", 3)], &[", /* note */ "]);
        list.insert(2, Expr::ident("x", 0));
        assert_eq!(list.layout().unwrap().seps, vec![", /* note */ ", ", "]);
    }

    #[test]
    fn test_insert_into_single_item_list_uses_default_separator() {
        let mut list = laid_out(vec![Expr::ident("a", 0)], &[]);
        list.insert(1, Expr::ident("x", 0));
        assert_eq!(list.layout().unwrap().seps, vec![", "]);
    }

    #[test]
    fn test_remove_drops_separator_before_item() {
        let mut list = laid_out(
            vec![Expr::ident("a", 0), Expr::ident("b", 3), Expr::ident("c", 6)],
            &[", ", ",  "],
        );
        let removed = list.remove(2);
        assert_eq!(removed.as_ident().unwrap().name, "c");
        assert_eq!(list.layout().unwrap().seps, vec![", "]);
        assert!(!list.is_pristine());
    }

    #[test]
    fn test_permute_reorders_items_only() {
        let mut list = laid_out(
            vec![Expr::ident("m", 0), Expr::ident("z", 3), Expr::ident("a", 6)],
            &[", ", ",\n"],
        );
        list.permute(&[0, 2, 1]);
        let names: Vec<_> = list.iter().map(|e| e.as_ident().unwrap().name.clone()).collect();
        assert_eq!(names, vec!["m", "a", "z"]);
        assert_eq!(list.layout().unwrap().seps, vec![", ", ",\n"]);
    }

    #[test]
    fn test_insert_keeps_comment_on_previous_item() {
        let mut list = laid_out_with(idents(&["m", "b"]), &[", // why\n\t\t"], ",\n\t");
        list.insert(1, Expr::ident("x", 0));
        assert_eq!(names(&list), vec!["m", "x", "b"]);
        assert_eq!(list.layout().unwrap().seps, vec![", // why\n\t\t", ",\n\t\t"]);
    }

    #[test]
    fn test_insert_after_multiline_last_item() {
        let mut list = laid_out_with(idents(&["m", "b"]), &[",\n\t\t"], ", // b\n\t");
        list.insert(2, Expr::ident("x", 0));
        let layout = list.layout().unwrap();
        assert_eq!(layout.seps, vec![",\n\t\t", ", // b\n\t\t"]);
        assert_eq!(layout.close, ",\n\t");
    }

    #[test]
    fn test_insert_preserves_crlf_line_breaks() {
        let mut list = laid_out_with(idents(&["m", "b"]), &[",\r\n\t\t"], ",\r\n\t");
        list.insert(1, Expr::ident("x", 0));
        assert_eq!(list.layout().unwrap().seps, vec![",\r\n\t\t", ",\r\n\t\t"]);
        assert_eq!(clean_separator(", // c\r\n\t"), ",\r\n\t");
        assert_eq!(default_separator("\r\n\t\t"), ",\r\n\t\t");
    }

    #[test]
    fn test_remove_takes_trailing_comment_with_item() {
        let mut list = laid_out_with(
            idents(&["m", "x", "b"]),
            &[", // why\n\t\t", ", // x\n\t\t"],
            ",\n\t",
        );
        list.remove(1);
        assert_eq!(names(&list), vec!["m", "b"]);
        assert_eq!(list.layout().unwrap().seps, vec![", // why\n\t\t"]);
    }

    #[test]
    fn test_remove_last_multiline_item_keeps_previous_comment() {
        let mut list = laid_out_with(idents(&["m", "x"]), &[", // why\n\t\t"], ", // x\n\t");
        list.remove(1);
        let layout = list.layout().unwrap();
        assert!(layout.seps.is_empty());
        assert_eq!(layout.close, ", // why\n\t");
    }

    #[test]
    fn test_permute_moves_trailing_comments_with_items() {
        let mut list = laid_out_with(
            idents(&["m", "z", "a"]),
            &[",\n\t\t", ", // z\n\t\t"],
            ", // a\n\t",
        );
        list.permute(&[0, 2, 1]);
        assert_eq!(names(&list), vec!["m", "a", "z"]);
        let layout = list.layout().unwrap();
        assert_eq!(layout.seps, vec![",\n\t\t", ", // a\n\t\t"]);
        assert_eq!(layout.close, ", // z\n\t");
    }

    #[test]
    fn test_set_pos_reaches_nested_nodes() {
        let mut call = CallExpr::new(
            Expr::selector("zap", "String", 0),
            vec![Expr::string_lit("k", 0), Expr::string_lit("v", 0)],
            0,
        );
        call.set_pos(42);
        assert_eq!(call.lparen, 42);
        assert!(call.args.iter().all(|a| a.pos() == 42));
        assert_eq!(call.fun.pos(), 42);
    }

    #[test]
    fn test_fabricated_nodes_are_not_pristine() {
        let e = Expr::string_lit("v", 0);
        assert!(!e.is_pristine());
        let v = Expr::Verbatim(Verbatim { span: 3..9 });
        assert_eq!(v.pristine_span(), Some(3..9));
    }
}
