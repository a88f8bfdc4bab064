//! Lifting tree-sitter nodes into the `Expr` model.

use tree_sitter::Node;

use super::expr::{
    ArrayType, BasicLit, CallExpr, CompositeLit, Expr, ExprList, Ident, ListLayout, LitKind,
    SelectorExpr, Verbatim,
};

/// Lift any expression node. Shapes outside the model become `Verbatim`.
pub fn lift_expr(node: Node, src: &str) -> Expr {
    let span = node.start_byte()..node.end_byte();
    let pos = node.start_byte();
    match node.kind() {
        "call_expression" => match lift_call(node, src) {
            Some(call) => Expr::Call(call),
            None => Expr::Verbatim(Verbatim { span }),
        },
        "selector_expression" => {
            let (Some(operand), Some(field)) =
                (node.child_by_field_name("operand"), node.child_by_field_name("field"))
            else {
                return Expr::Verbatim(Verbatim { span });
            };
            Expr::Selector(SelectorExpr {
                x: Box::new(lift_expr(operand, src)),
                sel: lift_ident(field, src),
                pos,
                span: Some(span),
            })
        }
        "qualified_type" => {
            let (Some(package), Some(name)) =
                (node.child_by_field_name("package"), node.child_by_field_name("name"))
            else {
                return Expr::Verbatim(Verbatim { span });
            };
            Expr::Selector(SelectorExpr {
                x: Box::new(Expr::Ident(lift_ident(package, src))),
                sel: lift_ident(name, src),
                pos,
                span: Some(span),
            })
        }
        "identifier" | "type_identifier" | "field_identifier" | "package_identifier" => {
            Expr::Ident(lift_ident(node, src))
        }
        "interpreted_string_literal" | "raw_string_literal" => lit(node, src, LitKind::String),
        "int_literal" | "float_literal" | "imaginary_literal" => lit(node, src, LitKind::Number),
        "rune_literal" => lit(node, src, LitKind::Rune),
        "composite_literal" => lift_composite(node, src).unwrap_or(Expr::Verbatim(Verbatim { span })),
        "slice_type" | "array_type" => {
            let Some(element) = node.child_by_field_name("element") else {
                return Expr::Verbatim(Verbatim { span });
            };
            Expr::ArrayType(ArrayType {
                len: node.child_by_field_name("length").map(|l| Box::new(lift_expr(l, src))),
                elt: Box::new(lift_expr(element, src)),
                lbrack: pos,
                span: Some(span),
            })
        }
        _ => Expr::Verbatim(Verbatim { span }),
    }
}

/// Lift a `call_expression` with an ordinary argument list.
///
/// Calls using the builtin-type argument form (`make([]T, n)`) return `None`.
pub fn lift_call(node: Node, src: &str) -> Option<CallExpr> {
    if node.kind() != "call_expression" {
        return None;
    }
    let function = node.child_by_field_name("function")?;
    let arguments = node.child_by_field_name("arguments")?;
    if arguments.kind() != "argument_list" {
        return None;
    }

    // Explicit instantiation `f[T](...)` keeps the callee text as is.
    let fun = match node.child_by_field_name("type_arguments") {
        Some(targs) => Expr::Verbatim(Verbatim { span: function.start_byte()..targs.end_byte() }),
        None => lift_expr(function, src),
    };

    let (args, ellipsis) = lift_list(arguments, src);
    Some(CallExpr {
        fun: Box::new(fun),
        args,
        ellipsis,
        lparen: arguments.start_byte(),
        pos: node.start_byte(),
        span: Some(node.start_byte()..node.end_byte()),
    })
}

fn lift_composite(node: Node, src: &str) -> Option<Expr> {
    let body = node.child_by_field_name("body")?;
    let (elts, _) = lift_list(body, src);
    Some(Expr::CompositeLit(CompositeLit {
        ty: node.child_by_field_name("type").map(|t| Box::new(lift_expr(t, src))),
        elts,
        lbrace: body.start_byte(),
        pos: node.start_byte(),
        span: Some(node.start_byte()..node.end_byte()),
    }))
}

/// Lift the items of a delimited list (`(...)` or `{...}`), keeping the text
/// between them. Returns whether the last item is expanded with `...`.
pub fn lift_list(list: Node, src: &str) -> (ExprList, bool) {
    let inner_start = list.start_byte() + 1;
    let inner_end = list.end_byte().saturating_sub(1).max(inner_start);

    let mut items: Vec<(Expr, usize, usize)> = Vec::new();
    let mut ellipsis = false;

    let mut cursor = list.walk();
    for child in list.children(&mut cursor) {
        if !child.is_named() {
            // Some grammar versions keep `...` as a bare token of the list.
            if child.kind() == "..." {
                ellipsis = true;
                if let Some(last) = items.last_mut() {
                    last.2 = child.end_byte();
                }
            }
            continue;
        }
        match child.kind() {
            "comment" => {}
            "variadic_argument" => {
                let inner = first_named(child).unwrap_or(child);
                items.push((lift_expr(inner, src), child.start_byte(), child.end_byte()));
                ellipsis = true;
            }
            "literal_element" | "element" => {
                let item = match first_named(child) {
                    Some(inner) if child.named_child_count() == 1 => lift_expr(inner, src),
                    _ => Expr::Verbatim(Verbatim { span: child.start_byte()..child.end_byte() }),
                };
                items.push((item, child.start_byte(), child.end_byte()));
            }
            _ => items.push((lift_expr(child, src), child.start_byte(), child.end_byte())),
        }
    }

    let open_end = items.first().map_or(inner_end, |(_, start, _)| *start);
    let close_start = items.last().map_or(inner_end, |(_, _, end)| *end);
    let seps = items
        .windows(2)
        .map(|w| src[w[0].2..w[1].1].to_string())
        .collect();
    let layout = ListLayout {
        open: src[inner_start..open_end].to_string(),
        seps,
        close: src[close_start..inner_end].to_string(),
    };

    let exprs = items.into_iter().map(|(e, _, _)| e).collect();
    (ExprList::with_layout(exprs, layout), ellipsis)
}

fn first_named(node: Node) -> Option<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).find(|c| c.kind() != "comment")
}

fn lift_ident(node: Node, src: &str) -> Ident {
    Ident {
        name: src[node.byte_range()].to_string(),
        pos: node.start_byte(),
        span: Some(node.byte_range()),
    }
}

fn lit(node: Node, src: &str, kind: LitKind) -> Expr {
    Expr::BasicLit(BasicLit {
        kind,
        value: src[node.byte_range()].to_string(),
        pos: node.start_byte(),
        span: Some(node.byte_range()),
    })
}
