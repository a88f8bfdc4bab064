//! Argument-list edits on target calls: insert, replace, delete, spread
//! wrapping and field sorting.

use crate::callsite::{
    APPEND_FN, CallTarget, FIELD_TYPE, FieldCheck, SORTABLE_CTORS, STRING_CTOR, ZAP_IDENT,
    check_flat_field, field_key, find_field_index, find_wrapped_field, unwrap_spread,
    wrapped_field_mut,
};
use crate::config::PatchConfig;
use crate::syntax::{ArrayType, CallExpr, CompositeLit, Expr, ExprList, unquote_or_trim};

/// What happened to one target call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEdit {
    NoOp,
    Deleted,
    Injected,
}

impl CallEdit {
    pub fn is_modified(self) -> bool {
        self != CallEdit::NoOp
    }
}

/// Delete or inject the tracked field on a classified target call.
///
/// Delete mode never injects, even when the call has no field to remove.
pub fn apply(call: &mut CallExpr, target: &CallTarget, config: &PatchConfig) -> CallEdit {
    match config.delete_key() {
        Some(key) => {
            if delete_field(call, key) {
                CallEdit::Deleted
            } else {
                CallEdit::NoOp
            }
        }
        None => inject_field(call, target, config),
    }
}

/// Remove the field with `key`: unwrap the spread wrapper, or drop the one
/// flat argument carrying it. Returns whether anything was removed.
pub fn delete_field(call: &mut CallExpr, key: &str) -> bool {
    if call.ellipsis {
        let Some(last) = call.args.len().checked_sub(1) else {
            return false;
        };
        if call.args.get(last).and_then(|e| find_wrapped_field(e, key)).is_none() {
            return false;
        }
        call.args.map_item(last, |e| unwrap_spread(e, key).unwrap_or_else(|e| e));
        return true;
    }

    match find_field_index(call, key) {
        Some(idx) => {
            call.args.remove(idx);
            true
        }
        None => false,
    }
}

/// Insert or refresh the tracked field with the target's expected value.
pub fn inject_field(call: &mut CallExpr, target: &CallTarget, config: &PatchConfig) -> CallEdit {
    let key = config.field_key.as_str();
    let expected = target.expected.as_str();

    if call.ellipsis {
        let Some(last) = call.args.len().checked_sub(1) else {
            return CallEdit::NoOp;
        };
        if let Some(field) = call.args.get_mut(last).and_then(|e| wrapped_field_mut(e, key)) {
            return set_field_value(field, expected);
        }
        call.args.map_item(last, |orig| wrap_spread(orig, key, expected));
        return CallEdit::Injected;
    }

    if let Some(idx) = target.existing_index {
        let up_to_date = call
            .args
            .get(idx)
            .is_some_and(|f| check_flat_field(f, expected) == FieldCheck::Ok);
        if up_to_date {
            return CallEdit::NoOp;
        }
        let field = new_field_call(key, expected, call.lparen);
        call.args.replace(idx, Expr::Call(field));
        return CallEdit::Injected;
    }

    let idx = config.insertion_index(call.args.len());
    call.args.insert(idx, Expr::Call(new_field_call(key, expected, call.lparen)));
    if config.sort {
        sort_fields(call);
    }
    CallEdit::Injected
}

/// Replace the value literal of an existing field call.
fn set_field_value(field: &mut CallExpr, expected: &str) -> CallEdit {
    let Some(old) = field.args.get(1) else {
        return CallEdit::NoOp;
    };
    if old.as_basic_lit().is_some_and(|lit| unquote_or_trim(&lit.value) == expected) {
        return CallEdit::NoOp;
    }
    let pos = old.pos();
    field.args.replace(1, Expr::string_lit(expected, pos));
    CallEdit::Injected
}

/// `zap.String("<key>", "<value>")`, positioned at `pos`.
pub fn new_field_call(key: &str, value: &str, pos: usize) -> CallExpr {
    CallExpr::new(
        Expr::selector(ZAP_IDENT, STRING_CTOR, pos),
        vec![Expr::string_lit(key, pos), Expr::string_lit(value, pos)],
        pos,
    )
}

/// `append([]zap.Field{zap.String(key, value)}, orig...)`, every new node
/// positioned at the original argument.
pub fn wrap_spread(orig: Expr, key: &str, value: &str) -> Expr {
    let pos = orig.pos();
    let head = CompositeLit {
        ty: Some(Box::new(Expr::ArrayType(ArrayType {
            len: None,
            elt: Box::new(Expr::selector(ZAP_IDENT, FIELD_TYPE, pos)),
            lbrack: pos,
            span: None,
        }))),
        elts: ExprList::new(vec![Expr::Call(new_field_call(key, value, pos))]),
        lbrace: pos,
        pos,
        span: None,
    };
    let mut append = CallExpr::new(
        Expr::ident(APPEND_FN, pos),
        vec![Expr::CompositeLit(head), orig],
        pos,
    );
    append.ellipsis = true;
    Expr::Call(append)
}

/// Reorder the arguments after the message: `zap.String/Any/Uint64` fields
/// first, sorted by key, then everything else in its original order.
pub fn sort_fields(call: &mut CallExpr) {
    if call.args.len() <= 1 {
        return;
    }

    let (mut fields, others): (Vec<usize>, Vec<usize>) =
        (1..call.args.len()).partition(|&i| call.args.get(i).is_some_and(is_sortable_field));
    fields.sort_by_cached_key(|&i| call.args.get(i).and_then(field_key).unwrap_or_default());

    let order: Vec<usize> = std::iter::once(0).chain(fields).chain(others).collect();
    if order.iter().enumerate().any(|(pos, &i)| pos != i) {
        call.args.permute(&order);
    }
}

fn is_sortable_field(expr: &Expr) -> bool {
    expr.as_call()
        .and_then(|c| c.fun.as_qualified())
        .is_some_and(|(pkg, ctor)| pkg == ZAP_IDENT && SORTABLE_CTORS.contains(&ctor))
}
