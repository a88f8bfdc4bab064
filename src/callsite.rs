//! Recognizing zap logging calls and locating the tracked field in them.
//!
//! A target call is `zap.L()<chain>.<Level>(msg, fields...)`. The tracked
//! field is either a flat argument `zap.<Ctor>("key", value)` or, for calls
//! that expand a slice with `...`, a wrapper
//! `append([]zap.Field{zap.<Ctor>("key", value)}, orig...)`.

use crate::funcs::FunctionIndex;
use crate::syntax::{CallExpr, Expr, Position, PositionIndex, SourceFile, unquote_or_trim};

/// Import path that must be present for a file to be considered.
pub const ZAP_IMPORT: &str = "go.uber.org/zap";
/// Package identifier used in call chains and fabricated fields.
pub const ZAP_IDENT: &str = "zap";
/// `zap.L()` returns the global logger.
pub const GLOBAL_ACCESSOR: &str = "L";
/// Logger methods whose calls receive the field.
pub const LEVEL_METHODS: [&str; 7] = ["Debug", "Info", "Warn", "Error", "DPanic", "Panic", "Fatal"];
/// Constructor used for fabricated fields.
pub const STRING_CTOR: &str = "String";
/// Constructors the sort pass treats as fields.
pub const SORTABLE_CTORS: [&str; 3] = ["String", "Any", "Uint64"];
/// Builtin used to prepend a field to an expanded slice.
pub const APPEND_FN: &str = "append";
/// Element type of the prepended slice literal (`[]zap.Field`).
pub const FIELD_TYPE: &str = "Field";

/// Settings for one file that outlive any single parse of it.
#[derive(Debug, Clone, Copy)]
pub struct SiteSettings<'a> {
    /// Slash path of the file relative to the base directory.
    pub rel_path: &'a str,
    /// Module path from go.mod, empty when unknown.
    pub module_path: &'a str,
    pub field_key: &'a str,
    pub with_func: bool,
}

/// Per-parse inputs shared by every call in the file.
#[derive(Debug, Clone, Copy)]
pub struct FileScope<'a> {
    pub index: &'a PositionIndex,
    pub funcs: &'a FunctionIndex,
    pub package_name: &'a str,
    pub rel_path: &'a str,
    pub module_path: &'a str,
    pub field_key: &'a str,
    pub with_func: bool,
}

impl<'a> FileScope<'a> {
    pub fn new(file: &'a SourceFile, funcs: &'a FunctionIndex, settings: &SiteSettings<'a>) -> Self {
        Self {
            index: &file.index,
            funcs,
            package_name: &file.package_name,
            rel_path: settings.rel_path,
            module_path: settings.module_path,
            field_key: settings.field_key,
            with_func: settings.with_func,
        }
    }
}

/// A call judged to be a target, with everything needed to patch or verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTarget {
    pub method: String,
    /// Position of the opening parenthesis.
    pub position: Position,
    pub rel_path: String,
    pub func_name: Option<String>,
    pub package_name: String,
    pub expected: String,
    /// Index into the full argument list of a flat field with the tracked key.
    pub existing_index: Option<usize>,
}

impl CallTarget {
    pub fn line(&self) -> usize {
        self.position.line
    }
}

/// Decide whether `call` is a target and compute its expected value.
pub fn classify(call: &CallExpr, scope: &FileScope) -> Option<CallTarget> {
    let Expr::Selector(sel) = call.fun.as_ref() else {
        return None;
    };
    let method = sel.sel.name.as_str();
    if !LEVEL_METHODS.contains(&method) || !is_logger_chain(&sel.x) || call.args.is_empty() {
        return None;
    }

    let position = scope.index.position(call.lparen);
    let (func_name, package_name) = match scope.funcs.resolve(call.pos) {
        Some(range) => (Some(range.name.clone()), range.package.clone()),
        None => (None, scope.package_name.to_string()),
    };

    let expected = build_injected_value(
        scope.rel_path,
        position.line,
        if scope.with_func { func_name.as_deref() } else { None },
        &package_name,
        scope.module_path,
    );

    Some(CallTarget {
        method: method.to_string(),
        position,
        rel_path: scope.rel_path.to_string(),
        func_name,
        package_name,
        expected,
        existing_index: find_field_index(call, scope.field_key),
    })
}

/// Whether `expr` bottoms out at `zap.L()`, through any chain of calls and selectors.
pub fn is_logger_chain(expr: &Expr) -> bool {
    match expr {
        Expr::Call(call) => {
            if call.fun.as_qualified() == Some((ZAP_IDENT, GLOBAL_ACCESSOR)) {
                return true;
            }
            is_logger_chain(&call.fun)
        }
        Expr::Selector(sel) => is_logger_chain(&sel.x),
        _ => false,
    }
}

/// `"<rel>:<line>"`, plus `" | <import path>.<func>"` when a function name is given.
pub fn build_injected_value(
    rel: &str,
    line: usize,
    func_name: Option<&str>,
    package_name: &str,
    module_path: &str,
) -> String {
    let rel = rel.replace('\\', "/");
    let mut value = format!("{rel}:{line}");
    let Some(func) = func_name.filter(|f| !f.is_empty()) else {
        return value;
    };

    let prefix = if module_path.is_empty() {
        package_name.to_string()
    } else {
        match rel.rsplit_once('/') {
            Some((dir, _)) if !dir.is_empty() && dir != "." => {
                format!("{}/{}", module_path.trim_end_matches('/'), dir)
            }
            _ => module_path.to_string(),
        }
    };
    value.push_str(&format!(" | {prefix}.{func}"));
    value
}

// ─── Field location ──────────────────────────────────────────────────

/// Key of a `zap.<Ctor>("key", ...)` call. Any constructor name is accepted.
pub fn field_key(expr: &Expr) -> Option<String> {
    let call = zap_ctor_call(expr)?;
    let key = call.args.get(0)?.as_basic_lit()?;
    Some(unquote_or_trim(&key.value))
}

fn zap_ctor_call(expr: &Expr) -> Option<&CallExpr> {
    let call = expr.as_call()?;
    let (pkg, _) = call.fun.as_qualified()?;
    (pkg == ZAP_IDENT).then_some(call)
}

/// Index of the first non-message argument that is a field with `key`.
pub fn find_field_index(call: &CallExpr, key: &str) -> Option<usize> {
    call.args
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, arg)| field_key(arg).as_deref() == Some(key))
        .map(|(i, _)| i)
}

/// The parts of an `append([]zap.Field{field}, inner...)` wrapper.
#[derive(Debug, Clone, Copy)]
pub struct WrappedField<'a> {
    pub append: &'a CallExpr,
    pub field: &'a CallExpr,
    pub inner: &'a Expr,
}

/// Match an expanded argument wrapped for `key`.
pub fn find_wrapped_field<'a>(expr: &'a Expr, key: &str) -> Option<WrappedField<'a>> {
    let append = expr.as_call()?;
    let is_append = append.fun.as_ident().is_some_and(|i| i.name == APPEND_FN);
    if !is_append || !append.ellipsis || append.args.len() != 2 {
        return None;
    }
    let Expr::CompositeLit(lit) = append.args.get(0)? else {
        return None;
    };
    if lit.elts.len() != 1 {
        return None;
    }
    let field = lit.elts.get(0)?;
    if field_key(field).as_deref() != Some(key) {
        return None;
    }
    Some(WrappedField { append, field: field.as_call()?, inner: append.args.get(1)? })
}

/// Mutable access to the field call inside a wrapper for `key`.
pub fn wrapped_field_mut<'a>(expr: &'a mut Expr, key: &str) -> Option<&'a mut CallExpr> {
    find_wrapped_field(expr, key)?;
    let Expr::Call(append) = expr else {
        return None;
    };
    let Some(Expr::CompositeLit(lit)) = append.args.get_mut(0) else {
        return None;
    };
    lit.elts.get_mut(0)?.as_call_mut()
}

/// Take the original expanded argument back out of a wrapper for `key`.
/// Returns the expression unchanged when it is not such a wrapper.
pub fn unwrap_spread(expr: Expr, key: &str) -> Result<Expr, Expr> {
    if find_wrapped_field(&expr, key).is_none() {
        return Err(expr);
    }
    match expr {
        Expr::Call(mut append) => Ok(append.args.remove(1)),
        other => Err(other),
    }
}

// ─── Field checks ────────────────────────────────────────────────────

/// Outcome of comparing an existing field with the expected value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldCheck {
    Ok,
    Mismatch { actual: String },
    /// The field exists but is not shaped like `zap.String(key, "literal")`.
    Malformed(&'static str),
}

/// Check a flat field argument: must be `zap.String(key, "<expected>")`.
pub fn check_flat_field(field: &Expr, expected: &str) -> FieldCheck {
    let Some(call) = field.as_call() else {
        return FieldCheck::Malformed("field arg not a call expression");
    };
    if call.fun.as_qualified() != Some((ZAP_IDENT, STRING_CTOR)) {
        return FieldCheck::Malformed("expected zap.String call for field");
    }
    if call.args.len() < 2 {
        return FieldCheck::Malformed("zap.String has insufficient args");
    }
    match call.args.get(1).and_then(Expr::as_basic_lit) {
        Some(lit) => compare(&unquote_or_trim(&lit.value), expected),
        None => FieldCheck::Malformed("mismatched type for field, expected basic literal"),
    }
}

/// Check the field inside an append wrapper; any constructor is accepted.
pub fn check_wrapped_field(field: &CallExpr, expected: &str) -> FieldCheck {
    if field.args.len() < 2 {
        return FieldCheck::Malformed("has insufficient args in append wrapper");
    }
    match field.args.get(1).and_then(Expr::as_basic_lit) {
        Some(lit) => compare(&unquote_or_trim(&lit.value), expected),
        None => FieldCheck::Malformed("value is not a string literal"),
    }
}

fn compare(actual: &str, expected: &str) -> FieldCheck {
    if actual == expected {
        FieldCheck::Ok
    } else {
        FieldCheck::Mismatch { actual: actual.to_string() }
    }
}

/// `key=value` for every zap field among the non-message arguments.
pub fn collect_existing_fields(call: &CallExpr) -> Vec<String> {
    call.args
        .iter()
        .skip(1)
        .filter_map(|arg| {
            let ctor = zap_ctor_call(arg)?;
            let key = field_key(arg).filter(|k| !k.is_empty())?;
            let value = match ctor.args.get(1) {
                None => "<missing>".to_string(),
                Some(v) => v
                    .as_basic_lit()
                    .map_or_else(|| "<non-literal>".to_string(), |lit| unquote_or_trim(&lit.value)),
            };
            Some(format!("{key}={value}"))
        })
        .collect()
}

#[cfg(test)]
#[path = "callsite_tests.rs"]
mod tests;
