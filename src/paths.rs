//! Slash-normalized path helpers for reporting and exclusion matching.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::PatchError;

/// `path` with `\` separators turned into `/`.
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '\\' {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

/// Lexically clean a slash path: collapse `//`, drop `.`, resolve `..`.
pub fn clean_slash_path(path: &str) -> String {
    let rooted = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        match seg {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    match (rooted, joined.is_empty()) {
        (true, _) => format!("/{joined}"),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Lexical `target` relative to `base`; both must be clean slash paths.
fn relative_slash(target: &str, base: &str) -> Option<String> {
    if target.starts_with('/') != base.starts_with('/') {
        return None;
    }
    let split = |s: &'_ str| -> Vec<String> {
        s.split('/').filter(|p| !p.is_empty() && *p != ".").map(str::to_string).collect()
    };
    let (t, b) = (split(target), split(base));
    let common = t.iter().zip(&b).take_while(|(x, y)| x == y).count();
    if b[common..].iter().any(|p| p == "..") {
        return None;
    }

    let parts: Vec<&str> = std::iter::repeat_n("..", b.len() - common)
        .chain(t[common..].iter().map(String::as_str))
        .collect();
    if parts.is_empty() {
        Some(".".to_string())
    } else {
        Some(parts.join("/"))
    }
}

/// Path of `path` relative to `base_dir`, slash-separated and without a
/// leading `./`. Falls back to the cleaned absolute path.
pub fn rel_path(path: &Path, base_dir: &Path) -> String {
    let file = clean_slash_path(&to_slash(&absolutize(path)));
    if !base_dir.as_os_str().is_empty() {
        let base = clean_slash_path(&to_slash(&absolutize(base_dir)));
        if let Some(rel) = relative_slash(&file, &base) {
            return rel.strip_prefix("./").map(str::to_string).unwrap_or(rel);
        }
    }
    file
}

/// Base directory for relative paths: the target itself, or the current
/// directory when the target is a file.
pub fn normalize_base_dir(target: &Path) -> Result<PathBuf, PatchError> {
    match std::fs::metadata(target) {
        Ok(meta) if !meta.is_dir() => std::env::current_dir().map_err(PatchError::BaseDir),
        _ => Ok(target.to_path_buf()),
    }
}

/// Module path declared in `<base_dir>/go.mod`, or an empty string.
pub fn read_module_path(base_dir: &Path) -> String {
    let go_mod = base_dir.join("go.mod");
    let Ok(text) = std::fs::read_to_string(&go_mod) else {
        debug!(path = %go_mod.display(), "No readable go.mod, function paths use package names");
        return String::new();
    };
    text.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("module "))
        .map(|m| m.trim().to_string())
        .unwrap_or_default()
}
