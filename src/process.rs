//! Per-file pipeline: parse, classify, mutate, render and reconcile, or verify.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use tree_sitter::Parser;

use crate::PatchError;
use crate::callsite::{FileScope, LEVEL_METHODS, SiteSettings, ZAP_IMPORT, classify};
use crate::config::PatchConfig;
use crate::funcs::FunctionIndex;
use crate::mutate;
use crate::paths::rel_path;
use crate::render::{reconcile, render_source};
use crate::syntax::{SourceFile, new_parser};
use crate::verify::{FileReport, verify_call};

/// Run-wide inputs for processing files, fixed before traversal starts.
#[derive(Debug, Clone)]
pub struct PatchContext<'a> {
    pub config: &'a PatchConfig,
    /// Module path from go.mod, empty when unknown.
    pub module_path: String,
    /// Directory that reported paths are relative to.
    pub base_dir: PathBuf,
}

impl<'a> PatchContext<'a> {
    pub fn new(config: &'a PatchConfig, module_path: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self { config, module_path: module_path.into(), base_dir: base_dir.into() }
    }

    pub fn rel_path(&self, path: &Path) -> String {
        rel_path(path, &self.base_dir)
    }

    fn settings<'s>(&'s self, rel_path: &'s str) -> SiteSettings<'s> {
        SiteSettings {
            rel_path,
            module_path: &self.module_path,
            field_key: &self.config.field_key,
            with_func: self.config.with_func,
        }
    }
}

/// Result of patching one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileOutcome {
    pub modified: bool,
    /// Rendered source; empty when not modified.
    pub output: String,
    /// Lines of the calls that changed, in visiting order.
    pub modified_lines: Vec<usize>,
}

impl FileOutcome {
    pub fn unmodified() -> Self {
        Self::default()
    }
}

/// Owns the Go parser, reused across every file of a run.
pub struct Patcher {
    parser: Parser,
}

impl Patcher {
    pub fn new() -> Result<Self, PatchError> {
        Ok(Self { parser: new_parser()? })
    }

    /// Read and patch `path`. Unparsable or non-UTF-8 files come back unmodified.
    pub fn process_file(&mut self, path: &Path, ctx: &PatchContext) -> Result<FileOutcome, PatchError> {
        match read_source(path)? {
            Some(text) => Ok(self.patch_source(path, text, ctx)),
            None => Ok(FileOutcome::unmodified()),
        }
    }

    /// Patch an in-memory buffer as if it were the file at `path`.
    pub fn patch_source(&mut self, path: &Path, text: String, ctx: &PatchContext) -> FileOutcome {
        let file = match SourceFile::parse(&mut self.parser, path, text) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Parse failed, skipping file");
                return FileOutcome::unmodified();
            }
        };
        if !file.has_import(ZAP_IMPORT) {
            return FileOutcome::unmodified();
        }

        let rel = ctx.rel_path(path);
        let settings = ctx.settings(&rel);
        let funcs = FunctionIndex::build(&file);
        let scope = FileScope::new(&file, &funcs, &settings);

        let mut edited = Vec::new();
        let mut modified_lines = Vec::new();
        for mut call in file.method_calls(&LEVEL_METHODS) {
            let Some(target) = classify(&call, &scope) else {
                continue;
            };
            if mutate::apply(&mut call, &target, ctx.config).is_modified() {
                modified_lines.push(target.line());
                edited.push(call);
            }
        }

        if edited.is_empty() {
            return FileOutcome::unmodified();
        }
        debug!(path = %rel, calls = edited.len(), "Rendering modified calls");

        let mut output = render_source(&file.text, &edited);
        // Removing a field leaves every other line number where it was.
        if ctx.config.delete_key().is_none() {
            output = reconcile(&mut self.parser, output, path, &settings);
        }

        FileOutcome { modified: true, output, modified_lines }
    }

    /// Read and verify `path` without modifying it.
    pub fn verify_file(&mut self, path: &Path, ctx: &PatchContext) -> Result<FileReport, PatchError> {
        match read_source(path)? {
            Some(text) => Ok(self.verify_source(path, text, ctx)),
            None => Ok(FileReport::new(ctx.rel_path(path))),
        }
    }

    pub fn verify_source(&mut self, path: &Path, text: String, ctx: &PatchContext) -> FileReport {
        let rel = ctx.rel_path(path);
        let mut report = FileReport::new(rel.clone());

        let file = match SourceFile::parse(&mut self.parser, path, text) {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Parse failed, skipping file");
                return report;
            }
        };
        if !file.has_import(ZAP_IMPORT) {
            return report;
        }

        let settings = ctx.settings(&rel);
        let funcs = FunctionIndex::build(&file);
        let scope = FileScope::new(&file, &funcs, &settings);
        for call in file.method_calls(&LEVEL_METHODS) {
            if let Some(target) = classify(&call, &scope) {
                report.record(verify_call(&call, &target, &ctx.config.field_key));
            }
        }
        report
    }
}

/// File contents, or `None` (with a warning) when the file is not UTF-8.
fn read_source(path: &Path) -> Result<Option<String>, PatchError> {
    let bytes = std::fs::read(path).map_err(|source| PatchError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(Some(text)),
        Err(_) => {
            warn!(path = %path.display(), "File is not valid UTF-8, skipping");
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
