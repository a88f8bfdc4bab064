//! Directory traversal, exclusion rules and the run loops for patch and
//! verify modes.

use std::io::Write;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use crate::PatchError;
use crate::paths::{clean_slash_path, to_slash};
use crate::preview::apply_patch_if_modified;
use crate::process::{PatchContext, Patcher};
use crate::verify::{VerifySummary, print_file_report, print_summary};

/// Directory names that are never descended into.
pub const SKIPPED_DIRS: [&str; 4] = ["vendor", ".git", "build", "node_modules"];
pub const SOURCE_SUFFIX: &str = ".go";
pub const GENERATED_SUFFIX: &str = "_gen.go";
pub const INTERNAL_SEGMENT: &str = "/internal/";

/// User exclusions: slash paths (matched with their subtrees) or bare names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludeList {
    entries: Vec<String>,
}

impl ExcludeList {
    /// Parse a comma-separated list. Relative path entries are joined to `base_dir`.
    pub fn parse(raw: &str, base_dir: &Path) -> Self {
        let entries = raw
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                if p.contains('/') || p.contains(MAIN_SEPARATOR) {
                    let path = Path::new(p);
                    let joined = if path.is_absolute() { path.to_path_buf() } else { base_dir.join(path) };
                    clean_slash_path(&to_slash(&joined))
                } else {
                    p.to_string()
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    fn matches(&self, path: &Path) -> bool {
        let slash = clean_slash_path(&to_slash(path));
        let base = file_name(path);
        self.entries.iter().any(|ex| {
            if ex.contains('/') {
                let ex = ex.trim_end_matches('/');
                slash == ex || slash.starts_with(&format!("{ex}/"))
            } else {
                base == *ex
            }
        })
    }

    pub fn should_skip_dir(&self, path: &Path) -> bool {
        SKIPPED_DIRS.contains(&file_name(path).as_str()) || self.matches(path)
    }

    pub fn should_skip_file(&self, path: &Path) -> bool {
        let slash = clean_slash_path(&to_slash(path));
        if !slash.ends_with(SOURCE_SUFFIX) {
            return true;
        }
        if slash.ends_with(GENERATED_SUFFIX) || slash.contains(INTERNAL_SEGMENT) {
            return true;
        }
        self.matches(path)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Source files under `root` in file-name order, pruning skipped directories.
/// The root itself is subject to the directory rules.
pub fn walk_sources(
    root: &Path,
    excludes: &ExcludeList,
) -> impl Iterator<Item = Result<PathBuf, ignore::Error>> + use<> {
    let dir_filter = excludes.clone();
    let file_filter = excludes.clone();

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && dir_filter.should_skip_dir(entry.path()))
        });
    // filter_entry is never consulted for the root entry.
    if root.is_dir() && excludes.should_skip_dir(root) {
        debug!(path = %root.display(), "Walk root is excluded");
        builder.max_depth(Some(0));
    }

    builder.build().filter_map(move |entry| match entry {
        Ok(entry) => {
            let is_file = entry.file_type().is_some_and(|t| t.is_file());
            (is_file && !file_filter.should_skip_file(entry.path())).then(|| Ok(entry.into_path()))
        }
        Err(e) => Some(Err(e)),
    })
}

/// Patch every eligible file under `target` (or `target` itself when it is a file).
pub fn run_patch(
    out: &mut dyn Write,
    target: &Path,
    excludes: &ExcludeList,
    ctx: &PatchContext,
) -> Result<usize, PatchError> {
    let mut patcher = Patcher::new()?;
    let mut patched = 0;
    for path in target_files(target, excludes) {
        let path = path?;
        let outcome = patcher.process_file(&path, ctx)?;
        if apply_patch_if_modified(out, &path, &ctx.rel_path(&path), &outcome, ctx.config.write)? {
            patched += 1;
        }
    }
    debug!(patched, "Patch run finished");
    Ok(patched)
}

/// Verify every eligible file and print per-file issues plus the run summary.
pub fn run_verify(
    out: &mut dyn Write,
    target: &Path,
    excludes: &ExcludeList,
    ctx: &PatchContext,
    json: bool,
) -> Result<VerifySummary, PatchError> {
    let mut patcher = Patcher::new()?;
    let mut summary = VerifySummary::default();
    for path in target_files(target, excludes) {
        let report = patcher.verify_file(&path?, ctx)?;
        if !json {
            print_file_report(out, &report)?;
        }
        summary.add(&report);
    }
    print_summary(out, &summary, json)?;
    Ok(summary)
}

/// A single file target bypasses traversal but not the file rules.
fn target_files(
    target: &Path,
    excludes: &ExcludeList,
) -> Box<dyn Iterator<Item = Result<PathBuf, PatchError>>> {
    if target.is_file() {
        if excludes.should_skip_file(target) {
            return Box::new(std::iter::empty());
        }
        return Box::new(std::iter::once(Ok(target.to_path_buf())));
    }
    Box::new(walk_sources(target, excludes).map(|r| r.map_err(PatchError::from)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatchConfig;

    const ZAP_FILE: &str =
        "package a\n\nimport \"go.uber.org/zap\"\n\nfunc A() {\n\tzap.L().Info(\"x\")\n}\n";

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn listed(root: &Path, excludes: &ExcludeList) -> Vec<String> {
        walk_sources(root, excludes)
            .map(|p| to_slash(p.unwrap().strip_prefix(root).unwrap()))
            .collect()
    }

    #[test]
    fn test_exclude_list_parse() {
        let list = ExcludeList::parse(" gen , ./tools/x/, ,/abs/dir", Path::new("/repo"));
        assert_eq!(list.entries(), ["gen", "/repo/tools/x", "/abs/dir"]);
        assert!(ExcludeList::parse("", Path::new(".")).entries().is_empty());
    }

    #[test]
    fn test_should_skip_file_rules() {
        let none = ExcludeList::default();
        assert!(none.should_skip_file(Path::new("a/readme.md")));
        assert!(none.should_skip_file(Path::new("a/models_gen.go")));
        assert!(none.should_skip_file(Path::new("a/internal/x.go")));
        assert!(!none.should_skip_file(Path::new("a/main.go")));

        let list = ExcludeList::parse("skip.go,pkg/legacy", Path::new("."));
        assert!(list.should_skip_file(Path::new("any/skip.go")));
        assert!(list.should_skip_file(Path::new("./pkg/legacy/old.go")));
        assert!(!list.should_skip_file(Path::new("pkg/legacy2/new.go")));
    }

    #[test]
    fn test_should_skip_dir_rules() {
        let list = ExcludeList::parse("third_party", Path::new("."));
        for dir in ["x/vendor", ".git", "build", "web/node_modules", "lib/third_party"] {
            assert!(list.should_skip_dir(Path::new(dir)), "{dir}");
        }
        assert!(!list.should_skip_dir(Path::new("src/builder")));
    }

    #[test]
    fn test_walk_sources_prunes_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "b.go", ZAP_FILE);
        write(root, "a.go", ZAP_FILE);
        write(root, "vendor/v.go", ZAP_FILE);
        write(root, ".hidden/h.go", ZAP_FILE);
        write(root, "gen/g.go", ZAP_FILE);
        write(root, "pkg/c.go", ZAP_FILE);
        write(root, "pkg/c_gen.go", ZAP_FILE);
        write(root, "notes.txt", "x");

        let excludes = ExcludeList::parse("gen", root);
        assert_eq!(listed(root, &excludes), vec![".hidden/h.go", "a.go", "b.go", "pkg/c.go"]);
    }

    #[test]
    fn test_walk_sources_excludes_path_entries() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "keep/k.go", ZAP_FILE);
        write(root, "skip/me/s.go", ZAP_FILE);

        let excludes = ExcludeList::parse("skip/me", root);
        assert_eq!(listed(root, &excludes), vec!["keep/k.go"]);
    }

    #[test]
    fn test_walk_root_obeys_directory_rules() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "vendor/v.go", ZAP_FILE);
        write(dir.path(), "legacy/l.go", ZAP_FILE);

        let none = ExcludeList::default();
        assert!(listed(&dir.path().join("vendor"), &none).is_empty());

        let excludes = ExcludeList::parse("legacy", dir.path());
        assert!(listed(&dir.path().join("legacy"), &excludes).is_empty());
        assert_eq!(listed(&dir.path().join("legacy"), &none), vec!["l.go"]);
    }

    #[test]
    fn test_run_patch_preview_and_write() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a.go", ZAP_FILE);

        let preview_cfg = PatchConfig::default();
        let ctx = PatchContext::new(&preview_cfg, "", root);
        let mut buf = Vec::new();
        assert_eq!(run_patch(&mut buf, root, &ExcludeList::default(), &ctx).unwrap(), 1);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("[PATCH] a.go"));
        assert!(text.contains("zap.String(\"fl\", \"a.go:6\")"));
        assert_eq!(std::fs::read_to_string(root.join("a.go")).unwrap(), ZAP_FILE);

        let write_cfg = PatchConfig { write: true, ..Default::default() };
        let ctx = PatchContext::new(&write_cfg, "", root);
        let mut buf = Vec::new();
        run_patch(&mut buf, root, &ExcludeList::default(), &ctx).unwrap();
        let written = std::fs::read_to_string(root.join("a.go")).unwrap();
        assert!(written.contains("zap.String(\"fl\", \"a.go:6\")"));

        let mut buf = Vec::new();
        assert_eq!(run_patch(&mut buf, root, &ExcludeList::default(), &ctx).unwrap(), 0);
    }

    #[test]
    fn test_run_verify_summary() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "a.go", ZAP_FILE);
        write(root, "plain.go", "package a\n\nfunc B() {}\n");

        let cfg = PatchConfig::default();
        let ctx = PatchContext::new(&cfg, "", root);
        let mut buf = Vec::new();
        let summary = run_verify(&mut buf, root, &ExcludeList::default(), &ctx, false).unwrap();
        assert_eq!(summary.total_calls, 1);
        assert_eq!(summary.missing_count, 1);
        assert_eq!(summary.issue_files, vec!["a.go"]);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("[VERIFY] a.go: total=1 missing=1 mismatch=0"));
        assert!(text.contains("files with issues:"));
    }

    #[test]
    fn test_single_file_target() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "one.go", ZAP_FILE);
        write(root, "two.go", ZAP_FILE);

        let cfg = PatchConfig::default();
        let ctx = PatchContext::new(&cfg, "", root);
        let mut buf = Vec::new();
        assert_eq!(run_patch(&mut buf, &root.join("one.go"), &ExcludeList::default(), &ctx).unwrap(), 1);
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("[PATCH] one.go"));
        assert!(!text.contains("two.go"));
    }
}
