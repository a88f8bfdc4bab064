//! Output for patched files: write back and reformat, or print a preview.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;
use std::process::{Command, ExitStatus};

use thiserror::Error;
use tracing::warn;

use crate::PatchError;
use crate::process::FileOutcome;

/// External formatter run on written files.
pub const GOFMT: &str = "gofmt";

/// Lines of context on each side of a modified line.
const SNIPPET_RADIUS: usize = 3;
/// Lines printed when no modified lines were recorded.
const PREVIEW_HEAD_LINES: usize = 40;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("gofmt not found in PATH")]
    NotFound,

    #[error("failed to start gofmt: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("gofmt exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },
}

/// Run `gofmt -w` on `path`.
pub fn run_gofmt(path: &Path) -> Result<(), FormatError> {
    let output = match Command::new(GOFMT).arg("-w").arg(path).output() {
        Ok(output) => output,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(FormatError::NotFound),
        Err(e) => return Err(FormatError::Spawn(e)),
    };
    if !output.status.success() {
        return Err(FormatError::Failed {
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Write or preview a patched file. Does nothing unless the file was
/// modified and the rendered text differs from what is on disk.
///
/// Returns whether the file was reported.
pub fn apply_patch_if_modified(
    out: &mut dyn Write,
    path: &Path,
    rel: &str,
    outcome: &FileOutcome,
    write: bool,
) -> Result<bool, PatchError> {
    if !outcome.modified {
        return Ok(false);
    }
    if std::fs::read_to_string(path).is_ok_and(|current| current == outcome.output) {
        return Ok(false);
    }

    writeln!(out, "[PATCH] {rel}")?;

    if write {
        std::fs::write(path, &outcome.output).map_err(|source| PatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match run_gofmt(path) {
            Ok(()) => {}
            Err(FormatError::NotFound) => warn!("gofmt not found in PATH, skipping format"),
            Err(e) => warn!(path = %rel, error = %e, "gofmt failed, keeping unformatted file"),
        }
    } else {
        print_preview(out, &outcome.output, rel, &outcome.modified_lines)?;
    }
    Ok(true)
}

/// Print snippets around each modified line, or the head of the file.
pub fn print_preview(out: &mut dyn Write, text: &str, rel: &str, modified_lines: &[usize]) -> std::io::Result<()> {
    writeln!(out, "--- preview ({rel}) ---")?;
    let lines: Vec<&str> = text.split('\n').collect();

    if modified_lines.is_empty() {
        for line in lines.iter().take(PREVIEW_HEAD_LINES) {
            writeln!(out, "{line}")?;
        }
        if lines.len() > PREVIEW_HEAD_LINES {
            writeln!(out, "... (truncated) ...")?;
        }
    } else {
        let unique: BTreeSet<usize> = modified_lines.iter().copied().collect();
        for l in unique {
            let start = l.saturating_sub(SNIPPET_RADIUS).max(1);
            let end = (l + SNIPPET_RADIUS).min(lines.len());
            writeln!(out, "--- snippet around L{l} ({rel}) ---")?;
            for i in start..=end {
                writeln!(out, "{i:>5}: {}", lines[i - 1])?;
            }
        }
    }

    writeln!(out, "--- end preview ---")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (1..=n).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n")
    }

    #[test]
    fn test_preview_snippets_deduplicated_and_sorted() {
        let mut buf = Vec::new();
        print_preview(&mut buf, &numbered(10), "a.go", &[9, 2, 2]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let expected = "--- preview (a.go) ---\n\
            --- snippet around L2 (a.go) ---\n    1: line1\n    2: line2\n    3: line3\n    4: line4\n    5: line5\n\
            --- snippet around L9 (a.go) ---\n    6: line6\n    7: line7\n    8: line8\n    9: line9\n   10: line10\n\
            --- end preview ---\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_preview_without_lines_prints_head() {
        let mut buf = Vec::new();
        print_preview(&mut buf, &numbered(45), "b.go", &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("line40\n... (truncated) ...\n--- end preview ---\n"));
        assert!(!text.contains("line41"));
    }

    #[test]
    fn test_apply_patch_skips_unmodified_and_identical() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("same.go");
        std::fs::write(&path, "package a\n").unwrap();

        let mut buf = Vec::new();
        let unmodified = FileOutcome::unmodified();
        assert!(!apply_patch_if_modified(&mut buf, &path, "same.go", &unmodified, false).unwrap());

        let identical = FileOutcome { modified: true, output: "package a\n".into(), modified_lines: vec![1] };
        assert!(!apply_patch_if_modified(&mut buf, &path, "same.go", &identical, false).unwrap());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_apply_patch_preview_leaves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.go");
        std::fs::write(&path, "package a\n").unwrap();

        let outcome = FileOutcome { modified: true, output: "package b\n".into(), modified_lines: vec![1] };
        let mut buf = Vec::new();
        assert!(apply_patch_if_modified(&mut buf, &path, "p.go", &outcome, false).unwrap());
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("[PATCH] p.go\n--- preview (p.go) ---\n"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "package a\n");
    }

    #[test]
    fn test_apply_patch_write_overwrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("w.go");
        std::fs::write(&path, "package a\n").unwrap();

        let outcome = FileOutcome { modified: true, output: "package b\n".into(), modified_lines: vec![1] };
        let mut buf = Vec::new();
        assert!(apply_patch_if_modified(&mut buf, &path, "w.go", &outcome, true).unwrap());
        assert_eq!(String::from_utf8(buf).unwrap(), "[PATCH] w.go\n");
        // gofmt may or may not be installed; either way the new text is kept.
        assert!(std::fs::read_to_string(&path).unwrap().contains("package b"));
    }
}
