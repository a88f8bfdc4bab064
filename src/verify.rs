//! Read-only checking of injected fields.

use std::io::Write;

use serde::Serialize;

use crate::callsite::{
    CallTarget, FieldCheck, check_flat_field, check_wrapped_field, collect_existing_fields,
    find_wrapped_field,
};
use crate::syntax::CallExpr;

/// Verdict for one target call. Issues carry the printable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallStatus {
    Ok,
    Missing(String),
    Mismatch(String),
}

/// Check the tracked field of a classified target call without changing it.
pub fn verify_call(call: &CallExpr, target: &CallTarget, key: &str) -> CallStatus {
    let head = format!("{}:{}: zap.{}", target.rel_path, target.line(), target.method);
    let expected = &target.expected;

    if call.ellipsis {
        let wrapped = call.args.last().and_then(|last| find_wrapped_field(last, key));
        let Some(wrapped) = wrapped else {
            return CallStatus::Missing(format!(
                "{head} missing field '{key}' (ellipsis call), expected='{expected}'"
            ));
        };
        return match check_wrapped_field(wrapped.field, expected) {
            FieldCheck::Ok => CallStatus::Ok,
            FieldCheck::Mismatch { actual } => CallStatus::Mismatch(format!(
                "{head} field '{key}' mismatch actual='{actual}' expected='{expected}'"
            )),
            FieldCheck::Malformed(detail) => {
                CallStatus::Mismatch(format!("{head} field '{key}' {detail}"))
            }
        };
    }

    let existing = collect_existing_fields(call).join(", ");
    let Some(field) = target.existing_index.and_then(|i| call.args.get(i)) else {
        return CallStatus::Missing(format!(
            "{head} missing field '{key}', expected='{expected}', existing fields: [{existing}]"
        ));
    };
    match check_flat_field(field, expected) {
        FieldCheck::Ok => CallStatus::Ok,
        FieldCheck::Mismatch { actual } => CallStatus::Mismatch(format!(
            "{head} field '{key}' mismatch actual='{actual}' expected='{expected}', existing fields: [{existing}]"
        )),
        FieldCheck::Malformed(detail) => CallStatus::Mismatch(format!(
            "{head} field '{key}' {detail}, existing fields: [{existing}]"
        )),
    }
}

// ─── Reports ─────────────────────────────────────────────────────────

/// Verification counts and issue lines for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileReport {
    pub rel_path: String,
    pub total: usize,
    pub missing: usize,
    pub mismatch: usize,
    pub issues: Vec<String>,
}

impl FileReport {
    pub fn new(rel_path: impl Into<String>) -> Self {
        Self { rel_path: rel_path.into(), ..Default::default() }
    }

    pub fn record(&mut self, status: CallStatus) {
        self.total += 1;
        match status {
            CallStatus::Ok => {}
            CallStatus::Missing(msg) => {
                self.missing += 1;
                self.issues.push(msg);
            }
            CallStatus::Mismatch(msg) => {
                self.mismatch += 1;
                self.issues.push(msg);
            }
        }
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }
}

/// Run-wide totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySummary {
    pub total_calls: usize,
    pub missing_count: usize,
    pub mismatch_count: usize,
    pub issue_files: Vec<String>,
}

impl VerifySummary {
    pub fn add(&mut self, report: &FileReport) {
        self.total_calls += report.total;
        self.missing_count += report.missing;
        self.mismatch_count += report.mismatch;
        if report.has_issues() {
            self.issue_files.push(report.rel_path.clone());
        }
    }

    pub fn is_clean(&self) -> bool {
        self.missing_count == 0 && self.mismatch_count == 0
    }
}

/// Print the per-file line and issue list; files without issues print nothing.
pub fn print_file_report(out: &mut dyn Write, report: &FileReport) -> std::io::Result<()> {
    if !report.has_issues() {
        return Ok(());
    }
    writeln!(
        out,
        "[VERIFY] {}: total={} missing={} mismatch={}",
        report.rel_path, report.total, report.missing, report.mismatch
    )?;
    for issue in &report.issues {
        writeln!(out, "{issue}")?;
    }
    Ok(())
}

pub fn print_summary(out: &mut dyn Write, summary: &VerifySummary, json: bool) -> std::io::Result<()> {
    if json {
        let text = serde_json::to_string_pretty(summary).map_err(std::io::Error::other)?;
        return writeln!(out, "{text}");
    }

    writeln!(out, "\n===== VERIFY SUMMARY =====")?;
    writeln!(out, "total calls: {}", summary.total_calls)?;
    writeln!(out, "missing: {}", summary.missing_count)?;
    writeln!(out, "mismatch: {}", summary.mismatch_count)?;
    if summary.is_clean() {
        writeln!(out, "All injections look correct.")?;
    } else {
        writeln!(out, "files with issues:")?;
        for file in &summary.issue_files {
            writeln!(out, "  - {file}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(missing: usize, mismatch: usize) -> FileReport {
        let mut r = FileReport::new("pkg/a.go");
        r.record(CallStatus::Ok);
        for i in 0..missing {
            r.record(CallStatus::Missing(format!("missing {i}")));
        }
        for i in 0..mismatch {
            r.record(CallStatus::Mismatch(format!("mismatch {i}")));
        }
        r
    }

    #[test]
    fn test_file_report_counts() {
        let r = report(2, 1);
        assert_eq!((r.total, r.missing, r.mismatch), (4, 2, 1));
        assert_eq!(r.issues.len(), 3);
    }

    #[test]
    fn test_print_file_report_skips_clean_files() {
        let mut buf = Vec::new();
        print_file_report(&mut buf, &report(0, 0)).unwrap();
        assert!(buf.is_empty());

        print_file_report(&mut buf, &report(1, 0)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "[VERIFY] pkg/a.go: total=2 missing=1 mismatch=0\nmissing 0\n");
    }

    #[test]
    fn test_summary_text_clean() {
        let mut summary = VerifySummary::default();
        summary.add(&report(0, 0));
        let mut buf = Vec::new();
        print_summary(&mut buf, &summary, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("===== VERIFY SUMMARY ====="));
        assert!(text.contains("total calls: 1\nmissing: 0\nmismatch: 0\n"));
        assert!(text.contains("All injections look correct."));
    }

    #[test]
    fn test_summary_text_lists_issue_files() {
        let mut summary = VerifySummary::default();
        summary.add(&report(0, 1));
        let mut buf = Vec::new();
        print_summary(&mut buf, &summary, false).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("files with issues:\n  - pkg/a.go\n"));
        assert!(!text.contains("All injections look correct."));
    }

    #[test]
    fn test_summary_json_uses_camel_case() {
        let mut summary = VerifySummary::default();
        summary.add(&report(1, 2));
        let mut buf = Vec::new();
        print_summary(&mut buf, &summary, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["totalCalls"], 4);
        assert_eq!(value["missingCount"], 1);
        assert_eq!(value["mismatchCount"], 2);
        assert_eq!(value["issueFiles"][0], "pkg/a.go");
    }
}
