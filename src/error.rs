//! Unified error types for the patcher.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that abort a run.
#[derive(Error, Debug)]
pub enum PatchError {
    /// Reading or writing a specific source file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing to the output sink (stdout) failed
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    /// Directory traversal failed
    #[error("Directory walk failed: {0}")]
    Walk(#[from] ignore::Error),

    /// Delete key and an explicit field key were both given
    #[error("cannot use --del and --field at the same time; remove one flag or let --field use its default")]
    FlagConflict,

    /// The base directory for relative paths could not be determined
    #[error("failed to determine base dir: {0}")]
    BaseDir(#[source] std::io::Error),

    /// The Go grammar could not be loaded into the parser
    #[error("failed to load Go grammar: {0}")]
    Grammar(#[from] tree_sitter::LanguageError),

    /// Other argument validation error
    #[error("{0}")]
    InvalidArgs(String),
}

/// Why a source buffer could not be turned into a syntax tree.
///
/// Never fatal: the file is reported with a warning and left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("parser produced no syntax tree")]
    NoTree,

    #[error("syntax error at {line}:{column}")]
    Syntax { line: usize, column: usize },

    #[error("missing package clause")]
    MissingPackage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = PatchError::Io {
            path: PathBuf::from("pkg/main.go"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("pkg/main.go"));
        assert!(msg.contains("file not found"));
    }

    #[test]
    fn test_flag_conflict_exact_message() {
        assert_eq!(
            PatchError::FlagConflict.to_string(),
            "cannot use --del and --field at the same time; remove one flag or let --field use its default"
        );
    }

    #[test]
    fn test_base_dir_display() {
        let err = PatchError::BaseDir(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "access denied",
        ));
        assert!(err.to_string().starts_with("failed to determine base dir"));
    }

    #[test]
    fn test_output_error_from_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: PatchError = io_err.into();
        assert!(matches!(err, PatchError::Output(_)));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::Syntax { line: 3, column: 7 };
        assert_eq!(err.to_string(), "syntax error at 3:7");
        assert_eq!(ParseError::MissingPackage.to_string(), "missing package clause");
    }
}
