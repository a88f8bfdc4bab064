//! # zapsite — call-site fields for zap logging calls
//!
//! Rewrites Go sources so that every `zap.L().<Level>(...)` call carries a
//! `zap.String("fl", "<file>:<line>")` field pointing back at itself. The same
//! machinery deletes a field by key, verifies existing fields without writing,
//! and wraps `fields...` expansions in `append([]zap.Field{...}, fields...)...`.
//!
//! ## Library usage
//!
//! The binary is a thin CLI over this crate. The per-file pipeline lives in
//! [`process::Patcher`]; directory runs go through [`walk::run_patch`] and
//! [`walk::run_verify`].

pub mod callsite;
pub mod config;
pub mod error;
pub mod funcs;
pub mod mutate;
pub mod paths;
pub mod preview;
pub mod process;
pub mod render;
pub mod syntax;
pub mod verify;
pub mod walk;

pub use config::{DEFAULT_FIELD_KEY, PatchConfig};
pub use error::{ParseError, PatchError};
pub use process::{FileOutcome, PatchContext, Patcher};

// ─── Property-based tests (proptest) ─────────────────────────────────
