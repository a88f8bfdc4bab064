//! Run-wide patch configuration, built once from the command line and then
//! passed by reference to every stage.

use crate::PatchError;

/// Field key injected when `--field` is not given ("file:line").
pub const DEFAULT_FIELD_KEY: &str = "fl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchConfig {
    /// Key of the tracked field, e.g. `fl` in `zap.String("fl", "main.go:7")`.
    pub field_key: String,
    /// Key to remove. When set, nothing is injected.
    pub delete_key: Option<String>,
    /// Write results back instead of printing a preview.
    pub write: bool,
    /// Append ` | <import path>.<function>` to the injected value.
    pub with_func: bool,
    /// Only report missing/mismatched fields.
    pub verify: bool,
    /// Insertion index into the field arguments (message excluded). `None` = first.
    pub position: Option<usize>,
    /// Sort zap field arguments by key after inserting.
    pub sort: bool,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            field_key: DEFAULT_FIELD_KEY.to_string(),
            delete_key: None,
            write: false,
            with_func: false,
            verify: false,
            position: None,
            sort: false,
        }
    }
}

impl PatchConfig {
    /// The active delete key, if delete mode is on.
    pub fn delete_key(&self) -> Option<&str> {
        self.delete_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Convert the configured field position into an index into the full
    /// argument list. Argument 0 is always the message.
    pub fn insertion_index(&self, arg_count: usize) -> usize {
        let wanted = self.position.map_or(1, |p| p.saturating_add(1));
        wanted.clamp(1, arg_count.max(1))
    }
}

/// Reject a delete key combined with an explicitly given field key.
pub fn check_flag_conflicts(delete_set: bool, field_set: bool) -> Result<(), PatchError> {
    if delete_set && field_set {
        return Err(PatchError::FlagConflict);
    }
    Ok(())
}
