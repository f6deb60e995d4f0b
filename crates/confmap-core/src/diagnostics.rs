//! Non-fatal findings of a decode.
//!
//! A decode that only produced diagnostics is still a successful decode. The
//! lists signal drift between the code and its configuration source:
//!
//! - spare keys: data the code no longer (or never did) read
//! - spare fields: fields the source does not provide, filled from defaults
//! - mismatches: values present with the wrong kind, replaced or dropped

use std::fmt;

use crate::value::ValueKind;

/// What the decoder did after rejecting a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The field received its declared default (cascading for structures).
    Default,
    /// The field kept its previous contents.
    Untouched,
    /// The sequence element was left out.
    Skipped,
}

impl fmt::Display for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Default => "using default",
            Self::Untouched => "left untouched",
            Self::Skipped => "element skipped",
        };
        f.write_str(text)
    }
}

/// A present input value whose kind disagrees with the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// Path of the field or element.
    pub path: String,
    /// What the schema expected (`u16`, `mapping`, `sequence`, ...).
    pub expected: String,
    /// What the source supplied.
    pub found: ValueKind,
    /// Recovery applied.
    pub fallback: Fallback,
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{}`: expected {}, found {} ({})",
            self.path, self.expected, self.found, self.fallback
        )
    }
}

/// Everything a decode noticed but did not fail on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Input keys no schema field claimed.
    pub spare_keys: Vec<String>,
    /// Schema fields with no input key; they hold their defaults.
    pub spare_fields: Vec<String>,
    /// Values rejected because of their kind.
    pub mismatches: Vec<Mismatch>,
}

impl Diagnostics {
    /// Returns `true` when the source and the schema matched exactly.
    pub fn is_clean(&self) -> bool {
        self.spare_keys.is_empty() && self.spare_fields.is_empty() && self.mismatches.is_empty()
    }

    /// Emits the collected findings as `warn` events.
    ///
    /// `context` names what was decoded, e.g. the configuration file.
    pub fn log(&self, context: &str) {
        if !self.spare_keys.is_empty() {
            tracing::warn!(
                config = context,
                keys = %self.spare_keys.join(","),
                "configuration keys were not used; the code may lag behind the configuration or stale keys were not removed"
            );
        }
        if !self.spare_fields.is_empty() {
            tracing::warn!(
                config = context,
                fields = %self.spare_fields.join(","),
                "fields missing from configuration; using declared defaults"
            );
        }
        for mismatch in &self.mismatches {
            tracing::warn!(config = context, %mismatch, "configuration value rejected");
        }
    }
}

/// Joins a parent path and a field tag: `db` + `port` gives `db.port`.
pub(crate) fn child_path(parent: &str, tag: &str) -> String {
    if parent.is_empty() {
        tag.to_owned()
    } else {
        format!("{parent}.{tag}")
    }
}

/// Path of a sequence element: `items` + 1 gives `items[1]`.
pub(crate) fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}
