//! Error policy and the diagnostics sink shared by every recognizer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ExtractError, ExtractErrors};

/// How the pipeline reacts to an extraction error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Stop at the first error.
    #[default]
    FailFast,
    /// Record every error, skip the offending item and keep going.
    CollectAll,
}

/// A non-fatal finding that accompanies a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    /// A vector no peripheral claimed.
    UnmatchedInterrupt { name: String, key: String, value: u32 },
    /// A profile override that no register or field used.
    UnusedOverride { key: String },
    /// A profile patch whose target text does not occur in the header.
    UnappliedPatch { from: String },
    /// Two vectors filed under one key; the earlier one was dropped.
    DuplicateInterrupt {
        key: String,
        dropped: String,
        kept: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnmatchedInterrupt { name, key, value } if name == key => {
                write!(f, "interrupt {name} ({value}) is not attached to any peripheral")
            }
            Diagnostic::UnmatchedInterrupt { name, key, value } => write!(
                f,
                "interrupt {name} ({value}, key {key}) is not attached to any peripheral"
            ),
            Diagnostic::UnusedOverride { key } => write!(f, "override '{key}' was never used"),
            Diagnostic::UnappliedPatch { from } => {
                write!(f, "patch target not found in header: {from:?}")
            }
            Diagnostic::DuplicateInterrupt { key, dropped, kept } => write!(
                f,
                "interrupt {dropped} dropped: {kept} is filed under the same key {key}"
            ),
        }
    }
}

/// Collects errors and diagnostics for one pipeline run.
#[derive(Debug)]
pub struct Diagnostics {
    policy: ErrorPolicy,
    errors: Vec<ExtractError>,
    warnings: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self {
            policy,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record an error.
    ///
    /// Under [`ErrorPolicy::FailFast`] this returns the error immediately so
    /// the caller can propagate it with `?`; under
    /// [`ErrorPolicy::CollectAll`] it returns `Ok(())` and the caller skips
    /// the offending item.
    pub fn report(&mut self, error: ExtractError) -> Result<(), ExtractErrors> {
        tracing::error!(%error, "extraction error");
        self.errors.push(error);
        match self.policy {
            ErrorPolicy::FailFast => Err(ExtractErrors(std::mem::take(&mut self.errors))),
            ErrorPolicy::CollectAll => Ok(()),
        }
    }

    /// Record a non-fatal diagnostic.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!(%diagnostic, "extraction diagnostic");
        self.warnings.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Close the run: every recorded error, or the diagnostics when there were none.
    pub fn finish(self) -> Result<Vec<Diagnostic>, ExtractErrors> {
        if self.errors.is_empty() {
            Ok(self.warnings)
        } else {
            Err(ExtractErrors(self.errors))
        }
    }
}
