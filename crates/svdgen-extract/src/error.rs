//! Error types for header extraction and device profiles.

use std::fmt;
use std::path::PathBuf;

/// Recognizer stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Metadata,
    BaseAddress,
    Interrupt,
    Peripheral,
    Register,
    Field,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Metadata => "metadata",
            Stage::BaseAddress => "base-address",
            Stage::Interrupt => "interrupt",
            Stage::Peripheral => "peripheral",
            Stage::Register => "register",
            Stage::Field => "field",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while extracting a device model from a header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    /// A recognizer found text it could not interpret.
    #[error("{stage}: line {line}: cannot interpret `{text}`: {detail}")]
    UnmatchedPattern {
        stage: Stage,
        /// 1-based line in the patched header; 0 when not tied to a line.
        line: usize,
        text: String,
        detail: String,
    },

    /// A symbol was referenced before it was defined, or never defined.
    #[error("line {line}: unresolved symbol '{symbol}' referenced by '{referenced_by}'")]
    UnresolvedSymbol {
        symbol: String,
        referenced_by: String,
        /// Line of the referencing macro.
        line: usize,
    },

    /// An alias chain revisits one of its own symbols.
    #[error("cyclic alias: {}", chain.join(" -> "))]
    CyclicAlias { chain: Vec<String> },

    /// A bit-mask macro has no bits set.
    #[error("line {line}: field '{macro_name}' has an all-zero mask")]
    EmptyMask { macro_name: String, line: usize },

    /// A bit-mask macro does not fit a 32-bit register.
    #[error("line {line}: field '{macro_name}' mask 0x{mask} is wider than 32 bits")]
    MaskOverflow {
        macro_name: String,
        mask: String,
        line: usize,
    },

    /// Two peripheral macros declare the same name.
    #[error("duplicate peripheral '{name}'")]
    DuplicatePeripheral { name: String },

    /// Two members of one structure declare the same register.
    #[error("duplicate register '{register}' in type '{type_name}'")]
    DuplicateRegister { type_name: String, register: String },

    /// No `typedef struct` block closes with the requested name.
    #[error("line {line}: type '{type_name}' not found")]
    TypeNotFound {
        type_name: String,
        /// Line of the peripheral macro naming the type.
        line: usize,
    },

    /// The assembled model violates a structural invariant.
    #[error("invalid device model: {detail}")]
    InvalidModel { detail: String },
}

/// Every error recorded during one extraction run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractErrors(pub Vec<ExtractError>);

impl ExtractErrors {
    pub fn iter(&self) -> std::slice::Iter<'_, ExtractError> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ExtractErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{single}"),
            errors => {
                write!(f, "{} extraction errors", errors.len())?;
                for error in errors {
                    write!(f, "\n  {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ExtractErrors {}

impl From<ExtractError> for ExtractErrors {
    fn from(error: ExtractError) -> Self {
        Self(vec![error])
    }
}

impl<'a> IntoIterator for &'a ExtractErrors {
    type Item = &'a ExtractError;
    type IntoIter = std::slice::Iter<'a, ExtractError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Errors that can occur while loading a device profile.
#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    /// TOML deserialization error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// I/O error reading a profile file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Profile file not found.
    #[error("profile file not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// No built-in profile has this name.
    #[error("unknown built-in profile '{name}'")]
    UnknownBuiltin { name: String },

    /// An override key is not of the form `Type:Register[:Field]`.
    #[error("invalid override key '{key}': {detail}")]
    InvalidKey { key: String, detail: String },

    /// A rewrite rule carries a malformed regular expression.
    #[error("invalid pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// Validation error in a profile definition.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type alias for profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_error_displays_inline() {
        let errors = ExtractErrors::from(ExtractError::TypeNotFound {
            type_name: "FOO_TypeDef".into(),
            line: 42,
        });
        assert_eq!(errors.to_string(), "line 42: type 'FOO_TypeDef' not found");
    }

    #[test]
    fn multiple_errors_listed() {
        let errors = ExtractErrors(vec![
            ExtractError::EmptyMask {
                macro_name: "ADC_CTR_PWD".into(),
                line: 7,
            },
            ExtractError::CyclicAlias {
                chain: vec!["A_BASE".into(), "B_BASE".into(), "A_BASE".into()],
            },
        ]);
        let text = errors.to_string();
        assert!(text.starts_with("2 extraction errors"));
        assert!(text.contains("A_BASE -> B_BASE -> A_BASE"));
    }

    #[test]
    fn unmatched_pattern_names_stage() {
        let err = ExtractError::UnmatchedPattern {
            stage: Stage::Peripheral,
            line: 12,
            text: "FOO_BASE * 2".into(),
            detail: "unsupported address expression".into(),
        };
        assert!(err.to_string().starts_with("peripheral: line 12:"));
    }
}
