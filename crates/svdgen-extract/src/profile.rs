//! Device profiles: TOML configuration for one device family.
//!
//! A profile carries the device and CPU metadata the header does not state
//! in a machine-readable way, the literal patches correcting the header, the
//! naming rules that connect peripherals, interrupts and field macros, and
//! the manual override tables.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};
use svdgen_core::{CpuName, EnumeratedValue, Endian, ValidationIssue};

use crate::error::{ProfileError, Result};
use crate::overrides::{FieldKey, OverrideTables, RegisterKey};
use crate::patch::Patch;

const W7500X: &str = include_str!("../profiles/w7500x.toml");

/// Built-in profiles as `(name, description, source)`.
const BUILTINS: &[(&str, &str, &str)] = &[("w7500x", "WIZnet W7500x (Cortex-M0)", W7500X)];

/// Device identity and version sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceSection {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Literal version, used when no version macro is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Macros whose values form the dotted version, most significant first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub version_macros: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_text: Option<String>,
}

/// Processor core selection and the macros describing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CpuSection {
    pub name: CpuName,
    #[serde(default)]
    pub endian: Endian,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    /// Macro holding the core revision as `0xNNMM`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_macro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nvic_prio_bits: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nvic_prio_bits_macro: Option<String>,
    #[serde(default)]
    pub mpu_present: bool,
    #[serde(default)]
    pub vendor_systick_config: bool,
}

impl Default for CpuSection {
    fn default() -> Self {
        Self::for_core(CpuName::Other)
    }
}

impl CpuSection {
    pub fn for_core(name: CpuName) -> Self {
        Self {
            name,
            endian: Endian::Little,
            revision: None,
            revision_macro: None,
            nvic_prio_bits: None,
            nvic_prio_bits_macro: None,
            mpu_present: false,
            vendor_systick_config: false,
        }
    }
}

/// Naming conventions of the header dialect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExtractionSection {
    /// Suffix of structure types that describe peripherals; empty accepts all.
    #[serde(default = "default_type_suffix")]
    pub type_suffix: String,
    /// Group names that absorb one trailing letter (`GPIOA` -> `GPIO`).
    #[serde(default = "default_group_prefixes")]
    pub group_prefixes: Vec<String>,
    /// Byte distance between array elements.
    #[serde(default = "default_register_stride")]
    pub register_stride: u32,
}

fn default_type_suffix() -> String {
    "_TypeDef".into()
}

fn default_group_prefixes() -> Vec<String> {
    vec!["GPIO".into()]
}

fn default_register_stride() -> u32 {
    4
}

impl Default for ExtractionSection {
    fn default() -> Self {
        Self {
            type_suffix: default_type_suffix(),
            group_prefixes: default_group_prefixes(),
            register_stride: default_register_stride(),
        }
    }
}

/// A compiled regular expression that serializes as its source text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> Result<Self> {
        Regex::new(source)
            .map(Self)
            .map_err(|e| ProfileError::InvalidPattern {
                pattern: source.into(),
                detail: e.to_string(),
            })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn regex(&self) -> &Regex {
        &self.0
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Pattern {
    type Error = ProfileError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.as_str().to_owned()
    }
}

/// Rename a name matching `pattern` with `replace` (`$1` style references).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRule {
    pub pattern: Pattern,
    pub replace: String,
}

impl RewriteRule {
    /// The rewritten name, or `None` when the rule does not match.
    pub fn apply(&self, name: &str) -> Option<String> {
        let re = self.pattern.regex();
        re.is_match(name)
            .then(|| re.replace(name, self.replace.as_str()).into_owned())
    }
}

/// Register lookup rule scoped to one field prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterLookup {
    pub prefix: String,
    #[serde(flatten)]
    pub rule: RewriteRule,
}

/// Substring replacement applied to a field prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRewrite {
    pub from: String,
    pub to: String,
}

/// Complete configuration for one device family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    pub device: DeviceSection,
    #[serde(default)]
    pub cpu: CpuSection,
    #[serde(default)]
    pub extraction: ExtractionSection,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub patches: Vec<Patch>,
    /// Interrupt name -> peripheral name it belongs to.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub interrupt_aliases: BTreeMap<String, String>,
    /// Peripheral name -> interrupt key, first matching rule wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interrupt_keys: Vec<RewriteRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefix_rewrites: Vec<PrefixRewrite>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub register_lookups: Vec<RegisterLookup>,
    /// Extra characters allowed in field names of one register.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_name_chars: BTreeMap<RegisterKey, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub reset_values: BTreeMap<RegisterKey, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub enumerated_values: BTreeMap<FieldKey, Vec<EnumeratedValue>>,
}

impl Profile {
    /// A profile with no corrections for a device using `cpu`.
    pub fn minimal(name: impl Into<String>, cpu: CpuName) -> Self {
        Self {
            device: DeviceSection {
                name: name.into(),
                vendor: None,
                vendor_id: None,
                series: None,
                description: String::new(),
                version: None,
                version_macros: Vec::new(),
                license_text: None,
            },
            cpu: CpuSection::for_core(cpu),
            extraction: ExtractionSection::default(),
            patches: Vec::new(),
            interrupt_aliases: BTreeMap::new(),
            interrupt_keys: Vec::new(),
            prefix_rewrites: Vec::new(),
            register_lookups: Vec::new(),
            field_name_chars: BTreeMap::new(),
            reset_values: BTreeMap::new(),
            enumerated_values: BTreeMap::new(),
        }
    }

    /// Parse a profile from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self> {
        let profile: Profile = toml::from_str(toml_str)?;
        Ok(profile)
    }

    /// Load a profile from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ProfileError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Look up a built-in profile by name (case-insensitive).
    pub fn builtin(name: &str) -> Result<Self> {
        let source = BUILTINS
            .iter()
            .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, _, source)| *source)
            .ok_or_else(|| ProfileError::UnknownBuiltin { name: name.into() })?;
        Self::parse(source)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml(&self) -> Result<String> {
        let toml_str = toml::to_string_pretty(self)?;
        Ok(toml_str)
    }

    /// Override tables for the extraction engine.
    pub fn overrides(&self) -> OverrideTables {
        OverrideTables::new(self.reset_values.clone(), self.enumerated_values.clone())
    }

    /// Extra field-name characters for a register, empty when none.
    pub fn field_name_chars(&self, key: &RegisterKey) -> &str {
        self.field_name_chars
            .get(key)
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Canonical pool key of an interrupt vector name.
    pub fn interrupt_alias<'a>(&'a self, name: &'a str) -> &'a str {
        self.interrupt_aliases
            .get(name)
            .map(String::as_str)
            .unwrap_or(name)
    }

    /// Interrupt key a peripheral claims.
    pub fn interrupt_key(&self, peripheral: &str) -> String {
        self.interrupt_keys
            .iter()
            .find_map(|rule| rule.apply(peripheral))
            .unwrap_or_else(|| peripheral.to_owned())
    }

    /// Validate the profile for structural correctness.
    ///
    /// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();
        let mut error = |message: String| {
            issues.push(ValidationIssue {
                severity: "error",
                message,
            })
        };

        if self.device.name.trim().is_empty() {
            error("device name is empty".into());
        }

        if self.extraction.register_stride == 0 {
            error("register-stride must be positive".into());
        }

        for (index, patch) in self.patches.iter().enumerate() {
            if patch.from.is_empty() {
                error(format!("patch #{} has an empty target", index + 1));
            }
        }

        for (name, target) in &self.interrupt_aliases {
            if target.trim().is_empty() {
                error(format!("interrupt alias '{name}' has an empty target"));
            }
        }

        for rewrite in &self.prefix_rewrites {
            if rewrite.from.is_empty() {
                error(format!("prefix rewrite to '{}' has an empty source", rewrite.to));
            }
        }

        for (key, chars) in &self.field_name_chars {
            if !chars.chars().all(|c| c.is_ascii_alphanumeric()) {
                error(format!(
                    "field-name-chars '{key}' must be ASCII letters or digits, got '{chars}'"
                ));
            }
        }

        for (key, values) in &self.enumerated_values {
            if values.is_empty() {
                error(format!("enumerated values '{key}' are empty"));
            }
            for value in values {
                match (&value.value, value.is_default) {
                    (Some(_), true) => error(format!(
                        "enumerated value '{}' in '{key}' sets both value and is-default",
                        value.name
                    )),
                    (None, false) => error(format!(
                        "enumerated value '{}' in '{key}' has neither value nor is-default",
                        value.name
                    )),
                    _ => {}
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

/// List built-in profiles as `(name, description)` pairs.
pub fn builtin_profiles() -> Vec<(&'static str, &'static str)> {
    BUILTINS.iter().map(|(name, desc, _)| (*name, *desc)).collect()
}
