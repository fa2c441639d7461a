//! Device version and core configuration read from header macros.

use regex::Regex;

use crate::diagnostics::Diagnostics;
use crate::error::{ExtractError, ExtractErrors, Stage};
use crate::profile::Profile;
use crate::source::{parse_hex, Source};

/// Metadata the header states through configuration macros.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    pub version: String,
    /// Core revision as `rNpM`.
    pub revision: String,
    pub nvic_prio_bits: u8,
}

/// Numeric value of `#define NAME value`, hexadecimal or decimal.
fn macro_value(source: &Source, name: &str) -> Option<u64> {
    let pattern = format!(
        r"(?m)^[ \t]*#define[ \t]+{}[ \t]+\(?[ \t]*(?:0[xX]([0-9A-Fa-f]+)|([0-9]+))[uUlL]*\b",
        regex::escape(name)
    );
    let re = Regex::new(&pattern).ok()?;
    let caps = re.captures(source.text())?;
    match (caps.get(1), caps.get(2)) {
        (Some(hex), _) => parse_hex(hex.as_str()),
        (None, Some(dec)) => dec.as_str().parse().ok(),
        _ => None,
    }
}

/// Read a configured macro, reporting it when absent.
fn required(
    source: &Source,
    name: &str,
    diag: &mut Diagnostics,
) -> Result<Option<u64>, ExtractErrors> {
    let value = macro_value(source, name);
    if value.is_none() {
        diag.report(ExtractError::UnmatchedPattern {
            stage: Stage::Metadata,
            line: 0,
            text: name.to_owned(),
            detail: "configured macro is not defined".into(),
        })?;
    }
    Ok(value)
}

/// Recognize version, core revision and NVIC priority bits.
pub fn recognize(
    source: &Source,
    profile: &Profile,
    diag: &mut Diagnostics,
) -> Result<Metadata, ExtractErrors> {
    let version = if profile.device.version_macros.is_empty() {
        profile.device.version.clone().unwrap_or_else(|| "1.0".into())
    } else {
        let mut parts = Vec::new();
        for name in &profile.device.version_macros {
            if let Some(value) = required(source, name, diag)? {
                parts.push(format!("{value:x}"));
            }
        }
        parts.join(".")
    };

    let cpu = &profile.cpu;
    let revision = match &cpu.revision_macro {
        Some(name) => required(source, name, diag)?
            .map(|value| format!("r{:x}p{:x}", value >> 8, value & 0xFF)),
        None => None,
    }
    .or_else(|| cpu.revision.clone())
    .unwrap_or_else(|| "r0p0".into());

    let nvic_prio_bits = match &cpu.nvic_prio_bits_macro {
        Some(name) => match required(source, name, diag)? {
            Some(value) => match u8::try_from(value) {
                Ok(bits) => Some(bits),
                Err(_) => {
                    diag.report(ExtractError::UnmatchedPattern {
                        stage: Stage::Metadata,
                        line: 0,
                        text: name.clone(),
                        detail: format!("{value} priority bits is out of range"),
                    })?;
                    None
                }
            },
            None => None,
        },
        None => None,
    }
    .or(cpu.nvic_prio_bits)
    .unwrap_or_else(|| cpu.name.default_nvic_prio_bits());

    tracing::info!(%version, %revision, nvic_prio_bits, "device metadata recognised");
    Ok(Metadata {
        version,
        revision,
        nvic_prio_bits,
    })
}
