//! Literal text corrections applied to the header before extraction.

use serde::{Deserialize, Serialize};

/// Replace every occurrence of `from` with `to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub from: String,
    pub to: String,
}

impl Patch {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Result of applying a patch list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// The corrected text.
    pub text: String,
    /// Targets of patches that matched nothing, in patch order.
    pub unapplied: Vec<String>,
}

/// Apply `patches` to `text` in order.
///
/// Each patch sees the output of the previous one.
pub fn apply(text: &str, patches: &[Patch]) -> PatchOutcome {
    let mut text = text.to_owned();
    let mut unapplied = Vec::new();
    for patch in patches {
        let hits = text.matches(patch.from.as_str()).count();
        if patch.from.is_empty() || hits == 0 {
            unapplied.push(patch.from.clone());
            continue;
        }
        tracing::debug!(from = %patch.from, hits, "patch applied");
        text = text.replace(&patch.from, &patch.to);
    }
    PatchOutcome { text, unapplied }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_every_occurrence() {
        let out = apply("UARTR_SR x UARTR_SR", &[Patch::new("UARTR_SR", "UART_RSR")]);
        assert_eq!(out.text, "UART_RSR x UART_RSR");
        assert!(out.unapplied.is_empty());
    }

    #[test]
    fn patches_run_in_order() {
        let patches = [
            Patch::new("ADC_CTR_PWD_PWD", "ADC_CTR_PWD"),
            Patch::new("ADC_CTR_PWD", "ADC_CTR_POWER"),
        ];
        let out = apply("#define ADC_CTR_PWD_PWD (0x1UL)", &patches);
        assert_eq!(out.text, "#define ADC_CTR_POWER (0x1UL)");
    }

    #[test]
    fn missing_target_is_reported() {
        let out = apply("abc", &[Patch::new("xyz", "q"), Patch::new("", "q")]);
        assert_eq!(out.text, "abc");
        assert_eq!(out.unapplied, vec!["xyz".to_string(), String::new()]);
    }
}
