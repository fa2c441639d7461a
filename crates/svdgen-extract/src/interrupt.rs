//! Interrupt vector table.
//!
//! Vectors are read from the `IRQn_Type` enumeration and parked in a pending
//! pool keyed by the name of the peripheral they belong to. Peripherals claim
//! them as they are extracted; whatever is left over at the end is reported.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use svdgen_core::Interrupt;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ExtractError, ExtractErrors, Stage};
use crate::profile::Profile;
use crate::source::Source;

static VECTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*([0-9A-Za-z_]+)_IRQn[ \t]*=[ \t]*(-?[0-9]+)[ \t]*,?[ \t]*(?:/\*!?<?[ \t]*(.*?)[ \t]*\*/)?",
    )
    .unwrap()
});

/// Interrupts not yet attached to a peripheral.
#[derive(Debug, Clone, Default)]
pub struct InterruptPool {
    pending: BTreeMap<String, Interrupt>,
    max_value: Option<u32>,
}

impl InterruptPool {
    /// Read every device vector (non-negative number) from `source`.
    ///
    /// Vectors are filed under the profile's interrupt alias of their name.
    pub fn scan(
        source: &Source,
        profile: &Profile,
        diag: &mut Diagnostics,
    ) -> Result<Self, ExtractErrors> {
        let mut pool = Self::default();
        let mut exceptions = 0usize;

        for caps in VECTOR.captures_iter(source.text()) {
            let (Some(name), Some(number)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if number.as_str().starts_with('-') {
                exceptions += 1;
                continue;
            }
            let Ok(value) = number.as_str().parse::<u32>() else {
                diag.report(ExtractError::UnmatchedPattern {
                    stage: Stage::Interrupt,
                    line: source.line_of(name.start()),
                    text: caps[0].to_owned(),
                    detail: "vector number out of range".into(),
                })?;
                continue;
            };

            let name = name.as_str();
            let key = profile.interrupt_alias(name);
            let description = caps
                .get(3)
                .map(|d| d.as_str().trim())
                .filter(|d| !d.is_empty())
                .map(str::to_owned);
            let interrupt = Interrupt {
                name: name.to_owned(),
                description,
                value,
            };

            if let Some(previous) = pool.pending.insert(key.to_owned(), interrupt) {
                diag.warn(Diagnostic::DuplicateInterrupt {
                    key: key.to_owned(),
                    dropped: previous.name,
                    kept: name.to_owned(),
                });
            }
            pool.max_value = Some(pool.max_value.map_or(value, |max| max.max(value)));
        }

        tracing::info!(
            vectors = pool.pending.len(),
            exceptions,
            "interrupt vectors scanned"
        );
        Ok(pool)
    }

    pub fn get(&self, key: &str) -> Option<&Interrupt> {
        self.pending.get(key)
    }

    /// Attach the vector filed under `key`, removing it from the pool when
    /// `release` is set.
    pub fn claim(&mut self, key: &str, release: bool) -> Option<Interrupt> {
        let interrupt = if release {
            self.pending.remove(key)
        } else {
            self.pending.get(key).cloned()
        };
        if let Some(interrupt) = &interrupt {
            tracing::debug!(key, vector = %interrupt.name, release, "interrupt claimed");
        }
        interrupt
    }

    /// Number of device interrupts: highest vector number plus one.
    pub fn device_num_interrupts(&self) -> Option<u32> {
        self.max_value.map(|max| max + 1)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Unclaimed vectors with their pool keys, in key order.
    pub fn leftovers(self) -> impl Iterator<Item = (String, Interrupt)> {
        self.pending.into_iter()
    }
}
