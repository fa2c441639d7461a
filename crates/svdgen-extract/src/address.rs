//! Base-address resolution.
//!
//! Three passes over the header, in order:
//!
//! 1. literals: `#define UART0_BASE (0x4000C000UL)`
//! 2. aliases: `#define GPIO_BASE AHB_BASE`, followed transitively
//! 3. offsets: `#define UART1_BASE (APB1_BASE + 0x00001000UL)`, in source order

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::diagnostics::Diagnostics;
use crate::error::{ExtractError, ExtractErrors, Stage};
use crate::source::{parse_hex, Source};

static LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*#define[ \t]+([0-9A-Za-z_]+_BASE)[ \t]+\(?[ \t]*0x([0-9a-fA-F]{1,8})[uUlL]*\b",
    )
    .unwrap()
});

static ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*#define[ \t]+([0-9A-Za-z_]+_BASE)[ \t]+\(?[ \t]*([0-9A-Za-z_]+_BASE)[ \t]*\)?[ \t\r]*(?:$|/[/*])",
    )
    .unwrap()
});

static OFFSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*#define[ \t]+([0-9A-Za-z_]+)[ \t]+\([ \t]*([0-9A-Za-z_]+_BASE)[ \t]*\+[ \t]*0x([0-9a-fA-F]{1,8})[uUlL]*[ \t]*\)",
    )
    .unwrap()
});

/// Symbol to absolute address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressTable(BTreeMap<String, u64>);

impl AddressTable {
    /// Run the three passes over `source`.
    ///
    /// A symbol that cannot be resolved is reported and left out of the table.
    pub fn resolve(source: &Source, diag: &mut Diagnostics) -> Result<Self, ExtractErrors> {
        let text = source.text();
        let mut table = BTreeMap::new();

        for caps in LITERAL.captures_iter(text) {
            let (Some(symbol), Some(digits)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            match parse_hex(digits.as_str()) {
                Some(address) => {
                    tracing::debug!(symbol = symbol.as_str(), address, "literal base address");
                    table.insert(symbol.as_str().to_owned(), address);
                }
                None => diag.report(ExtractError::UnmatchedPattern {
                    stage: Stage::BaseAddress,
                    line: source.line_of(symbol.start()),
                    text: digits.as_str().into(),
                    detail: "not a hexadecimal literal".into(),
                })?,
            }
        }
        let literals = table.len();

        let aliases: Vec<(&str, &str, usize)> = ALIAS
            .captures_iter(text)
            .filter_map(|caps| {
                let symbol = caps.get(1)?;
                Some((
                    symbol.as_str(),
                    caps.get(2)?.as_str(),
                    source.line_of(symbol.start()),
                ))
            })
            .collect();
        let links: BTreeMap<&str, &str> = aliases.iter().map(|&(s, t, _)| (s, t)).collect();
        for &(symbol, target, line) in &aliases {
            match follow_alias(symbol, target, line, &table, &links) {
                Ok(address) => {
                    tracing::debug!(symbol, target, address, "aliased base address");
                    table.insert(symbol.to_owned(), address);
                }
                Err(err) => diag.report(err)?,
            }
        }

        for caps in OFFSET.captures_iter(text) {
            let (Some(symbol), Some(base), Some(digits)) = (caps.get(1), caps.get(2), caps.get(3))
            else {
                continue;
            };
            let Some(start) = table.get(base.as_str()).copied() else {
                diag.report(ExtractError::UnresolvedSymbol {
                    symbol: base.as_str().into(),
                    referenced_by: symbol.as_str().into(),
                    line: source.line_of(symbol.start()),
                })?;
                continue;
            };
            match parse_hex(digits.as_str()).and_then(|offset| start.checked_add(offset)) {
                Some(address) => {
                    tracing::debug!(symbol = symbol.as_str(), address, "offset base address");
                    table.insert(symbol.as_str().to_owned(), address);
                }
                None => diag.report(ExtractError::UnmatchedPattern {
                    stage: Stage::BaseAddress,
                    line: source.line_of(symbol.start()),
                    text: caps[0].to_owned(),
                    detail: "offset does not produce a valid address".into(),
                })?,
            }
        }

        tracing::info!(
            literals,
            aliases = aliases.len(),
            total = table.len(),
            "base addresses resolved"
        );
        Ok(Self(table))
    }

    pub fn get(&self, symbol: &str) -> Option<u64> {
        self.0.get(symbol).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Follow an alias chain down to a literal.
fn follow_alias(
    symbol: &str,
    target: &str,
    line: usize,
    literals: &BTreeMap<String, u64>,
    links: &BTreeMap<&str, &str>,
) -> Result<u64, ExtractError> {
    let mut chain = vec![symbol.to_owned()];
    let mut current = target;
    loop {
        if chain.iter().any(|s| s == current) {
            chain.push(current.to_owned());
            return Err(ExtractError::CyclicAlias { chain });
        }
        if let Some(address) = literals.get(current) {
            return Ok(*address);
        }
        match links.get(current) {
            Some(&next) => {
                chain.push(current.to_owned());
                current = next;
            }
            None => {
                return Err(ExtractError::UnresolvedSymbol {
                    symbol: current.to_owned(),
                    referenced_by: symbol.to_owned(),
                    line,
                })
            }
        }
    }
}
