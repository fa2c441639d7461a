//! Field builder: bit-mask macros to bit-field descriptors.
//!
//! Field macros are named `<prefix>_<register>_<FIELD>` and assign a
//! hexadecimal mask. Three naming patterns are tried in order; the first one
//! that matches anything wins:
//!
//! 1. upper-case field names, plus any extra characters the profile allows
//!    for this register
//! 2. a single mask named after the register itself
//! 3. field names containing digits

use std::sync::LazyLock;

use regex::Regex;
use svdgen_core::{BitRange, Field};

use crate::error::{ExtractError, ExtractErrors, Stage};
use crate::overrides::{FieldKey, RegisterKey};
use crate::pipeline::Context;

const MASK_TAIL: &str =
    r"[ \t]+\(0x([0-9A-Fa-f]+)[uUlL]*\)(?:[ \t]+/\*!?<?[ \t]*(.*?)[ \t]*\*/)?";

static BIT_RANGE_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([0-9]+):0\]\s+bits\s+\(([A-Za-z0-9\s\-]+)\)").unwrap()
});

/// Fields of one register and the union of their masks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    pub fields: Vec<Field>,
    pub reset_mask: u32,
}

fn field_patterns(prefix: &str, lookup: &str, extra: &str) -> [String; 3] {
    let head = format!(
        r"(?m)^[ \t]*#define[ \t]+{}_{}",
        regex::escape(prefix),
        regex::escape(lookup)
    );
    [
        format!("{head}_([A-Z{}_]+){MASK_TAIL}", regex::escape(extra)),
        format!("{head}(){MASK_TAIL}"),
        format!("{head}_([A-Z0-9_]+){MASK_TAIL}"),
    ]
}

/// Collapse runs of whitespace into single spaces.
fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Field description from a mask comment.
///
/// `MODE[1:0] bits (Operating mode)` yields `Operating mode`; any other
/// comment is used as written.
pub fn describe(comment: &str) -> Option<String> {
    let text = BIT_RANGE_DESCRIPTION
        .captures(comment)
        .and_then(|caps| caps.get(2))
        .map_or(comment, |m| m.as_str());
    let text = collapse(text);
    (!text.is_empty()).then_some(text)
}

/// Build the fields of `register`, whose macros are declared under `lookup`.
pub(crate) fn build_fields(
    ctx: &mut Context<'_>,
    prefix: &str,
    register: &str,
    lookup: &str,
) -> Result<FieldSet, ExtractErrors> {
    let source = ctx.source;
    let text = source.text();
    let extra = ctx
        .profile
        .field_name_chars(&RegisterKey::new(prefix, register))
        .to_owned();

    let mut matches = Vec::new();
    for pattern in field_patterns(prefix, lookup, &extra) {
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                ctx.diag.report(ExtractError::UnmatchedPattern {
                    stage: Stage::Field,
                    line: 0,
                    text: format!("{prefix}_{lookup}"),
                    detail: e.to_string(),
                })?;
                return Ok(FieldSet::default());
            }
        };
        matches = re.captures_iter(text).collect();
        if !matches.is_empty() {
            break;
        }
    }

    let mut set = FieldSet::default();
    for caps in &matches {
        let (Some(name), Some(mask)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let line = source.line_of(name.start());
        let macro_name = if name.as_str().is_empty() {
            format!("{prefix}_{lookup}")
        } else {
            format!("{prefix}_{lookup}_{}", name.as_str())
        };

        let mask = match u64::from_str_radix(mask.as_str(), 16) {
            Ok(0) => {
                ctx.diag.report(ExtractError::EmptyMask { macro_name, line })?;
                continue;
            }
            Ok(value) => u32::try_from(value).ok(),
            Err(_) => None,
        };
        let Some(mask) = mask else {
            ctx.diag.report(ExtractError::MaskOverflow {
                macro_name,
                mask: caps[2].to_owned(),
                line,
            })?;
            continue;
        };
        let Some(bit_range) = BitRange::from_mask(mask) else {
            continue;
        };

        let field_name = match name.as_str() {
            "" => register.to_owned(),
            name => name.to_owned(),
        };
        let enumerated_values = ctx
            .usage
            .enumerated_values(&ctx.overrides, FieldKey::new(prefix, register, &field_name))
            .map(<[_]>::to_vec);

        tracing::debug!(
            field = %macro_name,
            range = %bit_range,
            enumerated = enumerated_values.is_some(),
            "field built"
        );
        set.reset_mask |= mask;
        set.fields.push(Field {
            name: field_name,
            description: caps.get(3).and_then(|c| describe(c.as_str())),
            bit_range,
            enumerated_values,
        });
    }

    Ok(set)
}
