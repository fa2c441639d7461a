//! Register builder: structure members to register descriptors.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use svdgen_core::{Access, AddressBlock, Dim, Register, Usage, REGISTER_WIDTH};

use crate::error::{ExtractError, ExtractErrors, Stage};
use crate::field;
use crate::overrides::RegisterKey;
use crate::pipeline::Context;
use crate::profile::{PrefixRewrite, RegisterLookup};
use crate::typedef::TypeBlock;

static MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"__(IOM|IM|OM|IO|I|O)[ \t]+uint32_t[ \t]+([0-9A-Za-z_]+)(?:\[([0-9]*)\])?[ \t]*;[ \t]*/\*!<[ \t]*([^*]*?),[ \t]*Address[ \t]+offset[ \t]*:[ \t]*0x([0-9A-Fa-f]+)",
    )
    .unwrap()
});

/// Registers must end at or below 4 GiB.
const ADDRESS_SPACE: u64 = 1 << 32;

/// Registers and occupied span of one structure type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterLayout {
    pub address_block: AddressBlock,
    pub registers: Vec<Register>,
}

/// Macro-name prefix for the fields of `type_name`.
pub fn field_prefix(type_name: &str, type_suffix: &str, rewrites: &[PrefixRewrite]) -> String {
    let base = if type_suffix.is_empty() {
        type_name
    } else {
        type_name.strip_suffix(type_suffix).unwrap_or(type_name)
    };
    rewrites
        .iter()
        .fold(base.to_owned(), |prefix, r| prefix.replace(&r.from, &r.to))
}

/// Name under which the field macros of `register` are declared.
pub fn lookup_name(prefix: &str, register: &str, rules: &[RegisterLookup]) -> String {
    rules
        .iter()
        .filter(|lookup| lookup.prefix == prefix)
        .find_map(|lookup| lookup.rule.apply(register))
        .unwrap_or_else(|| register.to_owned())
}

fn access_for(qualifier: &str) -> Option<Access> {
    match qualifier {
        "I" | "IM" => Some(Access::ReadOnly),
        "O" | "OM" => Some(Access::WriteOnly),
        _ => None,
    }
}

/// Build the registers declared in `block`.
///
/// Members that cannot be interpreted are reported and skipped.
pub(crate) fn build_registers(
    ctx: &mut Context<'_>,
    block: &TypeBlock<'_>,
) -> Result<RegisterLayout, ExtractErrors> {
    let profile = ctx.profile;
    let stride = profile.extraction.register_stride;
    let prefix = field_prefix(
        &block.type_name,
        &profile.extraction.type_suffix,
        &profile.prefix_rewrites,
    );

    let mut registers = Vec::new();
    let mut names = BTreeSet::new();
    // (offset, footprint) of the highest register.
    let mut top: Option<(u32, u64)> = None;

    for (index, line) in block.lines.iter().enumerate() {
        let Some(caps) = MEMBER.captures(line) else {
            continue;
        };
        let (Some(qualifier), Some(name), Some(description), Some(offset)) =
            (caps.get(1), caps.get(2), caps.get(4), caps.get(5))
        else {
            continue;
        };
        let line_no = block.first_line + index;
        let name = name.as_str();

        let Ok(address_offset) = u32::from_str_radix(offset.as_str(), 16) else {
            ctx.diag.report(ExtractError::UnmatchedPattern {
                stage: Stage::Register,
                line: line_no,
                text: line.trim().to_owned(),
                detail: "address offset does not fit 32 bits".into(),
            })?;
            continue;
        };

        let dim = match caps.get(3).map(|m| m.as_str()).filter(|n| !n.is_empty()) {
            None => None,
            Some(count) => match count.parse::<u32>() {
                Ok(count) if count > 0 => Some(Dim {
                    count,
                    increment: stride,
                }),
                _ => {
                    ctx.diag.report(ExtractError::UnmatchedPattern {
                        stage: Stage::Register,
                        line: line_no,
                        text: line.trim().to_owned(),
                        detail: format!("invalid array length '{count}'"),
                    })?;
                    continue;
                }
            },
        };

        let footprint = dim.map_or(u64::from(REGISTER_WIDTH / 8), |d| d.span());
        if u64::from(address_offset) + footprint > ADDRESS_SPACE {
            ctx.diag.report(ExtractError::UnmatchedPattern {
                stage: Stage::Register,
                line: line_no,
                text: line.trim().to_owned(),
                detail: "register does not fit the address space".into(),
            })?;
            continue;
        }

        if !names.insert(name.to_owned()) {
            ctx.diag.report(ExtractError::DuplicateRegister {
                type_name: block.type_name.clone(),
                register: name.to_owned(),
            })?;
            continue;
        }

        let reset_value = ctx
            .usage
            .reset_value(&ctx.overrides, RegisterKey::new(&prefix, name))
            .map(str::to_owned);
        let lookup = lookup_name(&prefix, name, &profile.register_lookups);
        let fields = field::build_fields(ctx, &prefix, name, &lookup)?;

        let mut register = Register {
            name: name.to_owned(),
            description: Some(description.as_str().trim().to_owned()).filter(|d| !d.is_empty()),
            address_offset,
            dim,
            access: access_for(qualifier.as_str()),
            reset_value,
            reset_mask: fields.reset_mask,
            fields: fields.fields,
        };
        if register.dim.is_some() {
            register.name.push_str("[%s]");
        }

        top = match top {
            Some((off, size))
                if off > address_offset || (off == address_offset && size >= footprint) =>
            {
                Some((off, size))
            }
            _ => Some((address_offset, footprint)),
        };

        tracing::debug!(
            register = %register.name,
            offset = address_offset,
            fields = register.fields.len(),
            "register built"
        );
        registers.push(register);
    }

    if registers.is_empty() {
        tracing::warn!(type_name = %block.type_name, "no register members recognised");
    }

    let size = top.map_or(0, |(offset, footprint)| u64::from(offset) + footprint);
    Ok(RegisterLayout {
        address_block: AddressBlock {
            offset: 0,
            size,
            usage: Usage::Registers,
        },
        registers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorPolicy;
    use crate::profile::{Pattern, Profile, RewriteRule};
    use crate::source::Source;
    use crate::typedef::locate_type;
    use svdgen_core::CpuName;

    const HEADER: &str = "\
typedef struct
{
  __I  uint32_t  STAT;        /*!< Status register,             Address offset : 0x000 */
  __O  uint32_t  CMD;         /*!< Command register,            Address offset : 0x004 */
  __IO uint32_t  DATA[4];     /*!< Data buffer,                 Address offset : 0x010 */
  __IO uint32_t  CTRL;        /*!< Control register, main,      Address offset : 0x008 */
       uint32_t  RESERVED0;
} FOO_TypeDef;

#define FOO_CTRL_EN          (0x00000001UL)   /*!< Enable */
#define FOO_CTRL_MODE        (0x00000006UL)   /*!< MODE[1:0] bits (Operating mode) */
";

    fn layout(profile: &Profile, text: &str, type_name: &str) -> RegisterLayout {
        let source = Source::new(text.into());
        let mut ctx = Context::new(profile, &source, ErrorPolicy::FailFast);
        let block = locate_type(source.text(), type_name).unwrap();
        build_registers(&mut ctx, &block).unwrap()
    }

    #[test]
    fn members_become_registers() {
        let profile = Profile::minimal("D", CpuName::CM0);
        let layout = layout(&profile, HEADER, "FOO_TypeDef");
        let names: Vec<&str> = layout.registers.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["STAT", "CMD", "DATA[%s]", "CTRL"]);

        assert_eq!(layout.registers[0].access, Some(Access::ReadOnly));
        assert_eq!(layout.registers[1].access, Some(Access::WriteOnly));
        assert_eq!(layout.registers[3].access, None);
        assert_eq!(layout.registers[3].description.as_deref(), Some("Control register, main"));
    }

    #[test]
    fn arrays_and_address_block() {
        let profile = Profile::minimal("D", CpuName::CM0);
        let layout = layout(&profile, HEADER, "FOO_TypeDef");
        let data = &layout.registers[2];
        assert_eq!(data.dim, Some(Dim { count: 4, increment: 4 }));
        assert_eq!(data.address_offset, 0x10);
        // Highest offset 0x10 plus four 4-byte elements.
        assert_eq!(layout.address_block.size, 0x20);
        assert_eq!(layout.address_block.usage, Usage::Registers);
    }

    #[test]
    fn fields_and_reset_mask_attached() {
        let profile = Profile::minimal("D", CpuName::CM0);
        let layout = layout(&profile, HEADER, "FOO_TypeDef");
        let ctrl = &layout.registers[3];
        assert_eq!(ctrl.reset_mask, 0x7);
        assert_eq!(ctrl.fields.len(), 2);
        assert_eq!(ctrl.fields[1].description.as_deref(), Some("Operating mode"));
    }

    #[test]
    fn reset_value_override_used() {
        let mut profile = Profile::minimal("D", CpuName::CM0);
        profile
            .reset_values
            .insert(RegisterKey::new("FOO", "CTRL"), "0x00000003".into());
        let layout = layout(&profile, HEADER, "FOO_TypeDef");
        assert_eq!(layout.registers[3].reset_value.as_deref(), Some("0x00000003"));
        assert_eq!(layout.registers[0].reset_value, None);
    }

    #[test]
    fn duplicate_register_rejected() {
        let text = "\
typedef struct
{
  __IO uint32_t A;  /*!< A, Address offset : 0x00 */
  __IO uint32_t A;  /*!< A, Address offset : 0x04 */
} DUP_TypeDef;
";
        let profile = Profile::minimal("D", CpuName::CM0);
        let source = Source::new(text.into());
        let mut ctx = Context::new(&profile, &source, ErrorPolicy::FailFast);
        let block = locate_type(source.text(), "DUP_TypeDef").unwrap();
        let err = build_registers(&mut ctx, &block).unwrap_err();
        assert_eq!(
            err.0[0],
            ExtractError::DuplicateRegister {
                type_name: "DUP_TypeDef".into(),
                register: "A".into()
            }
        );
    }

    #[test]
    fn oversized_array_skipped() {
        let text = "\
typedef struct
{
  __IO uint32_t CTRL;              /*!< Control, Address offset : 0x000 */
  __IO uint32_t BUF[1073741824];   /*!< Buffer,  Address offset : 0x004 */
} BIG_TypeDef;
";
        let profile = Profile::minimal("D", CpuName::CM0);
        let source = Source::new(text.into());
        let mut ctx = Context::new(&profile, &source, ErrorPolicy::CollectAll);
        let block = locate_type(source.text(), "BIG_TypeDef").unwrap();
        let layout = build_registers(&mut ctx, &block).unwrap();
        assert_eq!(layout.registers.len(), 1);
        assert_eq!(layout.address_block.size, 4);

        let errors = ctx.diag.finish().unwrap_err();
        assert!(matches!(
            &errors.0[..],
            [ExtractError::UnmatchedPattern { stage: Stage::Register, line: 4, detail, .. }]
                if detail == "register does not fit the address space"
        ));
    }

    #[test]
    fn empty_block_gives_empty_layout() {
        let profile = Profile::minimal("D", CpuName::CM0);
        let layout = layout(&profile, "typedef struct\n{\n} E_TypeDef;\n", "E_TypeDef");
        assert!(layout.registers.is_empty());
        assert_eq!(layout.address_block.size, 0);
    }

    #[test]
    fn prefix_rewrites_apply_in_order() {
        let rewrites = vec![
            PrefixRewrite {
                from: "PWM".into(),
                to: "PWM_CHn".into(),
            },
            PrefixRewrite {
                from: "PWM_CHn_Common".into(),
                to: "PWM_CM".into(),
            },
        ];
        assert_eq!(field_prefix("PWM_TypeDef", "_TypeDef", &rewrites), "PWM_CHn");
        assert_eq!(field_prefix("PWM_Common_TypeDef", "_TypeDef", &rewrites), "PWM_CM");
        assert_eq!(field_prefix("UART_TypeDef", "", &[]), "UART_TypeDef");
    }

    #[test]
    fn lookup_rules_scoped_to_prefix() {
        let rules = vec![RegisterLookup {
            prefix: "CRG".into(),
            rule: RewriteRule {
                pattern: Pattern::new("^(TIMER|PWM)[0-9]CLK").unwrap(),
                replace: "${1}CLK".into(),
            },
        }];
        assert_eq!(lookup_name("CRG", "PWM3CLK_SSR", &rules), "PWMCLK_SSR");
        assert_eq!(lookup_name("CRG", "PLL_PDR", &rules), "PLL_PDR");
        assert_eq!(lookup_name("PWM", "TIMER0CLK_SSR", &rules), "TIMER0CLK_SSR");
    }
}
