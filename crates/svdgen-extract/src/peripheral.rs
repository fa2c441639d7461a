//! Peripheral extractor.
//!
//! Peripheral instances are pointer-cast macros such as
//! `#define UART0 ((UART_TypeDef *) UART0_BASE)`. Consecutive instances of
//! the same type share one register layout: the first one owns it and the
//! others derive from it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use svdgen_core::{Peripheral, PeripheralLayout};

use crate::address::AddressTable;
use crate::error::{ExtractError, ExtractErrors, Stage};
use crate::interrupt::InterruptPool;
use crate::pipeline::Context;
use crate::register::build_registers;
use crate::source::parse_hex;
use crate::typedef::locate_type;

static INSTANCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?m)^[ \t]*#define[ \t]+([0-9A-Za-z_]+)[ \t]+\(\([ \t]*([0-9A-Za-z_]+)[ \t]*\*[ \t]*\)[ \t]*([0-9A-Za-z_ \t+()]+?)[ \t]*\)[ \t\r]*(?:$|/[/*])",
    )
    .unwrap()
});

static ADDRESS_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Za-z_]+)(?:[ \t]*\+[ \t]*0x([0-9A-Fa-f]+)[uUlL]*)?$").unwrap()
});

/// One pointer-cast macro.
#[derive(Debug, Clone, PartialEq, Eq)]
struct InstanceMacro<'t> {
    name: &'t str,
    type_name: &'t str,
    address: &'t str,
    line: usize,
}

/// Group of a peripheral: its leading name token without digits.
///
/// A token one letter longer than a configured prefix collapses into the
/// prefix, so `GPIOA` joins `GPIO`.
pub fn group_name(name: &str, prefixes: &[String]) -> String {
    let token: String = name
        .split('_')
        .next()
        .unwrap_or(name)
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect();
    prefixes
        .iter()
        .find(|p| token.len() == p.len() + 1 && token.starts_with(p.as_str()))
        .cloned()
        .unwrap_or(token)
}

/// Evaluate `SYMBOL` or `SYMBOL + 0xOFFSET`, outer parentheses allowed.
fn resolve_address(
    instance: &InstanceMacro<'_>,
    addresses: &AddressTable,
) -> Result<u64, ExtractError> {
    let mut expr = instance.address.trim();
    while let Some(inner) = expr.strip_prefix('(').and_then(|e| e.strip_suffix(')')) {
        expr = inner.trim();
    }

    let unmatched = |detail: &str| ExtractError::UnmatchedPattern {
        stage: Stage::Peripheral,
        line: instance.line,
        text: instance.address.to_owned(),
        detail: detail.to_owned(),
    };
    let caps = ADDRESS_EXPR
        .captures(expr)
        .ok_or_else(|| unmatched("expected SYMBOL or SYMBOL + 0xOFFSET"))?;
    let symbol = caps
        .get(1)
        .ok_or_else(|| unmatched("missing base symbol"))?
        .as_str();
    let base = addresses
        .get(symbol)
        .ok_or_else(|| ExtractError::UnresolvedSymbol {
            symbol: symbol.to_owned(),
            referenced_by: instance.name.to_owned(),
            line: instance.line,
        })?;
    match caps.get(2) {
        None => Ok(base),
        Some(offset) => parse_hex(offset.as_str())
            .and_then(|offset| base.checked_add(offset))
            .ok_or_else(|| unmatched("offset does not produce a valid address")),
    }
}

/// Previous type and the peripheral owning its layout.
#[derive(Debug, Default)]
struct DerivationState {
    previous_type: Option<String>,
    /// `None` when the layout of `previous_type` could not be built.
    canonical: Option<String>,
}

impl DerivationState {
    fn derives(&self, type_name: &str) -> bool {
        self.previous_type.as_deref() == Some(type_name)
    }

    fn restart(&mut self, type_name: &str, canonical: Option<&str>) {
        self.previous_type = Some(type_name.to_owned());
        self.canonical = canonical.map(str::to_owned);
    }
}

/// Extract every peripheral instance in source order.
pub(crate) fn extract_peripherals(
    ctx: &mut Context<'_>,
    addresses: &AddressTable,
    pool: &mut InterruptPool,
) -> Result<Vec<Peripheral>, ExtractErrors> {
    let source = ctx.source;
    let profile = ctx.profile;
    let suffix = profile.extraction.type_suffix.as_str();

    let instances: Vec<InstanceMacro<'_>> = INSTANCE
        .captures_iter(source.text())
        .filter_map(|caps| {
            let name = caps.get(1)?;
            Some(InstanceMacro {
                name: name.as_str(),
                type_name: caps.get(2)?.as_str(),
                address: caps.get(3)?.as_str(),
                line: source.line_of(name.start()),
            })
        })
        .filter(|m| suffix.is_empty() || m.type_name.ends_with(suffix))
        .collect();

    // The last instance claiming an interrupt key removes it from the pool.
    let last_claimant: BTreeMap<String, usize> = instances
        .iter()
        .enumerate()
        .map(|(index, m)| (profile.interrupt_key(m.name), index))
        .collect();

    let mut peripherals = Vec::new();
    let mut names = BTreeSet::new();
    let mut state = DerivationState::default();
    let mut derived = 0usize;

    for (index, instance) in instances.iter().enumerate() {
        if !names.insert(instance.name) {
            ctx.diag.report(ExtractError::DuplicatePeripheral {
                name: instance.name.to_owned(),
            })?;
            continue;
        }

        let base_address = match resolve_address(instance, addresses) {
            Ok(address) => address,
            Err(err) => {
                ctx.diag.report(err)?;
                continue;
            }
        };

        let (layout, group) = if state.derives(instance.type_name) {
            let Some(from) = state.canonical.clone() else {
                tracing::debug!(
                    peripheral = instance.name,
                    type_name = instance.type_name,
                    "skipped, layout unavailable"
                );
                continue;
            };
            tracing::debug!(peripheral = instance.name, from = %from, "derived peripheral");
            derived += 1;
            (PeripheralLayout::Derived { from }, None)
        } else {
            let Some(block) = locate_type(source.text(), instance.type_name) else {
                state.restart(instance.type_name, None);
                ctx.diag.report(ExtractError::TypeNotFound {
                    type_name: instance.type_name.to_owned(),
                    line: instance.line,
                })?;
                continue;
            };
            let built = build_registers(ctx, &block)?;
            state.restart(instance.type_name, Some(instance.name));
            tracing::debug!(
                peripheral = instance.name,
                type_name = instance.type_name,
                registers = built.registers.len(),
                "peripheral layout extracted"
            );
            (
                PeripheralLayout::Owned {
                    address_block: built.address_block,
                    registers: built.registers,
                },
                Some(group_name(instance.name, &profile.extraction.group_prefixes)),
            )
        };

        // Skipped instances leave their vector in the pool.
        let key = profile.interrupt_key(instance.name);
        let release = last_claimant.get(&key) == Some(&index);
        let interrupts: Vec<_> = pool.claim(&key, release).into_iter().collect();

        peripherals.push(Peripheral {
            name: instance.name.to_owned(),
            description: None,
            group_name: group,
            base_address,
            interrupts,
            layout,
        });
    }

    tracing::info!(
        peripherals = peripherals.len(),
        derived,
        "peripherals extracted"
    );
    Ok(peripherals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::ErrorPolicy;
    use crate::profile::Profile;
    use crate::source::Source;
    use svdgen_core::CpuName;

    #[test]
    fn group_names() {
        let gpio = vec!["GPIO".to_string()];
        assert_eq!(group_name("GPIOA", &gpio), "GPIO");
        assert_eq!(group_name("UART1", &gpio), "UART");
        assert_eq!(group_name("DUALTIMER0_1", &gpio), "DUALTIMER");
        assert_eq!(group_name("PWM_CH3", &gpio), "PWM");
        assert_eq!(group_name("GPIOAB", &gpio), "GPIOAB");
        assert_eq!(group_name("GPIOA", &[]), "GPIOA");
    }

    fn instance<'t>(address: &'t str) -> InstanceMacro<'t> {
        InstanceMacro {
            name: "P",
            type_name: "P_TypeDef",
            address,
            line: 1,
        }
    }

    fn table() -> AddressTable {
        let source = Source::new("#define APB_BASE (0x40000000UL)\n".into());
        let mut diag = crate::diagnostics::Diagnostics::new(ErrorPolicy::FailFast);
        AddressTable::resolve(&source, &mut diag).unwrap()
    }

    #[test]
    fn address_expressions() {
        let t = table();
        assert_eq!(resolve_address(&instance("APB_BASE"), &t), Ok(0x4000_0000));
        assert_eq!(
            resolve_address(&instance("(APB_BASE + 0x100UL)"), &t),
            Ok(0x4000_0100)
        );
        assert!(matches!(
            resolve_address(&instance("APB_BASE * 2"), &t),
            Err(ExtractError::UnmatchedPattern { stage: Stage::Peripheral, .. })
        ));
        assert!(matches!(
            resolve_address(&instance("AHB_BASE"), &t),
            Err(ExtractError::UnresolvedSymbol { .. })
        ));
    }

    const HEADER: &str = "\
typedef struct
{
  __IO uint32_t DR;   /*!< Data register, Address offset : 0x00 */
} UART_TypeDef;

typedef struct
{
  __IO uint32_t CTRL; /*!< Control register, Address offset : 0x00 */
} TIMER_TypeDef;

#define APB_BASE  (0x40000000UL)
#define UART0_BASE (APB_BASE + 0x0000C000UL)
#define UART1_BASE (APB_BASE + 0x0000D000UL)
#define TIMER0_BASE (APB_BASE + 0x00001000UL)

#define UART0       ((UART_TypeDef *) UART0_BASE)
#define UART1       ((UART_TypeDef *) UART1_BASE)
#define TIMER0      ((TIMER_TypeDef *) TIMER0_BASE)
#define UART2       ((UART_TypeDef *) (APB_BASE + 0x0000E000UL))
#define NOT_A_PERIPH ((uint32_t *) APB_BASE)
";

    fn run(header: &str) -> Vec<Peripheral> {
        let profile = Profile::minimal("D", CpuName::CM0);
        let source = Source::new(header.into());
        let mut ctx = Context::new(&profile, &source, ErrorPolicy::FailFast);
        let addresses = AddressTable::resolve(&source, &mut ctx.diag).unwrap();
        let mut pool = InterruptPool::default();
        extract_peripherals(&mut ctx, &addresses, &mut pool).unwrap()
    }

    #[test]
    fn adjacent_instances_derive() {
        let ps = run(HEADER);
        let names: Vec<&str> = ps.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["UART0", "UART1", "TIMER0", "UART2"]);

        assert_eq!(ps[0].derived_from(), None);
        assert_eq!(ps[0].group_name.as_deref(), Some("UART"));
        assert_eq!(ps[1].derived_from(), Some("UART0"));
        assert_eq!(ps[1].group_name, None);
        assert_eq!(ps[1].base_address, 0x4000_D000);
    }

    #[test]
    fn non_adjacent_instance_extracted_again() {
        let ps = run(HEADER);
        assert_eq!(ps[3].derived_from(), None);
        assert_eq!(ps[3].registers().len(), 1);
        assert_eq!(ps[3].base_address, 0x4000_E000);
    }

    #[test]
    fn skipped_instance_leaves_interrupt_pending() {
        let header = "\
  UART1_IRQn = 3, /*!< UART 1 Interrupt */
#define APB_BASE  (0x40000000UL)
#define UART0       ((UART_TypeDef *) APB_BASE)
#define UART1       ((UART_TypeDef *) (APB_BASE + 0x1000UL))
";
        let profile = Profile::minimal("D", CpuName::CM0);
        let source = Source::new(header.into());
        let mut ctx = Context::new(&profile, &source, ErrorPolicy::CollectAll);
        let addresses = AddressTable::resolve(&source, &mut ctx.diag).unwrap();
        let mut pool = InterruptPool::scan(&source, &profile, &mut ctx.diag).unwrap();

        let ps = extract_peripherals(&mut ctx, &addresses, &mut pool).unwrap();
        assert!(ps.is_empty());
        assert_eq!(pool.get("UART1").map(|i| i.value), Some(3));
        assert_eq!(
            ctx.diag.finish().unwrap_err().0,
            vec![ExtractError::TypeNotFound {
                type_name: "UART_TypeDef".into(),
                line: 3,
            }]
        );
    }

    #[test]
    fn duplicate_instance_rejected() {
        let header = format!("{HEADER}#define UART0 ((UART_TypeDef *) UART0_BASE)\n");
        let profile = Profile::minimal("D", CpuName::CM0);
        let source = Source::new(header);
        let mut ctx = Context::new(&profile, &source, ErrorPolicy::FailFast);
        let addresses = AddressTable::resolve(&source, &mut ctx.diag).unwrap();
        let mut pool = InterruptPool::default();
        let err = extract_peripherals(&mut ctx, &addresses, &mut pool).unwrap_err();
        assert_eq!(
            err.0[0],
            ExtractError::DuplicatePeripheral {
                name: "UART0".into()
            }
        );
    }
}
