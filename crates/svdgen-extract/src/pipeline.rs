//! Extraction pipeline: header text and profile in, validated device out.
//!
//! Stages run in a fixed order over one patched text buffer:
//!
//! 1. patches
//! 2. metadata macros
//! 3. base addresses
//! 4. interrupt vectors
//! 5. peripherals, with their registers and fields
//! 6. assembly and validation

use svdgen_core::Device;

use crate::address::AddressTable;
use crate::assemble::assemble;
use crate::diagnostics::{Diagnostic, Diagnostics, ErrorPolicy};
use crate::error::{ExtractError, ExtractErrors};
use crate::interrupt::InterruptPool;
use crate::metadata;
use crate::overrides::{OverrideTables, OverrideUsage};
use crate::patch;
use crate::peripheral::extract_peripherals;
use crate::profile::Profile;
use crate::source::Source;

/// State shared by the recognizers during one run.
pub(crate) struct Context<'a> {
    pub(crate) profile: &'a Profile,
    pub(crate) source: &'a Source,
    pub(crate) overrides: OverrideTables,
    pub(crate) usage: OverrideUsage,
    pub(crate) diag: Diagnostics,
}

impl<'a> Context<'a> {
    pub(crate) fn new(profile: &'a Profile, source: &'a Source, policy: ErrorPolicy) -> Self {
        Self {
            profile,
            source,
            overrides: profile.overrides(),
            usage: OverrideUsage::default(),
            diag: Diagnostics::new(policy),
        }
    }
}

/// A successful extraction.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub device: Device,
    /// Non-fatal findings, in the order they were raised.
    pub diagnostics: Vec<Diagnostic>,
}

/// Extract a device model from header text.
pub fn extract(
    header: &str,
    profile: &Profile,
    policy: ErrorPolicy,
) -> Result<Extraction, ExtractErrors> {
    let patched = patch::apply(header, &profile.patches);
    let source = Source::new(patched.text);
    let mut ctx = Context::new(profile, &source, policy);
    for from in patched.unapplied {
        ctx.diag.warn(Diagnostic::UnappliedPatch { from });
    }

    let metadata = metadata::recognize(&source, profile, &mut ctx.diag)?;
    let addresses = AddressTable::resolve(&source, &mut ctx.diag)?;
    let mut pool = InterruptPool::scan(&source, profile, &mut ctx.diag)?;
    let device_num_interrupts = pool.device_num_interrupts();

    let peripherals = extract_peripherals(&mut ctx, &addresses, &mut pool)?;

    for (key, interrupt) in pool.leftovers() {
        ctx.diag.warn(Diagnostic::UnmatchedInterrupt {
            name: interrupt.name,
            key,
            value: interrupt.value,
        });
    }
    for key in ctx.usage.unused(&ctx.overrides) {
        ctx.diag.warn(Diagnostic::UnusedOverride { key });
    }

    // A run with errors never assembles a partial model.
    let device = if ctx.diag.has_errors() {
        None
    } else {
        match assemble(profile, metadata, peripherals, device_num_interrupts) {
            Ok(device) => Some(device),
            Err(errors) => {
                for error in errors {
                    ctx.diag.report(error)?;
                }
                None
            }
        }
    };

    let diagnostics = ctx.diag.finish()?;
    let device = device.ok_or_else(|| {
        ExtractErrors::from(ExtractError::InvalidModel {
            detail: "device failed validation".into(),
        })
    })?;
    Ok(Extraction {
        device,
        diagnostics,
    })
}
