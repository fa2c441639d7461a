//! Device assembler: metadata, core and peripherals into one validated model.

use svdgen_core::{Cpu, Device, Peripheral};

use crate::error::ExtractError;
use crate::metadata::Metadata;
use crate::profile::Profile;

/// Processor description implied by the profile's core selection.
pub fn select_cpu(profile: &Profile, metadata: &Metadata, device_num_interrupts: Option<u32>) -> Cpu {
    let section = &profile.cpu;
    let mut cpu = Cpu::new(section.name);
    cpu.endian = section.endian;
    cpu.revision = metadata.revision.clone();
    cpu.mpu_present = section.mpu_present;
    cpu.vendor_systick_config = section.vendor_systick_config;
    cpu.nvic_prio_bits = metadata.nvic_prio_bits;
    cpu.device_num_interrupts = device_num_interrupts;
    cpu
}

/// Build and validate the device.
///
/// Every violated invariant becomes one [`ExtractError::InvalidModel`].
pub fn assemble(
    profile: &Profile,
    metadata: Metadata,
    peripherals: Vec<Peripheral>,
    device_num_interrupts: Option<u32>,
) -> Result<Device, Vec<ExtractError>> {
    let cpu = select_cpu(profile, &metadata, device_num_interrupts);
    let info = &profile.device;

    let mut device = Device::new(info.name.clone(), cpu);
    device.vendor = info.vendor.clone();
    device.vendor_id = info.vendor_id.clone();
    device.series = info.series.clone();
    device.version = metadata.version;
    device.description = info.description.clone();
    device.license_text = info.license_text.clone();
    device.peripherals = peripherals;

    match device.validate() {
        Ok(()) => {
            tracing::info!(
                device = %device.name,
                peripherals = device.peripherals.len(),
                "device assembled"
            );
            Ok(device)
        }
        Err(issues) => Err(issues
            .into_iter()
            .map(|issue| ExtractError::InvalidModel {
                detail: issue.message,
            })
            .collect()),
    }
}
