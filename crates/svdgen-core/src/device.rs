//! Device root and structural validation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::cpu::Cpu;
use crate::peripheral::{Peripheral, PeripheralLayout};
use crate::register::{Access, REGISTER_WIDTH};

/// CMSIS-SVD schema version the model conforms to.
pub const SCHEMA_VERSION: &str = "1.3.6";

/// A validation issue found in a device model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn error(message: String) -> Self {
        Self {
            severity: "error",
            message,
        }
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// A complete device description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub vendor: Option<String>,
    pub vendor_id: Option<String>,
    pub series: Option<String>,
    pub version: String,
    pub description: String,
    pub license_text: Option<String>,
    pub cpu: Cpu,
    /// Data bits selected by each address.
    pub address_unit_bits: u32,
    /// Maximum single transfer width of the bus.
    pub width: u32,
    /// Default register width.
    pub size: u32,
    pub access: Access,
    pub reset_value: u64,
    pub reset_mask: u64,
    pub peripherals: Vec<Peripheral>,
}

impl Device {
    /// A device with the schema defaults: byte addressable, 32-bit bus and
    /// registers, read-write, reset value 0 with every bit defined.
    pub fn new(name: impl Into<String>, cpu: Cpu) -> Self {
        Self {
            name: name.into(),
            vendor: None,
            vendor_id: None,
            series: None,
            version: "1.0".into(),
            description: String::new(),
            license_text: None,
            cpu,
            address_unit_bits: 8,
            width: 32,
            size: REGISTER_WIDTH,
            access: Access::ReadWrite,
            reset_value: 0,
            reset_mask: 0xFFFF_FFFF,
            peripherals: Vec::new(),
        }
    }

    /// Look up a peripheral by name.
    pub fn peripheral(&self, name: &str) -> Option<&Peripheral> {
        self.peripherals.iter().find(|p| p.name == name)
    }

    /// Validate the model's structural invariants.
    ///
    /// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationIssue>> {
        let mut issues = Vec::new();

        if self.name.is_empty() {
            issues.push(ValidationIssue::error("device has no name".into()));
        }

        if self.cpu.fpu_dp && !self.cpu.fpu_present {
            issues.push(ValidationIssue::error(
                "double-precision FPU declared without an FPU".into(),
            ));
        }

        // Peripheral names are unique; derivations point at an earlier owned peripheral.
        let mut owned: BTreeMap<&str, usize> = BTreeMap::new();
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for (index, peripheral) in self.peripherals.iter().enumerate() {
            if !seen.insert(peripheral.name.as_str()) {
                issues.push(ValidationIssue::error(format!(
                    "duplicate peripheral name '{}'",
                    peripheral.name
                )));
            }
            match &peripheral.layout {
                PeripheralLayout::Owned { registers, .. } => {
                    owned.insert(peripheral.name.as_str(), index);
                    let mut names = BTreeSet::new();
                    for register in registers {
                        if !names.insert(register.name.as_str()) {
                            issues.push(ValidationIssue::error(format!(
                                "duplicate register '{}' in peripheral '{}'",
                                register.name, peripheral.name
                            )));
                        }
                        for field in &register.fields {
                            let range = field.bit_range;
                            if range.msb < range.lsb || range.msb >= REGISTER_WIDTH {
                                issues.push(ValidationIssue::error(format!(
                                    "field '{}.{}.{}' has bit range {} outside a {}-bit register",
                                    peripheral.name,
                                    register.name,
                                    field.name,
                                    range,
                                    REGISTER_WIDTH
                                )));
                            }
                        }
                    }
                }
                PeripheralLayout::Derived { from } => {
                    if !owned.contains_key(from.as_str()) {
                        issues.push(ValidationIssue::error(format!(
                            "peripheral '{}' derives from '{}', which is not an earlier full definition",
                            peripheral.name, from
                        )));
                    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuName;
    use crate::peripheral::{AddressBlock, Usage};
    use crate::register::{BitRange, Field, Register};

    fn register(name: &str, msb: u32, lsb: u32) -> Register {
        Register {
            name: name.into(),
            description: None,
            address_offset: 0,
            dim: None,
            access: None,
            reset_value: None,
            reset_mask: 0,
            fields: vec![Field {
                name: "F".into(),
                description: None,
                bit_range: BitRange { msb, lsb },
                enumerated_values: None,
            }],
        }
    }

    fn owned(name: &str, registers: Vec<Register>) -> Peripheral {
        Peripheral {
            name: name.into(),
            description: None,
            group_name: None,
            base_address: 0x4000_0000,
            interrupts: vec![],
            layout: PeripheralLayout::Owned {
                address_block: AddressBlock {
                    offset: 0,
                    size: 4,
                    usage: Usage::Registers,
                },
                registers,
            },
        }
    }

    fn derived(name: &str, from: &str) -> Peripheral {
        Peripheral {
            name: name.into(),
            description: None,
            group_name: None,
            base_address: 0x4000_1000,
            interrupts: vec![],
            layout: PeripheralLayout::Derived { from: from.into() },
        }
    }

    #[test]
    fn new_device_has_schema_defaults() {
        let dev = Device::new("DeviceName", Cpu::new(CpuName::CM0));
        assert_eq!(dev.address_unit_bits, 8);
        assert_eq!(dev.width, 32);
        assert_eq!(dev.size, 32);
        assert_eq!(dev.access, Access::ReadWrite);
        assert_eq!(dev.reset_value, 0);
        assert_eq!(dev.reset_mask, 0xFFFF_FFFF);
        assert!(dev.validate().is_ok());
    }

    #[test]
    fn duplicate_peripherals_rejected() {
        let mut dev = Device::new("D", Cpu::new(CpuName::CM0));
        dev.peripherals.push(owned("UART0", vec![]));
        dev.peripherals.push(owned("UART0", vec![]));
        let issues = dev.validate().unwrap_err();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("duplicate peripheral"));
    }

    #[test]
    fn derivation_must_point_backwards() {
        let mut dev = Device::new("D", Cpu::new(CpuName::CM0));
        dev.peripherals.push(derived("UART1", "UART0"));
        dev.peripherals.push(owned("UART0", vec![]));
        let issues = dev.validate().unwrap_err();
        assert!(issues[0].message.contains("derives from 'UART0'"));
    }

    #[test]
    fn field_outside_register_rejected() {
        let mut dev = Device::new("D", Cpu::new(CpuName::CM0));
        dev.peripherals
            .push(owned("ADC", vec![register("CTR", 32, 0), register("CTR", 3, 0)]));
        let issues = dev.validate().unwrap_err();
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn valid_derivation_accepted() {
        let mut dev = Device::new("D", Cpu::new(CpuName::CM0));
        dev.peripherals.push(owned("UART0", vec![register("DR", 7, 0)]));
        dev.peripherals.push(derived("UART1", "UART0"));
        assert!(dev.validate().is_ok());
    }
}
