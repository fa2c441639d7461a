//! Peripherals, their address blocks and interrupts.

use serde::{Deserialize, Serialize};

use crate::register::Register;

/// A numbered interrupt vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interrupt {
    /// Vector name as written in the header (without `_IRQn`).
    pub name: String,
    pub description: Option<String>,
    pub value: u32,
}

/// What an address block is used for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Usage {
    #[default]
    Registers,
    Buffer,
    Reserved,
}

impl Usage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Usage::Registers => "registers",
            Usage::Buffer => "buffer",
            Usage::Reserved => "reserved",
        }
    }
}

/// Contiguous span of memory occupied by a peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBlock {
    /// Start relative to the peripheral base address.
    pub offset: u64,
    /// Span in bytes.
    pub size: u64,
    pub usage: Usage,
}

/// Register layout of a peripheral.
///
/// A peripheral either owns its registers or reuses the layout of an
/// earlier peripheral of the same type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PeripheralLayout {
    Owned {
        address_block: AddressBlock,
        registers: Vec<Register>,
    },
    Derived {
        /// Name of the peripheral whose layout is reused.
        from: String,
    },
}

/// A peripheral instance at a fixed base address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peripheral {
    pub name: String,
    pub description: Option<String>,
    pub group_name: Option<String>,
    pub base_address: u64,
    pub interrupts: Vec<Interrupt>,
    pub layout: PeripheralLayout,
}

impl Peripheral {
    /// Name of the peripheral this one derives from, if any.
    pub fn derived_from(&self) -> Option<&str> {
        match &self.layout {
            PeripheralLayout::Derived { from } => Some(from),
            PeripheralLayout::Owned { .. } => None,
        }
    }

    /// Registers owned by this peripheral; empty for derived peripherals.
    pub fn registers(&self) -> &[Register] {
        match &self.layout {
            PeripheralLayout::Owned { registers, .. } => registers,
            PeripheralLayout::Derived { .. } => &[],
        }
    }

    pub fn address_block(&self) -> Option<&AddressBlock> {
        match &self.layout {
            PeripheralLayout::Owned { address_block, .. } => Some(address_block),
            PeripheralLayout::Derived { .. } => None,
        }
    }

    /// Look up an owned register by base name.
    pub fn register(&self, name: &str) -> Option<&Register> {
        self.registers().iter().find(|r| r.base_name() == name)
    }
}
