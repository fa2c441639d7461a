//! Hardware register model for svdgen.
//!
//! Describes a microcontroller as a [`Device`] holding peripherals,
//! registers, bit-fields and enumerated values, and renders it as a
//! CMSIS-SVD document.
//!
//! ## Modules
//!
//! - [`cpu`] - Processor core description
//! - [`device`] - Device root and structural validation
//! - [`peripheral`] - Peripherals, address blocks and interrupts
//! - [`register`] - Registers, bit-fields and enumerated values
//! - [`svd`] - CMSIS-SVD rendering

pub mod cpu;
pub mod device;
pub mod error;
pub mod peripheral;
pub mod register;
pub mod svd;

pub use cpu::{Cpu, CpuName, Endian};
pub use device::{Device, ValidationIssue, SCHEMA_VERSION};
pub use error::SvdError;
pub use peripheral::{AddressBlock, Interrupt, Peripheral, PeripheralLayout, Usage};
pub use register::{Access, BitRange, Dim, EnumeratedValue, Field, Register, REGISTER_WIDTH};
pub use svd::{to_svd, write_svd};
