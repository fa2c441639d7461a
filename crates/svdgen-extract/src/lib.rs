//! Extraction engine turning CMSIS device headers into svdgen device models.
//!
//! A vendor header is patched, then scanned by a fixed sequence of
//! recognizers driven by a device [`Profile`]. The result is a validated
//! [`svdgen_core::Device`] plus non-fatal diagnostics.
//!
//! ## Modules
//!
//! - [`patch`] - Literal corrections applied before extraction
//! - [`metadata`] - Version, core revision and NVIC configuration macros
//! - [`address`] - Base-address symbol resolution
//! - [`interrupt`] - Interrupt vector pool
//! - [`peripheral`] - Pointer-cast peripheral instances and derivation
//! - [`typedef`] - `typedef struct` block locator
//! - [`register`] - Structure members to registers
//! - [`field`] - Bit-mask macros to fields
//! - [`overrides`] - Manual reset value and enumerated value tables
//! - [`assemble`] - CPU selection and device validation
//! - [`profile`] - Device profiles and built-ins
//! - [`pipeline`] - End-to-end extraction

pub mod address;
pub mod assemble;
pub mod diagnostics;
pub mod error;
pub mod field;
pub mod interrupt;
pub mod metadata;
pub mod overrides;
pub mod patch;
pub mod peripheral;
pub mod pipeline;
pub mod profile;
pub mod register;
pub mod source;
pub mod typedef;

pub use address::AddressTable;
pub use diagnostics::{Diagnostic, Diagnostics, ErrorPolicy};
pub use error::{ExtractError, ExtractErrors, ProfileError, Stage};
pub use interrupt::InterruptPool;
pub use overrides::{FieldKey, OverrideTables, RegisterKey};
pub use patch::Patch;
pub use pipeline::{extract, Extraction};
pub use profile::{builtin_profiles, Profile};
pub use typedef::{locate_type, TypeBlock};
