//! Registers, bit-fields and enumerated field values.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Width in bits of every register the model describes.
pub const REGISTER_WIDTH: u32 = 32;

/// Access rights of a register or field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    #[serde(rename = "read-only")]
    ReadOnly,
    #[serde(rename = "write-only")]
    WriteOnly,
    #[default]
    #[serde(rename = "read-write")]
    ReadWrite,
    #[serde(rename = "writeOnce")]
    WriteOnce,
    #[serde(rename = "read-writeOnce")]
    ReadWriteOnce,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::ReadOnly => "read-only",
            Access::WriteOnly => "write-only",
            Access::ReadWrite => "read-write",
            Access::WriteOnce => "writeOnce",
            Access::ReadWriteOnce => "read-writeOnce",
        }
    }
}

/// Inclusive `[msb:lsb]` span of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BitRange {
    pub msb: u32,
    pub lsb: u32,
}

impl BitRange {
    /// Bit range covered by `mask`, from its lowest to its highest set bit.
    ///
    /// Returns `None` for an all-zero mask.
    pub fn from_mask(mask: u32) -> Option<Self> {
        if mask == 0 {
            return None;
        }
        Some(Self {
            msb: 31 - mask.leading_zeros(),
            lsb: mask.trailing_zeros(),
        })
    }

    /// Number of bits in the range.
    pub fn width(&self) -> u32 {
        self.msb - self.lsb + 1
    }
}

impl fmt::Display for BitRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.msb, self.lsb)
    }
}

/// One named value of a field.
///
/// Exactly one of `value` and `is_default` is expected to be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EnumeratedValue {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Literal value as written in the reference manual (`1`, `0b10`, `0xF`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Covers every value not listed explicitly.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
}

impl EnumeratedValue {
    /// A value entry for a literal.
    pub fn literal(value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            value: Some(value.into()),
            is_default: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A bit-field within a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub description: Option<String>,
    pub bit_range: BitRange,
    pub enumerated_values: Option<Vec<EnumeratedValue>>,
}

/// Array dimension of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dim {
    /// Number of elements.
    pub count: u32,
    /// Address distance between consecutive elements, in bytes.
    pub increment: u32,
}

impl Dim {
    /// Bytes covered by all elements.
    pub fn span(&self) -> u64 {
        u64::from(self.count) * u64::from(self.increment)
    }
}

/// A memory-mapped register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    /// Name, with a `[%s]` suffix for arrays.
    pub name: String,
    pub description: Option<String>,
    pub address_offset: u32,
    pub dim: Option<Dim>,
    /// `None` means the device default (read-write).
    pub access: Option<Access>,
    /// Literal reset value when it differs from the device default.
    pub reset_value: Option<String>,
    /// Bits with a defined value at reset.
    pub reset_mask: u32,
    pub fields: Vec<Field>,
}

impl Register {
    /// Name without the array placeholder.
    pub fn base_name(&self) -> &str {
        self.name.strip_suffix("[%s]").unwrap_or(&self.name)
    }

    /// Bytes occupied by this register, counting every array element.
    pub fn footprint(&self) -> u64 {
        self.dim
            .map_or(u64::from(REGISTER_WIDTH / 8), |dim| dim.span())
    }
}
