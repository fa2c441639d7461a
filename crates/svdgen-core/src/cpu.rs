//! Processor description.
//!
//! Core identity, endianness and the feature flags that follow from the
//! selected core.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Processor core as named by CMSIS-SVD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CpuName {
    /// Arm Cortex-M0
    CM0,
    /// Arm Cortex-M0+
    #[serde(rename = "CM0+")]
    CM0Plus,
    /// Arm Cortex-M1
    CM1,
    /// Arm Secure Core SC000
    SC000,
    /// Arm Cortex-M23
    CM23,
    /// Arm Cortex-M3
    CM3,
    /// Arm Cortex-M33
    CM33,
    /// Arm Cortex-M35P
    CM35P,
    /// Arm Cortex-M55
    CM55,
    /// Arm Secure Core SC300
    SC300,
    /// Arm Cortex-M4
    CM4,
    /// Arm Cortex-M7
    CM7,
    CA5,
    CA7,
    CA8,
    CA9,
    CA15,
    CA17,
    CA53,
    CA57,
    CA72,
    /// Any other processor architecture.
    #[serde(rename = "other")]
    Other,
}

impl CpuName {
    /// All known core names, in CMSIS order.
    pub const ALL: [CpuName; 22] = [
        CpuName::CM0,
        CpuName::CM0Plus,
        CpuName::CM1,
        CpuName::SC000,
        CpuName::CM23,
        CpuName::CM3,
        CpuName::CM33,
        CpuName::CM35P,
        CpuName::CM55,
        CpuName::SC300,
        CpuName::CM4,
        CpuName::CM7,
        CpuName::CA5,
        CpuName::CA7,
        CpuName::CA8,
        CpuName::CA9,
        CpuName::CA15,
        CpuName::CA17,
        CpuName::CA53,
        CpuName::CA57,
        CpuName::CA72,
        CpuName::Other,
    ];

    /// The SVD spelling of this core.
    pub fn as_str(&self) -> &'static str {
        match self {
            CpuName::CM0 => "CM0",
            CpuName::CM0Plus => "CM0+",
            CpuName::CM1 => "CM1",
            CpuName::SC000 => "SC000",
            CpuName::CM23 => "CM23",
            CpuName::CM3 => "CM3",
            CpuName::CM33 => "CM33",
            CpuName::CM35P => "CM35P",
            CpuName::CM55 => "CM55",
            CpuName::SC300 => "SC300",
            CpuName::CM4 => "CM4",
            CpuName::CM7 => "CM7",
            CpuName::CA5 => "CA5",
            CpuName::CA7 => "CA7",
            CpuName::CA8 => "CA8",
            CpuName::CA9 => "CA9",
            CpuName::CA15 => "CA15",
            CpuName::CA17 => "CA17",
            CpuName::CA53 => "CA53",
            CpuName::CA57 => "CA57",
            CpuName::CA72 => "CA72",
            CpuName::Other => "other",
        }
    }

    /// Whether the core may carry a single-precision FPU.
    pub fn has_fpu(&self) -> bool {
        matches!(
            self,
            CpuName::CM4 | CpuName::CM7 | CpuName::CM33 | CpuName::CM35P
        )
    }

    /// Typical NVIC priority width when the header does not state it.
    ///
    /// ARMv6-M and ARMv8-M baseline cores implement 2 bits.
    pub fn default_nvic_prio_bits(&self) -> u8 {
        match self {
            CpuName::CM0 | CpuName::CM0Plus | CpuName::CM1 | CpuName::SC000 | CpuName::CM23 => 2,
            _ => 3,
        }
    }
}

impl fmt::Display for CpuName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CpuName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CpuName::ALL
            .iter()
            .copied()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown CPU core '{s}'"))
    }
}

/// Memory byte order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    /// Least significant byte at the lowest address.
    #[default]
    Little,
    /// Byte-invariant big endian.
    Big,
    /// Configurable, active after the next reset.
    Selectable,
    Other,
}

impl Endian {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endian::Little => "little",
            Endian::Big => "big",
            Endian::Selectable => "selectable",
            Endian::Other => "other",
        }
    }
}

/// Processor description attached to a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cpu {
    pub name: CpuName,
    /// Hardware revision in `rNpM` form.
    pub revision: String,
    pub endian: Endian,
    pub mpu_present: bool,
    pub fpu_present: bool,
    /// Double-precision FPU; only meaningful with `fpu_present`.
    pub fpu_dp: bool,
    pub dsp_present: bool,
    pub icache_present: bool,
    pub dcache_present: bool,
    pub itcm_present: bool,
    pub dtcm_present: bool,
    pub vtor_present: bool,
    /// Number of NVIC priority bits.
    pub nvic_prio_bits: u8,
    pub vendor_systick_config: bool,
    /// Highest interrupt number plus one.
    pub device_num_interrupts: Option<u32>,
}

impl Cpu {
    /// A CPU with `name` selected and every optional feature off.
    pub fn new(name: CpuName) -> Self {
        let mut cpu = Self {
            name: CpuName::Other,
            revision: "r0p0".into(),
            endian: Endian::Little,
            mpu_present: false,
            fpu_present: false,
            fpu_dp: false,
            dsp_present: false,
            icache_present: false,
            dcache_present: false,
            itcm_present: false,
            dtcm_present: false,
            vtor_present: false,
            nvic_prio_bits: name.default_nvic_prio_bits(),
            vendor_systick_config: false,
            device_num_interrupts: None,
        };
        cpu.select(name);
        cpu
    }

    /// Select the core and set the feature flags it implies.
    ///
    /// CM4, CM7, CM33 and CM35P carry an FPU. CM7 additionally carries a
    /// double-precision FPU, both caches and both tightly coupled memories.
    pub fn select(&mut self, name: CpuName) {
        self.name = name;
        if name.has_fpu() {
            self.fpu_present = true;
        }
        if name == CpuName::CM7 {
            self.fpu_dp = true;
            self.icache_present = true;
            self.dcache_present = true;
            self.itcm_present = true;
            self.dtcm_present = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cm0_has_no_optional_features() {
        let cpu = Cpu::new(CpuName::CM0);
        assert!(!cpu.fpu_present);
        assert!(!cpu.fpu_dp);
        assert!(!cpu.icache_present);
        assert!(!cpu.dtcm_present);
        assert_eq!(cpu.nvic_prio_bits, 2);
    }

    #[test]
    fn cm4_implies_fpu_only() {
        let cpu = Cpu::new(CpuName::CM4);
        assert!(cpu.fpu_present);
        assert!(!cpu.fpu_dp);
        assert!(!cpu.icache_present);
        assert!(!cpu.itcm_present);
    }

    #[test]
    fn cm7_implies_caches_and_tcm() {
        let cpu = Cpu::new(CpuName::CM7);
        assert!(cpu.fpu_present);
        assert!(cpu.fpu_dp);
        assert!(cpu.icache_present);
        assert!(cpu.dcache_present);
        assert!(cpu.itcm_present);
        assert!(cpu.dtcm_present);
    }

    #[test]
    fn parse_core_names() {
        assert_eq!("CM0+".parse::<CpuName>().unwrap(), CpuName::CM0Plus);
        assert_eq!("cm33".parse::<CpuName>().unwrap(), CpuName::CM33);
        assert_eq!("other".parse::<CpuName>().unwrap(), CpuName::Other);
        assert!("CM99".parse::<CpuName>().is_err());
    }

    #[test]
    fn serde_uses_svd_spelling() {
        let json = serde_json::to_string(&CpuName::CM0Plus).unwrap();
        assert_eq!(json, "\"CM0+\"");
        let back: CpuName = serde_json::from_str("\"CM7\"").unwrap();
        assert_eq!(back, CpuName::CM7);
    }
}
