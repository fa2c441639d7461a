//! CMSIS-SVD rendering.
//!
//! Writes a [`Device`] as an SVD 1.3.6 document. Optional elements are
//! omitted when the model leaves them unset, so the device-level defaults
//! apply to every register that does not override them.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::cpu::Cpu;
use crate::device::{Device, SCHEMA_VERSION};
use crate::error::Result;
use crate::peripheral::{AddressBlock, Interrupt, Peripheral, PeripheralLayout};
use crate::register::{EnumeratedValue, Field, Register};

const XS_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const SCHEMA_LOCATION: &str = "CMSIS-SVD.xsd";

/// Render `device` as an SVD document string.
pub fn to_svd(device: &Device) -> Result<String> {
    let mut buffer = Vec::new();
    write_svd(device, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Render `device` as an SVD document into `out`.
pub fn write_svd<W: Write>(device: &Device, out: W) -> Result<()> {
    let mut w = Writer::new_with_indent(out, b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    start(
        &mut w,
        "device",
        &[
            ("xmlns:xs", XS_NAMESPACE),
            ("xs:noNamespaceSchemaLocation", SCHEMA_LOCATION),
            ("schemaVersion", SCHEMA_VERSION),
        ],
    )?;
    opt_leaf(&mut w, "vendor", device.vendor.as_deref())?;
    opt_leaf(&mut w, "vendorID", device.vendor_id.as_deref())?;
    leaf(&mut w, "name", &device.name)?;
    opt_leaf(&mut w, "series", device.series.as_deref())?;
    leaf(&mut w, "version", &device.version)?;
    leaf(&mut w, "description", &device.description)?;
    opt_leaf(&mut w, "licenseText", device.license_text.as_deref())?;
    write_cpu(&mut w, &device.cpu)?;
    leaf(&mut w, "addressUnitBits", &device.address_unit_bits.to_string())?;
    leaf(&mut w, "width", &device.width.to_string())?;
    leaf(&mut w, "size", &device.size.to_string())?;
    leaf(&mut w, "access", device.access.as_str())?;
    leaf(&mut w, "resetValue", &format!("0x{:08X}", device.reset_value))?;
    leaf(&mut w, "resetMask", &format!("0x{:08X}", device.reset_mask))?;

    start(&mut w, "peripherals", &[])?;
    for peripheral in &device.peripherals {
        write_peripheral(&mut w, peripheral)?;
    }
    end(&mut w, "peripherals")?;

    end(&mut w, "device")?;
    Ok(())
}

fn write_cpu<W: Write>(w: &mut Writer<W>, cpu: &Cpu) -> Result<()> {
    start(w, "cpu", &[])?;
    leaf(w, "name", cpu.name.as_str())?;
    leaf(w, "revision", &cpu.revision)?;
    leaf(w, "endian", cpu.endian.as_str())?;
    leaf(w, "mpuPresent", bool_text(cpu.mpu_present))?;
    leaf(w, "fpuPresent", bool_text(cpu.fpu_present))?;
    flag(w, "fpuDP", cpu.fpu_dp)?;
    flag(w, "dspPresent", cpu.dsp_present)?;
    flag(w, "icachePresent", cpu.icache_present)?;
    flag(w, "dcachePresent", cpu.dcache_present)?;
    flag(w, "itcmPresent", cpu.itcm_present)?;
    flag(w, "dtcmPresent", cpu.dtcm_present)?;
    flag(w, "vtorPresent", cpu.vtor_present)?;
    leaf(w, "nvicPrioBits", &cpu.nvic_prio_bits.to_string())?;
    leaf(w, "vendorSystickConfig", bool_text(cpu.vendor_systick_config))?;
    if let Some(count) = cpu.device_num_interrupts {
        leaf(w, "deviceNumInterrupts", &count.to_string())?;
    }
    end(w, "cpu")
}

fn write_peripheral<W: Write>(w: &mut Writer<W>, peripheral: &Peripheral) -> Result<()> {
    match peripheral.derived_from() {
        Some(from) => start(w, "peripheral", &[("derivedFrom", from)])?,
        None => start(w, "peripheral", &[])?,
    }
    leaf(w, "name", &peripheral.name)?;
    opt_leaf(w, "description", peripheral.description.as_deref())?;
    opt_leaf(w, "groupName", peripheral.group_name.as_deref())?;
    leaf(w, "baseAddress", &format!("0x{:x}", peripheral.base_address))?;

    if let PeripheralLayout::Owned { address_block, .. } = &peripheral.layout {
        write_address_block(w, address_block)?;
    }
    for interrupt in &peripheral.interrupts {
        write_interrupt(w, interrupt)?;
    }
    if let PeripheralLayout::Owned { registers, .. } = &peripheral.layout {
        start(w, "registers", &[])?;
        for register in registers {
            write_register(w, register)?;
        }
        end(w, "registers")?;
    }

    end(w, "peripheral")
}

fn write_address_block<W: Write>(w: &mut Writer<W>, block: &AddressBlock) -> Result<()> {
    start(w, "addressBlock", &[])?;
    leaf(w, "offset", &block.offset.to_string())?;
    leaf(w, "size", &format!("0x{:x}", block.size))?;
    leaf(w, "usage", block.usage.as_str())?;
    end(w, "addressBlock")
}

fn write_interrupt<W: Write>(w: &mut Writer<W>, interrupt: &Interrupt) -> Result<()> {
    start(w, "interrupt", &[])?;
    leaf(w, "name", &interrupt.name)?;
    opt_leaf(w, "description", interrupt.description.as_deref())?;
    leaf(w, "value", &interrupt.value.to_string())?;
    end(w, "interrupt")
}

fn write_register<W: Write>(w: &mut Writer<W>, register: &Register) -> Result<()> {
    start(w, "register", &[])?;
    if let Some(dim) = register.dim {
        leaf(w, "dim", &dim.count.to_string())?;
        leaf(w, "dimIncrement", &dim.increment.to_string())?;
    }
    leaf(w, "name", &register.name)?;
    opt_leaf(w, "description", register.description.as_deref())?;
    leaf(w, "addressOffset", &format!("0x{:03X}", register.address_offset))?;
    if let Some(access) = register.access {
        leaf(w, "access", access.as_str())?;
    }
    opt_leaf(w, "resetValue", register.reset_value.as_deref())?;
    leaf(w, "resetMask", &format!("0x{:x}", register.reset_mask))?;
    if !register.fields.is_empty() {
        start(w, "fields", &[])?;
        for field in &register.fields {
            write_field(w, field)?;
        }
        end(w, "fields")?;
    }
    end(w, "register")
}

fn write_field<W: Write>(w: &mut Writer<W>, field: &Field) -> Result<()> {
    start(w, "field", &[])?;
    leaf(w, "name", &field.name)?;
    opt_leaf(w, "description", field.description.as_deref())?;
    leaf(w, "bitRange", &field.bit_range.to_string())?;
    if let Some(values) = &field.enumerated_values {
        start(w, "enumeratedValues", &[])?;
        for value in values {
            write_enumerated_value(w, value)?;
        }
        end(w, "enumeratedValues")?;
    }
    end(w, "field")
}

fn write_enumerated_value<W: Write>(w: &mut Writer<W>, value: &EnumeratedValue) -> Result<()> {
    start(w, "enumeratedValue", &[])?;
    leaf(w, "name", &value.name)?;
    opt_leaf(w, "description", value.description.as_deref())?;
    opt_leaf(w, "value", value.value.as_deref())?;
    flag(w, "isDefault", value.is_default)?;
    end(w, "enumeratedValue")
}

fn start<W: Write>(w: &mut Writer<W>, tag: &str, attributes: &[(&str, &str)]) -> Result<()> {
    let mut element = BytesStart::new(tag);
    for attribute in attributes {
        element.push_attribute(*attribute);
    }
    w.write_event(Event::Start(element))?;
    Ok(())
}

fn end<W: Write>(w: &mut Writer<W>, tag: &str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn leaf<W: Write>(w: &mut Writer<W>, tag: &str, text: &str) -> Result<()> {
    w.write_event(Event::Start(BytesStart::new(tag)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn opt_leaf<W: Write>(w: &mut Writer<W>, tag: &str, text: Option<&str>) -> Result<()> {
    match text {
        Some(text) => leaf(w, tag, text),
        None => Ok(()),
    }
}

/// Boolean element written only when set.
fn flag<W: Write>(w: &mut Writer<W>, tag: &str, value: bool) -> Result<()> {
    if value {
        leaf(w, tag, "true")
    } else {
        Ok(())
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::CpuName;
    use crate::peripheral::Usage;
    use crate::register::{BitRange, Dim};

    fn sample_device() -> Device {
        let mut dev = Device::new("W7500x", Cpu::new(CpuName::CM0));
        dev.vendor = Some("WIZnet".into());
        dev.description = "Ethernet & MCU".into();
        dev.peripherals.push(Peripheral {
            name: "UART0".into(),
            description: None,
            group_name: Some("UART".into()),
            base_address: 0x4000_C000,
            interrupts: vec![Interrupt {
                name: "UART0".into(),
                description: Some("UART0 Interrupt".into()),
                value: 0,
            }],
            layout: PeripheralLayout::Owned {
                address_block: AddressBlock {
                    offset: 0,
                    size: 0x4C,
                    usage: Usage::Registers,
                },
                registers: vec![Register {
                    name: "DR[%s]".into(),
                    description: Some("Data register".into()),
                    address_offset: 0,
                    dim: Some(Dim { count: 2, increment: 4 }),
                    access: Some(crate::register::Access::ReadOnly),
                    reset_value: Some("0x12".into()),
                    reset_mask: 0xFF,
                    fields: vec![Field {
                        name: "DATA".into(),
                        description: Some("Data".into()),
                        bit_range: BitRange { msb: 7, lsb: 0 },
                        enumerated_values: Some(vec![
                            EnumeratedValue::literal("0", "Zero"),
                            EnumeratedValue {
                                name: "Other".into(),
                                description: None,
                                value: None,
                                is_default: true,
                            },
                        ]),
                    }],
                }],
            },
        });
        dev.peripherals.push(Peripheral {
            name: "UART1".into(),
            description: None,
            group_name: None,
            base_address: 0x4000_D000,
            interrupts: vec![],
            layout: PeripheralLayout::Derived { from: "UART0".into() },
        });
        dev
    }

    #[test]
    fn document_header_and_root() {
        let svd = to_svd(&sample_device()).unwrap();
        assert!(svd.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(svd.contains("schemaVersion=\"1.3.6\""));
        assert!(svd.contains("xs:noNamespaceSchemaLocation=\"CMSIS-SVD.xsd\""));
        assert!(svd.contains("<vendor>WIZnet</vendor>"));
        assert!(svd.contains("<resetMask>0xFFFFFFFF</resetMask>"));
    }

    #[test]
    fn text_is_escaped() {
        let svd = to_svd(&sample_device()).unwrap();
        assert!(svd.contains("<description>Ethernet &amp; MCU</description>"));
    }

    #[test]
    fn cpu_block_omits_unset_flags() {
        let svd = to_svd(&sample_device()).unwrap();
        assert!(svd.contains("<name>CM0</name>"));
        assert!(svd.contains("<fpuPresent>false</fpuPresent>"));
        assert!(!svd.contains("fpuDP"));
        assert!(svd.contains("<nvicPrioBits>2</nvicPrioBits>"));
    }

    #[test]
    fn peripheral_layouts() {
        let svd = to_svd(&sample_device()).unwrap();
        assert!(svd.contains("<peripheral derivedFrom=\"UART0\">"));
        assert!(svd.contains("<baseAddress>0x4000c000</baseAddress>"));
        assert!(svd.contains("<size>0x4c</size>"));
        assert!(svd.contains("<name>DR[%s]</name>"));
        assert!(svd.contains("<dim>2</dim>"));
        assert!(svd.contains("<addressOffset>0x000</addressOffset>"));
        assert!(svd.contains("<access>read-only</access>"));
        assert!(svd.contains("<resetValue>0x12</resetValue>"));
        assert!(svd.contains("<resetMask>0xff</resetMask>"));
        assert!(svd.contains("<bitRange>[7:0]</bitRange>"));
        assert!(svd.contains("<isDefault>true</isDefault>"));
        // The derived peripheral carries no registers block of its own.
        assert_eq!(svd.matches("<registers>").count(), 1);
    }

    #[test]
    fn rendering_is_deterministic() {
        let dev = sample_device();
        assert_eq!(to_svd(&dev).unwrap(), to_svd(&dev).unwrap());
    }
}
