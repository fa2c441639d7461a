//! `svdgen generate`: run the extraction pipeline over one header.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use svdgen_core::{write_svd, CpuName, Device};
use svdgen_extract::{extract, ErrorPolicy, Profile};

use crate::OutputFormat;

/// Options shaping one generation run.
#[derive(Debug, Clone, Copy)]
pub struct Options<'a> {
    pub profile: Option<&'a str>,
    pub profile_file: Option<&'a Path>,
    pub name: Option<&'a str>,
    pub cpu: Option<CpuName>,
    pub collect_errors: bool,
    pub format: OutputFormat,
}

/// Resolve the profile: built-in, from file, or a bare one named after the header.
fn resolve_profile(header: &Path, options: &Options<'_>) -> Result<Profile> {
    let mut profile = match (options.profile, options.profile_file) {
        (Some(name), _) => Profile::builtin(name)
            .with_context(|| format!("loading built-in profile '{name}'"))?,
        (None, Some(path)) => Profile::load(path)
            .with_context(|| format!("loading profile {}", path.display()))?,
        (None, None) => {
            let stem = header
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("device");
            Profile::minimal(stem.to_uppercase(), CpuName::CM0)
        }
    };

    if let Some(name) = options.name {
        profile.device.name = name.to_owned();
    }
    if let Some(cpu) = options.cpu {
        profile.cpu.name = cpu;
    }
    Ok(profile)
}

/// Extract the device described by `header`.
///
/// Non-fatal diagnostics are logged as warnings by the engine.
pub fn generate(header: &Path, options: &Options<'_>) -> Result<Device> {
    let profile = resolve_profile(header, options)?;
    let text = fs::read_to_string(header)
        .with_context(|| format!("reading header {}", header.display()))?;

    let policy = if options.collect_errors {
        ErrorPolicy::CollectAll
    } else {
        ErrorPolicy::FailFast
    };
    let extraction = extract(&text, &profile, policy)?;
    tracing::info!(
        device = %extraction.device.name,
        warnings = extraction.diagnostics.len(),
        "extraction finished"
    );
    Ok(extraction.device)
}

/// Write `device` in the requested format.
pub fn render<W: Write>(device: &Device, format: OutputFormat, mut out: W) -> Result<()> {
    match format {
        OutputFormat::Svd => write_svd(device, &mut out)?,
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut out, device)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

pub fn run(header: &Path, options: &Options<'_>, output: Option<&Path>) -> Result<()> {
    let device = generate(header, options)?;
    match output {
        Some(path) => {
            let file = fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            render(&device, options.format, io::BufWriter::new(file))?;
            eprintln!(
                "Wrote {} ({} peripherals) to {}",
                device.name,
                device.peripherals.len(),
                path.display()
            );
        }
        None => render(&device, options.format, io::stdout().lock())?,
    }
    Ok(())
}
