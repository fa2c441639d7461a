//! `svdgen profile`: built-in profile listing, description and validation.

use std::path::Path;

use anyhow::{bail, Context, Result};
use svdgen_extract::{builtin_profiles, Profile};

use crate::ProfileFormat;

/// List all built-in profiles.
pub fn list() -> Result<()> {
    println!("Built-in profiles:");
    println!();
    for (name, description) in builtin_profiles() {
        println!("  {name:<12} {description}");
    }
    println!();
    println!("Use 'svdgen profile describe <name>' for details.");
    Ok(())
}

/// Render a built-in profile.
pub fn render(name: &str, format: ProfileFormat) -> Result<String> {
    let profile =
        Profile::builtin(name).context("use 'svdgen profile list' to see available profiles")?;
    let text = match format {
        ProfileFormat::Toml => profile.to_toml()?,
        ProfileFormat::Json => serde_json::to_string_pretty(&profile)?,
    };
    Ok(text)
}

pub fn describe(name: &str, format: ProfileFormat) -> Result<()> {
    println!("{}", render(name, format)?);
    Ok(())
}

/// Load a profile file and check it for structural problems.
pub fn validate(path: &Path) -> Result<()> {
    let profile =
        Profile::load(path).with_context(|| format!("loading profile {}", path.display()))?;
    if let Err(issues) = profile.validate() {
        for issue in &issues {
            eprintln!("  {issue}");
        }
        bail!(
            "profile {} has {} validation issue(s)",
            path.display(),
            issues.len()
        );
    }
    println!(
        "Profile {} is valid ({} overrides, {} patches).",
        profile.device.name,
        profile.reset_values.len() + profile.enumerated_values.len(),
        profile.patches.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_includes_builtins() {
        let profiles = builtin_profiles();
        assert!(profiles.iter().any(|(name, _)| *name == "w7500x"));
        assert!(list().is_ok());
    }

    #[test]
    fn describe_known_profile() {
        let toml_text = render("w7500x", ProfileFormat::Toml).unwrap();
        let reparsed = Profile::parse(&toml_text).unwrap();
        assert_eq!(reparsed, Profile::builtin("w7500x").unwrap());

        let json = render("W7500X", ProfileFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["device"]["name"], "W7500x");
    }

    #[test]
    fn describe_unknown_profile() {
        let err = render("nonexistent", ProfileFormat::Toml).unwrap_err();
        assert!(format!("{err:#}").contains("unknown built-in profile 'nonexistent'"));
    }

    #[test]
    fn validate_profile_file() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("good.toml");
        std::fs::write(&good, "[device]\nname = \"FOO\"\n").unwrap();
        assert!(validate(&good).is_ok());

        let bad = tmp.path().join("bad.toml");
        std::fs::write(&bad, "[device]\nname = \"\"\n").unwrap();
        assert!(validate(&bad).is_err());

        assert!(validate(&tmp.path().join("missing.toml")).is_err());
    }

    #[test]
    fn toml_written_profile_loads() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("w7500x.toml");
        std::fs::write(&path, render("w7500x", ProfileFormat::Toml).unwrap()).unwrap();
        assert!(validate(&path).is_ok());
    }
}
