//! Configuration file for cdr-cli
//!
//! ```toml
//! [analysis]
//! reference_numbers = ["0601020304"]
//! internal_numbers = ["101", "102"]
//!
//! [batch]
//! workers = 4
//!
//! [output]
//! directory = "./output"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CliConfig {
    pub analysis: AnalysisSection,
    pub batch: BatchSection,
    pub output: OutputSection,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisSection {
    pub reference_numbers: Vec<String>,
    /// Extra internal endpoints, merged with the directory file
    pub internal_numbers: Vec<String>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct BatchSection {
    pub workers: Option<usize>,
}

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSection {
    pub directory: Option<PathBuf>,
}

/// `<config_dir>/cdr-callflow/config.toml`
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| {
        dir.join("cdr-callflow")
            .join("config.toml")
    })
}

pub fn parse(contents: &str) -> Result<CliConfig> {
    toml::from_str(contents).context("Failed to parse config")
}

/// Load an explicit config file, else the default one if present, else
/// defaults.
pub fn load(explicit: Option<&Path>) -> Result<CliConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(CliConfig::default()),
        },
    };

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    parse(&contents).with_context(|| format!("Invalid config file: {:?}", path))
}
