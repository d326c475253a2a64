//! Options validation

use super::raw_options;
use crate::config::Config;
use crate::output::OutputFormat;
use crate::{ConnectionArgs, FilterArgs};
use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde_json::Value;
use std::path::PathBuf;
use threatstream_intel::validate_options;

pub fn handle(
    file: Option<PathBuf>,
    connection: &ConnectionArgs,
    filters: &FilterArgs,
    profile: &Config,
    format: OutputFormat,
) -> Result<()> {
    let raw: Value = match file {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => raw_options(connection, filters, profile),
    };

    let errors = validate_options(&raw);
    if errors.is_empty() {
        println!("{}", "Options are valid".green());
        return Ok(());
    }

    match format {
        OutputFormat::Table => {
            for error in &errors {
                println!("{} {}", format!("{}:", error.key).yellow(), error.message);
            }
        }
        _ => format.print(&errors)?,
    }
    bail!("{} invalid option(s)", errors.len())
}
