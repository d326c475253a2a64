//! Output formatting

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use threatstream_intel::{LookupResult, Severity, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        Self::from_str(name, true).ok()
    }

    /// Print structured data; tables fall back to pretty JSON
    pub fn print<T: Serialize>(&self, data: &T) -> Result<()> {
        match self {
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
            OutputFormat::Json | OutputFormat::Table => {
                println!("{}", serde_json::to_string_pretty(data)?)
            }
        }
        Ok(())
    }

    /// Print `data`, rendering `rows` instead when a table was asked for
    pub fn print_rows<T, R>(&self, data: &T, rows: Vec<R>) -> Result<()>
    where
        T: Serialize,
        R: Tabled,
    {
        match self {
            OutputFormat::Table => {
                let mut table = Table::new(rows);
                table.with(Style::rounded());
                println!("{}", table);
                Ok(())
            }
            _ => self.print(data),
        }
    }
}

#[derive(Debug, Tabled)]
pub struct LookupRow {
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Type")]
    pub entity_type: String,
    #[tabled(rename = "Records")]
    pub records: usize,
    #[tabled(rename = "Severity")]
    pub severity: String,
    #[tabled(rename = "Confidence")]
    pub confidence: String,
    #[tabled(rename = "Sources")]
    pub sources: String,
    #[tabled(rename = "Comments")]
    pub comments: String,
}

impl From<&LookupResult> for LookupRow {
    fn from(result: &LookupResult) -> Self {
        let records = &result.data.details.intelligence;

        let severity = records
            .iter()
            .filter_map(|r| r.pointer("/meta/severity").and_then(Value::as_str))
            .filter_map(|s| s.parse::<Severity>().ok())
            .max();

        let confidence = records
            .iter()
            .filter_map(|r| r.get("confidence").and_then(Value::as_u64))
            .max();

        let mut sources: Vec<&str> = records
            .iter()
            .filter_map(|r| r.get("source").and_then(Value::as_str))
            .collect();
        sources.sort_unstable();
        sources.dedup();

        Self {
            value: result.entity.value.clone(),
            entity_type: result.entity.entity_type.to_string(),
            records: records.len(),
            severity: severity.map(|s| s.to_string()).unwrap_or_else(|| "-".into()),
            confidence: confidence.map(|c| c.to_string()).unwrap_or_else(|| "-".into()),
            sources: if sources.is_empty() { "-".into() } else { sources.join(", ") },
            comments: result
                .data
                .details
                .comments
                .as_array()
                .map(|c| c.len().to_string())
                .unwrap_or_else(|| "-".into()),
        }
    }
}

#[derive(Debug, Tabled)]
pub struct TagRow {
    #[tabled(rename = "Tag")]
    pub name: String,
    #[tabled(rename = "Preferred")]
    pub preferred: bool,
    #[tabled(rename = "New")]
    pub new: bool,
}

impl From<&Tag> for TagRow {
    fn from(tag: &Tag) -> Self {
        Self {
            name: tag.name.clone(),
            preferred: tag.is_preferred,
            new: tag.is_new,
        }
    }
}
