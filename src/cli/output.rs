//! Output formatting for the package report

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::detect::ImpactReport;

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// One package path per line
    #[default]
    Text,
    /// A single JSON object
    Json,
}

/// Output helper for consistent formatting
pub struct Output {
    format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Writes the report
    pub fn report(&self, out: &mut dyn Write, report: &ImpactReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                for package in &report.packages {
                    writeln!(out, "{}", package)?;
                }
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut *out, report)?;
                writeln!(out)?;
            }
        }
        out.flush()
    }
}
