pub mod init;
pub mod load;
pub mod reconcile;
pub mod report;
pub mod rules;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::{ReckonError, Result};
use crate::settings::{default_settings_path, load_settings, shellexpand_path, Settings};

/// Parse a `YYYY-MM` argument into the month key used by reports.
pub(crate) fn parse_month_opt(month: &Option<String>) -> Result<Option<String>> {
    let Some(m) = month else {
        return Ok(None);
    };
    let parts: Vec<&str> = m.split('-').collect();
    if parts.len() == 2 {
        let year: Option<i32> = parts[0].parse().ok();
        let month: Option<u32> = parts[1].parse().ok();
        if let (Some(y), Some(mm)) = (year, month) {
            if (1..=12).contains(&mm) {
                return Ok(Some(format!("{y:04}-{mm:02}")));
            }
        }
    }
    Err(ReckonError::Other(format!("Invalid month '{m}', expected YYYY-MM")))
}

#[derive(Parser)]
#[command(
    name = "reckon",
    version,
    about = "Load statements, categorize spending, and reconcile card and app payments against the bank."
)]
pub struct Cli {
    /// Settings file (default: ~/.config/reckon/settings.json)
    #[arg(long, global = true)]
    pub config: Option<String>,
    /// Data directory override (contains raw/ and processed/)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn settings_path(&self) -> PathBuf {
        self.config
            .as_deref()
            .map(|p| PathBuf::from(shellexpand_path(p)))
            .unwrap_or_else(default_settings_path)
    }

    /// Settings from the config file with `--data-dir` applied.
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = load_settings(&self.settings_path())?;
        if let Some(dir) = &self.data_dir {
            settings.data_dir = shellexpand_path(dir);
        }
        Ok(settings)
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write default settings and create one raw/ folder per feed.
    Init,
    /// Load and categorize every feed, then write the combined CSV.
    Load,
    /// List categorization rules in evaluation order.
    Rules,
    /// Match settlement payments to the spending they cover.
    Reconcile {
        /// Only this family (e.g. "Apple Card")
        #[arg(long)]
        family: Option<String>,
    },
    /// Flag same-amount transactions reported by two feeds.
    Duplicates,
    /// Monthly bank cash flow.
    Cashflow,
    /// Spending by category.
    Spending {
        /// Month: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Monthly income by payer.
    Income,
    /// Run everything and write the CSV, JSON and text reports.
    Report {
        /// Write the text summary here instead of stdout
        #[arg(long)]
        output: Option<String>,
        /// JSON report path (default: <data_dir>/processed/report.json)
        #[arg(long)]
        json: Option<String>,
    },
}
