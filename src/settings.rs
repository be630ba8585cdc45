use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use rust_decimal::prelude::dec;
use serde::{Deserialize, Serialize};

use crate::categorizer::{default_rules, Rule};
use crate::error::{ReckonError, Result};
use crate::importer::{FeedConfig, FeedFormat};
use crate::models::{Category, Source};
use crate::reconciler::{CounterpartFilter, FamilyConfig, FamilyKind, Thresholds};

/// A case-insensitive description pattern mapped to a display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub pattern: String,
    pub label: String,
}

impl Mapping {
    fn new(pattern: &str, label: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            label: label.to_string(),
        }
    }
}

/// Returns the label of the first mapping whose pattern occurs in `text`.
pub fn lookup_mapping<'a>(mappings: &'a [Mapping], text: &str) -> Option<&'a str> {
    let lower = text.to_lowercase();
    mappings
        .iter()
        .find(|m| lower.contains(&m.pattern.to_lowercase()))
        .map(|m| m.label.as_str())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedConfig>,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default = "default_duplicate_window_hours")]
    pub duplicate_window_hours: i64,
    #[serde(default = "default_large_uncategorized_threshold")]
    pub large_uncategorized_threshold: Decimal,
    /// Evaluated top to bottom; the first matching rule wins.
    #[serde(default = "default_rules")]
    pub rules: Vec<Rule>,
    #[serde(default = "default_families")]
    pub families: Vec<FamilyConfig>,
    #[serde(default = "default_income_sources")]
    pub income_sources: Vec<Mapping>,
    #[serde(default = "default_rent_properties")]
    pub rent_properties: Vec<Mapping>,
}

fn default_duplicate_window_hours() -> i64 {
    24
}

fn default_large_uncategorized_threshold() -> Decimal {
    dec!(100)
}

fn default_feeds() -> Vec<FeedConfig> {
    vec![
        FeedConfig {
            name: "td_bank".into(),
            source: Source::Bank,
            format: FeedFormat::TdBank,
            required: true,
        },
        FeedConfig {
            name: "apple_card".into(),
            source: Source::CreditCard,
            format: FeedFormat::AppleCard,
            required: false,
        },
        FeedConfig {
            name: "robinhood".into(),
            source: Source::CreditCard,
            format: FeedFormat::Robinhood,
            required: false,
        },
        FeedConfig {
            name: "venmo".into(),
            source: Source::PaymentApp,
            format: FeedFormat::Venmo,
            required: false,
        },
    ]
}

/// Longest settlement lookback a family may configure.
pub const MAX_LOOKBACK_DAYS: i64 = 3660;
/// Longest duplicate-detection window.
pub const MAX_DUPLICATE_WINDOW_HOURS: i64 = 24 * 366;

/// Families claim in this order, so narrower counterpart filters come
/// before the broad per-feed ones they overlap with.
fn default_families() -> Vec<FamilyConfig> {
    vec![
        FamilyConfig {
            name: "Apple Card".into(),
            kind: FamilyKind::CreditCard,
            settlement_account: "td_bank".into(),
            payee_patterns: vec!["applecard".into(), "apple card".into()],
            counterpart: CounterpartFilter {
                account: Some("apple_card".into()),
                ..Default::default()
            },
            lookback_days: None,
            required: true,
        },
        FamilyConfig {
            name: "Robinhood".into(),
            kind: FamilyKind::CreditCard,
            settlement_account: "td_bank".into(),
            payee_patterns: vec!["robinhood card".into(), "robinhood credit".into()],
            counterpart: CounterpartFilter {
                account: Some("robinhood".into()),
                ..Default::default()
            },
            lookback_days: None,
            required: false,
        },
        FamilyConfig {
            name: "Rent".into(),
            kind: FamilyKind::Rent,
            settlement_account: "td_bank".into(),
            payee_patterns: Vec::new(),
            counterpart: CounterpartFilter {
                source: Some(Source::PaymentApp),
                category: Some(Category::Rent),
                ..Default::default()
            },
            lookback_days: None,
            required: false,
        },
        FamilyConfig {
            name: "Venmo".into(),
            kind: FamilyKind::PaymentApp,
            settlement_account: "td_bank".into(),
            payee_patterns: vec!["venmo".into()],
            counterpart: CounterpartFilter {
                account: Some("venmo".into()),
                ..Default::default()
            },
            lookback_days: None,
            required: false,
        },
    ]
}

fn default_income_sources() -> Vec<Mapping> {
    vec![
        Mapping::new("payroll", "Payroll"),
        Mapping::new("direct dep", "Payroll"),
        Mapping::new("zelle", "Zelle"),
        Mapping::new("venmo", "Venmo"),
        Mapping::new("interest", "Interest"),
        Mapping::new("tax ref", "Tax Refund"),
    ]
}

fn default_rent_properties() -> Vec<Mapping> {
    vec![
        Mapping::new("property management", "Apartment"),
        Mapping::new("property mgmt", "Apartment"),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            feeds: default_feeds(),
            thresholds: Thresholds::default(),
            duplicate_window_hours: default_duplicate_window_hours(),
            large_uncategorized_threshold: default_large_uncategorized_threshold(),
            rules: default_rules(),
            families: default_families(),
            income_sources: default_income_sources(),
            rent_properties: default_rent_properties(),
        }
    }
}

impl Settings {
    pub fn raw_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        PathBuf::from(&self.data_dir).join("processed")
    }

    /// Cross-checks feeds and families so misconfiguration fails before any
    /// file is read.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for feed in &self.feeds {
            if !names.insert(feed.name.as_str()) {
                return Err(ReckonError::Config(format!("duplicate feed '{}'", feed.name)));
            }
        }
        for family in &self.families {
            if !names.contains(family.settlement_account.as_str()) {
                return Err(ReckonError::Config(format!(
                    "family '{}' settles from unknown feed '{}'",
                    family.name, family.settlement_account
                )));
            }
            if let Some(account) = &family.counterpart.account {
                if !names.contains(account.as_str()) {
                    return Err(ReckonError::Config(format!(
                        "family '{}' covers unknown feed '{account}'",
                        family.name
                    )));
                }
            }
            if family.lookback_days.is_some_and(|d| !(1..=MAX_LOOKBACK_DAYS).contains(&d)) {
                return Err(ReckonError::Config(format!(
                    "family '{}' lookback must be between 1 and {MAX_LOOKBACK_DAYS} days",
                    family.name
                )));
            }
        }
        if self.thresholds.match_below > self.thresholds.review_below {
            return Err(ReckonError::Config(
                "match threshold must not exceed review threshold".into(),
            ));
        }
        if !(0..=MAX_DUPLICATE_WINDOW_HOURS).contains(&self.duplicate_window_hours) {
            return Err(ReckonError::Config(format!(
                "duplicate window must be between 0 and {MAX_DUPLICATE_WINDOW_HOURS} hours"
            )));
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("reckon")
}

pub fn default_settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("reckon")
}

/// Missing file means defaults; an unreadable or malformed file is an error.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| ReckonError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ReckonError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
