use std::path::{Path, PathBuf};

use crate::categorizer::{categorize_transactions, CategorizeResult, RuleEngine};
use crate::duplicates::find_duplicates;
use crate::error::Result;
use crate::export::{write_combined_csv, write_json_report, COMBINED_CSV, REPORT_JSON};
use crate::importer::{load_transactions, LoadResult};
use crate::reconciler::{reconcile_all, FamilyReport};
use crate::reports::{build_report, Report, ReportInputs};
use crate::settings::Settings;

/// Loaded and categorized transactions for one run.
pub struct Ledger {
    pub load: LoadResult,
    pub categorize: CategorizeResult,
}

pub fn load_ledger(settings: &Settings) -> Result<Ledger> {
    settings.validate()?;
    let engine = RuleEngine::new(&settings.rules)?;
    let mut load = load_transactions(&settings.raw_dir(), &settings.feeds)?;
    let categorize = categorize_transactions(&engine, &mut load.transactions);
    Ok(Ledger { load, categorize })
}

pub fn reconcile(settings: &Settings, ledger: &Ledger) -> Result<Vec<FamilyReport>> {
    reconcile_all(
        &settings.families,
        &ledger.load.transactions,
        &settings.rent_properties,
        &settings.thresholds,
    )
}

/// Runs every stage and assembles the report. Writes nothing.
pub fn run(settings: &Settings) -> Result<(Ledger, Report)> {
    let ledger = load_ledger(settings)?;
    let families = reconcile(settings, &ledger)?;
    let duplicates = find_duplicates(&ledger.load.transactions, settings.duplicate_window_hours);
    let report = build_report(ReportInputs {
        load: &ledger.load,
        families,
        duplicates,
        income_sources: &settings.income_sources,
        large_uncategorized_threshold: settings.large_uncategorized_threshold,
    });
    Ok((ledger, report))
}

pub struct Outputs {
    pub csv: PathBuf,
    pub json: PathBuf,
}

/// Writes the combined CSV and JSON report, by default under
/// `<data_dir>/processed/`.
pub fn write_outputs(
    settings: &Settings,
    ledger: &Ledger,
    report: &Report,
    json_path: Option<&Path>,
) -> Result<Outputs> {
    let processed = settings.processed_dir();
    let csv = processed.join(COMBINED_CSV);
    let json = json_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| processed.join(REPORT_JSON));
    write_combined_csv(&csv, &ledger.load.transactions, &report.families)?;
    write_json_report(&json, report)?;
    tracing::info!(csv = %csv.display(), json = %json.display(), "wrote outputs");
    Ok(Outputs { csv, json })
}
