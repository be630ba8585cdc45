use std::path::PathBuf;

use crate::duplicates::find_duplicates;
use crate::error::Result;
use crate::export::{
    cashflow_text, duplicates_text, income_text, spending_text, summary_text, write_text_summary, SpendingView,
};
use crate::pipeline::{load_ledger, run as run_pipeline, write_outputs};
use crate::reports;
use crate::settings::{shellexpand_path, Settings};

use super::parse_month_opt;

pub fn duplicates(settings: &Settings) -> Result<()> {
    let ledger = load_ledger(settings)?;
    let found = find_duplicates(&ledger.load.transactions, settings.duplicate_window_hours);
    print!("{}", duplicates_text(&found));
    Ok(())
}

pub fn cashflow(settings: &Settings) -> Result<()> {
    let ledger = load_ledger(settings)?;
    print!("{}", cashflow_text(&reports::get_cashflow(&ledger.load.transactions)));
    Ok(())
}

pub fn spending(settings: &Settings, month: Option<String>) -> Result<()> {
    let month = parse_month_opt(&month)?;
    let ledger = load_ledger(settings)?;
    let txns = &ledger.load.transactions;
    let monthly = reports::get_category_monthly(txns);
    let percentages = reports::get_category_percentages(&monthly);
    let stats = reports::get_category_summary(txns);
    let top_merchants = reports::get_top_merchants_by_category(txns, reports::TOP_MERCHANTS);
    let view = SpendingView {
        monthly: &monthly,
        percentages: &percentages,
        stats: &stats,
        top_merchants: &top_merchants,
    };
    print!("{}", spending_text(&view, month.as_deref()));
    Ok(())
}

pub fn income(settings: &Settings) -> Result<()> {
    let ledger = load_ledger(settings)?;
    let data = reports::get_income(&ledger.load.transactions, &settings.income_sources);
    print!("{}", income_text(&data));
    Ok(())
}

/// Full run: writes the combined CSV and JSON report, then prints the text
/// summary or writes it to `output`.
pub fn full(settings: &Settings, output: Option<String>, json: Option<String>) -> Result<()> {
    let (ledger, report) = run_pipeline(settings)?;
    let json = json.map(|p| PathBuf::from(shellexpand_path(&p)));
    let outputs = write_outputs(settings, &ledger, &report, json.as_deref())?;

    match output {
        Some(path) => {
            let path = PathBuf::from(shellexpand_path(&path));
            write_text_summary(&path, &report)?;
            println!("Summary written to {}", path.display());
        }
        None => print!("{}", summary_text(&report)),
    }
    println!("Wrote {}", outputs.csv.display());
    println!("Wrote {}", outputs.json.display());
    Ok(())
}
