use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::export::{load_issues_text, write_combined_csv, COMBINED_CSV};
use crate::pipeline::load_ledger;
use crate::reports::get_summary;
use crate::settings::Settings;

pub fn run(settings: &Settings) -> Result<()> {
    let ledger = load_ledger(settings)?;
    let path = settings.processed_dir().join(COMBINED_CSV);
    write_combined_csv(&path, &ledger.load.transactions, &[])?;

    let mut table = Table::new();
    table.set_header(vec!["File", "Rows", "SHA-256"]);
    for input in &ledger.load.inputs {
        table.add_row(vec![
            Cell::new(&input.path),
            Cell::new(input.rows),
            Cell::new(input.sha256.get(..12).unwrap_or(input.sha256.as_str())),
        ]);
    }
    println!("Inputs\n{table}");

    let summary = get_summary(&ledger.load);
    let mut table = Table::new();
    table.set_header(vec!["Account", "Transactions"]);
    for (account, count) in &summary.per_account {
        table.add_row(vec![Cell::new(account), Cell::new(count)]);
    }
    println!("\nLoaded {} transactions\n{table}", summary.transaction_count);
    println!(
        "Categorized: {}  Uncategorized: {}",
        ledger.categorize.categorized, ledger.categorize.uncategorized
    );

    let issues = load_issues_text(&ledger.load.issues);
    if !issues.is_empty() {
        println!("\n{issues}");
    }
    println!("Wrote {}", path.display());
    Ok(())
}
