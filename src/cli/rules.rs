use comfy_table::{Cell, Table};

use crate::categorizer::RuleEngine;
use crate::error::Result;
use crate::pipeline::load_ledger;
use crate::settings::Settings;

/// Prints the rule table in evaluation order, with hit counts when the raw
/// data loads cleanly.
pub fn list(settings: &Settings) -> Result<()> {
    let engine = RuleEngine::new(&settings.rules)?;
    let hits = match load_ledger(settings) {
        Ok(ledger) => Some(ledger.categorize.hits),
        Err(e) => {
            tracing::warn!("rule hit counts unavailable: {e}");
            None
        }
    };

    let mut table = Table::new();
    let mut header = vec!["#", "Pattern", "Type", "Category"];
    if hits.is_some() {
        header.push("Hits");
    }
    table.set_header(header);
    for (i, rule) in engine.rules().enumerate() {
        let mut row = vec![
            Cell::new(i + 1),
            Cell::new(&rule.pattern),
            Cell::new(rule.match_type.key()),
            Cell::new(rule.category),
        ];
        if let Some(hits) = &hits {
            row.push(Cell::new(hits.get(i).copied().unwrap_or(0)));
        }
        table.add_row(row);
    }
    println!("Rules (first match wins)\n{table}");
    Ok(())
}
