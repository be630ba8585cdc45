use std::collections::BTreeMap;
use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::duplicates::DuplicateCandidate;
use crate::error::Result;
use crate::fmt::money;
use crate::importer::LoadIssue;
use crate::models::{Source, Transaction, TxnId};
use crate::reconciler::{FamilyReport, Status};
use crate::reports::{
    CashflowReport, CategoryMonthly, CategoryPercentages, CategoryStats, CategoryTotal, DataSummary, IncomeReport,
    MerchantTotal, Report,
};

pub const COMBINED_CSV: &str = "all_transactions.csv";
pub const REPORT_JSON: &str = "report.json";

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Combined CSV
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct CombinedRow<'a> {
    id: TxnId,
    date: String,
    time: String,
    amount: Decimal,
    description: &'a str,
    merchant: &'a str,
    source: Source,
    account: &'a str,
    category: &'a str,
    match_id: &'a str,
    status: &'a str,
}

/// Which reconciliation pair, if any, each transaction took part in.
fn pair_annotations(families: &[FamilyReport]) -> BTreeMap<TxnId, (&str, Status)> {
    let mut out = BTreeMap::new();
    for family in families {
        for pair in &family.pairs {
            out.insert(pair.settlement.id, (pair.match_id.as_str(), pair.status));
            for id in &pair.covered {
                out.insert(*id, (pair.match_id.as_str(), pair.status));
            }
        }
    }
    out
}

pub fn write_combined_csv(path: &Path, txns: &[Transaction], families: &[FamilyReport]) -> Result<()> {
    ensure_parent(path)?;
    let annotations = pair_annotations(families);
    let mut wtr = csv::Writer::from_path(path)?;
    for t in txns {
        let (match_id, status) = annotations
            .get(&t.id)
            .map(|(m, s)| (*m, s.label()))
            .unwrap_or(("", ""));
        wtr.serialize(CombinedRow {
            id: t.id,
            date: t.date.format("%Y-%m-%d").to_string(),
            time: t.time.map(|tm| tm.format("%H:%M:%S").to_string()).unwrap_or_default(),
            amount: t.amount,
            description: &t.description,
            merchant: t.merchant.as_deref().unwrap_or(""),
            source: t.source,
            account: &t.account,
            category: t.category_or_default().name(),
            match_id,
            status,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json_report(path: &Path, report: &Report) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

/// Writes a rendered summary with ANSI colours stripped.
pub fn write_text_summary(path: &Path, report: &Report) -> Result<()> {
    ensure_parent(path)?;
    colored::control::set_override(false);
    let text = summary_text(report);
    colored::control::unset_override();
    std::fs::write(path, text)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

fn signed(val: Decimal) -> String {
    if val >= Decimal::ZERO {
        money(val).green().to_string()
    } else {
        money(val).red().to_string()
    }
}

fn status_cell(status: Status) -> String {
    match status {
        Status::Match => status.label().green().to_string(),
        Status::Review => status.label().yellow().to_string(),
        Status::Mismatch => status.label().red().bold().to_string(),
    }
}

pub fn data_summary_text(summary: &DataSummary) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Account", "Transactions"]);
    for (account, count) in &summary.per_account {
        table.add_row(vec![Cell::new(account), Cell::new(count)]);
    }
    table.add_row(vec![Cell::new("Total".bold()), Cell::new(summary.transaction_count)]);

    let range = match (summary.first_date, summary.last_date) {
        (Some(first), Some(last)) => format!("{first} to {last}"),
        _ => "no transactions".to_string(),
    };
    format!(
        "Data Summary ({range})\n{table}\nCategorized: {}  Uncategorized: {}  Skipped rows: {}\n",
        summary.categorized, summary.uncategorized, summary.skipped_rows
    )
}

pub fn load_issues_text(issues: &[LoadIssue]) -> String {
    if issues.is_empty() {
        return String::new();
    }
    let mut table = Table::new();
    table.set_header(vec!["File", "Line", "Reason"]);
    for issue in issues {
        table.add_row(vec![
            Cell::new(&issue.file),
            Cell::new(issue.line),
            Cell::new(&issue.reason),
        ]);
    }
    format!("Excluded Rows\n{table}\n")
}

pub fn family_text(family: &FamilyReport) -> String {
    let mut out = format!(
        "{} ({}, {}-day lookback)\n",
        family.name.bold(),
        family.kind.key(),
        family.lookback_days
    );

    if family.pairs.is_empty() {
        out.push_str("No settlements found.\n");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["Match", "Date", "Payee", "Paid", "Covered", "Items", "Diff", "Status"]);
        for pair in &family.pairs {
            table.add_row(vec![
                Cell::new(&pair.match_id),
                Cell::new(pair.settlement.date),
                Cell::new(&pair.label),
                Cell::new(money(pair.actual)),
                Cell::new(money(pair.expected)),
                Cell::new(pair.covered.len()),
                Cell::new(money(pair.difference)),
                Cell::new(status_cell(pair.status)),
            ]);
        }
        out.push_str(&format!("{table}\n"));
    }

    let c = &family.status_counts;
    out.push_str(&format!(
        "Matched: {}  Review: {}  Mismatch: {}\n",
        c.matched, c.review, c.mismatch
    ));

    if !family.uncovered.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Account", "Description", "Amount", "Note"]);
        for u in &family.uncovered {
            table.add_row(vec![
                Cell::new(u.txn.date),
                Cell::new(&u.txn.account),
                Cell::new(&u.txn.description),
                Cell::new(money(u.txn.amount.abs())),
                Cell::new(if u.awaiting_settlement { "awaiting settlement" } else { "" }),
            ]);
        }
        out.push_str(&format!(
            "Uncovered spending ({})\n{table}\n",
            money(family.uncovered_total())
        ));
    }
    out
}

pub fn duplicates_text(duplicates: &[DuplicateCandidate]) -> String {
    if duplicates.is_empty() {
        return "Possible Duplicates\nNone found.\n".to_string();
    }
    let mut table = Table::new();
    table.set_header(vec!["Amount", "First", "Second", "Hours Apart"]);
    for d in duplicates {
        table.add_row(vec![
            Cell::new(money(d.amount)),
            Cell::new(format!("{} {} {}", d.first.date, d.first.account, d.first.description)),
            Cell::new(format!("{} {} {}", d.second.date, d.second.account, d.second.description)),
            Cell::new(d.hours_apart),
        ]);
    }
    format!("Possible Duplicates\n{table}\n")
}

pub fn cashflow_text(cashflow: &CashflowReport) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Month", "Income", "Expense", "Net", "Running"]);
    for m in &cashflow.months {
        table.add_row(vec![
            Cell::new(&m.month),
            Cell::new(money(m.income)),
            Cell::new(money(m.expense.abs())),
            Cell::new(signed(m.net)),
            Cell::new(money(m.running_balance)),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(cashflow.total_income)),
        Cell::new(money(cashflow.total_expense.abs())),
        Cell::new(signed(cashflow.net)),
        Cell::new(""),
    ]);
    format!("Cash Flow\n{table}\n")
}

/// Inputs to the spending section.
pub struct SpendingView<'a> {
    pub monthly: &'a CategoryMonthly,
    pub percentages: &'a CategoryPercentages,
    pub stats: &'a [CategoryStats],
    pub top_merchants: &'a BTreeMap<String, Vec<MerchantTotal>>,
}

/// Spending per category, optionally for one `YYYY-MM` month only. Stats and
/// top merchants cover every month, so they are shown only without a filter.
pub fn spending_text(view: &SpendingView<'_>, month: Option<&str>) -> String {
    let mut out = String::new();
    for (m, categories) in view.monthly {
        if month.is_some_and(|want| want != m.as_str()) {
            continue;
        }
        let shares = view.percentages.get(m);
        let mut rows: Vec<(&String, &CategoryTotal)> = categories.iter().collect();
        rows.sort_by(|a, b| b.1.total.cmp(&a.1.total).then_with(|| a.0.cmp(b.0)));
        let mut table = Table::new();
        table.set_header(vec!["Category", "Spent", "Share", "Count"]);
        for (name, total) in rows {
            let share = shares
                .and_then(|s| s.get(name))
                .map(|pct| format!("{pct:.2}%"))
                .unwrap_or_default();
            table.add_row(vec![
                Cell::new(name),
                Cell::new(money(total.total)),
                Cell::new(share),
                Cell::new(total.count),
            ]);
        }
        out.push_str(&format!("Spending {m}\n{table}\n"));
    }
    if out.is_empty() {
        out.push_str("No spending found.\n");
    }
    if month.is_some() {
        return out;
    }

    if !view.stats.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Total", "Count", "Average", "Median", "Min", "Max"]);
        for s in view.stats {
            table.add_row(vec![
                Cell::new(&s.category),
                Cell::new(money(s.total)),
                Cell::new(s.count),
                Cell::new(money(s.average)),
                Cell::new(money(s.median)),
                Cell::new(money(s.min)),
                Cell::new(money(s.max)),
            ]);
        }
        out.push_str(&format!("Category Statistics\n{table}\n"));
    }

    if !view.top_merchants.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Category", "Merchant", "Spent", "Count"]);
        for (category, merchants) in view.top_merchants {
            for m in merchants {
                table.add_row(vec![
                    Cell::new(category),
                    Cell::new(&m.merchant),
                    Cell::new(money(m.total)),
                    Cell::new(m.count),
                ]);
            }
        }
        out.push_str(&format!("Top Merchants\n{table}\n"));
    }
    out
}

pub fn income_text(income: &IncomeReport) -> String {
    let payers: Vec<&String> = income.by_payer.keys().collect();
    let mut header = vec!["Month".to_string()];
    header.extend(payers.iter().map(|p| p.to_string()));
    header.push("Total".to_string());

    let mut table = Table::new();
    table.set_header(header);
    for (month, by_payer) in &income.months {
        let mut row = vec![Cell::new(month)];
        for p in &payers {
            row.push(Cell::new(money(by_payer.get(*p).copied().unwrap_or_default())));
        }
        row.push(Cell::new(money(by_payer.values().copied().sum::<Decimal>())));
        table.add_row(row);
    }
    let mut total_row = vec![Cell::new("Total".bold())];
    for p in &payers {
        total_row.push(Cell::new(money(income.by_payer[*p])));
    }
    total_row.push(Cell::new(money(income.total).green().bold()));
    table.add_row(total_row);
    format!("Income\n{table}\n")
}

fn large_uncategorized_text(report: &Report) -> String {
    if report.large_uncategorized.is_empty() {
        return String::new();
    }
    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount"]);
    for t in &report.large_uncategorized {
        table.add_row(vec![
            Cell::new(t.date),
            Cell::new(&t.description),
            Cell::new(money(t.amount)),
        ]);
    }
    format!("Large Uncategorized Bank Transactions\n{table}\n")
}

/// Every report section in reading order.
pub fn summary_text(report: &Report) -> String {
    let mut sections = vec![data_summary_text(&report.summary)];
    sections.push(load_issues_text(&report.load_issues));
    for family in &report.families {
        sections.push(family_text(family));
    }
    sections.push(duplicates_text(&report.duplicates));
    sections.push(cashflow_text(&report.cash_flow));
    sections.push(spending_text(
        &SpendingView {
            monthly: &report.category_monthly,
            percentages: &report.category_percentages,
            stats: &report.category_summary,
            top_merchants: &report.top_merchants,
        },
        None,
    ));
    sections.push(income_text(&report.income));
    sections.push(large_uncategorized_text(report));
    sections.retain(|s| !s.is_empty());
    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, TxnRef};
    use crate::reconciler::{FamilyKind, ReconciliationPair, StatusCounts};
    use chrono::NaiveDate;
    use rust_decimal::prelude::dec;

    fn txn(id: usize, account: &str, amount: Decimal, category: Category) -> Transaction {
        Transaction {
            id: TxnId(id),
            date: NaiveDate::from_ymd_opt(2024, 3, 1 + id as u32).unwrap(),
            time: None,
            amount,
            description: format!("row {id}"),
            merchant: None,
            category_hint: None,
            source: if account == "td_bank" { Source::Bank } else { Source::CreditCard },
            account: account.into(),
            category: Some(category),
        }
    }

    fn family(txns: &[Transaction]) -> FamilyReport {
        FamilyReport {
            name: "Apple Card".into(),
            kind: FamilyKind::CreditCard,
            lookback_days: 45,
            pairs: vec![ReconciliationPair {
                match_id: "apple-card-001".into(),
                family: "Apple Card".into(),
                label: "Apple Card".into(),
                settlement: TxnRef::from(&txns[1]),
                covered: vec![TxnId(0)],
                window_start: NaiveDate::from_ymd_opt(2024, 1, 18).unwrap(),
                window_end: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                expected: dec!(20.00),
                actual: dec!(20.00),
                difference: Decimal::ZERO,
                match_pct: dec!(100),
                status: Status::Match,
                empty_window: false,
            }],
            uncovered: Vec::new(),
            status_counts: StatusCounts {
                matched: 1,
                review: 0,
                mismatch: 0,
            },
            total_actual: dec!(20.00),
            total_expected: dec!(20.00),
        }
    }

    #[test]
    fn test_combined_csv_columns_and_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed").join(COMBINED_CSV);
        let txns = vec![
            txn(0, "apple_card", dec!(-20.00), Category::Groceries),
            txn(1, "td_bank", dec!(-20.00), Category::Transfer),
            txn(2, "td_bank", dec!(-5.00), Category::Uncategorized),
        ];
        write_combined_csv(&path, &txns, &[family(&txns)]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines[0],
            "id,date,time,amount,description,merchant,source,account,category,match_id,status"
        );
        assert_eq!(
            lines[1],
            "0,2024-03-01,,-20.00,row 0,,credit_card,apple_card,Groceries,apple-card-001,MATCH"
        );
        assert!(lines[2].ends_with("Transfer,apple-card-001,MATCH"));
        assert!(lines[3].ends_with("Uncategorized,,"));
    }

    #[test]
    fn test_json_report_has_trailing_newline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(REPORT_JSON);
        let txns = vec![txn(0, "td_bank", dec!(100.00), Category::Income)];
        let load = crate::importer::LoadResult {
            transactions: txns,
            inputs: Vec::new(),
            issues: Vec::new(),
        };
        let report = crate::reports::build_report(crate::reports::ReportInputs {
            load: &load,
            families: Vec::new(),
            duplicates: Vec::new(),
            income_sources: &[],
            large_uncategorized_threshold: dec!(100),
        });
        write_json_report(&path, &report).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("}\n"));
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["summary"]["transaction_count"], 1);
        assert_eq!(value["cash_flow"]["months"][0]["income"], "100.00");
    }

    #[test]
    fn test_family_text_lists_pairs() {
        let txns = vec![
            txn(0, "apple_card", dec!(-20.00), Category::Groceries),
            txn(1, "td_bank", dec!(-20.00), Category::Transfer),
        ];
        let text = family_text(&family(&txns));
        assert!(text.contains("apple-card-001"));
        assert!(text.contains("$20.00"));
        assert!(text.contains("45-day lookback"));
    }

    #[test]
    fn test_spending_text_shows_shares_and_merchants() {
        let txns = vec![
            txn(0, "apple_card", dec!(-30.00), Category::Groceries),
            txn(1, "apple_card", dec!(-10.00), Category::Shopping),
        ];
        let monthly = crate::reports::get_category_monthly(&txns);
        let percentages = crate::reports::get_category_percentages(&monthly);
        let stats = crate::reports::get_category_summary(&txns);
        let top_merchants = crate::reports::get_top_merchants_by_category(&txns, 5);
        let view = SpendingView {
            monthly: &monthly,
            percentages: &percentages,
            stats: &stats,
            top_merchants: &top_merchants,
        };

        let text = spending_text(&view, None);
        assert!(text.contains("75.00%"));
        assert!(text.contains("25.00%"));
        assert!(text.contains("Top Merchants"));
        assert!(text.contains("row 0"));

        let filtered = spending_text(&view, Some("2024-03"));
        assert!(filtered.contains("Spending 2024-03"));
        assert!(!filtered.contains("Top Merchants"));
        assert!(spending_text(&view, Some("2023-01")).contains("No spending found."));
    }

    #[test]
    fn test_duplicates_text_when_empty() {
        assert!(duplicates_text(&[]).contains("None found."));
    }
}
