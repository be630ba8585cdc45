use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::duplicates::DuplicateCandidate;
use crate::importer::{InputFile, LoadIssue, LoadResult};
use crate::models::{Category, Source, Transaction, TxnRef};
use crate::reconciler::FamilyReport;
use crate::settings::{lookup_mapping, Mapping};

fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub transaction_count: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub per_account: BTreeMap<String, usize>,
    pub categorized: usize,
    pub uncategorized: usize,
    pub skipped_rows: usize,
    pub inputs: Vec<InputFile>,
}

pub fn get_summary(load: &LoadResult) -> DataSummary {
    let txns = &load.transactions;
    let mut per_account = BTreeMap::new();
    for t in txns {
        *per_account.entry(t.account.clone()).or_insert(0) += 1;
    }
    let uncategorized = txns
        .iter()
        .filter(|t| t.category_or_default() == Category::Uncategorized)
        .count();
    DataSummary {
        transaction_count: txns.len(),
        first_date: txns.iter().map(|t| t.date).min(),
        last_date: txns.iter().map(|t| t.date).max(),
        per_account,
        categorized: txns.len() - uncategorized,
        uncategorized,
        skipped_rows: load.issues.len(),
        inputs: load.inputs.clone(),
    }
}

// ---------------------------------------------------------------------------
// Spending by category
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub total: Decimal,
    pub count: usize,
}

/// Month → category name → outflow magnitude and count.
pub type CategoryMonthly = BTreeMap<String, BTreeMap<String, CategoryTotal>>;

pub fn get_category_monthly(txns: &[Transaction]) -> CategoryMonthly {
    let mut out: CategoryMonthly = BTreeMap::new();
    for t in txns.iter().filter(|t| t.is_outflow()) {
        let entry = out
            .entry(month_key(t.date))
            .or_default()
            .entry(t.category_or_default().name().to_string())
            .or_default();
        entry.total += t.amount.abs();
        entry.count += 1;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub total: Decimal,
    pub count: usize,
    pub average: Decimal,
    pub median: Decimal,
    pub min: Decimal,
    pub max: Decimal,
}

fn median(sorted: &[Decimal]) -> Decimal {
    let n = sorted.len();
    if n == 0 {
        return Decimal::ZERO;
    }
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / Decimal::TWO
    }
}

/// Per-category statistics over outflow magnitudes, largest total first.
pub fn get_category_summary(txns: &[Transaction]) -> Vec<CategoryStats> {
    let mut amounts: BTreeMap<&'static str, Vec<Decimal>> = BTreeMap::new();
    for t in txns.iter().filter(|t| t.is_outflow()) {
        amounts
            .entry(t.category_or_default().name())
            .or_default()
            .push(t.amount.abs());
    }

    let mut stats: Vec<CategoryStats> = amounts
        .into_iter()
        .map(|(category, mut values)| {
            values.sort();
            let total: Decimal = values.iter().sum();
            let count = values.len();
            CategoryStats {
                category: category.to_string(),
                total,
                count,
                average: (total / Decimal::from(count)).round_dp(2),
                median: median(&values).round_dp(2),
                min: values[0],
                max: values[count - 1],
            }
        })
        .collect();
    stats.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    stats
}

/// Month → category name → share of that month's outflow, in percent.
pub type CategoryPercentages = BTreeMap<String, BTreeMap<String, Decimal>>;

pub fn get_category_percentages(monthly: &CategoryMonthly) -> CategoryPercentages {
    let mut out = CategoryPercentages::new();
    for (month, categories) in monthly {
        let month_total: Decimal = categories.values().map(|c| c.total).sum();
        if month_total.is_zero() {
            continue;
        }
        let shares = categories
            .iter()
            .map(|(name, c)| (name.clone(), (c.total / month_total * Decimal::ONE_HUNDRED).round_dp(2)))
            .collect();
        out.insert(month.clone(), shares);
    }
    out
}

/// Merchants listed per category in the full report.
pub const TOP_MERCHANTS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MerchantTotal {
    pub merchant: String,
    pub total: Decimal,
    pub count: usize,
}

/// The `n` merchants with the largest outflow in each category. Rows with
/// no merchant are grouped by description.
pub fn get_top_merchants_by_category(txns: &[Transaction], n: usize) -> BTreeMap<String, Vec<MerchantTotal>> {
    let mut grouped: BTreeMap<&'static str, BTreeMap<&str, (Decimal, usize)>> = BTreeMap::new();
    for t in txns.iter().filter(|t| t.is_outflow()) {
        let merchant = t
            .merchant
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or(t.description.as_str());
        let entry = grouped
            .entry(t.category_or_default().name())
            .or_default()
            .entry(merchant)
            .or_default();
        entry.0 += t.amount.abs();
        entry.1 += 1;
    }

    grouped
        .into_iter()
        .map(|(category, merchants)| {
            let mut top: Vec<MerchantTotal> = merchants
                .into_iter()
                .map(|(merchant, (total, count))| MerchantTotal {
                    merchant: merchant.to_string(),
                    total,
                    count,
                })
                .collect();
            top.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.merchant.cmp(&b.merchant)));
            top.truncate(n);
            (category.to_string(), top)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Cash Flow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashflowMonth {
    pub month: String,
    pub income: Decimal,
    /// Kept negative.
    pub expense: Decimal,
    pub net: Decimal,
    pub running_balance: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CashflowReport {
    pub months: Vec<CashflowMonth>,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
}

/// Bank-only money in and out per calendar month.
pub fn get_cashflow(txns: &[Transaction]) -> CashflowReport {
    let mut by_month: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for t in txns.iter().filter(|t| t.source == Source::Bank) {
        let (income, expense) = by_month.entry(month_key(t.date)).or_default();
        if t.amount > Decimal::ZERO {
            *income += t.amount;
        } else {
            *expense += t.amount;
        }
    }

    let mut report = CashflowReport::default();
    let mut running = Decimal::ZERO;
    for (month, (income, expense)) in by_month {
        let net = income + expense;
        running += net;
        report.total_income += income;
        report.total_expense += expense;
        report.months.push(CashflowMonth {
            month,
            income,
            expense,
            net,
            running_balance: running,
        });
    }
    report.net = report.total_income + report.total_expense;
    report
}

// ---------------------------------------------------------------------------
// Income
// ---------------------------------------------------------------------------

pub const OTHER_PAYER: &str = "Other";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncomeReport {
    /// Month → payer label → amount.
    pub months: BTreeMap<String, BTreeMap<String, Decimal>>,
    pub by_payer: BTreeMap<String, Decimal>,
    pub total: Decimal,
}

pub fn get_income(txns: &[Transaction], income_sources: &[Mapping]) -> IncomeReport {
    let mut report = IncomeReport::default();
    for t in txns
        .iter()
        .filter(|t| t.source == Source::Bank && t.amount > Decimal::ZERO)
    {
        let payer = lookup_mapping(income_sources, &t.description).unwrap_or(OTHER_PAYER);
        *report
            .months
            .entry(month_key(t.date))
            .or_default()
            .entry(payer.to_string())
            .or_default() += t.amount;
        *report.by_payer.entry(payer.to_string()).or_default() += t.amount;
        report.total += t.amount;
    }
    report
}

// ---------------------------------------------------------------------------
// Large uncategorized
// ---------------------------------------------------------------------------

/// Bank rows no rule claimed whose size warrants a look.
pub fn get_large_uncategorized(txns: &[Transaction], threshold: Decimal) -> Vec<TxnRef> {
    txns.iter()
        .filter(|t| {
            t.source == Source::Bank
                && t.category_or_default() == Category::Uncategorized
                && t.amount.abs() > threshold
        })
        .map(TxnRef::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Full report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub summary: DataSummary,
    pub category_monthly: CategoryMonthly,
    pub category_percentages: CategoryPercentages,
    pub category_summary: Vec<CategoryStats>,
    pub top_merchants: BTreeMap<String, Vec<MerchantTotal>>,
    pub families: Vec<FamilyReport>,
    pub duplicates: Vec<DuplicateCandidate>,
    pub cash_flow: CashflowReport,
    pub income: IncomeReport,
    pub large_uncategorized: Vec<TxnRef>,
    pub load_issues: Vec<LoadIssue>,
}

pub struct ReportInputs<'a> {
    pub load: &'a LoadResult,
    pub families: Vec<FamilyReport>,
    pub duplicates: Vec<DuplicateCandidate>,
    pub income_sources: &'a [Mapping],
    pub large_uncategorized_threshold: Decimal,
}

pub fn build_report(inputs: ReportInputs<'_>) -> Report {
    let txns = &inputs.load.transactions;
    let category_monthly = get_category_monthly(txns);
    Report {
        summary: get_summary(inputs.load),
        category_percentages: get_category_percentages(&category_monthly),
        category_monthly,
        category_summary: get_category_summary(txns),
        top_merchants: get_top_merchants_by_category(txns, TOP_MERCHANTS),
        families: inputs.families,
        duplicates: inputs.duplicates,
        cash_flow: get_cashflow(txns),
        income: get_income(txns, inputs.income_sources),
        large_uncategorized: get_large_uncategorized(txns, inputs.large_uncategorized_threshold),
        load_issues: inputs.load.issues.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TxnId;
    use rust_decimal::prelude::dec;

    fn txn(
        id: usize,
        date: &str,
        source: Source,
        description: &str,
        amount: Decimal,
        category: Option<Category>,
    ) -> Transaction {
        Transaction {
            id: TxnId(id),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            time: None,
            amount,
            description: description.into(),
            merchant: None,
            category_hint: None,
            source,
            account: source.key().into(),
            category,
        }
    }

    fn ledger() -> Vec<Transaction> {
        vec![
            txn(0, "2024-01-02", Source::Bank, "ACME PAYROLL", dec!(3000.00), Some(Category::Income)),
            txn(1, "2024-01-05", Source::Bank, "CON ED", dec!(-120.00), Some(Category::Utilities)),
            txn(2, "2024-01-09", Source::CreditCard, "TRADER JOES", dec!(-45.10), Some(Category::Groceries)),
            txn(3, "2024-01-20", Source::CreditCard, "WHOLE FOODS", dec!(-30.00), Some(Category::Groceries)),
            txn(4, "2024-02-01", Source::Bank, "CHECK 1042", dec!(-800.00), None),
            txn(5, "2024-02-03", Source::Bank, "MOBILE DEPOSIT", dec!(250.00), None),
            txn(6, "2024-02-11", Source::CreditCard, "SAFEWAY", dec!(-60.00), Some(Category::Groceries)),
            txn(7, "2024-02-15", Source::Bank, "ATM FEE", dec!(-3.00), None),
        ]
    }

    #[test]
    fn test_cashflow_months_and_running_balance() {
        let cf = get_cashflow(&ledger());
        assert_eq!(cf.months.len(), 2);
        assert_eq!(cf.months[0].month, "2024-01");
        assert_eq!(cf.months[0].income, dec!(3000.00));
        assert_eq!(cf.months[0].expense, dec!(-120.00));
        assert_eq!(cf.months[0].net, dec!(2880.00));
        assert_eq!(cf.months[1].net, dec!(-553.00));
        assert_eq!(cf.months[1].running_balance, dec!(2327.00));
    }

    #[test]
    fn test_cashflow_net_sums_to_bank_total() {
        let txns = ledger();
        let cf = get_cashflow(&txns);
        let monthly: Decimal = cf.months.iter().map(|m| m.net).sum();
        let bank: Decimal = txns
            .iter()
            .filter(|t| t.source == Source::Bank)
            .map(|t| t.amount)
            .sum();
        assert_eq!(monthly, bank);
        assert_eq!(cf.net, bank);
    }

    #[test]
    fn test_category_monthly() {
        let monthly = get_category_monthly(&ledger());
        let jan = &monthly["2024-01"];
        assert_eq!(jan["Groceries"].total, dec!(75.10));
        assert_eq!(jan["Groceries"].count, 2);
        assert_eq!(jan["Utilities"].total, dec!(120.00));
        assert!(!jan.contains_key("Income"));
        assert_eq!(monthly["2024-02"]["Uncategorized"].total, dec!(803.00));
    }

    #[test]
    fn test_category_summary_stats() {
        let stats = get_category_summary(&ledger());
        assert_eq!(stats[0].category, "Uncategorized");
        let groceries = stats.iter().find(|s| s.category == "Groceries").unwrap();
        assert_eq!(groceries.total, dec!(135.10));
        assert_eq!(groceries.count, 3);
        assert_eq!(groceries.average, dec!(45.03));
        assert_eq!(groceries.median, dec!(45.10));
        assert_eq!(groceries.min, dec!(30.00));
        assert_eq!(groceries.max, dec!(60.00));
        let uncat = &stats[0];
        assert_eq!(uncat.median, dec!(401.50));
    }

    #[test]
    fn test_category_percentages_per_month() {
        let pct = get_category_percentages(&get_category_monthly(&ledger()));
        assert_eq!(pct["2024-01"]["Utilities"], dec!(61.51));
        assert_eq!(pct["2024-01"]["Groceries"], dec!(38.49));
        assert_eq!(pct["2024-02"]["Uncategorized"], dec!(93.05));
        assert_eq!(pct["2024-02"]["Groceries"], dec!(6.95));
        assert!(!pct["2024-01"].contains_key("Income"));
    }

    #[test]
    fn test_top_merchants_by_category() {
        let mut txns = ledger();
        let mut repeat = txn(8, "2024-02-20", Source::CreditCard, "TRADER JOE'S #552", dec!(-25.00), Some(Category::Groceries));
        repeat.merchant = Some("TRADER JOES".into());
        txns.push(repeat);

        let top = get_top_merchants_by_category(&txns, 2);
        let groceries = &top["Groceries"];
        assert_eq!(groceries.len(), 2);
        assert_eq!(groceries[0].merchant, "TRADER JOES");
        assert_eq!(groceries[0].total, dec!(70.10));
        assert_eq!(groceries[0].count, 2);
        assert_eq!(groceries[1].merchant, "SAFEWAY");
        assert_eq!(top["Utilities"][0].merchant, "CON ED");
        assert!(!top.contains_key("Income"));
    }

    #[test]
    fn test_income_groups_unmapped_as_other() {
        let sources = vec![Mapping {
            pattern: "payroll".into(),
            label: "Acme".into(),
        }];
        let income = get_income(&ledger(), &sources);
        assert_eq!(income.months["2024-01"]["Acme"], dec!(3000.00));
        assert_eq!(income.months["2024-02"][OTHER_PAYER], dec!(250.00));
        assert_eq!(income.total, dec!(3250.00));
    }

    #[test]
    fn test_large_uncategorized() {
        let large = get_large_uncategorized(&ledger(), dec!(100));
        let ids: Vec<TxnId> = large.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![TxnId(4), TxnId(5)]);
    }

    #[test]
    fn test_summary_counts() {
        let load = LoadResult {
            transactions: ledger(),
            inputs: Vec::new(),
            issues: vec![LoadIssue {
                file: "td_bank/a.csv".into(),
                line: 4,
                reason: "invalid amount".into(),
            }],
        };
        let summary = get_summary(&load);
        assert_eq!(summary.transaction_count, 8);
        assert_eq!(summary.per_account["bank"], 5);
        assert_eq!(summary.per_account["credit_card"], 3);
        assert_eq!(summary.uncategorized, 3);
        assert_eq!(summary.skipped_rows, 1);
        assert_eq!(summary.first_date, NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(summary.last_date, NaiveDate::from_ymd_opt(2024, 2, 15));
    }
}
