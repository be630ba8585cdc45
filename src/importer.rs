use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{ReckonError, Result};
use crate::models::{ParsedRow, Source, Transaction, TxnId};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parses statement amounts: `$`, thousands separators, quotes, spaced signs
/// (`- $12.00`) and parenthesized negatives. Blank or garbage is `None`.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    let s: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '"' | '$') && !c.is_whitespace())
        .collect();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return Decimal::from_str(inner).ok().map(|d| -d);
    }
    let s = s.strip_prefix('+').unwrap_or(&s);
    Decimal::from_str(s).ok()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
        .or_else(|| parse_datetime(raw).map(|dt| dt.date()))
}

pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    ["%H:%M:%S", "%H:%M", "%I:%M %p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

fn compute_checksum(file_path: &Path) -> Result<String> {
    let data = std::fs::read(file_path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(hex::encode(hasher.finalize()))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Header name (trimmed, lowercase) to column index.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_header(record: &StringRecord) -> Self {
        let index = record
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}').to_lowercase(), i))
            .collect();
        Self { index }
    }

    fn has(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_lowercase())
    }

    fn require(&self, file: &Path, names: &[&str]) -> Result<()> {
        let missing: Vec<&str> = names.iter().copied().filter(|n| !self.has(n)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ReckonError::DataFormat {
                file: file.to_path_buf(),
                reason: format!("missing required columns: {}", missing.join(", ")),
            })
        }
    }

    fn get<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.index
            .get(&name.to_lowercase())
            .and_then(|&i| record.get(i))
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Feed formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedFormat {
    Normalized,
    TdBank,
    AppleCard,
    Robinhood,
    Venmo,
}

impl FeedFormat {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Normalized => "normalized",
            Self::TdBank => "td_bank",
            Self::AppleCard => "apple_card",
            Self::Robinhood => "robinhood",
            Self::Venmo => "venmo",
        }
    }

    fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Normalized => &["date", "amount", "description"],
            Self::TdBank => &["Date", "Description", "Debit", "Credit"],
            Self::AppleCard => &["Transaction Date", "Description", "Amount (USD)"],
            Self::Robinhood => &["Date", "Amount"],
            Self::Venmo => &["ID", "Datetime", "Amount (total)"],
        }
    }

    /// Venmo statements open with account preamble lines; every other
    /// format has its header on the first record.
    fn is_header(&self, record: &StringRecord) -> bool {
        match self {
            Self::Venmo => {
                let cols = Columns::from_header(record);
                cols.has("ID") && cols.has("Datetime")
            }
            _ => true,
        }
    }

    /// `Ok(None)` means the record is not a transaction (disclaimer lines).
    fn parse_record(&self, cols: &Columns, record: &StringRecord) -> std::result::Result<Option<ParsedRow>, String> {
        match self {
            Self::Normalized => parse_normalized(cols, record).map(Some),
            Self::TdBank => parse_td_bank(cols, record).map(Some),
            Self::AppleCard => parse_apple_card(cols, record).map(Some),
            Self::Robinhood => parse_robinhood(cols, record).map(Some),
            Self::Venmo => parse_venmo(cols, record),
        }
    }

    pub fn parse(&self, file_path: &Path) -> Result<ParsedFile> {
        let file = std::fs::File::open(file_path)?;
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(std::io::BufReader::new(file));

        let mut columns: Option<Columns> = None;
        let mut parsed = ParsedFile::default();

        for result in rdr.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            if record.iter().all(|f| f.trim().is_empty()) {
                continue;
            }
            if columns.is_none() {
                if self.is_header(&record) {
                    let cols = Columns::from_header(&record);
                    cols.require(file_path, self.required_columns())?;
                    columns = Some(cols);
                }
                continue;
            }
            let Some(cols) = columns.as_ref() else { continue };
            match self.parse_record(cols, &record) {
                Ok(Some(row)) => parsed.rows.push(row),
                Ok(None) => {}
                Err(reason) => parsed.issues.push(RowIssue { line, reason }),
            }
        }

        if columns.is_none() {
            return Err(ReckonError::DataFormat {
                file: file_path.to_path_buf(),
                reason: format!(
                    "no header row with columns: {}",
                    self.required_columns().join(", ")
                ),
            });
        }
        Ok(parsed)
    }
}

#[derive(Debug, Default)]
pub struct ParsedFile {
    pub rows: Vec<ParsedRow>,
    pub issues: Vec<RowIssue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowIssue {
    pub line: u64,
    pub reason: String,
}

fn require_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(raw).ok_or_else(|| format!("unparseable date '{}'", raw.trim()))
}

fn require_amount(raw: &str) -> std::result::Result<Decimal, String> {
    parse_amount(raw).ok_or_else(|| format!("unparseable amount '{}'", raw.trim()))
}

fn parse_normalized(cols: &Columns, r: &StringRecord) -> std::result::Result<ParsedRow, String> {
    let raw_date = cols.get(r, "date");
    let date = require_date(raw_date)?;
    let time = match non_empty(cols.get(r, "time")) {
        Some(t) => Some(parse_time(&t).ok_or_else(|| format!("unparseable time '{t}'"))?),
        None => parse_datetime(raw_date).map(|dt| dt.time()),
    };
    Ok(ParsedRow {
        date,
        time,
        amount: require_amount(cols.get(r, "amount"))?,
        description: cols.get(r, "description").trim().to_string(),
        merchant: non_empty(cols.get(r, "merchant")),
        category_hint: non_empty(cols.get(r, "category")),
    })
}

fn parse_td_bank(cols: &Columns, r: &StringRecord) -> std::result::Result<ParsedRow, String> {
    let date = require_date(cols.get(r, "Date"))?;
    let debit = non_empty(cols.get(r, "Debit"));
    let credit = non_empty(cols.get(r, "Credit"));
    if debit.is_none() && credit.is_none() {
        return Err("no debit or credit amount".to_string());
    }
    let debit = debit.as_deref().map(require_amount).transpose()?.unwrap_or_default();
    let credit = credit.as_deref().map(require_amount).transpose()?.unwrap_or_default();
    Ok(ParsedRow {
        date,
        time: None,
        amount: credit.abs() - debit.abs(),
        description: cols.get(r, "Description").trim().to_string(),
        merchant: None,
        category_hint: non_empty(cols.get(r, "Transaction Type")),
    })
}

fn parse_apple_card(cols: &Columns, r: &StringRecord) -> std::result::Result<ParsedRow, String> {
    Ok(ParsedRow {
        date: require_date(cols.get(r, "Transaction Date"))?,
        time: None,
        // Purchases are positive in the export.
        amount: -require_amount(cols.get(r, "Amount (USD)"))?,
        description: cols.get(r, "Description").trim().to_string(),
        merchant: non_empty(cols.get(r, "Merchant")),
        category_hint: non_empty(cols.get(r, "Category")),
    })
}

fn parse_robinhood(cols: &Columns, r: &StringRecord) -> std::result::Result<ParsedRow, String> {
    let date = require_date(cols.get(r, "Date"))?;
    let time = match non_empty(cols.get(r, "Time")) {
        Some(t) => Some(parse_time(&t).ok_or_else(|| format!("unparseable time '{t}'"))?),
        None => None,
    };
    let merchant = non_empty(cols.get(r, "Merchant"));
    let description = non_empty(cols.get(r, "Description"))
        .or_else(|| merchant.clone())
        .unwrap_or_default();
    Ok(ParsedRow {
        date,
        time,
        amount: -require_amount(cols.get(r, "Amount"))?,
        description,
        merchant,
        category_hint: non_empty(cols.get(r, "Type")),
    })
}

fn parse_venmo(cols: &Columns, r: &StringRecord) -> std::result::Result<Option<ParsedRow>, String> {
    let id = cols.get(r, "ID").trim();
    if !id.starts_with(|c: char| c.is_ascii_digit()) {
        return Ok(None);
    }
    let raw = cols.get(r, "Datetime");
    let dt = parse_datetime(raw).ok_or_else(|| format!("unparseable datetime '{}'", raw.trim()))?;
    let kind = non_empty(cols.get(r, "Type"));
    let description = non_empty(cols.get(r, "Note"))
        .or_else(|| kind.clone())
        .unwrap_or_default();
    let merchant = match (non_empty(cols.get(r, "From")), non_empty(cols.get(r, "To"))) {
        (Some(from), Some(to)) => Some(format!("{from} \u{2192} {to}")),
        _ => None,
    };
    Ok(Some(ParsedRow {
        date: dt.date(),
        time: Some(dt.time()),
        amount: require_amount(cols.get(r, "Amount (total)"))?,
        description,
        merchant,
        category_hint: kind,
    }))
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub name: String,
    pub source: Source,
    pub format: FeedFormat,
    /// A required feed with no transactions aborts the run.
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputFile {
    pub path: String,
    pub sha256: String,
    pub rows: usize,
}

/// A row excluded from the ledger because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadIssue {
    pub file: String,
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadResult {
    pub transactions: Vec<Transaction>,
    pub inputs: Vec<InputFile>,
    pub issues: Vec<LoadIssue>,
}

fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Reads every feed under `raw_dir/<feed>/` into one ledger ordered by
/// date, then source, then row order within each file.
pub fn load_transactions(raw_dir: &Path, feeds: &[FeedConfig]) -> Result<LoadResult> {
    let mut staged: Vec<Transaction> = Vec::new();
    let mut inputs = Vec::new();
    let mut issues = Vec::new();

    for feed in feeds {
        let files = list_csv_files(&raw_dir.join(&feed.name))?;
        let mut feed_rows = 0usize;

        for path in &files {
            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            let rel = format!("{}/{file_name}", feed.name);
            let sha256 = compute_checksum(path)?;
            let parsed = feed.format.parse(path)?;

            for issue in parsed.issues {
                tracing::warn!(file = %rel, line = issue.line, "excluded row: {}", issue.reason);
                issues.push(LoadIssue {
                    file: rel.clone(),
                    line: issue.line,
                    reason: issue.reason,
                });
            }
            inputs.push(InputFile {
                path: rel,
                sha256,
                rows: parsed.rows.len(),
            });
            feed_rows += parsed.rows.len();

            let base = staged.len();
            staged.extend(parsed.rows.into_iter().enumerate().map(|(i, row)| Transaction {
                // Provisional: load sequence, replaced after sorting.
                id: TxnId(base + i),
                date: row.date,
                time: row.time,
                amount: row.amount,
                description: row.description,
                merchant: row.merchant,
                category_hint: row.category_hint,
                source: feed.source,
                account: feed.name.clone(),
                category: None,
            }));
        }

        tracing::info!(feed = %feed.name, files = files.len(), transactions = feed_rows, "loaded feed");
        if feed.required && feed_rows == 0 {
            return Err(ReckonError::EmptyInput(format!("required feed '{}'", feed.name)));
        }
    }

    staged.sort_by_key(|t| (t.date, t.source, t.id));
    for (i, txn) in staged.iter_mut().enumerate() {
        txn.id = TxnId(i);
    }

    Ok(LoadResult {
        transactions: staged,
        inputs,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::dec;

    fn write(dir: &Path, rel: &str, content: &str) -> PathBuf {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    fn feed(name: &str, source: Source, format: FeedFormat) -> FeedConfig {
        FeedConfig {
            name: name.to_string(),
            source,
            format,
            required: false,
        }
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(dec!(1234.56)));
        assert_eq!(parse_amount("\"500.00\""), Some(dec!(500.00)));
        assert_eq!(parse_amount("  -42.50  "), Some(dec!(-42.50)));
        assert_eq!(parse_amount("0"), Some(Decimal::ZERO));
        assert_eq!(parse_amount("not_a_number"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_parse_amount_signs_and_parentheses() {
        assert_eq!(parse_amount("(1,234.56)"), Some(dec!(-1234.56)));
        assert_eq!(parse_amount("- $12.00"), Some(dec!(-12.00)));
        assert_eq!(parse_amount("+ $50.00"), Some(dec!(50.00)));
        assert_eq!(parse_amount("-$50.00"), Some(dec!(-50.00)));
    }

    #[test]
    fn test_parse_amount_keeps_cents_exact() {
        let total: Decimal = ["0.10", "0.20"].iter().filter_map(|s| parse_amount(s)).sum();
        assert_eq!(total, dec!(0.30));
    }

    #[test]
    fn test_parse_date_formats() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(parse_date("01/15/2025"), Some(d));
        assert_eq!(parse_date("2025-01-15"), Some(d));
        assert_eq!(parse_date("2025-01-15T09:30:00"), Some(d));
        assert_eq!(parse_date("13/01/2025"), None);
        assert_eq!(parse_date("02/30/2025"), None);
        assert_eq!(parse_date("01/15"), None);
    }

    #[test]
    fn test_parse_time_formats() {
        assert_eq!(parse_time("3:45 PM"), NaiveTime::from_hms_opt(15, 45, 0));
        assert_eq!(parse_time("09:05"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(parse_time("noon"), None);
    }

    #[test]
    fn test_normalized_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "n.csv",
            "date,amount,description,merchant,category\n\
             2025-01-15,-50.00,ADOBE CREATIVE,Adobe,Software\n\
             2025-01-17,2500.00,STRIPE PAYOUT,,\n",
        );
        let parsed = FeedFormat::Normalized.parse(&path).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].amount, dec!(-50.00));
        assert_eq!(parsed.rows[0].merchant.as_deref(), Some("Adobe"));
        assert_eq!(parsed.rows[0].category_hint.as_deref(), Some("Software"));
        assert_eq!(parsed.rows[1].merchant, None);
        assert!(parsed.issues.is_empty());
    }

    #[test]
    fn test_missing_required_column_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "n.csv", "date,description\n2025-01-15,COFFEE\n");
        let err = FeedFormat::Normalized.parse(&path).unwrap_err();
        match err {
            ReckonError::DataFormat { reason, .. } => assert!(reason.contains("amount")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_rows_are_recorded_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "n.csv",
            "date,amount,description\n\
             2025-01-15,-5.00,COFFEE\n\
             yesterday,-5.00,COFFEE\n\
             2025-01-16,five,COFFEE\n",
        );
        let parsed = FeedFormat::Normalized.parse(&path).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.issues.len(), 2);
        assert_eq!(parsed.issues[0].line, 3);
        assert!(parsed.issues[0].reason.contains("date"));
        assert!(parsed.issues[1].reason.contains("amount"));
    }

    #[test]
    fn test_td_bank_debit_credit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "td.csv",
            "Date,Transaction Type,Description,Debit,Credit\n\
             03/15/2024,DEBIT,APPLECARD GSBANK PAYMENT,523.17,\n\
             03/16/2024,CREDIT,ACME PAYROLL,,\"2,000.00\"\n",
        );
        let parsed = FeedFormat::TdBank.parse(&path).unwrap();
        assert_eq!(parsed.rows[0].amount, dec!(-523.17));
        assert_eq!(parsed.rows[1].amount, dec!(2000.00));
        assert_eq!(parsed.rows[1].category_hint.as_deref(), Some("CREDIT"));
    }

    #[test]
    fn test_apple_card_flips_sign() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "apple.csv",
            "Transaction Date,Clearing Date,Description,Merchant,Category,Type,Amount (USD),Purchased By\n\
             02/01/2024,02/02/2024,WHOLEFDS MKT 10234,Whole Foods,Grocery,Purchase,84.12,Me\n\
             02/10/2024,02/10/2024,ACH DEPOSIT INTERNET TRANSFER,Payment,Payment,Payment,-200.00,Me\n",
        );
        let parsed = FeedFormat::AppleCard.parse(&path).unwrap();
        assert_eq!(parsed.rows[0].amount, dec!(-84.12));
        assert_eq!(parsed.rows[0].category_hint.as_deref(), Some("Grocery"));
        assert_eq!(parsed.rows[1].amount, dec!(200.00));
    }

    #[test]
    fn test_robinhood_with_time() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "rh.csv",
            "Date,Time,Cardholder,Amount,Points,Balance,Status,Type,Merchant,Description\n\
             2024-02-03,3:45 PM,Me,12.50,25,100.00,Posted,Purchase,Lyft,\n",
        );
        let parsed = FeedFormat::Robinhood.parse(&path).unwrap();
        assert_eq!(parsed.rows[0].amount, dec!(-12.50));
        assert_eq!(parsed.rows[0].time, NaiveTime::from_hms_opt(15, 45, 0));
        assert_eq!(parsed.rows[0].description, "Lyft");
    }

    #[test]
    fn test_venmo_skips_preamble_and_disclaimer() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "venmo.csv",
            "Account Statement - (@me)\n\
             Account Activity\n\
             ,ID,Datetime,Type,Status,Note,From,To,Amount (total),Amount (fee)\n\
             ,,,,,,,,,\n\
             ,3912345678,2024-02-05T19:02:11,Payment,Complete,March rent,Me,Landlord,- $1500.00,0\n\
             ,3912345679,2024-02-06T08:00:00,Payment,Complete,Dinner,Friend,Me,+ $40.00,0\n\
             ,In case of errors or questions about your electronic transfers,,,,,,,,\n",
        );
        let parsed = FeedFormat::Venmo.parse(&path).unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].amount, dec!(-1500.00));
        assert_eq!(parsed.rows[0].description, "March rent");
        assert_eq!(parsed.rows[0].merchant.as_deref(), Some("Me \u{2192} Landlord"));
        assert_eq!(parsed.rows[0].time, NaiveTime::from_hms_opt(19, 2, 11));
        assert_eq!(parsed.rows[1].amount, dec!(40.00));
        assert!(parsed.issues.is_empty());
    }

    #[test]
    fn test_load_orders_by_date_source_then_row() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "bank/a.csv",
            "date,amount,description\n2024-03-02,-10.00,B1\n2024-03-01,-20.00,B2\n2024-03-02,-30.00,B3\n",
        );
        write(
            dir.path(),
            "card/a.csv",
            "date,amount,description\n2024-03-01,-1.00,C1\n",
        );
        // Feed order in settings must not override source order.
        let feeds = vec![
            feed("card", Source::CreditCard, FeedFormat::Normalized),
            feed("bank", Source::Bank, FeedFormat::Normalized),
        ];
        let result = load_transactions(dir.path(), &feeds).unwrap();
        let order: Vec<&str> = result.transactions.iter().map(|t| t.description.as_str()).collect();
        assert_eq!(order, vec!["B2", "C1", "B1", "B3"]);
        let ids: Vec<usize> = result.transactions.iter().map(|t| t.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(result.transactions[1].account, "card");
        assert_eq!(result.transactions[1].source, Source::CreditCard);
    }

    #[test]
    fn test_load_records_inputs_and_issues() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "bank/b.csv",
            "date,amount,description\n2024-03-02,-10.00,OK\n2024-13-02,-10.00,BAD\n",
        );
        write(dir.path(), "bank/a.csv", "date,amount,description\n2024-03-01,-5.00,FIRST\n");
        write(dir.path(), "bank/notes.txt", "ignored");
        let feeds = vec![feed("bank", Source::Bank, FeedFormat::Normalized)];
        let result = load_transactions(dir.path(), &feeds).unwrap();
        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.inputs.len(), 2);
        assert_eq!(result.inputs[0].path, "bank/a.csv");
        assert_eq!(result.inputs[0].sha256.len(), 64);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].file, "bank/b.csv");
    }

    #[test]
    fn test_required_feed_without_rows_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let mut bank = feed("bank", Source::Bank, FeedFormat::Normalized);
        bank.required = true;
        let err = load_transactions(dir.path(), &[bank]).unwrap_err();
        assert!(matches!(err, ReckonError::EmptyInput(_)));
    }

    #[test]
    fn test_optional_feed_may_be_absent() {
        let dir = tempfile::tempdir().unwrap();
        let feeds = vec![feed("venmo", Source::PaymentApp, FeedFormat::Venmo)];
        let result = load_transactions(dir.path(), &feeds).unwrap();
        assert!(result.transactions.is_empty());
    }
}
