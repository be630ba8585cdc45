use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::dec;
use serde::{Deserialize, Serialize};

use crate::error::{ReckonError, Result};
use crate::models::{Category, Source, Transaction, TxnId, TxnRef};
use crate::settings::{lookup_mapping, Mapping};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Differences strictly below this are a MATCH.
    pub match_below: Decimal,
    /// Differences strictly below this (and not a MATCH) need REVIEW.
    pub review_below: Decimal,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            match_below: dec!(1),
            review_below: dec!(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Match,
    Review,
    Mismatch,
}

impl Status {
    pub fn classify(difference: Decimal, thresholds: &Thresholds) -> Self {
        let d = difference.abs();
        if d < thresholds.match_below {
            Self::Match
        } else if d < thresholds.review_below {
            Self::Review
        } else {
            Self::Mismatch
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Match => "MATCH",
            Self::Review => "REVIEW",
            Self::Mismatch => "MISMATCH",
        }
    }
}

// ---------------------------------------------------------------------------
// Family configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FamilyKind {
    CreditCard,
    PaymentApp,
    Rent,
}

impl FamilyKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::CreditCard => "credit_card",
            Self::PaymentApp => "payment_app",
            Self::Rent => "rent",
        }
    }

    pub fn default_lookback_days(&self) -> i64 {
        match self {
            Self::CreditCard => 45,
            Self::PaymentApp => 7,
            Self::Rent => 31,
        }
    }
}

/// Selects the spending side of a family. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterpartFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl CounterpartFilter {
    fn matches(&self, txn: &Transaction) -> bool {
        self.account.as_deref().map_or(true, |a| a == txn.account)
            && self.source.map_or(true, |s| s == txn.source)
            && self.category.map_or(true, |c| txn.category == Some(c))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyConfig {
    pub name: String,
    pub kind: FamilyKind,
    /// Feed whose outflows are the settlements.
    pub settlement_account: String,
    /// Case-insensitive substrings identifying settlement payees. Rent
    /// families also match every configured rent property.
    #[serde(default)]
    pub payee_patterns: Vec<String>,
    #[serde(default)]
    pub counterpart: CounterpartFilter,
    #[serde(default)]
    pub lookback_days: Option<i64>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

impl FamilyConfig {
    pub fn lookback_days(&self) -> i64 {
        self.lookback_days
            .unwrap_or_else(|| self.kind.default_lookback_days())
    }

    /// Label for a settlement, or `None` if the transaction is not one.
    fn settlement_label(&self, txn: &Transaction, rent_properties: &[Mapping]) -> Option<String> {
        if txn.account != self.settlement_account || !txn.is_outflow() {
            return None;
        }
        let desc = txn.description.to_lowercase();
        let payee_hit = self
            .payee_patterns
            .iter()
            .any(|p| desc.contains(&p.to_lowercase()));
        let property = match self.kind {
            FamilyKind::Rent => lookup_mapping(rent_properties, &txn.description),
            _ => None,
        };
        match (payee_hit, property) {
            (_, Some(property)) => Some(property.to_string()),
            (true, None) => Some(self.name.clone()),
            (false, None) => None,
        }
    }
}

fn slug(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciliationPair {
    pub match_id: String,
    pub family: String,
    pub label: String,
    pub settlement: TxnRef,
    pub covered: Vec<TxnId>,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub expected: Decimal,
    pub actual: Decimal,
    pub difference: Decimal,
    pub match_pct: Decimal,
    pub status: Status,
    /// No spending fell in the window; the whole payment is unexplained.
    pub empty_window: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UncoveredSpending {
    #[serde(flatten)]
    pub txn: TxnRef,
    /// Dated on or after the family's latest settlement, so a future
    /// payment may still cover it.
    pub awaiting_settlement: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub matched: usize,
    pub review: usize,
    pub mismatch: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyReport {
    pub name: String,
    pub kind: FamilyKind,
    pub lookback_days: i64,
    pub pairs: Vec<ReconciliationPair>,
    pub uncovered: Vec<UncoveredSpending>,
    pub status_counts: StatusCounts,
    pub total_actual: Decimal,
    pub total_expected: Decimal,
}

impl FamilyReport {
    pub fn uncovered_total(&self) -> Decimal {
        self.uncovered.iter().map(|u| u.txn.amount.abs()).sum()
    }
}

fn match_pct(actual: Decimal, expected: Decimal) -> Decimal {
    let high = actual.max(expected);
    if high > Decimal::ZERO {
        (actual.min(expected) / high * dec!(100)).round_dp(2)
    } else {
        Decimal::ZERO
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Claims every unclaimed spending transaction dated inside
/// `[start, end]`, returning the claimed ids and their total magnitude.
fn claim_window(
    spending: &[&Transaction],
    start: NaiveDate,
    end: NaiveDate,
    claimed: &mut BTreeSet<TxnId>,
) -> (Vec<TxnId>, Decimal) {
    let mut covered = Vec::new();
    let mut total = Decimal::ZERO;
    for txn in spending {
        if txn.date < start || txn.date > end {
            continue;
        }
        if claimed.insert(txn.id) {
            covered.push(txn.id);
            total += txn.amount.abs();
        }
    }
    (covered, total)
}

/// Settlement window `[date - lookback, date - 1 day]`, or `None` when it
/// falls outside the representable calendar.
fn settlement_window(date: NaiveDate, lookback: i64) -> Option<(NaiveDate, NaiveDate)> {
    let start = date.checked_sub_signed(Duration::try_days(lookback)?)?;
    let end = date.pred_opt()?;
    Some((start, end))
}

/// Runs one reconciliation pass for a family. Settlements are processed in
/// ledger order (date, then load order), so an earlier settlement always
/// claims overlapping spending first.
///
/// `claimed` is shared across families: anything already in it (claimed as
/// spending or used as a settlement by an earlier family) is invisible to
/// this pass, and everything this pass claims or settles with is added.
pub fn reconcile_family(
    family: &FamilyConfig,
    txns: &[Transaction],
    rent_properties: &[Mapping],
    thresholds: &Thresholds,
    claimed: &mut BTreeSet<TxnId>,
) -> Result<FamilyReport> {
    let lookback = family.lookback_days();
    let mut settlements: Vec<(&Transaction, String)> = txns
        .iter()
        .filter(|t| !claimed.contains(&t.id))
        .filter_map(|t| family.settlement_label(t, rent_properties).map(|label| (t, label)))
        .collect();
    settlements.sort_by_key(|(t, _)| (t.date, t.id));
    let settlement_ids: BTreeSet<TxnId> = settlements.iter().map(|(t, _)| t.id).collect();

    let spending: Vec<&Transaction> = txns
        .iter()
        .filter(|t| {
            t.is_outflow()
                && family.counterpart.matches(t)
                && !settlement_ids.contains(&t.id)
                && !claimed.contains(&t.id)
        })
        .collect();
    claimed.extend(settlement_ids.iter().copied());

    let prefix = slug(&family.name);
    let mut pairs = Vec::with_capacity(settlements.len());
    let mut counts = StatusCounts::default();

    for (seq, (settlement, label)) in settlements.iter().enumerate() {
        let (window_start, window_end) =
            settlement_window(settlement.date, lookback).ok_or_else(|| {
                ReckonError::Config(format!(
                    "family '{}': {lookback}-day lookback from {} is out of range",
                    family.name, settlement.date
                ))
            })?;
        let (covered, expected) = claim_window(&spending, window_start, window_end, claimed);
        let actual = settlement.amount.abs();
        let difference = (actual - expected).abs();
        let status = Status::classify(difference, thresholds);
        match status {
            Status::Match => counts.matched += 1,
            Status::Review => counts.review += 1,
            Status::Mismatch => counts.mismatch += 1,
        }

        tracing::debug!(
            family = %family.name,
            settlement = %settlement.id,
            covered = covered.len(),
            %expected,
            %actual,
            "claimed window"
        );

        pairs.push(ReconciliationPair {
            match_id: format!("{prefix}-{:03}", seq + 1),
            family: family.name.clone(),
            label: label.clone(),
            settlement: TxnRef::from(*settlement),
            empty_window: covered.is_empty(),
            covered,
            window_start,
            window_end,
            expected,
            actual,
            difference,
            match_pct: match_pct(actual, expected),
            status,
        });
    }

    let last_settlement = settlements.last().map(|(t, _)| t.date);
    let uncovered: Vec<UncoveredSpending> = spending
        .iter()
        .filter(|t| !claimed.contains(&t.id))
        .map(|t| UncoveredSpending {
            txn: TxnRef::from(*t),
            awaiting_settlement: last_settlement.map_or(true, |d| t.date >= d),
        })
        .collect();

    let total_actual: Decimal = pairs.iter().map(|p| p.actual).sum();
    let total_expected: Decimal = pairs.iter().map(|p| p.expected).sum();

    tracing::info!(
        family = %family.name,
        settlements = pairs.len(),
        uncovered = uncovered.len(),
        "reconciled family"
    );

    Ok(FamilyReport {
        name: family.name.clone(),
        kind: family.kind,
        lookback_days: lookback,
        pairs,
        uncovered,
        status_counts: counts,
        total_actual,
        total_expected,
    })
}

/// Reconciles every configured family, in configured order, against one
/// shared claimed set: a transaction belongs to at most one family. A
/// required family missing either side is fatal; an optional one is skipped.
pub fn reconcile_all(
    families: &[FamilyConfig],
    txns: &[Transaction],
    rent_properties: &[Mapping],
    thresholds: &Thresholds,
) -> Result<Vec<FamilyReport>> {
    let mut reports = Vec::with_capacity(families.len());
    let mut claimed: BTreeSet<TxnId> = BTreeSet::new();
    for family in families {
        let has_settlement_side = txns.iter().any(|t| t.account == family.settlement_account);
        let has_counterpart_side = txns.iter().any(|t| family.counterpart.matches(t));
        let missing = match (has_settlement_side, has_counterpart_side) {
            (true, true) => None,
            (false, _) => Some("settlement"),
            (true, false) => Some("spending"),
        };
        if let Some(side) = missing {
            if family.required {
                return Err(ReckonError::EmptyInput(format!(
                    "{side} side of family '{}'",
                    family.name
                )));
            }
            tracing::warn!(family = %family.name, "skipping family: no {side} transactions");
            continue;
        }
        reports.push(reconcile_family(family, txns, rent_properties, thresholds, &mut claimed)?);
    }
    Ok(reports)
}

/// Finds the family report with the given name, case-insensitively.
pub fn find_family<'a>(reports: &'a [FamilyReport], name: &str) -> Result<&'a FamilyReport> {
    reports
        .iter()
        .find(|r| r.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ReckonError::UnknownFamily(name.to_string()))
}
