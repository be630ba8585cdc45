use chrono::Duration;
use rust_decimal::Decimal;
use rust_decimal::prelude::dec;
use serde::Serialize;

use crate::models::{Transaction, TxnRef};

/// Two transactions from different feeds that look like the same movement
/// of money. Reported only; both stay in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateCandidate {
    pub first: TxnRef,
    pub second: TxnRef,
    pub amount: Decimal,
    pub hours_apart: Decimal,
}

/// Flags pairs with exactly equal amounts, from different feeds, whose
/// timestamps are at most `window_hours` apart (inclusive). Rows without a
/// time of day count as midnight. A window too large for `Duration`
/// saturates instead of overflowing.
pub fn find_duplicates(txns: &[Transaction], window_hours: i64) -> Vec<DuplicateCandidate> {
    let window = Duration::try_hours(window_hours).unwrap_or(Duration::MAX);
    let mut by_time: Vec<&Transaction> = txns.iter().collect();
    by_time.sort_by_key(|t| (t.timestamp(), t.id));

    let mut found = Vec::new();
    for (i, a) in by_time.iter().enumerate() {
        for b in &by_time[i + 1..] {
            let gap = b.timestamp() - a.timestamp();
            if gap > window {
                break;
            }
            if a.account == b.account || a.amount != b.amount {
                continue;
            }
            let (first, second) = if a.id < b.id { (a, b) } else { (b, a) };
            found.push(DuplicateCandidate {
                first: TxnRef::from(*first),
                second: TxnRef::from(*second),
                amount: a.amount,
                hours_apart: (Decimal::from(gap.num_seconds()) / dec!(3600)).round_dp(2),
            });
        }
    }
    found.sort_by_key(|d| (d.first.id, d.second.id));

    if !found.is_empty() {
        tracing::info!(count = found.len(), "possible duplicates across feeds");
    }
    found
}
