use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Kind of institution a feed comes from. Declaration order is the
/// secondary sort key of the loaded ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Bank,
    CreditCard,
    PaymentApp,
    InvestmentTransfer,
}

impl Source {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Bank => "bank",
            Self::CreditCard => "credit_card",
            Self::PaymentApp => "payment_app",
            Self::InvestmentTransfer => "investment_transfer",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Rent,
    Utilities,
    #[serde(rename = "Dining Out")]
    DiningOut,
    Groceries,
    Transit,
    Taxi,
    Shopping,
    Subscriptions,
    Home,
    Income,
    Transfer,
    Uncategorized,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rent => "Rent",
            Self::Utilities => "Utilities",
            Self::DiningOut => "Dining Out",
            Self::Groceries => "Groceries",
            Self::Transit => "Transit",
            Self::Taxi => "Taxi",
            Self::Shopping => "Shopping",
            Self::Subscriptions => "Subscriptions",
            Self::Home => "Home",
            Self::Income => "Income",
            Self::Transfer => "Transfer",
            Self::Uncategorized => "Uncategorized",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of a transaction in the loaded ledger's stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnId(pub usize);

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: TxnId,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub amount: Decimal,
    pub description: String,
    pub merchant: Option<String>,
    /// Category as printed on the statement, if the export carries one.
    pub category_hint: Option<String>,
    pub source: Source,
    pub account: String,
    pub category: Option<Category>,
}

impl Transaction {
    pub fn timestamp(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or_default())
    }

    pub fn is_outflow(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    pub fn category_or_default(&self) -> Category {
        self.category.unwrap_or(Category::Uncategorized)
    }
}

/// Intermediate representation from a feed parser before ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub amount: Decimal,
    pub description: String,
    pub merchant: Option<String>,
    pub category_hint: Option<String>,
}

/// Compact, serializable pointer to a ledger row used inside reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxnRef {
    pub id: TxnId,
    pub date: NaiveDate,
    pub account: String,
    pub description: String,
    pub amount: Decimal,
}

impl From<&Transaction> for TxnRef {
    fn from(txn: &Transaction) -> Self {
        Self {
            id: txn.id,
            date: txn.date,
            account: txn.account.clone(),
            description: txn.description.clone(),
            amount: txn.amount,
        }
    }
}
