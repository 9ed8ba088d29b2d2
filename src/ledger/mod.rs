//! Per-user transaction ledger: an ordered in-memory collection with
//! aggregation queries, persisted whole to a durable per-user slot after
//! every mutation.
//!
//! The ledger follows the client's single-threaded model: all operations are
//! synchronous, and it holds transactions for at most one signed-in user at a
//! time.

use serde::Serialize;
use time::{Date, Month, OffsetDateTime};
use tracing::warn;
use uuid::Uuid;

mod store;
mod transaction;

pub use store::{JsonFileLedgerStore, LedgerStore, MemoryLedgerStore};
pub use transaction::{Category, Transaction, TransactionDraft, TransactionType};

use transaction::generate_transaction_id;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("no user is signed in")]
    NotSignedIn,

    #[error("transaction amount must be non-negative")]
    NegativeAmount,
}

/// Sum of one category's transactions, in order of first appearance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub amount: f64,
}

/// One bucket of the six-month series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub month: String,
    pub income: f64,
    pub expense: f64,
}

pub struct Ledger<S: LedgerStore> {
    store: S,
    user_id: Option<Uuid>,
    transactions: Vec<Transaction>,
    year_aware_buckets: bool,
}

impl<S: LedgerStore> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            user_id: None,
            transactions: Vec::new(),
            year_aware_buckets: false,
        }
    }

    /// Bucket the monthly series by (year, month) instead of month label.
    ///
    /// Historically buckets were keyed by short month name only, so a
    /// transaction from thirteen months ago lands in the same bucket as one
    /// from last month. That behavior is kept as the default; enable this
    /// flag to exclude out-of-window transactions properly.
    pub fn with_year_aware_buckets(mut self, enabled: bool) -> Self {
        self.year_aware_buckets = enabled;
        self
    }

    /// Switch the ledger to `user_id` and load their slot. Unreadable or
    /// malformed stored data is logged and treated as an empty ledger.
    pub fn sign_in(&mut self, user_id: Uuid) {
        self.user_id = Some(user_id);
        self.transactions = match self.store.load(user_id) {
            Ok(Some(transactions)) => transactions,
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "failed to load transactions; starting empty");
                Vec::new()
            }
        };
    }

    pub fn sign_out(&mut self) {
        self.user_id = None;
        self.transactions.clear();
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Record a transaction: assign an id and the current owner, prepend
    /// (most-recent-first), and persist the full set.
    pub fn add(&mut self, draft: TransactionDraft) -> Result<&Transaction, LedgerError> {
        let user_id = self.user_id.ok_or(LedgerError::NotSignedIn)?;
        if draft.amount < 0.0 {
            return Err(LedgerError::NegativeAmount);
        }

        let transaction = Transaction {
            id: generate_transaction_id(OffsetDateTime::now_utc()),
            user_id,
            kind: draft.kind,
            category: draft.category,
            amount: draft.amount,
            date: draft.date,
            description: draft.description,
        };
        self.transactions.insert(0, transaction);
        self.persist();
        Ok(&self.transactions[0])
    }

    /// Remove the transaction with `id`. Silently a no-op when absent.
    pub fn delete(&mut self, id: &str) {
        let before = self.transactions.len();
        self.transactions.retain(|t| t.id != id);
        if self.transactions.len() != before {
            self.persist();
        }
    }

    /// Per-category sums for one side of the ledger, ordered by first
    /// appearance in the transaction sequence (not sorted).
    pub fn category_totals(&self, kind: TransactionType) -> Vec<CategoryTotal> {
        let mut totals: Vec<CategoryTotal> = Vec::new();
        for transaction in self.transactions.iter().filter(|t| t.kind == kind) {
            match totals.iter_mut().find(|c| c.category == transaction.category) {
                Some(entry) => entry.amount += transaction.amount,
                None => totals.push(CategoryTotal {
                    category: transaction.category,
                    amount: transaction.amount,
                }),
            }
        }
        totals
    }

    /// Income/expense sums over the six calendar months ending today.
    pub fn monthly_data(&self) -> Vec<MonthlySummary> {
        self.monthly_data_at(OffsetDateTime::now_utc().date())
    }

    /// Like [`Self::monthly_data`], with an explicit "today" for testing.
    /// Always returns exactly six buckets, oldest first.
    pub fn monthly_data_at(&self, today: Date) -> Vec<MonthlySummary> {
        let window: Vec<(i32, Month)> = (0..6u8).rev().map(|i| months_back(today, i)).collect();
        let mut summaries: Vec<MonthlySummary> = window
            .iter()
            .map(|&(_, month)| MonthlySummary {
                month: month_label(month).to_string(),
                income: 0.0,
                expense: 0.0,
            })
            .collect();

        for transaction in &self.transactions {
            let date = transaction.date.date();
            let position = if self.year_aware_buckets {
                window
                    .iter()
                    .position(|&(year, month)| year == date.year() && month == date.month())
            } else {
                // Label-only match: months sharing a short name collide
                // across years. See `with_year_aware_buckets`.
                window.iter().position(|&(_, month)| month == date.month())
            };
            let Some(index) = position else {
                continue;
            };
            match transaction.kind {
                TransactionType::Income => summaries[index].income += transaction.amount,
                TransactionType::Expense => summaries[index].expense += transaction.amount,
            }
        }

        summaries
    }

    pub fn total_income(&self) -> f64 {
        self.transactions
            .iter()
            .filter(|t| t.kind == TransactionType::Income)
            .map(|t| t.amount)
            .sum()
    }

    pub fn total_expenses(&self) -> f64 {
        self.transactions
            .iter()
            .filter(|t| t.kind == TransactionType::Expense)
            .map(|t| t.amount)
            .sum()
    }

    pub fn balance(&self) -> f64 {
        self.total_income() - self.total_expenses()
    }

    /// Overwrite the signed-in user's slot. Failures are logged, never
    /// surfaced; the in-memory ledger stays authoritative for the session.
    fn persist(&self) {
        let Some(user_id) = self.user_id else {
            return;
        };
        if let Err(e) = self.store.save(user_id, &self.transactions) {
            warn!(user_id = %user_id, error = %e, "failed to save transactions");
        }
    }
}

fn month_label(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

fn months_back(today: Date, back: u8) -> (i32, Month) {
    let mut year = today.year();
    let mut month = today.month();
    for _ in 0..back {
        if month == Month::January {
            year -= 1;
        }
        month = month.previous();
    }
    (year, month)
}
