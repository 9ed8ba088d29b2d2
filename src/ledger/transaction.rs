use rand::RngCore;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

/// Fixed set of transaction tags: four income-side, twelve expense-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Salary,
    Freelance,
    Investments,
    OtherIncome,
    Rent,
    Groceries,
    Utilities,
    Entertainment,
    Transportation,
    Dining,
    Shopping,
    Healthcare,
    Education,
    Travel,
    Personal,
    OtherExpense,
}

impl Category {
    /// Which side of the ledger this category belongs to.
    pub fn kind(&self) -> TransactionType {
        match self {
            Category::Salary
            | Category::Freelance
            | Category::Investments
            | Category::OtherIncome => TransactionType::Income,
            _ => TransactionType::Expense,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Category,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub description: String,
}

/// Caller-supplied fields of a new transaction. The ledger assigns the id and
/// the owning user.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionDraft {
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Category,
    pub amount: f64,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub description: String,
}

/// Collision-resistant id: creation time in millis plus a random hex suffix.
pub(super) fn generate_transaction_id(now: OffsetDateTime) -> String {
    let mut suffix = [0u8; 5];
    rand::thread_rng().fill_bytes(&mut suffix);
    let millis = now.unix_timestamp_nanos() / 1_000_000;
    format!("txn-{millis}-{}", hex::encode(suffix))
}
