//! Domain records exchanged with the repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: i64,
    #[serde(rename = "gid")]
    pub group_id: i64,
    pub email: String,
    pub fullname: String,
    /// Only populated by lookups that need to check a password.
    #[serde(skip)]
    pub passhash: String,
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub fullname: String,
    pub passhash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AccountSummary {
    pub balance: f64,
    pub income: f64,
    pub expense: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryType {
    Income,
    Expense,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CategoryType,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub group_id: i64,
    pub name: String,
    pub kind: CategoryType,
    pub emoji: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    #[serde(rename = "aid")]
    pub account_id: i64,
    #[serde(rename = "cid")]
    pub category_id: Option<Uuid>,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: i64,
    pub category_id: Option<Uuid>,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub note: String,
}

/// Whose transactions to list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    Account(i64),
    /// Every account in the group.
    Group(i64),
}

#[derive(Debug, Clone, Copy)]
pub struct TransactionFilter {
    pub owner: Owner,
    pub category_id: Option<Uuid>,
    pub kind: Option<CategoryType>,
}

impl TransactionFilter {
    pub fn for_owner(owner: Owner) -> Self {
        Self {
            owner,
            category_id: None,
            kind: None,
        }
    }
}
