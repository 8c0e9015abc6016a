//! Persistence boundary.
//!
//! # Data Flow
//! ```text
//! handlers / services
//!     → Repository trait (looked up as "repository" in the container)
//!     → memory.rs (DashMap tables, JSON snapshot on start/stop)
//! ```
//!
//! # Design Decisions
//! - Errors mirror a SQL driver: a "no rows" sentinel plus a coded database
//!   error, so callers can special-case uniqueness violations
//! - The repository is a container component; loading and saving the
//!   snapshot are its lifecycle hooks

pub mod memory;
pub mod models;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::container::Component;

pub use memory::MemoryRepository;
pub use models::{
    Account, AccountSummary, Category, CategoryType, NewAccount, NewCategory, NewTransaction,
    Owner, Transaction, TransactionFilter,
};

/// Vendor code reported for a violated uniqueness constraint.
pub const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("no rows in result set")]
    NoRows,

    #[error("database error {code}: {message}")]
    Database { code: i32, message: String },
}

impl RepoError {
    /// The vendor error code, if this is a database error.
    pub fn code(&self) -> Option<i32> {
        match self {
            RepoError::Database { code, .. } => Some(*code),
            RepoError::NoRows => None,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.code() == Some(SQLITE_CONSTRAINT_UNIQUE)
    }
}

#[async_trait]
pub trait Repository: Component {
    /// Create an account together with its own group.
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepoError>;

    /// Full record, password hash included.
    async fn find_account_by_email(&self, email: &str) -> Result<Account, RepoError>;

    /// Public record, password hash left empty.
    async fn get_account(&self, id: i64) -> Result<Account, RepoError>;

    async fn get_account_summary(&self, id: i64) -> Result<AccountSummary, RepoError>;

    async fn create_category(&self, category: NewCategory) -> Result<Uuid, RepoError>;

    async fn get_categories(
        &self,
        group_id: i64,
        kind: Option<CategoryType>,
    ) -> Result<Vec<Category>, RepoError>;

    async fn create_transaction(&self, transaction: NewTransaction) -> Result<Uuid, RepoError>;

    /// Matching transactions, newest first.
    async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, RepoError>;
}
