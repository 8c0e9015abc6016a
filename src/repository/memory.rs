//! Process-local repository backed by DashMap tables.
//!
//! When a snapshot path is configured the tables are loaded from a JSON file
//! on initialize and written back on terminate.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::container::{BoxError, Component, Initialize, Terminate};
use crate::repository::models::*;
use crate::repository::{RepoError, Repository, SQLITE_CONSTRAINT_UNIQUE};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    id: i64,
    group_id: i64,
    email: String,
    fullname: String,
    passhash: String,
}

impl StoredAccount {
    fn public(&self) -> Account {
        Account {
            id: self.id,
            group_id: self.group_id,
            email: self.email.clone(),
            fullname: self.fullname.clone(),
            passhash: String::new(),
        }
    }

    fn full(&self) -> Account {
        Account {
            passhash: self.passhash.clone(),
            ..self.public()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCategory {
    group_id: i64,
    #[serde(flatten)]
    category: Category,
}

#[derive(Default, Serialize, Deserialize)]
struct Snapshot {
    next_account_id: i64,
    next_group_id: i64,
    accounts: Vec<StoredAccount>,
    categories: Vec<StoredCategory>,
    transactions: Vec<Transaction>,
}

#[derive(Default)]
pub struct MemoryRepository {
    accounts: DashMap<i64, StoredAccount>,
    emails: DashMap<String, i64>,
    categories: DashMap<Uuid, StoredCategory>,
    transactions: DashMap<Uuid, Transaction>,
    next_account_id: AtomicI64,
    next_group_id: AtomicI64,
    snapshot_path: Option<PathBuf>,
}

impl MemoryRepository {
    pub fn new(snapshot_path: Option<PathBuf>) -> Self {
        Self {
            snapshot_path,
            ..Self::default()
        }
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }

    /// Replace the tables with the snapshot at `path`, if the file exists.
    pub async fn load(&self, path: &Path) -> io::Result<usize> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(0);
        }
        let bytes = tokio::fs::read(path).await?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)?;

        self.accounts.clear();
        self.emails.clear();
        self.categories.clear();
        self.transactions.clear();

        let mut max_account = snapshot.next_account_id;
        let mut max_group = snapshot.next_group_id;
        for account in snapshot.accounts {
            max_account = max_account.max(account.id);
            max_group = max_group.max(account.group_id);
            self.emails.insert(account.email.clone(), account.id);
            self.accounts.insert(account.id, account);
        }
        for stored in snapshot.categories {
            self.categories.insert(stored.category.id, stored);
        }
        for transaction in snapshot.transactions {
            self.transactions.insert(transaction.id, transaction);
        }
        self.next_account_id.store(max_account, Ordering::SeqCst);
        self.next_group_id.store(max_group, Ordering::SeqCst);

        Ok(self.accounts.len())
    }

    /// Write every table to `path`.
    pub async fn save(&self, path: &Path) -> io::Result<usize> {
        let snapshot = Snapshot {
            next_account_id: self.next_account_id.load(Ordering::SeqCst),
            next_group_id: self.next_group_id.load(Ordering::SeqCst),
            accounts: self.accounts.iter().map(|r| r.value().clone()).collect(),
            categories: self.categories.iter().map(|r| r.value().clone()).collect(),
            transactions: self.transactions.iter().map(|r| r.value().clone()).collect(),
        };
        let bytes = serde_json::to_vec_pretty(&snapshot)?;
        tokio::fs::write(path, bytes).await?;
        Ok(snapshot.accounts.len())
    }

    fn category_kind(&self, id: &Uuid) -> Option<CategoryType> {
        self.categories.get(id).map(|r| r.category.kind)
    }

    fn owned_by(&self, transaction: &Transaction, owner: Owner) -> bool {
        match owner {
            Owner::Account(id) => transaction.account_id == id,
            Owner::Group(gid) => self
                .accounts
                .get(&transaction.account_id)
                .is_some_and(|a| a.group_id == gid),
        }
    }
}

fn unique_violation(column: &str) -> RepoError {
    RepoError::Database {
        code: SQLITE_CONSTRAINT_UNIQUE,
        message: format!("UNIQUE constraint failed: {}", column),
    }
}

impl Component for MemoryRepository {
    fn initializer(&self) -> Option<&dyn Initialize> {
        self.snapshot_path.as_ref().map(|_| self as &dyn Initialize)
    }

    fn terminator(&self) -> Option<&dyn Terminate> {
        self.snapshot_path.as_ref().map(|_| self as &dyn Terminate)
    }
}

#[async_trait]
impl Initialize for MemoryRepository {
    async fn initialize(&self) -> Result<(), BoxError> {
        if let Some(path) = &self.snapshot_path {
            let accounts = self.load(path).await?;
            tracing::info!(path = %path.display(), accounts, "Loaded repository snapshot");
        }
        Ok(())
    }
}

#[async_trait]
impl Terminate for MemoryRepository {
    async fn terminate(&self) -> Result<(), BoxError> {
        if let Some(path) = &self.snapshot_path {
            let accounts = self.save(path).await?;
            tracing::info!(path = %path.display(), accounts, "Saved repository snapshot");
        }
        Ok(())
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_account(&self, account: NewAccount) -> Result<Account, RepoError> {
        match self.emails.entry(account.email.clone()) {
            Entry::Occupied(_) => Err(unique_violation("accounts.email")),
            Entry::Vacant(slot) => {
                let group_id = self.next_group_id.fetch_add(1, Ordering::SeqCst) + 1;
                let id = self.next_account_id.fetch_add(1, Ordering::SeqCst) + 1;
                let stored = StoredAccount {
                    id,
                    group_id,
                    email: account.email,
                    fullname: account.fullname,
                    passhash: account.passhash,
                };
                let public = stored.public();
                self.accounts.insert(id, stored);
                slot.insert(id);
                Ok(public)
            }
        }
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Account, RepoError> {
        let id = *self.emails.get(email).ok_or(RepoError::NoRows)?;
        self.accounts
            .get(&id)
            .map(|r| r.full())
            .ok_or(RepoError::NoRows)
    }

    async fn get_account(&self, id: i64) -> Result<Account, RepoError> {
        self.accounts
            .get(&id)
            .map(|r| r.public())
            .ok_or(RepoError::NoRows)
    }

    async fn get_account_summary(&self, id: i64) -> Result<AccountSummary, RepoError> {
        if !self.accounts.contains_key(&id) {
            return Err(RepoError::NoRows);
        }
        let mut summary = AccountSummary::default();
        for entry in self.transactions.iter() {
            let t = entry.value();
            if t.account_id != id {
                continue;
            }
            match t.category_id.and_then(|cid| self.category_kind(&cid)) {
                Some(CategoryType::Income) => summary.income += t.amount,
                Some(CategoryType::Expense) => summary.expense += t.amount,
                None => {}
            }
        }
        summary.balance = summary.income - summary.expense;
        Ok(summary)
    }

    async fn create_category(&self, category: NewCategory) -> Result<Uuid, RepoError> {
        let id = Uuid::new_v4();
        self.categories.insert(
            id,
            StoredCategory {
                group_id: category.group_id,
                category: Category {
                    id,
                    name: category.name,
                    kind: category.kind,
                    emoji: category.emoji,
                    color: category.color,
                },
            },
        );
        Ok(id)
    }

    async fn get_categories(
        &self,
        group_id: i64,
        kind: Option<CategoryType>,
    ) -> Result<Vec<Category>, RepoError> {
        let mut found: Vec<Category> = self
            .categories
            .iter()
            .filter(|r| r.group_id == group_id)
            .filter(|r| kind.map_or(true, |k| r.category.kind == k))
            .map(|r| r.category.clone())
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(found)
    }

    async fn create_transaction(&self, transaction: NewTransaction) -> Result<Uuid, RepoError> {
        let id = Uuid::new_v4();
        self.transactions.insert(
            id,
            Transaction {
                id,
                account_id: transaction.account_id,
                category_id: transaction.category_id,
                amount: transaction.amount,
                timestamp: transaction.timestamp,
                title: transaction.title,
                note: transaction.note,
            },
        );
        Ok(id)
    }

    async fn list_transactions(
        &self,
        filter: TransactionFilter,
    ) -> Result<Vec<Transaction>, RepoError> {
        let mut found: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|r| self.owned_by(r.value(), filter.owner))
            .filter(|r| filter.category_id.map_or(true, |cid| r.category_id == Some(cid)))
            .filter(|r| {
                filter.kind.map_or(true, |kind| {
                    r.category_id.and_then(|cid| self.category_kind(&cid)) == Some(kind)
                })
            })
            .map(|r| r.value().clone())
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }
}
