//! Account registration and credential checks.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

use crate::container::Component;
use crate::repository::{Account, NewAccount, RepoError, Repository};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("account not found")]
    NotFound,

    #[error("incorrect password")]
    WrongPassword,

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub struct AccountService {
    repo: Arc<dyn Repository>,
    params: Params,
}

impl Component for AccountService {}

impl AccountService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            repo,
            params: Params::default(),
        }
    }

    /// Cheaper hashing parameters, for tests.
    pub fn with_params(repo: Arc<dyn Repository>, params: Params) -> Self {
        Self { repo, params }
    }

    /// Hash the password and create the account (and its group).
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        fullname: &str,
    ) -> Result<Account, AccountError> {
        let passhash = self.hash(password.to_string()).await?;
        let account = self
            .repo
            .create_account(NewAccount {
                email: email.to_string(),
                fullname: fullname.to_string(),
                passhash,
            })
            .await?;
        tracing::debug!(account_id = account.id, "Account registered");
        Ok(account)
    }

    /// Check credentials. The returned account never carries its hash.
    pub async fn login(&self, email: &str, password: &str) -> Result<Account, AccountError> {
        let mut account = match self.repo.find_account_by_email(email).await {
            Ok(account) => account,
            Err(RepoError::NoRows) => return Err(AccountError::NotFound),
            Err(e) => return Err(e.into()),
        };
        let passhash = std::mem::take(&mut account.passhash);
        verify(password.to_string(), passhash).await?;
        Ok(account)
    }

    async fn hash(&self, password: String) -> Result<String, AccountError> {
        let params = self.params.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
                .hash_password(password.as_bytes(), &salt)
                .map(|h| h.to_string())
                .map_err(|e| AccountError::Hash(e.to_string()))
        })
        .await
        .map_err(|e| AccountError::Hash(e.to_string()))?
    }
}

async fn verify(password: String, passhash: String) -> Result<(), AccountError> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&passhash).map_err(|e| AccountError::Hash(e.to_string()))?;
        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(()),
            Err(argon2::password_hash::Error::Password) => Err(AccountError::WrongPassword),
            Err(e) => Err(AccountError::Hash(e.to_string())),
        }
    })
    .await
    .map_err(|e| AccountError::Hash(e.to_string()))?
}
