//! Username/password verification.
//!
//! An unknown username and a wrong password are indistinguishable to the caller:
//! both map to the same `401 Invalid credentials`, and an unknown username still
//! pays for a full bcrypt comparison against a dummy hash.

use std::fmt;
use std::sync::Arc;

use crate::auth::password::{hash_password, hash_password_blocking, verify_password_blocking};
use crate::error::AppError;
use crate::models::{CredentialRecord, Principal};
use crate::store::CredentialStore;

const DUMMY_PASSWORD: &str = "neotask-dummy-password";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    NotFound,
    Mismatch,
    Store(AppError),
}

impl fmt::Display for CredentialError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CredentialError::NotFound => write!(f, "no such user"),
            CredentialError::Mismatch => write!(f, "password mismatch"),
            CredentialError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CredentialError {}

impl From<CredentialError> for AppError {
    fn from(error: CredentialError) -> AppError {
        match error {
            CredentialError::NotFound | CredentialError::Mismatch => {
                AppError::Unauthorized("Invalid credentials".into())
            }
            CredentialError::Store(e) => e,
        }
    }
}

pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    cost: u32,
    dummy_hash: String,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>, cost: u32) -> Result<Self, AppError> {
        Ok(Self {
            store,
            cost,
            dummy_hash: hash_password(DUMMY_PASSWORD, cost)?,
        })
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<Principal, CredentialError> {
        let record = self
            .store
            .find_by_username(username)
            .await
            .map_err(CredentialError::Store)?;

        let hash = record
            .as_ref()
            .map_or_else(|| self.dummy_hash.clone(), |r| r.password_hash.clone());
        let matches = verify_password_blocking(password.to_string(), hash)
            .await
            .map_err(CredentialError::Store)?;

        match record {
            None => {
                log::debug!("login rejected: unknown user");
                Err(CredentialError::NotFound)
            }
            Some(_) if !matches => {
                log::debug!("login rejected: password mismatch for {}", username);
                Err(CredentialError::Mismatch)
            }
            Some(record) => Ok(record.principal()),
        }
    }

    /// Registers a new account. Fails with [`AppError::Conflict`] if the username is taken.
    pub async fn create(&self, username: &str, password: &str) -> Result<Principal, AppError> {
        let password_hash = hash_password_blocking(password.to_string(), self.cost).await?;
        let record = CredentialRecord::new(username.to_string(), password_hash);
        let principal = record.principal();
        self.store.insert(record).await?;
        log::info!("created account {} ({})", principal.username, principal.id);
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryCredentialStore;

    fn verifier() -> CredentialVerifier {
        CredentialVerifier::new(Arc::new(InMemoryCredentialStore::new()), 4).unwrap()
    }

    #[actix_rt::test]
    async fn test_create_then_verify() {
        let verifier = verifier();
        let created = verifier.create("alice", "s3cret").await.unwrap();
        let verified = verifier.verify("alice", "s3cret").await.unwrap();
        assert_eq!(created, verified);
    }

    #[actix_rt::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let verifier = verifier();
        verifier.create("alice", "s3cret").await.unwrap();

        let mismatch = verifier.verify("alice", "wrong").await.unwrap_err();
        let missing = verifier.verify("bob", "s3cret").await.unwrap_err();
        assert_eq!(mismatch, CredentialError::Mismatch);
        assert_eq!(missing, CredentialError::NotFound);
        assert_eq!(AppError::from(mismatch), AppError::from(missing));
    }

    #[actix_rt::test]
    async fn test_duplicate_username_conflicts() {
        let verifier = verifier();
        verifier.create("alice", "one").await.unwrap();
        let err = verifier.create("alice", "two").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // The original password still works.
        assert!(verifier.verify("alice", "one").await.is_ok());
    }

    #[actix_rt::test]
    async fn test_usernames_are_case_sensitive() {
        let verifier = verifier();
        verifier.create("alice", "pw").await.unwrap();
        assert_eq!(
            verifier.verify("Alice", "pw").await.unwrap_err(),
            CredentialError::NotFound
        );
    }
}
