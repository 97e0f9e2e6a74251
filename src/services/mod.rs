//! Business logic services

pub mod catalog;
pub mod ids;
pub mod loans;
pub mod password;
pub mod users;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub users: users::UsersService,
    repository: Repository,
}

impl Services {
    /// Wire all services onto the given repository
    pub fn new(repository: Repository, config: &AppConfig) -> Self {
        let ids: Arc<dyn ids::IdGenerator> = Arc::new(ids::UuidGenerator);
        let hasher: Arc<dyn password::PasswordHasher> = Arc::new(password::Argon2PasswordHasher);

        Self {
            catalog: catalog::CatalogService::new(
                repository.books.clone(),
                repository.transactions.clone(),
                ids.clone(),
            ),
            loans: loans::LoansService::new(
                repository.books.clone(),
                repository.loans.clone(),
                repository.transactions.clone(),
                ids.clone(),
                config.loans.period(),
            ),
            users: users::UsersService::new(
                repository.users.clone(),
                hasher,
                ids,
                config.auth.clone(),
            ),
            repository,
        }
    }

    /// Cheap round trip to the store, used by the readiness probe
    pub async fn ping(&self) -> crate::error::AppResult<()> {
        self.repository.books.find_by_id("readiness-probe", None).await?;
        Ok(())
    }
}
