//! Repository layer: store contracts and their PostgreSQL / in-memory adapters
//!
//! Every operation that may take part in a unit of work accepts an optional
//! [`TxContext`]. Called with `None` it runs on its own; called with a context
//! it runs inside that transaction, and reads of a single book or loan lock
//! the row until the transaction ends.

pub mod books;
pub mod loans;
pub mod memory;
pub mod transaction;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{book::Book, loan::Loan, user::User},
};

pub use transaction::{run, BoxFuture, TransactionManager, TxContext};

/// Persistence of catalog books
#[async_trait]
pub trait BookStore: Send + Sync {
    async fn create(&self, book: &Book, ctx: Option<&mut TxContext>) -> AppResult<Book>;

    /// All books, most recently registered first
    async fn find_all(&self) -> AppResult<Vec<Book>>;

    async fn find_by_id(&self, id: &str, ctx: Option<&mut TxContext>) -> AppResult<Option<Book>>;

    /// Persist the full snapshot (last writer wins)
    async fn update(&self, book: &Book, ctx: Option<&mut TxContext>) -> AppResult<Book>;

    /// Returns false when there was nothing to delete
    async fn delete(&self, id: &str, ctx: Option<&mut TxContext>) -> AppResult<bool>;
}

/// Persistence of loans
#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn create(&self, loan: &Loan, ctx: Option<&mut TxContext>) -> AppResult<Loan>;

    async fn find_by_id(&self, id: &str, ctx: Option<&mut TxContext>) -> AppResult<Option<Loan>>;

    /// Loans of a user, newest loan date first
    async fn find_by_user_id(
        &self,
        user_id: &str,
        ctx: Option<&mut TxContext>,
    ) -> AppResult<Vec<Loan>>;

    async fn update(&self, loan: &Loan, ctx: Option<&mut TxContext>) -> AppResult<Loan>;
}

/// Persistence of user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is already registered
    async fn create(&self, user: &User) -> AppResult<User>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>>;
}

/// Main repository struct holding the stores of one backend
#[derive(Clone)]
pub struct Repository {
    pub books: Arc<dyn BookStore>,
    pub loans: Arc<dyn LoanStore>,
    pub users: Arc<dyn UserStore>,
    pub transactions: Arc<dyn TransactionManager>,
}

impl Repository {
    /// Create a repository backed by the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            loans: Arc::new(loans::LoansRepository::new(pool.clone())),
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            transactions: Arc::new(transaction::PgTransactionManager::new(pool)),
        }
    }

    /// Create a repository keeping everything in process memory
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            books: Arc::new(store.clone()),
            loans: Arc::new(store.clone()),
            users: Arc::new(store.clone()),
            transactions: Arc::new(store),
        }
    }
}
