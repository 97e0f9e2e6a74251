//! In-process store used for development and tests
//!
//! A single mutex guards the whole state. A transaction holds that lock until
//! it ends and writes to a private copy, which replaces the shared state on
//! commit and is dropped on rollback. Transactions are therefore fully
//! serialized.

use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{BookStore, LoanStore, TransactionManager, TxContext, UserStore};
use crate::{
    error::{AppError, AppResult},
    models::{book::Book, loan::Loan, user::User},
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    books: IndexMap<String, Book>,
    loans: IndexMap<String, Loan>,
    users: IndexMap<String, User>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

/// Open in-memory transaction
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
}

impl MemoryTx {
    pub(crate) fn commit(mut self) {
        *self.guard = self.working;
    }
}

impl MemoryStore {
    async fn read<T, F>(&self, ctx: Option<&mut TxContext>, f: F) -> AppResult<T>
    where
        F: FnOnce(&MemoryState) -> T + Send,
    {
        match ctx {
            Some(ctx) => Ok(f(&ctx.memory_tx()?.working)),
            None => {
                let state = self.state.lock().await;
                Ok(f(&state))
            }
        }
    }

    async fn write<T, F>(&self, ctx: Option<&mut TxContext>, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut MemoryState) -> AppResult<T> + Send,
    {
        match ctx {
            Some(ctx) => f(&mut ctx.memory_tx()?.working),
            None => {
                let mut state = self.state.lock().await;
                f(&mut state)
            }
        }
    }
}

#[async_trait]
impl TransactionManager for MemoryStore {
    async fn begin(&self) -> AppResult<TxContext> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(TxContext::memory(MemoryTx { guard, working }))
    }
}

#[async_trait]
impl BookStore for MemoryStore {
    async fn create(&self, book: &Book, ctx: Option<&mut TxContext>) -> AppResult<Book> {
        self.write(ctx, |state| {
            if state.books.contains_key(&book.id) {
                return Err(AppError::Conflict(format!("Book {} already exists", book.id)));
            }
            state.books.insert(book.id.clone(), book.clone());
            Ok(book.clone())
        })
        .await
    }

    async fn find_all(&self) -> AppResult<Vec<Book>> {
        self.read(None, |state| {
            let mut books: Vec<Book> = state.books.values().cloned().collect();
            books.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            books
        })
        .await
    }

    async fn find_by_id(&self, id: &str, ctx: Option<&mut TxContext>) -> AppResult<Option<Book>> {
        self.read(ctx, |state| state.books.get(id).cloned()).await
    }

    async fn update(&self, book: &Book, ctx: Option<&mut TxContext>) -> AppResult<Book> {
        self.write(ctx, |state| match state.books.get_mut(&book.id) {
            Some(stored) => {
                *stored = book.clone();
                Ok(book.clone())
            }
            None => Err(AppError::NotFound(format!("Book with id {} not found", book.id))),
        })
        .await
    }

    async fn delete(&self, id: &str, ctx: Option<&mut TxContext>) -> AppResult<bool> {
        self.write(ctx, |state| Ok(state.books.shift_remove(id).is_some()))
            .await
    }
}

#[async_trait]
impl LoanStore for MemoryStore {
    async fn create(&self, loan: &Loan, ctx: Option<&mut TxContext>) -> AppResult<Loan> {
        self.write(ctx, |state| {
            if state.loans.contains_key(&loan.id) {
                return Err(AppError::Conflict(format!("Loan {} already exists", loan.id)));
            }
            state.loans.insert(loan.id.clone(), loan.clone());
            Ok(loan.clone())
        })
        .await
    }

    async fn find_by_id(&self, id: &str, ctx: Option<&mut TxContext>) -> AppResult<Option<Loan>> {
        self.read(ctx, |state| state.loans.get(id).cloned()).await
    }

    async fn find_by_user_id(
        &self,
        user_id: &str,
        ctx: Option<&mut TxContext>,
    ) -> AppResult<Vec<Loan>> {
        self.read(ctx, |state| {
            let mut loans: Vec<Loan> = state
                .loans
                .values()
                .filter(|loan| loan.user_id == user_id)
                .cloned()
                .collect();
            loans.sort_by(|a, b| b.loan_date.cmp(&a.loan_date));
            loans
        })
        .await
    }

    async fn update(&self, loan: &Loan, ctx: Option<&mut TxContext>) -> AppResult<Loan> {
        self.write(ctx, |state| match state.loans.get_mut(&loan.id) {
            Some(stored) => {
                *stored = loan.clone();
                Ok(loan.clone())
            }
            None => Err(AppError::NotFound(format!("Loan with id {} not found", loan.id))),
        })
        .await
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: &User) -> AppResult<User> {
        self.write(None, |state| {
            let email_taken = state
                .users
                .values()
                .any(|u| u.email.eq_ignore_ascii_case(&user.email));
            if email_taken {
                return Err(AppError::Conflict(format!(
                    "Email {} is already registered",
                    user.email
                )));
            }
            state.users.insert(user.id.clone(), user.clone());
            Ok(user.clone())
        })
        .await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.read(None, |state| {
            state
                .users
                .values()
                .find(|u| u.email.eq_ignore_ascii_case(email))
                .cloned()
        })
        .await
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<User>> {
        self.read(None, |state| state.users.get(id).cloned()).await
    }
}
