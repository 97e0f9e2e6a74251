//! Units of work spanning several store operations

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use super::memory::MemoryTx;
use crate::error::{AppError, AppResult};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handle to an open transaction, passed to store operations that must
/// take part in it.
pub struct TxContext {
    inner: TxInner,
}

enum TxInner {
    Postgres(Transaction<'static, Postgres>),
    Memory(MemoryTx),
}

impl TxContext {
    pub(crate) fn postgres(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            inner: TxInner::Postgres(tx),
        }
    }

    pub(crate) fn memory(tx: MemoryTx) -> Self {
        Self {
            inner: TxInner::Memory(tx),
        }
    }

    /// Connection of a PostgreSQL transaction
    pub(crate) fn pg_connection(&mut self) -> AppResult<&mut PgConnection> {
        match &mut self.inner {
            TxInner::Postgres(tx) => Ok(&mut **tx),
            TxInner::Memory(_) => Err(foreign_context()),
        }
    }

    /// Working state of an in-memory transaction
    pub(crate) fn memory_tx(&mut self) -> AppResult<&mut MemoryTx> {
        match &mut self.inner {
            TxInner::Memory(tx) => Ok(tx),
            TxInner::Postgres(_) => Err(foreign_context()),
        }
    }

    pub async fn commit(self) -> AppResult<()> {
        match self.inner {
            TxInner::Postgres(tx) => tx.commit().await?,
            TxInner::Memory(tx) => tx.commit(),
        }
        Ok(())
    }

    pub async fn rollback(self) -> AppResult<()> {
        match self.inner {
            TxInner::Postgres(tx) => tx.rollback().await?,
            TxInner::Memory(tx) => drop(tx),
        }
        Ok(())
    }
}

fn foreign_context() -> AppError {
    AppError::Internal("Transaction context was opened by a different store".to_string())
}

/// Opens transactions on a store
#[async_trait]
pub trait TransactionManager: Send + Sync {
    async fn begin(&self) -> AppResult<TxContext>;
}

/// Run `work` in a fresh transaction.
///
/// Commits when `work` succeeds. On failure the transaction is rolled back
/// and the error of `work` is returned as is.
pub async fn run<T, F>(manager: &dyn TransactionManager, work: F) -> AppResult<T>
where
    F: for<'c> FnOnce(&'c mut TxContext) -> BoxFuture<'c, AppResult<T>> + Send,
{
    let mut ctx = manager.begin().await?;

    match work(&mut ctx).await {
        Ok(value) => {
            ctx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_error) = ctx.rollback().await {
                tracing::warn!("Rollback failed after {}: {}", e, rollback_error);
            }
            Err(e)
        }
    }
}

/// PostgreSQL transactions from the connection pool
#[derive(Clone)]
pub struct PgTransactionManager {
    pool: PgPool,
}

impl PgTransactionManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionManager for PgTransactionManager {
    async fn begin(&self) -> AppResult<TxContext> {
        let tx = self.pool.begin().await?;
        Ok(TxContext::postgres(tx))
    }
}
