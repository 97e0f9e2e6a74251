//! Loans repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{LoanStore, TxContext};
use crate::{
    error::{AppError, AppResult},
    models::loan::Loan,
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanStore for LoansRepository {
    /// Create a new loan
    async fn create(&self, loan: &Loan, ctx: Option<&mut TxContext>) -> AppResult<Loan> {
        let query = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (id, book_id, user_id, loan_date, due_date, return_date, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.book_id)
        .bind(&loan.user_id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.created_at)
        .bind(loan.updated_at);

        let created = match ctx {
            Some(ctx) => query.fetch_one(ctx.pg_connection()?).await?,
            None => query.fetch_one(&self.pool).await?,
        };
        Ok(created)
    }

    /// Get loan by ID, locking it when inside a transaction
    async fn find_by_id(&self, id: &str, ctx: Option<&mut TxContext>) -> AppResult<Option<Loan>> {
        let loan = match ctx {
            Some(ctx) => {
                sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(ctx.pg_connection()?)
                    .await?
            }
            None => {
                sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(loan)
    }

    /// Get loans for a user
    async fn find_by_user_id(
        &self,
        user_id: &str,
        ctx: Option<&mut TxContext>,
    ) -> AppResult<Vec<Loan>> {
        let query = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE user_id = $1 ORDER BY loan_date DESC",
        )
        .bind(user_id);

        let loans = match ctx {
            Some(ctx) => query.fetch_all(ctx.pg_connection()?).await?,
            None => query.fetch_all(&self.pool).await?,
        };
        Ok(loans)
    }

    async fn update(&self, loan: &Loan, ctx: Option<&mut TxContext>) -> AppResult<Loan> {
        let query = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans
            SET book_id = $2, user_id = $3, loan_date = $4, due_date = $5,
                return_date = $6, updated_at = $7
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.book_id)
        .bind(&loan.user_id)
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.updated_at);

        let updated = match ctx {
            Some(ctx) => query.fetch_optional(ctx.pg_connection()?).await?,
            None => query.fetch_optional(&self.pool).await?,
        };
        updated.ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan.id)))
    }
}
