//! Books repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{BookStore, TxContext};
use crate::{
    error::{AppError, AppResult},
    models::book::Book,
};

const INSERT_BOOK: &str = r#"
    INSERT INTO books (id, title, author, published_at, is_available, image_url, created_at, updated_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING *
"#;

const UPDATE_BOOK: &str = r#"
    UPDATE books
    SET title = $2, author = $3, published_at = $4, is_available = $5,
        image_url = $6, updated_at = $7
    WHERE id = $1
    RETURNING *
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookStore for BooksRepository {
    async fn create(&self, book: &Book, ctx: Option<&mut TxContext>) -> AppResult<Book> {
        let query = sqlx::query_as::<_, Book>(INSERT_BOOK)
            .bind(&book.id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.published_at)
            .bind(book.is_available)
            .bind(&book.image_url)
            .bind(book.created_at)
            .bind(book.updated_at);

        let created = match ctx {
            Some(ctx) => query.fetch_one(ctx.pg_connection()?).await?,
            None => query.fetch_one(&self.pool).await?,
        };
        Ok(created)
    }

    async fn find_all(&self) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>("SELECT * FROM books ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(books)
    }

    async fn find_by_id(&self, id: &str, ctx: Option<&mut TxContext>) -> AppResult<Option<Book>> {
        let book = match ctx {
            // Lock the row: it is the serialization point of the loan workflows
            Some(ctx) => {
                sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1 FOR UPDATE")
                    .bind(id)
                    .fetch_optional(ctx.pg_connection()?)
                    .await?
            }
            None => {
                sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };
        Ok(book)
    }

    async fn update(&self, book: &Book, ctx: Option<&mut TxContext>) -> AppResult<Book> {
        let query = sqlx::query_as::<_, Book>(UPDATE_BOOK)
            .bind(&book.id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(book.published_at)
            .bind(book.is_available)
            .bind(&book.image_url)
            .bind(book.updated_at);

        let updated = match ctx {
            Some(ctx) => query.fetch_optional(ctx.pg_connection()?).await?,
            None => query.fetch_optional(&self.pool).await?,
        };
        updated.ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", book.id)))
    }

    async fn delete(&self, id: &str, ctx: Option<&mut TxContext>) -> AppResult<bool> {
        let query = sqlx::query("DELETE FROM books WHERE id = $1").bind(id);

        let result = match ctx {
            Some(ctx) => query.execute(ctx.pg_connection()?).await?,
            None => query.execute(&self.pool).await?,
        };
        Ok(result.rows_affected() > 0)
    }
}
