//! Catalog management service

use std::sync::Arc;

use chrono::Utc;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, CreateBook, UpdateBook},
    repository::{self, BookStore, TransactionManager},
    services::ids::IdGenerator,
};

#[derive(Clone)]
pub struct CatalogService {
    books: Arc<dyn BookStore>,
    transactions: Arc<dyn TransactionManager>,
    ids: Arc<dyn IdGenerator>,
}

impl CatalogService {
    pub fn new(
        books: Arc<dyn BookStore>,
        transactions: Arc<dyn TransactionManager>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            books,
            transactions,
            ids,
        }
    }

    /// Register a new book
    pub async fn create_book(&self, data: CreateBook) -> AppResult<Book> {
        data.validate()?;

        let book = Book::register(self.ids.generate(), data, Utc::now());
        let created = self.books.create(&book, None).await?;

        tracing::info!(book_id = %created.id, title = %created.title, "Book registered");
        Ok(created)
    }

    /// All books, newest first
    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.books.find_all().await
    }

    pub async fn get_book(&self, id: &str) -> AppResult<Book> {
        self.books
            .find_by_id(id, None)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// Update the catalog fields of a book. Availability is left untouched.
    pub async fn update_book(&self, id: &str, data: UpdateBook) -> AppResult<Book> {
        data.validate()?;

        let books = self.books.clone();
        let id = id.to_string();

        let updated = repository::run(self.transactions.as_ref(), move |ctx| {
            Box::pin(async move {
                let book = books
                    .find_by_id(&id, Some(&mut *ctx))
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

                books.update(&book.with_details(data, Utc::now()), Some(ctx)).await
            })
        })
        .await?;

        tracing::info!(book_id = %updated.id, "Book updated");
        Ok(updated)
    }

    /// Remove a book from the catalog. A book currently on loan cannot be deleted.
    pub async fn delete_book(&self, id: &str) -> AppResult<()> {
        let books = self.books.clone();
        let id = id.to_string();

        let deleted_id = repository::run(self.transactions.as_ref(), move |ctx| {
            Box::pin(async move {
                let book = books
                    .find_by_id(&id, Some(&mut *ctx))
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

                if !book.is_available {
                    return Err(AppError::Conflict(format!(
                        "Book {} is on loan and cannot be deleted",
                        book.id
                    )));
                }

                books.delete(&book.id, Some(ctx)).await?;
                Ok(book.id)
            })
        })
        .await?;

        tracing::info!(book_id = %deleted_id, "Book deleted");
        Ok(())
    }
}
