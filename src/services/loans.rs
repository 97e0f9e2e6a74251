//! Loan lifecycle: borrowing and returning books
//!
//! Both workflows run as one unit of work. The book is read through the same
//! transaction as the loan, which locks its row, so concurrent borrowers of a
//! book are serialized: the first flips `is_available` and every later one
//! sees the flag down and is refused with `BookUnavailable`.

use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::{
    error::{AppError, AppResult},
    models::loan::{CreatedLoan, Loan, ReturnedLoan},
    repository::{self, BookStore, LoanStore, TransactionManager},
    services::ids::IdGenerator,
};

#[derive(Clone)]
pub struct LoansService {
    books: Arc<dyn BookStore>,
    loans: Arc<dyn LoanStore>,
    transactions: Arc<dyn TransactionManager>,
    ids: Arc<dyn IdGenerator>,
    loan_period: Duration,
}

impl LoansService {
    pub fn new(
        books: Arc<dyn BookStore>,
        loans: Arc<dyn LoanStore>,
        transactions: Arc<dyn TransactionManager>,
        ids: Arc<dyn IdGenerator>,
        loan_period: Duration,
    ) -> Self {
        Self {
            books,
            loans,
            transactions,
            ids,
            loan_period,
        }
    }

    /// Borrow a book
    pub async fn create_loan(&self, book_id: &str, user_id: &str) -> AppResult<CreatedLoan> {
        let books = self.books.clone();
        let loans = self.loans.clone();
        let loan_id = self.ids.generate();
        let book_id = book_id.to_string();
        let user_id = user_id.to_string();
        let period = self.loan_period;

        let loan = repository::run(self.transactions.as_ref(), move |ctx| {
            Box::pin(async move {
                let book = books
                    .find_by_id(&book_id, Some(&mut *ctx))
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Book with id {} not found", book_id))
                    })?;

                if !book.is_available {
                    return Err(AppError::BookUnavailable(book.id));
                }

                let now = Utc::now();
                let loan = Loan::open(loan_id, book.id.clone(), user_id, now, period)?;
                let created = loans.create(&loan, Some(&mut *ctx)).await?;

                books
                    .update(&book.with_availability(false, now), Some(ctx))
                    .await?;

                Ok(created)
            })
        })
        .await?;

        tracing::info!(
            loan_id = %loan.id,
            book_id = %loan.book_id,
            user_id = %loan.user_id,
            due_date = %loan.due_date,
            "Book lent"
        );

        Ok(loan.into())
    }

    /// Return a borrowed book
    pub async fn return_loan(&self, loan_id: &str) -> AppResult<ReturnedLoan> {
        let books = self.books.clone();
        let loans = self.loans.clone();
        let loan_id = loan_id.to_string();

        let loan = repository::run(self.transactions.as_ref(), move |ctx| {
            Box::pin(async move {
                let loan = loans
                    .find_by_id(&loan_id, Some(&mut *ctx))
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Loan with id {} not found", loan_id))
                    })?;

                let now = Utc::now();
                let returned = loan.mark_returned(now)?;
                let updated = loans.update(&returned, Some(&mut *ctx)).await?;

                let book = books
                    .find_by_id(&updated.book_id, Some(&mut *ctx))
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "Book with id {} referenced by loan {} not found",
                            updated.book_id, updated.id
                        ))
                    })?;

                books
                    .update(&book.with_availability(true, now), Some(ctx))
                    .await?;

                Ok(updated)
            })
        })
        .await?;

        tracing::info!(loan_id = %loan.id, book_id = %loan.book_id, "Book returned");

        ReturnedLoan::try_from(loan)
    }

    /// Get a loan by ID
    pub async fn get_loan(&self, loan_id: &str) -> AppResult<Loan> {
        self.loans
            .find_by_id(loan_id, None)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", loan_id)))
    }

    /// Loans of a user, newest first
    pub async fn find_loans_by_user(&self, user_id: &str) -> AppResult<Vec<Loan>> {
        self.loans.find_by_user_id(user_id, None).await
    }
}
