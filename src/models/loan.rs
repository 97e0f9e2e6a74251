//! Loan (borrow) model and related types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Loan row. `return_date` is `None` while the book is still out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: String,
    pub book_id: String,
    pub user_id: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    /// Open a loan starting at `now`, due after `period`
    pub fn open(
        id: String,
        book_id: String,
        user_id: String,
        now: DateTime<Utc>,
        period: Duration,
    ) -> AppResult<Self> {
        let due_date = now.checked_add_signed(period).ok_or_else(|| {
            AppError::Internal(format!("Loan period of {} is out of range", period))
        })?;

        Ok(Self {
            id,
            book_id,
            user_id,
            loan_date: now,
            due_date,
            return_date: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_outstanding(&self) -> bool {
        self.return_date.is_none()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_outstanding() && self.due_date < now
    }

    /// Returned snapshot of this loan. A return date is set once and never changed.
    pub fn mark_returned(&self, now: DateTime<Utc>) -> AppResult<Self> {
        if !self.is_outstanding() {
            return Err(AppError::AlreadyReturned(self.id.clone()));
        }
        Ok(Self {
            return_date: Some(now),
            updated_at: now,
            ..self.clone()
        })
    }
}

/// Result of borrowing a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CreatedLoan {
    pub id: String,
    pub book_id: String,
    pub user_id: String,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Loan> for CreatedLoan {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.id,
            book_id: loan.book_id,
            user_id: loan.user_id,
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
        }
    }
}

/// Result of returning a book; the return date is always present
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReturnedLoan {
    pub id: String,
    pub book_id: String,
    pub user_id: String,
    pub loan_date: DateTime<Utc>,
    pub return_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<Loan> for ReturnedLoan {
    type Error = AppError;

    fn try_from(loan: Loan) -> Result<Self, Self::Error> {
        let return_date = loan.return_date.ok_or_else(|| {
            AppError::Internal(format!("Loan {} has no return date after return", loan.id))
        })?;
        Ok(Self {
            id: loan.id,
            book_id: loan.book_id,
            user_id: loan.user_id,
            loan_date: loan.loan_date,
            return_date,
            created_at: loan.created_at,
            updated_at: loan.updated_at,
        })
    }
}

/// Loan with computed status for display
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub is_overdue: bool,
}

impl LoanDetails {
    pub fn new(loan: Loan, now: DateTime<Utc>) -> Self {
        let is_overdue = loan.is_overdue(now);
        Self { loan, is_overdue }
    }
}

/// Create loan request. The borrower is taken from the session.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    #[validate(length(min = 1, message = "book_id is required"))]
    pub book_id: String,
}
