//! Data models for Biblio

pub mod book;
pub mod loan;
pub mod user;

// Re-export commonly used types
pub use book::{Book, CreateBook, UpdateBook};
pub use loan::{CreatedLoan, Loan, LoanDetails, ReturnedLoan};
pub use user::{LoginResponse, Role, User, UserClaims};
