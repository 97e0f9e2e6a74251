//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, CreatedLoan, LoanDetails, ReturnedLoan},
    AppState,
};

use super::AuthenticatedUser;

/// Borrow a book for the current user
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = CreatedLoan),
        (status = 404, description = "Book not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Book already on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<CreatedLoan>)> {
    request.validate()?;

    let loan = state
        .services
        .loans
        .create_loan(&request.book_id, claims.user_id())
        .await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Loans of the current user
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Own loans, newest first", body = Vec<LoanDetails>)
    )
)]
pub async fn my_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let now = Utc::now();
    let loans = state
        .services
        .loans
        .find_loans_by_user(claims.user_id())
        .await?
        .into_iter()
        .map(|loan| LoanDetails::new(loan, now))
        .collect();
    Ok(Json(loans))
}

/// Get a loan
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Loan details", body = LoanDetails),
        (status = 403, description = "Not the borrower", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<String>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get_loan(&loan_id).await?;
    claims.require_owner_or_admin(&loan.user_id)?;

    Ok(Json(LoanDetails::new(loan, Utc::now())))
}

/// Return a borrowed book
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "Loan ID")),
    responses(
        (status = 200, description = "Book returned", body = ReturnedLoan),
        (status = 403, description = "Not the borrower", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(loan_id): Path<String>,
) -> AppResult<Json<ReturnedLoan>> {
    let loan = state.services.loans.get_loan(&loan_id).await?;
    claims.require_owner_or_admin(&loan.user_id)?;

    let returned = state.services.loans.return_loan(&loan_id).await?;
    Ok(Json(returned))
}
