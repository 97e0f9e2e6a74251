//! User administration endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::{
    error::AppResult,
    models::{loan::LoanDetails, user::User},
    AppState,
};

use super::AuthenticatedUser;

/// Get user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "User details", body = User),
        (status = 403, description = "Administrator only", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<String>,
) -> AppResult<Json<User>> {
    claims.require_owner_or_admin(&id)?;

    let user = state.services.users.get_by_id(&id).await?;
    Ok(Json(user))
}

/// Get loans for a specific user
#[utoipa::path(
    get,
    path = "/users/{id}/loans",
    tag = "users",
    security(("bearer_auth" = [])),
    params(("id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Loans of the user, newest first", body = Vec<LoanDetails>),
        (status = 403, description = "Administrator only", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user_loans(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(user_id): Path<String>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    claims.require_admin()?;

    let now = Utc::now();
    let loans = state
        .services
        .loans
        .find_loans_by_user(&user_id)
        .await?
        .into_iter()
        .map(|loan| LoanDetails::new(loan, now))
        .collect();
    Ok(Json(loans))
}
