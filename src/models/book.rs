//! Book (catalog entry) model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidateUrl, ValidationError};

/// Book row as persisted in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: String,
    pub published_at: NaiveDate,
    /// False while an unreturned loan references this book
    pub is_available: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Register a new book. New books have no loans and start available.
    pub fn register(id: String, data: CreateBook, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: data.title,
            author: data.author,
            published_at: data.published_at,
            is_available: true,
            image_url: normalize_image_url(data.image_url),
            created_at: now,
            updated_at: now,
        }
    }

    /// Snapshot with the availability flag flipped to `available`
    pub fn with_availability(&self, available: bool, now: DateTime<Utc>) -> Self {
        Self {
            is_available: available,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Snapshot carrying the catalog fields of `data`.
    /// Availability is owned by the loan workflows and is kept as is.
    pub fn with_details(&self, data: UpdateBook, now: DateTime<Utc>) -> Self {
        Self {
            title: data.title,
            author: data.author,
            published_at: data.published_at,
            image_url: normalize_image_url(data.image_url),
            updated_at: now,
            ..self.clone()
        }
    }
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Author must be 1 to 100 characters"))]
    pub author: String,
    pub published_at: NaiveDate,
    /// Absolute URL or site-relative path (starting with `/`)
    #[validate(custom(function = "validate_image_url"))]
    pub image_url: Option<String>,
}

/// Update book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 100, message = "Author must be 1 to 100 characters"))]
    pub author: String,
    pub published_at: NaiveDate,
    #[validate(custom(function = "validate_image_url"))]
    pub image_url: Option<String>,
}

fn validate_image_url(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.starts_with('/') || value.validate_url() {
        Ok(())
    } else {
        let mut error = ValidationError::new("image_url");
        error.message = Some("Image URL must be an absolute URL or start with '/'".into());
        Err(error)
    }
}

// An empty string from a form means "no image"
fn normalize_image_url(url: Option<String>) -> Option<String> {
    url.filter(|u| !u.is_empty())
}
