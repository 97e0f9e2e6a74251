//! PostgreSQL repository tests
//!
//! Need a disposable database. Run with:
//! DATABASE_URL=postgres://... cargo test --test postgres_tests -- --ignored

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use biblio_server::{
    error::AppError,
    models::book::{Book, CreateBook},
    repository::Repository,
    services::{catalog::CatalogService, ids::UuidGenerator, loans::LoansService},
};

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("Failed to connect to database");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    pool
}

fn loans_service(repository: &Repository) -> LoansService {
    LoansService::new(
        repository.books.clone(),
        repository.loans.clone(),
        repository.transactions.clone(),
        Arc::new(UuidGenerator),
        Duration::days(14),
    )
}

async fn add_book(repository: &Repository) -> Book {
    let book = Book::register(
        uuid::Uuid::new_v4().to_string(),
        CreateBook {
            title: "A Wizard of Earthsea".to_string(),
            author: "Ursula K. Le Guin".to_string(),
            published_at: NaiveDate::from_ymd_opt(1968, 11, 1).unwrap(),
            image_url: None,
        },
        Utc::now(),
    );
    repository.books.create(&book, None).await.unwrap()
}

#[tokio::test]
#[ignore]
async fn test_loan_round_trip() {
    let repository = Repository::new(pool().await);
    let service = loans_service(&repository);
    let book = add_book(&repository).await;

    let loan = service.create_loan(&book.id, "pg-user").await.unwrap();
    let lent = repository.books.find_by_id(&book.id, None).await.unwrap().unwrap();
    assert!(!lent.is_available);

    let returned = service.return_loan(&loan.id).await.unwrap();
    assert_eq!(returned.id, loan.id);
    let back = repository.books.find_by_id(&book.id, None).await.unwrap().unwrap();
    assert!(back.is_available);

    let again = service.return_loan(&loan.id).await;
    assert!(matches!(again, Err(AppError::AlreadyReturned(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_borrowers_exactly_one_wins() {
    let repository = Repository::new(pool().await);
    let service = loans_service(&repository);
    let book = add_book(&repository).await;

    let handles: Vec<_> = (0..6)
        .map(|i| {
            let service = service.clone();
            let book_id = book.id.clone();
            tokio::spawn(async move {
                service
                    .create_loan(&book_id, &format!("pg-user-{}", i))
                    .await
            })
        })
        .collect();

    let mut won = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => won += 1,
            Err(AppError::BookUnavailable(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }
    assert_eq!(won, 1);
}

#[tokio::test]
#[ignore]
async fn test_book_on_loan_cannot_be_deleted() {
    let repository = Repository::new(pool().await);
    let catalog = CatalogService::new(
        repository.books.clone(),
        repository.transactions.clone(),
        Arc::new(UuidGenerator),
    );
    let book = add_book(&repository).await;
    loans_service(&repository)
        .create_loan(&book.id, "pg-user")
        .await
        .unwrap();

    let result = catalog.delete_book(&book.id).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}
