use chrono::{Duration, Utc};
use shortcache::domain::entities::NewMapping;
use shortcache::domain::repositories::MappingRepository;
use shortcache::error::AppError;
use shortcache::infrastructure::persistence::PgMappingRepository;
use sqlx::PgPool;
use std::sync::Arc;

async fn insert_aged(pool: &PgPool, code: &str, age_days: i64) {
    sqlx::query("INSERT INTO urls (short_code, target_url, created_at) VALUES ($1, $2, $3)")
        .bind(code)
        .bind("https://example.com/")
        .bind(Utc::now() - Duration::days(age_days))
        .execute(pool)
        .await
        .unwrap();
}

fn new_mapping(code: &str) -> NewMapping {
    NewMapping {
        short_code: code.to_string(),
        target_url: "https://example.com/".to_string(),
    }
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_find(pool: PgPool) {
    let repo = PgMappingRepository::new(Arc::new(pool));

    let created = repo.create(new_mapping("abc123")).await.unwrap();
    assert_eq!(created.short_code, "abc123");
    assert_eq!(created.clicks, 0);
    assert!(!created.expired);

    let found = repo.find_by_code("abc123").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert!(repo.find_by_code("nope00").await.unwrap().is_none());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_code_is_conflict(pool: PgPool) {
    let repo = PgMappingRepository::new(Arc::new(pool));

    repo.create(new_mapping("dup123")).await.unwrap();
    let result = repo.create(new_mapping("dup123")).await;

    assert!(matches!(result, Err(AppError::Conflict { .. })));
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_increments_are_not_lost(pool: PgPool) {
    let repo = Arc::new(PgMappingRepository::new(Arc::new(pool)));
    repo.create(new_mapping("hot123")).await.unwrap();

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.increment_clicks("hot123").await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(repo.add_clicks("hot123", 25).await.unwrap());
    assert_eq!(repo.find_by_code("hot123").await.unwrap().unwrap().clicks, 75);
    assert!(!repo.add_clicks("ghost1", 5).await.unwrap());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_expiry_queries(pool: PgPool) {
    insert_aged(&pool, "old001", 40).await;
    insert_aged(&pool, "old002", 35).await;
    insert_aged(&pool, "young1", 3).await;
    let repo = PgMappingRepository::new(Arc::new(pool));
    let cutoff = Utc::now() - Duration::days(30);

    assert_eq!(repo.count_expirable(cutoff).await.unwrap(), 2);

    let batch = repo.find_expirable(cutoff, 1).await.unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].short_code, "old001");

    assert!(repo.mark_expired("old001").await.unwrap());
    assert!(!repo.mark_expired("old001").await.unwrap());
    assert!(repo.increment_clicks("old001").await.unwrap().is_none());
    assert_eq!(repo.count_expirable(cutoff).await.unwrap(), 1);
}
