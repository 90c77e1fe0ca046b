//! Database fixtures for tests marked `#[ignore]`
//!
//! Each pool gets its own schema so tests can run side by side against the
//! database named by `DATABASE_URL`.

use std::str::FromStr;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn isolated_pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let schema = format!("test_{}", Uuid::new_v4().simple());

    let root = PgPool::connect(&url).await.expect("connect to DATABASE_URL");
    sqlx::query(&format!("CREATE SCHEMA {schema}"))
        .execute(&root)
        .await
        .expect("create test schema");
    root.close().await;

    let options = PgConnectOptions::from_str(&url)
        .expect("parse DATABASE_URL")
        .options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .expect("connect to test schema");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("run migrations");
    pool
}

pub async fn insert_user(db: &PgPool, name: &str, role: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (name, pin_hash, role) VALUES ($1, 'x', $2::user_role) RETURNING id",
    )
    .bind(name)
    .bind(role)
    .fetch_one(db)
    .await
    .expect("insert user")
}
