//! Fixtures shared by the repository and ledger tests.

use kardex_core::{NewCategory, NewProduct, Role};

use crate::{Database, DbConfig};

pub async fn test_db() -> Database {
    Database::new(DbConfig::in_memory()).await.unwrap()
}

/// Inserts a user row directly, skipping the slow password hash.
pub async fn seed_user(db: &Database, login: &str, role: Role) -> i64 {
    sqlx::query(
        "INSERT INTO users (login, name, surname, password_hash, role_id) VALUES (?, ?, ?, 'x', ?)",
    )
    .bind(login)
    .bind("Test")
    .bind("User")
    .bind(role.id())
    .execute(db.pool())
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn seed_category(db: &Database, name: &str) -> i64 {
    db.categories()
        .insert(&NewCategory {
            name: name.to_string(),
            description: None,
        })
        .await
        .unwrap()
}

pub async fn seed_product(db: &Database, category_id: i64, tracks_serials: bool) -> i64 {
    db.products()
        .insert(&NewProduct {
            name: if tracks_serials { "Tensiómetro" } else { "Guantes" }.to_string(),
            description: None,
            category_id,
            stock_min: 5,
            stock_max: 100,
            tracks_serials,
        })
        .await
        .unwrap()
}
