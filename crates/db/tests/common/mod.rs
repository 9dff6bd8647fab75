//! Shared fixtures for store integration tests.

#![allow(dead_code)]

use corebank_db::entities::{accounts, users};
use corebank_db::migration::{Migrator, MigratorTrait};
use corebank_db::{CreateAccountParams, CreateUserParams, Store};
use fake::Fake;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

/// Fresh in-memory SQLite database with all migrations applied.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub async fn setup_store() -> Store {
    Store::new(setup_db().await)
}

pub fn user_params(username: &str) -> CreateUserParams {
    CreateUserParams {
        username: username.to_string(),
        hashed_password: "$argon2id$test_hash".to_string(),
        full_name: Name().fake(),
        email: format!("{username}.{}", SafeEmail().fake::<String>()),
    }
}

pub async fn create_user(store: &Store, username: &str) -> users::Model {
    store
        .queries()
        .create_user(user_params(username))
        .await
        .expect("Failed to create user")
}

pub async fn create_account(store: &Store, owner: &str, balance: i64) -> accounts::Model {
    store
        .queries()
        .create_account(CreateAccountParams {
            owner: owner.to_string(),
            balance,
            currency: "USD".to_string(),
        })
        .await
        .expect("Failed to create account")
}
