#[cfg(test)]
use sea_orm::{ConnectOptions, Database, DatabaseConnection};

#[cfg(test)]
pub async fn setup_test_db() -> DatabaseConnection {
    // A single connection keeps every query on the same in-memory database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1);

    let db = Database::connect(opt)
        .await
        .expect("Failed to connect to test database");

    super::connection::setup_database(&db)
        .await
        .expect("Failed to run migrations");

    db
}
