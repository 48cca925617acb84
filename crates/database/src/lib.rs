//! SQLite persistence layer for event reservations.
//!
//! This crate provides async database operations for the `reservations`
//! table using SQLx with SQLite. The store is the single source of truth for
//! capacity and status.
//!
//! # Example
//!
//! ```no_run
//! use database::{reservation, Database, NewReservation};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:reservations.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     // Create a reservation if seats remain
//!     let new = NewReservation {
//!         name: "田中".to_string(),
//!         affiliation: "大学".to_string(),
//!         favorite: "音楽".to_string(),
//!         email: "A@B.COM".to_string(),
//!         line_user_id: None,
//!     }
//!     .normalized();
//!     let created = reservation::insert_if_capacity(db.pool(), &new, 20).await?;
//!     assert_eq!(created.email, "a@b.com");
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod models;
pub mod reservation;
pub mod validation;

pub use error::{DatabaseError, Result};
pub use models::{normalize_email, NewReservation, Reservation, ReservationStats, ReservationStatus};
pub use reservation::{ListQuery, SortField, SortOrder};
pub use validation::ValidationError;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    const DEFAULT_POOL_SIZE: u32 = 10;

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/reservations.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect_with_pool_size("sqlite::memory:", 1).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    ///
    /// In-memory databases are per-connection, so tests use a pool size of 1.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(std::time::Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1).await.unwrap();
        db.migrate().await.unwrap();
        db.migrate().await.unwrap();

        let count = reservation::count_reservations(db.pool(), None).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_reservation_round_trip() {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1).await.unwrap();
        db.migrate().await.unwrap();

        let new = NewReservation {
            name: " 田中 ".to_string(),
            affiliation: "大学".to_string(),
            favorite: "音楽".to_string(),
            email: "A@B.COM".to_string(),
            line_user_id: Some("U0001".to_string()),
        }
        .normalized();

        let created = reservation::insert_if_capacity(db.pool(), &new, 20).await.unwrap();
        let listed = reservation::list_reservations(db.pool(), &ListQuery::default())
            .await
            .unwrap();

        assert_eq!(listed, vec![created.clone()]);
        assert_eq!(created.name, "田中");
        assert_eq!(created.email, "a@b.com");
        assert_eq!(created.status, ReservationStatus::Confirmed);
        assert_eq!(created.line_user_id.as_deref(), Some("U0001"));
    }
}
