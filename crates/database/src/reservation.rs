//! Reservation CRUD operations.

use std::fmt;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::error::{DatabaseError, Result};
use crate::models::{NewReservation, Reservation, ReservationStats, ReservationStatus};

/// Default number of rows returned by [`list_reservations`].
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Upper bound on rows returned by [`list_reservations`].
pub const MAX_LIST_LIMIT: i64 = 1000;

/// Current UTC time as a fixed-width RFC 3339 string.
///
/// Fixed microsecond precision keeps lexical and chronological order equal.
pub fn now_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Insert a confirmed reservation unless capacity is already reached.
///
/// The capacity check and the insert run as one statement, so concurrent
/// submissions cannot push the confirmed count past `capacity`.
pub async fn insert_if_capacity(
    pool: &SqlitePool,
    new: &NewReservation,
    capacity: i64,
) -> Result<Reservation> {
    let id = Uuid::new_v4().to_string();
    let now = now_timestamp();

    let inserted = sqlx::query_as::<_, Reservation>(
        r#"
        INSERT INTO reservations
            (id, name, affiliation, favorite, email, status, reservation_date, created_at, line_user_id)
        SELECT ?, ?, ?, ?, ?, 'confirmed', ?, ?, ?
        WHERE (SELECT COUNT(*) FROM reservations WHERE status = 'confirmed') < ?
        RETURNING id, name, affiliation, favorite, email, status,
                  reservation_date, created_at, cancelled_at, line_user_id
        "#,
    )
    .bind(&id)
    .bind(&new.name)
    .bind(&new.affiliation)
    .bind(&new.favorite)
    .bind(&new.email)
    .bind(&now)
    .bind(&now)
    .bind(&new.line_user_id)
    .bind(capacity)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return DatabaseError::AlreadyExists {
                    entity: "Reservation",
                    id: id.clone(),
                };
            }
        }
        DatabaseError::Sqlx(e)
    })?;

    inserted.ok_or(DatabaseError::CapacityExceeded { capacity })
}

/// Get a reservation by ID.
pub async fn get_reservation(pool: &SqlitePool, id: &str) -> Result<Reservation> {
    sqlx::query_as::<_, Reservation>(
        r#"
        SELECT id, name, affiliation, favorite, email, status,
               reservation_date, created_at, cancelled_at, line_user_id
        FROM reservations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Reservation",
        id: id.to_string(),
    })
}

/// Get a reservation matching both ID and (already normalized) email.
///
/// A mismatch on either field is reported the same way as a missing row.
pub async fn find_by_id_and_email(pool: &SqlitePool, id: &str, email: &str) -> Result<Reservation> {
    sqlx::query_as::<_, Reservation>(
        r#"
        SELECT id, name, affiliation, favorite, email, status,
               reservation_date, created_at, cancelled_at, line_user_id
        FROM reservations
        WHERE id = ? AND email = ?
        "#,
    )
    .bind(id)
    .bind(email)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Reservation",
        id: id.to_string(),
    })
}

/// Move a confirmed reservation to `cancelled`, stamping `cancelled_at`.
///
/// Rows that are already cancelled are left untouched.
pub async fn cancel_reservation(pool: &SqlitePool, id: &str, cancelled_at: &str) -> Result<Reservation> {
    let updated = sqlx::query_as::<_, Reservation>(
        r#"
        UPDATE reservations
        SET status = 'cancelled', cancelled_at = ?
        WHERE id = ? AND status = 'confirmed'
        RETURNING id, name, affiliation, favorite, email, status,
                  reservation_date, created_at, cancelled_at, line_user_id
        "#,
    )
    .bind(cancelled_at)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(reservation) => Ok(reservation),
        None => {
            // Distinguish "gone" from "lost the race to another cancel".
            get_reservation(pool, id).await?;
            Err(DatabaseError::AlreadyCancelled { id: id.to_string() })
        }
    }
}

/// Attach a LINE user ID to a reservation without touching its status.
pub async fn link_line_user(pool: &SqlitePool, id: &str, line_user_id: &str) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE reservations
        SET line_user_id = ?
        WHERE id = ?
        "#,
    )
    .bind(line_user_id)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "Reservation",
            id: id.to_string(),
        });
    }

    Ok(())
}

/// Newest confirmed reservation linked to a LINE user.
pub async fn latest_confirmed_for_line_user(
    pool: &SqlitePool,
    line_user_id: &str,
) -> Result<Option<Reservation>> {
    let reservation = sqlx::query_as::<_, Reservation>(
        r#"
        SELECT id, name, affiliation, favorite, email, status,
               reservation_date, created_at, cancelled_at, line_user_id
        FROM reservations
        WHERE line_user_id = ? AND status = 'confirmed'
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(line_user_id)
    .fetch_optional(pool)
    .await?;

    Ok(reservation)
}

/// Columns the list endpoint may sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CreatedAt,
    ReservationDate,
    CancelledAt,
    Name,
    Affiliation,
    Favorite,
    Email,
    Status,
}

impl SortField {
    /// Database column name for this field.
    pub fn column_name(&self) -> &'static str {
        match self {
            SortField::CreatedAt => "created_at",
            SortField::ReservationDate => "reservation_date",
            SortField::CancelledAt => "cancelled_at",
            SortField::Name => "name",
            SortField::Affiliation => "affiliation",
            SortField::Favorite => "favorite",
            SortField::Email => "email",
            SortField::Status => "status",
        }
    }

    fn from_column(s: &str) -> Option<Self> {
        match s {
            "created_at" => Some(SortField::CreatedAt),
            "reservation_date" => Some(SortField::ReservationDate),
            "cancelled_at" => Some(SortField::CancelledAt),
            "name" => Some(SortField::Name),
            "affiliation" => Some(SortField::Affiliation),
            "favorite" => Some(SortField::Favorite),
            "email" => Some(SortField::Email),
            "status" => Some(SortField::Status),
            _ => None,
        }
    }
}

/// Sort specification, written as `field` or `-field` for descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub descending: bool,
}

impl SortOrder {
    /// Parse `created_at` / `-created_at` style values.
    ///
    /// Returns `None` for unknown columns.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (descending, column) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };

        SortField::from_column(column).map(|field| Self { field, descending })
    }
}

impl Default for SortOrder {
    /// Newest first.
    fn default() -> Self {
        Self {
            field: SortField::CreatedAt,
            descending: true,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.descending {
            write!(f, "-{}", self.field.column_name())
        } else {
            f.write_str(self.field.column_name())
        }
    }
}

/// Filter, sort and limit for [`list_reservations`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    /// `None` lists every status.
    pub status: Option<ReservationStatus>,
    pub sort: SortOrder,
    pub limit: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            sort: SortOrder::default(),
            limit: DEFAULT_LIST_LIMIT,
        }
    }
}

/// List reservations with optional status filter, sort and limit.
pub async fn list_reservations(pool: &SqlitePool, query: &ListQuery) -> Result<Vec<Reservation>> {
    let mut builder = QueryBuilder::<Sqlite>::new(
        "SELECT id, name, affiliation, favorite, email, status, \
         reservation_date, created_at, cancelled_at, line_user_id \
         FROM reservations",
    );

    if let Some(status) = query.status {
        builder.push(" WHERE status = ").push_bind(status.as_str());
    }

    builder
        .push(" ORDER BY ")
        .push(query.sort.field.column_name())
        .push(if query.sort.descending { " DESC" } else { " ASC" })
        .push(", id ASC LIMIT ")
        .push_bind(query.limit.clamp(0, MAX_LIST_LIMIT));

    let reservations = builder
        .build_query_as::<Reservation>()
        .fetch_all(pool)
        .await?;

    Ok(reservations)
}

/// Count reservations, optionally restricted to one status.
pub async fn count_reservations(pool: &SqlitePool, status: Option<ReservationStatus>) -> Result<i64> {
    let count = match status {
        Some(status) => {
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*) FROM reservations WHERE status = ?
                "#,
            )
            .bind(status.as_str())
            .fetch_one(pool)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, i64>(
                r#"
                SELECT COUNT(*) FROM reservations
                "#,
            )
            .fetch_one(pool)
            .await?
        }
    };

    Ok(count)
}

/// Unfiltered totals plus remaining capacity.
pub async fn reservation_stats(pool: &SqlitePool, capacity: i64) -> Result<ReservationStats> {
    let (total, confirmed, cancelled) = sqlx::query_as::<_, (i64, i64, i64)>(
        r#"
        SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN status = 'confirmed' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END), 0)
        FROM reservations
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(ReservationStats {
        total,
        confirmed,
        cancelled,
        remaining: (capacity - confirmed).max(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect_with_pool_size("sqlite::memory:", 1).await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn new_reservation(name: &str, email: &str) -> NewReservation {
        NewReservation {
            name: name.to_string(),
            affiliation: "大学".to_string(),
            favorite: "音楽".to_string(),
            email: email.to_string(),
            line_user_id: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;

        let created = insert_if_capacity(db.pool(), &new_reservation("田中", "a@b.com"), 20)
            .await
            .unwrap();
        assert_eq!(created.status, ReservationStatus::Confirmed);
        assert!(created.cancelled_at.is_none());
        assert_eq!(created.created_at, created.reservation_date);

        let fetched = get_reservation(db.pool(), &created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_insert_rejected_at_capacity() {
        let db = test_db().await;

        for i in 0..3 {
            let email = format!("user{}@example.com", i);
            insert_if_capacity(db.pool(), &new_reservation("user", &email), 3)
                .await
                .unwrap();
        }

        let result = insert_if_capacity(db.pool(), &new_reservation("late", "late@example.com"), 3).await;
        assert!(matches!(result, Err(DatabaseError::CapacityExceeded { capacity: 3 })));
        assert_eq!(count_reservations(db.pool(), None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_rows_free_capacity() {
        let db = test_db().await;

        let first = insert_if_capacity(db.pool(), &new_reservation("a", "a@example.com"), 1)
            .await
            .unwrap();
        assert!(insert_if_capacity(db.pool(), &new_reservation("b", "b@example.com"), 1)
            .await
            .is_err());

        cancel_reservation(db.pool(), &first.id, &now_timestamp()).await.unwrap();

        assert!(insert_if_capacity(db.pool(), &new_reservation("b", "b@example.com"), 1)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_find_by_id_and_email_mismatch() {
        let db = test_db().await;
        let created = insert_if_capacity(db.pool(), &new_reservation("a", "a@example.com"), 20)
            .await
            .unwrap();

        assert!(find_by_id_and_email(db.pool(), &created.id, "a@example.com").await.is_ok());
        assert!(matches!(
            find_by_id_and_email(db.pool(), &created.id, "other@example.com").await,
            Err(DatabaseError::NotFound { .. })
        ));
        assert!(matches!(
            find_by_id_and_email(db.pool(), "missing", "a@example.com").await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_is_one_way() {
        let db = test_db().await;
        let created = insert_if_capacity(db.pool(), &new_reservation("a", "a@example.com"), 20)
            .await
            .unwrap();

        let cancelled = cancel_reservation(db.pool(), &created.id, "2024-11-20T00:00:00.000000Z")
            .await
            .unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(cancelled.cancelled_at.as_deref(), Some("2024-11-20T00:00:00.000000Z"));

        let again = cancel_reservation(db.pool(), &created.id, "2024-11-21T00:00:00.000000Z").await;
        assert!(matches!(again, Err(DatabaseError::AlreadyCancelled { .. })));

        // Timestamp from the first cancellation is preserved.
        let fetched = get_reservation(db.pool(), &created.id).await.unwrap();
        assert_eq!(fetched.cancelled_at.as_deref(), Some("2024-11-20T00:00:00.000000Z"));

        let missing = cancel_reservation(db.pool(), "missing", &now_timestamp()).await;
        assert!(matches!(missing, Err(DatabaseError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_link_line_user_keeps_status() {
        let db = test_db().await;
        let created = insert_if_capacity(db.pool(), &new_reservation("a", "a@example.com"), 20)
            .await
            .unwrap();

        link_line_user(db.pool(), &created.id, "U123").await.unwrap();

        let fetched = get_reservation(db.pool(), &created.id).await.unwrap();
        assert_eq!(fetched.line_user_id.as_deref(), Some("U123"));
        assert_eq!(fetched.status, ReservationStatus::Confirmed);

        let latest = latest_confirmed_for_line_user(db.pool(), "U123").await.unwrap();
        assert_eq!(latest.map(|r| r.id), Some(created.id.clone()));

        cancel_reservation(db.pool(), &created.id, &now_timestamp()).await.unwrap();
        assert!(latest_confirmed_for_line_user(db.pool(), "U123").await.unwrap().is_none());

        assert!(matches!(
            link_line_user(db.pool(), "missing", "U123").await,
            Err(DatabaseError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_filter_sort_limit() {
        let db = test_db().await;
        let mut ids = Vec::new();
        for name in ["carol", "alice", "bob"] {
            let email = format!("{}@example.com", name);
            let r = insert_if_capacity(db.pool(), &new_reservation(name, &email), 20)
                .await
                .unwrap();
            ids.push(r.id);
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        cancel_reservation(db.pool(), &ids[1], &now_timestamp()).await.unwrap();

        // Default: newest first
        let all = list_reservations(db.pool(), &ListQuery::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["bob", "alice", "carol"]);

        let by_name = ListQuery {
            sort: SortOrder::parse("name").unwrap(),
            ..ListQuery::default()
        };
        let sorted = list_reservations(db.pool(), &by_name).await.unwrap();
        let names: Vec<_> = sorted.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);

        let confirmed = ListQuery {
            status: Some(ReservationStatus::Confirmed),
            ..ListQuery::default()
        };
        let rows = list_reservations(db.pool(), &confirmed).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.id != ids[1]));

        let limited = ListQuery {
            limit: 1,
            ..ListQuery::default()
        };
        assert_eq!(list_reservations(db.pool(), &limited).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stats() {
        let db = test_db().await;
        let a = insert_if_capacity(db.pool(), &new_reservation("a", "a@example.com"), 20)
            .await
            .unwrap();
        insert_if_capacity(db.pool(), &new_reservation("b", "b@example.com"), 20)
            .await
            .unwrap();
        cancel_reservation(db.pool(), &a.id, &now_timestamp()).await.unwrap();

        let stats = reservation_stats(db.pool(), 20).await.unwrap();
        assert_eq!(
            stats,
            ReservationStats {
                total: 2,
                confirmed: 1,
                cancelled: 1,
                remaining: 19,
            }
        );

        // Never negative.
        assert_eq!(reservation_stats(db.pool(), 0).await.unwrap().remaining, 0);
        assert_eq!(
            count_reservations(db.pool(), Some(ReservationStatus::Cancelled)).await.unwrap(),
            1
        );
    }

    #[test]
    fn test_sort_order_parse() {
        assert_eq!(SortOrder::parse("-created_at"), Some(SortOrder::default()));
        assert_eq!(
            SortOrder::parse("name"),
            Some(SortOrder {
                field: SortField::Name,
                descending: false,
            })
        );
        assert_eq!(SortOrder::parse("id; DROP TABLE reservations"), None);
        assert_eq!(SortOrder::default().to_string(), "-created_at");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_inserts_stop_at_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}?mode=rwc", dir.path().join("reservations.db").display());
        let db = Database::connect(&url).await.unwrap();
        db.migrate().await.unwrap();

        let handles: Vec<_> = (0..40)
            .map(|i| {
                let pool = db.pool().clone();
                tokio::spawn(async move {
                    let new = new_reservation(&format!("guest{}", i), &format!("guest{}@example.com", i));
                    insert_if_capacity(&pool, &new, 20).await
                })
            })
            .collect();

        let mut created = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(DatabaseError::CapacityExceeded { capacity }) => {
                    assert_eq!(capacity, 20);
                    rejected += 1;
                }
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert_eq!(created, 20);
        assert_eq!(rejected, 20);
        assert_eq!(
            count_reservations(db.pool(), Some(ReservationStatus::Confirmed)).await.unwrap(),
            20
        );
        db.close().await;
    }
}
