pub mod models;
pub mod schema;

use chrono::{NaiveDate, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use models::{NewPoints, NewSession, Points};

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;

        // Run pending Diesel migrations on startup (auto-init empty DBs)
        {
            let pool_clone = pool.clone();
            tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
                const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
                let mut conn = pool_clone.get()?;
                configure_sqlite_conn(&mut conn)?;
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(())
            })
            .await??;
        }

        Ok(Store { pool })
    }

    pub async fn create_points(
        &self,
        owner: &str,
        date: NaiveDate,
        exercise: i32,
        meals: i32,
        alcohol: i32,
    ) -> Result<Points, StorageError> {
        use schema::points;
        let pool = self.pool.clone();
        let owner = owner.to_string();
        tokio::task::spawn_blocking(move || -> Result<Points, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let new_row = NewPoints {
                username: &owner,
                date,
                exercise,
                meals,
                alcohol,
            };
            Ok(diesel::insert_into(points::table)
                .values(&new_row)
                .get_result::<Points>(&mut conn)?)
        })
        .await?
    }

    /// Full replacement of an existing record. Returns `None` when no row
    /// with the given id exists.
    pub async fn update_points(&self, record: Points) -> Result<Option<Points>, StorageError> {
        use schema::points::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<Points>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let updated = diesel::update(points.filter(id.eq(record.id)))
                .set(&record)
                .execute(&mut conn)?;
            if updated == 0 {
                return Ok(None);
            }
            Ok(points
                .filter(id.eq(record.id))
                .first::<Points>(&mut conn)
                .optional()?)
        })
        .await?
    }

    pub async fn get_points(&self, points_id: i32) -> Result<Option<Points>, StorageError> {
        use schema::points::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<Points>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(points
                .filter(id.eq(points_id))
                .first::<Points>(&mut conn)
                .optional()?)
        })
        .await?
    }

    pub async fn delete_points(&self, points_id: i32) -> Result<bool, StorageError> {
        use schema::points::dsl::*;
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<bool, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let deleted = diesel::delete(points.filter(id.eq(points_id))).execute(&mut conn)?;
            Ok(deleted > 0)
        })
        .await?
    }

    /// Paginated fetch of all records, newest date first. Returns the page
    /// plus the total row count for pagination headers.
    pub async fn list_points(
        &self,
        page: usize,
        per_page: usize,
    ) -> Result<(Vec<Points>, i64), StorageError> {
        use schema::points::dsl::*;
        let pool = self.pool.clone();
        let (offset, limit) = page_bounds(page, per_page);
        tokio::task::spawn_blocking(move || -> Result<(Vec<Points>, i64), StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let total: i64 = points.count().get_result(&mut conn)?;
            let rows = points
                .order((date.desc(), id.desc()))
                .offset(offset)
                .limit(limit)
                .load::<Points>(&mut conn)?;
            Ok((rows, total))
        })
        .await?
    }

    /// Paginated fetch scoped to a single owner.
    pub async fn list_points_for_user(
        &self,
        owner: &str,
        page: usize,
        per_page: usize,
    ) -> Result<(Vec<Points>, i64), StorageError> {
        use schema::points::dsl::*;
        let pool = self.pool.clone();
        let owner = owner.to_string();
        let (offset, limit) = page_bounds(page, per_page);
        tokio::task::spawn_blocking(move || -> Result<(Vec<Points>, i64), StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let total: i64 = points
                .filter(username.eq(&owner))
                .count()
                .get_result(&mut conn)?;
            let rows = points
                .filter(username.eq(&owner))
                .order((date.desc(), id.desc()))
                .offset(offset)
                .limit(limit)
                .load::<Points>(&mut conn)?;
            Ok((rows, total))
        })
        .await?
    }

    /// All of an owner's records dated within `[from, to]` inclusive.
    pub async fn points_between(
        &self,
        owner: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Points>, StorageError> {
        use schema::points::dsl::*;
        if to < from {
            return Err(StorageError::InvalidInput(format!(
                "invalid date range: {} > {}",
                from, to
            )));
        }
        let pool = self.pool.clone();
        let owner = owner.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<Points>, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            Ok(points
                .filter(username.eq(&owner))
                .filter(date.ge(from))
                .filter(date.le(to))
                .order(date.asc())
                .load::<Points>(&mut conn)?)
        })
        .await?
    }

    // Session helpers for JWT inactivity windows
    pub async fn create_session(&self, jti_: &str, username_: &str) -> Result<(), StorageError> {
        use schema::sessions;
        let pool = self.pool.clone();
        let j = jti_.to_string();
        let u = username_.to_string();
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let new = NewSession {
                jti: &j,
                username: &u,
            };
            diesel::insert_into(sessions::table)
                .values(&new)
                .on_conflict_do_nothing()
                .execute(&mut conn)?;
            Ok(())
        })
        .await?
    }

    pub async fn delete_session(&self, jti_: &str) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let pool = self.pool.clone();
        let j = jti_.to_string();
        tokio::task::spawn_blocking(move || -> Result<bool, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let deleted = diesel::delete(sessions.filter(jti.eq(&j))).execute(&mut conn)?;
            Ok(deleted > 0)
        })
        .await?
    }

    /// Touch session atomically, but only if it hasn't expired.
    /// Returns `true` if the session was found and updated, `false` otherwise.
    ///
    /// This combines the idle timeout check and the `last_used_at` update into
    /// a single atomic UPDATE, eliminating the race condition between checking
    /// and updating the session.
    pub async fn touch_session_with_cutoff(
        &self,
        jti_: &str,
        cutoff: chrono::NaiveDateTime,
    ) -> Result<bool, StorageError> {
        use schema::sessions::dsl::*;
        let pool = self.pool.clone();
        let j = jti_.to_string();
        tokio::task::spawn_blocking(move || -> Result<bool, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            let now = Utc::now().naive_utc();
            let updated =
                diesel::update(sessions.filter(jti.eq(&j)).filter(last_used_at.ge(cutoff)))
                    .set(last_used_at.eq(now))
                    .execute(&mut conn)?;
            Ok(updated > 0)
        })
        .await?
    }
}

fn page_bounds(page: usize, per_page: usize) -> (i64, i64) {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 1000) as i64;
    let offset = ((page as i64) - 1) * per_page;
    (offset, per_page)
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Enable WAL for better read/write concurrency and set a busy timeout
    // Ignore the result rows; Diesel's execute is fine for PRAGMAs
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_clamp_and_offset() {
        assert_eq!(page_bounds(0, 20), (0, 20));
        assert_eq!(page_bounds(1, 20), (0, 20));
        assert_eq!(page_bounds(3, 10), (20, 10));
        assert_eq!(page_bounds(1, 0), (0, 1));
        assert_eq!(page_bounds(1, 10_000), (0, 1000));
    }
}
