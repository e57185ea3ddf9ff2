use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Instrument};
use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::interfaces::RateSink;
use crate::observability::metrics::{PERSISTENCE_FAILURES, RATES_PERSISTED};
use crate::observability::tracing::trace_save_rate;
use crate::storage::bootstrap::StorageConnector;
use crate::storage::model::{NewRateDB, RateDB};
use crate::storage::schema::rates;
use crate::types::{NewRate, Rate};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Per-dial bound on establishing pooled connections.
const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// r2d2 rejects a zero connection timeout.
const MIN_DIAL_TIMEOUT: Duration = Duration::from_millis(1);

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Dials Postgres with an r2d2 pool and pings it with `SELECT 1`.
pub struct PgConnector {
    url: String,
    redacted_url: String,
    pool_size: u32,
}

impl PgConnector {
    pub fn new(config: &DatabaseConfig) -> Self {
        PgConnector {
            url: config.url(),
            redacted_url: config.redacted_url(),
            pool_size: config.pool_size.max(1),
        }
    }
}

#[async_trait]
impl StorageConnector for PgConnector {
    type Handle = Arc<PgPool>;

    async fn connect(&self, budget: Duration) -> Result<Arc<PgPool>> {
        let url = self.url.clone();
        let pool_size = self.pool_size;
        let dial_timeout = dial_timeout(budget);

        tokio::task::spawn_blocking(move || -> Result<Arc<PgPool>> {
            let manager = ConnectionManager::<PgConnection>::new(url);
            let pool = Pool::builder()
                .max_size(pool_size)
                .min_idle(Some(1))
                .connection_timeout(dial_timeout)
                .build(manager)
                .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

            let mut conn = pool.get()
                .map_err(|e| Error::ConnectionFailed(e.to_string()))?;
            diesel::sql_query("SELECT 1")
                .execute(&mut conn)
                .map_err(|e| Error::ConnectionFailed(e.to_string()))?;

            Ok(Arc::new(pool))
        })
        .await
        .map_err(|e| Error::TaskFailure(e.to_string()))?
    }

    async fn migrate(&self, handle: &Arc<PgPool>) -> Result<()> {
        let pool = Arc::clone(handle);

        tokio::task::spawn_blocking(move || -> Result<()> {
            info!("Running database migrations");
            let mut conn = pool.get()
                .map_err(|e| Error::Migration(e.to_string()))?;

            let applied = conn.run_pending_migrations(MIGRATIONS).map_err(|e| {
                error!("Database migration failed: {}", e);
                Error::Migration(e.to_string())
            })?;

            if applied.is_empty() {
                info!("No pending migrations to apply");
            } else {
                for version in &applied {
                    info!("Applied migration {}", version);
                }
            }
            Ok(())
        })
        .await
        .map_err(|e| Error::TaskFailure(e.to_string()))?
    }

    fn describe(&self) -> String {
        self.redacted_url.clone()
    }
}

/// The fixed per-dial bound, cut to what is left of the bootstrap deadline.
fn dial_timeout(budget: Duration) -> Duration {
    DIAL_TIMEOUT.min(budget).max(MIN_DIAL_TIMEOUT)
}

/// Append-only rate log in the `rates` table.
pub struct PgRateStore {
    pool: Arc<PgPool>,
}

impl PgRateStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        PgRateStore { pool }
    }

    fn insert(pool: &PgPool, rate: NewRateDB) -> Result<RateDB> {
        let mut conn = pool.get()
            .map_err(|e| Error::Persistence(e.to_string()))?;

        diesel::insert_into(rates::table)
            .values(&rate)
            .returning(RateDB::as_returning())
            .get_result(&mut conn)
            .map_err(|e| Error::Persistence(e.to_string()))
    }
}

#[async_trait]
impl RateSink for PgRateStore {
    async fn save_rate(&self, rate: &NewRate) -> Result<Rate> {
        let span = trace_save_rate();
        span.record("rate.ask", tracing::field::display(rate.ask));
        span.record("rate.bid", tracing::field::display(rate.bid));

        let pool = Arc::clone(&self.pool);
        let row = NewRateDB::from(*rate);

        let result = tokio::task::spawn_blocking(move || Self::insert(&pool, row))
            .instrument(span.clone())
            .await
            .map_err(|e| Error::Persistence(format!("insert task failed: {}", e)))
            .and_then(|inserted| inserted);

        match result {
            Ok(db) => {
                RATES_PERSISTED.inc();
                span.record("rate.id", db.id);
                Ok(Rate::from(db))
            }
            Err(e) => {
                PERSISTENCE_FAILURES.inc();
                span.in_scope(|| error!("Failed to save rate: {}", e));
                Err(e)
            }
        }
    }
}
