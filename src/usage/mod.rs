//! Dual-store usage ledger
//!
//! The `usage_counters` table is authoritative: every admission decision is
//! made inside a store transaction holding an exclusive lock on the counter
//! row. The counter cache is a best-effort duplicate serving cheap estimates;
//! its entries expire at the natural end of their period bucket.

use crate::cache::CounterCache;
use crate::database::entities::usage_counters;
use crate::database::DatabaseError;
use crate::error::AppError;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, TimeZone, Timelike, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseBackend, DatabaseConnection,
    DatabaseTransaction, DbErr, EntityTrait, QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Ten years, the TTL sentinel for the `forever` period
const FOREVER_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Time window identity for a counter. A new window is logically a new,
/// independent counter starting at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Hour,
    Day,
    Month,
    Forever,
}

impl Period {
    /// Bucket suffix for the window containing `now`
    pub fn bucket_at(&self, now: DateTime<Utc>) -> String {
        match self {
            Period::Hour => now.format("%Y-%m-%dT%H").to_string(),
            Period::Day => now.format("%Y-%m-%d").to_string(),
            Period::Month => now.format("%Y-%m").to_string(),
            Period::Forever => "forever".to_string(),
        }
    }

    /// Seconds until the bucket's natural end, minimum one second
    pub fn ttl_at(&self, now: DateTime<Utc>) -> Duration {
        let end = match self {
            Period::Forever => return Duration::from_secs(FOREVER_TTL_SECS),
            Period::Hour => {
                let start_of_hour = now
                    .date_naive()
                    .and_hms_opt(now.hour(), 0, 0)
                    .expect("valid hour");
                start_of_hour + ChronoDuration::hours(1)
            }
            Period::Day => {
                let start_of_day = now.date_naive().and_hms_opt(0, 0, 0).expect("valid day");
                start_of_day + ChronoDuration::days(1)
            }
            Period::Month => {
                let (year, month) = if now.month() == 12 {
                    (now.year() + 1, 1)
                } else {
                    (now.year(), now.month() + 1)
                };
                NaiveDate::from_ymd_opt(year, month, 1)
                    .expect("valid month start")
                    .and_hms_opt(0, 0, 0)
                    .expect("valid midnight")
            }
        };

        let end = Utc.from_utc_datetime(&end);
        let secs = (end - now).num_seconds().max(1);
        Duration::from_secs(secs as u64)
    }
}

/// Cache key scheme shared with every other reader of the counter cache
pub fn cache_key(counter: &str, user_id: &str, bucket: &str) -> String {
    format!("usage:{}:{}:{}", counter, user_id, bucket)
}

fn db_err(e: sea_orm::DbErr) -> AppError {
    AppError::Database(DatabaseError::Database(e.to_string()))
}

/// Quota ledger over the authoritative store and the read-through cache
#[derive(Clone)]
pub struct UsageLedger {
    db: DatabaseConnection,
    cache: CounterCache,
}

impl UsageLedger {
    pub fn new(db: DatabaseConnection, cache: CounterCache) -> Self {
        Self { db, cache }
    }

    /// Fast read for one or many counters. Not authoritative: used only for
    /// estimation and batch pre-sizing, never for admission decisions.
    /// Cache misses are filled with one store query and backfilled with a
    /// TTL equal to the remaining life of the bucket.
    pub async fn get_current(
        &self,
        user_id: &str,
        counters: &[&str],
        period: Period,
    ) -> Result<HashMap<String, i64>, AppError> {
        let now = Utc::now();
        let bucket = period.bucket_at(now);

        let keys: Vec<String> = counters
            .iter()
            .map(|c| cache_key(c, user_id, &bucket))
            .collect();
        let cached = self.cache.get_many(&keys).await?;

        let mut result = HashMap::new();
        let mut missing = Vec::new();
        for (counter, value) in counters.iter().zip(cached) {
            match value {
                Some(v) => {
                    result.insert(counter.to_string(), v);
                }
                None => missing.push(*counter),
            }
        }

        if !missing.is_empty() {
            let mut condition = Condition::any();
            for counter in &missing {
                condition = condition.add(
                    Condition::all()
                        .add(usage_counters::Column::UserId.eq(user_id))
                        .add(usage_counters::Column::Counter.eq(*counter))
                        .add(usage_counters::Column::PeriodBucket.eq(bucket.clone())),
                );
            }

            let rows = usage_counters::Entity::find()
                .filter(condition)
                .all(&self.db)
                .await
                .map_err(db_err)?;

            let ttl = period.ttl_at(now);
            for counter in missing {
                let value = rows
                    .iter()
                    .find(|r| r.counter == counter)
                    .map(|r| r.value)
                    .unwrap_or(0);
                result.insert(counter.to_string(), value);
                self.cache
                    .set(&cache_key(counter, user_id, &bucket), value, ttl)
                    .await?;
            }
        }

        Ok(result)
    }

    /// Authoritative consumption: increments by `delta` if that does not
    /// exceed `limit`, inside a transaction holding an exclusive lock on the
    /// counter row. Returns the new value, or `QuotaExceeded`.
    ///
    /// A non-finite `limit` or a non-positive `delta` is a no-op returning 0;
    /// the store is left untouched.
    pub async fn consume(
        &self,
        user_id: &str,
        counter: &str,
        delta: i64,
        limit: f64,
        period: Period,
    ) -> Result<i64, AppError> {
        if !limit.is_finite() {
            warn!(
                user_id,
                counter, limit, "non-finite limit: charge skipped and usage not recorded"
            );
            return Ok(0);
        }
        if delta <= 0 {
            return Ok(0);
        }

        let now = Utc::now();
        let bucket = period.bucket_at(now);

        let txn = self.db.begin().await.map_err(db_err)?;

        let mut row = self.locked_row(&txn, user_id, counter, &bucket).await?;

        if row.is_none() {
            if delta as f64 > limit {
                txn.rollback().await.map_err(db_err)?;
                return Err(AppError::QuotaExceeded {
                    counter: counter.to_string(),
                    attempted: delta,
                    limit,
                });
            }

            // The locked select cannot lock a row that does not exist yet,
            // so a concurrent charge may create it between our select and
            // this insert. ON CONFLICT DO NOTHING detects that: the loser
            // re-locks the winner's committed row and re-applies the limit
            // check instead of surfacing a key violation.
            let inserted = usage_counters::Entity::insert(usage_counters::ActiveModel {
                user_id: Set(user_id.to_string()),
                counter: Set(counter.to_string()),
                period_bucket: Set(bucket.clone()),
                value: Set(delta),
            })
            .on_conflict(
                OnConflict::columns([
                    usage_counters::Column::UserId,
                    usage_counters::Column::Counter,
                    usage_counters::Column::PeriodBucket,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec(&txn)
            .await;

            match inserted {
                Ok(_) => {
                    txn.commit().await.map_err(db_err)?;
                    debug!(user_id, counter, bucket = %bucket, value = delta, "usage charged");
                    self.write_through(user_id, counter, &bucket, delta, period, now)
                        .await;
                    return Ok(delta);
                }
                Err(DbErr::RecordNotInserted) => {
                    row = self.locked_row(&txn, user_id, counter, &bucket).await?;
                }
                Err(e) => return Err(db_err(e)),
            }
        }

        let current = row.map(|r| r.value).unwrap_or(0);
        let attempted = current + delta;
        if attempted as f64 > limit {
            txn.rollback().await.map_err(db_err)?;
            return Err(AppError::QuotaExceeded {
                counter: counter.to_string(),
                attempted,
                limit,
            });
        }

        usage_counters::Entity::update_many()
            .col_expr(
                usage_counters::Column::Value,
                Expr::col(usage_counters::Column::Value).add(delta),
            )
            .filter(usage_counters::Column::UserId.eq(user_id))
            .filter(usage_counters::Column::Counter.eq(counter))
            .filter(usage_counters::Column::PeriodBucket.eq(bucket.clone()))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        debug!(user_id, counter, bucket = %bucket, value = attempted, "usage charged");
        self.write_through(user_id, counter, &bucket, attempted, period, now)
            .await;

        Ok(attempted)
    }

    /// Select the counter row, holding an exclusive row lock on Postgres.
    /// SQLite has no row locks; there the transaction itself serializes
    /// writers.
    async fn locked_row(
        &self,
        txn: &DatabaseTransaction,
        user_id: &str,
        counter: &str,
        bucket: &str,
    ) -> Result<Option<usage_counters::Model>, AppError> {
        let mut select = usage_counters::Entity::find()
            .filter(usage_counters::Column::UserId.eq(user_id))
            .filter(usage_counters::Column::Counter.eq(counter))
            .filter(usage_counters::Column::PeriodBucket.eq(bucket));
        if self.db.get_database_backend() == DatabaseBackend::Postgres {
            select = select.lock_exclusive();
        }
        select.one(txn).await.map_err(db_err)
    }

    /// Best-effort write-through. The charge already committed; a cache
    /// failure here must never undo it. The next get_current miss
    /// self-heals from the store.
    async fn write_through(
        &self,
        user_id: &str,
        counter: &str,
        bucket: &str,
        value: i64,
        period: Period,
        now: DateTime<Utc>,
    ) {
        if let Err(err) = self
            .cache
            .set(&cache_key(counter, user_id, bucket), value, period.ttl_at(now))
            .await
        {
            warn!(
                user_id,
                counter,
                error = %err,
                "usage cache write-through failed; estimates will lag until the next store read"
            );
        }
    }
}
