//! Daily provider-call budget shared by every worker process.
//!
//! The count lives in an external key-value store keyed by calendar date, so
//! overlapping invocations on different workers see the same number.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;

/// Lifetime of a day's counter.
pub const QUOTA_TTL: Duration = Duration::from_secs(86_400);

const KEY_PREFIX: &str = "spoonacular_calls_";

pub type QuotaResult<T> = Result<T, QuotaError>;

#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("Counter store error: {0}")]
    Store(String),
}

/// Atomic counter storage.
///
/// Implementations must make `incr` atomic across processes.
#[async_trait]
pub trait CallCounter: Send + Sync {
    /// Increment `key` and return the new value. A key created by this call
    /// expires after `ttl`.
    async fn incr(&self, key: &str, ttl: Duration) -> QuotaResult<u64>;

    /// Current value of `key`, zero when absent or expired.
    async fn get(&self, key: &str) -> QuotaResult<u64>;
}

/// Counter key for the given day, e.g. `spoonacular_calls_2025-09-14`.
pub fn quota_key(date: NaiveDate) -> String {
    format!("{KEY_PREFIX}{date}")
}

/// Outcome of reserving one provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaCheck {
    Allowed { calls: u64 },
    Exceeded { calls: u64 },
}

impl QuotaCheck {
    pub fn calls(&self) -> u64 {
        match self {
            Self::Allowed { calls } | Self::Exceeded { calls } => *calls,
        }
    }
}

/// Fixed daily call budget on top of a [`CallCounter`].
#[derive(Clone)]
pub struct DailyQuota {
    counter: Arc<dyn CallCounter>,
    limit: u64,
}

impl DailyQuota {
    pub fn new(counter: Arc<dyn CallCounter>, limit: u64) -> Self {
        Self { counter, limit }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Reserve one call against today's budget.
    pub async fn acquire(&self) -> QuotaResult<QuotaCheck> {
        self.acquire_on(Utc::now().date_naive()).await
    }

    pub async fn acquire_on(&self, date: NaiveDate) -> QuotaResult<QuotaCheck> {
        let calls = self.counter.incr(&quota_key(date), QUOTA_TTL).await?;
        if calls > self.limit {
            tracing::debug!(%date, calls, limit = self.limit, "Daily provider quota exhausted");
            Ok(QuotaCheck::Exceeded { calls })
        } else {
            Ok(QuotaCheck::Allowed { calls })
        }
    }

    /// Calls already spent today.
    pub async fn used(&self) -> QuotaResult<u64> {
        self.used_on(Utc::now().date_naive()).await
    }

    pub async fn used_on(&self, date: NaiveDate) -> QuotaResult<u64> {
        self.counter.get(&quota_key(date)).await
    }
}

/// Process-local counter for tests and single-process setups.
#[derive(Debug, Default)]
pub struct MemoryCallCounter {
    entries: Mutex<HashMap<String, (u64, Instant)>>,
}

impl MemoryCallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a key with an existing count.
    pub async fn set(&self, key: &str, value: u64, ttl: Duration) {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), (value, Instant::now() + ttl));
    }
}

#[async_trait]
impl CallCounter for MemoryCallCounter {
    async fn incr(&self, key: &str, ttl: Duration) -> QuotaResult<u64> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let entry = entries
            .entry(key.to_string())
            .or_insert((0, now + ttl));
        if entry.1 <= now {
            *entry = (0, now + ttl);
        }
        entry.0 += 1;
        Ok(entry.0)
    }

    async fn get(&self, key: &str) -> QuotaResult<u64> {
        let entries = self.entries.lock().await;
        Ok(entries
            .get(key)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(count, _)| *count)
            .unwrap_or(0))
    }
}

#[cfg(feature = "redis")]
pub use redis_counter::RedisCallCounter;

#[cfg(feature = "redis")]
mod redis_counter {
    use std::time::Duration;

    use async_trait::async_trait;
    use redis::aio::ConnectionManager;
    use redis::{AsyncCommands, Script};

    use super::{CallCounter, QuotaError, QuotaResult};

    /// INCR, and set the expiry only when this call created the key.
    const INCR_WITH_TTL: &str = r#"
        local count = redis.call('INCR', KEYS[1])
        if count == 1 then
            redis.call('EXPIRE', KEYS[1], ARGV[1])
        end
        return count
    "#;

    /// Redis-backed counter shared across worker processes.
    #[derive(Clone)]
    pub struct RedisCallCounter {
        conn: ConnectionManager,
    }

    impl RedisCallCounter {
        pub async fn connect(redis_url: &str) -> QuotaResult<Self> {
            let client = redis::Client::open(redis_url)
                .map_err(|e| QuotaError::Store(format!("Redis connection error: {}", e)))?;
            let conn = ConnectionManager::new(client).await.map_err(|e| {
                QuotaError::Store(format!("Redis connection manager error: {}", e))
            })?;
            Ok(Self { conn })
        }
    }

    #[async_trait]
    impl CallCounter for RedisCallCounter {
        async fn incr(&self, key: &str, ttl: Duration) -> QuotaResult<u64> {
            let mut conn = self.conn.clone();
            let count: i64 = Script::new(INCR_WITH_TTL)
                .key(key)
                .arg(ttl.as_secs() as i64)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| QuotaError::Store(e.to_string()))?;
            Ok(count.max(0) as u64)
        }

        async fn get(&self, key: &str) -> QuotaResult<u64> {
            let mut conn = self.conn.clone();
            let count: Option<i64> = conn
                .get(key)
                .await
                .map_err(|e| QuotaError::Store(e.to_string()))?;
            Ok(count.unwrap_or(0).max(0) as u64)
        }
    }
}
