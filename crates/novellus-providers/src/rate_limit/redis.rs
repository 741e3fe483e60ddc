//! Redis-backed rate limiter
//!
//! Fixed-window counters shared across processes. One Lua script checks
//! and increments all three windows atomically, so multi-node deployments
//! cannot jointly exceed a model's declared limits.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use novellus_domain::entities::RateLimits;
use novellus_domain::error::{Error, Result};
use novellus_domain::ports::providers::{Admission, RateLimiterProvider, RateUsage};
use novellus_domain::registry::rate_limiter::{
    RATE_LIMITER_PROVIDERS, RateLimiterProviderConfig, RateLimiterProviderEntry,
};
use novellus_domain::value_objects::ModelId;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

const MINUTE_SECS: i64 = 60;
const DAY_SECS: i64 = 86_400;
// Window keys outlive their window slightly so reconcile can still land.
const MINUTE_TTL: i64 = 120;
const DAY_TTL: i64 = DAY_SECS + 3600;

/// Return codes from the acquire script.
const ADMIT: i64 = 0;
const DENY_RPM: i64 = 1;
const DENY_TPM: i64 = 2;
const DENY_RPD: i64 = 3;

const ACQUIRE_SCRIPT: &str = "
local est = tonumber(ARGV[1])
local rpm_limit = tonumber(ARGV[2])
local tpm_limit = tonumber(ARGV[3])
local rpd_limit = tonumber(ARGV[4])
local rpm = tonumber(redis.call('GET', KEYS[1]) or '0')
local tpm = tonumber(redis.call('GET', KEYS[2]) or '0')
local rpd = tonumber(redis.call('GET', KEYS[3]) or '0')
if rpm_limit > 0 and rpm + 1 > rpm_limit then return 1 end
if tpm_limit > 0 and tpm + est > tpm_limit then return 2 end
if rpd_limit > 0 and rpd + 1 > rpd_limit then return 3 end
redis.call('INCRBY', KEYS[1], 1)
redis.call('EXPIRE', KEYS[1], tonumber(ARGV[5]))
redis.call('INCRBY', KEYS[2], est)
redis.call('EXPIRE', KEYS[2], tonumber(ARGV[5]))
redis.call('INCRBY', KEYS[3], 1)
redis.call('EXPIRE', KEYS[3], tonumber(ARGV[6]))
return 0
";

fn redis_err(e: redis::RedisError) -> Error {
    Error::storage_with_source("redis rate limiter call failed", e)
}

/// Fixed-window distributed rate limiter.
pub struct RedisRateLimiter {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
    limits: DashMap<ModelId, RateLimits>,
    acquire: redis::Script,
}

impl RedisRateLimiter {
    /// Create a limiter against one Redis endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is malformed. The actual
    /// connection is established lazily on first use.
    pub fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::configuration_with_source("invalid redis url", e))?;
        Ok(Self {
            client,
            connection: OnceCell::new(),
            limits: DashMap::new(),
            acquire: redis::Script::new(ACQUIRE_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let manager = self
            .connection
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await
            .map_err(redis_err)?;
        Ok(manager.clone())
    }

    fn model_limits(&self, model: &ModelId) -> Result<RateLimits> {
        self.limits
            .get(model)
            .map(|entry| *entry.value())
            .ok_or_else(|| Error::unknown_model(model.as_str()))
    }

    fn window_keys(model: &ModelId, now: DateTime<Utc>) -> (String, String, String) {
        let minute = now.timestamp() / MINUTE_SECS;
        let day = now.timestamp() / DAY_SECS;
        (
            format!("novellus:rl:{model}:rpm:{minute}"),
            format!("novellus:rl:{model}:tpm:{minute}"),
            format!("novellus:rl:{model}:rpd:{day}"),
        )
    }

    fn next_window_start(now: DateTime<Utc>, window_secs: i64) -> DateTime<Utc> {
        let next = (now.timestamp() / window_secs + 1) * window_secs;
        Utc.timestamp_opt(next, 0)
            .single()
            .unwrap_or_else(|| now + chrono::Duration::seconds(window_secs))
    }
}

#[async_trait]
impl RateLimiterProvider for RedisRateLimiter {
    async fn register_model(&self, model: &ModelId, limits: RateLimits) -> Result<()> {
        self.limits.insert(model.clone(), limits);
        Ok(())
    }

    async fn try_acquire(&self, model: &ModelId, estimated_tokens: u64) -> Result<Admission> {
        let limits = self.model_limits(model)?;
        let now = Utc::now();
        let (rpm_key, tpm_key, rpd_key) = Self::window_keys(model, now);
        let mut connection = self.connection().await?;

        let verdict: i64 = self
            .acquire
            .key(&rpm_key)
            .key(&tpm_key)
            .key(&rpd_key)
            .arg(estimated_tokens)
            .arg(limits.rpm)
            .arg(limits.tpm)
            .arg(limits.rpd)
            .arg(MINUTE_TTL)
            .arg(DAY_TTL)
            .invoke_async(&mut connection)
            .await
            .map_err(redis_err)?;

        match verdict {
            ADMIT => Ok(Admission::Admitted),
            DENY_RPM | DENY_TPM => Ok(Admission::Denied {
                retry_at: Self::next_window_start(now, MINUTE_SECS),
            }),
            DENY_RPD => Ok(Admission::Denied {
                retry_at: Self::next_window_start(now, DAY_SECS),
            }),
            other => Err(Error::storage(format!(
                "unexpected acquire verdict {other}"
            ))),
        }
    }

    async fn would_admit(&self, model: &ModelId, estimated_tokens: u64) -> Result<bool> {
        let limits = self.model_limits(model)?;
        let (rpm_key, tpm_key, rpd_key) = Self::window_keys(model, Utc::now());
        let mut connection = self.connection().await?;

        let (rpm, tpm, rpd): (Option<u64>, Option<u64>, Option<u64>) = redis::cmd("MGET")
            .arg(&rpm_key)
            .arg(&tpm_key)
            .arg(&rpd_key)
            .query_async(&mut connection)
            .await
            .map_err(redis_err)?;

        let rpm_ok = limits.rpm == 0 || rpm.unwrap_or(0) + 1 <= u64::from(limits.rpm);
        let tpm_ok =
            limits.tpm == 0 || tpm.unwrap_or(0) + estimated_tokens <= u64::from(limits.tpm);
        let rpd_ok = limits.rpd == 0 || rpd.unwrap_or(0) + 1 <= u64::from(limits.rpd);
        Ok(rpm_ok && tpm_ok && rpd_ok)
    }

    async fn reconcile(
        &self,
        model: &ModelId,
        estimated_tokens: u64,
        actual_tokens: u64,
    ) -> Result<RateUsage> {
        let limits = self.model_limits(model)?;
        let (rpm_key, tpm_key, rpd_key) = Self::window_keys(model, Utc::now());
        let mut connection = self.connection().await?;

        if actual_tokens != estimated_tokens {
            let delta = actual_tokens as i64 - estimated_tokens as i64;
            let _: i64 = redis::cmd("INCRBY")
                .arg(&tpm_key)
                .arg(delta)
                .query_async(&mut connection)
                .await
                .map_err(redis_err)?;
        }

        let (rpm, tpm, rpd): (Option<u64>, Option<u64>, Option<u64>) = redis::cmd("MGET")
            .arg(&rpm_key)
            .arg(&tpm_key)
            .arg(&rpd_key)
            .query_async(&mut connection)
            .await
            .map_err(redis_err)?;

        let tokens_this_minute = tpm.unwrap_or(0);
        Ok(RateUsage {
            requests_this_minute: rpm.unwrap_or(0),
            tokens_this_minute,
            requests_today: rpd.unwrap_or(0),
            overdrawn: limits.tpm > 0 && tokens_this_minute > u64::from(limits.tpm),
        })
    }

    async fn usage(&self, model: &ModelId) -> Result<Option<RateUsage>> {
        if !self.limits.contains_key(model) {
            return Ok(None);
        }
        let limits = self.model_limits(model)?;
        let (rpm_key, tpm_key, rpd_key) = Self::window_keys(model, Utc::now());
        let mut connection = self.connection().await?;

        let (rpm, tpm, rpd): (Option<u64>, Option<u64>, Option<u64>) = redis::cmd("MGET")
            .arg(&rpm_key)
            .arg(&tpm_key)
            .arg(&rpd_key)
            .query_async(&mut connection)
            .await
            .map_err(redis_err)?;

        let tokens_this_minute = tpm.unwrap_or(0);
        Ok(Some(RateUsage {
            requests_this_minute: rpm.unwrap_or(0),
            tokens_this_minute,
            requests_today: rpd.unwrap_or(0),
            overdrawn: limits.tpm > 0 && tokens_this_minute > u64::from(limits.tpm),
        }))
    }

    fn provider_name(&self) -> &str {
        "redis"
    }
}

fn redis_rate_limiter_factory(
    config: &RateLimiterProviderConfig,
) -> std::result::Result<Arc<dyn RateLimiterProvider>, String> {
    let redis_url = config
        .redis_url
        .clone()
        .ok_or_else(|| "Redis rate limiter requires redis_url in config".to_owned())?;
    let limiter = RedisRateLimiter::connect(&redis_url).map_err(|e| e.to_string())?;
    Ok(Arc::new(limiter))
}

#[linkme::distributed_slice(RATE_LIMITER_PROVIDERS)]
static REDIS_PROVIDER: RateLimiterProviderEntry = RateLimiterProviderEntry {
    name: "redis",
    description: "Redis fixed-window distributed rate limiter",
    build: redis_rate_limiter_factory,
};
