//! Rate limiter implementations (C4).

mod local;
#[cfg(feature = "ratelimit-redis")]
mod redis;

pub use local::LocalRateLimiter;
#[cfg(feature = "ratelimit-redis")]
pub use redis::RedisRateLimiter;
