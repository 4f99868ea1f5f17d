//! Key/value + sorted-set substrate used by the store
//!
//! The commands mirror the Redis primitives the store relies on. Each call
//! is a single round trip with per-command consistency; nothing spans calls.

use async_trait::async_trait;

use super::store::StoreError;

/// Inclusive score bound for sorted-set range queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreBound {
    NegInfinity,
    Inclusive(f64),
    PosInfinity,
}

impl ScoreBound {
    /// Whether `score` lies at or above this bound
    pub fn admits_from_below(&self, score: f64) -> bool {
        match self {
            Self::NegInfinity => true,
            Self::Inclusive(bound) => score >= *bound,
            Self::PosInfinity => false,
        }
    }

    /// Whether `score` lies at or below this bound
    pub fn admits_from_above(&self, score: f64) -> bool {
        match self {
            Self::NegInfinity => false,
            Self::Inclusive(bound) => score <= *bound,
            Self::PosInfinity => true,
        }
    }

    /// Redis argument form (`-inf`, `+inf` or the number)
    pub fn to_arg(&self) -> String {
        match self {
            Self::NegInfinity => "-inf".to_string(),
            Self::Inclusive(bound) => bound.to_string(),
            Self::PosInfinity => "+inf".to_string(),
        }
    }
}

/// Hash and sorted-set commands
#[async_trait]
pub trait KeyValueBackend: Send + Sync + 'static {
    /// HGET
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// HMGET; result is positionally aligned with `fields`
    async fn hash_get_many(
        &self,
        key: &str,
        fields: &[String],
    ) -> Result<Vec<Option<String>>, StoreError>;

    /// HSET
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// HSETNX; returns whether the field was written
    async fn hash_set_if_absent(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<bool, StoreError>;

    /// HDEL
    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError>;

    /// ZADD (inserts or rescored)
    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError>;

    /// ZREM
    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// ZRANGEBYSCORE, ascending by score
    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<String>, StoreError>;
}
