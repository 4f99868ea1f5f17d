//! Redis implementation of KeyValueBackend

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::RedisError;
use tracing::{error, instrument};

use super::backend::{KeyValueBackend, ScoreBound};
use super::store::StoreError;
use crate::connection::StoreConnection;

/// Redis implementation of KeyValueBackend
///
/// Each command goes out on a clone of the shared connection manager, which
/// multiplexes concurrent callers over one connection and reconnects on
/// failure.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisBackend {
    pub fn new(connection: &StoreConnection) -> Self {
        Self {
            conn: connection.manager(),
        }
    }
}

fn command_failed(command: &'static str) -> impl FnOnce(RedisError) -> StoreError {
    move |e| {
        error!("Redis {} failed: {}", command, e);
        if e.is_io_error() || e.is_connection_dropped() {
            StoreError::Connection(e.to_string())
        } else {
            StoreError::Database(e.to_string())
        }
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    #[instrument(skip(self))]
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async::<Option<String>>(&mut conn)
            .await
            .map_err(command_failed("HGET"))
    }

    #[instrument(skip(self, names), fields(count = names.len()))]
    async fn hash_get_many(
        &self,
        key: &str,
        names: &[String],
    ) -> Result<Vec<Option<String>>, StoreError> {
        // HMGET rejects an empty field list
        if names.is_empty() {
            return Ok(vec![]);
        }

        let mut conn = self.conn.clone();
        redis::cmd("HMGET")
            .arg(key)
            .arg(names)
            .query_async::<Vec<Option<String>>>(&mut conn)
            .await
            .map_err(command_failed("HMGET"))
    }

    #[instrument(skip(self, value))]
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async::<()>(&mut conn)
            .await
            .map_err(command_failed("HSET"))
    }

    #[instrument(skip(self, value))]
    async fn hash_set_if_absent(
        &self,
        key: &str,
        field: &str,
        value: &str,
    ) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("HSETNX")
            .arg(key)
            .arg(field)
            .arg(value)
            .query_async::<bool>(&mut conn)
            .await
            .map_err(command_failed("HSETNX"))
    }

    #[instrument(skip(self))]
    async fn hash_delete(&self, key: &str, field: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("HDEL")
            .arg(key)
            .arg(field)
            .query_async::<()>(&mut conn)
            .await
            .map_err(command_failed("HDEL"))
    }

    #[instrument(skip(self))]
    async fn sorted_set_add(&self, key: &str, member: &str, score: f64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("ZADD")
            .arg(key)
            .arg(score)
            .arg(member)
            .query_async::<()>(&mut conn)
            .await
            .map_err(command_failed("ZADD"))
    }

    #[instrument(skip(self))]
    async fn sorted_set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("ZREM")
            .arg(key)
            .arg(member)
            .query_async::<()>(&mut conn)
            .await
            .map_err(command_failed("ZREM"))
    }

    #[instrument(skip(self))]
    async fn sorted_set_range_by_score(
        &self,
        key: &str,
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        redis::cmd("ZRANGEBYSCORE")
            .arg(key)
            .arg(min.to_arg())
            .arg(max.to_arg())
            .query_async::<Vec<String>>(&mut conn)
            .await
            .map_err(command_failed("ZRANGEBYSCORE"))
    }
}
