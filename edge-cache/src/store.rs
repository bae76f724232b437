//! Cache Store Adapter — atomic read/write of a Cache Entry against a
//! Redis-like key/value store, plus the expiry index and the
//! `revalidate` pub/sub channel.
//!
//! The external contract (§6): `HGETALL`-equivalent, per-key `TTL`,
//! `HMSET`-equivalent, per-key `EXPIRE`, sorted-set add to
//! `ledge:uris_by_expiry`, pub/sub `PUBLISH`, pipelined batching.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use redis::AsyncCommands;

use crate::error::{CacheError, Result};
use crate::model::{CacheEntry, Request, Response};
use crate::ttl::Ttl;

/// Well-known sorted-set key backing the Expiry Index.
pub const EXPIRY_INDEX_KEY: &str = "ledge:uris_by_expiry";
/// Well-known pub/sub channel background workers subscribe to for
/// revalidation requests.
pub const REVALIDATE_CHANNEL: &str = "revalidate";

const FIELD_STATUS: &str = "status";
const FIELD_BODY: &str = "body";
const FIELD_URI: &str = "uri";
const HEADER_PREFIX: &str = "h:";

/// Atomic read/write of one Cache Entry, plus publish, against the shared
/// store. Implementations must uphold: a positive remaining TTL always
/// reads back a complete hash; `write` succeeds all-or-nothing across its
/// three sub-operations (replace hash, set TTL, update expiry index).
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch the entry for `cache_key`. Returns `None` on a non-positive
    /// remaining TTL (miss). A positive TTL with an incomplete hash is a
    /// fault, not a miss.
    async fn read(&self, cache_key: &str) -> Result<Option<Response>>;

    /// Atomically replace `cache_key`'s hash with `req`/`res`'s data, set
    /// its TTL, and update the expiry index for `req.uri_full`. The
    /// caller guarantees `res` already passed the Cacheability Oracle.
    async fn write(&self, cache_key: &str, req: &Request, res: &Response, ttl: &Ttl) -> Result<()>;

    /// Fire-and-forget publish on a named channel (used for the
    /// `revalidate` channel by the Revalidation Publisher).
    async fn publish(&self, channel: &str, message: &str) -> Result<()>;
}

/// Production [`CacheStore`] backed by a pooled Redis connection.
#[derive(Clone)]
pub struct RedisStore {
    pool: deadpool_redis::Pool,
}

impl RedisStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: deadpool_redis::Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    #[tracing::instrument(skip(self), fields(hit))]
    async fn read(&self, cache_key: &str) -> Result<Option<Response>> {
        let mut conn = self.pool.get().await.map_err(CacheError::RedisPool)?;

        let (fields, remaining_ttl): (HashMap<String, Vec<u8>>, i64) = redis::pipe()
            .hgetall(cache_key)
            .ttl(cache_key)
            .query_async(&mut conn)
            .await
            .map_err(CacheError::Redis)?;

        if remaining_ttl < 0 {
            tracing::Span::current().record("hit", false);
            return Ok(None);
        }
        tracing::Span::current().record("hit", true);

        entry_from_fields(cache_key, fields).map(|entry| Some(entry.into_response()))
    }

    #[tracing::instrument(skip(self, req, res, ttl))]
    async fn write(&self, cache_key: &str, req: &Request, res: &Response, ttl: &Ttl) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(CacheError::RedisPool)?;

        let mut fields: Vec<(String, Vec<u8>)> = vec![
            (FIELD_STATUS.to_string(), res.status.to_string().into_bytes()),
            (FIELD_BODY.to_string(), res.body.to_vec()),
            (FIELD_URI.to_string(), req.uri_full.clone().into_bytes()),
        ];
        for (name, value) in res.headers.iter() {
            fields.push((format!("{HEADER_PREFIX}{name}"), value.as_bytes().to_vec()));
        }

        redis::pipe()
            .atomic()
            .del(cache_key)
            .hset_multiple(cache_key, &fields)
            .ignore()
            .expire(cache_key, ttl.ttl_seconds as i64)
            .ignore()
            .zadd(EXPIRY_INDEX_KEY, req.uri_full.clone(), ttl.absolute_expiry as f64)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .map_err(CacheError::Redis)?;

        Ok(())
    }

    #[tracing::instrument(skip(self, message))]
    async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        let mut conn = self.pool.get().await.map_err(CacheError::RedisPool)?;
        let _: i64 = conn.publish(channel, message).await.map_err(CacheError::Redis)?;
        Ok(())
    }
}

fn entry_from_fields(cache_key: &str, mut fields: HashMap<String, Vec<u8>>) -> Result<CacheEntry> {
    let status = fields
        .remove(FIELD_STATUS)
        .ok_or_else(|| CacheError::Fault(format!("{cache_key}: missing status field")))?;
    let body = fields
        .remove(FIELD_BODY)
        .ok_or_else(|| CacheError::Fault(format!("{cache_key}: missing body field")))?;
    let uri = fields
        .remove(FIELD_URI)
        .ok_or_else(|| CacheError::Fault(format!("{cache_key}: missing uri field")))?;

    let status: u16 = String::from_utf8_lossy(&status)
        .parse()
        .map_err(|_| CacheError::Fault(format!("{cache_key}: non-numeric status field")))?;

    let headers = fields
        .into_iter()
        .filter_map(|(k, v)| {
            k.strip_prefix(HEADER_PREFIX).map(|name| (name.to_string(), String::from_utf8_lossy(&v).into_owned()))
        })
        .collect();

    Ok(CacheEntry { status, body, uri: String::from_utf8_lossy(&uri).into_owned(), headers })
}

/// In-memory [`CacheStore`] double used by the test suite so tests don't
/// require a live Redis. Mirrors the same shape-contract and pub/sub
/// bookkeeping as [`RedisStore`], minus actual network I/O.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, (CacheEntry, u64)>>,
    expiry_index: Mutex<HashMap<String, f64>>,
    published: Mutex<Vec<(String, String)>>,
}

impl MemoryStore {
    /// A store with no entries.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages published so far, in publish order: `(channel, message)`.
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }

    /// Absolute expiry recorded in the index for `uri_full`, if any.
    pub fn expiry_for(&self, uri_full: &str) -> Option<f64> {
        self.expiry_index.lock().unwrap().get(uri_full).copied()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn read(&self, cache_key: &str) -> Result<Option<Response>> {
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(cache_key).map(|(entry, _ttl)| entry.clone().into_response()))
    }

    async fn write(&self, cache_key: &str, req: &Request, res: &Response, ttl: &Ttl) -> Result<()> {
        let entry = CacheEntry::from_response(&req.uri_full, res);
        self.entries.lock().unwrap().insert(cache_key.to_string(), (entry, ttl.ttl_seconds));
        self.expiry_index.lock().unwrap().insert(req.uri_full.clone(), ttl.absolute_expiry as f64);
        Ok(())
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<()> {
        self.published.lock().unwrap().push((channel.to_string(), message.to_string()));
        Ok(())
    }
}
