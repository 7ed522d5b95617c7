//! C3: ReadCache — a bounded LRU over `(offset, length)` whose fill function
//! performs the backing `ByteReader` read, with at-most-one-concurrent-fill
//! semantics for identical keys.
//!
//! Grounded on `spiraldb-community-extensions/vortex-datafusion/src/persistent/cache.rs`:
//! same `moka::future::Cache` + `try_get_with` shape, same "unwrap the shared
//! `Arc<Error>` or clone its message" pattern for surfacing a fill failure to
//! every waiter.

use std::sync::Arc;

use bytes::Bytes;
use moka::future::Cache;

use crate::error::Error;
use crate::io::reader::{AbortToken, ByteReader};

const MAX_ENTRIES: u64 = 1000;

/// Cache key: `(offset, length)`. The spec describes this as the string
/// `"{length}_{offset}"`; a tuple key is the equivalent the spec explicitly
/// allows and avoids an allocation per lookup.
type CacheKey = (u64, u64);

#[derive(Clone)]
pub struct ReadCache {
    inner: Cache<CacheKey, Bytes>,
}

impl ReadCache {
    pub fn new() -> Self {
        ReadCache {
            inner: Cache::builder().max_capacity(MAX_ENTRIES).build(),
        }
    }

    /// Fetch `length` bytes at `offset`, sharing any identical in-flight
    /// fetch across concurrent callers (spec §4.3 / §8 invariant 4).
    pub async fn get(
        &self,
        reader: &dyn ByteReader,
        offset: u64,
        length: u64,
        abort: &AbortToken,
    ) -> Result<Bytes, Error> {
        let key = (offset, length);
        let abort = abort.clone();
        self.inner
            .try_get_with(key, async move { reader.read(offset, length, &abort).await })
            .await
            .map_err(unwrap_shared_error)
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

impl Default for ReadCache {
    fn default() -> Self {
        ReadCache::new()
    }
}

fn unwrap_shared_error(shared: Arc<Error>) -> Error {
    Arc::try_unwrap(shared).unwrap_or_else(|arc| (*arc).clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingReader {
        calls: AtomicUsize,
        delay: tokio::sync::Notify,
        gate: std::sync::atomic::AtomicBool,
    }

    impl CountingReader {
        fn new() -> Self {
            CountingReader {
                calls: AtomicUsize::new(0),
                delay: tokio::sync::Notify::new(),
                gate: std::sync::atomic::AtomicBool::new(false),
            }
        }

        fn release(&self) {
            self.gate.store(true, Ordering::SeqCst);
            self.delay.notify_waiters();
        }
    }

    #[async_trait]
    impl ByteReader for CountingReader {
        async fn read(
            &self,
            offset: u64,
            length: u64,
            _abort: &AbortToken,
        ) -> Result<Bytes, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.gate.load(Ordering::SeqCst) {
                self.delay.notified().await;
            }
            Ok(Bytes::from(vec![(offset + length) as u8; length as usize]))
        }
    }

    #[tokio::test]
    async fn identical_keys_dedupe_to_one_backing_read() {
        let reader = std::sync::Arc::new(CountingReader::new());
        let cache = ReadCache::new();
        let abort = AbortToken::new();

        let r = reader.clone();
        let c = cache.clone();
        let a = abort.clone();
        let task1 = tokio::spawn(async move { c.get(r.as_ref(), 100, 50, &a).await });

        let r = reader.clone();
        let c = cache.clone();
        let a = abort.clone();
        let task2 = tokio::spawn(async move { c.get(r.as_ref(), 100, 50, &a).await });

        // Give both requests a chance to join the same in-flight fill before
        // releasing it.
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        reader.release();

        let (a, b) = tokio::join!(task1, task2);
        assert_eq!(a.unwrap().unwrap(), b.unwrap().unwrap());
        assert_eq!(reader.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_each_fetch() {
        let reader = std::sync::Arc::new(CountingReader::new());
        reader.release();
        let cache = ReadCache::new();
        let abort = AbortToken::new();

        cache.get(reader.as_ref(), 0, 10, &abort).await.unwrap();
        cache.get(reader.as_ref(), 10, 10, &abort).await.unwrap();
        assert_eq!(reader.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn resident_entry_is_not_refetched() {
        let reader = std::sync::Arc::new(CountingReader::new());
        reader.release();
        let cache = ReadCache::new();
        let abort = AbortToken::new();

        cache.get(reader.as_ref(), 5, 5, &abort).await.unwrap();
        cache.get(reader.as_ref(), 5, 5, &abort).await.unwrap();
        assert_eq!(reader.calls.load(Ordering::SeqCst), 1);
    }
}
