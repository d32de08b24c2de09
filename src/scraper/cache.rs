use crate::scraper::provider::HttpResponse;
use crate::scraper::{PAGE_CACHE_TTL, Result, ScraperError};
use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;
use reqwest::StatusCode;
use sha1::{Digest, Sha1};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Persisted key to bytes store with optional per-entry expiry
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// `ttl == None` stores the entry permanently
    async fn put(&self, key: &str, data: &[u8], ttl: Option<Duration>) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }
}

/// Content key for an image: hex SHA-1 of its source URL
#[must_use]
pub fn image_key(url: &str) -> String {
    hex::encode(Sha1::digest(url.as_bytes()))
}

struct Entry {
    data: Vec<u8>,
    ttl: Option<Duration>,
}

struct PerEntryTtl;

impl Expiry<String, Arc<Entry>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Arc<Entry>,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// In-process store backed by moka
#[derive(Clone)]
pub struct MemoryStore {
    entries: Cache<String, Arc<Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let entries = Cache::builder().expire_after(PerEntryTtl).build();
        Self { entries }
    }

    pub fn entry_count(&self) -> u64 {
        self.entries.entry_count()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).await.map(|e| e.data.clone()))
    }

    async fn put(&self, key: &str, data: &[u8], ttl: Option<Duration>) -> Result<()> {
        let entry = Arc::new(Entry {
            data: data.to_vec(),
            ttl,
        });
        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }
}

/// One file per key under a directory.
///
/// Layout: 8-byte big-endian expiry in unix millis (0 = never), then the data.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

const HEADER_LEN: usize = 8;

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(image_key(key))
    }
}

#[async_trait]
impl CacheStore for DiskStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let Some((header, data)) = raw.split_first_chunk::<HEADER_LEN>() else {
            return Err(ScraperError::Cache(format!(
                "truncated cache entry {}",
                path.display()
            )));
        };

        let expires_at = i64::from_be_bytes(*header);
        if expires_at != 0 && chrono::Utc::now().timestamp_millis() > expires_at {
            debug!(key, "disk cache entry expired");
            if let Err(e) = tokio::fs::remove_file(&path).await {
                debug!(key, "remove expired cache entry failed: {}", e);
            }
            return Ok(None);
        }

        Ok(Some(data.to_vec()))
    }

    async fn put(&self, key: &str, data: &[u8], ttl: Option<Duration>) -> Result<()> {
        let expires_at = ttl.map_or(0, |ttl| {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            chrono::Utc::now().timestamp_millis().saturating_add(ttl_ms)
        });

        let mut raw = Vec::with_capacity(HEADER_LEN + data.len());
        raw.extend_from_slice(&expires_at.to_be_bytes());
        raw.extend_from_slice(data);

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &raw).await?;
        tokio::fs::rename(&tmp, self.path_for(key)).await?;
        Ok(())
    }
}

/// Page and image cache over a [`CacheStore`].
///
/// Holds a lock per key while loading so each key is fetched at most once.
pub struct ScraperCache {
    store: Arc<dyn CacheStore>,
    locks: DashMap<String, Arc<Mutex<()>>>,
    enable_page_cache: bool,
    page_ttl: Duration,
}

impl ScraperCache {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
            enable_page_cache: true,
            page_ttl: PAGE_CACHE_TTL,
        }
    }

    #[must_use]
    pub const fn with_page_cache(mut self, enabled: bool) -> Self {
        self.enable_page_cache = enabled;
        self
    }

    #[must_use]
    pub const fn with_page_ttl(mut self, ttl: Duration) -> Self {
        self.page_ttl = ttl;
        self
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Run `work` holding the lock for `key`; the lock entry is dropped
    /// once no other task waits on it.
    async fn locked<T>(&self, key: &str, work: impl Future<Output = T>) -> T {
        let lock = self.locks.entry(key.to_string()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            work.await
        };

        drop(lock);
        self.locks.remove_if(key, |_, l| Arc::strong_count(l) == 1);
        result
    }

    /// Return the cached page for `key` or run `loader`.
    ///
    /// Only 200 responses that `accept` approves are stored. Loader errors
    /// and cancellation leave the store untouched.
    pub async fn load_page<F, Fut, A>(
        &self,
        key: &str,
        cancel: &CancellationToken,
        loader: F,
        accept: A,
    ) -> Result<HttpResponse>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<HttpResponse>> + Send,
        A: Fn(&HttpResponse) -> bool + Send,
    {
        if !self.enable_page_cache {
            return cancellable(cancel, loader()).await;
        }

        self.locked(key, async {
            if let Some(body) = self.store.get(key).await? {
                debug!(key, "page cache hit");
                return Ok(HttpResponse::ok(body));
            }

            let response = cancellable(cancel, loader()).await?;
            if response.status == StatusCode::OK && accept(&response) {
                self.store.put(key, &response.body, Some(self.page_ttl)).await?;
            } else {
                debug!(key, status = response.status.as_u16(), "page not cached");
            }
            Ok::<_, ScraperError>(response)
        })
        .await
    }

    /// Store an image under its content key, fetching only if absent
    pub async fn store_image<F, Fut>(
        &self,
        url: &str,
        cancel: &CancellationToken,
        fetch: F,
    ) -> Result<String>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Vec<u8>>> + Send,
    {
        let key = image_key(url);
        self.locked(&key, async {
            if self.store.exists(&key).await? {
                debug!(url, key, "image already cached");
                return Ok(());
            }

            let data = cancellable(cancel, fetch()).await?;
            self.store.put(&key, &data, None).await
        })
        .await?;
        Ok(key)
    }

    /// Read a cached image by content key
    pub async fn load_image(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.store.get(key).await
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(ScraperError::Cancelled),
        res = fut => res,
    }
}
