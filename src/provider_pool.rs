//! Bounded, time-expiring pool of lazily derived credentials providers.
//!
//! Keys are (role ARN, session name) pairs; the first request for a key
//! performs the derivation through the configured factory, everyone else
//! reuses the stored handle until it is evicted by size or idle time.
//! Concurrent misses for one key collapse into a single derivation.

pub const DEFAULT_MAX_SIZE: usize = 10;
pub const DEFAULT_EXPIRE_AFTER_ACCESS: std::time::Duration =
    std::time::Duration::from_secs(300);

/// Pool key. Both fields may be empty, meaning "no role assumption"; the
/// empty pair is itself a valid, cacheable key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    role_arn: String,
    session_name: String,
}

impl CacheKey {
    pub fn new(role_arn: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            role_arn: role_arn.into(),
            session_name: session_name.into(),
        }
    }

    pub fn role_arn(&self) -> &str {
        &self.role_arn
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.role_arn, self.session_name)
    }
}

struct CacheEntry {
    handle: std::sync::Arc<crate::credential::Credential>,
    last_access: std::time::Instant,
}

type EntryMap =
    std::sync::Arc<std::sync::Mutex<std::collections::HashMap<CacheKey, CacheEntry>>>;

type LoadOutcome =
    Result<std::sync::Arc<crate::credential::Credential>, crate::error::DerivationError>;

pub struct CredentialProviderPool {
    configuration: crate::factory::PoolConfiguration,
    max_size: usize,
    expire_after_access: std::time::Duration,
    entries: EntryMap,
    flights: crate::singleflight::Singleflight<CacheKey, LoadOutcome>,
}

impl std::fmt::Debug for CredentialProviderPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProviderPool")
            .field("max_size", &self.max_size)
            .field("expire_after_access", &self.expire_after_access)
            .finish()
    }
}

impl CredentialProviderPool {
    pub fn new(
        factory: std::sync::Arc<dyn crate::factory::CredentialFactory>,
        base: crate::config::BaseConfiguration,
        max_size: usize,
        expire_after_access: std::time::Duration,
    ) -> crate::Result<Self> {
        if max_size == 0 {
            return Err(crate::Error::ConfigError(
                "pool max size must be positive".to_owned(),
            ));
        }
        if expire_after_access.is_zero() {
            return Err(crate::Error::ConfigError(
                "pool expiration interval must be positive".to_owned(),
            ));
        }
        Ok(Self {
            configuration: crate::factory::PoolConfiguration::new(factory, base),
            max_size,
            expire_after_access,
            entries: Default::default(),
            flights: crate::singleflight::Singleflight::new(),
        })
    }

    /// Return the credentials provider for the given overrides, deriving it
    /// through the factory when no fresh entry exists. Derivation happens at
    /// most once per key at a time; failures are surfaced to every waiting
    /// caller and never cached.
    pub async fn get_credentials_provider(
        &self,
        role_arn: &str,
        session_name: &str,
    ) -> crate::Result<std::sync::Arc<crate::credential::Credential>> {
        let key = CacheKey::new(role_arn, session_name);
        if let Some(handle) = lookup(&self.entries, &key, self.expire_after_access) {
            tracing::trace!(key = %key, "returning cached credentials provider");
            return Ok(handle);
        }

        let configuration = self.configuration.clone();
        let entries = self.entries.clone();
        let max_size = self.max_size;
        let expire_after_access = self.expire_after_access;
        let load_key = key.clone();
        let outcome = self
            .flights
            .run(key.clone(), move || async move {
                // Another caller may have completed a load for this key since
                // our miss; take its entry instead of deriving again.
                if let Some(handle) = lookup(&entries, &load_key, expire_after_access) {
                    return Ok(handle);
                }
                match configuration.load(&load_key).await {
                    Ok(credential) => {
                        let handle = std::sync::Arc::new(credential);
                        store(&entries, max_size, load_key, handle.clone());
                        Ok(handle)
                    }
                    Err(e) => Err(crate::error::DerivationError::new(
                        load_key.role_arn(),
                        load_key.session_name(),
                        e,
                    )),
                }
            })
            .await;

        match outcome {
            Ok(handle) => {
                touch(&self.entries, &key);
                Ok(handle)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

/// Fresh-entry lookup; refreshes the access time on a hit, discards an entry
/// that has been idle longer than the expiration interval.
fn lookup(
    entries: &EntryMap,
    key: &CacheKey,
    expire_after_access: std::time::Duration,
) -> Option<std::sync::Arc<crate::credential::Credential>> {
    let mut entries = entries.lock().unwrap();
    match entries.get_mut(key) {
        Some(entry) if entry.last_access.elapsed() < expire_after_access => {
            entry.last_access = std::time::Instant::now();
            Some(entry.handle.clone())
        }
        Some(_) => {
            tracing::debug!(key = %key, "discarding idle credentials provider");
            entries.remove(key);
            None
        }
        None => None,
    }
}

fn store(
    entries: &EntryMap,
    max_size: usize,
    key: CacheKey,
    handle: std::sync::Arc<crate::credential::Credential>,
) {
    let mut entries = entries.lock().unwrap();
    while entries.len() >= max_size && !entries.contains_key(&key) {
        let evicted = entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone());
        match evicted {
            Some(evicted) => {
                tracing::debug!(key = %evicted, "evicting least recently accessed credentials provider");
                entries.remove(&evicted);
            }
            None => break,
        }
    }
    entries.insert(
        key,
        CacheEntry {
            handle,
            last_access: std::time::Instant::now(),
        },
    );
}

fn touch(entries: &EntryMap, key: &CacheKey) {
    let mut entries = entries.lock().unwrap();
    if let Some(entry) = entries.get_mut(key) {
        entry.last_access = std::time::Instant::now();
    }
}

/// Swappable pool reference for the dispatch layer. A pool is immutable for
/// its configuration generation; reconfiguration builds a new pool and swaps
/// it in here, it never mutates the running one.
#[derive(Debug)]
pub struct SharedPool {
    current: std::sync::RwLock<std::sync::Arc<CredentialProviderPool>>,
}

impl SharedPool {
    pub fn new(pool: CredentialProviderPool) -> Self {
        Self {
            current: std::sync::RwLock::new(std::sync::Arc::new(pool)),
        }
    }

    pub fn current(&self) -> std::sync::Arc<CredentialProviderPool> {
        self.current.read().unwrap().clone()
    }

    pub fn replace(&self, pool: CredentialProviderPool) -> std::sync::Arc<CredentialProviderPool> {
        let mut current = self.current.write().unwrap();
        std::mem::replace(&mut *current, std::sync::Arc::new(pool))
    }
}
