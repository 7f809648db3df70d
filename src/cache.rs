//! Digest cache shared between concurrent pipelines.
//!
//! Digest depends on the runtime only, so it is memoized per
//! `(genesis hash, spec version)`. Entries are never overwritten: a runtime
//! upgrade produces a new key, and entries of older spec versions of the same
//! chain are dropped lazily.
use std::collections::BTreeMap;

use parking_lot::RwLock;
use primitive_types::H256;

use crate::digest::{hex_string, MetadataDigest};
use crate::error::CacheInsertError;
use crate::LOG_TARGET;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct CacheKey {
    pub genesis_hash: H256,
    pub spec_version: u32,
}

#[derive(Debug, Default)]
pub struct DigestCache {
    entries: RwLock<BTreeMap<CacheKey, MetadataDigest>>,
}

impl DigestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<MetadataDigest> {
        self.entries.read().get(key).copied()
    }

    /// Insert digest under a new key.
    ///
    /// Existing entry is never overwritten. Digest for a spec version older
    /// than the one already cached for the same chain is refused. Entries
    /// for older spec versions of the same chain are evicted.
    pub fn insert(&self, key: CacheKey, digest: MetadataDigest) -> Result<(), CacheInsertError> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(&key) {
            return Err(CacheInsertError::Occupied(*existing));
        }
        if let Some(cached_spec_version) = newest_spec_version(&entries, key.genesis_hash) {
            if cached_spec_version > key.spec_version {
                log::debug!(
                    target: LOG_TARGET,
                    "digest for spec version {} not cached, spec version {} is already known",
                    key.spec_version,
                    cached_spec_version,
                );
                return Err(CacheInsertError::Superseded {
                    cached_spec_version,
                });
            }
        }
        entries.insert(key, digest);
        let evicted = evict_older(&mut entries, &key);
        if evicted != 0 {
            log::warn!(
                target: LOG_TARGET,
                "spec version {} of chain {} supersedes {} cached digest(s)",
                key.spec_version,
                hex_string(key.genesis_hash.as_bytes()),
                evicted,
            );
        }
        Ok(())
    }

    /// Cached digest, or a freshly computed one.
    ///
    /// Computation runs without holding the lock. If another pipeline
    /// inserted a digest for the same key meanwhile, that digest wins. Digest
    /// computed for a superseded spec version is returned but not cached.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> MetadataDigest
    where
        F: FnOnce() -> MetadataDigest,
    {
        if let Some(digest) = self.get(&key) {
            log::trace!(target: LOG_TARGET, "digest cache hit, spec version {}", key.spec_version);
            return digest;
        }
        let digest = compute();
        match self.insert(key, digest) {
            Ok(()) | Err(CacheInsertError::Superseded { .. }) => digest,
            Err(CacheInsertError::Occupied(existing)) => existing,
        }
    }

    /// Drop entries of the chain with spec version older than `spec_version`.
    pub fn evict_superseded(&self, genesis_hash: H256, spec_version: u32) -> usize {
        evict_older(
            &mut self.entries.write(),
            &CacheKey {
                genesis_hash,
                spec_version,
            },
        )
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn newest_spec_version(
    entries: &BTreeMap<CacheKey, MetadataDigest>,
    genesis_hash: H256,
) -> Option<u32> {
    entries
        .keys()
        .filter(|key| key.genesis_hash == genesis_hash)
        .map(|key| key.spec_version)
        .max()
}

fn evict_older(entries: &mut BTreeMap<CacheKey, MetadataDigest>, current: &CacheKey) -> usize {
    let before = entries.len();
    entries.retain(|key, _| {
        key.genesis_hash != current.genesis_hash || key.spec_version >= current.spec_version
    });
    before - entries.len()
}
