//! Metadata digest: hash tree folding and chain data merging.
use crate::std::{string::String, vec::Vec};

use merkle_cbt::merkle_tree::Merge;
use parity_scale_codec::Encode;
use primitive_types::H256;
use scale_info::PortableRegistry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::config::{ChainConfig, RuntimeVersion};
use crate::error::DigestMismatchError;
use crate::metadata::RuntimeMetadata;
use crate::traits::{HashableMetadata, MergeHashes};
use crate::LOG_TARGET;

/// Chain data that is not in the metadata, but is bound into the digest.
///
/// SCALE encoding of `ExtraInfo` (fields in declaration order) is merged
/// with the types tree root.
#[derive(Clone, Debug, Encode, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ExtraInfo {
    pub base58_prefix: u16,
    pub decimals: u8,
    pub spec_name: String,
    pub spec_version: u32,
    pub token_symbol: String,
}

impl ExtraInfo {
    /// Join chain configuration and live runtime version.
    pub fn new(chain_config: &ChainConfig, runtime_version: &RuntimeVersion) -> Self {
        Self {
            base58_prefix: chain_config.base58_prefix,
            decimals: chain_config.decimals,
            spec_name: runtime_version.spec_name.clone(),
            spec_version: runtime_version.spec_version,
            token_symbol: chain_config.token_symbol.clone(),
        }
    }
}

/// Metadata digest.
///
/// Equality is byte-equality of `root`.
#[derive(Clone, Copy, Debug, Eq)]
pub struct MetadataDigest {
    root: [u8; 32],
    leaf_count: u32,
}

impl PartialEq for MetadataDigest {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl MetadataDigest {
    /// Fold leaf hashes into a tree root and merge [`ExtraInfo`] in.
    pub fn from_leaf_hashes(leaves: &[[u8; 32]], extra_info: &ExtraInfo) -> Self {
        let tree_root = merkle_root(leaves);
        let root: [u8; 32] = blake3::hash(&[&tree_root[..], &extra_info.encode()[..]].concat()).into();
        log::trace!(
            target: LOG_TARGET,
            "digest over {} leaves for {} v{}: {}",
            leaves.len(),
            extra_info.spec_name,
            extra_info.spec_version,
            hex_string(&root),
        );
        Self {
            root,
            leaf_count: leaves.len() as u32,
        }
    }

    pub fn root(&self) -> [u8; 32] {
        self.root
    }

    pub fn leaf_count(&self) -> u32 {
        self.leaf_count
    }

    /// Digest root as hash, the form `CheckMetadataHash` carries.
    pub fn hash(&self) -> H256 {
        H256(self.root)
    }

    /// Compare with claimed digest root.
    pub fn verify(&self, claimed: &[u8; 32]) -> Result<(), DigestMismatchError> {
        if &self.root == claimed {
            Ok(())
        } else {
            Err(DigestMismatchError {
                expected: self.root,
                claimed: *claimed,
            })
        }
    }
}

/// Tree root for a sorted set of leaf hashes.
///
/// Adjacent nodes are merged left-to-right. Unpaired last node of a level is
/// promoted to the next level unchanged. Single leaf is its own root, empty
/// set gives zero root.
pub fn merkle_root(leaves: &[[u8; 32]]) -> [u8; 32] {
    if leaves.is_empty() {
        return [0; 32];
    }
    let mut level: Vec<[u8; 32]> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| match pair {
                [left, right] => MergeHashes::merge(left, right),
                _ => pair[0],
            })
            .collect();
    }
    level[0]
}

/// Digest calculation entry points.
pub struct DigestBuilder;

impl DigestBuilder {
    /// Digest of complete decoded metadata.
    pub fn digest(runtime_metadata: &RuntimeMetadata, extra_info: &ExtraInfo) -> MetadataDigest {
        let digest = runtime_metadata.digest_with_extra_info(extra_info);
        log::debug!(
            target: LOG_TARGET,
            "metadata digest {} ({} leaves)",
            hex_string(&digest.root),
            digest.leaf_count,
        );
        digest
    }

    /// Digest of bare type registry.
    pub fn digest_registry(registry: &PortableRegistry, extra_info: &ExtraInfo) -> MetadataDigest {
        registry.digest_with_extra_info(extra_info)
    }

    /// Digest of already hashed leaves, in the given order.
    pub fn digest_leaf_hashes(leaves: &[[u8; 32]], extra_info: &ExtraInfo) -> MetadataDigest {
        MetadataDigest::from_leaf_hashes(leaves, extra_info)
    }

    /// Recompute the digest and check it against the claimed one.
    pub fn verify(
        runtime_metadata: &RuntimeMetadata,
        extra_info: &ExtraInfo,
        claimed: &[u8; 32],
    ) -> Result<MetadataDigest, DigestMismatchError> {
        let digest = Self::digest(runtime_metadata, extra_info);
        digest.verify(claimed)?;
        Ok(digest)
    }
}

/// Lowercase hex, `0x`-prefixed.
pub fn hex_string(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
