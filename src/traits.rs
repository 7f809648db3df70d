//! Traits for digest generation.
use crate::std::vec::Vec;

use merkle_cbt::merkle_tree::Merge;
use parity_scale_codec::Encode;
use scale_info::PortableRegistry;

use crate::digest::{merkle_root, ExtraInfo, MetadataDigest};
use crate::leaves::{metadata_leaves, registry_leaves};
use crate::metadata::RuntimeMetadata;

/// Hash merger, for hash tree construction.
pub struct MergeHashes;

impl Merge for MergeHashes {
    type Item = [u8; 32];
    fn merge(left: &Self::Item, right: &Self::Item) -> Self::Item {
        blake3::hash(&[*left, *right].concat()).into()
    }
}

/// Make blake3 hash for values implementing `Encode`.
///
/// Applied on individual [`LeafEntry`](crate::leaves::LeafEntry) values in
/// tree generation.
pub fn blake3_leaf<T: Encode>(value: &T) -> [u8; 32] {
    blake3::hash(value.encode().as_ref()).into()
}

/// Metadata that could be transformed into deterministically sorted set of
/// hash tree leaves.
pub trait HashableMetadata {
    /// Calculate hashed leaves set, sorted.
    fn merkle_leaves(&self) -> Vec<[u8; 32]>;

    /// Calculate tree root hash, without chain data mixed in.
    fn merkle_root(&self) -> [u8; 32] {
        merkle_root(&self.merkle_leaves())
    }

    /// Calculate full digest with additionally provided [`ExtraInfo`].
    fn digest_with_extra_info(&self, extra_info: &ExtraInfo) -> MetadataDigest {
        MetadataDigest::from_leaf_hashes(&self.merkle_leaves(), extra_info)
    }
}

impl HashableMetadata for RuntimeMetadata {
    fn merkle_leaves(&self) -> Vec<[u8; 32]> {
        metadata_leaves(self).iter().map(blake3_leaf).collect()
    }
}

/// Bare type registry, with no pallets and no extrinsic format.
impl HashableMetadata for PortableRegistry {
    fn merkle_leaves(&self) -> Vec<[u8; 32]> {
        registry_leaves(self).iter().map(blake3_leaf).collect()
    }
}
