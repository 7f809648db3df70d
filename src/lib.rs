//! This crate signs Substrate transactions with the runtime metadata digest
//! bound into the signature.
//!
//! # Metadata digest
//!
//! Hardware and detached signers decode transactions using metadata supplied
//! by an online, untrusted party. Decoding is meaningful only if the metadata
//! is authentic. Runtimes with `CheckMetadataHash` signed extension solve this
//! by adding the metadata digest into the signed (implicit) part of the
//! transaction: signature made against a digest of forged or stale metadata
//! is rejected on chain.
//!
//! Digest is generated by merging the root hash of a binary hash tree built
//! over canonical metadata leaves with the SCALE-encoded [`ExtraInfo`] of the
//! chain:
//!
//! - each type registry entry, each pallet, and the extrinsic format are
//! transformed into a [`LeafEntry`](crate::leaves::LeafEntry) with docs
//! removed and type references kept as ids; enums contribute one leaf per
//! variant,
//! - leaves are deterministically sorted by kind, id, and variant index,
//! - leaf hash is blake3 hash of SCALE-encoded leaf,
//! - tree is folded left-to-right, pairs are merged as
//! `blake3(left || right)`, odd node of a level is promoted unchanged,
//! - digest root is `blake3(tree_root || SCALE(ExtraInfo))`.
//!
//! Trait [`HashableMetadata`](crate::traits::HashableMetadata) is implemented
//! both for decoded [`RuntimeMetadata`] and for bare
//! [`PortableRegistry`](scale_info::PortableRegistry).
//!
//! # Signing pipeline
//!
//! Transaction goes strictly through stages
//! `Pipeline -> MetadataDecoded -> DigestComputed -> PayloadAugmented ->
//! Signed -> Assembled`, each stage consuming the previous one, see
//! [`pipeline`]. Failure at any stage returns an error and no signed bytes.
//!
//! # Example
//! ```
//! # #[cfg(feature = "std")]
//! # {
//! use metadata_hash_signer::{DigestBuilder, ExtraInfo};
//! use scale_info::{meta_type, PortableRegistry, Registry};
//!
//! let mut registry = Registry::new();
//! registry.register_type(&meta_type::<u8>());
//! registry.register_type(&meta_type::<bool>());
//! let registry: PortableRegistry = registry.into();
//!
//! let extra_info = ExtraInfo {
//!     base58_prefix: 42,
//!     decimals: 12,
//!     spec_name: "westend".to_string(),
//!     spec_version: 1_006_001,
//!     token_symbol: "WND".to_string(),
//! };
//!
//! let digest = DigestBuilder::digest_registry(&registry, &extra_info);
//! assert_eq!(digest.leaf_count(), 2);
//! assert_eq!(digest, DigestBuilder::digest_registry(&registry, &extra_info));
//! # }
//! ```
#![no_std]
#![deny(unused_crate_dependencies)]

#[cfg(feature = "std")]
pub mod cache;
pub mod config;
pub mod digest;
pub mod era;
pub mod error;
pub mod extensions;
pub mod extrinsic;
pub mod leaves;
pub mod metadata;
pub mod payload;
pub mod pipeline;
pub mod signer;
pub mod traits;

#[cfg(any(feature = "std", test))]
#[macro_use]
extern crate std;

#[cfg(all(not(feature = "std"), not(test)))]
#[macro_use]
extern crate alloc as std;

/// Log target for all crate messages.
pub const LOG_TARGET: &str = "metadata-hash";

#[cfg(feature = "std")]
pub use crate::cache::{CacheKey, DigestCache};
pub use crate::config::{ChainConfig, RuntimeVersion};
pub use crate::digest::{DigestBuilder, ExtraInfo, MetadataDigest};
pub use crate::era::Era;
pub use crate::extensions::{ExplicitFields, ExtensionKind, ExtensionLayout};
pub use crate::extrinsic::{EnvelopeFormat, ExtrinsicAssembler, ExtrinsicParts, SignedExtrinsic};
pub use crate::metadata::{decode_metadata, decode_opaque, RuntimeMetadata};
pub use crate::payload::{
    AugmentedPayload, MetadataHashMode, Mode, PayloadAugmenter, SigningPayload, UnsignedPayload,
};
pub use crate::pipeline::{
    Assembled, DigestComputed, MetadataDecoded, PayloadAugmented, Pipeline, SignFailure, Signed,
};
#[cfg(feature = "std")]
pub use crate::signer::Sr25519Signer;
pub use crate::signer::{Signature, Signer, SignerAddress};
pub use primitive_types::H256;
