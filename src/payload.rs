//! Payload augmentation: merging metadata hash mode and digest into the
//! unsigned transaction.
use crate::std::vec::Vec;

use blake2::{digest::consts::U32, Blake2b, Digest};
use parity_scale_codec::Encode;
use primitive_types::H256;

use crate::digest::{hex_string, MetadataDigest};
use crate::era::Era;
use crate::error::PayloadShapeError;
use crate::extensions::{ExplicitFields, ExtensionLayout, ImplicitFields};
use crate::metadata::RuntimeMetadata;
use crate::LOG_TARGET;

/// Signing payloads longer than this are hashed before signing.
pub const MAX_UNHASHED_PAYLOAD_LEN: usize = 256;

/// `CheckMetadataHash` mode byte.
#[derive(Clone, Copy, Debug, Encode, Eq, PartialEq)]
pub enum Mode {
    #[codec(index = 0)]
    Disabled,
    #[codec(index = 1)]
    MetadataHashEnabled,
}

impl Mode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Self::Disabled),
            1 => Some(Self::MetadataHashEnabled),
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::MetadataHashEnabled)
    }
}

/// Mode together with metadata hash.
///
/// Metadata hash exists if and only if checking is enabled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetadataHashMode {
    Disabled,
    Enabled([u8; 32]),
}

impl MetadataHashMode {
    pub fn mode(&self) -> Mode {
        match self {
            MetadataHashMode::Disabled => Mode::Disabled,
            MetadataHashMode::Enabled(_) => Mode::MetadataHashEnabled,
        }
    }

    pub fn metadata_hash(&self) -> Option<[u8; 32]> {
        match self {
            MetadataHashMode::Disabled => None,
            MetadataHashMode::Enabled(hash) => Some(*hash),
        }
    }
}

/// Unsigned transaction, as built by transaction-construction collaborator.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnsignedPayload {
    pub call: Vec<u8>,
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: H256,
    /// Hash of the block the mortal era starts at. Must be `None` for
    /// immortal era, genesis hash is signed instead.
    pub mortality_checkpoint: Option<H256>,
}

/// Unsigned payload with metadata hash mode merged in.
///
/// Built only by [`PayloadAugmenter`], fields are fixed afterwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AugmentedPayload {
    unsigned: UnsignedPayload,
    metadata_hash: MetadataHashMode,
    layout: ExtensionLayout,
}

impl AugmentedPayload {
    pub fn unsigned(&self) -> &UnsignedPayload {
        &self.unsigned
    }

    pub fn metadata_hash(&self) -> MetadataHashMode {
        self.metadata_hash
    }

    pub fn layout(&self) -> &ExtensionLayout {
        &self.layout
    }

    pub fn explicit(&self) -> ExplicitFields {
        ExplicitFields {
            era: self.unsigned.era,
            nonce: self.unsigned.nonce,
            tip: self.unsigned.tip,
            mode: self.metadata_hash.mode(),
        }
    }

    pub fn implicit(&self) -> ImplicitFields {
        ImplicitFields {
            spec_version: self.unsigned.spec_version,
            transaction_version: self.unsigned.transaction_version,
            genesis_hash: self.unsigned.genesis_hash,
            mortality_checkpoint: match self.unsigned.era {
                Era::Immortal => self.unsigned.genesis_hash,
                Era::Mortal(..) => self
                    .unsigned
                    .mortality_checkpoint
                    .unwrap_or(self.unsigned.genesis_hash),
            },
            metadata_hash: self.metadata_hash.metadata_hash(),
        }
    }

    /// Canonical encoding: call, explicit extension data, implicit extension
    /// data.
    pub fn encode_canonical(&self) -> Vec<u8> {
        let mut out = self.unsigned.call.clone();
        self.layout.encode_explicit_to(&self.explicit(), &mut out);
        self.layout.encode_implicit_to(&self.implicit(), &mut out);
        out
    }

    /// Bytes handed over to the signer.
    pub fn signing_payload(&self) -> SigningPayload {
        SigningPayload::from_canonical(self.encode_canonical())
    }
}

/// Bytes to sign, derived from [`AugmentedPayload`] only.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningPayload(Vec<u8>);

impl SigningPayload {
    fn from_canonical(canonical: Vec<u8>) -> Self {
        if canonical.len() > MAX_UNHASHED_PAYLOAD_LEN {
            let hashed: [u8; 32] = Blake2b::<U32>::digest(&canonical).into();
            Self(hashed.to_vec())
        } else {
            Self(canonical)
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Merges mode and digest into unsigned payloads for a given runtime.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayloadAugmenter {
    layout: ExtensionLayout,
}

impl PayloadAugmenter {
    pub fn new(runtime_metadata: &RuntimeMetadata) -> Result<Self, PayloadShapeError> {
        Ok(Self {
            layout: ExtensionLayout::from_metadata(runtime_metadata)?,
        })
    }

    pub fn from_layout(layout: ExtensionLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ExtensionLayout {
        &self.layout
    }

    /// Merge mode and digest into payload.
    ///
    /// Digest must be supplied if and only if mode enables checking. Digest
    /// supplied with disabled mode is rejected, not ignored.
    pub fn augment(
        &self,
        unsigned: UnsignedPayload,
        mode: Mode,
        digest: Option<&MetadataDigest>,
    ) -> Result<AugmentedPayload, PayloadShapeError> {
        let metadata_hash = match (mode, digest) {
            (Mode::MetadataHashEnabled, Some(digest)) => {
                if !self.layout.has_metadata_hash() {
                    return Err(PayloadShapeError::MetadataHashExtensionNotDeclared);
                }
                MetadataHashMode::Enabled(digest.root())
            }
            (Mode::MetadataHashEnabled, None) => return Err(PayloadShapeError::DigestMissing),
            (Mode::Disabled, Some(_)) => return Err(PayloadShapeError::DigestWithDisabledMode),
            (Mode::Disabled, None) => MetadataHashMode::Disabled,
        };
        match (unsigned.era, unsigned.mortality_checkpoint) {
            (Era::Mortal(period, phase), _) if !unsigned.era.is_valid() => {
                return Err(PayloadShapeError::InvalidEra { period, phase })
            }
            (Era::Mortal(..), None) => return Err(PayloadShapeError::MortalEraWithoutCheckpoint),
            (Era::Immortal, Some(_)) => return Err(PayloadShapeError::CheckpointWithImmortalEra),
            _ => {}
        }
        if let Some(hash) = metadata_hash.metadata_hash() {
            log::debug!(
                target: LOG_TARGET,
                "payload with nonce {} augmented, metadata hash {}",
                unsigned.nonce,
                hex_string(&hash),
            );
        }
        Ok(AugmentedPayload {
            unsigned,
            metadata_hash,
            layout: self.layout.clone(),
        })
    }
}
