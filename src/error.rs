//! Errors.
use crate::std::string::String;

use crate::digest::MetadataDigest;

#[cfg(feature = "std")]
use std::{
    error::Error,
    fmt::{Debug, Display, Formatter, Result as FmtResult},
};

#[cfg(not(feature = "std"))]
use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// Metadata version is not among
/// [`SUPPORTED_METADATA_VERSIONS`](crate::metadata::SUPPORTED_METADATA_VERSIONS).
#[derive(Debug, Eq, PartialEq)]
pub struct UnsupportedVersionError {
    pub version: u32,
}

/// Metadata bytes are truncated or structurally invalid.
#[derive(Debug, Eq, PartialEq)]
pub enum DecodeError {
    Absent,
    NoMetaPrefix,
    Codec(String),
    SomeDataNotUsed { from: usize },
    NonPositionalTypeId { position: u32, id: u32 },
    DanglingTypeReference { id: u32, context: ReferenceContext },
    ExtrinsicTypeParamMissing { name: &'static str },
}

/// Where the dangling type reference was found.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ReferenceContext {
    Type { id: u32 },
    Pallet { index: u8 },
    Extrinsic,
    RuntimeType,
}

/// Error produced by [`decode_metadata`](crate::metadata::decode_metadata).
#[derive(Debug, Eq, PartialEq)]
pub enum MetadataError {
    UnsupportedVersion(UnsupportedVersionError),
    Decode(DecodeError),
}

/// Error in merging the digest into the unsigned payload.
#[derive(Debug, Eq, PartialEq)]
pub enum PayloadShapeError {
    DigestMissing,
    DigestWithDisabledMode,
    MetadataHashExtensionNotDeclared,
    MortalEraWithoutCheckpoint,
    CheckpointWithImmortalEra,
    InvalidEra { period: u64, phase: u64 },
    UnsupportedExtension { identifier: String },
    ExtensionTypeNotResolved { identifier: String, id: u32 },
}

/// Digest was not inserted into the cache.
#[derive(Debug, Eq, PartialEq)]
pub enum CacheInsertError {
    /// Key is already taken, existing digest is kept.
    Occupied(MetadataDigest),
    /// Newer spec version of the same chain is cached.
    Superseded { cached_spec_version: u32 },
}

/// Error in signing backend.
#[derive(Debug, Eq, PartialEq)]
pub enum SigningError {
    KeyUnavailable,
    DeviceRefused,
    InvalidKey,
    Backend(String),
}

/// Error in assembling or disassembling the extrinsic envelope.
#[derive(Debug, Eq, PartialEq)]
pub enum AssemblyError {
    CallAbsent,
    MetadataHashMissing,
    MetadataHashUnexpected,
    ModeWithoutExtension,
    NotSigned,
    UnexpectedVersion { version: u8 },
    LengthMismatch { declared: u32, actual: usize },
    UnknownMode { mode: u8 },
    Codec(String),
}

/// Recomputed digest does not match the claimed one.
#[derive(Debug, Eq, PartialEq)]
pub struct DigestMismatchError {
    pub expected: [u8; 32],
    pub claimed: [u8; 32],
}

/// Error in any pipeline stage, or in the chain collaborator `S` feeding it.
#[derive(Debug, Eq, PartialEq)]
pub enum PipelineError<S> {
    Source(S),
    Metadata(MetadataError),
    PayloadShape(PayloadShapeError),
    Signing(SigningError),
    Assembly(AssemblyError),
}

impl UnsupportedVersionError {
    fn error_text(&self) -> String {
        format!(
            "Metadata version {} is not supported. Supported versions are {:?}.",
            self.version,
            crate::metadata::SUPPORTED_METADATA_VERSIONS
        )
    }
}

impl DecodeError {
    fn error_text(&self) -> String {
        match &self {
            DecodeError::Absent => String::from("Node returned no metadata for requested version."),
            DecodeError::NoMetaPrefix => String::from("Metadata does not start with `meta` prefix."),
            DecodeError::Codec(e) => format!("Unable to decode metadata. {e}"),
            DecodeError::SomeDataNotUsed { from } => format!("Metadata decoded, but some data remains unused, starting from position {from}."),
            DecodeError::NonPositionalTypeId { position, id } => format!("Type registry entry at position {position} has id {id}. Registry ids must match entry positions."),
            DecodeError::DanglingTypeReference { id, context } => format!("Type id {id} referenced in {context} does not exist in the registry."),
            DecodeError::ExtrinsicTypeParamMissing { name } => format!("Extrinsic type has no `{name}` type parameter."),
        }
    }
}

impl Display for ReferenceContext {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self {
            ReferenceContext::Type { id } => write!(f, "type {id}"),
            ReferenceContext::Pallet { index } => write!(f, "pallet with index {index}"),
            ReferenceContext::Extrinsic => write!(f, "extrinsic metadata"),
            ReferenceContext::RuntimeType => write!(f, "runtime-level metadata"),
        }
    }
}

impl MetadataError {
    fn error_text(&self) -> String {
        match &self {
            MetadataError::UnsupportedVersion(e) => format!("{e}"),
            MetadataError::Decode(e) => format!("{e}"),
        }
    }
}

impl PayloadShapeError {
    fn error_text(&self) -> String {
        match &self {
            PayloadShapeError::DigestMissing => String::from("Metadata hash checking is enabled, but no metadata digest was supplied."),
            PayloadShapeError::DigestWithDisabledMode => String::from("Metadata digest was supplied, but metadata hash checking is disabled."),
            PayloadShapeError::MetadataHashExtensionNotDeclared => String::from("Metadata hash checking is enabled, but the runtime does not declare `CheckMetadataHash` extension."),
            PayloadShapeError::MortalEraWithoutCheckpoint => String::from("Mortal era requires the hash of the block the era starts at."),
            PayloadShapeError::CheckpointWithImmortalEra => String::from("Immortal era is checked against genesis hash, checkpoint block hash must not be supplied."),
            PayloadShapeError::InvalidEra { period, phase } => format!("Mortal era with period {period} and phase {phase} is malformed."),
            PayloadShapeError::UnsupportedExtension { identifier } => format!("Runtime declares extension `{identifier}` which carries data this signer can not produce."),
            PayloadShapeError::ExtensionTypeNotResolved { identifier, id } => format!("Type {id} of extension `{identifier}` is not in the registry."),
        }
    }
}

impl CacheInsertError {
    fn error_text(&self) -> String {
        match &self {
            CacheInsertError::Occupied(existing) => format!("Digest {} is already cached under this key.", crate::digest::hex_string(&existing.root())),
            CacheInsertError::Superseded { cached_spec_version } => format!("Spec version {cached_spec_version} of this chain is already cached, older digest is stale."),
        }
    }
}

impl SigningError {
    fn error_text(&self) -> String {
        match &self {
            SigningError::KeyUnavailable => String::from("Signing key is not available."),
            SigningError::DeviceRefused => String::from("Signing device refused to sign."),
            SigningError::InvalidKey => String::from("Signing key material is invalid."),
            SigningError::Backend(e) => format!("Signing backend failed. {e}"),
        }
    }
}

impl AssemblyError {
    fn error_text(&self) -> String {
        match &self {
            AssemblyError::CallAbsent => String::from("Extrinsic has no call bytes."),
            AssemblyError::MetadataHashMissing => String::from("Mode enables metadata hash checking, but metadata hash is absent."),
            AssemblyError::MetadataHashUnexpected => String::from("Metadata hash is present, but mode disables metadata hash checking."),
            AssemblyError::ModeWithoutExtension => String::from("Metadata hash checking is enabled, but extension layout has no `CheckMetadataHash`."),
            AssemblyError::NotSigned => String::from("Extrinsic is not signed."),
            AssemblyError::UnexpectedVersion { version } => format!("Extrinsic version {version} is not supported."),
            AssemblyError::LengthMismatch { declared, actual } => format!("Extrinsic length prefix declares {declared} bytes, found {actual}."),
            AssemblyError::UnknownMode { mode } => format!("Unknown metadata hash mode {mode}."),
            AssemblyError::Codec(e) => format!("Unable to decode extrinsic. {e}"),
        }
    }
}

impl DigestMismatchError {
    fn error_text(&self) -> String {
        format!(
            "Metadata digest mismatch. Recomputed {}, claimed {}.",
            crate::digest::hex_string(&self.expected),
            crate::digest::hex_string(&self.claimed)
        )
    }
}

impl<S: Display> PipelineError<S> {
    fn error_text(&self) -> String {
        match &self {
            PipelineError::Source(e) => format!("Chain data source failed. {e}"),
            PipelineError::Metadata(e) => format!("{e}"),
            PipelineError::PayloadShape(e) => format!("{e}"),
            PipelineError::Signing(e) => format!("{e}"),
            PipelineError::Assembly(e) => format!("{e}"),
        }
    }
}

impl From<UnsupportedVersionError> for MetadataError {
    fn from(e: UnsupportedVersionError) -> Self {
        MetadataError::UnsupportedVersion(e)
    }
}

impl From<DecodeError> for MetadataError {
    fn from(e: DecodeError) -> Self {
        MetadataError::Decode(e)
    }
}

/// Implement [`Display`] for errors in both `std` and `no_std` cases.
/// Implement `Error` for `std` case.
macro_rules! impl_display_and_error {
    ($($ty: ty), *) => {
        $(
            impl Display for $ty {
                fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                    write!(f, "{}", self.error_text())
                }
            }

            #[cfg(feature = "std")]
            impl Error for $ty {
                fn source(&self) -> Option<&(dyn Error + 'static)> {
                    None
                }
            }
        )*
    }
}

impl_display_and_error!(
    UnsupportedVersionError,
    DecodeError,
    MetadataError,
    PayloadShapeError,
    CacheInsertError,
    SigningError,
    AssemblyError,
    DigestMismatchError
);

impl<S: Display> Display for PipelineError<S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.error_text())
    }
}

#[cfg(feature = "std")]
impl<S: Debug + Display> Error for PipelineError<S> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}
