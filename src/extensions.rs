//! Signed extensions layout.
//!
//! Runtime declares signed extensions in metadata, in the order their data
//! is encoded. Each extension has explicit data (included in extrinsic and
//! signed) and implicit data (only signed). The layout maps the declared
//! list onto the data this signer is able to produce, and rejects
//! extensions it could not fill.
use crate::std::{string::String, vec::Vec};

use parity_scale_codec::{Compact, Decode, Encode, Input};
use primitive_types::H256;
use scale_info::TypeDef;

use crate::era::Era;
use crate::error::{AssemblyError, PayloadShapeError};
use crate::metadata::RuntimeMetadata;
use crate::payload::Mode;

/// Identifier of metadata hash check extension.
pub const CHECK_METADATA_HASH: &str = "CheckMetadataHash";

/// Nesting limit for zero-sized type check.
const ZERO_SIZED_DEPTH_LIMIT: u32 = 32;

/// Signed extension kinds, by data they carry.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExtensionKind {
    NonZeroSender,
    SpecVersion,
    TxVersion,
    Genesis,
    Mortality,
    Nonce,
    Weight,
    TransactionPayment,
    MetadataHash,
    /// Unknown extension with no explicit and no implicit data.
    ZeroSized(String),
}

impl ExtensionKind {
    fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier {
            "CheckNonZeroSender" => Some(Self::NonZeroSender),
            "CheckSpecVersion" => Some(Self::SpecVersion),
            "CheckTxVersion" => Some(Self::TxVersion),
            "CheckGenesis" => Some(Self::Genesis),
            "CheckMortality" | "CheckEra" => Some(Self::Mortality),
            "CheckNonce" => Some(Self::Nonce),
            "CheckWeight" => Some(Self::Weight),
            "ChargeTransactionPayment" => Some(Self::TransactionPayment),
            CHECK_METADATA_HASH => Some(Self::MetadataHash),
            _ => None,
        }
    }
}

/// Explicit extension data, as carried in the extrinsic.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExplicitFields {
    pub era: Era,
    pub nonce: u64,
    pub tip: u128,
    pub mode: Mode,
}

/// Implicit extension data, signed but not transmitted.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ImplicitFields {
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: H256,
    pub mortality_checkpoint: H256,
    pub metadata_hash: Option<[u8; 32]>,
}

/// Signed extensions in declared order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtensionLayout {
    pub extensions: Vec<ExtensionKind>,
}

impl ExtensionLayout {
    /// Derive layout from the extension list in metadata.
    pub fn from_metadata(runtime_metadata: &RuntimeMetadata) -> Result<Self, PayloadShapeError> {
        let mut extensions = Vec::with_capacity(runtime_metadata.extrinsic.signed_extensions.len());
        for extension in runtime_metadata.extrinsic.signed_extensions.iter() {
            match ExtensionKind::from_identifier(&extension.identifier) {
                Some(kind) => extensions.push(kind),
                None => {
                    for id in [extension.ty, extension.implicit_ty] {
                        if !is_zero_sized(runtime_metadata, id, 0).map_err(|id| {
                            PayloadShapeError::ExtensionTypeNotResolved {
                                identifier: extension.identifier.clone(),
                                id,
                            }
                        })? {
                            return Err(PayloadShapeError::UnsupportedExtension {
                                identifier: extension.identifier.clone(),
                            });
                        }
                    }
                    extensions.push(ExtensionKind::ZeroSized(extension.identifier.clone()))
                }
            }
        }
        Ok(Self { extensions })
    }

    /// Runtime supports metadata hash checking.
    pub fn has_metadata_hash(&self) -> bool {
        self.extensions.contains(&ExtensionKind::MetadataHash)
    }

    /// Encode explicit data of all extensions, in declared order.
    pub fn encode_explicit_to(&self, fields: &ExplicitFields, output: &mut Vec<u8>) {
        for extension in self.extensions.iter() {
            match extension {
                ExtensionKind::Mortality => fields.era.encode_to(output),
                ExtensionKind::Nonce => Compact(fields.nonce).encode_to(output),
                ExtensionKind::TransactionPayment => Compact(fields.tip).encode_to(output),
                ExtensionKind::MetadataHash => fields.mode.encode_to(output),
                _ => {}
            }
        }
    }

    /// Encode implicit data of all extensions, in declared order.
    pub fn encode_implicit_to(&self, fields: &ImplicitFields, output: &mut Vec<u8>) {
        for extension in self.extensions.iter() {
            match extension {
                ExtensionKind::SpecVersion => fields.spec_version.encode_to(output),
                ExtensionKind::TxVersion => fields.transaction_version.encode_to(output),
                ExtensionKind::Genesis => fields.genesis_hash.encode_to(output),
                ExtensionKind::Mortality => fields.mortality_checkpoint.encode_to(output),
                ExtensionKind::MetadataHash => fields.metadata_hash.encode_to(output),
                _ => {}
            }
        }
    }

    /// Decode explicit data. Fields of extensions missing from the layout
    /// get their neutral values.
    pub fn decode_explicit<I: Input>(&self, input: &mut I) -> Result<ExplicitFields, AssemblyError> {
        let mut fields = ExplicitFields {
            era: Era::Immortal,
            nonce: 0,
            tip: 0,
            mode: Mode::Disabled,
        };
        for extension in self.extensions.iter() {
            match extension {
                ExtensionKind::Mortality => fields.era = Era::decode(input).map_err(codec_error)?,
                ExtensionKind::Nonce => {
                    fields.nonce = Compact::<u64>::decode(input).map_err(codec_error)?.0
                }
                ExtensionKind::TransactionPayment => {
                    fields.tip = Compact::<u128>::decode(input).map_err(codec_error)?.0
                }
                ExtensionKind::MetadataHash => {
                    let mode = input.read_byte().map_err(codec_error)?;
                    fields.mode = Mode::from_byte(mode).ok_or(AssemblyError::UnknownMode { mode })?
                }
                _ => {}
            }
        }
        Ok(fields)
    }
}

fn codec_error(e: parity_scale_codec::Error) -> AssemblyError {
    AssemblyError::Codec(format!("{e}"))
}

/// Type encodes into no bytes at all.
///
/// Unresolved type id is returned as error.
fn is_zero_sized(runtime_metadata: &RuntimeMetadata, id: u32, depth: u32) -> Result<bool, u32> {
    if depth > ZERO_SIZED_DEPTH_LIMIT {
        return Ok(false);
    }
    let ty = runtime_metadata.resolve(id).ok_or(id)?;
    match &ty.type_def {
        TypeDef::Composite(composite) => {
            for field in composite.fields.iter() {
                if !is_zero_sized(runtime_metadata, field.ty.id, depth + 1)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        TypeDef::Tuple(tuple) => {
            for field in tuple.fields.iter() {
                if !is_zero_sized(runtime_metadata, field.id, depth + 1)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        TypeDef::Array(array) => Ok(array.len == 0
            || is_zero_sized(runtime_metadata, array.type_param.id, depth + 1)?),
        _ => Ok(false),
    }
}
