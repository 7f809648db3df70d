//! Metadata decoding and structural validation.
//!
//! Runtime metadata arrives as SCALE-encoded
//! [`RuntimeMetadataPrefixed`](frame_metadata::RuntimeMetadataPrefixed): four
//! bytes of `meta` magic, one byte of metadata version, then the versioned
//! body. Version is checked before the body is touched, so that unsupported
//! metadata is reported as such and not as a decoding failure.
//!
//! Decoded metadata is reduced to [`RuntimeMetadata`], a version-independent
//! view with type references stored as registry ids only.
use crate::std::{borrow::ToOwned, string::String, vec::Vec};

use frame_metadata::{
    v14::{RuntimeMetadataV14, StorageEntryModifier, StorageEntryType, StorageHasher},
    v15::RuntimeMetadataV15,
    RuntimeMetadata as VersionedMetadata, RuntimeMetadataPrefixed, META_RESERVED,
};
use parity_scale_codec::{Decode, Encode};
use scale_info::{form::PortableForm, PortableRegistry, Type, TypeDef};

use crate::error::{DecodeError, MetadataError, ReferenceContext, UnsupportedVersionError};
use crate::LOG_TARGET;

/// Metadata versions the decoder accepts.
pub const SUPPORTED_METADATA_VERSIONS: [u32; 2] = [14, 15];

/// Metadata version requested from the node by default.
pub const PREFERRED_METADATA_VERSION: u32 = 15;

/// Decoded runtime metadata.
///
/// Immutable once decoded. All type references inside are ids in `types`,
/// guaranteed to resolve.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeMetadata {
    pub version: u32,
    pub types: PortableRegistry,
    pub pallets: Vec<PalletEntry>,
    pub extrinsic: ExtrinsicFormat,
    pub runtime: RuntimeInterface,
}

/// Pallet as seen in metadata, docs dropped.
#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct PalletEntry {
    pub name: String,
    pub index: u8,
    pub calls: Option<u32>,
    pub event: Option<u32>,
    pub error: Option<u32>,
    pub constants: Vec<ConstantEntry>,
    pub storage: Option<PalletStorage>,
}

#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct ConstantEntry {
    pub name: String,
    pub ty: u32,
    pub value: Vec<u8>,
}

#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct PalletStorage {
    pub prefix: String,
    pub entries: Vec<StorageEntry>,
}

#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct StorageEntry {
    pub name: String,
    pub modifier: StorageEntryModifier,
    pub kind: StorageKind,
    pub default: Vec<u8>,
}

#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub enum StorageKind {
    Plain {
        value: u32,
    },
    Map {
        hashers: Vec<StorageHasher>,
        key: u32,
        value: u32,
    },
}

/// Extrinsic format: envelope version, envelope part types, and signed
/// extensions in the order they are encoded.
#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct ExtrinsicFormat {
    pub version: u8,
    pub address_ty: u32,
    pub call_ty: u32,
    pub signature_ty: u32,
    pub extra_ty: u32,
    pub signed_extensions: Vec<SignedExtensionEntry>,
}

/// Signed extension: identifier, type of explicit data (included in
/// extrinsic), type of implicit data (only signed).
#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct SignedExtensionEntry {
    pub identifier: String,
    pub ty: u32,
    pub implicit_ty: u32,
}

/// Runtime-level metadata outside of pallets, docs dropped.
///
/// Outer enums, runtime APIs and custom values exist since V15.
#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct RuntimeInterface {
    pub ty: u32,
    pub outer_enums: Option<OuterEnumsEntry>,
    pub apis: Vec<RuntimeApiEntry>,
    pub custom: Vec<CustomValueEntry>,
}

#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct OuterEnumsEntry {
    pub call_enum_ty: u32,
    pub event_enum_ty: u32,
    pub error_enum_ty: u32,
}

#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct RuntimeApiEntry {
    pub name: String,
    pub methods: Vec<RuntimeApiMethodEntry>,
}

#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct RuntimeApiMethodEntry {
    pub name: String,
    pub inputs: Vec<RuntimeApiParamEntry>,
    pub output: u32,
}

#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct RuntimeApiParamEntry {
    pub name: String,
    pub ty: u32,
}

/// Custom value, in key order.
#[derive(Clone, Debug, Encode, Eq, PartialEq)]
pub struct CustomValueEntry {
    pub name: String,
    pub ty: u32,
    pub value: Vec<u8>,
}

impl RuntimeMetadata {
    /// Find signed extension by identifier.
    pub fn signed_extension(&self, identifier: &str) -> Option<&SignedExtensionEntry> {
        self.extrinsic
            .signed_extensions
            .iter()
            .find(|extension| extension.identifier == identifier)
    }

    /// Resolve type by id.
    pub fn resolve(&self, id: u32) -> Option<&Type<PortableForm>> {
        self.types.resolve(id)
    }

    /// Base58 prefix from `System` pallet `SS58Prefix` constant.
    pub fn ss58_prefix(&self) -> Option<u16> {
        let value = self
            .pallets
            .iter()
            .find(|pallet| pallet.name == "System")?
            .constant("SS58Prefix")?;
        u16::decode(&mut &value[..]).ok()
    }
}

/// Decode prefixed metadata bytes.
///
/// Pure function of input bytes. Fails with
/// [`UnsupportedVersionError`] for metadata versions not in
/// [`SUPPORTED_METADATA_VERSIONS`], and with [`DecodeError`] on truncated,
/// excessive, or structurally invalid input.
pub fn decode_metadata(raw: &[u8]) -> Result<RuntimeMetadata, MetadataError> {
    let magic: [u8; 4] = raw
        .get(..4)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(DecodeError::NoMetaPrefix)?;
    if u32::from_le_bytes(magic) != META_RESERVED {
        return Err(DecodeError::NoMetaPrefix.into());
    }
    let version = *raw
        .get(4)
        .ok_or_else(|| DecodeError::Codec(String::from("Metadata version byte is missing.")))?
        as u32;
    if !SUPPORTED_METADATA_VERSIONS.contains(&version) {
        return Err(UnsupportedVersionError { version }.into());
    }

    let mut data = raw;
    let prefixed = RuntimeMetadataPrefixed::decode(&mut data)
        .map_err(|e| DecodeError::Codec(format!("{e}")))?;
    if !data.is_empty() {
        return Err(DecodeError::SomeDataNotUsed {
            from: raw.len() - data.len(),
        }
        .into());
    }

    let runtime_metadata = match prefixed.1 {
        VersionedMetadata::V14(metadata_v14) => from_v14(metadata_v14)?,
        VersionedMetadata::V15(metadata_v15) => from_v15(metadata_v15)?,
        other => {
            return Err(UnsupportedVersionError {
                version: other.version(),
            }
            .into())
        }
    };
    validate_references(&runtime_metadata)?;

    log::debug!(
        target: LOG_TARGET,
        "decoded metadata V{}: {} types, {} pallets, {} signed extensions",
        runtime_metadata.version,
        runtime_metadata.types.types.len(),
        runtime_metadata.pallets.len(),
        runtime_metadata.extrinsic.signed_extensions.len(),
    );
    Ok(runtime_metadata)
}

/// Decode metadata in the form returned by `Metadata_metadata_at_version`
/// runtime call: `Option` of length-prefixed prefixed metadata.
pub fn decode_opaque(raw: &[u8]) -> Result<RuntimeMetadata, MetadataError> {
    let mut data = raw;
    let opaque = Option::<Vec<u8>>::decode(&mut data)
        .map_err(|e| DecodeError::Codec(format!("{e}")))?;
    if !data.is_empty() {
        return Err(DecodeError::SomeDataNotUsed {
            from: raw.len() - data.len(),
        }
        .into());
    }
    match opaque {
        Some(prefixed) => decode_metadata(&prefixed),
        None => Err(DecodeError::Absent.into()),
    }
}

/// Version-independent signed extensions list.
///
/// Signed extension and pallet metadata structs of different versions are
/// distinct types with identical field names, so conversions are macros.
macro_rules! signed_extensions {
    ($extensions:expr) => {
        $extensions
            .into_iter()
            .map(|extension| SignedExtensionEntry {
                identifier: extension.identifier,
                ty: extension.ty.id,
                implicit_ty: extension.additional_signed.id,
            })
            .collect()
    };
}

/// Version-independent pallet entry, docs dropped.
macro_rules! pallet_entry {
    ($pallet:expr) => {{
        let pallet = $pallet;
        PalletEntry {
            name: pallet.name,
            index: pallet.index,
            calls: pallet.calls.map(|calls| calls.ty.id),
            event: pallet.event.map(|event| event.ty.id),
            error: pallet.error.map(|error| error.ty.id),
            constants: pallet
                .constants
                .into_iter()
                .map(|constant| ConstantEntry {
                    name: constant.name,
                    ty: constant.ty.id,
                    value: constant.value,
                })
                .collect(),
            storage: pallet.storage.map(|storage| PalletStorage {
                prefix: storage.prefix,
                entries: storage
                    .entries
                    .into_iter()
                    .map(|entry| StorageEntry {
                        name: entry.name,
                        modifier: entry.modifier,
                        kind: match entry.ty {
                            StorageEntryType::Plain(value) => StorageKind::Plain { value: value.id },
                            StorageEntryType::Map {
                                hashers,
                                key,
                                value,
                            } => StorageKind::Map {
                                hashers,
                                key: key.id,
                                value: value.id,
                            },
                        },
                        default: entry.default,
                    })
                    .collect(),
            }),
        }
    }};
}

fn from_v14(metadata_v14: RuntimeMetadataV14) -> Result<RuntimeMetadata, DecodeError> {
    let extrinsic_ty = metadata_v14.extrinsic.ty.id;
    let param_id = |name: &'static str| -> Result<u32, DecodeError> {
        metadata_v14
            .types
            .resolve(extrinsic_ty)
            .ok_or(DecodeError::DanglingTypeReference {
                id: extrinsic_ty,
                context: ReferenceContext::Extrinsic,
            })?
            .type_params
            .iter()
            .find(|param| param.name == name)
            .and_then(|param| param.ty.as_ref().map(|ty| ty.id))
            .ok_or(DecodeError::ExtrinsicTypeParamMissing { name })
    };
    let extrinsic = ExtrinsicFormat {
        version: metadata_v14.extrinsic.version,
        address_ty: param_id("Address")?,
        call_ty: param_id("Call")?,
        signature_ty: param_id("Signature")?,
        extra_ty: param_id("Extra")?,
        signed_extensions: signed_extensions!(metadata_v14.extrinsic.signed_extensions),
    };
    let pallets = metadata_v14
        .pallets
        .into_iter()
        .map(|pallet| pallet_entry!(pallet))
        .collect();
    Ok(RuntimeMetadata {
        version: 14,
        types: metadata_v14.types,
        pallets,
        extrinsic,
        runtime: RuntimeInterface {
            ty: metadata_v14.ty.id,
            outer_enums: None,
            apis: Vec::new(),
            custom: Vec::new(),
        },
    })
}

fn from_v15(metadata_v15: RuntimeMetadataV15) -> Result<RuntimeMetadata, DecodeError> {
    let extrinsic = ExtrinsicFormat {
        version: metadata_v15.extrinsic.version,
        address_ty: metadata_v15.extrinsic.address_ty.id,
        call_ty: metadata_v15.extrinsic.call_ty.id,
        signature_ty: metadata_v15.extrinsic.signature_ty.id,
        extra_ty: metadata_v15.extrinsic.extra_ty.id,
        signed_extensions: signed_extensions!(metadata_v15.extrinsic.signed_extensions),
    };
    let pallets = metadata_v15
        .pallets
        .into_iter()
        .map(|pallet| pallet_entry!(pallet))
        .collect();
    Ok(RuntimeMetadata {
        version: 15,
        types: metadata_v15.types,
        pallets,
        extrinsic,
        runtime: RuntimeInterface {
            ty: metadata_v15.ty.id,
            outer_enums: Some(OuterEnumsEntry {
                call_enum_ty: metadata_v15.outer_enums.call_enum_ty.id,
                event_enum_ty: metadata_v15.outer_enums.event_enum_ty.id,
                error_enum_ty: metadata_v15.outer_enums.error_enum_ty.id,
            }),
            apis: metadata_v15
                .apis
                .into_iter()
                .map(|api| RuntimeApiEntry {
                    name: api.name,
                    methods: api
                        .methods
                        .into_iter()
                        .map(|method| RuntimeApiMethodEntry {
                            name: method.name,
                            inputs: method
                                .inputs
                                .into_iter()
                                .map(|input| RuntimeApiParamEntry {
                                    name: input.name,
                                    ty: input.ty.id,
                                })
                                .collect(),
                            output: method.output.id,
                        })
                        .collect(),
                })
                .collect(),
            custom: metadata_v15
                .custom
                .map
                .into_iter()
                .map(|(name, custom_value)| CustomValueEntry {
                    name,
                    ty: custom_value.ty.id,
                    value: custom_value.value,
                })
                .collect(),
        },
    })
}

/// Type ids a registry entry refers to.
pub(crate) fn type_references(ty: &Type<PortableForm>) -> Vec<u32> {
    let mut references: Vec<u32> = ty
        .type_params
        .iter()
        .filter_map(|param| param.ty.as_ref().map(|ty| ty.id))
        .collect();
    match &ty.type_def {
        TypeDef::Composite(composite) => {
            references.extend(composite.fields.iter().map(|field| field.ty.id))
        }
        TypeDef::Variant(variant) => references.extend(
            variant
                .variants
                .iter()
                .flat_map(|variant| variant.fields.iter().map(|field| field.ty.id)),
        ),
        TypeDef::Sequence(sequence) => references.push(sequence.type_param.id),
        TypeDef::Array(array) => references.push(array.type_param.id),
        TypeDef::Tuple(tuple) => references.extend(tuple.fields.iter().map(|field| field.id)),
        TypeDef::Primitive(_) => {}
        TypeDef::Compact(compact) => references.push(compact.type_param.id),
        TypeDef::BitSequence(bit_sequence) => {
            references.push(bit_sequence.bit_store_type.id);
            references.push(bit_sequence.bit_order_type.id);
        }
    }
    references
}

/// Check that registry ids are positional and all references resolve.
fn validate_references(runtime_metadata: &RuntimeMetadata) -> Result<(), DecodeError> {
    let registry_len = runtime_metadata.types.types.len();
    let check = |id: u32, context: ReferenceContext| -> Result<(), DecodeError> {
        if (id as usize) < registry_len {
            Ok(())
        } else {
            Err(DecodeError::DanglingTypeReference { id, context })
        }
    };

    for (position, registry_entry) in runtime_metadata.types.types.iter().enumerate() {
        if registry_entry.id as usize != position {
            return Err(DecodeError::NonPositionalTypeId {
                position: position as u32,
                id: registry_entry.id,
            });
        }
        for id in type_references(&registry_entry.ty) {
            check(
                id,
                ReferenceContext::Type {
                    id: registry_entry.id,
                },
            )?;
        }
    }

    for pallet in runtime_metadata.pallets.iter() {
        let context = ReferenceContext::Pallet {
            index: pallet.index,
        };
        for id in [pallet.calls, pallet.event, pallet.error].into_iter().flatten() {
            check(id, context)?;
        }
        for constant in pallet.constants.iter() {
            check(constant.ty, context)?;
        }
        if let Some(ref storage) = pallet.storage {
            for entry in storage.entries.iter() {
                match entry.kind {
                    StorageKind::Plain { value } => check(value, context)?,
                    StorageKind::Map { key, value, .. } => {
                        check(key, context)?;
                        check(value, context)?;
                    }
                }
            }
        }
    }

    let extrinsic = &runtime_metadata.extrinsic;
    for id in [
        extrinsic.address_ty,
        extrinsic.call_ty,
        extrinsic.signature_ty,
        extrinsic.extra_ty,
    ] {
        check(id, ReferenceContext::Extrinsic)?;
    }
    for extension in extrinsic.signed_extensions.iter() {
        check(extension.ty, ReferenceContext::Extrinsic)?;
        check(extension.implicit_ty, ReferenceContext::Extrinsic)?;
    }

    let runtime = &runtime_metadata.runtime;
    check(runtime.ty, ReferenceContext::RuntimeType)?;
    if let Some(ref outer_enums) = runtime.outer_enums {
        for id in [
            outer_enums.call_enum_ty,
            outer_enums.event_enum_ty,
            outer_enums.error_enum_ty,
        ] {
            check(id, ReferenceContext::RuntimeType)?;
        }
    }
    for method in runtime.apis.iter().flat_map(|api| api.methods.iter()) {
        for input in method.inputs.iter() {
            check(input.ty, ReferenceContext::RuntimeType)?;
        }
        check(method.output, ReferenceContext::RuntimeType)?;
    }
    for custom_value in runtime.custom.iter() {
        check(custom_value.ty, ReferenceContext::RuntimeType)?;
    }
    Ok(())
}

impl PalletEntry {
    /// Constant value by name.
    pub fn constant(&self, name: &str) -> Option<Vec<u8>> {
        self.constants
            .iter()
            .find(|constant| constant.name == name)
            .map(|constant| constant.value.to_owned())
    }
}
