//! Canonical metadata leaves for digest tree construction.
use crate::std::{borrow::ToOwned, vec::Vec};

use parity_scale_codec::Encode;
use scale_info::{
    form::PortableForm, Path, PortableRegistry, PortableType, Type, TypeDef, TypeDefVariant,
    TypeParameter, Variant,
};

use crate::metadata::{ExtrinsicFormat, PalletEntry, RuntimeInterface, RuntimeMetadata};

/// Single digest tree leaf before hashing.
///
/// Variant index is the leaf kind tag in SCALE encoding, and the first sort
/// key.
#[derive(Debug, Encode, PartialEq)]
pub enum LeafEntry<'a> {
    #[codec(index = 0)]
    Type(PortableType),
    #[codec(index = 1)]
    Pallet(&'a PalletEntry),
    #[codec(index = 2)]
    ExtrinsicFormat(&'a ExtrinsicFormat),
    #[codec(index = 3)]
    Runtime(&'a RuntimeInterface),
}

impl<'a> LeafEntry<'a> {
    /// Leaf sort key: kind, id, variant index within single id.
    fn sort_key(&self) -> (u8, u32, u16) {
        match self {
            LeafEntry::Type(portable_type) => {
                let (id, variant_position) = type_sort_key(portable_type);
                (0, id, variant_position)
            }
            LeafEntry::Pallet(pallet) => (1, pallet.index as u32, 0),
            LeafEntry::ExtrinsicFormat(_) => (2, 0, 0),
            LeafEntry::Runtime(_) => (3, 0, 0),
        }
    }
}

/// Type leaf sort key: id, variant index for single-variant enum leaves.
fn type_sort_key(portable_type: &PortableType) -> (u32, u16) {
    let variant_position = match portable_type.ty.type_def {
        TypeDef::Variant(ref type_def_variant) => type_def_variant
            .variants
            .first()
            .map(|variant| variant.index as u16)
            .unwrap_or(0),
        _ => 0,
    };
    (portable_type.id, variant_position)
}

/// Registry separated into elements that are transformed into tree leaves.
///
/// Each element is a [`PortableType`] with either a single type entry
/// (for non-enums and for enums with no variants) or with an enum entry with
/// a single enum variant (for enums). If multiple variants of a single enum
/// are present, they are entered as separate [`PortableType`]s with the same
/// id. Docs are removed everywhere.
///
/// `TypeLeaves` are not intended to be used for decoding.
#[derive(Debug, PartialEq)]
pub struct TypeLeaves {
    pub types: Vec<PortableType>,
}

impl TypeLeaves {
    /// Split registry into leaf types.
    ///
    /// In `TypeLeaves`:
    /// - Each non-enum type has an individual entry
    /// - Each enum variant is transformed into enum type with a single
    /// variant, id is the same
    /// - Entries are sorted by id
    /// - Entries with identical id (enum variants) are sorted by variant index
    pub fn from_registry(registry: &PortableRegistry) -> Self {
        let mut types = Vec::with_capacity(registry.types.len());
        for registry_entry in registry.types.iter() {
            match registry_entry.ty.type_def {
                TypeDef::Variant(ref type_def_variant)
                    if !type_def_variant.variants.is_empty() =>
                {
                    for variant in type_def_variant.variants.iter() {
                        types.push(PortableType {
                            id: registry_entry.id,
                            ty: enum_with_single_variant(
                                &registry_entry.ty.path,
                                &registry_entry.ty.type_params,
                                variant.to_owned(),
                            ),
                        })
                    }
                }
                _ => types.push(PortableType {
                    id: registry_entry.id,
                    ty: regular_without_docs(registry_entry.ty.to_owned()),
                }),
            }
        }
        let mut leaves = TypeLeaves { types };
        leaves.sort();
        leaves
    }

    fn sort(&mut self) {
        self.types.sort_by_key(type_sort_key);
    }
}

/// Remove docs from type itself and from each field in structs.
///
/// Enums with non-empty set of variants do not get here, other types do not
/// have internal field-related docs.
fn regular_without_docs(mut ty: Type<PortableForm>) -> Type<PortableForm> {
    if let TypeDef::Composite(ref mut type_def_composite) = ty.type_def {
        for field in type_def_composite.fields.iter_mut() {
            field.docs.clear();
        }
    }
    ty.docs.clear();
    ty
}

/// Enum with a single variant, variant and field docs removed.
fn enum_with_single_variant(
    path: &Path<PortableForm>,
    type_params: &[TypeParameter<PortableForm>],
    mut variant: Variant<PortableForm>,
) -> Type<PortableForm> {
    variant.docs.clear();
    for field in variant.fields.iter_mut() {
        field.docs.clear();
    }
    Type {
        path: path.to_owned(),
        type_params: type_params.to_vec(),
        type_def: TypeDef::Variant(TypeDefVariant {
            variants: vec![variant],
        }),
        docs: Vec::new(),
    }
}

/// All leaves of the metadata, sorted.
pub fn metadata_leaves(runtime_metadata: &RuntimeMetadata) -> Vec<LeafEntry<'_>> {
    let mut leaves: Vec<LeafEntry<'_>> = TypeLeaves::from_registry(&runtime_metadata.types)
        .types
        .into_iter()
        .map(LeafEntry::Type)
        .collect();
    leaves.extend(runtime_metadata.pallets.iter().map(LeafEntry::Pallet));
    leaves.push(LeafEntry::ExtrinsicFormat(&runtime_metadata.extrinsic));
    leaves.push(LeafEntry::Runtime(&runtime_metadata.runtime));
    leaves.sort_by_key(|leaf| leaf.sort_key());
    leaves
}

/// Type leaves only, sorted.
pub fn registry_leaves(registry: &PortableRegistry) -> Vec<LeafEntry<'static>> {
    TypeLeaves::from_registry(registry)
        .types
        .into_iter()
        .map(LeafEntry::Type)
        .collect()
}
