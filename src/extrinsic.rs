//! Extrinsic assembly and disassembly.
//!
//! Signed extrinsic wire layout:
//!
//! `Compact(length) | version tag | address | signature | explicit
//! extensions data (mode included) | metadata hash (if mode enables
//! checking) | call`
//!
//! With [`EnvelopeFormat::ModeOnly`] the metadata hash is left out of the
//! envelope. It is still a part of the signed implicit data.
use crate::std::vec::Vec;

use parity_scale_codec::{Compact, Decode, Encode};

use crate::error::AssemblyError;
use crate::extensions::{ExplicitFields, ExtensionLayout};
use crate::payload::Mode;
use crate::signer::{Signature, SignerAddress};

/// Extrinsic format version this assembler produces.
pub const EXTRINSIC_VERSION: u8 = 4;

/// Version tag bit for signed extrinsics.
const SIGNED_FLAG: u8 = 0b1000_0000;

/// What the envelope carries for `CheckMetadataHash`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EnvelopeFormat {
    /// Mode byte, then metadata hash if checking is enabled.
    #[default]
    ModeAndHash,
    /// Mode byte only, as FRAME `CheckMetadataHash` expects.
    ModeOnly,
}

/// Extrinsic fields before consistency checks.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtrinsicParts {
    pub version: u8,
    pub signer: SignerAddress,
    pub signature: Signature,
    pub extra: ExplicitFields,
    pub metadata_hash: Option<[u8; 32]>,
    pub call: Vec<u8>,
}

/// Assembled signed extrinsic.
///
/// Built only by [`ExtrinsicAssembler::assemble`], never modified
/// afterwards. Re-signing needs a new augmented payload and a new
/// `SignedExtrinsic`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedExtrinsic {
    parts: ExtrinsicParts,
    encoded: Vec<u8>,
}

impl SignedExtrinsic {
    pub fn parts(&self) -> &ExtrinsicParts {
        &self.parts
    }

    pub fn mode(&self) -> Mode {
        self.parts.extra.mode
    }

    /// Bytes ready for submission.
    pub fn encoded(&self) -> &[u8] {
        &self.encoded
    }

    pub fn into_encoded(self) -> Vec<u8> {
        self.encoded
    }
}

/// Extrinsic assembler for given extensions layout.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtrinsicAssembler {
    layout: ExtensionLayout,
    format: EnvelopeFormat,
}

impl ExtrinsicAssembler {
    pub fn new(layout: ExtensionLayout) -> Self {
        Self {
            layout,
            format: EnvelopeFormat::default(),
        }
    }

    pub fn with_format(self, format: EnvelopeFormat) -> Self {
        Self { format, ..self }
    }

    pub fn format(&self) -> EnvelopeFormat {
        self.format
    }

    /// Check parts consistency and encode.
    pub fn assemble(&self, parts: ExtrinsicParts) -> Result<SignedExtrinsic, AssemblyError> {
        if parts.call.is_empty() {
            return Err(AssemblyError::CallAbsent);
        }
        if parts.version != EXTRINSIC_VERSION {
            return Err(AssemblyError::UnexpectedVersion {
                version: parts.version,
            });
        }
        match (parts.extra.mode, parts.metadata_hash) {
            (Mode::MetadataHashEnabled, None) if self.format == EnvelopeFormat::ModeAndHash => {
                return Err(AssemblyError::MetadataHashMissing)
            }
            (Mode::Disabled, Some(_)) => return Err(AssemblyError::MetadataHashUnexpected),
            (Mode::MetadataHashEnabled, Some(_)) if !self.layout.has_metadata_hash() => {
                return Err(AssemblyError::ModeWithoutExtension)
            }
            _ => {}
        }

        let mut body = vec![parts.version | SIGNED_FLAG];
        parts.signer.encode_to(&mut body);
        parts.signature.encode_to(&mut body);
        self.layout.encode_explicit_to(&parts.extra, &mut body);
        if let (EnvelopeFormat::ModeAndHash, Some(metadata_hash)) =
            (self.format, parts.metadata_hash)
        {
            body.extend_from_slice(&metadata_hash);
        }
        body.extend_from_slice(&parts.call);

        let mut encoded = Compact(body.len() as u32).encode();
        encoded.extend_from_slice(&body);
        Ok(SignedExtrinsic { parts, encoded })
    }

    /// Split encoded extrinsic back into parts.
    ///
    /// Inverse of [`assemble`](Self::assemble): assembling the parts gives
    /// the same bytes. Metadata hash is `None` for
    /// [`EnvelopeFormat::ModeOnly`].
    pub fn disassemble(&self, bytes: &[u8]) -> Result<ExtrinsicParts, AssemblyError> {
        let mut data = bytes;
        let declared = Compact::<u32>::decode(&mut data)
            .map_err(|e| AssemblyError::Codec(format!("{e}")))?
            .0;
        if declared as usize != data.len() {
            return Err(AssemblyError::LengthMismatch {
                declared,
                actual: data.len(),
            });
        }

        let version_tag = u8::decode(&mut data).map_err(|e| AssemblyError::Codec(format!("{e}")))?;
        if version_tag & SIGNED_FLAG == 0 {
            return Err(AssemblyError::NotSigned);
        }
        let version = version_tag & !SIGNED_FLAG;
        if version != EXTRINSIC_VERSION {
            return Err(AssemblyError::UnexpectedVersion { version });
        }

        let signer =
            SignerAddress::decode(&mut data).map_err(|e| AssemblyError::Codec(format!("{e}")))?;
        let signature =
            Signature::decode(&mut data).map_err(|e| AssemblyError::Codec(format!("{e}")))?;
        let extra = self.layout.decode_explicit(&mut data)?;
        let hash_transmitted = self.format == EnvelopeFormat::ModeAndHash;
        let metadata_hash = if extra.mode.is_enabled() && hash_transmitted {
            Some(<[u8; 32]>::decode(&mut data).map_err(|e| AssemblyError::Codec(format!("{e}")))?)
        } else {
            None
        };
        if data.is_empty() {
            return Err(AssemblyError::CallAbsent);
        }

        Ok(ExtrinsicParts {
            version,
            signer,
            signature,
            extra,
            metadata_hash,
            call: data.to_vec(),
        })
    }
}
