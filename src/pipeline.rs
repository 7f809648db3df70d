//! Signing pipeline stages.
//!
//! Each stage is a separate type, and every transition consumes the previous
//! stage:
//!
//! `Pipeline -> MetadataDecoded -> DigestComputed -> PayloadAugmented ->
//! Signed -> Assembled`
//!
//! Failure at any stage returns an error and no signed bytes. Signing
//! failure hands [`PayloadAugmented`] back in [`SignFailure`], so signing
//! could be retried with the very same payload. Once [`Signed`], payload is
//! not accessible for modification.
//!
//! Chain access is not a part of the pipeline. [`ChainSource`] describes what
//! the pipeline needs from the node, and [`run_pipeline`] drives all stages
//! against it.
use crate::std::vec::Vec;

use crate::digest::{hex_string, DigestBuilder, ExtraInfo, MetadataDigest};
use crate::error::{AssemblyError, MetadataError, PayloadShapeError, SigningError};
use crate::extensions::ExtensionLayout;
use crate::extrinsic::{
    EnvelopeFormat, ExtrinsicAssembler, ExtrinsicParts, SignedExtrinsic, EXTRINSIC_VERSION,
};
use crate::metadata::{decode_metadata, RuntimeMetadata};
use crate::payload::{AugmentedPayload, Mode, PayloadAugmenter, UnsignedPayload};
use crate::signer::{Signature, Signer};
use crate::LOG_TARGET;

#[cfg(feature = "std")]
pub use runner::{run_pipeline, ChainSource, PipelineContext, TransactionRequest};

/// Pipeline start.
#[derive(Debug, Default)]
pub struct Pipeline;

impl Pipeline {
    pub fn new() -> Self {
        Pipeline
    }

    pub fn decode_metadata(self, raw: &[u8]) -> Result<MetadataDecoded, MetadataError> {
        Ok(self.with_metadata(decode_metadata(raw)?))
    }

    /// Start from metadata decoded elsewhere.
    pub fn with_metadata(self, metadata: RuntimeMetadata) -> MetadataDecoded {
        MetadataDecoded { metadata }
    }
}

#[derive(Debug)]
pub struct MetadataDecoded {
    metadata: RuntimeMetadata,
}

impl MetadataDecoded {
    pub fn metadata(&self) -> &RuntimeMetadata {
        &self.metadata
    }

    pub fn compute_digest(self, extra_info: &ExtraInfo) -> DigestComputed {
        let digest = DigestBuilder::digest(&self.metadata, extra_info);
        DigestComputed {
            metadata: self.metadata,
            digest: Some(digest),
        }
    }

    /// Compute digest, or take it from the cache shared with other
    /// pipelines.
    #[cfg(feature = "std")]
    pub fn compute_digest_cached(
        self,
        extra_info: &ExtraInfo,
        genesis_hash: primitive_types::H256,
        cache: &crate::cache::DigestCache,
    ) -> DigestComputed {
        let key = crate::cache::CacheKey {
            genesis_hash,
            spec_version: extra_info.spec_version,
        };
        let digest = cache.get_or_compute(key, || DigestBuilder::digest(&self.metadata, extra_info));
        DigestComputed {
            metadata: self.metadata,
            digest: Some(digest),
        }
    }

    /// Proceed without digest, for transactions with checking disabled.
    pub fn without_digest(self) -> DigestComputed {
        DigestComputed {
            metadata: self.metadata,
            digest: None,
        }
    }
}

#[derive(Debug)]
pub struct DigestComputed {
    metadata: RuntimeMetadata,
    digest: Option<MetadataDigest>,
}

impl DigestComputed {
    pub fn digest(&self) -> Option<&MetadataDigest> {
        self.digest.as_ref()
    }

    pub fn metadata(&self) -> &RuntimeMetadata {
        &self.metadata
    }

    /// Merge mode and digest into the unsigned payload.
    pub fn augment(
        self,
        unsigned: UnsignedPayload,
        mode: Mode,
    ) -> Result<PayloadAugmented, PayloadShapeError> {
        let augmenter = PayloadAugmenter::new(&self.metadata)?;
        let payload = augmenter.augment(unsigned, mode, self.digest.as_ref())?;
        Ok(PayloadAugmented {
            payload,
            digest: self.digest,
        })
    }
}

#[derive(Debug)]
pub struct PayloadAugmented {
    payload: AugmentedPayload,
    digest: Option<MetadataDigest>,
}

/// Signing failed. Stage is returned intact for a retry.
#[derive(Debug)]
pub struct SignFailure {
    pub stage: PayloadAugmented,
    pub error: SigningError,
}

impl PayloadAugmented {
    pub fn payload(&self) -> &AugmentedPayload {
        &self.payload
    }

    /// Sign canonical augmented payload.
    pub fn sign<S: Signer>(self, signer: &S) -> Result<Signed, SignFailure> {
        let signing_payload = self.payload.signing_payload();
        let signature = match signer.sign(&signing_payload) {
            Ok(signature) => signature,
            Err(error) => {
                log::debug!(target: LOG_TARGET, "signing failed: {error}");
                return Err(SignFailure { stage: self, error });
            }
        };
        let metadata_hash = self.payload.metadata_hash();
        let parts = ExtrinsicParts {
            version: EXTRINSIC_VERSION,
            signer: signer.address(),
            signature,
            extra: self.payload.explicit(),
            metadata_hash: metadata_hash.metadata_hash(),
            call: self.payload.unsigned().call.clone(),
        };
        Ok(Signed {
            parts,
            layout: self.payload.layout().clone(),
            digest: self.digest,
        })
    }
}

#[derive(Debug)]
pub struct Signed {
    parts: ExtrinsicParts,
    layout: ExtensionLayout,
    digest: Option<MetadataDigest>,
}

impl Signed {
    pub fn signature(&self) -> &Signature {
        &self.parts.signature
    }

    pub fn assemble(self) -> Result<Assembled, AssemblyError> {
        self.assemble_with(EnvelopeFormat::default())
    }

    pub fn assemble_with(self, format: EnvelopeFormat) -> Result<Assembled, AssemblyError> {
        let extrinsic = ExtrinsicAssembler::new(self.layout)
            .with_format(format)
            .assemble(self.parts)?;
        log::debug!(
            target: LOG_TARGET,
            "extrinsic assembled, {} bytes, mode {:?}{}",
            extrinsic.encoded().len(),
            extrinsic.mode(),
            self.digest
                .map(|digest| format!(", metadata hash {}", hex_string(&digest.root())))
                .unwrap_or_default(),
        );
        Ok(Assembled {
            extrinsic,
            digest: self.digest,
        })
    }
}

/// Final stage: extrinsic ready for submission.
#[derive(Debug)]
pub struct Assembled {
    extrinsic: SignedExtrinsic,
    digest: Option<MetadataDigest>,
}

impl Assembled {
    pub fn extrinsic(&self) -> &SignedExtrinsic {
        &self.extrinsic
    }

    /// Digest used, for audit.
    pub fn digest(&self) -> Option<&MetadataDigest> {
        self.digest.as_ref()
    }

    pub fn encoded(&self) -> &[u8] {
        self.extrinsic.encoded()
    }

    pub fn into_encoded(self) -> Vec<u8> {
        self.extrinsic.into_encoded()
    }
}

#[cfg(feature = "std")]
mod runner {
    use crate::std::vec::Vec;

    use primitive_types::H256;

    use super::{Assembled, Pipeline};
    use crate::cache::DigestCache;
    use crate::config::{ChainConfig, RuntimeVersion};
    use crate::digest::ExtraInfo;
    use crate::era::Era;
    use crate::error::PipelineError;
    use crate::extrinsic::EnvelopeFormat;
    use crate::metadata::PREFERRED_METADATA_VERSION;
    use crate::payload::{Mode, UnsignedPayload};
    use crate::signer::{Signer, SignerAddress};

    /// Node access the pipeline depends on.
    ///
    /// Timeouts and retries are the implementor's business.
    #[allow(async_fn_in_trait)]
    pub trait ChainSource {
        type Error;

        /// Prefixed metadata bytes of given version.
        async fn fetch_metadata(&self, version: u32) -> Result<Vec<u8>, Self::Error>;

        async fn fetch_runtime_version(&self) -> Result<RuntimeVersion, Self::Error>;

        /// Chain data not in the metadata. Could be static configuration.
        async fn fetch_chain_config(&self) -> Result<ChainConfig, Self::Error>;

        async fn fetch_genesis_hash(&self) -> Result<H256, Self::Error>;

        async fn fetch_nonce(&self, account: &SignerAddress) -> Result<u64, Self::Error>;
    }

    /// Collaborators for a pipeline run. Owned by the caller.
    pub struct PipelineContext<'a, C, S> {
        pub source: &'a C,
        pub signer: &'a S,
        pub cache: Option<&'a DigestCache>,
    }

    /// What to sign.
    #[derive(Clone, Debug, Eq, PartialEq)]
    pub struct TransactionRequest {
        pub call: Vec<u8>,
        pub era: Era,
        pub tip: u128,
        pub mortality_checkpoint: Option<H256>,
        pub mode: Mode,
        pub envelope: EnvelopeFormat,
    }

    /// Run all stages for a single transaction.
    pub async fn run_pipeline<C, S>(
        context: &PipelineContext<'_, C, S>,
        request: TransactionRequest,
    ) -> Result<Assembled, PipelineError<C::Error>>
    where
        C: ChainSource,
        S: Signer,
    {
        let source = context.source;

        let raw_metadata = source
            .fetch_metadata(PREFERRED_METADATA_VERSION)
            .await
            .map_err(PipelineError::Source)?;
        let runtime_version = source
            .fetch_runtime_version()
            .await
            .map_err(PipelineError::Source)?;
        let genesis_hash = source
            .fetch_genesis_hash()
            .await
            .map_err(PipelineError::Source)?;

        let decoded = Pipeline::new()
            .decode_metadata(&raw_metadata)
            .map_err(PipelineError::Metadata)?;

        let digested = if request.mode.is_enabled() {
            let chain_config = source
                .fetch_chain_config()
                .await
                .map_err(PipelineError::Source)?;
            let extra_info = ExtraInfo::new(&chain_config, &runtime_version);
            match context.cache {
                Some(cache) => decoded.compute_digest_cached(&extra_info, genesis_hash, cache),
                None => decoded.compute_digest(&extra_info),
            }
        } else {
            decoded.without_digest()
        };

        let nonce = source
            .fetch_nonce(&context.signer.address())
            .await
            .map_err(PipelineError::Source)?;
        let unsigned = UnsignedPayload {
            call: request.call,
            era: request.era,
            nonce,
            tip: request.tip,
            spec_version: runtime_version.spec_version,
            transaction_version: runtime_version.transaction_version,
            genesis_hash,
            mortality_checkpoint: request.mortality_checkpoint,
        };

        digested
            .augment(unsigned, request.mode)
            .map_err(PipelineError::PayloadShape)?
            .sign(context.signer)
            .map_err(|failure| PipelineError::Signing(failure.error))?
            .assemble_with(request.envelope)
            .map_err(PipelineError::Assembly)
    }
}
