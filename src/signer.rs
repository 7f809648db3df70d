//! Signing capability.
//!
//! [`Signer`] is implemented by whatever holds the keys: in-memory keypair,
//! hardware device, remote signing service. Signer receives only
//! [`SigningPayload`], which could be made only from an
//! [`AugmentedPayload`](crate::payload::AugmentedPayload), so the payload
//! without metadata hash mode could not be signed by mistake.
use parity_scale_codec::{Decode, Encode};

use crate::error::SigningError;
use crate::payload::SigningPayload;

/// Signer address, as `MultiAddress`.
#[derive(Clone, Copy, Debug, Decode, Encode, Eq, PartialEq)]
pub enum SignerAddress {
    #[codec(index = 0)]
    Id([u8; 32]),
    #[codec(index = 4)]
    Address20([u8; 20]),
}

/// Signature, as `MultiSignature`.
#[derive(Clone, Copy, Debug, Decode, Encode, Eq, PartialEq)]
pub enum Signature {
    #[codec(index = 0)]
    Ed25519([u8; 64]),
    #[codec(index = 1)]
    Sr25519([u8; 64]),
    #[codec(index = 2)]
    Ecdsa([u8; 65]),
}

/// Key storage backend able to sign.
///
/// Signature determinism is not required.
pub trait Signer {
    /// Address the transaction is sent from.
    fn address(&self) -> SignerAddress;

    /// Sign canonical augmented payload bytes.
    ///
    /// Backends may fail, e.g. when the key is locked or the device refused
    /// the operation.
    fn sign(&self, payload: &SigningPayload) -> Result<Signature, SigningError>;
}

impl<S: Signer + ?Sized> Signer for &S {
    fn address(&self) -> SignerAddress {
        (**self).address()
    }

    fn sign(&self, payload: &SigningPayload) -> Result<Signature, SigningError> {
        (**self).sign(payload)
    }
}

#[cfg(feature = "std")]
pub use sr25519::{verify_sr25519, Sr25519Signer};

#[cfg(feature = "std")]
mod sr25519 {
    use schnorrkel::{signing_context, ExpansionMode, Keypair, MiniSecretKey, PublicKey};

    use super::{Signature, Signer, SignerAddress};
    use crate::error::SigningError;
    use crate::payload::SigningPayload;

    /// Signing context of Substrate sr25519 signatures.
    const SIGNING_CONTEXT: &[u8] = b"substrate";

    /// In-memory sr25519 keypair.
    pub struct Sr25519Signer {
        keypair: Keypair,
    }

    impl Sr25519Signer {
        /// Keypair from 32-byte mini secret key, expanded the way Substrate
        /// does it.
        pub fn from_seed(seed: &[u8; 32]) -> Result<Self, SigningError> {
            let mini_secret_key =
                MiniSecretKey::from_bytes(seed).map_err(|_| SigningError::InvalidKey)?;
            Ok(Self {
                keypair: mini_secret_key.expand_to_keypair(ExpansionMode::Ed25519),
            })
        }

        pub fn public_key(&self) -> [u8; 32] {
            self.keypair.public.to_bytes()
        }
    }

    impl Signer for Sr25519Signer {
        fn address(&self) -> SignerAddress {
            SignerAddress::Id(self.public_key())
        }

        fn sign(&self, payload: &SigningPayload) -> Result<Signature, SigningError> {
            let signature = self
                .keypair
                .sign(signing_context(SIGNING_CONTEXT).bytes(payload.as_bytes()));
            Ok(Signature::Sr25519(signature.to_bytes()))
        }
    }

    /// Check sr25519 signature over signing payload.
    pub fn verify_sr25519(
        public_key: &[u8; 32],
        payload: &SigningPayload,
        signature: &Signature,
    ) -> bool {
        let Signature::Sr25519(signature_bytes) = signature else {
            return false;
        };
        let Ok(public_key) = PublicKey::from_bytes(public_key) else {
            return false;
        };
        let Ok(signature) = schnorrkel::Signature::from_bytes(signature_bytes) else {
            return false;
        };
        public_key
            .verify_simple(SIGNING_CONTEXT, payload.as_bytes(), &signature)
            .is_ok()
    }
}
