//! Chain configuration records supplied by collaborators.
use crate::std::string::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Static per-deployment chain data.
///
/// Base58 prefix could be taken from `System` pallet `SS58Prefix` constant,
/// decimals and token symbol are usually not in the metadata at all.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct ChainConfig {
    pub base58_prefix: u16,
    pub decimals: u8,
    pub token_symbol: String,
}

/// Runtime version as reported by the node.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
pub struct RuntimeVersion {
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
}
