//! Fixed registry of chains a contract action may target.

use crate::error::ConfigurationError;

/// A supported chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chain {
    /// Identifier used in action configuration.
    pub name: &'static str,
    /// EIP-155 chain id.
    pub chain_id: u64,
}

const fn chain(name: &'static str, chain_id: u64) -> Chain {
    Chain { name, chain_id }
}

/// Every chain a contract action may name.
pub const CHAINS: &[Chain] = &[
    chain("ethereum", 1),
    chain("goerli", 5),
    chain("sepolia", 11_155_111),
    chain("polygon", 137),
    chain("mumbai", 80_001),
    chain("fantom", 250),
    chain("xdai", 100),
    chain("bsc", 56),
    chain("arbitrum", 42_161),
    chain("avalanche", 43_114),
    chain("optimism", 10),
    chain("base", 8_453),
    chain("celo", 42_220),
    chain("aurora", 1_313_161_554),
    chain("chronicleTestnet", 175_177),
];

/// Resolve a chain identifier against [`CHAINS`].
///
/// # Errors
///
/// Returns [`ConfigurationError::UnknownChain`] listing every valid
/// identifier when `name` is not registered.
pub fn resolve(name: &str) -> Result<Chain, ConfigurationError> {
    CHAINS
        .iter()
        .copied()
        .find(|c| c.name == name)
        .ok_or_else(|| ConfigurationError::UnknownChain {
            chain: name.to_string(),
            valid: CHAINS.iter().map(|c| c.name.to_string()).collect(),
        })
}
