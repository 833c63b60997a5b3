//! Contract actions normalized into unsigned transactions for remote signing.

pub mod abi;
pub mod chain;

use serde::{Deserialize, Serialize};

use crate::action::ContractAction;
use crate::error::ConfigurationError;

/// Value of `from` until the remote signer substitutes its own address.
pub const SIGNER_ADDRESS_PLACEHOLDER: &str = "{{signerAddress}}";

const DEFAULT_GAS_LIMIT: &str = "50000";
const DEFAULT_VALUE: &str = "0";
/// EIP-1559 envelope.
const EIP1559_TX_TYPE: u8 = 2;

/// A contract call ready to be hashed and signed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransactionData {
    pub to: String,
    pub nonce: u64,
    pub chain_id: u64,
    pub gas_limit: String,
    pub from: String,
    pub value: String,
    /// `0x`-prefixed ABI-encoded call data.
    pub data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: u8,
}

impl UnsignedTransactionData {
    /// Normalize a contract action.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] when the chain is not registered, the
    /// contract address is not a 20-byte hex address, or the call cannot be
    /// ABI-encoded.
    pub fn from_action(action: &ContractAction) -> Result<Self, ConfigurationError> {
        let chain = chain::resolve(&action.chain)?;
        validate_address(&action.contract_address)?;
        let data = abi::encode_call(&action.abi, &action.function_name, &action.args)?;

        Ok(Self {
            to: action.contract_address.clone(),
            nonce: action.nonce.unwrap_or(0),
            chain_id: chain.chain_id,
            gas_limit: action
                .gas_limit
                .clone()
                .unwrap_or_else(|| DEFAULT_GAS_LIMIT.to_string()),
            from: SIGNER_ADDRESS_PLACEHOLDER.to_string(),
            value: action
                .value
                .clone()
                .unwrap_or_else(|| DEFAULT_VALUE.to_string()),
            data,
            max_priority_fee_per_gas: action.max_priority_fee_per_gas.clone(),
            max_fee_per_gas: action.max_fee_per_gas.clone(),
            tx_type: EIP1559_TX_TYPE,
        })
    }
}

fn validate_address(address: &str) -> Result<(), ConfigurationError> {
    let well_formed = address
        .strip_prefix("0x")
        .is_some_and(|digits| digits.len() == 40 && hex::decode(digits).is_ok());
    if well_formed {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidAddress(address.to_string()))
    }
}
