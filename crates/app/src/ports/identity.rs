//! Identity issuer port — mints the signing identity a script acts as.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use circuit_domain::error::{ConfigurationError, IdentityError};

/// Hex length of an uncompressed secp256k1 public key without `0x`.
const UNCOMPRESSED_KEY_HEX_LEN: usize = 130;

/// A signing identity bound to one script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedIdentity {
    pub issued_id: String,
    /// `0x04`-prefixed uncompressed public key.
    pub public_key: String,
    pub derived_address: String,
}

/// Mints or resolves signing identities.
#[async_trait]
pub trait IdentityIssuer: Send + Sync {
    /// Issue an identity allowed to run the script with `content_hash`.
    ///
    /// # Errors
    ///
    /// Returns an [`IdentityError`] when issuance fails.
    async fn issue(&self, content_hash: &str) -> Result<IssuedIdentity, IdentityError>;
}

/// Check that `key` is a `0x04`-prefixed, uncompressed public key.
///
/// # Errors
///
/// Returns [`ConfigurationError::MalformedPublicKey`] otherwise.
pub fn validate_public_key(key: &str) -> Result<(), ConfigurationError> {
    let well_formed = key.strip_prefix("0x").is_some_and(|digits| {
        digits.starts_with("04")
            && digits.len() == UNCOMPRESSED_KEY_HEX_LEN
            && digits.bytes().all(|b| b.is_ascii_hexdigit())
    });
    if well_formed {
        Ok(())
    } else {
        Err(ConfigurationError::MalformedPublicKey(key.to_string()))
    }
}
