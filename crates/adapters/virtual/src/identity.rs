//! Local identity issuer — deterministic keys derived from the script hash.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use circuit_app::ports::{IdentityIssuer, IssuedIdentity};
use circuit_domain::error::IdentityError;
use circuit_domain::transaction::abi::keccak256;

/// Issues a stable pseudo key per script.
///
/// The same content hash always yields the same identity. The key is not a
/// point on any curve and must never be used to sign anything real.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalIdentityIssuer;

impl LocalIdentityIssuer {
    fn key_bytes(content_hash: &str) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        for (tag, chunk) in (0u8..).zip(bytes.chunks_mut(32)) {
            let digest = Sha256::new()
                .chain_update(content_hash.as_bytes())
                .chain_update([tag])
                .finalize();
            chunk.copy_from_slice(&digest);
        }
        bytes
    }
}

#[async_trait]
impl IdentityIssuer for LocalIdentityIssuer {
    async fn issue(&self, content_hash: &str) -> Result<IssuedIdentity, IdentityError> {
        if content_hash.is_empty() {
            return Err(IdentityError("content hash is empty".to_string()));
        }
        let key = Self::key_bytes(content_hash);
        let address = &keccak256(&key)[12..];
        let issued_id = format!("virtual-{}", &hex::encode(&key[..8]));
        tracing::debug!(%issued_id, "virtual identity issued");

        Ok(IssuedIdentity {
            issued_id,
            public_key: format!("0x04{}", hex::encode(key)),
            derived_address: format!("0x{}", hex::encode(address)),
        })
    }
}
