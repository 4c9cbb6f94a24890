// 3.1 signature.rs: order signatures. ecrecover-style recovery over the order
// hash, plus a contract type whose approval is asked of the account itself.

use crate::types::{Address, OrderHash, B256};
use alloy_primitives::keccak256;
use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};

const ETH_SIGN_PREFIX: &[u8] = b"\x19Ethereum Signed Message:\n32";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureType {
    /// Zero value, always rejected.
    Illegal,
    /// Explicitly invalid, always rejected.
    Invalid,
    /// secp256k1 signature over the raw order hash.
    Eip712,
    /// secp256k1 signature over the eth_sign prefixed hash.
    EthSign,
    /// The signer is an account that approves hashes itself.
    Contract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub signature_type: SignatureType,
    pub v: u8,
    pub r: B256,
    pub s: B256,
}

impl Signature {
    pub fn contract() -> Self {
        Self {
            signature_type: SignatureType::Contract,
            v: 0,
            r: B256::ZERO,
            s: B256::ZERO,
        }
    }

    pub fn invalid() -> Self {
        Self {
            signature_type: SignatureType::Invalid,
            v: 0,
            r: B256::ZERO,
            s: B256::ZERO,
        }
    }

    /// Signs `hash` with `key`. Only the ecdsa signature types make sense here.
    pub fn sign(key: &SigningKey, hash: OrderHash, signature_type: SignatureType) -> Option<Self> {
        let digest = match signature_type {
            SignatureType::Eip712 => hash.as_b256(),
            SignatureType::EthSign => eth_sign_digest(hash),
            _ => return None,
        };
        let (sig, recovery_id) = key.sign_prehash_recoverable(digest.as_slice()).ok()?;
        let bytes = sig.to_bytes();
        Some(Self {
            signature_type,
            v: 27 + recovery_id.to_byte(),
            r: B256::from_slice(&bytes[..32]),
            s: B256::from_slice(&bytes[32..]),
        })
    }

    /// Recovers the signing address for the ecdsa types. `None` for anything
    /// malformed, high-s, or not recoverable.
    pub fn recover(&self, hash: OrderHash) -> Option<Address> {
        let digest = match self.signature_type {
            SignatureType::Eip712 => hash.as_b256(),
            SignatureType::EthSign => eth_sign_digest(hash),
            _ => return None,
        };
        let recovery_id = match self.v {
            27 | 28 => RecoveryId::from_byte(self.v - 27)?,
            _ => return None,
        };
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(self.r.as_slice());
        bytes[32..].copy_from_slice(self.s.as_slice());
        let sig = EcdsaSignature::from_slice(&bytes).ok()?;
        // malleable twin of a valid signature
        if sig.normalize_s().is_some() {
            return None;
        }
        let key = VerifyingKey::recover_from_prehash(digest.as_slice(), &sig, recovery_id).ok()?;
        Some(address_of(&key))
    }
}

fn eth_sign_digest(hash: OrderHash) -> B256 {
    let mut buf = Vec::with_capacity(ETH_SIGN_PREFIX.len() + 32);
    buf.extend_from_slice(ETH_SIGN_PREFIX);
    buf.extend_from_slice(hash.as_slice());
    keccak256(&buf)
}

/// Last 20 bytes of keccak256 over the uncompressed public key.
pub fn address_of(key: &VerifyingKey) -> Address {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    Address::from_slice(&digest[12..])
}
