//! Order types.
//!
//! Three kinds of signed order share one set of common fields and one hashing
//! framework. Orders are never stored by the engine: callers pass them by value
//! on every call and only their hash and derived ledger entries persist.

use crate::hashing;
use crate::types::{Address, Domain, OrderHash, OrderKind, PoolId, Timestamp, B256, U256};
use serde::{Deserialize, Serialize};

/// Fields every order kind carries.
///
/// The maker supplies `base_amount` of `base_token`, the taker supplies
/// `quote_amount` of `quote_token`. A zero `taker` means any taker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommonOrderFields {
    pub base_token: Address,
    pub quote_token: Address,
    pub base_amount: u128,
    pub quote_amount: u128,
    pub maker: Address,
    pub taker: Address,
    pub domain: Domain,
}

/// Shared interface over the three order kinds.
pub trait OrderFields {
    fn common(&self) -> &CommonOrderFields;

    fn kind(&self) -> OrderKind;

    fn expiry(&self) -> Timestamp;

    /// EIP-712 struct hash (type hash + encoded fields), not yet domain bound.
    fn struct_hash(&self) -> B256;

    /// Domain-bound order hash.
    fn order_hash(&self) -> OrderHash {
        hashing::order_hash(&self.common().domain, self.struct_hash())
    }

    fn maker(&self) -> Address {
        self.common().maker
    }
}

/// Resting limit order with a taker-side fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LimitOrder {
    pub common: CommonOrderFields,
    /// Paid by the taker in quote token, proportional to the fill.
    pub quote_fee_amount: u128,
    /// Zero means any sender.
    pub sender: Address,
    pub fee_recipient: Address,
    pub pool: PoolId,
    pub expiry: Timestamp,
    /// Orders below the maker's pair threshold are cancelled.
    pub salt: U256,
}

impl OrderFields for LimitOrder {
    fn common(&self) -> &CommonOrderFields {
        &self.common
    }

    fn kind(&self) -> OrderKind {
        OrderKind::Limit
    }

    fn expiry(&self) -> Timestamp {
        self.expiry
    }

    fn struct_hash(&self) -> B256 {
        hashing::limit_order_struct_hash(self)
    }
}

/// Request-for-quote order, fillable only through the named origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RfqOrder {
    pub common: CommonOrderFields,
    /// Zero means any origin.
    pub origin: Address,
    pub pool: PoolId,
    pub expiry: Timestamp,
    pub salt: U256,
}

impl OrderFields for RfqOrder {
    fn common(&self) -> &CommonOrderFields {
        &self.common
    }

    fn kind(&self) -> OrderKind {
        OrderKind::Rfq
    }

    fn expiry(&self) -> Timestamp {
        self.expiry
    }

    fn struct_hash(&self) -> B256 {
        hashing::rfq_order_struct_hash(self)
    }
}

/// One-shot order. Replay protection comes from a strictly increasing nonce
/// per bucket instead of a fill ledger.
///
/// Expiry, bucket and nonce are always read out of the signed packed word,
/// never stored next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OtcOrder {
    pub common: CommonOrderFields,
    pub origin: Address,
    /// `expiry(64) | nonce_bucket(64) | nonce(128)`, most significant first.
    pub expiry_and_nonce: U256,
}

impl OtcOrder {
    pub fn new(common: CommonOrderFields, origin: Address, expiry_and_nonce: U256) -> Self {
        Self {
            common,
            origin,
            expiry_and_nonce,
        }
    }

    pub fn pack_expiry_and_nonce(expiry: Timestamp, nonce_bucket: u64, nonce: u128) -> U256 {
        (U256::from(expiry.as_secs()) << 192usize)
            | (U256::from(nonce_bucket) << 128usize)
            | U256::from(nonce)
    }

    pub fn unpack_expiry_and_nonce(packed: U256) -> (Timestamp, u64, u128) {
        let word = packed.to_be_bytes::<32>();
        let mut expiry = [0u8; 8];
        let mut bucket = [0u8; 8];
        let mut nonce = [0u8; 16];
        expiry.copy_from_slice(&word[0..8]);
        bucket.copy_from_slice(&word[8..16]);
        nonce.copy_from_slice(&word[16..32]);
        (
            Timestamp::from_secs(u64::from_be_bytes(expiry)),
            u64::from_be_bytes(bucket),
            u128::from_be_bytes(nonce),
        )
    }

    pub fn nonce_bucket(&self) -> u64 {
        Self::unpack_expiry_and_nonce(self.expiry_and_nonce).1
    }

    pub fn nonce(&self) -> u128 {
        Self::unpack_expiry_and_nonce(self.expiry_and_nonce).2
    }

    /// Identity whose nonce lane this order consumes: the origin restriction
    /// when set, otherwise the maker.
    pub fn nonce_consumer(&self) -> Address {
        if self.origin.is_zero() {
            self.common.maker
        } else {
            self.origin
        }
    }
}

impl OrderFields for OtcOrder {
    fn common(&self) -> &CommonOrderFields {
        &self.common
    }

    fn kind(&self) -> OrderKind {
        OrderKind::Otc
    }

    fn expiry(&self) -> Timestamp {
        Self::unpack_expiry_and_nonce(self.expiry_and_nonce).0
    }

    fn struct_hash(&self) -> B256 {
        hashing::otc_order_struct_hash(self)
    }
}

/// Closed set of order kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NativeOrder {
    Limit(LimitOrder),
    Rfq(RfqOrder),
    Otc(OtcOrder),
}

impl NativeOrder {
    fn inner(&self) -> &dyn OrderFields {
        match self {
            NativeOrder::Limit(o) => o,
            NativeOrder::Rfq(o) => o,
            NativeOrder::Otc(o) => o,
        }
    }

    /// Salt used for pair cancellation. OTC orders have none.
    pub fn salt(&self) -> Option<U256> {
        match self {
            NativeOrder::Limit(o) => Some(o.salt),
            NativeOrder::Rfq(o) => Some(o.salt),
            NativeOrder::Otc(_) => None,
        }
    }
}

impl OrderFields for NativeOrder {
    fn common(&self) -> &CommonOrderFields {
        self.inner().common()
    }

    fn kind(&self) -> OrderKind {
        self.inner().kind()
    }

    fn expiry(&self) -> Timestamp {
        self.inner().expiry()
    }

    fn struct_hash(&self) -> B256 {
        self.inner().struct_hash()
    }
}

impl From<LimitOrder> for NativeOrder {
    fn from(order: LimitOrder) -> Self {
        NativeOrder::Limit(order)
    }
}

impl From<RfqOrder> for NativeOrder {
    fn from(order: RfqOrder) -> Self {
        NativeOrder::Rfq(order)
    }
}

impl From<OtcOrder> for NativeOrder {
    fn from(order: OtcOrder) -> Self {
        NativeOrder::Otc(order)
    }
}
