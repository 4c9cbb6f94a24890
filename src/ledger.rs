//! Durable fill and cancellation ledgers.
//!
//! Entries are created on first write and only removed when an aborted call
//! is undone. Reads of an absent
//! key return the zero value, so a fresh order looks exactly like one that was
//! never touched.

use crate::types::{Address, OrderHash, OrderKind, U256};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// `(maker, base token, quote token)`. Ordered: (A, B) and (B, A) are
/// different pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairKey {
    pub maker: Address,
    pub base_token: Address,
    pub quote_token: Address,
}

impl PairKey {
    pub fn new(maker: Address, base_token: Address, quote_token: Address) -> Self {
        Self {
            maker,
            base_token,
            quote_token,
        }
    }
}

/// Minimum valid salt per pair. Orders with `salt < threshold` are cancelled.
/// Kept per order kind so limit and rfq thresholds never interfere.
#[derive(Debug, Clone, Default)]
pub struct PairCancellations {
    limit: HashMap<PairKey, U256>,
    rfq: HashMap<PairKey, U256>,
}

impl PairCancellations {
    fn table(&self, kind: OrderKind) -> Option<&HashMap<PairKey, U256>> {
        match kind {
            OrderKind::Limit => Some(&self.limit),
            OrderKind::Rfq => Some(&self.rfq),
            OrderKind::Otc => None,
        }
    }

    pub fn min_valid_salt(&self, kind: OrderKind, key: &PairKey) -> U256 {
        self.table(kind)
            .and_then(|t| t.get(key))
            .copied()
            .unwrap_or(U256::ZERO)
    }

    /// Overwrites the threshold. Lowering it is allowed and re-enables the
    /// salts in between.
    pub fn set_min_valid_salt(&mut self, kind: OrderKind, key: PairKey, min_valid_salt: U256) {
        match kind {
            OrderKind::Limit => {
                self.limit.insert(key, min_valid_salt);
            }
            OrderKind::Rfq => {
                self.rfq.insert(key, min_valid_salt);
            }
            OrderKind::Otc => {}
        }
    }

    pub fn is_cancelled(&self, kind: OrderKind, key: &PairKey, salt: U256) -> bool {
        self.min_valid_salt(kind, key) > salt
    }
}

/// Fill state for limit/rfq orders and nonce lanes for otc orders.
#[derive(Debug, Clone, Default)]
pub struct FillLedger {
    filled: HashMap<OrderHash, u128>,
    cancelled: HashSet<OrderHash>,
    // (consumer, bucket) -> last consumed nonce
    otc_nonces: HashMap<(Address, u64), u128>,
}

impl FillLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filled_amount(&self, hash: &OrderHash) -> u128 {
        self.filled.get(hash).copied().unwrap_or(0)
    }

    /// Adds to the cumulative fill. Returns the new total.
    pub fn record_fill(&mut self, hash: OrderHash, quote_filled: u128) -> u128 {
        let entry = self.filled.entry(hash).or_insert(0);
        *entry = entry.saturating_add(quote_filled);
        *entry
    }

    /// Overwrites the cumulative fill. Only used to undo an aborted write.
    pub fn set_filled(&mut self, hash: OrderHash, quote_filled: u128) {
        self.filled.insert(hash, quote_filled);
    }

    pub fn is_cancelled(&self, hash: &OrderHash) -> bool {
        self.cancelled.contains(hash)
    }

    /// Returns false when the order was already cancelled.
    pub fn mark_cancelled(&mut self, hash: OrderHash) -> bool {
        self.cancelled.insert(hash)
    }

    pub fn unmark_cancelled(&mut self, hash: &OrderHash) {
        self.cancelled.remove(hash);
    }

    pub fn last_consumed_nonce(&self, consumer: Address, bucket: u64) -> u128 {
        self.otc_nonces.get(&(consumer, bucket)).copied().unwrap_or(0)
    }

    /// A nonce is usable while it is strictly above the lane's last value.
    /// Fresh lanes start at zero, so nonce 0 is never usable.
    pub fn is_nonce_usable(&self, consumer: Address, bucket: u64, nonce: u128) -> bool {
        nonce > self.last_consumed_nonce(consumer, bucket)
    }

    pub fn consume_nonce(&mut self, consumer: Address, bucket: u64, nonce: u128) {
        self.otc_nonces.insert((consumer, bucket), nonce);
    }
}
