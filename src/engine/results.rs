// 8.0.2: result types and errors for engine operations.

use serde::{Deserialize, Serialize};

use crate::settlement::SettlementError;
use crate::status::OrderInfo;
use crate::types::{Address, OrderHash, OrderStatus};

/// Amounts moved by one fill.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillResults {
    pub quote_filled: u128,
    pub base_filled: u128,
    pub quote_fee_filled: u128,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitFillResults {
    pub fill: FillResults,
    pub protocol_fee_paid: u128,
    pub refund: u128, // unused payment returned to the caller
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    Filled(FillResults),
    Skipped(EngineError),
}

impl FillOutcome {
    pub fn quote_filled(&self) -> u128 {
        match self {
            FillOutcome::Filled(fill) => fill.quote_filled,
            FillOutcome::Skipped(_) => 0,
        }
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, FillOutcome::Filled(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFillEntry {
    pub order_hash: OrderHash,
    pub outcome: FillOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchFillResults {
    pub entries: Vec<BatchFillEntry>,
    pub protocol_fee_paid: u128,
    pub refund: u128,
}

impl BatchFillResults {
    pub fn total_quote_filled(&self) -> u128 {
        self.entries
            .iter()
            .fold(0u128, |acc, e| acc.saturating_add(e.outcome.quote_filled()))
    }
}

/// Status plus how much could actually be filled right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelevantState {
    pub info: OrderInfo,
    pub fillable_quote_amount: u128,
    pub is_signature_valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Order {order_hash} is not fillable: {status}")]
    OrderNotFillable { order_hash: OrderHash, status: OrderStatus },

    #[error("Order {order_hash} cannot be filled by taker {taker}, expected {expected}")]
    OrderNotFillableByTaker {
        order_hash: OrderHash,
        taker: Address,
        expected: Address,
    },

    #[error("Order {order_hash} cannot be filled by sender {sender}, expected {expected}")]
    OrderNotFillableBySender {
        order_hash: OrderHash,
        sender: Address,
        expected: Address,
    },

    #[error("Order {order_hash} cannot be filled by origin {origin}, expected {expected}")]
    OrderNotFillableByOrigin {
        order_hash: OrderHash,
        origin: Address,
        expected: Address,
    },

    #[error("Order {order_hash} not signed by maker {maker}, signer {signer:?}")]
    OrderNotSignedByMaker {
        order_hash: OrderHash,
        signer: Option<Address>,
        maker: Address,
    },

    #[error("Order {order_hash} not signed by taker {taker}, signer {signer:?}")]
    OrderNotSignedByTaker {
        order_hash: OrderHash,
        signer: Option<Address>,
        taker: Address,
    },

    #[error("Only maker {maker} may cancel order {order_hash}, sender {sender}")]
    OnlyMakerAllowed {
        order_hash: OrderHash,
        sender: Address,
        maker: Address,
    },

    #[error("Fill or kill failed for {order_hash}: requested {requested}, available {available}")]
    FillOrKillFailed {
        order_hash: OrderHash,
        requested: u128,
        available: u128,
    },

    #[error("Batch fill incomplete at {order_hash}: filled {filled}, requested {requested}")]
    BatchFillIncomplete {
        order_hash: OrderHash,
        filled: u128,
        requested: u128,
    },

    #[error("{signer} is not a registered signer for {maker}")]
    InvalidSigner { maker: Address, signer: Address },

    #[error("Origins can only be registered by the transaction origin, sender {sender}, origin {origin}")]
    ContractOriginNotAllowed { sender: Address, origin: Address },

    #[error("Insufficient protocol fee: required {required}, available {available}")]
    InsufficientProtocolFee { required: u128, available: u128 },

    #[error("Mismatched array lengths: {lengths:?}")]
    MismatchedArrayLengths { lengths: Vec<usize> },

    #[error("Order {order_hash} has no taker set")]
    TakerNotSet { order_hash: OrderHash },

    #[error("Cannot unwrap token {token}")]
    UnwrapNotSupported { token: Address },

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),
}
