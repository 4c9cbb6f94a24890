//! Order status resolution.
//!
//! Pure functions over the ledgers and the clock. Nothing here mutates state;
//! the status is recomputed on every fetch.
//!
//! Resolution order for limit and rfq orders:
//!   wrong domain -> Invalid
//!   filled >= quote amount -> Filled (sticky, wins over cancel and expiry)
//!   directly cancelled or below the pair salt threshold -> Cancelled
//!   now >= expiry -> Expired
//!   otherwise Fillable
//!
//! OTC orders have no fill ledger: a used or superseded nonce is Invalid.

use crate::ledger::{FillLedger, PairCancellations, PairKey};
use crate::order::{CommonOrderFields, LimitOrder, OrderFields, OtcOrder, RfqOrder};
use crate::types::{Domain, OrderHash, OrderKind, OrderStatus, Timestamp, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub order_hash: OrderHash,
    pub status: OrderStatus,
    pub quote_filled_amount: u128,
}

impl OrderInfo {
    pub fn remaining(&self, quote_amount: u128) -> u128 {
        quote_amount.saturating_sub(self.quote_filled_amount)
    }

    pub fn is_fillable(&self) -> bool {
        self.status == OrderStatus::Fillable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtcOrderInfo {
    pub order_hash: OrderHash,
    pub status: OrderStatus,
}

/// Read-only view of everything status resolution depends on.
#[derive(Debug, Clone, Copy)]
pub struct LedgerView<'a> {
    pub fills: &'a FillLedger,
    pub pairs: &'a PairCancellations,
    pub domain: &'a Domain,
    pub now: Timestamp,
}

pub fn limit_order_info(view: &LedgerView<'_>, order: &LimitOrder) -> OrderInfo {
    resolve_salted(view, OrderKind::Limit, order.order_hash(), &order.common, order.expiry, order.salt)
}

pub fn rfq_order_info(view: &LedgerView<'_>, order: &RfqOrder) -> OrderInfo {
    resolve_salted(view, OrderKind::Rfq, order.order_hash(), &order.common, order.expiry, order.salt)
}

pub fn otc_order_info(view: &LedgerView<'_>, order: &OtcOrder) -> OtcOrderInfo {
    let order_hash = order.order_hash();
    let status = if order.common.domain != *view.domain {
        OrderStatus::Invalid
    } else if !view
        .fills
        .is_nonce_usable(order.nonce_consumer(), order.nonce_bucket(), order.nonce())
    {
        OrderStatus::Invalid
    } else if view.now >= order.expiry() {
        OrderStatus::Expired
    } else {
        OrderStatus::Fillable
    };
    OtcOrderInfo { order_hash, status }
}

fn resolve_salted(
    view: &LedgerView<'_>,
    kind: OrderKind,
    order_hash: OrderHash,
    common: &CommonOrderFields,
    expiry: Timestamp,
    salt: U256,
) -> OrderInfo {
    let quote_filled_amount = view.fills.filled_amount(&order_hash);
    let pair = PairKey::new(common.maker, common.base_token, common.quote_token);

    let status = if common.domain != *view.domain {
        OrderStatus::Invalid
    } else if quote_filled_amount >= common.quote_amount {
        // also covers quote_amount == 0
        OrderStatus::Filled
    } else if view.fills.is_cancelled(&order_hash) || view.pairs.is_cancelled(kind, &pair, salt) {
        OrderStatus::Cancelled
    } else if view.now >= expiry {
        OrderStatus::Expired
    } else {
        OrderStatus::Fillable
    };

    OrderInfo {
        order_hash,
        status,
        quote_filled_amount,
    }
}
