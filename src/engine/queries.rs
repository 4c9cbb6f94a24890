// 8.5 engine/queries.rs: read-only lookups. status, fillable amounts and
// order hashes. nothing here writes state or emits events.

use super::batch::check_lengths;
use super::core::Engine;
use super::results::{EngineError, RelevantState};
use crate::math::fillable_quote_amount;
use crate::order::{CommonOrderFields, LimitOrder, NativeOrder, OrderFields, OtcOrder, RfqOrder};
use crate::settlement::SettlementBackend;
use crate::signature::Signature;
use crate::status::{limit_order_info, otc_order_info, rfq_order_info, OrderInfo, OtcOrderInfo};
use crate::types::OrderHash;

impl Engine {
    pub fn get_limit_order_info(&self, order: &LimitOrder) -> OrderInfo {
        limit_order_info(&self.ledger_view(), order)
    }

    pub fn get_rfq_order_info(&self, order: &RfqOrder) -> OrderInfo {
        rfq_order_info(&self.ledger_view(), order)
    }

    pub fn get_otc_order_info(&self, order: &OtcOrder) -> OtcOrderInfo {
        otc_order_info(&self.ledger_view(), order)
    }

    /// Status of any order kind. OTC orders carry no fill amount, so theirs
    /// is reported as zero.
    pub fn get_order_info(&self, order: &NativeOrder) -> OrderInfo {
        match order {
            NativeOrder::Limit(o) => self.get_limit_order_info(o),
            NativeOrder::Rfq(o) => self.get_rfq_order_info(o),
            NativeOrder::Otc(o) => {
                let info = self.get_otc_order_info(o);
                OrderInfo {
                    order_hash: info.order_hash,
                    status: info.status,
                    quote_filled_amount: 0,
                }
            }
        }
    }

    pub fn get_order_hash(&self, order: &NativeOrder) -> OrderHash {
        order.order_hash()
    }

    pub fn get_limit_order_hash(&self, order: &LimitOrder) -> OrderHash {
        order.order_hash()
    }

    pub fn get_rfq_order_hash(&self, order: &RfqOrder) -> OrderHash {
        order.order_hash()
    }

    pub fn get_otc_order_hash(&self, order: &OtcOrder) -> OrderHash {
        order.order_hash()
    }

    /// Status, how much a taker could fill right now given the maker's
    /// spendable base balance, and whether the signature checks out.
    pub fn get_limit_order_relevant_state<B: SettlementBackend>(
        &self,
        backend: &B,
        order: &LimitOrder,
        signature: &Signature,
    ) -> RelevantState {
        let info = self.get_limit_order_info(order);
        self.relevant_state(backend, info, &order.common, signature)
    }

    pub fn get_rfq_order_relevant_state<B: SettlementBackend>(
        &self,
        backend: &B,
        order: &RfqOrder,
        signature: &Signature,
    ) -> RelevantState {
        let info = self.get_rfq_order_info(order);
        self.relevant_state(backend, info, &order.common, signature)
    }

    pub fn batch_get_limit_order_relevant_states<B: SettlementBackend>(
        &self,
        backend: &B,
        orders: &[LimitOrder],
        signatures: &[Signature],
    ) -> Result<Vec<RelevantState>, EngineError> {
        check_lengths(&[orders.len(), signatures.len()])?;
        Ok(orders
            .iter()
            .zip(signatures)
            .map(|(order, signature)| self.get_limit_order_relevant_state(backend, order, signature))
            .collect())
    }

    pub fn batch_get_rfq_order_relevant_states<B: SettlementBackend>(
        &self,
        backend: &B,
        orders: &[RfqOrder],
        signatures: &[Signature],
    ) -> Result<Vec<RelevantState>, EngineError> {
        check_lengths(&[orders.len(), signatures.len()])?;
        Ok(orders
            .iter()
            .zip(signatures)
            .map(|(order, signature)| self.get_rfq_order_relevant_state(backend, order, signature))
            .collect())
    }

    // fillable amount is computed regardless of signature validity
    fn relevant_state<B: SettlementBackend>(
        &self,
        backend: &B,
        info: OrderInfo,
        common: &CommonOrderFields,
        signature: &Signature,
    ) -> RelevantState {
        let fillable = if info.is_fillable() {
            fillable_quote_amount(
                info.remaining(common.quote_amount),
                common.quote_amount,
                common.base_amount,
                backend.spendable(common.base_token, common.maker),
            )
        } else {
            0
        };

        RelevantState {
            info,
            fillable_quote_amount: fillable,
            is_signature_valid: self
                .check_signature(backend, info.order_hash, common.maker, signature)
                .is_ok(),
        }
    }
}
