// 8.4 engine/cancel.rs: direct cancels (one order hash) and pair cancels
// (every salt below a threshold for a maker and token pair). otc orders have
// no cancel; filling burns their nonce.

use tracing::info;

use super::batch::check_lengths;
use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, OrderCancelledEvent, PairCancelledEvent};
use crate::ledger::PairKey;
use crate::order::{LimitOrder, OrderFields, RfqOrder};
use crate::types::{Address, CallContext, OrderHash, OrderKind, U256};

impl Engine {
    /// Cancel one limit order. Only the maker or one of its signers may do
    /// this. Cancelling twice is harmless.
    pub fn cancel_limit_order(&mut self, ctx: CallContext, order: &LimitOrder) -> Result<(), EngineError> {
        self.atomically_local(|engine| engine.cancel_order_inner(ctx, order.order_hash(), order.common.maker))
    }

    pub fn cancel_rfq_order(&mut self, ctx: CallContext, order: &RfqOrder) -> Result<(), EngineError> {
        self.atomically_local(|engine| engine.cancel_order_inner(ctx, order.order_hash(), order.common.maker))
    }

    pub fn batch_cancel_limit_orders(&mut self, ctx: CallContext, orders: &[LimitOrder]) -> Result<(), EngineError> {
        self.atomically_local(|engine| {
            orders
                .iter()
                .try_for_each(|order| engine.cancel_order_inner(ctx, order.order_hash(), order.common.maker))
        })
    }

    pub fn batch_cancel_rfq_orders(&mut self, ctx: CallContext, orders: &[RfqOrder]) -> Result<(), EngineError> {
        self.atomically_local(|engine| {
            orders
                .iter()
                .try_for_each(|order| engine.cancel_order_inner(ctx, order.order_hash(), order.common.maker))
        })
    }

    /// Cancel the caller's limit orders for `(base_token, quote_token)` whose
    /// salt is below `min_valid_salt`.
    pub fn cancel_pair_limit_orders(
        &mut self,
        ctx: CallContext,
        base_token: Address,
        quote_token: Address,
        min_valid_salt: U256,
    ) -> Result<(), EngineError> {
        self.atomically_local(|engine| {
            engine.cancel_pair_inner(OrderKind::Limit, ctx, ctx.sender, base_token, quote_token, min_valid_salt)
        })
    }

    /// Pair cancel on behalf of `maker`, by one of its registered signers.
    pub fn cancel_pair_limit_orders_with_signer(
        &mut self,
        ctx: CallContext,
        maker: Address,
        base_token: Address,
        quote_token: Address,
        min_valid_salt: U256,
    ) -> Result<(), EngineError> {
        self.atomically_local(|engine| {
            engine.cancel_pair_inner(OrderKind::Limit, ctx, maker, base_token, quote_token, min_valid_salt)
        })
    }

    pub fn batch_cancel_pair_limit_orders(
        &mut self,
        ctx: CallContext,
        base_tokens: &[Address],
        quote_tokens: &[Address],
        min_valid_salts: &[U256],
    ) -> Result<(), EngineError> {
        self.batch_cancel_pairs(OrderKind::Limit, ctx, ctx.sender, base_tokens, quote_tokens, min_valid_salts)
    }

    pub fn batch_cancel_pair_limit_orders_with_signer(
        &mut self,
        ctx: CallContext,
        maker: Address,
        base_tokens: &[Address],
        quote_tokens: &[Address],
        min_valid_salts: &[U256],
    ) -> Result<(), EngineError> {
        self.batch_cancel_pairs(OrderKind::Limit, ctx, maker, base_tokens, quote_tokens, min_valid_salts)
    }

    pub fn cancel_pair_rfq_orders(
        &mut self,
        ctx: CallContext,
        base_token: Address,
        quote_token: Address,
        min_valid_salt: U256,
    ) -> Result<(), EngineError> {
        self.atomically_local(|engine| {
            engine.cancel_pair_inner(OrderKind::Rfq, ctx, ctx.sender, base_token, quote_token, min_valid_salt)
        })
    }

    pub fn cancel_pair_rfq_orders_with_signer(
        &mut self,
        ctx: CallContext,
        maker: Address,
        base_token: Address,
        quote_token: Address,
        min_valid_salt: U256,
    ) -> Result<(), EngineError> {
        self.atomically_local(|engine| {
            engine.cancel_pair_inner(OrderKind::Rfq, ctx, maker, base_token, quote_token, min_valid_salt)
        })
    }

    pub fn batch_cancel_pair_rfq_orders(
        &mut self,
        ctx: CallContext,
        base_tokens: &[Address],
        quote_tokens: &[Address],
        min_valid_salts: &[U256],
    ) -> Result<(), EngineError> {
        self.batch_cancel_pairs(OrderKind::Rfq, ctx, ctx.sender, base_tokens, quote_tokens, min_valid_salts)
    }

    pub fn batch_cancel_pair_rfq_orders_with_signer(
        &mut self,
        ctx: CallContext,
        maker: Address,
        base_tokens: &[Address],
        quote_tokens: &[Address],
        min_valid_salts: &[U256],
    ) -> Result<(), EngineError> {
        self.batch_cancel_pairs(OrderKind::Rfq, ctx, maker, base_tokens, quote_tokens, min_valid_salts)
    }

    pub fn get_pair_min_valid_salt(
        &self,
        kind: OrderKind,
        maker: Address,
        base_token: Address,
        quote_token: Address,
    ) -> U256 {
        self.state
            .pairs
            .min_valid_salt(kind, &PairKey::new(maker, base_token, quote_token))
    }

    fn cancel_order_inner(&mut self, ctx: CallContext, order_hash: OrderHash, maker: Address) -> Result<(), EngineError> {
        if !self.state.signers.is_valid_signer(maker, ctx.sender) {
            return Err(EngineError::OnlyMakerAllowed {
                order_hash,
                sender: ctx.sender,
                maker,
            });
        }

        let newly_cancelled = self.state.mark_cancelled(order_hash);
        self.emit_event(EventPayload::OrderCancelled(OrderCancelledEvent { order_hash, maker }));
        info!(order_hash = %order_hash, maker = %maker, newly_cancelled, "order cancelled");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn batch_cancel_pairs(
        &mut self,
        kind: OrderKind,
        ctx: CallContext,
        maker: Address,
        base_tokens: &[Address],
        quote_tokens: &[Address],
        min_valid_salts: &[U256],
    ) -> Result<(), EngineError> {
        check_lengths(&[base_tokens.len(), quote_tokens.len(), min_valid_salts.len()])?;
        self.atomically_local(|engine| {
            base_tokens
                .iter()
                .zip(quote_tokens)
                .zip(min_valid_salts)
                .try_for_each(|((&base, &quote), &salt)| engine.cancel_pair_inner(kind, ctx, maker, base, quote, salt))
        })
    }

    fn cancel_pair_inner(
        &mut self,
        kind: OrderKind,
        ctx: CallContext,
        maker: Address,
        base_token: Address,
        quote_token: Address,
        min_valid_salt: U256,
    ) -> Result<(), EngineError> {
        if !self.state.signers.is_valid_signer(maker, ctx.sender) {
            return Err(EngineError::InvalidSigner {
                maker,
                signer: ctx.sender,
            });
        }

        let key = PairKey::new(maker, base_token, quote_token);
        self.state.set_min_valid_salt(kind, key, min_valid_salt);

        let event = PairCancelledEvent {
            maker,
            base_token,
            quote_token,
            min_valid_salt,
        };
        match kind {
            OrderKind::Rfq => self.emit_event(EventPayload::PairCancelledRfqOrders(event)),
            _ => self.emit_event(EventPayload::PairCancelledLimitOrders(event)),
        }
        info!(maker = %maker, base_token = %base_token, quote_token = %quote_token, min_valid_salt = %min_valid_salt, "pair cancelled");
        Ok(())
    }
}
