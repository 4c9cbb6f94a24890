//! Order fills.
//!
//! Every fill runs in two phases: the ledger write (fill amount or nonce)
//! and its event are committed first, then the transfer legs go to the
//! backend. A backend that re-enters during a transfer already sees the
//! committed fill.

use tracing::info;

use super::core::Engine;
use super::results::{EngineError, FillResults, LimitFillResults};
use crate::events::{EventPayload, LimitOrderFilledEvent, OtcOrderFilledEvent, RfqOrderFilledEvent};
use crate::math::{limit_base_filled, limit_fee_filled, rfq_base_filled};
use crate::order::{LimitOrder, OrderFields, OtcOrder, RfqOrder};
use crate::settlement::{SettlementBackend, SettlementInstruction, TransferReason};
use crate::signature::Signature;
use crate::status::{limit_order_info, otc_order_info, rfq_order_info};
use crate::types::{Address, CallContext, OrderStatus};

impl Engine {
    /// Fill up to `quote_fill_amount` of a limit order. The request is clamped
    /// to what remains. `protocol_fee_payment` is native value sent along;
    /// whatever the protocol fee doesn't use is refunded.
    pub fn fill_limit_order<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &LimitOrder,
        signature: &Signature,
        quote_fill_amount: u128,
        protocol_fee_payment: u128,
    ) -> Result<LimitFillResults, EngineError> {
        self.fill_limit_with_payment(backend, ctx, order, signature, quote_fill_amount, protocol_fee_payment, false)
    }

    /// Like `fill_limit_order` but fails instead of clamping.
    pub fn fill_or_kill_limit_order<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &LimitOrder,
        signature: &Signature,
        quote_fill_amount: u128,
        protocol_fee_payment: u128,
    ) -> Result<LimitFillResults, EngineError> {
        self.fill_limit_with_payment(backend, ctx, order, signature, quote_fill_amount, protocol_fee_payment, true)
    }

    pub fn fill_rfq_order<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &RfqOrder,
        signature: &Signature,
        quote_fill_amount: u128,
    ) -> Result<FillResults, EngineError> {
        self.atomically(backend, |engine, backend| {
            engine.fill_rfq_inner(backend, ctx, order, signature, quote_fill_amount, false)
        })
    }

    pub fn fill_or_kill_rfq_order<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &RfqOrder,
        signature: &Signature,
        quote_fill_amount: u128,
    ) -> Result<FillResults, EngineError> {
        self.atomically(backend, |engine, backend| {
            engine.fill_rfq_inner(backend, ctx, order, signature, quote_fill_amount, true)
        })
    }

    /// Fill an otc order with the caller as taker. Any fill, partial or not,
    /// burns the order's nonce.
    pub fn fill_otc_order<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &OtcOrder,
        maker_signature: &Signature,
        quote_fill_amount: u128,
    ) -> Result<FillResults, EngineError> {
        self.atomically(backend, |engine, backend| {
            engine.fill_otc_inner(backend, ctx, order, maker_signature, ctx.sender, quote_fill_amount, false, false)
        })
    }

    pub fn fill_or_kill_otc_order<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &OtcOrder,
        maker_signature: &Signature,
        quote_fill_amount: u128,
    ) -> Result<FillResults, EngineError> {
        self.atomically(backend, |engine, backend| {
            engine.fill_otc_inner(backend, ctx, order, maker_signature, ctx.sender, quote_fill_amount, false, true)
        })
    }

    /// Fully fill an otc order on behalf of its named taker, who authorized
    /// the fill by signing the order hash. With `unwrap` the maker's wrapped
    /// native token is delivered to the taker as native value.
    pub fn fill_taker_signed_otc_order<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &OtcOrder,
        maker_signature: &Signature,
        taker_signature: &Signature,
        unwrap: bool,
    ) -> Result<FillResults, EngineError> {
        self.atomically(backend, |engine, backend| {
            let order_hash = order.order_hash();
            let taker = order.common.taker;
            if taker.is_zero() {
                return Err(EngineError::TakerNotSet { order_hash });
            }

            let signer = engine.resolve_signer(&*backend, order_hash, taker, taker_signature);
            match signer {
                Some(signer) if engine.state.signers.is_valid_signer(taker, signer) => {}
                _ => {
                    return Err(EngineError::OrderNotSignedByTaker {
                        order_hash,
                        signer,
                        taker,
                    })
                }
            }

            engine.fill_otc_inner(backend, ctx, order, maker_signature, taker, order.common.quote_amount, unwrap, false)
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn fill_limit_with_payment<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &LimitOrder,
        signature: &Signature,
        quote_fill_amount: u128,
        protocol_fee_payment: u128,
        kill_if_clamped: bool,
    ) -> Result<LimitFillResults, EngineError> {
        self.atomically(backend, |engine, backend| {
            let (fill, protocol_fee_paid) = engine.fill_limit_inner(
                backend,
                ctx,
                order,
                signature,
                quote_fill_amount,
                protocol_fee_payment,
                kill_if_clamped,
            )?;
            let refund = engine.settle_payment(backend, ctx.sender, protocol_fee_payment, protocol_fee_paid)?;
            Ok(LimitFillResults {
                fill,
                protocol_fee_paid,
                refund,
            })
        })
    }

    /// Payment phase of a limit fill or batch, run after every ledger write:
    /// collect the attached value, pay the protocol fee, refund the rest.
    /// Returns the refund.
    pub(super) fn settle_payment<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        payer: Address,
        payment: u128,
        protocol_fee: u128,
    ) -> Result<u128, EngineError> {
        let refund = payment.saturating_sub(protocol_fee);
        let legs = [
            SettlementInstruction::CollectPayment {
                from: payer,
                amount: payment,
            },
            SettlementInstruction::ProtocolFee {
                collector: self.config.exchange.protocol_fee_collector,
                amount: protocol_fee,
            },
            SettlementInstruction::Refund {
                to: payer,
                amount: refund,
            },
        ];
        self.settle(backend, &legs)?;
        Ok(refund)
    }

    /// One limit fill. `available_payment` is what is left of the attached
    /// value; the fee itself moves in the payment phase. Returns the fill and
    /// the protocol fee it owes.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn fill_limit_inner<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &LimitOrder,
        signature: &Signature,
        quote_fill_amount: u128,
        available_payment: u128,
        kill_if_clamped: bool,
    ) -> Result<(FillResults, u128), EngineError> {
        let order_hash = order.order_hash();
        let c = &order.common;
        self.check_signature(&*backend, order_hash, c.maker, signature)?;

        let info = limit_order_info(&self.ledger_view(), order);
        if !info.is_fillable() {
            return Err(EngineError::OrderNotFillable {
                order_hash,
                status: info.status,
            });
        }

        if !c.taker.is_zero() && c.taker != ctx.sender {
            return Err(EngineError::OrderNotFillableByTaker {
                order_hash,
                taker: ctx.sender,
                expected: c.taker,
            });
        }

        if !order.sender.is_zero() && order.sender != ctx.sender {
            return Err(EngineError::OrderNotFillableBySender {
                order_hash,
                sender: ctx.sender,
                expected: order.sender,
            });
        }

        let remaining = info.remaining(c.quote_amount);
        let quote_filled = quote_fill_amount.min(remaining);
        if kill_if_clamped && quote_filled < quote_fill_amount {
            return Err(EngineError::FillOrKillFailed {
                order_hash,
                requested: quote_fill_amount,
                available: remaining,
            });
        }

        let base_filled = limit_base_filled(quote_filled, c.quote_amount, c.base_amount);
        let quote_fee_filled = limit_fee_filled(quote_filled, c.quote_amount, order.quote_fee_amount);

        let protocol_fee = self.config.exchange.protocol_fee(ctx.gas_price);
        if protocol_fee > available_payment {
            return Err(EngineError::InsufficientProtocolFee {
                required: protocol_fee,
                available: available_payment,
            });
        }

        // commit
        self.state.record_fill(order_hash, quote_filled);
        self.emit_event(EventPayload::LimitOrderFilled(LimitOrderFilledEvent {
            order_hash,
            maker: c.maker,
            taker: ctx.sender,
            fee_recipient: order.fee_recipient,
            base_token: c.base_token,
            quote_token: c.quote_token,
            quote_filled,
            base_filled,
            quote_fee_filled,
            protocol_fee_paid: protocol_fee,
            pool: order.pool,
        }));
        info!(order_hash = %order_hash, quote_filled, base_filled, quote_fee_filled, "limit order filled");

        // transfer
        let legs = [
            SettlementInstruction::Transfer {
                token: c.quote_token,
                from: ctx.sender,
                to: c.maker,
                amount: quote_filled,
                reason: TransferReason::QuoteToMaker,
            },
            SettlementInstruction::Transfer {
                token: c.base_token,
                from: c.maker,
                to: ctx.sender,
                amount: base_filled,
                reason: TransferReason::BaseToTaker,
            },
            SettlementInstruction::Transfer {
                token: c.quote_token,
                from: ctx.sender,
                to: order.fee_recipient,
                amount: quote_fee_filled,
                reason: TransferReason::QuoteFee,
            },
        ];
        self.settle(backend, &legs)?;

        Ok((
            FillResults {
                quote_filled,
                base_filled,
                quote_fee_filled,
            },
            protocol_fee,
        ))
    }

    pub(super) fn fill_rfq_inner<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &RfqOrder,
        signature: &Signature,
        quote_fill_amount: u128,
        kill_if_clamped: bool,
    ) -> Result<FillResults, EngineError> {
        let order_hash = order.order_hash();
        let c = &order.common;
        self.check_signature(&*backend, order_hash, c.maker, signature)?;

        let info = rfq_order_info(&self.ledger_view(), order);
        if !info.is_fillable() {
            return Err(EngineError::OrderNotFillable {
                order_hash,
                status: info.status,
            });
        }

        if !c.taker.is_zero() && c.taker != ctx.sender {
            return Err(EngineError::OrderNotFillableByTaker {
                order_hash,
                taker: ctx.sender,
                expected: c.taker,
            });
        }

        if !self.state.origins.admits(order.origin, ctx.origin) {
            return Err(EngineError::OrderNotFillableByOrigin {
                order_hash,
                origin: ctx.origin,
                expected: order.origin,
            });
        }

        let remaining = info.remaining(c.quote_amount);
        let quote_filled = quote_fill_amount.min(remaining);
        if kill_if_clamped && quote_filled < quote_fill_amount {
            return Err(EngineError::FillOrKillFailed {
                order_hash,
                requested: quote_fill_amount,
                available: remaining,
            });
        }
        let base_filled = rfq_base_filled(quote_filled, c.quote_amount, c.base_amount);

        // commit
        self.state.record_fill(order_hash, quote_filled);
        self.emit_event(EventPayload::RfqOrderFilled(RfqOrderFilledEvent {
            order_hash,
            maker: c.maker,
            taker: ctx.sender,
            base_token: c.base_token,
            quote_token: c.quote_token,
            quote_filled,
            base_filled,
            pool: order.pool,
        }));
        info!(order_hash = %order_hash, quote_filled, base_filled, "rfq order filled");

        // transfer
        let legs = [
            SettlementInstruction::Transfer {
                token: c.quote_token,
                from: ctx.sender,
                to: c.maker,
                amount: quote_filled,
                reason: TransferReason::QuoteToMaker,
            },
            SettlementInstruction::Transfer {
                token: c.base_token,
                from: c.maker,
                to: ctx.sender,
                amount: base_filled,
                reason: TransferReason::BaseToTaker,
            },
        ];
        self.settle(backend, &legs)?;

        Ok(FillResults {
            quote_filled,
            base_filled,
            quote_fee_filled: 0,
        })
    }

    /// `taker` pays quote and receives base. It is the caller for plain fills
    /// and the order's named taker for taker-signed fills.
    #[allow(clippy::too_many_arguments)]
    pub(super) fn fill_otc_inner<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        order: &OtcOrder,
        maker_signature: &Signature,
        taker: Address,
        quote_fill_amount: u128,
        unwrap: bool,
        kill_if_clamped: bool,
    ) -> Result<FillResults, EngineError> {
        let order_hash = order.order_hash();
        let c = &order.common;
        self.check_signature(&*backend, order_hash, c.maker, maker_signature)?;

        let info = otc_order_info(&self.ledger_view(), order);
        if info.status != OrderStatus::Fillable {
            return Err(EngineError::OrderNotFillable {
                order_hash,
                status: info.status,
            });
        }

        if !c.taker.is_zero() && c.taker != taker {
            return Err(EngineError::OrderNotFillableByTaker {
                order_hash,
                taker,
                expected: c.taker,
            });
        }

        if !self.state.origins.admits(order.origin, ctx.origin) {
            return Err(EngineError::OrderNotFillableByOrigin {
                order_hash,
                origin: ctx.origin,
                expected: order.origin,
            });
        }

        let quote_filled = quote_fill_amount.min(c.quote_amount);
        if kill_if_clamped && quote_filled < quote_fill_amount {
            return Err(EngineError::FillOrKillFailed {
                order_hash,
                requested: quote_fill_amount,
                available: c.quote_amount,
            });
        }
        let base_filled = rfq_base_filled(quote_filled, c.quote_amount, c.base_amount);

        if unwrap && c.base_token != self.config.exchange.wrapped_native_token {
            return Err(EngineError::UnwrapNotSupported { token: c.base_token });
        }

        // commit
        self.state
            .consume_nonce(order.nonce_consumer(), order.nonce_bucket(), order.nonce());
        self.emit_event(EventPayload::OtcOrderFilled(OtcOrderFilledEvent {
            order_hash,
            maker: c.maker,
            taker,
            base_token: c.base_token,
            quote_token: c.quote_token,
            quote_filled,
            base_filled,
        }));
        info!(order_hash = %order_hash, quote_filled, base_filled, nonce = order.nonce(), "otc order filled");

        // transfer
        let base_leg = if unwrap {
            SettlementInstruction::UnwrapTransfer {
                token: c.base_token,
                from: c.maker,
                to: taker,
                amount: base_filled,
            }
        } else {
            SettlementInstruction::Transfer {
                token: c.base_token,
                from: c.maker,
                to: taker,
                amount: base_filled,
                reason: TransferReason::BaseToTaker,
            }
        };
        let legs = [
            SettlementInstruction::Transfer {
                token: c.quote_token,
                from: taker,
                to: c.maker,
                amount: quote_filled,
                reason: TransferReason::QuoteToMaker,
            },
            base_leg,
        ];
        self.settle(backend, &legs)?;

        Ok(FillResults {
            quote_filled,
            base_filled,
            quote_fee_filled: 0,
        })
    }
}
