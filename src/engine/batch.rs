// 8.3 engine/batch.rs: many fills in one call. best-effort batches report each
// element; atomic batches undo everything at the first short fill.

use tracing::warn;

use super::core::Engine;
use super::results::{BatchFillEntry, BatchFillResults, EngineError, FillOutcome};
use crate::order::{LimitOrder, OrderFields, OtcOrder, RfqOrder};
use crate::settlement::SettlementBackend;
use crate::signature::Signature;
use crate::types::{CallContext, OrderHash};

pub(super) fn check_lengths(lengths: &[usize]) -> Result<(), EngineError> {
    if lengths.windows(2).any(|w| w[0] != w[1]) {
        return Err(EngineError::MismatchedArrayLengths {
            lengths: lengths.to_vec(),
        });
    }
    Ok(())
}

// a failed element counts as a zero fill
fn require_complete(order_hash: OrderHash, outcome: &FillOutcome, requested: u128) -> Result<(), EngineError> {
    let filled = outcome.quote_filled();
    if filled < requested {
        return Err(EngineError::BatchFillIncomplete {
            order_hash,
            filled,
            requested,
        });
    }
    Ok(())
}

impl Engine {
    /// Fill several limit orders. One payment covers the protocol fee of every
    /// element. It is collected, spent and refunded once, after the last fill.
    #[allow(clippy::too_many_arguments)]
    pub fn batch_fill_limit_orders<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        orders: &[LimitOrder],
        signatures: &[Signature],
        quote_fill_amounts: &[u128],
        protocol_fee_payment: u128,
        revert_if_incomplete: bool,
    ) -> Result<BatchFillResults, EngineError> {
        check_lengths(&[orders.len(), signatures.len(), quote_fill_amounts.len()])?;

        self.atomically(backend, |engine, backend| {
            let mut remaining_payment = protocol_fee_payment;
            let mut results = BatchFillResults::default();

            for ((order, signature), &requested) in orders.iter().zip(signatures).zip(quote_fill_amounts) {
                let order_hash = order.order_hash();
                let available = remaining_payment;
                let attempt = engine.atomically(backend, |engine, backend| {
                    engine.fill_limit_inner(backend, ctx, order, signature, requested, available, false)
                });
                let outcome = match attempt {
                    Ok((fill, fee_paid)) => {
                        remaining_payment -= fee_paid;
                        results.protocol_fee_paid += fee_paid;
                        FillOutcome::Filled(fill)
                    }
                    Err(e) => FillOutcome::Skipped(e),
                };

                if revert_if_incomplete {
                    require_complete(order_hash, &outcome, requested)?;
                }
                if let FillOutcome::Skipped(e) = &outcome {
                    warn!(order_hash = %order_hash, error = %e, "batch element skipped");
                }
                results.entries.push(BatchFillEntry { order_hash, outcome });
            }

            results.refund =
                engine.settle_payment(backend, ctx.sender, protocol_fee_payment, results.protocol_fee_paid)?;
            Ok(results)
        })
    }

    pub fn batch_fill_rfq_orders<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        orders: &[RfqOrder],
        signatures: &[Signature],
        quote_fill_amounts: &[u128],
        revert_if_incomplete: bool,
    ) -> Result<BatchFillResults, EngineError> {
        check_lengths(&[orders.len(), signatures.len(), quote_fill_amounts.len()])?;

        self.atomically(backend, |engine, backend| {
            let mut results = BatchFillResults::default();

            for ((order, signature), &requested) in orders.iter().zip(signatures).zip(quote_fill_amounts) {
                let order_hash = order.order_hash();
                let outcome = match engine.atomically(backend, |engine, backend| {
                    engine.fill_rfq_inner(backend, ctx, order, signature, requested, false)
                }) {
                    Ok(fill) => FillOutcome::Filled(fill),
                    Err(e) => FillOutcome::Skipped(e),
                };

                if revert_if_incomplete {
                    require_complete(order_hash, &outcome, requested)?;
                }
                if let FillOutcome::Skipped(e) = &outcome {
                    warn!(order_hash = %order_hash, error = %e, "batch element skipped");
                }
                results.entries.push(BatchFillEntry { order_hash, outcome });
            }
            Ok(results)
        })
    }

    /// Best-effort: each element either fully fills or leaves no trace.
    /// Returns one flag per order.
    pub fn batch_fill_taker_signed_otc_orders<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        ctx: CallContext,
        orders: &[OtcOrder],
        maker_signatures: &[Signature],
        taker_signatures: &[Signature],
        unwrap_flags: &[bool],
    ) -> Result<Vec<bool>, EngineError> {
        check_lengths(&[
            orders.len(),
            maker_signatures.len(),
            taker_signatures.len(),
            unwrap_flags.len(),
        ])?;

        let mut succeeded = Vec::with_capacity(orders.len());
        for (((order, maker_sig), taker_sig), &unwrap) in orders
            .iter()
            .zip(maker_signatures)
            .zip(taker_signatures)
            .zip(unwrap_flags)
        {
            match self.fill_taker_signed_otc_order(backend, ctx, order, maker_sig, taker_sig, unwrap) {
                Ok(_) => succeeded.push(true),
                Err(e) => {
                    warn!(order_hash = %order.order_hash(), error = %e, "batch element skipped");
                    succeeded.push(false);
                }
            }
        }
        Ok(succeeded)
    }
}
