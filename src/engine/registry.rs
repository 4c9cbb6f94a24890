//! Signer and origin registration.

use tracing::info;

use super::core::Engine;
use super::results::EngineError;
use crate::events::{EventPayload, OrderSignerRegisteredEvent, RfqOrderOriginsAllowedEvent};
use crate::types::{Address, CallContext};

impl Engine {
    /// Allow (or revoke) `signer` to sign and cancel for the caller.
    pub fn register_allowed_order_signer(&mut self, ctx: CallContext, signer: Address, allowed: bool) {
        let maker = ctx.sender;
        self.state.set_signer(maker, signer, allowed);
        self.emit_event(EventPayload::OrderSignerRegistered(OrderSignerRegisteredEvent {
            maker,
            signer,
            allowed,
        }));
        info!(maker = %maker, signer = %signer, allowed, "order signer registered");
    }

    /// Let `addrs` fill rfq and otc orders restricted to the caller's origin.
    /// Only a direct call from the origin itself may do this.
    pub fn register_allowed_origins(
        &mut self,
        ctx: CallContext,
        addrs: &[Address],
        allowed: bool,
    ) -> Result<(), EngineError> {
        if !ctx.is_external() {
            return Err(EngineError::ContractOriginNotAllowed {
                sender: ctx.sender,
                origin: ctx.origin,
            });
        }

        let origin = ctx.origin;
        for &addr in addrs {
            self.state.set_origin(origin, addr, allowed);
        }
        self.emit_event(EventPayload::RfqOrderOriginsAllowed(RfqOrderOriginsAllowedEvent {
            origin,
            addrs: addrs.to_vec(),
            allowed,
        }));
        info!(origin = %origin, count = addrs.len(), allowed, "origins registered");
        Ok(())
    }

    /// Maker itself or a registered delegate.
    pub fn is_valid_order_signer(&self, maker: Address, signer: Address) -> bool {
        self.state.signers.is_valid_signer(maker, signer)
    }

    pub fn is_allowed_origin(&self, origin: Address, caller: Address) -> bool {
        self.state.origins.is_allowed(origin, caller)
    }
}
