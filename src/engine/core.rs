// 8.0 engine/core.rs: main engine. holds every ledger and registry, the clock
// and the event log. orders themselves are never stored.

use tracing::{debug, warn};

use super::config::EngineConfig;
use super::results::EngineError;
use super::state::EngineState;
use crate::config::ExchangeConfig;
use crate::events::{Event, EventPayload};
use crate::settlement::{SettlementBackend, SettlementInstruction};
use crate::signature::{Signature, SignatureType};
use crate::status::LedgerView;
use crate::types::{Address, Domain, OrderHash, Timestamp};

/** 8.1: main engine struct. all state lives here */
#[derive(Debug)]
pub struct Engine {
    pub(super) config: EngineConfig,
    pub(super) state: EngineState,
    pub(super) current_time: Timestamp,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: EngineState::new(config.max_events),
            config,
            current_time: Timestamp::from_secs(0),
        }
    }

    pub fn set_time(&mut self, timestamp: Timestamp) {
        self.current_time = timestamp;
    }

    pub fn time(&self) -> Timestamp {
        self.current_time
    }

    pub fn advance_time(&mut self, secs: u64) {
        self.current_time = self.current_time.plus_secs(secs);
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config.exchange
    }

    pub fn domain(&self) -> &Domain {
        &self.config.exchange.domain
    }

    pub fn recent_events(&self, count: usize) -> &[Event] {
        self.state.events.recent(count)
    }

    pub fn events(&self) -> &[Event] {
        self.state.events.events()
    }

    pub(super) fn ledger_view(&self) -> LedgerView<'_> {
        LedgerView {
            fills: &self.state.fills,
            pairs: &self.state.pairs,
            domain: &self.config.exchange.domain,
            now: self.current_time,
        }
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let id = self.state.events.next_id();
        let event = Event::new(id, self.current_time, payload);
        debug!(event_id = event.id.0, payload = ?event.payload, "event");
        self.state.push_event(event);
    }

    /// Runs `op` as one indivisible unit. On error the engine state and the
    /// backend balances are restored to what they were at entry. Nested calls
    /// open nested scopes on both journals.
    pub(super) fn atomically<B, T, F>(&mut self, backend: &mut B, op: F) -> Result<T, EngineError>
    where
        B: SettlementBackend,
        F: FnOnce(&mut Engine, &mut B) -> Result<T, EngineError>,
    {
        let mark = self.state.begin();
        let checkpoint = backend.checkpoint();
        match op(self, backend) {
            Ok(value) => {
                backend.commit(checkpoint);
                self.state.commit();
                Ok(value)
            }
            Err(e) => {
                self.state.rollback(mark);
                backend.revert_to(checkpoint);
                warn!(error = %e, "call aborted, state restored");
                Err(e)
            }
        }
    }

    /// Same as `atomically` for operations that never touch a backend.
    pub(super) fn atomically_local<T, F>(&mut self, op: F) -> Result<T, EngineError>
    where
        F: FnOnce(&mut Engine) -> Result<T, EngineError>,
    {
        let mark = self.state.begin();
        match op(self) {
            Ok(value) => {
                self.state.commit();
                Ok(value)
            }
            Err(e) => {
                self.state.rollback(mark);
                warn!(error = %e, "call aborted, state restored");
                Err(e)
            }
        }
    }

    /// Hands each non-empty leg to the backend. The backend may re-enter.
    pub(super) fn settle<B: SettlementBackend>(
        &mut self,
        backend: &mut B,
        instructions: &[SettlementInstruction],
    ) -> Result<(), EngineError> {
        for instruction in instructions.iter().filter(|i| i.amount() > 0) {
            backend.execute(self, instruction)?;
        }
        Ok(())
    }

    /// Identity the signature vouches for, checked against the maker and
    /// its delegates.
    pub(super) fn check_signature<B: SettlementBackend>(
        &self,
        backend: &B,
        order_hash: OrderHash,
        maker: Address,
        signature: &Signature,
    ) -> Result<(), EngineError> {
        let signer = self.resolve_signer(backend, order_hash, maker, signature);
        match signer {
            Some(signer) if self.state.signers.is_valid_signer(maker, signer) => Ok(()),
            _ => Err(EngineError::OrderNotSignedByMaker {
                order_hash,
                signer,
                maker,
            }),
        }
    }

    pub(super) fn resolve_signer<B: SettlementBackend>(
        &self,
        backend: &B,
        order_hash: OrderHash,
        account: Address,
        signature: &Signature,
    ) -> Option<Address> {
        match signature.signature_type {
            // the account (or one of its delegates) answers for itself
            SignatureType::Contract => std::iter::once(account)
                .chain(self.state.signers.delegates(account))
                .find(|candidate| backend.is_valid_signature(*candidate, order_hash)),
            _ => signature.recover(order_hash),
        }
    }
}
