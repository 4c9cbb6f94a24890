// 8.2 engine/state.rs: every ledger and registry the engine owns, plus an
// undo journal. each write records the value it replaced; aborting a call
// replays the journal back to the call's mark, committing the outermost call
// drops it. cost of a rollback is the number of writes undone, not the size
// of the ledgers.

use crate::events::{Event, EventCollector};
use crate::ledger::{FillLedger, PairCancellations, PairKey};
use crate::registry::{OriginAllowlist, SignerRegistry};
use crate::types::{Address, OrderHash, OrderKind, U256};

/// One reversible write.
#[derive(Debug, Clone)]
enum Undo {
    Fill { hash: OrderHash, previous: u128 },
    Cancel { hash: OrderHash },
    Nonce { consumer: Address, bucket: u64, previous: u128 },
    PairSalt { kind: OrderKind, key: PairKey, previous: U256 },
    Signer { maker: Address, signer: Address, previous: bool },
    Origin { origin: Address, caller: Address, previous: bool },
    Event { evicted: Vec<Event> },
}

#[derive(Debug)]
pub(super) struct EngineState {
    pub(super) fills: FillLedger,
    pub(super) pairs: PairCancellations,
    pub(super) signers: SignerRegistry,
    pub(super) origins: OriginAllowlist,
    pub(super) events: EventCollector,
    journal: Vec<Undo>,
    // open atomic scopes, nested calls included
    depth: usize,
}

impl EngineState {
    pub(super) fn new(max_events: usize) -> Self {
        Self {
            fills: FillLedger::new(),
            pairs: PairCancellations::default(),
            signers: SignerRegistry::new(),
            origins: OriginAllowlist::new(),
            events: EventCollector::with_retention(max_events),
            journal: Vec::new(),
            depth: 0,
        }
    }

    /// Opens a scope and returns the journal mark to roll back to.
    pub(super) fn begin(&mut self) -> usize {
        self.depth += 1;
        self.journal.len()
    }

    pub(super) fn commit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.journal.clear();
        }
    }

    /// Undoes every write made since `mark`, newest first.
    pub(super) fn rollback(&mut self, mark: usize) {
        while self.journal.len() > mark {
            let Some(undo) = self.journal.pop() else { break };
            match undo {
                Undo::Fill { hash, previous } => self.fills.set_filled(hash, previous),
                Undo::Cancel { hash } => self.fills.unmark_cancelled(&hash),
                Undo::Nonce {
                    consumer,
                    bucket,
                    previous,
                } => self.fills.consume_nonce(consumer, bucket, previous),
                Undo::PairSalt { kind, key, previous } => self.pairs.set_min_valid_salt(kind, key, previous),
                Undo::Signer {
                    maker,
                    signer,
                    previous,
                } => self.signers.set(maker, signer, previous),
                Undo::Origin {
                    origin,
                    caller,
                    previous,
                } => self.origins.set(origin, caller, previous),
                Undo::Event { evicted } => self.events.retract(evicted),
            }
        }
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.journal.clear();
        }
    }

    fn record(&mut self, undo: Undo) {
        if self.depth > 0 {
            self.journal.push(undo);
        }
    }

    pub(super) fn record_fill(&mut self, hash: OrderHash, quote_filled: u128) -> u128 {
        let previous = self.fills.filled_amount(&hash);
        self.record(Undo::Fill { hash, previous });
        self.fills.record_fill(hash, quote_filled)
    }

    /// Returns false when the order was already cancelled.
    pub(super) fn mark_cancelled(&mut self, hash: OrderHash) -> bool {
        let newly = self.fills.mark_cancelled(hash);
        if newly {
            self.record(Undo::Cancel { hash });
        }
        newly
    }

    pub(super) fn consume_nonce(&mut self, consumer: Address, bucket: u64, nonce: u128) {
        let previous = self.fills.last_consumed_nonce(consumer, bucket);
        self.record(Undo::Nonce {
            consumer,
            bucket,
            previous,
        });
        self.fills.consume_nonce(consumer, bucket, nonce);
    }

    pub(super) fn set_min_valid_salt(&mut self, kind: OrderKind, key: PairKey, min_valid_salt: U256) {
        let previous = self.pairs.min_valid_salt(kind, &key);
        self.record(Undo::PairSalt { kind, key, previous });
        self.pairs.set_min_valid_salt(kind, key, min_valid_salt);
    }

    pub(super) fn set_signer(&mut self, maker: Address, signer: Address, allowed: bool) {
        let previous = self.signers.is_delegate(maker, signer);
        self.record(Undo::Signer {
            maker,
            signer,
            previous,
        });
        self.signers.set(maker, signer, allowed);
    }

    pub(super) fn set_origin(&mut self, origin: Address, caller: Address, allowed: bool) {
        let previous = self.origins.is_allowed(origin, caller);
        self.record(Undo::Origin {
            origin,
            caller,
            previous,
        });
        self.origins.set(origin, caller, allowed);
    }

    pub(super) fn push_event(&mut self, event: Event) {
        let evicted = self.events.push(event);
        self.record(Undo::Event { evicted });
    }

    #[cfg(test)]
    fn journal_len(&self) -> usize {
        self.journal.len()
    }
}
