// settlement-core: settlement engine for signed off-chain orders.
// makers sign orders off-chain, takers fill them here. the engine owns fill
// state, cancellation and replay protection; value moves through a pluggable
// settlement backend.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: OrderHash, Timestamp, Domain, CallContext
//   2.x  order.rs: limit, rfq and otc orders, packed otc expiry and nonce
//   3.x  hashing.rs: EIP-712 domain separator and order hashes
//   3.1  signature.rs: eip712 / eth_sign recovery, contract signatures
//   4.x  math.rs: proportional fill amounts
//   5.x  ledger.rs: fill amounts, direct cancels, pair salts, otc nonces
//   5.1  status.rs: order status resolution
//   6.x  registry.rs: delegated signers and origin allowlists
//   7.x  config.rs: domain, protocol fee, env presets
//   8.x  engine/: fills, batches, cancels, registration, queries
//   9.1  settlement.rs: transfer legs and the settlement backend
//   11.x events.rs: state transition events for audit

// order model
pub mod hashing;
pub mod math;
pub mod order;
pub mod signature;
pub mod types;

// state
pub mod engine;
pub mod events;
pub mod ledger;
pub mod registry;
pub mod status;

// integration modules
pub mod config;
pub mod settlement;

// re exports for convenience
pub use config::{ConfigError, Environment, ExchangeConfig};
pub use engine::*;
pub use events::*;
pub use order::*;
pub use settlement::{
    Checkpoint, InMemorySettlement, SettlementBackend, SettlementError, SettlementInstruction, TransferReason,
};
pub use signature::{address_of, Signature, SignatureType};
pub use status::{OrderInfo, OtcOrderInfo};
pub use types::*;
