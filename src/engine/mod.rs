// 8.0: settlement engine. validates signed orders, resolves their status,
// clamps and commits fills, then hands transfers to the settlement backend.
// deterministic: the clock is set explicitly and every call is all-or-nothing.

mod batch;
mod cancel;
mod config;
mod core;
mod fills;
mod queries;
mod registry;
mod results;
mod state;

pub use config::EngineConfig;
pub use core::Engine;
pub use results::{
    BatchFillEntry, BatchFillResults, EngineError, FillOutcome, FillResults, LimitFillResults, RelevantState,
};
