//! Engine configuration options.

use crate::config::ExchangeConfig;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of events to retain in memory.
    pub max_events: usize,
    /// Domain, protocol fee and token settings.
    pub exchange: ExchangeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_events: 100_000,
            exchange: ExchangeConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(exchange: ExchangeConfig) -> Self {
        Self {
            exchange,
            ..Self::default()
        }
    }
}
