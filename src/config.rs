// 7.0 config.rs: exchange settings. signing domain, protocol fee, wrapped
// native token. presets per environment, validated before use.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Domain};

// Exchange level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    // Chain id and verifying contract every order must be signed for
    pub domain: Domain,
    // Protocol fee per limit fill = gas price * multiplier
    pub protocol_fee_multiplier: u32,
    // Receives protocol fees
    pub protocol_fee_collector: Address,
    // Only this token can be delivered unwrapped on otc fills
    pub wrapped_native_token: Address,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            domain: Domain::new(1337, Address::repeat_byte(0xde)),
            protocol_fee_multiplier: 0,
            protocol_fee_collector: Address::ZERO,
            wrapped_native_token: Address::repeat_byte(0xee),
        }
    }
}

impl ExchangeConfig {
    // Create a configuration preset for testnet
    pub fn testnet() -> Self {
        Self {
            domain: Domain::new(11_155_111, Address::repeat_byte(0xde)),
            protocol_fee_multiplier: 70_000,
            protocol_fee_collector: Address::repeat_byte(0xfc),
            wrapped_native_token: Address::repeat_byte(0xee),
        }
    }

    // Create a configuration preset for mainnet
    pub fn mainnet() -> Self {
        Self {
            domain: Domain::new(1, Address::repeat_byte(0xde)),
            protocol_fee_multiplier: 70_000,
            protocol_fee_collector: Address::repeat_byte(0xfc),
            wrapped_native_token: Address::repeat_byte(0xee),
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = domain;
        self
    }

    pub fn with_protocol_fee(mut self, multiplier: u32, collector: Address) -> Self {
        self.protocol_fee_multiplier = multiplier;
        self.protocol_fee_collector = collector;
        self
    }

    /// Protocol fee owed for one limit fill at `gas_price`.
    pub fn protocol_fee(&self, gas_price: u128) -> u128 {
        gas_price.saturating_mul(self.protocol_fee_multiplier as u128)
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.domain.chain_id == 0 {
            return Err(ConfigError::InvalidDomain {
                reason: "Chain id must be non-zero".to_string(),
            });
        }

        if self.domain.verifying_contract.is_zero() {
            return Err(ConfigError::InvalidDomain {
                reason: "Verifying contract must be set".to_string(),
            });
        }

        // fees would be paid to nobody
        if self.protocol_fee_multiplier > 0 && self.protocol_fee_collector.is_zero() {
            return Err(ConfigError::InvalidFees {
                reason: "Protocol fee collector must be set when fees are charged".to_string(),
            });
        }

        if self.wrapped_native_token.is_zero() {
            return Err(ConfigError::InvalidToken {
                reason: "Wrapped native token must be set".to_string(),
            });
        }

        Ok(())
    }
}

// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid domain: {reason}")]
    InvalidDomain { reason: String },

    #[error("invalid fees: {reason}")]
    InvalidFees { reason: String },

    #[error("invalid token: {reason}")]
    InvalidToken { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> ExchangeConfig {
        match self {
            Environment::Development => ExchangeConfig::default(),
            Environment::Testnet => ExchangeConfig::testnet(),
            Environment::Mainnet => ExchangeConfig::mainnet(),
        }
    }
}
