// 6.0 registry.rs: delegated signers (maker -> signers) and origin allowlists
// (origin -> callers). plain owner-mutable sets, independent of fill state.

use crate::types::Address;
use std::collections::{HashMap, HashSet};

/// Keys allowed to sign and cancel on a maker's behalf.
#[derive(Debug, Clone, Default)]
pub struct SignerRegistry {
    signers: HashMap<Address, HashSet<Address>>,
}

impl SignerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, maker: Address, signer: Address, allowed: bool) {
        if allowed {
            self.signers.entry(maker).or_default().insert(signer);
        } else if let Some(set) = self.signers.get_mut(&maker) {
            set.remove(&signer);
        }
    }

    pub fn is_delegate(&self, maker: Address, signer: Address) -> bool {
        self.signers
            .get(&maker)
            .map(|set| set.contains(&signer))
            .unwrap_or(false)
    }

    /// Maker itself or a registered delegate.
    pub fn is_valid_signer(&self, maker: Address, signer: Address) -> bool {
        maker == signer || self.is_delegate(maker, signer)
    }

    pub fn delegates(&self, maker: Address) -> Vec<Address> {
        let mut out: Vec<Address> = self
            .signers
            .get(&maker)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default();
        out.sort();
        out
    }
}

/// Callers allowed to trigger rfq/otc fills on an origin's behalf.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowlist {
    allowed: HashMap<Address, HashSet<Address>>,
}

impl OriginAllowlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, origin: Address, caller: Address, allowed: bool) {
        if allowed {
            self.allowed.entry(origin).or_default().insert(caller);
        } else if let Some(set) = self.allowed.get_mut(&origin) {
            set.remove(&caller);
        }
    }

    pub fn is_allowed(&self, origin: Address, caller: Address) -> bool {
        self.allowed
            .get(&origin)
            .map(|set| set.contains(&caller))
            .unwrap_or(false)
    }

    /// True when `caller` may act for an order restricted to `restriction`.
    /// A zero restriction admits everyone.
    pub fn admits(&self, restriction: Address, caller: Address) -> bool {
        restriction.is_zero() || restriction == caller || self.is_allowed(restriction, caller)
    }
}
