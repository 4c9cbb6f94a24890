// 9.1 settlement.rs: value transfer legs and the backend that executes them.
// the engine commits its ledgers first, then hands each leg to the backend
// together with `&mut Engine`, so a backend hook can re-enter any operation.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::engine::Engine;
use crate::types::{Address, OrderHash};

// Why a token moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferReason {
    QuoteToMaker,
    BaseToTaker,
    QuoteFee,
}

// One leg of a settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementInstruction {
    // Move `amount` of an erc20-like token using the exchange's allowance
    Transfer {
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
        reason: TransferReason,
    },

    // Pull wrapped native from `from`, deliver it unwrapped to `to`
    UnwrapTransfer {
        token: Address,
        from: Address,
        to: Address,
        amount: u128,
    },

    // Native value attached to the call, held by the exchange until settled
    CollectPayment {
        from: Address,
        amount: u128,
    },

    // Protocol fee out of the collected payment
    ProtocolFee {
        collector: Address,
        amount: u128,
    },

    // Unused payment back to the caller
    Refund {
        to: Address,
        amount: u128,
    },
}

impl SettlementInstruction {
    pub fn amount(&self) -> u128 {
        match self {
            SettlementInstruction::Transfer { amount, .. }
            | SettlementInstruction::UnwrapTransfer { amount, .. }
            | SettlementInstruction::CollectPayment { amount, .. }
            | SettlementInstruction::ProtocolFee { amount, .. }
            | SettlementInstruction::Refund { amount, .. } => *amount,
        }
    }
}

// Errors from settlement operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("insufficient balance of {token} for {owner}: required {required}, available {available}")]
    InsufficientBalance {
        token: Address,
        owner: Address,
        required: u128,
        available: u128,
    },

    #[error("insufficient allowance of {token} for {owner}: required {required}, available {available}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        required: u128,
        available: u128,
    },

    #[error("insufficient native balance for {owner}: required {required}, available {available}")]
    InsufficientNative {
        owner: Address,
        required: u128,
        available: u128,
    },

    #[error("escrow underflow: required {required}, held {held}")]
    EscrowUnderflow { required: u128, held: u128 },

    #[error("escrow overflow: held {held}, adding {amount}")]
    EscrowOverflow { held: u128, amount: u128 },

    #[error("balance overflow for {owner}: balance {balance}, adding {amount}")]
    BalanceOverflow { owner: Address, balance: u128, amount: u128 },

    #[error("transfer rejected: {reason}")]
    Rejected { reason: String },
}

/// Handle returned by `checkpoint`, consumed by `commit` or `revert_to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(pub usize);

// Trait for settlement execution backends
pub trait SettlementBackend {
    /// Execute one leg. The engine is passed back in so callbacks can call
    /// any public operation before returning.
    fn execute(&mut self, engine: &mut Engine, instruction: &SettlementInstruction) -> Result<(), SettlementError>;

    /// How much of `token` can currently be pulled from `owner`.
    fn spendable(&self, token: Address, owner: Address) -> u128;

    /// Approval predicate for accounts that validate signatures themselves.
    fn is_valid_signature(&self, account: Address, hash: OrderHash) -> bool;

    fn checkpoint(&mut self) -> Checkpoint;

    fn commit(&mut self, checkpoint: Checkpoint);

    fn revert_to(&mut self, checkpoint: Checkpoint);

    // Get the backend type identifier
    fn backend_type(&self) -> &str;
}

#[derive(Debug, Clone, Default)]
struct Ledger {
    balances: HashMap<(Address, Address), u128>,
    allowances: HashMap<(Address, Address), u128>,
    native: HashMap<Address, u128>,
    escrow: u128,
}

// value a write replaced, `None` when the key was absent
#[derive(Debug, Clone)]
enum LedgerUndo {
    Balance { key: (Address, Address), previous: Option<u128> },
    Allowance { key: (Address, Address), previous: Option<u128> },
    Native { owner: Address, previous: Option<u128> },
    Escrow { previous: u128 },
    Executed,
}

fn restore<K: std::hash::Hash + Eq>(map: &mut HashMap<K, u128>, key: K, previous: Option<u128>) {
    match previous {
        Some(value) => {
            map.insert(key, value);
        }
        None => {
            map.remove(&key);
        }
    }
}

// In memory settlement backend for testing and simulation
#[derive(Debug, Clone, Default)]
pub struct InMemorySettlement {
    ledger: Ledger,
    executed: Vec<SettlementInstruction>,
    // writes made inside open checkpoints, undone newest first on revert
    journal: Vec<LedgerUndo>,
    open: usize,
    approved_hashes: HashSet<(Address, OrderHash)>,
}

impl InMemorySettlement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_balance(&mut self, token: Address, owner: Address, amount: u128) {
        self.write_balance((token, owner), amount);
    }

    pub fn balance(&self, token: Address, owner: Address) -> u128 {
        self.ledger.balances.get(&(token, owner)).copied().unwrap_or(0)
    }

    /// Unset allowances are unlimited.
    pub fn set_allowance(&mut self, token: Address, owner: Address, amount: u128) {
        let previous = self.ledger.allowances.insert((token, owner), amount);
        self.record(LedgerUndo::Allowance {
            key: (token, owner),
            previous,
        });
    }

    pub fn allowance(&self, token: Address, owner: Address) -> u128 {
        self.ledger.allowances.get(&(token, owner)).copied().unwrap_or(u128::MAX)
    }

    pub fn set_native_balance(&mut self, owner: Address, amount: u128) {
        self.write_native(owner, amount);
    }

    pub fn native_balance(&self, owner: Address) -> u128 {
        self.ledger.native.get(&owner).copied().unwrap_or(0)
    }

    pub fn escrow(&self) -> u128 {
        self.ledger.escrow
    }

    /// Marks `hash` as approved by the contract account `account`.
    pub fn approve_hash(&mut self, account: Address, hash: OrderHash) {
        self.approved_hashes.insert((account, hash));
    }

    /// Every leg applied and not reverted, oldest first.
    pub fn executed(&self) -> &[SettlementInstruction] {
        &self.executed
    }

    /// Applies one leg to the balances. Exposed so wrapping backends can
    /// delegate the bookkeeping and add their own hooks around it. A failed
    /// leg leaves the balances untouched.
    pub fn apply(&mut self, instruction: &SettlementInstruction) -> Result<(), SettlementError> {
        match instruction {
            SettlementInstruction::Transfer { token, from, to, amount, .. } => {
                self.move_token(*token, *from, *to, *amount)?;
            }
            SettlementInstruction::UnwrapTransfer { token, from, to, amount } => {
                let credited = checked_credit(self.native_balance(*to), *amount, *to)?;
                self.debit_token(*token, *from, *amount)?;
                self.write_native(*to, credited);
            }
            SettlementInstruction::CollectPayment { from, amount } => {
                let available = self.native_balance(*from);
                if available < *amount {
                    return Err(SettlementError::InsufficientNative {
                        owner: *from,
                        required: *amount,
                        available,
                    });
                }
                let escrow = self
                    .ledger
                    .escrow
                    .checked_add(*amount)
                    .ok_or(SettlementError::EscrowOverflow {
                        held: self.ledger.escrow,
                        amount: *amount,
                    })?;
                self.write_native(*from, available - *amount);
                self.write_escrow(escrow);
            }
            SettlementInstruction::ProtocolFee { collector: to, amount }
            | SettlementInstruction::Refund { to, amount } => {
                if self.ledger.escrow < *amount {
                    return Err(SettlementError::EscrowUnderflow {
                        required: *amount,
                        held: self.ledger.escrow,
                    });
                }
                let credited = checked_credit(self.native_balance(*to), *amount, *to)?;
                self.write_escrow(self.ledger.escrow - *amount);
                self.write_native(*to, credited);
            }
        }
        self.executed.push(instruction.clone());
        self.record(LedgerUndo::Executed);
        Ok(())
    }

    fn move_token(&mut self, token: Address, from: Address, to: Address, amount: u128) -> Result<(), SettlementError> {
        if from != to {
            checked_credit(self.balance(token, to), amount, to)?;
        }
        self.debit_token(token, from, amount)?;
        // the debit above leaves room for a self transfer
        let credited = self.balance(token, to).saturating_add(amount);
        self.write_balance((token, to), credited);
        Ok(())
    }

    fn check_debit(&self, token: Address, owner: Address, amount: u128) -> Result<(u128, u128), SettlementError> {
        let balance = self.balance(token, owner);
        if balance < amount {
            return Err(SettlementError::InsufficientBalance {
                token,
                owner,
                required: amount,
                available: balance,
            });
        }
        let allowance = self.allowance(token, owner);
        if allowance < amount {
            return Err(SettlementError::InsufficientAllowance {
                token,
                owner,
                required: amount,
                available: allowance,
            });
        }
        Ok((balance, allowance))
    }

    fn debit_token(&mut self, token: Address, owner: Address, amount: u128) -> Result<(), SettlementError> {
        let (balance, allowance) = self.check_debit(token, owner, amount)?;
        self.write_balance((token, owner), balance - amount);
        if allowance != u128::MAX {
            self.set_allowance(token, owner, allowance - amount);
        }
        Ok(())
    }

    fn record(&mut self, undo: LedgerUndo) {
        if self.open > 0 {
            self.journal.push(undo);
        }
    }

    fn write_balance(&mut self, key: (Address, Address), amount: u128) {
        let previous = self.ledger.balances.insert(key, amount);
        self.record(LedgerUndo::Balance { key, previous });
    }

    fn write_native(&mut self, owner: Address, amount: u128) {
        let previous = self.ledger.native.insert(owner, amount);
        self.record(LedgerUndo::Native { owner, previous });
    }

    fn write_escrow(&mut self, amount: u128) {
        let previous = std::mem::replace(&mut self.ledger.escrow, amount);
        self.record(LedgerUndo::Escrow { previous });
    }

    fn close_scope(&mut self) {
        self.open = self.open.saturating_sub(1);
        if self.open == 0 {
            self.journal.clear();
        }
    }
}

fn checked_credit(balance: u128, amount: u128, owner: Address) -> Result<u128, SettlementError> {
    balance
        .checked_add(amount)
        .ok_or(SettlementError::BalanceOverflow { owner, balance, amount })
}

impl SettlementBackend for InMemorySettlement {
    fn execute(&mut self, _engine: &mut Engine, instruction: &SettlementInstruction) -> Result<(), SettlementError> {
        self.apply(instruction)
    }

    fn spendable(&self, token: Address, owner: Address) -> u128 {
        self.balance(token, owner).min(self.allowance(token, owner))
    }

    fn is_valid_signature(&self, account: Address, hash: OrderHash) -> bool {
        self.approved_hashes.contains(&(account, hash))
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.open += 1;
        Checkpoint(self.journal.len())
    }

    fn commit(&mut self, _checkpoint: Checkpoint) {
        self.close_scope();
    }

    fn revert_to(&mut self, checkpoint: Checkpoint) {
        while self.journal.len() > checkpoint.0 {
            let Some(undo) = self.journal.pop() else { break };
            match undo {
                LedgerUndo::Balance { key, previous } => restore(&mut self.ledger.balances, key, previous),
                LedgerUndo::Allowance { key, previous } => restore(&mut self.ledger.allowances, key, previous),
                LedgerUndo::Native { owner, previous } => restore(&mut self.ledger.native, owner, previous),
                LedgerUndo::Escrow { previous } => self.ledger.escrow = previous,
                LedgerUndo::Executed => {
                    self.executed.pop();
                }
            }
        }
        self.close_scope();
    }

    fn backend_type(&self) -> &str {
        "in_memory"
    }
}
