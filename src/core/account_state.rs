use crate::error::{BlockchainError, Result};
use crate::types::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// An address with a balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
pub struct Account {
    address: Address,
    balance: u64,
}

impl Account {
    pub fn new(address: Address, balance: u64) -> Account {
        Account { address, balance }
    }

    pub fn get_address(&self) -> Address {
        self.address
    }

    pub fn get_balance(&self) -> u64 {
        self.balance
    }
}

/// The in-memory ledger: address → account. Accounts are created lazily for
/// recipients and never deleted.
pub struct AccountState {
    inner: RwLock<HashMap<Address, Account>>,
}

impl Default for AccountState {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountState {
    pub fn new() -> AccountState {
        AccountState {
            inner: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_account(&self, address: &Address) -> Option<Account> {
        self.inner
            .read()
            .expect("account state lock poisoned")
            .get(address)
            .cloned()
    }

    /// Register an account. Idempotent: an existing account for the address
    /// is left untouched.
    pub fn create_account(&self, address: Address, account: Account) {
        let mut accounts = self.inner.write().expect("account state lock poisoned");
        accounts.entry(address).or_insert(account);
    }

    /// Balance for `address`, zero when the account does not exist.
    pub fn get_balance(&self, address: &Address) -> u64 {
        self.inner
            .read()
            .expect("account state lock poisoned")
            .get(address)
            .map(|account| account.balance)
            .unwrap_or(0)
    }

    /// Move `amount` from `from` to `to`, all-or-nothing under one write
    /// lock. The recipient account is created on first receipt; a zero
    /// recipient is allowed (only the sender is zero-checked), which makes
    /// burns representable.
    pub fn transfer(&self, from: Address, to: Address, amount: u64) -> Result<()> {
        let mut accounts = self.inner.write().expect("account state lock poisoned");

        if from.is_zero() {
            return Err(BlockchainError::ZeroAddress);
        }
        let available = match accounts.get(&from) {
            Some(account) => account.balance,
            None => return Err(BlockchainError::AccountNotExists(from)),
        };
        if available < amount {
            return Err(BlockchainError::InsufficientBalance {
                required: amount,
                available,
            });
        }

        accounts.entry(to).or_insert_with(|| Account::new(to, 0));
        if let Some(account) = accounts.get_mut(&to) {
            account.balance += amount;
        }
        if let Some(account) = accounts.get_mut(&from) {
            account.balance -= amount;
        }
        Ok(())
    }

    /// Sum of all balances. Transfers preserve this value.
    pub fn total_balance(&self) -> u64 {
        self.inner
            .read()
            .expect("account state lock poisoned")
            .values()
            .map(|account| account.balance)
            .sum()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("account state lock poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::new([byte; 20])
    }

    #[test]
    fn test_transfer_chain() {
        let state = AccountState::new();
        let a = addr(1);
        let b = addr(2);
        let c = addr(3);
        state.create_account(a, Account::new(a, 1000));
        state.create_account(b, Account::new(b, 500));

        state.transfer(a, b, 300).unwrap();
        state.transfer(b, c, 100).unwrap();
        state.transfer(a, c, 200).unwrap();

        assert_eq!(state.get_balance(&a), 500);
        assert_eq!(state.get_balance(&b), 700);
        assert_eq!(state.get_balance(&c), 300);
    }

    #[test]
    fn test_transfer_from_unknown_sender() {
        let state = AccountState::new();
        let a = addr(1);
        let b = addr(2);
        state.create_account(a, Account::new(a, 100));

        let err = state.transfer(b, a, 10).unwrap_err();
        assert!(matches!(err, BlockchainError::AccountNotExists(_)));
        assert_eq!(state.get_balance(&a), 100);
        assert_eq!(state.get_balance(&b), 0);
    }

    #[test]
    fn test_transfer_from_zero_address() {
        let state = AccountState::new();
        let zero = Address::default();
        // Even a funded zero account may never send.
        state.create_account(zero, Account::new(zero, 100));

        let err = state.transfer(zero, addr(1), 10).unwrap_err();
        assert!(matches!(err, BlockchainError::ZeroAddress));
    }

    #[test]
    fn test_transfer_to_zero_address_is_allowed() {
        let state = AccountState::new();
        let a = addr(1);
        state.create_account(a, Account::new(a, 100));

        state.transfer(a, Address::default(), 40).unwrap();
        assert_eq!(state.get_balance(&a), 60);
        assert_eq!(state.get_balance(&Address::default()), 40);
    }

    #[test]
    fn test_insufficient_balance_leaves_state_untouched() {
        let state = AccountState::new();
        let a = addr(1);
        let b = addr(2);
        state.create_account(a, Account::new(a, 50));

        let err = state.transfer(a, b, 51).unwrap_err();
        assert!(matches!(
            err,
            BlockchainError::InsufficientBalance {
                required: 51,
                available: 50
            }
        ));
        assert_eq!(state.get_balance(&a), 50);
        assert_eq!(state.get_balance(&b), 0);
        // The failed transfer must not have created the recipient.
        assert!(state.get_account(&b).is_none());
    }

    #[test]
    fn test_create_account_is_idempotent() {
        let state = AccountState::new();
        let a = addr(1);
        state.create_account(a, Account::new(a, 100));
        state.create_account(a, Account::new(a, 999));
        assert_eq!(state.get_balance(&a), 100);
    }

    #[test]
    fn test_transfers_preserve_total_balance() {
        let state = AccountState::new();
        let a = addr(1);
        let b = addr(2);
        state.create_account(a, Account::new(a, 700));
        state.create_account(b, Account::new(b, 300));
        let total = state.total_balance();

        state.transfer(a, b, 150).unwrap();
        state.transfer(b, addr(3), 250).unwrap();
        state.transfer(a, addr(4), 1).unwrap();
        let _ = state.transfer(b, a, u64::MAX); // fails, no effect

        assert_eq!(state.total_balance(), total);
    }
}
