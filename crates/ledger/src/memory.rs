// ledger/src/memory.rs

use crate::{LedgerError, LedgerResult, TokenLedger, TransferReceipt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use swap_primitives::{Address, Amount};

/// Static token metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Token identity
    pub token: Address,
    /// Ticker symbol
    pub symbol: String,
    /// Display decimals
    pub decimals: u8,
}

/// In-process fungible token
///
/// Balances and allowances live behind a single `RwLock`; every mutating
/// method, including [`TokenLedger::revert`], holds the write lock for its
/// whole duration.
pub struct InMemoryToken {
    info: TokenInfo,
    state: RwLock<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl InMemoryToken {
    /// Create a token whose identity is derived from its symbol
    pub fn new(symbol: &str, decimals: u8) -> Self {
        let token = Address::derive("simpleswap/token", &[symbol.as_bytes()]);
        Self::with_address(token, symbol, decimals)
    }

    /// Create a token with an explicit identity
    pub fn with_address(token: Address, symbol: &str, decimals: u8) -> Self {
        Self {
            info: TokenInfo {
                token,
                symbol: symbol.to_string(),
                decimals,
            },
            state: RwLock::new(TokenState::default()),
        }
    }

    pub fn info(&self) -> &TokenInfo {
        &self.info
    }

    pub fn symbol(&self) -> &str {
        &self.info.symbol
    }

    pub fn total_supply(&self) -> Amount {
        self.read().total_supply.clone()
    }

    /// Create `amount` new tokens owned by `to`
    pub fn mint(&self, to: &Address, amount: &Amount) -> LedgerResult<()> {
        if to.is_zero() {
            return Err(LedgerError::InvalidAccount("mint to zero address".into()));
        }

        let mut state = self.write();
        let supply = state
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;
        let balance = state
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;

        state.total_supply = supply;
        state.set_balance(*to, balance);

        tracing::debug!(token = %self.info.symbol, %to, %amount, "minted");
        Ok(())
    }

    fn receipt(
        &self,
        from: &Address,
        to: &Address,
        amount: &Amount,
        allowance_spent: Option<(Address, Amount)>,
    ) -> TransferReceipt {
        TransferReceipt {
            token: self.info.token,
            from: *from,
            to: *to,
            amount: amount.clone(),
            allowance_spent,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TokenState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TokenState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenLedger for InMemoryToken {
    fn token(&self) -> Address {
        self.info.token
    }

    fn balance_of(&self, owner: &Address) -> Amount {
        self.read().balance(owner)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.read().allowance(owner, spender)
    }

    fn approve(&self, owner: &Address, spender: &Address, amount: &Amount) -> LedgerResult<()> {
        if owner.is_zero() || spender.is_zero() {
            return Err(LedgerError::InvalidAccount("approve with zero address".into()));
        }
        self.write().set_allowance(*owner, *spender, amount.clone());
        Ok(())
    }

    fn transfer(
        &self,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<TransferReceipt> {
        self.write().transfer(from, to, amount)?;
        Ok(self.receipt(from, to, amount, None))
    }

    fn transfer_from(
        &self,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: &Amount,
    ) -> LedgerResult<TransferReceipt> {
        let mut state = self.write();

        let allowance = state.allowance(from, spender);
        // A max allowance is treated as unlimited and never decremented
        if allowance == Amount::max_value() {
            state.transfer(from, to, amount)?;
            return Ok(self.receipt(from, to, amount, None));
        }

        let remaining =
            allowance
                .checked_sub(amount)
                .ok_or_else(|| LedgerError::InsufficientAllowance {
                    owner: *from,
                    spender: *spender,
                    required: amount.clone(),
                    available: allowance.clone(),
                })?;
        // Balance failure below must not leave the allowance spent
        state.transfer(from, to, amount)?;
        state.set_allowance(*from, *spender, remaining);
        Ok(self.receipt(from, to, amount, Some((*spender, amount.clone()))))
    }

    fn revert(&self, receipt: &TransferReceipt) -> LedgerResult<()> {
        if receipt.token != self.info.token {
            return Err(LedgerError::Rejected(format!(
                "receipt for {} presented to {}",
                receipt.token, self.info.token
            )));
        }

        let mut state = self.write();
        state.transfer(&receipt.to, &receipt.from, &receipt.amount)?;

        if let Some((spender, spent)) = &receipt.allowance_spent {
            let current = state.allowance(&receipt.from, spender);
            if current != Amount::max_value() {
                let restored = current
                    .checked_add(spent)
                    .unwrap_or_else(Amount::max_value);
                state.set_allowance(receipt.from, *spender, restored);
            }
        }

        tracing::debug!(
            token = %self.info.symbol,
            from = %receipt.from,
            to = %receipt.to,
            amount = %receipt.amount,
            "transfer reverted"
        );
        Ok(())
    }
}

impl TokenState {
    fn balance(&self, owner: &Address) -> Amount {
        self.balances.get(owner).cloned().unwrap_or_else(Amount::zero)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .cloned()
            .unwrap_or_else(Amount::zero)
    }

    fn transfer(&mut self, from: &Address, to: &Address, amount: &Amount) -> LedgerResult<()> {
        if from.is_zero() || to.is_zero() {
            return Err(LedgerError::InvalidAccount("transfer with zero address".into()));
        }

        let from_balance = self.balance(from);
        let new_from = from_balance
            .checked_sub(amount)
            .ok_or_else(|| LedgerError::InsufficientBalance {
                owner: *from,
                required: amount.clone(),
                available: from_balance.clone(),
            })?;

        if from == to {
            return Ok(());
        }

        let new_to = self
            .balance(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(*to))?;

        self.set_balance(*from, new_from);
        self.set_balance(*to, new_to);
        Ok(())
    }

    fn set_balance(&mut self, owner: Address, value: Amount) {
        if value.is_zero() {
            self.balances.remove(&owner);
        } else {
            self.balances.insert(owner, value);
        }
    }

    fn set_allowance(&mut self, owner: Address, spender: Address, value: Amount) {
        if value.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn funded_token() -> (InMemoryToken, Address, Address) {
        let token = InMemoryToken::new("TKNA", 18);
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        token.mint(&alice, &Amount::from_u64(1000)).unwrap();
        (token, alice, bob)
    }

    #[test]
    fn test_mint_and_transfer() {
        let (token, alice, bob) = funded_token();
        assert_eq!(token.total_supply(), Amount::from_u64(1000));

        token.transfer(&alice, &bob, &Amount::from_u64(300)).unwrap();

        assert_eq!(token.balance_of(&alice), Amount::from_u64(700));
        assert_eq!(token.balance_of(&bob), Amount::from_u64(300));
        assert_eq!(token.total_supply(), Amount::from_u64(1000));
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let (token, alice, bob) = funded_token();
        let err = token.transfer(&bob, &alice, &Amount::from_u64(1)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(token.balance_of(&alice), Amount::from_u64(1000));
    }

    #[test]
    fn test_transfer_to_zero_rejected() {
        let (token, alice, _) = funded_token();
        let err = token
            .transfer(&alice, &Address::zero(), &Amount::from_u64(1))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccount(_)));
    }

    #[test]
    fn test_transfer_from_consumes_allowance() {
        let (token, alice, bob) = funded_token();
        let carol = Address::from_label("carol");

        token.approve(&alice, &bob, &Amount::from_u64(500)).unwrap();
        token
            .transfer_from(&bob, &alice, &carol, &Amount::from_u64(200))
            .unwrap();

        assert_eq!(token.allowance(&alice, &bob), Amount::from_u64(300));
        assert_eq!(token.balance_of(&carol), Amount::from_u64(200));

        let err = token
            .transfer_from(&bob, &alice, &carol, &Amount::from_u64(301))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientAllowance { .. }));
    }

    #[test]
    fn test_failed_transfer_from_keeps_allowance() {
        let (token, alice, bob) = funded_token();
        token.approve(&alice, &bob, &Amount::from_u64(5000)).unwrap();

        let err = token
            .transfer_from(&bob, &alice, &bob, &Amount::from_u64(2000))
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(token.allowance(&alice, &bob), Amount::from_u64(5000));
    }

    #[test]
    fn test_max_allowance_is_unlimited() {
        let (token, alice, bob) = funded_token();
        token.approve(&alice, &bob, &Amount::max_value()).unwrap();
        token
            .transfer_from(&bob, &alice, &bob, &Amount::from_u64(10))
            .unwrap();
        assert_eq!(token.allowance(&alice, &bob), Amount::max_value());
    }

    #[test]
    fn test_revert_undoes_transfer() {
        let (token, alice, bob) = funded_token();
        let receipt = token.transfer(&alice, &bob, &Amount::from_u64(100)).unwrap();
        assert_eq!(receipt.amount, Amount::from_u64(100));
        assert_eq!(receipt.allowance_spent, None);

        token.revert(&receipt).unwrap();
        assert_eq!(token.balance_of(&alice), Amount::from_u64(1000));
        assert!(token.balance_of(&bob).is_zero());
        assert_eq!(token.total_supply(), Amount::from_u64(1000));
    }

    #[test]
    fn test_revert_restores_spent_allowance() {
        let (token, alice, bob) = funded_token();
        let carol = Address::from_label("carol");
        token.approve(&alice, &bob, &Amount::from_u64(500)).unwrap();

        let receipt = token
            .transfer_from(&bob, &alice, &carol, &Amount::from_u64(200))
            .unwrap();
        assert_eq!(receipt.allowance_spent, Some((bob, Amount::from_u64(200))));

        token.revert(&receipt).unwrap();
        assert_eq!(token.allowance(&alice, &bob), Amount::from_u64(500));
        assert_eq!(token.balance_of(&alice), Amount::from_u64(1000));
        assert!(token.balance_of(&carol).is_zero());
    }

    #[test]
    fn test_revert_keeps_unrelated_writes() {
        let (token, alice, bob) = funded_token();
        let carol = Address::from_label("carol");

        let receipt = token.transfer(&alice, &carol, &Amount::from_u64(100)).unwrap();
        // Another caller moves funds after the receipt was issued
        token.transfer(&alice, &bob, &Amount::from_u64(500)).unwrap();
        token.revert(&receipt).unwrap();

        assert_eq!(token.balance_of(&bob), Amount::from_u64(500));
        assert_eq!(token.balance_of(&alice), Amount::from_u64(500));
        assert!(token.balance_of(&carol).is_zero());
    }

    #[test]
    fn test_revert_fails_when_recipient_spent_funds() {
        let (token, alice, bob) = funded_token();
        let carol = Address::from_label("carol");

        let receipt = token.transfer(&alice, &bob, &Amount::from_u64(100)).unwrap();
        token.transfer(&bob, &carol, &Amount::from_u64(60)).unwrap();

        let err = token.revert(&receipt).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(token.balance_of(&bob), Amount::from_u64(40));
    }

    #[test]
    fn test_revert_rejects_foreign_receipt() {
        let (token, alice, bob) = funded_token();
        let other = InMemoryToken::new("TKNB", 18);
        let receipt = token.transfer(&alice, &bob, &Amount::from_u64(1)).unwrap();
        assert!(matches!(
            other.revert(&receipt),
            Err(LedgerError::Rejected(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_reverting_receipts_restores_balances(
            moves in proptest::collection::vec((0usize..4, 0usize..4, 1u64..400), 1..24),
        ) {
            let token = InMemoryToken::new("PROP", 18);
            let accounts: Vec<Address> = (0..4)
                .map(|i| Address::from_label(&format!("account-{i}")))
                .collect();
            for account in &accounts {
                token.mint(account, &Amount::from_u64(1_000)).unwrap();
            }
            let before: Vec<Amount> = accounts.iter().map(|a| token.balance_of(a)).collect();

            let mut receipts = Vec::new();
            for (from, to, amount) in moves {
                if let Ok(receipt) =
                    token.transfer(&accounts[from], &accounts[to], &Amount::from_u64(amount))
                {
                    receipts.push(receipt);
                }
            }
            for receipt in receipts.iter().rev() {
                prop_assert!(token.revert(receipt).is_ok());
            }

            let after: Vec<Amount> = accounts.iter().map(|a| token.balance_of(a)).collect();
            prop_assert_eq!(after, before);
            prop_assert_eq!(token.total_supply(), Amount::from_u64(4_000));
        }
    }
}
