// liquidity/src/state.rs

use crate::{checked, LiquidityError, LiquidityResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use swap_primitives::{Address, Amount};

/// Macro-state of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PoolPhase {
    /// No reserves and no shares outstanding
    Empty,
    /// Both reserves and the share supply are positive
    Funded,
}

/// Persistent pool state: reserves and the share ledger
///
/// Plain data so it can be snapshotted before a mutating call and restored
/// verbatim if settlement fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolState {
    pub reserve_a: Amount,
    pub reserve_b: Amount,
    pub total_shares: Amount,
    /// Per-provider share balances; providers at zero are removed
    pub shares: HashMap<Address, Amount>,
}

impl PoolState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PoolPhase {
        if self.total_shares.is_zero() {
            PoolPhase::Empty
        } else {
            PoolPhase::Funded
        }
    }

    pub fn is_empty(&self) -> bool {
        self.phase() == PoolPhase::Empty
    }

    pub fn shares_of(&self, provider: &Address) -> Amount {
        self.shares.get(provider).cloned().unwrap_or_else(Amount::zero)
    }

    /// Product of the reserves
    pub fn k(&self) -> LiquidityResult<Amount> {
        checked(self.reserve_a.checked_mul(&self.reserve_b), "reserve product")
    }

    pub(crate) fn mint_shares(&mut self, to: &Address, amount: &Amount) -> LiquidityResult<()> {
        let balance = checked(self.shares_of(to).checked_add(amount), "provider shares")?;
        self.total_shares = checked(self.total_shares.checked_add(amount), "total shares")?;
        self.shares.insert(*to, balance);
        Ok(())
    }

    pub(crate) fn burn_shares(&mut self, from: &Address, amount: &Amount) -> LiquidityResult<()> {
        let available = self.shares_of(from);
        let remaining = available
            .checked_sub(amount)
            .ok_or_else(|| LiquidityError::InsufficientShares {
                required: amount.clone(),
                available: available.clone(),
            })?;
        self.total_shares = checked(self.total_shares.checked_sub(amount), "total shares")?;

        if remaining.is_zero() {
            self.shares.remove(from);
        } else {
            self.shares.insert(*from, remaining);
        }
        Ok(())
    }

    /// Check the structural invariants
    ///
    /// - `reserve_a == 0 <=> reserve_b == 0 <=> total_shares == 0`
    /// - the share ledger sums to `total_shares`
    /// - no provider holds a zero entry
    pub fn check_invariants(&self) -> LiquidityResult<()> {
        let a_empty = self.reserve_a.is_zero();
        let b_empty = self.reserve_b.is_zero();
        let s_empty = self.total_shares.is_zero();
        if a_empty != b_empty || a_empty != s_empty {
            return Err(LiquidityError::InvariantViolation(format!(
                "partially empty pool: reserve_a={}, reserve_b={}, total_shares={}",
                self.reserve_a, self.reserve_b, self.total_shares
            )));
        }

        let mut sum = Amount::zero();
        for (provider, balance) in &self.shares {
            if balance.is_zero() {
                return Err(LiquidityError::InvariantViolation(format!(
                    "zero share entry for {provider}"
                )));
            }
            sum = checked(sum.checked_add(balance), "share sum")?;
        }
        if sum != self.total_shares {
            return Err(LiquidityError::InvariantViolation(format!(
                "share ledger sums to {sum}, total_shares is {}",
                self.total_shares
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_state() {
        let state = PoolState::new();
        assert_eq!(state.phase(), PoolPhase::Empty);
        assert!(state.check_invariants().is_ok());
        assert!(state.shares_of(&Address::from_label("alice")).is_zero());
    }

    #[test]
    fn test_mint_and_burn_shares() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        let mut state = PoolState {
            reserve_a: Amount::from_u64(100),
            reserve_b: Amount::from_u64(200),
            ..PoolState::new()
        };

        state.mint_shares(&alice, &Amount::from_u64(60)).unwrap();
        state.mint_shares(&bob, &Amount::from_u64(40)).unwrap();
        assert_eq!(state.total_shares, Amount::from_u64(100));
        assert!(state.check_invariants().is_ok());

        state.burn_shares(&bob, &Amount::from_u64(40)).unwrap();
        assert!(!state.shares.contains_key(&bob));
        assert_eq!(state.total_shares, Amount::from_u64(60));

        let err = state.burn_shares(&alice, &Amount::from_u64(61)).unwrap_err();
        assert!(matches!(err, LiquidityError::InsufficientShares { .. }));
        assert_eq!(state.shares_of(&alice), Amount::from_u64(60));
    }

    #[test]
    fn test_detects_partial_emptiness() {
        let state = PoolState {
            reserve_a: Amount::from_u64(1),
            ..PoolState::new()
        };
        assert!(matches!(
            state.check_invariants(),
            Err(LiquidityError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_detects_share_mismatch() {
        let mut state = PoolState {
            reserve_a: Amount::from_u64(1),
            reserve_b: Amount::from_u64(1),
            total_shares: Amount::from_u64(10),
            ..PoolState::new()
        };
        state
            .shares
            .insert(Address::from_label("alice"), Amount::from_u64(9));
        assert!(state.check_invariants().is_err());
    }

    #[test]
    fn test_k() {
        let state = PoolState {
            reserve_a: Amount::from_u64(1000),
            reserve_b: Amount::from_u64(2000),
            ..PoolState::new()
        };
        assert_eq!(state.k().unwrap(), Amount::from_u64(2_000_000));
    }
}
