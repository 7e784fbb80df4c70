// crates/summit-engine/src/treasury.rs
//
// Protocol treasury. Receives withdrawal-tax proceeds; spending routes
// through governance, which sits outside this core.

use serde::{Deserialize, Serialize};

use summit_core::SummitError;

/// The protocol treasury balance, in reward-token micro-units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Treasury {
    balance: u64,
}

impl Treasury {
    /// Create a new treasury with zero balance.
    pub fn new() -> Self {
        Self { balance: 0 }
    }

    /// Deposit tax proceeds into the treasury.
    pub fn deposit(&mut self, amount: u64) {
        self.balance = self.balance.saturating_add(amount);
    }

    /// Withdraw from the treasury (governance-directed).
    ///
    /// # Errors
    /// Returns `SummitError::InvalidState` if the balance is insufficient.
    pub fn withdraw(&mut self, amount: u64) -> Result<(), SummitError> {
        if amount > self.balance {
            return Err(SummitError::InvalidState(format!(
                "insufficient treasury balance: requested {} but only {} available",
                amount, self.balance
            )));
        }
        self.balance -= amount;
        Ok(())
    }

    /// Current balance.
    pub fn balance(&self) -> u64 {
        self.balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_accumulates() {
        let mut treasury = Treasury::new();
        treasury.deposit(50);
        treasury.deposit(30);
        assert_eq!(treasury.balance(), 80);
    }

    #[test]
    fn test_withdraw_success_and_insufficient() {
        let mut treasury = Treasury::new();
        treasury.deposit(100);
        assert!(treasury.withdraw(40).is_ok());
        assert_eq!(treasury.balance(), 60);
        assert!(treasury.withdraw(100).is_err());
        assert_eq!(treasury.balance(), 60);
    }
}
