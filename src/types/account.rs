//! Account-related types for the ledger
//!
//! This module defines the Account structure, its identifier and its status.
//! Accounts are opened once, mutated only through `debit` and `credit`, and
//! never deleted.

use super::error::MoneyError;
use super::money::{Currency, Money};
use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Account identifier
///
/// Ordering follows the canonical hyphenated string form, which is also the
/// order the lock manager acquires account locks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    /// Generate a fresh random identifier
    pub fn new() -> Self {
        AccountId(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for AccountId {
    fn from(uuid: Uuid) -> Self {
        AccountId(uuid)
    }
}

impl FromStr for AccountId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(AccountId)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Blocked,
    Closed,
}

impl AccountStatus {
    /// Only active accounts may take part in a transfer
    pub fn can_transact(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Blocked => "blocked",
            AccountStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "active" => Ok(AccountStatus::Active),
            "inactive" => Ok(AccountStatus::Inactive),
            "blocked" => Ok(AccountStatus::Blocked),
            "closed" => Ok(AccountStatus::Closed),
            _ => Err(format!("Unknown account status: '{}'", s)),
        }
    }
}

/// Ledger account
///
/// Holds a single-currency balance in minor units. The balance never goes
/// negative and `version` increases on every mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub id: AccountId,

    /// Human-facing 16-digit account number
    pub account_number: String,

    pub holder_name: String,

    pub currency: Currency,

    /// Balance in the currency's minor units
    balance_minor: i64,

    pub status: AccountStatus,

    /// Incremented on every balance mutation, starting at 1
    version: u64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with a zero balance
    ///
    /// # Arguments
    ///
    /// * `holder_name` - Name of the account holder
    /// * `currency` - Currency the account is denominated in
    /// * `status` - Initial status
    pub fn new(holder_name: impl Into<String>, currency: Currency, status: AccountStatus) -> Self {
        Self::with_id(AccountId::new(), holder_name, currency, status)
    }

    /// Open a new account under a caller-chosen identifier
    pub fn with_id(
        id: AccountId,
        holder_name: impl Into<String>,
        currency: Currency,
        status: AccountStatus,
    ) -> Self {
        let now = Utc::now();
        Account {
            id,
            account_number: generate_account_number(),
            holder_name: holder_name.into(),
            currency,
            balance_minor: 0,
            status,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the balance an account is opened with
    ///
    /// Only meant for freshly opened accounts; the version is left untouched.
    pub fn with_opening_balance(mut self, balance: &Money) -> Result<Self, MoneyError> {
        if balance.currency() != self.currency {
            return Err(MoneyError::CurrencyMismatch {
                left: self.currency,
                right: balance.currency(),
            });
        }
        self.balance_minor = balance.amount_minor();
        Ok(self)
    }

    /// Current balance as Money
    pub fn balance(&self) -> Money {
        // The balance is kept non-negative by debit/credit.
        Money::from_minor(self.balance_minor, self.currency)
            .unwrap_or_else(|_| Money::zero(self.currency))
    }

    pub fn balance_minor(&self) -> i64 {
        self.balance_minor
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn can_transact(&self) -> bool {
        self.status.can_transact()
    }

    /// Remove funds from the account
    ///
    /// # Errors
    ///
    /// - `MoneyError::CurrencyMismatch` if `amount` is in another currency
    /// - `MoneyError::InsufficientAmount` if the balance is too low
    /// - `MoneyError::ZeroAmount` if `amount` is zero
    pub fn debit(&mut self, amount: &Money) -> Result<(), MoneyError> {
        ensure_positive(amount, "debit")?;
        let balance = self.balance().checked_sub(amount)?;
        self.apply(balance);
        Ok(())
    }

    /// Add funds to the account
    ///
    /// # Errors
    ///
    /// - `MoneyError::CurrencyMismatch` if `amount` is in another currency
    /// - `MoneyError::Overflow` if the balance would not fit
    /// - `MoneyError::ZeroAmount` if `amount` is zero
    pub fn credit(&mut self, amount: &Money) -> Result<(), MoneyError> {
        ensure_positive(amount, "credit")?;
        let balance = self.balance().checked_add(amount)?;
        self.apply(balance);
        Ok(())
    }

    fn apply(&mut self, balance: Money) {
        self.balance_minor = balance.amount_minor();
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

fn ensure_positive(amount: &Money, operation: &str) -> Result<(), MoneyError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(MoneyError::ZeroAmount {
            operation: operation.to_string(),
        })
    }
}

fn generate_account_number() -> String {
    let mut rng = rand::thread_rng();
    (0..4)
        .map(|_| rng.gen_range(1000..=9999).to_string())
        .collect()
}
