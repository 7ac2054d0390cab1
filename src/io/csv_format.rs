//! CSV format handling
//!
//! This module centralizes the CSV layouts the CLI reads and writes:
//!
//! - Accounts fixture (input): `id,holder_name,currency,balance,status`, balance in minor units
//! - Transfers (input): `source,destination,amount,currency,idempotency_key,description`
//! - Accounts (output): `id,holder_name,currency,balance,status,version`, sorted by id
//! - Results (output): `idempotency_key,outcome,debit_transaction_id,credit_transaction_id,error`
//!
//! Transfer rows deserialize straight into `TransferCommand`; their validation
//! happens in the gateway, not here.

use crate::core::TransferOutcome;
use crate::types::{Account, AccountId, AccountStatus, Currency, InputError, Money};
use csv::{ReaderBuilder, Trim, Writer};
use serde::Deserialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Raw account row from an accounts fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct AccountRow {
    pub id: String,

    pub holder_name: String,

    pub currency: String,

    /// Opening balance in minor units
    pub balance: i64,

    pub status: String,
}

/// Convert an account row into an `Account`
///
/// # Returns
///
/// Result containing either:
/// - Ok(Account) - The opened account, version 1
/// - Err(String) - Error message naming the offending field
pub fn convert_account_row(row: AccountRow) -> Result<Account, String> {
    let id: AccountId = row
        .id
        .parse()
        .map_err(|_| format!("Invalid account id '{}'", row.id))?;

    let currency: Currency = row.currency.parse()?;
    let status: AccountStatus = row.status.parse()?;

    let balance = Money::from_minor(row.balance, currency)
        .map_err(|e| format!("Invalid balance for account {}: {}", id, e))?;

    Account::with_id(id, row.holder_name.trim(), currency, status)
        .with_opening_balance(&balance)
        .map_err(|e| e.to_string())
}

/// Load every account from an accounts fixture file
///
/// Unlike transfer rows, a bad account row is fatal: running transfers
/// against a partially loaded ledger would give misleading balances.
///
/// # Errors
///
/// - `InputError::FileNotFound` if `path` does not exist
/// - `InputError::Parse` if the CSV structure is invalid
/// - `InputError::InvalidRecord` if a row cannot be converted
pub fn load_accounts(path: &Path) -> Result<Vec<Account>, InputError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => InputError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => InputError::from(e),
    })?;

    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(file);

    let mut accounts = Vec::new();
    for (index, row) in reader.deserialize::<AccountRow>().enumerate() {
        let row = row?;
        let account = convert_account_row(row).map_err(|message| InputError::InvalidRecord {
            // Header is line 1
            line: Some(index as u64 + 2),
            message,
        })?;
        accounts.push(account);
    }

    Ok(accounts)
}

/// Write account states to CSV format
///
/// Writes accounts with columns: id, holder_name, currency, balance, status, version.
/// Accounts are sorted by id for deterministic output.
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), InputError> {
    let mut writer = Writer::from_writer(output);

    writer.write_record(["id", "holder_name", "currency", "balance", "status", "version"])?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer.write_record(&[
            account.id.to_string(),
            account.holder_name.clone(),
            account.currency.to_string(),
            account.balance_minor().to_string(),
            account.status.to_string(),
            account.version().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write one row per dispatched command, in the order given
///
/// Successful rows carry both transaction ids; failed rows carry the error
/// code in `outcome` and the message in `error`.
pub fn write_results_csv(
    outcomes: &[TransferOutcome],
    output: &mut dyn Write,
) -> Result<(), InputError> {
    let mut writer = Writer::from_writer(output);

    writer.write_record([
        "idempotency_key",
        "outcome",
        "debit_transaction_id",
        "credit_transaction_id",
        "error",
    ])?;

    for outcome in outcomes {
        let key = outcome.command.idempotency_key().unwrap_or_default();
        let record = match &outcome.result {
            Ok(receipt) => [
                key.to_string(),
                "completed".to_string(),
                receipt.debit_transaction_id.to_string(),
                receipt.credit_transaction_id.to_string(),
                String::new(),
            ],
            Err(e) => [
                key.to_string(),
                e.code().to_string(),
                String::new(),
                String::new(),
                e.to_string(),
            ],
        };
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}
