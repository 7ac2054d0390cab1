//! Inbound transfer commands and their validation

use crate::types::{AccountId, Currency, Money, RequestError, TransferRequest};
use serde::{Deserialize, Serialize};

/// Longest description accepted on a transfer
pub const MAX_DESCRIPTION_LEN: usize = 500;

/// Currency used when a command does not name one
pub const DEFAULT_CURRENCY: Currency = Currency::Usd;

/// Raw transfer command as received from a client or read from a CSV row
///
/// Every field is kept as text until `validate` turns the command into a
/// typed `TransferRequest`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferCommand {
    /// Source account UUID
    pub source: String,

    /// Destination account UUID
    pub destination: String,

    /// Amount in minor units
    pub amount: String,

    /// ISO currency code; blank means USD
    #[serde(default)]
    pub currency: Option<String>,

    #[serde(default)]
    pub idempotency_key: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl TransferCommand {
    /// Idempotency key with surrounding whitespace removed, if any is left
    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Turn the command into a typed request
    ///
    /// # Errors
    ///
    /// - `RequestError::MissingIdempotencyKey` if no non-blank key is present
    /// - `RequestError::InvalidField` naming the first field that fails:
    ///   account ids must be UUIDs, the amount a positive integer, the currency
    ///   a known ISO code, and the description at most 500 characters
    pub fn validate(&self) -> Result<TransferRequest, RequestError> {
        let idempotency_key = self
            .idempotency_key()
            .ok_or(RequestError::MissingIdempotencyKey)?
            .to_string();

        let source = parse_account("source", &self.source)?;
        let destination = parse_account("destination", &self.destination)?;

        let amount_minor: i64 = self.amount.trim().parse().map_err(|_| {
            RequestError::invalid_field("amount", "Amount must be an integer")
        })?;
        if amount_minor <= 0 {
            return Err(RequestError::invalid_field(
                "amount",
                "Amount must be positive",
            ));
        }

        let currency = match self.currency.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_CURRENCY,
            Some(code) => code
                .parse::<Currency>()
                .map_err(|e| RequestError::invalid_field("currency", e))?,
        };

        let amount = Money::from_minor(amount_minor, currency)
            .map_err(|e| RequestError::invalid_field("amount", e.to_string()))?;

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if let Some(d) = description {
            if d.chars().count() > MAX_DESCRIPTION_LEN {
                return Err(RequestError::invalid_field(
                    "description",
                    format!(
                        "Description cannot be longer than {} characters",
                        MAX_DESCRIPTION_LEN
                    ),
                ));
            }
        }

        Ok(TransferRequest {
            source,
            destination,
            amount,
            idempotency_key,
            description: description.map(str::to_string),
        })
    }
}

fn parse_account(field: &str, value: &str) -> Result<AccountId, RequestError> {
    if value.trim().is_empty() {
        return Err(RequestError::invalid_field(
            field,
            format!("{} account UUID is required", capitalize(field)),
        ));
    }

    value.parse().map_err(|_| {
        RequestError::invalid_field(
            field,
            format!("{} account UUID must be a valid UUID", capitalize(field)),
        )
    })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
