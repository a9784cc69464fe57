use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Correlation key for one aggregation run: chain plus token contract, with
/// an optional liquidity-pair address for pair-keyed price feeds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenIdentifier {
    chain: String,
    address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pair: Option<String>,
}

impl TokenIdentifier {
    /// Parse and normalize chain and address to lowercase.
    pub fn new(chain: &str, address: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            chain: parse_chain(chain)?,
            address: parse_address(address)?,
            pair: None,
        })
    }

    pub fn with_pair(mut self, pair: &str) -> Result<Self, ValidationError> {
        self.pair = Some(parse_address(pair)?);
        Ok(self)
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn pair(&self) -> Option<&str> {
        self.pair.as_deref()
    }

    /// Address used by pair-keyed feeds; falls back to the token address.
    pub fn pair_or_address(&self) -> &str {
        self.pair.as_deref().unwrap_or(&self.address)
    }

    /// Case-insensitive comparison against an address reported by a provider.
    pub fn matches_address(&self, other: &str) -> bool {
        self.address.eq_ignore_ascii_case(other.trim())
    }
}

impl Display for TokenIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.chain, self.address)
    }
}

fn parse_chain(input: &str) -> Result<String, ValidationError> {
    let normalized = input.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(ValidationError::EmptyChain);
    }
    let valid = normalized
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_');
    if !valid {
        return Err(ValidationError::InvalidChain {
            value: input.to_owned(),
        });
    }
    Ok(normalized)
}

fn parse_address(input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyAddress);
    }

    let normalized = trimmed.to_ascii_lowercase();
    let Some(digits) = normalized.strip_prefix("0x") else {
        return Err(ValidationError::InvalidAddress {
            value: input.to_owned(),
        });
    };

    let valid_len = digits.len() == 40 || digits.len() == 64;
    if !valid_len || !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(ValidationError::InvalidAddress {
            value: input.to_owned(),
        });
    }

    Ok(normalized)
}
