//! Tracked token table

use crate::error::{ConfigError, Result};
use alloy::primitives::Address;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// A tracked ERC-20 token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Lowercased symbol, unique within the table
    pub symbol: String,
    /// Contract address
    pub address: Address,
}

impl Token {
    pub fn new(symbol: impl AsRef<str>, address: Address) -> Self {
        Self {
            symbol: symbol.as_ref().to_lowercase(),
            address,
        }
    }
}

/// Read-only symbol -> token lookup, case-insensitive on symbol
#[derive(Debug, Clone, Default)]
pub struct TokenTable {
    tokens: BTreeMap<String, Token>,
}

impl TokenTable {
    /// Build a table from (symbol, address) string pairs
    pub fn from_pairs<I, S, A>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, A)>,
        S: AsRef<str>,
        A: AsRef<str>,
    {
        let mut tokens = BTreeMap::new();

        for (symbol, address) in pairs {
            let symbol = symbol.as_ref().trim().to_lowercase();
            let parsed = Address::from_str(address.as_ref().trim()).map_err(|_| {
                ConfigError::InvalidAddress {
                    symbol: symbol.clone(),
                    address: address.as_ref().to_string(),
                }
            })?;

            if tokens.contains_key(&symbol) {
                return Err(ConfigError::DuplicateToken(symbol).into());
            }
            tokens.insert(symbol.clone(), Token::new(&symbol, parsed));
        }

        Ok(Self { tokens })
    }

    /// Look up a token by symbol, ignoring case
    pub fn get(&self, symbol: &str) -> Option<&Token> {
        self.tokens.get(&symbol.trim().to_lowercase())
    }

    /// All tokens ordered by symbol
    pub fn tokens(&self) -> Vec<Token> {
        self.tokens.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}
