//! Currency codes supported by the platform

use serde::{Deserialize, Serialize};
use std::fmt;

/// ISO-style currency code for collaboration and ledger amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    /// Three-letter code
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }

    /// Display decimal places for this currency
    pub fn decimals(&self) -> u32 {
        2
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self::Usd
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
