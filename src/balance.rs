//!
//! Exact wei amounts and their native token rendering.
//!
use alloy_primitives::U256;
use serde::Deserialize;

/// Number of wei in one native token
pub const WEI_PER_TOKEN: u64 = 1_000_000_000_000_000_000;

const FRACTION_DIGITS: usize = 18;

/// Wei amount that is not a base 10 unsigned integer
#[derive(Debug, thiserror::Error)]
pub enum InvalidWei {
    /// Empty, or contains something other than `0-9`
    #[error("expected base 10 digits only")]
    NotDigits,
    /// Does not fit in 256 bits
    #[error("{0}")]
    Range(alloy_primitives::ruint::ParseError),
}

/// Token balance held as an integer number of wei
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Balance {
    wei: U256,
}

impl Balance {
    /// Create a balance from wei
    #[must_use]
    pub const fn from_wei(wei: U256) -> Self {
        Self { wei }
    }

    /// Whole native tokens, no fraction
    #[must_use]
    pub fn from_tokens(tokens: u64) -> Self {
        Self {
            wei: U256::from(tokens).saturating_mul(U256::from(WEI_PER_TOKEN)),
        }
    }

    /// Parse a base 10 wei string. Only ASCII digits are accepted.
    pub fn parse_wei(text: &str) -> Result<Self, InvalidWei> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidWei::NotDigits);
        }
        U256::from_str_radix(text, 10)
            .map(Self::from_wei)
            .map_err(InvalidWei::Range)
    }

    /// Balance in wei
    #[must_use]
    pub const fn wei(&self) -> U256 {
        self.wei
    }

    /// True when the balance is strictly less than `tokens` whole tokens
    #[must_use]
    pub fn is_below(&self, tokens: u64) -> bool {
        Self::from_tokens(tokens) > *self
    }
}

impl std::fmt::Display for Balance {
    /// Renders the native token amount with trailing fraction zeros trimmed
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unit = U256::from(WEI_PER_TOKEN);
        let whole = self.wei / unit;
        let fraction = (self.wei % unit).to_string();

        let fraction = format!("{:0>width$}", fraction, width = FRACTION_DIGITS);
        let fraction = fraction.trim_end_matches('0');

        if fraction.is_empty() {
            write!(f, "{}", whole)
        } else {
            write!(f, "{}.{}", whole, fraction)
        }
    }
}

impl<'de> Deserialize<'de> for Balance {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Large wei amounts are sent as strings, small ones may arrive as integers
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Text(String),
            Integer(u64),
        }

        match Wire::deserialize(deserializer)? {
            Wire::Text(text) => Self::parse_wei(&text).map_err(|e| {
                serde::de::Error::custom(format!("invalid wei amount {:?}: {}", text, e))
            }),
            Wire::Integer(wei) => Ok(Self::from_wei(U256::from(wei))),
        }
    }
}
