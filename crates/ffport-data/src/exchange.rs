//! Primary listing exchange of a security.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Primary exchange on which a security trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Exchange {
    /// New York Stock Exchange
    Nyse,

    /// American Stock Exchange
    Amex,

    /// NASDAQ
    Nasdaq,

    /// Any other venue, or unknown
    Other,
}

impl Exchange {
    /// Returns all exchanges.
    pub fn all() -> Vec<Self> {
        vec![Self::Nyse, Self::Amex, Self::Nasdaq, Self::Other]
    }

    /// Returns the short exchange name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Nyse => "NYSE",
            Self::Amex => "AMEX",
            Self::Nasdaq => "NASDAQ",
            Self::Other => "Other",
        }
    }

    /// Decode a CRSP `exchcd` code. When-issued codes 31-33 map to their
    /// regular exchange.
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 | 31 => Self::Nyse,
            2 | 32 => Self::Amex,
            3 | 33 => Self::Nasdaq,
            _ => Self::Other,
        }
    }

    /// Decode a textual exchange value: a name (`NYSE`), a CIZ letter (`N`),
    /// or a numeric CRSP code rendered as text.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if let Ok(code) = value.parse::<i64>() {
            return Self::from_code(code);
        }
        if let Ok(code) = value.parse::<f64>() {
            return Self::from_code(code as i64);
        }
        match value.to_ascii_uppercase().as_str() {
            "NYSE" | "N" => Self::Nyse,
            "AMEX" | "A" => Self::Amex,
            "NASDAQ" | "Q" => Self::Nasdaq,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1, Exchange::Nyse)]
    #[case(31, Exchange::Nyse)]
    #[case(2, Exchange::Amex)]
    #[case(3, Exchange::Nasdaq)]
    #[case(33, Exchange::Nasdaq)]
    #[case(4, Exchange::Other)]
    #[case(-2, Exchange::Other)]
    fn test_from_code(#[case] code: i64, #[case] expected: Exchange) {
        assert_eq!(Exchange::from_code(code), expected);
    }

    #[rstest]
    #[case("NYSE", Exchange::Nyse)]
    #[case("n", Exchange::Nyse)]
    #[case(" Q ", Exchange::Nasdaq)]
    #[case("AMEX", Exchange::Amex)]
    #[case("2", Exchange::Amex)]
    #[case("3.0", Exchange::Nasdaq)]
    #[case("ARCA", Exchange::Other)]
    fn test_parse(#[case] value: &str, #[case] expected: Exchange) {
        assert_eq!(Exchange::parse(value), expected);
    }

    #[test]
    fn test_display() {
        assert_eq!(Exchange::Nyse.to_string(), "NYSE");
        assert_eq!(Exchange::all().len(), 4);
    }
}
