use std::fmt;
use std::str::FromStr;

use near_sdk::borsh::{BorshDeserialize, BorshSerialize};
use near_sdk::serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Errors produced when parsing [`SymbolCode`], [`Symbol`] or [`Asset`] from
/// their string forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Symbol codes are 1-7 uppercase `A`-`Z` characters.
    InvalidSymbolCode,
    /// Precision is limited to [`Symbol::MAX_PRECISION`] decimal places.
    InvalidPrecision,
    /// Amount is not a decimal number, or falls outside
    /// `-Asset::MAX_AMOUNT..=Asset::MAX_AMOUNT`.
    InvalidAmount,
    /// Input does not have the expected overall shape.
    Malformed,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::InvalidSymbolCode => "symbol code must be 1-7 uppercase letters",
            ParseError::InvalidPrecision => "precision exceeds the supported maximum",
            ParseError::InvalidAmount => "amount is malformed or out of range",
            ParseError::Malformed => "malformed input",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// A short ticker-style identifier for a token, e.g. `SYM`.
///
/// The code alone keys registry and balance rows; decimal precision lives in
/// [`Symbol`] and is fixed when a token is created.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, BorshSerialize, BorshDeserialize,
)]
#[borsh(crate = "near_sdk::borsh")]
pub struct SymbolCode(String);

impl SymbolCode {
    pub const MAX_LENGTH: usize = 7;

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SymbolCode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.len() > Self::MAX_LENGTH || !s.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(ParseError::InvalidSymbolCode);
        }
        Ok(SymbolCode(s.to_string()))
    }
}

impl fmt::Display for SymbolCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A [`SymbolCode`] together with its fixed decimal precision.
///
/// String form is `"<precision>,<CODE>"`, e.g. `"4,SYM"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize)]
#[borsh(crate = "near_sdk::borsh")]
pub struct Symbol {
    code: SymbolCode,
    precision: u8,
}

impl Symbol {
    pub const MAX_PRECISION: u8 = 18;

    pub fn new(code: SymbolCode, precision: u8) -> Result<Self, ParseError> {
        if precision > Self::MAX_PRECISION {
            return Err(ParseError::InvalidPrecision);
        }
        Ok(Symbol { code, precision })
    }

    pub fn code(&self) -> &SymbolCode {
        &self.code
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }
}

impl FromStr for Symbol {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (precision, code) = s.split_once(',').ok_or(ParseError::Malformed)?;
        let precision: u8 = precision.parse().map_err(|_| ParseError::InvalidPrecision)?;
        Symbol::new(code.parse()?, precision)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.precision, self.code)
    }
}

/// A token amount tagged with its [`Symbol`].
///
/// The amount is a signed integer scaled by the symbol's precision: with
/// precision 4, an amount of `1_000_000` reads as `"100.0000 SYM"`. Arithmetic
/// between two assets requires identical symbols; mixing tags is a caller
/// error, surfaced as `None` from the checked operations.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
#[borsh(crate = "near_sdk::borsh")]
pub struct Asset {
    amount: i64,
    symbol: Symbol,
}

impl Asset {
    /// Largest magnitude an amount may take, `2^62 - 1`.
    pub const MAX_AMOUNT: i64 = (1 << 62) - 1;

    pub fn new(amount: i64, symbol: Symbol) -> Self {
        Asset { amount, symbol }
    }

    pub fn zero(symbol: Symbol) -> Self {
        Asset { amount: 0, symbol }
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn is_valid(&self) -> bool {
        (-Self::MAX_AMOUNT..=Self::MAX_AMOUNT).contains(&self.amount)
    }

    /// Sum of two amounts carrying the same symbol. `None` on a symbol
    /// mismatch or when the result leaves the valid range.
    pub fn checked_add(&self, other: &Asset) -> Option<Asset> {
        if self.symbol != other.symbol {
            return None;
        }
        let amount = self.amount.checked_add(other.amount)?;
        let result = Asset { amount, symbol: self.symbol.clone() };
        result.is_valid().then_some(result)
    }

    /// Difference of two amounts carrying the same symbol. `None` on a symbol
    /// mismatch or when the result leaves the valid range.
    pub fn checked_sub(&self, other: &Asset) -> Option<Asset> {
        if self.symbol != other.symbol {
            return None;
        }
        let amount = self.amount.checked_sub(other.amount)?;
        let result = Asset { amount, symbol: self.symbol.clone() };
        result.is_valid().then_some(result)
    }
}

impl FromStr for Asset {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let amount = parts.next().ok_or(ParseError::Malformed)?;
        let code = parts.next().ok_or(ParseError::Malformed)?;
        if parts.next().is_some() {
            return Err(ParseError::Malformed);
        }
        let code: SymbolCode = code.parse()?;

        let (negative, digits) = match amount.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, amount),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (digits, ""),
        };
        if int_part.is_empty()
            || !int_part.bytes().all(|b| b.is_ascii_digit())
            || !frac_part.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ParseError::InvalidAmount);
        }
        if frac_part.len() > Symbol::MAX_PRECISION as usize {
            return Err(ParseError::InvalidPrecision);
        }

        let mut amount: i64 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            amount = amount
                .checked_mul(10)
                .and_then(|a| a.checked_add(i64::from(b - b'0')))
                .ok_or(ParseError::InvalidAmount)?;
        }
        if amount > Asset::MAX_AMOUNT {
            return Err(ParseError::InvalidAmount);
        }
        if negative {
            amount = -amount;
        }

        let symbol = Symbol::new(code, frac_part.len() as u8)?;
        Ok(Asset { amount, symbol })
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = u32::from(self.symbol.precision);
        if precision == 0 {
            return write!(f, "{} {}", self.amount, self.symbol.code);
        }
        let divisor = 10i64.pow(precision);
        let int_part = self.amount / divisor;
        let frac_part = (self.amount % divisor).abs();
        // the sign of a value in (-1, 0) is lost by integer division
        let sign = if self.amount < 0 && int_part == 0 { "-" } else { "" };
        write!(
            f,
            "{}{}.{:0width$} {}",
            sign,
            int_part,
            frac_part,
            self.symbol.code,
            width = precision as usize
        )
    }
}

macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(de::Error::custom)
            }
        }
    };
}

string_serde!(SymbolCode);
string_serde!(Symbol);
string_serde!(Asset);
