//! G-Code words and their addresses

use std::num::IntErrorKind;

use crate::error::GcodeError;

/// Check that a byte is a usable G-code word letter.
pub fn validate_word(word: char) -> Result<(), GcodeError> {
    if word.is_ascii_uppercase() {
        Ok(())
    } else {
        Err(GcodeError::InvalidWord(word))
    }
}

/// Value written into a token address
///
/// Floats are rendered with the firmware's fixed precision rules, strings
/// are trimmed, and `Empty` clears the address.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressValue {
    Text(String),
    Int(i64),
    Float(f64),
    Empty,
}

impl From<&str> for AddressValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AddressValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for AddressValue {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<i64> for AddressValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<usize> for AddressValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f32> for AddressValue {
    fn from(value: f32) -> Self {
        Self::Float(value as f64)
    }
}

impl From<f64> for AddressValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<AddressValue>> From<Option<T>> for AddressValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Empty, Into::into)
    }
}

/// Conversion from a raw address string into a typed scalar
pub trait FromAddress: Sized {
    fn from_address(address: &str) -> Result<Self, GcodeError>;
}

impl FromAddress for String {
    fn from_address(address: &str) -> Result<Self, GcodeError> {
        Ok(address.to_string())
    }
}

impl FromAddress for i64 {
    fn from_address(address: &str) -> Result<Self, GcodeError> {
        // Base 10 only, no leading '+'
        if address.starts_with('+') {
            return Err(GcodeError::ValueSyntax(address.to_string()));
        }
        address.parse::<i64>().map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                GcodeError::IntegerRange(address.to_string())
            }
            _ => GcodeError::ValueSyntax(address.to_string()),
        })
    }
}

impl FromAddress for i32 {
    fn from_address(address: &str) -> Result<Self, GcodeError> {
        let wide = i64::from_address(address)?;
        i32::try_from(wide).map_err(|_| GcodeError::IntegerRange(address.to_string()))
    }
}

impl FromAddress for f64 {
    fn from_address(address: &str) -> Result<Self, GcodeError> {
        address
            .parse::<f64>()
            .map_err(|_| GcodeError::ValueSyntax(address.to_string()))
    }
}

impl FromAddress for f32 {
    fn from_address(address: &str) -> Result<Self, GcodeError> {
        address
            .parse::<f32>()
            .map_err(|_| GcodeError::ValueSyntax(address.to_string()))
    }
}

/// A single G-code word: one uppercase letter plus its address
///
/// `G1` is word `G` with address `1`; `X10.5` is word `X` with address `10.5`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    word: char,
    address: String,
}

impl Token {
    /// Create a token, rejecting words outside `A`..=`Z`
    pub fn new(word: char, address: impl Into<String>) -> Result<Self, GcodeError> {
        validate_word(word)?;
        Ok(Self {
            word,
            address: address.into(),
        })
    }

    /// Parse `"<WORD><ADDRESS>"`
    pub fn parse(s: &str) -> Result<Self, GcodeError> {
        let mut chars = s.chars();
        let word = chars.next().ok_or(GcodeError::EmptyInput)?;
        Self::new(word, chars.as_str())
    }

    pub fn word(&self) -> char {
        self.word
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn has_address(&self) -> bool {
        !self.address.is_empty()
    }

    /// Convert the address to a scalar type
    pub fn address_as<T: FromAddress>(&self) -> Result<T, GcodeError> {
        T::from_address(&self.address)
    }

    /// Replace the address
    ///
    /// Floats on `E` are written with 5 decimals, every other word with 3;
    /// magnitudes below the last printed digit collapse to an exact zero.
    pub fn set_address(&mut self, value: impl Into<AddressValue>) {
        self.address = match value.into() {
            AddressValue::Text(s) => s.trim().to_string(),
            AddressValue::Int(i) => i.to_string(),
            AddressValue::Float(f) => format_float(self.word, f),
            AddressValue::Empty => String::new(),
        };
    }

    /// True when word and address equal the literal, e.g. `"M104"`
    pub fn is(&self, literal: &str) -> bool {
        let mut chars = literal.chars();
        chars.next() == Some(self.word) && chars.as_str() == self.address
    }
}

fn format_float(word: char, value: f64) -> String {
    if word == 'E' {
        if value.abs() < 0.00001 {
            "0.00000".to_string()
        } else {
            format!("{:.5}", value)
        }
    } else if value.abs() < 0.001 {
        "0.000".to_string()
    } else {
        format!("{:.3}", value)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.word, self.address)
    }
}

impl std::str::FromStr for Token {
    type Err = GcodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token() {
        let token = Token::parse("G1").unwrap();
        assert_eq!(token.word(), 'G');
        assert_eq!(token.address(), "1");
        assert_eq!(token.to_string(), "G1");

        let bare = Token::parse("T").unwrap();
        assert!(!bare.has_address());
    }

    #[test]
    fn test_parse_token_errors() {
        assert_eq!(Token::parse(""), Err(GcodeError::EmptyInput));
        assert_eq!(Token::parse("g1"), Err(GcodeError::InvalidWord('g')));
        assert_eq!(Token::parse("*12"), Err(GcodeError::InvalidWord('*')));
        assert!(Token::new('1', "0").is_err());
    }

    #[test]
    fn test_address_as() {
        let token = Token::parse("T3").unwrap();
        assert_eq!(token.address_as::<i32>(), Ok(3));
        assert_eq!(token.address_as::<String>(), Ok("3".to_string()));

        let float = Token::parse("X-12.5").unwrap();
        assert_eq!(float.address_as::<f64>(), Ok(-12.5));
        assert_eq!(
            float.address_as::<i32>(),
            Err(GcodeError::ValueSyntax("-12.5".to_string()))
        );
    }

    #[test]
    fn test_address_as_integer_range() {
        let token = Token::parse("T99999999999").unwrap();
        assert_eq!(
            token.address_as::<i32>(),
            Err(GcodeError::IntegerRange("99999999999".to_string()))
        );
        let huge = Token::parse("T99999999999999999999").unwrap();
        assert!(matches!(
            huge.address_as::<i64>(),
            Err(GcodeError::IntegerRange(_))
        ));
        let signed = Token::parse("T+1").unwrap();
        assert!(matches!(
            signed.address_as::<i64>(),
            Err(GcodeError::ValueSyntax(_))
        ));
    }

    #[test]
    fn test_set_address_float_formatting() {
        let mut e = Token::parse("E1").unwrap();
        e.set_address(0.000001);
        assert_eq!(e.address(), "0.00000");
        e.set_address(1.23456789);
        assert_eq!(e.address(), "1.23457");
        e.set_address(-0.000004);
        assert_eq!(e.address(), "0.00000");

        let mut x = Token::parse("X1").unwrap();
        x.set_address(0.0001);
        assert_eq!(x.address(), "0.000");
        x.set_address(12.3456);
        assert_eq!(x.address(), "12.346");
    }

    #[test]
    fn test_set_address_other_values() {
        let mut t = Token::parse("T5").unwrap();
        t.set_address(1);
        assert_eq!(t.to_string(), "T1");
        t.set_address("  7 ");
        assert_eq!(t.address(), "7");
        t.set_address(None::<i32>);
        assert_eq!(t.to_string(), "T");
    }

    #[test]
    fn test_is_literal() {
        let token = Token::parse("M104").unwrap();
        assert!(token.is("M104"));
        assert!(!token.is("M10"));
        assert!(!token.is("M1040"));
        assert!(!token.is(""));
    }
}
