//! Input validation - Local checks performed before any network call
//!
//! Every captured field has a newtype that can only be built through its
//! `parse` function, so a value that reaches the network adapter is known to
//! be well formed.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const PHONE_MIN_DIGITS: usize = 8;
const PHONE_MAX_DIGITS: usize = 15;
const CUIL_DIGITS: usize = 11;
const MAX_NAME_CHARS: usize = 80;
const MAX_PLATFORM_CHARS: usize = 64;

lazy_static! {
    // Optional leading '+', then digits and separators only.
    static ref PHONE_PATTERN: Regex = Regex::new(r"^\+?[0-9 ().\-]+$").expect("phone pattern");
    // Dot-grouped thousands without decimals: 1.500, 12.000.000
    static ref THOUSANDS_PATTERN: Regex =
        Regex::new(r"^\d{1,3}(\.\d{3})+$").expect("thousands pattern");
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("amount must be greater than zero")]
    NonPositiveAmount,

    #[error("invalid CUIL: {0}")]
    InvalidCuil(String),

    #[error("name must not be empty")]
    EmptyName,

    #[error("name is too long")]
    NameTooLong,

    #[error("platform must not be empty")]
    EmptyPlatform,

    #[error("unknown platform {input}, expected one of {allowed:?}")]
    UnknownPlatform { input: String, allowed: Vec<String> },
}

/// Phone identifier, normalized to an optional `+` followed by digits.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Accepts 8 to 15 digits with an optional leading `+` and optional
    /// separators (space, `-`, `.`, parentheses).
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if !PHONE_PATTERN.is_match(trimmed) {
            return Err(ValidationError::InvalidPhone(trimmed.to_string()));
        }
        let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
        if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len()) {
            return Err(ValidationError::InvalidPhone(trimmed.to_string()));
        }
        let mut normalized = String::with_capacity(digits.len() + 1);
        if trimmed.starts_with('+') {
            normalized.push('+');
        }
        normalized.push_str(&digits);
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strictly positive withdrawal amount.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(transparent)]
pub struct Amount(f64);

impl Amount {
    /// Accepts `500`, `500.50`, `1.500`, `$ 1.500,75`. When a comma is
    /// present it is the decimal separator and dots are thousands separators.
    /// Without a comma, dots in groups of three digits are thousands.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim().trim_start_matches('$').trim();
        let normalized = if trimmed.contains(',') {
            trimmed.replace('.', "").replace(',', ".")
        } else if THOUSANDS_PATTERN.is_match(trimmed) {
            trimmed.replace('.', "")
        } else {
            trimmed.to_string()
        };
        let value: f64 = normalized
            .parse()
            .map_err(|_| ValidationError::InvalidAmount(input.trim().to_string()))?;
        if !value.is_finite() {
            return Err(ValidationError::InvalidAmount(input.trim().to_string()));
        }
        if value <= 0.0 {
            return Err(ValidationError::NonPositiveAmount);
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{:.0}", self.0)
        } else {
            write!(f, "{:.2}", self.0)
        }
    }
}

/// Argentine tax id: 11 digits, stored without separators.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct Cuil(String);

impl Cuil {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let digits: String = trimmed
            .chars()
            .filter(|c| !matches!(c, '-' | ' ' | '.'))
            .collect();
        if digits.len() != CUIL_DIGITS || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidCuil(trimmed.to_string()));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Registration name, whitespace collapsed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct FullName(String);

impl FullName {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if collapsed.chars().count() > MAX_NAME_CHARS {
            return Err(ValidationError::NameTooLong);
        }
        Ok(Self(collapsed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Gaming platform name.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    /// When `allowed` is empty any non-empty name is accepted; otherwise the
    /// input must match one entry case-insensitively and the configured
    /// spelling is kept.
    pub fn parse(input: &str, allowed: &[String]) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyPlatform);
        }
        if allowed.is_empty() {
            let name: String = trimmed.chars().take(MAX_PLATFORM_CHARS).collect();
            return Ok(Self(name));
        }
        allowed
            .iter()
            .find(|p| p.eq_ignore_ascii_case(trimmed))
            .map(|p| Self(p.clone()))
            .ok_or_else(|| ValidationError::UnknownPlatform {
                input: trimmed.to_string(),
                allowed: allowed.to_vec(),
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
