//! Mocked booking details and the card form
//!
//! Nothing here talks to a payment processor. The form is masked as the user
//! types and validated before the mocked settlement is scheduled.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const PLACEHOLDER_DATE_TIME: &str = "Tomorrow at 7:00 PM";
pub const PLACEHOLDER_PRICE: &str = "$25.00";

const CARD_DIGITS: usize = 16;
const EXPIRY_DIGITS: usize = 4;
const MAX_CVV_DIGITS: usize = 4;
const MIN_CVV_DIGITS: usize = 3;

/// Session slot offered once a circle has been found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub date_time: String,
    pub price: String,
}

impl Booking {
    pub fn placeholder() -> Self {
        Self {
            date_time: PLACEHOLDER_DATE_TIME.to_string(),
            price: PLACEHOLDER_PRICE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CardFormError {
    #[error("Cardholder name is required")]
    MissingName,
    #[error("Card number must have 16 digits")]
    CardNumberTooShort,
    #[error("Expiry must be MM/YY")]
    InvalidExpiry,
    #[error("CVV must have at least 3 digits")]
    CvvTooShort,
}

/// Payment details as entered, after masking
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardForm {
    pub name: String,
    pub number: String,
    pub expiry: String,
    pub cvv: String,
}

impl CardForm {
    /// Build a form from raw input, applying the input masks
    pub fn new(name: &str, number: &str, expiry: &str, cvv: &str) -> Self {
        Self {
            name: name.trim().to_string(),
            number: format_card_number(number),
            expiry: format_expiry(expiry),
            cvv: format_cvv(cvv),
        }
    }

    /// Check the fields in display order, reporting the first failure
    pub fn validate(&self) -> Result<(), CardFormError> {
        if self.name.trim().is_empty() {
            return Err(CardFormError::MissingName);
        }
        if count_digits(&self.number) < CARD_DIGITS {
            return Err(CardFormError::CardNumberTooShort);
        }
        if self.expiry.chars().count() != 5 {
            return Err(CardFormError::InvalidExpiry);
        }
        if count_digits(&self.cvv) < MIN_CVV_DIGITS {
            return Err(CardFormError::CvvTooShort);
        }
        Ok(())
    }

    /// Last four digits of the card number, for the confirmation screen
    pub fn last4(&self) -> String {
        let digits: Vec<char> = self.number.chars().filter(char::is_ascii_digit).collect();
        digits.iter().skip(digits.len().saturating_sub(4)).collect()
    }
}

fn count_digits(s: &str) -> usize {
    s.chars().filter(char::is_ascii_digit).count()
}

fn digits(raw: &str, max: usize) -> Vec<char> {
    raw.chars().filter(char::is_ascii_digit).take(max).collect()
}

/// Digits only, at most 16, grouped in fours
pub fn format_card_number(raw: &str) -> String {
    digits(raw, CARD_DIGITS)
        .chunks(4)
        .map(|group| group.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Digits only, at most 4, rendered as `MM/YY` once the month is complete
pub fn format_expiry(raw: &str) -> String {
    let digits = digits(raw, EXPIRY_DIGITS);
    let mut out = String::with_capacity(5);
    for (i, d) in digits.iter().enumerate() {
        if i == 2 {
            out.push('/');
        }
        out.push(*d);
    }
    out
}

/// Digits only, at most 4
pub fn format_cvv(raw: &str) -> String {
    digits(raw, MAX_CVV_DIGITS).into_iter().collect()
}
