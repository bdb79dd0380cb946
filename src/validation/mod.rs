use serde_json::Value;
use std::fmt;

pub const IDENTIFIER_MAX_LEN: usize = 128;
pub const PHONE_MIN_DIGITS: usize = 9;
pub const PHONE_MAX_DIGITS: usize = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Sanitized, required identifier such as a creator handle.
pub fn validate_identifier(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let value = sanitize_string(value);
    validate_required(field, &value)?;
    validate_max_len(field, &value, IDENTIFIER_MAX_LEN)?;
    Ok(value)
}

/// Largest single payment accepted, in whole currency units.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Amounts are whole currency units. Accepts a JSON number that is integral,
/// greater than zero and at most `MAX_AMOUNT`; `5000.0` is accepted as 5000.
pub fn validate_amount(value: &Value) -> Result<i64, ValidationError> {
    let number = match value {
        Value::Number(number) => number,
        Value::Null => return Err(ValidationError::new("amount", "is required")),
        _ => return Err(ValidationError::new("amount", "must be a number")),
    };

    let amount = if let Some(whole) = number.as_i64() {
        whole
    } else if let Some(float) = number.as_f64() {
        if float.fract() != 0.0 || !float.is_finite() || float.abs() > i64::MAX as f64 {
            return Err(ValidationError::new("amount", "must be a whole number"));
        }
        float as i64
    } else {
        return Err(ValidationError::new("amount", "is out of range"));
    };

    if amount <= 0 {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::new(
            "amount",
            format!("must be at most {}", MAX_AMOUNT),
        ));
    }

    Ok(amount)
}

/// Strips separators and checks for an E.164-like number: an optional
/// leading `+` followed by 9 to 15 digits. Returns the compact form.
pub fn normalize_phone(value: &str) -> Result<String, ValidationError> {
    let compact: String = value
        .chars()
        .filter(|ch| !ch.is_control() && !ch.is_whitespace() && !matches!(ch, '-' | '(' | ')' | '.'))
        .collect();
    validate_required("phone", &compact)?;

    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            "phone",
            "must contain only digits and an optional leading '+'",
        ));
    }

    if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len()) {
        return Err(ValidationError::new(
            "phone",
            format!(
                "must have between {} and {} digits",
                PHONE_MIN_DIGITS, PHONE_MAX_DIGITS
            ),
        ));
    }

    Ok(compact)
}
