//! # Validation Module
//!
//! Field validators run by the repositories before every INSERT/UPDATE.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (service layer, not in this workspace)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE, via Entity::validate() inside save/update       │
//! │  ├── required names, lengths                                           │
//! │  ├── CPF / CNPJ check digits                                           │
//! │  └── VIN chassis, plates, money, quantities                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite (NOT NULL, UNIQUE, FOREIGN KEY)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use crm_core::validation::{validate_document, validate_plate};
//!
//! assert!(validate_document("529.982.247-25").is_ok());
//! assert!(validate_plate("BRA2E19").is_ok());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field (names, labels, codes).
///
/// ## Rules
/// - Must not be blank
/// - At most `max` characters after trimming
pub fn validate_required(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates an optional free-text field: only the length is checked.
pub fn validate_optional(field: &str, value: Option<&str>, max: usize) -> ValidationResult<()> {
    match value {
        Some(v) if v.trim().chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        _ => Ok(()),
    }
}

/// Validates an optional e-mail address.
///
/// Only the shape is checked: one `@`, non-empty local part and a dotted
/// domain. Deliverability is not this layer's concern.
pub fn validate_email(value: Option<&str>) -> ValidationResult<()> {
    let Some(email) = value.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(l), Some(d), None) => (l, d),
        _ => return Err(ValidationError::invalid("email", "must contain exactly one '@'")),
    };

    if local.is_empty() || domain.len() < 3 || !domain.contains('.') {
        return Err(ValidationError::invalid("email", "malformed address"));
    }

    if domain.starts_with('.') || domain.ends_with('.') || email.contains(char::is_whitespace) {
        return Err(ValidationError::invalid("email", "malformed address"));
    }

    Ok(())
}

// =============================================================================
// Brazilian Documents
// =============================================================================

/// Strips punctuation from a CPF/CNPJ (`529.982.247-25` → `52998224725`).
pub fn normalize_document(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

/// Validates a CPF (11 digits) or CNPJ (14 digits), punctuation allowed.
///
/// ## Example
/// ```rust
/// use crm_core::validation::validate_document;
///
/// assert!(validate_document("11.222.333/0001-81").is_ok());
/// assert!(validate_document("111.111.111-11").is_err());
/// ```
pub fn validate_document(value: &str) -> ValidationResult<()> {
    let digits = normalize_document(value);

    match digits.len() {
        0 => Err(ValidationError::required("document")),
        11 => validate_cpf(&digits),
        14 => validate_cnpj(&digits),
        _ => Err(ValidationError::invalid(
            "document",
            "must have 11 (CPF) or 14 (CNPJ) digits",
        )),
    }
}

fn to_digits(value: &str) -> Vec<u32> {
    value.chars().filter_map(|c| c.to_digit(10)).collect()
}

fn all_same(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

/// Mod-11 check digit over `digits` with the given weights.
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    match sum % 11 {
        0 | 1 => 0,
        r => 11 - r,
    }
}

fn validate_cpf(digits: &str) -> ValidationResult<()> {
    let d = to_digits(digits);
    if all_same(&d) {
        return Err(ValidationError::invalid("document", "repeated digits"));
    }

    let w1: Vec<u32> = (2..=10).rev().collect();
    let w2: Vec<u32> = (2..=11).rev().collect();

    if check_digit(&d[..9], &w1) != d[9] || check_digit(&d[..10], &w2) != d[10] {
        return Err(ValidationError::invalid("document", "CPF check digit mismatch"));
    }

    Ok(())
}

fn validate_cnpj(digits: &str) -> ValidationResult<()> {
    let d = to_digits(digits);
    if all_same(&d) {
        return Err(ValidationError::invalid("document", "repeated digits"));
    }

    const W1: [u32; 12] = [5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];
    const W2: [u32; 13] = [6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2];

    if check_digit(&d[..12], &W1) != d[12] || check_digit(&d[..13], &W2) != d[13] {
        return Err(ValidationError::invalid("document", "CNPJ check digit mismatch"));
    }

    Ok(())
}

// =============================================================================
// Vehicle Identifiers
// =============================================================================

/// Validates a 17-character VIN chassis number (no I, O or Q).
pub fn validate_chassis(value: &str) -> ValidationResult<()> {
    let chassis = value.trim();

    if chassis.is_empty() {
        return Err(ValidationError::required("chassis"));
    }

    if chassis.len() != 17 {
        return Err(ValidationError::invalid("chassis", "must have 17 characters"));
    }

    let ok = chassis
        .chars()
        .all(|c| c.is_ascii_digit() || (c.is_ascii_uppercase() && !matches!(c, 'I' | 'O' | 'Q')));
    if !ok {
        return Err(ValidationError::invalid(
            "chassis",
            "only digits and uppercase letters except I, O, Q",
        ));
    }

    Ok(())
}

/// Validates an optional plate: legacy `ABC1234`/`ABC-1234` or Mercosul
/// `ABC1D23`.
pub fn validate_plate(value: &str) -> ValidationResult<()> {
    let plate: Vec<char> = value.trim().chars().filter(|c| *c != '-').collect();

    let shape_ok = plate.len() == 7
        && plate[..3].iter().all(char::is_ascii_uppercase)
        && plate[3].is_ascii_digit()
        && (plate[4].is_ascii_digit() || plate[4].is_ascii_uppercase())
        && plate[5..].iter().all(char::is_ascii_digit);

    if !shape_ok {
        return Err(ValidationError::invalid(
            "plate",
            "expected ABC1234 or Mercosul ABC1D23",
        ));
    }

    Ok(())
}

/// Validates a model/manufacture year.
pub fn validate_year(field: &str, year: i32) -> ValidationResult<()> {
    if !(1950..=2100).contains(&year) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1950,
            max: 2100,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a monetary amount in cents (zero allowed).
pub fn validate_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a proposal line quantity (1..=MAX_LINE_QUANTITY).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a referenced id (must be a generated key, i.e. positive).
pub fn validate_reference(field: &str, id: i64) -> ValidationResult<()> {
    if id <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a validity window: `from` must not be after `until`.
pub fn validate_window(from: NaiveDate, until: Option<NaiveDate>) -> ValidationResult<()> {
    match until {
        Some(until) if from > until => Err(ValidationError::InvalidRange {
            first: "valid_from".to_string(),
            second: "valid_until".to_string(),
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert!(validate_required("name", "Transportes Silva", 120).is_ok());
        assert_eq!(
            validate_required("name", "   ", 120),
            Err(ValidationError::required("name"))
        );
        assert!(validate_required("name", &"x".repeat(121), 120).is_err());
        assert!(validate_optional("notes", Some(&"x".repeat(10)), 5).is_err());
        assert!(validate_optional("notes", None, 5).is_ok());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email(None).is_ok());
        assert!(validate_email(Some("")).is_ok());
        assert!(validate_email(Some("ana@frota.com.br")).is_ok());
        assert!(validate_email(Some("ana.frota.com.br")).is_err());
        assert!(validate_email(Some("ana@@frota.com")).is_err());
        assert!(validate_email(Some("@frota.com")).is_err());
        assert!(validate_email(Some("ana@frota")).is_err());
        assert!(validate_email(Some("ana @frota.com")).is_err());
    }

    #[test]
    fn test_validate_cpf() {
        assert!(validate_document("529.982.247-25").is_ok());
        assert!(validate_document("52998224725").is_ok());
        assert!(validate_document("529.982.247-24").is_err());
        assert!(validate_document("111.111.111-11").is_err());
    }

    #[test]
    fn test_validate_cnpj() {
        assert!(validate_document("11.222.333/0001-81").is_ok());
        assert!(validate_document("11222333000181").is_ok());
        assert!(validate_document("11.222.333/0001-80").is_err());
        assert!(validate_document("00000000000000").is_err());
    }

    #[test]
    fn test_validate_document_length() {
        assert_eq!(validate_document(""), Err(ValidationError::required("document")));
        assert!(validate_document("12345").is_err());
        assert_eq!(normalize_document("11.222.333/0001-81"), "11222333000181");
    }

    #[test]
    fn test_validate_chassis() {
        assert!(validate_chassis("9BWZZZ377VT004251").is_ok());
        assert!(validate_chassis("9BWZZZ377VT00425").is_err());
        assert!(validate_chassis("9BWZZZ377VT00425O").is_err());
        assert!(validate_chassis("9bwzzz377vt004251").is_err());
        assert!(validate_chassis("").is_err());
    }

    #[test]
    fn test_validate_plate() {
        assert!(validate_plate("ABC1234").is_ok());
        assert!(validate_plate("ABC-1234").is_ok());
        assert!(validate_plate("BRA2E19").is_ok());
        assert!(validate_plate("AB12345").is_err());
        assert!(validate_plate("ABC12E4").is_err());
        assert!(validate_plate("abc1234").is_err());
    }

    #[test]
    fn test_numeric_validators() {
        assert!(validate_cents("price", 0).is_ok());
        assert!(validate_cents("price", -1).is_err());
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
        assert!(validate_reference("model_id", 0).is_err());
        assert!(validate_year("model_year", 2024).is_ok());
        assert!(validate_year("model_year", 1900).is_err());
    }

    #[test]
    fn test_validate_window() {
        let jan = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let dec = NaiveDate::from_ymd_opt(2026, 12, 31).unwrap();
        assert!(validate_window(jan, Some(dec)).is_ok());
        assert!(validate_window(jan, None).is_ok());
        assert!(validate_window(dec, Some(jan)).is_err());
    }
}
