//! Field checks applied to the personal information captured before the survey starts.
//!
//! Each check is a pure function over raw user input. The error's `Display` output is the
//! reason shown next to the offending field.

use std::sync::OnceLock;

use regex::Regex;

pub const MIN_AGE: i32 = 15;
pub const MAX_AGE: i32 = 80;
const PHONE_DIGITS: usize = 10;

/// Reason a personal field was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldViolation {
    #[error("El nombre es obligatorio")]
    NameRequired,
    #[error("El nombre debe contener al menos dos palabras (nombre y apellido)")]
    NameNeedsTwoWords,
    #[error("Cada palabra del nombre debe tener al menos 2 caracteres")]
    NameWordTooShort,
    #[error("El nombre solo puede contener letras y espacios")]
    NameLettersOnly,
    #[error("El teléfono es obligatorio")]
    PhoneRequired,
    #[error("El teléfono debe tener exactamente 10 dígitos (se encontraron {found})")]
    PhoneDigitCount { found: usize },
    #[error("El email es obligatorio")]
    EmailRequired,
    #[error("El email debe tener un formato válido (ejemplo: usuario@dominio.com)")]
    EmailFormat,
    #[error("La edad debe estar entre 15 y 80 años (se recibió {age})")]
    AgeOutOfRange { age: i32 },
    #[error("Debes aceptar la política de privacidad y el descargo de responsabilidad")]
    TermsNotAccepted,
}

fn name_word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-ZáéíóúÁÉÍÓÚüÜñÑ]+$").expect("name pattern compiles")
    })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern compiles")
    })
}

/// Full name: at least two words, each two or more letters long.
pub fn validate_name(raw: &str) -> Result<(), FieldViolation> {
    let words: Vec<&str> = raw.split_whitespace().collect();
    if words.is_empty() {
        return Err(FieldViolation::NameRequired);
    }
    if words.len() < 2 {
        return Err(FieldViolation::NameNeedsTwoWords);
    }

    for word in words {
        if word.chars().count() < 2 {
            return Err(FieldViolation::NameWordTooShort);
        }
        if !name_word_pattern().is_match(word) {
            return Err(FieldViolation::NameLettersOnly);
        }
    }

    Ok(())
}

/// Phone: exactly ten digits once punctuation and spaces are stripped.
pub fn validate_phone(raw: &str) -> Result<(), FieldViolation> {
    if raw.trim().is_empty() {
        return Err(FieldViolation::PhoneRequired);
    }

    let found = phone_digits(raw).len();
    if found != PHONE_DIGITS {
        return Err(FieldViolation::PhoneDigitCount { found });
    }

    Ok(())
}

pub fn validate_email(raw: &str) -> Result<(), FieldViolation> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(FieldViolation::EmailRequired);
    }
    if !email_pattern().is_match(trimmed) {
        return Err(FieldViolation::EmailFormat);
    }

    Ok(())
}

pub fn validate_age(age: i32) -> Result<(), FieldViolation> {
    if (MIN_AGE..=MAX_AGE).contains(&age) {
        Ok(())
    } else {
        Err(FieldViolation::AgeOutOfRange { age })
    }
}

/// Digit-only projection of a phone number.
pub fn phone_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}
