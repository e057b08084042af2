// File: docshield-core/src/validators.rs
//! Programmatic validation for identifier-shaped matches.
//!
//! A rule with a `validator` only keeps regex hits that also pass the
//! structural check here, which cuts false positives on look-alike numbers.
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashSet;

use once_cell::sync::Lazy;

use crate::config::ValidatorKind;

impl ValidatorKind {
    /// Runs the structural check for this kind against a matched string.
    pub fn accepts(&self, text: &str) -> bool {
        match self {
            ValidatorKind::Ssn => is_valid_ssn(text),
            ValidatorKind::CreditCard => is_valid_credit_card(text),
            ValidatorKind::UkNino => is_valid_uk_nino(text),
        }
    }
}

/// US SSN check: `AAA-GG-SSSS` or nine bare digits.
///
/// Area 000, 666 and 900-999, group 00 and serial 0000 are never issued.
pub fn is_valid_ssn(ssn: &str) -> bool {
    let digits: String = match ssn.split('-').collect::<Vec<_>>().as_slice() {
        [area, group, serial] if area.len() == 3 && group.len() == 2 && serial.len() == 4 => {
            format!("{}{}{}", area, group, serial)
        }
        [bare] if bare.len() == 9 => bare.to_string(),
        _ => return false,
    };
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let (Ok(area), Ok(group), Ok(serial)) = (
        digits[0..3].parse::<u16>(),
        digits[3..5].parse::<u8>(),
        digits[5..9].parse::<u16>(),
    ) else {
        return false;
    };

    area != 0 && area != 666 && area < 900 && group != 0 && serial != 0
}

static INVALID_NINO_PREFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["BG", "GB", "KN", "NK", "NT", "TN", "ZZ"].into_iter().collect()
});

/// UK National Insurance number check: two prefix letters, six digits, suffix A-D.
pub fn is_valid_uk_nino(nino: &str) -> bool {
    let compact: String = nino
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let chars: Vec<char> = compact.chars().collect();
    if chars.len() != 9 {
        return false;
    }

    let (first, second) = (chars[0], chars[1]);
    if !first.is_ascii_alphabetic() || !second.is_ascii_alphabetic() {
        return false;
    }
    if "DFIQUV".contains(first) || "DFIQUVO".contains(second) {
        return false;
    }
    if INVALID_NINO_PREFIXES.contains(&compact[0..2]) {
        return false;
    }

    chars[2..8].iter().all(|c| c.is_ascii_digit()) && matches!(chars[8], 'A'..='D')
}

/// Mod-10 (Luhn) checksum over a string of ASCII digits.
pub fn is_valid_luhn(digits: &str) -> bool {
    let mut sum = 0;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut d) = c.to_digit(10) else { return false };
        if i % 2 == 1 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    sum % 10 == 0
}

/// Card numbers: 12-19 digits once separators are stripped, Luhn-valid.
pub fn is_valid_credit_card(text: &str) -> bool {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    (12..=19).contains(&digits.len()) && is_valid_luhn(&digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssn_rules() {
        assert!(is_valid_ssn("123-45-6789"));
        assert!(is_valid_ssn("123456789"));
        assert!(!is_valid_ssn("000-45-6789"));
        assert!(!is_valid_ssn("666-45-6789"));
        assert!(!is_valid_ssn("912-45-6789"));
        assert!(!is_valid_ssn("123-00-6789"));
        assert!(!is_valid_ssn("123-45-0000"));
        assert!(!is_valid_ssn("12-345-6789"));
        assert!(!is_valid_ssn("12a-45-6789"));
    }

    #[test]
    fn nino_rules() {
        assert!(is_valid_uk_nino("AB123456C"));
        assert!(is_valid_uk_nino("ab 12 34 56 c"));
        assert!(!is_valid_uk_nino("GB123456A"));
        assert!(!is_valid_uk_nino("DA123456A"));
        assert!(!is_valid_uk_nino("AO123456A"));
        assert!(!is_valid_uk_nino("AB123456E"));
        assert!(!is_valid_uk_nino("AB12345C"));
    }

    #[test]
    fn luhn_and_cards() {
        assert!(is_valid_luhn("79927398713"));
        assert!(!is_valid_luhn("79927398710"));
        assert!(is_valid_credit_card("4111 1111 1111 1111"));
        assert!(!is_valid_credit_card("4111 1111 1111 1112"));
        assert!(!is_valid_credit_card("0"));
    }

    #[test]
    fn kind_dispatch() {
        assert!(ValidatorKind::Ssn.accepts("123-45-6789"));
        assert!(!ValidatorKind::CreditCard.accepts("123-45-6789"));
    }
}
