//! Invitation code generation and local format checks.
//!
//! Codes are a usability shortcut for client self-registration, not a
//! cryptographic secret: they are single-use and expire after a few days,
//! so a thread-local PRNG is sufficient.

use rand::Rng;

/// Number of characters in every invitation code.
pub const INVITE_CODE_LENGTH: usize = 12;

/// Symbols allowed in invitation codes in addition to letters and digits.
pub const INVITE_CODE_SYMBOLS: &str = "!@#$%^&*-_=+";

const INVITE_CODE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*-_=+";

/// Generate a random invitation code.
///
/// The result always satisfies [`is_valid_invite_code_format`]. Draws that
/// happen to lack a letter or a digit-or-symbol are discarded and redrawn.
pub fn generate_invite_code() -> String {
    let mut rng = rand::thread_rng();

    loop {
        let code: String = (0..INVITE_CODE_LENGTH)
            .map(|_| {
                let idx = rng.gen_range(0..INVITE_CODE_ALPHABET.len());
                INVITE_CODE_ALPHABET[idx] as char
            })
            .collect();

        if is_valid_invite_code_format(&code) {
            return code;
        }
    }
}

/// Check whether `code` has the shape of an invitation code.
///
/// True only when the code is exactly [`INVITE_CODE_LENGTH`] characters from
/// the code alphabet, with at least one letter and at least one digit or
/// symbol. Performs no storage lookup.
pub fn is_valid_invite_code_format(code: &str) -> bool {
    if code.chars().count() != INVITE_CODE_LENGTH {
        return false;
    }

    let mut has_letter = false;
    let mut has_digit_or_symbol = false;

    for c in code.chars() {
        if c.is_ascii_alphabetic() {
            has_letter = true;
        } else if c.is_ascii_digit() || INVITE_CODE_SYMBOLS.contains(c) {
            has_digit_or_symbol = true;
        } else {
            return false;
        }
    }

    has_letter && has_digit_or_symbol
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_codes_have_valid_format() {
        for _ in 0..1000 {
            let code = generate_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LENGTH);
            assert!(is_valid_invite_code_format(&code), "rejected: {}", code);
        }
    }

    #[test]
    fn test_generated_codes_stay_in_alphabet() {
        for _ in 0..200 {
            let code = generate_invite_code();
            assert!(code.bytes().all(|b| INVITE_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_generated_codes_are_mostly_unique() {
        let codes: HashSet<String> = (0..500).map(|_| generate_invite_code()).collect();
        assert!(codes.len() >= 499);
    }

    #[test]
    fn test_format_accepts_letters_with_digits() {
        assert!(is_valid_invite_code_format("abcdEFGH1234"));
        assert!(is_valid_invite_code_format("A00000000000"));
    }

    #[test]
    fn test_format_accepts_letters_with_symbols() {
        assert!(is_valid_invite_code_format("abcdefghijk!"));
        assert!(is_valid_invite_code_format("X-_=+!@#$%^&"));
    }

    #[test]
    fn test_format_rejects_wrong_length() {
        assert!(!is_valid_invite_code_format(""));
        assert!(!is_valid_invite_code_format("abc123"));
        assert!(!is_valid_invite_code_format("abcdEFGH12345"));
        assert!(!is_valid_invite_code_format("abcdEFGH123"));
    }

    #[test]
    fn test_format_rejects_letters_only() {
        assert!(!is_valid_invite_code_format("abcdefghijkl"));
    }

    #[test]
    fn test_format_rejects_no_letters() {
        assert!(!is_valid_invite_code_format("123456789012"));
        assert!(!is_valid_invite_code_format("!@#$%^&*-_=+"));
    }

    #[test]
    fn test_format_rejects_characters_outside_alphabet() {
        assert!(!is_valid_invite_code_format("abcd efgh123"));
        assert!(!is_valid_invite_code_format("abcdéfgh1234"));
        assert!(!is_valid_invite_code_format("abcd(efgh)12"));
    }
}
