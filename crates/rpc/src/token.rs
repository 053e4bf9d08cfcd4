//! Auth token generation and validation.

use rand::Rng;

/// Token length in bytes (produces 32 hex characters).
const TOKEN_BYTES: usize = 16;

const BEARER_PREFIX: &str = "Bearer ";

/// Generates a CSPRNG token as a 32-character lowercase hex string.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Validates a received token against the expected value.
///
/// Uses constant-time comparison to prevent timing attacks.
pub fn validate_token(received: &str, expected: &str) -> bool {
    if received.len() != expected.len() {
        return false;
    }
    let mut diff = 0u8;
    for (a, b) in received.bytes().zip(expected.bytes()) {
        diff |= a ^ b;
    }
    diff == 0
}

/// Formats an `Authorization` header value.
pub(crate) fn bearer(token: &str) -> String {
    format!("{BEARER_PREFIX}{token}")
}

/// Checks an `Authorization` header value. An empty `expected` token
/// disables authentication.
pub(crate) fn authorize(header: Option<&str>, expected: &str) -> bool {
    if expected.is_empty() {
        return true;
    }
    header
        .and_then(|h| h.strip_prefix(BEARER_PREFIX))
        .is_some_and(|received| validate_token(received, expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_token_length() {
        let token = generate_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn validate_matching_and_mismatched() {
        let a = generate_token();
        let b = generate_token();
        assert!(validate_token(&a, &a));
        assert!(!validate_token(&a, &b));
        assert!(!validate_token("short", "this_is_longer"));
    }

    #[test]
    fn authorize_bearer_header() {
        let token = generate_token();
        assert!(authorize(Some(&bearer(&token)), &token));
        assert!(!authorize(Some(&token), &token));
        assert!(!authorize(Some("Bearer wrong"), &token));
        assert!(!authorize(None, &token));
    }

    #[test]
    fn empty_expected_disables_auth() {
        assert!(authorize(None, ""));
        assert!(authorize(Some("Bearer anything"), ""));
    }
}
