//! Share token generation

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of a share token in characters
pub const SHARE_TOKEN_LEN: usize = 12;

/// Generate a random alphanumeric share token.
///
/// Uniqueness is enforced by the songs table constraint; callers
/// collision-check before insert and mint again on a clash.
pub fn generate_share_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SHARE_TOKEN_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_length_and_charset() {
        let token = generate_share_token();
        assert_eq!(token.len(), SHARE_TOKEN_LEN);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_tokens_are_not_constant() {
        let a = generate_share_token();
        let b = generate_share_token();
        // Astronomically unlikely to collide in two draws
        assert_ne!(a, b);
    }
}
