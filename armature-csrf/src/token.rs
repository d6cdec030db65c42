use crate::compare::timing_safe_eq;
use crate::error::{CsrfError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use sha1::{Digest, Sha1};

/// Default salt length in characters.
pub const DEFAULT_SALT_LENGTH: usize = 8;

/// Default secret length in bytes.
pub const DEFAULT_SECRET_LENGTH: usize = 18;

/// Creates secrets and `<salt>-<digest>` tokens, and verifies tokens against secrets.
///
/// Only the secret needs server-side storage; the salt travels inside the
/// token and is re-derived on verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsrfTokens {
    salt_length: usize,
    secret_length: usize,
}

impl CsrfTokens {
    /// Create a token codec.
    ///
    /// Both lengths must be at least 1.
    pub fn new(salt_length: usize, secret_length: usize) -> Result<Self> {
        if salt_length < 1 {
            return Err(CsrfError::InvalidOption(
                "salt_length must be a number >= 1".to_string(),
            ));
        }

        if secret_length < 1 {
            return Err(CsrfError::InvalidOption(
                "secret_length must be a number >= 1".to_string(),
            ));
        }

        Ok(Self {
            salt_length,
            secret_length,
        })
    }

    /// Salt length in characters
    pub fn salt_length(&self) -> usize {
        self.salt_length
    }

    /// Secret length in bytes
    pub fn secret_length(&self) -> usize {
        self.secret_length
    }

    /// Create a new URL-safe secret.
    pub fn create_secret(&self) -> String {
        random_secret(self.secret_length)
    }

    /// Create a new URL-safe secret without blocking the async executor.
    pub async fn create_secret_async(&self) -> Result<String> {
        let length = self.secret_length;
        tokio::task::spawn_blocking(move || random_secret(length))
            .await
            .map_err(|e| CsrfError::Internal(format!("secret generation task failed: {}", e)))
    }

    /// Create a new token bound to `secret`.
    pub fn create(&self, secret: &str) -> Result<String> {
        if secret.is_empty() {
            return Err(CsrfError::MissingSecret);
        }

        Ok(Self::tokenize(secret, &random_salt(self.salt_length)))
    }

    /// Check whether `token` was created from `secret`.
    ///
    /// Never fails: empty input or a token without a `-` separator is simply
    /// not valid.
    pub fn verify(&self, secret: &str, token: &str) -> bool {
        if secret.is_empty() || token.is_empty() {
            return false;
        }

        let Some((salt, _)) = token.split_once('-') else {
            return false;
        };

        let expected = Self::tokenize(secret, salt);
        timing_safe_eq(token, &expected)
    }

    fn tokenize(secret: &str, salt: &str) -> String {
        format!("{}-{}", salt, Self::hash(&format!("{}-{}", salt, secret)))
    }

    /// SHA-1, rendered as URL-safe base64 without padding
    fn hash(input: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha1::digest(input.as_bytes()))
    }
}

impl Default for CsrfTokens {
    fn default() -> Self {
        Self {
            salt_length: DEFAULT_SALT_LENGTH,
            secret_length: DEFAULT_SECRET_LENGTH,
        }
    }
}

fn random_secret(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn random_salt(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_invalid_lengths() {
        assert!(matches!(
            CsrfTokens::new(0, 18),
            Err(CsrfError::InvalidOption(_))
        ));
        assert!(matches!(
            CsrfTokens::new(8, 0),
            Err(CsrfError::InvalidOption(_))
        ));
        assert!(CsrfTokens::new(1, 1).is_ok());
    }

    #[test]
    fn test_defaults() {
        let tokens = CsrfTokens::default();
        assert_eq!(tokens.salt_length(), 8);
        assert_eq!(tokens.secret_length(), 18);
    }

    #[test]
    fn test_secret_generation() {
        let tokens = CsrfTokens::default();
        let secret = tokens.create_secret();

        // 18 bytes encode to 24 base64 characters
        assert_eq!(secret.len(), 24);
        assert_eq!(URL_SAFE_NO_PAD.decode(&secret).unwrap().len(), 18);
        assert_ne!(secret, tokens.create_secret());
    }

    #[tokio::test]
    async fn test_secret_generation_async() {
        let tokens = CsrfTokens::new(8, 32).unwrap();
        let secret = tokens.create_secret_async().await.unwrap();

        assert_eq!(URL_SAFE_NO_PAD.decode(&secret).unwrap().len(), 32);
    }

    #[test]
    fn test_tokenize_known_value() {
        assert_eq!(
            CsrfTokens::tokenize("secretvalue", "abcdefgh"),
            "abcdefgh-pqPnUKQTZoPlkLVfq1e8R-hrUd0"
        );
    }

    #[test]
    fn test_token_shape() {
        let tokens = CsrfTokens::new(12, 18).unwrap();
        let token = tokens.create("secret").unwrap();
        let (salt, digest) = token.split_once('-').unwrap();

        assert_eq!(salt.len(), 12);
        assert!(salt.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(!digest.contains(['+', '/', '=']));
    }

    #[test]
    fn test_create_requires_secret() {
        let tokens = CsrfTokens::default();
        assert!(matches!(tokens.create(""), Err(CsrfError::MissingSecret)));
    }

    #[test]
    fn test_round_trip() {
        let tokens = CsrfTokens::default();
        let secret = tokens.create_secret();

        for _ in 0..100 {
            let token = tokens.create(&secret).unwrap();
            assert!(tokens.verify(&secret, &token));
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens = CsrfTokens::default();
        let secret = tokens.create_secret();

        let created: HashSet<String> = (0..1000)
            .map(|_| tokens.create(&secret).unwrap())
            .collect();
        assert_eq!(created.len(), 1000);
    }

    #[test]
    fn test_tampered_digest_rejected() {
        let tokens = CsrfTokens::default();
        let secret = tokens.create_secret();
        let token = tokens.create(&secret).unwrap();
        let digest_start = token.find('-').unwrap() + 1;

        for i in digest_start..token.len() {
            let mut chars: Vec<char> = token.chars().collect();
            chars[i] = if chars[i] == 'A' { 'B' } else { 'A' };
            let tampered: String = chars.into_iter().collect();

            assert!(!tokens.verify(&secret, &tampered), "flip at {i} accepted");
        }
    }

    #[test]
    fn test_cross_secret_rejected() {
        let tokens = CsrfTokens::default();
        let first = tokens.create_secret();
        let second = tokens.create_secret();

        let token = tokens.create(&second).unwrap();
        assert!(!tokens.verify(&first, &token));
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let tokens = CsrfTokens::default();
        let secret = tokens.create_secret();
        let token = tokens.create(&secret).unwrap();

        assert!(!tokens.verify("", &token));
        assert!(!tokens.verify(&secret, ""));
        assert!(!tokens.verify(&secret, "noseparator"));
        assert!(!tokens.verify(&secret, "-"));
    }
}
