//! Content API key generation and verification.
//!
//! A key reads `nk_` followed by 64 lowercase hex characters. Only a bcrypt
//! hash is stored, next to a short display prefix used to narrow lookups.

use crate::{db::api_keys::ApiKey, timestamp::Timestamp};
use bcrypt::BcryptResult;
use uuid::Uuid;

pub const KEY_PREFIX: &str = "nk_";
const SECRET_HEX_LEN: usize = 64;
const DISPLAY_HEX_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct GeneratedKey {
    /// The full key. Shown to the caller once and never stored.
    pub secret: String,
    pub prefix: String,
}

pub fn generate() -> GeneratedKey {
    let secret = format!(
        "{}{}{}",
        KEY_PREFIX,
        Uuid::new_v4().to_simple(),
        Uuid::new_v4().to_simple()
    );
    let prefix = secret[..KEY_PREFIX.len() + DISPLAY_HEX_LEN].to_string();
    GeneratedKey { secret, prefix }
}

/// The display prefix of a well-formed key, or `None` for anything that
/// cannot be a key.
pub fn display_prefix(raw: &str) -> Option<String> {
    let hex = raw.strip_prefix(KEY_PREFIX)?;
    if hex.len() != SECRET_HEX_LEN
        || !hex.chars().all(|c| c.is_ascii_hexdigit())
    {
        return None;
    }
    Some(format!("{}{}", KEY_PREFIX, &hex[..DISPLAY_HEX_LEN]))
}

pub fn hash(secret: &str, cost: u32) -> BcryptResult<String> {
    bcrypt::hash(secret, cost)
}

pub fn verify(secret: &str, key: &ApiKey) -> BcryptResult<bool> {
    bcrypt::verify(secret, &key.key_hash)
}

pub fn is_usable(key: &ApiKey, now: Timestamp) -> bool {
    !key.revoked && key.expires_at.map_or(true, |expiry| expiry > now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_with(secret: &str, revoked: bool, expires_at: Option<Timestamp>) -> ApiKey {
        ApiKey {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "ci".into(),
            prefix: display_prefix(secret).unwrap(),
            key_hash: hash(secret, 4).unwrap(),
            revoked,
            expires_at,
            last_used_at: None,
            created_at: Timestamp::from_secs(0),
        }
    }

    #[test]
    fn generated_keys_are_well_formed() {
        let key = generate();
        assert_eq!(key.secret.len(), KEY_PREFIX.len() + SECRET_HEX_LEN);
        assert!(key.secret.starts_with(&key.prefix));
        assert_eq!(display_prefix(&key.secret), Some(key.prefix.clone()));
        assert_ne!(generate().secret, key.secret);
    }

    #[test]
    fn malformed_keys_have_no_prefix() {
        assert_eq!(display_prefix("nk_abc"), None);
        assert_eq!(display_prefix(&format!("xx_{}", "a".repeat(64))), None);
        assert_eq!(display_prefix(&format!("nk_{}", "g".repeat(64))), None);
        assert_eq!(
            display_prefix(&format!("nk_{}", "ab".repeat(32))),
            Some("nk_abababab".to_string())
        );
    }

    #[test]
    fn verify_matches_only_the_generated_secret() {
        let generated = generate();
        let key = key_with(&generated.secret, false, None);
        assert!(verify(&generated.secret, &key).unwrap());
        assert!(!verify(&generate().secret, &key).unwrap());
    }

    #[test]
    fn revoked_and_expired_keys_are_unusable() {
        let secret = generate().secret;
        let now = Timestamp::from_secs(1_000);
        assert!(is_usable(&key_with(&secret, false, None), now));
        assert!(is_usable(
            &key_with(&secret, false, Some(Timestamp::from_secs(2_000))),
            now
        ));
        assert!(!is_usable(
            &key_with(&secret, false, Some(Timestamp::from_secs(500))),
            now
        ));
        assert!(!is_usable(&key_with(&secret, true, None), now));
    }
}
