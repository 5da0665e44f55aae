//! Opaque session tokens and linking codes.
//!
//! Session tokens are 32 random bytes, base64url-encoded. Only their
//! SHA-256 hash is stored. Linking codes are shorter, human-typeable
//! strings that are stored as-is and looked up by value.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use belay_core::models::linking_code::LinkKind;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Unambiguous uppercase alphabet (no `0/O`, `1/I/L`).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Generate a cryptographically random opaque session token
/// (32 bytes, base64url-encoded, no padding).
pub fn generate_session_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// SHA-256 hash of a raw session token, hex-encoded.
///
/// This is the value stored in the database as `session.token_hash`.
pub fn hash_session_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a linking code such as `RES-7KQ2-MX9A-PT3W`.
///
/// The prefix names the kind so support staff can tell codes apart;
/// it carries no authority; the stored record does.
pub fn generate_linking_code(kind: LinkKind, length: usize) -> String {
    let prefix = match kind {
        LinkKind::Resident => "RES",
        LinkKind::BuildingManager => "BLD",
    };

    let mut rng = rand::rng();
    let mut code = String::from(prefix);
    for i in 0..length {
        if i % 4 == 0 {
            code.push('-');
        }
        let idx = rng.random_range(0..CODE_ALPHABET.len());
        code.push(CODE_ALPHABET[idx] as char);
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_is_url_safe() {
        let token = generate_session_token();
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        // 32 bytes → 43 base64url chars.
        assert_eq!(token.len(), 43);
    }

    #[test]
    fn session_tokens_are_unique() {
        assert_ne!(generate_session_token(), generate_session_token());
    }

    #[test]
    fn token_hash_is_deterministic() {
        let raw = "some-session-token";
        assert_eq!(hash_session_token(raw), hash_session_token(raw));
        assert_ne!(hash_session_token("token-a"), hash_session_token("token-b"));
        assert_eq!(hash_session_token(raw).len(), 64);
    }

    #[test]
    fn linking_code_shape() {
        let code = generate_linking_code(LinkKind::Resident, 12);
        assert!(code.starts_with("RES-"));
        assert_eq!(code.len(), "RES".len() + 12 + 3);
        assert!(
            code.split('-')
                .skip(1)
                .all(|group| group.len() == 4
                    && group.bytes().all(|b| CODE_ALPHABET.contains(&b)))
        );

        let bm = generate_linking_code(LinkKind::BuildingManager, 8);
        assert!(bm.starts_with("BLD-"));
    }
}
