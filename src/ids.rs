//! Identifier and secret-token generation.
//!
//! Room codes use an alphabet that drops the characters operators most often
//! misread over voice (`I`, `O`, `0`, `1`), generalizing the teacher's
//! `generate_clean_room_code_of_length` (which already used this exact
//! alphabet for its "clean" room code variant).

use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64;
use base64::Engine;
use rand::Rng;
use subtle::ConstantTimeEq;
use uuid::Uuid;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ROOM_CODE_LENGTH: usize = 6;
const TOKEN_BYTES: usize = 18; // 144 bits, base64-encoded

pub fn new_room_id() -> Uuid {
    Uuid::new_v4()
}

pub fn new_player_id() -> Uuid {
    Uuid::new_v4()
}

pub fn new_round_id() -> Uuid {
    Uuid::new_v4()
}

pub fn new_prompt_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a 6-character room code from the unambiguous alphabet.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..ROOM_CODE_ALPHABET.len());
            ROOM_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Generate an opaque, cryptographically random secret (>=128 bits of entropy).
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill(&mut bytes);
    BASE64.encode(bytes)
}

/// Constant-time secret comparison to prevent timing attacks on token checks.
pub fn secrets_match(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_codes_use_only_unambiguous_characters() {
        for _ in 0..200 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LENGTH);
            for ch in code.chars() {
                assert!(!matches!(ch, 'I' | 'O' | '0' | '1'));
                assert!(ROOM_CODE_ALPHABET.contains(&(ch as u8)));
            }
        }
    }

    #[test]
    fn tokens_are_unique_and_nonempty() {
        let a = generate_token();
        let b = generate_token();
        assert!(!a.is_empty());
        assert_ne!(a, b);
    }

    #[test]
    fn secrets_match_is_exact() {
        assert!(secrets_match("abc123", "abc123"));
        assert!(!secrets_match("abc123", "abc124"));
        assert!(!secrets_match("abc123", "abc12"));
    }
}
