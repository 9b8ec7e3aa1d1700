use crate::constants::{INVITE_CODE_ALPHABET, INVITE_CODE_LEN, NICKNAME_MAX_LEN};
use crate::error::LobbyError;

/// Accepts exactly `^[A-Za-z0-9]{1,12}$`.
pub fn validate_nickname(value: &str) -> Result<String, LobbyError> {
    let valid = !value.is_empty()
        && value.len() <= NICKNAME_MAX_LEN
        && value.bytes().all(|b| b.is_ascii_alphanumeric());
    if valid {
        Ok(value.to_string())
    } else {
        Err(LobbyError::InvalidNickname)
    }
}

/// Uppercases and checks shape; does not check existence.
pub fn normalize_invite_code(raw: &str) -> Result<String, LobbyError> {
    let normalized = raw.trim().to_ascii_uppercase();
    let valid = normalized.len() == INVITE_CODE_LEN
        && normalized
            .bytes()
            .all(|b| INVITE_CODE_ALPHABET.contains(&b));
    if valid {
        Ok(normalized)
    } else {
        Err(LobbyError::InvalidRoomCode)
    }
}

pub fn generate_invite_code<R: rand::Rng + ?Sized>(rng: &mut R) -> String {
    (0..INVITE_CODE_LEN)
        .map(|_| INVITE_CODE_ALPHABET[rng.random_range(0..INVITE_CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn random_invite_code() -> String {
    generate_invite_code(&mut rand::rng())
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn accepts_plain_alphanumeric_names() {
        assert_eq!(validate_nickname("Alice"), Ok("Alice".to_string()));
        assert_eq!(validate_nickname("a"), Ok("a".to_string()));
        assert_eq!(validate_nickname("Player123456"), Ok("Player123456".to_string()));
    }

    #[test]
    fn rejects_bad_names() {
        for bad in [
            "",
            "   ",
            " Bob ",
            "Player1234567",
            "with space",
            "dash-name",
            "emoji🙂",
            "Zoë",
            "名前",
            "semi;colon",
        ] {
            assert_eq!(
                validate_nickname(bad),
                Err(LobbyError::InvalidNickname),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn generated_codes_have_expected_shape() {
        for _ in 0..100 {
            let code = random_invite_code();
            assert_eq!(code.len(), INVITE_CODE_LEN);
            assert!(code.bytes().all(|b| INVITE_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn generated_codes_rarely_collide() {
        let codes: HashSet<String> = (0..100).map(|_| random_invite_code()).collect();
        assert!(codes.len() >= 98);
    }

    #[test]
    fn invite_codes_match_case_insensitively() {
        assert_eq!(normalize_invite_code(" abc234 "), Ok("ABC234".to_string()));
        assert_eq!(normalize_invite_code("ABC23"), Err(LobbyError::InvalidRoomCode));
        assert_eq!(normalize_invite_code("ABC230"), Err(LobbyError::InvalidRoomCode));
        assert_eq!(normalize_invite_code("ABCDEO"), Err(LobbyError::InvalidRoomCode));
    }
}
