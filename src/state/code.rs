use crate::error::LobbyError;
use crate::types::LobbyCode;
use rand::Rng;

/// Safe character set for lobby codes (excludes I, O, 0, 1 to avoid confusion)
pub const CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const CODE_LENGTH: usize = 4;

/// Generate a random lobby code
pub fn generate_code<R: Rng>(rng: &mut R) -> LobbyCode {
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

/// Generate a code that `taken` does not already contain
pub fn generate_unique_code<F>(taken: F) -> LobbyCode
where
    F: Fn(&str) -> bool,
{
    let mut rng = rand::rng();
    loop {
        let code = generate_code(&mut rng);
        if !taken(&code) {
            return code;
        }
        // Collision - try again (~1M combinations)
    }
}

/// Upper-case a user-entered code and check its shape
pub fn normalize_code(raw: &str) -> Result<LobbyCode, LobbyError> {
    let code = raw.trim().to_ascii_uppercase();
    if code.len() == CODE_LENGTH && code.bytes().all(|b| CODE_CHARS.contains(&b)) {
        Ok(code)
    } else {
        Err(LobbyError::InvalidCode)
    }
}
