use rand::Rng;
use std::fmt;

pub const GAME_CODE_LEN: usize = 6;
const GAME_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Short join code. Generated without checking for collisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GameCode(String);

impl GameCode {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..GAME_CODE_LEN)
            .map(|_| GAME_CODE_ALPHABET[rng.gen_range(0..GAME_CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Trims and uppercases user input. Empty input yields `None`; nothing
    /// else is validated.
    pub fn normalize(input: &str) -> Option<Self> {
        let code = input.trim().to_uppercase();
        if code.is_empty() {
            None
        } else {
            Some(Self(code))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-session display name. Not persisted, not unique-checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerName(String);

impl PlayerName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn random() -> Self {
        Self(format!("Player{}", rand::thread_rng().gen_range(0..10000)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_shape() {
        for _ in 0..100 {
            let code = GameCode::generate();
            assert_eq!(code.as_str().len(), GAME_CODE_LEN);
            assert!(code
                .as_str()
                .chars()
                .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit()));
        }
    }

    #[test]
    fn test_normalize_trims_and_uppercases() {
        assert_eq!(
            GameCode::normalize("  k3f9qz \n").unwrap().as_str(),
            "K3F9QZ"
        );
        assert_eq!(GameCode::normalize("   "), None);
        // length is not validated
        assert_eq!(GameCode::normalize("abc").unwrap().as_str(), "ABC");
    }

    #[test]
    fn test_random_player_name() {
        let name = PlayerName::random();
        let suffix = name.as_str().strip_prefix("Player").unwrap();
        assert!(suffix.parse::<u32>().unwrap() < 10000);
    }
}
