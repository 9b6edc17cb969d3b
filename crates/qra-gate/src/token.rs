//! Token minting.
//!
//! Tokens are lower-case hex of `bytes` random bytes drawn from `OsRng`.
//! `OsRng` panics if the OS entropy source fails; that is the intended
//! behaviour, a token must never come from a weaker source.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::Token;

pub const MIN_TOKEN_BYTES: usize = 4;
pub const MAX_TOKEN_BYTES: usize = 32;
pub const DEFAULT_TOKEN_BYTES: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TokenGenerator {
    bytes: usize,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_BYTES)
    }
}

impl TokenGenerator {
    /// `bytes` is clamped into `MIN_TOKEN_BYTES..=MAX_TOKEN_BYTES`.
    pub fn new(bytes: usize) -> Self {
        Self {
            bytes: bytes.clamp(MIN_TOKEN_BYTES, MAX_TOKEN_BYTES),
        }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn generate(&self) -> Token {
        let mut buf = [0u8; MAX_TOKEN_BYTES];
        let buf = &mut buf[..self.bytes];
        OsRng.fill_bytes(buf);
        Token::new(hex::encode(buf))
    }

    /// Mint a token guaranteed to differ from `current`.
    ///
    /// With short tokens a repeat is unlikely but possible; the live token
    /// must still change on every mint.
    pub fn generate_distinct(&self, current: &Token) -> Token {
        loop {
            let t = self.generate();
            if &t != current {
                return t;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_token_is_eight_hex_chars() {
        let t = TokenGenerator::default().generate();
        assert_eq!(t.as_str().len(), 8);
        assert!(t.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(t.as_str(), t.as_str().to_ascii_lowercase());
    }

    #[test]
    fn width_is_clamped() {
        assert_eq!(TokenGenerator::new(0).bytes(), MIN_TOKEN_BYTES);
        assert_eq!(TokenGenerator::new(1024).bytes(), MAX_TOKEN_BYTES);
        assert_eq!(TokenGenerator::new(16).generate().as_str().len(), 32);
    }

    #[test]
    fn distinct_never_repeats_current() {
        let gen = TokenGenerator::default();
        let mut current = gen.generate();
        for _ in 0..1_000 {
            let next = gen.generate_distinct(&current);
            assert_ne!(next, current);
            current = next;
        }
    }

    #[test]
    fn debug_does_not_print_the_token() {
        let t = Token::from("ab12cd34");
        let dbg = format!("{t:?}");
        assert!(!dbg.contains("ab12cd34"));
    }
}
