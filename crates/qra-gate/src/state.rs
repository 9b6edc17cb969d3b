//! `ModeState`: the one shared `{mode, token}` record.
//!
//! # Invariants
//!
//! - **One lock, one unit**: mode, token and generation live behind a single
//!   `RwLock`. No reader can see a mode from one write and a token from
//!   another.
//! - **Every write mints a new generation**: `generation` strictly increases,
//!   and any token not equal to the one just written is expired from that
//!   point on.
//! - **Rotation is Attendance-only**: [`ModeState::rotate`] checks the mode
//!   and replaces the token inside the same write guard, so a mode switch
//!   landing between "check" and "write" cannot be overwritten.
//!
//! Nothing outside this type may hold a copy of the pair longer than one
//! logical operation.

use tokio::sync::RwLock;

use crate::{validate, GateSnapshot, Mode, Rejection, Token, TokenGenerator, Verdict};

#[derive(Debug)]
pub struct ModeState {
    inner: RwLock<GateSnapshot>,
}

impl Default for ModeState {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeState {
    /// Boot state: attendance mode, empty token, generation 0.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GateSnapshot::boot()),
        }
    }

    /// Atomic snapshot of the current pair.
    pub async fn read(&self) -> GateSnapshot {
        self.inner.read().await.clone()
    }

    /// Atomic replace of the pair. Returns the snapshot that was written.
    pub async fn write(&self, mode: Mode, token: Token) -> GateSnapshot {
        let mut g = self.inner.write().await;
        g.mode = mode;
        g.token = token;
        g.generation += 1;
        g.clone()
    }

    /// Enter `mode` with a freshly minted token, whatever the current mode.
    ///
    /// The new token always differs from the one it replaces, so a
    /// transition expires every earlier QR code immediately.
    pub async fn switch_to(&self, mode: Mode, gen: &TokenGenerator) -> GateSnapshot {
        let mut g = self.inner.write().await;
        let token = gen.generate_distinct(&g.token);
        g.mode = mode;
        g.token = token;
        g.generation += 1;
        g.clone()
    }

    /// One rotation step.
    ///
    /// In attendance mode: replace the token (distinct from the current one)
    /// and return the new snapshot. In any other mode: touch nothing and
    /// return `None`.
    pub async fn rotate(&self, gen: &TokenGenerator) -> Option<GateSnapshot> {
        let mut g = self.inner.write().await;
        if g.mode != Mode::Attendance {
            return None;
        }
        g.token = gen.generate_distinct(&g.token);
        g.generation += 1;
        Some(g.clone())
    }

    /// Validate `presented` for an `expected`-mode operation against a single
    /// snapshot.
    pub async fn validate(&self, presented: &Token, expected: Mode) -> Verdict {
        let g = self.inner.read().await;
        validate(&g, presented, expected)
    }

    /// Which mode `presented` currently opens, from a single snapshot.
    pub async fn resolve(&self, presented: &Token) -> Result<Mode, Rejection> {
        let g = self.inner.read().await;
        crate::resolve(&g, presented)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn boot_state_is_attendance_with_empty_token() {
        let ms = ModeState::new();
        let s = ms.read().await;
        assert_eq!(s.mode, Mode::Attendance);
        assert!(s.token.is_empty());
        assert_eq!(s.generation, 0);
    }

    #[tokio::test]
    async fn write_bumps_generation() {
        let ms = ModeState::new();
        let a = ms.write(Mode::Attendance, Token::from("aaaaaaaa")).await;
        let b = ms.write(Mode::Register, Token::from("bbbbbbbb")).await;
        assert_eq!(a.generation + 1, b.generation);
        assert_eq!(ms.read().await, b);
    }

    #[tokio::test]
    async fn rotate_is_noop_outside_attendance() {
        let ms = ModeState::new();
        let before = ms.write(Mode::Register, Token::from("bbbbbbbb")).await;
        assert!(ms.rotate(&TokenGenerator::default()).await.is_none());
        assert_eq!(ms.read().await, before);
    }

    #[tokio::test]
    async fn switch_to_same_mode_still_mints() {
        let ms = ModeState::new();
        let gen = TokenGenerator::default();
        let a = ms.switch_to(Mode::Attendance, &gen).await;
        let b = ms.switch_to(Mode::Attendance, &gen).await;
        assert_ne!(a.token, b.token);
        assert!(b.generation > a.generation);
    }
}
