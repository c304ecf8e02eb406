use std::sync::{
    atomic::{AtomicBool, AtomicU8, Ordering},
    Arc,
};

/// Connection progress for the current startup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Probing,
    Connected,
}

const DISCONNECTED: u8 = 0;
const PROBING: u8 = 1;
const CONNECTED: u8 = 2;

/// Shared cell holding the attempt's [`ConnectionState`].
///
/// The cell is read both by the probe and by the supervisor's event loop, so
/// transitions are applied by compare-and-swap: a stream callback arriving
/// while an earlier continuation is still pending cannot apply the same
/// transition twice. Transitions are forward-only within an attempt; a new
/// attempt calls [`ConnectionStateCell::reset`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionStateCell {
    inner: Arc<AtomicU8>,
}

impl ConnectionStateCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> ConnectionState {
        match self.inner.load(Ordering::Acquire) {
            PROBING => ConnectionState::Probing,
            CONNECTED => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Claims the `Disconnected → Probing` transition. The first caller wins;
    /// a repeated readiness banner must not start a second probe.
    pub fn begin_probing(&self) -> bool {
        self.inner
            .compare_exchange(DISCONNECTED, PROBING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Claims the `Probing → Connected` transition, at most once per attempt.
    pub fn mark_connected(&self) -> bool {
        self.inner
            .compare_exchange(PROBING, CONNECTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_connected(&self) -> bool {
        self.get() == ConnectionState::Connected
    }

    /// Rewinds to `Disconnected` at the start of a new attempt.
    pub fn reset(&self) {
        self.inner.store(DISCONNECTED, Ordering::Release);
    }
}

/// Process-wide flag set once when the user initiates termination. Once set,
/// no further attempt, probe, or restart may start; every retry and restart
/// decision point checks it.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    inner: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.inner.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_cell_transitions_are_forward_only() {
        let cell = ConnectionStateCell::new();
        assert_eq!(cell.get(), ConnectionState::Disconnected);

        assert!(cell.begin_probing());
        assert_eq!(cell.get(), ConnectionState::Probing);

        assert!(cell.mark_connected());
        assert_eq!(cell.get(), ConnectionState::Connected);
        assert!(cell.is_connected());
    }

    #[test]
    fn begin_probing_rejects_a_second_claim() {
        let cell = ConnectionStateCell::new();
        assert!(cell.begin_probing());
        assert!(!cell.begin_probing());
    }

    #[test]
    fn mark_connected_requires_probing_and_happens_once() {
        let cell = ConnectionStateCell::new();
        assert!(!cell.mark_connected());

        assert!(cell.begin_probing());
        assert!(cell.mark_connected());
        assert!(!cell.mark_connected());
    }

    #[test]
    fn reset_rewinds_for_the_next_attempt() {
        let cell = ConnectionStateCell::new();
        assert!(cell.begin_probing());
        assert!(cell.mark_connected());

        cell.reset();
        assert_eq!(cell.get(), ConnectionState::Disconnected);
        assert!(cell.begin_probing());
    }

    #[test]
    fn shutdown_flag_stays_set() {
        let flag = ShutdownFlag::new();
        assert!(!flag.is_set());
        flag.set();
        flag.set();
        assert!(flag.is_set());
    }
}
