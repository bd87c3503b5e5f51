//! Environment abstraction for deterministic testing.
//!
//! Decouples key-store logic from system resources (wall clock, randomness).
//! Production code uses [`SystemEnv`]; tests and simulations use [`SimEnv`]
//! with a settable clock and a seeded RNG.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Abstract environment providing wall-clock time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `random_bytes()` uses cryptographically secure entropy in production
/// - `wall_clock_secs()` is Unix seconds, the unit envelopes are stamped in
pub trait Environment: Clone + Send + Sync + 'static {
    /// Current Unix time in whole seconds.
    ///
    /// Used to stamp and check envelopes. Skew between controller and client
    /// eats directly into the 600 second freshness window.
    fn wall_clock_secs(&self) -> u64;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates `N` random bytes.
    fn random_array<const N: usize>(&self) -> [u8; N] {
        let mut bytes = [0u8; N];
        self.random_bytes(&mut bytes);
        bytes
    }
}

/// Production environment using the system clock and OS randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails. Randomness is only drawn when bootstrapping
/// fresh identities and keys, never on the message path, and a client that
/// cannot generate keys cannot operate securely.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    fn wall_clock_secs(&self) -> u64 {
        keyfleet_crypto::unix_now()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - cannot generate key material");
    }
}

/// Deterministic environment with a manual clock and seeded RNG.
///
/// Clones share the same clock and RNG stream.
#[derive(Clone)]
pub struct SimEnv {
    now: Arc<AtomicU64>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnv {
    /// Create an environment at Unix time `now` with RNG `seed`.
    pub fn new(seed: u64, now: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Move the clock forward by `secs`.
    pub fn advance(&self, secs: u64) {
        self.now.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the clock to an absolute time (may go backwards to model skew).
    pub fn set_now(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Environment for SimEnv {
    fn wall_clock_secs(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_env_random_bytes_are_random() {
        let env = SystemEnv::new();

        let bytes1: [u8; 32] = env.random_array();
        let bytes2: [u8; 32] = env.random_array();

        // Extremely unlikely to be equal if random
        assert_ne!(bytes1, bytes2, "Random bytes should differ");
    }

    #[test]
    fn system_env_clock_is_after_2020() {
        assert!(SystemEnv::new().wall_clock_secs() > 1_577_836_800);
    }

    #[test]
    fn sim_env_same_seed_same_bytes() {
        let a = SimEnv::new(42, 0);
        let b = SimEnv::new(42, 0);

        assert_eq!(a.random_array::<64>(), b.random_array::<64>());
    }

    #[test]
    fn sim_env_clones_share_clock() {
        let env = SimEnv::new(0, 1_000);
        let clone = env.clone();

        env.advance(30);
        assert_eq!(clone.wall_clock_secs(), 1_030);

        clone.set_now(10);
        assert_eq!(env.wall_clock_secs(), 10);
    }
}
