//! Message ID generation.
//!
//! Every query carries a random 16-bit transaction id so that stale or spoofed
//! replies arriving on the same port can be told apart from the real one.

use std::cell::RefCell;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use tracing::warn;

/// A source of message ids.
///
/// Owns its generator; share it behind a lock or keep one per thread.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    rng: StdRng,
}

impl IdGenerator {
    /// Seeds from the operating system's entropy source, falling back to the
    /// system clock when that source is unavailable.
    pub fn new() -> Self {
        let rng = StdRng::from_rng(OsRng).unwrap_or_else(|err| {
            warn!(%err, "OS entropy unavailable, seeding message ids from the clock");
            StdRng::seed_from_u64(clock_seed())
        });
        IdGenerator { rng }
    }

    /// A generator with a fixed seed. Two generators built from the same seed
    /// yield the same ids.
    pub fn from_seed(seed: u64) -> Self {
        IdGenerator {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_id(&mut self) -> u16 {
        self.rng.next_u32() as u16
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default()
}

thread_local! {
    static GENERATOR: RefCell<IdGenerator> = RefCell::new(IdGenerator::new());
}

/// Draws a message id from this thread's generator, seeding it on first use.
pub fn next_id() -> u16 {
    GENERATOR.with(|generator| generator.borrow_mut().next_id())
}
