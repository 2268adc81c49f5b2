//! Ambient clock behind the auto-inserted `Date` header.
//!
//! Nothing else in the crate reads the system time, so pinning the clock
//! here is enough to make serialization deterministic.

use std::{sync::RwLock, time::SystemTime};

use once_cell::sync::Lazy;

static CLOCK: Lazy<RwLock<fn() -> SystemTime>> = Lazy::new(|| RwLock::new(SystemTime::now));

/// Returns the current time through the configured clock.
pub(crate) fn now() -> SystemTime {
    let clock = *CLOCK.read().unwrap_or_else(|e| e.into_inner());
    clock()
}

/// Replaces the clock used for the auto-inserted `Date` header.
///
/// Mainly useful to pin a fixed instant from tests.
pub fn set_now(clock: fn() -> SystemTime) {
    *CLOCK.write().unwrap_or_else(|e| e.into_inner()) = clock;
}
