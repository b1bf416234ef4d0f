//! TigerStyle constants for nixie
//!
//! All limits are explicit, use big-endian naming (most significant first),
//! and include units in the name.

/// Default deadline for `ask` when the caller wants one but does not care (5 s)
pub const ASK_TIMEOUT_MS_DEFAULT: u64 = 5 * 1000;

/// Maximum single scheduling delay or sleep in milliseconds (1 hour)
///
/// The scheduler is meant for retransmits and periodic pipeline kicks, not
/// long-term job scheduling.
pub const SCHEDULE_DELAY_MS_MAX: u64 = 60 * 60 * 1000;

/// Minimum periodic interval in milliseconds
///
/// Anything below this busy-loops the timer chain.
pub const SCHEDULE_INTERVAL_MS_MIN: u64 = 1;

/// URN prefix for actor identifiers
pub const ACTOR_URN_PREFIX: &str = "urn:uuid:";

// Compile-time assertions for constant validity
const _: () = {
    assert!(ASK_TIMEOUT_MS_DEFAULT >= 1000);
    assert!(SCHEDULE_DELAY_MS_MAX >= 60 * 1000);
    assert!(SCHEDULE_INTERVAL_MS_MIN >= 1);
};
