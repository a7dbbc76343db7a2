//! Clock port - Interface for reading the current time.
//!
//! Reconciliation stamps transactions and computes entitlement expiry from
//! "now". Injecting the clock keeps those rules deterministic under test.
//!
//! # Design
//!
//! - **Synchronous**: Reading a clock never blocks, so no async needed
//! - **Injectable**: Handlers hold `Arc<dyn Clock>` and never call `Timestamp::now()` directly
//! - **Production default**: `SystemClock` delegates to the system time
//!
//! # Example
//!
//! ```ignore
//! let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//! let expires_at = clock.now().add_days(30);
//! ```

use crate::domain::foundation::Timestamp;

/// Port for obtaining the current time.
///
/// Monotonicity is not guaranteed across calls; callers that need a stable
/// "now" within one operation should read it once and thread the value through.
pub trait Clock: Send + Sync {
    /// Current time as a domain timestamp.
    fn now(&self) -> Timestamp;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}
