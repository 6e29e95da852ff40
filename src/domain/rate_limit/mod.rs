//! Rate limit domain
//!
//! Fixed-window usage counters, the store abstraction that keeps them, and
//! the clock used to decide when a window has elapsed.

mod clock;
mod counter;
mod store;

pub use clock::{Clock, SystemClock};
pub use counter::{Admission, RateLimitDecision, UsageCounter};
pub use store::CounterStore;

#[cfg(test)]
pub use clock::mock::ManualClock;
#[cfg(test)]
pub use store::MockCounterStore;
