//! Monotonic timing shared by the frame loop, the classifier and the calibration clock
//!
//! Timestamps are nanoseconds since a process-wide epoch captured on first use:
//! - Monotonic (never goes backward)
//! - Cheap to copy and compare
//! - Constructible from plain numbers, so state machines can be driven in tests

pub mod clock;

pub use clock::{SessionClock, Timestamp};
