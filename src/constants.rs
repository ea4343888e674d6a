// SPDX-License-Identifier: MPL-2.0

//! Constants that govern the internal workings of the subscription engine.

/// Maximum number of outstanding publish requests held per session. Further
/// publish requests beyond this are dropped.
pub const MAX_PUBLISH_REQUESTS_PER_SESSION: u32 = 100;

/// Number of bytes in a generated event id.
pub const EVENT_ID_LENGTH: usize = 8;

/// Floor on the publishing timer in millis. The revised publishing interval
/// echoes whatever the client requested, but the timer itself will not run
/// faster than this.
pub const MIN_PUBLISHING_INTERVAL_MS: f64 = 1.0;

/// First sequence number issued on a subscription's notifications.
pub const FIRST_SEQUENCE_NUMBER: u32 = 1;
