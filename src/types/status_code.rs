// SPDX-License-Identifier: MPL-2.0

//! The status codes raised by the subscription engine. The numeric values are
//! the ones assigned by OPC UA Part 6.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of an operation, embedded per item in result vectors or in
/// response headers.
#[derive(Eq, PartialEq, Clone, Copy, Debug, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum StatusCode {
    /// The operation succeeded.
    Good = 0x0000_0000,
    /// The subscription id is not valid.
    BadSubscriptionIdInvalid = 0x8028_0000,
    /// The requested retransmission message is not available.
    BadMessageNotAvailable = 0x802A_0000,
    /// The monitored item id refers to an unknown monitored item.
    BadMonitoredItemIdInvalid = 0x8042_0000,
    /// The node's attributes are not valid for the operation, e.g. the
    /// address space refused a data change callback for them.
    BadNodeAttributesInvalid = 0x8062_0000,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::Good
    }
}

impl StatusCode {
    pub fn is_good(&self) -> bool {
        *self == StatusCode::Good
    }

    pub fn is_bad(&self) -> bool {
        !self.is_good()
    }
}
