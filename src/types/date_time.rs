// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `DateTime`.

use std::fmt;

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::types::DateTimeUtc;

/// An OPC UA timestamp - an instant in time, UTC.
#[derive(PartialEq, PartialOrd, Eq, Ord, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DateTime {
    date_time: DateTimeUtc,
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.date_time.to_rfc3339())
    }
}

impl From<DateTimeUtc> for DateTime {
    fn from(date_time: DateTimeUtc) -> Self {
        // OPC UA time resolution is to 100ns, anything finer is discarded
        let nanos = (date_time.timestamp_subsec_nanos() / 100) * 100;
        let date_time = Utc.timestamp_opt(date_time.timestamp(), nanos).unwrap();
        DateTime { date_time }
    }
}

impl Default for DateTime {
    fn default() -> Self {
        DateTime::epoch()
    }
}

impl DateTime {
    /// The current instant.
    pub fn now() -> DateTime {
        DateTime::from(Utc::now())
    }

    /// The OPC UA epoch, also used as the null timestamp.
    pub fn epoch() -> DateTime {
        DateTime {
            date_time: Utc.with_ymd_and_hms(1601, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    /// Turns the timestamp back into a chrono value for arithmetic.
    pub fn as_chrono(&self) -> DateTimeUtc {
        self.date_time
    }
}

#[cfg(test)]
mod tests {
    use super::DateTime;

    #[test]
    fn truncates_to_100ns() {
        let now = chrono::Utc::now();
        let dt = DateTime::from(now);
        assert_eq!(dt.as_chrono().timestamp_subsec_nanos() % 100, 0);
    }

    #[test]
    fn ordering() {
        let epoch = DateTime::epoch();
        let now = DateTime::now();
        assert!(epoch < now);
    }
}
