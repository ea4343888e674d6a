// SPDX-License-Identifier: MPL-2.0

//! Contains the implementation of `DataValue`.

use serde::{Deserialize, Serialize};

use crate::types::{DateTime, StatusCode, Variant};

/// A value with its status and timestamps, as read from an attribute or
/// delivered through a data change notification.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataValue {
    /// The value. A missing value means the read produced nothing.
    pub value: Option<Variant>,
    /// The status associated with the value.
    pub status: Option<StatusCode>,
    /// The source timestamp - when the value was known good at its source.
    pub source_timestamp: Option<DateTime>,
    /// The server timestamp - when the server last observed the value.
    pub server_timestamp: Option<DateTime>,
}

impl DataValue {
    /// Creates a value stamped with the current time.
    pub fn new_now<V>(value: V) -> DataValue
    where
        V: Into<Variant>,
    {
        let now = DateTime::now();
        DataValue {
            value: Some(value.into()),
            status: Some(StatusCode::Good),
            source_timestamp: Some(now),
            server_timestamp: Some(now),
        }
    }

    /// Creates a value stamped with the supplied time.
    pub fn new_at<V>(value: V, time: DateTime) -> DataValue
    where
        V: Into<Variant>,
    {
        DataValue {
            value: Some(value.into()),
            status: Some(StatusCode::Good),
            source_timestamp: Some(time),
            server_timestamp: Some(time),
        }
    }

    /// The effective status of the value - a value with no status is Good.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::Good)
    }
}
