// SPDX-License-Identifier: MPL-2.0

//! Decoded OPC UA structures used by the subscription engine. Field layout
//! follows the OPC UA specification; the binary encoding of these types is
//! handled elsewhere and is of no concern to the engine.

mod basic_types;
mod data_types;
mod data_value;
mod date_time;
mod node_id;
mod notification;
mod service_types;
mod status_code;
mod variant;

pub use self::basic_types::*;
pub use self::data_types::*;
pub use self::data_value::*;
pub use self::date_time::*;
pub use self::node_id::*;
pub use self::notification::*;
pub use self::service_types::*;
pub use self::status_code::*;
pub use self::variant::*;

/// UTC timestamp used internally wherever chrono arithmetic is needed.
pub type DateTimeUtc = chrono::DateTime<chrono::Utc>;
