// SPDX-License-Identifier: MPL-2.0

//! Subscriptions and monitored items. The service (`service`) owns
//! subscriptions by id; each subscription (`subscription`) is driven by its
//! own publishing timer (`timer`) and feeds emitted results to the publish
//! callback supplied at creation.

use crate::types::{NotificationMessage, StatusCode};

pub mod monitored_item;
pub mod service;
pub mod subscription;
pub(crate) mod timer;


/// An emitted notification together with its retransmission bookkeeping,
/// handed to the publish callback once per emission and retained in the
/// subscription until acknowledged.
#[derive(Debug, Clone, PartialEq)]
pub struct PublishResult {
    pub subscription_id: u32,
    /// Sequence numbers of the messages still awaiting acknowledgement at
    /// the time this one was emitted, excluding this one.
    pub available_sequence_numbers: Vec<u32>,
    pub more_notifications: bool,
    pub message: NotificationMessage,
    /// One `Good` per notification payload carried by the message.
    pub statuses: Vec<StatusCode>,
}

/// Invoked with each emitted `PublishResult`, on an executor thread, outside
/// the engine's locks. The engine does not assume the callback is
/// non-blocking, but blocking it blocks that executor thread.
pub type PublishCallback = Box<dyn Fn(PublishResult) + Send + Sync>;

/// This converts an OPC UA Duration (floating point millis) into a time
/// duration for the publishing timer, clamped so the timer can always run.
pub(crate) fn publishing_interval_from_ms(d: f64) -> std::time::Duration {
    // Duration is a floating point number in millis so turn to microseconds
    // for greater accuracy
    let d = d.max(crate::constants::MIN_PUBLISHING_INTERVAL_MS);
    std::time::Duration::from_micros((d * 1000f64) as u64)
}
