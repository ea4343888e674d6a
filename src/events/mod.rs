// SPDX-License-Identifier: MPL-2.0

//! Events raised against address space nodes and the filtering that selects
//! which of their fields are delivered to subscribers.

pub mod event;
pub mod event_filter;
