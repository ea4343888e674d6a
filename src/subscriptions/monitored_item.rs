// SPDX-License-Identifier: MPL-2.0

use crate::types::{
    MonitoredItemCreateRequest, MonitoringFilter, MonitoringMode, ReadValueId,
};

/// One client registration against one `(node, attribute)` pair within a
/// subscription. The record is bookkeeping: the live machinery is the address
/// space callback it installed (for data items) or the node entry in the
/// subscription's event table (for event items).
#[derive(Debug, Clone)]
pub struct MonitoredItem {
    monitored_item_id: u32,
    item_to_monitor: ReadValueId,
    monitoring_mode: MonitoringMode,
    client_handle: u32,
    /// Handle of the data change callback installed with the address space,
    /// 0 for event items which install none.
    callback_handle: u32,
    filter: MonitoringFilter,
}

impl MonitoredItem {
    pub fn new(
        monitored_item_id: u32,
        callback_handle: u32,
        request: &MonitoredItemCreateRequest,
    ) -> MonitoredItem {
        MonitoredItem {
            monitored_item_id,
            item_to_monitor: request.item_to_monitor.clone(),
            monitoring_mode: request.monitoring_mode,
            client_handle: request.requested_parameters.client_handle,
            callback_handle,
            filter: request.requested_parameters.filter.clone(),
        }
    }

    pub fn monitored_item_id(&self) -> u32 {
        self.monitored_item_id
    }

    pub fn item_to_monitor(&self) -> &ReadValueId {
        &self.item_to_monitor
    }

    pub fn client_handle(&self) -> u32 {
        self.client_handle
    }

    pub fn callback_handle(&self) -> u32 {
        self.callback_handle
    }

    pub fn filter(&self) -> &MonitoringFilter {
        &self.filter
    }

    /// True when the item's mode lets it deliver notifications.
    pub fn is_reporting(&self) -> bool {
        self.monitoring_mode == MonitoringMode::Reporting
    }
}
