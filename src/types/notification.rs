// SPDX-License-Identifier: MPL-2.0

//! Notification payload types and helpers for building `NotificationMessage`s.

use crate::types::{DataValue, DateTime, StatusCode, Variant};

/// One changed value belonging to one monitored item.
#[derive(PartialEq, Debug, Clone)]
pub struct MonitoredItemNotification {
    /// Client-assigned handle of the monitored item the value belongs to.
    pub client_handle: u32,
    pub value: DataValue,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DataChangeNotification {
    pub monitored_items: Vec<MonitoredItemNotification>,
}

/// The selected field values of one delivered event, in select clause order.
#[derive(PartialEq, Debug, Clone)]
pub struct EventFieldList {
    /// Client-assigned handle of the event monitored item.
    pub client_handle: u32,
    pub event_fields: Vec<Variant>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct EventNotificationList {
    pub events: Vec<EventFieldList>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct StatusChangeNotification {
    pub status: StatusCode,
}

/// The notification payloads a message can carry. A message holds at most one
/// of each kind. Status changes have their slot in the protocol but this
/// engine never emits them.
#[derive(PartialEq, Debug, Clone)]
pub enum NotificationData {
    DataChange(DataChangeNotification),
    Events(EventNotificationList),
    StatusChange(StatusChangeNotification),
}

/// A numbered notification. Empty `notification_data` makes the message a
/// keep-alive.
#[derive(PartialEq, Debug, Clone)]
pub struct NotificationMessage {
    /// Per subscription sequence number of the message, starting at 1.
    pub sequence_number: u32,
    pub publish_time: DateTime,
    pub notification_data: Vec<NotificationData>,
}

impl NotificationMessage {
    /// Creates a notification message holding data changes AND / OR events.
    /// Calling this with neither will panic.
    pub fn data_change(
        sequence_number: u32,
        publish_time: DateTime,
        data_change_notifications: Vec<MonitoredItemNotification>,
        event_notifications: Vec<EventFieldList>,
    ) -> NotificationMessage {
        if data_change_notifications.is_empty() && event_notifications.is_empty() {
            panic!("No notifications supplied to data_change()");
        }

        let mut notification_data = Vec::with_capacity(2);
        if !data_change_notifications.is_empty() {
            notification_data.push(NotificationData::DataChange(DataChangeNotification {
                monitored_items: data_change_notifications,
            }));
        }
        if !event_notifications.is_empty() {
            notification_data.push(NotificationData::Events(EventNotificationList {
                events: event_notifications,
            }));
        }
        NotificationMessage {
            sequence_number,
            publish_time,
            notification_data,
        }
    }

    /// Creates a keep-alive notification message.
    pub fn keep_alive(sequence_number: u32, publish_time: DateTime) -> NotificationMessage {
        NotificationMessage {
            sequence_number,
            publish_time,
            notification_data: Vec::new(),
        }
    }

    pub fn is_keep_alive(&self) -> bool {
        self.notification_data.is_empty()
    }

    /// The data change payload, if the message carries one.
    pub fn data_changes(&self) -> Option<&DataChangeNotification> {
        self.notification_data.iter().find_map(|n| match n {
            NotificationData::DataChange(d) => Some(d),
            _ => None,
        })
    }

    /// The event payload, if the message carries one.
    pub fn events(&self) -> Option<&EventNotificationList> {
        self.notification_data.iter().find_map(|n| match n {
            NotificationData::Events(e) => Some(e),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keep_alive_is_empty() {
        let message = NotificationMessage::keep_alive(1, DateTime::now());
        assert!(message.is_keep_alive());
        assert!(message.data_changes().is_none());
        assert!(message.events().is_none());
    }

    #[test]
    fn data_change_payload_order() {
        let message = NotificationMessage::data_change(
            2,
            DateTime::now(),
            vec![MonitoredItemNotification {
                client_handle: 7,
                value: DataValue::new_now(1),
            }],
            vec![EventFieldList {
                client_handle: 8,
                event_fields: vec![Variant::from("x")],
            }],
        );
        assert_eq!(message.notification_data.len(), 2);
        assert_eq!(message.data_changes().unwrap().monitored_items[0].client_handle, 7);
        assert_eq!(message.events().unwrap().events[0].client_handle, 8);
    }

    #[test]
    #[should_panic]
    fn data_change_requires_payload() {
        let _ = NotificationMessage::data_change(1, DateTime::now(), vec![], vec![]);
    }
}
