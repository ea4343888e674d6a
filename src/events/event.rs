// SPDX-License-Identifier: MPL-2.0

//! Contains the `Event` payload delivered through `trigger_event`.

use crate::types::{ByteString, DateTime, LocalizedText, NodeId, QualifiedName, UAString, Variant};

/// An event in flight towards subscribers. Corresponds to the fields of
/// BaseEventType in OPC UA Part 5; anything beyond the base fields travels in
/// the browse-path-keyed values set via [`Event::set_value`].
#[derive(Debug, Clone)]
pub struct Event {
    /// A unique identifier for the event. May be left null / empty, in which
    /// case the subscription service generates one at trigger time.
    pub event_id: ByteString,
    /// Event type describes the type of the event.
    pub event_type: NodeId,
    /// Source node identifies the node that the event originated from,
    /// or null.
    pub source_node: NodeId,
    /// Source name provides the description of the source of the event.
    pub source_name: UAString,
    /// Time the event occurred, as close to the generator as possible.
    pub time: DateTime,
    /// Time the server received the event from the underlying device or
    /// another server.
    pub receive_time: DateTime,
    /// The event time in the timezone of the originator.
    pub local_time: DateTime,
    /// A human readable description of the event.
    pub message: LocalizedText,
    /// Urgency of the event, 1 (lowest) to 1000 (catastrophic).
    pub severity: u16,
    /// Additional fields keyed by browse path, in insertion order.
    values: Vec<(Vec<QualifiedName>, Variant)>,
}

impl Event {
    pub fn new<T, S>(event_type: T, source_node: S, message: LocalizedText, severity: u16) -> Event
    where
        T: Into<NodeId>,
        S: Into<NodeId>,
    {
        let now = DateTime::now();
        Event {
            event_id: ByteString::null(),
            event_type: event_type.into(),
            source_node: source_node.into(),
            source_name: UAString::null(),
            time: now,
            receive_time: now,
            local_time: now,
            message,
            severity,
            values: Vec::new(),
        }
    }

    /// Sets the field addressed by `browse_path`, replacing any previous
    /// value at that path.
    pub fn set_value(&mut self, browse_path: Vec<QualifiedName>, value: Variant) {
        if let Some(entry) = self.values.iter_mut().find(|(path, _)| *path == browse_path) {
            entry.1 = value;
        } else {
            self.values.push((browse_path, value));
        }
    }

    /// The field addressed by `browse_path`, or `Variant::Empty` when the
    /// event carries nothing at that path.
    pub fn value(&self, browse_path: &[QualifiedName]) -> Variant {
        self.values
            .iter()
            .find(|(path, _)| path == browse_path)
            .map(|(_, value)| value.clone())
            .unwrap_or(Variant::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::Event;
    use crate::types::{LocalizedText, NodeId, QualifiedName, Variant};

    #[test]
    fn custom_values_by_path() {
        let mut event = Event::new(
            NodeId::new(0, 2041u32),
            NodeId::new(2, "Motor"),
            LocalizedText::from("overheated"),
            500,
        );
        let path = vec![QualifiedName::from("Temperature")];
        assert_eq!(event.value(&path), Variant::Empty);

        event.set_value(path.clone(), Variant::from(99.5));
        assert_eq!(event.value(&path), Variant::Double(99.5));

        // Setting again replaces rather than duplicates
        event.set_value(path.clone(), Variant::from(101.0));
        assert_eq!(event.value(&path), Variant::Double(101.0));
    }
}
