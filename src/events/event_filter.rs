// SPDX-License-Identifier: MPL-2.0

//! Select clause evaluation - projecting an event onto the fields a filter
//! asks for. Where clauses are carried but not evaluated, so every event on a
//! subscribed node reaches its subscribers.

use crate::events::event::Event;
use crate::types::{EventFilter, SimpleAttributeOperand, Variant};

/// Produces the field values selected by the filter, one per select clause,
/// in clause order. Clauses that address nothing the event carries yield
/// `Variant::Empty` so the result always lines up with the clause list.
pub fn event_fields(filter: &EventFilter, event: &Event) -> Vec<Variant> {
    filter
        .select_clauses
        .iter()
        .map(|clause| select_field(clause, event))
        .collect()
}

fn select_field(clause: &SimpleAttributeOperand, event: &Event) -> Variant {
    let Some(first) = clause.browse_path.first() else {
        // An empty browse path addresses an attribute of the event object
        // itself, which base events do not carry.
        return Variant::Empty;
    };
    if first.namespace_index == 0 {
        // The well-known fields of BaseEventType
        match first.name.as_ref() {
            "EventID" => return event.event_id.clone().into(),
            "EventType" => return event.event_type.clone().into(),
            "SourceNode" => return event.source_node.clone().into(),
            "SourceName" => return event.source_name.clone().into(),
            "Message" => return event.message.clone().into(),
            "Severity" => return event.severity.into(),
            "LocalTime" => return event.local_time.into(),
            "ReceiveTime" => return event.receive_time.into(),
            "Time" => return event.time.into(),
            _ => {}
        }
    }
    event.value(&clause.browse_path)
}

#[cfg(test)]
mod tests {
    use super::event_fields;
    use crate::events::event::Event;
    use crate::types::{
        ByteString, EventFilter, LocalizedText, NodeId, QualifiedName, SimpleAttributeOperand,
        UAString, Variant,
    };

    fn test_event() -> Event {
        let mut event = Event::new(
            NodeId::new(0, 2041u32),
            NodeId::new(2, "Pump"),
            LocalizedText::from("pressure fault"),
            750,
        );
        event.event_id = ByteString::from(vec![1u8, 2, 3, 4]);
        event.source_name = UAString::from("Pump");
        event.set_value(
            vec![QualifiedName::new(2, "Pressure")],
            Variant::from(17.2),
        );
        event
    }

    fn filter_of(names: &[&str]) -> EventFilter {
        EventFilter {
            select_clauses: names
                .iter()
                .map(|n| SimpleAttributeOperand::new_value(*n))
                .collect(),
            where_clause: Default::default(),
        }
    }

    #[test]
    fn well_known_fields() {
        let event = test_event();
        let filter = filter_of(&["EventID", "SourceName", "Severity", "Message"]);
        let fields = event_fields(&filter, &event);
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], Variant::ByteString(ByteString::from(vec![1u8, 2, 3, 4])));
        assert_eq!(fields[1], Variant::String(UAString::from("Pump")));
        assert_eq!(fields[2], Variant::UInt16(750));
        assert_eq!(
            fields[3],
            Variant::LocalizedText(Box::new(LocalizedText::from("pressure fault")))
        );
    }

    #[test]
    fn custom_path_resolves_through_event() {
        let event = test_event();
        let mut filter = filter_of(&[]);
        filter.select_clauses.push(SimpleAttributeOperand {
            type_definition_id: NodeId::null(),
            browse_path: vec![QualifiedName::new(2, "Pressure")],
            attribute_id: crate::types::AttributeId::Value as u32,
            index_range: UAString::null(),
        });
        let fields = event_fields(&filter, &event);
        assert_eq!(fields, vec![Variant::Double(17.2)]);
    }

    #[test]
    fn unknown_clauses_keep_their_slot() {
        let event = test_event();
        let filter = filter_of(&["Severity", "NoSuchField"]);
        let fields = event_fields(&filter, &event);
        assert_eq!(fields, vec![Variant::UInt16(750), Variant::Empty]);
    }

    #[test]
    fn empty_browse_path_is_empty_field() {
        let event = test_event();
        let filter = EventFilter {
            select_clauses: vec![SimpleAttributeOperand {
                type_definition_id: NodeId::null(),
                browse_path: vec![],
                attribute_id: crate::types::AttributeId::Value as u32,
                index_range: UAString::null(),
            }],
            where_clause: Default::default(),
        };
        assert_eq!(event_fields(&filter, &event), vec![Variant::Empty]);
    }

    #[test]
    fn namespaced_name_is_not_well_known() {
        let mut event = test_event();
        event.set_value(
            vec![QualifiedName::new(2, "Severity")],
            Variant::from(1u16),
        );
        let filter = EventFilter {
            select_clauses: vec![SimpleAttributeOperand {
                type_definition_id: NodeId::null(),
                browse_path: vec![QualifiedName::new(2, "Severity")],
                attribute_id: crate::types::AttributeId::Value as u32,
                index_range: UAString::null(),
            }],
            where_clause: Default::default(),
        };
        // ns=2 "Severity" is the event's own field, not the built-in one
        assert_eq!(event_fields(&filter, &event), vec![Variant::UInt16(1)]);
    }
}
