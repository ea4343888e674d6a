// SPDX-License-Identifier: MPL-2.0

//! Decoded service request / response structures consumed and produced by
//! the engine. Shapes follow OPC UA Part 4.

use serde::{Deserialize, Serialize};

use crate::types::{
    DateTime, Duration, MonitoringMode, NodeId, QualifiedName, StatusCode, UAString, Variant,
};

/// Common part of every service request. The engine trusts the session layer
/// to have authenticated the token.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RequestHeader {
    /// Token of the session the request was made on.
    pub authentication_token: NodeId,
    /// When the client sent the request.
    pub timestamp: DateTime,
}

impl RequestHeader {
    pub fn new(authentication_token: NodeId) -> RequestHeader {
        RequestHeader {
            authentication_token,
            timestamp: DateTime::now(),
        }
    }
}

/// Common part of every service response.
#[derive(PartialEq, Debug, Clone)]
pub struct ResponseHeader {
    pub timestamp: DateTime,
    pub service_result: StatusCode,
}

impl ResponseHeader {
    pub fn new_good() -> ResponseHeader {
        ResponseHeader::new_service_result(StatusCode::Good)
    }

    pub fn new_service_result(service_result: StatusCode) -> ResponseHeader {
        ResponseHeader {
            timestamp: DateTime::now(),
            service_result,
        }
    }
}

/// Identifies an attribute of a node to read or monitor.
#[derive(PartialEq, Eq, Debug, Clone, Hash)]
pub struct ReadValueId {
    pub node_id: NodeId,
    /// The attribute being addressed, one of the `AttributeId` values.
    pub attribute_id: u32,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CreateSubscriptionRequest {
    pub request_header: RequestHeader,
    pub requested_publishing_interval: Duration,
    pub requested_lifetime_count: u32,
    pub requested_max_keep_alive_count: u32,
    pub max_notifications_per_publish: u32,
    pub publishing_enabled: bool,
    pub priority: u8,
}

/// The revised parameters of a created subscription. The engine does not
/// renegotiate, so revised values echo the request.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionData {
    pub subscription_id: u32,
    pub revised_publishing_interval: Duration,
    /// Ticks without an outgoing publish before the subscription expires.
    pub revised_lifetime_count: u32,
    /// Ticks without real notifications before an empty keep-alive is due.
    pub revised_max_keep_alive_count: u32,
    /// Token of the owning session.
    pub session_token: NodeId,
}

/// Filter applied to a monitored item. Data items carry no filter; event
/// items select which event fields to deliver.
#[derive(PartialEq, Debug, Clone, Default)]
pub enum MonitoringFilter {
    #[default]
    None,
    Event(EventFilter),
}

#[derive(PartialEq, Debug, Clone)]
pub struct MonitoringParameters {
    /// Client-assigned id echoed in every notification for the item.
    pub client_handle: u32,
    pub sampling_interval: Duration,
    pub filter: MonitoringFilter,
    pub queue_size: u32,
    pub discard_oldest: bool,
}

impl Default for MonitoringParameters {
    fn default() -> Self {
        MonitoringParameters {
            client_handle: 0,
            sampling_interval: -1.0,
            filter: MonitoringFilter::None,
            queue_size: 1,
            discard_oldest: true,
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct MonitoredItemCreateRequest {
    pub item_to_monitor: ReadValueId,
    pub monitoring_mode: MonitoringMode,
    pub requested_parameters: MonitoringParameters,
}

#[derive(PartialEq, Debug, Clone)]
pub struct MonitoredItemCreateResult {
    pub status: StatusCode,
    pub monitored_item_id: u32,
    pub revised_sampling_interval: Duration,
    pub revised_queue_size: u32,
    /// The filter as accepted; the engine takes it unchanged.
    pub filter: MonitoringFilter,
}

#[derive(PartialEq, Debug, Clone)]
pub struct CreateMonitoredItemsRequest {
    pub subscription_id: u32,
    pub items_to_create: Vec<MonitoredItemCreateRequest>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct DeleteMonitoredItemsRequest {
    pub subscription_id: u32,
    pub monitored_item_ids: Vec<u32>,
}

/// Acknowledges receipt of one notification, allowing the server to drop it
/// from the retransmission queue.
#[derive(PartialEq, Debug, Clone)]
pub struct SubscriptionAcknowledgement {
    pub subscription_id: u32,
    pub sequence_number: u32,
}

/// A publish poll. Receipt of one gives the session credit for one emitted
/// notification on any of its subscriptions.
#[derive(PartialEq, Debug, Clone)]
pub struct PublishRequest {
    pub request_header: RequestHeader,
    pub subscription_acknowledgements: Vec<SubscriptionAcknowledgement>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RepublishRequest {
    pub request_header: RequestHeader,
    pub subscription_id: u32,
    pub retransmit_sequence_number: u32,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RepublishResponse {
    pub response_header: ResponseHeader,
    pub notification_message: crate::types::NotificationMessage,
}

/// Selects the value to return for one event field.
#[derive(PartialEq, Debug, Clone)]
pub struct SimpleAttributeOperand {
    pub type_definition_id: NodeId,
    pub browse_path: Vec<QualifiedName>,
    /// The attribute being addressed, one of the `AttributeId` values.
    pub attribute_id: u32,
    pub index_range: UAString,
}

impl SimpleAttributeOperand {
    /// Shorthand for a namespace 0 select clause on the Value attribute, the
    /// common case in event filters.
    pub fn new_value<T>(browse_name: T) -> SimpleAttributeOperand
    where
        T: Into<QualifiedName>,
    {
        SimpleAttributeOperand {
            type_definition_id: NodeId::null(),
            browse_path: vec![browse_name.into()],
            attribute_id: crate::types::AttributeId::Value as u32,
            index_range: UAString::null(),
        }
    }
}

/// Operators usable in a content filter element.
#[derive(Eq, PartialEq, Copy, Clone, Debug)]
pub enum FilterOperator {
    Equals,
    IsNull,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    Like,
    Not,
    Between,
    InList,
    And,
    Or,
    Cast,
    BitwiseAnd,
    BitwiseOr,
}

#[derive(PartialEq, Debug, Clone)]
pub struct ContentFilterElement {
    pub filter_operator: FilterOperator,
    pub filter_operands: Vec<Variant>,
}

/// A where clause. Carried with the event filter but not evaluated by this
/// engine - every event on a subscribed node is delivered.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct ContentFilter {
    pub elements: Option<Vec<ContentFilterElement>>,
}

/// Chooses which fields of matching events are delivered, and nominally
/// which events match. See `ContentFilter` for the where clause caveat.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct EventFilter {
    pub select_clauses: Vec<SimpleAttributeOperand>,
    pub where_clause: ContentFilter,
}
