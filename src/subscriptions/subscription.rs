// SPDX-License-Identifier: MPL-2.0

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::address_space::AddressSpaceRef;
use crate::constants;
use crate::events::{event::Event, event_filter};
use crate::handle::Handle;
use crate::subscriptions::monitored_item::MonitoredItem;
use crate::subscriptions::service::{SubscriptionMetrics, SubscriptionService};
use crate::subscriptions::timer::PublishingTimer;
use crate::subscriptions::{publishing_interval_from_ms, PublishCallback, PublishResult};
use crate::types::{
    AttributeId, DataChangeNotification, DataValue, DateTime, EventFieldList,
    EventNotificationList, MonitoredItemCreateRequest, MonitoredItemCreateResult,
    MonitoredItemNotification, MonitoringFilter, NodeId, NotificationData, NotificationMessage,
    RepublishRequest, RepublishResponse, ResponseHeader, StatusCode, SubscriptionData,
};

/// One subscription: the periodic publishing state machine plus the monitored
/// items feeding its notification queues.
///
/// Everything mutable lives behind the subscription's own lock; the lock is
/// never held while calling the address space, the service or the publish
/// callback. Lock acquisition order across the engine is service then
/// subscription.
pub struct InternalSubscription {
    data: SubscriptionData,
    /// The owning service, consulted for publish request credit at emit time.
    service: Weak<SubscriptionService>,
    address_space: AddressSpaceRef,
    callback: PublishCallback,
    timer: PublishingTimer,
    /// Latched when the subscription terminally stops - expiry, teardown of
    /// the timer or an explicit stop. Once set, nothing is emitted or
    /// enqueued again.
    timer_stopped: AtomicBool,
    state: RwLock<SubscriptionState>,
    debug: bool,
}

struct SubscriptionState {
    monitored_items: HashMap<u32, MonitoredItem>,
    /// At most one event monitored item per node; later registrations
    /// overwrite earlier ones.
    monitored_events: HashMap<NodeId, u32>,
    /// Data changes waiting for the next emission, oldest first.
    triggered_data_changes: VecDeque<MonitoredItemNotification>,
    /// Events waiting for the next emission, oldest first.
    triggered_events: VecDeque<EventFieldList>,
    /// Emitted results awaiting acknowledgement, available for republish.
    not_acknowledged: VecDeque<PublishResult>,
    notification_sequence: Handle,
    /// Ticks since the last emission. Crossing the max keep alive count makes
    /// an empty notification due; crossing the lifetime count expires the
    /// subscription.
    keep_alive_count: u32,
    last_monitored_item_id: Handle,
    /// Forces the first tick to produce a result.
    startup: bool,
}

impl InternalSubscription {
    pub(crate) fn new(
        service: Weak<SubscriptionService>,
        address_space: AddressSpaceRef,
        data: SubscriptionData,
        callback: PublishCallback,
        debug: bool,
    ) -> InternalSubscription {
        InternalSubscription {
            data,
            service,
            address_space,
            callback,
            timer: PublishingTimer::new(),
            timer_stopped: AtomicBool::new(false),
            state: RwLock::new(SubscriptionState {
                monitored_items: HashMap::new(),
                monitored_events: HashMap::new(),
                triggered_data_changes: VecDeque::new(),
                triggered_events: VecDeque::new(),
                not_acknowledged: VecDeque::new(),
                notification_sequence: Handle::new(constants::FIRST_SEQUENCE_NUMBER),
                keep_alive_count: 0,
                last_monitored_item_id: Handle::new(1),
                startup: true,
            }),
            debug,
        }
    }

    pub fn subscription_id(&self) -> u32 {
        self.data.subscription_id
    }

    pub fn data(&self) -> &SubscriptionData {
        &self.data
    }

    /// Arms the publishing timer. The timer task keeps a strong reference to
    /// the subscription and is the sole driver of its tick.
    pub(crate) fn start(self: &Arc<Self>) {
        let interval = publishing_interval_from_ms(self.data.revised_publishing_interval);
        let subscription = Arc::clone(self);
        self.timer.arm(interval, move || subscription.tick());
    }

    /// Stops the subscription. Idempotent. The tick in flight, if any, runs
    /// to completion; anything arriving afterwards is dropped.
    pub fn stop(&self) {
        if !self.timer.is_cancelled() {
            self.timer.cancel();
        }
        self.timer_stopped.store(true, Ordering::SeqCst);
    }

    /// True once the subscription has terminally stopped.
    pub fn is_stopped(&self) -> bool {
        self.timer_stopped.load(Ordering::SeqCst)
    }

    /// True when the subscription has gone too many ticks without an
    /// outgoing publish.
    fn has_expired(&self) -> bool {
        let state = trace_read_lock!(self.state);
        let expired = state.keep_alive_count > self.data.revised_lifetime_count;
        if expired && self.debug {
            debug!(
                "Subscription {} has expired, keep alive count {} exceeds lifetime count {}",
                self.data.subscription_id, state.keep_alive_count, self.data.revised_lifetime_count
            );
        }
        expired
    }

    /// One pass of the publishing state machine. Returns false when the
    /// subscription is finished and the timer task should end.
    pub(crate) fn tick(&self) -> bool {
        // A dead service is equivalent to the timer being torn down under us
        let Some(service) = self.service.upgrade() else {
            self.timer_stopped.store(true, Ordering::SeqCst);
            return false;
        };
        if self.has_expired() {
            self.timer_stopped.store(true, Ordering::SeqCst);
            // Nothing may touch state past this point - the service is free
            // to delete the subscription now
            return false;
        }
        if self.has_publish_result() {
            if service.pop_publish_request(&self.data.session_token) {
                let result = self.pop_publish_result();
                if self.debug {
                    debug!(
                        "Subscription {} emitting sequence {} with {} notifications",
                        self.data.subscription_id,
                        result.message.sequence_number,
                        result.message.notification_data.len()
                    );
                }
                (self.callback)(result);
            } else {
                // Notifications are pending but the session holds no credit.
                // The starved tick still ages the subscription towards expiry.
                let mut state = trace_write_lock!(self.state);
                state.keep_alive_count += 1;
            }
        }
        true
    }

    /// Decides whether this tick produces a result. A tick that produces
    /// nothing counts towards the keep alive / lifetime counters.
    fn has_publish_result(&self) -> bool {
        let mut state = trace_write_lock!(self.state);
        if state.startup
            || !state.triggered_data_changes.is_empty()
            || !state.triggered_events.is_empty()
        {
            return true;
        }
        if state.keep_alive_count > self.data.revised_max_keep_alive_count {
            if self.debug {
                debug!(
                    "Subscription {} keep alive count {} exceeds max {}, empty notification is due",
                    self.data.subscription_id,
                    state.keep_alive_count,
                    self.data.revised_max_keep_alive_count
                );
            }
            return true;
        }
        state.keep_alive_count += 1;
        false
    }

    /// Assembles the emission: drains both queues into notification payloads,
    /// numbers the message and retains a copy for republish.
    fn pop_publish_result(&self) -> PublishResult {
        let mut state = trace_write_lock!(self.state);

        let mut notification_data = Vec::with_capacity(2);
        let mut statuses = Vec::with_capacity(2);
        if !state.triggered_data_changes.is_empty() {
            let monitored_items = state.triggered_data_changes.drain(..).collect();
            notification_data.push(NotificationData::DataChange(DataChangeNotification {
                monitored_items,
            }));
            statuses.push(StatusCode::Good);
        }
        if !state.triggered_events.is_empty() {
            let events = state.triggered_events.drain(..).collect();
            notification_data.push(NotificationData::Events(EventNotificationList { events }));
            statuses.push(StatusCode::Good);
        }
        // The status change slot of the message is reserved but never filled

        state.keep_alive_count = 0;
        state.startup = false;

        let sequence_number = state.notification_sequence.next();
        let available_sequence_numbers = state
            .not_acknowledged
            .iter()
            .map(|result| result.message.sequence_number)
            .collect();
        let result = PublishResult {
            subscription_id: self.data.subscription_id,
            available_sequence_numbers,
            more_notifications: false,
            message: NotificationMessage {
                sequence_number,
                publish_time: DateTime::now(),
                notification_data,
            },
            statuses,
        };
        state.not_acknowledged.push_back(result.clone());
        result
    }

    /// Creates one monitored item. Event notifier registrations go into the
    /// subscription's event table; anything else installs a data change
    /// callback with the address space. Either way the current value is read
    /// and queued so the first publish after creation reports it.
    pub(crate) fn create_monitored_item(
        self: &Arc<Self>,
        request: &MonitoredItemCreateRequest,
    ) -> MonitoredItemCreateResult {
        let monitored_item_id = {
            let mut state = trace_write_lock!(self.state);
            state.last_monitored_item_id.next()
        };

        let callback_handle = match AttributeId::from_u32(request.item_to_monitor.attribute_id) {
            Ok(AttributeId::EventNotifier) => {
                // An event subscription on the node. No address space
                // callback is involved.
                let mut state = trace_write_lock!(self.state);
                state
                    .monitored_events
                    .insert(request.item_to_monitor.node_id.clone(), monitored_item_id);
                0
            }
            Ok(attribute_id) => {
                // Register for data changes. The registration happens outside
                // the state lock - the address space may call straight back.
                let subscription = Arc::downgrade(self);
                let id = monitored_item_id;
                let callback_handle = self.address_space.add_data_change_callback(
                    &request.item_to_monitor.node_id,
                    attribute_id,
                    Box::new(move |_node_id, _attribute_id, value| {
                        if let Some(subscription) = subscription.upgrade() {
                            subscription.data_change(id, value.clone());
                        }
                    }),
                );
                if callback_handle == 0 {
                    error!(
                        "Address space refused a data change callback for {} / attribute {}",
                        request.item_to_monitor.node_id, request.item_to_monitor.attribute_id
                    );
                    return self.surrender_monitored_item_id(monitored_item_id);
                }
                callback_handle
            }
            Err(_) => {
                error!(
                    "Monitored item request addresses unknown attribute id {}",
                    request.item_to_monitor.attribute_id
                );
                return self.surrender_monitored_item_id(monitored_item_id);
            }
        };

        {
            let mut state = trace_write_lock!(self.state);
            state.monitored_items.insert(
                monitored_item_id,
                MonitoredItem::new(monitored_item_id, callback_handle, request),
            );
        }
        if self.debug {
            debug!(
                "Subscription {} created monitored item {} with client handle {}",
                self.data.subscription_id,
                monitored_item_id,
                request.requested_parameters.client_handle
            );
        }

        self.trigger_initial_value(request);

        MonitoredItemCreateResult {
            status: StatusCode::Good,
            monitored_item_id,
            // Sampling is not scheduled independently, it rides the
            // publishing interval
            revised_sampling_interval: self.data.revised_publishing_interval,
            revised_queue_size: request.requested_parameters.queue_size,
            filter: request.requested_parameters.filter.clone(),
        }
    }

    /// Rolls back a monitored item id that could not be put to use and
    /// returns the failed create result.
    fn surrender_monitored_item_id(&self, monitored_item_id: u32) -> MonitoredItemCreateResult {
        let mut state = trace_write_lock!(self.state);
        state.last_monitored_item_id.set_next(monitored_item_id);
        MonitoredItemCreateResult {
            status: StatusCode::BadNodeAttributesInvalid,
            monitored_item_id: 0,
            revised_sampling_interval: 0.0,
            revised_queue_size: 0,
            filter: MonitoringFilter::None,
        }
    }

    /// Reads the item's current value and queues it as a data change, so the
    /// first publish after creation reports current state.
    fn trigger_initial_value(&self, request: &MonitoredItemCreateRequest) {
        let values = self
            .address_space
            .read(std::slice::from_ref(&request.item_to_monitor));
        let Some(value) = values.into_iter().next() else {
            warn!(
                "Address space returned nothing for the initial read of {}",
                request.item_to_monitor.node_id
            );
            return;
        };
        let mut state = trace_write_lock!(self.state);
        state
            .triggered_data_changes
            .push_back(MonitoredItemNotification {
                client_handle: request.requested_parameters.client_handle,
                value,
            });
    }

    /// Deletes monitored items by id, unhooking their address space
    /// callbacks. Unknown ids report `BadMonitoredItemIdInvalid` without
    /// affecting the rest of the batch.
    pub(crate) fn delete_monitored_items_ids(
        &self,
        monitored_item_ids: &[u32],
    ) -> Vec<StatusCode> {
        let mut callback_handles = Vec::with_capacity(monitored_item_ids.len());
        let results = {
            let mut state = trace_write_lock!(self.state);
            monitored_item_ids
                .iter()
                .map(|id| {
                    state.monitored_events.retain(|_, item_id| item_id != id);
                    match state.monitored_items.remove(id) {
                        Some(item) => {
                            // Handle 0 means the item never had a callback
                            if item.callback_handle() != 0 {
                                callback_handles.push(item.callback_handle());
                            }
                            StatusCode::Good
                        }
                        None => StatusCode::BadMonitoredItemIdInvalid,
                    }
                })
                .collect()
        };
        // Unhook outside the subscription lock, the address space may take
        // its own locks to do this
        for callback_handle in callback_handles {
            self.address_space.delete_data_change_callback(callback_handle);
        }
        results
    }

    /// Deletes every monitored item, part of subscription teardown.
    pub(crate) fn delete_all_monitored_items(&self) {
        let ids: Vec<u32> = {
            let state = trace_read_lock!(self.state);
            state.monitored_items.keys().copied().collect()
        };
        let _ = self.delete_monitored_items_ids(&ids);
    }

    /// Drops the retained result with this sequence number, if any.
    pub(crate) fn acknowledge(&self, sequence_number: u32) {
        let mut state = trace_write_lock!(self.state);
        state
            .not_acknowledged
            .retain(|result| result.message.sequence_number != sequence_number);
    }

    /// Replays a previously emitted, still unacknowledged message. The copy
    /// stays retained until acknowledged.
    pub(crate) fn republish(&self, request: &RepublishRequest) -> RepublishResponse {
        let state = trace_read_lock!(self.state);
        match state
            .not_acknowledged
            .iter()
            .find(|result| result.message.sequence_number == request.retransmit_sequence_number)
        {
            Some(result) => RepublishResponse {
                response_header: ResponseHeader::new_good(),
                notification_message: result.message.clone(),
            },
            None => RepublishResponse {
                response_header: ResponseHeader::new_service_result(
                    StatusCode::BadMessageNotAvailable,
                ),
                notification_message: NotificationMessage::keep_alive(0, DateTime::now()),
            },
        }
    }

    /// Delivers an event raised against `node` to the subscription's event
    /// item for that node, if there is one.
    pub(crate) fn trigger_event(&self, node: &NodeId, event: &Event) {
        if self.timer_stopped.load(Ordering::SeqCst) {
            return;
        }
        let monitored_item_id = {
            let state = trace_read_lock!(self.state);
            state.monitored_events.get(node).copied()
        };
        match monitored_item_id {
            Some(monitored_item_id) => self.enqueue_event(monitored_item_id, event),
            None => {
                if self.debug {
                    debug!(
                        "Subscription {} has no event subscription for node {}",
                        self.data.subscription_id, node
                    );
                }
            }
        }
    }

    fn enqueue_event(&self, monitored_item_id: u32, event: &Event) {
        let mut state = trace_write_lock!(self.state);
        let Some(item) = state.monitored_items.get(&monitored_item_id) else {
            debug!(
                "Event for monitored item {} which is already deleted",
                monitored_item_id
            );
            return;
        };
        if !item.is_reporting() {
            return;
        }
        let client_handle = item.client_handle();
        let event_fields = match item.filter() {
            MonitoringFilter::Event(filter) => event_filter::event_fields(filter, event),
            MonitoringFilter::None => Vec::new(),
        };
        state.triggered_events.push_back(EventFieldList {
            client_handle,
            event_fields,
        });
    }

    /// Target of the address space data change callbacks. Callbacks landing
    /// after the item vanished or the subscription stopped are dropped.
    pub(crate) fn data_change(&self, monitored_item_id: u32, value: DataValue) {
        if self.timer_stopped.load(Ordering::SeqCst) {
            return;
        }
        let mut state = trace_write_lock!(self.state);
        let Some(item) = state.monitored_items.get(&monitored_item_id) else {
            debug!(
                "Data change callback for unknown monitored item {}",
                monitored_item_id
            );
            return;
        };
        if !item.is_reporting() {
            return;
        }
        let client_handle = item.client_handle();
        if self.debug {
            debug!(
                "Subscription {} queued data change for client handle {}",
                self.data.subscription_id, client_handle
            );
        }
        state
            .triggered_data_changes
            .push_back(MonitoredItemNotification {
                client_handle,
                value,
            });
    }

    pub(crate) fn metrics(&self) -> SubscriptionMetrics {
        let state = trace_read_lock!(self.state);
        SubscriptionMetrics {
            subscription_id: self.data.subscription_id,
            monitored_item_count: state.monitored_items.len(),
            queued_data_changes: state.triggered_data_changes.len(),
            queued_events: state.triggered_events.len(),
            not_acknowledged: state.not_acknowledged.len(),
            keep_alive_count: state.keep_alive_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Weak};

    use super::InternalSubscription;
    use crate::subscriptions::tests::TestAddressSpace;
    use crate::types::{
        DataValue, NodeId, RepublishRequest, RequestHeader, StatusCode, SubscriptionData,
    };

    fn new_subscription(max_keep_alive_count: u32) -> (Arc<InternalSubscription>, Arc<TestAddressSpace>) {
        let address_space = Arc::new(TestAddressSpace::new());
        let data = SubscriptionData {
            subscription_id: 1,
            revised_publishing_interval: 100.0,
            revised_lifetime_count: 10,
            revised_max_keep_alive_count: max_keep_alive_count,
            session_token: NodeId::new(1, "session"),
        };
        let subscription = Arc::new(InternalSubscription::new(
            Weak::new(),
            address_space.clone(),
            data,
            Box::new(|_| {}),
            false,
        ));
        (subscription, address_space)
    }

    fn republish_request(retransmit_sequence_number: u32) -> RepublishRequest {
        RepublishRequest {
            request_header: RequestHeader::new(NodeId::new(1, "session")),
            subscription_id: 1,
            retransmit_sequence_number,
        }
    }

    #[test]
    fn startup_forces_first_result() {
        let (subscription, _) = new_subscription(3);
        assert!(subscription.has_publish_result());
        let result = subscription.pop_publish_result();
        assert_eq!(result.message.sequence_number, 1);
        assert!(result.message.is_keep_alive());
        assert!(result.available_sequence_numbers.is_empty());
        // Startup is spent, the next tick has nothing
        assert!(!subscription.has_publish_result());
    }

    #[test]
    fn keep_alive_count_crossing_max_forces_result() {
        let (subscription, _) = new_subscription(3);
        let _ = subscription.pop_publish_result();
        // Four quiet ticks are absorbed; the fifth finds the counter past
        // the max and reports a pending keep alive
        for _ in 0..4 {
            assert!(!subscription.has_publish_result());
        }
        assert!(subscription.has_publish_result());
        let result = subscription.pop_publish_result();
        assert_eq!(result.message.sequence_number, 2);
        assert!(result.message.is_keep_alive());
    }

    #[test]
    fn emission_drains_queues_and_numbers_messages() {
        let (subscription, address_space) = new_subscription(3);
        subscription.create_monitored_item(&crate::subscriptions::tests::value_item_request(
            &NodeId::new(2, "v1"),
            99,
        ));
        address_space.set_value(&NodeId::new(2, "v1"), DataValue::new_now(42));

        let result = subscription.pop_publish_result();
        assert_eq!(result.message.sequence_number, 1);
        assert!(result.available_sequence_numbers.is_empty());
        assert_eq!(result.statuses, vec![StatusCode::Good]);
        let data_changes = result.message.data_changes().unwrap();
        // Initial read plus the explicit change
        assert_eq!(data_changes.monitored_items.len(), 2);
        assert!(data_changes
            .monitored_items
            .iter()
            .all(|n| n.client_handle == 99));

        // Queues are drained, the next emission is a keep alive and knows
        // about the unacknowledged first message
        let result = subscription.pop_publish_result();
        assert_eq!(result.message.sequence_number, 2);
        assert_eq!(result.available_sequence_numbers, vec![1]);
        assert!(result.message.is_keep_alive());
    }

    #[test]
    fn republish_until_acknowledged() {
        let (subscription, _) = new_subscription(3);
        let emitted = subscription.pop_publish_result();

        let replayed = subscription.republish(&republish_request(1));
        assert_eq!(replayed.response_header.service_result, StatusCode::Good);
        assert_eq!(replayed.notification_message, emitted.message);

        subscription.acknowledge(1);
        let replayed = subscription.republish(&republish_request(1));
        assert_eq!(
            replayed.response_header.service_result,
            StatusCode::BadMessageNotAvailable
        );
    }

    #[test]
    fn acknowledge_of_unknown_sequence_is_harmless() {
        let (subscription, _) = new_subscription(3);
        let _ = subscription.pop_publish_result();
        subscription.acknowledge(99);
        let replayed = subscription.republish(&republish_request(1));
        assert_eq!(replayed.response_header.service_result, StatusCode::Good);
    }

    #[test]
    fn stopped_subscription_drops_late_arrivals() {
        let (subscription, address_space) = new_subscription(3);
        subscription.create_monitored_item(&crate::subscriptions::tests::value_item_request(
            &NodeId::new(2, "v1"),
            7,
        ));
        let _ = subscription.pop_publish_result();

        subscription.stop();
        assert!(subscription.is_stopped());
        address_space.set_value(&NodeId::new(2, "v1"), DataValue::new_now(1));
        // The change arrived after stop, nothing is pending
        assert!(!subscription.has_publish_result());
    }
}
