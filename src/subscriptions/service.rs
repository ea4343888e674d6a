// SPDX-License-Identifier: MPL-2.0

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;

use crate::address_space::AddressSpaceRef;
use crate::constants;
use crate::events::event::Event;
use crate::handle::Handle;
use crate::subscriptions::subscription::InternalSubscription;
use crate::subscriptions::PublishCallback;
use crate::types::{
    ByteString, CreateMonitoredItemsRequest, CreateSubscriptionRequest, DateTime,
    DeleteMonitoredItemsRequest, MonitoredItemCreateResult, MonitoringFilter, NodeId,
    NotificationMessage, PublishRequest, RepublishRequest, RepublishResponse, ResponseHeader,
    StatusCode, SubscriptionData,
};

/// The subscription service. Owns every subscription by id, banks publish
/// request credit per session and fans events out to subscriptions.
///
/// One reader-writer lock protects the registry and the credit map; lookups
/// and event fan-out take it shared, anything that creates, deletes or spends
/// takes it exclusive. Subscriptions lock themselves - the order is always
/// service then subscription.
pub struct SubscriptionService {
    address_space: AddressSpaceRef,
    state: RwLock<ServiceState>,
    event_ids: EventIdGenerator,
    debug: bool,
}

struct ServiceState {
    subscriptions: HashMap<u32, Arc<InternalSubscription>>,
    /// Outstanding publish requests per session, each one credit for one
    /// emission, capped at `MAX_PUBLISH_REQUESTS_PER_SESSION`.
    publish_request_credits: HashMap<NodeId, u32>,
    last_subscription_id: Handle,
}

impl SubscriptionService {
    /// Creates the service. Must be called from within a tokio runtime since
    /// subscriptions spawn their publishing timers onto it.
    pub fn new(address_space: AddressSpaceRef, debug: bool) -> Arc<SubscriptionService> {
        Arc::new(SubscriptionService {
            address_space,
            state: RwLock::new(ServiceState {
                subscriptions: HashMap::new(),
                publish_request_credits: HashMap::new(),
                last_subscription_id: Handle::new(1),
            }),
            event_ids: EventIdGenerator::new(),
            debug,
        })
    }

    /// Creates a subscription for the session named in the request header and
    /// starts its publishing timer. The revised values echo the request; the
    /// callback will see every result the subscription emits.
    pub fn create_subscription(
        self: &Arc<Self>,
        request: &CreateSubscriptionRequest,
        callback: PublishCallback,
    ) -> SubscriptionData {
        let mut state = trace_write_lock!(self.state);
        let data = SubscriptionData {
            subscription_id: state.last_subscription_id.next(),
            revised_publishing_interval: request.requested_publishing_interval,
            revised_lifetime_count: request.requested_lifetime_count,
            revised_max_keep_alive_count: request.requested_max_keep_alive_count,
            session_token: request.request_header.authentication_token.clone(),
        };
        if self.debug {
            debug!("Creating subscription {}", data.subscription_id);
        }
        let subscription = Arc::new(InternalSubscription::new(
            Arc::downgrade(self),
            self.address_space.clone(),
            data.clone(),
            callback,
            self.debug,
        ));
        subscription.start();
        state
            .subscriptions
            .insert(data.subscription_id, subscription);
        data
    }

    /// Deletes subscriptions by id, stopping their timers and unhooking their
    /// monitored items. Unknown ids report `BadSubscriptionIdInvalid` in
    /// their slot; deleting the same id twice reports it on the second pass.
    pub fn delete_subscriptions(&self, subscription_ids: &[u32]) -> Vec<StatusCode> {
        let mut deleted = Vec::with_capacity(subscription_ids.len());
        let results = {
            let mut state = trace_write_lock!(self.state);
            subscription_ids
                .iter()
                .map(|subscription_id| match state.subscriptions.remove(subscription_id) {
                    Some(subscription) => {
                        if self.debug {
                            debug!("Deleting subscription {}", subscription_id);
                        }
                        deleted.push(subscription);
                        StatusCode::Good
                    }
                    None => {
                        error!(
                            "Got a request to delete non existing subscription {}",
                            subscription_id
                        );
                        StatusCode::BadSubscriptionIdInvalid
                    }
                })
                .collect()
        };
        // Stop and unhook outside the registry lock - unhooking calls into
        // the address space
        for subscription in deleted {
            subscription.stop();
            subscription.delete_all_monitored_items();
        }
        results
    }

    /// Deletes every subscription in the registry.
    pub fn delete_all_subscriptions(&self) {
        let subscription_ids: Vec<u32> = {
            let state = trace_read_lock!(self.state);
            state.subscriptions.keys().copied().collect()
        };
        let _ = self.delete_subscriptions(&subscription_ids);
    }

    /// Creates monitored items on a subscription. An unknown subscription id
    /// yields a `BadSubscriptionIdInvalid` result per requested item so the
    /// response always matches the request's shape.
    pub fn create_monitored_items(
        &self,
        request: &CreateMonitoredItemsRequest,
    ) -> Vec<MonitoredItemCreateResult> {
        let state = trace_write_lock!(self.state);
        match state.subscriptions.get(&request.subscription_id) {
            Some(subscription) => request
                .items_to_create
                .iter()
                .map(|item| subscription.create_monitored_item(item))
                .collect(),
            None => request
                .items_to_create
                .iter()
                .map(|_| MonitoredItemCreateResult {
                    status: StatusCode::BadSubscriptionIdInvalid,
                    monitored_item_id: 0,
                    revised_sampling_interval: 0.0,
                    revised_queue_size: 0,
                    filter: MonitoringFilter::None,
                })
                .collect(),
        }
    }

    /// Deletes monitored items from a subscription; same uniform error shape
    /// as `create_monitored_items` when the subscription is unknown.
    pub fn delete_monitored_items(&self, request: &DeleteMonitoredItemsRequest) -> Vec<StatusCode> {
        let state = trace_write_lock!(self.state);
        match state.subscriptions.get(&request.subscription_id) {
            Some(subscription) => {
                subscription.delete_monitored_items_ids(&request.monitored_item_ids)
            }
            None => request
                .monitored_item_ids
                .iter()
                .map(|_| StatusCode::BadSubscriptionIdInvalid)
                .collect(),
        }
    }

    /// Banks one publish request credit for the requesting session, capped at
    /// the per-session maximum, and routes the request's acknowledgements to
    /// their subscriptions.
    pub fn publish(&self, request: &PublishRequest) {
        let mut state = trace_write_lock!(self.state);
        let session = &request.request_header.authentication_token;
        let credits = state
            .publish_request_credits
            .entry(session.clone())
            .or_insert(0);
        if *credits < constants::MAX_PUBLISH_REQUESTS_PER_SESSION {
            *credits += 1;
        } else {
            debug!(
                "Session {} already has the maximum of outstanding publish requests, dropping",
                session
            );
        }
        for ack in &request.subscription_acknowledgements {
            if let Some(subscription) = state.subscriptions.get(&ack.subscription_id) {
                subscription.acknowledge(ack.sequence_number);
            }
        }
    }

    /// Replays a retained notification from a subscription's retransmission
    /// queue.
    pub fn republish(&self, request: &RepublishRequest) -> RepublishResponse {
        let state = trace_read_lock!(self.state);
        match state.subscriptions.get(&request.subscription_id) {
            Some(subscription) => subscription.republish(request),
            None => RepublishResponse {
                response_header: ResponseHeader::new_service_result(
                    StatusCode::BadSubscriptionIdInvalid,
                ),
                notification_message: NotificationMessage::keep_alive(0, DateTime::now()),
            },
        }
    }

    /// Spends one publish request credit of the session if it has any.
    /// Called by subscriptions at emit time.
    pub(crate) fn pop_publish_request(&self, session: &NodeId) -> bool {
        let mut state = trace_write_lock!(self.state);
        match state.publish_request_credits.get_mut(session) {
            None => {
                warn!("Publish queue requested for unknown session {}", session);
                false
            }
            Some(0) => {
                warn!(
                    "Missing publish request, cannot send a response for session {}",
                    session
                );
                false
            }
            Some(credits) => {
                *credits -= 1;
                true
            }
        }
    }

    /// Delivers an event raised against `node` to every subscription holding
    /// an event item for it. An event without an id gets a generated one, the
    /// same for all receivers.
    pub fn trigger_event(&self, node: &NodeId, event: Event) {
        let mut event = event;
        // A fresh id must exist by delivery time; events the caller did not
        // stamp get one here
        if event.event_id.is_null_or_empty() {
            event.event_id = self.event_ids.next();
        }
        let state = trace_read_lock!(self.state);
        for subscription in state.subscriptions.values() {
            subscription.trigger_event(node, &event);
        }
    }

    /// Snapshot of the engine state for diagnostics.
    pub fn metrics(&self) -> Metrics {
        let state = trace_read_lock!(self.state);
        let mut subscriptions: Vec<SubscriptionMetrics> = state
            .subscriptions
            .values()
            .map(|subscription| subscription.metrics())
            .collect();
        subscriptions.sort_by_key(|m| m.subscription_id);
        let sessions = state
            .publish_request_credits
            .iter()
            .map(|(session_token, credits)| SessionCredits {
                session_token: session_token.clone(),
                publish_request_credits: *credits,
            })
            .collect();
        Metrics {
            subscriptions,
            sessions,
        }
    }

    #[cfg(test)]
    pub(crate) fn subscription(&self, subscription_id: u32) -> Option<Arc<InternalSubscription>> {
        let state = trace_read_lock!(self.state);
        state.subscriptions.get(&subscription_id).cloned()
    }

    #[cfg(test)]
    pub(crate) fn publish_request_credits(&self, session: &NodeId) -> u32 {
        let state = trace_read_lock!(self.state);
        state
            .publish_request_credits
            .get(session)
            .copied()
            .unwrap_or(0)
    }
}

impl Drop for SubscriptionService {
    fn drop(&mut self) {
        self.delete_all_subscriptions();
    }
}

/// Diagnostic snapshot of the service.
#[derive(Debug, Clone, Serialize)]
pub struct Metrics {
    pub subscriptions: Vec<SubscriptionMetrics>,
    pub sessions: Vec<SessionCredits>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionMetrics {
    pub subscription_id: u32,
    pub monitored_item_count: usize,
    pub queued_data_changes: usize,
    pub queued_events: usize,
    pub not_acknowledged: usize,
    pub keep_alive_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionCredits {
    pub session_token: NodeId,
    pub publish_request_credits: u32,
}

/// Produces event ids for events arriving without one. Ids are opaque and
/// unique on a best effort basis only. The generator owns its RNG so the
/// service does not depend on ambient thread local state.
struct EventIdGenerator {
    rng: Mutex<StdRng>,
}

impl EventIdGenerator {
    fn new() -> EventIdGenerator {
        EventIdGenerator {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    fn next(&self) -> ByteString {
        let mut rng = trace_lock!(self.rng);
        let id: Vec<u8> = (0..constants::EVENT_ID_LENGTH)
            .map(|_| rng.gen::<u32>() as u8)
            .collect();
        ByteString::from(id)
    }
}

#[cfg(test)]
mod tests {
    use super::EventIdGenerator;
    use crate::constants;

    #[test]
    fn event_ids_are_opaque_and_vary() {
        let generator = EventIdGenerator::new();
        let a = generator.next();
        let b = generator.next();
        assert_eq!(a.as_ref().len(), constants::EVENT_ID_LENGTH);
        assert_eq!(b.as_ref().len(), constants::EVENT_ID_LENGTH);
        // Uniqueness is best effort; consecutive draws colliding would mean
        // the RNG is broken
        assert_ne!(a, b);
    }
}
