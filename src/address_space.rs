// SPDX-License-Identifier: MPL-2.0

//! The address space seen from the subscription engine. The engine only ever
//! reads attribute values and installs / removes data change callbacks; the
//! full node management surface belongs to the server proper.

use std::sync::Arc;

use crate::types::{AttributeId, DataValue, NodeId, ReadValueId};

/// Callback installed against a `(node, attribute)` pair. Invoked by the
/// address space whenever the attribute's value changes, from whichever
/// thread performed the write.
pub type DataChangeCallback = Box<dyn Fn(&NodeId, AttributeId, &DataValue) + Send + Sync>;

/// Operations the engine consumes from the server's address space.
///
/// Implementations must be callable from any thread. Callbacks may fire at
/// any time after `add_data_change_callback` returns, including while the
/// subscription that installed them is being torn down - the engine drops
/// stale deliveries itself.
pub trait AddressSpace: Send + Sync {
    /// Reads the current value of each requested attribute, one `DataValue`
    /// per entry in `nodes_to_read`, in order.
    fn read(&self, nodes_to_read: &[ReadValueId]) -> Vec<DataValue>;

    /// Installs a data change callback for the node / attribute pair and
    /// returns its handle. A handle of 0 means the address space refused the
    /// registration, e.g. because the node or attribute does not exist.
    fn add_data_change_callback(
        &self,
        node: &NodeId,
        attribute_id: AttributeId,
        callback: DataChangeCallback,
    ) -> u32;

    /// Removes a previously installed callback. Idempotent.
    fn delete_data_change_callback(&self, handle: u32);
}

/// Shared handle to the address space collaborator.
pub type AddressSpaceRef = Arc<dyn AddressSpace>;
