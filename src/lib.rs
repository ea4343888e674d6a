// SPDX-License-Identifier: MPL-2.0

//! The subscription engine of an OPC UA server. It maintains client-requested
//! live views over an address space: subscriptions tick on their publishing
//! interval, monitored items feed data change and event notifications into
//! per-subscription queues, and queued notifications are paid out against the
//! publish requests the owning session has deposited with the service.
//!
//! The address space itself, the binary codec and the transport are outside
//! this crate - the engine talks to the address space through the
//! [`AddressSpace`](address_space::AddressSpace) trait and hands finished
//! [`PublishResult`](subscriptions::PublishResult)s to a callback.

#[macro_use]
extern crate log;

/// Tracing macro for obtaining a lock on a `Mutex`. Sometimes deadlocks can happen in code,
/// and if they do, this macro is useful for finding out where they happened.
#[macro_export]
macro_rules! trace_lock {
    ( $x:expr ) => {{
        //            use std::thread;
        //            trace!("Thread {:?}, {} locking at {}, line {}", thread::current().id(), stringify!($x), file!(), line!());
        let v = $x.lock();
        //            trace!("Thread {:?}, {} lock completed", thread::current().id(), stringify!($x));
        v
    }};
}

/// Tracing macro for obtaining a read lock on a `RwLock`.
#[macro_export]
macro_rules! trace_read_lock {
    ( $x:expr ) => {{
        //            use std::thread;
        //            trace!("Thread {:?}, {} read locking at {}, line {}", thread::current().id(), stringify!($x), file!(), line!());
        let v = $x.read();
        //            trace!("Thread {:?}, {} read lock completed", thread::current().id(), stringify!($x));
        v
    }};
}

/// Tracing macro for obtaining a write lock on a `RwLock`.
#[macro_export]
macro_rules! trace_write_lock {
    ( $x:expr ) => {{
        //            use std::thread;
        //            trace!("Thread {:?}, {} write locking at {}, line {}", thread::current().id(), stringify!($x), file!(), line!());
        let v = $x.write();
        //            trace!("Thread {:?}, {} write lock completed", thread::current().id(), stringify!($x));
        v
    }};
}

pub mod address_space;
pub mod constants;
pub mod events;
pub mod handle;
pub mod subscriptions;
pub mod types;

pub mod prelude {
    pub use crate::address_space::*;
    pub use crate::events::event::Event;
    pub use crate::subscriptions::service::SubscriptionService;
    pub use crate::subscriptions::{PublishCallback, PublishResult};
    pub use crate::types::*;
}
