//! Publish/Subscribe Module
//!
//! An in-process broker independent of the key-value store. Each
//! [`Subscription`] owns a bounded Tokio channel; [`Broker::publish`] fans a
//! message out to every subscription registered on the channel without ever
//! blocking the publisher.
//!
//! ## Example
//!
//! ```
//! use localstore::pubsub::{Broker, MessageKind};
//! use std::sync::Arc;
//!
//! let broker = Arc::new(Broker::new(16));
//! let mut sub = broker.subscribe(&["events"]);
//!
//! // The first message confirms the subscription
//! assert_eq!(sub.try_receive().unwrap().kind, MessageKind::Subscription);
//!
//! assert_eq!(broker.publish("events", "started").unwrap(), 1);
//! assert_eq!(sub.try_receive().unwrap().payload, "started");
//!
//! sub.close().unwrap();
//! assert!(sub.close().is_err());
//! ```

pub mod broker;

pub use broker::{Broker, Message, MessageKind, Subscription};
