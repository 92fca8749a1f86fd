//! API Module
//!
//! The engine facade and the operation families it implements. Each family
//! is a trait so callers can depend on just the slice of the API they use:
//!
//! - [`KeyValueStore`]: strings, counters, expiry and key enumeration
//! - [`ListStore`]: double-ended binary lists
//! - [`SetStore`] and [`SortedSetStore`]: member collections
//! - [`Queue`]: publish/subscribe over the in-process broker
//! - [`Flusher`]: clearing everything
//!
//! All of them are implemented by [`Engine`].

pub mod engine;
pub mod keyvalue;
pub mod list;
pub mod queue;
pub mod set;
pub mod sorted_set;

// Re-export commonly used types
pub use engine::{Engine, Flusher};
pub use keyvalue::KeyValueStore;
pub use list::ListStore;
pub use queue::Queue;
pub use set::SetStore;
pub use sorted_set::{ScoreBound, SortedSetStore};
