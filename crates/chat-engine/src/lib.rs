//! chat-engine: Chat Session Synchronization Engine
//!
//! Owns a live connection to a chat backend for one user at a time,
//! keeps the authoritative message log and unread state, and pushes
//! consistent snapshots to a single subscriber.

pub mod controller;
pub mod observer;
pub mod transport;

pub use controller::{ConnectionState, SessionController, SessionUpdate};
pub use observer::{ObserverSlot, UpdateHandler};
pub use transport::{InboundEvent, InboundMessage, OutboundRequest, Transport, TransportConnection};
