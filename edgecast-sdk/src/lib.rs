//! Shared types for Edgecast.
//!
//! The `objects` module holds everything that crosses a process boundary:
//! canonical game events submitted by upstream collectors, alerts produced
//! by the detector, WebSocket frames exchanged with subscribers and the
//! request/response bodies of the HTTP API.
//!
//! Enable the `client` feature for typed HTTP and WebSocket clients.

pub mod objects;

#[cfg(feature = "client")]
pub mod client;
