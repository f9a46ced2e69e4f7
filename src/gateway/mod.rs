//! Reply Gateway
//!
//! Boundary with the origin system's event bus: request/reply envelopes,
//! reply delivery and the deployment sync handler.

pub mod handler;
pub mod message;
pub mod reply;

pub use handler::*;
pub use message::*;
pub use reply::*;
