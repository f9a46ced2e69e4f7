//! API Module
//!
//! REST surface for inbound deployment sync events and pod status reads.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
