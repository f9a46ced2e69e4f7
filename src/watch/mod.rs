//! Pod Watch Module
//!
//! Keeps a live, concurrently readable cache of the pods this agent owns:
//! - Typed add/update/delete events derived from list-then-watch
//! - Ownership label filtering
//! - Single-lock pod cache with copy-on-read access
//! - Watcher lifecycle and cancellation

pub mod cache;
pub mod events;
pub mod filter;
pub mod kube_source;
pub mod replay;
pub mod watcher;

pub use cache::*;
pub use events::*;
pub use filter::*;
pub use kube_source::*;
pub use replay::*;
pub use watcher::*;
