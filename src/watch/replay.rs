//! Scripted pod event source
//!
//! Replays a fixed sequence of events, then either finishes or idles until
//! cancelled. Used by tests and benches in place of a live cluster.

use crate::domain::ports::{PodEventHandler, PodEventSource};
use crate::error::Result;
use crate::watch::events::PodEvent;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Event source replaying a scripted sequence
#[derive(Debug, Default)]
pub struct ReplaySource {
    events: VecDeque<PodEvent>,
    hold_open: bool,
}

impl ReplaySource {
    /// Replay `events` then finish
    pub fn new(events: Vec<PodEvent>) -> Self {
        Self {
            events: events.into(),
            hold_open: false,
        }
    }

    /// Source with no events that stays open until cancelled
    pub fn pending() -> Self {
        Self {
            events: VecDeque::new(),
            hold_open: true,
        }
    }

    /// Keep the source open after the last event, like a live watch
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait]
impl PodEventSource for ReplaySource {
    async fn run(
        &mut self,
        handler: Arc<dyn PodEventHandler>,
        shutdown: CancellationToken,
    ) -> Result<()> {
        while let Some(event) = self.events.pop_front() {
            if shutdown.is_cancelled() {
                return Ok(());
            }
            event.dispatch(handler.as_ref());
        }

        if self.hold_open {
            shutdown.cancelled().await;
        }
        Ok(())
    }
}
