//! Region emission rate limiting
//!
//! Camera-movement messages are limited to one per interval during
//! continuous interaction; the withheld trailing state is flushed on
//! gesture end so the final camera state is always delivered.

use std::time::{Duration, Instant};

use vista_protocol::ViewState;

#[derive(Debug)]
pub struct RegionThrottle {
    interval: Duration,
    last_emit: Option<Instant>,
    /// Latest state withheld by the rate limit
    pending: Option<ViewState>,
}

impl RegionThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_emit: None,
            pending: None,
        }
    }

    /// Offer a state during continuous interaction; returns it when the
    /// interval allows an emission, otherwise withholds it
    pub fn offer(&mut self, view: ViewState, now: Instant) -> Option<ViewState> {
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.interval => {
                self.pending = Some(view);
                None
            }
            _ => {
                self.last_emit = Some(now);
                self.pending = None;
                Some(view)
            }
        }
    }

    /// Emit unconditionally (discrete camera moves), resetting the window
    pub fn force(&mut self, view: ViewState, now: Instant) -> ViewState {
        self.last_emit = Some(now);
        self.pending = None;
        view
    }

    /// Flush the withheld trailing state at gesture end
    pub fn finish(&mut self, now: Instant) -> Option<ViewState> {
        let view = self.pending.take()?;
        self.last_emit = Some(now);
        Some(view)
    }
}
