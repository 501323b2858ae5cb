//! Timers backed by `setTimeout`.

use std::time::Duration;

use folio_core::Timer;
use gloo_timers::callback::Timeout;
use gloo_timers::future::TimeoutFuture;

/// `Timer` for the readiness poll.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlooTimer;

impl Timer for GlooTimer {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> {
        TimeoutFuture::new(duration_ms(duration))
    }
}

fn duration_ms(duration: Duration) -> u32 {
    duration.as_millis().min(u32::MAX as u128) as u32
}

/// One pending callback that expires transient messages.
///
/// Scheduling replaces (and so cancels) the previous timeout.
#[derive(Default)]
pub struct MessageTimer {
    pending: Option<Timeout>,
}

impl MessageTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, after: Duration, callback: impl FnOnce() + 'static) {
        self.pending = Some(Timeout::new(duration_ms(after), callback));
    }

    pub fn cancel(&mut self) {
        if let Some(timeout) = self.pending.take() {
            timeout.cancel();
        }
    }

    pub fn is_scheduled(&self) -> bool {
        self.pending.is_some()
    }
}
