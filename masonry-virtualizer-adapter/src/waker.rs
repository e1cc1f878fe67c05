use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};
use core::task::Waker;

use futures_task::{ArcWake, waker};

/// Waker that only records that a frame was requested.
///
/// Hosts without an executor hand [`FrameWaker::waker`] to
/// [`Controller::tick_with`](crate::Controller::tick_with) and check [`FrameWaker::take`] on
/// their frame timer: when the measurement future wakes, the next frame should tick again.
#[derive(Debug, Default)]
pub struct FrameWaker {
    requested: AtomicBool,
}

impl FrameWaker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn waker(self: &Arc<Self>) -> Waker {
        waker(Arc::clone(self))
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }

    /// Returns whether a frame was requested and clears the flag.
    pub fn take(&self) -> bool {
        self.requested.swap(false, Ordering::AcqRel)
    }
}

impl ArcWake for FrameWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.requested.store(true, Ordering::Release);
    }
}
