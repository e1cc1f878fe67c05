use alloc::boxed::Box;
use core::fmt;
use core::future::{Future, poll_fn};
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use masonry_virtualizer::{
    ColumnAssigner, ConfigError, Item, ItemsDiff, KeyCacheKey, MasonryOptions, MeasureTicket,
    Placement,
};

use crate::Measure;

/// Outcome of one controller frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Tick {
    /// Every known item is placed.
    Idle,
    /// Items are queued but the viewport width is still unknown.
    AwaitingViewport,
    /// The measurement in flight has not resolved yet.
    Pending,
    Placed(Placement),
    /// A measurement resolved for an item the layout no longer expects.
    Dropped,
}

struct InFlight<F> {
    ticket: MeasureTicket,
    future: Pin<Box<F>>,
}

/// A framework-neutral driver that feeds a [`ColumnAssigner`] from an async [`Measure`].
///
/// It holds no UI objects. Adapters forward UI events (`set_items`, `set_viewport_width`,
/// `set_scroll`, `update_item_height`) and call [`Self::tick`] once per frame. Each tick polls the
/// measurement in flight once and places at most one item, so a burst of new items is spread
/// across frames.
///
/// Cancellation is dropping the future: whenever the collection or the column count changes, the
/// measurement in flight is abandoned by the layout and its future is dropped here before the next
/// poll.
pub struct Controller<K, T, M: Measure<K, T>> {
    layout: ColumnAssigner<K, T>,
    measure: M,
    in_flight: Option<InFlight<M::Future>>,
}

impl<K: KeyCacheKey, T, M: Measure<K, T>> Controller<K, T, M> {
    pub fn new(options: MasonryOptions, measure: M) -> Result<Self, ConfigError> {
        Ok(Self::from_layout(ColumnAssigner::new(options)?, measure))
    }

    pub fn from_layout(layout: ColumnAssigner<K, T>, measure: M) -> Self {
        Self {
            layout,
            measure,
            in_flight: None,
        }
    }

    pub fn layout(&self) -> &ColumnAssigner<K, T> {
        &self.layout
    }

    /// Direct access to the layout.
    ///
    /// Mutations that abandon the current measurement are picked up on the next tick.
    pub fn layout_mut(&mut self) -> &mut ColumnAssigner<K, T> {
        &mut self.layout
    }

    pub fn into_layout(self) -> ColumnAssigner<K, T> {
        self.layout
    }

    pub fn measurer(&self) -> &M {
        &self.measure
    }

    pub fn measurer_mut(&mut self) -> &mut M {
        &mut self.measure
    }

    /// True while a measurement future is held.
    pub fn is_measuring(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_idle(&self) -> bool {
        self.in_flight.is_none() && self.layout.is_idle()
    }

    pub fn set_options(&mut self, options: MasonryOptions) -> Result<(), ConfigError> {
        self.layout.set_options(options)?;
        self.sync();
        Ok(())
    }

    pub fn set_items(&mut self, items: impl IntoIterator<Item = Item<K, T>>) -> ItemsDiff {
        let diff = self.layout.set_items(items);
        self.sync();
        diff
    }

    pub fn set_viewport_width(&mut self, width: u32) {
        self.layout.set_viewport_width(width);
        self.sync();
    }

    pub fn set_scroll(&mut self, scroll_offset: u64, viewport_height: u32) {
        self.layout.set_scroll(scroll_offset, viewport_height);
    }

    pub fn update_item_height(&mut self, id: &K, new_height: u32) -> i64 {
        self.layout.update_item_height(id, new_height)
    }

    pub fn update_height(&mut self, column: usize, row: usize, new_height: u32) -> i64 {
        self.layout.update_height(column, row, new_height)
    }

    /// Runs one frame with a no-op waker.
    ///
    /// Suitable for hosts that tick on a timer anyway; a pending future is simply polled again
    /// next frame.
    pub fn tick(&mut self) -> Tick {
        self.tick_with(futures_task::noop_waker_ref())
    }

    /// Runs one frame; `waker` is woken when a pending measurement can make progress.
    pub fn tick_with(&mut self, waker: &Waker) -> Tick {
        let mut cx = Context::from_waker(waker);
        self.poll_tick(&mut cx)
    }

    pub fn poll_tick(&mut self, cx: &mut Context<'_>) -> Tick {
        self.sync();

        if self.in_flight.is_none() {
            match self.start() {
                Some(in_flight) => self.in_flight = Some(in_flight),
                None if self.layout.is_idle() => return Tick::Idle,
                None => return Tick::AwaitingViewport,
            }
        }
        let Some(in_flight) = self.in_flight.as_mut() else {
            return Tick::Idle;
        };

        let result = match in_flight.future.as_mut().poll(cx) {
            Poll::Pending => return Tick::Pending,
            Poll::Ready(result) => result,
        };
        let ticket = in_flight.ticket;
        self.in_flight = None;

        match self.layout.resolve_measurement(ticket, result) {
            Some(placement) => Tick::Placed(placement),
            None => Tick::Dropped,
        }
    }

    /// Places every queued item, awaiting each measurement and then `next_frame()`.
    ///
    /// Resolves with the number of items placed once the queue is empty (or the viewport width
    /// is unknown). Dropping the returned future keeps the measurement in flight; the next tick
    /// or drain picks it up.
    pub async fn drain<F, Fut>(&mut self, mut next_frame: F) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut placed = 0;
        loop {
            let tick = poll_fn(|cx| match self.poll_tick(cx) {
                Tick::Pending => Poll::Pending,
                tick => Poll::Ready(tick),
            })
            .await;
            match tick {
                Tick::Placed(_) => {
                    placed += 1;
                    next_frame().await;
                }
                Tick::Dropped | Tick::Pending => {}
                Tick::Idle | Tick::AwaitingViewport => return placed,
            }
        }
    }

    fn start(&mut self) -> Option<InFlight<M::Future>> {
        // Resume a request someone started through `layout_mut`.
        if self.layout.current_measurement().is_none() && self.layout.next_measurement().is_none() {
            return None;
        }
        let request = self.layout.current_measurement()?;
        atrace!(
            seq = request.ticket.seq,
            width = request.width,
            "measurement started"
        );
        let future = self.measure.measure(request.item, request.width);
        Some(InFlight {
            ticket: request.ticket,
            future: Box::pin(future),
        })
    }

    /// Drops the held future if the layout no longer expects its result.
    fn sync(&mut self) {
        let current = self.layout.current_measurement().map(|request| request.ticket);
        let stale = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| Some(in_flight.ticket) != current);
        if stale {
            adebug!("dropping abandoned measurement future");
            self.in_flight = None;
        }
    }
}

impl<K: fmt::Debug, T: fmt::Debug, M: Measure<K, T>> fmt::Debug for Controller<K, T, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("layout", &self.layout)
            .field(
                "in_flight",
                &self.in_flight.as_ref().map(|in_flight| in_flight.ticket),
            )
            .finish_non_exhaustive()
    }
}
