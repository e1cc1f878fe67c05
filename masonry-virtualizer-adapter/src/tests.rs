use crate::*;

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::future::{Future, Ready, ready};
use core::pin::Pin;
use core::task::{Context, Poll, Waker};
use std::sync::Mutex;

use masonry_virtualizer::{Item, MasonryOptions, Placement};

fn tiles(heights: &[u32]) -> Vec<Item<u64, u32>> {
    heights
        .iter()
        .enumerate()
        .map(|(i, &h)| Item::new(i as u64, h))
        .collect()
}

/// Reports each payload as the height, immediately.
fn instant() -> impl FnMut(&Item<u64, u32>, u32) -> Ready<Result<u32, MeasureError>> {
    |item: &Item<u64, u32>, _width: u32| ready(Ok(item.payload))
}

#[derive(Default)]
struct GateState {
    result: Option<Result<u32, MeasureError>>,
    waker: Option<Waker>,
    dropped: bool,
}

struct GateFuture(Arc<Mutex<GateState>>);

impl Future for GateFuture {
    type Output = Result<u32, MeasureError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.0.lock().unwrap();
        match state.result.take() {
            Some(result) => Poll::Ready(result),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl Drop for GateFuture {
    fn drop(&mut self) {
        if let Ok(mut state) = self.0.lock() {
            state.dropped = true;
        }
    }
}

/// A renderer whose measurements resolve only when the test says so.
#[derive(Clone, Default)]
struct GatedRenderer {
    requests: Arc<Mutex<Vec<(u64, u32, Arc<Mutex<GateState>>)>>>,
}

impl GatedRenderer {
    fn requested(&self) -> Vec<(u64, u32)> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(id, width, _)| (*id, *width))
            .collect()
    }

    fn resolve(&self, request: usize, result: Result<u32, MeasureError>) {
        let requests = self.requests.lock().unwrap();
        let mut state = requests[request].2.lock().unwrap();
        state.result = Some(result);
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
    }

    fn dropped(&self, request: usize) -> bool {
        self.requests.lock().unwrap()[request].2.lock().unwrap().dropped
    }
}

impl Measure<u64, u32> for GatedRenderer {
    type Future = GateFuture;

    fn measure(&mut self, item: &Item<u64, u32>, width: u32) -> GateFuture {
        let state = Arc::new(Mutex::new(GateState::default()));
        self.requests
            .lock()
            .unwrap()
            .push((item.id, width, Arc::clone(&state)));
        GateFuture(state)
    }
}

/// Pending on the first poll (waking itself), ready on the second.
struct YieldOnce {
    height: u32,
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = Result<u32, MeasureError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.yielded {
            return Poll::Ready(Ok(self.height));
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}

#[test]
fn tick_places_one_item_per_frame() {
    let mut c = Controller::new(MasonryOptions::new(400), instant()).unwrap();
    c.set_viewport_width(1000);
    c.set_items(tiles(&[100, 200, 150, 60]));

    let mut columns = Vec::new();
    loop {
        match c.tick() {
            Tick::Placed(p) => columns.push(p.column),
            Tick::Idle => break,
            other => panic!("unexpected tick: {other:?}"),
        }
    }
    assert_eq!(columns, [0, 1, 2, 0]);
    assert_eq!(c.layout().column_heights(), &[160, 200, 150]);
    assert!(c.is_idle());
    assert_eq!(c.tick(), Tick::Idle);
}

#[test]
fn nothing_is_measured_before_viewport_width() {
    let mut c = Controller::new(MasonryOptions::new(100), instant()).unwrap();
    c.set_items(tiles(&[10]));
    assert_eq!(c.tick(), Tick::AwaitingViewport);
    assert!(!c.is_measuring());

    c.set_viewport_width(100);
    assert_eq!(
        c.tick(),
        Tick::Placed(Placement {
            column: 0,
            row: 0,
            top: 0,
            height: 10
        })
    );
}

#[test]
fn pending_measurement_is_polled_again_next_frame() {
    let renderer = GatedRenderer::default();
    let mut c = Controller::new(MasonryOptions::new(100), renderer.clone()).unwrap();
    c.set_viewport_width(300);
    c.set_items(tiles(&[10, 20]));

    assert_eq!(c.tick(), Tick::Pending);
    assert_eq!(c.tick(), Tick::Pending);
    // Still one request: the second item waits for the first.
    assert_eq!(renderer.requested(), [(0, 100)]);

    renderer.resolve(0, Ok(42));
    match c.tick() {
        Tick::Placed(p) => assert_eq!((p.column, p.height), (0, 42)),
        other => panic!("unexpected tick: {other:?}"),
    }
    assert_eq!(c.tick(), Tick::Pending);
    assert_eq!(renderer.requested(), [(0, 100), (1, 100)]);
}

#[test]
fn frame_waker_is_woken_by_resolution() {
    let renderer = GatedRenderer::default();
    let mut c = Controller::new(MasonryOptions::new(100), renderer.clone()).unwrap();
    c.set_viewport_width(100);
    c.set_items(tiles(&[10]));

    let frame = FrameWaker::new();
    assert_eq!(c.tick_with(&frame.waker()), Tick::Pending);
    assert!(!frame.is_requested());

    renderer.resolve(0, Ok(10));
    assert!(frame.take());
    assert!(!frame.is_requested());
    assert!(matches!(c.tick_with(&frame.waker()), Tick::Placed(_)));
}

#[test]
fn collection_change_drops_in_flight_future() {
    let renderer = GatedRenderer::default();
    let mut c = Controller::new(MasonryOptions::new(100), renderer.clone()).unwrap();
    c.set_viewport_width(100);
    c.set_items(tiles(&[10, 20]));
    assert_eq!(c.tick(), Tick::Pending);

    c.set_items(tiles(&[10, 20]).into_iter().skip(1));
    assert!(renderer.dropped(0));
    assert!(!c.is_measuring());

    assert_eq!(c.tick(), Tick::Pending);
    assert_eq!(renderer.requested(), [(0, 100), (1, 100)]);
    renderer.resolve(1, Ok(20));
    assert!(matches!(c.tick(), Tick::Placed(_)));
    assert!(c.layout().contains(&1));
    assert!(!c.layout().contains(&0));
}

#[test]
fn same_collection_keeps_in_flight_future() {
    let renderer = GatedRenderer::default();
    let mut c = Controller::new(MasonryOptions::new(100), renderer.clone()).unwrap();
    c.set_viewport_width(100);
    c.set_items(tiles(&[10, 20]));
    assert_eq!(c.tick(), Tick::Pending);

    assert!(c.set_items(tiles(&[10, 20])).is_empty());
    assert!(c.is_measuring());
    renderer.resolve(0, Ok(10));
    assert!(matches!(c.tick(), Tick::Placed(_)));
}

#[test]
fn column_count_change_restarts_measurement() {
    let renderer = GatedRenderer::default();
    let mut c = Controller::new(MasonryOptions::new(100), renderer.clone()).unwrap();
    c.set_viewport_width(300);
    c.set_items(tiles(&[10]));
    assert_eq!(c.tick(), Tick::Pending);

    c.set_viewport_width(200);
    assert!(renderer.dropped(0));
    assert_eq!(c.tick(), Tick::Pending);
    assert_eq!(renderer.requested(), [(0, 100), (0, 100)]);

    // Same column count: the future survives a width change.
    c.set_viewport_width(190);
    assert!(c.is_measuring());
    renderer.resolve(1, Ok(10));
    assert!(matches!(c.tick(), Tick::Placed(_)));
}

#[test]
fn failed_measurement_is_placed_with_fallback() {
    let renderer = GatedRenderer::default();
    let options = MasonryOptions::new(100).with_fallback_height(Some(64));
    let mut c = Controller::new(options, renderer.clone()).unwrap();
    c.set_viewport_width(100);
    c.set_items(tiles(&[10]));
    assert_eq!(c.tick(), Tick::Pending);

    renderer.resolve(0, Err(MeasureError::render("image failed to decode")));
    match c.tick() {
        Tick::Placed(p) => assert_eq!(p.height, 64),
        other => panic!("unexpected tick: {other:?}"),
    }
}

#[test]
fn measurement_started_through_layout_is_picked_up() {
    let mut c = Controller::new(MasonryOptions::new(100), instant()).unwrap();
    c.set_viewport_width(100);
    c.set_items(tiles(&[10, 20]));
    let ticket = c.layout_mut().next_measurement().unwrap().ticket;

    match c.tick() {
        Tick::Placed(p) => assert_eq!(p.height, 10),
        other => panic!("unexpected tick: {other:?}"),
    }
    // The ticket was consumed by the controller.
    assert!(c.layout_mut().resolve_measurement(ticket, Ok(1)).is_none());
}

#[test]
fn drain_awaits_measurements_and_frames() {
    let measure = |item: &Item<u64, u32>, _width: u32| YieldOnce {
        height: item.payload,
        yielded: false,
    };
    let mut c = Controller::new(MasonryOptions::new(100).with_gap(8), measure).unwrap();
    c.set_viewport_width(200);
    c.set_items(tiles(&[30, 10, 10, 40, 5]));

    let mut frames = 0;
    let placed = pollster::block_on(c.drain(|| {
        frames += 1;
        ready(())
    }));
    assert_eq!(placed, 5);
    assert_eq!(frames, 5);
    assert!(c.is_idle());
    // Column 0 gets 30 then 5; column 1 gets 10, 10 and 40.
    assert_eq!(c.layout().column_heights(), &[30 + 8 + 5, 10 + 8 + 10 + 8 + 40]);
}

#[test]
fn drain_stops_without_viewport_width() {
    let mut c = Controller::new(MasonryOptions::new(100), instant()).unwrap();
    c.set_items(tiles(&[10, 20]));
    let placed = pollster::block_on(c.drain(|| ready(())));
    assert_eq!(placed, 0);
    assert_eq!(c.layout().pending_len(), 2);
}

#[test]
fn height_corrections_are_forwarded() {
    let mut c = Controller::new(MasonryOptions::new(100), instant()).unwrap();
    c.set_viewport_width(100);
    c.set_items(tiles(&[10, 20]));
    pollster::block_on(c.drain(|| ready(())));

    assert_eq!(c.update_item_height(&1, 25), 5);
    assert_eq!(c.update_height(0, 0, 5), -5);
    assert_eq!(c.layout().column_heights(), &[30]);

    // Removed while its image was loading.
    c.set_items(tiles(&[10]));
    assert_eq!(c.update_item_height(&1, 99), 0);
    assert_eq!(c.layout().column_heights(), &[5]);
}
