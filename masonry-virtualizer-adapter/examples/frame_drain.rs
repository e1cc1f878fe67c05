// Example: async measurement driven by frames, blocking on the drain with pollster.
use std::future::ready;

use masonry_virtualizer::{Item, MasonryOptions};
use masonry_virtualizer_adapter::{Controller, MeasureError, Tick};

fn main() {
    // Pretend renderer: text wraps at the column width, so height depends on it.
    let render = |item: &Item<u32, &'static str>, width: u32| {
        let chars_per_line = (width / 8).max(1) as usize;
        let lines = item.payload.len().div_ceil(chars_per_line).max(1);
        ready(Ok::<u32, MeasureError>(24 + lines as u32 * 18))
    };

    let mut c = Controller::new(MasonryOptions::new(320).with_gap(12), render).unwrap();
    c.set_viewport_width(900);
    c.set_items([
        Item::new(1, "short"),
        Item::new(2, "a somewhat longer caption that needs a couple of lines"),
        Item::new(3, "medium length caption"),
        Item::new(4, "x"),
    ]);

    // Frame-by-frame, the way a UI timer would drive it.
    for frame in 0.. {
        match c.tick() {
            Tick::Placed(p) => println!("frame {frame}: placed {p:?}"),
            Tick::Idle => break,
            other => println!("frame {frame}: {other:?}"),
        }
    }

    // Or in one go from async code.
    c.set_items((1..=12).map(|id| Item::new(id, "new caption")));
    let mut frames = 0;
    let placed = pollster::block_on(c.drain(|| {
        frames += 1;
        ready(())
    }));
    println!(
        "drained {placed} items over {frames} frames; column_heights={:?}",
        c.layout().column_heights()
    );
}
