// Example: late height corrections, stale measurements and a column-count reset.
use masonry_virtualizer::{ColumnAssigner, Item, MasonryOptions, MeasureError};

fn drain(layout: &mut ColumnAssigner<&'static str, u32>) {
    while let Some(request) = layout.next_measurement() {
        let ticket = request.ticket;
        let height = request.item.payload;
        layout.resolve_measurement(ticket, Ok(height));
    }
}

fn main() {
    let options = MasonryOptions::new(400)
        .with_fallback_height(Some(200))
        .with_on_column_height_change(Some(|column: usize, height: u64| {
            println!("  column {column} -> {height}");
        }))
        .with_on_total_height_change(Some(|height: u64| println!("  total -> {height}")));
    let mut layout = ColumnAssigner::new(options).unwrap();
    layout.set_viewport_width(1000);

    println!("placing a, b, c, d:");
    layout.set_items([
        Item::new("a", 100),
        Item::new("b", 200),
        Item::new("c", 150),
        Item::new("d", 60),
    ]);
    drain(&mut layout);
    println!("placement of d: {:?}", layout.placement_of(&"d"));

    // The image in "a" finished loading and turned out taller.
    println!("correcting a to 130:");
    let delta = layout.update_item_height(&"a", 130);
    println!("delta={delta} d.top={:?}", layout.column(0).and_then(|c| c.top_offset(1)));

    // "e" is removed while its measurement is still in flight.
    layout.set_items(["a", "b", "c", "d", "e"].map(|id| Item::new(id, 80)));
    let ticket = layout.next_measurement().map(|request| request.ticket);
    layout.set_items(["a", "b", "c", "d"].map(|id| Item::new(id, 80)));
    if let Some(ticket) = ticket {
        let placed = layout.resolve_measurement(ticket, Ok(80));
        println!("stale resolution placed: {placed:?}");
    }

    // A failed measurement still places the item.
    layout.set_items(["a", "b", "c", "d", "f"].map(|id| Item::new(id, 80)));
    if let Some(ticket) = layout.next_measurement().map(|request| request.ticket) {
        let placed = layout.resolve_measurement(ticket, Err(MeasureError::render("decode")));
        println!("failed measurement placed: {placed:?}");
    }

    println!("narrowing to two columns:");
    layout.set_viewport_width(700);
    println!("pending={} placed={}", layout.pending_len(), layout.len());
    drain(&mut layout);
    println!("{:#?}", layout.layout_state());
}
