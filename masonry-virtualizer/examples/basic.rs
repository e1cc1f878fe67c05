// Example: placing a feed of tiles and reading back what to render.
use masonry_virtualizer::{ColumnAssigner, Item, MasonryOptions};

fn main() {
    let mut layout = ColumnAssigner::new(MasonryOptions::new(240).with_gap(8)).unwrap();
    layout.set_viewport_width(1000);
    layout.set_scroll(0, 600);

    let items: Vec<_> = (0..40u64)
        .map(|id| Item::new(id, 120 + (id * 37 % 180) as u32))
        .collect();
    let diff = layout.set_items(items);
    println!("set_items: {diff:?}");

    // One item per frame; here every frame renders instantly.
    while let Some(request) = layout.next_measurement() {
        let ticket = request.ticket;
        let height = request.item.payload;
        layout.resolve_measurement(ticket, Ok(height));
    }

    println!(
        "columns={} column_width={} column_heights={:?} total={}",
        layout.number_of_columns(),
        layout.column_width(),
        layout.column_heights(),
        layout.total_height()
    );

    layout.set_scroll(1200, 600);
    let mut rendered = 0;
    layout.for_each_item(|it| {
        if it.visible {
            rendered += 1;
        }
    });
    println!("rendered {rendered} of {} tiles at scroll 1200", layout.len());

    layout.for_each_visible_item(|it| {
        if it.row == 0 || it.column == 0 {
            println!(
                "  id={} column={} row={} left={} top={} height={}",
                it.id, it.column, it.row, it.left, it.top, it.height
            );
        }
    });
}
