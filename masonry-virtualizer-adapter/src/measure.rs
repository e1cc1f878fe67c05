use core::future::Future;

use masonry_virtualizer::{Item, MeasureError};

/// Asynchronous height reporter: renders `item` offscreen at `width` and resolves to its natural
/// height.
///
/// The returned future must not borrow the item; the controller may drop it at any time (the
/// collection changed, or the column count changed) and that drop is the cancellation.
pub trait Measure<K, T> {
    type Future: Future<Output = Result<u32, MeasureError>>;

    fn measure(&mut self, item: &Item<K, T>, width: u32) -> Self::Future;
}

impl<K, T, F, Fut> Measure<K, T> for F
where
    F: FnMut(&Item<K, T>, u32) -> Fut,
    Fut: Future<Output = Result<u32, MeasureError>>,
{
    type Future = Fut;

    fn measure(&mut self, item: &Item<K, T>, width: u32) -> Fut {
        self(item, width)
    }
}
