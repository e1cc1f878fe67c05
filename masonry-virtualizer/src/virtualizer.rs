use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::cmp;

use crate::fenwick::Fenwick;
use crate::key::{KeyCacheKey, KeyMap, KeySet};
use crate::{Item, ScrollState, VirtualRange, VirtualSlot, VirtualizerOptions};

/// Virtualization state for one masonry column.
///
/// The column owns its slots: every item placed in it together with the item's height. Top
/// offsets are never stored; they are prefix sums over `height + gap` kept in a Fenwick tree, so
/// appending and correcting a height are `O(log n)` and every later offset follows automatically.
///
/// Like the rest of the crate this type holds no UI objects. The host feeds it the scroll offset
/// and viewport height of the shared scroll container and reads back which slots fall inside the
/// render window.
#[derive(Clone, Debug)]
pub struct Virtualizer<K, T> {
    options: VirtualizerOptions<K, T>,
    width: u32,
    viewport_size: u32,
    scroll_offset: u64,

    items: Vec<Item<K, T>>,
    heights: Vec<u32>,
    rows: KeyMap<K, usize>,
    sums: Fenwick,

    notify_depth: Cell<usize>,
    notify_pending: Cell<bool>,
}

impl<K: KeyCacheKey, T> Virtualizer<K, T> {
    pub fn new(options: VirtualizerOptions<K, T>) -> Self {
        mdebug!(
            gap = options.gap,
            scroll_margin = options.scroll_margin,
            "Virtualizer::new"
        );
        Self {
            options,
            width: 0,
            viewport_size: 0,
            scroll_offset: 0,
            items: Vec::new(),
            heights: Vec::new(),
            rows: KeyMap::new(),
            sums: Fenwick::default(),
            notify_depth: Cell::new(0),
            notify_pending: Cell::new(false),
        }
    }

    pub fn options(&self) -> &VirtualizerOptions<K, T> {
        &self.options
    }

    pub fn set_options(&mut self, options: VirtualizerOptions<K, T>) {
        let prev_gap = self.options.gap;
        self.options = options;
        if self.options.gap != prev_gap {
            self.rebuild_sums();
        }
        self.notify();
    }

    /// Clones the current options, applies `f`, then delegates to `set_options`.
    pub fn update_options(&mut self, f: impl FnOnce(&mut VirtualizerOptions<K, T>)) {
        let mut next = self.options.clone();
        f(&mut next);
        self.set_options(next);
    }

    pub fn set_on_change(
        &mut self,
        on_change: Option<impl Fn(&Virtualizer<K, T>) + Send + Sync + 'static>,
    ) {
        self.options.on_change = on_change.map(|f| Arc::new(f) as _);
        self.notify();
    }

    fn notify_now(&self) {
        if let Some(cb) = &self.options.on_change {
            cb(self);
        }
    }

    fn notify(&self) {
        if self.notify_depth.get() > 0 {
            self.notify_pending.set(true);
            return;
        }
        self.notify_now();
    }

    /// Batches multiple updates into a single `on_change` notification.
    pub fn batch_update(&mut self, f: impl FnOnce(&mut Self)) {
        let depth = self.notify_depth.get();
        self.notify_depth.set(depth.saturating_add(1));

        f(self);

        let depth = self.notify_depth.get();
        debug_assert!(depth > 0, "notify_depth underflow");
        let next = depth.saturating_sub(1);
        self.notify_depth.set(next);

        if next == 0 && self.notify_pending.replace(false) {
            self.notify_now();
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Column width in layout units (the cross axis).
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn set_width(&mut self, width: u32) {
        if self.width == width {
            return;
        }
        self.width = width;
        self.notify();
    }

    pub fn gap(&self) -> u32 {
        self.options.gap
    }

    pub fn set_gap(&mut self, gap: u32) {
        if self.options.gap == gap {
            return;
        }
        self.options.gap = gap;
        self.rebuild_sums();
        self.notify();
    }

    pub fn set_render_margin(&mut self, render_margin: Option<u32>) {
        self.options.render_margin = render_margin;
        self.notify();
    }

    pub fn set_scroll_margin(&mut self, scroll_margin: u32) {
        self.options.scroll_margin = scroll_margin;
        self.notify();
    }

    /// Effective render margin: the configured one, or a full viewport height.
    pub fn render_margin(&self) -> u32 {
        self.options.render_margin.unwrap_or(self.viewport_size)
    }

    pub fn viewport_size(&self) -> u32 {
        self.viewport_size
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn scroll_state(&self) -> ScrollState {
        ScrollState {
            offset: self.scroll_offset,
            viewport_size: self.viewport_size,
        }
    }

    pub fn restore_scroll_state(&mut self, scroll: ScrollState) {
        self.set_viewport_and_scroll(scroll.viewport_size, scroll.offset);
    }

    pub fn set_viewport_size(&mut self, size: u32) {
        if self.viewport_size == size {
            return;
        }
        self.viewport_size = size;
        self.notify();
    }

    pub fn set_scroll_offset(&mut self, offset: u64) {
        if self.scroll_offset == offset {
            return;
        }
        self.scroll_offset = offset;
        self.notify();
    }

    pub fn set_viewport_and_scroll(&mut self, viewport_size: u32, scroll_offset: u64) {
        self.batch_update(|v| {
            v.set_viewport_size(viewport_size);
            v.set_scroll_offset(scroll_offset);
        });
    }

    /// Appends a slot and returns its row.
    pub fn push(&mut self, item: Item<K, T>, height: u32) -> usize {
        let row = self.items.len();
        mtrace!(row, height, "Virtualizer::push");
        self.rows.insert(item.id.clone(), row);
        self.items.push(item);
        self.heights.push(height);
        self.sums.push(height, self.options.gap);
        self.notify();
        row
    }

    /// Inserts a slot at `index` (clamped to the current length) and returns the actual row.
    ///
    /// Every later slot moves down by `height + gap`.
    pub fn insert(&mut self, index: usize, item: Item<K, T>, height: u32) -> usize {
        if index >= self.items.len() {
            return self.push(item, height);
        }
        mtrace!(index, height, "Virtualizer::insert");
        self.items.insert(index, item);
        self.heights.insert(index, height);
        self.reindex_from(index);
        self.rebuild_sums();
        self.notify();
        index
    }

    /// Removes the slot holding `id`.
    ///
    /// Later slots move up by the removed height (plus one gap) and their rows compact. Returns
    /// the removed item and its height, or `None` if the id is not in this column.
    pub fn remove(&mut self, id: &K) -> Option<(Item<K, T>, u32)> {
        let index = self.rows.remove(id)?;
        mtrace!(index, "Virtualizer::remove");
        let item = self.items.remove(index);
        let height = self.heights.remove(index);
        self.reindex_from(index);
        self.rebuild_sums();
        self.notify();
        Some((item, height))
    }

    /// Removes every slot whose id is in `ids` with a single offset rebuild.
    ///
    /// Returns the number of removed slots.
    pub fn remove_many<'a>(&mut self, ids: impl IntoIterator<Item = &'a K>) -> usize
    where
        K: 'a,
    {
        let mut doomed = KeySet::new();
        for id in ids {
            if self.rows.contains_key(id) {
                doomed.insert(id.clone());
            }
        }
        if doomed.is_empty() {
            return 0;
        }

        let mut kept_heights = Vec::with_capacity(self.heights.len() - doomed.len());
        let mut kept_items = Vec::with_capacity(self.items.len() - doomed.len());
        for (item, height) in self.items.drain(..).zip(self.heights.drain(..)) {
            if !doomed.contains(&item.id) {
                kept_items.push(item);
                kept_heights.push(height);
            }
        }
        self.items = kept_items;
        self.heights = kept_heights;
        self.rows.clear();
        self.reindex_from(0);
        self.rebuild_sums();
        mtrace!(removed = doomed.len(), "Virtualizer::remove_many");
        self.notify();
        doomed.len()
    }

    /// Empties the column and hands back its items in slot order.
    pub fn take_items(&mut self) -> Vec<Item<K, T>> {
        self.heights.clear();
        self.rows.clear();
        self.sums.clear();
        let items = core::mem::take(&mut self.items);
        if !items.is_empty() {
            self.notify();
        }
        items
    }

    /// Replaces the height of slot `index` and returns `new_height - old_height`.
    ///
    /// Every slot after `index` moves by the returned delta; the owner can apply the same delta
    /// to any cached column height. Out-of-range indexes are ignored (delta 0).
    pub fn update_height(&mut self, index: usize, new_height: u32) -> i64 {
        let Some(cur) = self.heights.get(index).copied() else {
            mdebug!(index, len = self.heights.len(), "update_height: no such slot");
            return 0;
        };
        if cur == new_height {
            return 0;
        }
        let delta = new_height as i64 - cur as i64;
        mtrace!(index, delta, "Virtualizer::update_height");
        self.heights[index] = new_height;
        self.sums.add(index, delta);
        self.notify();
        delta
    }

    /// Same as [`Self::update_height`], addressed by id.
    ///
    /// An id that is no longer in this column (e.g. removed while its image was still loading) is
    /// silently ignored.
    pub fn update_height_keyed(&mut self, id: &K, new_height: u32) -> i64 {
        match self.rows.get(id).copied() {
            Some(index) => self.update_height(index, new_height),
            None => {
                mdebug!("update_height_keyed: id no longer in column");
                0
            }
        }
    }

    /// Swaps the payload of `id` in place. Returns `false` if the id is not in this column.
    pub fn set_payload(&mut self, id: &K, payload: T) -> bool {
        let Some(&index) = self.rows.get(id) else {
            return false;
        };
        self.items[index].payload = payload;
        self.notify();
        true
    }

    pub fn index_of(&self, id: &K) -> Option<usize> {
        self.rows.get(id).copied()
    }

    pub fn contains(&self, id: &K) -> bool {
        self.rows.contains_key(id)
    }

    pub fn item(&self, index: usize) -> Option<&Item<K, T>> {
        self.items.get(index)
    }

    pub fn items(&self) -> impl ExactSizeIterator<Item = &Item<K, T>> + '_ {
        self.items.iter()
    }

    pub fn height(&self, index: usize) -> Option<u32> {
        self.heights.get(index).copied()
    }

    /// Offset of slot `index` from the top of the column (excludes `scroll_margin`).
    pub fn top_offset(&self, index: usize) -> Option<u64> {
        (index < self.items.len()).then(|| self.sums.prefix_sum(index))
    }

    pub fn slot(&self, index: usize) -> Option<VirtualSlot> {
        let height = self.height(index)?;
        let top = self.sums.prefix_sum(index);
        Some(VirtualSlot {
            index,
            top: top.saturating_add(self.options.scroll_margin as u64),
            height,
            visible: self.intersects_window(top, height),
        })
    }

    /// Column height: heights plus the gaps between them.
    pub fn total_height(&self) -> u64 {
        self.sums.total()
    }

    /// The render window in column coordinates, `[start, end)`.
    ///
    /// It is the viewport expanded by [`Self::render_margin`] on both edges. Returns `None` when
    /// the viewport has no size or the window ends before the column starts.
    pub fn render_window(&self) -> Option<(u64, u64)> {
        if self.viewport_size == 0 {
            return None;
        }
        let margin = self.render_margin() as u64;
        let scroll_margin = self.options.scroll_margin as u64;
        let start_abs = self.scroll_offset.saturating_sub(margin);
        let end_abs = self
            .scroll_offset
            .saturating_add(self.viewport_size as u64)
            .saturating_add(margin);
        if end_abs <= scroll_margin {
            return None;
        }
        Some((
            start_abs.saturating_sub(scroll_margin),
            end_abs - scroll_margin,
        ))
    }

    fn intersects_window(&self, top: u64, height: u32) -> bool {
        let Some((start, end)) = self.render_window() else {
            return false;
        };
        top < end && top.saturating_add(height as u64) > start
    }

    /// Whether slot `index` should be rendered at full fidelity.
    ///
    /// Slots outside the window stay in the layout; the renderer draws a placeholder of the same
    /// height for them.
    pub fn visibility_of(&self, index: usize) -> bool {
        match (self.top_offset(index), self.height(index)) {
            (Some(top), Some(height)) => self.intersects_window(top, height),
            _ => false,
        }
    }

    /// Contiguous rows intersecting the render window.
    pub fn visible_range(&self) -> VirtualRange {
        let count = self.items.len();
        if count == 0 {
            return VirtualRange::EMPTY;
        }
        let Some((start, end)) = self.render_window() else {
            return VirtualRange::EMPTY;
        };
        if end == 0 {
            return VirtualRange::EMPTY;
        }

        // Rows whose top is before the window end.
        let end_index = cmp::min(self.sums.lower_bound(end - 1).saturating_add(1), count);

        // First row whose bottom is past the window start. Bottoms are non-decreasing.
        let mut lo = 0usize;
        let mut hi = end_index;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let bottom = self
                .sums
                .prefix_sum(mid)
                .saturating_add(self.heights[mid] as u64);
            if bottom <= start {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        VirtualRange {
            start_index: lo,
            end_index,
        }
    }

    /// Calls `f` for every slot in the render window, top to bottom.
    pub fn for_each_visible_slot(&self, mut f: impl FnMut(VirtualSlot, &Item<K, T>)) {
        let range = self.visible_range();
        if range.is_empty() {
            return;
        }
        let gap = self.options.gap as u64;
        let mut top = self.options.scroll_margin as u64 + self.sums.prefix_sum(range.start_index);
        for index in range.start_index..range.end_index {
            let height = self.heights[index];
            f(
                VirtualSlot {
                    index,
                    top,
                    height,
                    visible: true,
                },
                &self.items[index],
            );
            top = top.saturating_add(height as u64).saturating_add(gap);
        }
    }

    /// Calls `f` for every slot, marking whether it is inside the render window.
    pub fn for_each_slot(&self, mut f: impl FnMut(VirtualSlot, &Item<K, T>)) {
        let range = self.visible_range();
        let gap = self.options.gap as u64;
        let mut top = self.options.scroll_margin as u64;
        for (index, item) in self.items.iter().enumerate() {
            let height = self.heights[index];
            f(
                VirtualSlot {
                    index,
                    top,
                    height,
                    visible: range.contains(index),
                },
                item,
            );
            top = top.saturating_add(height as u64).saturating_add(gap);
        }
    }

    /// Collects the render-window slots into `out` (clears `out` first).
    pub fn collect_visible_slots(&self, out: &mut Vec<VirtualSlot>) {
        out.clear();
        self.for_each_visible_slot(|slot, _| out.push(slot));
    }

    /// Maps a scroll-container offset to a row. Offsets inside a gap map to the row above.
    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        let count = self.items.len();
        if count == 0 {
            return None;
        }
        let margin = self.options.scroll_margin as u64;
        if offset < margin {
            return Some(0);
        }
        let consumed = self.sums.lower_bound(offset - margin);
        Some(consumed.min(count - 1))
    }

    fn reindex_from(&mut self, start: usize) {
        for (row, item) in self.items.iter().enumerate().skip(start) {
            self.rows.insert(item.id.clone(), row);
        }
    }

    fn rebuild_sums(&mut self) {
        self.sums = Fenwick::from_heights(self.heights.iter().copied(), self.options.gap);
    }
}
