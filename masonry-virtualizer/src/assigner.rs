use alloc::vec::Vec;

use crate::key::{KeyCacheKey, KeyMap, KeySet};
use crate::measurer::{MeasureRequest, MeasureTicket, OffscreenMeasurer};
use crate::{
    ConfigError, Item, ItemsDiff, LayoutState, MasonryOptions, MeasureError, Placement,
    RenderedItem, SlotState, Virtualizer,
};

/// The masonry layer: owns the columns and decides where every item goes.
///
/// Items are placed greedily: each measured item is appended to the currently shortest column
/// (ties go to the lowest index). Placement is append-only, so a column never reorders its slots
/// to rebalance; removal compacts the column in place.
///
/// Driving loop, one step per rendering frame:
/// 1. [`Self::next_measurement`] hands out at most one item to render offscreen;
/// 2. the host reports the natural height through [`Self::resolve_measurement`];
/// 3. the item is placed and the column/total height callbacks fire.
///
/// The `masonry-virtualizer-adapter` crate wraps this loop around an async measurer.
#[derive(Clone, Debug)]
pub struct ColumnAssigner<K, T> {
    options: MasonryOptions,
    viewport_width: u32,
    number_of_columns: usize,
    column_width: u32,
    viewport_height: u32,
    scroll_offset: u64,

    columns: Vec<Virtualizer<K, T>>,
    column_heights: Vec<u64>,
    placements: KeyMap<K, usize>,
    order: Vec<K>,
    measurer: OffscreenMeasurer<K, T>,

    published_heights: Vec<u64>,
    published_total: u64,
}

impl<K: KeyCacheKey, T> ColumnAssigner<K, T> {
    /// Creates an empty layout. Fails on invalid options.
    ///
    /// Until a viewport width is known the layout has a single zero-width column and no
    /// measurement is started.
    pub fn new(options: MasonryOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        mdebug!(
            max_item_width = options.max_item_width,
            max_columns = ?options.max_columns,
            gap = options.gap,
            "ColumnAssigner::new"
        );
        let mut layout = Self {
            viewport_width: 0,
            number_of_columns: 0,
            column_width: 0,
            viewport_height: 0,
            scroll_offset: 0,
            columns: Vec::new(),
            column_heights: Vec::new(),
            placements: KeyMap::new(),
            order: Vec::new(),
            measurer: OffscreenMeasurer::new(),
            published_heights: Vec::new(),
            published_total: 0,
            options,
        };
        let n = layout.options.number_of_columns(0);
        let width = layout.options.column_width(0, n);
        layout.reset_columns(n, width);
        layout.published_heights = layout.column_heights.clone();
        Ok(layout)
    }

    pub fn options(&self) -> &MasonryOptions {
        &self.options
    }

    /// Applies new options.
    ///
    /// Invalid options are rejected and the current ones kept. A change in the resulting column
    /// count triggers a full reset; otherwise column width, gap and margins are updated in place.
    pub fn set_options(&mut self, options: MasonryOptions) -> Result<(), ConfigError> {
        options.validate()?;
        let prev_gap = self.options.gap;
        self.options = options;
        mtrace!(
            max_item_width = self.options.max_item_width,
            gap = self.options.gap,
            "ColumnAssigner::set_options"
        );

        let render_margin = self.options.render_margin;
        let scroll_margin = self.options.scroll_margin;
        let gap = self.options.gap;
        for column in &mut self.columns {
            column.batch_update(|c| {
                c.set_render_margin(render_margin);
                c.set_scroll_margin(scroll_margin);
                c.set_gap(gap);
            });
        }
        if gap != prev_gap {
            for (height, column) in self.column_heights.iter_mut().zip(&self.columns) {
                *height = column.total_height();
            }
        }
        self.relayout();
        self.publish();
        Ok(())
    }

    /// Clones the current options, applies `f`, then delegates to `set_options`.
    pub fn update_options(
        &mut self,
        f: impl FnOnce(&mut MasonryOptions),
    ) -> Result<(), ConfigError> {
        let mut next = self.options.clone();
        f(&mut next);
        self.set_options(next)
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn number_of_columns(&self) -> usize {
        self.number_of_columns
    }

    pub fn column_width(&self) -> u32 {
        self.column_width
    }

    /// Left edge of `column` in layout units.
    pub fn column_left(&self, column: usize) -> u64 {
        (column as u64).saturating_mul(self.column_width as u64 + self.options.gap as u64)
    }

    pub fn columns(&self) -> &[Virtualizer<K, T>] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Virtualizer<K, T>> {
        self.columns.get(index)
    }

    /// Per-column heights: `sum(height) + gap * (len - 1)`, zero for an empty column.
    pub fn column_heights(&self) -> &[u64] {
        &self.column_heights
    }

    /// Height of the tallest column.
    pub fn total_height(&self) -> u64 {
        self.column_heights.iter().copied().max().unwrap_or(0)
    }

    /// Number of placed items.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Number of items still waiting for a height.
    pub fn pending_len(&self) -> usize {
        self.measurer.len()
    }

    /// True when every known item has been placed.
    pub fn is_idle(&self) -> bool {
        self.measurer.is_idle()
    }

    /// Current measurement generation; bumped by every collection change and every reset.
    pub fn generation(&self) -> u64 {
        self.measurer.generation()
    }

    pub fn measurer(&self) -> &OffscreenMeasurer<K, T> {
        &self.measurer
    }

    pub fn contains(&self, id: &K) -> bool {
        self.placements.contains_key(id)
    }

    /// `(column, row)` of a placed item.
    pub fn placement_of(&self, id: &K) -> Option<(usize, usize)> {
        let column = *self.placements.get(id)?;
        let row = self.columns[column].index_of(id)?;
        Some((column, row))
    }

    /// Updates the viewport width.
    ///
    /// When the derived column count changes, every placement is discarded and every item is
    /// measured again at the new width. Otherwise only the column width changes and existing
    /// heights are kept.
    pub fn set_viewport_width(&mut self, width: u32) {
        if self.viewport_width == width {
            return;
        }
        mtrace!(width, "ColumnAssigner::set_viewport_width");
        self.viewport_width = width;
        self.relayout();
        self.publish();
    }

    /// Updates the shared scroll state of every column.
    pub fn set_scroll(&mut self, scroll_offset: u64, viewport_height: u32) {
        self.scroll_offset = scroll_offset;
        self.viewport_height = viewport_height;
        for column in &mut self.columns {
            column.set_viewport_and_scroll(viewport_height, scroll_offset);
        }
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn viewport_height(&self) -> u32 {
        self.viewport_height
    }

    /// Replaces the item collection.
    ///
    /// Ids that disappeared are removed from their columns right away. Ids that are not placed
    /// yet become the new measurement queue (in collection order) and any measurement in flight
    /// is abandoned. Ids that are already placed keep their slot; only their payload is
    /// refreshed. Passing the same collection again changes nothing and returns an empty diff.
    ///
    /// Ids must be unique within `items`.
    pub fn set_items(&mut self, items: impl IntoIterator<Item = Item<K, T>>) -> ItemsDiff {
        let incoming: Vec<Item<K, T>> = items.into_iter().collect();

        let mut next_ids = KeySet::new();
        for item in &incoming {
            next_ids.insert(item.id.clone());
        }
        let pending: KeySet<K> = self.measurer.pending_ids().cloned().collect();

        let removed_placed: Vec<K> = self
            .placements
            .keys()
            .filter(|id| !next_ids.contains(*id))
            .cloned()
            .collect();
        let removed_pending = pending.iter().filter(|id| !next_ids.contains(*id)).count();
        let added = incoming
            .iter()
            .filter(|item| !self.placements.contains_key(&item.id) && !pending.contains(&item.id))
            .count();
        let diff = ItemsDiff {
            added,
            removed: removed_placed.len() + removed_pending,
        };

        self.order.clear();
        self.order.extend(incoming.iter().map(|item| item.id.clone()));

        if diff.is_empty() {
            for Item { id, payload } in incoming {
                match self.placements.get(&id) {
                    Some(&column) => {
                        self.columns[column].set_payload(&id, payload);
                    }
                    None => {
                        self.measurer.set_payload(&id, payload);
                    }
                }
            }
            return diff;
        }

        mdebug!(
            added = diff.added,
            removed = diff.removed,
            "ColumnAssigner::set_items"
        );

        let mut by_column: Vec<Vec<K>> = alloc::vec![Vec::new(); self.columns.len()];
        for id in removed_placed {
            if let Some(column) = self.placements.remove(&id) {
                by_column[column].push(id);
            }
        }
        for (column, ids) in by_column.iter().enumerate() {
            if ids.is_empty() {
                continue;
            }
            self.columns[column].remove_many(ids.iter());
            self.column_heights[column] = self.columns[column].total_height();
        }

        let mut queue = Vec::with_capacity(diff.added);
        for item in incoming {
            match self.placements.get(&item.id) {
                Some(&column) => {
                    let Item { id, payload } = item;
                    self.columns[column].set_payload(&id, payload);
                }
                None => queue.push(item),
            }
        }
        self.measurer.replace(queue);

        self.publish();
        diff
    }

    /// Starts measuring the next queued item at the current column width.
    ///
    /// Returns `None` when nothing is queued, when a measurement is already in flight (see
    /// [`Self::current_measurement`]) or while the viewport width is still unknown.
    pub fn next_measurement(&mut self) -> Option<MeasureRequest<'_, K, T>> {
        if self.viewport_width == 0 {
            return None;
        }
        self.measurer.begin(self.column_width)
    }

    pub fn current_measurement(&self) -> Option<MeasureRequest<'_, K, T>> {
        self.measurer.current()
    }

    /// Places the item measured under `ticket`.
    ///
    /// Stale tickets (the collection changed, or the layout was reset, after the request was
    /// handed out) are dropped and `None` is returned. A failed measurement places the item with
    /// the fallback height.
    pub fn resolve_measurement(
        &mut self,
        ticket: MeasureTicket,
        result: Result<u32, MeasureError>,
    ) -> Option<Placement> {
        let fallback = self.options.fallback_height.unwrap_or(self.column_width);
        let (item, height) = self.measurer.finish(ticket, result, fallback)?;

        let column = shortest_column(&self.column_heights);
        let id = item.id.clone();
        let row = self.columns[column].push(item, height);
        let top = self.columns[column].top_offset(row).unwrap_or(0);

        let gap = if row > 0 { self.options.gap as u64 } else { 0 };
        self.column_heights[column] = self.column_heights[column]
            .saturating_add(gap)
            .saturating_add(height as u64);
        debug_assert_eq!(
            self.column_heights[column],
            self.columns[column].total_height(),
            "column height out of sync"
        );
        self.placements.insert(id, column);
        mtrace!(column, row, top, height, "item placed");

        self.publish();
        Some(Placement {
            column,
            row,
            top,
            height,
        })
    }

    /// Corrects the height of the slot at `(column, row)` and returns the applied delta.
    ///
    /// Later slots in that column move by the delta; the column height follows without being
    /// recomputed. Unknown coordinates are ignored.
    pub fn update_height(&mut self, column: usize, row: usize, new_height: u32) -> i64 {
        let Some(target) = self.columns.get_mut(column) else {
            mwarn!(column, row, "update_height: no such column");
            return 0;
        };
        let delta = target.update_height(row, new_height);
        self.apply_delta(column, delta);
        delta
    }

    /// Corrects the height of a placed item by id.
    ///
    /// This is the sink handed to renderers: an id that is no longer placed (removed while the
    /// renderer was still loading it, or re-queued by a reset) is silently ignored.
    pub fn update_item_height(&mut self, id: &K, new_height: u32) -> i64 {
        let Some(&column) = self.placements.get(id) else {
            mdebug!("update_item_height: item is not placed");
            return 0;
        };
        let delta = self.columns[column].update_height_keyed(id, new_height);
        self.apply_delta(column, delta);
        delta
    }

    fn apply_delta(&mut self, column: usize, delta: i64) {
        if delta == 0 {
            return;
        }
        let height = &mut self.column_heights[column];
        *height = if delta > 0 {
            height.saturating_add(delta as u64)
        } else {
            height.saturating_sub(delta.unsigned_abs())
        };
        self.publish();
    }

    /// Calls `f` for every slot inside the render window, column by column.
    pub fn for_each_visible_item(&self, mut f: impl FnMut(RenderedItem<'_, K, T>)) {
        for (column, virtualizer) in self.columns.iter().enumerate() {
            let left = self.column_left(column);
            virtualizer.for_each_visible_slot(|slot, item| {
                f(RenderedItem {
                    id: &item.id,
                    payload: &item.payload,
                    column,
                    row: slot.index,
                    left,
                    width: self.column_width,
                    top: slot.top,
                    height: slot.height,
                    visible: true,
                })
            });
        }
    }

    /// Calls `f` for every placed slot; slots outside the render window have `visible == false`.
    pub fn for_each_item(&self, mut f: impl FnMut(RenderedItem<'_, K, T>)) {
        for (column, virtualizer) in self.columns.iter().enumerate() {
            let left = self.column_left(column);
            virtualizer.for_each_slot(|slot, item| {
                f(RenderedItem {
                    id: &item.id,
                    payload: &item.payload,
                    column,
                    row: slot.index,
                    left,
                    width: self.column_width,
                    top: slot.top,
                    height: slot.height,
                    visible: slot.visible,
                })
            });
        }
    }

    /// Payload-free snapshot of the layout.
    pub fn layout_state(&self) -> LayoutState<K> {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let mut slots = Vec::with_capacity(column.len());
                column.for_each_slot(|slot, item| {
                    slots.push(SlotState {
                        id: item.id.clone(),
                        height: slot.height,
                        top_offset: slot.top.saturating_sub(self.options.scroll_margin as u64),
                    });
                });
                slots
            })
            .collect();
        LayoutState {
            number_of_columns: self.number_of_columns,
            column_width: self.column_width,
            columns,
            column_heights: self.column_heights.clone(),
        }
    }

    fn relayout(&mut self) {
        let n = self.options.number_of_columns(self.viewport_width);
        let width = self.options.column_width(self.viewport_width, n);
        if n != self.number_of_columns {
            mdebug!(
                from = self.number_of_columns,
                to = n,
                width,
                "column count changed; re-measuring every item"
            );
            self.reset_columns(n, width);
            return;
        }
        if width != self.column_width {
            self.column_width = width;
            for column in &mut self.columns {
                column.set_width(width);
            }
        }
    }

    /// Discards every placement and queues all known items again, in collection order.
    fn reset_columns(&mut self, n: usize, width: u32) {
        let mut pool: KeyMap<K, Item<K, T>> = KeyMap::new();
        for column in &mut self.columns {
            for item in column.take_items() {
                pool.insert(item.id.clone(), item);
            }
        }
        for item in self.measurer.take_all() {
            pool.insert(item.id.clone(), item);
        }
        self.placements.clear();
        let queue: Vec<Item<K, T>> = self.order.iter().filter_map(|id| pool.remove(id)).collect();
        self.measurer.replace(queue);

        self.number_of_columns = n;
        self.column_width = width;
        self.columns = (0..n).map(|_| self.new_column()).collect();
        self.column_heights = alloc::vec![0; n];
    }

    fn new_column(&self) -> Virtualizer<K, T> {
        let mut column = Virtualizer::new(self.options.column_options());
        column.set_width(self.column_width);
        column.set_viewport_and_scroll(self.viewport_height, self.scroll_offset);
        column
    }

    /// Fires height callbacks for whatever changed since the last publish.
    fn publish(&mut self) {
        if let Some(cb) = &self.options.on_column_height_change {
            if self.published_heights.len() != self.column_heights.len() {
                for (column, &height) in self.column_heights.iter().enumerate() {
                    cb(column, height);
                }
            } else {
                for (column, (&height, &prev)) in self
                    .column_heights
                    .iter()
                    .zip(&self.published_heights)
                    .enumerate()
                {
                    if height != prev {
                        cb(column, height);
                    }
                }
            }
        }
        self.published_heights.clone_from(&self.column_heights);

        let total = self.total_height();
        if total != self.published_total {
            self.published_total = total;
            if let Some(cb) = &self.options.on_total_height_change {
                cb(total);
            }
        }
    }
}

/// Index of the shortest column; ties resolve to the lowest index.
fn shortest_column(heights: &[u64]) -> usize {
    let mut index = 0;
    let mut best = heights.first().copied().unwrap_or(0);
    for (i, &height) in heights.iter().enumerate().skip(1) {
        if height < best {
            best = height;
            index = i;
        }
    }
    index
}
