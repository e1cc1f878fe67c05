/// An entry of the externally supplied collection.
///
/// `id` is the only diffing key: an id that stays in the collection keeps its slot even if its
/// position in the collection changes. `payload` is never inspected by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item<K, T> {
    pub id: K,
    pub payload: T,
}

impl<K, T> Item<K, T> {
    pub fn new(id: K, payload: T) -> Self {
        Self { id, payload }
    }
}

impl<K, T> From<(K, T)> for Item<K, T> {
    fn from((id, payload): (K, T)) -> Self {
        Self { id, payload }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualRange {
    pub start_index: usize,
    pub end_index: usize, // exclusive
}

impl VirtualRange {
    pub const EMPTY: Self = Self {
        start_index: 0,
        end_index: 0,
    };

    pub fn is_empty(&self) -> bool {
        self.start_index >= self.end_index
    }

    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn contains(&self, index: usize) -> bool {
        index >= self.start_index && index < self.end_index
    }
}

/// Geometry of one slot in a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VirtualSlot {
    pub index: usize,
    /// Offset from the top of the column (includes `scroll_margin`).
    pub top: u64,
    /// Height of the slot (excludes `gap`).
    pub height: u32,
    /// Whether the slot intersects the render window.
    pub visible: bool,
}

impl VirtualSlot {
    pub fn bottom(&self) -> u64 {
        self.top.saturating_add(self.height as u64)
    }
}

/// Where a measured item ended up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Placement {
    pub column: usize,
    pub row: usize,
    pub top: u64,
    pub height: u32,
}

/// Outcome of [`crate::ColumnAssigner::set_items`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemsDiff {
    /// Ids that were not known before and are now queued for measurement.
    pub added: usize,
    /// Ids that disappeared (placed or still pending).
    pub removed: usize,
}

impl ItemsDiff {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

/// A slot as seen by a renderer.
///
/// When `visible` is false the renderer is expected to draw an inert placeholder of `height`
/// so that scroll position and column height are preserved.
#[derive(Debug)]
pub struct RenderedItem<'a, K, T> {
    pub id: &'a K,
    pub payload: &'a T,
    pub column: usize,
    pub row: usize,
    /// Left edge of the column.
    pub left: u64,
    pub width: u32,
    pub top: u64,
    pub height: u32,
    pub visible: bool,
}

impl<K, T> Clone for RenderedItem<'_, K, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, T> Copy for RenderedItem<'_, K, T> {}
