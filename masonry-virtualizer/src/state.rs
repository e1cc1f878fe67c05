use alloc::vec::Vec;

/// A lightweight, serializable snapshot of a column's scroll state.
///
/// With `feature = "serde"`, this type implements `Serialize`/`Deserialize`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScrollState {
    pub offset: u64,
    pub viewport_size: u32,
}

/// One slot of a [`LayoutState`] column.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SlotState<K> {
    pub id: K,
    pub height: u32,
    pub top_offset: u64,
}

/// A payload-free snapshot of the whole masonry layout.
///
/// Useful for debugging overlays, golden tests and for handing the geometry to a renderer that
/// lives on another thread.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutState<K> {
    pub number_of_columns: usize,
    pub column_width: u32,
    pub columns: Vec<Vec<SlotState<K>>>,
    pub column_heights: Vec<u64>,
}

impl<K> LayoutState<K> {
    pub fn total_height(&self) -> u64 {
        self.column_heights.iter().copied().max().unwrap_or(0)
    }

    pub fn item_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }
}
