use alloc::sync::Arc;

use crate::ConfigError;
use crate::virtualizer::Virtualizer;

/// A callback fired when a column's state changes (structure, heights or scroll window).
pub type OnChangeCallback<K, T> = Arc<dyn Fn(&Virtualizer<K, T>) + Send + Sync>;

/// A callback receiving `(column_index, column_height)` whenever a column's height changes.
pub type OnColumnHeightChange = Arc<dyn Fn(usize, u64) + Send + Sync>;

/// A callback receiving the new total layout height (the tallest column).
pub type OnTotalHeightChange = Arc<dyn Fn(u64) + Send + Sync>;

/// Configuration for a single column [`Virtualizer`].
pub struct VirtualizerOptions<K, T> {
    /// Space between consecutive slots.
    pub gap: u32,
    /// Extra distance above and below the viewport within which slots count as visible.
    ///
    /// `None` uses one full viewport height.
    pub render_margin: Option<u32>,
    /// Where the column starts inside the scroll container (e.g. below a page header).
    pub scroll_margin: u32,
    pub on_change: Option<OnChangeCallback<K, T>>,
}

impl<K, T> VirtualizerOptions<K, T> {
    pub fn new() -> Self {
        Self {
            gap: 0,
            render_margin: None,
            scroll_margin: 0,
            on_change: None,
        }
    }

    pub fn with_gap(mut self, gap: u32) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_render_margin(mut self, render_margin: Option<u32>) -> Self {
        self.render_margin = render_margin;
        self
    }

    pub fn with_scroll_margin(mut self, scroll_margin: u32) -> Self {
        self.scroll_margin = scroll_margin;
        self
    }

    pub fn with_on_change(
        mut self,
        on_change: Option<impl Fn(&Virtualizer<K, T>) + Send + Sync + 'static>,
    ) -> Self {
        self.on_change = on_change.map(|f| Arc::new(f) as _);
        self
    }
}

impl<K, T> Default for VirtualizerOptions<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> Clone for VirtualizerOptions<K, T> {
    fn clone(&self) -> Self {
        Self {
            gap: self.gap,
            render_margin: self.render_margin,
            scroll_margin: self.scroll_margin,
            on_change: self.on_change.clone(),
        }
    }
}

impl<K, T> core::fmt::Debug for VirtualizerOptions<K, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VirtualizerOptions")
            .field("gap", &self.gap)
            .field("render_margin", &self.render_margin)
            .field("scroll_margin", &self.scroll_margin)
            .finish_non_exhaustive()
    }
}

/// Configuration for [`crate::ColumnAssigner`].
///
/// Like the column options this is cheap to clone: callbacks live in `Arc`s so a host can tweak
/// one field and call `ColumnAssigner::set_options`.
pub struct MasonryOptions {
    /// Upper bound for a column's width. Also decides how many columns fit the viewport.
    pub max_item_width: u32,
    /// Optional cap on the number of columns.
    pub max_columns: Option<usize>,
    /// Space between columns and between items inside a column.
    pub gap: u32,
    /// Height used for items whose measurement failed.
    ///
    /// `None` places a square tile (the current column width).
    pub fallback_height: Option<u32>,
    /// See [`VirtualizerOptions::render_margin`].
    pub render_margin: Option<u32>,
    /// See [`VirtualizerOptions::scroll_margin`].
    pub scroll_margin: u32,
    pub on_column_height_change: Option<OnColumnHeightChange>,
    pub on_total_height_change: Option<OnTotalHeightChange>,
}

impl MasonryOptions {
    /// Creates options with the given column width cap and no column count limit.
    pub fn new(max_item_width: u32) -> Self {
        Self {
            max_item_width,
            max_columns: None,
            gap: 0,
            fallback_height: None,
            render_margin: None,
            scroll_margin: 0,
            on_column_height_change: None,
            on_total_height_change: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_item_width == 0 {
            return Err(ConfigError::ZeroMaxItemWidth);
        }
        if self.max_columns == Some(0) {
            return Err(ConfigError::ZeroMaxColumns);
        }
        Ok(())
    }

    pub fn with_max_columns(mut self, max_columns: Option<usize>) -> Self {
        self.max_columns = max_columns;
        self
    }

    pub fn with_gap(mut self, gap: u32) -> Self {
        self.gap = gap;
        self
    }

    pub fn with_fallback_height(mut self, fallback_height: Option<u32>) -> Self {
        self.fallback_height = fallback_height;
        self
    }

    pub fn with_render_margin(mut self, render_margin: Option<u32>) -> Self {
        self.render_margin = render_margin;
        self
    }

    pub fn with_scroll_margin(mut self, scroll_margin: u32) -> Self {
        self.scroll_margin = scroll_margin;
        self
    }

    pub fn with_on_column_height_change(
        mut self,
        f: Option<impl Fn(usize, u64) + Send + Sync + 'static>,
    ) -> Self {
        self.on_column_height_change = f.map(|f| Arc::new(f) as _);
        self
    }

    pub fn with_on_total_height_change(
        mut self,
        f: Option<impl Fn(u64) + Send + Sync + 'static>,
    ) -> Self {
        self.on_total_height_change = f.map(|f| Arc::new(f) as _);
        self
    }

    /// Number of columns for a viewport width. Never returns zero.
    pub fn number_of_columns(&self, viewport_width: u32) -> usize {
        let max_item_width = self.max_item_width.max(1);
        let fit = viewport_width.div_ceil(max_item_width) as usize;
        let capped = match self.max_columns {
            Some(max) => fit.min(max),
            None => fit,
        };
        capped.max(1)
    }

    /// Width of every column for a viewport width and column count.
    pub fn column_width(&self, viewport_width: u32, number_of_columns: usize) -> u32 {
        let n = number_of_columns.max(1) as u64;
        let gaps = (self.gap as u64).saturating_mul(n - 1);
        let available = (viewport_width as u64).saturating_sub(gaps);
        let width = (available / n).min(self.max_item_width as u64);
        width as u32
    }

    pub(crate) fn column_options<K, T>(&self) -> VirtualizerOptions<K, T> {
        VirtualizerOptions::new()
            .with_gap(self.gap)
            .with_render_margin(self.render_margin)
            .with_scroll_margin(self.scroll_margin)
    }
}

impl Clone for MasonryOptions {
    fn clone(&self) -> Self {
        Self {
            max_item_width: self.max_item_width,
            max_columns: self.max_columns,
            gap: self.gap,
            fallback_height: self.fallback_height,
            render_margin: self.render_margin,
            scroll_margin: self.scroll_margin,
            on_column_height_change: self.on_column_height_change.clone(),
            on_total_height_change: self.on_total_height_change.clone(),
        }
    }
}

impl core::fmt::Debug for MasonryOptions {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MasonryOptions")
            .field("max_item_width", &self.max_item_width)
            .field("max_columns", &self.max_columns)
            .field("gap", &self.gap)
            .field("fallback_height", &self.fallback_height)
            .field("render_margin", &self.render_margin)
            .field("scroll_margin", &self.scroll_margin)
            .finish_non_exhaustive()
    }
}
