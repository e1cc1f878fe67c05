//! A headless masonry layout and virtualization engine.
//!
//! For the frame-driven async measurement loop, see the `masonry-virtualizer-adapter` crate.
//!
//! Given an ordered, changing collection of items whose heights are only known once rendered,
//! this crate
//! - assigns every item to one of N columns with a greedy shortest-column heuristic
//!   ([`ColumnAssigner`]),
//! - keeps per-column top offsets in prefix sums so height corrections are cheap
//!   ([`Virtualizer`]),
//! - decides which slots are close enough to the viewport to render at full fidelity,
//! - serializes offscreen measurement so no item enters the layout without a height
//!   ([`OffscreenMeasurer`]).
//!
//! It is UI-agnostic. A host is expected to provide:
//! - the viewport width (decides column count and width)
//! - the scroll offset and viewport height of the scroll container
//! - a renderer that reports an item's natural height at a given width
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod assigner;
mod error;
mod fenwick;
mod key;
mod measurer;
mod options;
mod state;
mod types;
mod virtualizer;


pub use assigner::ColumnAssigner;
pub use error::{ConfigError, MeasureError};
pub use measurer::{MeasureRequest, MeasureTicket, OffscreenMeasurer, PendingMeasurement};
pub use options::{
    MasonryOptions, OnChangeCallback, OnColumnHeightChange, OnTotalHeightChange,
    VirtualizerOptions,
};
pub use state::{LayoutState, ScrollState, SlotState};
pub use types::{Item, ItemsDiff, Placement, RenderedItem, VirtualRange, VirtualSlot};
pub use virtualizer::Virtualizer;

#[doc(hidden)]
pub use key::KeyCacheKey;
