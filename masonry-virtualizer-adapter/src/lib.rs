//! Frame-driven async measurement for the `masonry-virtualizer` crate.
//!
//! The core crate hands out measurement requests and places resolved heights, but never awaits
//! anything. This crate closes the loop for hosts whose renderer reports heights asynchronously
//! (e.g. after an image decode):
//!
//! - [`Measure`]: `measure(item, width) -> impl Future<Output = Result<u32, MeasureError>>`
//! - [`Controller`]: polls one measurement per frame and places the result
//! - [`FrameWaker`]: a flag-only waker for hosts without an executor
//!
//! This crate is intentionally framework-agnostic (no bindings to a specific UI toolkit).
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod controller;
mod measure;
mod waker;

#[cfg(test)]
mod tests;

pub use controller::{Controller, Tick};
pub use measure::Measure;
pub use waker::FrameWaker;

pub use masonry_virtualizer::MeasureError;
