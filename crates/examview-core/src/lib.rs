#![forbid(unsafe_code)]

//! Core: scroll animation and the coalescing carousel controller.

pub mod animation;
pub mod carousel;

pub use carousel::{Carousel, CarouselConfig, ScrollOutcome};
