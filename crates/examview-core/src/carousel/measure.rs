#![forbid(unsafe_code)]

//! Layout measurements the carousel scrolls against.

use thiserror::Error;

/// A snapshot of a list container's layout along the scroll axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListMetrics {
    /// Total extent of the list content.
    pub content_extent: f64,
    /// Visible extent of the viewport.
    pub viewport_extent: f64,
    /// Current scroll offset of the viewport.
    pub scroll_offset: f64,
    /// Leading-edge offset of each item, relative to the top of the list.
    pub item_offsets: Vec<f64>,
}

/// Why a measurement cannot be scrolled against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MeasureError {
    #[error("list has no items")]
    Empty,
    #[error("viewport has no extent (not laid out yet)")]
    NotLaidOut,
    #[error("measurement contains non-finite values")]
    NonFinite,
}

impl ListMetrics {
    /// Metrics for `count` items of equal `item_extent` in a viewport of
    /// `viewport_extent`, scrolled to the top.
    #[must_use]
    pub fn uniform(count: usize, item_extent: f64, viewport_extent: f64) -> Self {
        Self {
            content_extent: count as f64 * item_extent,
            viewport_extent,
            scroll_offset: 0.0,
            item_offsets: (0..count).map(|i| i as f64 * item_extent).collect(),
        }
    }

    /// Same metrics with a different scroll offset.
    #[must_use]
    pub fn scrolled_to(mut self, offset: f64) -> Self {
        self.scroll_offset = offset;
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.item_offsets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.item_offsets.is_empty()
    }

    /// Check the measurement is usable.
    ///
    /// # Errors
    ///
    /// Returns [`MeasureError`] for an empty list, a zero or negative
    /// viewport, or non-finite values.
    pub fn validate(&self) -> Result<(), MeasureError> {
        if self.item_offsets.is_empty() {
            return Err(MeasureError::Empty);
        }
        let finite = self.content_extent.is_finite()
            && self.viewport_extent.is_finite()
            && self.scroll_offset.is_finite()
            && self.item_offsets.iter().all(|o| o.is_finite());
        if !finite {
            return Err(MeasureError::NonFinite);
        }
        if self.viewport_extent <= 0.0 {
            return Err(MeasureError::NotLaidOut);
        }
        Ok(())
    }

    /// The last index that can be scrolled to the top of the viewport
    /// without leaving blank space below the list.
    ///
    /// This is the smallest index whose remaining content (from its leading
    /// edge to the end of the list) fits in the viewport. When no item
    /// qualifies, every item can reach the top and the last index is
    /// returned.
    #[must_use]
    pub fn max_reachable_index(&self) -> usize {
        self.item_offsets
            .iter()
            .position(|offset| self.content_extent - offset <= self.viewport_extent)
            .unwrap_or_else(|| self.item_offsets.len().saturating_sub(1))
    }

    /// Clamp a requested index into `0..=max_reachable_index()`.
    #[must_use]
    pub fn clamp_index(&self, target: isize) -> usize {
        let max = self.max_reachable_index();
        usize::try_from(target).map_or(0, |t| t.min(max))
    }
}

/// Source of [`ListMetrics`] for one list container.
pub trait Measure {
    /// Measure the container as of now. May return degenerate values before
    /// layout; the carousel treats those as "not ready".
    fn measure(&self) -> ListMetrics;
}

impl<F> Measure for F
where
    F: Fn() -> ListMetrics,
{
    fn measure(&self) -> ListMetrics {
        self()
    }
}
