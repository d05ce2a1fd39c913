//! Scroll-driven pagination trigger and position restore.
//!
//! The viewport reports raw scroll geometry; the pager decides whether the
//! user is close enough to the top to warrant fetching older history, and
//! computes the scroll offset that keeps the viewport visually still after
//! the prepend grows the content.

/// Geometry snapshot of the message viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    /// Distance from the top of the content to the top of the viewport.
    pub scroll_top: f64,
    /// Total content height.
    pub scroll_height: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct ScrollAnchoredPager {
    near_top_threshold: f64,
}

impl ScrollAnchoredPager {
    pub fn new(near_top_threshold: f64) -> Self {
        Self { near_top_threshold }
    }

    /// A backward fetch fires only when the user is near the top, nothing
    /// is already in flight, and history is not exhausted.
    pub fn should_trigger(&self, metrics: ScrollMetrics, in_flight: bool, has_more: bool) -> bool {
        metrics.scroll_top < self.near_top_threshold && !in_flight && has_more
    }
}

/// Pre-prepend geometry captured so the post-prepend scroll position can be
/// restored without visual jump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollAnchor {
    old_top: f64,
    old_height: f64,
}

impl ScrollAnchor {
    pub fn capture(metrics: ScrollMetrics) -> Self {
        Self {
            old_top: metrics.scroll_top,
            old_height: metrics.scroll_height,
        }
    }

    /// Scroll offset that shows the same content after the prepend: the
    /// height delta plus the original offset.
    pub fn restored_top(&self, new_height: f64) -> f64 {
        new_height - self.old_height + self.old_top
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_only_near_top_with_history_and_no_inflight() {
        let pager = ScrollAnchoredPager::new(50.0);
        let near = ScrollMetrics {
            scroll_top: 10.0,
            scroll_height: 2000.0,
        };
        let far = ScrollMetrics {
            scroll_top: 800.0,
            scroll_height: 2000.0,
        };

        assert!(pager.should_trigger(near, false, true));
        assert!(!pager.should_trigger(far, false, true));
        assert!(!pager.should_trigger(near, true, true));
        assert!(!pager.should_trigger(near, false, false));
    }

    #[test]
    fn anchor_keeps_viewport_fixed_across_prepend() {
        let anchor = ScrollAnchor::capture(ScrollMetrics {
            scroll_top: 12.0,
            scroll_height: 1500.0,
        });
        // 30 older messages grow the content to 2400px.
        assert_eq!(anchor.restored_top(2400.0), 912.0);
    }
}
