// SPDX-License-Identifier: GPL-3.0-only

//! Color / depth frame synchronizer
//!
//! Pairs each color frame with the most recently observed depth frame.
//! Two operating modes, selected by how the source delivers frames:
//!
//! - independent callbacks: color and depth arrive on separate, unordered
//!   event streams. Each color event pairs against the one-deep cache of
//!   the last observed depth frame, possibly none, possibly stale; a depth
//!   event only refreshes the cache.
//! - synchronized: the source emits matched (color, depth) tuples aligned
//!   to one capture window, with either leg possibly dropped for the tick.
//!
//! Neither mode blocks or queues; pairing is a cache lookup.

use crate::frame::{DepthFrame, Frame};

/// A color frame paired with the last observed depth frame
///
/// Never mutated after emission.
#[derive(Debug)]
pub struct SyncedPair {
    pub color: Frame,
    pub depth: Option<DepthFrame>,
    /// Whether a depth frame was cached at pairing time. Says nothing
    /// about temporal alignment; the cached frame may be arbitrarily old.
    pub both_present: bool,
}

/// Pairs independently timed color and depth events
#[derive(Debug, Default)]
pub struct FrameSynchronizer {
    last_depth: Option<DepthFrame>,
}

impl FrameSynchronizer {
    pub fn new() -> Self {
        Self { last_depth: None }
    }

    /// Independent-callback mode: pair a color event against the cache
    pub fn on_color(&mut self, color: Frame) -> SyncedPair {
        let depth = self.last_depth.clone();
        SyncedPair {
            both_present: depth.is_some(),
            color,
            depth,
        }
    }

    /// Independent-callback mode: a depth event refreshes the cache
    pub fn on_depth(&mut self, depth: DepthFrame) {
        self.last_depth = Some(depth);
    }

    /// Synchronized mode: one tick of a coupled source
    ///
    /// A `None` leg was dropped at the source for this tick; that is
    /// absence, not an error. Returns a pair only when color survived.
    pub fn on_synchronized(
        &mut self,
        color: Option<Frame>,
        depth: Option<DepthFrame>,
    ) -> Option<SyncedPair> {
        if let Some(depth) = depth {
            self.last_depth = Some(depth);
        }
        color.map(|color| self.on_color(color))
    }

    /// The most recently observed depth frame, if any
    pub fn last_depth(&self) -> Option<&DepthFrame> {
        self.last_depth.as_ref()
    }

    /// Clear the one-deep cache
    pub fn reset(&mut self) {
        self.last_depth = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{DepthFormatDescriptor, FrameDescriptor, PixelFormat};
    use std::time::Duration;

    fn color_at(ms: u64) -> Frame {
        Frame::new(
            FrameDescriptor::new(PixelFormat::Bgra8, 2, 2),
            Duration::from_millis(ms),
        )
    }

    fn depth_at(ms: u64) -> DepthFrame {
        DepthFrame::new(
            DepthFormatDescriptor::new(2, 2, 0.0, 5.0),
            vec![1.0; 4],
            Duration::from_millis(ms),
        )
        .unwrap()
    }

    #[test]
    fn test_color_without_depth_is_unpaired() {
        let mut sync = FrameSynchronizer::new();
        let pair = sync.on_color(color_at(0));
        assert!(!pair.both_present);
        assert!(pair.depth.is_none());
    }

    #[test]
    fn test_cached_depth_is_attached() {
        let mut sync = FrameSynchronizer::new();
        sync.on_depth(depth_at(10));
        let pair = sync.on_color(color_at(40));
        assert!(pair.both_present);
        assert_eq!(
            pair.depth.unwrap().timestamp(),
            Duration::from_millis(10)
        );
    }

    #[test]
    fn test_stale_depth_still_pairs() {
        // The cache has no freshness bound; the compositor decides what
        // to do with an old visualization.
        let mut sync = FrameSynchronizer::new();
        sync.on_depth(depth_at(10));
        let pair = sync.on_color(color_at(5000));
        assert!(pair.both_present);
    }

    #[test]
    fn test_cache_is_one_deep() {
        let mut sync = FrameSynchronizer::new();
        sync.on_depth(depth_at(10));
        sync.on_depth(depth_at(80));
        let pair = sync.on_color(color_at(90));
        assert_eq!(
            pair.depth.unwrap().timestamp(),
            Duration::from_millis(80)
        );
    }

    #[test]
    fn test_synchronized_tick_with_both_legs() {
        let mut sync = FrameSynchronizer::new();
        let pair = sync
            .on_synchronized(Some(color_at(33)), Some(depth_at(33)))
            .unwrap();
        assert!(pair.both_present);
    }

    #[test]
    fn test_synchronized_dropped_depth_leg() {
        let mut sync = FrameSynchronizer::new();
        sync.on_synchronized(Some(color_at(0)), Some(depth_at(0)));
        // Depth leg dropped this tick: the cached frame still pairs.
        let pair = sync.on_synchronized(Some(color_at(33)), None).unwrap();
        assert!(pair.both_present);
    }

    #[test]
    fn test_synchronized_dropped_color_leg() {
        let mut sync = FrameSynchronizer::new();
        assert!(sync.on_synchronized(None, Some(depth_at(0))).is_none());
        assert!(sync.last_depth().is_some());
    }

    #[test]
    fn test_reset_clears_cache() {
        let mut sync = FrameSynchronizer::new();
        sync.on_depth(depth_at(0));
        sync.reset();
        assert!(sync.last_depth().is_none());
        assert!(!sync.on_color(color_at(0)).both_present);
    }
}
