// SPDX-License-Identifier: GPL-3.0-only

//! Synthetic depth camera
//!
//! Generates a deterministic color gradient at 30 fps and a sweeping
//! radial depth field at 15 fps, interleaved in timestamp order. A band of
//! each depth frame is non-finite to exercise the converter's handling of
//! occluded sensor pixels, and every so often a depth event is flagged as
//! dropped the way a real sensor sheds frames under pressure.

use std::time::Duration;

use tracing::info;

use crate::constants::{
    DEFAULT_COLOR_HEIGHT, DEFAULT_COLOR_WIDTH, DEFAULT_DEPTH_HEIGHT, DEFAULT_DEPTH_WIDTH,
    DEFAULT_MAX_DEPTH_METERS, DEFAULT_MIN_DEPTH_METERS, SYNTHETIC_COLOR_FPS, SYNTHETIC_DEPTH_FPS,
};
use crate::frame::{DepthFormatDescriptor, DepthFrame, Frame, FrameDescriptor, PixelFormat};
use crate::source::CaptureEvent;

/// Every Nth depth event is delivered with the dropped flag set
const DEPTH_DROP_PERIOD: u64 = 50;

/// Deterministic stand-in for capture hardware
#[derive(Debug)]
pub struct SyntheticDepthCamera {
    color_desc: FrameDescriptor,
    depth_desc: DepthFormatDescriptor,
    color_interval: Duration,
    depth_interval: Duration,
    color_ticks: u64,
    depth_ticks: u64,
}

impl SyntheticDepthCamera {
    pub fn new() -> Self {
        Self::with_dimensions(
            DEFAULT_COLOR_WIDTH,
            DEFAULT_COLOR_HEIGHT,
            DEFAULT_DEPTH_WIDTH,
            DEFAULT_DEPTH_HEIGHT,
        )
    }

    pub fn with_dimensions(
        color_width: u32,
        color_height: u32,
        depth_width: u32,
        depth_height: u32,
    ) -> Self {
        info!(
            color_width,
            color_height, depth_width, depth_height, "Synthetic depth camera ready"
        );
        Self {
            color_desc: FrameDescriptor::new(PixelFormat::Bgra8, color_width, color_height),
            depth_desc: DepthFormatDescriptor::new(
                depth_width,
                depth_height,
                DEFAULT_MIN_DEPTH_METERS,
                DEFAULT_MAX_DEPTH_METERS,
            ),
            color_interval: Duration::from_secs(1) / SYNTHETIC_COLOR_FPS,
            depth_interval: Duration::from_secs(1) / SYNTHETIC_DEPTH_FPS,
            color_ticks: 0,
            depth_ticks: 0,
        }
    }

    pub fn color_descriptor(&self) -> &FrameDescriptor {
        &self.color_desc
    }

    pub fn depth_descriptor(&self) -> &DepthFormatDescriptor {
        &self.depth_desc
    }

    /// Produce the next event in timestamp order
    ///
    /// On a timestamp tie the depth event goes first, so the matching
    /// color frame pairs against the fresh depth frame.
    pub fn next_event(&mut self) -> CaptureEvent {
        let next_color = self.color_interval * self.color_ticks as u32;
        let next_depth = self.depth_interval * self.depth_ticks as u32;
        if next_depth <= next_color {
            let frame = self.depth_frame_at(next_depth, self.depth_ticks);
            self.depth_ticks += 1;
            CaptureEvent::Depth {
                frame,
                was_dropped: self.depth_ticks % DEPTH_DROP_PERIOD == 0,
            }
        } else {
            let frame = self.color_frame_at(next_color, self.color_ticks);
            self.color_ticks += 1;
            CaptureEvent::Color(frame)
        }
    }

    /// One out-of-band still at the current stream position
    pub fn snapshot(&self) -> (Frame, DepthFrame) {
        let at = self.color_interval * self.color_ticks as u32;
        (
            self.color_frame_at(at, self.color_ticks),
            self.depth_frame_at(at, self.depth_ticks),
        )
    }

    fn color_frame_at(&self, timestamp: Duration, tick: u64) -> Frame {
        let mut frame = Frame::new(self.color_desc, timestamp);
        let width = self.color_desc.width as usize;
        let height = self.color_desc.height as usize;
        let phase = (tick % 256) as u8;
        for (y, row) in frame.data_mut().chunks_exact_mut(width * 4).enumerate() {
            let g = (y * 255 / height.max(1)) as u8;
            for (x, px) in row.chunks_exact_mut(4).enumerate() {
                let b = (x * 255 / width.max(1)) as u8;
                px[0] = b;
                px[1] = g;
                px[2] = phase;
                px[3] = 255;
            }
        }
        frame
    }

    fn depth_frame_at(&self, timestamp: Duration, tick: u64) -> DepthFrame {
        let width = self.depth_desc.width as usize;
        let height = self.depth_desc.height as usize;
        let range = self.depth_desc.max_depth - self.depth_desc.min_depth;
        let cx = width as f32 / 2.0;
        let cy = height as f32 / 2.0;
        let max_r = (cx * cx + cy * cy).sqrt();
        // The blob's center distance sweeps through the sensor range.
        let sweep = ((tick % 32) as f32 / 32.0) * range;

        let mut samples = vec![0.0f32; width * height];
        for y in 0..height {
            for x in 0..width {
                // Left edge of every frame reads as occluded.
                if x < width / 16 {
                    samples[y * width + x] = f32::NAN;
                    continue;
                }
                let dx = x as f32 - cx;
                let dy = y as f32 - cy;
                let r = (dx * dx + dy * dy).sqrt() / max_r;
                let d = self.depth_desc.min_depth + (sweep + r * range) % range;
                samples[y * width + x] = d;
            }
        }
        DepthFrame::new(self.depth_desc, samples, timestamp)
            .unwrap_or_else(|_| unreachable!("generated sample count matches descriptor"))
    }
}

impl Default for SyntheticDepthCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_are_timestamp_ordered() {
        let mut camera = SyntheticDepthCamera::with_dimensions(64, 32, 32, 16);
        let mut last = Duration::ZERO;
        for _ in 0..200 {
            let event = camera.next_event();
            assert!(event.timestamp() >= last);
            last = event.timestamp();
        }
    }

    #[test]
    fn test_color_outpaces_depth_two_to_one() {
        let mut camera = SyntheticDepthCamera::with_dimensions(64, 32, 32, 16);
        let mut colors = 0u32;
        let mut depths = 0u32;
        for _ in 0..300 {
            match camera.next_event() {
                CaptureEvent::Color(_) => colors += 1,
                CaptureEvent::Depth { .. } => depths += 1,
            }
        }
        assert!(colors > depths);
        assert!(colors <= depths * 2 + 2);
    }

    #[test]
    fn test_depth_frames_contain_occluded_band() {
        let mut camera = SyntheticDepthCamera::with_dimensions(64, 32, 32, 16);
        loop {
            if let CaptureEvent::Depth { frame, .. } = camera.next_event() {
                assert!(frame.samples().iter().any(|s| s.is_nan()));
                assert!(frame.samples().iter().any(|s| s.is_finite()));
                break;
            }
        }
    }

    #[test]
    fn test_finite_samples_stay_in_sensor_range() {
        let mut camera = SyntheticDepthCamera::with_dimensions(64, 32, 32, 16);
        loop {
            if let CaptureEvent::Depth { frame, .. } = camera.next_event() {
                let desc = frame.descriptor();
                for s in frame.samples().iter().filter(|s| s.is_finite()) {
                    assert!(*s >= desc.min_depth && *s <= desc.max_depth);
                }
                break;
            }
        }
    }

    #[test]
    fn test_snapshot_dimensions_match_descriptors() {
        let camera = SyntheticDepthCamera::with_dimensions(64, 32, 32, 16);
        let (color, depth) = camera.snapshot();
        assert_eq!(color.descriptor(), camera.color_descriptor());
        assert_eq!(depth.descriptor(), camera.depth_descriptor());
    }

    #[test]
    fn test_periodic_depth_drops() {
        let mut camera = SyntheticDepthCamera::with_dimensions(64, 32, 32, 16);
        let mut depths = 0u64;
        let mut dropped = 0u64;
        for _ in 0..400 {
            if let CaptureEvent::Depth { was_dropped, .. } = camera.next_event() {
                depths += 1;
                if was_dropped {
                    dropped += 1;
                }
            }
        }
        assert_eq!(dropped, depths / DEPTH_DROP_PERIOD);
    }
}
