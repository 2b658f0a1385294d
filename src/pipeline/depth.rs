// SPDX-License-Identifier: GPL-3.0-only

//! Depth map to grayscale visualization converter
//!
//! Maps the sensor's floating-point depth samples to an 8-bit grayscale
//! frame. Finite samples scale linearly from the sensor range declared in
//! the depth format to `[0, 255]`, clamped at the ends; non-finite samples
//! (occluded or invalid pixels) render black.

use tracing::debug;

use crate::errors::{PipelineError, PipelineResult};
use crate::frame::{DepthFormatDescriptor, DepthFrame, Frame, FrameDescriptor, PixelFormat};
use crate::pipeline::pool::PixelBufferPool;

/// Converts raw depth frames into pooled grayscale frames
#[derive(Debug)]
pub struct DepthToGrayscaleConverter {
    desc: Option<DepthFormatDescriptor>,
    pool: PixelBufferPool,
}

impl DepthToGrayscaleConverter {
    pub fn new() -> Self {
        Self {
            desc: None,
            pool: PixelBufferPool::new(),
        }
    }

    /// Size the output pool for the given depth format
    ///
    /// The depth range is captured here, once, from the source format.
    /// Re-preparing with a different format recreates the pool.
    pub fn prepare(
        &mut self,
        desc: &DepthFormatDescriptor,
        retained_count_hint: usize,
    ) -> PipelineResult<()> {
        if desc.width == 0 || desc.height == 0 {
            return Err(PipelineError::Unsupported(format!(
                "depth format {}x{} has no pixels",
                desc.width, desc.height
            )));
        }
        if !(desc.min_depth.is_finite()
            && desc.max_depth.is_finite()
            && desc.max_depth > desc.min_depth)
        {
            return Err(PipelineError::Unsupported(format!(
                "depth range [{}, {}] is not scalable",
                desc.min_depth, desc.max_depth
            )));
        }
        let out_desc = FrameDescriptor::new(PixelFormat::Gray8, desc.width, desc.height);
        self.pool.prepare(out_desc, retained_count_hint);
        self.desc = Some(*desc);
        debug!(
            width = desc.width,
            height = desc.height,
            min_depth = desc.min_depth,
            max_depth = desc.max_depth,
            hint = retained_count_hint,
            "Depth converter prepared"
        );
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.desc.is_some()
    }

    /// The depth format this converter was prepared with, if any
    pub fn prepared_descriptor(&self) -> Option<&DepthFormatDescriptor> {
        self.desc.as_ref()
    }

    /// Render a depth frame as grayscale
    pub fn render(&mut self, depth: &DepthFrame) -> PipelineResult<Frame> {
        let desc = self
            .desc
            .ok_or(PipelineError::Unprepared("depth converter"))?;
        let input = depth.descriptor();
        if input.width != desc.width || input.height != desc.height {
            return Err(PipelineError::Unsupported(format!(
                "depth frame is {}x{}, converter prepared for {}x{}",
                input.width, input.height, desc.width, desc.height
            )));
        }

        let mut out = self.pool.acquire(depth.timestamp())?;
        let scale = 255.0 / (desc.max_depth - desc.min_depth);
        let min_depth = desc.min_depth;
        for (dst, &sample) in out.data_mut().iter_mut().zip(depth.samples()) {
            *dst = if sample.is_finite() {
                ((sample - min_depth) * scale).clamp(0.0, 255.0).round() as u8
            } else {
                0
            };
        }
        Ok(out)
    }

    /// Return a rendered frame to the converter's pool
    pub fn recycle(&mut self, frame: Frame) {
        self.pool.release(frame);
    }

    /// Drop pool state and the prepared format; idempotent
    pub fn reset(&mut self) {
        self.pool.invalidate();
        self.desc = None;
    }
}

impl Default for DepthToGrayscaleConverter {
    fn default() -> Self {
        Self::new()
    }
}
