// SPDX-License-Identifier: GPL-3.0-only

//! Color + depth visualization compositor
//!
//! Blends a BGRA color frame with a grayscale depth visualization into a
//! single BGRA output: `out = round(color * (1 - m) + gray * m)` per color
//! channel, with the single-channel gray broadcast across blue, green and
//! red. Alpha is taken from the color frame. The depth visualization is
//! sampled nearest-neighbor, since the sensor delivers depth at a lower
//! resolution than color.

use tracing::debug;

use crate::errors::{PipelineError, PipelineResult};
use crate::frame::{Frame, FrameDescriptor, PixelFormat};
use crate::pipeline::pool::PixelBufferPool;

/// Blends color frames with depth visualizations through a pooled output
#[derive(Debug)]
pub struct VideoMixer {
    desc: Option<FrameDescriptor>,
    pool: PixelBufferPool,
}

impl VideoMixer {
    pub fn new() -> Self {
        Self {
            desc: None,
            pool: PixelBufferPool::new(),
        }
    }

    /// Size the output pool for the given color format
    pub fn prepare(
        &mut self,
        color_desc: &FrameDescriptor,
        retained_count_hint: usize,
    ) -> PipelineResult<()> {
        if color_desc.format != PixelFormat::Bgra8 {
            return Err(PipelineError::Unsupported(format!(
                "mixer requires BGRA color input, got {:?}",
                color_desc.format
            )));
        }
        self.pool.prepare(*color_desc, retained_count_hint);
        self.desc = Some(*color_desc);
        debug!(
            width = color_desc.width,
            height = color_desc.height,
            hint = retained_count_hint,
            "Mixer prepared"
        );
        Ok(())
    }

    pub fn is_prepared(&self) -> bool {
        self.desc.is_some()
    }

    /// The color format this mixer was prepared with, if any
    pub fn prepared_descriptor(&self) -> Option<&FrameDescriptor> {
        self.desc.as_ref()
    }

    /// Blend a color frame with a depth visualization
    ///
    /// `mix_factor` is clamped to `[0.0, 1.0]`. At exactly `0.0` the color
    /// frame passes through untouched without touching the pool. Failure
    /// consumes the color frame; callers treat that as a dropped tick.
    pub fn mix(
        &mut self,
        color: Frame,
        depth_vis: &Frame,
        mix_factor: f32,
    ) -> PipelineResult<Frame> {
        let desc = self.desc.ok_or(PipelineError::Unprepared("video mixer"))?;
        if *color.descriptor() != desc {
            return Err(PipelineError::Unsupported(format!(
                "color frame is {}x{} {:?}, mixer prepared for {}x{} {:?}",
                color.width(),
                color.height(),
                color.format(),
                desc.width,
                desc.height,
                desc.format
            )));
        }
        if depth_vis.format() != PixelFormat::Gray8 {
            return Err(PipelineError::Unsupported(format!(
                "depth visualization must be Gray8, got {:?}",
                depth_vis.format()
            )));
        }
        if depth_vis.width() == 0 || depth_vis.height() == 0 {
            return Err(PipelineError::Unsupported(format!(
                "depth visualization {}x{} has no pixels",
                depth_vis.width(),
                depth_vis.height()
            )));
        }

        let m = mix_factor.clamp(0.0, 1.0);
        if m == 0.0 {
            return Ok(color);
        }

        let mut out = self.pool.acquire(color.timestamp())?;
        let (cw, ch) = (desc.width as usize, desc.height as usize);
        let (dw, dh) = (depth_vis.width() as usize, depth_vis.height() as usize);
        let color_stride = color.stride();
        let vis_stride = depth_vis.stride();
        let out_stride = out.stride();

        let color_data = color.data();
        let vis_data = depth_vis.data();
        let out_data = out.data_mut();
        let inv = 1.0 - m;

        for y in 0..ch {
            let vis_row = &vis_data[(y * dh / ch) * vis_stride..];
            let src_row = &color_data[y * color_stride..y * color_stride + cw * 4];
            let dst_row = &mut out_data[y * out_stride..y * out_stride + cw * 4];
            for x in 0..cw {
                let gray = vis_row[x * dw / cw] as f32;
                let i = x * 4;
                dst_row[i] = (src_row[i] as f32 * inv + gray * m).round() as u8;
                dst_row[i + 1] = (src_row[i + 1] as f32 * inv + gray * m).round() as u8;
                dst_row[i + 2] = (src_row[i + 2] as f32 * inv + gray * m).round() as u8;
                dst_row[i + 3] = src_row[i + 3];
            }
        }
        Ok(out)
    }

    /// Return a mixed frame to the mixer's pool
    pub fn recycle(&mut self, frame: Frame) {
        self.pool.release(frame);
    }

    /// Drop pool state and the prepared format; idempotent
    pub fn reset(&mut self) {
        self.pool.invalidate();
        self.desc = None;
    }
}

impl Default for VideoMixer {
    fn default() -> Self {
        Self::new()
    }
}
