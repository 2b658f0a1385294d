// SPDX-License-Identifier: GPL-3.0-only

//! Optional per-frame visual effects for the color leg
//!
//! Effects are interchangeable stages selected by configuration. They
//! share the prepare/apply/reset shape of the other stages and draw their
//! outputs from their own pool, so an effect failure drops the tick the
//! same way a mixer failure does.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{PipelineError, PipelineResult};
use crate::frame::{Frame, FrameDescriptor, PixelFormat};
use crate::pipeline::pool::PixelBufferPool;

/// Effect selection, persisted in the configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// No effect; color frames pass straight to the mixer
    #[default]
    None,
    /// Suppress the green channel for a rosy tint
    Rosy,
}

impl EffectKind {
    /// Instantiate the configured effect, if any
    pub fn build(self) -> Option<Box<dyn FrameEffect + Send>> {
        match self {
            EffectKind::None => None,
            EffectKind::Rosy => Some(Box::new(RosyEffect::new())),
        }
    }
}

/// A prepared, resettable frame transformation
pub trait FrameEffect {
    fn name(&self) -> &'static str;

    fn is_prepared(&self) -> bool;

    /// The color format this effect was prepared with, if any
    fn prepared_descriptor(&self) -> Option<&FrameDescriptor>;

    fn prepare(
        &mut self,
        desc: &FrameDescriptor,
        retained_count_hint: usize,
    ) -> PipelineResult<()>;

    /// Produce a transformed copy of the frame from the effect's pool
    fn apply(&mut self, frame: &Frame) -> PipelineResult<Frame>;

    /// Drop pool state and the prepared format; idempotent
    fn reset(&mut self);
}

impl std::fmt::Debug for dyn FrameEffect + Send {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FrameEffect({})", self.name())
    }
}

/// Zeroes the green channel of every pixel
#[derive(Debug, Default)]
pub struct RosyEffect {
    desc: Option<FrameDescriptor>,
    pool: PixelBufferPool,
}

impl RosyEffect {
    pub fn new() -> Self {
        Self {
            desc: None,
            pool: PixelBufferPool::new(),
        }
    }
}

impl FrameEffect for RosyEffect {
    fn name(&self) -> &'static str {
        "rosy"
    }

    fn is_prepared(&self) -> bool {
        self.desc.is_some()
    }

    fn prepared_descriptor(&self) -> Option<&FrameDescriptor> {
        self.desc.as_ref()
    }

    fn prepare(
        &mut self,
        desc: &FrameDescriptor,
        retained_count_hint: usize,
    ) -> PipelineResult<()> {
        if desc.format != PixelFormat::Bgra8 {
            return Err(PipelineError::Unsupported(format!(
                "rosy effect requires BGRA input, got {:?}",
                desc.format
            )));
        }
        self.pool.prepare(*desc, retained_count_hint);
        self.desc = Some(*desc);
        debug!(width = desc.width, height = desc.height, "Rosy effect prepared");
        Ok(())
    }

    fn apply(&mut self, frame: &Frame) -> PipelineResult<Frame> {
        let desc = self.desc.ok_or(PipelineError::Unprepared("rosy effect"))?;
        if *frame.descriptor() != desc {
            return Err(PipelineError::Unsupported(format!(
                "frame is {}x{} {:?}, effect prepared for {}x{} {:?}",
                frame.width(),
                frame.height(),
                frame.format(),
                desc.width,
                desc.height,
                desc.format
            )));
        }

        let mut out = self.pool.acquire(frame.timestamp())?;
        let out_data = out.data_mut();
        out_data.copy_from_slice(frame.data());
        for px in out_data.chunks_exact_mut(4) {
            px[1] = 0;
        }
        Ok(out)
    }

    fn reset(&mut self) {
        self.pool.invalidate();
        self.desc = None;
    }
}
