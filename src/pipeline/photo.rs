// SPDX-License-Identifier: GPL-3.0-only

//! Still-photo fusion
//!
//! Stills run through the same depth converter + mixer chain as the
//! preview, but on separate instances: a still arrives out of band with no
//! frame-rate pressure, and must not contend with the preview's pools.

use tracing::debug;

use crate::config::PipelineConfig;
use crate::errors::PipelineResult;
use crate::frame::{DepthFrame, Frame};
use crate::pipeline::depth::DepthToGrayscaleConverter;
use crate::pipeline::mixer::VideoMixer;

/// Composites one captured photo with its optional depth map
#[derive(Debug)]
pub struct StillCapturePipeline {
    converter: DepthToGrayscaleConverter,
    mixer: VideoMixer,
    converter_hint: usize,
    mixer_hint: usize,
}

impl StillCapturePipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            converter: DepthToGrayscaleConverter::new(),
            mixer: VideoMixer::new(),
            converter_hint: config.photo_converter_retained_hint,
            mixer_hint: config.photo_mixer_retained_hint,
        }
    }

    /// Fuse a captured color frame with its depth map, if one was delivered
    ///
    /// Stages prepare lazily on first use and re-prepare when the capture
    /// format changes. Without depth the photo passes through untouched,
    /// whatever the mix factor.
    pub fn process(
        &mut self,
        color: Frame,
        depth: Option<DepthFrame>,
        mix_factor: f32,
    ) -> PipelineResult<Frame> {
        let Some(depth) = depth else {
            debug!("Still captured without depth, passing color through");
            return Ok(color);
        };

        if self.converter.prepared_descriptor() != Some(depth.descriptor()) {
            self.converter.prepare(depth.descriptor(), self.converter_hint)?;
        }
        let vis = self.converter.render(&depth)?;

        if self.mixer.prepared_descriptor() != Some(color.descriptor()) {
            self.mixer.prepare(color.descriptor(), self.mixer_hint)?;
        }
        let mixed = self.mixer.mix(color, &vis, mix_factor)?;
        self.converter.recycle(vis);
        Ok(mixed)
    }

    /// Release pool state; stages re-prepare on the next still
    pub fn reset(&mut self) {
        self.converter.reset();
        self.mixer.reset();
    }
}
