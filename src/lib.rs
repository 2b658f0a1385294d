// SPDX-License-Identifier: GPL-3.0-only

//! Real-time color and depth frame fusion
//!
//! This library pairs a color stream with a lower-rate depth stream,
//! renders depth maps as grayscale and composites the two under a runtime
//! mix factor, suitable for driving a live preview or one-shot stills.
//!
//! # Architecture
//!
//! - [`pipeline`]: the fusion stages and the controller that orchestrates
//!   them per tick
//! - [`source`]: frame sources and the capture thread lifecycle
//! - [`frame`]: frame and depth frame types with pooled storage
//! - [`config`]: pipeline configuration handling
//!
//! All per-frame work is synchronous; stage failures drop the frame and
//! never block the capture path.

pub mod config;
pub mod constants;
pub mod errors;
pub mod frame;
pub mod pipeline;
pub mod source;

// Re-export commonly used types
pub use config::PipelineConfig;
pub use errors::{PipelineError, PipelineResult};
pub use frame::{DepthFormatDescriptor, DepthFrame, Frame, FrameDescriptor, PixelFormat};
pub use pipeline::{CompositedFrame, FusionPipeline, MixState, PipelineControls, PipelineState};
