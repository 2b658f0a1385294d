// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline-wide constants and defaults

/// Buffers the preview mixer may hold outstanding at once
pub const DEFAULT_MIXER_RETAINED_HINT: usize = 3;

/// Buffers the preview depth converter may hold outstanding at once
pub const DEFAULT_DEPTH_CONVERTER_RETAINED_HINT: usize = 2;

/// Still-capture depth converter hint; stills tolerate more latency
pub const DEFAULT_PHOTO_CONVERTER_RETAINED_HINT: usize = 3;

/// Still-capture mixer hint
pub const DEFAULT_PHOTO_MIXER_RETAINED_HINT: usize = 2;

/// Buffers a color-leg effect may hold outstanding at once
pub const DEFAULT_EFFECT_RETAINED_HINT: usize = 3;

/// Nearest distance the structured-light sensor resolves, in meters
pub const DEFAULT_MIN_DEPTH_METERS: f32 = 0.0;

/// Farthest distance the structured-light sensor resolves, in meters
pub const DEFAULT_MAX_DEPTH_METERS: f32 = 5.0;

/// Color stream rate of the synthetic source
pub const SYNTHETIC_COLOR_FPS: u32 = 30;

/// Depth stream rate of the synthetic source; the sensor produces depth
/// at no more than the color frame rate
pub const SYNTHETIC_DEPTH_FPS: u32 = 15;

/// Default preview dimensions (the source's 720p capture preset)
pub const DEFAULT_COLOR_WIDTH: u32 = 1280;
pub const DEFAULT_COLOR_HEIGHT: u32 = 720;

/// Default depth map dimensions; the sensor delivers depth at a lower
/// resolution than color
pub const DEFAULT_DEPTH_WIDTH: u32 = 640;
pub const DEFAULT_DEPTH_HEIGHT: u32 = 360;
