// SPDX-License-Identifier: GPL-3.0-only

//! Frame fusion pipeline
//!
//! Pairs color frames with depth frames, renders depth as grayscale,
//! composites the two under a runtime mix factor and tags the result with
//! the display rotation. All per-frame work happens synchronously inside
//! the capture callback; any stage failure drops the current tick.
//!
//! The controller state machine:
//!
//! ```text
//! Uninitialized -> Active -> Suspended -> Active -> TornDown
//! ```
//!
//! Backgrounding suspends the pipeline and synchronously releases every
//! cached buffer; foregrounding re-enables rendering and lets stages
//! re-prepare lazily on the next frame.

pub mod depth;
pub mod effect;
pub mod mixer;
pub mod orientation;
pub mod photo;
pub mod pool;
pub mod sync;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::constants::DEFAULT_EFFECT_RETAINED_HINT;
use crate::frame::{DepthFrame, Frame};
use depth::DepthToGrayscaleConverter;
use effect::FrameEffect;
use mixer::VideoMixer;
use orientation::{InterfaceOrientation, Rotation, SensorPosition, VideoOrientation, rotation_for};
use sync::FrameSynchronizer;

/// Pipeline flags read by the data plane on every tick
///
/// Owned by the controller; mutated only through control calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixState {
    /// Blend weight between color (0.0) and depth visualization (1.0)
    pub mix_factor: f32,
    /// Whether the depth leg runs at all
    pub depth_visualization_enabled: bool,
    /// Master gate; false while suspended
    pub rendering_enabled: bool,
}

impl MixState {
    const DEPTH_BIT: u64 = 1 << 32;
    const RENDERING_BIT: u64 = 1 << 33;

    fn pack(self) -> u64 {
        let mut bits = self.mix_factor.to_bits() as u64;
        if self.depth_visualization_enabled {
            bits |= Self::DEPTH_BIT;
        }
        if self.rendering_enabled {
            bits |= Self::RENDERING_BIT;
        }
        bits
    }

    fn unpack(bits: u64) -> Self {
        Self {
            mix_factor: f32::from_bits(bits as u32),
            depth_visualization_enabled: bits & Self::DEPTH_BIT != 0,
            rendering_enabled: bits & Self::RENDERING_BIT != 0,
        }
    }
}

/// Atomically readable [`MixState`]
///
/// Packed into a single word so the capture context always sees a
/// consistent snapshot while the control context writes lock-free.
#[derive(Debug)]
pub struct SharedMixState(AtomicU64);

impl SharedMixState {
    fn new(state: MixState) -> Self {
        Self(AtomicU64::new(state.pack()))
    }

    pub fn load(&self) -> MixState {
        MixState::unpack(self.0.load(Ordering::Acquire))
    }

    fn store(&self, state: MixState) {
        self.0.store(state.pack(), Ordering::Release);
    }

    fn update(&self, f: impl Fn(MixState) -> MixState) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
                Some(f(MixState::unpack(bits)).pack())
            });
    }
}

/// Lock-free control handle for flag toggles
///
/// Cloneable; safe to use from the control context while the capture
/// context is mid-tick.
#[derive(Debug, Clone)]
pub struct PipelineControls {
    shared: Arc<SharedMixState>,
}

impl PipelineControls {
    pub fn state(&self) -> MixState {
        self.shared.load()
    }

    pub fn mix_factor(&self) -> f32 {
        self.shared.load().mix_factor
    }

    /// Set the blend weight, clamped to `[0.0, 1.0]`
    pub fn set_mix_factor(&self, mix_factor: f32) {
        let mix_factor = mix_factor.clamp(0.0, 1.0);
        self.shared.update(|mut state| {
            state.mix_factor = mix_factor;
            state
        });
    }

    /// Flip between pure color and pure depth, the reference UI gesture
    pub fn toggle_mix_factor(&self) {
        self.shared.update(|mut state| {
            state.mix_factor = if state.mix_factor == 1.0 { 0.0 } else { 1.0 };
            state
        });
    }

    pub fn set_rendering_enabled(&self, enabled: bool) {
        self.shared.update(|mut state| {
            state.rendering_enabled = enabled;
            state
        });
    }
}

/// Controller lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Constructed, no frame delivered yet
    Uninitialized,
    /// Processing frames
    Active,
    /// Backgrounded; caches released, rendering disabled
    Suspended,
    /// Permanently shut down
    TornDown,
}

/// A composited frame tagged for the display sink
#[derive(Debug)]
pub struct CompositedFrame {
    pub frame: Frame,
    pub rotation: Rotation,
    /// True for a front-mounted sensor; the sink flips horizontally
    pub mirrored: bool,
}

/// Owns the fusion stages and orchestrates them per tick
#[derive(Debug)]
pub struct FusionPipeline {
    state: PipelineState,
    mix: Arc<SharedMixState>,
    synchronizer: FrameSynchronizer,
    depth_converter: DepthToGrayscaleConverter,
    video_mixer: VideoMixer,
    video_effect: Option<Box<dyn FrameEffect + Send>>,
    /// Last successfully rendered depth visualization; reused while depth
    /// events lag behind color
    current_depth_vis: Option<Frame>,
    rotation: Rotation,
    mirrored: bool,
    converter_hint: usize,
    mixer_hint: usize,
    dropped_frames: u64,
}

impl FusionPipeline {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            state: PipelineState::Uninitialized,
            mix: Arc::new(SharedMixState::new(MixState {
                mix_factor: config.initial_mix_factor.clamp(0.0, 1.0),
                depth_visualization_enabled: config.depth_visualization_enabled,
                rendering_enabled: true,
            })),
            synchronizer: FrameSynchronizer::new(),
            depth_converter: DepthToGrayscaleConverter::new(),
            video_mixer: VideoMixer::new(),
            video_effect: config.effect.build(),
            current_depth_vis: None,
            rotation: Rotation::Rotate0,
            mirrored: false,
            converter_hint: config.depth_converter_retained_hint,
            mixer_hint: config.mixer_retained_hint,
            dropped_frames: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn mirrored(&self) -> bool {
        self.mirrored
    }

    /// Frames dropped to backpressure or stage failures, for diagnostics
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    /// Handle for the control context
    pub fn controls(&self) -> PipelineControls {
        PipelineControls {
            shared: Arc::clone(&self.mix),
        }
    }

    /// Independent-callback mode: a color frame arrived
    ///
    /// Returns the composited frame for this tick, or `None` when the
    /// tick was gated off or dropped.
    pub fn handle_color_frame(&mut self, color: Frame) -> Option<CompositedFrame> {
        let snapshot = self.mix.load();
        if self.state == PipelineState::TornDown || !snapshot.rendering_enabled {
            return None;
        }
        self.activate();
        let pair = self.synchronizer.on_color(color);
        self.composite(pair.color, snapshot)
    }

    /// Independent-callback mode: a depth frame arrived
    ///
    /// Renders the visualization and replaces the one-deep cache; the
    /// display path stays on the color leg.
    pub fn handle_depth_frame(&mut self, depth: DepthFrame, was_dropped: bool) {
        let snapshot = self.mix.load();
        if self.state == PipelineState::TornDown
            || !snapshot.rendering_enabled
            || !snapshot.depth_visualization_enabled
            || was_dropped
        {
            return;
        }
        self.activate();
        self.synchronizer.on_depth(depth.clone());
        self.render_depth(&depth);
    }

    /// Synchronized mode: one tick of a coupled source
    ///
    /// Either leg may have been dropped at the source; a dropped leg is
    /// absence for this tick, not an error.
    pub fn handle_synchronized(
        &mut self,
        color: Option<Frame>,
        depth: Option<DepthFrame>,
    ) -> Option<CompositedFrame> {
        let snapshot = self.mix.load();
        if self.state == PipelineState::TornDown || !snapshot.rendering_enabled {
            return None;
        }
        self.activate();
        if snapshot.depth_visualization_enabled {
            if let Some(depth) = &depth {
                self.render_depth(depth);
            }
        }
        let pair = self.synchronizer.on_synchronized(color, depth)?;
        self.composite(pair.color, snapshot)
    }

    fn activate(&mut self) {
        if self.state == PipelineState::Uninitialized {
            info!("First frame delivered, pipeline active");
            self.state = PipelineState::Active;
        }
    }

    /// Render one depth frame and replace the cached visualization
    fn render_depth(&mut self, depth: &DepthFrame) {
        if self.depth_converter.prepared_descriptor() != Some(depth.descriptor()) {
            if let Err(e) = self
                .depth_converter
                .prepare(depth.descriptor(), self.converter_hint)
            {
                warn!(error = %e, "Unable to prepare depth converter");
                return;
            }
        }
        match self.depth_converter.render(depth) {
            Ok(vis) => {
                if let Some(previous) = self.current_depth_vis.replace(vis) {
                    self.depth_converter.recycle(previous);
                }
            }
            Err(e) => {
                self.dropped_frames += 1;
                debug!(error = %e, "Unable to render depth frame");
            }
        }
    }

    /// Effect + mix tail shared by both operating modes
    fn composite(&mut self, color: Frame, snapshot: MixState) -> Option<CompositedFrame> {
        let mut frame = color;

        if let Some(effect) = self.video_effect.as_mut() {
            if effect.prepared_descriptor() != Some(frame.descriptor()) {
                if let Err(e) = effect.prepare(frame.descriptor(), DEFAULT_EFFECT_RETAINED_HINT) {
                    warn!(error = %e, "Unable to prepare effect");
                    self.dropped_frames += 1;
                    return None;
                }
            }
            match effect.apply(&frame) {
                Ok(filtered) => frame = filtered,
                Err(e) => {
                    self.dropped_frames += 1;
                    debug!(error = %e, "Effect failed, dropping tick");
                    return None;
                }
            }
        }

        if snapshot.depth_visualization_enabled {
            if self.current_depth_vis.is_some()
                && self.video_mixer.prepared_descriptor() != Some(frame.descriptor())
            {
                if let Err(e) = self.video_mixer.prepare(frame.descriptor(), self.mixer_hint) {
                    warn!(error = %e, "Unable to prepare mixer");
                    self.dropped_frames += 1;
                    return None;
                }
            }
            // Without any rendered depth yet, color passes through
            // regardless of mix factor.
            if let Some(vis) = &self.current_depth_vis {
                match self.video_mixer.mix(frame, vis, snapshot.mix_factor) {
                    Ok(mixed) => frame = mixed,
                    Err(e) => {
                        self.dropped_frames += 1;
                        debug!(error = %e, "Unable to combine video and depth");
                        return None;
                    }
                }
            }
        }

        Some(CompositedFrame {
            frame,
            rotation: self.rotation,
            mirrored: self.mirrored,
        })
    }

    /// Hand a consumed output frame back to the mixer's pool
    pub fn recycle_output(&mut self, frame: Frame) {
        self.video_mixer.recycle(frame);
    }

    /// Toggle the depth leg within `Active`
    ///
    /// Disabling resets the depth leg only; the color leg keeps running.
    pub fn set_depth_visualization_enabled(&mut self, enabled: bool) {
        self.mix.update(|mut state| {
            state.depth_visualization_enabled = enabled;
            state
        });
        if !enabled {
            self.depth_converter.reset();
            self.video_mixer.reset();
            self.current_depth_vis = None;
            self.synchronizer.reset();
            info!("Depth visualization disabled, depth leg reset");
        } else {
            info!("Depth visualization enabled");
        }
    }

    /// Recompute the display rotation after a layout or rotation event
    ///
    /// An unsupported (non-cardinal) reading keeps the previous rotation.
    pub fn update_orientation(
        &mut self,
        interface: InterfaceOrientation,
        video: VideoOrientation,
        position: SensorPosition,
    ) {
        match rotation_for(interface, video, position) {
            Ok(rotation) => {
                debug!(degrees = rotation.degrees(), "Display rotation updated");
                self.rotation = rotation;
            }
            Err(e) => debug!(error = %e, "Keeping previous rotation"),
        }
        self.mirrored = position == SensorPosition::Front;
    }

    /// App moved to the background: release native memory promptly
    ///
    /// Synchronously clears every cached buffer and disables rendering
    /// before returning. Stages re-prepare lazily after foregrounding.
    pub fn entered_background(&mut self) {
        if self.state == PipelineState::TornDown {
            return;
        }
        self.mix.update(|mut state| {
            state.rendering_enabled = false;
            state
        });
        self.release_all();
        self.state = PipelineState::Suspended;
        info!("Pipeline suspended");
    }

    /// App returned to the foreground: resume rendering
    pub fn entered_foreground(&mut self) {
        if self.state != PipelineState::Suspended {
            return;
        }
        self.mix.update(|mut state| {
            state.rendering_enabled = true;
            state
        });
        self.state = PipelineState::Active;
        info!("Pipeline resumed");
    }

    /// Permanent shutdown; releases all pools unconditionally
    pub fn tear_down(&mut self) {
        self.mix.update(|mut state| {
            state.rendering_enabled = false;
            state
        });
        self.release_all();
        self.state = PipelineState::TornDown;
        info!(dropped = self.dropped_frames, "Pipeline torn down");
    }

    fn release_all(&mut self) {
        self.depth_converter.reset();
        self.video_mixer.reset();
        if let Some(effect) = self.video_effect.as_mut() {
            effect.reset();
        }
        self.current_depth_vis = None;
        self.synchronizer.reset();
    }
}
