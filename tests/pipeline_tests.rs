// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the fusion pipeline
//!
//! Drives the full controller with the synthetic source and checks the
//! stage contracts at crate level.

use std::time::Duration;

use depthcam::config::PipelineConfig;
use depthcam::frame::{DepthFormatDescriptor, DepthFrame, Frame, FrameDescriptor, PixelFormat};
use depthcam::pipeline::FusionPipeline;
use depthcam::pipeline::depth::DepthToGrayscaleConverter;
use depthcam::pipeline::mixer::VideoMixer;
use depthcam::pipeline::photo::StillCapturePipeline;
use depthcam::source::CaptureEvent;
use depthcam::source::synthetic::SyntheticDepthCamera;

fn solid_color(desc: FrameDescriptor, bgra: [u8; 4], ms: u64) -> Frame {
    let mut frame = Frame::new(desc, Duration::from_millis(ms));
    for px in frame.data_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&bgra);
    }
    frame
}

#[test]
fn test_midpoint_blend_at_720p() {
    // Solid RGB (200, 100, 50) mixed with gray 128 at 0.5 lands on
    // (164, 114, 89) per channel within rounding tolerance.
    let color_desc = FrameDescriptor::new(PixelFormat::Bgra8, 1280, 720);
    let color = solid_color(color_desc, [50, 100, 200, 255], 0);

    let vis_desc = FrameDescriptor::new(PixelFormat::Gray8, 1280, 720);
    let mut vis = Frame::new(vis_desc, Duration::ZERO);
    vis.data_mut().fill(128);

    let mut mixer = VideoMixer::new();
    mixer.prepare(&color_desc, 2).unwrap();
    let out = mixer.mix(color, &vis, 0.5).unwrap();

    let expected = [89u8, 114, 164, 255];
    for px in out.data().chunks_exact(4) {
        for (got, want) in px.iter().zip(expected.iter()) {
            assert!(
                got.abs_diff(*want) <= 1,
                "channel {} outside rounding tolerance of {}",
                got,
                want
            );
        }
    }
}

#[test]
fn test_preview_stream_end_to_end() {
    let mut camera = SyntheticDepthCamera::with_dimensions(128, 72, 64, 36);
    let mut pipeline = FusionPipeline::new(&PipelineConfig::default());
    pipeline.controls().set_mix_factor(0.5);

    let mut colors = 0u64;
    let mut outputs = 0u64;
    for _ in 0..300 {
        match camera.next_event() {
            CaptureEvent::Color(frame) => {
                colors += 1;
                if let Some(out) = pipeline.handle_color_frame(frame) {
                    outputs += 1;
                    assert_eq!(out.frame.descriptor(), camera.color_descriptor());
                    pipeline.recycle_output(out.frame);
                }
            }
            CaptureEvent::Depth { frame, was_dropped } => {
                pipeline.handle_depth_frame(frame, was_dropped);
            }
        }
    }

    // Every color event produces an output at the display sink.
    assert_eq!(outputs, colors);
    assert_eq!(pipeline.dropped_frames(), 0);
}

#[test]
fn test_visualization_reuse_across_depth_dropout() {
    let mut pipeline = FusionPipeline::new(&PipelineConfig::default());
    pipeline.controls().set_mix_factor(1.0);

    let depth_desc = DepthFormatDescriptor::new(8, 4, 0.0, 5.0);
    let depth = DepthFrame::new(depth_desc, vec![2.5; 32], Duration::ZERO).unwrap();
    pipeline.handle_depth_frame(depth, false);

    let color_desc = FrameDescriptor::new(PixelFormat::Bgra8, 16, 8);
    let mut outputs = Vec::new();
    for i in 1..=10u64 {
        let color = solid_color(color_desc, [50, 100, 200, 255], i * 33);
        let out = pipeline.handle_color_frame(color).unwrap();
        outputs.push(out.frame.into_data());
    }

    // Depth events stopped; every tick reuses the same visualization.
    for data in &outputs[1..] {
        assert_eq!(data.as_slice(), outputs[0].as_slice());
    }
}

#[test]
fn test_exhausted_mixer_drops_frames_without_blocking() {
    let mut config = PipelineConfig::default();
    config.mixer_retained_hint = 2;
    let mut pipeline = FusionPipeline::new(&config);
    pipeline.controls().set_mix_factor(1.0);

    let depth_desc = DepthFormatDescriptor::new(8, 4, 0.0, 5.0);
    let depth = DepthFrame::new(depth_desc, vec![5.0; 32], Duration::ZERO).unwrap();
    pipeline.handle_depth_frame(depth, false);

    let color_desc = FrameDescriptor::new(PixelFormat::Bgra8, 16, 8);
    let mut retained = Vec::new();
    for i in 1..=4u64 {
        let color = solid_color(color_desc, [0, 0, 0, 255], i * 33);
        // Outputs are held instead of recycled, starving the pool.
        if let Some(out) = pipeline.handle_color_frame(color) {
            retained.push(out);
        }
    }
    assert_eq!(retained.len(), 2);
    assert_eq!(pipeline.dropped_frames(), 2);

    // Returning one output frees capacity for exactly one more tick.
    pipeline.recycle_output(retained.pop().unwrap().frame);
    let color = solid_color(color_desc, [0, 0, 0, 255], 500);
    assert!(pipeline.handle_color_frame(color).is_some());
}

#[test]
fn test_depth_normalizer_full_scale() {
    let desc = DepthFormatDescriptor::new(4, 1, 1.0, 3.0);
    let mut converter = DepthToGrayscaleConverter::new();
    converter.prepare(&desc, 2).unwrap();

    let samples = vec![1.0, 2.0, 3.0, f32::NAN];
    let depth = DepthFrame::new(desc, samples, Duration::ZERO).unwrap();
    let vis = converter.render(&depth).unwrap();
    assert_eq!(vis.data()[0], 0);
    assert_eq!(vis.data()[1], 128);
    assert_eq!(vis.data()[2], 255);
    assert_eq!(vis.data()[3], 0);
}

#[test]
fn test_still_capture_from_snapshot() {
    let camera = SyntheticDepthCamera::with_dimensions(64, 32, 32, 16);
    let (color, depth) = camera.snapshot();

    let mut still = StillCapturePipeline::new(&PipelineConfig::default());
    let fused = still.process(color, Some(depth), 1.0).unwrap();
    assert_eq!(fused.descriptor(), camera.color_descriptor());

    // At mix 1.0 the output is the broadcast visualization: every pixel
    // has equal B, G and R and full alpha.
    for px in fused.data().chunks_exact(4) {
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[3], 255);
    }
}

#[test]
fn test_background_foreground_cycle_recovers() {
    let mut camera = SyntheticDepthCamera::with_dimensions(64, 32, 32, 16);
    let mut pipeline = FusionPipeline::new(&PipelineConfig::default());
    pipeline.controls().set_mix_factor(1.0);

    let mut run = |camera: &mut SyntheticDepthCamera, pipeline: &mut FusionPipeline| {
        let mut outputs = 0u32;
        for _ in 0..60 {
            match camera.next_event() {
                CaptureEvent::Color(frame) => {
                    if let Some(out) = pipeline.handle_color_frame(frame) {
                        outputs += 1;
                        pipeline.recycle_output(out.frame);
                    }
                }
                CaptureEvent::Depth { frame, was_dropped } => {
                    pipeline.handle_depth_frame(frame, was_dropped);
                }
            }
        }
        outputs
    };

    assert!(run(&mut camera, &mut pipeline) > 0);

    pipeline.entered_background();
    assert_eq!(run(&mut camera, &mut pipeline), 0);

    pipeline.entered_foreground();
    assert!(run(&mut camera, &mut pipeline) > 0);
}
