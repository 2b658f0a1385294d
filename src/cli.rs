// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! - `run`: drive the preview pipeline from the synthetic source
//! - `photo`: capture and fuse a single still, saved as PNG

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{info, warn};

use depthcam::config::PipelineConfig;
use depthcam::frame::{Frame, PixelFormat};
use depthcam::pipeline::photo::StillCapturePipeline;
use depthcam::pipeline::FusionPipeline;
use depthcam::source::CaptureEvent;
use depthcam::source::capture_loop::{CaptureLoopController, LoopAction};
use depthcam::source::synthetic::SyntheticDepthCamera;

/// Run the preview loop for `duration` seconds
///
/// A capture thread paces synthetic events against the wall clock and
/// feeds the pipeline; the main thread plays the control context, flipping
/// the mix factor every `toggle_secs` the way a tap on the preview would.
pub fn run_preview(
    config: PipelineConfig,
    duration: u64,
    toggle_secs: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Arc::new(Mutex::new(FusionPipeline::new(&config)));
    let controls = pipeline
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .controls();

    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!("Previewing for {} seconds (press Ctrl+C to stop early)", duration);

    let capture = spawn_capture(Arc::clone(&pipeline), duration);

    // Control context: periodic mix toggles until the run ends.
    let start = Instant::now();
    let target = Duration::from_secs(duration);
    let toggle_interval = Duration::from_secs(toggle_secs.max(1));
    let mut next_toggle = toggle_interval;
    while start.elapsed() < target && capture.is_running() {
        if stop_flag.load(Ordering::SeqCst) {
            println!();
            println!("Stopping early...");
            break;
        }
        if start.elapsed() >= next_toggle {
            controls.toggle_mix_factor();
            info!(mix_factor = controls.mix_factor(), "Mix factor toggled");
            next_toggle += toggle_interval;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    drop(capture);

    let mut pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
    pipeline.tear_down();
    println!("Dropped frames: {}", pipeline.dropped_frames());
    Ok(())
}

/// Spawn the capture thread: synthetic events paced against the wall
/// clock, dispatched to the pipeline, outputs recycled back to the pool.
fn spawn_capture(
    pipeline: Arc<Mutex<FusionPipeline>>,
    duration: u64,
) -> CaptureLoopController {
    let mut camera = SyntheticDepthCamera::new();
    let stream_start = Instant::now();
    let deadline = Duration::from_secs(duration);
    let mut composited = 0u64;

    CaptureLoopController::start("synthetic-preview", move || {
        let event = camera.next_event();
        let at = event.timestamp();
        if at >= deadline {
            info!(composited, "Preview stream finished");
            return LoopAction::Stop;
        }
        if let Some(wait) = at.checked_sub(stream_start.elapsed()) {
            std::thread::sleep(wait);
        }

        let mut pipeline = pipeline.lock().unwrap_or_else(PoisonError::into_inner);
        match event {
            CaptureEvent::Color(frame) => {
                if let Some(out) = pipeline.handle_color_frame(frame) {
                    composited += 1;
                    pipeline.recycle_output(out.frame);
                }
            }
            CaptureEvent::Depth { frame, was_dropped } => {
                pipeline.handle_depth_frame(frame, was_dropped);
            }
        }
        LoopAction::Continue
    })
}

/// Capture one still, fuse it with its depth map and save it as PNG
pub fn take_photo(
    config: PipelineConfig,
    output: Option<PathBuf>,
    mix_factor: f32,
    skip_depth: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let camera = SyntheticDepthCamera::new();
    let (color, depth) = camera.snapshot();
    println!("Capture format: {}x{}", color.width(), color.height());

    let mut still = StillCapturePipeline::new(&config);
    let depth = (!skip_depth).then_some(depth);
    if depth.is_none() {
        warn!("Depth disabled, saving color frame as-is");
    }
    let fused = still.process(color, depth, mix_factor.clamp(0.0, 1.0))?;

    let output_path = match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            path
        }
        None => {
            let timestamp = Local::now().format("%Y%m%d_%H%M%S");
            PathBuf::from(format!("photo_{}.png", timestamp))
        }
    };

    save_png(&fused, &output_path)?;
    println!("Photo saved: {}", output_path.display());
    Ok(())
}

/// Encode a BGRA frame as PNG
fn save_png(frame: &Frame, path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    if frame.format() != PixelFormat::Bgra8 {
        return Err(format!("cannot encode {:?} as PNG", frame.format()).into());
    }
    let mut rgba = frame.data().to_vec();
    for px in rgba.chunks_exact_mut(4) {
        px.swap(0, 2);
    }
    let image = image::RgbaImage::from_raw(frame.width(), frame.height(), rgba)
        .ok_or("frame buffer does not match its dimensions")?;
    image.save(path)?;
    Ok(())
}
