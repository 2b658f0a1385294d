// SPDX-License-Identifier: GPL-3.0-only

//! Frame sources
//!
//! A source produces timestamped color and depth events for the fusion
//! pipeline. The synthetic source stands in for capture hardware and is
//! also what the integration tests drive.

pub mod capture_loop;
pub mod synthetic;

use crate::frame::{DepthFrame, Frame};

/// One delivery from a source's event stream
///
/// Color and depth are independent streams; events carry the capture
/// timestamp and arrive in timestamp order from the synthetic source.
#[derive(Debug)]
pub enum CaptureEvent {
    Color(Frame),
    Depth {
        frame: DepthFrame,
        /// The source discarded this frame under pressure; it must not
        /// reach the depth converter
        was_dropped: bool,
    },
}

impl CaptureEvent {
    /// Capture timestamp of the event
    pub fn timestamp(&self) -> std::time::Duration {
        match self {
            CaptureEvent::Color(frame) => frame.timestamp(),
            CaptureEvent::Depth { frame, .. } => frame.timestamp(),
        }
    }
}
