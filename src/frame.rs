// SPDX-License-Identifier: GPL-3.0-only

//! Frame and depth frame types
//!
//! A [`Frame`] is a timestamped image buffer with a fixed pixel format and
//! row stride. Ownership transfers on hand-off between pipeline stages; a
//! frame lent out of a buffer pool carries an internal ticket that returns
//! its storage to the pool when the frame is dropped, so an error path can
//! simply drop the frame without bookkeeping.
//!
//! A [`DepthFrame`] holds the raw floating-point samples as delivered by
//! the sensor. Its sample storage is reference counted so the one-deep
//! synchronizer cache can hand out copies without duplicating the map.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::errors::{PipelineError, PipelineResult};
use crate::pipeline::pool::PoolTicket;

/// Pixel layout of a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit blue, green, red, alpha (the capture format of the source)
    Bgra8,
    /// 8-bit single-channel grayscale (rendered depth visualizations)
    Gray8,
}

impl PixelFormat {
    /// Bytes occupied by one pixel
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Bgra8 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// Format description for a color or grayscale frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub format: PixelFormat,
    pub width: u32,
    pub height: u32,
}

impl FrameDescriptor {
    pub fn new(format: PixelFormat, width: u32, height: u32) -> Self {
        Self {
            format,
            width,
            height,
        }
    }

    /// Tightly packed row stride in bytes
    pub fn min_stride(&self) -> usize {
        self.width as usize * self.format.bytes_per_pixel()
    }

    /// Total buffer size in bytes at minimum stride
    pub fn buffer_len(&self) -> usize {
        self.min_stride() * self.height as usize
    }
}

/// A timestamped image buffer
pub struct Frame {
    desc: FrameDescriptor,
    stride: usize,
    timestamp: Duration,
    data: Vec<u8>,
    recycler: Option<PoolTicket>,
}

impl Frame {
    /// Allocate a zero-filled frame outside of any pool
    pub fn new(desc: FrameDescriptor, timestamp: Duration) -> Self {
        Self {
            desc,
            stride: desc.min_stride(),
            timestamp,
            data: vec![0u8; desc.buffer_len()],
            recycler: None,
        }
    }

    /// Wrap existing pixel data in an unpooled frame
    pub fn from_vec(
        desc: FrameDescriptor,
        timestamp: Duration,
        data: Vec<u8>,
    ) -> PipelineResult<Self> {
        if data.len() != desc.buffer_len() {
            return Err(PipelineError::Unsupported(format!(
                "frame data length {} does not match {}x{} {:?}",
                data.len(),
                desc.width,
                desc.height,
                desc.format
            )));
        }
        Ok(Self {
            desc,
            stride: desc.min_stride(),
            timestamp,
            data,
            recycler: None,
        })
    }

    pub(crate) fn pooled(
        desc: FrameDescriptor,
        timestamp: Duration,
        data: Vec<u8>,
        recycler: PoolTicket,
    ) -> Self {
        Self {
            desc,
            stride: desc.min_stride(),
            timestamp,
            data,
            recycler: Some(recycler),
        }
    }

    pub fn descriptor(&self) -> &FrameDescriptor {
        &self.desc
    }

    pub fn format(&self) -> PixelFormat {
        self.desc.format
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    /// Row stride in bytes
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Monotonic capture timestamp, relative to the stream epoch
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the frame and take its pixel data, detaching it from any pool
    pub fn into_data(mut self) -> Vec<u8> {
        // The slot is still given back; only the storage leaves the pool.
        if let Some(ticket) = self.recycler.take() {
            ticket.forfeit();
        }
        std::mem::take(&mut self.data)
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(ticket) = self.recycler.take() {
            ticket.reclaim(std::mem::take(&mut self.data));
        }
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("format", &self.desc.format)
            .field("width", &self.desc.width)
            .field("height", &self.desc.height)
            .field("stride", &self.stride)
            .field("timestamp", &self.timestamp)
            .field("pooled", &self.recycler.is_some())
            .finish()
    }
}

/// Format description for raw sensor depth maps
///
/// The depth range comes from the source format exactly once; stages scale
/// against it rather than re-deriving a range per frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthFormatDescriptor {
    pub width: u32,
    pub height: u32,
    /// Nearest representable distance in meters, rendered black
    pub min_depth: f32,
    /// Farthest representable distance in meters, rendered white
    pub max_depth: f32,
}

impl DepthFormatDescriptor {
    pub fn new(width: u32, height: u32, min_depth: f32, max_depth: f32) -> Self {
        Self {
            width,
            height,
            min_depth,
            max_depth,
        }
    }

    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// A timestamped raw depth map
///
/// Samples are floating-point distances in meters. Non-finite samples mark
/// occluded or otherwise invalid pixels. Cloning is cheap: the sample
/// storage is shared.
#[derive(Debug, Clone)]
pub struct DepthFrame {
    desc: DepthFormatDescriptor,
    samples: Arc<[f32]>,
    timestamp: Duration,
}

impl DepthFrame {
    pub fn new(
        desc: DepthFormatDescriptor,
        samples: Vec<f32>,
        timestamp: Duration,
    ) -> PipelineResult<Self> {
        if samples.len() != desc.sample_count() {
            return Err(PipelineError::Unsupported(format!(
                "depth sample count {} does not match {}x{}",
                samples.len(),
                desc.width,
                desc.height
            )));
        }
        Ok(Self {
            desc,
            samples: samples.into(),
            timestamp,
        })
    }

    /// Build a depth frame from the raw byte payload of a sensor event
    pub fn from_bytes(
        desc: DepthFormatDescriptor,
        bytes: &[u8],
        timestamp: Duration,
    ) -> PipelineResult<Self> {
        if bytes.len() != desc.sample_count() * std::mem::size_of::<f32>() {
            return Err(PipelineError::Unsupported(format!(
                "depth payload length {} does not match {}x{} f32 samples",
                bytes.len(),
                desc.width,
                desc.height
            )));
        }
        let samples: Vec<f32> = bytemuck::allocation::pod_collect_to_vec(bytes);
        Self::new(desc, samples, timestamp)
    }

    pub fn descriptor(&self) -> &DepthFormatDescriptor {
        &self.desc
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_dimensions() {
        let desc = FrameDescriptor::new(PixelFormat::Bgra8, 4, 2);
        assert_eq!(desc.min_stride(), 16);
        assert_eq!(desc.buffer_len(), 32);

        let frame = Frame::new(desc, Duration::ZERO);
        assert_eq!(frame.data().len(), 32);
        assert!(frame.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_frame_from_vec_rejects_bad_length() {
        let desc = FrameDescriptor::new(PixelFormat::Gray8, 4, 4);
        let err = Frame::from_vec(desc, Duration::ZERO, vec![0u8; 15]).unwrap_err();
        assert!(matches!(err, PipelineError::Unsupported(_)));
    }

    #[test]
    fn test_depth_frame_from_bytes() {
        let desc = DepthFormatDescriptor::new(2, 1, 0.0, 5.0);
        let samples = [1.5f32, f32::NAN];
        let bytes: &[u8] = bytemuck::cast_slice(&samples);
        let frame = DepthFrame::from_bytes(desc, bytes, Duration::from_millis(33)).unwrap();
        assert_eq!(frame.samples()[0], 1.5);
        assert!(frame.samples()[1].is_nan());
    }

    #[test]
    fn test_depth_frame_rejects_bad_count() {
        let desc = DepthFormatDescriptor::new(3, 3, 0.0, 5.0);
        let err = DepthFrame::new(desc, vec![0.0; 8], Duration::ZERO).unwrap_err();
        assert!(matches!(err, PipelineError::Unsupported(_)));
    }
}
