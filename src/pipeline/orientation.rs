// SPDX-License-Identifier: GPL-3.0-only

//! Display rotation resolver
//!
//! Computes the rotation needed to present sensor-space pixels in display
//! space from the interface orientation, the sensor's video orientation
//! and the sensor mounting position. Pure lookup, no state.
//!
//! A front-mounted sensor's image is mirrored relative to a rear sensor at
//! the same physical rotation, which swaps the 90 and 270 degree cases.

use crate::errors::{PipelineError, PipelineResult};

/// Orientation of the user interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    /// Non-cardinal reading (face up, face down, or undetermined)
    Unknown,
}

/// Orientation the sensor delivers frames in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoOrientation {
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

/// Mounting side of the capture sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorPosition {
    Front,
    Back,
}

/// Rotation applied by the display sink, clockwise
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Rotate0,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Rotate0 => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }
}

/// Resolve the display rotation for an orientation combination
///
/// Total over the sixteen cardinal combinations. `Unknown` interface
/// readings are the only unsupported input; callers keep the previous
/// rotation in that case rather than applying a default.
pub fn rotation_for(
    interface: InterfaceOrientation,
    video: VideoOrientation,
    position: SensorPosition,
) -> PipelineResult<Rotation> {
    use InterfaceOrientation as I;
    use Rotation as R;
    use VideoOrientation as V;

    let interface = match interface {
        I::Portrait => V::Portrait,
        I::PortraitUpsideDown => V::PortraitUpsideDown,
        I::LandscapeLeft => V::LandscapeLeft,
        I::LandscapeRight => V::LandscapeRight,
        I::Unknown => {
            return Err(PipelineError::Unsupported(
                "non-cardinal interface orientation".to_string(),
            ));
        }
    };

    // Rotation for a rear-mounted sensor; the front mirror swaps 90/270.
    let rear = match (video, interface) {
        (V::Portrait, V::Portrait) => R::Rotate0,
        (V::Portrait, V::PortraitUpsideDown) => R::Rotate180,
        (V::Portrait, V::LandscapeLeft) => R::Rotate90,
        (V::Portrait, V::LandscapeRight) => R::Rotate270,

        (V::PortraitUpsideDown, V::Portrait) => R::Rotate180,
        (V::PortraitUpsideDown, V::PortraitUpsideDown) => R::Rotate0,
        (V::PortraitUpsideDown, V::LandscapeLeft) => R::Rotate270,
        (V::PortraitUpsideDown, V::LandscapeRight) => R::Rotate90,

        (V::LandscapeRight, V::Portrait) => R::Rotate90,
        (V::LandscapeRight, V::PortraitUpsideDown) => R::Rotate270,
        (V::LandscapeRight, V::LandscapeLeft) => R::Rotate180,
        (V::LandscapeRight, V::LandscapeRight) => R::Rotate0,

        (V::LandscapeLeft, V::Portrait) => R::Rotate270,
        (V::LandscapeLeft, V::PortraitUpsideDown) => R::Rotate90,
        (V::LandscapeLeft, V::LandscapeLeft) => R::Rotate0,
        (V::LandscapeLeft, V::LandscapeRight) => R::Rotate180,
    };

    Ok(match (position, rear) {
        (SensorPosition::Front, R::Rotate90) => R::Rotate270,
        (SensorPosition::Front, R::Rotate270) => R::Rotate90,
        (_, rotation) => rotation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERFACES: [InterfaceOrientation; 4] = [
        InterfaceOrientation::Portrait,
        InterfaceOrientation::PortraitUpsideDown,
        InterfaceOrientation::LandscapeLeft,
        InterfaceOrientation::LandscapeRight,
    ];

    const VIDEOS: [VideoOrientation; 4] = [
        VideoOrientation::Portrait,
        VideoOrientation::PortraitUpsideDown,
        VideoOrientation::LandscapeLeft,
        VideoOrientation::LandscapeRight,
    ];

    #[test]
    fn test_table_is_total_over_cardinal_inputs() {
        for interface in INTERFACES {
            for video in VIDEOS {
                for position in [SensorPosition::Front, SensorPosition::Back] {
                    assert!(rotation_for(interface, video, position).is_ok());
                }
            }
        }
    }

    #[test]
    fn test_front_mirrors_quarter_turns_only() {
        for interface in INTERFACES {
            for video in VIDEOS {
                let back = rotation_for(interface, video, SensorPosition::Back).unwrap();
                let front = rotation_for(interface, video, SensorPosition::Front).unwrap();
                match back {
                    Rotation::Rotate90 => assert_eq!(front, Rotation::Rotate270),
                    Rotation::Rotate270 => assert_eq!(front, Rotation::Rotate90),
                    other => assert_eq!(front, other),
                }
            }
        }
    }

    #[test]
    fn test_matching_orientations_need_no_rotation() {
        let pairs = [
            (InterfaceOrientation::Portrait, VideoOrientation::Portrait),
            (
                InterfaceOrientation::PortraitUpsideDown,
                VideoOrientation::PortraitUpsideDown,
            ),
            (
                InterfaceOrientation::LandscapeLeft,
                VideoOrientation::LandscapeLeft,
            ),
            (
                InterfaceOrientation::LandscapeRight,
                VideoOrientation::LandscapeRight,
            ),
        ];
        for (interface, video) in pairs {
            for position in [SensorPosition::Front, SensorPosition::Back] {
                assert_eq!(
                    rotation_for(interface, video, position).unwrap(),
                    Rotation::Rotate0
                );
            }
        }
    }

    #[test]
    fn test_front_sensor_portrait_landscape_cases() {
        // Front sensor delivering portrait frames: landscape right rotates
        // 90, landscape left rotates 270.
        assert_eq!(
            rotation_for(
                InterfaceOrientation::LandscapeRight,
                VideoOrientation::Portrait,
                SensorPosition::Front,
            )
            .unwrap(),
            Rotation::Rotate90
        );
        assert_eq!(
            rotation_for(
                InterfaceOrientation::LandscapeLeft,
                VideoOrientation::Portrait,
                SensorPosition::Front,
            )
            .unwrap(),
            Rotation::Rotate270
        );
    }

    #[test]
    fn test_unknown_interface_is_unsupported() {
        for video in VIDEOS {
            for position in [SensorPosition::Front, SensorPosition::Back] {
                let err =
                    rotation_for(InterfaceOrientation::Unknown, video, position).unwrap_err();
                assert!(matches!(err, PipelineError::Unsupported(_)));
            }
        }
    }
}
