//! Segment poses reconstructed from recorded tracks

use glam::Vec2;

use crate::error::{BodyError, Result};
use crate::segment::Pose;

/// Mean of two points, ignoring a missing (NaN) one
fn nan_midpoint(a: Vec2, b: Vec2) -> Vec2 {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => (a + b) / 2.0,
        (true, false) => b,
        (false, true) => a,
        (true, true) => Vec2::NAN,
    }
}

/// Poses of an `N = points - 1` segment body from its spine
///
/// Segment `i` sits between spinepoints `i` and `i + 1` and takes
/// `orientations[i]` (radians).
pub fn replay_poses_from_spine(spinepoints: &[Vec2], orientations: &[f32]) -> Result<Vec<Pose>> {
    let n = spinepoints.len().saturating_sub(1);
    if n == 0 || orientations.len() != n {
        return Err(BodyError::ReplayMismatch {
            expected: n,
            got: orientations.len(),
        });
    }
    Ok(spinepoints
        .windows(2)
        .zip(orientations)
        .map(|(pair, angle)| Pose::new(nan_midpoint(pair[0], pair[1]), *angle))
        .collect())
}

/// Poses of a two-segment body from its position, heading and bend
///
/// The head extends `head_length` ahead of `position` along the front
/// orientation and the tail `tail_length` behind it along
/// `front_orientation - bend`.
pub fn replay_poses_two_segment(
    position: Vec2,
    front_orientation: f32,
    bend: f32,
    head_length: f32,
    tail_length: f32,
) -> [Pose; 2] {
    let rear_orientation = front_orientation - bend;
    let head_tip = position + Vec2::from_angle(front_orientation) * head_length;
    let tail_tip = position - Vec2::from_angle(rear_orientation) * tail_length;
    [
        Pose::new((position + head_tip) / 2.0, front_orientation),
        Pose::new((position + tail_tip) / 2.0, rear_orientation),
    ]
}
