//! Recorded tracks that drive agent bodies tick by tick
//!
//! Columns follow the dataset naming: `point{i}_x` / `point{i}_y` for
//! spinepoints (1-based, metres), `seg{i}_orientation` for per-segment
//! orientations, `front_orientation` and `bend` for two-segment replay (all
//! angles in degrees) and `x` / `y` for the body position.

use glam::Vec2;
use larvaworld_body::replay::{replay_poses_from_spine, replay_poses_two_segment};
use larvaworld_body::Pose;

use crate::error::{Result, SimError};

#[derive(Debug, Clone, PartialEq)]
enum ReplayMode {
    /// One orientation per segment between consecutive spinepoints
    Spine {
        points: Vec<(Vec<f64>, Vec<f64>)>,
        orientations: Vec<Vec<f64>>,
    },
    /// Position, front orientation and bend of a two-segment body
    TwoSegment {
        x: Vec<f64>,
        y: Vec<f64>,
        front_orientation: Vec<f64>,
        bend: Vec<f64>,
    },
}

/// A validated recorded track for a body of a given segment count
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayTrack {
    segments: usize,
    ticks: usize,
    mode: ReplayMode,
}

fn take(columns: &mut Vec<(String, Vec<f64>)>, name: &str) -> Option<Vec<f64>> {
    let i = columns.iter().position(|(k, _)| k == name)?;
    Some(columns.swap_remove(i).1)
}

fn require(columns: &mut Vec<(String, Vec<f64>)>, name: &str) -> Result<Vec<f64>> {
    take(columns, name).ok_or_else(|| SimError::MissingColumn(name.to_string()))
}

impl ReplayTrack {
    /// Build a track for a `segments`-segment body from named columns
    pub fn from_columns(mut columns: Vec<(String, Vec<f64>)>, segments: usize) -> Result<Self> {
        let ticks = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        if let Some((column, values)) = columns.iter().find(|(_, v)| v.len() != ticks) {
            return Err(SimError::ColumnLength {
                column: column.clone(),
                len: values.len(),
                expected: ticks,
            });
        }

        let mut points = Vec::new();
        loop {
            let i = points.len() + 1;
            let (Some(x), Some(y)) = (
                take(&mut columns, &format!("point{}_x", i)),
                take(&mut columns, &format!("point{}_y", i)),
            ) else {
                break;
            };
            points.push((x, y));
        }

        let mode = if points.len() >= 2 && segments == points.len() - 1 {
            let orientations: Vec<Vec<f64>> = (1..=segments)
                .filter_map(|i| take(&mut columns, &format!("seg{}_orientation", i)))
                .collect();
            if orientations.len() != segments {
                return Err(SimError::MissingOrientations {
                    found: orientations.len(),
                    needed: segments,
                });
            }
            ReplayMode::Spine {
                points,
                orientations,
            }
        } else if segments == 2 {
            ReplayMode::TwoSegment {
                front_orientation: require(&mut columns, "front_orientation")?,
                bend: require(&mut columns, "bend")?,
                x: require(&mut columns, "x")?,
                y: require(&mut columns, "y")?,
            }
        } else {
            return Err(SimError::UnsupportedSegmentCount {
                segments,
                points: points.len(),
            });
        };

        log::debug!("Replay track: {} segments, {} ticks", segments, ticks);
        Ok(Self {
            segments,
            ticks,
            mode,
        })
    }

    pub fn segments(&self) -> usize {
        self.segments
    }

    pub fn len(&self) -> usize {
        self.ticks
    }

    pub fn is_empty(&self) -> bool {
        self.ticks == 0
    }

    /// Segment poses at `tick`; `segment_lengths` is used by two-segment replay
    pub fn poses(&self, tick: usize, segment_lengths: &[f32]) -> Result<Vec<Pose>> {
        if tick >= self.ticks {
            return Err(SimError::ReplayFinished {
                tick,
                len: self.ticks,
            });
        }
        match &self.mode {
            ReplayMode::Spine {
                points,
                orientations,
            } => {
                let spine: Vec<Vec2> = points
                    .iter()
                    .map(|(x, y)| Vec2::new(x[tick] as f32, y[tick] as f32))
                    .collect();
                let angles: Vec<f32> = orientations
                    .iter()
                    .map(|o| o[tick].to_radians() as f32)
                    .collect();
                Ok(replay_poses_from_spine(&spine, &angles)?)
            }
            ReplayMode::TwoSegment {
                x,
                y,
                front_orientation,
                bend,
            } => {
                let (head, tail) = match segment_lengths {
                    [head, tail] => (*head, *tail),
                    _ => {
                        return Err(SimError::UnsupportedSegmentCount {
                            segments: segment_lengths.len(),
                            points: 0,
                        })
                    }
                };
                let poses = replay_poses_two_segment(
                    Vec2::new(x[tick] as f32, y[tick] as f32),
                    front_orientation[tick].to_radians() as f32,
                    bend[tick].to_radians() as f32,
                    head,
                    tail,
                );
                Ok(poses.to_vec())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(name: &str, values: &[f64]) -> (String, Vec<f64>) {
        (name.to_string(), values.to_vec())
    }

    #[test]
    fn test_spine_track() {
        let columns = vec![
            col("point1_x", &[0.002, 0.003]),
            col("point1_y", &[0.0, 0.0]),
            col("point2_x", &[0.0, 0.001]),
            col("point2_y", &[0.0, 0.0]),
            col("point3_x", &[-0.002, -0.001]),
            col("point3_y", &[0.0, 0.0]),
            col("seg1_orientation", &[0.0, 90.0]),
            col("seg2_orientation", &[0.0, 0.0]),
        ];
        let track = ReplayTrack::from_columns(columns, 2).unwrap();
        assert_eq!(track.len(), 2);
        let poses = track.poses(1, &[]).unwrap();
        assert!((poses[0].position - Vec2::new(0.002, 0.0)).length() < 1e-7);
        assert!((poses[0].angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!(matches!(
            track.poses(2, &[]),
            Err(SimError::ReplayFinished { tick: 2, len: 2 })
        ));
    }

    #[test]
    fn test_missing_orientations() {
        let columns = vec![
            col("point1_x", &[0.0]),
            col("point1_y", &[0.0]),
            col("point2_x", &[0.0]),
            col("point2_y", &[0.0]),
            col("point3_x", &[0.0]),
            col("point3_y", &[0.0]),
            col("seg1_orientation", &[0.0]),
        ];
        assert!(matches!(
            ReplayTrack::from_columns(columns, 2),
            Err(SimError::MissingOrientations {
                found: 1,
                needed: 2
            })
        ));
    }

    #[test]
    fn test_two_segment_track() {
        let columns = vec![
            col("x", &[0.0]),
            col("y", &[0.0]),
            col("front_orientation", &[90.0]),
            col("bend", &[90.0]),
        ];
        let track = ReplayTrack::from_columns(columns, 2).unwrap();
        let poses = track.poses(0, &[0.002, 0.002]).unwrap();
        assert!((poses[0].position - Vec2::new(0.0, 0.001)).length() < 1e-7);
        assert!((poses[1].position - Vec2::new(-0.001, 0.0)).length() < 1e-7);

        let missing = vec![col("x", &[0.0]), col("y", &[0.0]), col("bend", &[0.0])];
        assert!(matches!(
            ReplayTrack::from_columns(missing, 2),
            Err(SimError::MissingColumn(c)) if c == "front_orientation"
        ));
    }

    #[test]
    fn test_unsupported_segment_count() {
        let columns = vec![col("point1_x", &[0.0]), col("point1_y", &[0.0])];
        assert!(matches!(
            ReplayTrack::from_columns(columns, 4),
            Err(SimError::UnsupportedSegmentCount {
                segments: 4,
                points: 1
            })
        ));
    }

    #[test]
    fn test_ragged_columns() {
        let columns = vec![col("x", &[0.0, 1.0]), col("y", &[0.0])];
        assert!(matches!(
            ReplayTrack::from_columns(columns, 2),
            Err(SimError::ColumnLength { len: 1, expected: 2, .. })
        ));
    }
}
