//! Parametric larva outline and its partition into segments
//!
//! The canonical silhouette has unit length with the nose at `X0` and the
//! tail at `X0 - 1`, midline on the x axis and front to the right. Its width
//! tapers linearly from the nose to the widest cross-section at `W_MAX`, stays
//! constant down to `-W_MAX`, then narrows to half width at the tail.
//!
//! Each segment outline is expressed relative to the segment's midpoint `s1`
//! and multiplied by the segment count, so a later uniform scale of
//! `sim_length / N` brings every segment to body size.

use glam::Vec2;

use crate::error::{BodyError, Result};

/// x coordinate of the nose in the unit outline
pub const X0: f64 = 0.52;

/// x coordinate where the outline reaches full width
pub const W_MAX: f64 = 0.4;

const RATIO_TOLERANCE: f32 = 1e-4;

/// The canonical 8-point outline of unit length
pub fn generic_outline(width_to_length_ratio: f32) -> Vec<Vec2> {
    let w = width_to_length_ratio / 2.0;
    let x0 = X0 as f32;
    let w_max = W_MAX as f32;
    let x2 = x0 - 1.0;
    vec![
        Vec2::new(x0, 0.0),
        Vec2::new(w_max, w * 2.0 / 3.0),
        Vec2::new(w_max / 3.0, w),
        Vec2::new(-w_max, w * 2.0 / 3.0),
        Vec2::new(x2, 0.0),
        Vec2::new(-w_max, -w * 2.0 / 3.0),
        Vec2::new(w_max / 3.0, -w),
        Vec2::new(w_max, -w * 2.0 / 3.0),
    ]
}

/// Equal length fractions for `n` segments
pub fn uniform_seg_ratio(n: usize) -> Vec<f32> {
    vec![1.0 / n as f32; n]
}

/// Check that `ratio` has `n` entries summing to 1
pub fn validate_seg_ratio(n: usize, ratio: &[f32]) -> Result<()> {
    if n == 0 {
        return Err(BodyError::InvalidSegmentCount(n));
    }
    let sum: f32 = ratio.iter().sum();
    if ratio.len() != n || (sum - 1.0).abs() > RATIO_TOLERANCE || ratio.iter().any(|r| *r <= 0.0) {
        return Err(BodyError::InvalidSegmentRatio {
            expected: n,
            len: ratio.len(),
            sum,
        });
    }
    Ok(())
}

/// Density factor keeping total mass constant once `2(N-1)·interval` of length is removed
pub fn density_multiplier(n: usize, interval: f32) -> Result<f32> {
    let remaining = 1.0 - 2.0 * (n as f32 - 1.0) * interval;
    if remaining <= 0.0 || interval < 0.0 {
        return Err(BodyError::InvalidInterval {
            segments: n,
            interval,
        });
    }
    Ok(1.0 / remaining)
}

/// Per-segment outlines of a partitioned body, before scaling to body size
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentLayout {
    /// One single-ring outline per segment, relative to the segment midpoint
    pub outlines: Vec<Vec<Vec2>>,
    /// Segment midpoints `s1` along the unit outline
    pub midpoints: Vec<f32>,
    pub density_multiplier: f32,
}

impl SegmentLayout {
    /// Offset of segment `i`'s midpoint from the centre of the unit outline
    pub fn axial_offset(&self, i: usize) -> f32 {
        self.midpoints[i] - (X0 - 0.5) as f32
    }
}

/// Partition the canonical outline into `seg_ratio.len()` segments
pub fn segment_outlines(
    seg_ratio: &[f32],
    width_to_length_ratio: f32,
    interval: f32,
) -> Result<SegmentLayout> {
    let n = seg_ratio.len();
    validate_seg_ratio(n, seg_ratio)?;
    let density_multiplier = density_multiplier(n, interval)?;

    if n == 1 {
        return Ok(SegmentLayout {
            outlines: vec![generic_outline(width_to_length_ratio)],
            midpoints: vec![(X0 - 0.5) as f32],
            density_multiplier,
        });
    }

    let w = width_to_length_ratio as f64 / 2.0;
    let x0 = X0;
    let w_max = W_MAX;
    let l0 = x0 - w_max;
    let x2 = x0 - 1.0;
    let l = -w_max - x2;
    let interval = interval as f64;

    // Anterior taper: zero width at the nose, full width at W_MAX
    let front_width = |s: f64| (x0 - s) / l0 * w;
    // Posterior taper: full width at -W_MAX, half width at the tail
    let rear_width = |s: f64| ((s - x2) / l + 1.0) * w / 2.0;

    let mut outlines = Vec::with_capacity(n);
    let mut midpoints = Vec::with_capacity(n);
    let mut cum = 0.0f64;
    for (i, r) in seg_ratio.iter().map(|r| *r as f64).enumerate() {
        cum += r;
        let mut s0 = x0 + r - cum;
        let s1 = x0 + r / 2.0 - cum;
        let mut s2 = x0 - cum;
        if i > 0 {
            s0 -= interval;
        }
        if i < n - 1 {
            s2 += interval;
        }
        if s0 <= s2 {
            return Err(BodyError::UnsupportedSegmentSpan {
                segment: i,
                s0: s0 as f32,
                s2: s2 as f32,
            });
        }

        let shape: Vec<(f64, f64)> = if s0 > w_max && s2 >= w_max {
            vec![
                (s0 - s1, front_width(s0)),
                (s2 - s1, front_width(s2)),
                (s2 - s1, -front_width(s2)),
                (s0 - s1, -front_width(s0)),
            ]
        } else if s0 > w_max && w_max > s2 && s2 >= -w_max {
            vec![
                (s0 - s1, front_width(s0)),
                (w_max - s1, w),
                (s2 - s1, w),
                (s2 - s1, -w),
                (w_max - s1, -w),
                (s0 - s1, -front_width(s0)),
            ]
        } else if -w_max < s0 && s0 <= w_max && -w_max <= s2 && s2 < w_max {
            vec![
                (s0 - s1, w),
                (s2 - s1, w),
                (s2 - s1, -w),
                (s0 - s1, -w),
            ]
        } else if w_max >= s0 && s0 > -w_max && -w_max >= s2 {
            vec![
                (s0 - s1, w),
                (-w_max - s1, w),
                (s2 - s1, rear_width(s2)),
                (s2 - s1, -rear_width(s2)),
                (-w_max - s1, -w),
                (s0 - s1, -w),
            ]
        } else if -w_max >= s0 {
            vec![
                (s0 - s1, rear_width(s0)),
                (s2 - s1, rear_width(s2)),
                (s2 - s1, -rear_width(s2)),
                (s0 - s1, -rear_width(s0)),
            ]
        } else {
            return Err(BodyError::UnsupportedSegmentSpan {
                segment: i,
                s0: s0 as f32,
                s2: s2 as f32,
            });
        };

        let scale = n as f64;
        outlines.push(
            shape
                .into_iter()
                .map(|(x, y)| Vec2::new((x * scale) as f32, (y * scale) as f32))
                .collect(),
        );
        midpoints.push(s1 as f32);
    }

    Ok(SegmentLayout {
        outlines,
        midpoints,
        density_multiplier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::polygon_area;

    fn total_area(layout: &SegmentLayout) -> f32 {
        let n = layout.outlines.len() as f32;
        layout
            .outlines
            .iter()
            .map(|o| polygon_area(o) / (n * n))
            .sum()
    }

    #[test]
    fn test_single_segment_is_generic_outline() {
        let layout = segment_outlines(&[1.0], 0.2, 0.0).unwrap();
        assert_eq!(layout.outlines, vec![generic_outline(0.2)]);
        assert_eq!(layout.density_multiplier, 1.0);
        assert!(layout.axial_offset(0).abs() < 1e-6);
    }

    #[test]
    fn test_density_multiplier_scenario() {
        let layout = segment_outlines(&[0.4, 0.3, 0.3], 0.2, 0.01).unwrap();
        let expected = 1.0 / 0.96;
        assert!((layout.density_multiplier - expected).abs() < 1e-5);
        assert!((layout.density_multiplier - 1.0417).abs() < 1e-4);
    }

    #[test]
    fn test_segmented_silhouette_area() {
        for ratio in [
            uniform_seg_ratio(2),
            uniform_seg_ratio(3),
            uniform_seg_ratio(4),
            uniform_seg_ratio(6),
            uniform_seg_ratio(11),
            vec![0.4, 0.3, 0.3],
        ] {
            let layout = segment_outlines(&ratio, 0.2, 0.0).unwrap();
            let area = total_area(&layout);
            assert!((area - 0.184).abs() < 1e-4, "{:?}: {}", ratio, area);
        }
    }

    #[test]
    fn test_interval_removes_length() {
        let gapless = total_area(&segment_outlines(&uniform_seg_ratio(4), 0.2, 0.0).unwrap());
        let gapped = segment_outlines(&uniform_seg_ratio(4), 0.2, 0.01).unwrap();
        assert!(total_area(&gapped) < gapless);
        assert!((gapped.density_multiplier - 1.0 / 0.94).abs() < 1e-5);
    }

    #[test]
    fn test_segments_touch_without_interval() {
        let layout = segment_outlines(&uniform_seg_ratio(3), 0.2, 0.0).unwrap();
        for i in 0..2 {
            let rear_a = layout.midpoints[i]
                + layout.outlines[i].iter().map(|p| p.x).fold(f32::INFINITY, f32::min) / 3.0;
            let front_b = layout.midpoints[i + 1]
                + layout.outlines[i + 1]
                    .iter()
                    .map(|p| p.x)
                    .fold(f32::NEG_INFINITY, f32::max)
                    / 3.0;
            assert!((rear_a - front_b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_invalid_ratios() {
        assert_eq!(
            validate_seg_ratio(0, &[]),
            Err(BodyError::InvalidSegmentCount(0))
        );
        assert!(matches!(
            segment_outlines(&[0.5, 0.3], 0.2, 0.0),
            Err(BodyError::InvalidSegmentRatio { expected: 2, .. })
        ));
        assert!(validate_seg_ratio(3, &[0.5, 0.5]).is_err());
    }

    #[test]
    fn test_oversized_interval_rejected() {
        assert!(matches!(
            segment_outlines(&uniform_seg_ratio(3), 0.2, 0.25),
            Err(BodyError::InvalidInterval { segments: 3, .. })
        ));
        assert!(density_multiplier(1, 0.9).is_ok());
    }

    #[test]
    fn test_span_across_both_tapers_rejected() {
        let err = segment_outlines(&[0.95, 0.05], 0.2, 0.0).unwrap_err();
        assert!(matches!(
            err,
            BodyError::UnsupportedSegmentSpan { segment: 0, .. }
        ));
    }
}
