//! Body contour and polygon centroid helpers

use glam::Vec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

/// Default number of contour points kept after subsampling
pub const DEFAULT_CONTOUR_POINTS: usize = 22;

/// Default subsampling seed
pub const DEFAULT_CONTOUR_SEED: u64 = 1;

/// Area relative to the squared extent below which a ring counts as flat
const FLAT_RING_RATIO: f32 = 1e-6;

/// Unsigned shoelace area of a ring
pub fn polygon_area(ring: &[Vec2]) -> f32 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for (i, p) in ring.iter().enumerate() {
        let q = ring[(i + 1) % ring.len()];
        twice += p.perp_dot(q);
    }
    (twice * 0.5).abs()
}

/// Whether a ring encloses no area at its own scale
///
/// The area is compared against the squared bounding extent of the ring, so
/// millimetre-sized outlines are judged the same way as unit-sized ones.
pub fn is_degenerate(ring: &[Vec2]) -> bool {
    if ring.len() < 3 {
        return true;
    }
    let (min, max) = ring.iter().fold(
        (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
        |(lo, hi), p| (lo.min(*p), hi.max(*p)),
    );
    let extent = (max - min).max_element();
    !(extent > 0.0) || polygon_area(ring) <= FLAT_RING_RATIO * extent * extent
}

/// Area-weighted centroid of several rings
///
/// Each ring contributes its vertex mean weighted by its shoelace area.
/// Flat rings are skipped; returns `None` when no ring encloses any area.
pub fn compute_centroid(rings: &[Vec<Vec2>]) -> Option<Vec2> {
    let mut weighted = Vec2::ZERO;
    let mut total = 0.0;
    for ring in rings.iter().filter(|r| !is_degenerate(r)) {
        let area = polygon_area(ring);
        let mean = ring.iter().copied().sum::<Vec2>() / ring.len() as f32;
        weighted += mean * area;
        total += area;
    }
    (total > 0.0).then(|| weighted / total)
}

/// Stitch segment outlines into one ring around the body
///
/// `outlines` holds one world-space ring per segment, front to back. The
/// first half of every ring (one side of the body) is taken in segment order,
/// followed by the second halves in reverse segment order. Rings longer than
/// `max_points` are reduced to exactly that many points with a seeded sample
/// that keeps the original order.
pub fn compute_contour(outlines: &[&[Vec2]], max_points: usize, seed: u64) -> Vec<Vec2> {
    let mut contour: Vec<Vec2> = Vec::new();
    for ring in outlines {
        contour.extend_from_slice(&ring[..ring.len() / 2]);
    }
    for ring in outlines.iter().rev() {
        contour.extend_from_slice(&ring[ring.len() / 2..]);
    }

    if contour.len() <= max_points {
        return contour;
    }
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, contour.len(), max_points).into_vec();
    indices.sort_unstable();
    indices.into_iter().map(|i| contour[i]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(center: Vec2, half: f32) -> Vec<Vec2> {
        vec![
            center + Vec2::new(half, half),
            center + Vec2::new(-half, half),
            center + Vec2::new(-half, -half),
            center + Vec2::new(half, -half),
        ]
    }

    #[test]
    fn test_area_orientation_independent() {
        let mut ring = square(Vec2::ZERO, 1.0);
        assert!((polygon_area(&ring) - 4.0).abs() < 1e-6);
        ring.reverse();
        assert!((polygon_area(&ring) - 4.0).abs() < 1e-6);
        assert_eq!(polygon_area(&ring[..2]), 0.0);
    }

    #[test]
    fn test_centroid_weighted_by_area() {
        let rings = vec![square(Vec2::ZERO, 1.0), square(Vec2::new(3.0, 0.0), 0.5)];
        // Areas 4 and 1
        let c = compute_centroid(&rings).unwrap();
        assert!((c.x - 0.6).abs() < 1e-6);
        assert!(c.y.abs() < 1e-6);
    }

    #[test]
    fn test_centroid_of_degenerate_rings() {
        let line = vec![Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)];
        assert!(compute_centroid(&[line]).is_none());
        assert!(compute_centroid(&[]).is_none());
    }

    #[test]
    fn test_small_rings_are_not_degenerate() {
        // A 0.2 mm square encloses 4e-8 m², below f32::EPSILON
        let tiny = square(Vec2::new(0.001, 0.0), 1e-4);
        assert!(!is_degenerate(&tiny));
        let c = compute_centroid(&[tiny]).unwrap();
        assert!((c - Vec2::new(0.001, 0.0)).length() < 1e-9);

        let flat = vec![Vec2::ZERO, Vec2::new(1e-4, 0.0), Vec2::new(2e-4, 1e-12)];
        assert!(is_degenerate(&flat));
        assert!(is_degenerate(&[Vec2::ZERO, Vec2::ZERO, Vec2::ZERO]));
    }

    #[test]
    fn test_contour_stitch_order() {
        let a = square(Vec2::new(1.0, 0.0), 0.5);
        let b = square(Vec2::new(0.0, 0.0), 0.5);
        let contour = compute_contour(&[&a, &b], 22, DEFAULT_CONTOUR_SEED);
        let expected = vec![a[0], a[1], b[0], b[1], b[2], b[3], a[2], a[3]];
        assert_eq!(contour, expected);
    }

    #[test]
    fn test_contour_subsampling_is_deterministic() {
        let rings: Vec<Vec<Vec2>> = (0..6)
            .map(|i| {
                (0..6)
                    .map(|k| Vec2::new(i as f32, k as f32))
                    .collect()
            })
            .collect();
        let refs: Vec<&[Vec2]> = rings.iter().map(|r| r.as_slice()).collect();
        let first = compute_contour(&refs, 22, 1);
        let second = compute_contour(&refs, 22, 1);
        assert_eq!(first.len(), 22);
        assert_eq!(first, second);

        // Sampled points keep their stitched order
        let full = compute_contour(&refs, usize::MAX, 1);
        let mut last = 0;
        for p in &first {
            let idx = full.iter().position(|q| q == p).unwrap();
            assert!(idx >= last);
            last = idx;
        }
    }
}
