//! Planar Voronoi tessellation for plate boundaries.

use glam::{IVec2, Vec2};
use rand::Rng;
use thiserror::Error;

use crate::config::WorldConfig;
use crate::rng::RandExt;

use super::plate::{edge_side, PlateGraph, PlateId, TectonicEdge, TectonicPlate};

/// Failures of the plate partitioning stage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TectonicError {
    #[error("need at least 2 plate centers, got {0}")]
    TooFewPlates(usize),
    #[error("Voronoi tessellation produced no edges")]
    NoEdges,
}

/// Scatters plate centers and computes the Voronoi boundary graph.
///
/// One plate is seeded per cell of a regular grid covering the map plus a
/// one-cell margin on every side, with the exact center position
/// randomized within its cell. The margin guarantees every in-map point
/// lies strictly inside the convex hull of the seeds, so no in-map Voronoi
/// cell is unbounded.
///
/// Every finite Voronoi edge becomes a [`TectonicEdge`]: endpoints clamped
/// to the map rectangle grown by `edge_clamp_margin`, `left`/`right`
/// assigned from the two centers nearest the edge midpoint, and a uniform
/// mountain factor in [-1, 1) drawn per edge.
pub fn generate_plates(
    config: &WorldConfig,
    rng: &mut impl Rng,
) -> Result<PlateGraph, TectonicError> {
    let plate_size = config.plate_size as i32;
    let map_w = config.map_width as i32;
    let map_h = config.map_height as i32;

    // Seed one plate per grid cell, one extra row/column outside the map.
    let mut plates = Vec::new();
    let mut cols = 0usize;
    let mut left = -plate_size;
    while left < map_w + plate_size {
        cols += 1;
        let mut bottom = -plate_size;
        while bottom < map_h + plate_size {
            let center = IVec2::new(
                rng.random_range(left..left + plate_size),
                rng.random_range(bottom..bottom + plate_size),
            );
            plates.push(TectonicPlate {
                id: PlateId(plates.len() as u32),
                center,
                edges: Vec::new(),
                base_height: rng.random::<f32>() + 1.0,
                linear_velocity: Vec2::new(
                    rng.random::<f32>() * config.max_plate_linear_velocity,
                    rng.random::<f32>() * config.max_plate_linear_velocity,
                ),
                angular_velocity: rng.random::<f32>() * config.max_plate_angular_velocity,
            });
            bottom += plate_size;
        }
        left += plate_size;
    }

    if plates.len() < 2 {
        return Err(TectonicError::TooFewPlates(plates.len()));
    }
    let rows = plates.len() / cols;

    let segments = voronoi_segments(&plates, cols, rows, plate_size);

    let mut graph = PlateGraph {
        plates,
        edges: Vec::new(),
    };

    let margin = config.edge_clamp_margin;
    for (a, b) in segments {
        let a = IVec2::new(
            (a.x as i32).clamp(-margin, map_w + margin),
            (a.y as i32).clamp(-margin, map_h + margin),
        );
        let b = IVec2::new(
            (b.x as i32).clamp(-margin, map_w + margin),
            (b.y as i32).clamp(-margin, map_h + margin),
        );

        let middle = (a + b) / 2;
        let (first, second) = nearest_two(&graph.plates, middle);

        // Walking a -> b, the left plate sits on the counterclockwise side.
        let (left, right) = if edge_side(graph.plates[first].center, a, b) > 0.0 {
            (second, first)
        } else {
            (first, second)
        };

        let mountain_factor = rng.next_float(-1.0, 1.0);
        graph.push_edge(TectonicEdge {
            a,
            b,
            left: PlateId(left as u32),
            right: PlateId(right as u32),
            mountain_factor,
        });
    }

    if graph.edges.is_empty() {
        return Err(TectonicError::NoEdges);
    }

    Ok(graph)
}

/// Computes the finite Voronoi edges of the jittered seeding grid.
///
/// Each seed's cell is cut from a generous bounding box by the bisector
/// half-planes of the seeds in the surrounding grid neighborhood (a
/// jittered regular grid bounds every Voronoi neighbor to nearby cells).
/// Shared polygon sides are emitted once, for the smaller seed index.
fn voronoi_segments(
    plates: &[TectonicPlate],
    cols: usize,
    rows: usize,
    plate_size: i32,
) -> Vec<(Vec2, Vec2)> {
    // Chebyshev reach of candidate neighbors, in grid cells.
    const REACH: i64 = 2;
    // Tolerance for a polygon side to count as lying on a bisector, px.
    const BISECTOR_EPS: f32 = 0.05;

    let span = 3.0 * plate_size as f32;
    let mut segments = Vec::new();

    for ci in 0..cols {
        for rj in 0..rows {
            let p_idx = ci * rows + rj;
            let p = plates[p_idx].center.as_vec2();

            let mut candidates = Vec::new();
            for di in -REACH..=REACH {
                for dj in -REACH..=REACH {
                    if di == 0 && dj == 0 {
                        continue;
                    }
                    let ni = ci as i64 + di;
                    let nj = rj as i64 + dj;
                    if ni < 0 || nj < 0 || ni >= cols as i64 || nj >= rows as i64 {
                        continue;
                    }
                    candidates.push(ni as usize * rows + nj as usize);
                }
            }

            // Cell polygon: a box around the seed, cut down by one
            // half-plane per candidate neighbor.
            let mut polygon = vec![
                Vec2::new(p.x - span, p.y - span),
                Vec2::new(p.x + span, p.y - span),
                Vec2::new(p.x + span, p.y + span),
                Vec2::new(p.x - span, p.y + span),
            ];
            for &q_idx in &candidates {
                clip_half_plane(&mut polygon, p, plates[q_idx].center.as_vec2());
                if polygon.len() < 3 {
                    break;
                }
            }
            if polygon.len() < 3 {
                continue;
            }

            for k in 0..polygon.len() {
                let a = polygon[k];
                let b = polygon[(k + 1) % polygon.len()];
                let mid = (a + b) * 0.5;
                let dist_p = mid.distance(p);

                // The neighbor whose bisector carries this side; sides left
                // over from the initial box have none and are dropped.
                let mut owner: Option<usize> = None;
                let mut best_gap = BISECTOR_EPS;
                for &q_idx in &candidates {
                    let gap = (mid.distance(plates[q_idx].center.as_vec2()) - dist_p).abs();
                    if gap < best_gap {
                        best_gap = gap;
                        owner = Some(q_idx);
                    }
                }

                if let Some(q_idx) = owner {
                    if q_idx > p_idx {
                        segments.push((a, b));
                    }
                }
            }
        }
    }

    segments
}

/// Clips `polygon` to the half-plane of points at least as close to `p` as
/// to `q` (Sutherland-Hodgman against the p/q bisector).
fn clip_half_plane(polygon: &mut Vec<Vec2>, p: Vec2, q: Vec2) {
    let mid = (p + q) * 0.5;
    let normal = p - q;
    let inside = |v: Vec2| (v - mid).dot(normal) >= 0.0;

    let mut clipped = Vec::with_capacity(polygon.len() + 1);
    for i in 0..polygon.len() {
        let current = polygon[i];
        let next = polygon[(i + 1) % polygon.len()];
        let current_in = inside(current);
        let next_in = inside(next);

        if current_in {
            clipped.push(current);
        }
        if current_in != next_in {
            let denom = (next - current).dot(normal);
            let t = (mid - current).dot(normal) / denom;
            clipped.push(current + (next - current) * t);
        }
    }

    *polygon = clipped;
}

/// Indices of the two plates whose centers are nearest to `point`.
///
/// Centers are distinct points from a jittered grid, so the two results
/// are always distinct plates.
fn nearest_two(plates: &[TectonicPlate], point: IVec2) -> (usize, usize) {
    let mut best = (0usize, f32::MAX);
    let mut second = (0usize, f32::MAX);

    for (i, plate) in plates.iter().enumerate() {
        let d = (plate.center - point).as_vec2().length_squared();
        if d < best.1 {
            second = best;
            best = (i, d);
        } else if d < second.1 {
            second = (i, d);
        }
    }

    (best.0, second.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn small_config() -> WorldConfig {
        WorldConfig::small(64)
    }

    #[test]
    fn test_generates_plates_and_edges() {
        let config = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let graph = generate_plates(&config, &mut rng).unwrap();

        assert!(graph.num_plates() >= 2);
        assert!(graph.num_edges() > 0);
    }

    #[test]
    fn test_edges_have_distinct_plates_and_clamped_endpoints() {
        let config = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(123);
        let graph = generate_plates(&config, &mut rng).unwrap();

        let w = config.map_width as i32;
        let h = config.map_height as i32;
        let m = config.edge_clamp_margin;

        for edge in &graph.edges {
            assert_ne!(edge.left, edge.right);
            assert!((-1.0..1.0).contains(&edge.mountain_factor));
            for point in [edge.a, edge.b] {
                assert!(point.x >= -m && point.x <= w + m);
                assert!(point.y >= -m && point.y <= h + m);
            }
        }
    }

    #[test]
    fn test_edge_lists_are_consistent() {
        let config = small_config();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let graph = generate_plates(&config, &mut rng).unwrap();

        for plate in &graph.plates {
            for &edge_id in &plate.edges {
                let edge = graph.edge(edge_id);
                assert!(
                    edge.left == plate.id || edge.right == plate.id,
                    "plate {:?} references edge {:?} it does not border",
                    plate.id,
                    edge_id
                );
            }
        }
    }

    #[test]
    fn test_reproducibility() {
        let config = small_config();
        let mut rng1 = ChaCha8Rng::seed_from_u64(999);
        let mut rng2 = ChaCha8Rng::seed_from_u64(999);

        let g1 = generate_plates(&config, &mut rng1).unwrap();
        let g2 = generate_plates(&config, &mut rng2).unwrap();

        assert_eq!(g1.num_plates(), g2.num_plates());
        assert_eq!(g1.num_edges(), g2.num_edges());
        for (p1, p2) in g1.plates.iter().zip(g2.plates.iter()) {
            assert_eq!(p1.center, p2.center);
            assert_eq!(p1.base_height, p2.base_height);
        }
        for (e1, e2) in g1.edges.iter().zip(g2.edges.iter()) {
            assert_eq!((e1.a, e1.b), (e2.a, e2.b));
            assert_eq!(e1.mountain_factor, e2.mountain_factor);
        }
    }

    #[test]
    fn test_clip_half_plane_keeps_near_side() {
        let mut polygon = vec![
            Vec2::new(-10.0, -10.0),
            Vec2::new(10.0, -10.0),
            Vec2::new(10.0, 10.0),
            Vec2::new(-10.0, 10.0),
        ];
        clip_half_plane(&mut polygon, Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0));

        // Everything right of x = 0 is cut away.
        assert!(polygon.len() >= 3);
        for v in &polygon {
            assert!(v.x <= 1e-4, "vertex {v:?} survived on the far side");
        }
    }

    #[test]
    fn test_nearest_two_distinct() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let graph = generate_plates(&small_config(), &mut rng).unwrap();
        let (first, second) = nearest_two(&graph.plates, IVec2::new(32, 32));
        assert_ne!(first, second);
    }
}
