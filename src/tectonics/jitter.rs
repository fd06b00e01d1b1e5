//! Recursive randomized subdivision of plate boundary edges.

use glam::{IVec2, Vec2};
use rand::Rng;

use crate::rng::RandExt;

use super::plate::{PlateGraph, TectonicEdge};

/// Subdivision depth is capped so one edge never explodes into more than
/// 2^(4+1) sub-edges.
const MAX_SPLIT_DEPTH: i32 = 4;

/// Replaces every edge of the graph by a fractal polyline.
///
/// Each edge is processed exactly once (the arena stores edges once, even
/// though both bordering plates reference them). The subdivision depth
/// grows with edge length, roughly one level per 10 pixels, capped at 4.
/// All plate edge lists are rebuilt from the resulting sub-edges, which
/// inherit the parent's plate pair and mountain factor.
pub fn jitter_edges(graph: &mut PlateGraph, rng: &mut impl Rng) {
    let originals = std::mem::take(&mut graph.edges);

    let mut sub_edges = Vec::with_capacity(originals.len() * 4);
    for edge in &originals {
        let depth = (edge.length() as i32 / 10).min(MAX_SPLIT_DEPTH);
        split_edge(edge, edge, depth, rng, &mut sub_edges);
    }

    graph.replace_edges(sub_edges);
}

/// Splits `edge` at a randomized point displaced perpendicular to the
/// *original* (undivided) edge, recursing `depth` more times on each half.
///
/// The split position along the segment is a random convex combination of
/// the endpoints; the perpendicular offset magnitude is drawn uniformly
/// from `[0, depth²)`.
fn split_edge(
    edge: &TectonicEdge,
    original: &TectonicEdge,
    depth: i32,
    rng: &mut impl Rng,
    out: &mut Vec<TectonicEdge>,
) {
    let a = edge.a.as_vec2();
    let b = edge.b.as_vec2();

    let original_vector = (original.a - original.b).as_vec2();
    let movement_axis = Vec2::new(-original_vector.y, original_vector.x).normalize_or_zero();

    let shift = rng.next_float(0.1, 0.9);
    let mut split = a * shift + b * (1.0 - shift);
    split += movement_axis * rng.next_float(0.0, (depth * depth) as f32);

    let middle = IVec2::new(split.x as i32, split.y as i32);

    let first = TectonicEdge {
        a: edge.a,
        b: middle,
        left: edge.left,
        right: edge.right,
        mountain_factor: edge.mountain_factor,
    };
    let second = TectonicEdge {
        a: middle,
        b: edge.b,
        left: edge.left,
        right: edge.right,
        mountain_factor: edge.mountain_factor,
    };

    if depth <= 0 {
        out.push(first);
        out.push(second);
    } else {
        split_edge(&first, original, depth - 1, rng, out);
        split_edge(&second, original, depth - 1, rng, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tectonics::plate::{PlateId, TectonicPlate};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn two_plate_graph(a: IVec2, b: IVec2) -> PlateGraph {
        let plate = |id: u32, center: IVec2| TectonicPlate {
            id: PlateId(id),
            center,
            edges: Vec::new(),
            base_height: 1.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
        };
        let mut graph = PlateGraph {
            plates: vec![plate(0, IVec2::new(-20, 0)), plate(1, IVec2::new(20, 0))],
            edges: Vec::new(),
        };
        graph.push_edge(TectonicEdge {
            a,
            b,
            left: PlateId(0),
            right: PlateId(1),
            mountain_factor: 0.7,
        });
        graph
    }

    #[test]
    fn test_sub_edges_form_connected_polyline() {
        let a = IVec2::new(0, -40);
        let b = IVec2::new(0, 40);
        let mut graph = two_plate_graph(a, b);
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        jitter_edges(&mut graph, &mut rng);

        assert!(graph.num_edges() > 1);
        assert_eq!(graph.edges.first().unwrap().a, a);
        assert_eq!(graph.edges.last().unwrap().b, b);
        for pair in graph.edges.windows(2) {
            assert_eq!(pair[0].b, pair[1].a, "polyline must be connected");
        }
    }

    #[test]
    fn test_sub_edges_inherit_plates_and_mountain_factor() {
        let mut graph = two_plate_graph(IVec2::new(0, -40), IVec2::new(0, 40));
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        jitter_edges(&mut graph, &mut rng);

        for edge in &graph.edges {
            assert_eq!(edge.left, PlateId(0));
            assert_eq!(edge.right, PlateId(1));
            assert_eq!(edge.mountain_factor, 0.7);
        }
        // Both plates reference every sub-edge.
        assert_eq!(graph.plate(PlateId(0)).edges.len(), graph.num_edges());
        assert_eq!(graph.plate(PlateId(1)).edges.len(), graph.num_edges());
    }

    #[test]
    fn test_split_count_follows_depth() {
        // Length 80 -> depth 80/10 = 8, capped at 4 -> 2^(4+1) leaves.
        let mut graph = two_plate_graph(IVec2::new(0, -40), IVec2::new(0, 40));
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        jitter_edges(&mut graph, &mut rng);
        assert_eq!(graph.num_edges(), 32);

        // A short edge still splits once at depth 0.
        let mut graph = two_plate_graph(IVec2::new(0, 0), IVec2::new(0, 5));
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        jitter_edges(&mut graph, &mut rng);
        assert_eq!(graph.num_edges(), 2);
    }

    #[test]
    fn test_degenerate_edge_survives() {
        let p = IVec2::new(3, 3);
        let mut graph = two_plate_graph(p, p);
        let mut rng = ChaCha8Rng::seed_from_u64(11);

        jitter_edges(&mut graph, &mut rng);

        for edge in &graph.edges {
            assert_eq!(edge.a, p);
            assert_eq!(edge.b, p);
        }
    }
}
