//! Tectonic plate and edge arena.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

/// Index of a plate in the [`PlateGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlateId(pub u32);

/// Index of an edge in the [`PlateGraph`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u32);

/// A tectonic plate: one Voronoi cell of the map.
///
/// Plates are created once by the partitioner; only their edge lists change
/// afterwards (replaced wholesale by the jitter pass).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TectonicPlate {
    /// Unique identifier of this plate (its arena index).
    pub id: PlateId,
    /// Seed position on the integer pixel grid. May lie outside the map.
    pub center: IVec2,
    /// Edges bordering this plate.
    pub edges: Vec<EdgeId>,
    /// Base elevation contributed to every pixel this plate owns.
    pub base_height: f32,
    /// Drift vector, in pixels. Recorded at creation; not yet read by any
    /// height or erosion computation.
    pub linear_velocity: Vec2,
    /// Rotational drift, in radians. Recorded at creation; not yet read by
    /// any height or erosion computation.
    pub angular_velocity: f32,
}

/// A boundary segment between exactly two plates.
///
/// Walking from `a` to `b`, `left` is the plate on the counterclockwise
/// side. The mountain factor in [-1, 1] controls the sign and strength of
/// the boundary's height contribution (positive: convergent ridge,
/// negative: divergent rift).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TectonicEdge {
    pub a: IVec2,
    pub b: IVec2,
    pub left: PlateId,
    pub right: PlateId,
    pub mountain_factor: f32,
}

impl TectonicEdge {
    /// Euclidean length of the segment.
    pub fn length(&self) -> f32 {
        (self.a - self.b).as_vec2().length()
    }

    /// Integer midpoint of the segment.
    pub fn midpoint(&self) -> IVec2 {
        (self.a + self.b) / 2
    }

    /// Squared distance from `position` to the segment.
    pub fn distance_squared(&self, position: Vec2) -> f32 {
        let v = self.a.as_vec2();
        let w = self.b.as_vec2();

        let l2 = (v - w).length_squared();
        if l2 == 0.0 {
            return (position - v).length_squared();
        }

        // Project onto the infinite line, then clamp to the segment.
        let t = (position - v).dot(w - v) / l2;
        if t < 0.0 {
            (position - v).length_squared()
        } else if t > 1.0 {
            (position - w).length_squared()
        } else {
            let projection = v + (w - v) * t;
            (position - projection).length_squared()
        }
    }
}

/// Side test for a point against the directed edge `a -> b`.
///
/// Returns the dot of the normalized edge normal with the normalized offset
/// from `a`: positive when `position` lies on the right side, negative on
/// the left, zero when `position == a` or the geometry is degenerate.
pub fn edge_side(position: IVec2, a: IVec2, b: IVec2) -> f32 {
    if position == a {
        return 0.0;
    }

    let edge = (b - a).as_vec2();
    let normal = Vec2::new(-edge.y, edge.x).normalize_or_zero();
    let delta = (position - a).as_vec2().normalize_or_zero();

    normal.dot(delta)
}

/// Arena of plates and edges, addressed by [`PlateId`] / [`EdgeId`].
///
/// Edges are shared between exactly the two plates they border; the arena
/// stores each edge once and both plates reference it by index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlateGraph {
    pub plates: Vec<TectonicPlate>,
    pub edges: Vec<TectonicEdge>,
}

impl PlateGraph {
    pub fn plate(&self, id: PlateId) -> &TectonicPlate {
        &self.plates[id.0 as usize]
    }

    pub fn edge(&self, id: EdgeId) -> &TectonicEdge {
        &self.edges[id.0 as usize]
    }

    pub fn num_plates(&self) -> usize {
        self.plates.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Appends an edge and registers it with both bordering plates.
    pub fn push_edge(&mut self, edge: TectonicEdge) -> EdgeId {
        let id = EdgeId(self.edges.len() as u32);
        self.plates[edge.left.0 as usize].edges.push(id);
        self.plates[edge.right.0 as usize].edges.push(id);
        self.edges.push(edge);
        id
    }

    /// Discards all current edges and replaces them with `edges`,
    /// rebuilding every plate's edge list.
    pub fn replace_edges(&mut self, edges: Vec<TectonicEdge>) {
        self.edges.clear();
        for plate in &mut self.plates {
            plate.edges.clear();
        }
        for edge in edges {
            self.push_edge(edge);
        }
    }
}
