//! Heightfield synthesis from the tectonic plate graph.
//!
//! Rasterizes plate boundaries onto the pixel grid, flood-fills plate
//! ownership from the plate centers and boundary lines, then computes the
//! per-pixel height from plate base height, ridge/trench contribution and
//! fractal noise.

use glam::{IVec2, Vec2};
use rayon::prelude::*;
use thiserror::Error;

use crate::config::WorldConfig;
use crate::noise::{generate_fractal_noise_grid, sample_fractal_noise, FractalNoiseConfig};
use crate::tectonics::{edge_side, EdgeId, PlateGraph, PlateId};

use super::grid::Grid;

/// The ridge modulation noise is sampled on coordinates mirrored about a
/// distant origin so it decorrelates from the detail field.
const RIDGE_SAMPLE_ORIGIN: f32 = 50_000.0;

/// Failures of the heightfield synthesis stage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeightmapError {
    #[error("pixel ({0}, {1}) was not reached by the plate flood fill")]
    UnassignedPixel(usize, usize),
    #[error("non-finite height at pixel ({0}, {1})")]
    NonFiniteHeight(usize, usize),
}

/// Per-pixel ownership state used while synthesizing the heightfield.
#[derive(Debug, Clone, Default)]
struct MapPixel {
    /// Owning plate; `None` until flood fill assigns one.
    plate: Option<PlateId>,
    /// Boundary edges that rasterize through this pixel.
    edges: Vec<EdgeId>,
}

/// Synthesizes the heightfield for the given plate graph.
///
/// `progress` receives values in [0, 1] at coarse milestones. The pixel
/// ownership grid is an internal working structure and is discarded; only
/// the height grid is returned.
///
/// # Errors
/// Returns an error if any pixel is left without an owning plate or ends
/// up with a non-finite height. Neither happens for plate graphs built by
/// [`crate::tectonics::generate_plates`], which seeds plates beyond the
/// map borders.
pub fn synthesize_heightmap(
    graph: &PlateGraph,
    config: &WorldConfig,
    noise_seed: i32,
    mut progress: impl FnMut(f32),
) -> Result<Grid<f32>, HeightmapError> {
    let width = config.map_width;
    let height = config.map_height;

    // Initial large-scale texture in [0, 1]. Every cell is overwritten by
    // the plate height pass below once ownership is known.
    let base_noise = FractalNoiseConfig::base_terrain(noise_seed);
    let mut heights = Grid::from_vec(
        width,
        height,
        generate_fractal_noise_grid(width, height, &base_noise)
            .into_iter()
            .map(|n| 0.5 + 0.5 * n)
            .collect(),
    );

    let mut pixels: Grid<MapPixel> = Grid::new(width, height, MapPixel::default());

    rasterize_edges(graph, &mut pixels);
    seed_plate_centers(graph, &mut pixels);
    flood_fill(graph, &mut pixels);
    progress(0.5);

    // A pixel the flood fill failed to reach would otherwise surface as a
    // bogus height far downstream; detect it here.
    for y in 0..height {
        for x in 0..width {
            if pixels[(x, y)].plate.is_none() {
                return Err(HeightmapError::UnassignedPixel(x, y));
            }
        }
    }

    let missing = find_missing_plates(graph, &pixels);

    compute_heights(graph, config, noise_seed, &pixels, &missing, &mut heights);
    progress(1.0);

    for y in 0..height {
        for x in 0..width {
            if !heights[(x, y)].is_finite() {
                return Err(HeightmapError::NonFiniteHeight(x, y));
            }
        }
    }

    Ok(heights)
}

/// Rasterizes every edge of the graph onto the pixel grid with Bresenham's
/// line algorithm. Traversed in-bounds pixels record the edge and take its
/// left plate as a tentative owner.
fn rasterize_edges(graph: &PlateGraph, pixels: &mut Grid<MapPixel>) {
    let width = pixels.width() as i32;
    let height = pixels.height() as i32;

    for (index, edge) in graph.edges.iter().enumerate() {
        let edge_id = EdgeId(index as u32);

        let mut x0 = edge.a.x;
        let mut y0 = edge.a.y;
        let x1 = edge.b.x;
        let y1 = edge.b.y;

        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();

        // Malformed geometry guard: an edge spanning more than 4x the grid
        // is degenerate and skipped.
        if dx > width * 4 || dy > height * 4 {
            continue;
        }

        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx - dy;

        loop {
            if pixels.in_bounds(x0, y0) {
                let pixel = &mut pixels[(x0 as usize, y0 as usize)];
                pixel.edges.push(edge_id);
                pixel.plate = Some(edge.left);
            }

            if x0 == x1 && y0 == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x0 += sx;
            } else if e2 < dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

/// Marks each plate's center pixel (when in bounds) as owned by it.
fn seed_plate_centers(graph: &PlateGraph, pixels: &mut Grid<MapPixel>) {
    for plate in &graph.plates {
        if pixels.in_bounds(plate.center.x, plate.center.y) {
            pixels[(plate.center.x as usize, plate.center.y as usize)].plate = Some(plate.id);
        }
    }
}

const NEIGHBOR_MASK: [IVec2; 4] = [
    IVec2::new(-1, 0),
    IVec2::new(1, 0),
    IVec2::new(0, -1),
    IVec2::new(0, 1),
];

/// Propagates plate ownership to every unassigned pixel.
///
/// Runs the directional neighbor-vote relaxation until it stalls, then
/// resolves the pockets it cannot reach (cells sealed off by rasterized
/// boundary lines) by side-testing against the edges in neighboring cells,
/// and repeats until nothing is left to assign. Order-sensitive; must stay
/// sequential.
fn flood_fill(graph: &PlateGraph, pixels: &mut Grid<MapPixel>) {
    loop {
        relax_ownership(pixels);
        if !resolve_boundary_strips(graph, pixels) {
            break;
        }
    }
}

/// Alternates forward (low-to-high) and backward (high-to-low) full-grid
/// sweeps until one complete pass makes no new assignment. The directional
/// double sweep converges in a small constant number of passes for locally
/// compact regions.
fn relax_ownership(pixels: &mut Grid<MapPixel>) {
    let width = pixels.width();
    let height = pixels.height();

    let mut done = false;
    while !done {
        done = true;
        for x in 0..width {
            for y in 0..height {
                if pixels[(x, y)].plate.is_none() && try_fill_pixel(pixels, x, y) {
                    done = false;
                }
            }
        }
        for x in (1..width).rev() {
            for y in (1..height).rev() {
                if pixels[(x, y)].plate.is_none() && try_fill_pixel(pixels, x, y) {
                    done = false;
                }
            }
        }
    }
}

/// Assigns cells the relaxation cannot reach: pockets whose only assigned
/// neighbors carry boundary edges and therefore never vote. Each such cell
/// votes over the edges running through its neighbors, taking the plate on
/// its own side of each edge. Returns whether anything was assigned.
fn resolve_boundary_strips(graph: &PlateGraph, pixels: &mut Grid<MapPixel>) -> bool {
    let width = pixels.width();
    let height = pixels.height();
    let mut assigned_any = false;

    for y in 0..height {
        for x in 0..width {
            if pixels[(x, y)].plate.is_some() {
                continue;
            }

            let position = IVec2::new(x as i32, y as i32);
            let mut votes: Vec<(PlateId, u32)> = Vec::new();

            for d in NEIGHBOR_MASK {
                let nx = x as i32 + d.x;
                let ny = y as i32 + d.y;
                if !pixels.in_bounds(nx, ny) {
                    continue;
                }

                for &edge_id in &pixels[(nx as usize, ny as usize)].edges {
                    let edge = graph.edge(edge_id);
                    let side = edge_side(position, edge.a, edge.b);
                    let plate = if side > 0.0 { edge.right } else { edge.left };

                    match votes.iter_mut().find(|(p, _)| *p == plate) {
                        Some((_, count)) => *count += 1,
                        None => votes.push((plate, 1)),
                    }
                }
            }

            if votes.is_empty() {
                continue;
            }

            let mut winner = votes[0];
            for &vote in &votes[1..] {
                if vote.1 > winner.1 {
                    winner = vote;
                }
            }

            pixels[(x, y)].plate = Some(winner.0);
            assigned_any = true;
        }
    }

    assigned_any
}

/// Votes among the 4-neighbors that already have an owner and carry no
/// boundary edge; the majority plate wins, ties broken by the first
/// neighbor reaching the winning count. Returns whether an owner was
/// assigned.
fn try_fill_pixel(pixels: &mut Grid<MapPixel>, x: usize, y: usize) -> bool {
    let mut votes: [(PlateId, u32); 4] = [(PlateId(0), 0); 4];
    let mut vote_count = 0usize;

    for d in NEIGHBOR_MASK {
        let nx = x as i32 + d.x;
        let ny = y as i32 + d.y;
        if !pixels.in_bounds(nx, ny) {
            continue;
        }

        let neighbor = &pixels[(nx as usize, ny as usize)];
        let Some(plate) = neighbor.plate else {
            continue;
        };
        if !neighbor.edges.is_empty() {
            continue;
        }

        match votes[..vote_count].iter_mut().find(|(p, _)| *p == plate) {
            Some((_, count)) => *count += 1,
            None => {
                votes[vote_count] = (plate, 1);
                vote_count += 1;
            }
        }
    }

    if vote_count == 0 {
        return false;
    }

    let mut winner = votes[0];
    for &vote in &votes[1..vote_count] {
        if vote.1 > winner.1 {
            winner = vote;
        }
    }

    pixels[(x, y)].plate = Some(winner.0);
    true
}

/// Flags plates that ended up owning zero pixels. Their edges would
/// otherwise distort the one neighboring plate that does still own area.
fn find_missing_plates(graph: &PlateGraph, pixels: &Grid<MapPixel>) -> Vec<bool> {
    let mut missing = vec![true; graph.num_plates()];

    for pixel in pixels.as_slice() {
        if let Some(plate) = pixel.plate {
            missing[plate.0 as usize] = false;
        }
    }

    missing
}

/// Parallel per-pixel height pass: plate base height + distance-weighted
/// ridge/trench contribution from the nearest eligible edge + detail noise.
fn compute_heights(
    graph: &PlateGraph,
    config: &WorldConfig,
    noise_seed: i32,
    pixels: &Grid<MapPixel>,
    missing: &[bool],
    heights: &mut Grid<f32>,
) {
    let width = config.map_width;
    let ridge_noise = FractalNoiseConfig::ridge_modulation(noise_seed);
    let detail_noise = FractalNoiseConfig::detail(noise_seed);
    let start_distance = config.map_width.max(config.map_height) as f32;

    heights
        .as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let position = Vec2::new(x as f32, y as f32);
                let pixel = &pixels[(x, y)];

                let mut base_height = -1.0;
                let mut best_edge = None;
                let mut best_distance = start_distance;

                if let Some(plate_id) = pixel.plate {
                    let plate = graph.plate(plate_id);
                    base_height = plate.base_height;

                    for &edge_id in &plate.edges {
                        let edge = graph.edge(edge_id);
                        if missing[edge.left.0 as usize] || missing[edge.right.0 as usize] {
                            continue;
                        }
                        let distance = edge.distance_squared(position);
                        if distance < best_distance {
                            best_distance = distance;
                            best_edge = Some(edge);
                        }
                    }
                }

                let tectonic_height = match best_edge {
                    Some(edge) => {
                        let falloff = 1.0 / (1.2 + 0.02 * best_distance).powi(2);
                        let modulation = 1.0
                            + sample_fractal_noise(
                                Vec2::new(
                                    RIDGE_SAMPLE_ORIGIN - x as f32,
                                    RIDGE_SAMPLE_ORIGIN - y as f32,
                                ),
                                &ridge_noise,
                            );
                        edge.mountain_factor * 3.0 * falloff * modulation
                    }
                    None => 0.0,
                };

                let detail = sample_fractal_noise(position, &detail_noise);

                *out = base_height + tectonic_height + detail;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tectonics::{generate_plates, jitter_edges};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn synthesized(seed: u64) -> (WorldConfig, Grid<f32>) {
        let config = WorldConfig::small(64);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut graph = generate_plates(&config, &mut rng).unwrap();
        jitter_edges(&mut graph, &mut rng);
        let heights = synthesize_heightmap(&graph, &config, seed as i32, |_| {}).unwrap();
        (config, heights)
    }

    #[test]
    fn test_every_pixel_gets_an_owner_and_finite_height() {
        // synthesize_heightmap errors on unassigned or non-finite pixels,
        // so Ok already proves full coverage.
        let (config, heights) = synthesized(42);
        assert_eq!(heights.len(), config.map_width * config.map_height);
        assert!(heights.as_slice().iter().all(|h| h.is_finite()));
    }

    #[test]
    fn test_heights_vary() {
        let (_, heights) = synthesized(123);
        let min = heights.as_slice().iter().copied().fold(f32::MAX, f32::min);
        let max = heights.max_value();
        assert!(min < max, "heightfield should not be flat");
    }

    #[test]
    fn test_reproducibility() {
        let (_, h1) = synthesized(7);
        let (_, h2) = synthesized(7);
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_flood_fill_assigns_from_seeded_neighbors() {
        let mut pixels: Grid<MapPixel> = Grid::new(8, 8, MapPixel::default());
        pixels[(0, 0)].plate = Some(PlateId(3));

        flood_fill(&PlateGraph::default(), &mut pixels);

        for pixel in pixels.as_slice() {
            assert_eq!(pixel.plate, Some(PlateId(3)));
        }
    }

    #[test]
    fn test_boundary_pockets_resolve_by_side_test() {
        use crate::tectonics::{TectonicEdge, TectonicPlate};

        // Two plates separated by a vertical boundary through x = 1.
        let plate = |id: u32, center: IVec2| TectonicPlate {
            id: PlateId(id),
            center,
            edges: Vec::new(),
            base_height: 1.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
        };
        let mut graph = PlateGraph {
            plates: vec![plate(0, IVec2::new(-5, 1)), plate(1, IVec2::new(7, 1))],
            edges: Vec::new(),
        };
        graph.push_edge(TectonicEdge {
            a: IVec2::new(1, -10),
            b: IVec2::new(1, 10),
            left: PlateId(1),
            right: PlateId(0),
            mountain_factor: 0.0,
        });

        let mut pixels: Grid<MapPixel> = Grid::new(3, 3, MapPixel::default());
        for y in 0..3 {
            pixels[(1, y)].edges.push(EdgeId(0));
            pixels[(1, y)].plate = Some(PlateId(1));
        }

        // The vote relaxation alone cannot cross the boundary column: the
        // only assigned cells carry edges and never vote.
        relax_ownership(&mut pixels);
        assert_eq!(pixels[(0, 1)].plate, None);
        assert_eq!(pixels[(2, 1)].plate, None);

        // The full fill resolves both sides via the side test.
        flood_fill(&graph, &mut pixels);
        for y in 0..3 {
            assert_eq!(pixels[(0, y)].plate, Some(PlateId(0)));
            assert_eq!(pixels[(2, y)].plate, Some(PlateId(1)));
        }
    }
}
