//! Smoothing filters and border flattening.

use glam::IVec2;
use rayon::prelude::*;
use std::f32::consts::PI;

use super::grid::Grid;

/// Offset stencil shared by the median filter, the box filter and the
/// erosion simulator's moist-area smoothing. Mixes the immediate
/// neighborhood with radius-2 cross points; some taps repeat, which
/// weights them double in the convolution.
pub const FILTER_STENCIL: [IVec2; 13] = [
    IVec2::new(-1, -1),
    IVec2::new(-1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, -1),
    IVec2::new(0, 0),
    IVec2::new(0, 1),
    IVec2::new(-1, -1),
    IVec2::new(0, 0),
    IVec2::new(1, 1),
    IVec2::new(0, -2),
    IVec2::new(-2, 0),
    IVec2::new(0, 2),
    IVec2::new(2, 0),
];

/// Median of the stencil values around each cell. Out-of-bounds taps are
/// ignored (no wraparound, no extension).
pub fn median_filter(map: &Grid<f32>) -> Grid<f32> {
    let width = map.width();
    let mut filtered = Grid::new(width, map.height(), 0.0f32);

    filtered
        .as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let mut values = [0.0f32; FILTER_STENCIL.len()];
                let mut count = 0usize;

                for offset in FILTER_STENCIL {
                    let dx = x as i32 + offset.x;
                    let dy = y as i32 + offset.y;
                    if map.in_bounds(dx, dy) {
                        values[count] = map[(dx as usize, dy as usize)];
                        count += 1;
                    }
                }

                values[..count].sort_unstable_by(f32::total_cmp);
                *out = values[count / 2];
            }
        });

    filtered
}

/// Mean of the stencil values around each cell.
pub fn box_filter(map: &Grid<f32>) -> Grid<f32> {
    let width = map.width();
    let mut filtered = Grid::new(width, map.height(), 0.0f32);

    filtered
        .as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                *out = convolve_at(map, x, y);
            }
        });

    filtered
}

/// Stencil convolution at a single cell, normalized by the full stencil
/// size regardless of how many taps were in bounds.
pub fn convolve_at(map: &Grid<f32>, x: usize, y: usize) -> f32 {
    let mut acc = 0.0f32;

    for offset in FILTER_STENCIL {
        let dx = x as i32 + offset.x;
        let dy = y as i32 + offset.y;
        if map.in_bounds(dx, dy) {
            acc += map[(dx as usize, dy as usize)];
        }
    }

    acc / FILTER_STENCIL.len() as f32
}

/// Blends the map toward `target` near the borders.
///
/// The blend factor is `sin(min(1, (d / border)²) · π/2)` with `d` the
/// distance to the nearest map edge and `border` one tenth of the shorter
/// map dimension; the interior stays untouched.
pub fn flatten_border(map: &mut Grid<f32>, target: f32) {
    let width = map.width();
    let height = map.height();
    let border = width.min(height) as f32 / 10.0;

    map.as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, value) in row.iter_mut().enumerate() {
                let dist_left = x as f32;
                let dist_bottom = y as f32;
                let dist_top = height as f32 - y as f32;
                let dist_right = width as f32 - x as f32;

                let min_dist = dist_left.min(dist_bottom).min(dist_top).min(dist_right) / border;
                let factor = (min_dist * min_dist).min(1.0) * PI * 0.5;
                let factor = factor.sin();

                *value = factor * *value + (1.0 - factor) * target;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(width: usize, height: usize, value: f32) -> Grid<f32> {
        Grid::new(width, height, value)
    }

    #[test]
    fn test_median_filter_removes_spike() {
        let mut map = flat(9, 9, 1.0);
        map[(4, 4)] = 100.0;

        let filtered = median_filter(&map);

        assert_eq!(filtered[(4, 4)], 1.0);
    }

    #[test]
    fn test_median_filter_preserves_constant_field() {
        let map = flat(8, 8, 3.25);
        let filtered = median_filter(&map);
        assert!(filtered.as_slice().iter().all(|&v| v == 3.25));
    }

    #[test]
    fn test_box_filter_averages_spike_down() {
        let mut map = flat(9, 9, 0.0);
        map[(4, 4)] = 13.0;

        let filtered = box_filter(&map);

        // The (0, 0) tap appears twice in the stencil.
        assert!((filtered[(4, 4)] - 2.0).abs() < 1e-6);
        assert_eq!(filtered[(0, 0)], 0.0);
    }

    #[test]
    fn test_convolve_under_counts_at_borders() {
        // Out-of-bounds taps are dropped but the normalization stays /13,
        // so border convolutions shrink toward zero.
        let map = flat(8, 8, 1.0);
        assert!(convolve_at(&map, 0, 0) < convolve_at(&map, 4, 4));
    }

    #[test]
    fn test_flatten_border_pins_edges_and_keeps_center() {
        let mut map = flat(64, 64, 5.0);
        flatten_border(&mut map, 0.0);

        assert_eq!(map[(0, 0)], 0.0);
        assert_eq!(map[(0, 32)], 0.0);
        assert_eq!(map[(32, 32)], 5.0);
    }

    #[test]
    fn test_flatten_border_toward_custom_target() {
        let mut map = flat(64, 64, 0.0);
        flatten_border(&mut map, 1.0);

        assert_eq!(map[(0, 0)], 1.0);
        assert_eq!(map[(32, 32)], 0.0);
    }
}
