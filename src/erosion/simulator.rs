//! Grid-based hydraulic erosion.
//!
//! A simplified shallow-water / sediment-transport model: periodic rainfall
//! injection, flux-based flow between neighboring cells, capacity-based
//! erosion/deposition and semi-Lagrangian sediment advection, advanced over
//! a fixed simulated duration.
//!
//! Every parallel sub-pass reads only the previous sub-pass's grids and
//! writes only its own cell; the sub-passes themselves run in a fixed
//! barrier order (flux before velocity, velocity before water, water
//! before erosion).

use glam::Vec2;
use rand::Rng;
use rayon::prelude::*;

use crate::config::WorldConfig;
use crate::terrain::filters::convolve_at;
use crate::terrain::Grid;

/// Number of trailing steps forming the settling phase, during which the
/// step size shrinks geometrically.
const SETTLING_STEPS: usize = 50;
const SETTLING_SHRINK: f32 = 0.95;

/// Slope floor in the capacity formula; lets slow flow over flat terrain
/// carry a little sediment.
const CAPACITY_SLOPE_BIAS: f32 = 0.02;

/// Auxiliary maps produced by a finished erosion run.
#[derive(Debug, Clone)]
pub struct ErosionMaps {
    /// Cumulative water exposure per cell, normalized to [0, 1].
    pub moisture: Grid<f32>,
    /// Cumulative removed soil per cell, normalized to [0, 1].
    pub erosion: Grid<f32>,
    /// Cumulative deposited soil per cell, normalized to [0, 1].
    pub deposition: Grid<f32>,
    /// Mean of the normalized moisture map.
    pub mean_moisture: f32,
}

/// Owns all per-cell state grids of one erosion run.
///
/// Interior cells (margin >= 2 from any border) participate in the flow
/// and erosion updates; border cells are clamped to zero flow. One
/// instance serves exactly one run; concurrent generations must not share
/// a simulator.
pub struct ErosionSimulator {
    config: WorldConfig,
    /// Terrain height, sculpted in place over the run.
    soil: Grid<f32>,
    /// Scratch buffer so the erosion pass reads a stable soil field.
    soil_scratch: Grid<f32>,
    /// Water column above the soil, in [0, max_water_height].
    water: Grid<f32>,
    /// Dissolved sediment, double-buffered for advection.
    sediment: [Grid<f32>; 2],
    /// Index of the live sediment buffer.
    current: usize,
    /// Flow velocity derived from the flux differentials.
    velocity: Grid<Vec2>,
    /// Signed outgoing flow rate to the +x neighbor, in [-max_flux,
    /// max_flux]. Flow to -x is read as the negated flux stored on the
    /// neighbor; it is never stored separately.
    flux_right: Grid<f32>,
    /// Signed outgoing flow rate to the +y neighbor.
    flux_top: Grid<f32>,
    total_erosion: Grid<f32>,
    total_deposition: Grid<f32>,
    moisture: Grid<f32>,
    step_size: f32,
    time_until_rain: f32,
}

impl ErosionSimulator {
    /// Creates a simulator over the given terrain heights.
    pub fn new(config: &WorldConfig, soil: Grid<f32>) -> Self {
        let width = soil.width();
        let height = soil.height();
        Self {
            config: config.clone(),
            soil_scratch: Grid::new(width, height, 0.0),
            water: Grid::new(width, height, 0.0),
            sediment: [
                Grid::new(width, height, 0.0),
                Grid::new(width, height, 0.0),
            ],
            current: 0,
            velocity: Grid::new(width, height, Vec2::ZERO),
            flux_right: Grid::new(width, height, 0.0),
            flux_top: Grid::new(width, height, 0.0),
            total_erosion: Grid::new(width, height, 0.0),
            total_deposition: Grid::new(width, height, 0.0),
            moisture: Grid::new(width, height, 0.0),
            step_size: config.step_size,
            time_until_rain: 0.0,
            soil,
        }
    }

    /// Runs the full rain/erosion schedule and returns the sculpted soil
    /// heights plus the normalized auxiliary maps.
    ///
    /// The step count is `rain_rounds * rain_round_duration / step_size`;
    /// every step executes exactly once. `progress` receives values in
    /// [0, 1].
    pub fn run(
        mut self,
        rng: &mut impl Rng,
        mut progress: impl FnMut(f32),
    ) -> (Grid<f32>, ErosionMaps) {
        let max_duration = self.config.rain_rounds as f32 * self.config.rain_round_duration;
        let max_steps = (max_duration / self.config.step_size) as usize;
        let drops_per_round =
            (self.soil.len() as f32 * self.config.rain_drops_per_pixel) as usize;

        for step in 0..max_steps {
            if max_steps - step < SETTLING_STEPS {
                self.step_size *= SETTLING_SHRINK;
            }
            progress(step as f32 / max_steps as f32);
            self.step(rng, drops_per_round);
        }

        self.finish()
    }

    /// One simulation step: rain when the round timer expires, then the
    /// flux, velocity, water and erosion/advection passes in order.
    fn step(&mut self, rng: &mut impl Rng, drops_per_round: usize) {
        self.time_until_rain -= self.step_size;
        if self.time_until_rain <= 0.0 {
            self.spawn_rain_drops(drops_per_round, rng);
            self.time_until_rain = self.config.rain_round_duration;
            self.smooth_moist_areas();
        }

        self.update_flux();
        self.update_velocity();
        self.update_water();
        self.update_erosion();
        self.advect_sediment();
    }

    /// Deposits `count` rain drops, each a disk of water at a uniformly
    /// random position. Only interior cells receive water.
    fn spawn_rain_drops(&mut self, count: usize, rng: &mut impl Rng) {
        let width = self.water.width() as i32;
        let height = self.water.height() as i32;
        let radius = self.config.rain_drop_radius as i32;
        let drop_height = self.config.rain_drop_height;

        for _ in 0..count {
            let px = rng.random_range(0..width);
            let py = rng.random_range(0..height);

            for x in (px - radius)..(px + radius) {
                for y in (py - radius)..(py + radius) {
                    let dx = x - px;
                    let dy = y - py;
                    if dx * dx + dy * dy <= radius * radius
                        && self.water.interior_signed(x, y, 2)
                    {
                        self.water[(x as usize, y as usize)] += drop_height;
                    }
                }
            }
        }
    }

    /// Replaces soil/water/sediment in saturated cells by their stencil
    /// convolutions. Cells qualify when their local moisture convolution
    /// exceeds 0.75x the global mean; this prevents runaway digitization
    /// artifacts in standing water. Sequential in-place sweep.
    fn smooth_moist_areas(&mut self) {
        let average_moisture = self.moisture.mean();
        let width = self.moisture.width();
        let height = self.moisture.height();

        for x in 0..width {
            for y in 0..height {
                if !self.moisture.interior(x, y, 2) {
                    continue;
                }
                if convolve_at(&self.moisture, x, y) > 0.75 * average_moisture {
                    let soil = convolve_at(&self.soil, x, y);
                    let water = convolve_at(&self.water, x, y);
                    let sediment = convolve_at(&self.sediment[self.current], x, y);
                    self.soil[(x, y)] = soil;
                    self.water[(x, y)] = water;
                    self.sediment[self.current][(x, y)] = sediment;
                }
            }
        }
    }

    /// Integrates the discretized pressure gradient into the outgoing
    /// fluxes, clamps them and zeroes flow that would drain a dry cell.
    fn update_flux(&mut self) {
        let dt = self.step_size;
        let gravity = self.config.gravity;
        let max_flux = self.config.max_flux;

        let Self {
            soil,
            water,
            flux_right,
            flux_top,
            ..
        } = self;
        let soil = &*soil;
        let water = &*water;
        let width = soil.width();

        let surface = |x: usize, y: usize| soil[(x, y)] + water[(x, y)];

        flux_right
            .as_mut_slice()
            .par_chunks_mut(width)
            .zip(flux_top.as_mut_slice().par_chunks_mut(width))
            .enumerate()
            .for_each(|(y, (right_row, top_row))| {
                for x in 0..width {
                    if soil.interior(x, y, 2) {
                        let accel = -gravity * (surface(x + 1, y) - surface(x, y));
                        let mut flux = (right_row[x] + accel * dt).clamp(-max_flux, max_flux);
                        if (flux > 0.0 && water[(x, y)] <= 0.0)
                            || (flux < 0.0 && water[(x + 1, y)] <= 0.0)
                        {
                            flux = 0.0;
                        }
                        right_row[x] = flux;

                        let accel = -gravity * (surface(x, y + 1) - surface(x, y));
                        let mut flux = (top_row[x] + accel * dt).clamp(-max_flux, max_flux);
                        if (flux > 0.0 && water[(x, y)] <= 0.0)
                            || (flux < 0.0 && water[(x, y + 1)] <= 0.0)
                        {
                            flux = 0.0;
                        }
                        top_row[x] = flux;
                    } else {
                        right_row[x] = 0.0;
                        top_row[x] = 0.0;
                    }
                }
            });
    }

    /// Derives per-cell velocity from the net horizontal/vertical flux
    /// differential. Incoming flow is read as the negated flux stored on
    /// the -x/-y neighbor.
    fn update_velocity(&mut self) {
        let Self {
            velocity,
            flux_right,
            flux_top,
            ..
        } = self;
        let flux_right = &*flux_right;
        let flux_top = &*flux_top;
        let width = velocity.width();

        velocity
            .as_mut_slice()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, v) in row.iter_mut().enumerate() {
                    if flux_right.interior(x, y, 2) {
                        let from_left = -flux_right[(x - 1, y)];
                        let from_bottom = -flux_top[(x, y - 1)];
                        *v = Vec2::new(
                            flux_right[(x, y)] - from_left,
                            flux_top[(x, y)] - from_bottom,
                        );
                    } else {
                        *v = Vec2::ZERO;
                    }
                }
            });
    }

    /// Applies the flux divergence and evaporation to the water columns
    /// and accumulates the moisture map.
    fn update_water(&mut self) {
        let dt = self.step_size;
        let evaporation = self.config.evaporation_per_second;
        let max_water_height = self.config.max_water_height;

        let Self {
            water,
            moisture,
            flux_right,
            flux_top,
            ..
        } = self;
        let flux_right = &*flux_right;
        let flux_top = &*flux_top;
        let width = water.width();

        water
            .as_mut_slice()
            .par_chunks_mut(width)
            .zip(moisture.as_mut_slice().par_chunks_mut(width))
            .enumerate()
            .for_each(|(y, (water_row, moisture_row))| {
                for x in 0..width {
                    if flux_right.interior(x, y, 2) {
                        let from_left = -flux_right[(x - 1, y)];
                        let from_bottom = -flux_top[(x, y - 1)];
                        let dh = -dt
                            * (flux_right[(x, y)]
                                + flux_top[(x, y)]
                                + from_left
                                + from_bottom);

                        let mut new_height = (water_row[x] + dh).max(0.0);
                        new_height = (new_height - evaporation * dt).max(0.0);
                        new_height = new_height.min(max_water_height);

                        water_row[x] = new_height;
                        moisture_row[x] += new_height;
                    } else {
                        water_row[x] = 0.0;
                    }
                }
            });
    }

    /// Moves soil between the terrain and the dissolved sediment according
    /// to the local carrying capacity, then swaps in the scratch soil
    /// buffer.
    fn update_erosion(&mut self) {
        let erosion_factor = self.config.erosion_factor;
        let deposition_factor = self.config.deposition_factor;
        let soil_capacity = self.config.soil_capacity;
        let current = self.current;

        let Self {
            soil,
            soil_scratch,
            sediment,
            velocity,
            total_erosion,
            total_deposition,
            ..
        } = self;
        let soil = &*soil;
        let velocity = &*velocity;
        let width = soil.width();
        let sediment_live = &mut sediment[current];

        soil_scratch
            .as_mut_slice()
            .par_chunks_mut(width)
            .zip(sediment_live.as_mut_slice().par_chunks_mut(width))
            .zip(total_erosion.as_mut_slice().par_chunks_mut(width))
            .zip(total_deposition.as_mut_slice().par_chunks_mut(width))
            .enumerate()
            .for_each(|(y, (((soil_row, sediment_row), erosion_row), deposition_row))| {
                for x in 0..width {
                    if !soil.interior(x, y, 2) {
                        soil_row[x] = soil[(x, y)];
                        continue;
                    }

                    let old_volume = sediment_row[x];
                    let slope = soil.gradient(x, y).length();
                    let capacity =
                        soil_capacity * (slope + CAPACITY_SLOPE_BIAS) * velocity[(x, y)].length();

                    // Asymmetric response: deposition acts faster than
                    // erosion.
                    let mut transfer = capacity - old_volume;
                    transfer *= if transfer > 0.0 {
                        erosion_factor
                    } else {
                        deposition_factor
                    };

                    let mut new_volume = old_volume + transfer;
                    if new_volume < 0.0 {
                        // Fold the overshoot back into the transfer so the
                        // dissolved volume never goes negative.
                        transfer -= new_volume;
                        new_volume = 0.0;
                    }

                    sediment_row[x] = new_volume;
                    soil_row[x] = soil[(x, y)] - transfer;
                    erosion_row[x] += transfer.max(0.0);
                    deposition_row[x] += (-transfer).max(0.0);
                }
            });

        std::mem::swap(&mut self.soil, &mut self.soil_scratch);
    }

    /// Semi-Lagrangian advection: samples the pre-advection sediment field
    /// at the backward-traced position, writing into the other buffer,
    /// then toggles the buffer index.
    fn advect_sediment(&mut self) {
        let dt = self.step_size;
        let current = self.current;

        let Self {
            sediment, velocity, ..
        } = self;
        let velocity = &*velocity;
        let width = velocity.width();

        let [buffer_a, buffer_b] = sediment;
        let (source, target) = if current == 0 {
            (&*buffer_a, buffer_b)
        } else {
            (&*buffer_b, buffer_a)
        };

        target
            .as_mut_slice()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, out) in row.iter_mut().enumerate() {
                    let v = velocity[(x, y)];
                    let backtrace = Vec2::new(x as f32 - v.x * dt, y as f32 - v.y * dt);
                    *out = if source.interior_pos(backtrace, 2.0) {
                        source.sample_bilinear(backtrace)
                    } else {
                        0.0
                    };
                }
            });

        self.current ^= 1;
    }

    /// Settles the remaining dissolved sediment into the soil and
    /// normalizes the accumulator maps by their observed maxima (floored
    /// at 1).
    fn finish(mut self) -> (Grid<f32>, ErosionMaps) {
        let current = self.current;
        for (soil, sediment) in self
            .soil
            .as_mut_slice()
            .iter_mut()
            .zip(self.sediment[current].as_slice())
        {
            *soil += sediment;
        }

        let max_erosion = self.total_erosion.max_value().max(1.0);
        let max_deposition = self.total_deposition.max_value().max(1.0);
        let max_moisture = self.moisture.max_value().max(1.0);

        for v in self.total_erosion.as_mut_slice() {
            *v /= max_erosion;
        }
        for v in self.total_deposition.as_mut_slice() {
            *v /= max_deposition;
        }
        for v in self.moisture.as_mut_slice() {
            *v /= max_moisture;
        }

        let mean_moisture = self.moisture.mean();

        (
            self.soil,
            ErosionMaps {
                moisture: self.moisture,
                erosion: self.total_erosion,
                deposition: self.total_deposition,
                mean_moisture,
            },
        )
    }
}
