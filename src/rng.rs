//! Seeded random distributions shared by the generation stages.

use glam::{Vec2, Vec3};
use rand::Rng;

/// Extension distributions over any [`Rng`].
///
/// Everything the tectonic and erosion stages draw beyond plain uniforms
/// lives here: bounded floats, a polar-method Gaussian and unit vectors.
pub trait RandExt: Rng {
    /// Uniform `f32` in `[min, max)`.
    fn next_float(&mut self, min: f32, max: f32) -> f32 {
        self.random::<f32>() * (max - min) + min
    }

    /// Gaussian sample via the Marsaglia polar method.
    ///
    /// Draws `u1, u2` uniformly from `[-1, 1)` until `q = u1² + u2²` lands
    /// strictly inside the unit disk, then transforms `u1`.
    fn next_normal(&mut self, mean: f32, deviation: f32) -> f32 {
        loop {
            let u1 = self.next_float(-1.0, 1.0);
            let u2 = self.next_float(-1.0, 1.0);
            let q = f64::from(u1 * u1 + u2 * u2);
            if q > 0.0 && q < 1.0 {
                let p = (-2.0 * q.ln() / q).sqrt();
                return mean + deviation * u1 * p as f32;
            }
        }
    }

    /// Gaussian sample clamped to `[min, max]`.
    fn next_normal_clamped(&mut self, mean: f32, deviation: f32, min: f32, max: f32) -> f32 {
        self.next_normal(mean, deviation).clamp(min, max)
    }

    /// Uniformly distributed unit vector in 2D (rejection sampled from the
    /// unit disk, then normalized).
    fn next_unit_vec2(&mut self) -> Vec2 {
        loop {
            let v = Vec2::new(self.next_float(-1.0, 1.0), self.next_float(-1.0, 1.0));
            let len_sq = v.length_squared();
            if len_sq > 0.0 && len_sq <= 1.0 {
                return v / len_sq.sqrt();
            }
        }
    }

    /// Uniformly distributed unit vector in 3D (rejection sampled from the
    /// unit ball, then normalized).
    fn next_unit_vec3(&mut self) -> Vec3 {
        loop {
            let v = Vec3::new(
                self.next_float(-1.0, 1.0),
                self.next_float(-1.0, 1.0),
                self.next_float(-1.0, 1.0),
            );
            let len_sq = v.length_squared();
            if len_sq > 0.0 && len_sq <= 1.0 {
                return v / len_sq.sqrt();
            }
        }
    }
}

impl<R: Rng + ?Sized> RandExt for R {}
