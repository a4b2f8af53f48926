//! Coherent noise mapped to flow directions.

use crate::error::{Error, Result};
use noise::{NoiseFn, OpenSimplex};
use rand::rngs::OsRng;
use rand::RngCore;
use std::f64::consts::TAU;

/// A seeded 3D simplex noise field over (x, y, time).
///
/// Screen coordinates are scaled down by `scale` before lookup so that
/// neighbouring pixels sample nearly the same value.
pub struct NoiseField {
    noise: OpenSimplex,
    seed: u32,
    scale: f64,
}

impl NoiseField {
    pub fn new(seed: u32, scale: f64) -> Self {
        NoiseField {
            noise: OpenSimplex::new(seed),
            seed,
            scale,
        }
    }

    /// Seeds the field from the platform entropy source (`crypto.getRandomValues`
    /// in the browser).
    pub fn from_entropy(scale: f64) -> Result<Self> {
        let mut bytes = [0u8; 4];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| Error::NoiseUnavailable(e.to_string()))?;
        Ok(NoiseField::new(u32::from_le_bytes(bytes), scale))
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Raw noise sample in [-1, 1].
    pub fn sample(&self, x: f64, y: f64, t: f64) -> f64 {
        self.noise
            .get([x * self.scale, y * self.scale, t])
            .max(-1.0)
            .min(1.0)
    }

    /// Flow direction in radians, within [-2π, 2π].
    pub fn angle(&self, x: f64, y: f64, t: f64) -> f64 {
        self.sample(x, y, t) * TAU
    }
}
