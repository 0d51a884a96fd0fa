//! Noise generation utilities for terrain generation.
//!
//! Provides deterministic fractal Perlin noise for heights and rock pockets.

use noise::{NoiseFn, Perlin};

/// Configuration for multi-octave noise generation.
#[derive(Debug, Clone)]
pub struct NoiseConfig {
    /// Number of octaves (layers of detail)
    pub octaves: u32,
    /// Frequency multiplier between octaves
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves (persistence)
    pub persistence: f64,
    /// Base frequency (scale)
    pub frequency: f64,
    /// Seed for deterministic generation
    pub seed: u32,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            frequency: 1.0,
            seed: 0,
        }
    }
}

impl NoiseConfig {
    /// Rolling hills for the surface height.
    pub fn surface(seed: u32) -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            frequency: 0.01,
            seed,
        }
    }

    /// Blobs of granite and gravel inside the stone layer.
    pub fn pockets(seed: u32) -> Self {
        Self {
            octaves: 2,
            lacunarity: 2.0,
            persistence: 0.5,
            frequency: 0.06,
            seed: seed.wrapping_add(1000),
        }
    }
}

/// Noise generator using Perlin noise.
pub struct NoiseGenerator {
    perlin: Perlin,
    config: NoiseConfig,
}

impl NoiseGenerator {
    pub fn new(config: NoiseConfig) -> Self {
        Self {
            perlin: Perlin::new(config.seed),
            config,
        }
    }

    /// Multi-octave 2D sample in `[-1.0, 1.0]`.
    pub fn sample_2d(&self, x: f64, z: f64) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.config.frequency;
        let mut max_value = 0.0;

        for _ in 0..self.config.octaves {
            value += self.perlin.get([x * frequency, z * frequency]) * amplitude;
            max_value += amplitude;

            amplitude *= self.config.persistence;
            frequency *= self.config.lacunarity;
        }

        (value / max_value).clamp(-1.0, 1.0)
    }

    /// Multi-octave 3D sample in `[-1.0, 1.0]`.
    pub fn sample_3d(&self, x: f64, y: f64, z: f64) -> f64 {
        let mut value = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = self.config.frequency;
        let mut max_value = 0.0;

        for _ in 0..self.config.octaves {
            value += self
                .perlin
                .get([x * frequency, y * frequency, z * frequency])
                * amplitude;
            max_value += amplitude;

            amplitude *= self.config.persistence;
            frequency *= self.config.lacunarity;
        }

        (value / max_value).clamp(-1.0, 1.0)
    }
}
