use crate::color::Color;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Tunables for the flow field background. Fixed once the background starts.
///
/// Hosts may override any subset of fields by passing camelCase JSON to
/// [`SimulationConfig::from_json`]; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationConfig {
    pub particle_count: usize,
    pub mobile_particle_count: usize,
    /// Disc radius in CSS pixels.
    pub particle_size: f64,
    pub mobile_particle_size: f64,
    pub particle_color: Color,
    pub particle_alpha: f64,
    /// Screen coordinates are multiplied by this before noise lookup.
    pub noise_scale: f64,
    pub noise_strength: f64,
    /// Noise time advanced per nominal frame.
    pub time_increment: f64,
    pub mouse_radius: f64,
    pub mouse_strength: f64,
    pub max_speed: f64,
    /// Opacity of the fade rectangle drawn over the previous frame.
    pub trail_fade: f64,
    pub fade_color: Color,
    /// Velocity multiplier applied after every step.
    pub damping: f64,
    pub nominal_frame_ms: f64,
    pub resize_debounce_ms: f64,
    /// Viewports narrower than this (CSS pixels) use the mobile preset.
    pub mobile_breakpoint: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            particle_count: 150,
            mobile_particle_count: 60,
            particle_size: 2.0,
            mobile_particle_size: 3.0,
            particle_color: Color::from_u32(0x6366f1ff),
            particle_alpha: 0.6,
            noise_scale: 0.003,
            noise_strength: 0.5,
            time_increment: 0.0003,
            mouse_radius: 120.0,
            mouse_strength: 3.0,
            max_speed: 1.5,
            trail_fade: 0.08,
            fade_color: Color::WHITE,
            damping: 0.99,
            nominal_frame_ms: 16.67,
            resize_debounce_ms: 100.0,
            mobile_breakpoint: 768.0,
        }
    }
}

/// Upper bound on either particle preset; the pool is allocated up front.
pub const MAX_PARTICLES: usize = 10_000;

impl SimulationConfig {
    /// Parse a (possibly partial) configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let counts = [
            ("particleCount", self.particle_count),
            ("mobileParticleCount", self.mobile_particle_count),
        ];
        for (name, count) in counts.iter() {
            if *count > MAX_PARTICLES {
                return Err(Error::Config(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_PARTICLES, count
                )));
            }
        }
        let positive = [
            ("nominalFrameMs", self.nominal_frame_ms),
            ("maxSpeed", self.max_speed),
        ];
        for (name, value) in positive.iter() {
            if !(value.is_finite() && *value > 0.0) {
                return Err(Error::Config(format!("{} must be positive, got {}", name, value)));
            }
        }
        let non_negative = [
            ("particleSize", self.particle_size),
            ("mobileParticleSize", self.mobile_particle_size),
            ("noiseScale", self.noise_scale),
            ("noiseStrength", self.noise_strength),
            ("timeIncrement", self.time_increment),
            ("mouseRadius", self.mouse_radius),
            ("mouseStrength", self.mouse_strength),
            ("resizeDebounceMs", self.resize_debounce_ms),
            ("mobileBreakpoint", self.mobile_breakpoint),
        ];
        for (name, value) in non_negative.iter() {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(Error::Config(format!("{} must be non-negative, got {}", name, value)));
            }
        }
        let unit = [
            ("particleAlpha", self.particle_alpha),
            ("trailFade", self.trail_fade),
            ("damping", self.damping),
        ];
        for (name, value) in unit.iter() {
            if !(0.0..=1.0).contains(value) {
                return Err(Error::Config(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }
        Ok(())
    }

    pub fn particle_count(&self, profile: DeviceProfile) -> usize {
        match profile {
            DeviceProfile::Desktop => self.particle_count,
            DeviceProfile::Mobile => self.mobile_particle_count,
        }
    }

    pub fn particle_radius(&self, profile: DeviceProfile) -> f64 {
        match profile {
            DeviceProfile::Desktop => self.particle_size,
            DeviceProfile::Mobile => self.mobile_particle_size,
        }
    }
}

/// Which preset of particle count and size applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceProfile {
    Desktop,
    Mobile,
}

impl DeviceProfile {
    /// A coarse primary pointer (touch) or a narrow viewport selects the mobile preset.
    pub fn detect(coarse_pointer: bool, viewport_width: f64, config: &SimulationConfig) -> Self {
        if coarse_pointer || viewport_width < config.mobile_breakpoint {
            DeviceProfile::Mobile
        } else {
            DeviceProfile::Desktop
        }
    }
}
