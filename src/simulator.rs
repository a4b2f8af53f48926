//! Per-frame particle update: flow field force, pointer repulsion, speed cap,
//! integration, wraparound and damping.

use crate::config::SimulationConfig;
use crate::noise_field::NoiseField;
use crate::particle::Particle;
use rand::rngs::StdRng;
use rand::Rng;
use vecmath::Vector2;

pub struct ParticleSimulator {
    config: SimulationConfig,
    noise: NoiseField,
    rng: StdRng,
    particles: Vec<Particle>,
    width: f64,
    height: f64,
    /// Noise time, advanced by `time_increment` per nominal frame.
    time: f64,
    /// `None` while the pointer is outside the page.
    pointer: Option<Vector2<f64>>,
}

impl ParticleSimulator {
    pub fn new(config: SimulationConfig, noise: NoiseField, rng: StdRng) -> Self {
        ParticleSimulator {
            config,
            noise,
            rng,
            particles: Vec::new(),
            width: 0.0,
            height: 0.0,
            time: 0.0,
            pointer: None,
        }
    }

    /// Replaces every particle with `count` fresh ones at rest, spread
    /// uniformly over `[0, width) x [0, height)`.
    pub fn reset(&mut self, count: usize, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
        self.particles.clear();
        self.particles.reserve(count);
        for _ in 0..count {
            let pos_x = self.rng.gen::<f64>() * self.width;
            let pos_y = self.rng.gen::<f64>() * self.height;
            self.particles.push(Particle::new(pos_x, pos_y));
        }
    }

    /// Advances noise time by `delta_units` nominal frames and moves every
    /// particle one step.
    ///
    /// Only the noise time is scaled by `delta_units`; positions advance by
    /// one velocity per step regardless of frame rate.
    pub fn step(&mut self, delta_units: f64) {
        self.time += self.config.time_increment * delta_units;

        let config = &self.config;
        let noise = &self.noise;
        let pointer = self.pointer;
        let time = self.time;
        for particle in &mut self.particles {
            let angle = noise.angle(particle.pos[0], particle.pos[1], time);
            let flow = vecmath::vec2_scale([angle.cos(), angle.sin()], config.noise_strength);
            particle.vel = vecmath::vec2_add(particle.vel, flow);

            if let Some(pointer) = pointer {
                let offset = vecmath::vec2_sub(particle.pos, pointer);
                let push = pointer_force(offset, config.mouse_radius, config.mouse_strength);
                particle.vel = vecmath::vec2_add(particle.vel, push);
            }

            particle.clamp_speed(config.max_speed);
            particle.pos = vecmath::vec2_add(particle.pos, particle.vel);
            particle.wrap(self.width, self.height);
            particle.vel = vecmath::vec2_scale(particle.vel, config.damping);
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = Vector2<f64>> + '_ {
        self.particles.iter().map(|p| p.pos)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Last write wins; read at the start of the next step.
    pub fn set_pointer(&mut self, x: f64, y: f64) {
        self.pointer = Some([x, y]);
    }

    pub fn clear_pointer(&mut self) {
        self.pointer = None;
    }

    pub fn pointer(&self) -> Option<Vector2<f64>> {
        self.pointer
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

/// Repulsion applied to a particle at `offset` from the pointer.
///
/// Falls off linearly from `strength` at the pointer to zero at `radius`.
/// A particle sitting exactly on the pointer has no direction to be pushed
/// in and receives nothing.
pub fn pointer_force(offset: Vector2<f64>, radius: f64, strength: f64) -> Vector2<f64> {
    let dist_sq = vecmath::vec2_square_len(offset);
    if !(dist_sq > 0.0) || dist_sq >= radius * radius {
        return [0.0, 0.0];
    }
    let dist = dist_sq.sqrt();
    let force = (1.0 - dist / radius) * strength;
    vecmath::vec2_scale(offset, force / dist)
}
