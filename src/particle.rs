// Simple particle struct to keep track of individual position and velocity
// in CSS pixel coordinates

use vecmath::Vector2;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Particle {
    pub pos: Vector2<f64>,
    pub vel: Vector2<f64>,
}

impl Particle {
    pub fn new(pos_x: f64, pos_y: f64) -> Particle {
        Particle {
            pos: [pos_x, pos_y],
            vel: [0.0, 0.0],
        }
    }

    pub fn with_velocity(mut self, vel_x: f64, vel_y: f64) -> Particle {
        self.vel = [vel_x, vel_y];
        self
    }

    pub fn speed(&self) -> f64 {
        vecmath::vec2_len(self.vel)
    }

    // Rescales velocity onto the speed cap, direction preserved
    pub fn clamp_speed(&mut self, max_speed: f64) {
        let speed = self.speed();
        if speed > max_speed {
            self.vel = vecmath::vec2_scale(self.vel, max_speed / speed);
        }
    }

    pub fn wrap(&mut self, width: f64, height: f64) {
        self.pos[0] = wrap_coord(self.pos[0], width);
        self.pos[1] = wrap_coord(self.pos[1], height);
    }
}

/// Modular wrap of `value` into `[0, extent)`.
pub fn wrap_coord(value: f64, extent: f64) -> f64 {
    if !(extent > 0.0) || !value.is_finite() {
        return 0.0;
    }
    let wrapped = value.rem_euclid(extent);
    // rem_euclid rounds tiny negatives up to exactly `extent`
    if wrapped >= extent {
        0.0
    } else {
        wrapped
    }
}
