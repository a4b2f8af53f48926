// Draws one frame of the background onto any 2D surface: a translucent fade
// over the previous frame followed by one disc per particle.

use crate::color::Color;
use crate::config::SimulationConfig;
use crate::error::Result;
use vecmath::Vector2;

/// Visible area in CSS pixels plus the device pixel ratio used for the
/// backing store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub device_pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, device_pixel_ratio: f64) -> Self {
        Viewport {
            width,
            height,
            device_pixel_ratio: if device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        }
    }

    /// Backing store size in device pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width * self.device_pixel_ratio).round().max(0.0) as u32,
            (self.height * self.device_pixel_ratio).round().max(0.0) as u32,
        )
    }
}

/// The drawing operations the background needs from its host.
pub trait Surface {
    fn set_fill_color(&mut self, color: Color);
    fn set_global_alpha(&mut self, alpha: f64);
    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64);
    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<()>;
    /// Backing store size in device pixels.
    fn pixel_size(&self) -> (u32, u32);
    /// Resizes the backing store and scales drawing so callers keep using
    /// CSS pixel coordinates.
    fn resize(&mut self, viewport: &Viewport) -> Result<()>;
}

pub struct FrameStyle {
    pub fade_color: Color,
    pub fade_alpha: f64,
    pub particle_color: Color,
    pub particle_alpha: f64,
    pub particle_radius: f64,
}

impl FrameStyle {
    pub fn new(config: &SimulationConfig, particle_radius: f64) -> Self {
        FrameStyle {
            fade_color: config.fade_color,
            fade_alpha: config.trail_fade,
            particle_color: config.particle_color,
            particle_alpha: config.particle_alpha,
            particle_radius,
        }
    }
}

/// The fade always goes down before any particle of the same frame.
pub fn draw_frame<S, I>(surface: &mut S, viewport: &Viewport, style: &FrameStyle, positions: I) -> Result<()>
where
    S: Surface + ?Sized,
    I: IntoIterator<Item = Vector2<f64>>,
{
    surface.set_global_alpha(style.fade_alpha);
    surface.set_fill_color(style.fade_color);
    surface.fill_rect(0.0, 0.0, viewport.width, viewport.height);

    surface.set_global_alpha(style.particle_alpha);
    surface.set_fill_color(style.particle_color);
    for [x, y] in positions {
        surface.fill_circle(x, y, style.particle_radius)?;
    }
    Ok(())
}
