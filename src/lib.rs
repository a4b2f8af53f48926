//! Ambient flow field particle background for web pages.
//!
//! Particles drift along a simplex-noise flow field, are pushed away from the
//! pointer and leave fading trails on a full-viewport canvas behind the page.
//! The simulation ([`simulator`]), drawing ([`compositor`]) and lifecycle
//! ([`background`]) run without a browser; [`web`] binds them to the DOM.
//!
//! From JavaScript:
//!
//! ```js
//! import init, { start_with_config, stop } from "./pkg/flow_field_background.js";
//! await init();
//! start_with_config(JSON.stringify({ particleColor: "#f59e0b" }));
//! ```

mod utils;

pub mod background;
pub mod color;
pub mod compositor;
pub mod config;
pub mod error;
pub mod frame_loop;
pub mod noise_field;
pub mod particle;
pub mod simulator;
pub mod web;

pub use background::{Background, Mode};
pub use color::Color;
pub use compositor::{draw_frame, FrameStyle, Surface, Viewport};
pub use config::{DeviceProfile, SimulationConfig};
pub use error::{Error, Result};
pub use frame_loop::{FrameHandle, FrameLoop, FrameScheduler, ResizeDebouncer};
pub use noise_field::NoiseField;
pub use particle::Particle;
pub use simulator::{pointer_force, ParticleSimulator};
pub use web::{is_running, start, start_with_config, stop, CanvasSurface};
