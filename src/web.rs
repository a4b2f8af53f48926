// Browser side of the background: canvas creation and drawing, the
// requestAnimationFrame scheduler, DOM event wiring and the exported
// start/stop entry points.

use crate::background::{Background, Mode};
use crate::color::Color;
use crate::compositor::{Surface, Viewport};
use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use crate::frame_loop::{FrameHandle, FrameScheduler};
use crate::noise_field::NoiseField;
use crate::utils::{self, Timer};
use rand::rngs::{OsRng, StdRng};
use rand::SeedableRng;
use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::{Rc, Weak};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    CanvasRenderingContext2d, Document, Event, EventTarget, HtmlCanvasElement, HtmlElement,
    MediaQueryList, MouseEvent, Window,
};

const CANVAS_ID: &str = "flow-field-canvas";
const STATIC_CLASS: &str = "static-background";
const REDUCED_MOTION_QUERY: &str = "(prefers-reduced-motion: reduce)";
const COARSE_POINTER_QUERY: &str = "(pointer: coarse)";

thread_local! {
    static ACTIVE: RefCell<Option<Rc<RefCell<Host>>>> = RefCell::new(None);
}

/// Starts the background with the default configuration.
#[wasm_bindgen]
pub fn start() -> bool {
    start_with_config("{}")
}

/// Starts the background with JSON overrides of the default configuration.
///
/// Returns `false` if the background could not be set up; the failure is
/// logged and the page is left untouched. Calling this while a background
/// is already active does nothing.
#[wasm_bindgen]
pub fn start_with_config(config_json: &str) -> bool {
    utils::set_panic_hook();
    let _ = console_log::init_with_level(log::Level::Info);

    if ACTIVE.with(|active| active.borrow().is_some()) {
        log::debug!("flow field background already active");
        return true;
    }

    match SimulationConfig::from_json(config_json).and_then(launch) {
        Ok(host) => {
            ACTIVE.with(|active| *active.borrow_mut() = Some(host));
            true
        }
        Err(e) => {
            log::error!("flow field background not started: {}", e);
            false
        }
    }
}

/// Halts the animation, removes the canvas, the static fallback class and
/// all listeners.
#[wasm_bindgen]
pub fn stop() {
    if let Some(host) = ACTIVE.with(|active| active.borrow_mut().take()) {
        match host.try_borrow_mut() {
            Ok(mut host) => host.shutdown(),
            Err(_) => log::warn!("flow field background busy, teardown deferred to drop"),
        }
    }
}

#[wasm_bindgen]
pub fn is_running() -> bool {
    ACTIVE.with(|active| {
        active
            .borrow()
            .as_ref()
            .and_then(|host| host.try_borrow().ok().map(|h| h.background.is_running()))
            .unwrap_or(false)
    })
}

fn launch(config: SimulationConfig) -> Result<Rc<RefCell<Host>>> {
    let noise = NoiseField::from_entropy(config.noise_scale)?;
    let rng = StdRng::from_rng(OsRng).map_err(|e| Error::Host(format!("entropy source unavailable: {}", e)))?;

    let page = Page::new()?;
    let reduced_motion = page.media_query(REDUCED_MOTION_QUERY)?;
    let reduce = reduced_motion.as_ref().map_or(false, |query| query.matches());
    let coarse_pointer = page
        .media_query(COARSE_POINTER_QUERY)?
        .map_or(false, |query| query.matches());
    let viewport = page.viewport()?;

    let surface = CanvasSurface::create(&page.document)?;
    let seed = noise.seed();
    let background = Background::new(config, noise, rng, viewport, coarse_pointer, reduce);
    let particle_count = background.simulator().len();
    let profile = background.profile();

    let callback = Rc::new(RefCell::new(None));
    let frames = AnimationFrames {
        window: page.window.clone(),
        callback: callback.clone(),
    };
    let window = page.window.clone();
    let document = page.document.clone();
    let host = Rc::new(RefCell::new(Host {
        background,
        surface,
        frames,
        page,
        listeners: Vec::new(),
    }));

    let weak = Rc::downgrade(&host);
    *callback.borrow_mut() = Some(Closure::<dyn FnMut(f64)>::new(move |now: f64| {
        with_host(&weak, |host| host.frame(now));
    }));

    // From here on the page is modified; any error drops `host`, whose
    // shutdown undoes it.
    let listeners = attach_listeners(&host, &window, &document, reduced_motion.as_ref())?;
    {
        let mut guard = host.borrow_mut();
        let host = &mut *guard;
        host.listeners = listeners;
        host.mount(reduce, &viewport)?;
        let now = host.page.now();
        host.background.start(now, &mut host.frames)?;
    }

    if reduce {
        log::info!("reduced motion preferred, showing static background");
    } else {
        log::info!(
            "flow field background started: {} particles ({:?}), noise seed {}",
            particle_count,
            profile,
            seed
        );
    }
    Ok(host)
}

fn attach_listeners(
    host: &Rc<RefCell<Host>>,
    window: &Window,
    document: &Document,
    reduced_motion: Option<&MediaQueryList>,
) -> Result<Vec<Listener>> {
    let mut listeners = Vec::new();

    let weak = Rc::downgrade(host);
    listeners.push(Listener::attach(document, "mousemove", move |event: Event| {
        if let Some(mouse) = event.dyn_ref::<MouseEvent>() {
            let (x, y) = (mouse.client_x() as f64, mouse.client_y() as f64);
            with_host(&weak, |host| {
                host.background.pointer_moved(x, y);
                Ok(())
            });
        }
    })?);

    let weak = Rc::downgrade(host);
    listeners.push(Listener::attach(document, "mouseleave", move |_: Event| {
        with_host(&weak, |host| {
            host.background.pointer_left();
            Ok(())
        });
    })?);

    let weak = Rc::downgrade(host);
    listeners.push(Listener::attach(window, "resize", move |_: Event| {
        with_host(&weak, |host| {
            let viewport = host.page.viewport()?;
            let now = host.page.now();
            host.background.resize_requested(viewport, now);
            Ok(())
        });
    })?);

    let weak = Rc::downgrade(host);
    listeners.push(Listener::attach(document, "visibilitychange", move |_: Event| {
        with_host(&weak, |host| host.visibility_changed());
    })?);

    if let Some(query) = reduced_motion {
        let weak = Rc::downgrade(host);
        let watched = query.clone();
        listeners.push(Listener::attach(query, "change", move |_: Event| {
            let reduce = watched.matches();
            with_host(&weak, |host| host.reduced_motion_changed(reduce));
        })?);
    }

    Ok(listeners)
}

// Runs `f` against the host if it is still alive and not already borrowed.
fn with_host<F>(host: &Weak<RefCell<Host>>, f: F)
where
    F: FnOnce(&mut Host) -> Result<()>,
{
    let host = match host.upgrade() {
        Some(host) => host,
        None => return,
    };
    let mut guard = match host.try_borrow_mut() {
        Ok(guard) => guard,
        Err(_) => {
            log::warn!("flow field background re-entered, event dropped");
            return;
        }
    };
    if let Err(e) = f(&mut guard) {
        log::error!("flow field background: {}", e);
    }
}

struct Host {
    background: Background,
    surface: CanvasSurface,
    frames: AnimationFrames,
    page: Page,
    listeners: Vec<Listener>,
}

impl Host {
    fn frame(&mut self, now: f64) -> Result<()> {
        let _timer = if log::log_enabled!(log::Level::Trace) {
            Some(Timer::new("flow field frame"))
        } else {
            None
        };
        self.background.frame(now, &mut self.frames, &mut self.surface)?;
        Ok(())
    }

    fn mount(&mut self, reduce: bool, viewport: &Viewport) -> Result<()> {
        if reduce {
            self.page.set_static_fallback(true)
        } else {
            self.surface.attach(&self.page.body)?;
            self.surface.resize(viewport)
        }
    }

    fn visibility_changed(&mut self) -> Result<()> {
        let hidden = self.page.document.hidden();
        let now = self.page.now();
        self.background.visibility_changed(hidden, now, &mut self.frames)
    }

    fn reduced_motion_changed(&mut self, reduce: bool) -> Result<()> {
        let before = self.background.mode();
        let now = self.page.now();
        let mode = self.background.reduced_motion_changed(reduce, now, &mut self.frames)?;
        if mode == before {
            return Ok(());
        }
        match mode {
            Mode::Static => {
                self.surface.detach();
                self.page.set_static_fallback(true)?;
            }
            Mode::Animated => {
                self.page.set_static_fallback(false)?;
                self.surface.attach(&self.page.body)?;
                let viewport = self.page.viewport()?;
                self.background.apply_viewport(viewport, &mut self.surface)?;
            }
        }
        Ok(())
    }

    // Safe to call more than once.
    fn shutdown(&mut self) {
        self.background.stop(&mut self.frames);
        self.listeners.clear();
        self.surface.detach();
        if let Err(e) = self.page.set_static_fallback(false) {
            log::warn!("could not clear static background class: {}", e);
        }
        self.frames.callback.borrow_mut().take();
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Page {
    window: Window,
    document: Document,
    body: HtmlElement,
}

impl Page {
    fn new() -> Result<Page> {
        let window = web_sys::window().ok_or_else(|| Error::Host("no global window".into()))?;
        let document = window
            .document()
            .ok_or_else(|| Error::Host("window has no document".into()))?;
        let body = document
            .body()
            .ok_or_else(|| Error::Host("document has no body".into()))?;
        Ok(Page {
            window,
            document,
            body,
        })
    }

    fn now(&self) -> f64 {
        self.window
            .performance()
            .map(|performance| performance.now())
            .unwrap_or_else(js_sys::Date::now)
    }

    fn viewport(&self) -> Result<Viewport> {
        let width = self
            .window
            .inner_width()?
            .as_f64()
            .ok_or_else(|| Error::Host("innerWidth is not a number".into()))?;
        let height = self
            .window
            .inner_height()?
            .as_f64()
            .ok_or_else(|| Error::Host("innerHeight is not a number".into()))?;
        Ok(Viewport::new(width, height, self.window.device_pixel_ratio()))
    }

    fn media_query(&self, query: &str) -> Result<Option<MediaQueryList>> {
        Ok(self.window.match_media(query)?)
    }

    fn set_static_fallback(&self, enabled: bool) -> Result<()> {
        let classes = self.body.class_list();
        if enabled {
            classes.add_1(STATIC_CLASS)?;
        } else {
            classes.remove_1(STATIC_CLASS)?;
        }
        Ok(())
    }
}

/// Full-viewport canvas behind the page content.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl CanvasSurface {
    pub fn create(document: &Document) -> Result<CanvasSurface> {
        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| Error::Host("created element is not a canvas".into()))?;
        canvas.set_id(CANVAS_ID);
        let style = canvas.style();
        style.set_property("position", "fixed")?;
        style.set_property("inset", "0")?;
        style.set_property("z-index", "-1")?;
        style.set_property("pointer-events", "none")?;

        let context = canvas
            .get_context("2d")?
            .ok_or_else(|| Error::Host("2d canvas context unavailable".into()))?
            .dyn_into::<CanvasRenderingContext2d>()
            .map_err(|_| Error::Host("context is not a CanvasRenderingContext2d".into()))?;
        Ok(CanvasSurface { canvas, context })
    }

    /// Inserts the canvas as the first child of `body`.
    pub fn attach(&self, body: &HtmlElement) -> Result<()> {
        body.insert_before(&self.canvas, body.first_child().as_ref())?;
        Ok(())
    }

    pub fn detach(&self) {
        self.canvas.remove();
    }
}

impl Surface for CanvasSurface {
    fn set_fill_color(&mut self, color: Color) {
        self.context.set_fill_style_str(&color.to_css());
    }

    fn set_global_alpha(&mut self, alpha: f64) {
        self.context.set_global_alpha(alpha);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.context.fill_rect(x, y, width, height);
    }

    fn fill_circle(&mut self, x: f64, y: f64, radius: f64) -> Result<()> {
        self.context.begin_path();
        self.context.arc(x, y, radius, 0.0, TAU)?;
        self.context.fill();
        Ok(())
    }

    fn pixel_size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, viewport: &Viewport) -> Result<()> {
        let (width, height) = viewport.pixel_size();
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        let style = self.canvas.style();
        style.set_property("width", &format!("{}px", viewport.width))?;
        style.set_property("height", &format!("{}px", viewport.height))?;
        // Resizing resets the transform, so this never compounds.
        let dpr = viewport.device_pixel_ratio;
        self.context.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
        Ok(())
    }
}

struct AnimationFrames {
    window: Window,
    callback: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
}

impl FrameScheduler for AnimationFrames {
    fn request_frame(&mut self) -> Result<FrameHandle> {
        let callback = self.callback.borrow();
        let callback = callback
            .as_ref()
            .ok_or_else(|| Error::Host("frame callback not installed".into()))?;
        let id = self
            .window
            .request_animation_frame(callback.as_ref().unchecked_ref())?;
        Ok(FrameHandle(id))
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Err(e) = self.window.cancel_animation_frame(handle.0) {
            log::warn!("cancelAnimationFrame failed: {:?}", e);
        }
    }
}

// Event listener that unregisters itself when dropped.
struct Listener {
    target: EventTarget,
    kind: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    fn attach<F>(target: &EventTarget, kind: &'static str, handler: F) -> Result<Listener>
    where
        F: FnMut(Event) + 'static,
    {
        let callback = Closure::<dyn FnMut(Event)>::new(handler);
        target.add_event_listener_with_callback(kind, callback.as_ref().unchecked_ref())?;
        Ok(Listener {
            target: target.clone(),
            kind,
            callback,
        })
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.kind, self.callback.as_ref().unchecked_ref());
    }
}
