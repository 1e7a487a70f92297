/// Stellar Web - canvas renderer with an HTML overlay button
///
/// The page supplies a `<canvas>` and an empty element for the button. Each
/// animation frame the scene is advanced, painted, and the button's
/// `left`/`top` style is moved to the star's projected position.
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Once;

use stellar_core::{assets, AppContext, AssetLoader, ModelSlot, SceneConfig, Viewport};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement};

pub mod canvas;

/// Panic messages and `tracing` events go to the browser console.
fn init_logging_once() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        console_error_panic_hook::set_once();
        #[cfg(target_arch = "wasm32")]
        wasm_logger::init(wasm_logger::Config::new(log::Level::Info));
    });
}

/// Tracks which animation loop, if any, may keep running.
///
/// Every `start` opens a new generation and every `stop` closes it, so a
/// callback scheduled by an older loop sees it is stale and ends.
#[derive(Debug, Default)]
struct AnimationGuard {
    generation: Cell<u64>,
    running: Cell<bool>,
}

impl AnimationGuard {
    /// Generation for a new loop, or `None` if one is already running.
    fn start(&self) -> Option<u64> {
        if self.running.replace(true) {
            return None;
        }
        let generation = self.generation.get() + 1;
        self.generation.set(generation);
        Some(generation)
    }

    fn stop(&self) {
        if self.running.replace(false) {
            self.generation.set(self.generation.get() + 1);
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.running.get() && self.generation.get() == generation
    }
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

fn parse_slot(slot: &str) -> Result<ModelSlot, JsValue> {
    match slot {
        "star" => Ok(ModelSlot::Star),
        "flowers" | "flower" => Ok(ModelSlot::Flowers),
        other => Err(js_error(format!("unknown model slot: {other}"))),
    }
}

struct WebState {
    app: AppContext,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    overlay: HtmlElement,
    overlay_ready: bool,
    background_url: Option<String>,
}

impl WebState {
    /// Match the canvas to the window size, like a resize handler would.
    fn sync_size(&mut self) -> Result<Viewport, JsValue> {
        let window = web_sys::window().ok_or_else(|| js_error("no window"))?;
        let width = window.inner_width()?.as_f64().unwrap_or(800.0) as u32;
        let height = window.inner_height()?.as_f64().unwrap_or(600.0) as u32;
        if self.canvas.width() != width || self.canvas.height() != height {
            self.canvas.set_width(width);
            self.canvas.set_height(height);
            tracing::debug!("canvas resized to {width}x{height}");
        }
        Ok(Viewport::new(width, height))
    }

    fn frame(&mut self) -> Result<(), JsValue> {
        let viewport = self.sync_size()?;
        let output = self.app.tick(&viewport).map_err(js_error)?;

        let primitives = canvas::display_list(self.app.scene(), self.app.camera(), &viewport);
        canvas::paint(&self.ctx, &viewport, &primitives, self.background_url.is_some())?;

        let Some(anchor) = output.overlay else {
            return Ok(());
        };
        if !self.overlay_ready {
            if let Some(button) = self.app.overlay_button() {
                self.overlay.set_inner_html(&button.html());
                self.overlay.set_class_name("sprite");
                self.overlay.style().set_property("position", "absolute")?;
                self.overlay_ready = true;
            }
        }
        let style = self.overlay.style();
        if anchor.visible {
            style.set_property("display", "block")?;
            style.set_property("left", &anchor.css_left())?;
            style.set_property("top", &anchor.css_top())?;
        } else {
            style.set_property("display", "none")?;
        }
        Ok(())
    }
}

/// Browser entry point
#[wasm_bindgen]
pub struct WebApp {
    state: Rc<RefCell<WebState>>,
    animation: Rc<AnimationGuard>,
}

#[wasm_bindgen]
impl WebApp {
    /// Bind to the canvas and overlay elements. `config_toml` overrides the
    /// default scene.
    #[wasm_bindgen(constructor)]
    pub fn new(canvas_id: &str, overlay_id: &str, config_toml: Option<String>) -> Result<WebApp, JsValue> {
        init_logging_once();

        let config = match config_toml {
            Some(text) => SceneConfig::from_toml_str(&text).map_err(js_error)?,
            None => SceneConfig::default(),
        };

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| js_error("no document"))?;
        let canvas: HtmlCanvasElement = document
            .get_element_by_id(canvas_id)
            .ok_or_else(|| js_error(format!("no element #{canvas_id}")))?
            .dyn_into()?;
        let overlay: HtmlElement = document
            .get_element_by_id(overlay_id)
            .ok_or_else(|| js_error(format!("no element #{overlay_id}")))?
            .dyn_into()?;
        let ctx: CanvasRenderingContext2d = canvas
            .get_context("2d")?
            .ok_or_else(|| js_error("2d canvas context unavailable"))?
            .dyn_into()?;

        let viewport = Viewport::new(canvas.width(), canvas.height());
        let app = AppContext::init(config, &AssetLoader::inline(), viewport).map_err(js_error)?;

        Ok(WebApp {
            state: Rc::new(RefCell::new(WebState {
                app,
                canvas,
                ctx,
                overlay,
                overlay_ready: false,
                background_url: None,
            })),
            animation: Rc::new(AnimationGuard::default()),
        })
    }

    /// Replace a model with STL bytes fetched by the page. `slot` is
    /// `"star"` or `"flowers"`.
    pub fn load_model_bytes(&self, slot: &str, name: &str, bytes: &[u8]) -> Result<(), JsValue> {
        let slot = parse_slot(slot)?;
        let mesh = assets::load_model_bytes(name, bytes).map_err(js_error)?;
        self.state.borrow_mut().app.provide_model(slot, mesh);
        Ok(())
    }

    /// Replace a model with a built-in one (`"star"` or `"flower"`).
    pub fn load_builtin(&self, slot: &str, model: &str) -> Result<(), JsValue> {
        let slot = parse_slot(slot)?;
        let mesh = assets::builtin_by_name(model).map_err(js_error)?;
        self.state.borrow_mut().app.provide_model(slot, mesh);
        Ok(())
    }

    /// Show an image behind the scene via the canvas' CSS background.
    pub fn set_background_url(&self, url: &str) -> Result<(), JsValue> {
        let mut state = self.state.borrow_mut();
        let style = state.canvas.style();
        style.set_property("background-image", &format!("url(\"{url}\")"))?;
        style.set_property("background-size", "cover")?;
        state.background_url = Some(url.to_string());
        Ok(())
    }

    pub fn orbit(&self, d_azimuth: f32, d_polar: f32) {
        self.state.borrow_mut().app.orbit(d_azimuth, d_polar);
    }

    pub fn zoom(&self, factor: f32) {
        self.state.borrow_mut().app.zoom(factor);
    }

    pub fn pan(&self, dx: f32, dy: f32) {
        self.state.borrow_mut().app.pan(dx, dy);
    }

    pub fn reset_view(&self) {
        self.state.borrow_mut().app.reset_view();
    }

    /// Run a single frame, for pages that drive their own loop.
    pub fn frame(&self) -> Result<(), JsValue> {
        self.state.borrow_mut().frame()
    }

    /// Start a `requestAnimationFrame` loop. Calling it twice is a no-op.
    pub fn start(&self) -> Result<(), JsValue> {
        let Some(generation) = self.animation.start() else {
            return Ok(());
        };

        let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
        let handle = callback.clone();
        let state = self.state.clone();
        let animation = self.animation.clone();

        *handle.borrow_mut() = Some(Closure::new(move || {
            if !animation.is_current(generation) {
                // Break the Rc cycle so the closure is freed
                callback.borrow_mut().take();
                return;
            }
            if let Err(e) = state.borrow_mut().frame() {
                web_sys::console::error_1(&e);
                animation.stop();
                callback.borrow_mut().take();
                return;
            }
            if let Some(cb) = callback.borrow().as_ref() {
                if let Err(e) = request_animation_frame(cb) {
                    web_sys::console::error_1(&e);
                }
            }
        }));

        let result = match handle.borrow().as_ref() {
            Some(cb) => request_animation_frame(cb).map(|_| ()),
            None => Ok(()),
        };
        result
    }

    /// Cancel the animation loop. A frame already scheduled does nothing.
    pub fn stop(&self) {
        self.animation.stop();
    }

    /// Stop the loop and release the scene.
    pub fn shutdown(&self) {
        self.stop();
        let mut state = self.state.borrow_mut();
        state.app.shutdown();
        let _ = state.overlay.style().set_property("display", "none");
    }

    pub fn overlay_left(&self) -> Option<f32> {
        let state = self.state.borrow();
        let viewport = Viewport::new(state.canvas.width(), state.canvas.height());
        state.app.overlay_anchor(&viewport).map(|a| a.x)
    }

    pub fn overlay_top(&self) -> Option<f32> {
        let state = self.state.borrow();
        let viewport = Viewport::new(state.canvas.width(), state.canvas.height());
        state.app.overlay_anchor(&viewport).map(|a| a.y)
    }

    pub fn frame_count(&self) -> u64 {
        self.state.borrow().app.frame()
    }
}

#[wasm_bindgen(start)]
pub fn main() -> Result<(), JsValue> {
    init_logging_once();
    Ok(())
}

fn request_animation_frame(callback: &Closure<dyn FnMut()>) -> Result<i32, JsValue> {
    web_sys::window()
        .ok_or_else(|| js_error("no window"))?
        .request_animation_frame(callback.as_ref().unchecked_ref())
}
