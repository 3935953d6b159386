// Re-export all public modules so they can be used from main.rs
pub mod assets;
pub mod audio;
pub mod config;
pub mod error;
pub mod logging;
pub mod ui;
pub mod utils;

// MVC Architecture
pub mod model;
pub mod view;
pub mod controller;

#[cfg(target_arch = "wasm32")]
pub use web::start;

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::closure::Closure;
    use wasm_bindgen::{prelude::wasm_bindgen, JsCast, JsValue};
    use web_sys::{Document, Event, HtmlCanvasElement, KeyboardEvent, MouseEvent, WheelEvent, Window};

    use crate::assets::{AssetInbox, AsyncLoader};
    use crate::config::SceneConfig;
    use crate::controller::frame_loop::viewport_size;
    use crate::controller::input::{wasm as web_input, InputEvent};
    use crate::controller::{FpsCounter, FrameClock, FrameLoopContext, InputState, Simulation};
    use crate::logging;
    use crate::view::{GpuContext, RenderState};

    #[wasm_bindgen(start)]
    pub async fn start() -> Result<(), JsValue> {
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        logging::init();
        let config = SceneConfig::default();
        let (window, document, canvas) = init_canvas()?;
        setup_app(config, &window, &document, &canvas).await
    }

    /// Main application setup for WASM
    async fn setup_app(
        config: SceneConfig,
        window: &Window,
        document: &Document,
        canvas: &HtmlCanvasElement,
    ) -> Result<(), JsValue> {
        let (fallback_w, fallback_h) = config.canvas_size;
        let css_w = window.inner_width()?.as_f64().unwrap_or(fallback_w as f64);
        let css_h = window.inner_height()?.as_f64().unwrap_or(fallback_h as f64);
        let (width, height, ratio) =
            viewport_size(css_w, css_h, window.device_pixel_ratio(), config.max_pixel_ratio);
        canvas.set_width(width);
        canvas.set_height(height);
        canvas.set_attribute("style", &format!("width: {css_w}px; height: {css_h}px; display: block"))?;

        // Initialize GPU
        let gpu = GpuContext::new(canvas, width, height)
            .await
            .map_err(|e| js_error(format!("GPU init failed: {e}")))?;

        let inbox = AssetInbox::new();
        let loader = AsyncLoader::new(inbox.clone());
        let mut render_state =
            RenderState::new(&gpu.device, &gpu.queue, &gpu.config, config.clear_color, &config.shadows);
        render_state.pixel_ratio = ratio;
        let max_pixel_ratio = config.max_pixel_ratio;
        let sim = Rc::new(RefCell::new(Simulation::new(config, width, height, Box::new(loader), inbox)));

        let input_state = Rc::new(RefCell::new(InputState::new()));
        let egui_events: Rc<RefCell<Vec<egui::Event>>> = Rc::new(RefCell::new(Vec::new()));
        let egui_ctx = egui::Context::default();

        setup_input_listeners(
            document,
            window,
            canvas,
            sim.clone(),
            input_state.clone(),
            egui_ctx.clone(),
            egui_events.clone(),
        )?;

        let now = window.performance().map(|p| p.now()).unwrap_or(0.0);
        let mut frame_ctx = FrameLoopContext {
            sim: sim.clone(),
            canvas: canvas.clone(),
            input_state,
            egui_ctx,
            egui_events,
            clock: FrameClock::new(now),
            fps: FpsCounter::default(),
            max_pixel_ratio,
        };

        tracing::info!(width, height, ratio, "scene ready");

        // Continuous redraw using requestAnimationFrame
        let f = RcCellCallback::new(window.clone(), {
            let window_for_loop = window.clone();
            move || {
                frame_ctx.update(gpu.device.as_ref(), gpu.queue.as_ref(), &window_for_loop, &gpu.surface, &mut render_state);
                render_state.draw_frame(gpu.device.as_ref(), gpu.queue.as_ref(), &gpu.surface, &sim.borrow());
            }
        });
        f.start()
    }

    fn egui_button(e: &MouseEvent, pressed: bool) -> egui::Event {
        let button = match e.button() {
            1 => egui::PointerButton::Middle,
            2 => egui::PointerButton::Secondary,
            _ => egui::PointerButton::Primary,
        };
        egui::Event::PointerButton {
            pos: egui::pos2(e.client_x() as f32, e.client_y() as f32),
            button,
            pressed,
            modifiers: egui::Modifiers::default(),
        }
    }

    /// Keyboard drives the tweens, the pointer orbits the camera unless it
    /// is over the debug panel.
    fn setup_input_listeners(
        document: &Document,
        window: &Window,
        canvas: &HtmlCanvasElement,
        sim: Rc<RefCell<Simulation>>,
        input_state: Rc<RefCell<InputState>>,
        egui_ctx: egui::Context,
        egui_events: Rc<RefCell<Vec<egui::Event>>>,
    ) -> Result<(), JsValue> {
        // Keyboard down
        {
            let keydown = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                let mut sim = sim.borrow_mut();
                if sim.input_processor().is_navigation_key(&e.key()) {
                    e.prevent_default();
                }
                if let Err(err) = sim.key_down(&e.key(), e.key_code()) {
                    tracing::warn!(key = %e.key(), %err, "key ignored");
                }
            }) as Box<dyn FnMut(KeyboardEvent)>);
            document.add_event_listener_with_callback("keydown", keydown.as_ref().unchecked_ref())?;
            keydown.forget();
        }

        // Focus loss ends any drag
        {
            let input_state = input_state.clone();
            let blur = Closure::wrap(Box::new(move |_e: Event| {
                input_state.borrow_mut().process_event(&InputEvent::FocusLost);
            }) as Box<dyn FnMut(Event)>);
            window.add_event_listener_with_callback("blur", blur.as_ref().unchecked_ref())?;
            blur.forget();
        }

        // Hidden tab, same as focus loss
        {
            let input_state = input_state.clone();
            let visibility = Closure::wrap(Box::new(move |_e: Event| {
                input_state.borrow_mut().process_event(&InputEvent::FocusLost);
            }) as Box<dyn FnMut(Event)>);
            document.add_event_listener_with_callback("visibilitychange", visibility.as_ref().unchecked_ref())?;
            visibility.forget();
        }

        // Mouse down on the canvas starts an orbit drag
        {
            let input_state = input_state.clone();
            let egui_ctx = egui_ctx.clone();
            let egui_events = egui_events.clone();
            let mousedown = Closure::wrap(Box::new(move |e: MouseEvent| {
                egui_events.borrow_mut().push(egui_button(&e, true));
                if !egui_ctx.is_pointer_over_area() {
                    input_state.borrow_mut().process_event(&web_input::mouse_click_to_input(&e, true));
                    e.prevent_default();
                }
            }) as Box<dyn FnMut(MouseEvent)>);
            canvas.add_event_listener_with_callback("mousedown", mousedown.as_ref().unchecked_ref())?;
            mousedown.forget();
        }

        // Mouse up anywhere ends it
        {
            let input_state = input_state.clone();
            let egui_events = egui_events.clone();
            let mouseup = Closure::wrap(Box::new(move |e: MouseEvent| {
                egui_events.borrow_mut().push(egui_button(&e, false));
                input_state.borrow_mut().process_event(&web_input::mouse_click_to_input(&e, false));
            }) as Box<dyn FnMut(MouseEvent)>);
            document.add_event_listener_with_callback("mouseup", mouseup.as_ref().unchecked_ref())?;
            mouseup.forget();
        }

        // Mouse move
        {
            let input_state = input_state.clone();
            let egui_events = egui_events.clone();
            let mm = Closure::wrap(Box::new(move |e: MouseEvent| {
                let (px, py) = (e.client_x() as f32, e.client_y() as f32);
                egui_events.borrow_mut().push(egui::Event::PointerMoved(egui::pos2(px, py)));
                input_state.borrow_mut().process_event(&web_input::mouse_move_to_input(&e));
            }) as Box<dyn FnMut(MouseEvent)>);
            document.add_event_listener_with_callback("mousemove", mm.as_ref().unchecked_ref())?;
            mm.forget();
        }

        // Context menu prevention
        {
            let contextmenu = Closure::wrap(Box::new(move |e: MouseEvent| {
                e.prevent_default();
            }) as Box<dyn FnMut(MouseEvent)>);
            canvas.add_event_listener_with_callback("contextmenu", contextmenu.as_ref().unchecked_ref())?;
            contextmenu.forget();
        }

        // Mouse wheel zooms the orbit
        {
            let input_state = input_state.clone();
            let wheel = Closure::wrap(Box::new(move |e: WheelEvent| {
                if egui_ctx.is_pointer_over_area() {
                    return;
                }
                input_state.borrow_mut().process_event(&web_input::mouse_wheel_to_input(&e));
                e.prevent_default();
            }) as Box<dyn FnMut(WheelEvent)>);
            canvas.add_event_listener_with_callback("wheel", wheel.as_ref().unchecked_ref())?;
            wheel.forget();
        }

        Ok(())
    }

    fn init_canvas() -> Result<(Window, Document, HtmlCanvasElement), JsValue> {
        let window = web_sys::window().ok_or(js_error("no global `window`"))?;
        let document = window.document().ok_or(js_error("no document on window"))?;
        let body = document.body().ok_or(js_error("no body on document"))?;
        body.set_attribute("style", "margin: 0; overflow: hidden")?;
        let canvas_el = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| js_error("failed to create canvas"))?;
        canvas_el.set_class_name("webgl");
        body.append_child(&canvas_el)?;
        Ok((window, document, canvas_el))
    }

    fn js_error<E: Into<String>>(msg: E) -> JsValue {
        JsValue::from_str(&msg.into())
    }

    type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

    struct RcCellCallback {
        inner: Rc<RefCell<Box<dyn FnMut()>>>,
        window: Window,
    }

    impl RcCellCallback {
        fn new(window: Window, f: impl FnMut() + 'static) -> Self {
            Self {
                inner: Rc::new(RefCell::new(Box::new(f))),
                window,
            }
        }

        fn request(window: &Window, callback: &FrameCallback) -> Result<(), JsValue> {
            let cb_ref = callback.borrow();
            let closure = cb_ref.as_ref().ok_or(js_error("frame callback missing"))?;
            window.request_animation_frame(closure.as_ref().unchecked_ref())?;
            Ok(())
        }

        fn start(self) -> Result<(), JsValue> {
            let inner = self.inner.clone();
            let window = self.window.clone();

            let callback: FrameCallback = Rc::new(RefCell::new(None));
            let callback_clone = callback.clone();

            *callback.borrow_mut() = Some(Closure::wrap(Box::new(move || {
                inner.borrow_mut().as_mut()();

                // Recursively schedule next frame
                if let Err(err) = Self::request(&window, &callback_clone) {
                    tracing::error!(?err, "requestAnimationFrame failed, loop stopped");
                }
            }) as Box<dyn FnMut()>));

            Self::request(&self.window, &callback)?;

            // Leak the closure to keep it alive
            std::mem::forget(callback);
            Ok(())
        }
    }
}
