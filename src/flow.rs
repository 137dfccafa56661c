//! Application event loop.
//!
//! Hosts a [`Game`] inside a winit window on native targets and in a browser canvas on wasm32.
//!
//! # Lifecycle Flow
//!
//! 1. `resumed` creates the window and the render surface, builds the game and starts loading
//!    every asset it requests
//! 2. resolved assets are handed to the game: directly on native (the loaders are driven to
//!    completion on a tokio runtime), through a user event on the web
//! 3. window and device events are forwarded to the game's controls
//! 4. every `RedrawRequested` runs one [`Game::frame`] with the elapsed wall-clock time

use std::{fmt::Debug, sync::Arc};

use instant::Instant;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    window::{CursorGrabMode, Window},
};

use crate::{
    config::SimConfig,
    driver::{AssetLoaded, Frame, Game, RenderSurface},
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Builds the render surface once the window exists.
pub type SurfaceConstructor = Box<dyn FnOnce(Arc<Window>) -> Box<dyn RenderSurface>>;

pub(crate) enum FlowEvent {
    #[allow(dead_code)]
    Loaded(AssetLoaded),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded(loaded) => f.debug_tuple("Loaded").field(loaded).finish(),
        }
    }
}

/// A surface bound to a window. It keeps the event loop redrawing and leaves the actual drawing
/// to a renderer plugged in on top of the submitted frames.
pub struct WindowSurface {
    window: Arc<Window>,
}

impl WindowSurface {
    pub fn new(window: Arc<Window>) -> Self {
        Self { window }
    }
}

impl RenderSurface for WindowSurface {
    fn viewport(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width.max(1), size.height.max(1))
    }

    fn submit(&mut self, frame: Frame<'_>) {
        log::trace!("frame with {} visuals", frame.transforms.len());
        self.window.request_redraw();
    }
}

struct AppState {
    window: Arc<Window>,
    surface: Box<dyn RenderSurface>,
    game: Game,
}

pub(crate) struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    state: Option<AppState>,
    // Taken once the window exists.
    config: Option<SimConfig>,
    surface_constructor: Option<SurfaceConstructor>,
    last_time: Instant,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        config: SimConfig,
        surface_constructor: SurfaceConstructor,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            state: None,
            config: Some(config),
            surface_constructor: Some(surface_constructor),
            last_time: Instant::now(),
        })
    }

    fn load_assets(&self, game: &mut Game) {
        let requests = game.asset_requests();

        #[cfg(not(target_arch = "wasm32"))]
        {
            let resolved = self
                .async_runtime
                .block_on(futures::future::join_all(requests));
            resolved.into_iter().for_each(|loaded| game.apply(loaded));
        }

        #[cfg(target_arch = "wasm32")]
        {
            for request in requests {
                let proxy = self.proxy.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    let loaded = request.await;
                    if proxy.send_event(FlowEvent::Loaded(loaded)).is_err() {
                        log::warn!("event loop closed before an asset arrived");
                    }
                });
            }
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let (Some(config), Some(surface_constructor)) =
            (self.config.take(), self.surface_constructor.take())
        else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("terrain walker");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::warn!("no #{CANVAS_ID} element, winit creates its own canvas"),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("could not create a window: {err}");
                event_loop.exit();
                return;
            }
        };

        let surface = surface_constructor(window.clone());
        let mut game = Game::new(config, surface.viewport());
        self.load_assets(&mut game);
        self.last_time = Instant::now();
        window.request_redraw();
        self.state = Some(AppState {
            window,
            surface,
            game,
        });
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            FlowEvent::Loaded(loaded) => match &mut self.state {
                Some(state) => state.game.apply(loaded),
                None => log::warn!("asset arrived before the game existed"),
            },
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        if let Some(state) = &mut self.state {
            state.game.on_device_event(&event);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.game.on_window_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                state.game.frame(dt.as_secs_f32(), state.surface.as_mut());
            }
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } if button_state.is_pressed() => {
                let locked = lock_pointer(&state.window);
                state.game.set_pointer_locked(locked);
            }
            WindowEvent::Focused(false) => {
                // Losing focus releases the lock on every platform.
                state.window.set_cursor_visible(true);
                state.game.set_pointer_locked(false);
            }
            _ => {}
        }
    }
}

// Locked is not available everywhere, confining is the closest fallback.
fn lock_pointer(window: &Window) -> bool {
    let locked = window
        .set_cursor_grab(CursorGrabMode::Locked)
        .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
    match locked {
        Ok(()) => {
            window.set_cursor_visible(false);
            true
        }
        Err(err) => {
            log::warn!("pointer lock unavailable: {err}");
            false
        }
    }
}

/// Open a window and run the simulation until it is closed.
pub fn run(config: SimConfig, surface_constructor: SurfaceConstructor) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config, surface_constructor)?;
    event_loop.run_app(&mut app)?;

    Ok(())
}

/// Browser entry point: default settings, a bare window surface.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(
        SimConfig::default(),
        Box::new(|window| Box::new(WindowSurface::new(window))),
    )
    .map_err(|err| JsValue::from_str(&format!("{err:#}")))
}
