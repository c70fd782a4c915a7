//! Flow control and the application event loop.
//!
//! A "flow" is a self-contained part of the application (here: the home
//! scene) that reacts to input, updates its simulation and says what to draw.
//! The [`App`] owns the window, the GPU [`Context`] and all flows, and drives
//! them through winit's [`ApplicationHandler`].
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, E>`] is the trait for scenes that handle events and rendering
//! - [`Out<S, E>`] is the output type for async work, context changes and exiting
//!
//! # Frame order
//!
//! Every `RedrawRequested`:
//! 1. all flows' `on_render` results are batched and drawn
//! 2. `on_tick` runs if `tick_duration_millis` elapsed
//! 3. `on_update` runs with the frame delta
//! 4. pending mouse look is applied to the camera and the camera uniform is uploaded

use std::{fmt::Debug, iter, pin::Pin, sync::Arc};

use instant::{Duration, Instant};

use futures::future::join_all;
use winit::{
    application::ApplicationHandler,
    event::{DeviceEvent, DeviceId, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    context::{Context, InitContext, MouseButtonState},
    data_structures::{model::DrawModel, texture::Texture},
    render::{Instanced, Render},
};

/// Id of the `<canvas>` element the web build renders into.
#[cfg(target_arch = "wasm32")]
pub const CANVAS_ID: &str = "renderCanvas";

///
/// Output of every lifecycle hook.
///
/// `Out::FutEvent` resolves futures into custom events. They are put in the
/// event queue and handed to `on_custom_events` later.
///
/// `Out::FutFn` resolves futures into mutations that are applied to the
/// shared state without further action by the flow.
///
/// `Out::Configure` modifies the [`Context`], e.g. the camera position, the
/// clear colour or the tick speed.
///
/// `Out::Exit` closes the window and ends the event loop.
///
/// `Empty` is the default when nothing needs to happen.
///
pub enum Out<S, E> {
    FutEvent(Vec<Box<dyn Future<Output = E>>>),
    FutFn(Vec<Box<dyn Future<Output = Box<dyn FnOnce(&mut S)>>>>),
    Configure(Box<dyn FnOnce(&mut Context)>),
    Exit,
    Empty,
}

impl<S, E> Default for Out<S, E> {
    fn default() -> Self {
        Self::Empty
    }
}

impl<S, E> Debug for Out<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FutEvent(futures) => write!(f, "FutEvent({} futures)", futures.len()),
            Self::FutFn(futures) => write!(f, "FutFn({} futures)", futures.len()),
            Self::Configure(_) => f.write_str("Configure(|&mut Context| {...})"),
            Self::Exit => f.write_str("Exit"),
            Self::Empty => f.write_str("Empty"),
        }
    }
}

/// Trait for implementing a renderable scene or game state.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once after the context exists; configure camera, light, clear colour
/// 2. `on_window_events()` and `on_device_events()` are called for each winit input event
/// 3. `on_update()` is called every frame
/// 4. `on_tick()` is called every `tick_duration_millis`
/// 5. `on_custom_events()` receives the events produced by `Out::FutEvent`
/// 6. `on_render()` is called each frame and specifies how to render `self`
///
pub trait GraphicsFlow<S, E> {
    /// Initialize the flow and configure the context.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<S, E>;

    /// Update state every frame with the elapsed time `dt`.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<S, E>;

    /// Update state every `tick_duration_millis` milliseconds.
    fn on_tick(&mut self, ctx: &Context, state: &mut S) -> Out<S, E>;

    /// Handle raw device events (mouse motion, raw keys).
    fn on_device_events(&mut self, ctx: &Context, state: &mut S, event: &DeviceEvent) -> Out<S, E>;

    /// Handle window events (keyboard, mouse buttons, resizing, focus).
    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out<S, E>;

    /// Handle custom application events.
    ///
    /// Returns the event if it was not consumed, allowing it to be passed to
    /// the next flow. Returning `None` means the event was consumed.
    fn on_custom_events(&mut self, ctx: &Context, state: &mut S, event: E) -> Option<E>;

    /// Return renderable objects for this flow. Called each frame.
    fn on_render(&self) -> Render<'_>;
}

// Dummy impl to make wasm work
impl<State, Event> Debug for dyn GraphicsFlow<State, Event> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Type alias for a flow constructor (factory function).
///
/// A flow constructor takes an `InitContext` and asynchronously returns a
/// boxed `GraphicsFlow`. This allows lazy initialization and resource loading.
pub type FlowConsturctor<S, E> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>>>;

/// Application state bundle: GPU context, app state, and surface status.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    is_surface_configured: bool,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let ctx = Context::new(window).await?;
        Ok(Self {
            ctx,
            state: State::default(),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.config.width = width;
            self.ctx.config.height = height;
            self.is_surface_configured = true;
            self.ctx.projection.resize(width, height);
            self.ctx
                .surface
                .configure(&self.ctx.device, &self.ctx.config);
            self.ctx.depth_texture = Texture::create_depth_texture(
                &self.ctx.device,
                [self.ctx.config.width, self.ctx.config.height],
                "depth_texture",
            );
        }
    }

    fn render<Event>(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<State, Event>>],
    ) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder: wgpu::CommandEncoder =
            self.ctx
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });
        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                        depth_slice: None,
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &self.ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                });

            let mut batch: Vec<Instanced> = Vec::new();
            for flow in graphics_flows {
                flow.on_render().flatten_into(&mut batch);
            }

            render_pass.set_pipeline(&self.ctx.pipelines.basic);
            for instanced in batch {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!("Skipping object {} with zero instances", instanced.id);
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_model_instanced(
                    instanced.model,
                    instanced.material,
                    0..instanced.amount as u32,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub(crate) enum FlowEvent<State: 'static, Event: 'static> {
    #[allow(dead_code)]
    Initialized {
        state: AppState<State>,
        flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    },
    #[allow(dead_code)]
    Mut(Box<dyn FnOnce(&mut State)>),
    Custom(Event),
    Exit,
}

impl<State, Event> Debug for FlowEvent<State, Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Mut(_) => f.write_str("Mut(|&mut State| -> {...})"),
            Self::Custom(_) => f.write_str("Custom(E)"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

type Flows<State, Event> = Vec<Box<dyn GraphicsFlow<State, Event>>>;

/// Resolves hook outputs: blocks on futures natively, spawns them on wasm and
/// forwards the results to the event loop.
struct Executor<State: 'static, Event: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<FlowEvent<State, Event>>,
}

impl<State: 'static, Event: 'static> Executor<State, Event> {
    fn new(proxy: EventLoopProxy<FlowEvent<State, Event>>) -> anyhow::Result<Self> {
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            runtime: tokio::runtime::Runtime::new()?,
            proxy,
        })
    }

    /// Calls `hook` on every flow in order and handles each output before the
    /// next flow runs.
    fn each_flow<F>(&self, flows: &mut Flows<State, Event>, app: &mut AppState<State>, mut hook: F)
    where
        F: FnMut(&mut Box<dyn GraphicsFlow<State, Event>>, &mut Context, &mut State) -> Out<State, Event>,
    {
        for flow in flows.iter_mut() {
            let out = hook(flow, &mut app.ctx, &mut app.state);
            self.handle(&mut app.state, &mut app.ctx, out);
        }
    }

    fn handle(&self, state: &mut State, ctx: &mut Context, out: Out<State, Event>) {
        match out {
            Out::FutEvent(futures) => {
                let fut = join_all(futures.into_iter().map(Pin::from));
                #[cfg(not(target_arch = "wasm32"))]
                {
                    for event in self.runtime.block_on(fut) {
                        if !send(&self.proxy, FlowEvent::Custom(event)) {
                            break;
                        }
                    }
                }
                #[cfg(target_arch = "wasm32")]
                {
                    let proxy = self.proxy.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        for event in fut.await {
                            if !send(&proxy, FlowEvent::Custom(event)) {
                                break;
                            }
                        }
                    });
                }
            }
            Out::FutFn(futures) => {
                let fut = join_all(futures.into_iter().map(Pin::from));
                // natively the mutations land before the next hook runs
                #[cfg(not(target_arch = "wasm32"))]
                {
                    for mutation in self.runtime.block_on(fut) {
                        mutation(state);
                    }
                }
                #[cfg(target_arch = "wasm32")]
                {
                    let _ = state;
                    let proxy = self.proxy.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        for mutation in fut.await {
                            if !send(&proxy, FlowEvent::Mut(mutation)) {
                                break;
                            }
                        }
                    });
                }
            }
            Out::Configure(configure) => configure(ctx),
            Out::Exit => {
                log::info!("Exit requested");
                send(&self.proxy, FlowEvent::Exit);
            }
            Out::Empty => (),
        }
    }
}

/// Returns false once the event loop is gone.
fn send<State, Event>(
    proxy: &EventLoopProxy<FlowEvent<State, Event>>,
    event: FlowEvent<State, Event>,
) -> bool {
    match proxy.send_event(event) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Event loop closed, dropping {:?}", e.0);
            false
        }
    }
}

pub struct App<State: 'static, Event: 'static> {
    executor: Executor<State, Event>,
    state: Option<AppState<State>>,
    flows: Flows<State, Event>,
    // Taken on the first `resumed`.
    constructors: Option<Vec<FlowConsturctor<State, Event>>>,
    last_frame: Instant,
    since_tick: Duration,
}

impl<State: 'static + Default, Event: 'static> App<State, Event> {
    fn new(
        event_loop: &EventLoop<FlowEvent<State, Event>>,
        constructors: Vec<FlowConsturctor<State, Event>>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            executor: Executor::new(event_loop.create_proxy())?,
            state: None,
            flows: Vec::new(),
            constructors: Some(constructors),
            last_frame: Instant::now(),
            since_tick: Duration::ZERO,
        })
    }

    fn initialized(&mut self, app_state: AppState<State>, flows: Flows<State, Event>) {
        self.flows = flows;
        // the first frame must not count the GPU and asset set-up
        self.last_frame = Instant::now();
        self.since_tick = Duration::ZERO;
        let app_state = self.state.insert(app_state);
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        self.executor
            .each_flow(&mut self.flows, app_state, |flow, ctx, state| flow.on_init(ctx, state));
        app_state.ctx.window.request_redraw();
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };
        let dt = self.last_frame.elapsed();
        self.last_frame = Instant::now();
        self.since_tick += dt;

        match app_state.render(&self.flows) {
            Ok(()) => {}
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = app_state.ctx.window.inner_size();
                app_state.resize(size.width, size.height);
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of GPU memory, exiting");
                event_loop.exit();
                return;
            }
            Err(e) => {
                log::error!("Unable to render: {e}");
                return;
            }
        }

        if self.since_tick >= Duration::from_millis(app_state.ctx.tick_duration_millis) {
            self.since_tick = Duration::ZERO;
            self.executor
                .each_flow(&mut self.flows, app_state, |flow, ctx, state| flow.on_tick(ctx, state));
        }
        self.executor.each_flow(&mut self.flows, app_state, |flow, ctx, state| {
            flow.on_update(ctx, state, dt)
        });

        let ctx = &mut app_state.ctx;
        ctx.camera.controller.update(&mut ctx.camera.camera, dt);
        ctx.write_camera();
    }
}

impl<State: 'static + Default, Event: 'static> ApplicationHandler<FlowEvent<State, Event>>
    for App<State, Event>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Mobile platforms resume more than once; the window outlives that.
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("Home VR");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let canvas = wgpu::web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::warn!("No element with id {CANVAS_ID}, winit creates its own canvas"),
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let init = async move {
            let app_state = AppState::<State>::new(window).await?;
            // every constructor gets its own handle onto the same device and queue
            let flows = join_all(
                constructors
                    .into_iter()
                    .map(|constructor| constructor(InitContext::from(&app_state.ctx))),
            )
            .await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.executor.runtime.block_on(init) {
                Ok((app_state, flows)) => self.initialized(app_state, flows),
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.executor.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init.await {
                    Ok((state, flows)) => {
                        send(&proxy, FlowEvent::Initialized { state, flows });
                    }
                    Err(e) => log::error!("App initialization failed: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State, Event>) {
        match event {
            FlowEvent::Initialized { state, flows } => self.initialized(state, flows),
            FlowEvent::Custom(event) => {
                let Some(app_state) = self.state.as_mut() else {
                    return;
                };
                // offered to each flow until one consumes it
                let unconsumed = self.flows.iter_mut().try_fold(event, |event, flow| {
                    match flow.on_custom_events(&app_state.ctx, &mut app_state.state, event) {
                        Some(event) => Ok(event),
                        None => Err(()),
                    }
                });
                if unconsumed.is_ok() {
                    log::warn!("Custom event was not consumed by any flow");
                }
            }
            FlowEvent::Mut(mutation) => {
                if let Some(app_state) = self.state.as_mut() {
                    mutation(&mut app_state.state);
                }
            }
            FlowEvent::Exit => event_loop.exit(),
        }
    }

    fn device_event(&mut self, _: &ActiveEventLoop, _: DeviceId, event: DeviceEvent) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            // look around only while dragging
            if app_state.ctx.mouse.pressed != MouseButtonState::None {
                app_state.ctx.camera.controller.handle_mouse(dx, dy);
            }
        }
        self.executor.each_flow(&mut self.flows, app_state, |flow, ctx, state| {
            flow.on_device_events(ctx, state, &event)
        });
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _: WindowId, event: WindowEvent) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };

        let mouse = &mut app_state.ctx.mouse;
        match &event {
            WindowEvent::CursorMoved { position, .. } => mouse.coords = *position,
            WindowEvent::MouseInput { state, button, .. } => {
                mouse.pressed = match (button, state.is_pressed()) {
                    (_, false) => MouseButtonState::None,
                    (MouseButton::Left, true) => MouseButtonState::Left,
                    (MouseButton::Right, true) => MouseButtonState::Right,
                    _ => mouse.pressed,
                }
            }
            WindowEvent::Focused(false) => mouse.pressed = MouseButtonState::None,
            _ => (),
        }
        app_state.ctx.camera.controller.handle_window_events(&event);

        self.executor.each_flow(&mut self.flows, app_state, |flow, ctx, state| {
            flow.on_window_events(ctx, state, &event)
        });

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => app_state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => self.frame(event_loop),
            _ => (),
        }
    }
}

/// Creates the window and runs all flows until the window closes or a flow
/// returns [`Out::Exit`].
pub fn run<State: 'static + Default, Event: 'static>(
    constructors: Vec<FlowConsturctor<State, Event>>,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {e}");
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    let event_loop = build_event_loop::<State, Event>()?;
    let mut app = App::new(&event_loop, constructors)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}

// Test harnesses drive the loop off the main thread.
#[cfg(all(feature = "integration-tests", target_os = "linux"))]
fn build_event_loop<State, Event>() -> anyhow::Result<EventLoop<FlowEvent<State, Event>>> {
    use winit::platform::wayland::EventLoopBuilderExtWayland;
    Ok(EventLoop::with_user_event().with_any_thread(true).build()?)
}

#[cfg(all(feature = "integration-tests", target_os = "windows"))]
fn build_event_loop<State, Event>() -> anyhow::Result<EventLoop<FlowEvent<State, Event>>> {
    use winit::platform::windows::EventLoopBuilderExtWindows;
    Ok(EventLoop::with_user_event().with_any_thread(true).build()?)
}

#[cfg(not(all(
    feature = "integration-tests",
    any(target_os = "linux", target_os = "windows")
)))]
fn build_event_loop<State, Event>() -> anyhow::Result<EventLoop<FlowEvent<State, Event>>> {
    Ok(EventLoop::with_user_event().build()?)
}
