//! Flow control and application event loop.
//!
//! A "flow" is a self-contained part of the scene that handles input, updates
//! itself and says what to draw each frame. The engine owns the window and
//! the GPU context, hands events to every flow and renders their output.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow`] is the trait for scenes that handle events and rendering
//! - [`Out`] lets a flow change the context in response to a lifecycle hook
//! - [`ShutdownHandle`] ends the event loop from anywhere, including other threads
//!
//! # Lifecycle Flow
//!
//! The event loop follows this pattern each frame:
//! 1. Collect window events and pass them to the camera controller and the flows
//! 2. Update the camera and the flows (via `on_update`)
//! 3. Call flows' `on_render()` to collect renderable batches
//! 4. Draw shadow casters into the shadow map
//! 5. Draw every batch with the lit pipeline
//! 6. Present the frame and request the next one

use std::{
    fmt::Debug,
    iter,
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::Window,
};

use crate::{
    config::SceneConfig,
    context::{Context, InitContext},
    data_structures::model::{DrawModel, DrawShadow},
    render::{Instanced, Render},
};

/// How often an idle event loop wakes up to check for a shutdown request.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

///
/// This is the Output Type for every lifecycle hook.
///
/// `Out::Configure` can be used to modify the Context, for instance to change
/// the clear colour.
///
/// `Empty` is the default output used when nothing needs to be handled.
///
pub enum Out {
    Configure(Box<dyn FnOnce(&mut Context)>),
    Empty,
}

impl Default for Out {
    fn default() -> Self {
        Self::Empty
    }
}

impl Debug for Out {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Out::Configure(_) => f.write_str("Configure(|&mut Context| {...})"),
            Out::Empty => f.write_str("Empty"),
        }
    }
}

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the flow is created; configure the context here
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame
/// 4. `on_render()` is called each frame and specifies how to render `self`
///
pub trait GraphicsFlow {
    /// Initialize the flow and configure the context.
    fn on_init(&mut self, ctx: &mut Context) -> Out;

    /// Update state every frame with the elapsed time `dt`.
    fn on_update(&mut self, _ctx: &Context, _dt: Duration) -> Out {
        Out::Empty
    }

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    fn on_window_events(&mut self, _ctx: &Context, _event: &WindowEvent) -> Out {
        Out::Empty
    }

    /// Return renderable objects for this flow.
    fn on_render(&self) -> Render<'_>;
}

// Dummy impl to make wasm work
impl Debug for dyn GraphicsFlow + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Type alias for a flow constructor (factory function).
///
/// A flow constructor takes an `InitContext` and asynchronously returns a
/// boxed `GraphicsFlow`. This allows lazy initialization and resource loading.
pub type FlowConstructor =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow>>>>>;

/// Cancellation token for the event loop.
///
/// Cloned handles share one flag. Requesting a shutdown from any of them (or
/// from any thread) makes the loop exit at its next wake-up.
#[derive(Clone, Debug, Default)]
pub struct ShutdownHandle {
    requested: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        if !self.requested.swap(true, Ordering::SeqCst) {
            log::info!("Shutdown requested");
        }
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Window and GPU state plus surface status.
#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: &SceneConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        Ok(Self {
            ctx,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self) {
        let size = self.ctx.window.inner_size();
        if self.ctx.resize(size) {
            self.is_surface_configured = true;
        }
    }

    fn update(&mut self, graphics_flows: &mut [Box<dyn GraphicsFlow>], dt: Duration) {
        let ctx = &mut self.ctx;
        ctx.camera.update(&ctx.queue, &ctx.projection, dt);
        graphics_flows.iter_mut().for_each(|flow| {
            let out = flow.on_update(ctx, dt);
            handle_flow_output(ctx, out);
        });
    }

    fn render(&mut self, graphics_flows: &[Box<dyn GraphicsFlow>]) {
        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return;
        }

        let (output, suboptimal) = match self.ctx.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(texture) => (texture, false),
            wgpu::CurrentSurfaceTexture::Suboptimal(texture) => (texture, true),
            wgpu::CurrentSurfaceTexture::Timeout => {
                log::warn!("Timed out acquiring the next frame, skipping it");
                return;
            }
            wgpu::CurrentSurfaceTexture::Occluded => return,
            // Reconfigure the surface if it's lost or outdated
            wgpu::CurrentSurfaceTexture::Outdated => {
                self.resize();
                return;
            }
            wgpu::CurrentSurfaceTexture::Lost => {
                log::warn!("Surface lost, recreating it");
                if let Err(e) = self.ctx.recreate_surface() {
                    log::error!("{e:#}");
                }
                return;
            }
            wgpu::CurrentSurfaceTexture::Validation => {
                log::error!("Unable to render: validation error while acquiring the frame");
                return;
            }
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut batches: Vec<Instanced> = Vec::new();
        graphics_flows
            .iter()
            .for_each(|flow| flow.on_render().collect_into(&mut batches));

        let ctx = &self.ctx;
        let mut encoder: wgpu::CommandEncoder =
            ctx.device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Render Encoder"),
                });

        if ctx.light.casts_shadows() {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &ctx.light.shadow_map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });
            shadow_pass.set_pipeline(&ctx.pipelines.shadow);
            for instanced in batches.iter().filter(|b| b.casts_shadow()) {
                if let Some(casters) = instanced.casters {
                    shadow_pass.set_vertex_buffer(1, casters.slice(..));
                    shadow_pass.draw_model_shadow(
                        instanced.model,
                        0..instanced.caster_amount as u32,
                        &ctx.light.shadow_bind_group,
                    );
                }
            }
        }

        {
            let mut render_pass: wgpu::RenderPass<'_> =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Render Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &view,
                        depth_slice: None,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(ctx.clear_colour),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &ctx.depth_texture.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });

            render_pass.set_pipeline(&ctx.pipelines.pbr);
            for instanced in &batches {
                if instanced.amount == 0 || instanced.instance.size() == 0 {
                    log::warn!("you attemted to render something with zero instances");
                    continue;
                }
                render_pass.set_vertex_buffer(1, instanced.instance.slice(..));
                render_pass.draw_model_instanced(
                    instanced.model,
                    0..instanced.amount as u32,
                    &ctx.camera.bind_group,
                    &ctx.light.bind_group,
                );
            }
        }

        ctx.queue.submit(iter::once(encoder.finish()));
        output.present();

        if suboptimal {
            self.ctx.reconfigure();
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    #[allow(dead_code)]
    proxy: winit::event_loop::EventLoopProxy<FlowEvent>,
    config: SceneConfig,
    shutdown: ShutdownHandle,
    state: Option<AppState>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow>>,
    // This holds the constructors at the start.
    // We use Option to `take()` it after use.
    constructors: Option<Vec<FlowConstructor>>,
    last_time: Instant,
    error: Option<anyhow::Error>,
}

impl App {
    fn new(
        event_loop: &EventLoop<FlowEvent>,
        config: SceneConfig,
        constructors: Vec<FlowConstructor>,
        shutdown: ShutdownHandle,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = {
            let runtime = tokio::runtime::Runtime::new()?;
            let shutdown = shutdown.clone();
            runtime.spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        log::info!("Received Ctrl-C");
                        shutdown.request();
                    }
                    Err(e) => log::warn!("Could not listen for Ctrl-C: {e}"),
                }
            });
            runtime
        };
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            shutdown,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            last_time: Instant::now(),
            error: None,
        })
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("App initialization failed. Cannot create the main context: {error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    /// Take over the initialized context and flows and let the flows configure it.
    fn start(&mut self, mut app_state: AppState, flows: Vec<Box<dyn GraphicsFlow>>) {
        self.graphics_flows = flows;
        // Important: Trigger a resize and redraw now that we are initialized
        app_state.resize();
        self.graphics_flows.iter_mut().for_each(|flow| {
            let out = flow.on_init(&mut app_state.ctx);
            handle_flow_output(&mut app_state.ctx, out);
        });
        log::info!("{} flow(s) running", self.graphics_flows.len());
        self.last_time = Instant::now();
        app_state.ctx.window.request_redraw();
        self.state = Some(app_state);
    }
}

#[allow(dead_code)]
pub(crate) enum FlowEvent {
    Initialized {
        state: AppState,
        flows: Vec<Box<dyn GraphicsFlow>>,
    },
    Failed(anyhow::Error),
}

impl Debug for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

impl ApplicationHandler<FlowEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Only the first resume creates the window
        let Some(constructors) = self.constructors.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("Jenga");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            let Some(canvas) = canvas else {
                let error = anyhow::anyhow!("no element with id `{CANVAS_ID}` in the page");
                return self.fail(event_loop, error);
            };
            window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        let config = self.config.clone();
        let shutdown = self.shutdown.clone();
        let init_future = async move {
            let app_state = AppState::new(window, &config).await?;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                .map(|constructor| constructor(InitContext::new(&app_state.ctx, shutdown.clone())))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => self.start(app_state, flows),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => FlowEvent::Failed(e),
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop closed before initialization finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent) {
        match event {
            // This is the message from our wasm `spawn_local`
            FlowEvent::Initialized { state, flows } => self.start(state, flows),
            FlowEvent::Failed(e) => self.fail(event_loop, e),
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.shutdown.is_requested() {
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(ControlFlow::wait_duration(SHUTDOWN_POLL));
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

        // Pointer input that orbits the camera is not passed on to the flows
        let used_by_camera = state.ctx.camera.controller.handle_window_events(&event);
        if !used_by_camera {
            self.graphics_flows.iter_mut().for_each(|f| {
                let out = f.on_window_events(&state.ctx, &event);
                handle_flow_output(&mut state.ctx, out);
            });
        }

        match event {
            WindowEvent::CloseRequested => {
                log::info!("Window closed");
                self.shutdown.request();
                event_loop.exit();
            }
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => state.resize(),
            WindowEvent::RedrawRequested => {
                if self.shutdown.is_requested() {
                    event_loop.exit();
                    return;
                }
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                state.update(&mut self.graphics_flows, dt);
                state.render(&self.graphics_flows);
                // invoke main render loop
                state.ctx.window.request_redraw();
            }
            _ => {}
        }
    }
}

fn handle_flow_output(ctx: &mut Context, out: Out) {
    match out {
        Out::Configure(f) => f(ctx),
        Out::Empty => (),
    }
}

/// Open the window and run `constructors` until the window is closed or a
/// shutdown is requested.
pub fn run(config: SceneConfig, constructors: Vec<FlowConstructor>) -> anyhow::Result<()> {
    run_with_shutdown(config, constructors, ShutdownHandle::new())
}

/// Like [`run`], with a handle the caller can use to end the loop.
pub fn run_with_shutdown(
    config: SceneConfig,
    constructors: Vec<FlowConstructor>,
    shutdown: ShutdownHandle,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    let event_loop: EventLoop<FlowEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config, constructors, shutdown)?;

    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
