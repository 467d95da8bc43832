//! GPU and window context.
//!
//! [`Context`] owns the surface, device and queue together with everything
//! that lives as long as the window: camera, lights, shadow map, depth buffer
//! and pipelines. Flows get a cheap [`InitContext`] while they build their GPU
//! resources and a `&Context` afterwards.

use std::sync::Arc;

use anyhow::Context as _;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    camera::{CameraResources, OrbitCamera, OrbitController, Projection},
    config::SceneConfig,
    data_structures::texture,
    flow::ShutdownHandle,
    pipelines::{Pipelines, light::LightResources},
    resources::texture::material_layout,
};

#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    instance: wgpu::Instance,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub pipelines: Pipelines,
    pub material_bind_group_layout: wgpu::BindGroupLayout,
    pub clear_colour: wgpu::Color,
    pub max_pixel_ratio: f64,
    pub scene: SceneConfig,
}

impl Context {
    pub async fn new(window: Arc<Window>, scene: &SceneConfig) -> anyhow::Result<Self> {
        let size = surface_size(window.inner_size(), window.scale_factor(), scene.max_pixel_ratio);

        // The instance is a handle to our GPU
        // BackendBit::PRIMARY => Vulkan + Metal + DX12 + Browser WebGPU
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..wgpu::InstanceDescriptor::new_without_display_handle()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("could not create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        let info = adapter.get_info();
        log::info!("Using {} ({:?})", info.name, info.backend);

        log::info!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                ..Default::default()
            })
            .await
            .context("could not open the graphics device")?;

        log::info!("Surface");
        let surface_caps = surface.get_capabilities(&adapter);
        // The shaders output linear colour and rely on an sRGB surface to encode it.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("the surface supports no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera_config = &scene.camera;
        let projection = Projection::new(
            config.width,
            config.height,
            camera_config.fovy,
            camera_config.znear,
            camera_config.zfar,
        );
        let camera = CameraResources::new(
            &device,
            OrbitCamera::from(camera_config),
            OrbitController::new(scene.orbit.clone(), config.height),
            &projection,
        );

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let light = LightResources::new(&device, &scene.ambient, &scene.directional);
        let material_bind_group_layout = material_layout(&device);
        let pipelines = Pipelines::new(
            &device,
            &config,
            &material_bind_group_layout,
            &camera.bind_group_layout,
            &light,
        );

        Ok(Self {
            window,
            depth_texture,
            instance,
            surface,
            device,
            queue,
            config,
            camera,
            projection,
            light,
            pipelines,
            material_bind_group_layout,
            clear_colour: scene.background,
            max_pixel_ratio: scene.max_pixel_ratio,
            scene: scene.clone(),
        })
    }

    /// Resize the surface for a window of `physical` pixels.
    ///
    /// Returns `false` and leaves everything untouched for zero sized windows.
    pub fn resize(&mut self, physical: PhysicalSize<u32>) -> bool {
        let size = surface_size(physical, self.window.scale_factor(), self.max_pixel_ratio);
        if size.width == 0 || size.height == 0 {
            return false;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.projection.resize(size.width, size.height);
        self.camera.controller.set_viewport_height(size.height);
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
        log::debug!("Surface configured at {}x{}", size.width, size.height);
        true
    }

    /// Configure the surface again with the current size.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    /// Replace a lost surface with a new one for the same window.
    pub fn recreate_surface(&mut self) -> anyhow::Result<()> {
        self.surface = self
            .instance
            .create_surface(self.window.clone())
            .context("could not recreate the lost surface")?;
        self.reconfigure();
        Ok(())
    }
}

/// What a flow gets while it is being constructed: handles to create GPU
/// resources with, the scene configuration and a way to end the program.
#[derive(Clone, Debug)]
pub struct InitContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub material_bind_group_layout: wgpu::BindGroupLayout,
    pub scene: SceneConfig,
    pub shutdown: ShutdownHandle,
}

impl InitContext {
    // Device, queue and layout are reference counted, so these clones are cheap
    pub fn new(ctx: &Context, shutdown: ShutdownHandle) -> Self {
        Self {
            device: ctx.device.clone(),
            queue: ctx.queue.clone(),
            material_bind_group_layout: ctx.material_bind_group_layout.clone(),
            scene: ctx.scene.clone(),
            shutdown,
        }
    }
}

/// Size of the drawing surface for a window of `physical` pixels.
///
/// The surface follows the window's logical size times its scale factor, with
/// the scale factor capped at `max_pixel_ratio` to bound the cost of very
/// dense displays.
pub fn surface_size(
    physical: PhysicalSize<u32>,
    scale_factor: f64,
    max_pixel_ratio: f64,
) -> PhysicalSize<u32> {
    if scale_factor <= 0.0 || !scale_factor.is_finite() {
        return physical;
    }
    let logical = physical.to_logical::<f64>(scale_factor);
    let ratio = scale_factor.min(max_pixel_ratio);
    PhysicalSize::new(
        (logical.width * ratio).round() as u32,
        (logical.height * ratio).round() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_density_displays_keep_their_size() {
        let size = surface_size(PhysicalSize::new(1280, 720), 1.0, 2.0);
        assert_eq!(size, PhysicalSize::new(1280, 720));
        let size = surface_size(PhysicalSize::new(2560, 1440), 2.0, 2.0);
        assert_eq!(size, PhysicalSize::new(2560, 1440));
    }

    #[test]
    fn dense_displays_are_capped() {
        // 1000x500 logical pixels at a ratio of 3
        let size = surface_size(PhysicalSize::new(3000, 1500), 3.0, 2.0);
        assert_eq!(size, PhysicalSize::new(2000, 1000));
    }

    #[test]
    fn zero_sized_windows_stay_zero() {
        let size = surface_size(PhysicalSize::new(0, 0), 2.0, 2.0);
        assert_eq!(size, PhysicalSize::new(0, 0));
    }
}
