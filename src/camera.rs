//! Orbit camera, its controller and the GPU side of both.
//!
//! The camera circles a target point. Its position is stored in spherical
//! coordinates around that target: a distance, a polar angle measured from
//! the up axis and an azimuth around it. [`OrbitController`] turns pointer
//! drags and wheel input into changes of those coordinates and eases them out
//! over the following frames.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Point3, Rad, Vector3, perspective};
use instant::Duration;
use wgpu::util::DeviceExt;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent},
};

use crate::config::{CameraConfig, OrbitConfig};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Keeps the polar angle off the poles where the view matrix degenerates.
const POLE_EPSILON: f32 = 1e-6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitCamera {
    pub target: Point3<f32>,
    pub distance: f32,
    /// Angle between the up axis and the camera offset.
    pub polar: Rad<f32>,
    /// Angle around the up axis, zero on +z.
    pub azimuth: Rad<f32>,
}

impl OrbitCamera {
    pub fn new(position: Point3<f32>, target: Point3<f32>) -> Self {
        let offset = position - target;
        let distance = offset.magnitude();
        let (polar, azimuth) = if distance == 0.0 {
            (Rad(0.0), Rad(0.0))
        } else {
            (
                Rad((offset.y / distance).clamp(-1.0, 1.0).acos()),
                Rad(offset.x.atan2(offset.z)),
            )
        };
        Self {
            target,
            distance,
            polar,
            azimuth,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        let (sin_polar, cos_polar) = self.polar.0.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.0.sin_cos();
        self.target
            + Vector3::new(
                sin_polar * sin_azimuth,
                cos_polar,
                sin_polar * cos_azimuth,
            ) * self.distance
    }

    pub fn calc_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::look_at_rh(self.position(), self.target, Vector3::unit_y())
    }
}

impl From<&CameraConfig> for OrbitCamera {
    fn from(config: &CameraConfig) -> Self {
        Self::new(config.position, config.target)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> cgmath::Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// Turns pointer and wheel input into orbit motion.
///
/// Rotation follows the pointer: dragging across the full height of the
/// viewport turns the camera by a full circle. Each wheel step scales the
/// distance by `0.95^zoom_speed`.
#[derive(Clone, Debug)]
pub struct OrbitController {
    config: OrbitConfig,
    /// Pending azimuth and polar change, consumed by `update`.
    delta_azimuth: f32,
    delta_polar: f32,
    scale: f32,
    rotating: bool,
    cursor: Option<PhysicalPosition<f64>>,
    viewport_height: f32,
}

impl OrbitController {
    pub fn new(config: OrbitConfig, viewport_height: u32) -> Self {
        Self {
            config,
            delta_azimuth: 0.0,
            delta_polar: 0.0,
            scale: 1.0,
            rotating: false,
            cursor: None,
            viewport_height: viewport_height.max(1) as f32,
        }
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        if height > 0 {
            self.viewport_height = height as f32;
        }
    }

    /// Queue a rotation for a pointer drag of `dx`/`dy` pixels.
    pub fn handle_mouse(&mut self, dx: f64, dy: f64) {
        let per_pixel = 2.0 * PI / self.viewport_height * self.config.rotate_speed;
        self.delta_azimuth -= dx as f32 * per_pixel;
        self.delta_polar -= dy as f32 * per_pixel;
    }

    /// Queue a zoom. Positive steps move towards the target.
    pub fn handle_scroll(&mut self, steps: f32) {
        let zoom_scale = 0.95_f32.powf(self.config.zoom_speed);
        self.scale *= zoom_scale.powf(steps);
    }

    /// Feed a window event to the controller. Returns whether it was used.
    pub fn handle_window_events(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                self.rotating = *state == ElementState::Pressed;
                true
            }
            WindowEvent::CursorMoved { position, .. } => {
                let used = match (self.rotating, self.cursor) {
                    (true, Some(last)) => {
                        self.handle_mouse(position.x - last.x, position.y - last.y);
                        true
                    }
                    _ => false,
                };
                self.cursor = Some(*position);
                used
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                false
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32,
                };
                // sideways scrolling does not zoom
                if y == 0.0 || y.is_nan() {
                    return false;
                }
                self.handle_scroll(y.signum());
                true
            }
            WindowEvent::Resized(size) => {
                self.set_viewport_height(size.height);
                false
            }
            _ => false,
        }
    }

    /// Apply pending input to `camera` and clamp it to the configured limits.
    ///
    /// With damping enabled only `damping_factor` of the pending rotation is
    /// applied per call and the rest carries over, so motion eases out.
    pub fn update(&mut self, camera: &mut OrbitCamera, _dt: Duration) {
        let damping = if self.config.enable_damping {
            self.config.damping_factor
        } else {
            1.0
        };
        camera.azimuth.0 += self.delta_azimuth * damping;
        camera.polar.0 += self.delta_polar * damping;

        let min_polar = self.config.min_polar.0.max(POLE_EPSILON);
        let max_polar = self.config.max_polar.0.min(PI - POLE_EPSILON);
        camera.polar.0 = camera.polar.0.clamp(min_polar, max_polar);

        camera.distance = (camera.distance * self.scale)
            .clamp(self.config.min_distance, self.config.max_distance);

        if self.config.enable_damping {
            self.delta_azimuth *= 1.0 - damping;
            self.delta_polar *= 1.0 - damping;
        } else {
            self.delta_azimuth = 0.0;
            self.delta_polar = 0.0;
        }
        self.scale = 1.0;
    }

    /// Whether rotation is still easing out.
    pub fn is_moving(&self) -> bool {
        self.delta_azimuth.abs() > 1e-6 || self.delta_polar.abs() > 1e-6
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: cgmath::Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrbitCamera, projection: &Projection) {
        self.view_position = camera.position().to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// The camera together with everything needed to hand it to the shaders.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: OrbitCamera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(
        device: &wgpu::Device,
        camera: OrbitCamera,
        controller: OrbitController,
        projection: &Projection,
    ) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            controller,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Advance the controller and upload the new view-projection matrix.
    pub fn update(&mut self, queue: &wgpu::Queue, projection: &Projection, dt: Duration) {
        self.controller.update(&mut self.camera, dt);
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Deg;

    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn spherical_coordinates_round_trip_the_position() {
        let position = Point3::new(-5.0, 8.0, -5.0);
        let camera = OrbitCamera::new(position, Point3::new(0.0, 0.0, 0.0));
        let p = camera.position();
        assert!(close(p.x, position.x) && close(p.y, position.y) && close(p.z, position.z));
        assert!(close(camera.distance, 114.0_f32.sqrt()));
    }

    #[test]
    fn camera_on_the_target_does_not_produce_nan() {
        let camera = OrbitCamera::new(Point3::new(1.0, 1.0, 1.0), Point3::new(1.0, 1.0, 1.0));
        assert_eq!(camera.distance, 0.0);
        assert!(!camera.polar.0.is_nan());
    }

    #[test]
    fn uniform_matches_the_shader_struct() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 80);
    }

    #[test]
    fn projection_keeps_its_aspect_on_zero_size() {
        let mut projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        projection.resize(0, 600);
        assert!(close(projection.aspect(), 800.0 / 600.0));
        projection.resize(1000, 500);
        assert!(close(projection.aspect(), 2.0));
    }

    #[test]
    fn target_is_at_the_centre_of_the_view() {
        let camera = OrbitCamera::new(Point3::new(-5.0, 8.0, -5.0), Point3::new(0.0, 0.0, 0.0));
        let projection = Projection::new(800, 600, Deg(45.0), 0.1, 100.0);
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, &projection);
        let m: cgmath::Matrix4<f32> = uniform.view_proj.into();
        let clip = m * cgmath::Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(close(clip.x / clip.w, 0.0));
        assert!(close(clip.y / clip.w, 0.0));
        let depth = clip.z / clip.w;
        assert!((0.0..1.0).contains(&depth));
    }

    #[test]
    fn damping_eases_out_towards_the_full_drag() {
        let config = OrbitConfig::default();
        let mut controller = OrbitController::new(config, 600);
        let mut camera = OrbitCamera::new(Point3::new(0.0, 5.0, 5.0), Point3::new(0.0, 0.0, 0.0));
        let start = camera.azimuth.0;
        // a quarter of the viewport height turns a quarter circle
        controller.handle_mouse(-150.0, 0.0);

        controller.update(&mut camera, Duration::from_millis(16));
        let first_step = camera.azimuth.0 - start;
        assert!(close(first_step, 0.05 * PI / 2.0));
        assert!(controller.is_moving());

        for _ in 0..1000 {
            controller.update(&mut camera, Duration::from_millis(16));
        }
        assert!(close(camera.azimuth.0 - start, PI / 2.0));
        assert!(!controller.is_moving());
    }

    #[test]
    fn without_damping_the_drag_applies_at_once() {
        let config = OrbitConfig {
            enable_damping: false,
            ..OrbitConfig::default()
        };
        let mut controller = OrbitController::new(config, 600);
        let mut camera = OrbitCamera::new(Point3::new(0.0, 5.0, 5.0), Point3::new(0.0, 0.0, 0.0));
        let start = camera.azimuth.0;
        controller.handle_mouse(-300.0, 0.0);
        controller.update(&mut camera, Duration::from_millis(16));
        assert!(close(camera.azimuth.0 - start, PI));
        assert!(!controller.is_moving());
    }

    #[test]
    fn scroll_up_moves_closer() {
        let config = OrbitConfig::default();
        let mut controller = OrbitController::new(config, 600);
        let mut camera = OrbitCamera::new(Point3::new(0.0, 5.0, 5.0), Point3::new(0.0, 0.0, 0.0));
        let before = camera.distance;
        controller.handle_scroll(1.0);
        controller.update(&mut camera, Duration::from_millis(16));
        assert!(close(camera.distance, before * 0.95));
    }
}
