use std::f32::consts::{FRAC_PI_2, FRAC_PI_3, FRAC_PI_4};

use cgmath::{InnerSpace, Point3};
use instant::Duration;
use jenga_ngin::{
    camera::{OrbitCamera, OrbitController},
    config::{OrbitConfig, SceneConfig},
};
use winit::{
    dpi::PhysicalPosition,
    event::{DeviceId, ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
};

const FRAME: Duration = Duration::from_millis(16);

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}

fn default_camera() -> (OrbitCamera, OrbitController) {
    let config = SceneConfig::default();
    let camera = OrbitCamera::from(&config.camera);
    let controller = OrbitController::new(config.orbit, 600);
    (camera, controller)
}

#[test]
fn first_update_pulls_the_start_position_into_range() {
    let (mut camera, mut controller) = default_camera();
    assert!(close(camera.distance, 114.0_f32.sqrt()));
    assert!(camera.polar.0 < FRAC_PI_4);
    let azimuth = camera.azimuth;

    controller.update(&mut camera, FRAME);

    assert!(close(camera.distance, 10.0));
    assert!(close(camera.polar.0, FRAC_PI_4));
    assert_eq!(camera.azimuth, azimuth);

    // still looking at the origin from the same side
    let offset = camera.position() - camera.target;
    assert!(close(offset.magnitude(), 10.0));
    assert!(offset.x < 0.0 && offset.z < 0.0 && offset.y > 0.0);
}

#[test]
fn dragging_stops_at_the_polar_limits() {
    let config = OrbitConfig {
        enable_damping: false,
        ..OrbitConfig::default()
    };
    let (mut camera, _) = default_camera();
    let mut controller = OrbitController::new(config, 600);

    // pointer moving up lowers the camera towards the horizon
    controller.handle_mouse(0.0, -600.0);
    controller.update(&mut camera, FRAME);
    assert!(close(camera.polar.0, FRAC_PI_3));

    controller.handle_mouse(0.0, 600.0);
    controller.update(&mut camera, FRAME);
    assert!(close(camera.polar.0, FRAC_PI_4));
}

#[test]
fn zoom_stays_within_the_distance_limits() {
    let (mut camera, mut controller) = default_camera();

    // zooming out cannot pass the maximum distance
    controller.handle_scroll(-20.0);
    controller.update(&mut camera, FRAME);
    assert!(close(camera.distance, 10.0));

    controller.handle_scroll(5.0);
    controller.update(&mut camera, FRAME);
    assert!(close(camera.distance, 10.0 * 0.95_f32.powi(5)));
    assert!(camera.distance >= 0.0);
}

#[test]
fn damped_motion_settles() {
    let (mut camera, mut controller) = default_camera();
    controller.handle_mouse(120.0, 0.0);
    assert!(controller.is_moving());

    let mut frames = 0;
    while controller.is_moving() {
        controller.update(&mut camera, FRAME);
        frames += 1;
        assert!(frames < 10_000, "damping never settled");
    }
    assert!(frames > 1);
}

/// Camera at distance √50 on the lower polar limit, with an undamped controller.
fn undamped_camera() -> (OrbitCamera, OrbitController) {
    let camera = OrbitCamera::new(Point3::new(0.0, 5.0, 5.0), Point3::new(0.0, 0.0, 0.0));
    let config = OrbitConfig {
        enable_damping: false,
        ..OrbitConfig::default()
    };
    (camera, OrbitController::new(config, 600))
}

fn left_button(state: ElementState) -> WindowEvent {
    WindowEvent::MouseInput {
        device_id: DeviceId::dummy(),
        state,
        button: MouseButton::Left,
    }
}

fn cursor_at(x: f64, y: f64) -> WindowEvent {
    WindowEvent::CursorMoved {
        device_id: DeviceId::dummy(),
        position: PhysicalPosition::new(x, y),
    }
}

fn wheel(delta: MouseScrollDelta) -> WindowEvent {
    WindowEvent::MouseWheel {
        device_id: DeviceId::dummy(),
        delta,
        phase: TouchPhase::Moved,
    }
}

#[test]
fn dragging_with_the_left_button_orbits() {
    let (mut camera, mut controller) = undamped_camera();
    let start = camera.azimuth.0;

    assert!(controller.handle_window_events(&left_button(ElementState::Pressed)));
    // the first move only records where the pointer is
    assert!(!controller.handle_window_events(&cursor_at(100.0, 100.0)));
    assert!(controller.handle_window_events(&cursor_at(250.0, 100.0)));
    controller.update(&mut camera, FRAME);

    // a quarter of the viewport height turns a quarter circle
    assert!(close(camera.azimuth.0, start - FRAC_PI_2));
    assert!(close(camera.polar.0, FRAC_PI_4));
}

#[test]
fn moving_without_a_pressed_button_does_nothing() {
    let (mut camera, mut controller) = undamped_camera();
    let before = camera;

    assert!(!controller.handle_window_events(&cursor_at(100.0, 100.0)));
    assert!(!controller.handle_window_events(&cursor_at(300.0, 250.0)));

    controller.handle_window_events(&left_button(ElementState::Pressed));
    controller.handle_window_events(&left_button(ElementState::Released));
    assert!(!controller.handle_window_events(&cursor_at(500.0, 100.0)));

    controller.update(&mut camera, FRAME);
    assert!(close(camera.azimuth.0, before.azimuth.0));
    assert!(close(camera.distance, before.distance));
    assert!(!controller.is_moving());
}

#[test]
fn leaving_the_window_forgets_the_cursor() {
    let (mut camera, mut controller) = undamped_camera();
    let start = camera.azimuth.0;

    controller.handle_window_events(&left_button(ElementState::Pressed));
    controller.handle_window_events(&cursor_at(100.0, 100.0));
    assert!(!controller.handle_window_events(&WindowEvent::CursorLeft {
        device_id: DeviceId::dummy(),
    }));
    // re-entering far away must not count as a drag across the window
    assert!(!controller.handle_window_events(&cursor_at(400.0, 100.0)));
    controller.update(&mut camera, FRAME);
    assert!(close(camera.azimuth.0, start));

    assert!(controller.handle_window_events(&cursor_at(430.0, 100.0)));
    controller.update(&mut camera, FRAME);
    assert!(close(camera.azimuth.0, start - 30.0 * 2.0 * std::f32::consts::PI / 600.0));
}

#[test]
fn vertical_wheel_zooms_one_step_per_event() {
    let (mut camera, mut controller) = undamped_camera();
    let before = camera.distance;

    assert!(controller.handle_window_events(&wheel(MouseScrollDelta::LineDelta(0.0, 1.0))));
    controller.update(&mut camera, FRAME);
    assert!(close(camera.distance, before * 0.95));

    assert!(controller.handle_window_events(&wheel(MouseScrollDelta::PixelDelta(
        PhysicalPosition::new(0.0, -42.0),
    ))));
    controller.update(&mut camera, FRAME);
    assert!(close(camera.distance, before));
}

#[test]
fn sideways_scrolling_does_not_zoom() {
    let (mut camera, mut controller) = undamped_camera();
    let before = camera.distance;

    assert!(!controller.handle_window_events(&wheel(MouseScrollDelta::LineDelta(1.0, 0.0))));
    assert!(!controller.handle_window_events(&wheel(MouseScrollDelta::PixelDelta(
        PhysicalPosition::new(30.0, 0.0),
    ))));
    controller.update(&mut camera, FRAME);
    assert_eq!(camera.distance, before);
}
