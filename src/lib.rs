//! jenga-ngin
//!
//! A static Jenga tower rendered with wgpu, natively and in the browser. The
//! tower is a stack of layers of three wooden blocks, each layer turned a
//! quarter turn against the one below, standing on a floor plane. The scene
//! is lit by an ambient and a shadow casting directional light and can be
//! orbited with the mouse.
//!
//! High-level modules
//! - `layout`: pure placement of the blocks and the floor, no GPU involved
//! - `config`: typed scene configuration with the default scene
//! - `camera`: orbit camera, controller and uniforms for view/projection
//! - `context`: central GPU and window context that owns device/queue/pipelines
//! - `data_structures`: meshes, materials, textures, instances, tower and floor
//! - `flow`: the event loop and the trait scenes implement
//! - `pipelines`: the lit PBR pipeline, the shadow pipeline and the light
//! - `resources`: procedural geometry and texture loading
//! - `render`: render composition for efficient pipeline reuse
//! - `scene`: the Jenga scene itself
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod layout;
pub mod pipelines;
pub mod render;
pub mod resources;
pub mod scene;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use wgpu;
pub use winit::event::WindowEvent;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Browser entry point.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    flow::run(
        config::SceneConfig::default(),
        vec![scene::JengaScene::constructor()],
    )
    .map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
