//! Scene configuration.
//!
//! Everything the scene needs to know up front lives in [`SceneConfig`]. The
//! `Default` implementation reproduces the reference scene: a white room, an
//! 18 layer tower of anigre wood blocks on a light grey floor, a soft ambient
//! light and one weak shadow casting directional light.
//!
//! There is no configuration file. Callers that want a different scene build a
//! `SceneConfig` in code and hand it to [`crate::flow::run`].

use cgmath::{Deg, Point3, Rad};

use crate::layout::{BlockDimensions, FloorLayout, TowerLayout};

#[derive(Clone, Debug)]
pub struct SceneConfig {
    pub background: wgpu::Color,
    pub camera: CameraConfig,
    pub orbit: OrbitConfig,
    pub ambient: AmbientLightConfig,
    pub directional: DirectionalLightConfig,
    pub tower: TowerConfig,
    pub floor: FloorConfig,
    pub textures: WoodTextures,
    /// Directory (native) or URL path segment (web) that texture paths are relative to.
    ///
    /// Natively a relative root is looked up in the working directory, then
    /// in the crate directory. On the web it is served next to the page.
    /// Maps that cannot be found are replaced by solid colours.
    pub asset_root: String,
    /// Upper bound for the surface's pixel ratio on high density displays.
    pub max_pixel_ratio: f64,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: wgpu::Color::WHITE,
            camera: CameraConfig::default(),
            orbit: OrbitConfig::default(),
            ambient: AmbientLightConfig::default(),
            directional: DirectionalLightConfig::default(),
            tower: TowerConfig::default(),
            floor: FloorConfig::default(),
            textures: WoodTextures::default(),
            asset_root: "assets".to_string(),
            max_pixel_ratio: 2.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CameraConfig {
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy: Deg(45.0),
            znear: 0.1,
            zfar: 100.0,
            position: Point3::new(-5.0, 8.0, -5.0),
            target: Point3::new(0.0, 0.0, 0.0),
        }
    }
}

/// Limits and feel of the orbit controller.
///
/// Polar angles are measured from the up axis, so `0` looks straight down.
#[derive(Clone, Debug)]
pub struct OrbitConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub min_polar: Rad<f32>,
    pub max_polar: Rad<f32>,
    pub min_distance: f32,
    pub max_distance: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            min_polar: Rad(std::f32::consts::FRAC_PI_4),
            max_polar: Rad(std::f32::consts::FRAC_PI_3),
            min_distance: 0.0,
            max_distance: 10.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AmbientLightConfig {
    pub colour: [f32; 3],
    pub intensity: f32,
}

impl Default for AmbientLightConfig {
    fn default() -> Self {
        Self {
            colour: [1.0, 1.0, 1.0],
            intensity: 1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct DirectionalLightConfig {
    pub colour: [f32; 3],
    pub intensity: f32,
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub cast_shadow: bool,
    pub shadow_map_size: u32,
    pub shadow_near: f32,
    pub shadow_far: f32,
    /// Half extent of the orthographic shadow frustum.
    pub shadow_extent: f32,
}

impl Default for DirectionalLightConfig {
    fn default() -> Self {
        Self {
            colour: [1.0, 1.0, 1.0],
            intensity: 0.3,
            // a directional light keeps its default height of one unit
            position: Point3::new(-5.0, 1.0, -5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            cast_shadow: true,
            shadow_map_size: 1024,
            shadow_near: 0.0,
            shadow_far: 15.0,
            shadow_extent: 5.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TowerConfig {
    pub layers: usize,
    pub block: BlockDimensions,
    pub gap: f32,
}

impl Default for TowerConfig {
    fn default() -> Self {
        Self {
            layers: TowerLayout::DEFAULT_LAYERS,
            block: BlockDimensions::JENGA,
            gap: TowerLayout::BLOCK_GAP,
        }
    }
}

impl TowerConfig {
    pub fn layout(&self) -> TowerLayout {
        TowerLayout::new(self.layers, self.block).with_gap(self.gap)
    }
}

#[derive(Clone, Debug)]
pub struct FloorConfig {
    pub size: f32,
    pub height: f32,
    /// sRGB colour, as a designer would write it down.
    pub colour: [u8; 3],
    pub metalness: f32,
    pub roughness: f32,
}

impl Default for FloorConfig {
    fn default() -> Self {
        Self {
            size: FloorLayout::SIZE,
            height: FloorLayout::HEIGHT,
            colour: [0xee, 0xee, 0xee],
            metalness: 0.3,
            roughness: 0.4,
        }
    }
}

impl FloorConfig {
    pub fn layout(&self) -> FloorLayout {
        FloorLayout::new(self.size, self.height)
    }

    pub fn linear_colour(&self) -> [f32; 4] {
        let [r, g, b] = self.colour.map(srgb_to_linear);
        [r, g, b, 1.0]
    }
}

/// Paths of the five maps making up the wood material.
#[derive(Clone, Debug)]
pub struct WoodTextures {
    pub colour: String,
    pub normal: String,
    pub roughness: String,
    pub metalness: String,
    pub ambient_occlusion: String,
}

impl Default for WoodTextures {
    fn default() -> Self {
        Self {
            colour: "textures/2K-anigre_basecolor.png".to_string(),
            normal: "textures/2K-anigre_normal.png".to_string(),
            roughness: "textures/2K-anigre_roughness.png".to_string(),
            metalness: "textures/2K-anigre_metallic.png".to_string(),
            ambient_occlusion: "textures/2K-anigre_ao.png".to_string(),
        }
    }
}

/// Convert one 8 bit sRGB channel to linear light.
pub fn srgb_to_linear(channel: u8) -> f32 {
    let c = f32::from(channel) / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tower_matches_the_reference_scene() {
        let tower = TowerConfig::default();
        assert_eq!(tower.layers, 18);
        assert_eq!(tower.gap, 0.01);
        assert!((tower.block.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn srgb_endpoints_stay_put() {
        assert_eq!(srgb_to_linear(0), 0.0);
        assert!((srgb_to_linear(255) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn floor_grey_is_darker_in_linear_space() {
        let [r, g, b, a] = FloorConfig::default().linear_colour();
        assert!(r < 238.0 / 255.0);
        assert!((r - 0.855).abs() < 0.01);
        assert_eq!(r, g);
        assert_eq!(g, b);
        assert_eq!(a, 1.0);
    }

    #[test]
    fn orbit_limits_are_ordered() {
        let orbit = OrbitConfig::default();
        assert!(orbit.min_polar.0 < orbit.max_polar.0);
        assert!(orbit.min_distance < orbit.max_distance);
    }
}
