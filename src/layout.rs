//! Procedural layout of the tower and the floor.
//!
//! Nothing in here touches the GPU. [`TowerLayout::placements`] turns a layer
//! count and a block size into one [`BlockPlacement`] per block, and
//! [`FloorLayout`] describes where the receiving plane goes. The renderer turns
//! both into instances of one shared mesh each (see
//! [`crate::data_structures::block::Tower`] and
//! [`crate::data_structures::floor::Floor`]).
//!
//! The tower is built bottom-up. Every layer holds three blocks side by side,
//! and consecutive layers are turned 90 degrees against each other:
//!
//! ```text
//!   odd layer (aligned)        even layer (rotated)
//!   blocks run along z         blocks run along x
//!   spread along x             spread along z
//! ```

use anyhow::ensure;
use cgmath::{Deg, Quaternion, Rotation3, Vector3};

/// Size of a single block.
///
/// `x` is the width, `y` the height and `z` the length of an unrotated block.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockDimensions {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl BlockDimensions {
    /// The classic 2.5 : 1.5 : 7.5 block, scaled so that its length is one unit.
    pub const JENGA: BlockDimensions = BlockDimensions {
        x: 2.5 / 7.5,
        y: 1.5 / 7.5,
        z: 7.5 / 7.5,
    };

    pub fn new(x: f32, y: f32, z: f32) -> anyhow::Result<Self> {
        ensure!(
            x.is_finite() && y.is_finite() && z.is_finite(),
            "block dimensions must be finite, got ({x}, {y}, {z})"
        );
        ensure!(
            x > 0.0 && y > 0.0 && z > 0.0,
            "block dimensions must be positive, got ({x}, {y}, {z})"
        );
        Ok(Self { x, y, z })
    }

    /// Build dimensions from a width : height : length ratio, normalized by the length.
    pub fn from_ratio(width: f32, height: f32, length: f32) -> anyhow::Result<Self> {
        Self::new(width / length, height / length, length / length)
    }
}

impl Default for BlockDimensions {
    fn default() -> Self {
        Self::JENGA
    }
}

/// How the blocks of a layer are turned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// Yawed 90 degrees; blocks are spread along the z axis.
    Rotated,
    /// Unrotated; blocks are spread along the x axis.
    Aligned,
}

impl Orientation {
    /// Even layers are rotated, odd layers are not.
    pub fn for_layer(layer: usize) -> Self {
        if layer % 2 == 0 {
            Orientation::Rotated
        } else {
            Orientation::Aligned
        }
    }

    pub fn yaw(self) -> Deg<f32> {
        match self {
            Orientation::Rotated => Deg(90.0),
            Orientation::Aligned => Deg(0.0),
        }
    }

    pub fn rotation(self) -> Quaternion<f32> {
        Quaternion::from_angle_y(self.yaw())
    }

    /// Unit vector along which the three blocks of a layer are spread out.
    pub fn spread_axis(self) -> Vector3<f32> {
        match self {
            Orientation::Rotated => Vector3::unit_z(),
            Orientation::Aligned => Vector3::unit_x(),
        }
    }
}

/// Where a single block of the tower goes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlockPlacement {
    pub layer: usize,
    /// Position within the layer, `0..3` from the negative to the positive side.
    pub slot: usize,
    pub position: Vector3<f32>,
    pub orientation: Orientation,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl BlockPlacement {
    pub fn rotation(&self) -> Quaternion<f32> {
        self.orientation.rotation()
    }
}

/// Parameters of the tower. Layer count and block size are fixed once the
/// placements are generated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TowerLayout {
    pub layers: usize,
    pub block: BlockDimensions,
    /// Space between neighbouring blocks of the same layer.
    pub gap: f32,
}

impl TowerLayout {
    pub const DEFAULT_LAYERS: usize = 18;
    pub const BLOCKS_PER_LAYER: usize = 3;
    /// Keeps neighbouring faces from z-fighting.
    pub const BLOCK_GAP: f32 = 0.01;

    pub fn new(layers: usize, block: BlockDimensions) -> Self {
        Self {
            layers,
            block,
            gap: Self::BLOCK_GAP,
        }
    }

    pub fn with_gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }

    pub fn block_count(&self) -> usize {
        self.layers * Self::BLOCKS_PER_LAYER
    }

    /// Total height of the stack.
    pub fn height(&self) -> f32 {
        self.layers as f32 * self.block.y
    }

    /// Vertical centre of layer `layer`.
    pub fn layer_center(&self, layer: usize) -> f32 {
        layer as f32 * self.block.y + self.block.y / 2.0
    }

    /// Offsets of the three blocks of a layer along its spread axis.
    pub fn lateral_offsets(&self) -> [f32; 3] {
        let step = self.block.x + self.gap;
        [-step, 0.0, step]
    }

    /// Generate every block placement, bottom layer first.
    pub fn placements(&self) -> Vec<BlockPlacement> {
        let offsets = self.lateral_offsets();
        let mut placements = Vec::with_capacity(self.block_count());
        let mut last_y = 0.0;

        for layer in 0..self.layers {
            let center_y = last_y + self.block.y / 2.0;
            let orientation = Orientation::for_layer(layer);
            let axis = orientation.spread_axis();

            placements.extend(offsets.iter().enumerate().map(|(slot, offset)| {
                BlockPlacement {
                    layer,
                    slot,
                    position: Vector3::new(0.0, center_y, 0.0) + axis * *offset,
                    orientation,
                    cast_shadow: true,
                    receive_shadow: true,
                }
            }));

            last_y += self.block.y;
        }

        placements
    }
}

impl Default for TowerLayout {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LAYERS, BlockDimensions::JENGA)
    }
}

/// The square plane the tower stands on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloorLayout {
    /// Edge length of the square.
    pub size: f32,
    pub height: f32,
}

impl FloorLayout {
    pub const SIZE: f32 = 10.0;
    pub const HEIGHT: f32 = 0.01;

    pub fn new(size: f32, height: f32) -> Self {
        Self { size, height }
    }

    pub fn position(&self) -> Vector3<f32> {
        Vector3::new(0.0, self.height, 0.0)
    }

    /// Lays the plane's +z facing quad down so that it faces +y.
    pub fn rotation(&self) -> Quaternion<f32> {
        Quaternion::from_angle_x(Deg(-90.0))
    }

    pub fn normal(&self) -> Vector3<f32> {
        self.rotation() * Vector3::unit_z()
    }
}

impl Default for FloorLayout {
    fn default() -> Self {
        Self::new(Self::SIZE, Self::HEIGHT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn jenga_block_is_normalized_by_its_length() {
        let block = BlockDimensions::JENGA;
        assert!(close(block.x, 1.0 / 3.0));
        assert!(close(block.y, 0.2));
        assert!(close(block.z, 1.0));
        assert_eq!(BlockDimensions::from_ratio(2.5, 1.5, 7.5).unwrap(), block);
    }

    #[test]
    fn rejects_degenerate_blocks() {
        assert!(BlockDimensions::new(0.0, 1.0, 1.0).is_err());
        assert!(BlockDimensions::new(1.0, -1.0, 1.0).is_err());
        assert!(BlockDimensions::new(1.0, 1.0, f32::NAN).is_err());
    }

    #[test]
    fn three_blocks_per_layer() {
        for layers in 1..25 {
            let layout = TowerLayout::new(layers, BlockDimensions::JENGA);
            assert_eq!(layout.placements().len(), 3 * layers);
            assert_eq!(layout.block_count(), 3 * layers);
        }
    }

    #[test]
    fn empty_tower_has_no_blocks() {
        let layout = TowerLayout::new(0, BlockDimensions::JENGA);
        assert!(layout.placements().is_empty());
        assert_eq!(layout.height(), 0.0);
    }

    #[test]
    fn parity_decides_orientation() {
        let placements = TowerLayout::default().placements();
        for p in &placements {
            let expected = if p.layer % 2 == 0 {
                Orientation::Rotated
            } else {
                Orientation::Aligned
            };
            assert_eq!(p.orientation, expected, "layer {}", p.layer);
        }
    }

    #[test]
    fn rotated_blocks_point_along_x() {
        let rotation = Orientation::Rotated.rotation();
        let length_axis = rotation * Vector3::unit_z();
        assert!(close(length_axis.x.abs(), 1.0));
        assert!(close(length_axis.z, 0.0));

        let aligned = Orientation::Aligned.rotation() * Vector3::unit_z();
        assert!(close(aligned.z, 1.0));
    }

    #[test]
    fn running_offset_matches_closed_form() {
        let layout = TowerLayout::default();
        for p in layout.placements() {
            assert!(close(p.position.y, layout.layer_center(p.layer)));
        }
    }

    #[test]
    fn every_block_casts_and_receives_shadows() {
        assert!(
            TowerLayout::default()
                .placements()
                .iter()
                .all(|p| p.cast_shadow && p.receive_shadow)
        );
    }

    #[test]
    fn floor_faces_up_just_above_origin() {
        let floor = FloorLayout::default();
        let normal = floor.normal();
        assert!(close(normal.x, 0.0));
        assert!(close(normal.y, 1.0));
        assert!(close(normal.z, 0.0));
        assert!(close(floor.position().y, 0.01));
    }
}
